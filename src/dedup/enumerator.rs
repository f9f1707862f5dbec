//! Folder enumeration
//!
//! Walks an account's folder tree depth-first and produces the ordered list
//! of folders whose messages will be read.

use crate::core::context::RunContext;
use crate::core::error::Result;
use crate::store::session::StoreSession;
use crate::store::traits::{FolderHandle, MailStoreTrait};
use log::{debug, info};
use std::collections::HashSet;

/// A folder selected for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub handle: FolderHandle,
    /// Name of the parent folder; empty for the root
    pub parent_name: String,
    pub item_count: usize,
    /// 1 for the root
    pub depth: usize,
}

/// Folders to scan, in scan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPlan {
    pub folders: Vec<FolderEntry>,
    /// Items over every non-excluded folder visited, size-skipped ones included
    pub total_items: usize,
}

/// Options for a folder walk
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions<'a> {
    /// Folder names skipped together with their descendants
    pub excluded: &'a HashSet<String>,
    pub include_subfolders: bool,
    /// Folders with at least this many items are not scanned themselves
    pub size_limit: usize,
}

/// Build the scan plan for the tree under `root`
pub fn enumerate<S: MailStoreTrait + ?Sized>(
    session: &StoreSession<'_, S>,
    root: &FolderHandle,
    options: WalkOptions<'_>,
    ctx: &RunContext,
) -> Result<FolderPlan> {
    let mut plan = FolderPlan::default();
    walk(session, root, "", 1, options, ctx, &mut plan)?;
    debug!(
        "Folder plan: {} folders, {} items",
        plan.folders.len(),
        plan.total_items
    );
    Ok(plan)
}

fn walk<S: MailStoreTrait + ?Sized>(
    session: &StoreSession<'_, S>,
    folder: &FolderHandle,
    parent_name: &str,
    depth: usize,
    options: WalkOptions<'_>,
    ctx: &RunContext,
    plan: &mut FolderPlan,
) -> Result<()> {
    ctx.check_cancelled()?;

    if options.excluded.contains(&folder.name) {
        debug!("Excluded folder: {}", folder.name);
        return Ok(());
    }

    plan.total_items += folder.item_count;
    if folder.item_count < options.size_limit {
        plan.folders.push(FolderEntry {
            name: folder.name.clone(),
            handle: folder.clone(),
            parent_name: parent_name.to_string(),
            item_count: folder.item_count,
            depth,
        });
    } else {
        info!(
            "{} ignored for performance reasons because it has {} items (limit {})",
            folder.name, folder.item_count, options.size_limit
        );
    }

    if !options.include_subfolders {
        return Ok(());
    }

    let children = session.call(|s| s.subfolders(&folder.id))?;
    for child in children.iter().filter(|c| c.message_class.is_mail()) {
        walk(session, child, &folder.name, depth + 1, options, ctx, plan)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::CancelToken;
    use crate::core::error::DedupError;
    use crate::store::snapshot::{FolderSnapshot, MessageSnapshot, SnapshotStore, StoreSnapshot};
    use crate::store::traits::MessageClass;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn messages(prefix: &str, count: usize) -> Vec<MessageSnapshot> {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        (0..count)
            .map(|i| MessageSnapshot::new(&format!("{}-{}", prefix, i), prefix, created, "x"))
            .collect()
    }

    fn tree() -> SnapshotStore {
        let inbox = FolderSnapshot::mail("inbox", "Inbox")
            .with_messages(messages("inbox", 5))
            .with_folders(vec![
                FolderSnapshot::mail("clients", "Clients").with_messages(messages("clients", 2)),
                FolderSnapshot::of_class("tasks", "Tasks", MessageClass::Task)
                    .with_messages(messages("tasks", 3)),
            ]);
        let archive = FolderSnapshot::mail("archive", "Archive")
            .with_messages(messages("archive", 4))
            .with_folders(vec![
                FolderSnapshot::mail("old", "Old").with_messages(messages("old", 1))
            ]);
        let calendar = FolderSnapshot::of_class("cal", "Calendar", MessageClass::Calendar)
            .with_messages(messages("cal", 7));
        SnapshotStore::new(StoreSnapshot::single_account(
            "me",
            vec![inbox, archive, calendar],
        ))
    }

    fn plan_for(
        store: &SnapshotStore,
        excluded: &[&str],
        include_subfolders: bool,
        size_limit: usize,
    ) -> Result<FolderPlan> {
        let excluded: HashSet<String> = excluded.iter().map(|s| s.to_string()).collect();
        let session = StoreSession::new(store);
        let root = store.root_folder("me")?;
        enumerate(
            &session,
            &root,
            WalkOptions {
                excluded: &excluded,
                include_subfolders,
                size_limit,
            },
            &RunContext::silent(),
        )
    }

    fn names(plan: &FolderPlan) -> Vec<&str> {
        plan.folders.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_depth_first_preorder_with_mail_classes_only() {
        let store = tree();
        let plan = plan_for(&store, &[], true, 20_000).unwrap();

        assert_eq!(names(&plan), vec!["me", "Inbox", "Clients", "Archive", "Old"]);
        let depths: Vec<_> = plan.folders.iter().map(|f| f.depth).collect();
        assert_eq!(depths, vec![1, 2, 3, 2, 3]);
        assert_eq!(plan.folders[2].parent_name, "Inbox");
        assert_eq!(plan.folders[0].parent_name, "");
        assert_eq!(plan.total_items, 5 + 2 + 4 + 1);
    }

    #[test]
    fn test_excluded_folder_skips_descendants() {
        let store = tree();
        let plan = plan_for(&store, &["Archive"], true, 20_000).unwrap();
        assert_eq!(names(&plan), vec!["me", "Inbox", "Clients"]);
        assert_eq!(plan.total_items, 7);
    }

    #[test]
    fn test_oversized_folder_still_recurses() {
        let store = tree();
        let plan = plan_for(&store, &[], true, 4).unwrap();

        assert_eq!(names(&plan), vec!["me", "Clients", "Old"]);
        assert_eq!(plan.total_items, 12);
    }

    #[test]
    fn test_without_subfolders_only_root() {
        let store = tree();
        let plan = plan_for(&store, &[], false, 20_000).unwrap();
        assert_eq!(names(&plan), vec!["me"]);
        assert_eq!(plan.total_items, 0);
    }

    #[test]
    fn test_cancelled_walk_aborts() {
        let store = tree();
        let session = StoreSession::new(&store);
        let root = store.root_folder("me").unwrap();
        let token = CancelToken::new();
        token.cancel();
        let ctx = RunContext::new(token, Arc::new(crate::core::context::NullProgress));
        let excluded = HashSet::new();

        let result = enumerate(
            &session,
            &root,
            WalkOptions {
                excluded: &excluded,
                include_subfolders: true,
                size_limit: 10,
            },
            &ctx,
        );
        assert_eq!(result, Err(DedupError::Aborted));
    }
}
