//! Mail store access
//!
//! - `traits` - The `MailStoreTrait` interface and its data types
//! - `session` - Reconnect-and-retry wrapper used by the pipeline
//! - `snapshot` - JSON mailbox snapshot implementation

pub mod session;
pub mod snapshot;
pub mod traits;

pub use session::StoreSession;
pub use snapshot::{
    AccountSnapshot, AttachmentSnapshot, FolderSnapshot, MessageSnapshot, SnapshotStore,
    StoreSnapshot,
};
pub use traits::{
    AttachmentKind, AttachmentRef, BoxedMailStore, DefaultFolderKind, FolderHandle,
    MailStoreTrait, MessageClass, MessageHeader, StoreSimulationConfig,
};
