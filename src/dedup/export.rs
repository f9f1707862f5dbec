//! Candidate table export
//!
//! Renders the candidate table as delimited text: CSV with RFC 4180 quoting
//! for files, tab-separated for the clipboard. Sizes are written in bytes so
//! an exported table can be read back with `parse_table`.

use crate::core::config::ExportFormat;
use crate::core::error::{DedupError, Result};
use crate::dedup::candidates::{CandidateSet, DeletionCandidate};
use std::fs;
use std::path::Path;

/// Column headers, in output order
pub const HEADERS: [&str; 9] = [
    "Include",
    "Folder",
    "Subject",
    "Date",
    "Topic",
    "Sender",
    "Size",
    "Superseding Folder",
    "Superseding Date",
];

/// Date format used in the table
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One displayed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub included: bool,
    pub folder: String,
    pub subject: String,
    pub date: String,
    pub topic: String,
    pub sender: String,
    pub size: u64,
    pub superseding_folder: String,
    pub superseding_date: String,
}

impl TableRow {
    /// Displayed values of a candidate
    pub fn from_candidate(c: &DeletionCandidate) -> Self {
        let (superseding_folder, superseding_date) = match &c.superseded_by {
            Some(s) => (s.folder_name.clone(), s.timestamp.format(DATE_FORMAT).to_string()),
            None => (String::new(), String::new()),
        };
        Self {
            included: c.included,
            folder: c.folder_name.clone(),
            subject: c.subject.clone(),
            date: c.timestamp.format(DATE_FORMAT).to_string(),
            topic: c.topic.clone(),
            sender: c
                .sender_name
                .clone()
                .or_else(|| c.sender_address.clone())
                .unwrap_or_default(),
            size: c.size,
            superseding_folder,
            superseding_date,
        }
    }

    fn fields(&self) -> [String; 9] {
        [
            if self.included { "Yes" } else { "No" }.to_string(),
            self.folder.clone(),
            self.subject.clone(),
            self.date.clone(),
            self.topic.clone(),
            self.sender.clone(),
            self.size.to_string(),
            self.superseding_folder.clone(),
            self.superseding_date.clone(),
        ]
    }

    fn from_fields(line: usize, fields: Vec<String>) -> Result<Self> {
        if fields.len() != HEADERS.len() {
            return Err(DedupError::InvalidTable {
                line,
                reason: format!("expected {} fields, found {}", HEADERS.len(), fields.len()),
            });
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();

        let included = match next().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => true,
            "no" | "false" | "0" => false,
            other => {
                return Err(DedupError::InvalidTable {
                    line,
                    reason: format!("invalid include flag '{}'", other),
                })
            }
        };
        let folder = next();
        let subject = next();
        let date = next();
        let topic = next();
        let sender = next();
        let size_text = next();
        let size = size_text.trim().parse().map_err(|_| DedupError::InvalidTable {
            line,
            reason: format!("invalid size '{}'", size_text),
        })?;

        Ok(Self {
            included,
            folder,
            subject,
            date,
            topic,
            sender,
            size,
            superseding_folder: next(),
            superseding_date: next(),
        })
    }
}

/// Rows of a candidate set, in display order
pub fn table_rows(set: &CandidateSet) -> Vec<TableRow> {
    set.candidates().iter().map(TableRow::from_candidate).collect()
}

/// Render the table, header line first
pub fn render_table(set: &CandidateSet, format: ExportFormat) -> String {
    let mut out = String::new();
    push_record(&mut out, HEADERS.iter().map(|h| h.to_string()), format);
    for row in table_rows(set) {
        push_record(&mut out, row.fields().into_iter(), format);
    }
    out
}

/// Write the rendered table to a file
pub fn write_table<P: AsRef<Path>>(path: P, set: &CandidateSet, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_table(set, format))
        .map_err(|e| DedupError::Io(format!("Failed to write '{}': {}", path.display(), e)))
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>, format: ExportFormat) {
    let delimiter = format.delimiter();
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        match format {
            ExportFormat::Csv => push_csv_field(out, &field),
            ExportFormat::Tsv => out.push_str(&sanitize_tsv_field(&field)),
        }
    }
    match format {
        ExportFormat::Csv => out.push_str("\r\n"),
        ExportFormat::Tsv => out.push('\n'),
    }
}

fn push_csv_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

fn sanitize_tsv_field(field: &str) -> String {
    field.replace(['\t', '\r', '\n'], " ")
}

/// Read back a rendered table; the header line is required
pub fn parse_table(text: &str, format: ExportFormat) -> Result<Vec<TableRow>> {
    let records = match format {
        ExportFormat::Csv => split_csv(text)?,
        ExportFormat::Tsv => text
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.split('\t').map(str::to_string).collect())
            .collect(),
    };

    let mut records = records.into_iter();
    match records.next() {
        Some(header) if header.iter().map(String::as_str).eq(HEADERS.iter().copied()) => {}
        _ => {
            return Err(DedupError::InvalidTable {
                line: 1,
                reason: "missing or unexpected header".to_string(),
            })
        }
    }

    records
        .enumerate()
        .map(|(i, fields)| TableRow::from_fields(i + 2, fields))
        .collect()
}

/// Split RFC 4180 text into records
fn split_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DedupError::InvalidTable {
            line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
