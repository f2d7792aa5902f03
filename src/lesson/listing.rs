//! Folder listing filter.

use crate::storage::{EntryKind, FolderEntry};

/// Names of the entries of `kind`, in listing order.
pub fn names_of_kind(entries: &[FolderEntry], kind: EntryKind) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.tag == kind)
        .map(|entry| entry.name.clone())
        .collect()
}
