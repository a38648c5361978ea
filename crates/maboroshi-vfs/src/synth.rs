//! Directory synthesis.
//!
//! A synthesized directory listing is derived, not stored: it is computed
//! from the set of registered generator paths sharing the directory as a
//! prefix, merged with any entries the owning directory generator declared
//! explicitly. Listings are always sorted by name; consumers diff them.

use crate::index::ChildSummary;
use crate::types::{DirEntry, FileType};

/// Build listing entries from immediate-child registration summaries.
///
/// Shape rules:
/// - a terminal file generator is a file
/// - a terminal serve generator with nothing registered below it is a file;
///   with registered descendants it is a directory
/// - a directory generator, or any segment with registrations below it,
///   is a directory
pub(crate) fn entries_from_children(children: &[ChildSummary]) -> Vec<DirEntry> {
    children
        .iter()
        .map(|child| {
            let kind = match child.kind {
                Some(crate::generator::GeneratorKind::File) => FileType::File,
                Some(crate::generator::GeneratorKind::Serve) if !child.has_descendants => {
                    FileType::File
                }
                _ => FileType::Directory,
            };
            DirEntry::new(child.name.clone(), kind)
        })
        .collect()
}

/// Merge two entry sets, de-duplicating by name with `primary` winning,
/// and return them sorted by name.
pub(crate) fn merge_entries(primary: Vec<DirEntry>, secondary: Vec<DirEntry>) -> Vec<DirEntry> {
    let mut entries = primary;
    for entry in secondary {
        if !entries.iter().any(|e| e.name == entry.name) {
            entries.push(entry);
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
