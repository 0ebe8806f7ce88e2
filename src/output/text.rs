//! Plain-text listing of duplicate groups.
//!
//! Each group is printed as a header followed by one line per file. The
//! marker in front of a file shows its selection state:
//!
//! ```text
//! Group 1: 2 copies of 1.0 KiB
//!   [keep] /photos/a.jpg
//!   [ x  ] /backup/a.jpg
//!
//! 2 duplicates in 1 group, 1.0 KiB reclaimable
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{DuplicateEntry, DuplicateGroup};

/// Text formatter over a snapshot of groups.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> TextOutput<'a> {
    /// Create a formatter for `groups`.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write every group and a closing summary line.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.groups {
            writeln!(
                writer,
                "Group {}: {} copies of {}",
                group.number(),
                group.len(),
                ByteSize::b(group.size())
            )?;
            for entry in group.entries() {
                writeln!(writer, "  {} {}", marker(entry), entry.path().display())?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "{}", self.summary_line())
    }

    /// The "N duplicates in M groups" line.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let files: usize = self.groups.iter().map(DuplicateGroup::len).sum();
        let wasted: u64 = self.groups.iter().map(DuplicateGroup::wasted_bytes).sum();
        format!(
            "{} duplicates in {} group{}, {} reclaimable",
            files,
            self.groups.len(),
            if self.groups.len() == 1 { "" } else { "s" },
            ByteSize::b(wasted)
        )
    }
}

fn marker(entry: &DuplicateEntry) -> &'static str {
    if entry.is_kept() {
        "[keep]"
    } else if entry.is_checked() {
        "[ x  ]"
    } else {
        "[    ]"
    }
}
