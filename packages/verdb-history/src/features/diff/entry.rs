use serde::{Deserialize, Serialize};
use std::fmt;
use verdb_storage::{Key, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

impl DiffKind {
    /// Value of the `diff_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::Modified => "modified",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed primary key between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    Added { key: Key, to: Row },
    Removed { key: Key, from: Row },
    Modified { key: Key, from: Row, to: Row },
}

impl DiffEntry {
    pub fn key(&self) -> &Key {
        match self {
            DiffEntry::Added { key, .. } | DiffEntry::Removed { key, .. } | DiffEntry::Modified { key, .. } => key,
        }
    }

    pub fn kind(&self) -> DiffKind {
        match self {
            DiffEntry::Added { .. } => DiffKind::Added,
            DiffEntry::Removed { .. } => DiffKind::Removed,
            DiffEntry::Modified { .. } => DiffKind::Modified,
        }
    }

    /// Row on the newer side, `None` for removals
    pub fn to_row(&self) -> Option<&Row> {
        match self {
            DiffEntry::Added { to, .. } | DiffEntry::Modified { to, .. } => Some(to),
            DiffEntry::Removed { .. } => None,
        }
    }

    /// Row on the older side, `None` for additions
    pub fn from_row(&self) -> Option<&Row> {
        match self {
            DiffEntry::Removed { from, .. } | DiffEntry::Modified { from, .. } => Some(from),
            DiffEntry::Added { .. } => None,
        }
    }
}

/// Change counts for one diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffStats {
    pub fn record(&mut self, kind: DiffKind) {
        match kind {
            DiffKind::Added => self.added += 1,
            DiffKind::Removed => self.removed += 1,
            DiffKind::Modified => self.modified += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }

    /// `+added ~modified -removed`
    pub fn summary(&self) -> String {
        format!("+{} ~{} -{}", self.added, self.modified, self.removed)
    }
}

impl<'a> FromIterator<&'a DiffEntry> for DiffStats {
    fn from_iter<I: IntoIterator<Item = &'a DiffEntry>>(iter: I) -> Self {
        let mut stats = DiffStats::default();
        for entry in iter {
            stats.record(entry.kind());
        }
        stats
    }
}
