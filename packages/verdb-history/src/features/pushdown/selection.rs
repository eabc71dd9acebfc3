use std::collections::HashSet;
use verdb_storage::CommitHash;

use crate::features::commit_walk::WalkBound;

/// Commits a scan has to visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitSelection {
    /// No restriction; full walk
    All,
    /// Only these commits can produce matching rows
    Only(HashSet<CommitHash>),
    /// No commit can match; skip the walk entirely
    Nothing,
}

impl CommitSelection {
    pub fn only<I: IntoIterator<Item = CommitHash>>(hashes: I) -> Self {
        CommitSelection::Only(hashes.into_iter().collect())
    }

    pub fn is_restricted(&self) -> bool {
        !matches!(self, CommitSelection::All)
    }

    pub fn contains(&self, hash: &CommitHash) -> bool {
        match self {
            CommitSelection::All => true,
            CommitSelection::Only(set) => set.contains(hash),
            CommitSelection::Nothing => false,
        }
    }

    pub fn union(self, other: CommitSelection) -> CommitSelection {
        match (self, other) {
            (CommitSelection::All, _) | (_, CommitSelection::All) => CommitSelection::All,
            (CommitSelection::Nothing, s) | (s, CommitSelection::Nothing) => s,
            (CommitSelection::Only(mut a), CommitSelection::Only(b)) => {
                a.extend(b);
                CommitSelection::Only(a)
            }
        }
    }

    pub fn intersect(self, other: CommitSelection) -> CommitSelection {
        match (self, other) {
            (CommitSelection::Nothing, _) | (_, CommitSelection::Nothing) => CommitSelection::Nothing,
            (CommitSelection::All, s) | (s, CommitSelection::All) => s,
            (CommitSelection::Only(a), CommitSelection::Only(b)) => {
                let both: HashSet<_> = a.intersection(&b).cloned().collect();
                if both.is_empty() {
                    CommitSelection::Nothing
                } else {
                    CommitSelection::Only(both)
                }
            }
        }
    }

    /// Walk bound for this selection; `None` means no walk is needed
    pub fn to_walk_bound(&self) -> Option<WalkBound> {
        match self {
            CommitSelection::All => Some(WalkBound::Unbounded),
            CommitSelection::Only(set) if set.is_empty() => None,
            CommitSelection::Only(set) => Some(WalkBound::Commits(set.clone())),
            CommitSelection::Nothing => None,
        }
    }
}
