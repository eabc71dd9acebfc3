use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};
use verdb_storage::{Commit, CommitHash, CommitStore};

use crate::errors::{HistoryError, Result};

/// Commit enumeration order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkOrder {
    /// Follow first parents from the start commit
    #[default]
    FirstParent,
    /// Every reachable commit, newest timestamp first, ties by hash
    AllAncestors,
}

/// Early-stop condition for a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkBound {
    Unbounded,
    /// Yield only these commits; stop once all were yielded
    Commits(HashSet<CommitHash>),
    /// Stop after this many commits
    Limit(usize),
}

/// Frontier ordering key: newest first, then smallest hash
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    timestamp: chrono::DateTime<chrono::Utc>,
    hash: Reverse<CommitHash>,
}

enum Frontier {
    Chain(Option<CommitHash>),
    Heap {
        queue: BinaryHeap<Pending>,
        seen: HashSet<CommitHash>,
    },
}

/// Lazy, single-pass commit sequence
pub struct CommitWalker {
    store: Arc<dyn CommitStore>,
    frontier: Frontier,
    bound: WalkBound,
    yielded: usize,
    done: bool,
}

impl CommitWalker {
    pub fn new(store: Arc<dyn CommitStore>, start: CommitHash, bound: WalkBound, order: WalkOrder) -> Result<Self> {
        let frontier = match order {
            WalkOrder::FirstParent => Frontier::Chain(Some(start)),
            WalkOrder::AllAncestors => {
                let commit = store.read_commit(&start)?;
                let mut queue = BinaryHeap::new();
                let mut seen = HashSet::new();
                seen.insert(start.clone());
                queue.push(Pending {
                    timestamp: commit.meta.timestamp,
                    hash: Reverse(start),
                });
                Frontier::Heap { queue, seen }
            }
        };

        let done = matches!(&bound, WalkBound::Limit(0))
            || matches!(&bound, WalkBound::Commits(set) if set.is_empty());

        Ok(Self {
            store,
            frontier,
            bound,
            yielded: 0,
            done,
        })
    }

    /// Resolve `reference` first; unresolvable refs fail with `InvalidRef`
    pub fn from_ref(store: Arc<dyn CommitStore>, reference: &str, bound: WalkBound, order: WalkOrder) -> Result<Self> {
        let start = store
            .resolve_ref(reference)
            .map_err(|e| HistoryError::resolving(reference, e))?;
        Self::new(store, start, bound, order)
    }

    fn advance(&mut self) -> Result<Option<Commit>> {
        match &mut self.frontier {
            Frontier::Chain(next) => {
                let Some(hash) = next.take() else {
                    return Ok(None);
                };
                let commit = self.store.read_commit(&hash)?;
                *next = commit.first_parent().cloned();
                Ok(Some(commit))
            }
            Frontier::Heap { queue, seen } => {
                let Some(Pending { hash: Reverse(hash), .. }) = queue.pop() else {
                    return Ok(None);
                };
                let commit = self.store.read_commit(&hash)?;
                for parent in &commit.parents {
                    if seen.insert(parent.clone()) {
                        let parent_commit = self.store.read_commit(parent)?;
                        queue.push(Pending {
                            timestamp: parent_commit.meta.timestamp,
                            hash: Reverse(parent.clone()),
                        });
                    }
                }
                Ok(Some(commit))
            }
        }
    }

    fn accepts(&self, commit: &Commit) -> bool {
        match &self.bound {
            WalkBound::Commits(set) => set.contains(&commit.hash),
            _ => true,
        }
    }

    fn bound_reached(&self) -> bool {
        match &self.bound {
            WalkBound::Unbounded => false,
            WalkBound::Commits(set) => self.yielded >= set.len(),
            WalkBound::Limit(n) => self.yielded >= *n,
        }
    }
}

impl Iterator for CommitWalker {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.advance() {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(None) => {
                    debug!(yielded = self.yielded, "commit walk reached the root");
                    self.done = true;
                }
                Ok(Some(commit)) => {
                    if !self.accepts(&commit) {
                        trace!(commit = %commit.hash, "skipped by walk bound");
                        continue;
                    }
                    self.yielded += 1;
                    if self.bound_reached() {
                        debug!(yielded = self.yielded, "commit walk bound satisfied");
                        self.done = true;
                    }
                    return Some(Ok(commit));
                }
            }
        }
        None
    }
}

impl std::iter::FusedIterator for CommitWalker {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use verdb_storage::{CommitMeta, InMemoryRepository};

    fn meta(message: &str, minute: u32) -> CommitMeta {
        CommitMeta::new("Tester", "tester@example.com", message)
            .at(Utc.with_ymd_and_hms(2020, 1, 1, 0, minute, 0).unwrap())
    }

    /// init <- a <- b <- c on master
    fn linear() -> (Arc<InMemoryRepository>, Vec<CommitHash>) {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        let mut hashes = vec![repo.head().unwrap()];
        for (i, m) in ["a", "b", "c"].iter().enumerate() {
            hashes.push(repo.commit(meta(m, i as u32 + 1)).unwrap());
        }
        hashes.reverse();
        (Arc::new(repo), hashes)
    }

    fn collect(walker: CommitWalker) -> Vec<CommitHash> {
        walker.map(|c| c.unwrap().hash).collect()
    }

    #[test]
    fn test_first_parent_order() {
        let (repo, hashes) = linear();
        let walker = CommitWalker::from_ref(repo, "HEAD", WalkBound::Unbounded, WalkOrder::FirstParent).unwrap();
        assert_eq!(collect(walker), hashes);
    }

    #[test]
    fn test_limit_bound() {
        let (repo, hashes) = linear();
        let walker = CommitWalker::from_ref(repo, "head", WalkBound::Limit(2), WalkOrder::FirstParent).unwrap();
        assert_eq!(collect(walker), hashes[..2].to_vec());
    }

    #[test]
    fn test_commit_set_bound_keeps_walk_order() {
        let (repo, hashes) = linear();
        let wanted: HashSet<_> = [hashes[2].clone(), hashes[0].clone()].into_iter().collect();
        let walker = CommitWalker::from_ref(repo, "HEAD", WalkBound::Commits(wanted), WalkOrder::FirstParent).unwrap();
        assert_eq!(collect(walker), vec![hashes[0].clone(), hashes[2].clone()]);
    }

    #[test]
    fn test_empty_bound_yields_nothing() {
        let (repo, _) = linear();
        let walker = CommitWalker::from_ref(
            repo,
            "HEAD",
            WalkBound::Commits(HashSet::new()),
            WalkOrder::FirstParent,
        )
        .unwrap();
        assert_eq!(walker.count(), 0);
    }

    #[test]
    fn test_relative_start() {
        let (repo, hashes) = linear();
        let walker = CommitWalker::from_ref(repo, "HEAD~2", WalkBound::Unbounded, WalkOrder::FirstParent).unwrap();
        assert_eq!(collect(walker), hashes[2..].to_vec());
    }

    #[test]
    fn test_invalid_ref() {
        let (repo, _) = linear();
        let err = CommitWalker::from_ref(repo.clone(), "HEAD~9", WalkBound::Unbounded, WalkOrder::FirstParent)
            .err()
            .unwrap();
        assert!(matches!(err, HistoryError::InvalidRef { .. }));

        let err = CommitWalker::from_ref(repo, "HEAD~~x", WalkBound::Unbounded, WalkOrder::FirstParent)
            .err()
            .unwrap();
        assert!(matches!(err, HistoryError::InvalidRef { .. }));
    }

    #[test]
    fn test_all_ancestors_includes_merged_branch() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        let init = repo.head().unwrap();
        repo.create_branch("other").unwrap();
        let m1 = repo.commit(meta("m1", 1)).unwrap();
        repo.checkout("other").unwrap();
        let o1 = repo.commit(meta("o1", 2)).unwrap();
        repo.checkout("master").unwrap();
        let merge = repo.commit_merge("other", meta("merge", 3)).unwrap();
        let repo = Arc::new(repo);

        let first_parent = CommitWalker::from_ref(repo.clone(), "HEAD", WalkBound::Unbounded, WalkOrder::FirstParent).unwrap();
        assert_eq!(collect(first_parent), vec![merge.clone(), m1.clone(), init.clone()]);

        let all = CommitWalker::from_ref(repo, "HEAD", WalkBound::Unbounded, WalkOrder::AllAncestors).unwrap();
        assert_eq!(collect(all), vec![merge, o1, m1, init]);
    }

    #[test]
    fn test_all_ancestors_ties_break_by_hash() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_branch("other").unwrap();
        let a = repo.commit(meta("same time a", 5)).unwrap();
        repo.checkout("other").unwrap();
        let b = repo.commit(meta("same time b", 5)).unwrap();
        repo.checkout("master").unwrap();
        let merge = repo.commit_merge("other", meta("merge", 6)).unwrap();

        let all = CommitWalker::from_ref(Arc::new(repo), "HEAD", WalkBound::Unbounded, WalkOrder::AllAncestors).unwrap();
        let order = collect(all);
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        assert_eq!(order[..3].to_vec(), vec![merge, first, second]);
    }
}
