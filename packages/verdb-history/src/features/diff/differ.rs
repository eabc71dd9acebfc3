use std::cmp::Ordering;
use std::iter::FusedIterator;

use super::entry::DiffEntry;
use crate::errors::{HistoryError, Result};
use crate::features::snapshot::{schemas_compatible, TableSnapshot};

/// Lazy merge-walk over two snapshots, in ascending key order
#[derive(Debug, Clone)]
pub struct SnapshotDiff {
    from: TableSnapshot,
    to: TableSnapshot,
    i: usize,
    j: usize,
}

impl SnapshotDiff {
    pub fn from_snapshot(&self) -> &TableSnapshot {
        &self.from
    }

    pub fn to_snapshot(&self) -> &TableSnapshot {
        &self.to
    }
}

/// Diff `from` (older) against `to` (newer).
///
/// Fails with `SchemaMismatch` when both sides have the table with
/// different columns; an absent side counts as an empty table.
pub fn diff_snapshots(from: &TableSnapshot, to: &TableSnapshot, table: &str) -> Result<SnapshotDiff> {
    if let (Some(a), Some(b)) = (from.schema(), to.schema()) {
        if !schemas_compatible(a, b) {
            return Err(HistoryError::SchemaMismatch {
                table: table.to_string(),
                from: from.label(),
                to: to.label(),
            });
        }
    }
    Ok(SnapshotDiff {
        from: from.clone(),
        to: to.clone(),
        i: 0,
        j: 0,
    })
}

impl Iterator for SnapshotDiff {
    type Item = DiffEntry;

    fn next(&mut self) -> Option<DiffEntry> {
        loop {
            match (self.from.get(self.i), self.to.get(self.j)) {
                (None, None) => return None,
                (Some((key, row)), None) => {
                    self.i += 1;
                    return Some(DiffEntry::Removed {
                        key: key.clone(),
                        from: row.clone(),
                    });
                }
                (None, Some((key, row))) => {
                    self.j += 1;
                    return Some(DiffEntry::Added {
                        key: key.clone(),
                        to: row.clone(),
                    });
                }
                (Some((fk, fr)), Some((tk, tr))) => match fk.cmp(tk) {
                    Ordering::Less => {
                        self.i += 1;
                        return Some(DiffEntry::Removed {
                            key: fk.clone(),
                            from: fr.clone(),
                        });
                    }
                    Ordering::Greater => {
                        self.j += 1;
                        return Some(DiffEntry::Added {
                            key: tk.clone(),
                            to: tr.clone(),
                        });
                    }
                    Ordering::Equal => {
                        self.i += 1;
                        self.j += 1;
                        if fr != tr {
                            return Some(DiffEntry::Modified {
                                key: tk.clone(),
                                from: fr.clone(),
                                to: tr.clone(),
                            });
                        }
                    }
                },
            }
        }
    }
}

impl FusedIterator for SnapshotDiff {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::diff::{DiffKind, DiffStats};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use verdb_storage::{Column, ColumnType, CommitHash, TableRoot, TableSchema, Value};

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("c0", ColumnType::Int),
        ])
        .unwrap()
    }

    fn snapshot(commit: &str, rows: &[(i64, i64)]) -> TableSnapshot {
        let root = TableRoot {
            schema: schema(),
            rows: rows
                .iter()
                .map(|(k, v)| vec![Value::Int(*k), Value::Int(*v)])
                .collect(),
        };
        TableSnapshot::from_root(CommitHash::new(commit), &root)
    }

    #[test]
    fn test_classifies_changes() {
        let from = snapshot("a", &[(0, 0), (1, 1), (2, 2)]);
        let to = snapshot("b", &[(1, 1), (2, 20), (3, 3)]);

        let entries: Vec<_> = diff_snapshots(&from, &to, "t").unwrap().collect();
        let kinds: Vec<_> = entries.iter().map(|e| (e.key()[0].clone(), e.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                (Value::Int(0), DiffKind::Removed),
                (Value::Int(2), DiffKind::Modified),
                (Value::Int(3), DiffKind::Added),
            ]
        );

        let stats: DiffStats = entries.iter().collect();
        assert_eq!(stats.summary(), "+1 ~1 -1");
    }

    #[test]
    fn test_absent_side_is_empty() {
        let to = snapshot("b", &[(0, 0), (1, 1)]);
        let entries: Vec<_> = diff_snapshots(&TableSnapshot::empty(None), &to, "t")
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind() == DiffKind::Added && e.from_row().is_none()));
    }

    #[test]
    fn test_identical_snapshots_produce_nothing() {
        let a = snapshot("a", &[(0, 0), (1, 1)]);
        let b = snapshot("b", &[(0, 0), (1, 1)]);
        assert_eq!(diff_snapshots(&a, &b, "t").unwrap().count(), 0);
    }

    #[test]
    fn test_schema_mismatch() {
        let from = snapshot("a", &[(0, 0)]);
        let other = TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("c0", ColumnType::Text),
        ])
        .unwrap();
        let to = TableSnapshot::from_root(
            CommitHash::new("b"),
            &TableRoot {
                schema: other,
                rows: vec![],
            },
        );
        let err = diff_snapshots(&from, &to, "t").unwrap_err();
        assert!(matches!(err, HistoryError::SchemaMismatch { ref table, .. } if table == "t"));
    }

    proptest! {
        /// Every key in either snapshot appears at most once, and exactly
        /// the keys whose rows differ appear at all.
        #[test]
        fn prop_diff_partitions_keys(
            from in prop::collection::btree_map(0i64..40, 0i64..4, 0..30),
            to in prop::collection::btree_map(0i64..40, 0i64..4, 0..30),
        ) {
            let a = snapshot("a", &from.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>());
            let b = snapshot("b", &to.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>());
            let entries: Vec<_> = diff_snapshots(&a, &b, "t").unwrap().collect();

            let mut expected = BTreeMap::new();
            for (k, v) in &from {
                match to.get(k) {
                    None => { expected.insert(*k, DiffKind::Removed); }
                    Some(w) if w != v => { expected.insert(*k, DiffKind::Modified); }
                    Some(_) => {}
                }
            }
            for k in to.keys() {
                if !from.contains_key(k) {
                    expected.insert(*k, DiffKind::Added);
                }
            }

            let actual: Vec<_> = entries
                .iter()
                .map(|e| (e.key()[0].as_i64().unwrap(), e.kind()))
                .collect();
            prop_assert_eq!(actual, expected.into_iter().collect::<Vec<_>>());
        }
    }
}
