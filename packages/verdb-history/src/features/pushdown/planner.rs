use std::sync::Arc;
use tracing::debug;
use verdb_storage::{CommitHash, CommitStore, Value};

use super::selection::CommitSelection;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::features::commit_walk::CommitWalker;
use crate::shared::models::{Expr, FunctionContext, PinnedRefs};

/// Plan the commit selection for `filter` against commit-hash `column`.
///
/// Constant subtrees are folded first, so `HASHOF(...)` is resolved here
/// and an unresolvable reference fails before any snapshot is read.
pub fn plan_commit_selection(
    filter: &Expr,
    column: &str,
    ctx: &dyn FunctionContext,
) -> Result<CommitSelection> {
    let folded = filter.fold_constants(ctx)?;
    let selection = classify(&folded, column);
    debug!(column, selection = ?selection, "planned commit selection");
    Ok(selection)
}

/// Walker for one scan from the pinned `head`, narrowed by `filter` on
/// `column` when pushdown is enabled. `None` when no commit can match.
pub fn plan_walk(
    store: &Arc<dyn CommitStore>,
    head: &CommitHash,
    filter: Option<&Expr>,
    column: &str,
    config: &EngineConfig,
) -> Result<Option<CommitWalker>> {
    let selection = match filter {
        Some(filter) if config.pushdown => {
            let refs = PinnedRefs::new(store.as_ref(), head.clone());
            plan_commit_selection(filter, column, &refs)?
        }
        _ => CommitSelection::All,
    };

    match selection.to_walk_bound() {
        Some(bound) => Ok(Some(CommitWalker::new(
            Arc::clone(store),
            head.clone(),
            bound,
            config.walk_order,
        )?)),
        None => {
            debug!(column, "no commit can match; skipping walk");
            Ok(None)
        }
    }
}

fn is_target(expr: &Expr, column: &str) -> bool {
    expr.as_column()
        .is_some_and(|name| name.eq_ignore_ascii_case(column))
}

/// Literal compared against the commit column, either side
fn equality_operand<'a>(left: &'a Expr, right: &'a Expr, column: &str) -> Option<&'a Value> {
    if is_target(left, column) {
        right.as_literal()
    } else if is_target(right, column) {
        left.as_literal()
    } else {
        None
    }
}

fn classify(expr: &Expr, column: &str) -> CommitSelection {
    match expr {
        Expr::Eq(l, r) => match equality_operand(l, r, column) {
            Some(Value::Text(hash)) => CommitSelection::only([CommitHash::new(hash.as_str())]),
            // `= NULL` is never true
            Some(Value::Null) => CommitSelection::Nothing,
            _ => CommitSelection::All,
        },
        Expr::In(needle, items) if is_target(needle, column) => {
            let mut hashes = Vec::with_capacity(items.len());
            for item in items {
                match item.as_literal() {
                    Some(Value::Text(hash)) => hashes.push(CommitHash::new(hash.as_str())),
                    Some(Value::Null) => {}
                    _ => return CommitSelection::All,
                }
            }
            if hashes.is_empty() {
                CommitSelection::Nothing
            } else {
                CommitSelection::only(hashes)
            }
        }
        // commit columns are never null
        Expr::IsNull(e) if is_target(e, column) => CommitSelection::Nothing,
        Expr::Or(branches) => branches
            .iter()
            .map(|b| classify(b, column))
            .try_fold(CommitSelection::Nothing, |acc, s| {
                if s.is_restricted() {
                    Some(acc.union(s))
                } else {
                    None
                }
            })
            .unwrap_or(CommitSelection::All),
        Expr::And(parts) => parts
            .iter()
            .map(|p| classify(p, column))
            .fold(CommitSelection::All, CommitSelection::intersect),
        _ => CommitSelection::All,
    }
}
