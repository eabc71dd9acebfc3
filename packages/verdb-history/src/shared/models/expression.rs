// Expression AST - filters over virtual table rows
//
// Serializable filter trees, as a host query engine would hand them over:
// - Column references, literals, HASHOF(ref)
// - Comparisons, IN / NOT IN
// - Boolean logic (and, or, not) with SQL three-valued semantics
// - Null checks

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use verdb_storage::{ColumnType, Value};

use super::function::FunctionContext;
use crate::errors::{HistoryError, Result};

/// Expression AST for filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Expr {
    // Column access
    Column(String),

    // Literals
    Literal(Value),

    // HASHOF(<ref expression>)
    HashOf(Box<Expr>),

    // Comparison operators
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Lte(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Gte(Box<Expr>, Box<Expr>),

    // Membership
    In(Box<Expr>, Vec<Expr>),
    NotIn(Box<Expr>, Vec<Expr>),

    // Boolean logic
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),

    // Null checks
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
}

/// Where column values come from during evaluation
pub trait ColumnSource {
    /// Table name used in error messages
    fn source_name(&self) -> &str;

    fn value_of(&self, column: &str) -> Option<&Value>;
}

/// Source with no columns, for constant expressions
struct NoColumns;

impl ColumnSource for NoColumns {
    fn source_name(&self) -> &str {
        "<constant>"
    }

    fn value_of(&self, _column: &str) -> Option<&Value> {
        None
    }
}

impl Expr {
    /// Evaluate to a value; predicates yield `Bool` or `Null` (unknown)
    pub fn eval(&self, row: &dyn ColumnSource, ctx: &dyn FunctionContext) -> Result<Value> {
        match self {
            Expr::Column(name) => {
                row.value_of(name)
                    .cloned()
                    .ok_or_else(|| HistoryError::UnknownColumn {
                        table: row.source_name().to_string(),
                        column: name.clone(),
                    })
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::HashOf(spec) => match spec.eval(row, ctx)? {
                Value::Null => Ok(Value::Null),
                Value::Text(s) => Ok(Value::Text(ctx.hash_of(&s)?.to_string())),
                other => Err(HistoryError::TypeMismatch(format!(
                    "HASHOF expects text, got {}",
                    other.type_name()
                ))),
            },
            Expr::Eq(l, r) => compare(l, r, row, ctx, |o| o == Ordering::Equal),
            Expr::Ne(l, r) => compare(l, r, row, ctx, |o| o != Ordering::Equal),
            Expr::Lt(l, r) => compare(l, r, row, ctx, |o| o == Ordering::Less),
            Expr::Lte(l, r) => compare(l, r, row, ctx, |o| o != Ordering::Greater),
            Expr::Gt(l, r) => compare(l, r, row, ctx, |o| o == Ordering::Greater),
            Expr::Gte(l, r) => compare(l, r, row, ctx, |o| o != Ordering::Less),
            Expr::In(needle, list) => membership(needle, list, row, ctx),
            Expr::NotIn(needle, list) => Ok(negate(membership(needle, list, row, ctx)?)),
            Expr::And(exprs) => {
                // false dominates, then unknown
                let mut unknown = false;
                for e in exprs {
                    match truth(e.eval(row, ctx)?)? {
                        Some(false) => return Ok(Value::Bool(false)),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                Ok(if unknown { Value::Null } else { Value::Bool(true) })
            }
            Expr::Or(exprs) => {
                let mut unknown = false;
                for e in exprs {
                    match truth(e.eval(row, ctx)?)? {
                        Some(true) => return Ok(Value::Bool(true)),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                Ok(if unknown { Value::Null } else { Value::Bool(false) })
            }
            Expr::Not(e) => Ok(negate(e.eval(row, ctx)?)),
            Expr::IsNull(e) => Ok(Value::Bool(e.eval(row, ctx)?.is_null())),
            Expr::IsNotNull(e) => Ok(Value::Bool(!e.eval(row, ctx)?.is_null())),
        }
    }

    /// Filter semantics: only a definite `true` keeps the row
    pub fn matches(&self, row: &dyn ColumnSource, ctx: &dyn FunctionContext) -> Result<bool> {
        Ok(truth(self.eval(row, ctx)?)? == Some(true))
    }

    /// Whether any column is referenced
    pub fn references_columns(&self) -> bool {
        !self.columns().is_empty()
    }

    /// Every column name referenced, in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                    out.push(name.as_str());
                }
            }
            Expr::Literal(_) => {}
            Expr::HashOf(e) | Expr::Not(e) | Expr::IsNull(e) | Expr::IsNotNull(e) => {
                e.collect_columns(out)
            }
            Expr::Eq(l, r)
            | Expr::Ne(l, r)
            | Expr::Lt(l, r)
            | Expr::Lte(l, r)
            | Expr::Gt(l, r)
            | Expr::Gte(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
            Expr::In(needle, list) | Expr::NotIn(needle, list) => {
                needle.collect_columns(out);
                list.iter().for_each(|e| e.collect_columns(out));
            }
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().for_each(|e| e.collect_columns(out)),
        }
    }

    /// Replace every column-free subtree by its value.
    ///
    /// This is where `HASHOF('head~1')` gets resolved, so a bad ref fails
    /// here, before any row is produced.
    pub fn fold_constants(&self, ctx: &dyn FunctionContext) -> Result<Expr> {
        if !self.references_columns() {
            return Ok(Expr::Literal(self.eval(&NoColumns, ctx)?));
        }

        let fold = |e: &Expr| e.fold_constants(ctx).map(Box::new);
        let fold_all = |es: &[Expr]| -> Result<Vec<Expr>> {
            es.iter().map(|e| e.fold_constants(ctx)).collect()
        };

        Ok(match self {
            Expr::Column(_) | Expr::Literal(_) => self.clone(),
            Expr::HashOf(e) => Expr::HashOf(fold(e)?),
            Expr::Eq(l, r) => Expr::Eq(fold(l)?, fold(r)?),
            Expr::Ne(l, r) => Expr::Ne(fold(l)?, fold(r)?),
            Expr::Lt(l, r) => Expr::Lt(fold(l)?, fold(r)?),
            Expr::Lte(l, r) => Expr::Lte(fold(l)?, fold(r)?),
            Expr::Gt(l, r) => Expr::Gt(fold(l)?, fold(r)?),
            Expr::Gte(l, r) => Expr::Gte(fold(l)?, fold(r)?),
            Expr::In(needle, list) => Expr::In(fold(needle)?, fold_all(list)?),
            Expr::NotIn(needle, list) => Expr::NotIn(fold(needle)?, fold_all(list)?),
            Expr::And(exprs) => Expr::And(fold_all(exprs)?),
            Expr::Or(exprs) => Expr::Or(fold_all(exprs)?),
            Expr::Not(e) => Expr::Not(fold(e)?),
            Expr::IsNull(e) => Expr::IsNull(fold(e)?),
            Expr::IsNotNull(e) => Expr::IsNotNull(fold(e)?),
        })
    }

    /// Reject comparisons between operands whose types never compare.
    ///
    /// Runs at plan time, so the error does not depend on which rows a scan
    /// happens to visit. `type_of` maps a column name to its declared type.
    pub fn check_types(&self, type_of: &dyn Fn(&str) -> Option<ColumnType>) -> Result<()> {
        match self {
            Expr::Column(_) | Expr::Literal(_) => Ok(()),
            Expr::HashOf(e) | Expr::Not(e) | Expr::IsNull(e) | Expr::IsNotNull(e) => {
                e.check_types(type_of)
            }
            Expr::Eq(l, r)
            | Expr::Ne(l, r)
            | Expr::Lt(l, r)
            | Expr::Lte(l, r)
            | Expr::Gt(l, r)
            | Expr::Gte(l, r) => {
                l.check_types(type_of)?;
                r.check_types(type_of)?;
                match (l.static_type(type_of), r.static_type(type_of)) {
                    (Some(a), Some(b)) if !types_comparable(a, b) => Err(
                        HistoryError::TypeMismatch(format!("cannot compare {} with {}", a, b)),
                    ),
                    _ => Ok(()),
                }
            }
            // membership skips incomparable items instead of failing
            Expr::In(needle, list) | Expr::NotIn(needle, list) => {
                needle.check_types(type_of)?;
                list.iter().try_for_each(|e| e.check_types(type_of))
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                exprs.iter().try_for_each(|e| e.check_types(type_of))
            }
        }
    }

    /// Type known without a row; `None` for NULL and predicates
    fn static_type(&self, type_of: &dyn Fn(&str) -> Option<ColumnType>) -> Option<ColumnType> {
        match self {
            Expr::Column(name) => type_of(name),
            Expr::Literal(value) => match value {
                Value::Null => None,
                Value::Bool(_) => Some(ColumnType::Bool),
                Value::Int(_) => Some(ColumnType::Int),
                Value::Float(_) => Some(ColumnType::Float),
                Value::Text(_) => Some(ColumnType::Text),
                Value::Bytes(_) => Some(ColumnType::Bytes),
                Value::Timestamp(_) => Some(ColumnType::Timestamp),
            },
            Expr::HashOf(_) => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// Column name if this is a bare column reference
    pub fn as_column(&self) -> Option<&str> {
        match self {
            Expr::Column(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }
}

fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_))
            | (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::Text(_), Value::Text(_))
            | (Value::Bytes(_), Value::Bytes(_))
            | (Value::Timestamp(_), Value::Timestamp(_))
    )
}

fn types_comparable(a: ColumnType, b: ColumnType) -> bool {
    let numeric = |t| matches!(t, ColumnType::Int | ColumnType::Float);
    a == b || (numeric(a) && numeric(b))
}

fn compare(
    left: &Expr,
    right: &Expr,
    row: &dyn ColumnSource,
    ctx: &dyn FunctionContext,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value> {
    let l = left.eval(row, ctx)?;
    let r = right.eval(row, ctx)?;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if !comparable(&l, &r) {
        return Err(HistoryError::TypeMismatch(format!(
            "cannot compare {} with {}",
            l.type_name(),
            r.type_name()
        )));
    }
    Ok(Value::Bool(test(l.cmp(&r))))
}

fn membership(
    needle: &Expr,
    list: &[Expr],
    row: &dyn ColumnSource,
    ctx: &dyn FunctionContext,
) -> Result<Value> {
    let value = needle.eval(row, ctx)?;
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mut saw_null = false;
    for item in list {
        let candidate = item.eval(row, ctx)?;
        if candidate.is_null() {
            saw_null = true;
        } else if comparable(&value, &candidate) && value == candidate {
            return Ok(Value::Bool(true));
        }
    }
    Ok(if saw_null { Value::Null } else { Value::Bool(false) })
}

fn truth(value: Value) -> Result<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => Err(HistoryError::TypeMismatch(format!(
            "expected boolean, got {}",
            other.type_name()
        ))),
    }
}

fn negate(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    }
}

/// Expression builder for ergonomic construction
pub struct ExprBuilder;

impl ExprBuilder {
    /// Create column reference
    pub fn column(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    /// Create literal value
    pub fn literal<T: Into<Value>>(value: T) -> Expr {
        Expr::Literal(value.into())
    }

    /// `HASHOF('<ref>')`
    pub fn hash_of(spec: &str) -> Expr {
        Expr::HashOf(Box::new(Expr::Literal(Value::Text(spec.to_string()))))
    }

    /// Equal comparison
    pub fn eq(column: &str, value: impl Into<Value>) -> Expr {
        Self::eq_expr(Self::column(column), Self::literal(value))
    }

    /// Not equal comparison
    pub fn ne(column: &str, value: impl Into<Value>) -> Expr {
        Self::ne_expr(Self::column(column), Self::literal(value))
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Expr {
        Expr::Lt(Box::new(Self::column(column)), Box::new(Self::literal(value)))
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Expr {
        Expr::Lte(Box::new(Self::column(column)), Box::new(Self::literal(value)))
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Expr {
        Expr::Gt(Box::new(Self::column(column)), Box::new(Self::literal(value)))
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Expr {
        Expr::Gte(Box::new(Self::column(column)), Box::new(Self::literal(value)))
    }

    pub fn eq_expr(left: Expr, right: Expr) -> Expr {
        Expr::Eq(Box::new(left), Box::new(right))
    }

    pub fn ne_expr(left: Expr, right: Expr) -> Expr {
        Expr::Ne(Box::new(left), Box::new(right))
    }

    /// `column IN (...)`
    pub fn in_list(column: &str, items: Vec<Expr>) -> Expr {
        Expr::In(Box::new(Self::column(column)), items)
    }

    /// `column NOT IN (...)`
    pub fn not_in(column: &str, items: Vec<Expr>) -> Expr {
        Expr::NotIn(Box::new(Self::column(column)), items)
    }

    /// Logical AND
    pub fn and(exprs: Vec<Expr>) -> Expr {
        Expr::And(exprs)
    }

    /// Logical OR
    pub fn or(exprs: Vec<Expr>) -> Expr {
        Expr::Or(exprs)
    }

    /// Logical NOT
    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    /// Is null check
    pub fn is_null(column: &str) -> Expr {
        Expr::IsNull(Box::new(Self::column(column)))
    }

    /// Is not null check
    pub fn is_not_null(column: &str) -> Expr {
        Expr::IsNotNull(Box::new(Self::column(column)))
    }
}
