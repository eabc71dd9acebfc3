//! Commit reference syntax
//!
//! ```text
//! ref      := base step*
//! base     := "HEAD" (any case) | branch name | commit hash
//! step     := "~" digits? | "^" digits?
//! ```
//!
//! `~N` follows the first parent N times, `^N` selects the N-th parent
//! (`^0` is the commit itself). Missing digits mean 1.

use std::str::FromStr;

use super::models::CommitHash;
use super::ports::CommitStore;
use crate::error::{StorageError, StorageResult};

/// One ancestry step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestry {
    /// `~N`
    FirstParent(usize),
    /// `^N`
    Parent(usize),
}

/// Parsed reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    base: String,
    ancestry: Vec<Ancestry>,
}

impl RefSpec {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ancestry(&self) -> &[Ancestry] {
        &self.ancestry
    }

    pub fn is_head(&self) -> bool {
        self.base.eq_ignore_ascii_case("head")
    }
}

fn is_base_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.')
}

impl FromStr for RefSpec {
    type Err = StorageError;

    fn from_str(input: &str) -> StorageResult<Self> {
        let spec = input.trim();
        let invalid = |reason: &str| StorageError::invalid_ref(format!("'{}': {}", input, reason));

        let base_end = spec.find(['~', '^']).unwrap_or(spec.len());
        let base = &spec[..base_end];
        if base.is_empty() {
            return Err(invalid("empty reference"));
        }
        if let Some(bad) = base.chars().find(|c| !is_base_char(*c)) {
            return Err(invalid(&format!("unexpected character '{}'", bad)));
        }

        let mut ancestry = Vec::new();
        let mut rest = spec[base_end..].chars().peekable();
        while let Some(op) = rest.next() {
            let mut digits = String::new();
            while let Some(c) = rest.peek().copied().filter(char::is_ascii_digit) {
                digits.push(c);
                rest.next();
            }
            if let Some(&c) = rest.peek() {
                if c != '~' && c != '^' {
                    return Err(invalid(&format!("unexpected character '{}'", c)));
                }
            }
            let n = if digits.is_empty() {
                1
            } else {
                digits
                    .parse::<usize>()
                    .map_err(|_| invalid("ancestry count out of range"))?
            };
            ancestry.push(match op {
                '~' => Ancestry::FirstParent(n),
                _ => Ancestry::Parent(n),
            });
        }

        Ok(Self {
            base: base.to_string(),
            ancestry,
        })
    }
}

/// Resolve a reference expression to a concrete commit.
///
/// Unparsable syntax, unknown names and missing ancestors all fail with
/// `ErrorKind::InvalidRef`.
pub fn resolve_ref<S: CommitStore + ?Sized>(store: &S, spec: &str) -> StorageResult<CommitHash> {
    let parsed: RefSpec = spec.parse()?;
    let mut hash = resolve_base(store, &parsed)?;

    for step in parsed.ancestry() {
        match *step {
            Ancestry::FirstParent(n) => {
                for _ in 0..n {
                    let commit = store.read_commit(&hash)?;
                    hash = commit.first_parent().cloned().ok_or_else(|| {
                        StorageError::invalid_ref(format!(
                            "'{}': ancestor beyond root commit {}",
                            spec, commit.hash
                        ))
                    })?;
                }
            }
            Ancestry::Parent(0) => {}
            Ancestry::Parent(n) => {
                let commit = store.read_commit(&hash)?;
                hash = commit.parents.get(n - 1).cloned().ok_or_else(|| {
                    StorageError::invalid_ref(format!(
                        "'{}': commit {} has no parent #{}",
                        spec, commit.hash, n
                    ))
                })?;
            }
        }
    }

    Ok(hash)
}

fn resolve_base<S: CommitStore + ?Sized>(store: &S, spec: &RefSpec) -> StorageResult<CommitHash> {
    if spec.is_head() {
        return store.head();
    }
    if let Some(head) = store.branch_head(spec.base())? {
        return Ok(head);
    }
    if let Some(hash) = CommitHash::parse(spec.base()) {
        if store.contains_commit(&hash)? {
            return Ok(hash);
        }
    }
    Err(StorageError::invalid_ref(format!(
        "'{}': unknown branch or commit",
        spec.base()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_plain_names() {
        let spec: RefSpec = "HEAD".parse().unwrap();
        assert!(spec.is_head());
        assert!(spec.ancestry().is_empty());

        let spec: RefSpec = "feature/x".parse().unwrap();
        assert!(!spec.is_head());
        assert_eq!(spec.base(), "feature/x");
    }

    #[test]
    fn test_parse_ancestry() {
        let spec: RefSpec = "head~2^2~".parse().unwrap();
        assert!(spec.is_head());
        assert_eq!(
            spec.ancestry(),
            &[
                Ancestry::FirstParent(2),
                Ancestry::Parent(2),
                Ancestry::FirstParent(1)
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "~1", "head~x", "head~1a", "he ad", "head^^!", "ma$ter"] {
            let err = bad.parse::<RefSpec>().unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidRef, "input {:?}", bad);
        }
    }
}
