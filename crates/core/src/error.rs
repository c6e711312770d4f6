//! Unified error type for the coordinator.
//!
//! `spec.md` section 7 names four error kinds: input errors (fatal to the run),
//! semantic errors (logged, run continues), read unavailability, and commit-time
//! aborts. The latter two are ordinarily surfaced as transaction state (an `T aborts`
//! event), not as a `Result::Err` — `CoordinatorError` exists for the first two kinds,
//! plus the handful of programming-level misuses (unknown transaction id) that the
//! spec assumes away but a real command stream can still produce.
//!
//! Modeled after the teacher's `StrataError`: one flat enum, grouped by concern, with
//! classification predicates so callers (here, just `repcrec-cli`) can decide exit
//! codes without matching on every variant.

use thiserror::Error;

/// Everything that can go wrong processing one command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    // -- Input errors (spec.md 7.1): malformed line, unknown command -----------------
    /// A command line didn't parse: wrong arity, non-integer value, unbalanced parens.
    #[error("malformed command `{line}`: {reason}")]
    MalformedCommand {
        /// The offending line, verbatim.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The leading token wasn't one of `begin`/`R`/`W`/`end`/`fail`/`recover`/`dump`.
    #[error("unknown command `{command}`")]
    UnknownCommand {
        /// The unrecognized leading token.
        command: String,
    },

    // -- Semantic errors (spec.md 7.2): continue with next command -------------------
    /// `begin(T)` named a transaction id already present in the transaction table.
    #[error("transaction {txn} already exists")]
    DuplicateTransaction {
        /// The duplicate id.
        txn: String,
    },

    /// `fail`/`recover` named a site outside `1..=10`.
    #[error("site {id} is out of range (expected 1..=10)")]
    InvalidSite {
        /// The out-of-range value as given (may be negative or > 10).
        id: i64,
    },

    /// A command named a variable outside `x1..=x20` or with a malformed name.
    #[error("variable `{name}` is not one of x1..x20")]
    InvalidVariable {
        /// The offending variable name, verbatim.
        name: String,
    },

    /// `R`/`W`/`end` named a transaction id not present in the transaction table.
    #[error("transaction {txn} is not known")]
    UnknownTransaction {
        /// The unknown id.
        txn: String,
    },
}

impl CoordinatorError {
    /// True for section 7.1 input errors: the caller should abort the whole run.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::MalformedCommand { .. } | Self::UnknownCommand { .. })
    }

    /// True for section 7.2 semantic errors: the caller should log and continue.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTransaction { .. }
                | Self::InvalidSite { .. }
                | Self::InvalidVariable { .. }
                | Self::UnknownTransaction { .. }
        )
    }
}

/// Convenience alias used throughout the coordinator.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
