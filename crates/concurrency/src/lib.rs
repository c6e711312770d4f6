//! Concurrency control for the RepCRec simulator: the Version Store (sites), the
//! Transaction Record, the SSI Validator, and the Coordinator that ties them together.
//!
//! See `repcrec-core` for the shared identity types this crate builds on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod manager;
pub mod site;
pub mod transaction;
pub mod validation;

pub use manager::{Coordinator, Event};
pub use site::{Site, SiteStatus};
pub use transaction::{Transaction, TransactionStatus};
pub use validation::{validate, AbortCause, ValidatorMode};
