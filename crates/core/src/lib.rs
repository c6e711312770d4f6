//! Core vocabulary for the RepCRec coordinator.
//!
//! This crate defines the foundational types shared by `repcrec-concurrency` and
//! `repcrec-cli`: variable and site identity, the logical clock, the signed-integer
//! value type, the commit-history sentinel, and the unified error type. It holds no
//! control flow — see `repcrec-concurrency` for the Version Store, Transaction Record,
//! Coordinator, and SSI Validator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{CoordinatorError, CoordinatorResult};
pub use types::{LogicalTime, SiteId, Slot, Value, VariableId};
