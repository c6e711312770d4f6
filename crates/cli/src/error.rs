//! The CLI's own error type: wraps [`CoordinatorError`] with the I/O failures that can
//! only happen at this layer (missing input file, unreadable stdin).

use std::io;

use repcrec_core::CoordinatorError;
use thiserror::Error;

/// Everything that can end a `repcrec` run early.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input script could not be opened or read.
    #[error("cannot read input: {0}")]
    Io(#[from] io::Error),

    /// A command in the input stream was rejected; `spec.md` section 7.1 treats input
    /// errors as fatal to the whole run.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
