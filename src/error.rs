//! Crate-wide error type.
//!
//! Every primitive in this crate reports precondition violations the same
//! way: as [`Error::Internal`]. There is no I/O and no parser here, so the
//! `File`/`Syntax` kinds that exist elsewhere in the wider simulator core
//! error taxonomy do not apply to this crate and are not reintroduced.

/// Errors produced at the boundary of this crate.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A precondition was violated (invalid argument, bad handle state).
    #[error("precondition violated: {0}")]
    Internal(&'static str),
}
