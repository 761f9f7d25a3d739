//! Quarantine of confirmed duplicates.
//!
//! - [`naming`]: collision-free flat names inside the quarantine directory
//! - [`mover`]: verified, rollback-safe moves with a cross-filesystem fallback

pub mod mover;
pub mod naming;

pub use mover::{BatchMoveResult, MoveConfig, MoveError, MovedFile, QuarantineMover};
pub use naming::unique_destination;

/// Name of the quarantine directory created directly under the scanned root.
pub const QUARANTINE_DIR_NAME: &str = "Quarantined";
