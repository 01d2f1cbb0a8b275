//! This module exposes the types for the stack trace schema in different versions.

pub mod v1;

pub use self::v1::*;

/// The latest version of the schema.
pub const LATEST: u16 = 1;

/// The always latest schema version.
pub mod latest {
    pub use super::v1::*;
}
