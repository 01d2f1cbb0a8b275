//! This crate provides the serializable stack trace schema used by the
//! stackchain crates.
//!
//! A stack trace crosses process and service boundaries as an ordered list of
//! resolved frames, innermost first.  Each frame carries the file path, the
//! fully-qualified function name, the line number and two addresses: the
//! program counter of the frame and the entry address of its function.
//!
//! # Examples
//!
//! ```
//! use stackchain_types::protocol::{Frame, StackTrace};
//!
//! let trace = StackTrace::from(vec![Frame {
//!     file: "/src/main.rs".into(),
//!     function: "app::main".into(),
//!     line: 12,
//!     ..Default::default()
//! }]);
//!
//! let json = trace.to_json().unwrap();
//! assert_eq!(StackTrace::from_json(&json).unwrap(), trace);
//! ```

#![warn(missing_docs)]

#[cfg(feature = "protocol")]
pub mod protocol;
