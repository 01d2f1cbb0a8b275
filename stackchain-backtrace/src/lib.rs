//! Stack capture and symbol utilities for stackchain.
//!
//! Capturing a stack with [`capture_frames`] only records instruction
//! pointers, which is cheap enough to do whenever an error is created.
//! Turning those into file names, function names and line numbers is done
//! later, and only when needed, with [`symbolize`].

#![deny(missing_docs)]

mod capture;
mod symbolize;
mod utils;

pub use crate::capture::{capture_frames, OpaqueFrame, INLINE_FRAMES};
pub use crate::symbolize::{symbolize, symbolize_frame, SymbolizeOptions};
pub use crate::utils::{demangle_symbol, filename, short_function_name, strip_symbol};
pub use stackchain_types::protocol::{Frame, StackTrace};
