//! The current version of the stack trace schema.
//!
//! Field names map one to one onto the wire format, so a [`StackTrace`]
//! serialized by one process can be deserialized by any other consumer of the
//! schema.

use std::fmt;
use std::iter::FromIterator;
use std::num::ParseIntError;
use std::str;

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Placeholder used for file paths and function names that cannot be
/// symbolicated.
pub const UNKNOWN: &str = "unknown";

fn unknown() -> String {
    UNKNOWN.to_owned()
}

/// An error used when parsing an [`Addr`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseAddrError {
    /// The input was empty.
    #[error("empty address")]
    Empty,
    /// The input was not a decimal or `0x`-prefixed hexadecimal number.
    #[error("invalid address: {0}")]
    Invalid(#[from] ParseIntError),
}

/// Represents an address.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Addr(pub u64);

impl Addr {
    /// Returns `true` if this address is the null pointer.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl str::FromStr for Addr {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Addr, ParseAddrError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAddrError::Empty);
        }
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Addr(value))
    }
}

impl Serialize for Addr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Addr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Addr, D::Error> {
        struct AddrVisitor;

        impl<'de> de::Visitor<'de> for AddrVisitor {
            type Value = Addr;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "an unsigned integer or a hex string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Addr, E> {
                Ok(Addr(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Addr, E> {
                u64::try_from(value)
                    .map(Addr)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Addr, E> {
                value
                    .parse()
                    .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(AddrVisitor)
    }
}

impl From<u64> for Addr {
    fn from(addr: u64) -> Addr {
        Addr(addr)
    }
}

impl From<usize> for Addr {
    fn from(addr: usize) -> Addr {
        Addr(addr as u64)
    }
}

impl<T> From<*const T> for Addr {
    fn from(addr: *const T) -> Addr {
        Addr(addr as usize as u64)
    }
}

impl<T> From<*mut T> for Addr {
    fn from(addr: *mut T) -> Addr {
        Addr(addr as usize as u64)
    }
}

impl From<Addr> for u64 {
    fn from(addr: Addr) -> Self {
        addr.0
    }
}

/// Represents a single resolved frame of a stack trace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// The path of the source file, `"unknown"` if it could not be resolved.
    #[serde(default = "unknown")]
    pub file: String,
    /// The fully-qualified function name, `"unknown"` if it could not be
    /// resolved.
    #[serde(default = "unknown")]
    pub function: String,
    /// The line number, zero if unknown.
    #[serde(default)]
    pub line: u32,
    /// The program counter of the frame.
    #[serde(default)]
    pub program_counter: Addr,
    /// The entry address of the function containing the program counter,
    /// zero if unknown.
    #[serde(default)]
    pub function_entry: Addr,
}

impl Default for Frame {
    fn default() -> Frame {
        Frame {
            file: unknown(),
            function: unknown(),
            line: 0,
            program_counter: Addr::default(),
            function_entry: Addr::default(),
        }
    }
}

impl Frame {
    /// Creates a placeholder frame for an address that could not be resolved.
    pub fn unknown(program_counter: Addr, function_entry: Addr) -> Frame {
        Frame {
            program_counter,
            function_entry,
            ..Default::default()
        }
    }

    /// Returns `true` if neither the function nor the file could be resolved.
    pub fn is_unknown(&self) -> bool {
        self.function == UNKNOWN && self.file == UNKNOWN
    }
}

/// Represents a stack trace: resolved frames ordered from the innermost call
/// to the outermost one.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct StackTrace {
    /// The list of frames in the stack trace.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl StackTrace {
    /// Returns `true` if the stack trace holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Parses a stack trace from its JSON representation.
    pub fn from_json(json: &str) -> Result<StackTrace, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the stack trace into JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Vec<Frame>> for StackTrace {
    fn from(frames: Vec<Frame>) -> StackTrace {
        StackTrace { frames }
    }
}

impl From<StackTrace> for Vec<Frame> {
    fn from(trace: StackTrace) -> Vec<Frame> {
        trace.frames
    }
}

impl FromIterator<Frame> for StackTrace {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> StackTrace {
        StackTrace {
            frames: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StackTrace {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a StackTrace {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
