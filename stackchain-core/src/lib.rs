//! This crate captures stack traces that survive thread and task launches.
//!
//! A regular stack trace taken inside a spawned thread or task ends at the
//! thread runtime or executor, and the code that launched the work is lost.
//! `stackchain-core` keeps the trace of every launch site and stitches it to
//! the traces captured inside the launched unit, so that a capture deep down
//! in a grandchild task still shows the whole logical call chain.
//!
//! # Core Concepts
//!
//! - A [`Tracer`] captures [`Trace`]s and launches threads and tasks.
//! - A [`Carrier`] is passed along a call chain, explicitly, and transports
//!   the trace of the last launch site into the launched unit.
//! - A [`Trace`] only records addresses when it is captured.  It is resolved
//!   into [`Frame`](protocol::Frame)s on first use, and rendered with
//!   [`Display`](std::fmt::Display) or [`format_frames`].
//!
//! ```rust
//! use stackchain_core::{Carrier, Tracer};
//!
//! let tracer = Tracer::default();
//! let worker = tracer.clone();
//!
//! let handle = tracer
//!     .launch(&Carrier::new(), move |carrier| {
//!         let trace = worker.capture(&carrier);
//!         // the frames of the launching code follow the thread's own frames
//!         println!("{trace}");
//!     })
//!     .unwrap();
//! handle.join().unwrap();
//! ```
//!
//! Traces can be sent to other processes in their serialized form,
//! [`protocol::StackTrace`], and continued there with
//! [`Carrier::with_trace`].
//!
//! # Features
//!
//! - `feature = "tokio"` (default): Activates [`Tracer::launch_task`], which
//!   spawns a task on the current tokio runtime.  Without it, futures can
//!   still be wrapped for any executor with [`Tracer::wrap_task`].

#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
mod macros;

mod carrier;
mod format;
mod futures;
mod launch;
mod markers;
mod options;
mod resolve;
mod trace;
mod tracer;

// public api or exports from this crate
pub use crate::carrier::Carrier;
pub use crate::format::{format_frames, DisplayFrames, NO_STACK_TRACE};
pub use crate::futures::LaunchedTask;
pub use crate::markers::{Boundary, MarkerIdentity, Markers};
pub use crate::options::TracerOptions;
pub use crate::resolve::{resolve, Resolver};
pub use crate::trace::Trace;
pub use crate::tracer::Tracer;

// public api from other crates
pub use stackchain_backtrace::{OpaqueFrame, SymbolizeOptions};
#[doc(inline)]
pub use stackchain_types as types;
pub use stackchain_types::protocol::latest as protocol;
