use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use stackchain_backtrace::OpaqueFrame;
use stackchain_types::protocol::{Frame, StackTrace};

use crate::format::DisplayFrames;
use crate::resolve::{resolve, Resolver};

/// A captured stack trace.
///
/// A trace is either raw, holding the unresolved frames of a capture plus the
/// trace of the launch site it continues from, or resolved, holding final
/// frames that were for instance deserialized from another process.  Raw
/// traces are resolved on first use of [`Trace::frames`] and the result is
/// cached, so resolving the same trace twice costs nothing.
///
/// Traces are immutable and cheap to share across threads behind an `Arc`.
///
/// # Examples
///
/// ```
/// use stackchain_core::{Carrier, Tracer};
///
/// let tracer = Tracer::default();
/// let trace = tracer.capture(&Carrier::new());
///
/// assert!(!trace.is_resolved());
/// println!("{trace:#}");
/// ```
#[derive(Clone)]
pub struct Trace {
    pub(crate) repr: Repr,
}

#[derive(Clone)]
pub(crate) enum Repr {
    Raw(RawTrace),
    Resolved(Vec<Frame>),
}

#[derive(Clone)]
pub(crate) struct RawTrace {
    pub(crate) frames: Box<[OpaqueFrame]>,
    pub(crate) predecessor: Option<Arc<Trace>>,
    pub(crate) resolver: Arc<Resolver>,
    pub(crate) resolved: OnceCell<Vec<Frame>>,
}

// Long launch chains would otherwise be dropped recursively.
impl Drop for RawTrace {
    fn drop(&mut self) {
        let mut next = self.predecessor.take();
        while let Some(trace) = next {
            next = match Arc::try_unwrap(trace) {
                Ok(Trace {
                    repr: Repr::Raw(mut raw),
                }) => raw.predecessor.take(),
                _ => None,
            };
        }
    }
}

impl Trace {
    pub(crate) fn raw(
        frames: Box<[OpaqueFrame]>,
        predecessor: Option<Arc<Trace>>,
        resolver: Arc<Resolver>,
    ) -> Trace {
        Trace {
            repr: Repr::Raw(RawTrace {
                frames,
                predecessor,
                resolver,
                resolved: OnceCell::new(),
            }),
        }
    }

    /// Creates a resolved trace from final frames, innermost first.
    pub fn from_frames(frames: Vec<Frame>) -> Trace {
        Trace {
            repr: Repr::Resolved(frames),
        }
    }

    /// Creates a resolved trace from its serialized form.
    pub fn from_serializable(stacktrace: StackTrace) -> Trace {
        Trace::from_frames(stacktrace.frames)
    }

    /// Creates a trace without any frames.
    pub fn empty() -> Trace {
        Trace::from_frames(Vec::new())
    }

    /// Returns `true` if the trace holds final frames rather than a capture.
    ///
    /// A raw trace stays raw after [`Trace::frames`] was called; only its
    /// cache is filled.
    pub fn is_resolved(&self) -> bool {
        matches!(self.repr, Repr::Resolved(_))
    }

    /// The unresolved frames of this capture, without predecessors.
    ///
    /// This is empty for resolved traces.
    pub fn opaque_frames(&self) -> &[OpaqueFrame] {
        match self.repr {
            Repr::Raw(ref raw) => &raw.frames,
            Repr::Resolved(_) => &[],
        }
    }

    /// The trace of the launch site this capture continues from.
    pub fn predecessor(&self) -> Option<&Trace> {
        match self.repr {
            Repr::Raw(ref raw) => raw.predecessor.as_deref(),
            Repr::Resolved(_) => None,
        }
    }

    /// The resolved frames of the whole chain, innermost first.
    ///
    /// The first call on a raw trace symbolizes the frames of this trace and
    /// all of its predecessors.  Later calls return the cached result.
    pub fn frames(&self) -> &[Frame] {
        match self.repr {
            Repr::Raw(ref raw) => raw.resolved.get_or_init(|| resolve(self)),
            Repr::Resolved(ref frames) => frames,
        }
    }

    /// Returns the frames if they are available without symbolizing.
    pub(crate) fn cached_frames(&self) -> Option<&[Frame]> {
        match self.repr {
            Repr::Raw(ref raw) => raw.resolved.get().map(Vec::as_slice),
            Repr::Resolved(ref frames) => Some(frames.as_slice()),
        }
    }

    /// Converts the trace into its serialized form, resolving it if needed.
    pub fn to_serializable(&self) -> StackTrace {
        StackTrace {
            frames: self.frames().to_vec(),
        }
    }

    /// Renders the trace, see [`format_frames`](crate::format_frames).
    pub fn format(&self, verbose: bool) -> String {
        DisplayFrames::new(self.frames(), verbose).to_string()
    }
}

impl Default for Trace {
    fn default() -> Trace {
        Trace::empty()
    }
}

impl From<StackTrace> for Trace {
    fn from(stacktrace: StackTrace) -> Trace {
        Trace::from_serializable(stacktrace)
    }
}

impl From<Vec<Frame>> for Trace {
    fn from(frames: Vec<Frame>) -> Trace {
        Trace::from_frames(frames)
    }
}

impl From<&Trace> for StackTrace {
    fn from(trace: &Trace) -> StackTrace {
        trace.to_serializable()
    }
}

/// `{}` renders the compact form and `{:#}` the verbose form.
impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&DisplayFrames::new(self.frames(), f.alternate()), f)
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Raw(ref raw) => f
                .debug_struct("Trace")
                .field("mode", &"raw")
                .field("frames", &raw.frames.len())
                .field("predecessor", &raw.predecessor)
                .field("resolved", &raw.resolved.get().map(Vec::len))
                .finish(),
            Repr::Resolved(ref frames) => f
                .debug_struct("Trace")
                .field("mode", &"resolved")
                .field("frames", &frames.len())
                .finish(),
        }
    }
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_serializable().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Trace, D::Error> {
        StackTrace::deserialize(deserializer).map(Trace::from_serializable)
    }
}
