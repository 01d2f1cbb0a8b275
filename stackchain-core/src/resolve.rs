use stackchain_backtrace::{symbolize, OpaqueFrame, SymbolizeOptions};
use stackchain_types::protocol::Frame;

use crate::markers::{Boundary, Markers};
use crate::trace::{Repr, Trace};

/// Turns captured frames into resolved frames.
///
/// A resolver knows the launch markers of the binary and how symbols should
/// be cleaned up.  Every raw trace keeps a reference to the resolver of the
/// tracer that captured it.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    markers: Markers,
    symbols: SymbolizeOptions,
}

impl Resolver {
    /// Creates a resolver for the given markers.
    pub fn new(markers: Markers, symbols: SymbolizeOptions) -> Resolver {
        Resolver { markers, symbols }
    }

    /// The launch markers this resolver trims at.
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// How symbols are cleaned up.
    pub fn symbolize_options(&self) -> SymbolizeOptions {
        self.symbols
    }

    /// Resolves the whole chain of `trace` with this resolver, ignoring the
    /// resolvers and caches of the traces in the chain.
    pub fn resolve(&self, trace: &Trace) -> Vec<Frame> {
        resolve_chain(trace, Some(self))
    }

    /// Appends the frames of one capture to `out`.
    ///
    /// Frames of a launch entry marker and anything outside of it end the
    /// segment.  A launch exit marker drops everything this segment added so
    /// far.  Markers themselves are never appended.
    pub(crate) fn resolve_segment(&self, frames: &[OpaqueFrame], out: &mut Vec<Frame>) {
        let segment_start = out.len();
        let mut symbols = Vec::new();

        'frames: for &opaque in frames {
            symbols.clear();
            symbolize(opaque, self.symbols, |frame| symbols.push(frame));

            let physical = symbols.len().saturating_sub(1);
            for (index, frame) in symbols.drain(..).enumerate() {
                match self.markers.classify(opaque, &frame, index == physical) {
                    Some(Boundary::Entry) => break 'frames,
                    Some(Boundary::Exit) => out.truncate(segment_start),
                    None => out.push(frame),
                }
            }
        }
    }
}

/// Resolves the whole chain of `trace`, innermost frame first.
///
/// Every capture in the chain is resolved with the resolver of the tracer
/// that made it.  The walk ends early at a predecessor that is already
/// resolved or has its frames cached.
pub fn resolve(trace: &Trace) -> Vec<Frame> {
    resolve_chain(trace, None)
}

fn resolve_chain(trace: &Trace, resolver: Option<&Resolver>) -> Vec<Frame> {
    let mut out = Vec::new();
    let mut current = Some(trace);

    while let Some(segment) = current {
        match segment.repr {
            Repr::Resolved(ref frames) => {
                out.extend_from_slice(frames);
                break;
            }
            Repr::Raw(ref raw) => {
                if resolver.is_none() && !std::ptr::eq(segment, trace) {
                    if let Some(cached) = segment.cached_frames() {
                        out.extend_from_slice(cached);
                        break;
                    }
                }
                resolver
                    .unwrap_or(&raw.resolver)
                    .resolve_segment(&raw.frames, &mut out);
                current = raw.predecessor.as_deref();
            }
        }
    }

    out
}
