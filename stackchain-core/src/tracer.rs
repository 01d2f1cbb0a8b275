use std::sync::Arc;

use once_cell::sync::Lazy;
use stackchain_backtrace::capture_frames;

use crate::markers::Markers;
use crate::resolve::Resolver;
use crate::{Carrier, Trace, TracerOptions};

static GLOBAL: Lazy<Tracer> = Lazy::new(Tracer::default);

/// Captures traces and launches threads and tasks that continue them.
///
/// Creating a tracer finds out how the launch markers look in the running
/// binary, which symbolizes a few frames.  Tracers are meant to be created
/// once and cloned, which is cheap.  [`Tracer::global`] returns a shared
/// tracer with default options.
#[derive(Clone, Debug)]
pub struct Tracer {
    options: Arc<TracerOptions>,
    resolver: Arc<Resolver>,
}

impl Tracer {
    /// Creates a new tracer with the given options.
    pub fn new(options: TracerOptions) -> Tracer {
        let symbols = options.symbolize_options();
        let markers = Markers::detect(symbols);

        stackchain_debug!(
            options,
            "launch markers: entry={:?} task_entry={:?} exit={:?}",
            markers.entry,
            markers.task_entry,
            markers.exit
        );
        if !markers.is_complete() {
            stackchain_debug!(
                options,
                "not all launch markers were found, launched traces may contain runtime frames"
            );
        }

        Tracer {
            options: Arc::new(options),
            resolver: Arc::new(Resolver::new(markers, symbols)),
        }
    }

    /// Returns the shared tracer with default options.
    pub fn global() -> &'static Tracer {
        &GLOBAL
    }

    /// The options of this tracer.
    pub fn options(&self) -> &TracerOptions {
        &self.options
    }

    /// The launch markers found when this tracer was created.
    pub fn markers(&self) -> &Markers {
        self.resolver.markers()
    }

    /// The resolver given to every trace this tracer captures.
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Captures the stack of the caller.
    ///
    /// The first frame of the trace is the function calling this method.  If
    /// `carrier` holds the trace of a launch site, the new trace continues
    /// from it.  Capturing only records addresses; symbols are looked up
    /// when the trace is first resolved.
    #[inline(never)]
    pub fn capture(&self, carrier: &Carrier) -> Trace {
        let frames = capture_frames(1);
        Trace::raw(frames, carrier.predecessor(), self.resolver.clone())
    }

    /// Captures the stack of the caller, leaving out `skip` more frames.
    ///
    /// This is meant for helpers that capture on behalf of their caller:
    /// with a `skip` of one, the first frame is the caller's caller.
    #[inline(never)]
    pub fn capture_with_skip(&self, carrier: &Carrier, skip: usize) -> Trace {
        let frames = capture_frames(skip + 1);
        Trace::raw(frames, carrier.predecessor(), self.resolver.clone())
    }
}

impl Default for Tracer {
    fn default() -> Tracer {
        Tracer::new(TracerOptions::default())
    }
}
