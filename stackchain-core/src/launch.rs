//! Launching threads and tasks that continue the trace of their launcher.
//!
//! The marker functions in this module leave recognizable frames in captured
//! stacks.  The resolver cuts a launched unit's stack at the entry markers
//! and a launch trace at the exit marker, so none of them is ever visible in
//! resolved output.

use std::future::Future;
use std::hint::black_box;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use stackchain_backtrace::{capture_frames, OpaqueFrame};

use crate::futures::LaunchedTask;
use crate::{Carrier, Trace, Tracer};

/// Runs the body of a launched thread.
///
/// Everything outside of this frame belongs to the thread runtime.
#[inline(never)]
pub(crate) fn launch_entry<F>(body: F, carrier: Carrier)
where
    F: FnOnce(Carrier),
{
    body(carrier);
    black_box(());
}

/// Polls the future of a launched task.
///
/// Everything outside of this frame belongs to the executor.
#[inline(never)]
pub(crate) fn launch_entry_poll<F>(future: Pin<&mut F>, cx: &mut Context<'_>) -> Poll<F::Output>
where
    F: Future + ?Sized,
{
    black_box(future.poll(cx))
}

/// Captures the stack of a launch site.
///
/// The returned frames start with this function.
#[inline(never)]
pub(crate) fn launch_exit() -> Box<[OpaqueFrame]> {
    black_box(capture_frames(0))
}

impl Tracer {
    /// Spawns a thread that continues the trace of the caller.
    ///
    /// `body` receives a carrier derived from `carrier` that holds the trace
    /// of this call site.  Traces captured with that carrier inside of the
    /// thread resolve to the thread's own frames followed by the frames of
    /// this launch site, as if `body` had been called directly.
    ///
    /// This never blocks.  An error is returned if the thread could not be
    /// spawned.
    ///
    /// # Examples
    ///
    /// ```
    /// use stackchain_core::{Carrier, Tracer};
    ///
    /// let tracer = Tracer::default();
    /// let worker = tracer.clone();
    /// let handle = tracer
    ///     .launch(&Carrier::new(), move |carrier| {
    ///         let trace = worker.capture(&carrier);
    ///         assert!(trace.predecessor().is_some());
    ///     })
    ///     .unwrap();
    /// handle.join().unwrap();
    /// ```
    pub fn launch<F>(&self, carrier: &Carrier, body: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce(Carrier) + Send + 'static,
    {
        let frames = launch_exit();
        let carrier = self.launch_carrier(carrier, frames);

        let mut builder = thread::Builder::new();
        if let Some(ref name) = self.options().thread_name {
            builder = builder.name(name.to_string());
        }
        stackchain_debug!(self.options(), "launching thread from {:?}", carrier);
        builder.spawn(move || launch_entry(body, carrier))
    }

    /// Wraps a future so that it continues the trace of the caller.
    ///
    /// `body` is called right away with a carrier derived from `carrier` that
    /// holds the trace of this call site, and the future it returns can be
    /// handed to any executor.  Traces captured with that carrier while the
    /// future is polled resolve to the future's own frames followed by the
    /// frames of this call site.
    pub fn wrap_task<F, Fut>(&self, carrier: &Carrier, body: F) -> LaunchedTask<Fut>
    where
        F: FnOnce(Carrier) -> Fut,
        Fut: Future,
    {
        let frames = launch_exit();
        LaunchedTask::new(body(self.launch_carrier(carrier, frames)))
    }

    /// Spawns a task on the current tokio runtime that continues the trace
    /// of the caller.
    ///
    /// This behaves like [`Tracer::wrap_task`] followed by
    /// [`tokio::task::spawn`], and panics like the latter when called
    /// outside of a runtime.
    #[cfg(feature = "tokio")]
    pub fn launch_task<F, Fut>(&self, carrier: &Carrier, body: F) -> tokio::task::JoinHandle<Fut::Output>
    where
        F: FnOnce(Carrier) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let frames = launch_exit();
        let carrier = self.launch_carrier(carrier, frames);
        stackchain_debug!(self.options(), "launching task from {:?}", carrier);
        tokio::task::spawn(LaunchedTask::new(body(carrier)))
    }

    fn launch_carrier(&self, carrier: &Carrier, frames: Box<[OpaqueFrame]>) -> Carrier {
        let trace = Trace::raw(frames, carrier.predecessor(), self.resolver().clone());
        carrier.with_launch_trace(Arc::new(trace))
    }
}
