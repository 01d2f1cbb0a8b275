use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::launch::launch_entry_poll;

/// A future that continues the trace of the code that created it.
///
/// Created by [`Tracer::wrap_task`](crate::Tracer::wrap_task).  Frames of the
/// executor polling this future are cut from traces captured inside of it.
#[pin_project::pin_project]
#[derive(Debug)]
pub struct LaunchedTask<Fut> {
    #[pin]
    future: Fut,
}

impl<Fut> LaunchedTask<Fut> {
    pub(crate) fn new(future: Fut) -> LaunchedTask<Fut> {
        LaunchedTask { future }
    }

    /// Returns the wrapped future.
    pub fn into_inner(self) -> Fut {
        self.future
    }
}

impl<Fut: Future> Future for LaunchedTask<Fut> {
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        launch_entry_poll(self.project().future, cx)
    }
}
