//! Caller side of a running call.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::call::CallEvent;
use super::traits::CallObserver;

/// Handle to an in-flight call.
///
/// Yields the call's [`CallEvent`]s in order and ends after the terminal
/// event. Dropping the handle before the terminal event cancels the call.
#[derive(Debug)]
pub struct CallHandle {
    call_id: Uuid,
    events: mpsc::Receiver<CallEvent>,
    cancel: Option<oneshot::Sender<()>>,
    cancelled: bool,
    finished: bool,
}

impl CallHandle {
    pub(crate) fn new(
        call_id: Uuid,
        events: mpsc::Receiver<CallEvent>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            call_id,
            events,
            cancel: Some(cancel),
            cancelled: false,
            finished: false,
        }
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Whether the terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next event, or `None` after the terminal event
    pub async fn next_event(&mut self) -> Option<CallEvent> {
        self.next().await
    }

    /// Cancel the call.
    ///
    /// Undelivered metadata and messages are discarded; the next event is
    /// the terminal one, normally `Cancelled`. A status the server already
    /// produced before the cancel was observed is delivered instead.
    pub fn cancel(&mut self) {
        if self.finished || self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(cancel) = self.cancel.take() {
            debug!(call_id = %self.call_id, "Cancelling call");
            let _ = cancel.send(());
        }
    }

    /// Feed every remaining event to `observer`, in order
    pub async fn observe<O: CallObserver>(mut self, mut observer: O) -> O {
        while let Some(event) = self.next().await {
            match event {
                CallEvent::Metadata(metadata) => observer.on_metadata(&metadata),
                CallEvent::Message(message) => observer.on_message(message),
                CallEvent::Status(status) => observer.on_status(&status),
                CallEvent::Cancelled => observer.on_cancelled(),
            }
        }
        observer
    }
}

impl Stream for CallHandle {
    type Item = CallEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        loop {
            match this.events.poll_recv(cx) {
                Poll::Ready(Some(event)) if this.cancelled && !event.is_terminal() => continue,
                Poll::Ready(Some(event)) => {
                    if event.is_terminal() {
                        this.finished = true;
                        this.cancel = None;
                    }
                    return Poll::Ready(Some(event));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        if !self.finished {
            if let Some(cancel) = self.cancel.take() {
                let _ = cancel.send(());
            }
        }
    }
}
