//! # Call Observer
//!
//! Callback view of a call's event sequence, layered on top of
//! [`CallHandle`](super::CallHandle).

use bytes::Bytes;

use crate::metadata::Metadata;
use crate::status::Status;

/// Trait for callback-style consumers of a call.
///
/// Callbacks run in event order on the task that drives
/// [`CallHandle::observe`](super::CallHandle::observe). Exactly one of
/// `on_status` or `on_cancelled` is invoked, and it is invoked last.
pub trait CallObserver: Send {
    /// Initial metadata, delivered at most once before any message
    fn on_metadata(&mut self, metadata: &Metadata) {
        let _ = metadata;
    }

    fn on_message(&mut self, message: Bytes);

    fn on_status(&mut self, status: &Status);

    fn on_cancelled(&mut self) {}
}
