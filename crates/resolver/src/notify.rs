//! Adoption state shared by the resolver variants

use parking_lot::Mutex;
use steer_ring::Endpoint;
use tokio::sync::Mutex as AsyncMutex;

use crate::ChangeCallback;

/// Tracks the last adopted membership and drives the change callback.
///
/// `maybe_adopt` holds one async lock across the compare, the swap, and
/// the callback await, so adoptions (and therefore callbacks) are fully
/// serialized even if a resolver variant ever resolved from more than
/// one task.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    callback: Mutex<Option<ChangeCallback>>,
    last: AsyncMutex<Option<Vec<Endpoint>>>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the registered callback
    pub(crate) fn set_callback(&self, callback: ChangeCallback) {
        *self.callback.lock() = Some(callback);
    }

    /// Adopt `resolved` when it differs from the last adopted set,
    /// invoking the callback before returning. `resolved` must already
    /// be canonical, sorted, and deduped. Returns whether an adoption
    /// happened.
    pub(crate) async fn maybe_adopt(&self, resolved: Vec<Endpoint>) -> bool {
        let mut last = self.last.lock().await;
        if last.as_deref() == Some(resolved.as_slice()) {
            return false;
        }
        *last = Some(resolved.clone());

        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(resolved).await;
        }
        true
    }
}
