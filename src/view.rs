//! Observer seam between a session and its host UI
//!
//! The engine never renders anything itself. Hosts implement [`View`] and
//! receive two kinds of traffic: incremental update messages as the
//! session changes, and full sync messages when a complete picture is
//! needed, such as on activation or after an explicit round jump.

use crate::{SyncMessage, UpdateMessage};

/// An observer of a running session
///
/// Implementations are expected to be cheap and must not call back into
/// the session from inside a delivery; they only mirror state outward.
pub trait View {
    /// Receives an incremental update message
    fn update(&self, message: &UpdateMessage);

    /// Receives a full state synchronization message
    fn sync(&self, message: &SyncMessage);
}

/// Discards everything, for headless hosts and tests
impl View for () {
    fn update(&self, _message: &UpdateMessage) {}

    fn sync(&self, _message: &SyncMessage) {}
}
