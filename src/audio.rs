//! Audio cue seam between a session and its host
//!
//! Cues are fire-and-forget. The engine signals what should be heard and
//! immediately moves on; timing never waits for playback, and a host that
//! cannot play sound at all simply installs the unit implementation.

use serde::Serialize;

use crate::catalog::ItemId;

/// A sound the host should play
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Cue {
    /// The recorded sound of a single item, played as it is revealed
    Item(ItemId),
    /// The player echoed a full round correctly
    RoundSuccess,
    /// The player finished every round of the track
    TrackComplete,
}

/// A sink for audio cues
pub trait AudioCue {
    /// Plays a cue, without blocking the session
    fn cue(&self, cue: Cue);
}

/// Discards every cue, for muted hosts and tests
impl AudioCue for () {
    fn cue(&self, _cue: Cue) {}
}
