//! Timed playback of a round's item sequence
//!
//! During the playing phase the engine walks the round sequence on a fixed
//! cadence: the item at position `i` starts sounding `i * item_spacing`
//! into the pass and stays highlighted for the configured window. The
//! session drives that walk as a chain of alarms; this module owns the
//! alarm and update messages of the chain plus the little bits of delay
//! arithmetic it needs.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::catalog::ItemId;

/// Alarm messages that advance the reveal chain
///
/// Every message carries the round it was scheduled for, so a stale alarm
/// surviving a round change is recognized and dropped at dispatch.
#[derive(Debug, Serialize, Clone, Deserialize)]
pub enum AlarmMessage {
    /// Start sounding the item at this position of the sequence
    Reveal {
        /// Round the alarm belongs to
        round: u32,
        /// Zero-based position in the round sequence
        index: usize,
    },
    /// Stop sounding the item at this position of the sequence
    EndReveal {
        /// Round the alarm belongs to
        round: u32,
        /// Zero-based position in the round sequence
        index: usize,
    },
}

/// Messages describing playback progress to observers
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A full playback pass over the round sequence began
    Started {
        /// Round being played back
        round: u32,
        /// Number of items about to be revealed
        items: usize,
        /// Total duration of the pass from first reveal to last silence
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// An item started sounding and should be highlighted
    ItemSounding {
        /// Zero-based position in the round sequence
        index: usize,
        /// Item being sounded
        item: ItemId,
        /// How long the highlight lasts
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// An item stopped sounding and should lose its highlight
    ItemSilenced {
        /// Zero-based position in the round sequence
        index: usize,
        /// Item that was sounding
        item: ItemId,
    },
}

/// Returns the duration of a full pass over `items` sequence positions
///
/// Measured from the first reveal to the moment the last highlight ends,
/// so a single item takes exactly one highlight window.
pub fn pass_duration(items: usize, item_spacing: Duration, highlight: Duration) -> Duration {
    match items.checked_sub(1) {
        Some(gaps) => item_spacing * gaps as u32 + highlight,
        None => Duration::ZERO,
    }
}

/// Returns the silent gap between one highlight ending and the next reveal
///
/// Saturates to zero when tuning pushes the spacing under the highlight
/// window, making items flow back to back instead of overlapping.
pub fn silence_gap(item_spacing: Duration, highlight: Duration) -> Duration {
    item_spacing.saturating_sub(highlight)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_pass_duration_of_empty_sequence_is_zero() {
        assert_eq!(
            pass_duration(
                0,
                Duration::from_millis(1200),
                Duration::from_millis(600)
            ),
            Duration::ZERO
        );
    }

    #[test]
    fn test_pass_duration_of_single_item_is_one_highlight() {
        assert_eq!(
            pass_duration(
                1,
                Duration::from_millis(1200),
                Duration::from_millis(600)
            ),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_pass_duration_spaces_later_items() {
        // Items at 0ms, 1200ms and 2400ms, the last sounding until 3000ms
        assert_eq!(
            pass_duration(
                3,
                Duration::from_millis(1200),
                Duration::from_millis(600)
            ),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn test_silence_gap() {
        assert_eq!(
            silence_gap(Duration::from_millis(1200), Duration::from_millis(600)),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_silence_gap_saturates_at_zero() {
        assert_eq!(
            silence_gap(Duration::from_millis(500), Duration::from_millis(600)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_alarm_message_serialization_round_trip() {
        let alarm = AlarmMessage::Reveal { round: 2, index: 1 };

        let serialized = serde_json::to_string(&alarm).unwrap();
        let deserialized: AlarmMessage = serde_json::from_str(&serialized).unwrap();

        assert!(matches!(
            deserialized,
            AlarmMessage::Reveal { round: 2, index: 1 }
        ));
    }
}
