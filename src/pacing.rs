//! Timing configuration for playback and phase transitions
//!
//! This module defines [`Pacing`], the validated set of delays that drive a
//! session: how fast items are revealed, how long the countdown takes, and
//! how long feedback phases stay on screen. All durations serialize as
//! milliseconds and are checked against the bounds in
//! [`crate::constants::pacing`].

use garde::Validate;
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants::{
    pacing::{
        DEFAULT_AUTO_START, DEFAULT_CELEBRATION, DEFAULT_COUNTDOWN_START, DEFAULT_COUNTDOWN_TICK,
        DEFAULT_ERROR_DISPLAY, DEFAULT_HIGHLIGHT, DEFAULT_ITEM_SPACING,
        DEFAULT_MIN_SUBMIT_INTERVAL, MAX_AUTO_START, MAX_CELEBRATION, MAX_COUNTDOWN_START,
        MAX_COUNTDOWN_TICK, MAX_ERROR_DISPLAY, MAX_HIGHLIGHT, MAX_ITEM_SPACING,
        MAX_MIN_SUBMIT_INTERVAL, MIN_AUTO_START, MIN_CELEBRATION, MIN_COUNTDOWN_TICK,
        MIN_ERROR_DISPLAY, MIN_HIGHLIGHT, MIN_ITEM_SPACING,
    },
    tuning::{
        COMBO_FAST_STREAK, COMBO_SPACING_PERCENT, MISTAKE_SLOW_COUNT, MISTAKE_SPACING_PERCENT,
    },
};

/// Result type for validation operations
type ValidationResult = garde::Result;

/// Validates that a duration falls inside an inclusive millisecond range
fn validate_duration_millis<const MIN_MS: u64, const MAX_MS: u64>(
    field: &'static str,
    val: &Duration,
) -> ValidationResult {
    if (MIN_MS..=MAX_MS).contains(&(val.as_millis() as u64)) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is outside of the bounds [{MIN_MS}ms,{MAX_MS}ms]",
        )))
    }
}

fn default_item_spacing() -> Duration {
    Duration::from_millis(DEFAULT_ITEM_SPACING)
}

fn validate_item_spacing(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_ITEM_SPACING, MAX_ITEM_SPACING>("item_spacing", val)
}

fn default_highlight() -> Duration {
    Duration::from_millis(DEFAULT_HIGHLIGHT)
}

fn validate_highlight(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_HIGHLIGHT, MAX_HIGHLIGHT>("highlight", val)
}

fn default_countdown_tick() -> Duration {
    Duration::from_millis(DEFAULT_COUNTDOWN_TICK)
}

fn validate_countdown_tick(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_COUNTDOWN_TICK, MAX_COUNTDOWN_TICK>("countdown_tick", val)
}

fn default_countdown_start() -> u32 {
    DEFAULT_COUNTDOWN_START
}

fn default_auto_start() -> Duration {
    Duration::from_millis(DEFAULT_AUTO_START)
}

fn validate_auto_start(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_AUTO_START, MAX_AUTO_START>("auto_start", val)
}

fn default_error_display() -> Duration {
    Duration::from_millis(DEFAULT_ERROR_DISPLAY)
}

fn validate_error_display(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_ERROR_DISPLAY, MAX_ERROR_DISPLAY>("error_display", val)
}

fn default_celebration() -> Duration {
    Duration::from_millis(DEFAULT_CELEBRATION)
}

fn validate_celebration(val: &Duration) -> ValidationResult {
    validate_duration_millis::<MIN_CELEBRATION, MAX_CELEBRATION>("celebration", val)
}

fn default_min_submit_interval() -> Duration {
    Duration::from_millis(DEFAULT_MIN_SUBMIT_INTERVAL)
}

fn validate_min_submit_interval(val: &Duration) -> ValidationResult {
    validate_duration_millis::<0, MAX_MIN_SUBMIT_INTERVAL>("min_submit_interval", val)
}

/// Validated timing configuration for a session
///
/// Every delay the engine schedules comes from here, which keeps sessions
/// deterministic: two hosts with the same pacing and the same inputs will
/// observe the same transitions at the same logical times.
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Pacing {
    /// Delay between consecutive item reveals during playback
    #[garde(custom(|v, _| validate_item_spacing(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_item_spacing")]
    item_spacing: Duration,
    /// Duration an item stays highlighted while it sounds
    #[garde(custom(|v, _| validate_highlight(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_highlight")]
    highlight: Duration,
    /// Interval between pre-round countdown ticks
    #[garde(custom(|v, _| validate_countdown_tick(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_countdown_tick")]
    countdown_tick: Duration,
    /// Number the pre-round countdown starts from
    #[garde(range(min = 1, max = MAX_COUNTDOWN_START))]
    #[serde(default = "default_countdown_start")]
    countdown_start: u32,
    /// Delay before a waiting round starts counting down
    #[garde(custom(|v, _| validate_auto_start(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_auto_start")]
    auto_start: Duration,
    /// Duration the out-of-order feedback stays visible
    #[garde(custom(|v, _| validate_error_display(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_error_display")]
    error_display: Duration,
    /// Duration of the between-rounds celebration
    #[garde(custom(|v, _| validate_celebration(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_celebration")]
    celebration: Duration,
    /// Minimum interval between player submissions, zero to disable
    #[garde(custom(|v, _| validate_min_submit_interval(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_min_submit_interval")]
    min_submit_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_spacing: default_item_spacing(),
            highlight: default_highlight(),
            countdown_tick: default_countdown_tick(),
            countdown_start: default_countdown_start(),
            auto_start: default_auto_start(),
            error_display: default_error_display(),
            celebration: default_celebration(),
            min_submit_interval: default_min_submit_interval(),
        }
    }
}

impl Pacing {
    /// Returns the base delay between consecutive item reveals
    pub fn item_spacing(&self) -> Duration {
        self.item_spacing
    }

    /// Returns the duration an item stays highlighted
    pub fn highlight(&self) -> Duration {
        self.highlight
    }

    /// Returns the interval between countdown ticks
    pub fn countdown_tick(&self) -> Duration {
        self.countdown_tick
    }

    /// Returns the number the countdown starts from
    pub fn countdown_start(&self) -> u32 {
        self.countdown_start
    }

    /// Returns the delay before a waiting round starts counting down
    pub fn auto_start(&self) -> Duration {
        self.auto_start
    }

    /// Returns the duration the out-of-order feedback stays visible
    pub fn error_display(&self) -> Duration {
        self.error_display
    }

    /// Returns the duration of the between-rounds celebration
    pub fn celebration(&self) -> Duration {
        self.celebration
    }

    /// Returns the minimum interval between player submissions
    pub fn min_submit_interval(&self) -> Duration {
        self.min_submit_interval
    }

    /// Returns the item spacing adjusted for how the player is doing
    ///
    /// A long streak of correct submissions speeds playback up a little,
    /// while repeated mistakes slow it down. The result never drops below
    /// the highlight duration, so reveal windows cannot overlap.
    pub fn effective_item_spacing(&self, combo_streak: u32, mistake_count: u32) -> Duration {
        let mut spacing = self.item_spacing;
        if combo_streak >= COMBO_FAST_STREAK {
            spacing = spacing * COMBO_SPACING_PERCENT / 100;
        }
        if mistake_count >= MISTAKE_SLOW_COUNT {
            spacing = spacing * MISTAKE_SPACING_PERCENT / 100;
        }
        spacing.max(self.highlight)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_pacing_is_valid() {
        assert!(Pacing::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_bounds_item_spacing_is_rejected() {
        let pacing = Pacing {
            item_spacing: Duration::from_millis(MIN_ITEM_SPACING - 1),
            ..Pacing::default()
        };

        assert!(pacing.validate().is_err());
    }

    #[test]
    fn test_zero_countdown_start_is_rejected() {
        let pacing = Pacing {
            countdown_start: 0,
            ..Pacing::default()
        };

        assert!(pacing.validate().is_err());
    }

    #[test]
    fn test_overlong_celebration_is_rejected() {
        let pacing = Pacing {
            celebration: Duration::from_millis(MAX_CELEBRATION + 1),
            ..Pacing::default()
        };

        assert!(pacing.validate().is_err());
    }

    #[test]
    fn test_deserializes_from_milliseconds() {
        let pacing: Pacing = serde_json::from_str(r#"{"item_spacing": 1500}"#).unwrap();

        assert_eq!(pacing.item_spacing(), Duration::from_millis(1500));
        // Unspecified fields fall back to their defaults
        assert_eq!(
            pacing.highlight(),
            Duration::from_millis(DEFAULT_HIGHLIGHT)
        );
    }

    #[test]
    fn test_effective_spacing_without_tuning() {
        let pacing = Pacing::default();

        assert_eq!(
            pacing.effective_item_spacing(0, 0),
            Duration::from_millis(DEFAULT_ITEM_SPACING)
        );
    }

    #[test]
    fn test_effective_spacing_speeds_up_on_combo() {
        let pacing = Pacing::default();

        let expected =
            Duration::from_millis(DEFAULT_ITEM_SPACING) * COMBO_SPACING_PERCENT / 100;
        assert_eq!(pacing.effective_item_spacing(COMBO_FAST_STREAK, 0), expected);
    }

    #[test]
    fn test_effective_spacing_slows_down_on_mistakes() {
        let pacing = Pacing::default();

        let expected =
            Duration::from_millis(DEFAULT_ITEM_SPACING) * MISTAKE_SPACING_PERCENT / 100;
        assert_eq!(
            pacing.effective_item_spacing(0, MISTAKE_SLOW_COUNT),
            expected
        );
    }

    #[test]
    fn test_effective_spacing_never_drops_below_highlight() {
        let pacing: Pacing = serde_json::from_str(
            r#"{"item_spacing": 800, "highlight": 800}"#,
        )
        .unwrap();

        // 800ms * 85% would undercut the 800ms highlight window
        assert_eq!(
            pacing.effective_item_spacing(COMBO_FAST_STREAK, 0),
            Duration::from_millis(800)
        );
    }
}
