//! Configuration constants for the parrot engine
//!
//! This module contains the content limits and timing boundaries used
//! throughout the engine. Pacing values are expressed in milliseconds and
//! enforced when a [`crate::pacing::Pacing`] is validated, so hosts cannot
//! configure a session that stalls or races the player.

/// Catalog content limits
pub mod catalog {
    /// Maximum number of tracks allowed in a single catalog
    pub const MAX_TRACKS: usize = 64;
    /// Maximum number of rounds allowed in a single track
    pub const MAX_ROUNDS_PER_TRACK: usize = 32;
    /// Maximum number of items in a single round's sequence
    pub const MAX_ITEMS_PER_ROUND: usize = 16;
    /// Minimum length of track and item identifiers in characters
    pub const MIN_ID_LENGTH: usize = 1;
    /// Maximum length of track and item identifiers in characters
    pub const MAX_ID_LENGTH: usize = 48;
}

/// Playback and phase pacing boundaries
pub mod pacing {
    /// Default delay in milliseconds between consecutive item reveals
    pub const DEFAULT_ITEM_SPACING: u64 = 1200;
    /// Minimum delay in milliseconds between consecutive item reveals
    pub const MIN_ITEM_SPACING: u64 = 800;
    /// Maximum delay in milliseconds between consecutive item reveals
    pub const MAX_ITEM_SPACING: u64 = 5000;
    /// Default duration in milliseconds an item stays highlighted
    pub const DEFAULT_HIGHLIGHT: u64 = 600;
    /// Minimum duration in milliseconds an item stays highlighted
    pub const MIN_HIGHLIGHT: u64 = 200;
    /// Maximum duration in milliseconds an item stays highlighted
    pub const MAX_HIGHLIGHT: u64 = 800;
    /// Default interval in milliseconds between countdown ticks
    pub const DEFAULT_COUNTDOWN_TICK: u64 = 1000;
    /// Minimum interval in milliseconds between countdown ticks
    pub const MIN_COUNTDOWN_TICK: u64 = 300;
    /// Maximum interval in milliseconds between countdown ticks
    pub const MAX_COUNTDOWN_TICK: u64 = 2000;
    /// Default number the pre-round countdown starts from
    pub const DEFAULT_COUNTDOWN_START: u32 = 3;
    /// Maximum number the pre-round countdown may start from
    pub const MAX_COUNTDOWN_START: u32 = 10;
    /// Default delay in milliseconds before a waiting round starts counting down
    pub const DEFAULT_AUTO_START: u64 = 1000;
    /// Minimum delay in milliseconds before a waiting round starts counting down
    pub const MIN_AUTO_START: u64 = 250;
    /// Maximum delay in milliseconds before a waiting round starts counting down
    pub const MAX_AUTO_START: u64 = 10_000;
    /// Default duration in milliseconds the out-of-order feedback stays visible
    pub const DEFAULT_ERROR_DISPLAY: u64 = 1500;
    /// Minimum duration in milliseconds the out-of-order feedback stays visible
    pub const MIN_ERROR_DISPLAY: u64 = 500;
    /// Maximum duration in milliseconds the out-of-order feedback stays visible
    pub const MAX_ERROR_DISPLAY: u64 = 5000;
    /// Default duration in milliseconds of the between-rounds celebration
    pub const DEFAULT_CELEBRATION: u64 = 2000;
    /// Minimum duration in milliseconds of the between-rounds celebration
    pub const MIN_CELEBRATION: u64 = 500;
    /// Maximum duration in milliseconds of the between-rounds celebration
    pub const MAX_CELEBRATION: u64 = 10_000;
    /// Default minimum interval in milliseconds between player submissions
    pub const DEFAULT_MIN_SUBMIT_INTERVAL: u64 = 300;
    /// Maximum allowed minimum-submission interval in milliseconds
    pub const MAX_MIN_SUBMIT_INTERVAL: u64 = 2000;
}

/// Behavioral tuning thresholds for a running session
pub mod tuning {
    /// Consecutive correct submissions before playback speeds up
    pub const COMBO_FAST_STREAK: u32 = 6;
    /// Item spacing percentage applied once a combo streak is reached
    pub const COMBO_SPACING_PERCENT: u32 = 85;
    /// Total mistakes before playback slows down
    pub const MISTAKE_SLOW_COUNT: u32 = 3;
    /// Item spacing percentage applied once the mistake threshold is reached
    pub const MISTAKE_SPACING_PERCENT: u32 = 125;
    /// Number of distinct celebration flourish variants
    pub const FLOURISH_VARIANTS: u8 = 4;
}
