//! Ordered input validation for the listening phase
//!
//! A round is only ever completed by echoing its sequence back exactly, so
//! validation reduces to prefix checks: accepted submissions always leave
//! the player's input a prefix of the round sequence. The helpers here are
//! pure; the session applies their verdicts and drives the resulting phase
//! changes.

use serde::Serialize;
use web_time::Duration;

use crate::catalog::ItemId;

/// Why a submission was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The item does not match the next expected position in the sequence
    OutOfOrder,
}

/// Why a submission was silently dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The submission arrived too soon after the previous one
    RateLimited,
    /// The session is not currently accepting input
    NotListening,
}

/// Outcome of a single submission attempt
///
/// Rejections advance the session into its error feedback, while ignored
/// submissions leave it completely untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The item matched the next expected position and was recorded
    Accepted,
    /// The item was wrong and triggered error feedback
    Rejected(RejectReason),
    /// The item was dropped without affecting the session
    Ignored(IgnoreReason),
}

impl SubmitOutcome {
    /// Returns true if the submission was recorded
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Messages describing how a submission landed
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A submission matched the next expected position
    Accepted {
        /// Item the player submitted
        item: ItemId,
        /// Zero-based position it filled in the sequence
        position: usize,
    },
    /// A submission missed the next expected position
    OutOfOrder {
        /// Item the player submitted
        submitted: ItemId,
        /// Zero-based position that should have been filled
        expected_position: usize,
        /// How long the error feedback stays up before listening resumes
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        clears_in: Duration,
    },
}

/// Returns true if the candidate matches the next expected item
///
/// The comparison is positional, so sequences that repeat an item behave
/// correctly: after accepting the first "na" of "ba-na-na", only another
/// "na" matches.
pub fn is_expected_next(sequence: &[ItemId], player_input: &[ItemId], candidate: &ItemId) -> bool {
    sequence
        .get(player_input.len())
        .is_some_and(|expected| expected == candidate)
}

/// Returns true if the player's input is a prefix of the sequence
pub fn is_valid_prefix(sequence: &[ItemId], player_input: &[ItemId]) -> bool {
    player_input.len() <= sequence.len() && sequence.starts_with(player_input)
}

/// Returns true if the player has echoed the whole sequence
pub fn is_round_complete(sequence: &[ItemId], player_input: &[ItemId]) -> bool {
    !sequence.is_empty() && player_input.len() == sequence.len()
}

/// Returns true if a submission at `now` falls inside the rate-limit window
///
/// The window protects against double-fire from rapid repeated taps. A
/// zero interval disables the check entirely.
pub fn rate_limited(now: Duration, last_submit: Option<Duration>, min_interval: Duration) -> bool {
    last_submit.is_some_and(|last| now.saturating_sub(last) < min_interval)
}
