//! Session state machine for the parrot engine
//!
//! A [`Game`] drives one echo session: it plays a round's item sequence
//! back on a fixed cadence, listens for the player to echo it in order,
//! celebrates success, and advances through the track's rounds until all
//! of them are complete. Every delay runs on the logical clock in
//! [`crate::timer`], so a session can be snapshotted at any instant and
//! resumed later without drifting.

use std::fmt::Debug;

use enum_map::{Enum, EnumMap, enum_map};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{debug, warn};
use web_time::Duration;

use crate::{
    activation::Activations,
    audio::{AudioCue, Cue},
    catalog::{Catalog, ItemId, TrackId},
    constants::tuning::FLOURISH_VARIANTS,
    input::{self, IgnoreReason, RejectReason, SubmitOutcome},
    pacing::Pacing,
    playback,
    snapshot::{SessionId, Snapshot},
    timer::Timers,
    view::View,
};

/// Phase of a session's round lifecycle
///
/// Wire names are snake_case, so hosts see `counting_down`,
/// `order_error` and so on in serialized state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Between rounds, waiting for the auto-start delay to elapse
    #[default]
    Waiting,
    /// Counting down before playback begins
    CountingDown,
    /// Playing the round sequence back to the player
    Playing,
    /// Accepting ordered input from the player
    Listening,
    /// Showing the between-rounds celebration
    Celebration,
    /// Showing out-of-order feedback before listening resumes
    OrderError,
    /// Terminal phase reached once the last round is complete
    PhaseComplete,
}

/// Returns the table of allowed automatic phase transitions
///
/// Only the explicit round jump and fresh start bypass this table; they
/// reset to [`Phase::Waiting`] from anywhere.
fn phase_successors() -> EnumMap<Phase, &'static [Phase]> {
    enum_map! {
        Phase::Waiting => &[Phase::CountingDown][..],
        Phase::CountingDown => &[Phase::Playing][..],
        Phase::Playing => &[Phase::Listening][..],
        Phase::Listening => &[Phase::OrderError, Phase::Celebration][..],
        Phase::OrderError => &[Phase::Listening][..],
        Phase::Celebration => &[Phase::Waiting, Phase::PhaseComplete][..],
        Phase::PhaseComplete => &[][..],
    }
}

/// Alarm messages that drive the session's phase changes
///
/// Each message carries the round it was scheduled for; a round change
/// makes leftover alarms stale, and they are dropped at dispatch.
#[derive(Debug, Serialize, Clone, Deserialize)]
pub enum AlarmMessage {
    /// The auto-start delay of a waiting round elapsed
    BeginCountdown {
        /// Round the alarm belongs to
        round: u32,
    },
    /// One countdown tick interval elapsed
    CountdownTick {
        /// Round the alarm belongs to
        round: u32,
    },
    /// The out-of-order feedback delay elapsed
    ClearOrderError {
        /// Round the alarm belongs to
        round: u32,
    },
    /// The celebration delay elapsed
    FinishCelebration {
        /// Round the alarm belongs to
        round: u32,
    },
}

/// Messages describing phase progress to observers
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A round is up next and will start counting down shortly
    RoundWaiting {
        /// 1-based round number about to be played
        round: u32,
        /// Delay until the countdown begins
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        starts_in: Duration,
    },
    /// The pre-round countdown began
    CountdownStarted {
        /// Round being counted down to
        round: u32,
        /// Number the countdown starts from
        remaining: u32,
    },
    /// The countdown moved one step closer to playback
    CountdownTick {
        /// Ticks still to go before playback
        remaining: u32,
    },
    /// The session is listening for ordered input
    Listening {
        /// Round being listened for
        round: u32,
    },
    /// The round was echoed correctly and the celebration began
    RoundSuccess {
        /// Round that was completed
        round: u32,
        /// Which celebration flourish variant to show
        flourish: u8,
        /// Delay until the session moves on
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        next_in: Duration,
    },
    /// Every round of the track is complete
    TrackComplete {
        /// Track that was completed
        track: TrackId,
        /// Number of rounds it took
        rounds: u32,
    },
}

/// Messages carrying the full session picture to observers
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// Complete state of the session for an attaching observer
    Session {
        /// Current lifecycle phase
        phase: Phase,
        /// Current 1-based round number
        round: u32,
        /// Item sequence of the current round
        sequence: Vec<ItemId>,
        /// Number of items already echoed correctly this round
        accepted: usize,
        /// Number of items already revealed during playback
        items_revealed: usize,
        /// Countdown ticks still to go, present while counting down
        countdown_remaining: Option<u32>,
        /// Permanently activated items in stable order
        activated: Vec<ItemId>,
        /// True once every round of the track is complete
        completed: bool,
    },
}

/// Errors from session construction and navigation
#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The requested track does not exist in the catalog
    #[error("track {0} does not exist in the catalog")]
    TrackNotFound(TrackId),
    /// The requested round does not exist for the track
    #[error("track {track} has no round {round}")]
    UnknownRound {
        /// Track that was addressed
        track: TrackId,
        /// 1-based round number that does not exist
        round: u32,
    },
    /// A saved session contradicts itself or the current catalog
    #[error("saved session is inconsistent: {0}")]
    InconsistentSnapshot(&'static str),
}

/// Complete persistable state of one session
///
/// This is everything a snapshot carries. Mid-flight alarm deadlines are
/// deliberately absent: a resumed session re-arms its alarms from the
/// phase recorded here, so display delays restart in full instead of
/// expiring the instant the session comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Track being played
    track: TrackId,
    /// Current 1-based round number
    round: u32,
    /// Current lifecycle phase
    phase: Phase,
    /// Item sequence of the current round
    sequence: Vec<ItemId>,
    /// Correctly echoed items of the current round, in order
    player_input: Vec<ItemId>,
    /// Number of sequence items already revealed during playback
    items_revealed: usize,
    /// Countdown ticks still to fire, meaningful while counting down
    countdown_remaining: u32,
    /// Permanently activated items across the whole session
    activated: Activations,
    /// Consecutive correct submissions, carried across rounds
    combo_streak: u32,
    /// Total out-of-order submissions, carried across rounds
    mistake_count: u32,
    /// True once the final round's celebration finished
    completed: bool,
}

impl SessionState {
    /// Returns the track being played
    pub fn track(&self) -> &TrackId {
        &self.track
    }

    /// Returns the current 1-based round number
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Returns the current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the item sequence of the current round
    pub fn sequence(&self) -> &[ItemId] {
        &self.sequence
    }

    /// Returns the correctly echoed items of the current round, in order
    pub fn player_input(&self) -> &[ItemId] {
        &self.player_input
    }

    /// Returns the number of items already revealed during playback
    pub fn items_revealed(&self) -> usize {
        self.items_revealed
    }

    /// Returns the countdown ticks still to fire
    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Returns the permanently activated items
    pub fn activations(&self) -> &Activations {
        &self.activated
    }

    /// Returns the number of consecutive correct submissions
    pub fn combo_streak(&self) -> u32 {
        self.combo_streak
    }

    /// Returns the total number of out-of-order submissions
    pub fn mistake_count(&self) -> u32 {
        self.mistake_count
    }

    /// Returns true once every round of the track is complete
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// A single echo session over one track
///
/// The session is single-threaded and host-driven: nothing happens
/// between calls. Hosts report elapsed time through [`Game::advance`],
/// deliver player input through [`Game::submit`], and persist
/// [`Game::snapshot`] whenever [`Game::revision`] changes.
pub struct Game {
    /// Catalog the session plays from
    catalog: Catalog,
    /// Timing configuration of the session
    pacing: Pacing,
    /// Stable identity of the session across snapshots
    session: SessionId,
    /// Persistable session state
    state: SessionState,
    /// Pending alarms on the logical clock
    timers: Timers<crate::AlarmMessage>,
    /// Whether the session is live; a frozen session ignores everything
    active: bool,
    /// Logical time of the last counted submission
    last_submit: Option<Duration>,
    /// Whether the completion callback already ran in this process
    completion_fired: bool,
    /// Monotone change counter for save-on-mutation hosts
    revision: u64,
}

impl Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("session", &self.session)
            .field("round", &self.state.round)
            .field("phase", &self.state.phase)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a fresh session on round 1 of a track
    ///
    /// The session starts frozen in [`Phase::Waiting`]; call
    /// [`Game::activate`] to bring it live.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TrackNotFound`] if the catalog has no such
    /// track, or [`GameError::UnknownRound`] if the track has no rounds.
    pub fn new(catalog: Catalog, track: TrackId, pacing: Pacing) -> Result<Self, GameError> {
        if catalog.track(&track).is_none() {
            return Err(GameError::TrackNotFound(track));
        }
        let sequence = catalog.sequence_for(&track, 1).to_vec();
        if sequence.is_empty() {
            return Err(GameError::UnknownRound { track, round: 1 });
        }
        Ok(Self {
            catalog,
            pacing,
            session: SessionId::new(),
            state: SessionState {
                track,
                round: 1,
                phase: Phase::Waiting,
                sequence,
                player_input: Vec::new(),
                items_revealed: 0,
                countdown_remaining: 0,
                activated: Activations::default(),
                combo_streak: 0,
                mistake_count: 0,
                completed: false,
            },
            timers: Timers::default(),
            active: false,
            last_submit: None,
            completion_fired: false,
            revision: 0,
        })
    }

    /// Rebuilds a frozen session from a previously taken snapshot
    ///
    /// The snapshot is checked against the catalog before anything is
    /// trusted; callers fall back to a fresh session when this fails.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TrackNotFound`] or [`GameError::UnknownRound`]
    /// if the catalog no longer holds what the snapshot refers to, and
    /// [`GameError::InconsistentSnapshot`] if the persisted state breaks
    /// an invariant, such as input that is not a prefix of the sequence.
    pub fn from_snapshot(
        catalog: Catalog,
        pacing: Pacing,
        snapshot: Snapshot,
    ) -> Result<Self, GameError> {
        let (session, state) = snapshot.into_parts();
        if catalog.track(&state.track).is_none() {
            return Err(GameError::TrackNotFound(state.track));
        }
        let expected_sequence = catalog.sequence_for(&state.track, state.round);
        if expected_sequence.is_empty() {
            return Err(GameError::UnknownRound {
                round: state.round,
                track: state.track,
            });
        }
        if state.sequence != expected_sequence {
            return Err(GameError::InconsistentSnapshot(
                "round sequence does not match the catalog",
            ));
        }
        if !input::is_valid_prefix(&state.sequence, &state.player_input) {
            return Err(GameError::InconsistentSnapshot(
                "player input is not a prefix of the sequence",
            ));
        }
        if state.items_revealed > state.sequence.len() {
            return Err(GameError::InconsistentSnapshot(
                "more items revealed than the sequence holds",
            ));
        }
        if state.phase == Phase::CountingDown
            && state.countdown_remaining > pacing.countdown_start()
        {
            return Err(GameError::InconsistentSnapshot(
                "countdown remainder exceeds its starting value",
            ));
        }
        if state.completed != (state.phase == Phase::PhaseComplete) {
            return Err(GameError::InconsistentSnapshot(
                "completion flag disagrees with the phase",
            ));
        }
        Ok(Self {
            catalog,
            pacing,
            session,
            state,
            timers: Timers::default(),
            active: false,
            last_submit: None,
            completion_fired: false,
            revision: 0,
        })
    }

    /// Returns the persistable state of the session
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns the stable identity of the session
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns the catalog the session plays from
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the timing configuration of the session
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Returns true while the session is live
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the monotone change counter
    ///
    /// The counter moves on every state-affecting event, so hosts that
    /// persist on every change can compare revisions instead of states.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Takes a snapshot of the session, safe at any instant
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.session, self.state.clone())
    }

    /// Builds the full-state message observers receive on attachment
    pub fn sync_message(&self) -> crate::SyncMessage {
        SyncMessage::Session {
            phase: self.state.phase,
            round: self.state.round,
            sequence: self.state.sequence.clone(),
            accepted: self.state.player_input.len(),
            items_revealed: self.state.items_revealed,
            countdown_remaining: (self.state.phase == Phase::CountingDown)
                .then_some(self.state.countdown_remaining),
            activated: self.state.activated.iter().cloned().collect_vec(),
            completed: self.state.completed,
        }
        .into()
    }

    /// Brings the session live and re-arms the current phase's alarms
    ///
    /// The same path serves fresh starts, resumes from a snapshot, and
    /// reactivation after [`Game::deactivate`]: the view gets a full
    /// sync, the phase's alarms are re-armed with their full delays, and
    /// a completion that was persisted right before the previous session
    /// ended is delivered exactly once. Activating a live session is a
    /// no-op.
    pub fn activate<V: View, C: FnMut(&TrackId)>(&mut self, view: &V, on_complete: &mut C) {
        if self.active {
            debug!("activation of a live session ignored");
            return;
        }
        self.active = true;
        view.sync(&self.sync_message());
        self.arm_phase_alarms(view);
        if self.state.completed && !self.completion_fired {
            self.completion_fired = true;
            on_complete(&self.state.track);
        }
    }

    /// Freezes the session, cancelling every pending alarm
    ///
    /// A frozen session ignores time and input entirely until the next
    /// [`Game::activate`]. Deactivating twice is harmless.
    pub fn deactivate(&mut self) {
        self.timers.cancel_all();
        self.active = false;
    }

    /// Advances the logical clock and delivers every alarm that came due
    ///
    /// The clock walks deadline to deadline, so a handler that schedules
    /// a follow-up alarm measures its delay from its own firing instant.
    /// A large step therefore drains the same alarms in the same order as
    /// many small ones, and hosts may pump at any cadence. A frozen
    /// session ignores the call.
    pub fn advance<V: View, A: AudioCue, C: FnMut(&TrackId)>(
        &mut self,
        elapsed: Duration,
        view: &V,
        audio: &A,
        on_complete: &mut C,
    ) {
        if !self.active {
            return;
        }
        let target = self.timers.now() + elapsed;
        while let Some(due) = self.timers.next_due() {
            if due > target {
                break;
            }
            self.timers.advance(due.saturating_sub(self.timers.now()));
            while let Some(alarm) = self.timers.pop_due() {
                self.receive_alarm(&alarm, view, audio, on_complete);
            }
        }
        self.timers.advance(target.saturating_sub(self.timers.now()));
    }

    /// Handles one ordered submission from the player
    ///
    /// Outside the listening phase, and inside the rate-limit window,
    /// submissions are ignored without touching the session. A correct
    /// item is recorded and permanently activated; a wrong one leaves
    /// the recorded input untouched and starts the error feedback.
    pub fn submit<V: View, A: AudioCue>(
        &mut self,
        item: ItemId,
        view: &V,
        audio: &A,
    ) -> SubmitOutcome {
        if !self.active || self.state.phase != Phase::Listening {
            debug!(%item, "submission outside the listening phase ignored");
            return SubmitOutcome::Ignored(IgnoreReason::NotListening);
        }
        if input::rate_limited(
            self.timers.now(),
            self.last_submit,
            self.pacing.min_submit_interval(),
        ) {
            debug!(%item, "submission inside the rate-limit window ignored");
            return SubmitOutcome::Ignored(IgnoreReason::RateLimited);
        }
        self.last_submit = Some(self.timers.now());
        if !input::is_expected_next(&self.state.sequence, &self.state.player_input, &item) {
            self.reject_out_of_order(item, view);
            return SubmitOutcome::Rejected(RejectReason::OutOfOrder);
        }
        let position = self.state.player_input.len();
        self.state.player_input.push(item.clone());
        self.state.activated.activate(item.clone());
        self.state.combo_streak += 1;
        self.bump_revision();
        view.update(&input::UpdateMessage::Accepted { item, position }.into());
        if input::is_round_complete(&self.state.sequence, &self.state.player_input) {
            self.begin_celebration(view, audio);
        }
        SubmitOutcome::Accepted
    }

    /// Jumps the session to the given round of its track
    ///
    /// A navigation affordance: the session resets to [`Phase::Waiting`]
    /// from any phase, in-round progress is cleared, and permanent
    /// activations are kept. Works on a frozen session too, which then
    /// starts counting down on the next activation.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownRound`] and leaves the session
    /// untouched if the track has no such round.
    pub fn jump_to_round<V: View>(&mut self, round: u32, view: &V) -> Result<(), GameError> {
        let sequence = self.catalog.sequence_for(&self.state.track, round).to_vec();
        if sequence.is_empty() {
            warn!(round, track = %self.state.track, "jump to unknown round refused");
            return Err(GameError::UnknownRound {
                track: self.state.track.clone(),
                round,
            });
        }
        self.timers.cancel_all();
        self.state.round = round;
        self.state.sequence = sequence;
        self.state.phase = Phase::Waiting;
        self.state.completed = false;
        self.clear_round_progress();
        self.bump_revision();
        if self.active {
            self.timers.schedule(
                self.pacing.auto_start(),
                AlarmMessage::BeginCountdown { round }.into(),
            );
        }
        view.sync(&self.sync_message());
        Ok(())
    }

    /// Resets the session to an untouched round 1
    ///
    /// Unlike [`Game::jump_to_round`] this clears everything, including
    /// permanent activations and the tuning counters. It is the only way
    /// to shrink the activation set.
    pub fn start_fresh<V: View>(&mut self, view: &V) {
        let sequence = self.catalog.sequence_for(&self.state.track, 1).to_vec();
        self.timers.cancel_all();
        self.state.round = 1;
        self.state.sequence = sequence;
        self.state.phase = Phase::Waiting;
        self.state.completed = false;
        self.state.activated.clear();
        self.state.combo_streak = 0;
        self.state.mistake_count = 0;
        self.clear_round_progress();
        self.last_submit = None;
        self.completion_fired = false;
        self.bump_revision();
        if self.active {
            self.timers.schedule(
                self.pacing.auto_start(),
                AlarmMessage::BeginCountdown { round: 1 }.into(),
            );
        }
        view.sync(&self.sync_message());
    }

    /// Moves between phases if the successor table allows it
    ///
    /// Refusal is silent towards the caller and logged for diagnosis. A
    /// successful transition cancels every pending alarm: alarms never
    /// outlive the phase that scheduled them.
    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.state.phase != before || !phase_successors()[before].contains(&after) {
            debug!(
                ?before,
                ?after,
                current = ?self.state.phase,
                "phase transition refused"
            );
            return false;
        }
        self.timers.cancel_all();
        self.state.phase = after;
        self.bump_revision();
        true
    }

    /// Delivers one due alarm to its handler
    fn receive_alarm<V: View, A: AudioCue, C: FnMut(&TrackId)>(
        &mut self,
        alarm: &crate::AlarmMessage,
        view: &V,
        audio: &A,
        on_complete: &mut C,
    ) {
        match alarm {
            crate::AlarmMessage::Game(message) => match *message {
                AlarmMessage::BeginCountdown { round } => self.begin_countdown(round, view),
                AlarmMessage::CountdownTick { round } => self.countdown_tick(round, view, audio),
                AlarmMessage::ClearOrderError { round } => self.clear_order_error(round, view),
                AlarmMessage::FinishCelebration { round } => {
                    self.finish_celebration(round, view, audio, on_complete);
                }
            },
            crate::AlarmMessage::Playback(message) => match *message {
                playback::AlarmMessage::Reveal { round, index } => {
                    self.reveal_item(round, index, view, audio);
                }
                playback::AlarmMessage::EndReveal { round, index } => {
                    self.end_reveal(round, index, view);
                }
            },
        }
    }

    /// Re-arms the alarms the current phase needs after (re)activation
    ///
    /// Display delays restart in full, the countdown resumes at its
    /// persisted remainder with the next tick one whole interval out,
    /// and playback picks the reveal chain up at the first unrevealed
    /// item. Listening and completion need no alarms.
    fn arm_phase_alarms<V: View>(&mut self, view: &V) {
        let round = self.state.round;
        match self.state.phase {
            Phase::Waiting => {
                self.timers.schedule(
                    self.pacing.auto_start(),
                    AlarmMessage::BeginCountdown { round }.into(),
                );
            }
            Phase::CountingDown => {
                self.timers.schedule_repeating(
                    self.pacing.countdown_tick(),
                    AlarmMessage::CountdownTick { round }.into(),
                );
            }
            Phase::Playing => {
                if self.state.items_revealed >= self.state.sequence.len() {
                    self.begin_listening(view);
                } else {
                    self.timers.schedule(
                        self.effective_item_spacing(),
                        playback::AlarmMessage::Reveal {
                            round,
                            index: self.state.items_revealed,
                        }
                        .into(),
                    );
                }
            }
            Phase::OrderError => {
                self.timers.schedule(
                    self.pacing.error_display(),
                    AlarmMessage::ClearOrderError { round }.into(),
                );
            }
            Phase::Celebration => {
                self.timers.schedule(
                    self.pacing.celebration(),
                    AlarmMessage::FinishCelebration { round }.into(),
                );
            }
            Phase::Listening | Phase::PhaseComplete => {}
        }
    }

    /// Starts the pre-round countdown once the auto-start delay elapsed
    fn begin_countdown<V: View>(&mut self, round: u32, view: &V) {
        if round != self.state.round {
            debug!(
                round,
                current = self.state.round,
                "stale countdown alarm dropped"
            );
            return;
        }
        if !self.change_phase(Phase::Waiting, Phase::CountingDown) {
            return;
        }
        self.state.countdown_remaining = self.pacing.countdown_start();
        self.timers.schedule_repeating(
            self.pacing.countdown_tick(),
            AlarmMessage::CountdownTick { round }.into(),
        );
        view.update(
            &UpdateMessage::CountdownStarted {
                round,
                remaining: self.state.countdown_remaining,
            }
            .into(),
        );
    }

    /// Consumes one countdown tick, entering playback at zero
    fn countdown_tick<V: View, A: AudioCue>(&mut self, round: u32, view: &V, audio: &A) {
        if round != self.state.round || self.state.phase != Phase::CountingDown {
            debug!(round, "stale countdown tick dropped");
            return;
        }
        self.state.countdown_remaining = self.state.countdown_remaining.saturating_sub(1);
        self.bump_revision();
        if self.state.countdown_remaining == 0 {
            self.begin_playback(view, audio);
        } else {
            view.update(
                &UpdateMessage::CountdownTick {
                    remaining: self.state.countdown_remaining,
                }
                .into(),
            );
        }
    }

    /// Starts a full playback pass over the round sequence
    fn begin_playback<V: View, A: AudioCue>(&mut self, view: &V, audio: &A) {
        if !self.change_phase(Phase::CountingDown, Phase::Playing) {
            return;
        }
        self.state.items_revealed = 0;
        self.state.player_input.clear();
        let round = self.state.round;
        view.update(
            &playback::UpdateMessage::Started {
                round,
                items: self.state.sequence.len(),
                duration: playback::pass_duration(
                    self.state.sequence.len(),
                    self.effective_item_spacing(),
                    self.pacing.highlight(),
                ),
            }
            .into(),
        );
        // The first item sounds immediately; the rest follow the cadence
        self.reveal_item(round, 0, view, audio);
    }

    /// Sounds the item at a sequence position and schedules its silence
    fn reveal_item<V: View, A: AudioCue>(
        &mut self,
        round: u32,
        index: usize,
        view: &V,
        audio: &A,
    ) {
        if round != self.state.round
            || self.state.phase != Phase::Playing
            || index != self.state.items_revealed
        {
            debug!(round, index, "stale reveal alarm dropped");
            return;
        }
        let Some(item) = self.state.sequence.get(index).cloned() else {
            debug!(round, index, "reveal past the end of the sequence dropped");
            return;
        };
        self.state.items_revealed += 1;
        self.bump_revision();
        audio.cue(Cue::Item(item.clone()));
        view.update(
            &playback::UpdateMessage::ItemSounding {
                index,
                item,
                duration: self.pacing.highlight(),
            }
            .into(),
        );
        self.timers.schedule(
            self.pacing.highlight(),
            playback::AlarmMessage::EndReveal { round, index }.into(),
        );
    }

    /// Silences a sounded item, chaining the next reveal or listening
    fn end_reveal<V: View>(&mut self, round: u32, index: usize, view: &V) {
        if round != self.state.round
            || self.state.phase != Phase::Playing
            || index + 1 != self.state.items_revealed
        {
            debug!(round, index, "stale reveal end dropped");
            return;
        }
        let Some(item) = self.state.sequence.get(index).cloned() else {
            return;
        };
        view.update(&playback::UpdateMessage::ItemSilenced { index, item }.into());
        if self.state.items_revealed == self.state.sequence.len() {
            self.begin_listening(view);
        } else {
            self.timers.schedule(
                playback::silence_gap(self.effective_item_spacing(), self.pacing.highlight()),
                playback::AlarmMessage::Reveal {
                    round,
                    index: index + 1,
                }
                .into(),
            );
        }
    }

    /// Opens the session for ordered player input
    fn begin_listening<V: View>(&mut self, view: &V) {
        if !self.change_phase(Phase::Playing, Phase::Listening) {
            return;
        }
        view.update(
            &UpdateMessage::Listening {
                round: self.state.round,
            }
            .into(),
        );
    }

    /// Starts the error feedback after an out-of-order submission
    fn reject_out_of_order<V: View>(&mut self, submitted: ItemId, view: &V) {
        if !self.change_phase(Phase::Listening, Phase::OrderError) {
            return;
        }
        self.state.mistake_count += 1;
        self.state.combo_streak = 0;
        let round = self.state.round;
        self.timers.schedule(
            self.pacing.error_display(),
            AlarmMessage::ClearOrderError { round }.into(),
        );
        view.update(
            &input::UpdateMessage::OutOfOrder {
                submitted,
                expected_position: self.state.player_input.len(),
                clears_in: self.pacing.error_display(),
            }
            .into(),
        );
    }

    /// Returns to listening once the error feedback delay elapsed
    fn clear_order_error<V: View>(&mut self, round: u32, view: &V) {
        if round != self.state.round {
            debug!(round, "stale error clear dropped");
            return;
        }
        if !self.change_phase(Phase::OrderError, Phase::Listening) {
            return;
        }
        view.update(&UpdateMessage::Listening { round }.into());
    }

    /// Starts the celebration after a fully echoed round
    fn begin_celebration<V: View, A: AudioCue>(&mut self, view: &V, audio: &A) {
        if !self.change_phase(Phase::Listening, Phase::Celebration) {
            return;
        }
        let round = self.state.round;
        self.timers.schedule(
            self.pacing.celebration(),
            AlarmMessage::FinishCelebration { round }.into(),
        );
        audio.cue(Cue::RoundSuccess);
        view.update(
            &UpdateMessage::RoundSuccess {
                round,
                flourish: fastrand::u8(0..FLOURISH_VARIANTS),
                next_in: self.pacing.celebration(),
            }
            .into(),
        );
    }

    /// Moves on after the celebration: next round, or track completion
    fn finish_celebration<V: View, A: AudioCue, C: FnMut(&TrackId)>(
        &mut self,
        round: u32,
        view: &V,
        audio: &A,
        on_complete: &mut C,
    ) {
        if round != self.state.round {
            debug!(round, "stale celebration end dropped");
            return;
        }
        let next_round = round + 1;
        let next_sequence = self
            .catalog
            .sequence_for(&self.state.track, next_round)
            .to_vec();
        if next_sequence.is_empty() {
            self.complete_track(view, audio, on_complete);
            return;
        }
        if !self.change_phase(Phase::Celebration, Phase::Waiting) {
            return;
        }
        self.state.round = next_round;
        self.state.sequence = next_sequence;
        self.clear_round_progress();
        view.update(
            &UpdateMessage::RoundWaiting {
                round: next_round,
                starts_in: self.pacing.auto_start(),
            }
            .into(),
        );
        self.timers.schedule(
            self.pacing.auto_start(),
            AlarmMessage::BeginCountdown { round: next_round }.into(),
        );
    }

    /// Enters the terminal phase and delivers the completion callback
    fn complete_track<V: View, A: AudioCue, C: FnMut(&TrackId)>(
        &mut self,
        view: &V,
        audio: &A,
        on_complete: &mut C,
    ) {
        if !self.change_phase(Phase::Celebration, Phase::PhaseComplete) {
            return;
        }
        self.state.completed = true;
        audio.cue(Cue::TrackComplete);
        view.update(
            &UpdateMessage::TrackComplete {
                track: self.state.track.clone(),
                rounds: self.state.round,
            }
            .into(),
        );
        if !self.completion_fired {
            self.completion_fired = true;
            on_complete(&self.state.track);
        }
    }

    /// Clears the state that only means something within one round
    fn clear_round_progress(&mut self) {
        self.state.player_input.clear();
        self.state.items_revealed = 0;
        self.state.countdown_remaining = 0;
    }

    /// Returns the item spacing adjusted for the session's tuning counters
    fn effective_item_spacing(&self) -> Duration {
        self.pacing
            .effective_item_spacing(self.state.combo_streak, self.state.mistake_count)
    }

    /// Moves the change counter forward
    fn bump_revision(&mut self) {
        self.revision += 1;
    }
}
