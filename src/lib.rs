//! # Parrot Game Engine
//!
//! This library provides the core logic for parrot, an echo mini-game in
//! which a session plays back a growing sequence of items (syllables,
//! notes, symbols) and the player repeats it in order. It handles timed
//! playback, strictly ordered input validation, permanent item
//! activation, automatic round progression, and snapshot-based save and
//! resume at any instant.
//!
//! The engine is host-agnostic: it never reads the wall clock and never
//! talks to a renderer or speaker directly. Hosts drive a [`game::Game`]
//! by reporting elapsed time and player taps, and receive the results
//! through the [`view::View`] and [`audio::AudioCue`] traits; persistence
//! goes through [`snapshot::SnapshotStore`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod activation;
pub mod audio;
pub mod catalog;
pub mod game;
pub mod input;
pub mod pacing;
pub mod playback;
pub mod snapshot;
pub mod timer;
pub mod view;

/// Messages carrying complete session state to observers
///
/// A sync message is sent when an observer attaches or reattaches, and
/// after navigation; it holds everything needed to render the session
/// from scratch. Incremental progress arrives as [`UpdateMessage`]s.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Full session picture from the state machine
    Game(game::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages describing one thing that just happened in a session
///
/// Updates are incremental: a countdown tick, an item sounding, an
/// accepted tap. Observers that missed some get a [`SyncMessage`] on
/// reattachment instead of a replay.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Phase progress from the session state machine
    Game(game::UpdateMessage),
    /// Playback reveals and silences
    Playback(playback::UpdateMessage),
    /// Input acceptance and rejection
    Input(input::UpdateMessage),
}

/// Alarm messages for the timed events of a session
///
/// Alarms are plain data scheduled on the session's logical clock; the
/// session delivers them to itself as reported time elapses. Snapshots
/// deliberately leave them out, so a resumed session re-arms its own.
#[derive(Debug, Clone, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Phase alarms of the state machine
    Game(game::AlarmMessage),
    /// Reveal-chain alarms of playback
    Playback(playback::AlarmMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_sync_message_to_message() {
        let sync_msg: SyncMessage = game::SyncMessage::Session {
            phase: game::Phase::Waiting,
            round: 1,
            sequence: vec![catalog::ItemId::from("ba")],
            accepted: 0,
            items_revealed: 0,
            countdown_remaining: None,
            activated: vec![],
            completed: false,
        }
        .into();
        let json_str = sync_msg.to_message();

        assert!(json_str.contains("Game"));
        assert!(json_str.contains("Session"));
        assert!(json_str.contains("waiting"));
        // The absent countdown field is dropped, not serialized as null
        assert!(!json_str.contains("countdown_remaining"));
    }

    #[test]
    fn test_update_message_to_message() {
        let update_msg: UpdateMessage = playback::UpdateMessage::ItemSilenced {
            index: 0,
            item: catalog::ItemId::from("ba"),
        }
        .into();
        let json_str = update_msg.to_message();

        assert!(json_str.contains("Playback"));
        assert!(json_str.contains("ItemSilenced"));
        assert!(json_str.contains("ba"));
    }

    #[test]
    fn test_alarm_message_round_trip() {
        let alarm: AlarmMessage = game::AlarmMessage::BeginCountdown { round: 2 }.into();

        let serialized = serde_json::to_string(&alarm).unwrap();
        let deserialized: AlarmMessage = serde_json::from_str(&serialized).unwrap();

        assert!(matches!(
            deserialized,
            AlarmMessage::Game(game::AlarmMessage::BeginCountdown { round: 2 })
        ));
    }
}
