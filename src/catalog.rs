//! Track and round catalog for the parrot engine
//!
//! This module defines the static content a session plays through: tracks,
//! their per-round item sequences, and the identifiers used to reference
//! them. The catalog is read-only during play; lookups are total, so an
//! unknown track or round yields an empty sequence instead of an error.

use garde::Validate;
use itertools::Itertools;
use once_cell_serde::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::constants::catalog::{
    MAX_ID_LENGTH, MAX_ITEMS_PER_ROUND, MAX_ROUNDS_PER_TRACK, MAX_TRACKS, MIN_ID_LENGTH,
};

/// Result type for validation operations
type ValidationResult = garde::Result;

/// Stable identifier of a track within a catalog
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Validate,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct TrackId(#[garde(length(min = MIN_ID_LENGTH, max = MAX_ID_LENGTH))] String);

impl TrackId {
    /// Creates a track identifier from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Stable identifier of an atomic sequence element (a syllable or symbol)
///
/// Identity is what matters here: a sequence may legitimately repeat an
/// item (think "ba-na-na"), so uniqueness is never assumed within a round.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Validate,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ItemId(#[garde(length(min = MIN_ID_LENGTH, max = MAX_ID_LENGTH))] String);

impl ItemId {
    /// Creates an item identifier from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A single round: the exact item sequence the player must echo back
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Round {
    /// Items in playback order
    #[garde(length(min = 1, max = MAX_ITEMS_PER_ROUND), dive)]
    items: Vec<ItemId>,
}

impl Round {
    /// Creates a round from an ordered item sequence
    pub fn new(items: Vec<ItemId>) -> Self {
        Self { items }
    }

    /// Returns the item sequence in playback order
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Returns the number of items in the sequence
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the sequence contains no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An ordered progression of rounds sharing one vocabulary
///
/// Rounds are addressed 1-based, matching how they are shown to players.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Track {
    /// Identifier of this track
    #[garde(dive)]
    id: TrackId,
    /// Rounds in play order, from shortest to longest sequence
    #[garde(length(min = 1, max = MAX_ROUNDS_PER_TRACK), dive)]
    rounds: Vec<Round>,
    /// Cached first-appearance-ordered distinct items across all rounds
    #[garde(skip)]
    #[serde(skip)]
    vocabulary: OnceCell<Vec<ItemId>>,
}

impl Track {
    /// Creates a track from its identifier and ordered rounds
    pub fn new(id: TrackId, rounds: Vec<Round>) -> Self {
        Self {
            id,
            rounds,
            vocabulary: OnceCell::new(),
        }
    }

    /// Returns the identifier of this track
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Returns the round with the given 1-based number, if it exists
    pub fn round(&self, round: u32) -> Option<&Round> {
        round
            .checked_sub(1)
            .and_then(|index| self.rounds.get(index as usize))
    }

    /// Returns the number of rounds in this track
    pub fn round_count(&self) -> u32 {
        self.rounds.len() as u32
    }

    /// Returns every distinct item of this track in first-appearance order
    ///
    /// Computed once and cached, since tracks never change during play. The
    /// order is stable across calls, which lets hosts lay out an item board
    /// deterministically.
    pub fn vocabulary(&self) -> &[ItemId] {
        self.vocabulary.get_or_init(|| {
            self.rounds
                .iter()
                .flat_map(Round::items)
                .unique()
                .cloned()
                .collect_vec()
        })
    }
}

/// The full set of tracks available to a host
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Catalog {
    /// Tracks addressable by identifier
    #[garde(
        length(min = 1, max = MAX_TRACKS),
        custom(|tracks, _| validate_unique_track_ids(tracks)),
        dive
    )]
    tracks: Vec<Track>,
}

impl Catalog {
    /// Creates a catalog after validating its content limits
    ///
    /// # Errors
    ///
    /// Returns a validation report if the catalog is empty, exceeds the
    /// content limits in [`crate::constants::catalog`], repeats a track
    /// identifier, or contains an empty round.
    pub fn new(tracks: Vec<Track>) -> Result<Self, garde::Report> {
        let catalog = Self { tracks };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Returns the track with the given identifier, if it exists
    pub fn track(&self, track: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|candidate| candidate.id == *track)
    }

    /// Returns the item sequence for a 1-based round of a track
    ///
    /// The lookup is total and deterministic: the same arguments always
    /// produce the same sequence, and an unknown track or round produces
    /// an empty one.
    pub fn sequence_for(&self, track: &TrackId, round: u32) -> &[ItemId] {
        self.track(track)
            .and_then(|track| track.round(round))
            .map_or(&[], Round::items)
    }

    /// Returns the number of tracks in the catalog
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if the catalog contains no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Validates that no two tracks share an identifier
fn validate_unique_track_ids(tracks: &[Track]) -> ValidationResult {
    match tracks.iter().map(Track::id).duplicates().next() {
        Some(duplicate) => Err(garde::Error::new(format!(
            "track id {duplicate} appears more than once"
        ))),
        None => Ok(()),
    }
}
