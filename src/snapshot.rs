//! Snapshot persistence for resumable sessions
//!
//! A [`Snapshot`] captures the complete persistable state of one session
//! as versioned JSON, safe to take at any instant: mid-countdown, mid-
//! playback, or mid-celebration. Hosts hand storage to the engine through
//! the [`SnapshotStore`] trait and rebuild sessions with [`resume_or_new`],
//! which falls back to a fresh session whenever a saved one cannot be
//! trusted.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{
    catalog::{Catalog, TrackId},
    game::{Game, GameError, SessionState},
    pacing::Pacing,
    view::View,
};

/// Current snapshot format version
///
/// Decoding refuses snapshots written with another version instead of
/// guessing at their meaning.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A stable identity for one session across snapshots
///
/// The identity survives persistence, so a resumed session is
/// recognizably the same one that was saved earlier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    /// Creates a new random session identity (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    /// Formats the identity as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    /// Parses a session identity from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Names the save slot a session persists under
///
/// Hosts choose the granularity: one scene per device, per child
/// profile, or per activity screen.
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
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Creates a scene identifier from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// One persisted session: versioned, timestamped, and self-contained
///
/// Pending alarm deadlines are not part of a snapshot; see
/// [`SessionState`] for how a resumed session re-arms them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version, checked on decode
    version: u32,
    /// Identity of the session the state belongs to
    session: SessionId,
    /// Wall-clock moment the snapshot was taken
    saved_at: SystemTime,
    /// Complete session state
    state: SessionState,
}

/// Errors from decoding a persisted snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The persisted text is not a valid snapshot document
    #[error("snapshot is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// The snapshot was written with a format this build does not know
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

impl Snapshot {
    /// Captures the given session state, stamped with the current time
    pub fn new(session: SessionId, state: SessionState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            session,
            saved_at: SystemTime::now(),
            state,
        }
    }

    /// Returns the format version the snapshot was written with
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the identity of the saved session
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns the wall-clock moment the snapshot was taken
    pub fn saved_at(&self) -> SystemTime {
        self.saved_at
    }

    /// Returns the saved session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Splits the snapshot into the session identity and its state
    pub fn into_parts(self) -> (SessionId, SessionState) {
        (self.session, self.state)
    }

    /// Serializes the snapshot to its JSON wire form
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never
    /// happen with the default JSON serializer for well-formed data.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }

    /// Parses a snapshot back from its JSON wire form
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Corrupt`] if the text is not a snapshot
    /// document, or [`SnapshotError::UnsupportedVersion`] if it was
    /// written with a different format version.
    pub fn decode(encoded: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(encoded)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}

/// Storage for encoded snapshots, keyed by scene
///
/// Hosts implement this over whatever they have: browser local storage,
/// a file per scene, or a table row. The engine only ever stores one
/// snapshot per scene, overwriting the previous one.
pub trait SnapshotStore {
    /// Stores the encoded snapshot under the scene, replacing any old one
    fn save(&mut self, scene: &SceneId, snapshot: &str);

    /// Returns the encoded snapshot stored under the scene, if any
    fn load(&self, scene: &SceneId) -> Option<String>;
}

/// A store that keeps nothing, for hosts without persistence
impl SnapshotStore for () {
    fn save(&mut self, _scene: &SceneId, _snapshot: &str) {}

    fn load(&self, _scene: &SceneId) -> Option<String> {
        None
    }
}

/// Persists the session's current snapshot under the scene
pub fn persist<S: SnapshotStore>(store: &mut S, scene: &SceneId, game: &Game) {
    store.save(scene, &game.snapshot().encode());
    debug!(%scene, session = %game.session(), "session snapshot persisted");
}

/// Resumes the scene's saved session, or starts a fresh one
///
/// Anything wrong with the saved data, whether it is missing, corrupt,
/// written for another track, or inconsistent with the current catalog,
/// falls back to a fresh session on round 1; resuming never hard-fails
/// on bad saved data. The returned session is live: the view has been
/// synced and the current phase's alarms are armed.
///
/// # Errors
///
/// Returns an error only when a fresh session cannot be built, such as
/// when the requested track is missing from the catalog.
pub fn resume_or_new<S: SnapshotStore, V: View, C: FnMut(&TrackId)>(
    store: &S,
    scene: &SceneId,
    catalog: Catalog,
    track: TrackId,
    pacing: Pacing,
    view: &V,
    on_complete: &mut C,
) -> Result<Game, GameError> {
    let resumed = match store.load(scene) {
        Some(encoded) => try_resume(&encoded, scene, &catalog, &track, &pacing),
        None => {
            info!(%scene, "no snapshot found, starting a fresh session");
            None
        }
    };
    let mut game = match resumed {
        Some(game) => game,
        None => Game::new(catalog, track, pacing)?,
    };
    game.activate(view, on_complete);
    Ok(game)
}

/// Rebuilds a session from encoded snapshot text, or explains why not
fn try_resume(
    encoded: &str,
    scene: &SceneId,
    catalog: &Catalog,
    track: &TrackId,
    pacing: &Pacing,
) -> Option<Game> {
    let snapshot = match Snapshot::decode(encoded) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(%scene, %error, "snapshot is corrupt, starting fresh");
            return None;
        }
    };
    if snapshot.state().track() != track {
        warn!(
            %scene,
            saved_track = %snapshot.state().track(),
            "snapshot belongs to a different track, starting fresh"
        );
        return None;
    }
    match Game::from_snapshot(catalog.clone(), pacing.clone(), snapshot) {
        Ok(game) => {
            info!(%scene, session = %game.session(), "resuming session from snapshot");
            Some(game)
        }
        Err(error) => {
            warn!(%scene, %error, "snapshot failed integrity checks, starting fresh");
            None
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use web_time::Duration;

    use super::*;
    use crate::{
        catalog::{ItemId, Round, Track},
        constants::pacing::{DEFAULT_AUTO_START, DEFAULT_COUNTDOWN_TICK},
        game::Phase,
    };

    #[derive(Default)]
    struct MemoryStore {
        snapshots: HashMap<SceneId, String>,
    }

    impl SnapshotStore for MemoryStore {
        fn save(&mut self, scene: &SceneId, snapshot: &str) {
            self.snapshots.insert(scene.clone(), snapshot.to_owned());
        }

        fn load(&self, scene: &SceneId) -> Option<String> {
            self.snapshots.get(scene).cloned()
        }
    }

    fn millis(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn create_test_catalog() -> Catalog {
        Catalog::new(vec![
            Track::new(
                TrackId::from("demo"),
                vec![
                    Round::new(vec![ItemId::from("ba"), ItemId::from("na")]),
                    Round::new(vec![
                        ItemId::from("ba"),
                        ItemId::from("na"),
                        ItemId::from("na"),
                    ]),
                ],
            ),
            Track::new(TrackId::from("other"), vec![Round::new(vec![ItemId::from("go")])]),
        ])
        .unwrap()
    }

    fn create_test_game() -> Game {
        Game::new(
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_session_id_serialization_round_trip() {
        let id = SessionId::new();

        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: SessionId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, id);
        assert_ne!(SessionId::new(), id);
    }

    #[test]
    fn test_session_id_from_str_invalid() {
        assert!(SessionId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_scene_id_display() {
        assert_eq!(SceneId::from("bedroom").to_string(), "bedroom");
        assert_eq!(SceneId::new("kitchen").as_str(), "kitchen");
    }

    #[test]
    fn test_snapshot_encode_decode_round_trip() {
        let game = create_test_game();
        let snapshot = game.snapshot();

        let decoded = Snapshot::decode(&snapshot.encode()).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.version(), SNAPSHOT_VERSION);
        assert_eq!(decoded.session(), game.session());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Snapshot::decode("definitely not json"),
            Err(SnapshotError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut value: serde_json::Value =
            serde_json::from_str(&create_test_game().snapshot().encode()).unwrap();
        value["version"] = serde_json::Value::from(99);

        assert!(matches!(
            Snapshot::decode(&value.to_string()),
            Err(SnapshotError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_persist_then_resume_restores_the_session() {
        let mut store = MemoryStore::default();
        let scene = SceneId::from("bedroom");
        let mut game = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();
        game.advance(
            millis(DEFAULT_AUTO_START + DEFAULT_COUNTDOWN_TICK),
            &(),
            &(),
            &mut |_| {},
        );
        assert_eq!(game.state().phase(), Phase::CountingDown);
        persist(&mut store, &scene, &game);

        let resumed = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();

        assert!(resumed.is_active());
        assert_eq!(resumed.session(), game.session());
        assert_eq!(resumed.state(), game.state());
        assert_eq!(resumed.state().countdown_remaining(), 2);
    }

    #[test]
    fn test_missing_snapshot_starts_fresh() {
        let store = MemoryStore::default();
        let scene = SceneId::from("bedroom");

        let game = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();

        assert!(game.is_active());
        assert_eq!(game.state().phase(), Phase::Waiting);
        assert_eq!(game.state().round(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_starts_fresh() {
        let mut store = MemoryStore::default();
        let scene = SceneId::from("bedroom");
        store.save(&scene, "{ truncated");

        let game = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(game.state().phase(), Phase::Waiting);
        assert_eq!(game.state().round(), 1);
    }

    #[test]
    fn test_snapshot_for_another_track_starts_fresh() {
        let mut store = MemoryStore::default();
        let scene = SceneId::from("bedroom");
        let other = Game::new(
            create_test_catalog(),
            TrackId::from("other"),
            Pacing::default(),
        )
        .unwrap();
        persist(&mut store, &scene, &other);

        let game = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(game.state().track(), &TrackId::from("demo"));
        assert_ne!(game.session(), other.session());
    }

    #[test]
    fn test_tampered_snapshot_starts_fresh() {
        let game = create_test_game();
        let mut value: serde_json::Value =
            serde_json::from_str(&game.snapshot().encode()).unwrap();
        value["state"]["player_input"] = serde_json::json!(["na"]);
        let mut store = MemoryStore::default();
        let scene = SceneId::from("bedroom");
        store.save(&scene, &value.to_string());

        let resumed = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("demo"),
            Pacing::default(),
            &(),
            &mut |_| {},
        )
        .unwrap();

        assert_ne!(resumed.session(), game.session());
        assert_eq!(resumed.state().phase(), Phase::Waiting);
        assert!(resumed.state().player_input().is_empty());
    }

    #[test]
    fn test_resume_propagates_missing_track() {
        let store = MemoryStore::default();
        let scene = SceneId::from("bedroom");

        let result = resume_or_new(
            &store,
            &scene,
            create_test_catalog(),
            TrackId::from("missing"),
            Pacing::default(),
            &(),
            &mut |_| {},
        );

        assert_eq!(
            result.err(),
            Some(GameError::TrackNotFound(TrackId::from("missing")))
        );
    }

    #[test]
    fn test_noop_store_keeps_nothing() {
        let mut store = ();
        let scene = SceneId::from("bedroom");
        let game = create_test_game();

        persist(&mut store, &scene, &game);

        assert_eq!(store.load(&scene), None);
    }
}
