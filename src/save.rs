//! Save files: JSON snapshots of a session under named slots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Player, SessionContext};

/// Bump when the on-disk shape changes incompatibly.
pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveGame {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub session_id: String,
    pub player: Player,
    pub location: String,
}

impl SaveGame {
    pub fn capture(session: &SessionContext) -> Self {
        SaveGame {
            format_version: SAVE_FORMAT_VERSION,
            saved_at: Utc::now(),
            session_id: session.id.clone(),
            player: session.player.clone(),
            location: session.location.clone(),
        }
    }

    /// Restore this snapshot into a live session. The event log is not
    /// part of a save; whatever the session logged so far stays.
    pub fn apply(&self, session: &mut SessionContext) {
        session.id = self.session_id.clone();
        session.player = self.player.clone();
        if session.world.contains(&self.location) {
            session.location = self.location.clone();
        } else {
            tracing::warn!(
                location = %self.location,
                "saved location missing from world, starting at the beginning"
            );
            session.location = session.world.start_location().to_string();
        }
    }
}

#[derive(Debug)]
pub enum SaveError {
    InvalidSlot(String),
    Version(u32),
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::InvalidSlot(slot) => write!(f, "invalid slot name: {}", slot),
            SaveError::Version(found) => write!(
                f,
                "save format {} is newer than this build understands ({})",
                found, SAVE_FORMAT_VERSION
            ),
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Parse(msg) => write!(f, "could not parse save file: {}", msg),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

/// Map a slot name to its file, refusing anything that could escape the
/// save directory. Slot names are lowercased; only ASCII alphanumerics,
/// `_` and `-` pass.
pub fn slot_file(dir: &Path, slot: &str) -> Result<PathBuf, SaveError> {
    let slot = slot.trim().to_lowercase();
    if slot.is_empty()
        || !slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SaveError::InvalidSlot(slot));
    }
    Ok(dir.join(format!("{}.json", slot)))
}

pub async fn write_save(dir: &Path, slot: &str, save: &SaveGame) -> Result<PathBuf, SaveError> {
    let path = slot_file(dir, slot)?;
    tokio::fs::create_dir_all(dir).await?;
    let body = serde_json::to_string_pretty(save).map_err(|e| SaveError::Parse(e.to_string()))?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

pub async fn read_save(dir: &Path, slot: &str) -> Result<SaveGame, SaveError> {
    let path = slot_file(dir, slot)?;
    let body = tokio::fs::read_to_string(&path).await?;
    let save: SaveGame =
        serde_json::from_str(&body).map_err(|e| SaveError::Parse(e.to_string()))?;
    if save.format_version > SAVE_FORMAT_VERSION {
        return Err(SaveError::Version(save.format_version));
    }
    Ok(save)
}

/// Slot names present in the save directory, sorted.
pub fn list_slots(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut slots: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .collect();
    slots.sort();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn slot_names_are_normalized_and_checked() {
        let dir = Path::new("/tmp/saves");
        assert_eq!(
            slot_file(dir, "  Quicksave ").unwrap(),
            dir.join("quicksave.json")
        );
        assert!(matches!(
            slot_file(dir, "../escape"),
            Err(SaveError::InvalidSlot(_))
        ));
        assert!(matches!(slot_file(dir, ""), Err(SaveError::InvalidSlot(_))));
        assert!(matches!(
            slot_file(dir, "two words"),
            Err(SaveError::InvalidSlot(_))
        ));
    }

    #[test]
    fn save_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();

        let mut session = SessionContext::new(Player::new("Brina"), World::starter());
        session.location = "forest".to_string();
        session.player.take_damage(5);

        let save = SaveGame::capture(&session);
        rt.block_on(write_save(dir.path(), "slot1", &save)).unwrap();

        let loaded = rt.block_on(read_save(dir.path(), "slot1")).unwrap();
        let mut fresh = SessionContext::new(Player::new("Someone"), World::starter());
        loaded.apply(&mut fresh);

        assert_eq!(fresh.id, session.id);
        assert_eq!(fresh.player.name, "Brina");
        assert_eq!(fresh.player.health, session.player.health);
        assert_eq!(fresh.location, "forest");
    }

    #[test]
    fn newer_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();

        let session = SessionContext::new(Player::new("Brina"), World::starter());
        let mut save = SaveGame::capture(&session);
        save.format_version = SAVE_FORMAT_VERSION + 1;
        rt.block_on(write_save(dir.path(), "future", &save)).unwrap();

        let err = rt.block_on(read_save(dir.path(), "future")).unwrap_err();
        assert!(matches!(err, SaveError::Version(v) if v == SAVE_FORMAT_VERSION + 1));
    }

    #[test]
    fn unknown_saved_location_falls_back_to_start() {
        let session = SessionContext::new(Player::new("Brina"), World::starter());
        let mut save = SaveGame::capture(&session);
        save.location = "atlantis".to_string();

        let mut fresh = SessionContext::new(Player::new("Brina"), World::starter());
        save.apply(&mut fresh);
        assert_eq!(fresh.location, fresh.world.start_location());
    }

    #[test]
    fn missing_save_reads_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let err = rt.block_on(read_save(dir.path(), "nothing")).unwrap_err();
        assert!(matches!(err, SaveError::Io(_)));
    }

    #[test]
    fn list_slots_reports_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "no").unwrap();

        assert_eq!(list_slots(dir.path()), vec!["a", "b"]);
    }
}
