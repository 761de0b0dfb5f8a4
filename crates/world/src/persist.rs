//! Record persistence with zstd compression.
//!
//! Every file is a 14-byte header (magic, version, CRC32 of the compressed
//! payload, payload length) followed by a zstd-compressed bincode payload.
//! Areas live in `area.<id>.mda`, players in `char.<id>.mdc`, and the clock
//! in `world.mdw`.

use crate::record::{AreaRecord, CharacterRecord, WorldMeta, WorldSnapshot};
use crc32fast::Hasher;
use mudsim_core::{AreaId, CharacterId, SimTick};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// "MDAR": area file.
const AREA_MAGIC: u32 = 0x4D44_4152;
/// "MDCH": character file.
const CHARACTER_MAGIC: u32 = 0x4D44_4348;
/// "MDWM": world meta file.
const META_MAGIC: u32 = 0x4D44_574D;

const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 14;
const ZSTD_LEVEL: i32 = 3;

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// bincode failed to encode or decode.
    #[error("record codec error in {}: {source}", .path.display())]
    Codec {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: bincode::Error,
    },
    /// Header is malformed or belongs to another file kind.
    #[error("corrupt header in {}: {reason}", .path.display())]
    CorruptHeader {
        /// File involved.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
    /// Payload checksum did not match.
    #[error("CRC32 mismatch in {}: expected {expected:08X}, got {computed:08X}", .path.display())]
    CrcMismatch {
        /// File involved.
        path: PathBuf,
        /// Checksum from the header.
        expected: u32,
        /// Checksum of the bytes read.
        computed: u32,
    },
    /// A snapshot references a record that is not stored.
    #[error("missing record: {0}")]
    Missing(String),
}

/// Where world state is loaded from and saved to.
pub trait WorldStore: Send + Sync {
    /// Latest saved snapshot, `None` for a fresh store.
    fn load_snapshot(&self) -> Result<Option<WorldSnapshot>, StoreError>;

    /// Persist a snapshot: every area, every listed player, then the clock.
    fn save_snapshot(&self, snapshot: &WorldSnapshot) -> Result<(), StoreError>;

    /// One saved player.
    fn load_character(&self, id: CharacterId) -> Result<Option<CharacterRecord>, StoreError>;

    /// Saved player by display name, ignoring case.
    fn find_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError>;

    /// Persist one player.
    fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct FileHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl FileHeader {
    fn new(magic: u32, crc32: u32, payload_len: u32) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn parse(bytes: &[u8; HEADER_LEN], expected_magic: u32, path: &Path) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::CorruptHeader {
            path: path.to_path_buf(),
            reason,
        };

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != expected_magic {
            return Err(corrupt(format!(
                "expected magic 0x{expected_magic:08X}, got 0x{magic:08X}"
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported version {version}")));
        }

        Ok(Self {
            magic,
            version,
            crc32: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

fn io_error<'a>(context: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |source| StoreError::Io {
        context,
        path: path.to_path_buf(),
        source,
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Encode `value` into header + compressed payload.
fn encode<T: Serialize>(magic: u32, value: &T, path: &Path) -> Result<Vec<u8>, StoreError> {
    let serialized = bincode::serialize(value).map_err(|source| StoreError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    let compressed =
        zstd::encode_all(&serialized[..], ZSTD_LEVEL).map_err(io_error("failed to compress record", path))?;
    let payload_len = u32::try_from(compressed.len()).map_err(|_| StoreError::CorruptHeader {
        path: path.to_path_buf(),
        reason: format!("payload of {} bytes is too large", compressed.len()),
    })?;

    let header = FileHeader::new(magic, checksum(&compressed), payload_len);
    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Validate and decode header + compressed payload.
fn decode<T: DeserializeOwned>(magic: u32, mut reader: impl Read, path: &Path) -> Result<T, StoreError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header_bytes)
        .map_err(io_error("failed to read header", path))?;
    let header = FileHeader::parse(&header_bytes, magic, path)?;

    let mut compressed = vec![0u8; header.payload_len as usize];
    reader
        .read_exact(&mut compressed)
        .map_err(io_error("failed to read payload", path))?;

    let computed = checksum(&compressed);
    if computed != header.crc32 {
        return Err(StoreError::CrcMismatch {
            path: path.to_path_buf(),
            expected: header.crc32,
            computed,
        });
    }

    let decompressed =
        zstd::decode_all(&compressed[..]).map_err(io_error("failed to decompress record", path))?;
    bincode::deserialize(&decompressed).map_err(|source| StoreError::Codec {
        path: path.to_path_buf(),
        source,
    })
}

/// One file per record under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `data_dir`, created if missing.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(io_error("failed to create data directory", &data_dir))?;
        Ok(Self { data_dir })
    }

    /// Root directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn meta_path(&self) -> PathBuf {
        self.data_dir.join("world.mdw")
    }

    fn area_path(&self, id: AreaId) -> PathBuf {
        self.data_dir.join(format!("area.{}.mda", id.0))
    }

    fn character_path(&self, id: CharacterId) -> PathBuf {
        self.data_dir.join(format!("char.{}.mdc", id.0))
    }

    fn write<T: Serialize>(&self, path: &Path, magic: u32, value: &T) -> Result<(), StoreError> {
        let bytes = encode(magic, value, path)?;
        let mut file = File::create(path).map_err(io_error("failed to create record file", path))?;
        file.write_all(&bytes)
            .map_err(io_error("failed to write record file", path))?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path, magic: u32) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).map_err(io_error("failed to open record file", path))?;
        decode(magic, io::BufReader::new(file), path).map(Some)
    }

    fn character_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.data_dir).map_err(io_error("failed to list data directory", &self.data_dir))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(io_error("failed to list data directory", &self.data_dir))?
                .path();
            if path.extension().is_some_and(|ext| ext == "mdc") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl WorldStore for FileStore {
    fn load_snapshot(&self) -> Result<Option<WorldSnapshot>, StoreError> {
        let Some(meta) = self.read::<MetaFile>(&self.meta_path(), META_MAGIC)? else {
            return Ok(None);
        };

        let mut areas = Vec::with_capacity(meta.areas.len());
        for id in &meta.areas {
            let area = self
                .read::<AreaRecord>(&self.area_path(*id), AREA_MAGIC)?
                .ok_or_else(|| StoreError::Missing(format!("area {id}")))?;
            areas.push(area);
        }

        debug!(dir = %self.data_dir.display(), areas = areas.len(), "snapshot loaded");
        Ok(Some(WorldSnapshot {
            meta: meta.meta,
            areas,
            characters: Vec::new(),
        }))
    }

    fn save_snapshot(&self, snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        for area in &snapshot.areas {
            self.write(&self.area_path(area.id), AREA_MAGIC, area)?;
        }
        for character in &snapshot.characters {
            self.save_character(character)?;
        }
        // Written last so a torn save still points at complete area files.
        let meta = MetaFile {
            meta: snapshot.meta,
            areas: snapshot.areas.iter().map(|area| area.id).collect(),
        };
        self.write(&self.meta_path(), META_MAGIC, &meta)?;
        debug!(
            dir = %self.data_dir.display(),
            tick = snapshot.meta.tick.0,
            areas = snapshot.areas.len(),
            characters = snapshot.characters.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn load_character(&self, id: CharacterId) -> Result<Option<CharacterRecord>, StoreError> {
        self.read(&self.character_path(id), CHARACTER_MAGIC)
    }

    fn find_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError> {
        for path in self.character_paths()? {
            match self.read::<CharacterRecord>(&path, CHARACTER_MAGIC) {
                Ok(Some(record)) if record.name.eq_ignore_ascii_case(name) => return Ok(Some(record)),
                Ok(_) => {}
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable character file"),
            }
        }
        Ok(None)
    }

    fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError> {
        self.write(&self.character_path(record.id), CHARACTER_MAGIC, record)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaFile {
    meta: WorldMeta,
    areas: Vec<AreaId>,
}

/// In-process store for tests and throwaway servers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    meta: Option<WorldMeta>,
    areas: BTreeMap<AreaId, AreaRecord>,
    characters: BTreeMap<CharacterId, CharacterRecord>,
    snapshots_saved: usize,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: &WorldSnapshot) -> Self {
        let store = Self::new();
        {
            let mut state = store.state();
            state.meta = Some(snapshot.meta);
            state.areas = snapshot.areas.iter().map(|area| (area.id, area.clone())).collect();
            state.characters = snapshot
                .characters
                .iter()
                .map(|character| (character.id, character.clone()))
                .collect();
        }
        store
    }

    /// How many snapshots have been saved.
    pub fn snapshots_saved(&self) -> usize {
        self.state().snapshots_saved
    }

    /// Tick of the last saved snapshot.
    pub fn saved_tick(&self) -> Option<SimTick> {
        self.state().meta.map(|meta| meta.tick)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorldStore for MemoryStore {
    fn load_snapshot(&self) -> Result<Option<WorldSnapshot>, StoreError> {
        let state = self.state();
        let Some(meta) = state.meta else {
            return Ok(None);
        };
        Ok(Some(WorldSnapshot {
            meta,
            areas: state.areas.values().cloned().collect(),
            characters: Vec::new(),
        }))
    }

    fn save_snapshot(&self, snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        let mut state = self.state();
        state.meta = Some(snapshot.meta);
        for area in &snapshot.areas {
            state.areas.insert(area.id, area.clone());
        }
        for character in &snapshot.characters {
            state.characters.insert(character.id, character.clone());
        }
        state.snapshots_saved += 1;
        Ok(())
    }

    fn load_character(&self, id: CharacterId) -> Result<Option<CharacterRecord>, StoreError> {
        Ok(self.state().characters.get(&id).cloned())
    }

    fn find_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError> {
        Ok(self
            .state()
            .characters
            .values()
            .find(|record| record.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError> {
        self.state().characters.insert(record.id, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BehaviorSpec, NpcTemplate, RoomRecord, SpawnerRecord};
    use mudsim_core::{RoomId, SpawnerId};

    fn sample_snapshot() -> WorldSnapshot {
        let mut hero = CharacterRecord::new_player(CharacterId(7), "Aria");
        hero.room = Some(RoomId(2));
        hero.experience = 300;
        WorldSnapshot {
            meta: WorldMeta {
                tick: SimTick(40),
                next_character_id: 120,
            },
            areas: vec![AreaRecord {
                id: AreaId(1),
                name: "Millbrook".into(),
                rooms: vec![RoomRecord {
                    id: RoomId(2),
                    name: "Cellar".into(),
                    description: "Damp stone.".into(),
                    spawners: vec![SpawnerRecord {
                        id: SpawnerId(1),
                        template: NpcTemplate::new("rat", 1, 4).with_behavior(BehaviorSpec::Aggressive),
                        max_population: 3,
                        interval_ticks: 10,
                    }],
                }],
            }],
            characters: vec![hero],
        }
    }

    #[test]
    fn header_round_trips() {
        let header = FileHeader::new(AREA_MAGIC, 0xDEAD_BEEF, 99);
        let parsed = FileHeader::parse(&header.to_bytes(), AREA_MAGIC, Path::new("x")).expect("parse");
        assert_eq!(parsed.crc32, 0xDEAD_BEEF);
        assert_eq!(parsed.payload_len, 99);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let header = FileHeader::new(AREA_MAGIC, 0, 0);
        let err = FileHeader::parse(&header.to_bytes(), CHARACTER_MAGIC, Path::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::CorruptHeader { .. }));
    }

    #[test]
    fn flipped_payload_byte_fails_crc() {
        let record = CharacterRecord::new_player(CharacterId(1), "Aria");
        let mut bytes = encode(CHARACTER_MAGIC, &record, Path::new("x")).expect("encode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = decode::<CharacterRecord>(CHARACTER_MAGIC, &bytes[..], Path::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::CrcMismatch { .. }));
    }

    #[test]
    fn truncated_file_is_an_io_error() {
        let record = CharacterRecord::new_player(CharacterId(1), "Aria");
        let bytes = encode(CHARACTER_MAGIC, &record, Path::new("x")).expect("encode");
        let err = decode::<CharacterRecord>(CHARACTER_MAGIC, &bytes[..bytes.len() - 3], Path::new("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn every_behaviour_survives_the_area_codec() {
        let mut snapshot = sample_snapshot();
        let behaviours = [
            BehaviorSpec::Passive,
            BehaviorSpec::Aggressive,
            BehaviorSpec::Chatty {
                line: "Squeak!".into(),
                every_ticks: 4,
            },
        ];
        let spawners = &mut snapshot.areas[0].rooms[0].spawners;
        let rat = spawners[0].clone();
        spawners.clear();
        for (n, behaviour) in behaviours.iter().enumerate() {
            let mut spawner = rat.clone();
            spawner.id = SpawnerId(n as u64 + 1);
            spawner.template.behavior = behaviour.clone();
            spawners.push(spawner);
        }

        let area = &snapshot.areas[0];
        let bytes = encode(AREA_MAGIC, area, Path::new("area")).expect("encode");
        let decoded = decode::<AreaRecord>(AREA_MAGIC, &bytes[..], Path::new("area")).expect("decode");
        assert_eq!(&decoded, area);
    }

    #[test]
    fn file_store_round_trips_a_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("data")).expect("store");
        assert!(store.load_snapshot().expect("load").is_none());

        let snapshot = sample_snapshot();
        store.save_snapshot(&snapshot).expect("save");

        let loaded = store.load_snapshot().expect("load").expect("present");
        assert_eq!(loaded.meta, snapshot.meta);
        assert_eq!(loaded.areas, snapshot.areas);
        assert_eq!(
            store.load_character(CharacterId(7)).expect("load"),
            Some(snapshot.characters[0].clone())
        );
        assert_eq!(
            store.find_character("aria").expect("find").map(|c| c.id),
            Some(CharacterId(7))
        );
        assert!(store.load_character(CharacterId(8)).expect("load").is_none());
    }

    #[test]
    fn missing_area_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path()).expect("store");
        store.save_snapshot(&sample_snapshot()).expect("save");
        fs::remove_file(store.area_path(AreaId(1))).expect("remove");

        assert!(matches!(store.load_snapshot(), Err(StoreError::Missing(_))));
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::new();
        assert!(store.load_snapshot().expect("load").is_none());
        store.save_snapshot(&sample_snapshot()).expect("save");
        store.save_snapshot(&sample_snapshot()).expect("save");

        assert_eq!(store.snapshots_saved(), 2);
        assert_eq!(store.saved_tick(), Some(SimTick(40)));
        assert!(store.find_character("ARIA").expect("find").is_some());
    }
}
