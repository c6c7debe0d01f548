//! Station library: a versioned JSON file of saved stations.
//!
//! Every mutation is a full load → modify → atomic save cycle guarded by an
//! in-process lock.  The file is written through a temp file in the same
//! directory and renamed into place, so readers only ever see the previous
//! or the new complete document.  Keys are emitted sorted so re-saving a
//! freshly loaded library is byte-identical.

use crate::error::{Result, SqlchError};
use crate::platform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub const LIBRARY_VERSION: u32 = 1;

/// Play query that resolves to the most recently played station.
pub const LAST_PLAYED_QUERY: &str = "__last__";

/// Fields of `Station` that are type-checked on load.  Anything else is
/// carried through untouched in `Station::extra`.
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "name",
    "url",
    "category",
    "tags",
    "notes",
    "added_at",
    "last_played",
    "play_count",
    "source",
    "stream",
];

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ── Types ─────────────────────────────────────────────────────────────────────

/// Where a station came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type", default = "default_source_type")]
    pub kind: String,
    #[serde(default = "default_source_origin")]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_source_type() -> String {
    "manual".to_string()
}

fn default_source_origin() -> String {
    "user".to_string()
}

impl Default for Source {
    fn default() -> Self {
        Self {
            kind: default_source_type(),
            origin: default_source_origin(),
            country: None,
            codec: None,
            bitrate: None,
            homepage: None,
            uuid: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Source {
    pub fn discovered(origin: &str) -> Self {
        Self {
            kind: "discover".to_string(),
            origin: origin.to_string(),
            ..Self::default()
        }
    }
}

/// Technical details of the stream, filled in when known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub last_checked: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Normalized slug, assigned once from the name.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Unix seconds.
    #[serde(default = "now")]
    pub added_at: i64,
    #[serde(default)]
    pub last_played: Option<i64>,
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub stream: StreamInfo,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Station {
    /// Build a station from a raw JSON value, backfilling missing fields and
    /// discarding (with a warning) known fields of the wrong shape.  Never
    /// fails: the worst case is a station carrying only defaults.
    pub fn from_value(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                warn!("library: station entry is not an object: {}", other);
                Map::new()
            }
        };

        map.retain(|key, value| {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                return true;
            }
            if value.is_null() {
                return false;
            }
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            let ok = serde_json::from_value::<Station>(Value::Object(single)).is_ok();
            if !ok {
                warn!("library: dropping malformed field '{}': {}", key, value);
            }
            ok
        });

        let mut station = serde_json::from_value::<Station>(Value::Object(map))
            .unwrap_or_else(|e| {
                warn!("library: unreadable station, using defaults: {}", e);
                Station::blank()
            });
        station.normalize();
        station
    }

    fn blank() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            url: None,
            category: None,
            tags: Vec::new(),
            notes: None,
            added_at: now(),
            last_played: None,
            play_count: 0,
            source: Source::default(),
            stream: StreamInfo::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Fill the fields that have derived defaults.
    pub fn normalize(&mut self) {
        if self.name.trim().is_empty() {
            self.name = "Unknown".to_string();
        }
        if self.id.is_empty() {
            self.id = normalize_id(&self.name);
        }
        if self.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            self.url = None;
        }
    }

    /// Stream url, if the station has a usable one.
    pub fn stream_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Shell-safe, stable station id derived from a display name.
///
/// `"Jazz FM!!"` → `"jazz-fm"`.  A name with nothing usable in it becomes
/// `"station"`.
pub fn normalize_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "station".to_string()
    } else {
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub version: u32,
    pub stations: Vec<Station>,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            version: LIBRARY_VERSION,
            stations: Vec::new(),
        }
    }
}

impl Library {
    /// Normalize a parsed document: backfill every station and make ids
    /// unique by suffixing later duplicates.
    fn from_value(value: Value) -> Self {
        let version = value
            .get("version")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(LIBRARY_VERSION);

        let raw = match value.get("stations") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut stations = Vec::with_capacity(raw.len());
        for item in raw {
            let mut station = Station::from_value(item);
            if !seen.insert(station.id.clone()) {
                let base = station.id.clone();
                let mut n = 2;
                while seen.contains(&format!("{}-{}", base, n)) {
                    n += 1;
                }
                station.id = format!("{}-{}", base, n);
                warn!("library: duplicate id '{}' renamed to '{}'", base, station.id);
                seen.insert(station.id.clone());
            }
            stations.push(station);
        }

        Self { version, stations }
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Case-insensitive lookup: exact id or name first, then the first name
    /// containing the query.
    pub fn find(&self, query: &str) -> Option<&Station> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        if q == LAST_PLAYED_QUERY {
            return self
                .stations
                .iter()
                .filter(|s| s.last_played.is_some())
                .max_by_key(|s| s.last_played);
        }
        self.stations
            .iter()
            .find(|s| s.id == q || s.name.to_lowercase() == q)
            .or_else(|| {
                self.stations
                    .iter()
                    .find(|s| s.name.to_lowercase().contains(&q))
            })
    }

    fn to_json(&self) -> Result<String> {
        let value = sort_keys(serde_json::to_value(self)?);
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        Ok(out)
    }
}

/// Rebuild every object with keys in lexical order, independent of how the
/// map type orders them.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Input for `LibraryStore::add`.
#[derive(Debug, Clone, Default)]
pub struct NewStation {
    pub name: String,
    pub url: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub stream: Option<StreamInfo>,
    pub source: Option<Source>,
}

impl NewStation {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct LibraryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LibraryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store at the default location under the data directory.
    pub fn open_default() -> Self {
        Self::new(platform::library_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load(&self) -> Library {
        let _guard = self.guard();
        self.load_locked()
    }

    pub fn save(&self, library: &Library) -> Result<()> {
        let _guard = self.guard();
        self.save_locked(library)
    }

    fn load_locked(&self) -> Library {
        if !self.path.exists() {
            let library = Library::default();
            match self.save_locked(&library) {
                Ok(()) => info!("library: created {}", self.path.display()),
                Err(e) => warn!("library: could not create {}: {}", self.path.display(), e),
            }
            return library;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!("library: unreadable {}: {}", self.path.display(), e);
                return Library::default();
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(value) if value.is_object() => Library::from_value(value),
            Ok(_) => {
                warn!("library: {} is not a JSON object, using empty library", self.path.display());
                Library::default()
            }
            Err(e) => {
                warn!("library: corrupt {}: {}", self.path.display(), e);
                Library::default()
            }
        }
    }

    fn save_locked(&self, library: &Library) -> Result<()> {
        let json = library.to_json()?;
        atomic_write(&self.path, json.as_bytes())?;
        debug!("library: saved {} stations", library.stations.len());
        Ok(())
    }

    pub fn list(&self, category: Option<&str>) -> Vec<Station> {
        let library = self.load();
        match category {
            Some(cat) => library
                .stations
                .into_iter()
                .filter(|s| s.category.as_deref() == Some(cat))
                .collect(),
            None => library.stations,
        }
    }

    pub fn get(&self, id: &str) -> Option<Station> {
        self.load().get(id).cloned()
    }

    pub fn find(&self, query: &str) -> Option<Station> {
        self.load().find(query).cloned()
    }

    /// Add a station.  When the normalized id already exists the existing
    /// entry is returned if `allow_existing`, otherwise `Collision`.
    pub fn add(&self, new: NewStation, allow_existing: bool) -> Result<Station> {
        let _guard = self.guard();
        let mut library = self.load_locked();
        let id = normalize_id(&new.name);

        if let Some(existing) = library.get(&id) {
            if allow_existing {
                return Ok(existing.clone());
            }
            return Err(SqlchError::Collision(id));
        }

        let mut station = Station {
            id,
            name: new.name,
            url: Some(new.url),
            category: new.category,
            tags: new.tags,
            stream: new.stream.unwrap_or_default(),
            source: new.source.unwrap_or_default(),
            ..Station::blank()
        };
        station.normalize();

        library.stations.push(station.clone());
        self.save_locked(&library)?;
        info!("library: added '{}'", station.id);
        Ok(station)
    }

    /// Merge `fields` into the station.  The `id` key is ignored.
    pub fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Station> {
        let _guard = self.guard();
        let mut library = self.load_locked();
        let idx = library
            .stations
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SqlchError::NotFound(id.to_string()))?;

        let mut value = serde_json::to_value(&library.stations[idx])?;
        if let Value::Object(obj) = &mut value {
            for (key, field) in fields {
                if key != "id" {
                    obj.insert(key, field);
                }
            }
        }
        let mut updated: Station = serde_json::from_value(value)?;
        updated.normalize();

        library.stations[idx] = updated.clone();
        self.save_locked(&library)?;
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> bool {
        let _guard = self.guard();
        let mut library = self.load_locked();
        let before = library.stations.len();
        library.stations.retain(|s| s.id != id);
        if library.stations.len() == before {
            return false;
        }
        if let Err(e) = self.save_locked(&library) {
            warn!("library: remove '{}' not persisted: {}", id, e);
            return false;
        }
        true
    }

    /// Bump play statistics.  Unknown ids are ignored.
    pub fn record_play(&self, id: &str) -> Result<()> {
        let _guard = self.guard();
        let mut library = self.load_locked();
        let Some(station) = library.stations.iter_mut().find(|s| s.id == id) else {
            return Ok(());
        };
        station.last_played = Some(now());
        station.play_count += 1;
        self.save_locked(&library)
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, LibraryStore) {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        (dir, store)
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("Jazz FM"), "jazz-fm");
        assert_eq!(normalize_id("Jazz FM!!"), "jazz-fm");
        assert_eq!(normalize_id("  --Radio__Paradise  Main-- "), "radio-paradise-main");
        assert_eq!(normalize_id("FIP (Groove)"), "fip-groove");
        assert_eq!(normalize_id("!!!"), "station");
    }

    #[test]
    fn test_add_collision() {
        let (_dir, store) = store();
        let first = store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        assert_eq!(first.id, "jazz-fm");
        assert_eq!(first.play_count, 0);

        let err = store
            .add(NewStation::new("Jazz FM!!", "http://other/z"), false)
            .unwrap_err();
        match err {
            SqlchError::Collision(slug) => assert_eq!(slug, "jazz-fm"),
            other => panic!("expected collision, got {:?}", other),
        }

        let existing = store
            .add(NewStation::new("jazz fm", "http://other/z"), true)
            .unwrap();
        assert_eq!(existing, first);
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let (_dir, store) = store();
        assert!(!store.path().exists());
        let library = store.load();
        assert_eq!(library, Library::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_file_yields_empty_library() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), Library::default());
        // The corrupt file is left alone rather than overwritten on read.
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_load_is_fixed_point() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        let mut fip = NewStation::new("FIP", "http://fip/stream");
        fip.tags = vec!["eclectic".into(), "france".into()];
        fip.category = Some("music".into());
        store.add(fip, false).unwrap();

        let before = std::fs::read(store.path()).unwrap();
        store.save(&store.load()).unwrap();
        let after = std::fs::read(store.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_saved_keys_are_sorted() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        let added = text.find("\"added_at\"").unwrap();
        let url = text.find("\"url\"").unwrap();
        let stations = text.find("\"stations\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        assert!(added < url);
        assert!(stations < version);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (dir, store) = store();
        store.add(NewStation::new("A", "http://a"), false).unwrap();
        store.add(NewStation::new("B", "http://b"), false).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("library.json")]);
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
        let canary = dir.path().join("canary");
        if std::fs::write(&canary, b"").is_ok() {
            // Permission bits do not bind this user (root).
            std::fs::remove_file(&canary).unwrap();
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let added = store.add(NewStation::new("KEXP", "http://kexp/live"), false);
        let played = store.record_play("jazz-fm");
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(added.is_err());
        assert!(played.is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("library.json")]);
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_backfills_partial_stations() {
        let (_dir, store) = store();
        let doc = json!({
            "stations": [
                { "name": "Radio Nova", "url": "" },
                { "name": "KEXP", "url": "http://kexp", "tags": null, "play_count": "many" },
                { "url": "http://nameless", "mood": "chill" },
                "garbage"
            ]
        });
        std::fs::write(store.path(), doc.to_string()).unwrap();

        let library = store.load();
        assert_eq!(library.version, LIBRARY_VERSION);
        assert_eq!(library.stations.len(), 4);

        let nova = &library.stations[0];
        assert_eq!(nova.id, "radio-nova");
        assert_eq!(nova.url, None);
        assert_eq!(nova.source, Source::default());
        assert!(!nova.stream.validated);

        let kexp = &library.stations[1];
        assert!(kexp.tags.is_empty());
        assert_eq!(kexp.play_count, 0);

        let nameless = &library.stations[2];
        assert_eq!(nameless.name, "Unknown");
        assert_eq!(nameless.id, "unknown");
        assert_eq!(nameless.extra.get("mood"), Some(&json!("chill")));

        assert_eq!(library.stations[3].id, "unknown-2");
    }

    #[test]
    fn test_unknown_keys_survive_resave() {
        let (_dir, store) = store();
        let doc = json!({
            "version": 1,
            "stations": [{ "id": "fip", "name": "FIP", "url": "http://fip", "favourite": true }]
        });
        std::fs::write(store.path(), doc.to_string()).unwrap();
        store.save(&store.load()).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"favourite\": true"));
    }

    #[test]
    fn test_find() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        store.add(NewStation::new("Smooth Jazz", "http://s/j"), false).unwrap();

        assert_eq!(store.find("jazz-fm").unwrap().name, "Jazz FM");
        assert_eq!(store.find("SMOOTH JAZZ").unwrap().id, "smooth-jazz");
        assert_eq!(store.find("jazz").unwrap().id, "jazz-fm");
        assert_eq!(store.find("ooth").unwrap().id, "smooth-jazz");
        assert!(store.find("classical").is_none());
        assert!(store.find("   ").is_none());
    }

    #[test]
    fn test_find_last_played() {
        let (_dir, store) = store();
        assert!(store.find(LAST_PLAYED_QUERY).is_none());
        store.add(NewStation::new("A", "http://a"), false).unwrap();
        store.add(NewStation::new("B", "http://b"), false).unwrap();
        store.update("a", Map::from_iter([("last_played".to_string(), json!(100))])).unwrap();
        store.update("b", Map::from_iter([("last_played".to_string(), json!(200))])).unwrap();
        assert_eq!(store.find(LAST_PLAYED_QUERY).unwrap().id, "b");
    }

    #[test]
    fn test_update() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();

        let mut fields = Map::new();
        fields.insert("id".into(), json!("hijacked"));
        fields.insert("notes".into(), json!("late night"));
        fields.insert("category".into(), json!("jazz"));
        let updated = store.update("jazz-fm", fields).unwrap();
        assert_eq!(updated.id, "jazz-fm");
        assert_eq!(updated.notes.as_deref(), Some("late night"));
        assert_eq!(store.list(Some("jazz")).len(), 1);
        assert!(store.list(Some("rock")).is_empty());

        let err = store.update("nope", Map::new()).unwrap_err();
        assert!(matches!(err, SqlchError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_list_by_category_and_get() {
        let (_dir, store) = store();
        store
            .add(
                NewStation {
                    category: Some("jazz".into()),
                    ..NewStation::new("Jazz FM", "http://x/y")
                },
                false,
            )
            .unwrap();
        store.add(NewStation::new("KEXP", "http://kexp"), false).unwrap();

        assert_eq!(store.list(None).len(), 2);
        let jazz = store.list(Some("jazz"));
        assert_eq!(jazz.len(), 1);
        assert_eq!(jazz[0].id, "jazz-fm");
        assert!(store.list(Some("talk")).is_empty());

        assert_eq!(store.get("kexp").unwrap().name, "KEXP");
        assert!(store.get("KEXP").is_none());
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        assert!(!store.remove("nope"));
        assert!(store.remove("jazz-fm"));
        assert!(!store.remove("jazz-fm"));
        assert!(store.load().stations.is_empty());
    }

    #[test]
    fn test_record_play() {
        let (_dir, store) = store();
        store.add(NewStation::new("Jazz FM", "http://x/y"), false).unwrap();
        store.record_play("jazz-fm").unwrap();
        store.record_play("jazz-fm").unwrap();
        store.record_play("missing").unwrap();

        let station = store.get("jazz-fm").unwrap();
        assert_eq!(station.play_count, 2);
        assert!(station.last_played.is_some());
    }
}
