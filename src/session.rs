use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::gameplay::{Clock, PuzzleEngine, SystemClock};
use crate::model::{LevelDefinition, LevelError};

/// Key under which the id of the level to resume is persisted.
pub const PROGRESS_KEY: &str = "liquid_puzzle_progress";

/// Durable key-value storage for session progress. Implementations decide
/// where the values live; the session only ever reads the progress key once
/// at construction and rewrites it on every level advance.
pub trait ProgressStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// HashMap-backed store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Flat JSON object file. A missing or unreadable file simply starts empty;
/// progress is best-effort and never worth failing the session over.
pub struct JsonFileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "ignoring corrupt progress file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self { path, values }
    }

    fn flush(&self) {
        let text = match serde_json::to_string_pretty(&self.values) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, "could not serialize progress");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, text) {
            warn!(path = %self.path.display(), %err, "could not write progress file");
        }
    }
}

impl ProgressStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }
}

/// Sequences levels from an ordered catalog, resuming from persisted
/// progress and advancing on the engine's win signal.
pub struct Session {
    catalog: Vec<LevelDefinition>,
    store: Box<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    index: usize,
    engine: PuzzleEngine,
}

impl Session {
    pub fn new(
        catalog: Vec<LevelDefinition>,
        store: Box<dyn ProgressStore>,
    ) -> Result<Self, LevelError> {
        Self::with_clock(catalog, store, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        catalog: Vec<LevelDefinition>,
        store: Box<dyn ProgressStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LevelError> {
        if catalog.is_empty() {
            return Err(LevelError::EmptyCatalog);
        }
        for level in &catalog {
            level.validate()?;
        }
        let index = resume_index(&catalog, store.get(PROGRESS_KEY));
        debug!(level = catalog[index].id, "session resuming");
        let engine = PuzzleEngine::load(catalog[index].clone(), clock.clone())?;
        Ok(Self {
            catalog,
            store,
            clock,
            index,
            engine,
        })
    }

    pub fn engine(&self) -> &PuzzleEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PuzzleEngine {
        &mut self.engine
    }

    pub fn level_index(&self) -> usize {
        self.index
    }

    pub fn current_level(&self) -> &LevelDefinition {
        &self.catalog[self.index]
    }

    /// Whether any persisted progress exists to continue from.
    pub fn can_continue(&self) -> bool {
        self.store.get(PROGRESS_KEY).is_some()
    }

    /// Starts over from the first level and persists that choice.
    pub fn start_new_game(&mut self) {
        self.goto(0);
    }

    /// Consumes the engine's one-shot win signal. On a win, advances to the
    /// next catalog level (wrapping to the first after the last), persists
    /// the new level id and loads a fresh engine. Returns whether a win was
    /// consumed.
    pub fn advance_if_won(&mut self) -> bool {
        if !self.engine.take_win() {
            return false;
        }
        let next = (self.index + 1) % self.catalog.len();
        self.goto(next);
        true
    }

    fn goto(&mut self, index: usize) {
        self.index = index;
        let level = self.catalog[index].clone();
        debug!(level = level.id, "loading level");
        self.store.set(PROGRESS_KEY, &level.id.to_string());
        // The catalog was validated at construction, so loading cannot fail.
        self.engine = PuzzleEngine::load(level, self.clock.clone())
            .expect("catalog validated at construction");
    }
}

fn resume_index(catalog: &[LevelDefinition], saved: Option<String>) -> usize {
    saved
        .and_then(|value| value.parse::<u32>().ok())
        .and_then(|id| catalog.iter().position(|level| level.id == id))
        .unwrap_or(0)
}
