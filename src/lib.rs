//! A single-player liquid-pouring puzzle engine.
//!
//! A level is a fixed set of containers with capacities and starting fill
//! levels, optionally backed by an unlimited tap and an unconditional sink.
//! The player pours between containers until the target amounts are hit
//! exactly. This crate holds the rules: the [`PuzzleEngine`] state machine
//! (pour/fill/empty transitions, undo and reset history, win detection with
//! a time-gated settle window), the level data model, a [`Session`] that
//! sequences a level catalog and persists resume progress, and a
//! breadth-first [`solver`] over the move graph. Rendering, audio and input
//! routing live outside; they read snapshots from the engine and forward
//! clicks into it.

pub mod gameplay;
pub mod model;
pub mod session;
pub mod solver;

pub use gameplay::{Clock, ManualClock, PuzzleEngine, SETTLE_DURATION, SystemClock, Vessel};
pub use model::{
    ContainerSpec, LevelDefinition, LevelError, Move, Target, builtin_levels, catalog_from_json,
};
pub use session::{JsonFileStore, MemoryStore, PROGRESS_KEY, ProgressStore, Session};
