use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::model::{LevelDefinition, LevelError, Target};

/// How long a committed pour/fill/empty keeps the engine busy. Matches the
/// transition window the presentation layer animates over.
pub const SETTLE_DURATION: Duration = Duration::from_millis(600);

/// Monotonic time source injected into the engine so the busy window can be
/// driven deterministically in tests.
pub trait Clock: Send + Sync {
    /// Elapsed time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock progression anchored at construction.
pub struct SystemClock(Instant);

impl SystemClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Hand-driven clock. Share one `Arc<ManualClock>` between the test and the
/// engine and call [`ManualClock::advance`] to step past busy windows.
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            millis: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }
}

/// Runtime state of one container, in level order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vessel {
    id: String,
    capacity: u32,
    amount: u32,
}

impl Vessel {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn free_space(&self) -> u32 {
        self.capacity - self.amount
    }
}

/// State machine for one active level.
///
/// All commands are silent no-ops when their preconditions fail: the state
/// is unchanged and no history entry is written. Committed pours, fills and
/// empties open a fixed busy window during which every further command is
/// ignored and the win condition is not yet reported.
pub struct PuzzleEngine {
    level: LevelDefinition,
    vessels: Vec<Vessel>,
    history: Vec<Vec<u32>>,
    selected: Option<usize>,
    settle_until: Option<Duration>,
    win_signaled: bool,
    clock: Arc<dyn Clock>,
}

impl PuzzleEngine {
    /// Validates the level and builds fresh state: initial amounts, empty
    /// history, no selection, idle.
    pub fn load(level: LevelDefinition, clock: Arc<dyn Clock>) -> Result<Self, LevelError> {
        level.validate()?;
        let vessels = level
            .containers
            .iter()
            .map(|spec| Vessel {
                id: spec.id.clone(),
                capacity: spec.capacity,
                amount: spec.initial_amount,
            })
            .collect();
        Ok(Self {
            level,
            vessels,
            history: Vec::new(),
            selected: None,
            settle_until: None,
            win_signaled: false,
            clock,
        })
    }

    pub fn level(&self) -> &LevelDefinition {
        &self.level
    }

    pub fn vessels(&self) -> &[Vessel] {
        &self.vessels
    }

    /// Current amounts in level order.
    pub fn amounts(&self) -> Vec<u32> {
        self.vessels.iter().map(|v| v.amount).collect()
    }

    pub fn amount_of(&self, container_id: &str) -> Option<u32> {
        self.vessels
            .iter()
            .find(|v| v.id == container_id)
            .map(|v| v.amount)
    }

    /// Id of the container currently chosen as the pending pour source.
    pub fn selection(&self) -> Option<&str> {
        self.selected.map(|i| self.vessels[i].id.as_str())
    }

    /// True while a committed transition is still settling. Commands issued
    /// now are ignored and the win condition is not evaluated.
    pub fn busy(&self) -> bool {
        self.settle_until
            .is_some_and(|until| self.clock.now() < until)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Whether every target is exactly satisfied. Never true while busy, and
    /// never true for a level with no containers.
    pub fn is_won(&self) -> bool {
        if self.busy() || self.vessels.is_empty() {
            return false;
        }
        self.level.targets.iter().all(|target| match target {
            Target::Any { amount } => self.vessels.iter().any(|v| v.amount == *amount),
            Target::Container { id, amount } => {
                self.vessels.iter().any(|v| &v.id == id && v.amount == *amount)
            }
        })
    }

    /// One-shot win signal for the session controller. Returns true at most
    /// once per loaded level, and never while busy.
    pub fn take_win(&mut self) -> bool {
        if self.win_signaled || !self.is_won() {
            return false;
        }
        self.win_signaled = true;
        debug!(level = self.level.id, "level won");
        true
    }

    /// Models one click on a container: select, deselect, or pour from the
    /// current selection into the clicked container. Returns true iff a pour
    /// was committed.
    pub fn select_or_act(&mut self, container_id: &str) -> bool {
        if self.busy() {
            trace!(container_id, "click ignored while settling");
            return false;
        }
        let Some(clicked) = self.level.index_of(container_id) else {
            return false;
        };
        match self.selected {
            None => {
                // An empty container cannot be a pour source.
                if self.vessels[clicked].amount > 0 {
                    self.selected = Some(clicked);
                }
                false
            }
            Some(source) if source == clicked => {
                self.selected = None;
                false
            }
            Some(source) => {
                let from = self.vessels[source].id.clone();
                let committed = self.pour(&from, container_id);
                // Selection drops whether or not the pour went through.
                self.selected = None;
                committed
            }
        }
    }

    /// Moves `min(amount(from), free(to))` units between two distinct
    /// containers. Rejected without any state change when either id is
    /// unknown, the source is empty or the destination is full.
    pub fn pour(&mut self, from_id: &str, to_id: &str) -> bool {
        if self.busy() || from_id == to_id {
            return false;
        }
        let (Some(from), Some(to)) = (self.level.index_of(from_id), self.level.index_of(to_id))
        else {
            return false;
        };
        let moved = self.vessels[from]
            .amount
            .min(self.vessels[to].free_space());
        if moved == 0 {
            trace!(from_id, to_id, "pour rejected");
            return false;
        }
        self.commit();
        self.vessels[from].amount -= moved;
        self.vessels[to].amount += moved;
        debug!(from_id, to_id, moved, "poured");
        true
    }

    /// Fills a container to capacity from the tap. Instantaneous, not
    /// incremental. Only on levels that declare tap/sink availability.
    pub fn fill_from_tap(&mut self, to_id: &str) -> bool {
        if self.busy() || !self.level.has_sink_and_tap {
            return false;
        }
        let Some(to) = self.level.index_of(to_id) else {
            return false;
        };
        if self.vessels[to].is_full() {
            return false;
        }
        self.commit();
        self.vessels[to].amount = self.vessels[to].capacity;
        debug!(to_id, "filled from tap");
        true
    }

    /// Drains a container to zero into the sink. Only on levels that declare
    /// tap/sink availability.
    pub fn empty_to_sink(&mut self, from_id: &str) -> bool {
        if self.busy() || !self.level.has_sink_and_tap {
            return false;
        }
        let Some(from) = self.level.index_of(from_id) else {
            return false;
        };
        if self.vessels[from].is_empty() {
            return false;
        }
        self.commit();
        self.vessels[from].amount = 0;
        debug!(from_id, "emptied to sink");
        true
    }

    /// Restores the amounts recorded before the most recent committed
    /// transition. Not itself recorded, so there is no redo.
    pub fn undo(&mut self) -> bool {
        if self.busy() {
            return false;
        }
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        for (vessel, amount) in self.vessels.iter_mut().zip(snapshot) {
            vessel.amount = amount;
        }
        self.selected = None;
        debug!("undid one transition");
        true
    }

    /// Puts every container back to its initial amount. One step undoable:
    /// the pre-reset state is pushed to history first. No busy window.
    pub fn reset(&mut self) -> bool {
        if self.busy() {
            return false;
        }
        self.history.push(self.snapshot());
        for (vessel, spec) in self.vessels.iter_mut().zip(&self.level.containers) {
            vessel.amount = spec.initial_amount;
        }
        self.selected = None;
        debug!(level = self.level.id, "level reset");
        true
    }

    fn snapshot(&self) -> Vec<u32> {
        self.amounts()
    }

    /// Records the pre-transition snapshot and opens the busy window.
    fn commit(&mut self) {
        self.history.push(self.snapshot());
        self.settle_until = Some(self.clock.now() + SETTLE_DURATION);
    }
}
