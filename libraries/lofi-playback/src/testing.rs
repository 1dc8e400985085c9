//! Deterministic collaborators for tests and headless hosts
//!
//! [`MockEngine`] records every engine call instead of producing sound and
//! reads time from a [`ManualClock`]. [`MemoryPersistence`] and
//! [`StaticCatalog`] stand in for the storage and catalog crates.

use crate::engine::{AudioEngine, EngineClock, EngineError, GraphId};
use async_trait::async_trait;
use lofi_audio::SignalGraph;
use lofi_core::{
    CatalogProvider, FetchedTrack, LofiError, PersistenceAdapter, Preferences, Result,
    SampleRate, SavedTrackEntry, SavedTracks,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl EngineClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Engine call recorded by [`MockEngine`]
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Resumed,
    Connected { id: GraphId, graph: SignalGraph },
    Disconnected(GraphId),
    RateChanged { id: GraphId, rate: f64 },
    Closed,
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<EngineEvent>,
    live: BTreeMap<GraphId, SignalGraph>,
    next_id: u64,
    blocked: bool,
    failing_connects: usize,
    failing_disconnects: usize,
    live_rate: bool,
    closed: bool,
}

/// Silent engine that records what the controller asks of it
#[derive(Debug)]
pub struct MockEngine {
    sample_rate: SampleRate,
    clock: Arc<ManualClock>,
    state: Arc<Mutex<MockState>>,
}

/// Inspection and fault-injection side of a [`MockEngine`]
#[derive(Debug, Clone)]
pub struct MockProbe {
    clock: Arc<ManualClock>,
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new(sample_rate: SampleRate) -> (Self, MockProbe) {
        let clock = Arc::new(ManualClock::new());
        let state = Arc::new(Mutex::new(MockState::default()));
        let probe = MockProbe {
            clock: Arc::clone(&clock),
            state: Arc::clone(&state),
        };
        (
            Self {
                sample_rate,
                clock,
                state,
            },
            probe,
        )
    }
}

impl AudioEngine for MockEngine {
    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn clock(&self) -> Arc<dyn EngineClock> {
        Arc::clone(&self.clock) as Arc<dyn EngineClock>
    }

    fn resume(&mut self) -> std::result::Result<(), EngineError> {
        let mut state = lock(&self.state);
        if state.blocked {
            return Err(EngineError::Blocked("start not permitted".to_string()));
        }
        state.events.push(EngineEvent::Resumed);
        Ok(())
    }

    fn connect(&mut self, graph: SignalGraph) -> std::result::Result<GraphId, EngineError> {
        let mut state = lock(&self.state);
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(EngineError::Connect("injected failure".to_string()));
        }
        state.next_id += 1;
        let id = GraphId(state.next_id);
        state.live.insert(id, graph.clone());
        state.events.push(EngineEvent::Connected { id, graph });
        Ok(id)
    }

    fn disconnect(&mut self, id: GraphId) -> std::result::Result<(), EngineError> {
        let mut state = lock(&self.state);
        if state.live.remove(&id).is_none() {
            return Err(EngineError::UnknownGraph(id));
        }
        state.events.push(EngineEvent::Disconnected(id));
        if state.failing_disconnects > 0 {
            state.failing_disconnects -= 1;
            return Err(EngineError::Teardown("injected failure".to_string()));
        }
        Ok(())
    }

    fn set_rate(&mut self, id: GraphId, rate: f64) -> std::result::Result<bool, EngineError> {
        let mut state = lock(&self.state);
        if !state.live_rate {
            return Ok(false);
        }
        if !state.live.contains_key(&id) {
            return Err(EngineError::UnknownGraph(id));
        }
        state.events.push(EngineEvent::RateChanged { id, rate });
        Ok(true)
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        state.live.clear();
        state.closed = true;
        state.events.push(EngineEvent::Closed);
    }
}

impl MockProbe {
    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Every call so far, in order
    pub fn events(&self) -> Vec<EngineEvent> {
        lock(&self.state).events.clone()
    }

    /// Graphs currently connected, oldest first
    pub fn live_graphs(&self) -> Vec<SignalGraph> {
        lock(&self.state).live.values().cloned().collect()
    }

    pub fn connect_count(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Connected { .. }))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Make `resume` fail with `Blocked`
    pub fn set_blocked(&self, blocked: bool) {
        lock(&self.state).blocked = blocked;
    }

    /// Fail the next `count` connects
    pub fn fail_connects(&self, count: usize) {
        lock(&self.state).failing_connects = count;
    }

    /// Report failure on the next `count` disconnects; the graph is still
    /// released
    pub fn fail_disconnects(&self, count: usize) {
        lock(&self.state).failing_disconnects = count;
    }

    /// Accept live rate changes instead of forcing rebuilds
    pub fn set_live_rate(&self, supported: bool) {
        lock(&self.state).live_rate = supported;
    }
}

/// Persistence kept in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tracks: Mutex<SavedTracks>,
    preferences: Mutex<Option<Preferences>>,
    failing: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        let persistence = Self::default();
        *lock(&persistence.preferences) = Some(preferences);
        persistence
    }

    /// Make every call fail with a storage error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn stored_preferences(&self) -> Option<Preferences> {
        *lock(&self.preferences)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LofiError::storage("storage unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn load_saved_tracks(&self) -> Result<Vec<SavedTrackEntry>> {
        self.check()?;
        Ok(lock(&self.tracks).to_vec())
    }

    async fn save_track(&self, entry: SavedTrackEntry) -> Result<()> {
        self.check()?;
        lock(&self.tracks).push(entry);
        Ok(())
    }

    async fn load_preferences(&self) -> Result<Option<Preferences>> {
        self.check()?;
        Ok(*lock(&self.preferences))
    }

    async fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.check()?;
        *lock(&self.preferences) = Some(*preferences);
        Ok(())
    }
}

/// Catalog serving fixed bytes by locator
#[derive(Debug, Default)]
pub struct StaticCatalog {
    tracks: HashMap<String, (String, Vec<u8>)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track reachable by `locator`
    #[must_use]
    pub fn with_track(
        mut self,
        locator: impl Into<String>,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.tracks.insert(locator.into(), (name.into(), bytes));
        self
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn fetch_track(&self, query_or_url: &str) -> Result<FetchedTrack> {
        let (name, bytes) = self
            .tracks
            .get(query_or_url)
            .ok_or_else(|| LofiError::fetch(format!("no track for '{query_or_url}'")))?;
        Ok(FetchedTrack {
            bytes: bytes.clone(),
            name: name.clone(),
            locator: query_or_url.to_string(),
        })
    }
}
