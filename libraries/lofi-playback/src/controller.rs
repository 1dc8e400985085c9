//! Playback controller task
//!
//! A single task owns the engine, the live graph ids, the position tracker
//! and the graph builder. [`crate::PlayerHandle`] talks to it over a bounded
//! command channel with oneshot replies, so every control operation is
//! serialized. State changes are published as [`PlaybackSnapshot`]s on a
//! watch channel.

use crate::engine::{AudioEngine, EngineError, GraphId};
use crate::error::{PlaybackError, Result};
use crate::tracker::{PositionTracker, Tick};
use crate::types::PlaybackConfig;
use lofi_audio::{GraphBuilder, NoiseBank};
use lofi_core::{
    progress_percent, BaseRate, EffectName, EffectSet, PersistenceAdapter, PlaybackSnapshot,
    Preferences, SampleBuffer, SavedTrackEntry, SavedTracks, TrackInfo, TransportState,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Commands sent from handles to the controller task
pub(crate) enum Command {
    BeginLoad {
        reply: oneshot::Sender<u64>,
    },
    CommitLoad {
        generation: u64,
        track: DecodedTrack,
        reply: Reply<TrackInfo>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Seek {
        percent: f64,
        reply: Reply<()>,
    },
    ToggleEffect {
        name: EffectName,
        reply: Reply<()>,
    },
    SetBaseRate {
        rate: f64,
        reply: Reply<()>,
    },
    SavedTracks {
        reply: oneshot::Sender<Vec<SavedTrackEntry>>,
    },
    RenderFrame,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// A decoded buffer waiting to be committed
pub(crate) struct DecodedTrack {
    pub buffer: Arc<SampleBuffer>,
    pub name: String,
    pub locator: Option<String>,
}

struct LoadedTrack {
    buffer: Arc<SampleBuffer>,
    name: String,
    duration: f64,
}

/// A change that invalidates the playing graph
#[derive(Debug, Clone, Copy)]
enum Change {
    Toggle(EffectName),
    Rate(BaseRate),
    Seek(f64),
}

/// Start the controller task
pub(crate) fn spawn<E: AudioEngine>(
    engine: E,
    config: &PlaybackConfig,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
) -> (mpsc::Sender<Command>, watch::Receiver<PlaybackSnapshot>) {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();

    let effects = EffectSet::default();
    let base_rate = BaseRate::default();
    let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::idle(
        effects,
        base_rate.value(),
        base_rate.effective(&effects),
    ));

    let bank = config
        .noise_seed
        .map_or_else(NoiseBank::new, NoiseBank::with_seed);
    let builder = GraphBuilder::new(engine.sample_rate(), bank);
    let tracker = PositionTracker::new(config.tick_source, engine.clock(), tick_tx);

    let controller = Controller {
        engine,
        builder,
        tracker,
        persistence,
        settle_delay: config.settle_delay,
        snapshots: snapshot_tx,
        state: TransportState::Idle,
        track: None,
        offset: 0.0,
        current_time: 0.0,
        effects,
        base_rate,
        chain: None,
        crackle: None,
        load_generation: 0,
        saved: SavedTracks::new(),
        deferred: VecDeque::new(),
    };

    tokio::spawn(controller.run(command_rx, tick_rx));
    (command_tx, snapshot_rx)
}

struct Controller<E: AudioEngine> {
    engine: E,
    builder: GraphBuilder,
    tracker: PositionTracker,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    settle_delay: Duration,
    snapshots: watch::Sender<PlaybackSnapshot>,

    state: TransportState,
    track: Option<LoadedTrack>,
    /// Track position the current or next graph starts from
    offset: f64,
    current_time: f64,
    effects: EffectSet,
    base_rate: BaseRate,

    chain: Option<GraphId>,
    crackle: Option<GraphId>,
    load_generation: u64,
    saved: SavedTracks,
    /// Commands pulled off the queue during a settle window that were not
    /// folded into the rebuild
    deferred: VecDeque<Command>,
}

impl<E: AudioEngine> Controller<E> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<Tick>,
    ) {
        info!(
            sample_rate = self.engine.sample_rate().as_hz(),
            "playback controller started"
        );
        self.restore().await;
        self.publish();

        let shutdown_reply = loop {
            let command = match self.deferred.pop_front() {
                Some(command) => command,
                None => tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => command,
                        None => break None,
                    },
                    Some(tick) = ticks.recv() => {
                        self.on_tick(tick);
                        continue;
                    }
                },
            };

            if let Some(reply) = self.handle(command, &mut commands).await {
                break Some(reply);
            }
        };

        self.teardown();
        self.engine.close();
        info!("playback controller stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    /// Handle one command; returns the shutdown reply when asked to stop
    async fn handle(
        &mut self,
        command: Command,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Option<oneshot::Sender<()>> {
        match command {
            Command::BeginLoad { reply } => {
                self.load_generation += 1;
                let _ = reply.send(self.load_generation);
            }
            Command::CommitLoad {
                generation,
                track,
                reply,
            } => {
                let result = self.commit_load(generation, track).await;
                let _ = reply.send(result);
            }
            Command::Play { reply } => {
                let _ = reply.send(self.play());
            }
            Command::Pause { reply } => {
                self.pause();
                let _ = reply.send(Ok(()));
            }
            Command::Seek { percent, reply } => {
                if !percent.is_finite() {
                    let _ = reply.send(Err(invalid_seek(percent)));
                } else if self.state == TransportState::Idle {
                    let _ = reply.send(Ok(()));
                } else {
                    self.apply(Change::Seek(percent), reply, commands).await;
                }
            }
            Command::ToggleEffect { name, reply } => {
                self.apply(Change::Toggle(name), reply, commands).await;
            }
            Command::SetBaseRate { rate, reply } => match BaseRate::new(rate) {
                Ok(rate) => self.apply(Change::Rate(rate), reply, commands).await,
                Err(e) => {
                    let _ = reply.send(Err(e.into()));
                }
            },
            Command::SavedTracks { reply } => {
                let _ = reply.send(self.saved.to_vec());
            }
            Command::RenderFrame => {
                if let Some(tick) = self.tracker.render_frame() {
                    self.on_tick(tick);
                }
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }

    async fn restore(&mut self) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };

        match persistence.load_preferences().await {
            Ok(Some(preferences)) => {
                self.effects = preferences.effects;
                self.base_rate = preferences.base_rate;
                debug!(effects = ?self.effects, base_rate = self.base_rate.value(), "restored preferences");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load preferences"),
        }

        match persistence.load_saved_tracks().await {
            Ok(entries) => self.saved = SavedTracks::from(entries),
            Err(e) => warn!(error = %e, "failed to load saved tracks"),
        }
    }

    async fn commit_load(&mut self, generation: u64, track: DecodedTrack) -> Result<TrackInfo> {
        if generation < self.load_generation {
            debug!(
                generation,
                latest = self.load_generation,
                name = %track.name,
                "discarding superseded load"
            );
            return Err(PlaybackError::Superseded);
        }

        self.teardown();

        let DecodedTrack {
            buffer,
            name,
            locator,
        } = track;
        let info = TrackInfo {
            name: name.clone(),
            duration_secs: buffer.duration_secs(),
            sample_rate: buffer.sample_rate().as_hz(),
            channels: buffer.channel_count(),
        };

        self.track = Some(LoadedTrack {
            duration: info.duration_secs,
            buffer,
            name,
        });
        self.offset = 0.0;
        self.current_time = 0.0;
        self.state = TransportState::Loaded;
        info!(name = %info.name, duration = info.duration_secs, "track loaded");

        if let Some(locator) = locator {
            let entry = SavedTrackEntry::new(info.name.clone(), locator);
            self.saved.push(entry.clone());
            if let Some(persistence) = self.persistence.clone() {
                if let Err(e) = persistence.save_track(entry).await {
                    warn!(error = %e, "failed to persist saved track");
                }
            }
        }

        self.publish();
        Ok(info)
    }

    fn play(&mut self) -> Result<()> {
        match self.state {
            TransportState::Idle | TransportState::Playing => return Ok(()),
            TransportState::Loaded | TransportState::Paused | TransportState::Ended => {}
        }

        self.engine.resume().map_err(|e| match e {
            EngineError::Blocked(msg) | EngineError::DeviceUnavailable(msg) => {
                PlaybackError::PlaybackBlocked(msg)
            }
            other => PlaybackError::Engine(other),
        })?;

        self.connect()?;
        self.state = TransportState::Playing;
        info!(offset = self.offset, "playback started");
        self.publish();
        Ok(())
    }

    fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.teardown();
        self.offset = self.current_time;
        self.state = TransportState::Paused;
        info!(offset = self.offset, "playback paused");
        self.publish();
    }

    /// Apply an effect, rate or seek change, rebuilding if playing
    async fn apply(
        &mut self,
        change: Change,
        reply: Reply<()>,
        commands: &mut mpsc::Receiver<Command>,
    ) {
        let previous = self.preferences();

        if self.state != TransportState::Playing {
            self.apply_change(change);
            if self.state == TransportState::Ended && matches!(change, Change::Seek(_)) {
                self.state = TransportState::Loaded;
            }
            self.persist_if_changed(previous).await;
            self.publish();
            let _ = reply.send(Ok(()));
            return;
        }

        if let Change::Rate(rate) = change {
            if self.try_live_rate(rate) {
                self.persist_if_changed(previous).await;
                self.publish();
                let _ = reply.send(Ok(()));
                return;
            }
        }

        let outcome = self.rebuild(change, reply, commands).await;
        if outcome {
            self.persist_if_changed(previous).await;
        }
    }

    fn apply_change(&mut self, change: Change) {
        match change {
            Change::Toggle(name) => {
                let enabled = self.effects.toggle(name);
                debug!(effect = %name, enabled, "effect toggled");
            }
            Change::Rate(rate) => self.base_rate = rate,
            Change::Seek(percent) => {
                let duration = self.duration();
                self.offset = percent.clamp(0.0, 100.0) / 100.0 * duration;
                self.current_time = self.offset;
            }
        }
    }

    fn try_live_rate(&mut self, rate: BaseRate) -> bool {
        let Some(chain) = self.chain else {
            return false;
        };
        let effective = rate.effective(&self.effects);
        match self.engine.set_rate(chain, effective) {
            Ok(true) => {
                self.base_rate = rate;
                debug!(rate = effective, "applied rate live");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, "live rate change failed, rebuilding");
                false
            }
        }
    }

    /// Tear down, wait for the settle window, fold in queued changes and
    /// reconnect. Returns true when the new graph is playing.
    async fn rebuild(
        &mut self,
        change: Change,
        reply: Reply<()>,
        commands: &mut mpsc::Receiver<Command>,
    ) -> bool {
        let last_good = self.position();
        let previous = self.preferences();

        self.teardown();
        self.offset = last_good;
        self.current_time = last_good;
        self.apply_change(change);

        tokio::time::sleep(self.settle_delay).await;

        let mut waiters = vec![reply];
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::ToggleEffect { name, reply } => {
                    self.apply_change(Change::Toggle(name));
                    waiters.push(reply);
                }
                Command::SetBaseRate { rate, reply } => match BaseRate::new(rate) {
                    Ok(rate) => {
                        self.apply_change(Change::Rate(rate));
                        waiters.push(reply);
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                    }
                },
                Command::Seek { percent, reply } if percent.is_finite() => {
                    self.apply_change(Change::Seek(percent));
                    waiters.push(reply);
                }
                Command::Seek { percent, reply } => {
                    let _ = reply.send(Err(invalid_seek(percent)));
                }
                // Later changes must not jump ahead of this command
                other => {
                    self.deferred.push_back(other);
                    break;
                }
            }
        }
        if waiters.len() > 1 {
            debug!(coalesced = waiters.len(), "coalesced changes into one rebuild");
        }

        let outcome = match self.connect() {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "rebuild failed, pausing");
                self.effects = previous.effects;
                self.base_rate = previous.base_rate;
                self.offset = last_good;
                self.current_time = last_good;
                self.state = TransportState::Paused;
                Err(e)
            }
        };

        self.publish();
        let rebuilt = outcome.is_ok();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        rebuilt
    }

    /// Build and connect the chain and, if enabled, the crackle loop
    fn connect(&mut self) -> Result<()> {
        let track = self
            .track
            .as_ref()
            .ok_or_else(|| PlaybackError::InvalidInput("no track loaded".to_string()))?;
        let rate = self.base_rate.effective(&self.effects);

        let chain = self
            .builder
            .build_chain(Arc::clone(&track.buffer), &self.effects, rate, self.offset)?;
        let crackle = if self.effects.vinyl_crackle {
            Some(self.builder.build_crackle()?)
        } else {
            None
        };
        debug!(graph = %chain.describe(), rate, offset = self.offset, "connecting chain");

        self.chain = Some(self.engine.connect(chain)?);
        if let Some(graph) = crackle {
            match self.engine.connect(graph) {
                Ok(id) => self.crackle = Some(id),
                Err(e) => {
                    self.disconnect_graphs();
                    return Err(e.into());
                }
            }
        }

        self.current_time = self.offset;
        self.tracker.start();
        Ok(())
    }

    /// Stop the tracker and release every live graph
    fn teardown(&mut self) {
        self.tracker.stop();
        self.disconnect_graphs();
    }

    fn disconnect_graphs(&mut self) {
        for id in [self.chain.take(), self.crackle.take()].into_iter().flatten() {
            if let Err(e) = self.engine.disconnect(id) {
                warn!(error = %e, graph = id.0, "ignoring teardown failure");
            }
        }
    }

    fn on_tick(&mut self, tick: Tick) {
        if self.state != TransportState::Playing || !self.tracker.accepts(&tick) {
            return;
        }

        let current = self.offset + tick.elapsed;
        if current >= self.duration() {
            self.teardown();
            self.offset = 0.0;
            self.current_time = 0.0;
            self.state = TransportState::Ended;
            info!("playback ended");
        } else {
            self.current_time = current;
        }
        self.publish();
    }

    /// Position of the playing graph read from the clock, else the offset
    fn position(&mut self) -> f64 {
        match self.tracker.elapsed() {
            Some(elapsed) if self.state == TransportState::Playing => {
                (self.offset + elapsed).min(self.duration())
            }
            _ => self.offset,
        }
    }

    fn duration(&self) -> f64 {
        self.track.as_ref().map_or(0.0, |t| t.duration)
    }

    fn preferences(&self) -> Preferences {
        Preferences {
            effects: self.effects,
            base_rate: self.base_rate,
        }
    }

    async fn persist_if_changed(&mut self, previous: Preferences) {
        let current = self.preferences();
        if current == previous {
            return;
        }
        if let Some(persistence) = self.persistence.clone() {
            if let Err(e) = persistence.save_preferences(&current).await {
                warn!(error = %e, "failed to persist preferences");
            }
        }
    }

    fn publish(&self) {
        let duration = self.duration();
        self.snapshots.send_replace(PlaybackSnapshot {
            state: self.state,
            current_time: self.current_time,
            duration,
            progress: progress_percent(self.current_time, duration),
            effects: self.effects,
            effective_rate: self.base_rate.effective(&self.effects),
            base_rate: self.base_rate.value(),
            track_name: self.track.as_ref().map(|t| t.name.clone()),
        });
    }
}

fn invalid_seek(percent: f64) -> PlaybackError {
    PlaybackError::InvalidInput(format!("seek position must be finite, got {percent}"))
}
