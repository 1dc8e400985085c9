//! Position tracking
//!
//! While a graph is playing the tracker reports elapsed engine time since
//! the graph started. Every start/stop advances an epoch; ticks carry the
//! epoch they were produced under so the controller can drop ticks that
//! arrive after the graph they measured was torn down.

use crate::engine::EngineClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// Default interval between timer ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Where ticks come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// A background timer ticking at a fixed interval
    Timer(Duration),
    /// The host's render loop, via `PlayerHandle::render_frame`
    RenderLoop,
}

impl Default for TickSource {
    fn default() -> Self {
        Self::Timer(DEFAULT_TICK_INTERVAL)
    }
}

/// Elapsed-time report for one playing run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub epoch: u64,
    /// Engine seconds since the run started
    pub elapsed: f64,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    started_at: f64,
    last_elapsed: f64,
}

pub struct PositionTracker {
    source: TickSource,
    clock: Arc<dyn EngineClock>,
    ticks: mpsc::UnboundedSender<Tick>,
    epoch: u64,
    run: Option<Run>,
    timer: Option<JoinHandle<()>>,
}

impl PositionTracker {
    pub fn new(
        source: TickSource,
        clock: Arc<dyn EngineClock>,
        ticks: mpsc::UnboundedSender<Tick>,
    ) -> Self {
        Self {
            source,
            clock,
            ticks,
            epoch: 0,
            run: None,
            timer: None,
        }
    }

    /// Current epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Begin a run measured from the clock's current time
    ///
    /// Must be called from within a tokio runtime when ticking on a timer.
    pub fn start(&mut self) {
        if self.run.is_some() {
            self.stop();
        }

        let started_at = self.clock.now();
        self.run = Some(Run {
            started_at,
            last_elapsed: 0.0,
        });

        if let TickSource::Timer(period) = self.source {
            self.timer = Some(tokio::spawn(timer_loop(
                period,
                self.epoch,
                started_at,
                Arc::clone(&self.clock),
                self.ticks.clone(),
            )));
        }
        trace!(epoch = self.epoch, started_at, "position tracker started");
    }

    /// End the current run; ticks already queued become stale
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if self.run.take().is_some() {
            trace!(epoch = self.epoch, "position tracker stopped");
        }
        self.epoch += 1;
    }

    /// True if `tick` belongs to the current run
    pub fn accepts(&self, tick: &Tick) -> bool {
        self.run.is_some() && tick.epoch == self.epoch
    }

    /// Elapsed seconds of the current run, read from the clock now
    pub fn elapsed(&mut self) -> Option<f64> {
        let now = self.clock.now();
        let run = self.run.as_mut()?;
        run.last_elapsed = (now - run.started_at).max(run.last_elapsed);
        Some(run.last_elapsed)
    }

    /// Produce a tick for a render-loop frame
    pub fn render_frame(&mut self) -> Option<Tick> {
        let epoch = self.epoch;
        self.elapsed().map(|elapsed| Tick { epoch, elapsed })
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for PositionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionTracker")
            .field("source", &self.source)
            .field("epoch", &self.epoch)
            .field("running", &self.run.is_some())
            .finish_non_exhaustive()
    }
}

async fn timer_loop(
    period: Duration,
    epoch: u64,
    started_at: f64,
    clock: Arc<dyn EngineClock>,
    ticks: mpsc::UnboundedSender<Tick>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = 0.0f64;

    loop {
        interval.tick().await;
        let elapsed = (clock.now() - started_at).max(last);
        last = elapsed;
        if ticks.send(Tick { epoch, elapsed }).is_err() {
            break;
        }
    }
}
