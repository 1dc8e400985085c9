//! Audio engine abstraction
//!
//! The controller never touches a device directly. It hands finished
//! [`SignalGraph`]s to an [`AudioEngine`] and reads time from the engine's
//! [`EngineClock`]. Desktop output lives in `lofi-audio-desktop`; tests use
//! [`crate::testing::MockEngine`].

use lofi_audio::SignalGraph;
use lofi_core::SampleRate;
use std::sync::Arc;
use thiserror::Error;

/// Handle to a graph connected to an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(pub u64);

/// Errors reported by an engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Starting output is not currently permitted
    #[error("Engine start blocked: {0}")]
    Blocked(String),

    /// No usable output device
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The graph could not be instantiated
    #[error("Failed to connect graph: {0}")]
    Connect(String),

    /// The id does not refer to a connected graph
    #[error("Unknown graph: {0:?}")]
    UnknownGraph(GraphId),

    /// Releasing graph resources failed
    #[error("Teardown failed: {0}")]
    Teardown(String),
}

/// Monotonic time source in seconds
pub trait EngineClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Output context that renders connected graphs
///
/// All connected graphs are summed into the device output. Implementations
/// must be cheap to call from the controller task: heavy work belongs on the
/// engine's own thread.
pub trait AudioEngine: Send + 'static {
    /// Output sample rate; procedural sources are synthesized at this rate
    fn sample_rate(&self) -> SampleRate;

    /// The clock position tracking is measured against
    fn clock(&self) -> Arc<dyn EngineClock>;

    /// Start or resume the output context
    fn resume(&mut self) -> Result<(), EngineError>;

    /// Start rendering a graph
    fn connect(&mut self, graph: SignalGraph) -> Result<GraphId, EngineError>;

    /// Stop rendering a graph and release it
    fn disconnect(&mut self, id: GraphId) -> Result<(), EngineError>;

    /// Change the source rate of a live graph
    ///
    /// Returns `Ok(false)` when live changes are unsupported; the controller
    /// then rebuilds the graph instead.
    fn set_rate(&mut self, id: GraphId, rate: f64) -> Result<bool, EngineError> {
        let _ = (id, rate);
        Ok(false)
    }

    /// Release the output context
    fn close(&mut self);
}
