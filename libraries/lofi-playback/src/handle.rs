//! Public handle to the playback controller

use crate::controller::{self, Command, DecodedTrack};
use crate::engine::AudioEngine;
use crate::error::{PlaybackError, Result};
use crate::types::PlaybackConfig;
use lofi_audio::SymphoniaDecoder;
use lofi_core::{
    AudioDecoder, CatalogProvider, EffectName, PersistenceAdapter, PlaybackSnapshot,
    SavedTrackEntry, TrackInfo,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

/// Cloneable handle to a running player
///
/// Every method is a message to the controller task; handles can be shared
/// freely across tasks. Dropping the last handle shuts the player down.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    decoder: Arc<dyn AudioDecoder>,
    catalog: Option<Arc<dyn CatalogProvider>>,
}

impl PlayerHandle {
    /// Start a player on `engine` with default collaborators
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<E: AudioEngine>(engine: E, config: PlaybackConfig) -> Self {
        PlayerBuilder::new(config).spawn(engine)
    }

    pub fn builder(config: PlaybackConfig) -> PlayerBuilder {
        PlayerBuilder::new(config)
    }

    /// Decode `bytes` and make them the current track
    ///
    /// The extension of `name`, if any, is used as a format hint.
    pub async fn load(&self, bytes: Vec<u8>, name: impl Into<String>) -> Result<TrackInfo> {
        let generation = self.begin_load().await?;
        let name = name.into();
        let hint = extension(&name);
        self.decode_and_commit(generation, bytes, name, hint, None)
            .await
    }

    /// Fetch a track from the catalog by search query or direct URL
    ///
    /// A load started while the fetch is in flight wins; this one then
    /// returns `Superseded`.
    pub async fn load_from_catalog(&self, query_or_url: &str) -> Result<TrackInfo> {
        let catalog = self.catalog()?;
        let generation = self.begin_load().await?;
        let fetched = catalog.fetch_track(query_or_url).await?;
        let hint = fetched
            .extension_hint()
            .map(str::to_owned)
            .or_else(|| extension(&fetched.name));
        self.decode_and_commit(
            generation,
            fetched.bytes,
            fetched.name,
            hint,
            Some(fetched.locator),
        )
        .await
    }

    /// Reload an entry from the saved-track history
    pub async fn load_saved(&self, entry: &SavedTrackEntry) -> Result<TrackInfo> {
        let catalog = self.catalog()?;
        let generation = self.begin_load().await?;
        let fetched = catalog.fetch_track(&entry.source_locator).await?;
        let hint = fetched.extension_hint().map(str::to_owned);
        self.decode_and_commit(
            generation,
            fetched.bytes,
            entry.name.clone(),
            hint,
            Some(entry.source_locator.clone()),
        )
        .await
    }

    /// Claim the next load generation; older loads still in flight are
    /// discarded when they commit
    async fn begin_load(&self) -> Result<u64> {
        self.request(|reply| Command::BeginLoad { reply }).await
    }

    async fn decode_and_commit(
        &self,
        generation: u64,
        bytes: Vec<u8>,
        name: String,
        hint: Option<String>,
        locator: Option<String>,
    ) -> Result<TrackInfo> {
        debug!(generation, name = %name, bytes = bytes.len(), "decoding track");

        let decoder = Arc::clone(&self.decoder);
        let buffer = tokio::task::spawn_blocking(move || decoder.decode(&bytes, hint.as_deref()))
            .await
            .map_err(|e| PlaybackError::Decode(format!("decoder task failed: {e}")))??;

        let track = DecodedTrack {
            buffer: Arc::new(buffer),
            name,
            locator,
        };
        self.request(|reply| Command::CommitLoad {
            generation,
            track,
            reply,
        })
        .await?
    }

    /// Start or resume playback; no-op when nothing is loaded
    pub async fn play(&self) -> Result<()> {
        self.request(|reply| Command::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    /// Jump to `percent` of the track, clamped to `[0, 100]`
    pub async fn seek(&self, percent: f64) -> Result<()> {
        self.request(|reply| Command::Seek { percent, reply })
            .await?
    }

    pub async fn toggle_effect(&self, name: EffectName) -> Result<()> {
        self.request(|reply| Command::ToggleEffect { name, reply })
            .await?
    }

    /// Set the base rate, clamped to `[0.5, 1.0]`
    pub async fn set_base_rate(&self, rate: f64) -> Result<()> {
        self.request(|reply| Command::SetBaseRate { rate, reply })
            .await?
    }

    /// Most recently loaded catalog tracks, newest first
    pub async fn saved_tracks(&self) -> Result<Vec<SavedTrackEntry>> {
        self.request(|reply| Command::SavedTracks { reply }).await
    }

    /// Subscribe to snapshot updates
    pub fn observe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Advance position tracking by one rendered frame
    ///
    /// Only meaningful with `TickSource::RenderLoop`. Never blocks; the frame
    /// is dropped if the controller is busy.
    pub fn render_frame(&self) {
        if self.commands.try_send(Command::RenderFrame).is_err() {
            trace!("render frame dropped");
        }
    }

    /// Tear down graphs, stop tracking and close the engine
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    fn catalog(&self) -> Result<&Arc<dyn CatalogProvider>> {
        self.catalog
            .as_ref()
            .ok_or_else(|| PlaybackError::Fetch("no catalog configured".to_string()))
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("closed", &self.commands.is_closed())
            .field("catalog", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}

/// Configures collaborators before starting a player
pub struct PlayerBuilder {
    config: PlaybackConfig,
    decoder: Arc<dyn AudioDecoder>,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    catalog: Option<Arc<dyn CatalogProvider>>,
}

impl PlayerBuilder {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            decoder: Arc::new(SymphoniaDecoder::new()),
            persistence: None,
            catalog: None,
        }
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceAdapter>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Start the controller task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<E: AudioEngine>(self, engine: E) -> PlayerHandle {
        let (commands, snapshots) = controller::spawn(engine, &self.config, self.persistence);
        PlayerHandle {
            commands,
            snapshots,
            decoder: self.decoder,
            catalog: self.catalog,
        }
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
