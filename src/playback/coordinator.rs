use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::core::catalog::{FileWalker, MediaCatalog};
use crate::core::config::AppConfig;
use crate::core::error::{InsufficientMedia, ShuffleError};
use crate::core::media::MediaFile;
use crate::core::sampler::Sampler;
use crate::core::scanner::{CatalogScanner, ScanResult};
use crate::playback::backend::{BackendEvent, BackendEventKind, BackendFactory, VideoFrame};
use crate::playback::overlay::OverlayControlState;
use crate::playback::pool::SessionPool;
use crate::playback::session::{AudioMix, PlaybackSession, TransportState};

/// Ensemble-wide transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateState {
    /// No working set loaded
    Idle,
    Paused,
    Playing,
}

/// Discrete user requests. Queued by the UI and dispatched in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SelectFolder(PathBuf),
    PlayPause,
    Next,
    Stop,
    SetVideoCount(usize),
    SetVolume(i32),
    AdjustVolume(i32),
    SetGlobalMute(bool),
    ToggleGlobalMute,
    SetSessionMute { slot: usize, muted: bool },
    SeekRelative { slot: usize, delta_secs: f64 },
    SeekAllRelative(f64),
    SeekSlot { slot: usize, fraction: f64 },
    SeekAll(f64),
    StopSlot(usize),
    PlayEverywhere(usize),
    ToggleFullscreen,
    ExitFullscreen,
    OverlayInteraction,
}

/// Things the UI should tell the user about
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ScanStarted(PathBuf),
    CatalogLoaded { root: PathBuf, count: usize },
    NoMedia,
    FolderNotFound(PathBuf),
    ScanFailed(String),
    InsufficientMedia(InsufficientMedia),
    SlotError { slot: usize, message: String },
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub video_count: usize,
    pub volume: u8,
    pub autoplay_on_load: bool,
    pub auto_advance_on_end: bool,
    pub overlay_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CoordinatorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            video_count: config.video_count,
            volume: config.volume,
            autoplay_on_load: config.autoplay_on_load,
            auto_advance_on_end: config.auto_advance_on_end,
            overlay_timeout: config.overlay_timeout(),
        }
    }
}

/// Shared-slider readout across the bound sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSummary {
    /// Furthest position of any session
    pub position: Duration,
    /// Longest known duration
    pub duration: Option<Duration>,
    /// Mean progress (0.0..=1.0) of sessions with a known duration
    pub progress: Option<f64>,
}

/// Owns the session pool and the media library, and turns global intents
/// into per-session transport calls. All state changes go through
/// `&mut self` on the coordinating thread; backend events are drained
/// from a channel in `update` instead of being applied from the
/// backends' own threads.
pub struct TransportCoordinator {
    pool: SessionPool,
    catalog: MediaCatalog,
    sampler: Sampler,
    scanner: CatalogScanner,
    loaded: bool,
    mix: AudioMix,
    overlay: OverlayControlState,
    events: mpsc::Receiver<BackendEvent>,
    notices: Vec<Notice>,
    settings: CoordinatorSettings,
}

impl TransportCoordinator {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        walker: Arc<dyn FileWalker>,
        sampler: Sampler,
        settings: CoordinatorSettings,
    ) -> Result<Self, ShuffleError> {
        let (event_tx, event_rx) = mpsc::channel();
        let pool = SessionPool::new(factory, event_tx, settings.video_count)?;

        Ok(Self {
            pool,
            catalog: MediaCatalog::default(),
            sampler,
            scanner: CatalogScanner::new(walker),
            loaded: false,
            mix: AudioMix::new(settings.volume, false),
            overlay: OverlayControlState::new(settings.overlay_timeout),
            events: event_rx,
            notices: Vec::new(),
            settings,
        })
    }

    pub fn dispatch(&mut self, intent: Intent, now: Instant) -> Result<(), ShuffleError> {
        log::debug!("Intent: {:?}", intent);

        match intent {
            Intent::SelectFolder(root) => self.select_folder(root),
            Intent::PlayPause => self.play_pause(),
            Intent::Next => self.next(),
            Intent::Stop => self.stop(),
            Intent::SetVideoCount(count) => return self.set_video_count(count),
            Intent::SetVolume(level) => self.set_volume(level),
            Intent::AdjustVolume(delta) => self.adjust_volume(delta),
            Intent::SetGlobalMute(muted) => self.set_global_mute(muted),
            Intent::ToggleGlobalMute => self.set_global_mute(!self.mix.muted),
            Intent::SetSessionMute { slot, muted } => return self.set_session_mute(slot, muted),
            Intent::SeekRelative { slot, delta_secs } => return self.seek_relative(slot, delta_secs),
            Intent::SeekAllRelative(delta_secs) => self.seek_all_relative(delta_secs),
            Intent::SeekSlot { slot, fraction } => return self.seek_slot(slot, fraction),
            Intent::SeekAll(fraction) => self.seek_all(fraction),
            Intent::StopSlot(slot) => return self.stop_slot(slot),
            Intent::PlayEverywhere(index) => return self.play_everywhere(index),
            Intent::ToggleFullscreen => self.toggle_fullscreen(now),
            Intent::ExitFullscreen => self.overlay.exit_fullscreen(),
            Intent::OverlayInteraction => self.overlay.interact(now),
        }
        Ok(())
    }

    /// Drain finished scans and backend events, then advance the overlay
    /// timer. Called once per UI frame.
    pub fn update(&mut self, now: Instant) {
        if let Some(result) = self.scanner.poll() {
            self.apply_scan(result);
        }

        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }

        if self.overlay.tick(now) {
            log::debug!("Overlay hidden after inactivity");
        }
    }

    // =========================================================================
    // LIBRARY
    // =========================================================================

    /// Start a background scan; a later selection supersedes this one
    pub fn select_folder(&mut self, root: PathBuf) {
        log::info!("Selected folder {}", root.display());
        self.scanner.request_scan(root.clone());
        self.notices.push(Notice::ScanStarted(root));
    }

    fn apply_scan(&mut self, result: ScanResult) {
        match result.result {
            Ok(catalog) => self.load_catalog(catalog),
            Err(ShuffleError::NotFound(path)) => {
                log::warn!("Folder {} does not exist, keeping previous library", path.display());
                self.notices.push(Notice::FolderNotFound(path));
            }
            Err(e) => {
                log::error!("Scan of {} failed: {}", result.root.display(), e);
                self.notices.push(Notice::ScanFailed(e.to_string()));
            }
        }
    }

    /// Replace the library. A non-empty library immediately gets a fresh
    /// working set; an empty one leaves the current sessions alone.
    pub fn load_catalog(&mut self, catalog: MediaCatalog) {
        if catalog.is_empty() {
            log::warn!("No playable media in {:?}", catalog.root());
            self.catalog = catalog;
            self.notices.push(Notice::NoMedia);
            return;
        }

        if let Some(root) = catalog.root() {
            self.notices.push(Notice::CatalogLoaded {
                root: root.to_path_buf(),
                count: catalog.len(),
            });
        }
        let start = self.settings.autoplay_on_load || self.aggregate_state() == AggregateState::Playing;
        self.catalog = catalog;
        self.reshuffle(start);
    }

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    /// Bind `files` to slots in order and leave every session Paused at
    /// the start of its stream. Slots beyond `files` are emptied.
    pub fn load_working_set(&mut self, files: Vec<MediaFile>) {
        let mut files = files.into_iter();

        for slot in 0..self.pool.len() {
            let result = match files.next() {
                Some(file) => self.pool.load(slot, file, self.mix),
                None => self.pool.unload(slot),
            };
            if let Err(e) = result {
                log::warn!("Slot {}: {}", slot, e);
                self.notices.push(Notice::SlotError {
                    slot,
                    message: e.to_string(),
                });
            }
        }

        self.loaded = self.pool.iter().any(|s| s.media().is_some());
        log::info!("Now playing: {}", self.now_playing());
    }

    pub fn play_pause(&mut self) {
        match self.aggregate_state() {
            AggregateState::Playing => {
                let paused = self.pool.iter_mut().map(|s| s.pause()).filter(|&paused| paused).count();
                log::info!("Paused {} session(s)", paused);
            }
            AggregateState::Paused | AggregateState::Idle => {
                let resumable = self.pool.iter().any(|s| s.state() == TransportState::Paused);
                if resumable {
                    let started = self
                        .pool
                        .iter_mut()
                        .filter(|s| s.state() == TransportState::Paused)
                        .map(|s| s.play())
                        .filter(|&started| started)
                        .count();
                    log::info!("Resumed {} session(s)", started);
                } else if !self.catalog.is_empty() {
                    // Everything has finished or was stopped: start over with a fresh set
                    log::info!("Nothing to resume, drawing a new set");
                    self.reshuffle(true);
                }
            }
        }
    }

    /// Draw a fresh working set, keeping the ensemble's play/pause state
    pub fn next(&mut self) {
        if self.catalog.is_empty() {
            self.notices.push(Notice::NoMedia);
            return;
        }
        let was_playing = self.aggregate_state() == AggregateState::Playing;
        self.reshuffle(was_playing);
    }

    fn reshuffle(&mut self, start: bool) {
        let draw = self.sampler.draw(&self.catalog, self.pool.len());
        if let Some(warning) = draw.warning {
            self.notices.push(Notice::InsufficientMedia(warning));
        }
        self.load_working_set(draw.files);
        if start {
            self.start_all();
        }
    }

    fn start_all(&mut self) {
        for session in self.pool.iter_mut() {
            session.play();
        }
    }

    /// Halt everything and rewind to zero; the working set stays loaded
    pub fn stop(&mut self) {
        if !self.loaded {
            return;
        }
        for session in self.pool.iter_mut() {
            session.rewind();
        }
        log::info!("Stopped all sessions");
    }

    /// Operator stop of one slot; play/pause skips it afterwards
    pub fn stop_slot(&mut self, slot: usize) -> Result<(), ShuffleError> {
        self.pool.get_mut(slot)?.halt();
        Ok(())
    }

    pub fn seek_relative(&mut self, slot: usize, delta_secs: f64) -> Result<(), ShuffleError> {
        self.pool.get_mut(slot)?.seek_relative(delta_secs);
        Ok(())
    }

    pub fn seek_all_relative(&mut self, delta_secs: f64) {
        for session in self.pool.iter_mut() {
            session.seek_relative(delta_secs);
        }
    }

    pub fn seek_slot(&mut self, slot: usize, fraction: f64) -> Result<(), ShuffleError> {
        self.pool.get_mut(slot)?.seek_fraction(fraction);
        Ok(())
    }

    pub fn seek_all(&mut self, fraction: f64) {
        for session in self.pool.iter_mut() {
            session.seek_fraction(fraction);
        }
    }

    /// Load one catalog entry into every slot and start it
    pub fn play_everywhere(&mut self, index: usize) -> Result<(), ShuffleError> {
        let file = self.catalog.get(index).cloned().ok_or(ShuffleError::UnknownMedia(index))?;
        log::info!("Playing {} in every slot", file.file_name());
        let files = Sampler::select_one(&file, self.pool.len());
        self.load_working_set(files);
        self.start_all();
        Ok(())
    }

    // =========================================================================
    // GRID
    // =========================================================================

    /// Resize the grid. Existing slots are untouched; new slots get files
    /// not already on screen and join in if the ensemble is playing.
    pub fn set_video_count(&mut self, count: usize) -> Result<(), ShuffleError> {
        let was_playing = self.aggregate_state() == AggregateState::Playing;
        let added = self.pool.resize(count)?;

        if added.is_empty() || !self.loaded || self.catalog.is_empty() {
            self.loaded = self.pool.iter().any(|s| s.media().is_some());
            return Ok(());
        }

        let current = self.working_set();
        let fresh: Vec<MediaFile> = self
            .sampler
            .draw_excluding(&self.catalog, added.len(), &current)
            .into_iter()
            .filter(|f| !current.contains(f))
            .collect();

        if fresh.len() < added.len() {
            let warning = InsufficientMedia {
                requested: self.pool.len(),
                available: current.len() + fresh.len(),
            };
            log::warn!("{}", warning);
            self.notices.push(Notice::InsufficientMedia(warning));
        }

        for (slot, file) in added.into_iter().zip(fresh) {
            match self.pool.load(slot, file, self.mix) {
                Ok(()) => {
                    if was_playing {
                        if let Ok(session) = self.pool.get_mut(slot) {
                            session.play();
                        }
                    }
                }
                Err(e) => self.notices.push(Notice::SlotError {
                    slot,
                    message: e.to_string(),
                }),
            }
        }
        Ok(())
    }

    // =========================================================================
    // AUDIO
    // =========================================================================

    pub fn set_volume(&mut self, level: i32) {
        self.mix.volume = level.clamp(0, 100) as u8;
        self.apply_mix();
    }

    pub fn adjust_volume(&mut self, delta: i32) {
        self.set_volume(self.mix.volume as i32 + delta);
    }

    pub fn set_global_mute(&mut self, muted: bool) {
        self.mix.muted = muted;
        self.apply_mix();
    }

    /// Local override only; the global mute flag is not touched
    pub fn set_session_mute(&mut self, slot: usize, muted: bool) -> Result<(), ShuffleError> {
        let mix = self.mix;
        self.pool.get_mut(slot)?.set_muted(muted, mix);
        Ok(())
    }

    fn apply_mix(&mut self) {
        let mix = self.mix;
        for session in self.pool.iter_mut().filter(|s| !s.is_muted()) {
            session.apply_mix(mix);
        }
    }

    // =========================================================================
    // BACKEND EVENTS
    // =========================================================================

    fn handle_event(&mut self, event: BackendEvent) {
        if !self.pool.is_current(&event) {
            log::debug!("Ignoring stale {:?} from slot {}", event.kind, event.slot);
            return;
        }

        match event.kind {
            BackendEventKind::EndReached => {
                let Ok(session) = self.pool.get_mut(event.slot) else {
                    return;
                };
                // Raised before a stop or pause that already halted the slot
                if session.state() != TransportState::Playing {
                    log::debug!("Ignoring end of stream for {:?} slot {}", session.state(), event.slot);
                    return;
                }
                log::info!("Slot {} finished", event.slot);
                session.mark_ended();
                if self.settings.auto_advance_on_end {
                    self.advance_slot(event.slot);
                }
            }
            BackendEventKind::Error(message) => {
                log::error!("Slot {} playback error: {}", event.slot, message);
                if let Ok(session) = self.pool.get_mut(event.slot) {
                    session.mark_failed(message.clone());
                }
                self.notices.push(Notice::SlotError {
                    slot: event.slot,
                    message,
                });
            }
        }
    }

    /// Replace one finished slot with a file not currently on screen
    fn advance_slot(&mut self, slot: usize) {
        let current = self.working_set();
        let Some(file) = self.sampler.draw_excluding(&self.catalog, 1, &current).pop() else {
            return;
        };

        log::info!("Slot {} advancing to {}", slot, file.file_name());
        match self.pool.load(slot, file, self.mix) {
            Ok(()) => {
                if let Ok(session) = self.pool.get_mut(slot) {
                    session.play();
                }
            }
            Err(e) => self.notices.push(Notice::SlotError {
                slot,
                message: e.to_string(),
            }),
        }
    }

    // =========================================================================
    // FULLSCREEN
    // =========================================================================

    pub fn toggle_fullscreen(&mut self, now: Instant) {
        if self.overlay.is_fullscreen() {
            self.overlay.exit_fullscreen();
        } else {
            self.overlay.enter_fullscreen(now);
        }
    }

    // =========================================================================
    // STATE QUERIES
    // =========================================================================

    /// Playing if any session plays, Idle without a working set
    pub fn aggregate_state(&self) -> AggregateState {
        if !self.loaded {
            AggregateState::Idle
        } else if self.pool.iter().any(|s| s.state() == TransportState::Playing) {
            AggregateState::Playing
        } else {
            AggregateState::Paused
        }
    }

    /// Media bound to the slots, in slot order
    pub fn working_set(&self) -> Vec<MediaFile> {
        self.pool.iter().filter_map(|s| s.media().cloned()).collect()
    }

    pub fn now_playing(&self) -> String {
        let names: Vec<String> = self.pool.iter().filter_map(|s| s.media()).map(|f| f.file_name()).collect();
        names.join(", ")
    }

    pub fn audible_slots(&self) -> Vec<usize> {
        self.pool
            .iter()
            .filter(|s| s.media().is_some() && s.is_audible(self.mix))
            .map(|s| s.slot())
            .collect()
    }

    pub fn timeline(&self) -> TimelineSummary {
        let bound: Vec<&PlaybackSession> = self.pool.iter().filter(|s| s.media().is_some()).collect();
        let position = bound.iter().map(|s| s.position()).max().unwrap_or_default();
        let duration = bound.iter().filter_map(|s| s.duration()).max();

        let progress: Vec<f64> = bound.iter().filter_map(|s| s.progress()).collect();
        let progress = (!progress.is_empty()).then(|| progress.iter().sum::<f64>() / progress.len() as f64);

        TimelineSummary {
            position,
            duration,
            progress,
        }
    }

    pub fn take_frames(&mut self) -> Vec<(usize, VideoFrame)> {
        self.pool
            .iter_mut()
            .filter_map(|s| s.take_frame().map(|frame| (s.slot(), frame)))
            .collect()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    pub fn mix(&self) -> AudioMix {
        self.mix
    }

    pub fn overlay(&self) -> &OverlayControlState {
        &self.overlay
    }

    pub fn is_fullscreen(&self) -> bool {
        self.overlay.is_fullscreen()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    pub fn shutdown(&mut self) {
        self.loaded = false;
        self.pool.release_all();
    }
}
