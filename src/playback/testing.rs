//! Scripted in-memory backend for tests. Every transport call is recorded
//! so tests can inspect what a session pushed to its player.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::error::BackendError;
use crate::playback::backend::{BackendEventKind, BackendFactory, EventSink, PlayerBackend};

#[derive(Debug, Default)]
struct FakeState {
    loaded: Option<PathBuf>,
    load_id: u64,
    playing: bool,
    position: Duration,
    duration: Option<Duration>,
    volume: u8,
    muted: bool,
    seek_count: usize,
    stop_count: usize,
    fail_next_load: bool,
    released: bool,
}

pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

/// Test-side view of a `FakeBackend`
#[derive(Clone)]
pub struct FakeProbe {
    state: Arc<Mutex<FakeState>>,
    events: Option<EventSink>,
}

impl FakeBackend {
    pub fn new(duration: Option<Duration>) -> (Self, FakeProbe) {
        let state = Arc::new(Mutex::new(FakeState {
            duration,
            volume: 100,
            ..Default::default()
        }));
        let probe = FakeProbe {
            state: Arc::clone(&state),
            events: None,
        };
        (Self { state }, probe)
    }
}

impl PlayerBackend for FakeBackend {
    fn load(&mut self, path: &Path, load_id: u64) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.position = Duration::ZERO;
        state.load_id = load_id;
        if state.fail_next_load {
            state.fail_next_load = false;
            state.loaded = None;
            return Err(BackendError::Load {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }
        state.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stop_count += 1;
        state.playing = false;
        state.position = Duration::ZERO;
    }

    fn seek(&mut self, position: Duration) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.seek_count += 1;
    }

    fn set_volume(&mut self, volume: u8) {
        self.state.lock().unwrap().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state.lock().unwrap().duration
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.released = true;
            state.playing = false;
        }
    }
}

impl FakeProbe {
    pub fn loaded(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    pub fn set_position(&self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        self.state.lock().unwrap().duration = duration;
    }

    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn seek_count(&self) -> usize {
        self.state.lock().unwrap().seek_count
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().unwrap().stop_count
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn fail_next_load(&self) {
        self.state.lock().unwrap().fail_next_load = true;
    }

    /// Raise an event for the media currently loaded, as the backend would
    pub fn emit(&self, kind: BackendEventKind) {
        let load_id = self.state.lock().unwrap().load_id;
        self.emit_for(load_id, kind);
    }

    pub fn emit_for(&self, load_id: u64, kind: BackendEventKind) {
        if let Some(events) = &self.events {
            events.emit(load_id, kind);
        }
    }

    pub fn load_id(&self) -> u64 {
        self.state.lock().unwrap().load_id
    }
}

/// Hands out fake backends and remembers a probe for each one created.
#[derive(Clone, Default)]
pub struct FakeFactory {
    duration: Option<Duration>,
    created: Arc<Mutex<Vec<(usize, FakeProbe)>>>,
}

impl FakeFactory {
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            created: Arc::default(),
        }
    }

    /// Probe of the most recent backend created for `slot`
    pub fn probe(&self, slot: usize) -> FakeProbe {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| *s == slot)
            .map(|(_, probe)| probe.clone())
            .unwrap_or_else(|| panic!("no backend created for slot {}", slot))
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl BackendFactory for FakeFactory {
    fn create(&self, events: EventSink) -> Result<Box<dyn PlayerBackend>, BackendError> {
        let (backend, mut probe) = FakeBackend::new(self.duration);
        let slot = events.slot();
        probe.events = Some(events);
        self.created.lock().unwrap().push((slot, probe));
        Ok(Box::new(backend))
    }
}
