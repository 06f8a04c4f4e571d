use std::time::Duration;

use crate::core::error::BackendError;
use crate::core::media::MediaFile;
use crate::playback::backend::{PlayerBackend, VideoFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn display_text(&self) -> &str {
        match self {
            TransportState::Stopped => "Stopped",
            TransportState::Playing => "Playing",
            TransportState::Paused => "Paused",
        }
    }
}

/// Ensemble-wide audio settings. Volume is never stored per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMix {
    pub volume: u8,
    pub muted: bool,
}

impl AudioMix {
    pub fn new(volume: u8, muted: bool) -> Self {
        Self {
            volume: volume.min(100),
            muted,
        }
    }
}

impl Default for AudioMix {
    fn default() -> Self {
        Self::new(100, false)
    }
}

/// One slot of the grid: a player backend plus the per-video state the
/// operator can override locally (mute, position, stop).
pub struct PlaybackSession {
    slot: usize,
    backend: Box<dyn PlayerBackend>,
    media: Option<MediaFile>,
    state: TransportState,
    muted: bool,
    error: Option<String>,
    load_id: u64,
}

impl PlaybackSession {
    pub fn new(slot: usize, backend: Box<dyn PlayerBackend>) -> Self {
        Self {
            slot,
            backend,
            media: None,
            state: TransportState::Stopped,
            muted: false,
            error: None,
            load_id: 0,
        }
    }

    /// Bind new media. Position and error state are reset; the session
    /// comes up Paused, or Stopped with its error flag set if the backend
    /// refuses the file. The backend drops the outgoing file itself.
    pub fn load(&mut self, file: MediaFile, load_id: u64, mix: AudioMix) -> Result<(), BackendError> {
        self.load_id = load_id;
        self.error = None;

        let result = self.backend.load(file.path(), load_id);
        self.media = Some(file);

        match result {
            Ok(()) => {
                self.state = TransportState::Paused;
                self.apply_mix(mix);
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Stopped;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Leave the slot empty, e.g. when the working set is smaller than the grid
    pub fn unload(&mut self, load_id: u64) {
        self.backend.stop();
        self.load_id = load_id;
        self.media = None;
        self.error = None;
        self.state = TransportState::Stopped;
    }

    pub fn play(&mut self) -> bool {
        if self.media.is_none() || self.error.is_some() || self.state == TransportState::Playing {
            return false;
        }
        self.backend.play();
        self.state = TransportState::Playing;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.backend.pause();
        self.state = TransportState::Paused;
        true
    }

    /// Operator stop of this one session; it is then skipped by play/pause
    pub fn halt(&mut self) {
        if self.state != TransportState::Stopped {
            self.backend.stop();
            self.state = TransportState::Stopped;
        }
    }

    /// Back to position zero, halted but resumable
    pub fn rewind(&mut self) {
        self.backend.stop();
        if self.media.is_some() && self.error.is_none() {
            self.state = TransportState::Paused;
        } else {
            self.state = TransportState::Stopped;
        }
    }

    /// Move by `delta_secs`, clamped to `[0, duration)`. No-op without
    /// bound media or a known duration.
    pub fn seek_relative(&mut self, delta_secs: f64) -> bool {
        let Some(duration) = self.seekable_duration() else {
            return false;
        };
        let target = (self.position().as_secs_f64() + delta_secs).max(0.0);
        self.seek_clamped(Duration::from_secs_f64(target), duration);
        true
    }

    /// Jump to `fraction` of the stream length (0.0..=1.0)
    pub fn seek_fraction(&mut self, fraction: f64) -> bool {
        let Some(duration) = self.seekable_duration() else {
            return false;
        };
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.seek_clamped(duration.mul_f64(fraction), duration);
        true
    }

    fn seekable_duration(&self) -> Option<Duration> {
        self.media.as_ref()?;
        self.backend.duration().filter(|d| !d.is_zero())
    }

    fn seek_clamped(&mut self, target: Duration, duration: Duration) {
        let last = duration.saturating_sub(Duration::from_millis(1));
        let target = target.min(last);
        log::debug!("Slot {}: seek to {:.2}s", self.slot, target.as_secs_f64());
        self.backend.seek(target);
    }

    pub fn set_muted(&mut self, muted: bool, mix: AudioMix) {
        self.muted = muted;
        self.apply_mix(mix);
    }

    /// Push the global mix to the backend. A locally muted session only
    /// ever receives mute; the global volume reaches it when unmuted.
    pub fn apply_mix(&mut self, mix: AudioMix) {
        if self.muted {
            self.backend.set_muted(true);
        } else {
            self.backend.set_volume(mix.volume);
            self.backend.set_muted(mix.muted);
        }
    }

    pub fn is_audible(&self, mix: AudioMix) -> bool {
        !mix.muted && !self.muted && mix.volume > 0
    }

    /// Backend reported end of stream: hold the last frame, stay stopped
    pub fn mark_ended(&mut self) {
        self.state = TransportState::Stopped;
    }

    /// Backend reported a decode/playback failure for this slot only
    pub fn mark_failed(&mut self, message: String) {
        self.backend.stop();
        self.state = TransportState::Stopped;
        self.error = Some(message);
    }

    pub fn take_frame(&mut self) -> Option<VideoFrame> {
        self.backend.take_frame()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn media(&self) -> Option<&MediaFile> {
        self.media.as_ref()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn load_id(&self) -> u64 {
        self.load_id
    }

    pub fn position(&self) -> Duration {
        let position = self.backend.position();
        match self.backend.duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.backend.duration()
    }

    /// Playback progress in 0.0..=1.0, if the duration is known
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration().filter(|d| !d.is_zero())?;
        Some((self.position().as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }
}
