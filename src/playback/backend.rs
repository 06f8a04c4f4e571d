use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use crate::core::error::BackendError;

/// Decoded RGBA frame ready for display
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEventKind {
    EndReached,
    Error(String),
}

/// Notification raised by a backend on its own thread. `load_id` ties it
/// to the media load that produced it, so events from a replaced source
/// can be recognised as stale.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub slot: usize,
    pub load_id: u64,
    pub kind: BackendEventKind,
}

/// Handle a backend uses to post events back to the coordinating thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    slot: usize,
    sender: mpsc::Sender<BackendEvent>,
}

impl EventSink {
    pub fn new(slot: usize, sender: mpsc::Sender<BackendEvent>) -> Self {
        Self { slot, sender }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn emit(&self, load_id: u64, kind: BackendEventKind) {
        let event = BackendEvent {
            slot: self.slot,
            load_id,
            kind,
        };
        if self.sender.send(event).is_err() {
            log::debug!("Event for slot {} dropped, coordinator is gone", self.slot);
        }
    }
}

/// Transport surface of one opaque player instance. Calls are made from
/// the coordinating thread only; asynchronous outcomes (end of stream,
/// decode failure) come back through the `EventSink` the backend was
/// created with.
pub trait PlayerBackend: Send {
    fn load(&mut self, path: &Path, load_id: u64) -> Result<(), BackendError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_volume(&mut self, volume: u8);
    fn set_muted(&mut self, muted: bool);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;

    /// Latest frame decoded since the previous call, if any
    fn take_frame(&mut self) -> Option<VideoFrame> {
        None
    }
}

/// Builds one backend per pool slot.
pub trait BackendFactory {
    fn create(&self, events: EventSink) -> Result<Box<dyn PlayerBackend>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_sink_tags_slot() {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(3, tx);
        sink.emit(7, BackendEventKind::EndReached);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.slot, 3);
        assert_eq!(event.load_id, 7);
        assert_eq!(event.kind, BackendEventKind::EndReached);
    }

    #[test]
    fn test_event_sink_survives_closed_channel() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        EventSink::new(0, tx).emit(1, BackendEventKind::Error("boom".to_string()));
    }
}
