use std::sync::mpsc;

use crate::core::error::ShuffleError;
use crate::core::media::MediaFile;
use crate::playback::backend::{BackendEvent, BackendFactory, EventSink};
use crate::playback::session::{AudioMix, PlaybackSession};

/// Largest grid the pool will hold (3x3)
pub const MAX_SLOTS: usize = 9;

/// Owns the live sessions. Slot indices are always `0..len()`; the pool
/// only ever grows or shrinks at the high end, so lower slots keep their
/// media, mute flag and position across a resize.
pub struct SessionPool {
    sessions: Vec<PlaybackSession>,
    factory: Box<dyn BackendFactory>,
    event_sender: mpsc::Sender<BackendEvent>,
    next_load_id: u64,
}

impl SessionPool {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        event_sender: mpsc::Sender<BackendEvent>,
        count: usize,
    ) -> Result<Self, ShuffleError> {
        let mut pool = Self {
            sessions: Vec::with_capacity(MAX_SLOTS),
            factory,
            event_sender,
            next_load_id: 0,
        };
        pool.resize(count)?;
        Ok(pool)
    }

    pub fn validate_count(count: usize) -> Result<usize, ShuffleError> {
        if (1..=MAX_SLOTS).contains(&count) {
            Ok(count)
        } else {
            Err(ShuffleError::InvalidCount(count))
        }
    }

    /// Grow or shrink to `new_count` sessions. Returns the slots that were
    /// added (empty when shrinking). Nothing changes if the count is
    /// invalid or a new backend cannot be created.
    pub fn resize(&mut self, new_count: usize) -> Result<Vec<usize>, ShuffleError> {
        let new_count = Self::validate_count(new_count)?;
        let current = self.sessions.len();

        if new_count > current {
            let mut added = Vec::with_capacity(new_count - current);
            for slot in current..new_count {
                let events = EventSink::new(slot, self.event_sender.clone());
                let backend = self.factory.create(events)?;
                added.push(PlaybackSession::new(slot, backend));
            }
            self.sessions.extend(added);
            log::info!("Session pool grown {} -> {}", current, new_count);
            Ok((current..new_count).collect())
        } else {
            // Highest slots first
            while self.sessions.len() > new_count {
                if let Some(session) = self.sessions.pop() {
                    log::debug!("Releasing session for slot {}", session.slot());
                }
            }
            if new_count < current {
                log::info!("Session pool shrunk {} -> {}", current, new_count);
            }
            Ok(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, slot: usize) -> Result<&PlaybackSession, ShuffleError> {
        let count = self.sessions.len();
        self.sessions.get(slot).ok_or(ShuffleError::InvalidSlot { slot, count })
    }

    pub fn get_mut(&mut self, slot: usize) -> Result<&mut PlaybackSession, ShuffleError> {
        let count = self.sessions.len();
        self.sessions.get_mut(slot).ok_or(ShuffleError::InvalidSlot { slot, count })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaybackSession> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlaybackSession> {
        self.sessions.iter_mut()
    }

    /// Bind `file` to `slot` under a fresh load id. Ids are unique across
    /// the pool's lifetime, so events from torn-down or reloaded sessions
    /// never match a live one.
    pub fn load(&mut self, slot: usize, file: MediaFile, mix: AudioMix) -> Result<(), ShuffleError> {
        let load_id = self.allocate_load_id();
        let session = self.get_mut(slot)?;
        log::debug!("Slot {}: loading {}", slot, file);
        session.load(file, load_id, mix).map_err(ShuffleError::from)
    }

    pub fn unload(&mut self, slot: usize) -> Result<(), ShuffleError> {
        let load_id = self.allocate_load_id();
        self.get_mut(slot)?.unload(load_id);
        Ok(())
    }

    /// Whether `event` belongs to the media currently bound to its slot
    pub fn is_current(&self, event: &BackendEvent) -> bool {
        self.sessions
            .get(event.slot)
            .is_some_and(|session| session.load_id() == event.load_id && session.media().is_some())
    }

    /// Tear every session down, e.g. on application exit
    pub fn release_all(&mut self) {
        let count = self.sessions.len();
        self.sessions.clear();
        log::info!("Released {} playback session(s)", count);
    }

    fn allocate_load_id(&mut self) -> u64 {
        self.next_load_id += 1;
        self.next_load_id
    }
}
