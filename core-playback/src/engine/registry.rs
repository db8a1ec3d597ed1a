//! "Now playing" mediator.
//!
//! Holds at most one engine identity. Starting playback claims the slot and
//! broadcasts an [`Announcement`]; every engine listens for announcements for
//! its whole lifetime and pauses itself when it is playing but no longer
//! holds the claim.

use parking_lot::Mutex;
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const ANNOUNCEMENT_BUFFER: usize = 32;

/// Identity of a playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(Uuid);

impl EngineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broadcast when an engine claims the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Announcement {
    pub engine: EngineId,
    /// Increases with every claim; later announcements supersede earlier ones.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    holder: Option<EngineId>,
    generation: u64,
}

/// Process-wide registry of the engine allowed to play.
pub struct NowPlayingRegistry {
    slot: Mutex<Slot>,
    sender: broadcast::Sender<Announcement>,
}

impl NowPlayingRegistry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(ANNOUNCEMENT_BUFFER);
        Self {
            slot: Mutex::new(Slot::default()),
            sender,
        }
    }

    /// Make `engine` the holder and announce it.
    ///
    /// The announcement is sent while the slot is locked, so announcement
    /// order always matches claim order.
    pub fn claim(&self, engine: EngineId) -> Announcement {
        let mut slot = self.slot.lock();
        let previous = slot.holder.replace(engine);
        slot.generation += 1;

        let announcement = Announcement {
            engine,
            generation: slot.generation,
        };
        let _ = self.sender.send(announcement);

        debug!(%engine, ?previous, generation = slot.generation, "Output claimed");
        announcement
    }

    /// Clear the claim if `engine` still holds it.
    pub fn release(&self, engine: EngineId) -> bool {
        let mut slot = self.slot.lock();
        if slot.holder == Some(engine) {
            slot.holder = None;
            debug!(%engine, "Output released");
            true
        } else {
            false
        }
    }

    pub fn holder(&self) -> Option<EngineId> {
        self.slot.lock().holder
    }

    pub fn is_holder(&self, engine: EngineId) -> bool {
        self.slot.lock().holder == Some(engine)
    }

    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    /// Receive every announcement made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.sender.subscribe()
    }
}

impl Default for NowPlayingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NowPlayingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("NowPlayingRegistry")
            .field("holder", &slot.holder)
            .field("generation", &slot.generation)
            .finish()
    }
}
