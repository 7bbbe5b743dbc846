//! Conference bridge
//!
//! Audio endpoints are numbered slots; a directed link `a -> b` means
//! whatever `a` produces is heard by `b`. Slot 0 is the sound device.

use crate::domain::shared::error::EngineError;
use crate::domain::shared::value_objects::{CallId, SlotId};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Who owns a bridge slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOwner {
    SoundDevice,
    Call(CallId),
}

/// Conference bridge
///
/// ```
/// use autoanswer::domain::shared::value_objects::{CallId, SlotId};
/// use autoanswer::infrastructure::media::ConferenceBridge;
///
/// let mut bridge = ConferenceBridge::new();
/// let slot = bridge.allocate(CallId::new(1)).unwrap();
/// bridge.connect(slot, SlotId::SOUND_DEVICE).unwrap();
/// assert_eq!(bridge.links(), vec![(slot, SlotId::SOUND_DEVICE)]);
/// ```
#[derive(Debug)]
pub struct ConferenceBridge {
    slots: HashMap<SlotId, SlotOwner>,
    links: BTreeSet<(SlotId, SlotId)>,
}

impl ConferenceBridge {
    /// Empty bridge with only the sound device on slot 0
    pub fn new() -> Self {
        let mut slots = HashMap::new();
        slots.insert(SlotId::SOUND_DEVICE, SlotOwner::SoundDevice);
        Self {
            slots,
            links: BTreeSet::new(),
        }
    }

    /// Give a call the lowest free slot
    pub fn allocate(&mut self, call_id: CallId) -> Result<SlotId, EngineError> {
        let slot = (1..=u32::MAX)
            .map(SlotId::new)
            .find(|slot| !self.slots.contains_key(slot))
            .ok_or_else(|| EngineError::Internal("No free bridge slot".to_string()))?;
        self.slots.insert(slot, SlotOwner::Call(call_id));
        debug!("Allocated {} for {}", slot, call_id);
        Ok(slot)
    }

    /// Give a call a specific slot
    pub fn reserve(&mut self, slot: SlotId, call_id: CallId) -> Result<(), EngineError> {
        match self.owner(slot) {
            Some(SlotOwner::Call(owner)) if owner == call_id => Ok(()),
            Some(owner) => Err(EngineError::InvalidArgument(format!(
                "{} already owned by {:?}",
                slot, owner
            ))),
            None => {
                self.slots.insert(slot, SlotOwner::Call(call_id));
                Ok(())
            }
        }
    }

    /// Release a call slot, dropping every link that touches it
    pub fn release(&mut self, slot: SlotId) {
        if slot == SlotId::SOUND_DEVICE {
            return;
        }
        self.disconnect_all(slot);
        self.slots.remove(&slot);
    }

    /// Add a directed link. Returns false if it already existed.
    pub fn connect(&mut self, from: SlotId, to: SlotId) -> Result<bool, EngineError> {
        for slot in [from, to] {
            if !self.slots.contains_key(&slot) {
                return Err(EngineError::NotFound(format!("{} is not on the bridge", slot)));
            }
        }
        Ok(self.links.insert((from, to)))
    }

    /// Drop every link into or out of `slot`
    pub fn disconnect_all(&mut self, slot: SlotId) -> usize {
        let before = self.links.len();
        self.links.retain(|(from, to)| *from != slot && *to != slot);
        before - self.links.len()
    }

    /// Current owner of `slot`, if anything holds it
    pub fn owner(&self, slot: SlotId) -> Option<SlotOwner> {
        self.slots.get(&slot).copied()
    }

    /// Every directed link, ordered by source slot
    pub fn links(&self) -> Vec<(SlotId, SlotId)> {
        self.links.iter().copied().collect()
    }
}

impl Default for ConferenceBridge {
    fn default() -> Self {
        Self::new()
    }
}
