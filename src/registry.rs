//! Registry of live watch faces
//!
//! Timer callbacks and other deferred work refer to a face by handle instead
//! of holding it. Once the face is destroyed its handle resolves to nothing
//! and the callback does nothing.

use crate::{
    clock::TimeSource,
    ui::{Effects, FaceEvent, WatchFace},
};

/// Generation checked reference to a registered face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaceHandle {
    slot: u8,
    generation: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every slot is taken
    Full,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Full => f.write_str("face registry is full"),
        }
    }
}

struct Slot {
    generation: u16,
    face: Option<WatchFace>,
}

pub struct FaceRegistry<const N: usize> {
    slots: [Slot; N],
}

impl<const N: usize> Default for FaceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FaceRegistry<N> {
    /// Slot indices must fit the `u8` of a handle
    const SLOTS_FIT_HANDLE: () = assert!(N <= u8::MAX as usize + 1, "too many face slots");

    pub fn new() -> Self {
        let () = Self::SLOTS_FIT_HANDLE;

        Self {
            slots: core::array::from_fn(|_| Slot {
                generation: 0,
                face: None,
            }),
        }
    }

    /// Register a face
    pub fn insert(&mut self, face: WatchFace) -> Result<FaceHandle, Error> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.face.is_none())
            .ok_or(Error::Full)?;

        slot.face = Some(face);
        Ok(FaceHandle {
            slot: index as u8,
            generation: slot.generation,
        })
    }

    pub fn get(&self, handle: FaceHandle) -> Option<&WatchFace> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.face.as_ref()
    }

    pub fn get_mut(&mut self, handle: FaceHandle) -> Option<&mut WatchFace> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.face.as_mut()
    }

    /// Deliver an event, `None` if the face is gone
    pub fn dispatch(
        &mut self,
        handle: FaceHandle,
        event: FaceEvent,
        clock: &impl TimeSource,
    ) -> Option<Effects> {
        let face = self.get_mut(handle)?;
        Some(face.handle(event, clock))
    }

    /// Tear a face down and unregister it
    pub fn destroy(&mut self, handle: FaceHandle, clock: &impl TimeSource) -> Option<Effects> {
        let effects = self.dispatch(handle, FaceEvent::Destroyed, clock)?;
        let slot = &mut self.slots[handle.slot as usize];
        slot.face = None;
        slot.generation = slot.generation.wrapping_add(1);
        Some(effects)
    }

    pub fn contains(&self, handle: FaceHandle) -> bool {
        self.get(handle).is_some()
    }
}
