//! Fixed-capacity slot storage for devices and loaded assets.
//!
//! Handles are slot indices tagged with a generation, so a handle to a
//! removed entry stays invalid after its slot is reused.

use crate::error::PoolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u16,
    generation: u16,
}

impl Handle {
    pub fn index(self) -> usize {
        usize::from(self.index)
    }
}

pub struct SlotPool<T, const N: usize> {
    slots: [Option<T>; N],
    generations: [u16; N],
    len: usize,
}

/// A pool shared between tasks.
pub type SharedPool<T, const N: usize> = spin::Mutex<SlotPool<T, N>>;

impl<T, const N: usize> Default for SlotPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> SlotPool<T, N> {
    const CAPACITY_OK: () = assert!(N <= u16::MAX as usize, "pool capacity must fit a u16 index");

    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            slots: [const { None }; N],
            generations: [0; N],
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Fail early, before building something that would not fit.
    pub fn reserve(&self) -> Result<(), PoolError> {
        if self.is_full() {
            log::warn!("pool: all {N} slots in use");
            return Err(PoolError::Exhausted);
        }
        Ok(())
    }

    /// Store `value` in the first free slot.
    pub fn insert(&mut self, value: T) -> Result<Handle, PoolError> {
        self.reserve()?;
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(PoolError::Exhausted)?;
        self.slots[index] = Some(value);
        self.len += 1;
        Ok(Handle {
            index: index as u16,
            generation: self.generations[index],
        })
    }

    pub fn get(&self, handle: Handle) -> Result<&T, PoolError> {
        self.check(handle)?;
        self.slots[handle.index()].as_ref().ok_or(PoolError::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, PoolError> {
        self.check(handle)?;
        self.slots[handle.index()].as_mut().ok_or(PoolError::InvalidHandle)
    }

    /// Take the value out and retire the handle.
    pub fn remove(&mut self, handle: Handle) -> Result<T, PoolError> {
        self.check(handle)?;
        let value = self.slots[handle.index()].take().ok_or(PoolError::InvalidHandle)?;
        self.generations[handle.index()] = self.generations[handle.index()].wrapping_add(1);
        self.len -= 1;
        Ok(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|value| {
                (
                    Handle {
                        index: i as u16,
                        generation: self.generations[i],
                    },
                    value,
                )
            })
        })
    }

    fn check(&self, handle: Handle) -> Result<(), PoolError> {
        match self.generations.get(handle.index()) {
            Some(&g) if g == handle.generation => Ok(()),
            _ => Err(PoolError::InvalidHandle),
        }
    }
}
