//! Chunked particle arena with intrusive live and free lists
//!
//! Every slot in the pool is on exactly one of two singly-linked lists:
//!
//! - the **live list**, newest particle first, and
//! - the **free list**, most recently released slot first.
//!
//! Allocation always pushes onto the live-list head, so the particle returned
//! by the latest [`ParticlePool::allocate`] is [`ParticlePool::head`] until the
//! next list mutation. The spawn scheduler relies on this when it
//! forward-integrates the particle it just created.
//!
//! Storage is a list of boxed chunks: one chunk sized to the initial capacity
//! and then fixed [`GROWTH_CHUNK_SIZE`] chunks appended on exhaustion. Chunks
//! are never reallocated, so handles and links survive growth.

use crate::particle::{Particle, ParticleHandle};

/// Number of slots added each time the free list runs dry
pub const GROWTH_CHUNK_SIZE: usize = 16;

/// Slots added on top of the estimated steady-state population
pub const CAPACITY_MARGIN: usize = 8;

/// Result of a pool allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The newly live slot, now at the head of the live list
    pub handle: ParticleHandle,
    /// New total capacity if the pool had to grow to satisfy this request
    pub grown_to: Option<usize>,
}

/// Fixed-layout particle storage with O(1) allocate and release
#[derive(Debug, Clone)]
pub struct ParticlePool {
    chunks: Vec<Box<[Particle]>>,
    initial_len: usize,
    capacity: usize,
    free_head: Option<ParticleHandle>,
    live_head: Option<ParticleHandle>,
    live_count: usize,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl ParticlePool {
    /// Create a pool with `capacity` slots, all on the free list
    pub fn with_capacity(capacity: usize) -> Self {
        let mut chunks = Vec::new();
        let mut free_head = None;

        if capacity > 0 {
            let mut block = vec![Particle::default(); capacity].into_boxed_slice();
            for (i, slot) in block.iter_mut().enumerate() {
                slot.next = (i + 1 < capacity).then(|| ParticleHandle((i + 1) as u32));
            }
            chunks.push(block);
            free_head = Some(ParticleHandle(0));
        }

        Self {
            chunks,
            initial_len: capacity,
            capacity,
            free_head,
            live_head: None,
            live_count: 0,
        }
    }

    /// Total number of slots across all chunks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live particles
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Check if no particles are live
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Number of slots on the free list
    pub fn free_count(&self) -> usize {
        self.capacity - self.live_count
    }

    /// Number of allocated chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Newest live particle
    pub fn head(&self) -> Option<ParticleHandle> {
        self.live_head
    }

    fn locate(&self, handle: ParticleHandle) -> (usize, usize) {
        let index = handle.index();
        if index < self.initial_len {
            (0, index)
        } else {
            let relative = index - self.initial_len;
            let first_growth_chunk = usize::from(self.initial_len > 0);
            (
                first_growth_chunk + relative / GROWTH_CHUNK_SIZE,
                relative % GROWTH_CHUNK_SIZE,
            )
        }
    }

    /// Access a slot by handle
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this pool. Use
    /// [`ParticlePool::try_get`] for handles of unknown origin.
    pub fn get(&self, handle: ParticleHandle) -> &Particle {
        let (chunk, slot) = self.locate(handle);
        &self.chunks[chunk][slot]
    }

    /// Mutably access a slot by handle
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this pool.
    pub fn get_mut(&mut self, handle: ParticleHandle) -> &mut Particle {
        let (chunk, slot) = self.locate(handle);
        &mut self.chunks[chunk][slot]
    }

    /// Access a slot, or `None` if the handle lies outside this pool
    pub fn try_get(&self, handle: ParticleHandle) -> Option<&Particle> {
        let (chunk, slot) = self.locate(handle);
        self.chunks.get(chunk)?.get(slot)
    }

    /// Mutably access a slot, or `None` if the handle lies outside this pool
    pub fn try_get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        let (chunk, slot) = self.locate(handle);
        self.chunks.get_mut(chunk)?.get_mut(slot)
    }

    /// Append a growth chunk, pushing each new slot onto the free-list head.
    /// Returns the new free-list head.
    fn grow(&mut self) -> ParticleHandle {
        let start = self.capacity;
        let mut block = vec![Particle::default(); GROWTH_CHUNK_SIZE].into_boxed_slice();
        for (i, slot) in block.iter_mut().enumerate() {
            slot.next = if i == 0 {
                self.free_head
            } else {
                Some(ParticleHandle((start + i - 1) as u32))
            };
        }
        self.chunks.push(block);
        self.capacity += GROWTH_CHUNK_SIZE;

        let head = ParticleHandle((start + GROWTH_CHUNK_SIZE - 1) as u32);
        self.free_head = Some(head);
        head
    }

    /// Take a slot from the free list and push it onto the live-list head
    ///
    /// Grows the pool by [`GROWTH_CHUNK_SIZE`] when the free list is empty.
    /// The returned slot is reset to default state.
    pub fn allocate(&mut self) -> Allocation {
        let (handle, grown_to) = match self.free_head {
            Some(handle) => (handle, None),
            None => {
                let handle = self.grow();
                (handle, Some(self.capacity))
            }
        };

        let next_free = self.get(handle).next;
        self.free_head = next_free;

        let live_head = self.live_head;
        let slot = self.get_mut(handle);
        slot.reset();
        slot.next = live_head;

        self.live_head = Some(handle);
        self.live_count += 1;

        Allocation { handle, grown_to }
    }

    /// Move the newest live particle back to the free list
    pub fn release_head(&mut self) -> Option<ParticleHandle> {
        let handle = self.live_head?;
        let free_head = self.free_head;
        let slot = self.get_mut(handle);
        let next = slot.next;
        slot.next = free_head;

        self.live_head = next;
        self.free_head = Some(handle);
        self.live_count -= 1;
        Some(handle)
    }

    /// Return a specific live particle to the free list
    ///
    /// Constant time for the head; otherwise walks the live list to find the
    /// predecessor. Returns false if the handle is not live.
    pub fn release(&mut self, handle: ParticleHandle) -> bool {
        if self.live_head == Some(handle) {
            return self.release_head().is_some();
        }

        let mut trailing = self.live_head;
        while let Some(prev) = trailing {
            let next = self.get(prev).next;
            if next == Some(handle) {
                let after = self.get(handle).next;
                self.get_mut(prev).next = after;

                let free_head = self.free_head;
                self.get_mut(handle).next = free_head;
                self.free_head = Some(handle);
                self.live_count -= 1;
                return true;
            }
            trailing = next;
        }
        false
    }

    /// Walk the live list once, releasing every particle for which `keep`
    /// returns false. Returns the number of evicted particles.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut Particle) -> bool,
    {
        let mut evicted = 0;
        let mut trailing: Option<ParticleHandle> = None;
        let mut cursor = self.live_head;

        while let Some(handle) = cursor {
            let slot = self.get_mut(handle);
            let next = slot.next;

            if keep(&mut *slot) {
                trailing = Some(handle);
            } else {
                match trailing {
                    Some(prev) => self.get_mut(prev).next = next,
                    None => self.live_head = next,
                }
                let free_head = self.free_head;
                self.get_mut(handle).next = free_head;
                self.free_head = Some(handle);
                self.live_count -= 1;
                evicted += 1;
            }

            cursor = next;
        }

        evicted
    }

    /// Release every live particle
    pub fn clear(&mut self) {
        while self.release_head().is_some() {}
    }

    /// Visit every live particle, newest first
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Particle),
    {
        let mut cursor = self.live_head;
        while let Some(handle) = cursor {
            let slot = self.get_mut(handle);
            f(&mut *slot);
            cursor = slot.next;
        }
    }

    /// Iterate live particles, newest first
    pub fn iter(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.links(self.live_head).map(|(_, particle)| particle)
    }

    /// Iterate live particle handles, newest first
    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.links(self.live_head).map(|(handle, _)| handle)
    }

    /// Iterate free slot handles, most recently released first
    pub fn free_handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.links(self.free_head).map(|(handle, _)| handle)
    }

    fn links(&self, start: Option<ParticleHandle>) -> Links<'_> {
        Links {
            pool: self,
            cursor: start,
        }
    }
}

struct Links<'a> {
    pool: &'a ParticlePool,
    cursor: Option<ParticleHandle>,
}

impl<'a> Iterator for Links<'a> {
    type Item = (ParticleHandle, &'a Particle);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let particle = self.pool.get(handle);
        self.cursor = particle.next;
        Some((handle, particle))
    }
}
