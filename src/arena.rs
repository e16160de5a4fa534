use alloc::vec::Vec;
use core::ops::{
    Index,
    IndexMut,
};

use crate::Ptr;

#[cold]
#[inline(never)]
fn assert_data(state: &str) -> ! {
    panic!("Attempted to access entry data of a {state} slot");
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LLData<K, T> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: T,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum SlotState<K, T> {
    /// The ring anchor. Always slot 0.
    Sentinel,
    Live(LLData<K, T>),
    /// Unlinked from the ring, but its own links are still what they were at
    /// removal so that a cursor parked here can walk on.
    Retired,
    Free { next_free: Option<Ptr> },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LLSlot<K, T> {
    next: Ptr,
    prev: Ptr,
    state: SlotState<K, T>,
}

impl<K, T> LLSlot<K, T> {
    pub(crate) fn next(&self) -> Ptr {
        self.next
    }

    pub(crate) fn prev(&self) -> Ptr {
        self.prev
    }

    pub(crate) fn state(&self) -> &SlotState<K, T> {
        &self.state
    }

    pub(crate) fn data(&self) -> &LLData<K, T> {
        match &self.state {
            SlotState::Live(data) => data,
            SlotState::Sentinel => assert_data("sentinel"),
            SlotState::Retired => assert_data("retired"),
            SlotState::Free { .. } => assert_data("free"),
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut LLData<K, T> {
        match &mut self.state {
            SlotState::Live(data) => data,
            SlotState::Sentinel => assert_data("sentinel"),
            SlotState::Retired => assert_data("retired"),
            SlotState::Free { .. } => assert_data("free"),
        }
    }
}

/// Slot storage for the ring. Slot 0 is the sentinel; `next`/`prev` are
/// indices, so the ring holds no references.
#[derive(Debug, Clone)]
pub(crate) struct Arena<K, T> {
    nodes: Vec<LLSlot<K, T>>,
    free_head: Option<Ptr>,
    retired: Vec<Ptr>,
}

impl<K, T> Arena<K, T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.saturating_add(1));
        nodes.push(LLSlot {
            next: Ptr::SENTINEL,
            prev: Ptr::SENTINEL,
            state: SlotState::Sentinel,
        });
        Arena {
            nodes,
            free_head: None,
            retired: Vec::new(),
        }
    }

    pub(crate) fn links(&self, ptr: Ptr) -> &LLSlot<K, T> {
        &self.nodes[ptr.unchecked_get()]
    }

    pub(crate) fn head(&self) -> Ptr {
        self.links(Ptr::SENTINEL).next
    }

    pub(crate) fn tail(&self) -> Ptr {
        self.links(Ptr::SENTINEL).prev
    }

    pub(crate) fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Drops every slot except the sentinel, which is reset to point at
    /// itself.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].next = Ptr::SENTINEL;
        self.nodes[0].prev = Ptr::SENTINEL;
        self.free_head = None;
        self.retired.clear();
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing free slots could be dropped here, but the free list is
        // threaded through them in arbitrary order.
        self.nodes.shrink_to_fit();
        self.retired.shrink_to_fit();
    }

    /// Allocates a live slot, reusing a free one when available. The new slot
    /// is not linked into the ring; its links point at itself.
    pub(crate) fn alloc(&mut self, key: K, value: T, hash: u64) -> Ptr {
        let data = SlotState::Live(LLData { hash, key, value });
        match self.free_head {
            Some(ptr) => {
                let slot = &mut self.nodes[ptr.unchecked_get()];
                self.free_head = match slot.state {
                    SlotState::Free { next_free } => next_free,
                    _ => unreachable!("free list threads through an occupied slot"),
                };
                *slot = LLSlot {
                    next: ptr,
                    prev: ptr,
                    state: data,
                };
                ptr
            }
            None => {
                let ptr = Ptr::from_index(self.nodes.len());
                self.nodes.push(LLSlot {
                    next: ptr,
                    prev: ptr,
                    state: data,
                });
                ptr
            }
        }
    }

    pub(crate) fn is_live(&self, ptr: Ptr) -> bool {
        matches!(
            self.nodes.get(ptr.unchecked_get()).map(|slot| &slot.state),
            Some(SlotState::Live(_))
        )
    }

    /// Links an unlinked slot immediately before `anchor`.
    pub(crate) fn link_before(&mut self, ptr: Ptr, anchor: Ptr) {
        let prev = self.nodes[anchor.unchecked_get()].prev;
        self.link_between(ptr, prev, anchor);
    }

    /// Links an unlinked slot immediately after `anchor`.
    pub(crate) fn link_after(&mut self, ptr: Ptr, anchor: Ptr) {
        let next = self.nodes[anchor.unchecked_get()].next;
        self.link_between(ptr, anchor, next);
    }

    fn link_between(&mut self, ptr: Ptr, prev: Ptr, next: Ptr) {
        {
            let slot = &mut self.nodes[ptr.unchecked_get()];
            slot.prev = prev;
            slot.next = next;
        }
        self.nodes[prev.unchecked_get()].next = ptr;
        self.nodes[next.unchecked_get()].prev = ptr;
    }

    /// Splices `ptr` out of the ring by pointing its neighbors at each other.
    /// The slot's own links are left untouched.
    pub(crate) fn unlink(&mut self, ptr: Ptr) {
        debug_assert!(!ptr.is_sentinel(), "the sentinel cannot be unlinked");
        let LLSlot { next, prev, .. } = self.nodes[ptr.unchecked_get()];
        self.nodes[prev.unchecked_get()].next = next;
        self.nodes[next.unchecked_get()].prev = prev;
    }

    /// Takes the data out of an already unlinked slot and returns the slot to
    /// the free list.
    pub(crate) fn free(&mut self, ptr: Ptr) -> LLData<K, T> {
        assert!(self.is_live(ptr), "Pointer to free must be live");
        let slot = &mut self.nodes[ptr.unchecked_get()];
        let state = core::mem::replace(
            &mut slot.state,
            SlotState::Free {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(ptr);
        match state {
            SlotState::Live(data) => data,
            _ => unreachable!(),
        }
    }

    /// Takes the data out of an already unlinked slot but keeps the slot and
    /// its links in place until [`Arena::reclaim_retired`] runs.
    pub(crate) fn retire(&mut self, ptr: Ptr) -> LLData<K, T> {
        assert!(self.is_live(ptr), "Pointer to retire must be live");
        let state = core::mem::replace(
            &mut self.nodes[ptr.unchecked_get()].state,
            SlotState::Retired,
        );
        self.retired.push(ptr);
        match state {
            SlotState::Live(data) => data,
            _ => unreachable!(),
        }
    }

    /// Moves every retired slot onto the free list. Only sound once nothing
    /// can be parked on a retired slot anymore.
    pub(crate) fn reclaim_retired(&mut self) -> usize {
        let count = self.retired.len();
        for ptr in self.retired.drain(..) {
            let slot = &mut self.nodes[ptr.unchecked_get()];
            debug_assert!(matches!(slot.state, SlotState::Retired));
            slot.state = SlotState::Free {
                next_free: self.free_head,
            };
            self.free_head = Some(ptr);
        }
        count
    }
}

impl<K, T> Index<Ptr> for Arena<K, T> {
    type Output = LLData<K, T>;

    fn index(&self, index: Ptr) -> &Self::Output {
        self.nodes[index.unchecked_get()].data()
    }
}

impl<K, T> IndexMut<Ptr> for Arena<K, T> {
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        self.nodes[index.unchecked_get()].data_mut()
    }
}
