//! LRU eviction list
//!
//! Arena-backed intrusive linked list for O(1) promotion and eviction. The
//! arena is the single owner of every [`Entry`]; a slot index doubles as the
//! entry's handle, which is what the indices store.

use crate::entry::Entry;

/// Handle to an entry's slot in the eviction list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(usize);

/// Node in the LRU doubly-linked list
struct Node {
    entry: Entry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Entries ordered from most (head) to least (tail) recently used
pub struct EvictionList {
    nodes: Vec<Option<Node>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    len: usize,
}

impl EvictionList {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Insert a new entry as most recently used
    pub fn push_front(&mut self, entry: Entry) -> EntryHandle {
        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            entry,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;

        EntryHandle(idx)
    }

    /// Move an existing entry to the most recently used position
    pub fn promote(&mut self, handle: EntryHandle) {
        let idx = handle.0;
        if self.head == Some(idx) || !self.contains(handle) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Remove and return the least recently used entry
    pub fn pop_back(&mut self) -> Option<Entry> {
        let tail = self.tail?;
        self.remove(EntryHandle(tail))
    }

    /// Least recently used entry, without removing it
    pub fn peek_back(&self) -> Option<&Entry> {
        self.tail.and_then(|idx| self.get(EntryHandle(idx)))
    }

    /// Unlink an arbitrary entry
    pub fn remove(&mut self, handle: EntryHandle) -> Option<Entry> {
        if !self.contains(handle) {
            return None;
        }

        self.unlink(handle.0);
        self.free_list.push(handle.0);
        self.len -= 1;
        self.nodes[handle.0].take().map(|node| node.entry)
    }

    pub fn contains(&self, handle: EntryHandle) -> bool {
        matches!(self.nodes.get(handle.0), Some(Some(_)))
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&Entry> {
        self.nodes
            .get(handle.0)
            .and_then(|slot| slot.as_ref())
            .map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut Entry> {
        self.nodes
            .get_mut(handle.0)
            .and_then(|slot| slot.as_mut())
            .map(|node| &mut node.entry)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Entries from most to least recently used
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor?)?.as_ref()?;
            cursor = node.next;
            Some(&node.entry)
        })
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = if let Some(node) = &self.nodes[idx] {
            (node.prev, node.next)
        } else {
            return;
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }
}

impl Default for EvictionList {
    fn default() -> Self {
        Self::new()
    }
}
