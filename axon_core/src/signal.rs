//! Growable signal bitset for process scheduling masks.
//!
//! Each process gates its next frame on a *block mask* (signals whose
//! readiness is required) and accumulates a per-cycle *event mask*
//! (signals that became ready). A fixed machine-word mask would cap a
//! process at 31 endpoints; `SignalSet` keeps the same
//! set/clear/test/covers operations on an unbounded id range.

/// Identifies one signal channel (endpoint or timer) within a process.
pub type SignalId = u32;

const WORD_BITS: u32 = u64::BITS;

/// A growable set of signal ids, stored as packed 64-bit words.
///
/// Ids are small and dense (they come from a monotonic per-process
/// allocator), so a word vector beats a hash set here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSet {
    words: Vec<u64>,
}

impl SignalSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    #[inline]
    fn index(id: SignalId) -> (usize, u64) {
        ((id / WORD_BITS) as usize, 1u64 << (id % WORD_BITS))
    }

    /// Insert `id` into the set, growing the word storage if needed.
    pub fn set(&mut self, id: SignalId) {
        let (word, bit) = Self::index(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    /// Remove `id` from the set.
    pub fn clear(&mut self, id: SignalId) {
        let (word, bit) = Self::index(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !bit;
        }
    }

    /// Whether `id` is in the set.
    pub fn test(&self, id: SignalId) -> bool {
        let (word, bit) = Self::index(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// Remove all ids. Keeps the allocated storage.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Whether no id is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Whether every id set in `other` is also set in `self`.
    ///
    /// This is the "all block conditions satisfied" test: the event
    /// mask covers the block mask.
    pub fn covers(&self, other: &SignalSet) -> bool {
        for (i, needed) in other.words.iter().enumerate() {
            let have = self.words.get(i).copied().unwrap_or(0);
            if needed & !have != 0 {
                return false;
            }
        }
        true
    }
}
