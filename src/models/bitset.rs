//! Fixed-universe bit vector
//!
//! Position sets (firstpos, followpos, running positions) are bit vectors
//! over the positions of one compiled content model. The logical size is
//! fixed when the set is created; `set` past the end grows the backing
//! storage and the logical size with it, but nothing ever shrinks it.
//!
//! Equality and hashing ignore trailing zero words so that two sets with
//! the same members compare equal regardless of how they were grown. The
//! DFA builder relies on this to key its state table by position set.

use std::fmt;
use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 64;

#[inline]
fn words_for(count: usize) -> usize {
    (count + WORD_BITS - 1) / WORD_BITS
}

/// Fixed-capacity bit vector
#[derive(Clone, Default)]
pub struct BitSet {
    count: usize,
    bits: Vec<u64>,
}

impl BitSet {
    /// Create an empty set over `count` positions
    pub fn new(count: usize) -> Self {
        Self {
            count,
            bits: vec![0; words_for(count)],
        }
    }

    /// Create a set over `count` positions containing `members`
    pub fn with_members(count: usize, members: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(count);
        for index in members {
            set.set(index);
        }
        set
    }

    /// Logical size of the universe
    pub fn count(&self) -> usize {
        self.count
    }

    /// Test membership; indexes outside the universe are never members
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        if index >= self.count {
            return false;
        }
        self.bits[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Add a member, growing the universe if needed
    #[inline]
    pub fn set(&mut self, index: usize) {
        if index >= self.count {
            self.count = index + 1;
            let needed = words_for(self.count);
            if needed > self.bits.len() {
                self.bits.resize(needed, 0);
            }
        }
        self.bits[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    /// Remove a member
    #[inline]
    pub fn clear(&mut self, index: usize) {
        if index < self.count {
            self.bits[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
        }
    }

    /// Remove every member, keeping the universe
    pub fn clear_all(&mut self) {
        self.bits.iter_mut().for_each(|word| *word = 0);
    }

    /// Replace the contents with a copy of `other`
    pub fn copy_from(&mut self, other: &BitSet) {
        self.count = self.count.max(other.count);
        self.bits.clear();
        self.bits.extend_from_slice(&other.bits);
        self.bits.resize(words_for(self.count), 0);
    }

    fn ensure_words(&mut self, other: &BitSet) {
        if other.count > self.count {
            self.count = other.count;
        }
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
    }

    /// In-place union
    pub fn or(&mut self, other: &BitSet) {
        self.ensure_words(other);
        for (word, other) in self.bits.iter_mut().zip(&other.bits) {
            *word |= *other;
        }
    }

    /// In-place intersection
    pub fn and(&mut self, other: &BitSet) {
        for (i, word) in self.bits.iter_mut().enumerate() {
            *word &= other.bits.get(i).copied().unwrap_or(0);
        }
    }

    /// In-place difference (`self \ other`)
    pub fn and_not(&mut self, other: &BitSet) {
        for (word, other) in self.bits.iter_mut().zip(&other.bits) {
            *word &= !*other;
        }
    }

    /// Whether the two sets share at least one member
    pub fn intersects(&self, other: &BitSet) -> bool {
        self.bits
            .iter()
            .zip(&other.bits)
            .any(|(a, b)| a & b != 0)
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// First member strictly after `after`, or the first member when
    /// `after` is `None`
    pub fn next_set(&self, after: Option<usize>) -> Option<usize> {
        let start = match after {
            Some(index) => index + 1,
            None => 0,
        };
        if start >= self.count {
            return None;
        }

        let mut word_index = start / WORD_BITS;
        let mut word = self.bits[word_index] & (!0u64 << (start % WORD_BITS));
        loop {
            if word != 0 {
                let index = word_index * WORD_BITS + word.trailing_zeros() as usize;
                return (index < self.count).then_some(index);
            }
            word_index += 1;
            if word_index >= self.bits.len() {
                return None;
            }
            word = self.bits[word_index];
        }
    }

    /// Iterate over members in increasing order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            last: None,
            done: false,
        }
    }

    fn significant_words(&self) -> &[u64] {
        let len = self
            .bits
            .iter()
            .rposition(|word| *word != 0)
            .map_or(0, |i| i + 1);
        &self.bits[..len]
    }
}

/// Iterator over the members of a [`BitSet`]
pub struct Iter<'a> {
    set: &'a BitSet,
    last: Option<usize>,
    done: bool,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        match self.set.next_set(self.last) {
            Some(index) => {
                self.last = Some(index);
                Some(index)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<'a> IntoIterator for &'a BitSet {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_words().hash(state);
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", members.join(", "))
    }
}
