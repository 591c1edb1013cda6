//! Fixed-width bit set.
//!
//! Used for decision-level sets during conflict-directed backjumping and as the
//! hashable key of the subproblem cache. Two sets of the same width compare equal
//! exactly when they hold the same bits.

/// A bit set backed by a vector of u64 words.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    const BITS_PER_WORD: usize = 64;

    /// Creates an empty set able to hold bits `0..capacity` without growing.
    pub fn new(capacity: usize) -> Self {
        let num_words = (capacity + Self::BITS_PER_WORD - 1) / Self::BITS_PER_WORD;
        Self {
            words: vec![0; num_words],
        }
    }

    /// Creates a set holding every bit in `0..n`.
    pub fn full(n: usize) -> Self {
        let mut bs = Self::new(n);
        for i in 0..n {
            bs.insert(i);
        }
        bs
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        match self.words.get(word_idx) {
            Some(word) => word & (1u64 << bit_idx) != 0,
            None => false,
        }
    }

    /// Sets the bit at `index`, growing if necessary. Returns true if it was clear.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        let mask = 1u64 << bit_idx;
        let was_clear = self.words[word_idx] & mask == 0;
        self.words[word_idx] |= mask;
        was_clear
    }

    /// Clears the bit at `index`. Returns true if it was set.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        match self.words.get_mut(word_idx) {
            Some(word) => {
                let mask = 1u64 << bit_idx;
                let was_set = *word & mask != 0;
                *word &= !mask;
                was_set
            }
            None => false,
        }
    }

    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Largest set bit, if any.
    pub fn max(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, &w)| w != 0)
            .map(|(i, w)| i * Self::BITS_PER_WORD + (Self::BITS_PER_WORD - 1 - w.leading_zeros() as usize))
    }

    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bs = BitSet::default();
        for i in iter {
            bs.insert(i);
        }
        bs
    }
}

/// Iterator over set bits in ascending order.
pub struct BitSetIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * BitSet::BITS_PER_WORD + bit_idx);
            }
            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());
        assert!(bs.insert(42));
        assert!(!bs.insert(42));
        assert!(bs.contains(42));
        assert!(bs.remove(42));
        assert!(!bs.remove(42));
        assert!(bs.is_empty());
    }

    #[test]
    fn test_equal_width_keys() {
        let mut a = BitSet::new(70);
        let mut b = BitSet::new(70);
        a.insert(3);
        a.insert(66);
        b.insert(66);
        b.insert(3);
        assert_eq!(a, b);
        b.remove(3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_union_and_iter() {
        let mut a: BitSet = [1, 5].into_iter().collect();
        let b: BitSet = [5, 64, 130].into_iter().collect();
        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 5, 64, 130]);
        assert_eq!(a.len(), 4);
        assert_eq!(a.max(), Some(130));
    }

    #[test]
    fn test_full() {
        let bs = BitSet::full(5);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(BitSet::new(10).max(), None);
    }
}
