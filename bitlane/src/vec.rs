use crate::word::BitWord;
use rand::Rng;
use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign};

/// A packed bit vector with an exact bit length.
///
/// Storage is padded up to whole [`BitWord`]s; the padding bits are kept
/// zero by every mutating operation, so word-granular comparisons and
/// popcounts never see stray bits.
#[must_use]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVec {
    bit_len: usize,
    words: Vec<BitWord>,
}

impl BitVec {
    #[must_use]
    pub fn zeros(bit_len: usize) -> BitVec {
        BitVec {
            bit_len,
            words: vec![BitWord::ZERO; bit_len.div_ceil(BitWord::BITS)],
        }
    }

    #[must_use]
    pub fn of_length(bit_len: usize) -> BitVec {
        BitVec::zeros(bit_len)
    }

    /// Wraps pre-packed words. `words` must hold exactly enough words for
    /// `bit_len`; bits past `bit_len` are cleared.
    #[must_use]
    pub fn from_words(bit_len: usize, words: Vec<BitWord>) -> BitVec {
        assert_eq!(words.len(), bit_len.div_ceil(BitWord::BITS), "word count does not match bit length");
        let mut result = BitVec { bit_len, words };
        result.mask_padding();
        result
    }

    /// Uniformly random contents.
    #[must_use]
    pub fn random(bit_len: usize, rng: &mut impl Rng) -> BitVec {
        let mut result = BitVec::zeros(bit_len);
        for word in &mut result.words {
            for lane in &mut word.lanes {
                *lane = rng.gen();
            }
        }
        result.mask_padding();
        result
    }

    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Reads bit `index`. Panics when out of range.
    #[must_use]
    pub fn index(&self, index: usize) -> bool {
        assert!(index < self.bit_len, "bit index {index} out of range for length {}", self.bit_len);
        self.words[index / BitWord::BITS].index(index % BitWord::BITS)
    }

    /// Range-checked read for callers that prefer an `Option`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.bit_len).then(|| self.index(index))
    }

    pub fn assign_index(&mut self, index: usize, value: bool) {
        assert!(index < self.bit_len, "bit index {index} out of range for length {}", self.bit_len);
        self.words[index / BitWord::BITS].assign_index(index % BitWord::BITS, value);
    }

    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = BitWord::ZERO;
        }
    }

    /// Number of set bits.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.words.iter().map(BitWord::weight).sum()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(BitWord::is_zero)
    }

    /// Parity of the AND with another vector of the same length.
    #[must_use]
    pub fn dot(&self, rhs: &BitVec) -> bool {
        assert_eq!(self.bit_len, rhs.bit_len, "dot of mismatched lengths");
        let common: usize = self
            .words
            .iter()
            .zip(rhs.words.iter())
            .map(|(a, b)| (*a & *b).weight())
            .sum();
        common % 2 == 1
    }

    /// Number of positions set in either vector.
    #[must_use]
    pub fn or_weight(&self, rhs: &BitVec) -> usize {
        assert_eq!(self.bit_len, rhs.bit_len, "or_weight of mismatched lengths");
        self.words
            .iter()
            .zip(rhs.words.iter())
            .map(|(a, b)| (*a | *b).weight())
            .sum()
    }

    /// Indices of the set bits, ascending.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bit_len).filter(|&index| self.index(index))
    }

    #[must_use]
    pub fn words(&self) -> &[BitWord] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [BitWord] {
        &mut self.words
    }

    /// Zeroes every storage bit at or beyond `bit_len`.
    pub(crate) fn mask_padding(&mut self) {
        let tail_bits = self.bit_len % BitWord::BITS;
        if tail_bits != 0 {
            let last = self.words.len() - 1;
            self.words[last] &= !BitWord::ones().shift_left(tail_bits);
        }
    }

    pub fn bitxor_assign(&mut self, rhs: &BitVec) {
        assert_eq!(self.bit_len, rhs.bit_len, "xor of mismatched lengths");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word ^= *other;
        }
    }

    pub fn bitor_assign(&mut self, rhs: &BitVec) {
        assert_eq!(self.bit_len, rhs.bit_len, "or of mismatched lengths");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word |= *other;
        }
    }

    pub fn bitand_assign(&mut self, rhs: &BitVec) {
        assert_eq!(self.bit_len, rhs.bit_len, "and of mismatched lengths");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word &= *other;
        }
    }
}

impl BitXorAssign<&BitVec> for BitVec {
    fn bitxor_assign(&mut self, rhs: &BitVec) {
        BitVec::bitxor_assign(self, rhs);
    }
}

impl BitOrAssign<&BitVec> for BitVec {
    fn bitor_assign(&mut self, rhs: &BitVec) {
        BitVec::bitor_assign(self, rhs);
    }
}

impl BitAndAssign<&BitVec> for BitVec {
    fn bitand_assign(&mut self, rhs: &BitVec) {
        BitVec::bitand_assign(self, rhs);
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I: IntoIterator<Item = bool>>(bits: I) -> BitVec {
        let collected: Vec<bool> = bits.into_iter().collect();
        let mut result = BitVec::zeros(collected.len());
        for (index, bit) in collected.into_iter().enumerate() {
            result.assign_index(index, bit);
        }
        result
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.bit_len() {
            f.write_str(if self.index(index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
