use crate::word::{delta_swap, stride_mask, BitWord};
use crate::BitVec;
use rand::Rng;
use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign, Index};

const BLOCK_BITS: usize = BitWord::BITS;

/// A row-major packed bit matrix.
///
/// Every row is padded to whole [`BitWord`]s and the padding bits stay zero.
/// Square matrices whose side is a multiple of 256 transpose in place; any
/// shape transposes out of place through the same 256x256 block kernel.
#[must_use]
#[derive(Clone, PartialEq, Eq)]
pub struct BitMatrix {
    row_count: usize,
    column_count: usize,
    words_per_row: usize,
    words: Vec<BitWord>,
}

impl BitMatrix {
    #[must_use]
    pub fn zeros(row_count: usize, column_count: usize) -> BitMatrix {
        let words_per_row = column_count.div_ceil(BLOCK_BITS);
        BitMatrix {
            row_count,
            column_count,
            words_per_row,
            words: vec![BitWord::ZERO; row_count * words_per_row],
        }
    }

    #[must_use]
    pub fn with_shape(row_count: usize, column_count: usize) -> BitMatrix {
        BitMatrix::zeros(row_count, column_count)
    }

    #[must_use]
    pub fn random(row_count: usize, column_count: usize, rng: &mut impl Rng) -> BitMatrix {
        let mut matrix = BitMatrix::zeros(row_count, column_count);
        matrix.fill_random(rng);
        matrix
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.column_count)
    }

    pub fn fill_random(&mut self, rng: &mut impl Rng) {
        for word in &mut self.words {
            for lane in &mut word.lanes {
                *lane = rng.gen();
            }
        }
        self.mask_row_padding();
    }

    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = BitWord::ZERO;
        }
    }

    #[must_use]
    pub fn get(&self, index: (usize, usize)) -> bool {
        let (row, column) = index;
        assert!(row < self.row_count && column < self.column_count, "matrix index out of range");
        self.words[row * self.words_per_row + column / BLOCK_BITS].index(column % BLOCK_BITS)
    }

    pub fn set(&mut self, index: (usize, usize), value: bool) {
        let (row, column) = index;
        assert!(row < self.row_count && column < self.column_count, "matrix index out of range");
        self.words[row * self.words_per_row + column / BLOCK_BITS]
            .assign_index(column % BLOCK_BITS, value);
    }

    #[must_use]
    pub fn row_words(&self, row: usize) -> &[BitWord] {
        debug_assert!(row < self.row_count);
        &self.words[row * self.words_per_row..(row + 1) * self.words_per_row]
    }

    pub fn row_words_mut(&mut self, row: usize) -> &mut [BitWord] {
        debug_assert!(row < self.row_count);
        &mut self.words[row * self.words_per_row..(row + 1) * self.words_per_row]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Row<'_> {
        Row {
            words: self.row_words(row),
            column_count: self.column_count,
        }
    }

    #[must_use]
    pub fn column(&self, column: usize) -> Column<'_> {
        assert!(column < self.column_count, "column index out of range");
        Column { matrix: self, column }
    }

    /// Copies row `row` into a standalone [`BitVec`] of exact column length.
    #[must_use]
    pub fn row_to_bitvec(&self, row: usize) -> BitVec {
        BitVec::from_words(self.column_count, self.row_words(row).to_vec())
    }

    pub fn assign_row_from_bitvec(&mut self, row: usize, bits: &BitVec) {
        assert_eq!(bits.bit_len(), self.column_count, "row assignment length mismatch");
        self.row_words_mut(row).copy_from_slice(bits.words());
    }

    pub fn swap_rows(&mut self, first: usize, second: usize) {
        if first == second {
            return;
        }
        let width = self.words_per_row;
        for offset in 0..width {
            self.words.swap(first * width + offset, second * width + offset);
        }
    }

    /// `target_row ^= source_row`, word at a time.
    pub fn xor_row_into(&mut self, source: usize, target: usize) {
        assert_ne!(source, target, "xor of a row into itself");
        let width = self.words_per_row;
        let split = target.max(source) * width;
        let (head, tail) = self.words.split_at_mut(split);
        let (source_words, target_words) = if source < target {
            (&head[source * width..source * width + width], &mut tail[..width])
        } else {
            (&tail[..width], &mut head[target * width..target * width + width])
        };
        for (target_word, source_word) in target_words.iter_mut().zip(source_words) {
            *target_word ^= *source_word;
        }
    }

    pub fn bitxor_assign(&mut self, rhs: &BitMatrix) {
        assert_eq!(self.shape(), rhs.shape(), "xor of mismatched shapes");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word ^= *other;
        }
    }

    pub fn bitor_assign(&mut self, rhs: &BitMatrix) {
        assert_eq!(self.shape(), rhs.shape(), "or of mismatched shapes");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word |= *other;
        }
    }

    pub fn bitand_assign(&mut self, rhs: &BitMatrix) {
        assert_eq!(self.shape(), rhs.shape(), "and of mismatched shapes");
        for (word, other) in self.words.iter_mut().zip(rhs.words.iter()) {
            *word &= *other;
        }
    }

    /// In-place transpose. Requires a square shape with side a multiple of 256.
    pub fn transpose_in_place(&mut self) {
        assert_eq!(self.row_count, self.column_count, "in-place transpose requires a square matrix");
        assert_eq!(
            self.row_count % BLOCK_BITS,
            0,
            "in-place transpose requires the side to be a multiple of {BLOCK_BITS}"
        );
        let blocks = self.row_count / BLOCK_BITS;
        let mut first = [BitWord::ZERO; BLOCK_BITS];
        let mut second = [BitWord::ZERO; BLOCK_BITS];
        for diagonal in 0..blocks {
            self.load_block(diagonal, diagonal, &mut first);
            transpose_block(&mut first);
            self.store_block(diagonal, diagonal, &first);
            for other in diagonal + 1..blocks {
                self.load_block(diagonal, other, &mut first);
                self.load_block(other, diagonal, &mut second);
                transpose_block(&mut first);
                transpose_block(&mut second);
                self.store_block(other, diagonal, &first);
                self.store_block(diagonal, other, &second);
            }
        }
    }

    /// Writes the transpose into `out`, which must have the swapped shape.
    pub fn transpose_into(&self, out: &mut BitMatrix) {
        assert_eq!(
            (out.row_count, out.column_count),
            (self.column_count, self.row_count),
            "transpose output shape mismatch"
        );
        let row_blocks = self.row_count.div_ceil(BLOCK_BITS);
        let column_blocks = self.column_count.div_ceil(BLOCK_BITS);
        let mut buffer = [BitWord::ZERO; BLOCK_BITS];
        for block_row in 0..row_blocks {
            for block_column in 0..column_blocks {
                self.load_block(block_row, block_column, &mut buffer);
                transpose_block(&mut buffer);
                out.store_block(block_column, block_row, &buffer);
            }
        }
    }

    #[must_use]
    pub fn transposed(&self) -> BitMatrix {
        let mut out = BitMatrix::zeros(self.column_count, self.row_count);
        self.transpose_into(&mut out);
        out
    }

    /// Reads the 256x256 block at block coordinates, zero-padding past the
    /// stated shape.
    fn load_block(&self, block_row: usize, block_column: usize, buffer: &mut [BitWord; BLOCK_BITS]) {
        for (offset, slot) in buffer.iter_mut().enumerate() {
            let row = block_row * BLOCK_BITS + offset;
            *slot = if row < self.row_count && block_column < self.words_per_row {
                self.words[row * self.words_per_row + block_column]
            } else {
                BitWord::ZERO
            };
        }
    }

    fn store_block(&mut self, block_row: usize, block_column: usize, buffer: &[BitWord; BLOCK_BITS]) {
        for (offset, slot) in buffer.iter().enumerate() {
            let row = block_row * BLOCK_BITS + offset;
            if row < self.row_count && block_column < self.words_per_row {
                self.words[row * self.words_per_row + block_column] = *slot;
            }
        }
    }

    fn mask_row_padding(&mut self) {
        let tail_bits = self.column_count % BLOCK_BITS;
        if tail_bits == 0 || self.words_per_row == 0 {
            return;
        }
        let tail_mask = !BitWord::ones().shift_left(tail_bits);
        for row in 0..self.row_count {
            self.words[row * self.words_per_row + self.words_per_row - 1] &= tail_mask;
        }
    }
}

/// Transposes one 256x256 bit block held as 256 row words.
///
/// Level 0 transposes the 8x8 tiles through the byte-lane interleave; the
/// remaining levels exchange sub-tile pairs, doubling the tile side each
/// time (8 -> 16 -> 32 -> 64 -> 128 -> 256).
fn transpose_block(rows: &mut [BitWord; BLOCK_BITS]) {
    for group in 0..BLOCK_BITS / 8 {
        let tile: &mut [BitWord; 8] = (&mut rows[group * 8..group * 8 + 8]).try_into().expect("tile of 8 rows");
        BitWord::interleave8(tile);
    }
    for shift in [8usize, 16, 32, 64, 128] {
        let mask = stride_mask(shift);
        let mut base = 0;
        while base < BLOCK_BITS {
            for low in base..base + shift {
                let (head, tail) = rows.split_at_mut(low + shift);
                delta_swap(&mut head[low], &mut tail[0], shift, mask);
            }
            base += 2 * shift;
        }
    }
}

/// Borrowed view of one matrix row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    words: &'a [BitWord],
    column_count: usize,
}

impl Row<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.column_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.column_count == 0
    }

    #[must_use]
    pub fn index(&self, column: usize) -> bool {
        assert!(column < self.column_count, "column index out of range");
        self.words[column / BLOCK_BITS].index(column % BLOCK_BITS)
    }

    #[must_use]
    pub fn weight(&self) -> usize {
        self.words.iter().map(BitWord::weight).sum()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(BitWord::is_zero)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.column_count).map(|column| self.index(column))
    }
}

/// Borrowed view of one matrix column.
#[derive(Clone, Copy)]
pub struct Column<'a> {
    matrix: &'a BitMatrix,
    column: usize,
}

impl Column<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrix.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrix.row_count == 0
    }

    #[must_use]
    pub fn index(&self, row: usize) -> bool {
        self.matrix.get((row, self.column))
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.matrix.row_count).map(|row| self.index(row))
    }
}

impl Index<(usize, usize)> for BitMatrix {
    type Output = bool;

    fn index(&self, index: (usize, usize)) -> &bool {
        if self.get(index) {
            &true
        } else {
            &false
        }
    }
}

impl Index<[usize; 2]> for BitMatrix {
    type Output = bool;

    fn index(&self, index: [usize; 2]) -> &bool {
        if self.get((index[0], index[1])) {
            &true
        } else {
            &false
        }
    }
}

impl BitXorAssign<&BitMatrix> for BitMatrix {
    fn bitxor_assign(&mut self, rhs: &BitMatrix) {
        BitMatrix::bitxor_assign(self, rhs);
    }
}

impl BitOrAssign<&BitMatrix> for BitMatrix {
    fn bitor_assign(&mut self, rhs: &BitMatrix) {
        BitMatrix::bitor_assign(self, rhs);
    }
}

impl BitAndAssign<&BitMatrix> for BitMatrix {
    fn bitand_assign(&mut self, rhs: &BitMatrix) {
        BitMatrix::bitand_assign(self, rhs);
    }
}

impl fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitMatrix({} x {})", self.row_count, self.column_count)?;
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                f.write_str(if self.get((row, column)) { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
