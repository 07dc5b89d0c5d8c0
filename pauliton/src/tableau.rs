use crate::core::PauliMatrix;
use crate::operations::UnitaryOp;
use crate::pauli::{product_phase_exponent, PauliString};
use crate::{assert_1q_gate, assert_2q_gate};
use bitlane::word::BitWord;
use bitlane::{BitMatrix, BitVec, BIT_LANE_ALIGNMENT};
use rand::Rng;

/// Stabilizer tableau over `num_qubits` qubits.
///
/// Row `k` of the destabilizer half tracks the Pauli the circuit maps `X_k`
/// to; row `k` of the stabilizer half tracks the image of `Z_k`. Each half
/// keeps its X and Z components in square bit planes padded to the lane
/// alignment, plus a sign vector, so gate application is whole-word row
/// arithmetic and measurement can transpose the planes in place.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tableau {
    num_qubits: usize,
    destabilizer_x: BitMatrix,
    destabilizer_z: BitMatrix,
    stabilizer_x: BitMatrix,
    stabilizer_z: BitMatrix,
    destabilizer_signs: BitVec,
    stabilizer_signs: BitVec,
}

impl Tableau {
    /// The tableau of the identity Clifford: `X_k -> X_k`, `Z_k -> Z_k`.
    pub fn identity(num_qubits: usize) -> Tableau {
        let padded = num_qubits.div_ceil(BIT_LANE_ALIGNMENT) * BIT_LANE_ALIGNMENT;
        let mut tableau = Tableau {
            num_qubits,
            destabilizer_x: BitMatrix::zeros(padded, padded),
            destabilizer_z: BitMatrix::zeros(padded, padded),
            stabilizer_x: BitMatrix::zeros(padded, padded),
            stabilizer_z: BitMatrix::zeros(padded, padded),
            destabilizer_signs: BitVec::zeros(num_qubits),
            stabilizer_signs: BitVec::zeros(num_qubits),
        };
        for qubit in 0..num_qubits {
            tableau.destabilizer_x.set((qubit, qubit), true);
            tableau.stabilizer_z.set((qubit, qubit), true);
        }
        tableau
    }

    #[must_use]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The tracked image of `X_k`.
    #[must_use]
    pub fn x_image(&self, qubit: usize) -> PauliString {
        assert!(qubit < self.num_qubits, "qubit index out of range");
        PauliString::from_bits(
            BitVec::from_words(self.num_qubits, self.destabilizer_x.row_words(qubit).to_vec()),
            BitVec::from_words(self.num_qubits, self.destabilizer_z.row_words(qubit).to_vec()),
            self.destabilizer_signs.index(qubit),
        )
    }

    /// The tracked image of `Z_k`.
    #[must_use]
    pub fn z_image(&self, qubit: usize) -> PauliString {
        assert!(qubit < self.num_qubits, "qubit index out of range");
        PauliString::from_bits(
            BitVec::from_words(self.num_qubits, self.stabilizer_x.row_words(qubit).to_vec()),
            BitVec::from_words(self.num_qubits, self.stabilizer_z.row_words(qubit).to_vec()),
            self.stabilizer_signs.index(qubit),
        )
    }

    /// Checks the symplectic commutation invariant: images of commuting
    /// generators commute, and `X_k` anticommutes exactly with `Z_k`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let x_images: Vec<PauliString> = (0..self.num_qubits).map(|q| self.x_image(q)).collect();
        let z_images: Vec<PauliString> = (0..self.num_qubits).map(|q| self.z_image(q)).collect();
        for i in 0..self.num_qubits {
            for j in 0..self.num_qubits {
                if !x_images[i].commutes_with(&x_images[j]) || !z_images[i].commutes_with(&z_images[j]) {
                    return false;
                }
                if x_images[i].commutes_with(&z_images[j]) != (i != j) {
                    return false;
                }
            }
        }
        true
    }

    /// Applies one Clifford generator to the given qubits.
    pub fn apply(&mut self, op: UnitaryOp, support: &[usize]) {
        use UnitaryOp::*;
        for &qubit in support {
            assert!(qubit < self.num_qubits, "qubit index {qubit} out of range");
        }
        match op {
            I => {
                assert_1q_gate!(support);
            }
            X => {
                assert_1q_gate!(support);
                self.flip_stabilizer_sign(support[0]);
            }
            Y => {
                assert_1q_gate!(support);
                self.flip_destabilizer_sign(support[0]);
                self.flip_stabilizer_sign(support[0]);
            }
            Z => {
                assert_1q_gate!(support);
                self.flip_destabilizer_sign(support[0]);
            }
            Hadamard => {
                assert_1q_gate!(support);
                self.swap_halves(support[0]);
            }
            SqrtZ => {
                assert_1q_gate!(support);
                self.mul_destabilizer_by_stabilizer(support[0], 3);
            }
            SqrtZInv => {
                assert_1q_gate!(support);
                self.mul_destabilizer_by_stabilizer(support[0], 1);
            }
            SqrtX => {
                assert_1q_gate!(support);
                self.left_mul_stabilizer_by_destabilizer(support[0], 1);
            }
            SqrtXInv => {
                assert_1q_gate!(support);
                self.left_mul_stabilizer_by_destabilizer(support[0], 3);
            }
            SqrtY => {
                assert_1q_gate!(support);
                self.swap_halves(support[0]);
                self.flip_stabilizer_sign(support[0]);
            }
            SqrtYInv => {
                assert_1q_gate!(support);
                self.swap_halves(support[0]);
                self.flip_destabilizer_sign(support[0]);
            }
            ControlledX => self.apply_controlled(PauliMatrix::Z, PauliMatrix::X, support),
            ControlledY => self.apply_controlled(PauliMatrix::Z, PauliMatrix::Y, support),
            ControlledZ => self.apply_controlled(PauliMatrix::Z, PauliMatrix::Z, support),
            XcX => self.apply_controlled(PauliMatrix::X, PauliMatrix::X, support),
            XcY => self.apply_controlled(PauliMatrix::X, PauliMatrix::Y, support),
            XcZ => self.apply_controlled(PauliMatrix::X, PauliMatrix::Z, support),
            YcX => self.apply_controlled(PauliMatrix::Y, PauliMatrix::X, support),
            YcY => self.apply_controlled(PauliMatrix::Y, PauliMatrix::Y, support),
            YcZ => self.apply_controlled(PauliMatrix::Y, PauliMatrix::Z, support),
            Swap => {
                assert_2q_gate!(support);
                self.swap_qubits(support[0], support[1]);
            }
            ISwap => self.apply_iswap(support, 2),
            ISwapInv => self.apply_iswap(support, 0),
        }
    }

    /// True iff a Z-basis measurement of `qubit` has a certain outcome.
    #[must_use]
    pub fn is_deterministic(&self, qubit: usize) -> bool {
        assert!(qubit < self.num_qubits, "qubit index out of range");
        self.stabilizer_x.row(qubit).is_zero()
    }

    /// Z-basis measurement. Deterministic outcomes leave the tableau
    /// untouched; random outcomes draw a fair bit from `rng` and collapse
    /// the state, after which re-measuring the qubit is deterministic.
    pub fn measure_z(&mut self, qubit: usize, rng: &mut impl Rng) -> bool {
        assert!(qubit < self.num_qubits, "qubit index out of range");
        if self.is_deterministic(qubit) {
            return self.stabilizer_signs.index(qubit);
        }
        let result = rng.gen::<bool>();
        self.transpose_planes();
        let pivot = (0..self.num_qubits)
            .find(|&k| self.stabilizer_x.get((k, qubit)))
            .expect("a random measurement has an anticommuting generator");
        // Gaussian-style elimination: clear every other X component of the
        // tracked Z_qubit row, then rotate the pivot column so the row
        // becomes a plain Z with the drawn sign.
        for other in pivot + 1..self.num_qubits {
            if self.stabilizer_x.get((other, qubit)) {
                self.transposed_cx(pivot, other);
            }
        }
        if self.stabilizer_z.get((pivot, qubit)) {
            self.transposed_s(pivot);
        }
        self.transposed_h(pivot);
        if self.stabilizer_signs.index(qubit) != result {
            self.transposed_x(pivot);
        }
        self.transpose_planes();
        debug_assert!(self.is_deterministic(qubit));
        debug_assert_eq!(self.stabilizer_signs.index(qubit), result);
        result
    }

    /// Collapses `qubit` and forces it to `|0>`.
    pub fn reset_z(&mut self, qubit: usize, rng: &mut impl Rng) {
        if self.measure_z(qubit, rng) {
            self.apply(UnitaryOp::X, &[qubit]);
        }
    }

    fn flip_destabilizer_sign(&mut self, qubit: usize) {
        let sign = self.destabilizer_signs.index(qubit);
        self.destabilizer_signs.assign_index(qubit, !sign);
    }

    fn flip_stabilizer_sign(&mut self, qubit: usize) {
        let sign = self.stabilizer_signs.index(qubit);
        self.stabilizer_signs.assign_index(qubit, !sign);
    }

    /// `destabilizer[q] := i^bump · destabilizer[q] · stabilizer[q]`.
    fn mul_destabilizer_by_stabilizer(&mut self, qubit: usize, bump: u8) {
        let exponent = product_phase_exponent(
            self.destabilizer_x.row_words(qubit),
            self.destabilizer_z.row_words(qubit),
            self.stabilizer_x.row_words(qubit),
            self.stabilizer_z.row_words(qubit),
        );
        let total = (exponent + bump) % 4;
        debug_assert_eq!(total % 2, 0, "gate patch produced an imaginary row");
        xor_words(self.destabilizer_x.row_words_mut(qubit), self.stabilizer_x.row_words(qubit));
        xor_words(self.destabilizer_z.row_words_mut(qubit), self.stabilizer_z.row_words(qubit));
        let flip = self.stabilizer_signs.index(qubit) ^ (total == 2);
        if flip {
            self.flip_destabilizer_sign(qubit);
        }
    }

    /// `stabilizer[q] := i^bump · destabilizer[q] · stabilizer[q]`.
    fn left_mul_stabilizer_by_destabilizer(&mut self, qubit: usize, bump: u8) {
        let exponent = product_phase_exponent(
            self.destabilizer_x.row_words(qubit),
            self.destabilizer_z.row_words(qubit),
            self.stabilizer_x.row_words(qubit),
            self.stabilizer_z.row_words(qubit),
        );
        let total = (exponent + bump) % 4;
        debug_assert_eq!(total % 2, 0, "gate patch produced an imaginary row");
        xor_words(self.stabilizer_x.row_words_mut(qubit), self.destabilizer_x.row_words(qubit));
        xor_words(self.stabilizer_z.row_words_mut(qubit), self.destabilizer_z.row_words(qubit));
        let flip = self.destabilizer_signs.index(qubit) ^ (total == 2);
        if flip {
            self.flip_stabilizer_sign(qubit);
        }
    }

    /// Swaps the tracked `X_q` and `Z_q` rows (the Hadamard patch).
    fn swap_halves(&mut self, qubit: usize) {
        self.destabilizer_x.row_words_mut(qubit).swap_with_slice(self.stabilizer_x.row_words_mut(qubit));
        self.destabilizer_z.row_words_mut(qubit).swap_with_slice(self.stabilizer_z.row_words_mut(qubit));
        let destabilizer_sign = self.destabilizer_signs.index(qubit);
        let stabilizer_sign = self.stabilizer_signs.index(qubit);
        self.destabilizer_signs.assign_index(qubit, stabilizer_sign);
        self.stabilizer_signs.assign_index(qubit, destabilizer_sign);
    }

    fn swap_qubits(&mut self, first: usize, second: usize) {
        self.destabilizer_x.swap_rows(first, second);
        self.destabilizer_z.swap_rows(first, second);
        self.stabilizer_x.swap_rows(first, second);
        self.stabilizer_z.swap_rows(first, second);
        let destabilizer_sign = self.destabilizer_signs.index(first);
        self.destabilizer_signs.assign_index(first, self.destabilizer_signs.index(second));
        self.destabilizer_signs.assign_index(second, destabilizer_sign);
        let stabilizer_sign = self.stabilizer_signs.index(first);
        self.stabilizer_signs.assign_index(first, self.stabilizer_signs.index(second));
        self.stabilizer_signs.assign_index(second, stabilizer_sign);
    }

    /// The tracked image of the given single-qubit Pauli, phase folded.
    fn axis_image(&self, axis: PauliMatrix, qubit: usize) -> PauliString {
        match axis {
            PauliMatrix::X => self.x_image(qubit),
            PauliMatrix::Z => self.z_image(qubit),
            PauliMatrix::Y => {
                // Y = i·X·Z, so the image is i times the product of the rows.
                let mut image = self.x_image(qubit);
                let exponent = image.mul_assign_right_with_phase(&self.z_image(qubit));
                image.fold_phase_exponent((exponent + 1) % 4);
                image
            }
            PauliMatrix::I => unreachable!("controlled gates have non-identity axes"),
        }
    }

    /// Shared patch for the controlled-Pauli family: the rows of either
    /// qubit that anticommute with its own axis absorb the image of the
    /// partner's axis.
    fn apply_controlled(&mut self, control_axis: PauliMatrix, target_axis: PauliMatrix, support: &[usize]) {
        assert_2q_gate!(support);
        let (control, target) = (support[0], support[1]);
        let control_image = self.axis_image(control_axis, control);
        let target_image = self.axis_image(target_axis, target);
        if control_axis != PauliMatrix::X {
            self.mul_destabilizer_row_by_pauli(control, &target_image);
        }
        if control_axis != PauliMatrix::Z {
            self.mul_stabilizer_row_by_pauli(control, &target_image);
        }
        if target_axis != PauliMatrix::X {
            self.mul_destabilizer_row_by_pauli(target, &control_image);
        }
        if target_axis != PauliMatrix::Z {
            self.mul_stabilizer_row_by_pauli(target, &control_image);
        }
    }

    fn mul_destabilizer_row_by_pauli(&mut self, qubit: usize, pauli: &PauliString) {
        let exponent = product_phase_exponent(
            self.destabilizer_x.row_words(qubit),
            self.destabilizer_z.row_words(qubit),
            pauli.xs().words(),
            pauli.zs().words(),
        );
        debug_assert_eq!(exponent % 2, 0, "gate patch produced an imaginary row");
        xor_words(self.destabilizer_x.row_words_mut(qubit), pauli.xs().words());
        xor_words(self.destabilizer_z.row_words_mut(qubit), pauli.zs().words());
        let flip = pauli.sign() ^ (exponent == 2);
        if flip {
            self.flip_destabilizer_sign(qubit);
        }
    }

    fn mul_stabilizer_row_by_pauli(&mut self, qubit: usize, pauli: &PauliString) {
        let exponent = product_phase_exponent(
            self.stabilizer_x.row_words(qubit),
            self.stabilizer_z.row_words(qubit),
            pauli.xs().words(),
            pauli.zs().words(),
        );
        debug_assert_eq!(exponent % 2, 0, "gate patch produced an imaginary row");
        xor_words(self.stabilizer_x.row_words_mut(qubit), pauli.xs().words());
        xor_words(self.stabilizer_z.row_words_mut(qubit), pauli.zs().words());
        let flip = pauli.sign() ^ (exponent == 2);
        if flip {
            self.flip_stabilizer_sign(qubit);
        }
    }

    /// ISWAP maps `X_a -> -Z_a Y_b`, `X_b -> -Y_a Z_b` and exchanges the Z
    /// rows; the inverse drops the minus signs. `sign_bump` is the phase
    /// exponent of that leading sign (2 for ISWAP, 0 for its inverse).
    fn apply_iswap(&mut self, support: &[usize], sign_bump: u8) {
        assert_2q_gate!(support);
        let (first, second) = (support[0], support[1]);
        let old_z_first = self.z_image(first);
        let old_z_second = self.z_image(second);
        let y_first = self.axis_image(PauliMatrix::Y, first);
        let y_second = self.axis_image(PauliMatrix::Y, second);

        let mut new_x_first = old_z_first.clone();
        let exponent = new_x_first.mul_assign_right_with_phase(&y_second);
        new_x_first.fold_phase_exponent((exponent + sign_bump) % 4);

        let mut new_x_second = y_first;
        let exponent = new_x_second.mul_assign_right_with_phase(&old_z_second);
        new_x_second.fold_phase_exponent((exponent + sign_bump) % 4);

        self.assign_destabilizer_row(first, &new_x_first);
        self.assign_destabilizer_row(second, &new_x_second);
        self.assign_stabilizer_row(first, &old_z_second);
        self.assign_stabilizer_row(second, &old_z_first);
    }

    fn assign_destabilizer_row(&mut self, qubit: usize, pauli: &PauliString) {
        self.destabilizer_x.row_words_mut(qubit).copy_from_slice(pauli.xs().words());
        self.destabilizer_z.row_words_mut(qubit).copy_from_slice(pauli.zs().words());
        self.destabilizer_signs.assign_index(qubit, pauli.sign());
    }

    fn assign_stabilizer_row(&mut self, qubit: usize, pauli: &PauliString) {
        self.stabilizer_x.row_words_mut(qubit).copy_from_slice(pauli.xs().words());
        self.stabilizer_z.row_words_mut(qubit).copy_from_slice(pauli.zs().words());
        self.stabilizer_signs.assign_index(qubit, pauli.sign());
    }

    fn transpose_planes(&mut self) {
        self.destabilizer_x.transpose_in_place();
        self.destabilizer_z.transpose_in_place();
        self.stabilizer_x.transpose_in_place();
        self.stabilizer_z.transpose_in_place();
    }

    /// Conjugates every tracked row by `CX(control, target)`, expressed in
    /// the transposed plane layout so each step is whole-word arithmetic.
    fn transposed_cx(&mut self, control: usize, target: usize) {
        transposed_cx_half(
            &mut self.destabilizer_x,
            &mut self.destabilizer_z,
            &mut self.destabilizer_signs,
            control,
            target,
        );
        transposed_cx_half(
            &mut self.stabilizer_x,
            &mut self.stabilizer_z,
            &mut self.stabilizer_signs,
            control,
            target,
        );
    }

    /// Conjugates every tracked row by `S` on `qubit` (transposed layout).
    fn transposed_s(&mut self, qubit: usize) {
        transposed_s_half(&mut self.destabilizer_x, &mut self.destabilizer_z, &mut self.destabilizer_signs, qubit);
        transposed_s_half(&mut self.stabilizer_x, &mut self.stabilizer_z, &mut self.stabilizer_signs, qubit);
    }

    /// Conjugates every tracked row by `H` on `qubit` (transposed layout).
    fn transposed_h(&mut self, qubit: usize) {
        transposed_h_half(&mut self.destabilizer_x, &mut self.destabilizer_z, &mut self.destabilizer_signs, qubit);
        transposed_h_half(&mut self.stabilizer_x, &mut self.stabilizer_z, &mut self.stabilizer_signs, qubit);
    }

    /// Conjugates every tracked row by `X` on `qubit` (transposed layout).
    fn transposed_x(&mut self, qubit: usize) {
        for (z_plane, signs) in [
            (&self.destabilizer_z, &mut self.destabilizer_signs),
            (&self.stabilizer_z, &mut self.stabilizer_signs),
        ] {
            for (sign_word, &z_word) in signs.words_mut().iter_mut().zip(z_plane.row_words(qubit)) {
                *sign_word ^= z_word;
            }
        }
    }
}

fn xor_words(target: &mut [BitWord], source: &[BitWord]) {
    for (target_word, source_word) in target.iter_mut().zip(source) {
        *target_word ^= *source_word;
    }
}

/// `CX` conjugation over one tableau half in the transposed layout: row `q`
/// of a plane holds that component for qubit `q` across all tracked rows.
fn transposed_cx_half(x_plane: &mut BitMatrix, z_plane: &mut BitMatrix, signs: &mut BitVec, control: usize, target: usize) {
    // sign ^= x_c & z_t & !(x_t ^ z_c), evaluated before the bit updates
    for (index, sign_word) in signs.words_mut().iter_mut().enumerate() {
        let x_control = x_plane.row_words(control)[index];
        let x_target = x_plane.row_words(target)[index];
        let z_control = z_plane.row_words(control)[index];
        let z_target = z_plane.row_words(target)[index];
        *sign_word ^= x_control & z_target & !(x_target ^ z_control);
    }
    x_plane.xor_row_into(control, target);
    z_plane.xor_row_into(target, control);
}

/// `S` conjugation over one half: `sign ^= x & z`, then `z ^= x`.
fn transposed_s_half(x_plane: &mut BitMatrix, z_plane: &mut BitMatrix, signs: &mut BitVec, qubit: usize) {
    for (index, sign_word) in signs.words_mut().iter_mut().enumerate() {
        *sign_word ^= x_plane.row_words(qubit)[index] & z_plane.row_words(qubit)[index];
    }
    for (z_word, &x_word) in z_plane.row_words_mut(qubit).iter_mut().zip(x_plane.row_words(qubit)) {
        *z_word ^= x_word;
    }
}

/// `H` conjugation over one half: `sign ^= x & z`, then swap x and z.
fn transposed_h_half(x_plane: &mut BitMatrix, z_plane: &mut BitMatrix, signs: &mut BitVec, qubit: usize) {
    for (index, sign_word) in signs.words_mut().iter_mut().enumerate() {
        *sign_word ^= x_plane.row_words(qubit)[index] & z_plane.row_words(qubit)[index];
    }
    x_plane.row_words_mut(qubit).swap_with_slice(z_plane.row_words_mut(qubit));
}
