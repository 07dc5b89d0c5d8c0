use crate::core::PauliMatrix;
use bitlane::word::BitWord;
use bitlane::BitVec;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// A signed Pauli product over a fixed number of qubits.
///
/// The tensor factors are packed into two parallel bit vectors: `xs[q]` and
/// `zs[q]` encode the factor on qubit `q` as `(0,0)=I`, `(1,0)=X`, `(0,1)=Z`,
/// `(1,1)=Y`. The global phase is restricted to `±1`; products that would
/// leave an `i` behind must have it folded by the caller (see
/// [`PauliString::mul_assign_right_with_phase`]).
#[must_use]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PauliString {
    sign: bool,
    xs: BitVec,
    zs: BitVec,
}

impl PauliString {
    #[must_use]
    pub fn identity(num_qubits: usize) -> PauliString {
        PauliString {
            sign: false,
            xs: BitVec::zeros(num_qubits),
            zs: BitVec::zeros(num_qubits),
        }
    }

    /// Wraps pre-packed component vectors, which must have equal lengths.
    #[must_use]
    pub fn from_bits(xs: BitVec, zs: BitVec, sign: bool) -> PauliString {
        assert_eq!(xs.bit_len(), zs.bit_len(), "mismatched component lengths");
        PauliString { sign, xs, zs }
    }

    /// Builds a string from a per-qubit pattern function.
    #[must_use]
    pub fn from_pattern(num_qubits: usize, sign: bool, pattern: impl Fn(usize) -> PauliMatrix) -> PauliString {
        let mut result = PauliString::identity(num_qubits);
        result.sign = sign;
        for qubit in 0..num_qubits {
            result.set(qubit, pattern(qubit));
        }
        result
    }

    #[must_use]
    pub fn x(qubit: usize, num_qubits: usize) -> PauliString {
        PauliString::from_pattern(num_qubits, false, |q| if q == qubit { PauliMatrix::X } else { PauliMatrix::I })
    }

    #[must_use]
    pub fn y(qubit: usize, num_qubits: usize) -> PauliString {
        PauliString::from_pattern(num_qubits, false, |q| if q == qubit { PauliMatrix::Y } else { PauliMatrix::I })
    }

    #[must_use]
    pub fn z(qubit: usize, num_qubits: usize) -> PauliString {
        PauliString::from_pattern(num_qubits, false, |q| if q == qubit { PauliMatrix::Z } else { PauliMatrix::I })
    }

    #[must_use]
    pub fn random(num_qubits: usize, rng: &mut impl Rng) -> PauliString {
        PauliString {
            sign: rng.gen(),
            xs: BitVec::random(num_qubits, rng),
            zs: BitVec::random(num_qubits, rng),
        }
    }

    #[must_use]
    pub fn num_qubits(&self) -> usize {
        self.xs.bit_len()
    }

    /// True for a negative global sign.
    #[must_use]
    pub fn sign(&self) -> bool {
        self.sign
    }

    pub fn set_sign(&mut self, sign: bool) {
        self.sign = sign;
    }

    pub fn negate(&mut self) {
        self.sign = !self.sign;
    }

    #[must_use]
    pub fn xs(&self) -> &BitVec {
        &self.xs
    }

    #[must_use]
    pub fn zs(&self) -> &BitVec {
        &self.zs
    }

    #[must_use]
    pub fn get(&self, qubit: usize) -> PauliMatrix {
        PauliMatrix::from_xz_bits(self.xs.index(qubit), self.zs.index(qubit))
    }

    pub fn set(&mut self, qubit: usize, pauli: PauliMatrix) {
        self.xs.assign_index(qubit, pauli.x_bit());
        self.zs.assign_index(qubit, pauli.z_bit());
    }

    /// Number of non-identity tensor factors.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.xs.or_weight(&self.zs)
    }

    /// True when every factor is the identity; the sign is not considered.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.xs.is_zero() && self.zs.is_zero()
    }

    #[must_use]
    pub fn commutes_with(&self, rhs: &PauliString) -> bool {
        commutes_with(self, rhs)
    }

    /// `self := self · rhs`, returning the phase exponent `t` of the scalar
    /// `i^t` the Pauli product accumulated (mod 4). The component vectors
    /// and the `±1` signs are combined; folding `i^t` is left to the caller
    /// because a lone product can legitimately end on `±i`.
    pub fn mul_assign_right_with_phase(&mut self, rhs: &PauliString) -> u8 {
        let exponent = product_phase_exponent(self.xs.words(), self.zs.words(), rhs.xs.words(), rhs.zs.words());
        self.xs.bitxor_assign(&rhs.xs);
        self.zs.bitxor_assign(&rhs.zs);
        self.sign ^= rhs.sign;
        exponent
    }

    /// `self := self · rhs` for products known to be real.
    ///
    /// # Panics
    ///
    /// Panics if the product leaves an `±i` scalar behind, which happens
    /// exactly when `self` and `rhs` anticommute.
    pub fn mul_assign_right(&mut self, rhs: &PauliString) {
        let exponent = self.mul_assign_right_with_phase(rhs);
        self.fold_phase_exponent(exponent);
    }

    /// Folds a scalar `i^exponent` into the sign.
    ///
    /// # Panics
    ///
    /// Panics when the exponent is odd, since the sign can only hold `±1`.
    pub fn fold_phase_exponent(&mut self, exponent: u8) {
        assert_eq!(exponent % 2, 0, "pauli product left an imaginary scalar (i^{exponent})");
        if exponent % 4 == 2 {
            self.sign = !self.sign;
        }
    }
}

/// Phase exponent `t` (mod 4) such that `left · right = i^t (left XOR right)`
/// as unsigned Pauli products, accumulated word by word.
#[must_use]
pub fn product_phase_exponent(
    left_x: &[BitWord],
    left_z: &[BitWord],
    right_x: &[BitWord],
    right_z: &[BitWord],
) -> u8 {
    let mut exponent = 0i64;
    for (((&lx, &lz), &rx), &rz) in left_x.iter().zip(left_z).zip(right_x).zip(right_z) {
        // X·Y, Y·Z and Z·X contribute +i; the reversed orders contribute -i.
        let plus = (lx & !lz & rx & rz) | (lx & lz & !rx & rz) | (!lx & lz & rx & !rz);
        let minus = (lx & lz & rx & !rz) | (!lx & lz & rx & rz) | (lx & !lz & !rx & rz);
        exponent += plus.weight() as i64 - minus.weight() as i64;
    }
    exponent.rem_euclid(4) as u8
}

/// Symplectic inner product test: true iff the operators anticommute.
#[must_use]
pub fn anti_commutes_with(left: &PauliString, right: &PauliString) -> bool {
    left.xs().dot(right.zs()) ^ left.zs().dot(right.xs())
}

#[must_use]
pub fn commutes_with(left: &PauliString, right: &PauliString) -> bool {
    !anti_commutes_with(left, right)
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.sign { "-" } else { "+" })?;
        for qubit in 0..self.num_qubits() {
            write!(f, "{}", self.get(qubit))?;
        }
        Ok(())
    }
}

impl fmt::Debug for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, PartialEq, Eq, Default)]
pub struct PauliStringParsingError;

impl fmt::Display for PauliStringParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected an optional +/- sign followed by letters from I, X, Y, Z")
    }
}

impl std::error::Error for PauliStringParsingError {}

impl FromStr for PauliString {
    type Err = PauliStringParsingError;

    fn from_str(text: &str) -> Result<PauliString, PauliStringParsingError> {
        let (sign, letters) = match text.strip_prefix(['+', '-']) {
            Some(rest) => (text.starts_with('-'), rest),
            None => (false, text),
        };
        let factors: Vec<PauliMatrix> = letters
            .chars()
            .map(PauliMatrix::from_letter)
            .collect::<Option<_>>()
            .ok_or(PauliStringParsingError)?;
        Ok(PauliString::from_pattern(factors.len(), sign, |q| factors[q]))
    }
}
