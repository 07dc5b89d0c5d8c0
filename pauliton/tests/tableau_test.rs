use pauliton::{Tableau, UnitaryOp};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn single_qubit_ops() -> [UnitaryOp; 11] {
    use UnitaryOp::*;
    [I, X, Y, Z, Hadamard, SqrtX, SqrtXInv, SqrtY, SqrtYInv, SqrtZ, SqrtZInv]
}

fn two_qubit_ops() -> [UnitaryOp; 12] {
    use UnitaryOp::*;
    [ControlledX, ControlledY, ControlledZ, Swap, ISwap, ISwapInv, XcX, XcY, XcZ, YcX, YcY, YcZ]
}

/// A random sequence of gate applications on `num_qubits` qubits.
fn random_gate_sequence(num_qubits: usize, length: usize, rng: &mut impl Rng) -> Vec<(UnitaryOp, Vec<usize>)> {
    let mut sequence = Vec::with_capacity(length);
    for _ in 0..length {
        if num_qubits >= 2 && rng.gen_bool(0.5) {
            let op = two_qubit_ops()[rng.gen_range(0..12)];
            let first = rng.gen_range(0..num_qubits);
            let mut second = rng.gen_range(0..num_qubits);
            while second == first {
                second = rng.gen_range(0..num_qubits);
            }
            sequence.push((op, vec![first, second]));
        } else {
            let op = single_qubit_ops()[rng.gen_range(0..11)];
            sequence.push((op, vec![rng.gen_range(0..num_qubits)]));
        }
    }
    sequence
}

#[test]
fn identity_tableau_tracks_generators() {
    let tableau = Tableau::identity(4);
    assert!(tableau.is_valid());
    assert_eq!(tableau.x_image(2).to_string(), "+IIXI");
    assert_eq!(tableau.z_image(0).to_string(), "+ZIII");
}

#[test]
fn single_qubit_gate_images() {
    use UnitaryOp::*;
    // (gate, image of X, image of Z) after application to a fresh tableau.
    let expectations = [
        (I, "+X", "+Z"),
        (X, "+X", "-Z"),
        (Y, "-X", "-Z"),
        (Z, "-X", "+Z"),
        (Hadamard, "+Z", "+X"),
        (SqrtZ, "-Y", "+Z"),
        (SqrtZInv, "+Y", "+Z"),
        (SqrtX, "+X", "+Y"),
        (SqrtXInv, "+X", "-Y"),
        (SqrtY, "+Z", "-X"),
        (SqrtYInv, "-Z", "+X"),
    ];
    for (op, x_expected, z_expected) in expectations {
        let mut tableau = Tableau::identity(1);
        tableau.apply(op, &[0]);
        assert_eq!(tableau.x_image(0).to_string(), x_expected, "{op:?}");
        assert_eq!(tableau.z_image(0).to_string(), z_expected, "{op:?}");
        assert!(tableau.is_valid(), "{op:?}");
    }
}

#[test]
fn two_qubit_gate_images() {
    use UnitaryOp::*;
    // (gate, images of X0, X1, Z0, Z1) after application to a fresh tableau.
    let expectations = [
        (ControlledX, "+XX", "+IX", "+ZI", "+ZZ"),
        (ControlledY, "+XY", "+ZX", "+ZI", "+ZZ"),
        (ControlledZ, "+XZ", "+ZX", "+ZI", "+IZ"),
        (Swap, "+IX", "+XI", "+IZ", "+ZI"),
        (ISwap, "-ZY", "-YZ", "+IZ", "+ZI"),
        (ISwapInv, "+ZY", "+YZ", "+IZ", "+ZI"),
        (XcX, "+XI", "+IX", "+ZX", "+XZ"),
        (XcZ, "+XI", "+XX", "+ZZ", "+IZ"),
        (YcX, "+XX", "+IX", "+ZX", "+YZ"),
        (YcY, "+XY", "+YX", "+ZY", "+YZ"),
    ];
    for (op, x0, x1, z0, z1) in expectations {
        let mut tableau = Tableau::identity(2);
        tableau.apply(op, &[0, 1]);
        assert_eq!(tableau.x_image(0).to_string(), x0, "{op:?}");
        assert_eq!(tableau.x_image(1).to_string(), x1, "{op:?}");
        assert_eq!(tableau.z_image(0).to_string(), z0, "{op:?}");
        assert_eq!(tableau.z_image(1).to_string(), z1, "{op:?}");
        assert!(tableau.is_valid(), "{op:?}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_circuits_preserve_the_invariant(seed in any::<u64>(), num_qubits in 1usize..8, length in 0usize..40) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tableau = Tableau::identity(num_qubits);
        for (op, support) in random_gate_sequence(num_qubits, length, &mut rng) {
            tableau.apply(op, &support);
        }
        prop_assert!(tableau.is_valid());
    }

    #[test]
    fn inverse_gates_restore_the_tableau(seed in any::<u64>(), num_qubits in 1usize..8, length in 0usize..30) {
        let mut rng = StdRng::seed_from_u64(seed);
        let sequence = random_gate_sequence(num_qubits, length, &mut rng);
        let mut tableau = Tableau::identity(num_qubits);
        for (op, support) in &sequence {
            tableau.apply(*op, support);
        }
        for (op, support) in sequence.iter().rev() {
            tableau.apply(op.inverse(), support);
        }
        prop_assert_eq!(tableau, Tableau::identity(num_qubits));
    }

    #[test]
    fn measurement_collapse_is_sticky(seed in any::<u64>(), num_qubits in 1usize..7, length in 0usize..25) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tableau = Tableau::identity(num_qubits);
        for (op, support) in random_gate_sequence(num_qubits, length, &mut rng) {
            tableau.apply(op, &support);
        }
        let qubit = rng.gen_range(0..num_qubits);
        let first = tableau.measure_z(qubit, &mut rng);
        prop_assert!(tableau.is_valid());
        prop_assert!(tableau.is_deterministic(qubit));
        let second = tableau.measure_z(qubit, &mut rng);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn determinism_predicts_outcome_spread(seed in any::<u64>(), num_qubits in 1usize..6, length in 0usize..20) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tableau = Tableau::identity(num_qubits);
        for (op, support) in random_gate_sequence(num_qubits, length, &mut rng) {
            tableau.apply(op, &support);
        }
        let qubit = rng.gen_range(0..num_qubits);
        let mut seen = [false, false];
        for trial in 0..64u64 {
            let mut trial_rng = StdRng::seed_from_u64(seed ^ (trial << 32) ^ 0x9e37);
            let outcome = tableau.clone().measure_z(qubit, &mut trial_rng);
            seen[usize::from(outcome)] = true;
        }
        if tableau.is_deterministic(qubit) {
            prop_assert!(!(seen[0] && seen[1]));
        } else {
            // 64 fair coin flips landing on one side has probability 2^-63.
            prop_assert!(seen[0] && seen[1]);
        }
    }
}

#[test]
fn fresh_qubit_measures_zero_deterministically() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut tableau = Tableau::identity(3);
    assert!(tableau.is_deterministic(1));
    assert!(!tableau.measure_z(1, &mut rng));
}

#[test]
fn hadamard_makes_measurement_random() {
    let mut tableau = Tableau::identity(1);
    tableau.apply(UnitaryOp::Hadamard, &[0]);
    assert!(!tableau.is_deterministic(0));
    let mut zeros = 0;
    let mut ones = 0;
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        if tableau.clone().measure_z(0, &mut rng) {
            ones += 1;
        } else {
            zeros += 1;
        }
    }
    assert!(zeros > 50 && ones > 50, "outcomes should be near 50/50, got {zeros}/{ones}");
}

#[test]
fn bell_pair_measurements_correlate() {
    for seed in 0..40 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tableau = Tableau::identity(2);
        tableau.apply(UnitaryOp::Hadamard, &[0]);
        tableau.apply(UnitaryOp::ControlledX, &[0, 1]);
        assert!(!tableau.is_deterministic(0));
        let first = tableau.measure_z(0, &mut rng);
        assert!(tableau.is_deterministic(1));
        let second = tableau.measure_z(1, &mut rng);
        assert_eq!(first, second);
    }
}

#[test]
fn reset_forces_zero() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tableau = Tableau::identity(2);
        tableau.apply(UnitaryOp::Hadamard, &[0]);
        tableau.apply(UnitaryOp::ControlledX, &[0, 1]);
        tableau.reset_z(0, &mut rng);
        assert!(tableau.is_deterministic(0));
        assert!(!tableau.measure_z(0, &mut rng));
    }
}

#[test]
fn x_flips_the_measured_value() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut tableau = Tableau::identity(1);
    tableau.apply(UnitaryOp::X, &[0]);
    assert!(tableau.is_deterministic(0));
    assert!(tableau.measure_z(0, &mut rng));
}

#[test]
fn gates_work_across_the_word_boundary() {
    // Qubits past index 256 exercise the second storage word of each row.
    let mut rng = StdRng::seed_from_u64(5);
    let mut tableau = Tableau::identity(300);
    tableau.apply(UnitaryOp::Hadamard, &[290]);
    tableau.apply(UnitaryOp::ControlledX, &[290, 7]);
    let first = tableau.measure_z(290, &mut rng);
    assert!(tableau.is_deterministic(7));
    assert_eq!(tableau.measure_z(7, &mut rng), first);
    assert!(tableau.is_valid());
}
