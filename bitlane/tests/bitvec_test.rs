use bitlane::BitVec;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arbitrary_bitvec(max_length: usize) -> impl Strategy<Value = BitVec> {
    prop::collection::vec(any::<bool>(), 0..max_length).prop_map(BitVec::from_iter)
}

fn equal_length_bitvecs(max_length: usize) -> impl Strategy<Value = (BitVec, BitVec)> {
    (0..max_length).prop_flat_map(|length| {
        (
            prop::collection::vec(any::<bool>(), length).prop_map(BitVec::from_iter),
            prop::collection::vec(any::<bool>(), length).prop_map(BitVec::from_iter),
        )
    })
}

proptest! {
    #[test]
    fn from_iter(bits in prop::collection::vec(any::<bool>(), 0..2000)) {
        let bitvec = BitVec::from_iter(bits.clone());
        prop_assert_eq!(bitvec.bit_len(), bits.len());
        for (index, expected) in bits.iter().enumerate() {
            prop_assert_eq!(bitvec.index(index), *expected);
        }
    }

    #[test]
    fn assign(bits in prop::collection::vec(any::<bool>(), 0..300)) {
        let mut bitvec = BitVec::of_length(bits.len());
        for (index, bit) in bits.iter().enumerate() {
            bitvec.assign_index(index, *bit);
        }
        let actual: Vec<bool> = (0..bits.len()).map(|index| bitvec.index(index)).collect();
        prop_assert_eq!(bits, actual);
    }

    #[test]
    fn weight(bits in arbitrary_bitvec(2000)) {
        let expected = (0..bits.bit_len()).filter(|&index| bits.index(index)).count();
        prop_assert_eq!(bits.weight(), expected);
    }

    #[test]
    fn support(bits in arbitrary_bitvec(2000)) {
        let support: Vec<usize> = bits.support().collect();
        prop_assert_eq!(support.len(), bits.weight());
        for index in support {
            prop_assert!(bits.index(index));
        }
    }

    #[test]
    fn bitxor_assign((left, right) in equal_length_bitvecs(2000)) {
        let mut xored = left.clone();
        xored.bitxor_assign(&right);
        for index in 0..left.bit_len() {
            prop_assert_eq!(xored.index(index), left.index(index) ^ right.index(index));
        }
        xored.bitxor_assign(&right);
        prop_assert_eq!(xored, left);
    }

    #[test]
    fn bitor_and_bitand((left, right) in equal_length_bitvecs(2000)) {
        let mut ored = left.clone();
        let mut anded = left.clone();
        ored.bitor_assign(&right);
        anded.bitand_assign(&right);
        for index in 0..left.bit_len() {
            prop_assert_eq!(ored.index(index), left.index(index) | right.index(index));
            prop_assert_eq!(anded.index(index), left.index(index) & right.index(index));
        }
    }

    #[test]
    fn dot_product((left, right) in equal_length_bitvecs(2000)) {
        let common_bits = (0..left.bit_len())
            .filter(|&index| left.index(index) && right.index(index))
            .count();
        prop_assert_eq!(left.dot(&right), common_bits % 2 == 1);
    }

    #[test]
    fn or_weight((left, right) in equal_length_bitvecs(2000)) {
        let expected = (0..left.bit_len())
            .filter(|&index| left.index(index) || right.index(index))
            .count();
        prop_assert_eq!(left.or_weight(&right), expected);
    }

    #[test]
    fn get_matches_index(bits in arbitrary_bitvec(500), probe in 0..1000usize) {
        match bits.get(probe) {
            Some(value) => prop_assert_eq!(value, bits.index(probe)),
            None => prop_assert!(probe >= bits.bit_len()),
        }
    }
}

#[test]
fn zeros_are_zero() {
    let bits = BitVec::zeros(700);
    assert_eq!(bits.bit_len(), 700);
    assert!(bits.is_zero());
    assert_eq!(bits.weight(), 0);
}

#[test]
fn random_fill_respects_length() {
    let mut rng = StdRng::seed_from_u64(7);
    let bits = BitVec::random(300, &mut rng);
    assert_eq!(bits.bit_len(), 300);
    // The padding of the last word must stay clear so equality and weight
    // stay word-granular.
    let mut copy = bits.clone();
    copy.clear();
    assert!(copy.is_zero());
}
