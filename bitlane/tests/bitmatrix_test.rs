use bitlane::BitMatrix;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arbitrary_bitmatrix(max_side: usize) -> impl Strategy<Value = BitMatrix> {
    (0..max_side, 0..max_side, any::<u64>()).prop_map(|(rows, columns, seed)| {
        let mut rng = StdRng::seed_from_u64(seed);
        BitMatrix::random(rows, columns, &mut rng)
    })
}

fn nonempty_bitmatrix(max_side: usize) -> impl Strategy<Value = BitMatrix> {
    (1..max_side, 1..max_side, any::<u64>()).prop_map(|(rows, columns, seed)| {
        let mut rng = StdRng::seed_from_u64(seed);
        BitMatrix::random(rows, columns, &mut rng)
    })
}

fn equal_shape_bitmatrices(max_side: usize) -> impl Strategy<Value = (BitMatrix, BitMatrix)> {
    (0..max_side, 0..max_side, any::<u64>(), any::<u64>()).prop_map(|(rows, columns, seed_a, seed_b)| {
        let mut rng_a = StdRng::seed_from_u64(seed_a);
        let mut rng_b = StdRng::seed_from_u64(seed_b);
        (
            BitMatrix::random(rows, columns, &mut rng_a),
            BitMatrix::random(rows, columns, &mut rng_b),
        )
    })
}

fn naive_transpose(matrix: &BitMatrix) -> BitMatrix {
    let mut out = BitMatrix::zeros(matrix.column_count(), matrix.row_count());
    for row in 0..matrix.row_count() {
        for column in 0..matrix.column_count() {
            out.set((column, row), matrix.get((row, column)));
        }
    }
    out
}

proptest! {
    #[test]
    fn shape(row_count in 0..400usize, column_count in 0..400usize) {
        let matrix = BitMatrix::with_shape(row_count, column_count);
        prop_assert_eq!(matrix.row_count(), row_count);
        prop_assert_eq!(matrix.column_count(), column_count);
        prop_assert_eq!(matrix.shape(), (row_count, column_count));
    }

    #[test]
    fn zeros(row_count in 0..100usize, column_count in 0..100usize) {
        let matrix = BitMatrix::zeros(row_count, column_count);
        for row in 0..row_count {
            for column in 0..column_count {
                prop_assert!(!matrix[(row, column)]);
            }
        }
    }

    #[test]
    fn indexing(matrix in arbitrary_bitmatrix(100)) {
        for row in 0..matrix.row_count() {
            for column in 0..matrix.column_count() {
                prop_assert_eq!(matrix[(row, column)], matrix[[row, column]]);
                prop_assert_eq!(matrix.get((row, column)), matrix[(row, column)]);
            }
        }
    }

    #[test]
    fn row_and_column_views(matrix in nonempty_bitmatrix(100)) {
        for row in 0..matrix.row_count() {
            let view = matrix.row(row);
            prop_assert_eq!(view.len(), matrix.column_count());
            for (column, bit) in view.iter().enumerate() {
                prop_assert_eq!(bit, matrix.get((row, column)));
            }
        }
        for column in 0..matrix.column_count() {
            let view = matrix.column(column);
            prop_assert_eq!(view.len(), matrix.row_count());
            for (row, bit) in view.iter().enumerate() {
                prop_assert_eq!(bit, matrix.get((row, column)));
            }
        }
    }

    #[test]
    fn swap_rows(matrix in nonempty_bitmatrix(60), raw in (0..60usize, 0..60usize)) {
        let rows = [raw.0 % matrix.row_count(), raw.1 % matrix.row_count()];
        let mut swapped = matrix.clone();
        swapped.swap_rows(rows[0], rows[1]);
        for column in 0..matrix.column_count() {
            prop_assert_eq!(matrix[(rows[0], column)], swapped[(rows[1], column)]);
            prop_assert_eq!(matrix[(rows[1], column)], swapped[(rows[0], column)]);
        }
    }

    #[test]
    fn xor_row_into(matrix in nonempty_bitmatrix(60), raw in (0..60usize, 0..60usize)) {
        let source = raw.0 % matrix.row_count();
        let target = raw.1 % matrix.row_count();
        prop_assume!(source != target);
        let mut updated = matrix.clone();
        updated.xor_row_into(source, target);
        for column in 0..matrix.column_count() {
            prop_assert_eq!(updated[(target, column)], matrix[(target, column)] ^ matrix[(source, column)]);
            prop_assert_eq!(updated[(source, column)], matrix[(source, column)]);
        }
    }

    #[test]
    fn pointwise_ops((left, right) in equal_shape_bitmatrices(80)) {
        let mut xor = left.clone();
        let mut or = left.clone();
        let mut and = left.clone();
        xor.bitxor_assign(&right);
        or.bitor_assign(&right);
        and.bitand_assign(&right);
        for row in 0..left.row_count() {
            for column in 0..left.column_count() {
                let index = (row, column);
                prop_assert_eq!(xor[index], left[index] ^ right[index]);
                prop_assert_eq!(or[index], left[index] | right[index]);
                prop_assert_eq!(and[index], left[index] & right[index]);
            }
        }
        xor.bitxor_assign(&right);
        prop_assert_eq!(xor, left);
    }

    #[test]
    fn rectangular_transpose_matches_naive(matrix in arbitrary_bitmatrix(300)) {
        prop_assert_eq!(matrix.transposed(), naive_transpose(&matrix));
    }

    #[test]
    fn transpose_is_an_involution(matrix in arbitrary_bitmatrix(300)) {
        prop_assert_eq!(matrix.transposed().transposed(), matrix);
    }

    #[test]
    fn row_to_bitvec_round_trips(matrix in nonempty_bitmatrix(100), raw_row in 0..100usize) {
        let row = raw_row % matrix.row_count();
        let bits = matrix.row_to_bitvec(row);
        prop_assert_eq!(bits.bit_len(), matrix.column_count());
        for column in 0..matrix.column_count() {
            prop_assert_eq!(bits.index(column), matrix.get((row, column)));
        }
        let mut copy = BitMatrix::zeros(matrix.row_count(), matrix.column_count());
        copy.assign_row_from_bitvec(row, &bits);
        for column in 0..matrix.column_count() {
            prop_assert_eq!(copy.get((row, column)), matrix.get((row, column)));
        }
    }
}

#[test]
fn square_transpose_in_place_matches_naive() {
    let mut rng = StdRng::seed_from_u64(41);
    for side in [256usize, 512] {
        let matrix = BitMatrix::random(side, side, &mut rng);
        let mut transposed = matrix.clone();
        transposed.transpose_in_place();
        assert_eq!(transposed, naive_transpose(&matrix), "side={side}");
        transposed.transpose_in_place();
        assert_eq!(transposed, matrix, "side={side}");
    }
}

#[test]
fn transpose_into_rectangular() {
    let mut rng = StdRng::seed_from_u64(42);
    for (rows, columns) in [(1usize, 700usize), (300, 17), (256, 512), (513, 255)] {
        let matrix = BitMatrix::random(rows, columns, &mut rng);
        let mut out = BitMatrix::zeros(columns, rows);
        matrix.transpose_into(&mut out);
        assert_eq!(out, naive_transpose(&matrix), "{rows}x{columns}");
    }
}

#[test]
#[should_panic(expected = "square")]
fn in_place_transpose_rejects_rectangles() {
    let mut matrix = BitMatrix::zeros(256, 512);
    matrix.transpose_in_place();
}

#[test]
#[should_panic(expected = "multiple")]
fn in_place_transpose_rejects_unaligned_sides() {
    let mut matrix = BitMatrix::zeros(100, 100);
    matrix.transpose_in_place();
}
