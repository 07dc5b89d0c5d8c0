pub mod core;
pub use core::PauliMatrix;

pub mod operations;
pub use operations::UnitaryOp;

pub mod pauli;
pub use pauli::{anti_commutes_with, commutes_with, PauliString};

pub mod tableau;
pub use tableau::Tableau;

/// Tableau bit planes are padded to this alignment so they can be
/// transposed in place during measurement.
pub const TABLEAU_BIT_ALIGNMENT: usize = bitlane::BIT_LANE_ALIGNMENT;
