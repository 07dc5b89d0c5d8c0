use derive_more::{Display, FromStr};

/// The closed set of Clifford generators the tableau applies natively.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Display, FromStr, PartialEq, Eq, Hash)]
pub enum UnitaryOp {
    I,
    X,
    Y,
    Z,
    Hadamard,
    SqrtX,
    SqrtXInv,
    SqrtY,
    SqrtYInv,
    SqrtZ,
    SqrtZInv,
    ControlledX,
    ControlledY,
    ControlledZ,
    Swap,
    ISwap,
    ISwapInv,
    XcX,
    XcY,
    XcZ,
    YcX,
    YcY,
    YcZ,
}

impl UnitaryOp {
    #[must_use]
    pub fn inverse(self) -> UnitaryOp {
        use UnitaryOp::*;
        match self {
            SqrtX => SqrtXInv,
            SqrtXInv => SqrtX,
            SqrtY => SqrtYInv,
            SqrtYInv => SqrtY,
            SqrtZ => SqrtZInv,
            SqrtZInv => SqrtZ,
            ISwap => ISwapInv,
            ISwapInv => ISwap,
            other => other,
        }
    }

    #[must_use]
    pub fn is_two_qubit(self) -> bool {
        use UnitaryOp::*;
        matches!(
            self,
            ControlledX | ControlledY | ControlledZ | Swap | ISwap | ISwapInv | XcX | XcY | XcZ | YcX | YcY | YcZ
        )
    }

    #[must_use]
    pub fn all() -> [UnitaryOp; 23] {
        use UnitaryOp::*;
        [
            I, X, Y, Z, Hadamard, SqrtX, SqrtXInv, SqrtY, SqrtYInv, SqrtZ, SqrtZInv, ControlledX, ControlledY,
            ControlledZ, Swap, ISwap, ISwapInv, XcX, XcY, XcZ, YcX, YcY, YcZ,
        ]
    }
}

#[macro_export]
macro_rules! assert_1q_gate {
    ($support: expr) => {
        debug_assert_eq!($support.len(), 1);
    };
}

#[macro_export]
macro_rules! assert_2q_gate {
    ($support: expr) => {
        debug_assert_eq!($support.len(), 2);
        debug_assert!($support[0] != $support[1]);
    };
}
