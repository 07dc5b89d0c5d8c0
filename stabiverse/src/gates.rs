use once_cell::sync::Lazy;
use pauliton::UnitaryOp;
use std::collections::HashMap;

/// Flag bits attached to every registered gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GateFlags(u16);

impl GateFlags {
    pub const NONE: GateFlags = GateFlags(0);
    /// Writes to the measurement record.
    pub const PRODUCES_RESULTS: GateFlags = GateFlags(1 << 0);
    /// A single non-negative real argument `(x)`.
    pub const TAKES_PARENS_ARGUMENT: GateFlags = GateFlags(1 << 1);
    /// Expects `{ ... }` after its header line.
    pub const IS_BLOCK: GateFlags = GateFlags(1 << 2);
    /// Target count must be even, pair members distinct.
    pub const TARGETS_PAIRS: GateFlags = GateFlags(1 << 3);
    /// Never merged with a neighboring copy.
    pub const IS_NOT_FUSABLE: GateFlags = GateFlags(1 << 4);
    /// Targets carry X/Z flags.
    pub const TARGETS_PAULI_STRING: GateFlags = GateFlags(1 << 5);
    /// Targets must all be record lookbacks.
    pub const ONLY_TARGETS_MEASUREMENT_RECORD: GateFlags = GateFlags(1 << 6);
    /// Targets may optionally be record lookbacks.
    pub const CAN_TARGET_MEASUREMENT_RECORD: GateFlags = GateFlags(1 << 7);

    #[must_use]
    pub const fn union(self, other: GateFlags) -> GateFlags {
        GateFlags(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: GateFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

pub type GateId = u16;

/// One registry entry. Clifford gates carry the tableau patch to dispatch
/// to as a [`UnitaryOp`]; collapsing, noise and annotation gates leave it
/// unset and are interpreted by the simulator driver.
#[derive(Debug)]
pub struct Gate {
    pub id: GateId,
    pub name: &'static str,
    pub flags: GateFlags,
    pub unitary: Option<UnitaryOp>,
}

const fn clifford(id: GateId, name: &'static str, flags: GateFlags, unitary: UnitaryOp) -> Gate {
    Gate {
        id,
        name,
        flags,
        unitary: Some(unitary),
    }
}

const fn plain(id: GateId, name: &'static str, flags: GateFlags) -> Gate {
    Gate {
        id,
        name,
        flags,
        unitary: None,
    }
}

const PAIRS: GateFlags = GateFlags::TARGETS_PAIRS;
const CONTROLLABLE: GateFlags = GateFlags::TARGETS_PAIRS.union(GateFlags::CAN_TARGET_MEASUREMENT_RECORD);
const NOISE_1Q: GateFlags = GateFlags::TAKES_PARENS_ARGUMENT;
const NOISE_PAULI: GateFlags = GateFlags::TAKES_PARENS_ARGUMENT
    .union(GateFlags::TARGETS_PAULI_STRING)
    .union(GateFlags::IS_NOT_FUSABLE);
const ANNOTATION: GateFlags = GateFlags::ONLY_TARGETS_MEASUREMENT_RECORD.union(GateFlags::IS_NOT_FUSABLE);

/// The static gate table; a gate's id is its index.
pub static GATES: &[Gate] = &[
    clifford(0, "I", GateFlags::NONE, UnitaryOp::I),
    clifford(1, "X", GateFlags::NONE, UnitaryOp::X),
    clifford(2, "Y", GateFlags::NONE, UnitaryOp::Y),
    clifford(3, "Z", GateFlags::NONE, UnitaryOp::Z),
    clifford(4, "H", GateFlags::NONE, UnitaryOp::Hadamard),
    clifford(5, "S", GateFlags::NONE, UnitaryOp::SqrtZ),
    clifford(6, "S_DAG", GateFlags::NONE, UnitaryOp::SqrtZInv),
    clifford(7, "SQRT_X", GateFlags::NONE, UnitaryOp::SqrtX),
    clifford(8, "SQRT_X_DAG", GateFlags::NONE, UnitaryOp::SqrtXInv),
    clifford(9, "SQRT_Y", GateFlags::NONE, UnitaryOp::SqrtY),
    clifford(10, "SQRT_Y_DAG", GateFlags::NONE, UnitaryOp::SqrtYInv),
    clifford(11, "CX", CONTROLLABLE, UnitaryOp::ControlledX),
    clifford(12, "CY", CONTROLLABLE, UnitaryOp::ControlledY),
    clifford(13, "CZ", CONTROLLABLE, UnitaryOp::ControlledZ),
    clifford(14, "SWAP", PAIRS, UnitaryOp::Swap),
    clifford(15, "ISWAP", PAIRS, UnitaryOp::ISwap),
    clifford(16, "ISWAP_DAG", PAIRS, UnitaryOp::ISwapInv),
    clifford(17, "XCX", PAIRS, UnitaryOp::XcX),
    clifford(18, "XCY", PAIRS, UnitaryOp::XcY),
    clifford(19, "XCZ", PAIRS, UnitaryOp::XcZ),
    clifford(20, "YCX", PAIRS, UnitaryOp::YcX),
    clifford(21, "YCY", PAIRS, UnitaryOp::YcY),
    clifford(22, "YCZ", PAIRS, UnitaryOp::YcZ),
    plain(23, "M", GateFlags::PRODUCES_RESULTS),
    plain(24, "R", GateFlags::NONE),
    plain(25, "MR", GateFlags::PRODUCES_RESULTS),
    plain(26, "X_ERROR", NOISE_1Q),
    plain(27, "Y_ERROR", NOISE_1Q),
    plain(28, "Z_ERROR", NOISE_1Q),
    plain(29, "DEPOLARIZE1", NOISE_1Q),
    plain(30, "DEPOLARIZE2", GateFlags::TAKES_PARENS_ARGUMENT.union(GateFlags::TARGETS_PAIRS)),
    plain(31, "CORRELATED_ERROR", NOISE_PAULI),
    plain(32, "ELSE_CORRELATED_ERROR", NOISE_PAULI),
    plain(33, "DETECTOR", ANNOTATION),
    plain(34, "OBSERVABLE_INCLUDE", ANNOTATION.union(GateFlags::TAKES_PARENS_ARGUMENT)),
    plain(35, "TICK", GateFlags::IS_NOT_FUSABLE),
    plain(36, "REPEAT", GateFlags::IS_BLOCK.union(GateFlags::IS_NOT_FUSABLE)),
];

pub const GATE_I: GateId = 0;
pub const GATE_M: GateId = 23;
pub const GATE_R: GateId = 24;
pub const GATE_MR: GateId = 25;
pub const GATE_X_ERROR: GateId = 26;
pub const GATE_Y_ERROR: GateId = 27;
pub const GATE_Z_ERROR: GateId = 28;
pub const GATE_DEPOLARIZE1: GateId = 29;
pub const GATE_DEPOLARIZE2: GateId = 30;
pub const GATE_CORRELATED_ERROR: GateId = 31;
pub const GATE_ELSE_CORRELATED_ERROR: GateId = 32;
pub const GATE_DETECTOR: GateId = 33;
pub const GATE_OBSERVABLE_INCLUDE: GateId = 34;
pub const GATE_TICK: GateId = 35;
pub const GATE_REPEAT: GateId = 36;

/// Alternate spellings accepted on lookup.
const ALIASES: &[(&str, &str)] = &[
    ("CNOT", "CX"),
    ("ZCX", "CX"),
    ("ZCY", "CY"),
    ("ZCZ", "CZ"),
    ("SQRT_Z", "S"),
    ("SQRT_Z_DAG", "S_DAG"),
    ("H_XZ", "H"),
    ("E", "CORRELATED_ERROR"),
];

static GATES_BY_NAME: Lazy<HashMap<&'static str, GateId>> = Lazy::new(|| {
    validate_registry();
    let mut by_name = HashMap::new();
    for gate in GATES {
        let previous = by_name.insert(gate.name, gate.id);
        assert!(previous.is_none(), "duplicate gate name {}", gate.name);
    }
    for (alias, canonical) in ALIASES {
        let id = by_name[canonical];
        let previous = by_name.insert(*alias, id);
        assert!(previous.is_none(), "duplicate gate name {alias}");
    }
    by_name
});

/// Checks the registry contract once, on first lookup.
fn validate_registry() {
    let dispatch_flags = [
        GateFlags::PRODUCES_RESULTS,
        GateFlags::ONLY_TARGETS_MEASUREMENT_RECORD,
        GateFlags::TARGETS_PAULI_STRING,
        GateFlags::CAN_TARGET_MEASUREMENT_RECORD,
    ];
    for (index, gate) in GATES.iter().enumerate() {
        assert_eq!(usize::from(gate.id), index, "gate id must equal its table index");
        assert!(!gate.name.is_empty() && gate.name.len() < 32);
        let category_count = dispatch_flags.iter().filter(|flag| gate.flags.contains(**flag)).count();
        assert!(category_count <= 1, "gate {} mixes target categories", gate.name);
        if gate.flags.contains(GateFlags::TAKES_PARENS_ARGUMENT) && gate.flags.contains(GateFlags::IS_BLOCK) {
            assert_eq!(gate.name, "REPEAT", "only REPEAT may combine a parens argument with a block");
        }
        if gate.flags.contains(GateFlags::IS_BLOCK) {
            assert!(gate.unitary.is_none());
        }
    }
}

#[must_use]
pub fn gate(id: GateId) -> &'static Gate {
    &GATES[usize::from(id)]
}

/// Case-insensitive name lookup; canonical names are upper-case.
#[must_use]
pub fn gate_named(name: &str) -> Option<&'static Gate> {
    let canonical = name.to_ascii_uppercase();
    GATES_BY_NAME.get(canonical.as_str()).map(|&id| gate(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_consistent() {
        // Force the lazy map, which runs validate_registry.
        assert!(gate_named("H").is_some());
    }

    #[test]
    fn aliases_resolve_to_canonical_gates() {
        assert_eq!(gate_named("CNOT").unwrap().id, gate_named("CX").unwrap().id);
        assert_eq!(gate_named("ZCZ").unwrap().id, gate_named("CZ").unwrap().id);
        assert_eq!(gate_named("SQRT_Z").unwrap().id, gate_named("S").unwrap().id);
        assert_eq!(gate_named("E").unwrap().id, GATE_CORRELATED_ERROR);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(gate_named("cnot").unwrap().id, gate_named("CNOT").unwrap().id);
        assert_eq!(gate_named("depolarize1").unwrap().id, GATE_DEPOLARIZE1);
        assert!(gate_named("NOT_A_GATE").is_none());
    }

    #[test]
    fn clifford_gates_carry_patches() {
        for gate in GATES {
            let is_annotation_or_collapse = gate.unitary.is_none();
            match gate.name {
                "M" | "R" | "MR" | "X_ERROR" | "Y_ERROR" | "Z_ERROR" | "DEPOLARIZE1" | "DEPOLARIZE2"
                | "CORRELATED_ERROR" | "ELSE_CORRELATED_ERROR" | "DETECTOR" | "OBSERVABLE_INCLUDE" | "TICK"
                | "REPEAT" => assert!(is_annotation_or_collapse, "{}", gate.name),
                _ => assert!(!is_annotation_or_collapse, "{}", gate.name),
            }
        }
    }
}
