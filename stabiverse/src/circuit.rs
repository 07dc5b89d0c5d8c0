use crate::gates::{gate, gate_named, Gate, GateFlags, GateId, GATE_DETECTOR, GATE_OBSERVABLE_INCLUDE};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Low 24 bits of a target word: the qubit index.
pub const TARGET_QUBIT_MASK: u32 = 0x00FF_FFFF;
/// Pauli-X flag for `TARGETS_PAULI_STRING` gates; Y is `X | Z`.
pub const TARGET_PAULI_X_MASK: u32 = 1 << 24;
/// Pauli-Z flag for `TARGETS_PAULI_STRING` gates.
pub const TARGET_PAULI_Z_MASK: u32 = 1 << 25;
/// Shift of the 4-bit measurement-record lookback field.
pub const TARGET_RECORD_SHIFT: u32 = 28;
/// Mask of the lookback field; a nonzero value is a lookback in `1..=15`.
pub const TARGET_RECORD_MASK: u32 = 0xF000_0000;
/// Result-inversion flag for measurement targets.
pub const TARGET_INVERTED_MASK: u32 = 1 << 31;

/// A view into the owning circuit's target arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetSlice {
    pub offset: usize,
    pub length: usize,
}

/// One instruction: a gate, its parens argument and its targets. The
/// targets live in the circuit's arena; iterating them requires the
/// owning [`Circuit`] (see [`Circuit::targets_of`]).
#[derive(Clone, Copy, Debug)]
pub struct Operation {
    pub gate: GateId,
    pub arg: f64,
    pub targets: TargetSlice,
}

impl Operation {
    /// Two operations may merge iff they share gate and argument and the
    /// gate is fusable; the parser additionally guarantees arena adjacency.
    #[must_use]
    pub fn can_fuse(&self, other: &Operation) -> bool {
        self.gate == other.gate
            && self.arg == other.arg
            && !gate(self.gate).flags.contains(GateFlags::IS_NOT_FUSABLE)
    }
}

/// Errors rejected by the construction API before the circuit is mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError {
    #[error("Unknown gate name: '{0}'")]
    UnknownGateName(String),
    #[error("Two qubit gate {0} requires an even number of targets.")]
    OddNumberOfTargets(&'static str),
    #[error("Interacting a target with itself {qubit} using gate {gate}.")]
    SelfInteraction { gate: &'static str, qubit: u32 },
    #[error("Gate {0} doesn't take a parens arg.")]
    UnexpectedParensArgument(&'static str),
    #[error("Gate {0} requires a non-negative parens argument.")]
    NegativeParensArgument(&'static str),
    #[error("Target {qubit} has invalid flags {flags} for gate {gate}.")]
    InvalidTargetFlags { gate: &'static str, qubit: u32, flags: u32 },
    #[error("Record lookback can't be 0 (unspecified).")]
    RecordLookbackUnspecified,
    #[error("Referred to a measurement result before the beginning of time.")]
    RecordBeforeBeginningOfTime,
    #[error("Observable index must be an integer.")]
    NonIntegerObservableIndex,
    #[error("Block gate {0} can only be introduced through the parser.")]
    BlockGateNotAllowed(&'static str),
}

/// A parity of resolved absolute measurement indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeasurementSet {
    pub indices: Vec<usize>,
}

impl MeasurementSet {
    pub fn combine(&mut self, other: &MeasurementSet) {
        self.indices.extend_from_slice(&other.indices);
    }
}

/// A parsed circuit: a flat target arena plus an ordered operation list.
#[derive(Clone, Debug, Default)]
pub struct Circuit {
    pub(crate) target_arena: Vec<u32>,
    pub operations: Vec<Operation>,
    pub num_qubits: usize,
    pub num_measurements: usize,
}

impl Circuit {
    #[must_use]
    pub fn new() -> Circuit {
        Circuit::default()
    }

    /// Parses a complete circuit from text.
    pub fn from_text(text: &str) -> Result<Circuit, crate::parser::ParseError> {
        let mut circuit = Circuit::new();
        circuit.append_from_text(text)?;
        Ok(circuit)
    }

    /// Parses and appends; returns whether any operation was added. On
    /// error, operations appended before the fault remain.
    pub fn append_from_text(&mut self, text: &str) -> Result<bool, crate::parser::ParseError> {
        let before = self.operations.len();
        crate::parser::read_operations(self, text.bytes(), crate::parser::ReadCondition::UntilEndOfFile)?;
        Ok(self.operations.len() > before)
    }

    /// The target words of an operation that belongs to this circuit.
    #[must_use]
    pub fn targets_of(&self, operation: &Operation) -> &[u32] {
        &self.target_arena[operation.targets.offset..operation.targets.offset + operation.targets.length]
    }

    /// Validates and appends one operation built through the API.
    ///
    /// With `allow_fusing`, a compatible trailing operation is extended
    /// instead of appending a new one.
    pub fn append_op(
        &mut self,
        gate_name: &str,
        targets: &[u32],
        arg: f64,
        allow_fusing: bool,
    ) -> Result<(), CircuitError> {
        let gate = gate_named(gate_name).ok_or_else(|| CircuitError::UnknownGateName(gate_name.to_string()))?;

        if gate.flags.contains(GateFlags::IS_BLOCK) {
            return Err(CircuitError::BlockGateNotAllowed(gate.name));
        }
        if gate.flags.contains(GateFlags::TARGETS_PAIRS) {
            if targets.len() % 2 == 1 {
                return Err(CircuitError::OddNumberOfTargets(gate.name));
            }
            for pair in targets.chunks_exact(2) {
                if pair[0] == pair[1] {
                    return Err(CircuitError::SelfInteraction {
                        gate: gate.name,
                        qubit: pair[0] & TARGET_QUBIT_MASK,
                    });
                }
            }
        }
        if arg != 0.0 && !gate.flags.contains(GateFlags::TAKES_PARENS_ARGUMENT) {
            return Err(CircuitError::UnexpectedParensArgument(gate.name));
        }
        if gate.flags.contains(GateFlags::TAKES_PARENS_ARGUMENT) && !(arg >= 0.0) {
            return Err(CircuitError::NegativeParensArgument(gate.name));
        }

        let mut valid_target_mask = TARGET_QUBIT_MASK;
        if gate.flags.contains(GateFlags::PRODUCES_RESULTS) {
            valid_target_mask |= TARGET_INVERTED_MASK;
        }
        if gate.flags.contains(GateFlags::TARGETS_PAULI_STRING) {
            valid_target_mask |= TARGET_PAULI_X_MASK | TARGET_PAULI_Z_MASK;
        }
        if gate.flags.contains(GateFlags::ONLY_TARGETS_MEASUREMENT_RECORD)
            || gate.flags.contains(GateFlags::CAN_TARGET_MEASUREMENT_RECORD)
        {
            valid_target_mask |= TARGET_RECORD_MASK;
        }
        for &target in targets {
            if target != target & valid_target_mask {
                return Err(CircuitError::InvalidTargetFlags {
                    gate: gate.name,
                    qubit: target & TARGET_QUBIT_MASK,
                    flags: target & !TARGET_QUBIT_MASK,
                });
            }
        }

        let fuse_with_last = allow_fusing
            && !gate.flags.contains(GateFlags::IS_NOT_FUSABLE)
            && self
                .operations
                .last()
                .is_some_and(|last| last.gate == gate.id && last.arg == arg);
        if fuse_with_last {
            self.target_arena.extend_from_slice(targets);
            let last = self.operations.last_mut().expect("checked non-empty");
            last.targets.length += targets.len();
        } else {
            let slice = TargetSlice {
                offset: self.target_arena.len(),
                length: targets.len(),
            };
            self.target_arena.extend_from_slice(targets);
            self.operations.push(Operation {
                gate: gate.id,
                arg,
                targets: slice,
            });
        }
        if gate.flags.contains(GateFlags::PRODUCES_RESULTS) {
            self.num_measurements += targets.len();
        }
        for &target in targets {
            self.num_qubits = self.num_qubits.max((target & TARGET_QUBIT_MASK) as usize + 1);
        }
        Ok(())
    }

    /// Copies one operation from another circuit, rematerializing its
    /// targets in this circuit's arena.
    pub fn append_operation(&mut self, source: &Circuit, operation: &Operation) {
        let targets = source.targets_of(operation);
        let slice = TargetSlice {
            offset: self.target_arena.len(),
            length: targets.len(),
        };
        self.target_arena.extend_from_slice(targets);
        self.operations.push(Operation {
            gate: operation.gate,
            arg: operation.arg,
            targets: slice,
        });
        if gate(operation.gate).flags.contains(GateFlags::PRODUCES_RESULTS) {
            self.num_measurements += targets.len();
        }
        for &target in targets {
            self.num_qubits = self.num_qubits.max((target & TARGET_QUBIT_MASK) as usize + 1);
        }
    }

    /// Appends `repetitions` copies of another circuit.
    pub fn append_circuit(&mut self, other: &Circuit, repetitions: usize) {
        for _ in 0..repetitions {
            for index in 0..other.operations.len() {
                let operation = other.operations[index];
                self.append_operation(other, &operation);
            }
        }
    }

    /// Appends `repetitions` further copies of this circuit to itself, so
    /// `append_self(1)` doubles the operation list and `num_measurements`.
    pub fn append_self(&mut self, repetitions: usize) {
        if repetitions == 0 {
            return;
        }
        let original_length = self.operations.len();
        self.num_measurements *= repetitions + 1;
        for _ in 0..repetitions {
            // Copies alias the original arena slices.
            self.operations.extend_from_within(..original_length);
        }
    }

    pub fn clear(&mut self) {
        self.target_arena.clear();
        self.operations.clear();
        self.num_qubits = 0;
        self.num_measurements = 0;
    }

    /// Equality up to a tolerance on the parens arguments.
    #[must_use]
    pub fn approx_equals(&self, other: &Circuit, atol: f64) -> bool {
        if self.num_qubits != other.num_qubits
            || self.num_measurements != other.num_measurements
            || self.operations.len() != other.operations.len()
        {
            return false;
        }
        self.operations.iter().zip(other.operations.iter()).all(|(a, b)| {
            a.gate == b.gate
                && self.targets_of(a) == other.targets_of(b)
                && (a.arg - b.arg).abs() <= atol
        })
    }

    /// Resolves DETECTOR and OBSERVABLE_INCLUDE annotations into absolute
    /// measurement indices, in program order.
    pub fn list_detectors_and_observables(
        &self,
    ) -> Result<(Vec<MeasurementSet>, Vec<MeasurementSet>), CircuitError> {
        let mut qubit_measure_indices: HashMap<u32, Vec<usize>> = HashMap::new();
        let resolve = |qubit_measure_indices: &HashMap<u32, Vec<usize>>,
                       operation: &Operation|
         -> Result<MeasurementSet, CircuitError> {
            let mut result = MeasurementSet::default();
            for &target in self.targets_of(operation) {
                let qubit = target & TARGET_QUBIT_MASK;
                let lookback = ((target & TARGET_RECORD_MASK) >> TARGET_RECORD_SHIFT) as usize;
                if lookback == 0 {
                    return Err(CircuitError::RecordLookbackUnspecified);
                }
                let indices = qubit_measure_indices.get(&qubit).map_or(&[][..], Vec::as_slice);
                if lookback > indices.len() {
                    return Err(CircuitError::RecordBeforeBeginningOfTime);
                }
                result.indices.push(indices[indices.len() - lookback]);
            }
            Ok(result)
        };

        let mut next_index = 0;
        let mut detectors = Vec::new();
        let mut observables: Vec<MeasurementSet> = Vec::new();
        for operation in &self.operations {
            let flags = gate(operation.gate).flags;
            if flags.contains(GateFlags::PRODUCES_RESULTS) {
                for &target in self.targets_of(operation) {
                    qubit_measure_indices
                        .entry(target & TARGET_QUBIT_MASK)
                        .or_default()
                        .push(next_index);
                    next_index += 1;
                }
            } else if operation.gate == GATE_DETECTOR {
                detectors.push(resolve(&qubit_measure_indices, operation)?);
            } else if operation.gate == GATE_OBSERVABLE_INCLUDE {
                let observable = operation.arg as usize;
                if observable as f64 != operation.arg {
                    return Err(CircuitError::NonIntegerObservableIndex);
                }
                while observables.len() <= observable {
                    observables.push(MeasurementSet::default());
                }
                let resolved = resolve(&qubit_measure_indices, operation)?;
                observables[observable].combine(&resolved);
            }
        }
        Ok((detectors, observables))
    }

    fn write_operation(&self, f: &mut fmt::Formatter<'_>, operation: &Operation) -> fmt::Result {
        let gate: &Gate = gate(operation.gate);
        f.write_str(gate.name)?;
        if gate.flags.contains(GateFlags::TAKES_PARENS_ARGUMENT) {
            if operation.arg >= 0.0 && operation.arg == operation.arg.trunc() {
                write!(f, "({})", operation.arg as u64)?;
            } else {
                write!(f, "({})", operation.arg)?;
            }
        }
        for &target in self.targets_of(operation) {
            f.write_str(" ")?;
            if gate.flags.contains(GateFlags::PRODUCES_RESULTS) {
                if target & TARGET_INVERTED_MASK != 0 {
                    f.write_str("!")?;
                }
                write!(f, "{}", target & !TARGET_INVERTED_MASK)?;
            } else if gate.flags.contains(GateFlags::TARGETS_PAULI_STRING) {
                let x = usize::from(target & TARGET_PAULI_X_MASK != 0);
                let z = usize::from(target & TARGET_PAULI_Z_MASK != 0);
                write!(f, "{}", ['I', 'X', 'Z', 'Y'][x + 2 * z])?;
                write!(f, "{}", target & TARGET_QUBIT_MASK)?;
            } else {
                write!(f, "{}", target & TARGET_QUBIT_MASK)?;
                if target & TARGET_RECORD_MASK != 0 {
                    write!(f, "@-{}", (target & TARGET_RECORD_MASK) >> TARGET_RECORD_SHIFT)?;
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Circuit {
    fn eq(&self, other: &Circuit) -> bool {
        self.num_qubits == other.num_qubits
            && self.num_measurements == other.num_measurements
            && self.operations.len() == other.operations.len()
            && self.operations.iter().zip(other.operations.iter()).all(|(a, b)| {
                a.gate == b.gate && a.arg == b.arg && self.targets_of(a) == other.targets_of(b)
            })
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# Circuit [num_qubits={}, num_measurements={}]",
            self.num_qubits, self.num_measurements
        )?;
        for operation in &self.operations {
            writeln!(f)?;
            self.write_operation(f, operation)?;
        }
        Ok(())
    }
}

impl FromStr for Circuit {
    type Err = crate::parser::ParseError;

    fn from_str(text: &str) -> Result<Circuit, Self::Err> {
        Circuit::from_text(text)
    }
}
