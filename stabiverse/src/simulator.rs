use crate::circuit::{
    Circuit, CircuitError, Operation, TARGET_INVERTED_MASK, TARGET_PAULI_X_MASK, TARGET_PAULI_Z_MASK,
    TARGET_QUBIT_MASK, TARGET_RECORD_MASK, TARGET_RECORD_SHIFT,
};
use crate::gates::{
    gate, GateFlags, GATE_CORRELATED_ERROR, GATE_DEPOLARIZE1, GATE_DEPOLARIZE2, GATE_DETECTOR,
    GATE_ELSE_CORRELATED_ERROR, GATE_M, GATE_MR, GATE_OBSERVABLE_INCLUDE, GATE_R, GATE_REPEAT, GATE_TICK,
    GATE_X_ERROR, GATE_Y_ERROR, GATE_Z_ERROR,
};
use pauliton::{Tableau, UnitaryOp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Precondition violations the driver rejects before touching the tableau.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Qubit {qubit} is out of range for a {num_qubits} qubit simulator.")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },
    #[error("Record lookback can't be 0 (unspecified).")]
    RecordLookbackUnspecified,
    #[error("Referred to a measurement result before the beginning of time.")]
    RecordBeforeBeginningOfTime,
    #[error("Only the control of a classically controlled gate may be a record target.")]
    RecordTargetIsNotAControl,
    #[error("Noise channel probability {0} is not in [0, 1].")]
    InvalidProbability(String),
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Applies circuit operations to a [`Tableau`], keeping the measurement
/// record and the per-qubit lookback history the record targets address.
#[must_use]
pub struct TableauSimulator<R: Rng = StdRng> {
    tableau: Tableau,
    rng: R,
    record: Vec<bool>,
    qubit_record_indices: Vec<Vec<usize>>,
    correlated_error_occurred: bool,
}

impl TableauSimulator<StdRng> {
    /// Seeded simulator for reproducible runs.
    pub fn with_seed(num_qubits: usize, seed: u64) -> TableauSimulator<StdRng> {
        TableauSimulator::new(num_qubits, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TableauSimulator<R> {
    pub fn new(num_qubits: usize, rng: R) -> TableauSimulator<R> {
        TableauSimulator {
            tableau: Tableau::identity(num_qubits),
            rng,
            record: Vec::new(),
            qubit_record_indices: vec![Vec::new(); num_qubits],
            correlated_error_occurred: false,
        }
    }

    #[must_use]
    pub fn num_qubits(&self) -> usize {
        self.tableau.num_qubits()
    }

    #[must_use]
    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// The measurement record, in the order results were produced.
    #[must_use]
    pub fn record(&self) -> &[bool] {
        &self.record
    }

    /// Whether measuring `qubit` now would have a certain outcome.
    pub fn is_deterministic(&self, qubit: usize) -> Result<bool, SimulationError> {
        self.check_qubit(qubit)?;
        Ok(self.tableau.is_deterministic(qubit))
    }

    /// The recorded result of `qubit`'s `lookback`-th most recent
    /// measurement, `1 <= lookback <= 15`.
    pub fn lookback(&self, qubit: usize, lookback: usize) -> Result<bool, SimulationError> {
        self.check_qubit(qubit)?;
        if lookback == 0 {
            return Err(SimulationError::RecordLookbackUnspecified);
        }
        let indices = &self.qubit_record_indices[qubit];
        if lookback > indices.len() {
            return Err(SimulationError::RecordBeforeBeginningOfTime);
        }
        Ok(self.record[indices[indices.len() - lookback]])
    }

    /// Runs every operation of the circuit in program order.
    pub fn run(&mut self, circuit: &Circuit) -> Result<(), SimulationError> {
        for operation in &circuit.operations {
            self.apply_operation(circuit, operation)?;
        }
        Ok(())
    }

    /// Applies one operation. Preconditions are checked for every target
    /// before any mutation, so a failing multi-target operation is a no-op.
    pub fn apply_operation(&mut self, circuit: &Circuit, operation: &Operation) -> Result<(), SimulationError> {
        let gate = gate(operation.gate);
        let targets = circuit.targets_of(operation);
        debug_assert_ne!(operation.gate, GATE_REPEAT, "REPEAT blocks are unrolled at parse time");

        if operation.gate == GATE_DETECTOR || operation.gate == GATE_OBSERVABLE_INCLUDE || operation.gate == GATE_TICK
        {
            return Ok(());
        }
        for &target in targets {
            self.check_qubit((target & TARGET_QUBIT_MASK) as usize)?;
        }

        if let Some(unitary) = gate.unitary {
            if gate.flags.contains(GateFlags::CAN_TARGET_MEASUREMENT_RECORD) {
                return self.apply_classically_controllable(unitary, targets);
            }
            if gate.flags.contains(GateFlags::TARGETS_PAIRS) {
                for pair in targets.chunks_exact(2) {
                    self.tableau
                        .apply(unitary, &[pair[0] as usize, pair[1] as usize]);
                }
            } else {
                for &target in targets {
                    self.tableau.apply(unitary, &[target as usize]);
                }
            }
            return Ok(());
        }

        match operation.gate {
            GATE_M => {
                for &target in targets {
                    self.measure_and_record(target);
                }
            }
            GATE_R => {
                for &target in targets {
                    self.tableau.reset_z(target as usize, &mut self.rng);
                }
            }
            GATE_MR => {
                for &target in targets {
                    let outcome = self.measure_and_record(target);
                    if outcome {
                        self.tableau.apply(UnitaryOp::X, &[(target & TARGET_QUBIT_MASK) as usize]);
                    }
                }
            }
            GATE_X_ERROR | GATE_Y_ERROR | GATE_Z_ERROR => {
                let probability = self.check_probability(operation.arg)?;
                let unitary = match operation.gate {
                    GATE_X_ERROR => UnitaryOp::X,
                    GATE_Y_ERROR => UnitaryOp::Y,
                    _ => UnitaryOp::Z,
                };
                for &target in targets {
                    if self.rng.gen_bool(probability) {
                        self.tableau.apply(unitary, &[target as usize]);
                    }
                }
            }
            GATE_DEPOLARIZE1 => {
                let probability = self.check_probability(operation.arg)?;
                for &target in targets {
                    if self.rng.gen_bool(probability) {
                        let choice = self.rng.gen_range(1u32..4);
                        self.apply_pauli_bits(target as usize, choice & 1 != 0, choice & 2 != 0);
                    }
                }
            }
            GATE_DEPOLARIZE2 => {
                let probability = self.check_probability(operation.arg)?;
                for pair in targets.chunks_exact(2) {
                    if self.rng.gen_bool(probability) {
                        let choice = self.rng.gen_range(1u32..16);
                        self.apply_pauli_bits(pair[0] as usize, choice & 1 != 0, choice & 2 != 0);
                        self.apply_pauli_bits(pair[1] as usize, choice & 4 != 0, choice & 8 != 0);
                    }
                }
            }
            GATE_CORRELATED_ERROR | GATE_ELSE_CORRELATED_ERROR => {
                let probability = self.check_probability(operation.arg)?;
                if operation.gate == GATE_CORRELATED_ERROR {
                    self.correlated_error_occurred = false;
                }
                if !self.correlated_error_occurred && self.rng.gen_bool(probability) {
                    self.correlated_error_occurred = true;
                    for &target in targets {
                        self.apply_pauli_bits(
                            (target & TARGET_QUBIT_MASK) as usize,
                            target & TARGET_PAULI_X_MASK != 0,
                            target & TARGET_PAULI_Z_MASK != 0,
                        );
                    }
                }
            }
            _ => unreachable!("gate {} has no driver interpretation", gate.name),
        }
        Ok(())
    }

    /// Parities of every DETECTOR and OBSERVABLE_INCLUDE annotation,
    /// folded over this simulator's record.
    pub fn detector_and_observable_parities(
        &self,
        circuit: &Circuit,
    ) -> Result<(Vec<bool>, Vec<bool>), SimulationError> {
        let (detectors, observables) = circuit.list_detectors_and_observables()?;
        let parity = |set: &crate::circuit::MeasurementSet| -> Result<bool, SimulationError> {
            let mut value = false;
            for &index in &set.indices {
                if index >= self.record.len() {
                    return Err(SimulationError::RecordBeforeBeginningOfTime);
                }
                value ^= self.record[index];
            }
            Ok(value)
        };
        Ok((
            detectors.iter().map(&parity).collect::<Result<_, _>>()?,
            observables.iter().map(&parity).collect::<Result<_, _>>()?,
        ))
    }

    fn check_qubit(&self, qubit: usize) -> Result<(), SimulationError> {
        if qubit >= self.num_qubits() {
            return Err(SimulationError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits(),
            });
        }
        Ok(())
    }

    fn check_probability(&self, arg: f64) -> Result<f64, SimulationError> {
        if (0.0..=1.0).contains(&arg) {
            Ok(arg)
        } else {
            Err(SimulationError::InvalidProbability(arg.to_string()))
        }
    }

    /// Classically controllable pairs: a record-target control applies the
    /// gate's target Pauli when the referenced recorded bit is set.
    fn apply_classically_controllable(&mut self, unitary: UnitaryOp, targets: &[u32]) -> Result<(), SimulationError> {
        // Validate every pair up front so the whole operation is atomic.
        for pair in targets.chunks_exact(2) {
            if pair[1] & TARGET_RECORD_MASK != 0 {
                return Err(SimulationError::RecordTargetIsNotAControl);
            }
            if pair[0] & TARGET_RECORD_MASK != 0 {
                let control = (pair[0] & TARGET_QUBIT_MASK) as usize;
                let lookback = ((pair[0] & TARGET_RECORD_MASK) >> TARGET_RECORD_SHIFT) as usize;
                self.lookback(control, lookback)?;
            }
        }
        for pair in targets.chunks_exact(2) {
            let target = (pair[1] & TARGET_QUBIT_MASK) as usize;
            if pair[0] & TARGET_RECORD_MASK != 0 {
                let control = (pair[0] & TARGET_QUBIT_MASK) as usize;
                let lookback = ((pair[0] & TARGET_RECORD_MASK) >> TARGET_RECORD_SHIFT) as usize;
                if self.lookback(control, lookback)? {
                    let pauli = match unitary {
                        UnitaryOp::ControlledX => UnitaryOp::X,
                        UnitaryOp::ControlledY => UnitaryOp::Y,
                        _ => UnitaryOp::Z,
                    };
                    self.tableau.apply(pauli, &[target]);
                }
            } else {
                self.tableau.apply(unitary, &[pair[0] as usize, target]);
            }
        }
        Ok(())
    }

    fn measure_and_record(&mut self, target: u32) -> bool {
        let qubit = (target & TARGET_QUBIT_MASK) as usize;
        let inverted = target & TARGET_INVERTED_MASK != 0;
        let outcome = self.tableau.measure_z(qubit, &mut self.rng);
        self.record.push(outcome ^ inverted);
        self.qubit_record_indices[qubit].push(self.record.len() - 1);
        outcome
    }

    fn apply_pauli_bits(&mut self, qubit: usize, x_bit: bool, z_bit: bool) {
        let unitary = match (x_bit, z_bit) {
            (true, false) => UnitaryOp::X,
            (true, true) => UnitaryOp::Y,
            (false, true) => UnitaryOp::Z,
            (false, false) => return,
        };
        self.tableau.apply(unitary, &[qubit]);
    }
}
