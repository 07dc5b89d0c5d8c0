use crate::circuit::{
    Circuit, Operation, TargetSlice, TARGET_PAULI_X_MASK, TARGET_PAULI_Z_MASK, TARGET_RECORD_SHIFT,
    TARGET_INVERTED_MASK, TARGET_QUBIT_MASK,
};
use crate::gates::{Gate, GateFlags, GATE_REPEAT};
use thiserror::Error;

/// Errors raised by the streaming circuit parser. No recovery is
/// attempted; operations appended before the fault remain in the circuit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown gate name: '{0}'")]
    UnknownGateName(String),
    #[error("Gate {0}(X) missing a parens argument.")]
    MissingParensArgument(&'static str),
    #[error("Gate {0}(X) missing a closing parens for its argument.")]
    MissingClosingParens(&'static str),
    #[error("Not a non-negative real number: {0}")]
    NotANonNegativeReal(String),
    #[error("Expected a digit but got {0}")]
    ExpectedDigit(String),
    #[error("Number too large.")]
    NumberTooLarge,
    #[error("Gate targets must be separated by spacing.")]
    TargetsNotSeparated,
    #[error("Missing - after @ in record target (like '2@-3')")]
    MissingMinusAfterAt,
    #[error("Missing @ in record target (like '2@-3')")]
    MissingLookback,
    #[error("Minimum lookback in record target (like 2@-3) is -1, not -0.")]
    LookbackIsZero,
    #[error("Maximum lookback in record target (like 2@-3) is -15.")]
    LookbackTooLarge,
    #[error("Expected a Pauli (X or Y or Z) but got '{0}'")]
    ExpectedPauli(char),
    #[error("Unexpected space after Pauli before target qubit index.")]
    SpaceAfterPauli,
    #[error("Two qubit gate {0} applied to an odd number of targets.")]
    OddNumberOfTargets(&'static str),
    #[error("Interacting a target with itself {qubit} using gate {gate}.")]
    SelfInteraction { gate: &'static str, qubit: u32 },
    #[error("Missing '{{' at start of {0} block.")]
    MissingBlockOpen(&'static str),
    #[error("Unexpected '{{' after non-block command {0}.")]
    UnexpectedBlockOpen(&'static str),
    #[error("Unterminated block. Got a '{{' without an eventual '}}'.")]
    UnterminatedBlock,
    #[error("Uninitiated block. Got a '}}' without a '{{'.")]
    UninitiatedBlock,
    #[error("Invalid instruction. Expected one repetition arg like `REPEAT 100 {{`.")]
    InvalidRepeatHeader,
    #[error("Repeating 0 times is not supported.")]
    ZeroRepetitions,
}

/// How far [`read_operations`] consumes its character stream.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ReadCondition {
    UntilEndOfFile,
    UntilEndOfBlock,
}

/// Single-lookahead reader over a byte stream; `None` is end of input.
struct CharReader<I: Iterator<Item = u8>> {
    source: I,
    current: Option<u8>,
}

impl<I: Iterator<Item = u8>> CharReader<I> {
    fn new(mut source: I) -> CharReader<I> {
        let current = source.next();
        CharReader { source, current }
    }

    fn advance(&mut self) {
        self.current = self.source.next();
    }
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn is_double_char(c: u8) -> bool {
    c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-')
}

fn read_past_within_line_whitespace(reader: &mut CharReader<impl Iterator<Item = u8>>) {
    while matches!(reader.current, Some(b' ') | Some(b'\t')) {
        reader.advance();
    }
}

fn read_gate_name(reader: &mut CharReader<impl Iterator<Item = u8>>) -> Result<&'static Gate, ParseError> {
    let mut name = String::new();
    while let Some(c) = reader.current {
        if !is_name_char(c) || name.len() >= 32 {
            break;
        }
        name.push(char::from(c));
        reader.advance();
    }
    crate::gates::gate_named(&name).ok_or(ParseError::UnknownGateName(name))
}

fn read_non_negative_double(reader: &mut CharReader<impl Iterator<Item = u8>>) -> Result<f64, ParseError> {
    let mut text = String::new();
    while let Some(c) = reader.current {
        if !is_double_char(c) || text.len() >= 63 {
            break;
        }
        text.push(char::from(c));
        reader.advance();
    }
    match text.parse::<f64>() {
        Ok(value) if value >= 0.0 => Ok(value),
        _ => Err(ParseError::NotANonNegativeReal(text)),
    }
}

fn read_parens_argument(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    gate: &Gate,
) -> Result<f64, ParseError> {
    if reader.current != Some(b'(') {
        return Err(ParseError::MissingParensArgument(gate.name));
    }
    reader.advance();
    read_past_within_line_whitespace(reader);
    let result = read_non_negative_double(reader)?;
    read_past_within_line_whitespace(reader);
    if reader.current != Some(b')') {
        return Err(ParseError::MissingClosingParens(gate.name));
    }
    reader.advance();
    Ok(result)
}

fn read_uint24(reader: &mut CharReader<impl Iterator<Item = u8>>) -> Result<u32, ParseError> {
    match reader.current {
        Some(c) if c.is_ascii_digit() => {}
        Some(c) => return Err(ParseError::ExpectedDigit(format!("'{}'", char::from(c)))),
        None => return Err(ParseError::ExpectedDigit("end of input".to_string())),
    }
    let mut result: u32 = 0;
    while let Some(c) = reader.current {
        if !c.is_ascii_digit() {
            break;
        }
        result = result * 10 + u32::from(c - b'0');
        if result >= 1 << 24 {
            return Err(ParseError::NumberTooLarge);
        }
        reader.advance();
    }
    Ok(result)
}

/// Consumes the separator run after a target (spaces, tabs, a trailing
/// comment) and reports whether another in-line argument follows.
fn read_until_next_line_arg(reader: &mut CharReader<impl Iterator<Item = u8>>) -> Result<bool, ParseError> {
    if !matches!(reader.current, Some(b' ') | Some(b'#') | Some(b'\t') | Some(b'\n') | Some(b'{') | None) {
        return Err(ParseError::TargetsNotSeparated);
    }
    while matches!(reader.current, Some(b' ') | Some(b'\t')) {
        reader.advance();
    }
    if reader.current == Some(b'#') {
        while !matches!(reader.current, Some(b'\n') | None) {
            reader.advance();
        }
    }
    Ok(!matches!(reader.current, Some(b'\n') | Some(b'{') | None))
}

fn read_raw_qubit_targets_into(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    circuit: &mut Circuit,
) -> Result<(), ParseError> {
    while read_until_next_line_arg(reader)? {
        let qubit = read_uint24(reader)?;
        circuit.target_arena.push(qubit);
        circuit.num_qubits = circuit.num_qubits.max(qubit as usize + 1);
    }
    Ok(())
}

fn read_record_target_into(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    circuit: &mut Circuit,
    required: bool,
) -> Result<(), ParseError> {
    let qubit = read_uint24(reader)?;
    circuit.num_qubits = circuit.num_qubits.max(qubit as usize + 1);

    let mut lookback: u32 = 0;
    if reader.current == Some(b'@') {
        reader.advance();
        if reader.current != Some(b'-') {
            return Err(ParseError::MissingMinusAfterAt);
        }
        reader.advance();
        lookback = read_uint24(reader)?;
        if lookback == 0 {
            return Err(ParseError::LookbackIsZero);
        }
        if lookback >= 16 {
            return Err(ParseError::LookbackTooLarge);
        }
    } else if required {
        return Err(ParseError::MissingLookback);
    }
    circuit.target_arena.push(qubit | (lookback << TARGET_RECORD_SHIFT));
    Ok(())
}

fn read_record_targets_into(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    circuit: &mut Circuit,
    required: bool,
) -> Result<(), ParseError> {
    while read_until_next_line_arg(reader)? {
        read_record_target_into(reader, circuit, required)?;
    }
    Ok(())
}

fn read_pauli_targets_into(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    circuit: &mut Circuit,
) -> Result<(), ParseError> {
    while read_until_next_line_arg(reader)? {
        let mask = match reader.current {
            Some(b'X') | Some(b'x') => TARGET_PAULI_X_MASK,
            Some(b'Y') | Some(b'y') => TARGET_PAULI_X_MASK | TARGET_PAULI_Z_MASK,
            Some(b'Z') | Some(b'z') => TARGET_PAULI_Z_MASK,
            Some(c) => return Err(ParseError::ExpectedPauli(char::from(c))),
            None => return Err(ParseError::ExpectedPauli(' ')),
        };
        reader.advance();
        if reader.current == Some(b' ') {
            return Err(ParseError::SpaceAfterPauli);
        }
        let qubit = read_uint24(reader)?;
        circuit.target_arena.push(qubit | mask);
        circuit.num_qubits = circuit.num_qubits.max(qubit as usize + 1);
    }
    Ok(())
}

fn read_result_targets_into(
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    circuit: &mut Circuit,
) -> Result<(), ParseError> {
    while read_until_next_line_arg(reader)? {
        let inverted = reader.current == Some(b'!');
        if inverted {
            reader.advance();
        }
        let qubit = read_uint24(reader)?;
        circuit.num_qubits = circuit.num_qubits.max(qubit as usize + 1);
        circuit.target_arena.push(qubit | if inverted { TARGET_INVERTED_MASK } else { 0 });
        circuit.num_measurements += 1;
    }
    Ok(())
}

/// Consumes whitespace and comments between commands.
fn read_past_dead_space_between_commands(reader: &mut CharReader<impl Iterator<Item = u8>>) {
    loop {
        while matches!(reader.current, Some(c) if c.is_ascii_whitespace()) {
            reader.advance();
        }
        if reader.current != Some(b'#') {
            return;
        }
        while !matches!(reader.current, Some(b'\n') | None) {
            reader.advance();
        }
    }
}

/// Parses one command (gate header plus targets) and appends it.
fn read_single_operation(
    circuit: &mut Circuit,
    reader: &mut CharReader<impl Iterator<Item = u8>>,
) -> Result<(), ParseError> {
    let gate = read_gate_name(reader)?;
    let mut arg = 0.0;
    if gate.flags.contains(GateFlags::TAKES_PARENS_ARGUMENT) {
        read_past_within_line_whitespace(reader);
        arg = read_parens_argument(reader, gate)?;
    }
    let offset = circuit.target_arena.len();
    if !(gate.flags.contains(GateFlags::IS_BLOCK)
        || gate.flags.contains(GateFlags::ONLY_TARGETS_MEASUREMENT_RECORD)
        || gate.flags.contains(GateFlags::PRODUCES_RESULTS)
        || gate.flags.contains(GateFlags::TARGETS_PAULI_STRING)
        || gate.flags.contains(GateFlags::CAN_TARGET_MEASUREMENT_RECORD))
    {
        read_raw_qubit_targets_into(reader, circuit)?;
    } else if gate.flags.contains(GateFlags::ONLY_TARGETS_MEASUREMENT_RECORD) {
        read_record_targets_into(reader, circuit, true)?;
    } else if gate.flags.contains(GateFlags::CAN_TARGET_MEASUREMENT_RECORD) {
        read_record_targets_into(reader, circuit, false)?;
    } else if gate.flags.contains(GateFlags::PRODUCES_RESULTS) {
        read_result_targets_into(reader, circuit)?;
    } else if gate.flags.contains(GateFlags::TARGETS_PAULI_STRING) {
        read_pauli_targets_into(reader, circuit)?;
    } else {
        // Block headers read bare integers (the REPEAT count).
        while read_until_next_line_arg(reader)? {
            let value = read_uint24(reader)?;
            circuit.target_arena.push(value);
        }
    }
    if gate.flags.contains(GateFlags::IS_BLOCK) && reader.current != Some(b'{') {
        return Err(ParseError::MissingBlockOpen(gate.name));
    }
    if reader.current == Some(b'{') && !gate.flags.contains(GateFlags::IS_BLOCK) {
        return Err(ParseError::UnexpectedBlockOpen(gate.name));
    }

    let num_targets = circuit.target_arena.len() - offset;
    if gate.flags.contains(GateFlags::TARGETS_PAIRS) {
        if num_targets % 2 == 1 {
            return Err(ParseError::OddNumberOfTargets(gate.name));
        }
        for pair_start in (0..num_targets).step_by(2) {
            if circuit.target_arena[offset + pair_start] == circuit.target_arena[offset + pair_start + 1] {
                return Err(ParseError::SelfInteraction {
                    gate: gate.name,
                    qubit: circuit.target_arena[offset + pair_start] & TARGET_QUBIT_MASK,
                });
            }
        }
    }
    circuit.operations.push(Operation {
        gate: gate.id,
        arg,
        targets: TargetSlice {
            offset,
            length: num_targets,
        },
    });
    Ok(())
}

/// Parses commands until the read condition is met, fusing adjacent
/// compatible operations and unrolling `REPEAT` blocks as it goes.
pub(crate) fn read_operations(
    circuit: &mut Circuit,
    source: impl Iterator<Item = u8>,
    condition: ReadCondition,
) -> Result<(), ParseError> {
    let mut reader = CharReader::new(source);
    read_operations_with_reader(circuit, &mut reader, condition)
}

fn read_operations_with_reader(
    circuit: &mut Circuit,
    reader: &mut CharReader<impl Iterator<Item = u8>>,
    condition: ReadCondition,
) -> Result<(), ParseError> {
    let mut can_fuse = false;
    loop {
        read_past_dead_space_between_commands(reader);
        match reader.current {
            None => {
                if condition == ReadCondition::UntilEndOfBlock {
                    return Err(ParseError::UnterminatedBlock);
                }
                return Ok(());
            }
            Some(b'}') => {
                if condition != ReadCondition::UntilEndOfBlock {
                    return Err(ParseError::UninitiatedBlock);
                }
                reader.advance();
                return Ok(());
            }
            _ => {}
        }
        let new_index = circuit.operations.len();
        read_single_operation(circuit, reader)?;

        if circuit.operations[new_index].gate == GATE_REPEAT {
            if circuit.operations[new_index].targets.length != 1 {
                return Err(ParseError::InvalidRepeatHeader);
            }
            let rep_count = circuit.target_arena.pop().expect("repeat count was just pushed") as usize;
            circuit.operations.pop();
            if rep_count == 0 {
                return Err(ParseError::ZeroRepetitions);
            }
            reader.advance(); // step past '{'
            let body_start = circuit.operations.len();
            let measurements_before_body = circuit.num_measurements;
            read_operations_with_reader(circuit, reader, ReadCondition::UntilEndOfBlock)?;
            let body_end = circuit.operations.len();
            circuit.num_measurements +=
                (circuit.num_measurements - measurements_before_body) * (rep_count - 1);
            for _ in 1..rep_count {
                // Unrolled copies alias the body's arena slices.
                circuit.operations.extend_from_within(body_start..body_end);
            }
            can_fuse = false;
        } else if can_fuse && {
            let (previous, new) = (circuit.operations[new_index - 1], circuit.operations[new_index]);
            previous.can_fuse(&new)
        } {
            let added = circuit.operations[new_index].targets.length;
            circuit.operations[new_index - 1].targets.length += added;
            circuit.operations.pop();
        } else {
            can_fuse = true;
        }
    }
}
