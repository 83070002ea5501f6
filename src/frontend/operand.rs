//! Operand parsers.
//!
//! Each operand slot is tried as an immediate, then a register, then a
//! direct (external variable) reference; the first shape that matches wins
//! and sets its bit in the accumulated [`OperandMode`].

use crate::bytecode::mode::OperandMode;
use crate::frontend::cursor::{
    Cursor, ScanError, consume_boolean, consume_identifier, consume_immediate_prefix,
    consume_number, consume_operand_separator, consume_register, consume_string,
    skip_whitespace,
};
use crate::lang::value::Value;
use thiserror::Error;

/// One parsed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `#true`, `#-1.5`, `#"text"`
    Immediate(Value),
    /// `$name`
    Register(String),
    /// Bare identifier: an external variable, or a label for jumps.
    Direct(String),
}

/// Operand slot within an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

/// Hard operand failure. A plain "no operand here" is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperandError {
    #[error("unable to parse immediate value: #{text}")]
    MalformedImmediate { text: String },

    #[error("expected an operand after `,`")]
    MissingOperand,
}

/// The operands of one instruction plus the mode bits they resolved to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperandSet {
    pub mode: OperandMode,
    pub first: Option<Operand>,
    pub second: Option<Operand>,
}

impl Operand {
    fn mode_bit(&self, slot: Slot) -> OperandMode {
        match (self, slot) {
            (Operand::Immediate(_), Slot::First) => OperandMode::IMM1,
            (Operand::Register(_), Slot::First) => OperandMode::REG1,
            (Operand::Direct(_), Slot::First) => OperandMode::DIR1,
            (Operand::Immediate(_), Slot::Second) => OperandMode::IMM2,
            (Operand::Register(_), Slot::Second) => OperandMode::REG2,
            (Operand::Direct(_), Slot::Second) => OperandMode::DIR2,
        }
    }
}

impl OperandSet {
    fn set(&mut self, slot: Slot, operand: Operand) {
        self.mode |= operand.mode_bit(slot);
        match slot {
            Slot::First => self.first = Some(operand),
            Slot::Second => self.second = Some(operand),
        }
    }
}

/// Parse the value that follows a `#`.
///
/// Anything after `#` that is not a boolean, number or closed string is a
/// hard failure rather than a fallthrough to the other operand shapes.
fn parse_immediate(cursor: Cursor<'_>) -> Result<Option<(Value, Cursor<'_>)>, OperandError> {
    let Ok(prefix) = consume_immediate_prefix(cursor) else {
        return Ok(None);
    };
    let body = prefix.rest;

    if let Ok(b) = consume_boolean(body) {
        return Ok(Some((Value::Boolean(b.value), b.rest)));
    }
    if let Ok(n) = consume_number(body) {
        return Ok(Some((Value::Number(n.value), n.rest)));
    }
    match consume_string(body) {
        Ok(s) => Ok(Some((Value::String(s.value.to_string()), s.rest))),
        Err(ScanError::UnterminatedString) => Err(OperandError::MalformedImmediate {
            text: body.remaining().to_string(),
        }),
        Err(_) => {
            let text = body
                .remaining()
                .split(|c: char| c.is_whitespace() || c == ',')
                .next()
                .unwrap_or_default();
            Err(OperandError::MalformedImmediate {
                text: text.to_string(),
            })
        }
    }
}

/// Try the three operand shapes in order on one slot.
pub fn parse_operand(cursor: Cursor<'_>) -> Result<Option<(Operand, Cursor<'_>)>, OperandError> {
    if let Some((value, rest)) = parse_immediate(cursor)? {
        return Ok(Some((Operand::Immediate(value), rest)));
    }
    if let Ok(reg) = consume_register(cursor) {
        return Ok(Some((Operand::Register(reg.value.to_string()), reg.rest)));
    }
    if let Ok(id) = consume_identifier(cursor) {
        return Ok(Some((Operand::Direct(id.value.to_string()), id.rest)));
    }
    Ok(None)
}

/// Parse `[operand1 [, operand2]]` starting right after the mnemonic.
///
/// Whitespace before the first operand must already be skipped. A missing
/// `,` simply ends the operand list; a `,` without a valid second operand
/// is an error.
pub fn parse_operands(cursor: Cursor<'_>) -> Result<(OperandSet, Cursor<'_>), OperandError> {
    let mut set = OperandSet::default();

    let Some((first, after_first)) = parse_operand(cursor)? else {
        return Ok((set, cursor));
    };
    set.set(Slot::First, first);

    let Ok(sep) = consume_operand_separator(skip_whitespace(after_first)) else {
        return Ok((set, after_first));
    };

    match parse_operand(skip_whitespace(sep.rest))? {
        Some((second, rest)) => {
            set.set(Slot::Second, second);
            Ok((set, rest))
        }
        None => Err(OperandError::MissingOperand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operands(text: &str) -> Result<(OperandSet, &str), OperandError> {
        parse_operands(Cursor::new(text)).map(|(set, rest)| (set, rest.remaining()))
    }

    #[test]
    fn test_no_operands() {
        let (set, rest) = operands("// only a comment").unwrap();
        assert!(set.mode.is_empty());
        assert_eq!(set.first, None);
        assert_eq!(rest, "// only a comment");
    }

    #[test]
    fn test_single_operand_shapes() {
        let (set, _) = operands("#2").unwrap();
        assert_eq!(set.mode, OperandMode::IMM1);
        assert_eq!(set.first, Some(Operand::Immediate(Value::Number(2.0))));

        let (set, _) = operands("$acc").unwrap();
        assert_eq!(set.mode, OperandMode::REG1);
        assert_eq!(set.first, Some(Operand::Register("acc".to_string())));

        let (set, rest) = operands("speed // c").unwrap();
        assert_eq!(set.mode, OperandMode::DIR1);
        assert_eq!(set.first, Some(Operand::Direct("speed".to_string())));
        assert_eq!(rest, " // c");
    }

    #[test]
    fn test_two_operands() {
        let (set, rest) = operands("$x , #\"a b\"").unwrap();
        assert_eq!(set.mode, OperandMode::REG1 | OperandMode::IMM2);
        assert_eq!(set.first, Some(Operand::Register("x".to_string())));
        assert_eq!(set.second, Some(Operand::Immediate(Value::from("a b"))));
        assert_eq!(rest, "");

        let (set, _) = operands("out,$y").unwrap();
        assert_eq!(set.mode, OperandMode::DIR1 | OperandMode::REG2);
    }

    #[test]
    fn test_boolean_immediates_case_insensitive() {
        let (set, _) = operands("#TRUE, #false").unwrap();
        assert_eq!(set.first, Some(Operand::Immediate(Value::Boolean(true))));
        assert_eq!(set.second, Some(Operand::Immediate(Value::Boolean(false))));
    }

    #[test]
    fn test_malformed_immediate_is_hard_error() {
        assert_eq!(
            operands("#abc"),
            Err(OperandError::MalformedImmediate {
                text: "abc".to_string()
            })
        );
        assert!(matches!(
            operands("$x, #\"open"),
            Err(OperandError::MalformedImmediate { .. })
        ));
    }

    #[test]
    fn test_doubled_prefix_is_not_an_operand() {
        let (set, rest) = operands("##1").unwrap();
        assert!(set.mode.is_empty());
        assert_eq!(rest, "##1");
    }

    #[test]
    fn test_separator_without_second_operand() {
        assert_eq!(operands("$x,"), Err(OperandError::MissingOperand));
        assert_eq!(operands("$x, ?"), Err(OperandError::MissingOperand));
    }

    #[test]
    fn test_missing_separator_ends_list() {
        let (set, rest) = operands("$x #1").unwrap();
        assert_eq!(set.mode, OperandMode::REG1);
        assert_eq!(rest, " #1");
    }
}
