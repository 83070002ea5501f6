use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::{
    bytecode::{
        CompiledStream,
        compile_error::CompileError,
        registry::{InstructionRegistry, LookupError},
    },
    frontend::{
        cursor::{
            Cursor, consume_comment, consume_label_decl, consume_mnemonic,
            consume_non_whitespace, skip_whitespace,
        },
        lines::{LineScanner, SourceLine},
        operand::{OperandError, parse_operands},
    },
};

/// Compile script text into a [`CompiledStream`].
pub fn compile(text: &str) -> Result<CompiledStream, CompileError> {
    Compiler::new().compile(text)
}

pub struct Compiler {
    registry: &'static InstructionRegistry,

    /// Output stream
    stream: CompiledStream,

    /// Label name -> index of the next instruction compiled after it
    labels: HashMap<String, usize>,

    /// Line each label was declared on, for duplicate reports
    label_lines: HashMap<String, usize>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_registry(InstructionRegistry::global())
    }

    pub fn with_registry(registry: &'static InstructionRegistry) -> Self {
        Self {
            registry,
            stream: CompiledStream::new(),
            labels: HashMap::new(),
            label_lines: HashMap::new(),
        }
    }

    /// Compile every line, then back-patch label references.
    ///
    /// Stops at the first fault; no partial stream is returned.
    #[instrument(skip_all, name = "compile")]
    pub fn compile(mut self, text: &str) -> Result<CompiledStream, CompileError> {
        for line in LineScanner::new(text) {
            self.compile_line(line)?;
        }

        self.resolve_labels()?;

        debug!(
            instructions = self.stream.len(),
            labels = self.labels.len(),
            "compiled"
        );
        Ok(self.stream)
    }

    /// `[label:] [mnemonic [op1 [, op2]]] [// comment]`
    fn compile_line(&mut self, line: SourceLine<'_>) -> Result<(), CompileError> {
        trace!(line = line.number, text = line.text, "compiling line");

        let cursor = skip_whitespace(Cursor::new(line.text));

        let cursor = match consume_label_decl(cursor) {
            Ok(label) => {
                self.declare_label(label.value, line.number)?;
                label.rest
            }
            Err(_) => cursor,
        };

        let cursor = skip_whitespace(cursor);
        match consume_mnemonic(cursor) {
            Ok(mnemonic) => self.compile_instruction(mnemonic.value, mnemonic.rest, line.number),
            Err(_) => expect_line_end(cursor, line.number),
        }
    }

    fn declare_label(&mut self, name: &str, line: usize) -> Result<(), CompileError> {
        if let Some(first) = self.label_lines.get(name) {
            debug!(label = name, first, line, "label redeclared");
            return Err(CompileError::DuplicateLabel {
                line,
                name: name.to_string(),
            });
        }

        let position = self.stream.len();
        debug!(label = name, position, "label declared");
        self.labels.insert(name.to_string(), position);
        self.label_lines.insert(name.to_string(), line);
        Ok(())
    }

    /// Parse the operands after `name`, check the rest of the line, then
    /// append the matching op to the stream.
    fn compile_instruction(
        &mut self,
        name: &str,
        cursor: Cursor<'_>,
        line: usize,
    ) -> Result<(), CompileError> {
        if self.registry.variants(name).is_empty() {
            return Err(CompileError::UnknownInstruction {
                line,
                mnemonic: name.to_string(),
            });
        }

        let (operands, rest) = parse_operands(skip_whitespace(cursor)).map_err(|e| match e {
            OperandError::MalformedImmediate { text } => {
                CompileError::MalformedImmediate { line, text }
            }
            OperandError::MissingOperand => CompileError::MissingOperand { line },
        })?;

        // Text the operand parsers could not take is reported as-is, before
        // the shape lookup can misdescribe it.
        expect_line_end(rest, line)?;

        let variant = self
            .registry
            .resolve(name, operands.mode)
            .map_err(|e| match e {
                LookupError::UnknownMnemonic => CompileError::UnknownInstruction {
                    line,
                    mnemonic: name.to_string(),
                },
                LookupError::UnsupportedMode => CompileError::UnsupportedOperands {
                    line,
                    mnemonic: name.to_string(),
                    mode: operands.mode,
                },
            })?;

        let op = variant.kind.instantiate(operands)?;
        trace!(index = self.stream.len(), %op, "instruction");
        self.stream.push(op, line);

        Ok(())
    }

    /// Rewrite every label reference into an absolute instruction index.
    fn resolve_labels(&mut self) -> Result<(), CompileError> {
        for (op, line) in self.stream.ops_mut() {
            let Some(target) = op.jump_target_mut() else {
                continue;
            };
            match self.labels.get(&target.label) {
                Some(&position) => {
                    debug!(label = %target.label, position, "label resolved");
                    target.position = Some(position);
                }
                None => {
                    return Err(CompileError::UndefinedLabel {
                        line,
                        name: target.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Only whitespace and an optional `//` comment may remain on the line.
fn expect_line_end(cursor: Cursor<'_>, line: usize) -> Result<(), CompileError> {
    let cursor = skip_whitespace(cursor);
    if consume_comment(cursor).is_ok() {
        return Ok(());
    }
    match consume_non_whitespace(cursor) {
        Ok(leftover) => Err(CompileError::Unrecognized {
            line,
            text: leftover.value.to_string(),
        }),
        Err(_) => Ok(()),
    }
}
