use crate::bytecode::op::{JumpTarget, Op, Source, Target};
use crate::bytecode::CompiledStream;
use crate::lang::value::Value;
use crate::runtime::data_access::DataAccess;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::stack::{DataStack, RegisterBank};
use tracing::{debug, instrument, trace};

pub const STACK_CAPACITY_VAR: &str = "MICROSCRIPT_STACK_CAPACITY";
pub const MAX_STEPS_VAR: &str = "MICROSCRIPT_MAX_STEPS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Data stack size; pushing past it is a fault.
    pub stack_capacity: usize,
    /// Optional cap on executed instructions. `None` runs unbounded.
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: 100,
            max_steps: None,
        }
    }
}

impl VmConfig {
    /// Defaults overlaid with `MICROSCRIPT_STACK_CAPACITY` and
    /// `MICROSCRIPT_MAX_STEPS`. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = VmConfig::default();
        VmConfig {
            stack_capacity: lookup(STACK_CAPACITY_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.stack_capacity),
            max_steps: lookup(MAX_STEPS_VAR)
                .and_then(|v| v.trim().parse().ok())
                .or(defaults.max_steps),
        }
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    result: Option<Value>,
    error: Option<RuntimeError>,
    steps: usize,
}

impl RunResult {
    /// Whether exactly one value remained on the stack at halt.
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Number of instructions executed.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn into_result(self) -> Result<Option<Value>, RuntimeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.result),
        }
    }
}

/// Stack machine that runs a [`CompiledStream`].
///
/// The VM itself only holds configuration; stack, registers and the
/// instruction pointer are created fresh for every [`Vm::run`], so one VM
/// and one stream can serve any number of concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct Vm {
    config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Vm { config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    #[instrument(skip_all, name = "run", fields(ops = stream.len()))]
    pub fn run(&self, stream: &CompiledStream, data: &mut dyn DataAccess) -> RunResult {
        let mut machine = Machine::new(&self.config);

        let outcome = machine
            .exec(stream, data)
            .and_then(|()| machine.halt());

        let result = match outcome {
            Ok(result) => RunResult {
                result,
                error: None,
                steps: machine.steps,
            },
            Err(error) => RunResult {
                result: None,
                error: Some(error),
                steps: machine.steps,
            },
        };

        debug!(
            steps = result.steps,
            has_result = result.has_result(),
            ok = result.is_ok(),
            "halted"
        );
        result
    }
}

enum Flow {
    Next,
    Jump(usize),
}

/// Per-run state.
struct Machine {
    stack: DataStack,
    registers: RegisterBank,
    max_steps: Option<usize>,
    steps: usize,
}

impl Machine {
    fn new(config: &VmConfig) -> Self {
        Machine {
            stack: DataStack::with_capacity(config.stack_capacity),
            registers: RegisterBank::default(),
            max_steps: config.max_steps,
            steps: 0,
        }
    }

    /// Refuse to start another instruction once the limit is spent.
    fn check_limits(&self) -> Result<(), RuntimeError> {
        match self.max_steps {
            Some(max) if self.steps >= max => Err(RuntimeError::StepLimitExceeded(max)),
            _ => Ok(()),
        }
    }

    fn exec(&mut self, stream: &CompiledStream, data: &mut dyn DataAccess) -> Result<(), RuntimeError> {
        let ops = stream.ops();
        let mut ip: usize = 0;

        while ip < ops.len() {
            self.check_limits()?;

            let op = &ops[ip];
            trace!(ip, %op, depth = self.stack.len(), "step");
            self.steps += 1;

            let flow = self
                .step(op, data)
                .map_err(|e| e.with_context(ip, stream.line_of(ip).unwrap_or_default()))?;

            ip = match flow {
                Flow::Next => ip + 1,
                // A target one past the end halts normally.
                Flow::Jump(target) => target,
            };
        }
        Ok(())
    }

    /// Exactly one value left is the result; none is a clean halt.
    fn halt(&mut self) -> Result<Option<Value>, RuntimeError> {
        match self.stack.len() {
            0 => Ok(None),
            1 => self.stack.pop().map(Some),
            n => Err(RuntimeError::StackImbalance(n)),
        }
    }

    fn step(&mut self, op: &Op, data: &mut dyn DataAccess) -> Result<Flow, RuntimeError> {
        match op {
            // Data movement
            Op::Push(src) => {
                let value = self.read(src, data)?;
                self.stack.push(value)?;
            }
            Op::Pop(dst) => {
                let value = self.stack.pop()?;
                self.write(dst, value, data)?;
            }
            Op::Move { dst, src } => {
                let value = self.read(src, data)?;
                self.write(dst, value, data)?;
            }

            // Comparison
            Op::Compare { lhs, rhs } => {
                let a = self.read(lhs, data)?;
                let a = number("cmp", &a)?;
                let b = self.read(rhs, data)?;
                let b = number("cmp", &b)?;
                self.stack.push(Value::Number(a - b))?;
            }

            // Arithmetic
            Op::Add => self.binary("add", |a, b| a + b)?,
            Op::Sub => self.binary("sub", |a, b| a - b)?,
            Op::Mul => self.binary("mul", |a, b| a * b)?,
            // `div` computes `a - b`, not a quotient.
            Op::Div => self.binary("div", |a, b| a - b)?,
            Op::Negate => {
                let top = self.stack.top_mut()?;
                match top {
                    Value::Number(n) => *n = -*n,
                    other => return Err(RuntimeError::type_mismatch("neg", other)),
                }
            }
            Op::Increment(reg) => self.adjust_register("inc", reg, 1.0)?,
            Op::Decrement(reg) => self.adjust_register("dec", reg, -1.0)?,

            // Logic: both operands are always popped
            Op::And => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(if a.is_truthy() { b } else { a })?;
            }
            Op::Or => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(if a.is_truthy() { a } else { b })?;
            }

            // Control flow
            Op::Jump(target) => return Ok(Flow::Jump(position(target)?)),
            Op::JumpIfFalse(target) => {
                if !self.stack.pop()?.is_truthy() {
                    return Ok(Flow::Jump(position(target)?));
                }
            }
            Op::JumpIfTrue(target) => {
                if self.stack.pop()?.is_truthy() {
                    return Ok(Flow::Jump(position(target)?));
                }
            }

            Op::NoOp => {}
        }
        Ok(Flow::Next)
    }

    fn read(&self, src: &Source, data: &mut dyn DataAccess) -> Result<Value, RuntimeError> {
        match src {
            Source::Immediate(value) => Ok(value.clone()),
            Source::Register(name) => self.registers.get(name).cloned(),
            Source::Direct(name) => Ok(data.get_data(name)?),
        }
    }

    fn write(&mut self, dst: &Target, value: Value, data: &mut dyn DataAccess) -> Result<(), RuntimeError> {
        match dst {
            Target::Register(name) => {
                self.registers.set(name, value);
                Ok(())
            }
            Target::Direct(name) => Ok(data.set_data(name, value)?),
        }
    }

    /// ( a b -- f(a, b) ), numbers only.
    fn binary(&mut self, name: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let b = number(name, &b)?;
        let a = number(name, &a)?;
        self.stack.push(Value::Number(f(a, b)))
    }

    fn adjust_register(&mut self, name: &'static str, reg: &str, delta: f64) -> Result<(), RuntimeError> {
        let current = number(name, self.registers.get(reg)?)?;
        self.registers.set(reg, Value::Number(current + delta));
        Ok(())
    }
}

fn number(op: &'static str, value: &Value) -> Result<f64, RuntimeError> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::type_mismatch(op, value))
}

fn position(target: &JumpTarget) -> Result<usize, RuntimeError> {
    target
        .position
        .ok_or_else(|| RuntimeError::UnresolvedLabel(target.label.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile;
    use crate::runtime::data_access::{DataAccessError, MemoryData};

    fn run(text: &str) -> RunResult {
        let stream = compile(text).unwrap();
        Vm::new().run(&stream, &mut MemoryData::new())
    }

    fn value(text: &str) -> Value {
        run(text).into_result().unwrap().unwrap()
    }

    fn fault(text: &str) -> RuntimeError {
        run(text).error().unwrap().root().clone()
    }

    #[test]
    fn test_add() {
        assert_eq!(value("push #2\npush #3\nadd"), Value::Number(5.0));
    }

    #[test]
    fn test_operand_order() {
        assert_eq!(value("push #10\npush #4\nsub"), Value::Number(6.0));
        assert_eq!(value("push #1.5\npush #4\nmul"), Value::Number(6.0));
    }

    #[test]
    fn test_div_subtracts() {
        assert_eq!(value("push #10\npush #4\ndiv"), Value::Number(6.0));
    }

    #[test]
    fn test_negate_in_place() {
        assert_eq!(value("push #7\nneg"), Value::Number(-7.0));
        assert_eq!(
            fault("push #\"x\"\nneg"),
            RuntimeError::TypeMismatch {
                op: "neg",
                got: "string"
            }
        );
        assert_eq!(fault("neg"), RuntimeError::StackUnderflow);
    }

    #[test]
    fn test_registers_inc_dec() {
        assert_eq!(value("mov $x, #1\ninc $x\ninc $x\ndec $x\npush $x"), Value::Number(2.0));
        assert_eq!(fault("inc $nope"), RuntimeError::UnsetRegister("nope".to_string()));
        assert!(matches!(
            fault("mov $s, #true\ninc $s"),
            RuntimeError::TypeMismatch { op: "inc", .. }
        ));
    }

    #[test]
    fn test_push_unset_register() {
        let result = run("nop\npush $ghost");
        assert!(!result.has_result());
        match result.error() {
            Some(RuntimeError::At { ip, line, source }) => {
                assert_eq!((*ip, *line), (1, 2));
                assert_eq!(**source, RuntimeError::UnsetRegister("ghost".to_string()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_compare_pushes_difference() {
        assert_eq!(value("mov $a, #5\ncmp $a, #3"), Value::Number(2.0));
        assert_eq!(value("mov $a, #1\ncmp #3, $a"), Value::Number(2.0));
        assert!(matches!(
            fault("mov $a, #1\ncmp $a, #true"),
            RuntimeError::TypeMismatch { op: "cmp", .. }
        ));
    }

    #[test]
    fn test_logic_selection() {
        assert_eq!(value("push #0\npush #\"b\"\nor"), Value::from("b"));
        assert_eq!(value("push #\"a\"\npush #\"b\"\nor"), Value::from("a"));
        assert_eq!(value("push #true\npush #7\nand"), Value::Number(7.0));
        assert_eq!(value("push #\"\"\npush #7\nand"), Value::from(""));
    }

    #[test]
    fn test_conditional_jumps() {
        // je jumps when the popped value is falsy
        assert_eq!(
            value("push #0\nje skip\npush #1\njmp end\nskip: push #2\nend:"),
            Value::Number(2.0)
        );
        // jne jumps when the popped value is truthy
        assert_eq!(
            value("push #\"x\"\njne skip\npush #1\njmp end\nskip: push #2\nend:"),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_empty_program_and_zero_net_effect() {
        let result = run("");
        assert!(result.is_ok());
        assert!(!result.has_result());

        let result = run("push #1\npop $x");
        assert!(result.is_ok());
        assert!(!result.has_result());
    }

    #[test]
    fn test_stack_imbalance() {
        let result = run("push #1\npush #2");
        assert_eq!(result.error(), Some(&RuntimeError::StackImbalance(2)));
        assert!(result.error().unwrap().to_string().contains("2 items remain"));
        assert_eq!(result.result(), None);
    }

    #[test]
    fn test_stack_overflow() {
        let stream = compile("loop: push #1\njmp loop").unwrap();
        let vm = Vm::with_config(VmConfig {
            stack_capacity: 4,
            max_steps: None,
        });
        let result = vm.run(&stream, &mut MemoryData::new());
        assert_eq!(result.error().map(|e| e.root()), Some(&RuntimeError::StackOverflow(4)));
    }

    #[test]
    fn test_step_limit() {
        let stream = compile("loop: jmp loop").unwrap();
        let vm = Vm::with_config(VmConfig {
            stack_capacity: 100,
            max_steps: Some(50),
        });
        let result = vm.run(&stream, &mut MemoryData::new());
        assert_eq!(result.error(), Some(&RuntimeError::StepLimitExceeded(50)));
        assert_eq!(result.steps(), 50);
    }

    #[test]
    fn test_steps_count_executed_instructions() {
        let stream = compile("push #1
push #2
add").unwrap();
        assert_eq!(Vm::new().run(&stream, &mut MemoryData::new()).steps(), 3);

        // A limit equal to the program length is not exceeded.
        let vm = Vm::with_config(VmConfig {
            max_steps: Some(3),
            ..VmConfig::default()
        });
        let result = vm.run(&stream, &mut MemoryData::new());
        assert_eq!(result.into_result(), Ok(Some(Value::Number(3.0))));

        // A faulting instruction still counts as executed.
        let stream = compile("nop
add").unwrap();
        assert_eq!(Vm::new().run(&stream, &mut MemoryData::new()).steps(), 2);
    }

    #[test]
    fn test_external_data() {
        let stream = compile("push a\npush b\nadd\npop out").unwrap();
        let mut data = MemoryData::new().with("a", 2.0).with("b", 40.0);
        let result = Vm::new().run(&stream, &mut data);
        assert!(result.is_ok());
        assert_eq!(data.get("out"), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_missing_external_variable_surfaces_collaborator_error() {
        assert_eq!(
            fault("push missing"),
            RuntimeError::DataAccess(DataAccessError::UnknownVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_unresolved_label_in_decoded_stream() {
        let stream = compile("jmp end\nend:").unwrap();
        let mut bytes = stream.to_bytes().unwrap();
        // Re-encode with the resolved position stripped.
        let mut decoded = CompiledStream::from_bytes(&bytes).unwrap();
        for (op, _) in decoded.ops_mut() {
            if let Some(t) = op.jump_target_mut() {
                t.position = None;
            }
        }
        bytes = decoded.to_bytes().unwrap();
        let decoded = CompiledStream::from_bytes(&bytes).unwrap();
        assert_eq!(
            decoded.execute(&mut MemoryData::new()).error().map(|e| e.root()),
            Some(&RuntimeError::UnresolvedLabel("end".to_string()))
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let config = VmConfig::from_lookup(|key| match key {
            STACK_CAPACITY_VAR => Some("16".to_string()),
            MAX_STEPS_VAR => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(
            config,
            VmConfig {
                stack_capacity: 16,
                max_steps: None
            }
        );
        assert_eq!(VmConfig::from_lookup(|_| None), VmConfig::default());
    }
}
