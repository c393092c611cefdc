//! The interpreter: a value stack, a stack of environment frames, and a call
//! stack of return records.

mod ops;
mod stacks;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::isa::{Instruction, SymbolId};
use crate::program::Program;
use crate::value::{Closure, Interner, Symbol, Value, Variable};
use ops::Arith;
use stacks::BoundedStack;

pub use stacks::{Limits, StackKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown variable '{name}'")]
    UnboundVariable { name: String },
    #[error("read access to unassigned variable '{name}'")]
    UnassignedVariable { name: String },
    #[error("{function}: invalid parameter count (expected {expected}, got {actual})")]
    ArityMismatch { function: String, expected: u32, actual: u32 },
    #[error("{function}: invalid parameter count (expected at least {minimum}, got {actual})")]
    TooFewArguments { function: String, minimum: u32, actual: u32 },
    #[error("invalid call target: {found}")]
    InvalidCallTarget { found: &'static str },
    #[error("jump into the middle of a statement at 0x{ip:04x}")]
    InvalidPosition { ip: usize },
    #[error("instruction pointer 0x{ip:04x} is outside the program")]
    IpOutOfRange { ip: usize },
    #[error("{instruction}: expected {expected}, found {found}")]
    TypeMismatch { instruction: &'static str, expected: &'static str, found: &'static str },
    #[error("{stack} stack overflow")]
    StackOverflow { stack: StackKind },
    #[error("{stack} stack underflow")]
    StackUnderflow { stack: StackKind },
    #[error("program ended with unbalanced stacks: {reason}")]
    UnbalancedExit { reason: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{instruction}: index {index} out of range for length {len}")]
    IndexOutOfRange { instruction: &'static str, index: i32, len: usize },
    #[error("{instruction}: {value} is not a valid character code")]
    InvalidChar { instruction: &'static str, value: i32 },
    #[error("{instruction}: radix {radix} is not between 2 and 36")]
    InvalidRadix { instruction: &'static str, radix: i32 },
    #[error("{instruction}: argument {value} must not be negative")]
    NegativeArgument { instruction: &'static str, value: i32 },
    #[error("{instruction}: length {len} exceeds the limit of {limit}")]
    StringTooLong { instruction: &'static str, len: usize, limit: usize },
    #[error("output failed: {0}")]
    Output(String),
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::UnboundVariable { .. } => "LBVM-R001",
            RuntimeError::UnassignedVariable { .. } => "LBVM-R002",
            RuntimeError::ArityMismatch { .. } | RuntimeError::TooFewArguments { .. } => "LBVM-R003",
            RuntimeError::InvalidCallTarget { .. } => "LBVM-R004",
            RuntimeError::InvalidPosition { .. } | RuntimeError::IpOutOfRange { .. } => "LBVM-R005",
            RuntimeError::TypeMismatch { .. } => "LBVM-R006",
            RuntimeError::StackOverflow { .. } => "LBVM-R007",
            RuntimeError::StackUnderflow { .. } => "LBVM-R008",
            RuntimeError::UnbalancedExit { .. } => "LBVM-R009",
            RuntimeError::DivisionByZero => "LBVM-R010",
            RuntimeError::IndexOutOfRange { .. }
            | RuntimeError::InvalidChar { .. }
            | RuntimeError::InvalidRadix { .. }
            | RuntimeError::NegativeArgument { .. }
            | RuntimeError::StringTooLong { .. } => "LBVM-R011",
            RuntimeError::Output(_) => "LBVM-R012",
        }
    }
}

type VmResult<T> = Result<T, RuntimeError>;

// ── Output ──────────────────────────────────────────────────────────────────

/// Receives everything `PRINT` writes. Text arrives without a trailing
/// newline.
pub trait OutputSink {
    fn print(&mut self, text: &str) -> std::io::Result<()>;
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn print(&mut self, text: &str) -> std::io::Result<()> {
        (**self).print(text)
    }
}

/// Collects output in memory.
impl OutputSink for String {
    fn print(&mut self, text: &str) -> std::io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl OutputSink for Stdout {
    fn print(&mut self, text: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

// ── Machine ─────────────────────────────────────────────────────────────────

type Frame = HashMap<Symbol, Variable>;

struct CallRecord {
    return_ip: usize,
    argc: u32,
}

/// One execution of a [`Program`]. Configure with the `with_*` builders and
/// [`Machine::define_global`], then [`Machine::run`].
pub struct Machine<'a> {
    program: &'a Program,
    limits: Limits,
    symbols: Vec<Symbol>,
    interner: Interner,
    globals: Frame,
    output: Box<dyn OutputSink + 'a>,
    rng: fastrand::Rng,
}

enum Flow {
    Next(usize),
    Halt(Value),
}

/// Stacks of a running machine.
struct State {
    values: BoundedStack<Value>,
    frames: BoundedStack<Frame>,
    calls: BoundedStack<CallRecord>,
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut interner = Interner::new();
        let symbols = program.symbols().iter().map(|name| interner.intern(name)).collect();
        Machine {
            program,
            limits: Limits::default(),
            symbols,
            interner,
            globals: Frame::new(),
            output: Box::new(Stdout),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_output(mut self, output: impl OutputSink + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Makes `RANDOM` deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Bind `name` in the global frame before the program starts.
    pub fn define_global(&mut self, name: &str, value: Value) {
        let sym = self.interner.intern(name);
        self.globals.insert(sym, Variable::new(value));
    }

    /// Execute from offset 0 until `END`. The result is the single value left
    /// on the value stack.
    pub fn run(mut self) -> VmResult<Value> {
        let mut state = State {
            values: BoundedStack::new(StackKind::Value, self.limits.value_stack),
            frames: BoundedStack::new(StackKind::Environment, self.limits.environment_stack),
            calls: BoundedStack::new(StackKind::Call, self.limits.call_stack),
        };
        state.frames.push(std::mem::take(&mut self.globals))?;
        tracing::debug!(bytes = self.program.code().len(), "run started");

        let program = self.program;
        let mut ip = 0;
        loop {
            let instr = program.statement(ip).ok_or(RuntimeError::IpOutOfRange { ip })?;
            tracing::trace!(ip = format_args!("0x{ip:04x}"), instr = %instr.render(program.symbols()), "step");
            match self.step(&mut state, ip, instr) {
                Ok(Flow::Next(next)) => ip = next,
                Ok(Flow::Halt(result)) => {
                    tracing::debug!(result = ?result, "run finished");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::debug!(ip, error = %e, "run failed");
                    return Err(e);
                }
            }
        }
    }

    fn symbol(&self, id: SymbolId) -> Symbol {
        self.symbols[id.index()].clone()
    }

    /// Current frame first, then the global frame.
    fn find(frames: &BoundedStack<Frame>, sym: &Symbol) -> Option<Variable> {
        let current = frames.peek().ok()?;
        current.get(sym).or_else(|| frames.first()?.get(sym)).cloned()
    }

    fn lookup(&self, frames: &BoundedStack<Frame>, id: SymbolId) -> VmResult<Variable> {
        let sym = &self.symbols[id.index()];
        Self::find(frames, sym).ok_or_else(|| RuntimeError::UnboundVariable { name: sym.name().to_string() })
    }

    fn step(&mut self, state: &mut State, ip: usize, instr: &Instruction) -> VmResult<Flow> {
        let name = instr.opcode().mnemonic();
        let next = ip + instr.encoded_len();
        let values = &mut state.values;

        macro_rules! binary {
            (|$a:ident, $b:ident| $body:expr) => {{
                let $b = values.pop()?;
                let $a = values.pop()?;
                let result: VmResult<Value> = $body;
                values.push(result?)?;
            }};
        }
        macro_rules! unary {
            (|$a:ident| $body:expr) => {{
                let $a = values.pop()?;
                let result: VmResult<Value> = $body;
                values.push(result?)?;
            }};
        }
        macro_rules! is {
            ($pattern:pat) => {
                unary!(|v| Ok(Value::Bool(matches!(v, $pattern))))
            };
        }

        match instr {
            Instruction::End => return self.finish(state).map(Flow::Halt),
            Instruction::Pop => {
                values.pop()?;
            }
            Instruction::PushInt(n) => values.push(Value::Int(*n))?,
            Instruction::PushDouble(x) => values.push(Value::Float(*x))?,
            Instruction::PushTrue => values.push(Value::Bool(true))?,
            Instruction::PushFalse => values.push(Value::Bool(false))?,
            Instruction::PushNil => values.push(Value::Nil)?,
            Instruction::PushChar(c) => values.push(Value::Char(*c))?,
            Instruction::PushStr(s) => values.push(Value::string(&**s))?,
            Instruction::PushSym(id) => values.push(Value::Symbol(self.symbol(*id)))?,
            Instruction::PushLabel(target) => values.push(Value::Ip(*target))?,

            // ── variables ──
            Instruction::Define(id) => {
                let value = values.pop()?;
                let sym = self.symbol(*id);
                let frame = state.frames.peek_mut()?;
                match value {
                    Value::Variable(var) => {
                        frame.insert(sym, var);
                    }
                    value => match frame.get(&sym) {
                        Some(var) => var.set(value),
                        None => {
                            frame.insert(sym, Variable::new(value));
                        }
                    },
                }
            }
            Instruction::MakeVar(id) => {
                let sym = self.symbol(*id);
                state.frames.peek_mut()?.insert(sym, Variable::unassigned());
            }
            Instruction::PushVar(id) => {
                let var = self.lookup(&state.frames, *id)?;
                let value = var.get().ok_or_else(|| RuntimeError::UnassignedVariable {
                    name: self.symbols[id.index()].name().to_string(),
                })?;
                state.values.push(value)?;
            }
            Instruction::Set(id) => {
                let value = values.pop()?;
                self.lookup(&state.frames, *id)?.set(value);
            }

            // ── control ──
            Instruction::Jmp(target) => return Ok(Flow::Next(*target)),
            Instruction::BranchFalse(target) => {
                if values.pop()?.is_false() {
                    return Ok(Flow::Next(*target));
                }
            }
            Instruction::Call(argc) => return self.call(state, *argc, next).map(Flow::Next),
            Instruction::TailCall(argc) => {
                Self::pop_frame(state)?;
                let record = state.calls.pop()?;
                return self.call(state, *argc, record.return_ip).map(Flow::Next);
            }
            Instruction::Ret => {
                Self::pop_frame(state)?;
                let record = state.calls.pop()?;
                return Ok(Flow::Next(record.return_ip));
            }
            Instruction::Enter { arity, name } => {
                let actual = state.calls.peek()?.argc;
                if actual != *arity {
                    return Err(RuntimeError::ArityMismatch {
                        function: self.symbols[name.index()].name().to_string(),
                        expected: *arity,
                        actual,
                    });
                }
                state.frames.push(Frame::new())?;
            }
            Instruction::EnterRest { arity, skip, name } => {
                let provided = state.calls.peek()?.argc;
                let minimum = arity.saturating_sub(1);
                if provided < minimum {
                    return Err(RuntimeError::TooFewArguments {
                        function: self.symbols[name.index()].name().to_string(),
                        minimum,
                        actual: provided,
                    });
                }
                let mut skipped = Vec::with_capacity(*skip as usize);
                for _ in 0..*skip {
                    skipped.push(values.pop()?);
                }
                let mut rest = Value::Nil;
                for _ in 0..provided - minimum {
                    rest = Value::cons(values.pop()?, rest);
                }
                values.push(rest)?;
                for value in skipped.into_iter().rev() {
                    values.push(value)?;
                }
                state.frames.push(Frame::new())?;
            }
            Instruction::MakeClosure(count) => {
                let mut captured = Vec::with_capacity(*count as usize);
                for _ in 0..*count {
                    let sym = match values.pop()? {
                        Value::Symbol(sym) => sym,
                        other => return Err(ops_mismatch(name, "symbol", &other)),
                    };
                    let var = Self::find(&state.frames, &sym)
                        .ok_or_else(|| RuntimeError::UnboundVariable { name: sym.name().to_string() })?;
                    captured.push(var);
                }
                captured.reverse();
                let target = match values.pop()? {
                    Value::Ip(target) => target,
                    other => return Err(ops_mismatch(name, "label", &other)),
                };
                values.push(Value::Closure(Rc::new(Closure { target, captured })))?;
            }
            Instruction::Invalid => return Err(RuntimeError::InvalidPosition { ip }),

            // ── numbers ──
            Instruction::Add => binary!(|a, b| ops::arith(Arith::Add, name, &a, &b)),
            Instruction::Sub => binary!(|a, b| ops::arith(Arith::Sub, name, &a, &b)),
            Instruction::Mul => binary!(|a, b| ops::arith(Arith::Mul, name, &a, &b)),
            Instruction::Div => binary!(|a, b| ops::arith(Arith::Div, name, &a, &b)),
            Instruction::IDiv => binary!(|a, b| ops::arith(Arith::IDiv, name, &a, &b)),
            Instruction::IMod => binary!(|a, b| ops::arith(Arith::IMod, name, &a, &b)),
            Instruction::NumEqual => binary!(|a, b| ops::compare_numbers(name, &a, &b, Ordering::is_eq)),
            Instruction::NumLt => binary!(|a, b| ops::compare_numbers(name, &a, &b, Ordering::is_lt)),
            Instruction::NumLe => binary!(|a, b| ops::compare_numbers(name, &a, &b, Ordering::is_le)),
            Instruction::NumGt => binary!(|a, b| ops::compare_numbers(name, &a, &b, Ordering::is_gt)),
            Instruction::NumGe => binary!(|a, b| ops::compare_numbers(name, &a, &b, Ordering::is_ge)),
            Instruction::Random => {
                let bound = match values.pop()? {
                    Value::Int(n) => n,
                    Value::Float(x) => x.round() as i32,
                    other => return Err(ops_mismatch(name, "number", &other)),
                };
                if bound < 0 {
                    return Err(RuntimeError::NegativeArgument { instruction: name, value: bound });
                }
                let n = if bound == 0 { 0 } else { self.rng.i32(0..bound) };
                values.push(Value::Int(n))?;
            }

            // ── pairs and identity ──
            Instruction::MakePair => binary!(|a, b| Ok(Value::cons(a, b))),
            Instruction::First => unary!(|v| match v {
                Value::Pair(p) => Ok(p.first.clone()),
                other => Err(ops_mismatch(name, "pair", &other)),
            }),
            Instruction::Second => unary!(|v| match v {
                Value::Pair(p) => Ok(p.second.clone()),
                other => Err(ops_mismatch(name, "pair", &other)),
            }),
            Instruction::ObjEqual => binary!(|a, b| Ok(Value::Bool(a.is_identical(&b)))),
            Instruction::IsPair => is!(Value::Pair(_)),
            Instruction::IsNull => is!(Value::Nil),
            Instruction::IsNumber => is!(Value::Int(_) | Value::Float(_)),
            Instruction::IsString => is!(Value::Str(_)),
            Instruction::IsChar => is!(Value::Char(_)),

            // ── strings and characters ──
            Instruction::StrEqual => binary!(|a, b| str_test(name, &a, &b, false, Ordering::is_eq)),
            Instruction::StrEqualCi => binary!(|a, b| str_test(name, &a, &b, true, Ordering::is_eq)),
            Instruction::StrLt => binary!(|a, b| str_test(name, &a, &b, false, Ordering::is_lt)),
            Instruction::StrLtCi => binary!(|a, b| str_test(name, &a, &b, true, Ordering::is_lt)),
            Instruction::StrGt => binary!(|a, b| str_test(name, &a, &b, false, Ordering::is_gt)),
            Instruction::StrGtCi => binary!(|a, b| str_test(name, &a, &b, true, Ordering::is_gt)),
            Instruction::ChrEqual => binary!(|a, b| chr_test(name, &a, &b, false, Ordering::is_eq)),
            Instruction::ChrEqualCi => binary!(|a, b| chr_test(name, &a, &b, true, Ordering::is_eq)),
            Instruction::ChrLt => binary!(|a, b| chr_test(name, &a, &b, false, Ordering::is_lt)),
            Instruction::ChrLtCi => binary!(|a, b| chr_test(name, &a, &b, true, Ordering::is_lt)),
            Instruction::ChrGt => binary!(|a, b| chr_test(name, &a, &b, false, Ordering::is_gt)),
            Instruction::ChrGtCi => binary!(|a, b| chr_test(name, &a, &b, true, Ordering::is_gt)),
            Instruction::StrLen => unary!(|s| {
                let s = ops::string(name, &s)?;
                let len = s.borrow().chars().count();
                Ok(Value::Int(i32::try_from(len).unwrap_or(i32::MAX)))
            }),
            Instruction::Substr => {
                let end = values.pop()?;
                let start = values.pop()?;
                let s = values.pop()?;
                values.push(ops::substring(&s, &start, &end)?)?;
            }
            Instruction::StrAppend => binary!(|a, b| ops::append(&a, &b)),
            Instruction::StrRef => binary!(|s, i| ops::string_ref(&s, &i)),
            Instruction::SetStrRef => {
                let c = values.pop()?;
                let i = values.pop()?;
                let s = values.pop()?;
                values.push(ops::set_string_ref(&s, &i, &c)?)?;
            }
            Instruction::MakeStr => unary!(|n| ops::make_string(&n, self.limits.string_length)),
            Instruction::ChrToInt => unary!(|c| ops::character(name, &c).map(|c| Value::Int(u32::from(c) as i32))),
            Instruction::IntToChr => unary!(|n| ops::int_to_char(&n)),
            Instruction::StrToSym => unary!(|s| {
                let s = ops::string(name, &s)?;
                let sym = self.interner.intern(&s.borrow());
                Ok(Value::Symbol(sym))
            }),
            Instruction::SymToStr => unary!(|v| match v {
                Value::Symbol(sym) => Ok(Value::string(sym.name())),
                other => Err(ops_mismatch(name, "symbol", &other)),
            }),
            Instruction::StrToNum => binary!(|s, r| ops::string_to_number(&s, &r)),
            Instruction::NumToStr => binary!(|v, r| ops::number_to_string(&v, &r)),

            Instruction::Print => {
                let text = values.peek()?.to_string();
                self.output.print(&text).map_err(|e| RuntimeError::Output(e.to_string()))?;
            }
        }
        Ok(Flow::Next(next))
    }

    /// Push a call record and return the callee's entry offset. The callable
    /// sits `argc` slots below the top of the value stack.
    fn call(&mut self, state: &mut State, argc: u32, return_ip: usize) -> VmResult<usize> {
        let callee = state.values.peek_at(argc as usize)?.clone();
        match callee {
            Value::Ip(target) => {
                state.calls.push(CallRecord { return_ip, argc })?;
                Ok(target)
            }
            Value::Closure(closure) => {
                for var in &closure.captured {
                    state.values.push(Value::Variable(var.clone()))?;
                }
                let argc = argc + closure.captured.len() as u32;
                state.calls.push(CallRecord { return_ip, argc })?;
                Ok(closure.target)
            }
            other => Err(RuntimeError::InvalidCallTarget { found: other.type_name() }),
        }
    }

    /// The global frame is never popped.
    fn pop_frame(state: &mut State) -> VmResult<()> {
        if state.frames.len() <= 1 {
            return Err(RuntimeError::StackUnderflow { stack: StackKind::Environment });
        }
        state.frames.pop()?;
        Ok(())
    }

    fn finish(&self, state: &mut State) -> VmResult<Value> {
        let unbalanced = |reason: String| Err(RuntimeError::UnbalancedExit { reason });
        if state.frames.len() != 1 {
            return unbalanced(format!("{} environment frame(s) still open", state.frames.len() - 1));
        }
        if !state.calls.is_empty() {
            return unbalanced(format!("{} call record(s) still open", state.calls.len()));
        }
        if state.values.len() != 1 {
            return unbalanced(format!("{} values on the stack, expected exactly 1", state.values.len()));
        }
        state.values.pop()
    }
}

fn ops_mismatch(instruction: &'static str, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch { instruction, expected, found: found.type_name() }
}

fn str_test(name: &'static str, a: &Value, b: &Value, ci: bool, test: fn(Ordering) -> bool) -> VmResult<Value> {
    ops::compare_strings(name, a, b, ci).map(|o| Value::Bool(test(o)))
}

fn chr_test(name: &'static str, a: &Value, b: &Value, ci: bool, test: fn(Ordering) -> bool) -> VmResult<Value> {
    ops::compare_chars(name, a, b, ci).map(|o| Value::Bool(test(o)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_output(source: &str) -> (VmResult<Value>, String) {
        let program = Program::assemble_str(source).expect("assembles");
        let mut out = String::new();
        let result = Machine::new(&program).with_output(&mut out).run();
        (result, out)
    }

    fn run(source: &str) -> VmResult<Value> {
        run_with_output(source).0
    }

    #[test]
    fn only_false_is_false() {
        let source = "PUSHNIL\nBFALSE skip\nPUSHINT 1\nEND\nskip:\nPUSHINT 2\nEND";
        assert_eq!(run(source), Ok(Value::Int(1)));
        assert_eq!(run(&source.replace("PUSHNIL", "PUSHFALSE")), Ok(Value::Int(2)));
    }

    #[test]
    fn push_str_makes_a_fresh_string_each_time() {
        let source = "\
FUNCTION mk
PUSHSTR \"x\"
RET
ENDFUNCTION
PUSHVAR mk
CALL 0
PUSHVAR mk
CALL 0
OBJEQUAL
END";
        assert_eq!(run(source), Ok(Value::Bool(false)));
    }

    #[test]
    fn set_str_ref_is_seen_through_variables() {
        let source = "\
PUSHSTR \"cat\"
DEFINE s
PUSHVAR s
PUSHINT 0
PUSHCHR 104
SETSTRREF
POP
PUSHVAR s
END";
        assert_eq!(run(source).map(|v| v.to_string()), Ok("hat".to_string()));
    }

    #[test]
    fn functions_see_globals_defined_later() {
        let source = "\
FUNCTION get
PUSHVAR late
RET
ENDFUNCTION
PUSHINT 9
DEFINE late
PUSHVAR get
CALL 0
END";
        assert_eq!(run(source), Ok(Value::Int(9)));
    }

    #[test]
    fn print_uses_display_form_and_keeps_the_value() {
        let (result, out) = run_with_output("PUSHTRUE\nPRINT\nPUSHCHR 97\nPRINT\nPOP\nEND");
        assert_eq!(result, Ok(Value::Bool(true)));
        assert_eq!(out, "#ta");
    }

    #[test]
    fn error_opcode_is_an_invalid_position() {
        let program = Program::new(vec![0xff], Vec::new()).unwrap();
        assert_eq!(program.run(), Err(RuntimeError::InvalidPosition { ip: 0 }));
    }

    #[test]
    fn running_off_the_end() {
        let mut code = vec![0x02];
        code.extend_from_slice(&1i32.to_le_bytes());
        let program = Program::new(code, Vec::new()).unwrap();
        assert_eq!(program.run(), Err(RuntimeError::IpOutOfRange { ip: 5 }));
    }

    #[test]
    fn value_stack_limit() {
        let program = Program::assemble_str("loop:\nPUSHINT 1\nJMP loop").unwrap();
        let limits = Limits { value_stack: 16, ..Limits::default() };
        let result = Machine::new(&program).with_limits(limits).run();
        assert_eq!(result, Err(RuntimeError::StackOverflow { stack: StackKind::Value }));
    }

    #[test]
    fn error_codes() {
        assert_eq!(RuntimeError::DivisionByZero.code(), "LBVM-R010");
        assert_eq!(RuntimeError::IpOutOfRange { ip: 0 }.code(), "LBVM-R005");
        assert_eq!(RuntimeError::Output("closed".into()).code(), "LBVM-R012");
    }
}
