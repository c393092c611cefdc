//! Two-pass assembler: text lines → code bytes + symbol table.
//!
//! Pass one emits bytes with zeroed placeholders for label references and
//! records every label's offset; pass two patches the placeholders. The
//! `FUNCTION` / `ENDFUNCTION` macro expands straight into [`Item`]s that go
//! through the same emitter as hand-written lines.

use std::collections::HashMap;
use std::ops::Range;

use crate::isa::{Opcode, Shape};
use crate::lexer::{self, LexErrorKind, Token};

#[derive(Debug, Clone, thiserror::Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct AssemblyError {
    /// 1-based source line.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    pub kind: AsmErrorKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AsmErrorKind {
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    OperandCount { mnemonic: &'static str, expected: usize, found: usize },
    #[error("{mnemonic}: expected {expected}, found '{found}'")]
    InvalidOperand { mnemonic: &'static str, expected: &'static str, found: String },
    #[error("malformed label '{0}'")]
    MalformedLabel(String),
    #[error("label '{0}' is defined more than once")]
    DuplicateLabel(String),
    #[error("undeclared label '{0}'")]
    UndeclaredLabel(String),
    #[error("malformed FUNCTION header: {0}")]
    MalformedFunction(String),
    #[error("ENDFUNCTION without a matching FUNCTION")]
    UnmatchedEndFunction,
    #[error("FUNCTION '{0}' is never closed by ENDFUNCTION")]
    UnclosedFunction(String),
    #[error("{0}")]
    Lex(LexErrorKind),
    #[error("program exceeds the 4 GiB addressable code size")]
    TooLarge,
}

impl AssemblyError {
    pub fn code(&self) -> &'static str {
        match &self.kind {
            AsmErrorKind::UnknownMnemonic(_) => "LBVM-A001",
            AsmErrorKind::OperandCount { .. } => "LBVM-A002",
            AsmErrorKind::InvalidOperand { .. } => "LBVM-A003",
            AsmErrorKind::MalformedLabel(_) | AsmErrorKind::DuplicateLabel(_) => "LBVM-A004",
            AsmErrorKind::UndeclaredLabel(_) => "LBVM-A005",
            AsmErrorKind::MalformedFunction(_) => "LBVM-A006",
            AsmErrorKind::UnmatchedEndFunction | AsmErrorKind::UnclosedFunction(_) => "LBVM-A007",
            AsmErrorKind::Lex(_) => "LBVM-A008",
            AsmErrorKind::TooLarge => "LBVM-A009",
        }
    }
}

type AsmResult<T> = Result<T, AssemblyError>;

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub code: Vec<u8>,
    pub symbols: Vec<String>,
}

/// Assemble a whole program.
pub fn assemble<I, S>(lines: I) -> AsmResult<Assembled>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut asm = Assembler::default();
    for (idx, line) in lines.into_iter().enumerate() {
        asm.line(idx + 1, line.as_ref())?;
    }
    asm.finish()
}

// ── Items ───────────────────────────────────────────────────────────────────

/// One decoded operand, ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Double(f64),
    Symbol(String),
    Label(String),
    Str(String),
}

/// Unit of emission. Source lines and macro expansions both produce these.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Label(String),
    Instr { op: Opcode, operands: Vec<Operand> },
}

impl Item {
    fn instr(op: Opcode, operands: impl Into<Vec<Operand>>) -> Item {
        Item::Instr { op, operands: operands.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    Int,
    /// Non-negative int: argument counts and arities.
    Count,
    /// Int that must name a valid character.
    CodePoint,
    Double,
    Symbol,
    Label,
    Str,
}

impl OperandKind {
    fn describe(self) -> &'static str {
        match self {
            OperandKind::Int => "a 32-bit integer",
            OperandKind::Count => "a non-negative count",
            OperandKind::CodePoint => "a character code point",
            OperandKind::Double => "a floating-point number",
            OperandKind::Symbol => "a symbol name",
            OperandKind::Label => "a label name",
            OperandKind::Str => "a quoted string",
        }
    }
}

fn operand_kinds(op: Opcode) -> &'static [OperandKind] {
    use OperandKind as K;
    match op.shape() {
        Shape::None => &[],
        Shape::Int => match op {
            Opcode::Call | Opcode::TailCall | Opcode::MakeClosure => &[K::Count],
            Opcode::PushChar => &[K::CodePoint],
            _ => &[K::Int],
        },
        Shape::Symbol => &[K::Symbol],
        Shape::Target => &[K::Label],
        Shape::Double => &[K::Double],
        Shape::Str => &[K::Str],
        Shape::Enter => &[K::Count, K::Symbol],
        Shape::EnterRest => &[K::Count, K::Count, K::Symbol],
    }
}

// ── Assembler state ─────────────────────────────────────────────────────────

struct Fixup {
    at: usize,
    label: String,
    line: usize,
    column: usize,
}

struct OpenFunction {
    name: String,
    start: String,
    after: String,
    closing_over: Vec<String>,
    line: usize,
    column: usize,
}

#[derive(Default)]
struct FunctionHeader {
    name: String,
    params: Vec<String>,
    rest: Option<String>,
    closing_over: Vec<String>,
    local_defines: Vec<String>,
}

#[derive(Default)]
pub struct Assembler {
    code: Vec<u8>,
    symbols: Vec<String>,
    symbol_index: HashMap<String, u32>,
    labels: HashMap<String, usize>,
    fixups: Vec<Fixup>,
    functions: Vec<OpenFunction>,
    next_function: usize,
    // position of the line being assembled, for error reporting
    line: usize,
    column: usize,
}

impl Assembler {
    fn err(&self, kind: AsmErrorKind) -> AssemblyError {
        AssemblyError { line: self.line, column: self.column, kind }
    }

    /// Assemble one source line (1-based `line` number).
    pub fn line(&mut self, line: usize, text: &str) -> AsmResult<()> {
        self.line = line;
        self.column = 1;
        let tokens = lexer::lex_line(text).map_err(|e| AssemblyError {
            line,
            column: e.column,
            kind: AsmErrorKind::Lex(e.kind),
        })?;
        let Some(((head, head_span), operands)) = tokens.split_first() else {
            return Ok(());
        };
        self.column = head_span.start + 1;

        let word = match head {
            Token::Word(w) => w,
            Token::Str(_) => {
                return Err(self.err(AsmErrorKind::UnknownMnemonic(text[head_span.clone()].to_string())));
            }
        };

        if let Some(name) = word.strip_suffix(':') {
            if !operands.is_empty() || name.is_empty() || name.ends_with(':') || name.starts_with("##") {
                return Err(self.err(AsmErrorKind::MalformedLabel(text.trim().to_string())));
            }
            return self.emit(Item::Label(name.to_string()));
        }

        if word.eq_ignore_ascii_case("FUNCTION") {
            return self.begin_function(operands);
        }
        if word.eq_ignore_ascii_case("ENDFUNCTION") {
            if !operands.is_empty() {
                return Err(self.err(AsmErrorKind::OperandCount {
                    mnemonic: "ENDFUNCTION",
                    expected: 0,
                    found: operands.len(),
                }));
            }
            return self.end_function();
        }

        let op = Opcode::from_mnemonic(word)
            .ok_or_else(|| self.err(AsmErrorKind::UnknownMnemonic(word.clone())))?;
        let kinds = operand_kinds(op);
        if kinds.len() != operands.len() {
            return Err(self.err(AsmErrorKind::OperandCount {
                mnemonic: op.mnemonic(),
                expected: kinds.len(),
                found: operands.len(),
            }));
        }
        let mut parsed = Vec::with_capacity(kinds.len());
        for (&kind, (token, span)) in kinds.iter().zip(operands) {
            self.column = span.start + 1;
            parsed.push(self.parse_operand(op, kind, token, &text[span.clone()])?);
        }
        self.column = head_span.start + 1;
        self.emit(Item::instr(op, parsed))
    }

    fn parse_operand(&self, op: Opcode, kind: OperandKind, token: &Token, raw: &str) -> AsmResult<Operand> {
        let invalid = || {
            self.err(AsmErrorKind::InvalidOperand {
                mnemonic: op.mnemonic(),
                expected: kind.describe(),
                found: raw.to_string(),
            })
        };
        let word = match (kind, token) {
            (OperandKind::Str, Token::Str(s)) => return Ok(Operand::Str(s.clone())),
            (OperandKind::Str, Token::Word(_)) | (_, Token::Str(_)) => return Err(invalid()),
            (_, Token::Word(w)) => w.as_str(),
        };
        match kind {
            OperandKind::Int => word.parse().map(Operand::Int).map_err(|_| invalid()),
            OperandKind::Count => match word.parse::<i32>() {
                Ok(n) if n >= 0 => Ok(Operand::Int(n)),
                _ => Err(invalid()),
            },
            OperandKind::CodePoint => match word.parse::<u32>().ok().and_then(char::from_u32) {
                Some(c) => Ok(Operand::Int(u32::from(c) as i32)),
                None => Err(invalid()),
            },
            OperandKind::Double => word.parse().map(Operand::Double).map_err(|_| invalid()),
            OperandKind::Symbol => Ok(Operand::Symbol(word.to_string())),
            OperandKind::Label => Ok(Operand::Label(word.to_string())),
            OperandKind::Str => Err(invalid()),
        }
    }

    // ── Emission (pass one) ─────────────────────────────────────────────────

    fn emit(&mut self, item: Item) -> AsmResult<()> {
        match item {
            Item::Label(name) => {
                if self.labels.contains_key(&name) {
                    return Err(self.err(AsmErrorKind::DuplicateLabel(name)));
                }
                self.labels.insert(name, self.code.len());
            }
            Item::Instr { op, operands } => {
                self.code.push(op as u8);
                for operand in operands {
                    match operand {
                        Operand::Int(n) => self.code.extend_from_slice(&n.to_le_bytes()),
                        Operand::Double(x) => self.code.extend_from_slice(&x.to_le_bytes()),
                        Operand::Symbol(name) => {
                            let idx = self.intern(name);
                            self.code.extend_from_slice(&idx.to_le_bytes());
                        }
                        Operand::Label(label) => {
                            self.fixups.push(Fixup {
                                at: self.code.len(),
                                label,
                                line: self.line,
                                column: self.column,
                            });
                            self.code.extend_from_slice(&[0; 4]);
                        }
                        Operand::Str(s) => {
                            let len = u32::try_from(s.len()).map_err(|_| self.err(AsmErrorKind::TooLarge))?;
                            self.code.extend_from_slice(&len.to_le_bytes());
                            self.code.extend_from_slice(s.as_bytes());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn intern(&mut self, name: String) -> u32 {
        if let Some(&idx) = self.symbol_index.get(&name) {
            return idx;
        }
        let idx = self.symbols.len() as u32;
        self.symbols.push(name.clone());
        self.symbol_index.insert(name, idx);
        idx
    }

    // ── FUNCTION macro ──────────────────────────────────────────────────────

    fn begin_function(&mut self, operands: &[(Token, Range<usize>)]) -> AsmResult<()> {
        let header = self.parse_function_header(operands)?;
        let id = self.next_function;
        self.next_function += 1;
        let start = format!("##{}##start##{id}", header.name);
        let after = format!("##{}##after##{id}", header.name);

        let captured = header.closing_over.len();
        let arity = header.params.len() + usize::from(header.rest.is_some()) + captured;
        let arity = self.count(arity)?;

        self.emit(Item::instr(Opcode::Jmp, [Operand::Label(after.clone())]))?;
        self.emit(Item::Label(start.clone()))?;
        let entry = if header.rest.is_some() {
            let skip = self.count(captured)?;
            Item::instr(
                Opcode::EnterRest,
                [Operand::Int(arity), Operand::Int(skip), Operand::Symbol(header.name.clone())],
            )
        } else {
            Item::instr(Opcode::Enter, [Operand::Int(arity), Operand::Symbol(header.name.clone())])
        };
        self.emit(entry)?;
        for local in &header.local_defines {
            self.emit(Item::instr(Opcode::MakeVar, [Operand::Symbol(local.clone())]))?;
        }
        let bound = header
            .closing_over
            .iter()
            .rev()
            .chain(header.rest.iter())
            .chain(header.params.iter().rev());
        for name in bound {
            self.emit(Item::instr(Opcode::Define, [Operand::Symbol(name.clone())]))?;
        }
        self.emit(Item::instr(Opcode::Pop, Vec::new()))?;

        self.functions.push(OpenFunction {
            name: header.name,
            start,
            after,
            closing_over: header.closing_over,
            line: self.line,
            column: self.column,
        });
        Ok(())
    }

    fn end_function(&mut self) -> AsmResult<()> {
        let f = self
            .functions
            .pop()
            .ok_or_else(|| self.err(AsmErrorKind::UnmatchedEndFunction))?;

        self.emit(Item::Label(f.after))?;
        self.emit(Item::instr(Opcode::PushLabel, [Operand::Label(f.start)]))?;
        self.emit(Item::instr(Opcode::Define, [Operand::Symbol(f.name.clone())]))?;
        if !f.closing_over.is_empty() {
            let count = self.count(f.closing_over.len())?;
            self.emit(Item::instr(Opcode::PushVar, [Operand::Symbol(f.name.clone())]))?;
            for name in f.closing_over {
                self.emit(Item::instr(Opcode::PushSym, [Operand::Symbol(name)]))?;
            }
            self.emit(Item::instr(Opcode::MakeClosure, [Operand::Int(count)]))?;
            self.emit(Item::instr(Opcode::Define, [Operand::Symbol(f.name)]))?;
        }
        Ok(())
    }

    /// `FUNCTION name p* [&rest r] [&closingover v*] [&localdefines d*]`
    fn parse_function_header(&self, operands: &[(Token, Range<usize>)]) -> AsmResult<FunctionHeader> {
        #[derive(Clone, Copy, PartialEq)]
        enum Section {
            Params,
            Rest,
            ClosingOver,
            LocalDefines,
        }

        let malformed = |msg: &str| self.err(AsmErrorKind::MalformedFunction(msg.to_string()));
        let mut words = Vec::with_capacity(operands.len());
        for (token, _) in operands {
            match token {
                Token::Word(w) => words.push(w.as_str()),
                Token::Str(_) => return Err(malformed("string literal in header")),
            }
        }
        let Some((&name, rest)) = words.split_first() else {
            return Err(malformed("missing function name"));
        };
        if name.starts_with('&') {
            return Err(malformed(&format!("'{name}' is not a valid function name")));
        }

        let mut header = FunctionHeader { name: name.to_string(), ..Default::default() };
        let mut section = Section::Params;
        let mut seen = Vec::new();
        for &word in rest {
            let marker = if word.eq_ignore_ascii_case("&rest") {
                Some(Section::Rest)
            } else if word.eq_ignore_ascii_case("&closingover") {
                Some(Section::ClosingOver)
            } else if word.eq_ignore_ascii_case("&localdefines") {
                Some(Section::LocalDefines)
            } else if word.starts_with('&') {
                return Err(malformed(&format!("unknown marker '{word}'")));
            } else {
                None
            };
            match marker {
                Some(next) => {
                    if seen.contains(&next) {
                        return Err(malformed(&format!("'{word}' given more than once")));
                    }
                    if section == Section::Rest && header.rest.is_none() {
                        return Err(malformed("&rest needs exactly one parameter name"));
                    }
                    seen.push(next);
                    section = next;
                }
                None => match section {
                    Section::Params => header.params.push(word.to_string()),
                    Section::Rest if header.rest.is_some() => {
                        return Err(malformed("&rest needs exactly one parameter name"));
                    }
                    Section::Rest => header.rest = Some(word.to_string()),
                    Section::ClosingOver => header.closing_over.push(word.to_string()),
                    Section::LocalDefines => header.local_defines.push(word.to_string()),
                },
            }
        }
        if section == Section::Rest && header.rest.is_none() {
            return Err(malformed("&rest needs exactly one parameter name"));
        }
        Ok(header)
    }

    fn count(&self, n: usize) -> AsmResult<i32> {
        i32::try_from(n).map_err(|_| self.err(AsmErrorKind::TooLarge))
    }

    // ── Label resolution (pass two) ─────────────────────────────────────────

    pub fn finish(mut self) -> AsmResult<Assembled> {
        if let Some(open) = self.functions.pop() {
            return Err(AssemblyError {
                line: open.line,
                column: open.column,
                kind: AsmErrorKind::UnclosedFunction(open.name),
            });
        }
        if u32::try_from(self.code.len()).is_err() {
            return Err(self.err(AsmErrorKind::TooLarge));
        }
        for fixup in &self.fixups {
            let Some(&target) = self.labels.get(&fixup.label) else {
                return Err(AssemblyError {
                    line: fixup.line,
                    column: fixup.column,
                    kind: AsmErrorKind::UndeclaredLabel(fixup.label.clone()),
                });
            };
            let bytes = (target as u32).to_le_bytes();
            self.code[fixup.at..fixup.at + 4].copy_from_slice(&bytes);
        }
        tracing::debug!(
            bytes = self.code.len(),
            symbols = self.symbols.len(),
            labels = self.labels.len(),
            "assembled program"
        );
        Ok(Assembled { code: self.code, symbols: self.symbols })
    }
}
