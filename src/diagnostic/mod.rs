pub mod ansi;
pub mod json;
pub mod registry;

use crate::assembler::{AsmErrorKind, AssemblyError};
use crate::container::FormatError;
use crate::isa::{Opcode, Shape};
use crate::loader::DecodeError;
use crate::vm::{RuntimeError, StackKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    #[allow(dead_code)] // no warning-level checks exist yet
    Warning,
}

/// A position in assembly source. `len == 0` means "the token starting here".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub location: Location,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
            file: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_location(mut self, location: Location, label: impl Into<String>) -> Self {
        self.labels.push(Label { location, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_location(mut self, location: Location, label: impl Into<String>) -> Self {
        self.labels.push(Label { location, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Full assembly source the labels point into.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

// ---- From impls for the error types ----

impl From<&AssemblyError> for Diagnostic {
    fn from(e: &AssemblyError) -> Self {
        let location = Location { line: e.line, column: e.column, len: 0 };
        let d = Diagnostic::error(e.kind.to_string())
            .with_code(e.code())
            .with_location(location, "here");
        match &e.kind {
            AsmErrorKind::UnknownMnemonic(word) => match closest_mnemonic(word) {
                Some(m) => d.with_suggestion(format!("did you mean '{m}'?")),
                None => d,
            },
            AsmErrorKind::OperandCount { mnemonic, .. } => match Opcode::from_mnemonic(mnemonic) {
                Some(op) => d.with_note(format!("usage: {}", usage(op))),
                None => d.with_note("ENDFUNCTION takes no operands"),
            },
            AsmErrorKind::UndeclaredLabel(name) => {
                d.with_suggestion(format!("declare it on a line of its own: '{name}:'"))
            }
            AsmErrorKind::UnclosedFunction(_) => d.with_suggestion("add a matching ENDFUNCTION"),
            AsmErrorKind::MalformedFunction(_) => d.with_note(
                "usage: FUNCTION name param* [&rest r] [&closingover v*] [&localdefines d*]",
            ),
            _ => d,
        }
    }
}

impl From<&FormatError> for Diagnostic {
    fn from(e: &FormatError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            FormatError::ChecksumMismatch { .. } => {
                d.with_note("the container was modified or damaged after it was written")
            }
            FormatError::BadMagic => d.with_note("LBVM containers start with the bytes \"LBVM\""),
            _ => d,
        }
    }
}

impl From<&DecodeError> for Diagnostic {
    fn from(e: &DecodeError) -> Self {
        Diagnostic::error(e.to_string()).with_code(e.code())
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            RuntimeError::StackOverflow { stack: StackKind::Call | StackKind::Environment } => {
                d.with_suggestion("calls in tail position should use TAILCALL")
            }
            RuntimeError::InvalidPosition { .. } => {
                d.with_note("jump targets must be label offsets, not operand bytes")
            }
            _ => d,
        }
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Assembly(e) => e.into(),
            crate::Error::Format(e) => e.into(),
            crate::Error::Decode(e) => e.into(),
            crate::Error::Runtime(e) => e.into(),
            crate::Error::Io(e) => Diagnostic::error(e.to_string()),
        }
    }
}

fn usage(op: Opcode) -> String {
    let operands = match op.shape() {
        Shape::None => "",
        Shape::Int => " <int>",
        Shape::Symbol => " <symbol>",
        Shape::Target => " <label>",
        Shape::Double => " <number>",
        Shape::Str => " \"<string>\"",
        Shape::Enter => " <arity> <name>",
        Shape::EnterRest => " <arity> <skip> <name>",
    };
    format!("{}{operands}", op.mnemonic())
}

/// Nearest mnemonic within edit distance 2, ignoring case.
fn closest_mnemonic(word: &str) -> Option<&'static str> {
    let word = word.to_ascii_uppercase();
    Opcode::ALL
        .iter()
        .map(|op| op.mnemonic())
        .chain(["FUNCTION", "ENDFUNCTION"])
        .map(|m| (edit_distance(&word, m), m))
        .filter(|&(d, _)| d <= 2)
        .min_by_key(|&(d, _)| d)
        .map(|(_, m)| m)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}
