use std::fmt;
use std::io::{Read, Write};

use serde::Serialize;

use crate::isa::Instruction;
use crate::vm::{Machine, RuntimeError};
use crate::{assembler, container, loader, Error, Value};

/// A decoded, immutable program. Build one from assembly text, from a
/// container, or from raw code and symbols; run it as often as needed.
#[derive(Debug, Clone)]
pub struct Program {
    code: Vec<u8>,
    symbols: Vec<String>,
    statements: Vec<Instruction>,
}

/// One line of a disassembly listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingLine {
    pub offset: usize,
    pub len: usize,
    pub text: String,
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}: {}", self.offset, self.text)
    }
}

impl Program {
    /// Decode `code` against `symbols`.
    pub fn new(code: Vec<u8>, symbols: Vec<String>) -> Result<Program, loader::DecodeError> {
        let statements = loader::decode(&code, symbols.len())?;
        Ok(Program { code, symbols, statements })
    }

    pub fn assemble<I, S>(lines: I) -> Result<Program, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let out = assembler::assemble(lines)?;
        Ok(Program::new(out.code, out.symbols)?)
    }

    pub fn assemble_str(source: &str) -> Result<Program, Error> {
        Program::assemble(source.lines())
    }

    /// Load from an `LBVM` container.
    pub fn read_from<R: Read>(reader: R) -> Result<Program, Error> {
        let contents = container::read(reader)?;
        Ok(Program::new(contents.code, contents.symbols)?)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), Error> {
        container::write(writer, &self.code, &self.symbols)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Statement at byte offset `ip`; `None` past the end of the code.
    pub fn statement(&self, ip: usize) -> Option<&Instruction> {
        self.statements.get(ip)
    }

    /// Run on a fresh machine with default limits and stdout output.
    pub fn run(&self) -> Result<Value, RuntimeError> {
        self.run_with(std::iter::empty::<(&str, Value)>())
    }

    /// Like [`Program::run`], with `globals` bound before the first instruction.
    pub fn run_with<'g, G>(&self, globals: G) -> Result<Value, RuntimeError>
    where
        G: IntoIterator<Item = (&'g str, Value)>,
    {
        let mut machine = Machine::new(self);
        for (name, value) in globals {
            machine.define_global(name, value);
        }
        machine.run()
    }

    /// Walk instruction by instruction (operand offsets are skipped).
    pub fn disassemble(&self) -> Vec<ListingLine> {
        let mut lines = Vec::new();
        let mut offset = 0;
        while let Some(instr) = self.statements.get(offset) {
            let len = instr.encoded_len();
            lines.push(ListingLine { offset, len, text: instr.render(&self.symbols) });
            offset += len;
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Program>();
    }

    #[test]
    fn disassembly_listing() {
        let p = Program::assemble_str("PUSHINT 1\nloop:\nBFALSE loop\nPUSHSTR \"x\"\nEND").unwrap();
        let listing: Vec<String> = p.disassemble().iter().map(ToString::to_string).collect();
        assert_eq!(
            listing,
            vec![
                "0x0000: PUSHINT 1",
                "0x0005: BFALSE 0x0005",
                "0x000a: PUSHSTR \"x\"",
                "0x0010: END",
            ]
        );
    }

    #[test]
    fn container_round_trip_preserves_code_and_symbols() {
        let p = Program::assemble_str("PUSHSYM a\nDEFINE b\nPUSHVAR b\nEND").unwrap();
        let bytes = p.to_bytes().unwrap();
        let q = Program::read_from(&bytes[..]).unwrap();
        assert_eq!(q.code(), p.code());
        assert_eq!(q.symbols(), p.symbols());
    }

    #[test]
    fn statement_lookup_past_end() {
        let p = Program::assemble_str("END").unwrap();
        assert_eq!(p.statement(0), Some(&Instruction::End));
        assert_eq!(p.statement(1), None);
    }
}
