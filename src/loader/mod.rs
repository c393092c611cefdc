//! Bytecode → statement table.
//!
//! One linear scan decodes every instruction and records it at its byte
//! offset. The operand bytes in between hold [`Instruction::Invalid`], so
//! a jump that lands inside an instruction executes an error instead of
//! reinterpreting operand bytes.

use crate::isa::{Instruction, Opcode, SymbolId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{opcode:02x} at offset 0x{offset:04x}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("{opcode} at offset 0x{offset:04x} is cut off by the end of the code")]
    Truncated { opcode: Opcode, offset: usize },
    #[error("{opcode} at offset 0x{offset:04x} refers to symbol #{index}, but the table has {count} entries")]
    UnknownSymbol { opcode: Opcode, offset: usize, index: u32, count: usize },
    #[error("{opcode} at offset 0x{offset:04x} has negative count {value}")]
    NegativeCount { opcode: Opcode, offset: usize, value: i32 },
    #[error("PUSHCHR at offset 0x{offset:04x}: {value} is not a valid character")]
    InvalidChar { offset: usize, value: i32 },
    #[error("PUSHSTR at offset 0x{offset:04x} holds invalid UTF-8")]
    InvalidString { offset: usize },
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::UnknownOpcode { .. } => "LBVM-D001",
            DecodeError::Truncated { .. } => "LBVM-D002",
            DecodeError::UnknownSymbol { .. } => "LBVM-D003",
            DecodeError::NegativeCount { .. } => "LBVM-D004",
            DecodeError::InvalidChar { .. } => "LBVM-D005",
            DecodeError::InvalidString { .. } => "LBVM-D006",
        }
    }
}

type DecodeResult<T> = Result<T, DecodeError>;

struct Operands<'a> {
    code: &'a [u8],
    pos: usize,
    opcode: Opcode,
    offset: usize,
    symbol_count: usize,
}

impl<'a> Operands<'a> {
    fn bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.code.len());
        let Some(end) = end else {
            return Err(DecodeError::Truncated { opcode: self.opcode, offset: self.offset });
        };
        let slice = &self.code[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn int(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn double(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn target(&mut self) -> DecodeResult<usize> {
        Ok(u32::from_le_bytes(self.array()?) as usize)
    }

    fn count(&mut self) -> DecodeResult<u32> {
        let value = self.int()?;
        u32::try_from(value).map_err(|_| DecodeError::NegativeCount {
            opcode: self.opcode,
            offset: self.offset,
            value,
        })
    }

    fn symbol(&mut self) -> DecodeResult<SymbolId> {
        let index = u32::from_le_bytes(self.array()?);
        if index as usize >= self.symbol_count {
            return Err(DecodeError::UnknownSymbol {
                opcode: self.opcode,
                offset: self.offset,
                index,
                count: self.symbol_count,
            });
        }
        Ok(SymbolId(index))
    }

    fn string(&mut self) -> DecodeResult<Box<str>> {
        let len = u32::from_le_bytes(self.array()?) as usize;
        let bytes = self.bytes(len)?;
        std::str::from_utf8(bytes)
            .map(Box::from)
            .map_err(|_| DecodeError::InvalidString { offset: self.offset })
    }

    fn character(&mut self) -> DecodeResult<char> {
        let value = self.int()?;
        u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .ok_or(DecodeError::InvalidChar { offset: self.offset, value })
    }
}

/// Decode `code` into one statement per byte offset. Symbol operands are
/// checked against a table of `symbol_count` entries.
pub fn decode(code: &[u8], symbol_count: usize) -> DecodeResult<Vec<Instruction>> {
    let mut statements = Vec::with_capacity(code.len());
    let mut offset = 0;

    while offset < code.len() {
        let opcode = Opcode::try_from(code[offset])
            .map_err(|byte| DecodeError::UnknownOpcode { opcode: byte, offset })?;
        let mut r = Operands { code, pos: offset + 1, opcode, offset, symbol_count };

        let instr = match opcode {
            Opcode::PushInt => Instruction::PushInt(r.int()?),
            Opcode::Define => Instruction::Define(r.symbol()?),
            Opcode::PushVar => Instruction::PushVar(r.symbol()?),
            Opcode::BranchFalse => Instruction::BranchFalse(r.target()?),
            Opcode::Enter => {
                let arity = r.count()?;
                Instruction::Enter { arity, name: r.symbol()? }
            }
            Opcode::Call => Instruction::Call(r.count()?),
            Opcode::TailCall => Instruction::TailCall(r.count()?),
            Opcode::Jmp => Instruction::Jmp(r.target()?),
            Opcode::PushLabel => Instruction::PushLabel(r.target()?),
            Opcode::Set => Instruction::Set(r.symbol()?),
            Opcode::PushSym => Instruction::PushSym(r.symbol()?),
            Opcode::MakeClosure => Instruction::MakeClosure(r.count()?),
            Opcode::PushDouble => Instruction::PushDouble(r.double()?),
            Opcode::MakeVar => Instruction::MakeVar(r.symbol()?),
            Opcode::EnterRest => {
                let arity = r.count()?;
                let skip = r.count()?;
                Instruction::EnterRest { arity, skip, name: r.symbol()? }
            }
            Opcode::PushStr => Instruction::PushStr(r.string()?),
            Opcode::PushChar => Instruction::PushChar(r.character()?),
            op => Instruction::nullary(op).ok_or(DecodeError::UnknownOpcode { opcode: op as u8, offset })?,
        };

        let len = r.pos - offset;
        debug_assert_eq!(len, instr.encoded_len());
        statements.push(instr);
        statements.extend(std::iter::repeat_n(Instruction::Invalid, len - 1));
        offset = r.pos;
    }

    tracing::debug!(bytes = code.len(), symbols = symbol_count, "decoded bytecode");
    Ok(statements)
}
