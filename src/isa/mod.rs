//! Instruction set: the opcode table, operand shapes, and the decoded
//! [`Instruction`] form the machine executes.
//!
//! Every opcode is one byte followed by its operands. Integers, symbol
//! indices and jump targets are 4-byte little-endian, doubles are 8-byte
//! IEEE-754 little-endian, strings are a 4-byte byte length plus UTF-8 bytes.

use std::fmt;

/// Operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    None,
    Int,
    Symbol,
    Target,
    Double,
    Str,
    /// arity, name
    Enter,
    /// arity, skip, name
    EnterRest,
}

impl Shape {
    /// Number of operand tokens the assembler expects.
    pub const fn operand_count(self) -> usize {
        match self {
            Shape::None => 0,
            Shape::Int | Shape::Symbol | Shape::Target | Shape::Double | Shape::Str => 1,
            Shape::Enter => 2,
            Shape::EnterRest => 3,
        }
    }

    /// Encoded size including the opcode byte. For [`Shape::Str`] this is the
    /// size without the payload bytes.
    pub const fn base_len(self) -> usize {
        match self {
            Shape::None => 1,
            Shape::Int | Shape::Symbol | Shape::Target | Shape::Str => 5,
            Shape::Double | Shape::Enter => 9,
            Shape::EnterRest => 13,
        }
    }
}

macro_rules! define_opcodes {
    ( $( $(#[$doc:meta])* $name:ident = $code:literal, $mnemonic:literal => $shape:ident ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $( $(#[$doc])* $name = $code, )*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name ),* ];

            pub const fn mnemonic(self) -> &'static str {
                match self { $( Opcode::$name => $mnemonic, )* }
            }

            pub const fn shape(self) -> Shape {
                match self { $( Opcode::$name => Shape::$shape, )* }
            }

            /// Mnemonics are matched case-insensitively.
            pub fn from_mnemonic(word: &str) -> Option<Opcode> {
                $( if word.eq_ignore_ascii_case($mnemonic) { return Some(Opcode::$name); } )*
                None
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(byte: u8) -> Result<Self, u8> {
                match byte {
                    $( $code => Ok(Opcode::$name), )*
                    other => Err(other),
                }
            }
        }
    };
}

define_opcodes! {
    /// Halt; the result is the single value left on the stack.
    End = 0x00, "END" => None,
    Pop = 0x01, "POP" => None,
    PushInt = 0x02, "PUSHINT" => Int,
    Define = 0x03, "DEFINE" => Symbol,
    PushVar = 0x04, "PUSHVAR" => Symbol,
    NumEqual = 0x05, "NUMEQUAL" => None,
    Add = 0x06, "ADD" => None,
    Sub = 0x07, "SUB" => None,
    Mul = 0x08, "MUL" => None,
    Div = 0x09, "DIV" => None,
    IDiv = 0x0a, "IDIV" => None,
    /// Pop; branch when the value is boolean false.
    BranchFalse = 0x0b, "BFALSE" => Target,
    Enter = 0x0c, "ENTER" => Enter,
    Ret = 0x0d, "RET" => None,
    Call = 0x0e, "CALL" => Int,
    TailCall = 0x0f, "TAILCALL" => Int,
    Jmp = 0x10, "JMP" => Target,
    PushLabel = 0x11, "PUSHLABEL" => Target,
    IMod = 0x12, "IMOD" => None,
    Set = 0x13, "SET" => Symbol,
    PushSym = 0x14, "PUSHSYM" => Symbol,
    PushTrue = 0x15, "PUSHTRUE" => None,
    PushFalse = 0x16, "PUSHFALSE" => None,
    MakeClosure = 0x17, "MAKECLOSURE" => Int,
    NumLt = 0x18, "NUMLT" => None,
    NumLe = 0x19, "NUMLE" => None,
    NumGt = 0x1a, "NUMGT" => None,
    NumGe = 0x1b, "NUMGE" => None,
    PushDouble = 0x1c, "PUSHDBL" => Double,
    MakeVar = 0x1d, "MAKEVAR" => Symbol,
    /// Enter with a trailing rest parameter.
    EnterRest = 0x1e, "ENTERR" => EnterRest,
    MakePair = 0x1f, "MAKEPAIR" => None,
    IsPair = 0x20, "ISPAIR" => None,
    First = 0x21, "PAIR1" => None,
    Second = 0x22, "PAIR2" => None,
    PushNil = 0x23, "PUSHNIL" => None,
    Random = 0x24, "RANDOM" => None,
    ObjEqual = 0x25, "OBJEQUAL" => None,
    IsNull = 0x26, "ISNULL" => None,
    Print = 0x27, "PRINT" => None,
    PushStr = 0x28, "PUSHSTR" => Str,
    IsNumber = 0x29, "ISNUMBER" => None,
    IsString = 0x2a, "ISSTRING" => None,
    StrEqual = 0x2b, "STREQUAL" => None,
    StrEqualCi = 0x2c, "STREQUALCI" => None,
    StrLt = 0x2d, "STRLT" => None,
    StrLtCi = 0x2e, "STRLTCI" => None,
    StrGt = 0x2f, "STRGT" => None,
    StrGtCi = 0x30, "STRGTCI" => None,
    StrLen = 0x31, "STRLEN" => None,
    Substr = 0x32, "SUBSTR" => None,
    StrAppend = 0x33, "STRAPPEND" => None,
    PushChar = 0x34, "PUSHCHR" => Int,
    IsChar = 0x35, "ISCHAR" => None,
    ChrEqual = 0x36, "CHREQUAL" => None,
    ChrEqualCi = 0x37, "CHREQUALCI" => None,
    ChrLt = 0x38, "CHRLT" => None,
    ChrLtCi = 0x39, "CHRLTCI" => None,
    ChrGt = 0x3a, "CHRGT" => None,
    ChrGtCi = 0x3b, "CHRGTCI" => None,
    ChrToInt = 0x3c, "CHRTOINT" => None,
    IntToChr = 0x3d, "INTTOCHR" => None,
    StrRef = 0x3e, "STRREF" => None,
    SetStrRef = 0x3f, "SETSTRREF" => None,
    MakeStr = 0x40, "MAKESTR" => None,
    StrToSym = 0x41, "STRTOSYM" => None,
    SymToStr = 0x42, "SYMTOSTR" => None,
    StrToNum = 0x43, "STRTONUM" => None,
    NumToStr = 0x44, "NUMTOSTR" => None,
    /// Never valid to execute. Also what every mid-instruction offset decodes to.
    Error = 0xff, "ERROR" => None,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Index into a program's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A decoded statement. Jump targets are byte offsets into the code.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    End,
    Pop,
    PushInt(i32),
    Define(SymbolId),
    PushVar(SymbolId),
    NumEqual,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    BranchFalse(usize),
    Enter { arity: u32, name: SymbolId },
    Ret,
    Call(u32),
    TailCall(u32),
    Jmp(usize),
    PushLabel(usize),
    IMod,
    Set(SymbolId),
    PushSym(SymbolId),
    PushTrue,
    PushFalse,
    MakeClosure(u32),
    NumLt,
    NumLe,
    NumGt,
    NumGe,
    PushDouble(f64),
    MakeVar(SymbolId),
    EnterRest { arity: u32, skip: u32, name: SymbolId },
    MakePair,
    IsPair,
    First,
    Second,
    PushNil,
    Random,
    ObjEqual,
    IsNull,
    Print,
    PushStr(Box<str>),
    IsNumber,
    IsString,
    StrEqual,
    StrEqualCi,
    StrLt,
    StrLtCi,
    StrGt,
    StrGtCi,
    StrLen,
    Substr,
    StrAppend,
    PushChar(char),
    IsChar,
    ChrEqual,
    ChrEqualCi,
    ChrLt,
    ChrLtCi,
    ChrGt,
    ChrGtCi,
    ChrToInt,
    IntToChr,
    StrRef,
    SetStrRef,
    MakeStr,
    StrToSym,
    SymToStr,
    StrToNum,
    NumToStr,
    /// Executing this is a runtime error: either an explicit `ERROR` opcode or
    /// a jump that landed inside another instruction's operands.
    Invalid,
}

macro_rules! nullary_instructions {
    ( $( $name:ident ),* $(,)? ) => {
        impl Instruction {
            /// The instruction for an opcode without operands.
            pub fn nullary(op: Opcode) -> Option<Instruction> {
                match op {
                    $( Opcode::$name => Some(Instruction::$name), )*
                    Opcode::Error => Some(Instruction::Invalid),
                    _ => None,
                }
            }

            pub fn opcode(&self) -> Opcode {
                match self {
                    $( Instruction::$name => Opcode::$name, )*
                    Instruction::PushInt(_) => Opcode::PushInt,
                    Instruction::Define(_) => Opcode::Define,
                    Instruction::PushVar(_) => Opcode::PushVar,
                    Instruction::BranchFalse(_) => Opcode::BranchFalse,
                    Instruction::Enter { .. } => Opcode::Enter,
                    Instruction::Call(_) => Opcode::Call,
                    Instruction::TailCall(_) => Opcode::TailCall,
                    Instruction::Jmp(_) => Opcode::Jmp,
                    Instruction::PushLabel(_) => Opcode::PushLabel,
                    Instruction::Set(_) => Opcode::Set,
                    Instruction::PushSym(_) => Opcode::PushSym,
                    Instruction::MakeClosure(_) => Opcode::MakeClosure,
                    Instruction::PushDouble(_) => Opcode::PushDouble,
                    Instruction::MakeVar(_) => Opcode::MakeVar,
                    Instruction::EnterRest { .. } => Opcode::EnterRest,
                    Instruction::PushStr(_) => Opcode::PushStr,
                    Instruction::PushChar(_) => Opcode::PushChar,
                    Instruction::Invalid => Opcode::Error,
                }
            }
        }
    };
}

nullary_instructions! {
    End, Pop, NumEqual, Add, Sub, Mul, Div, IDiv, Ret, IMod, PushTrue, PushFalse,
    NumLt, NumLe, NumGt, NumGe, MakePair, IsPair, First, Second, PushNil, Random,
    ObjEqual, IsNull, Print, IsNumber, IsString, StrEqual, StrEqualCi, StrLt,
    StrLtCi, StrGt, StrGtCi, StrLen, Substr, StrAppend, IsChar, ChrEqual,
    ChrEqualCi, ChrLt, ChrLtCi, ChrGt, ChrGtCi, ChrToInt, IntToChr, StrRef,
    SetStrRef, MakeStr, StrToSym, SymToStr, StrToNum, NumToStr,
}

impl Instruction {
    /// Bytes this instruction occupies in the code block.
    pub fn encoded_len(&self) -> usize {
        let base = self.opcode().shape().base_len();
        match self {
            Instruction::PushStr(s) => base + s.len(),
            _ => base,
        }
    }

    /// Listing form, resolving symbol indices against `symbols`.
    pub fn render(&self, symbols: &[String]) -> String {
        let m = self.opcode().mnemonic();
        let sym = |id: &SymbolId| symbols.get(id.index()).map(String::as_str).unwrap_or("<?>");
        match self {
            Instruction::PushInt(n) => format!("{m} {n}"),
            Instruction::Call(n) | Instruction::TailCall(n) | Instruction::MakeClosure(n) => {
                format!("{m} {n}")
            }
            Instruction::Define(id)
            | Instruction::PushVar(id)
            | Instruction::Set(id)
            | Instruction::PushSym(id)
            | Instruction::MakeVar(id) => format!("{m} {}", sym(id)),
            Instruction::BranchFalse(t) | Instruction::Jmp(t) | Instruction::PushLabel(t) => {
                format!("{m} 0x{t:04x}")
            }
            Instruction::Enter { arity, name } => format!("{m} {arity} {}", sym(name)),
            Instruction::EnterRest { arity, skip, name } => {
                format!("{m} {arity} {skip} {}", sym(name))
            }
            Instruction::PushDouble(x) => format!("{m} {x:?}"),
            Instruction::PushStr(s) => format!("{m} \"{}\"", crate::lexer::escape(s)),
            Instruction::PushChar(c) => format!("{m} {}", u32::from(*c)),
            _ => m.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_round_trip() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8), Ok(op), "{op}");
        }
        assert_eq!(Opcode::try_from(0xfe), Err(0xfe));
    }

    #[test]
    fn mnemonics_are_unique_and_case_insensitive() {
        let mut names: Vec<_> = Opcode::ALL.iter().map(|op| op.mnemonic()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Opcode::ALL.len());
        assert_eq!(Opcode::from_mnemonic("pushint"), Some(Opcode::PushInt));
        assert_eq!(Opcode::from_mnemonic("BFALSE"), Some(Opcode::BranchFalse));
        assert_eq!(Opcode::from_mnemonic("FUNCTION"), None);
    }

    #[test]
    fn fixed_codes_of_core_opcodes() {
        assert_eq!(Opcode::End as u8, 0x00);
        assert_eq!(Opcode::Enter as u8, 0x0c);
        assert_eq!(Opcode::PushDouble as u8, 0x1c);
        assert_eq!(Opcode::MakeVar as u8, 0x1d);
        assert_eq!(Opcode::Error as u8, 0xff);
    }

    #[test]
    fn every_nullary_opcode_maps_back() {
        for &op in Opcode::ALL {
            if op.shape() == Shape::None {
                let instr = Instruction::nullary(op).expect("nullary opcode");
                assert_eq!(instr.opcode(), op);
                assert_eq!(instr.encoded_len(), 1);
            } else {
                assert!(Instruction::nullary(op).is_none(), "{op}");
            }
        }
    }

    #[test]
    fn encoded_lengths() {
        let name = SymbolId(0);
        assert_eq!(Instruction::PushInt(1).encoded_len(), 5);
        assert_eq!(Instruction::PushDouble(1.5).encoded_len(), 9);
        assert_eq!(Instruction::Enter { arity: 1, name }.encoded_len(), 9);
        assert_eq!(Instruction::EnterRest { arity: 1, skip: 0, name }.encoded_len(), 13);
        assert_eq!(Instruction::PushStr("héllo".into()).encoded_len(), 5 + 6);
    }

    #[test]
    fn render_resolves_symbols() {
        let symbols = vec!["fac".to_string(), "n".to_string()];
        let enter = Instruction::Enter { arity: 1, name: SymbolId(0) };
        assert_eq!(enter.render(&symbols), "ENTER 1 fac");
        assert_eq!(Instruction::PushVar(SymbolId(1)).render(&symbols), "PUSHVAR n");
        assert_eq!(Instruction::Jmp(0x2a).render(&symbols), "JMP 0x002a");
        assert_eq!(Instruction::PushStr("a\n".into()).render(&symbols), r#"PUSHSTR "a\n""#);
        assert_eq!(Instruction::PushDouble(3.0).render(&symbols), "PUSHDBL 3.0");
    }
}
