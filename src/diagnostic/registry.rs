/// An entry in the error code registry.
#[allow(dead_code)] // `short` is used by tooling; `long` is used by `lbvm explain`
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for tooling
    pub long: &'static str,   // full explanation for `lbvm explain`
}

/// All stable error codes reported by the assembler, loader and machine.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Assembler ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LBVM-A001",
        short: "unknown mnemonic",
        long: r#"## LBVM-A001: unknown mnemonic

The first word of a statement is not an instruction, `FUNCTION` or
`ENDFUNCTION`. Mnemonics are matched without regard to case.

**Example:**

    PUSHINTT 1

**Fix:**

    PUSHINT 1
"#,
    },
    ErrorEntry {
        code: "LBVM-A002",
        short: "wrong number of operands",
        long: r#"## LBVM-A002: wrong number of operands

Every instruction takes a fixed number of operands. `ENTER` takes an
arity and a name, `ENTERR` an arity, a skip count and a name, jumps take
one label, and most others take none.

**Example:**

    ENTER 1
"#,
    },
    ErrorEntry {
        code: "LBVM-A003",
        short: "invalid operand",
        long: r#"## LBVM-A003: invalid operand

An operand does not have the expected form: an integer that does not fit
in 32 bits, a negative count, a label or symbol given as a string, a
non-numeric `PUSHDBL` operand, or a `PUSHCHR` code that is not a Unicode
scalar value.

**Example:**

    PUSHINT 99999999999
"#,
    },
    ErrorEntry {
        code: "LBVM-A004",
        short: "malformed or duplicate label",
        long: r#"## LBVM-A004: malformed or duplicate label

A label declaration is a single word ending in `:` on a line of its own.
Each label may be declared only once per program, and names starting
with `##` are reserved for labels generated by `FUNCTION`.
"#,
    },
    ErrorEntry {
        code: "LBVM-A005",
        short: "undeclared label",
        long: r#"## LBVM-A005: undeclared label

A jump, `PUSHLABEL` or `MAKECLOSURE` target names a label that is never
declared. Labels may be used before they are declared, but they must be
declared somewhere in the program. Label names are case-sensitive.
"#,
    },
    ErrorEntry {
        code: "LBVM-A006",
        short: "malformed FUNCTION header",
        long: r#"## LBVM-A006: malformed FUNCTION header

The header has the form

    FUNCTION name param* [&rest r] [&closingover v*] [&localdefines d*]

Each marker may appear at most once and in this order, and `&rest` must
be followed by exactly one name.
"#,
    },
    ErrorEntry {
        code: "LBVM-A007",
        short: "unbalanced FUNCTION / ENDFUNCTION",
        long: r#"## LBVM-A007: unbalanced FUNCTION / ENDFUNCTION

Every `FUNCTION` must be closed by an `ENDFUNCTION`, and an
`ENDFUNCTION` must close the innermost open `FUNCTION`. Functions may be
nested.
"#,
    },
    ErrorEntry {
        code: "LBVM-A008",
        short: "malformed token",
        long: r#"## LBVM-A008: malformed token

A string literal is not closed before the end of the line, or contains
an escape other than `\n`, `\r`, `\t`, `\0`, `\\` and `\"`.
"#,
    },
    ErrorEntry {
        code: "LBVM-A009",
        short: "program too large",
        long: r#"## LBVM-A009: program too large

Code offsets are stored as 32-bit integers, so a program cannot exceed
4 GiB of bytecode.
"#,
    },
    // ── Container ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LBVM-F001",
        short: "not an LBVM container",
        long: r#"## LBVM-F001: not an LBVM container

The file does not start with the magic bytes `LBVM`, or it was written
by an unsupported container version.
"#,
    },
    ErrorEntry {
        code: "LBVM-F002",
        short: "checksum mismatch",
        long: r#"## LBVM-F002: checksum mismatch

The footer block holds a two-byte checksum over every byte between the
header and the footer. The checksum stored in the file does not match
the contents, so the file was damaged or edited after it was written.
"#,
    },
    ErrorEntry {
        code: "LBVM-F003",
        short: "malformed symbol table",
        long: r#"## LBVM-F003: malformed symbol table

The symbol block must hold a count followed by that many
length-prefixed UTF-8 names, with nothing left over.
"#,
    },
    ErrorEntry {
        code: "LBVM-F004",
        short: "unexpected, duplicate or missing block",
        long: r#"## LBVM-F004: unexpected, duplicate or missing block

A container holds exactly one code block (type 1) and one symbol block
(type 2), followed by the footer (type 255). Any other block type, or a
repeated or absent block, is rejected.
"#,
    },
    ErrorEntry {
        code: "LBVM-F005",
        short: "truncated container",
        long: r#"## LBVM-F005: truncated container

The input ended before the footer block, or could not be read.
"#,
    },
    // ── Loader ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LBVM-D001",
        short: "unknown opcode",
        long: r#"## LBVM-D001: unknown opcode

A byte in the code block does not name an instruction. Every statement
boundary is decoded when a program is loaded, so corrupt code is caught
before it runs.
"#,
    },
    ErrorEntry {
        code: "LBVM-D002",
        short: "truncated instruction",
        long: r#"## LBVM-D002: truncated instruction

The code block ends in the middle of an instruction's operands.
"#,
    },
    ErrorEntry {
        code: "LBVM-D003",
        short: "unknown symbol index",
        long: r#"## LBVM-D003: unknown symbol index

A symbol operand refers past the end of the symbol table.
"#,
    },
    ErrorEntry {
        code: "LBVM-D004",
        short: "negative count",
        long: r#"## LBVM-D004: negative count

An arity, skip or argument count operand is negative.
"#,
    },
    ErrorEntry {
        code: "LBVM-D005",
        short: "invalid character",
        long: r#"## LBVM-D005: invalid character

A `PUSHCHR` operand is not a Unicode scalar value.
"#,
    },
    ErrorEntry {
        code: "LBVM-D006",
        short: "invalid string literal",
        long: r#"## LBVM-D006: invalid string literal

A `PUSHSTR` operand is not valid UTF-8.
"#,
    },
    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LBVM-R001",
        short: "unknown variable",
        long: r#"## LBVM-R001: unknown variable

`PUSHVAR`, `SET` or `MAKEVAR` named a variable that is bound neither in
the current frame nor in the global frame. Bind it first with `DEFINE`,
as a function parameter, or with `&localdefines`.
"#,
    },
    ErrorEntry {
        code: "LBVM-R002",
        short: "unassigned variable",
        long: r#"## LBVM-R002: unassigned variable

The variable exists but was never given a value. `&localdefines`
introduces unassigned locals; assign them with `SET` before reading.
"#,
    },
    ErrorEntry {
        code: "LBVM-R003",
        short: "invalid parameter count",
        long: r#"## LBVM-R003: invalid parameter count

`ENTER` requires exactly its arity in arguments; `ENTERR` requires at
least its arity.

**Example:**

    FUNCTION f a b
      PUSHVAR a
    ENDFUNCTION
    ...
    PUSHINT 1
    PUSHLABEL f
    CALL 1     ; f wants 2
"#,
    },
    ErrorEntry {
        code: "LBVM-R004",
        short: "invalid call target",
        long: r#"## LBVM-R004: invalid call target

`CALL` and `TAILCALL` pop a label or a closure. Any other value cannot
be called.
"#,
    },
    ErrorEntry {
        code: "LBVM-R005",
        short: "invalid instruction position",
        long: r#"## LBVM-R005: invalid instruction position

Control reached an offset that is not the start of an instruction, or
ran past the end of the code without `END`.
"#,
    },
    ErrorEntry {
        code: "LBVM-R006",
        short: "type mismatch",
        long: r#"## LBVM-R006: type mismatch

An instruction found a value of the wrong type on the stack, such as
`ADD` on a string or `PAIR1` on the empty list.
"#,
    },
    ErrorEntry {
        code: "LBVM-R007",
        short: "stack overflow",
        long: r#"## LBVM-R007: stack overflow

One of the three stacks exceeded its capacity. Deep non-tail recursion
exhausts the call stack; calls in tail position should use `TAILCALL`,
which runs in constant stack space.
"#,
    },
    ErrorEntry {
        code: "LBVM-R008",
        short: "stack underflow",
        long: r#"## LBVM-R008: stack underflow

An instruction needed more values than the stack holds, or `RET`
executed with no active call.
"#,
    },
    ErrorEntry {
        code: "LBVM-R009",
        short: "unbalanced exit",
        long: r#"## LBVM-R009: unbalanced exit

At `END` the value stack must hold exactly one value, only the global
frame may remain, and no call may be active.
"#,
    },
    ErrorEntry {
        code: "LBVM-R010",
        short: "division by zero",
        long: r#"## LBVM-R010: division by zero

`DIV`, `IDIV` or `IMOD` divided an integer by zero. Float division
follows IEEE 754 and never raises this error.
"#,
    },
    ErrorEntry {
        code: "LBVM-R011",
        short: "argument out of range",
        long: r#"## LBVM-R011: argument out of range

A string index is outside the string, a character code is not a Unicode
scalar value, a radix is outside 2..=36, a length or bound is
negative, or `MAKESTR` asks for more characters than the machine's
string length limit allows.
"#,
    },
    ErrorEntry {
        code: "LBVM-R012",
        short: "output failed",
        long: r#"## LBVM-R012: output failed

`PRINT` could not write to its output, for example because standard
output was closed.
"#,
    },
];

/// Look up an error entry by code (e.g. `"LBVM-R007"`). Case-insensitive.
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{AsmErrorKind, AssemblyError};
    use crate::vm::{RuntimeError, StackKind};

    #[test]
    fn lookup_known_code() {
        let e = lookup("LBVM-R007").expect("LBVM-R007 should be in registry");
        assert_eq!(e.code, "LBVM-R007");
        assert!(!e.short.is_empty());
        assert!(e.long.contains("LBVM-R007"));
        assert!(lookup("lbvm-a001").is_some());
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup("LBVM-XXXX").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn all_codes_unique() {
        let mut codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        let len_before = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), len_before, "duplicate codes in registry");
    }

    #[test]
    fn all_codes_have_content() {
        for entry in REGISTRY {
            assert!(!entry.short.is_empty(), "{} missing short description", entry.code);
            assert!(entry.long.starts_with(&format!("## {}:", entry.code)), "{} header", entry.code);
        }
    }

    #[test]
    fn reported_codes_are_registered() {
        let asm = AssemblyError { line: 1, column: 1, kind: AsmErrorKind::TooLarge };
        let rt = RuntimeError::StackUnderflow { stack: StackKind::Value };
        for code in [asm.code(), rt.code(), crate::FormatError::Truncated.code()] {
            assert!(lookup(code).is_some(), "{code} not registered");
        }
    }
}
