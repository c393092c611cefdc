//! Operand coercion and the pure parts of the arithmetic, string and
//! conversion instructions. Operands arrive in push order: `a` was under `b`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::RuntimeError;
use crate::value::{format_float, Value};

type OpResult<T> = Result<T, RuntimeError>;

fn mismatch(instruction: &'static str, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch { instruction, expected, found: found.type_name() }
}

// ── Numbers ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Num {
    Int(i32),
    Float(f64),
}

impl Num {
    fn of(instruction: &'static str, v: &Value) -> OpResult<Num> {
        match v {
            Value::Int(n) => Ok(Num::Int(*n)),
            Value::Float(x) => Ok(Num::Float(*x)),
            other => Err(mismatch(instruction, "number", other)),
        }
    }

    fn float(self) -> f64 {
        match self {
            Num::Int(n) => f64::from(n),
            Num::Float(x) => x,
        }
    }

    /// Floats truncate toward zero (saturating).
    fn int(self) -> i32 {
        match self {
            Num::Int(n) => n,
            Num::Float(x) => x as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    IMod,
}

/// Int op int stays int (wrapping); any float operand makes both floats.
/// `Div` of two ints is an int only when the division is exact.
pub(crate) fn arith(op: Arith, instruction: &'static str, a: &Value, b: &Value) -> OpResult<Value> {
    let (a, b) = (Num::of(instruction, a)?, Num::of(instruction, b)?);
    match op {
        Arith::IDiv | Arith::IMod => {
            let (x, y) = (a.int(), b.int());
            if y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(if op == Arith::IDiv { x.wrapping_div(y) } else { x.wrapping_rem(y) }))
        }
        _ => match (a, b) {
            (Num::Int(x), Num::Int(y)) => match op {
                Arith::Add => Ok(Value::Int(x.wrapping_add(y))),
                Arith::Sub => Ok(Value::Int(x.wrapping_sub(y))),
                Arith::Mul => Ok(Value::Int(x.wrapping_mul(y))),
                _ if y == 0 => Err(RuntimeError::DivisionByZero),
                _ if x.wrapping_rem(y) == 0 => Ok(Value::Int(x.wrapping_div(y))),
                _ => Ok(Value::Float(f64::from(x) / f64::from(y))),
            },
            _ => {
                let (x, y) = (a.float(), b.float());
                Ok(Value::Float(match op {
                    Arith::Add => x + y,
                    Arith::Sub => x - y,
                    Arith::Mul => x * y,
                    _ => x / y,
                }))
            }
        },
    }
}

/// Numeric comparison with the same int/float coercion as [`arith`]. NaN
/// compares false against everything.
pub(crate) fn compare_numbers(
    instruction: &'static str,
    a: &Value,
    b: &Value,
    test: fn(Ordering) -> bool,
) -> OpResult<Value> {
    let ordering = match (Num::of(instruction, a)?, Num::of(instruction, b)?) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        (x, y) => x.float().partial_cmp(&y.float()),
    };
    Ok(Value::Bool(ordering.is_some_and(test)))
}

// ── Accessors ───────────────────────────────────────────────────────────────

pub(crate) fn int(instruction: &'static str, v: &Value) -> OpResult<i32> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(mismatch(instruction, "int", other)),
    }
}

pub(crate) fn string(instruction: &'static str, v: &Value) -> OpResult<Rc<RefCell<String>>> {
    match v {
        Value::Str(s) => Ok(Rc::clone(s)),
        other => Err(mismatch(instruction, "string", other)),
    }
}

pub(crate) fn character(instruction: &'static str, v: &Value) -> OpResult<char> {
    match v {
        Value::Char(c) => Ok(*c),
        other => Err(mismatch(instruction, "char", other)),
    }
}

fn index(instruction: &'static str, i: i32, len: usize) -> OpResult<usize> {
    usize::try_from(i)
        .ok()
        .filter(|&i| i <= len)
        .ok_or(RuntimeError::IndexOutOfRange { instruction, index: i, len })
}

// ── Strings and characters ──────────────────────────────────────────────────

pub(crate) fn compare_strings(
    instruction: &'static str,
    a: &Value,
    b: &Value,
    case_insensitive: bool,
) -> OpResult<Ordering> {
    let (a, b) = (string(instruction, a)?, string(instruction, b)?);
    let (a, b) = (a.borrow(), b.borrow());
    Ok(if case_insensitive {
        a.to_uppercase().cmp(&b.to_uppercase())
    } else {
        a.as_str().cmp(b.as_str())
    })
}

pub(crate) fn compare_chars(
    instruction: &'static str,
    a: &Value,
    b: &Value,
    case_insensitive: bool,
) -> OpResult<Ordering> {
    let (a, b) = (character(instruction, a)?, character(instruction, b)?);
    Ok(if case_insensitive { a.to_uppercase().cmp(b.to_uppercase()) } else { a.cmp(&b) })
}

pub(crate) fn substring(s: &Value, start: &Value, end: &Value) -> OpResult<Value> {
    const NAME: &str = "SUBSTR";
    let s = string(NAME, s)?;
    let chars: Vec<char> = s.borrow().chars().collect();
    let start = index(NAME, int(NAME, start)?, chars.len())?;
    let end_raw = int(NAME, end)?;
    let end = index(NAME, end_raw, chars.len())?;
    if end < start {
        return Err(RuntimeError::IndexOutOfRange { instruction: NAME, index: end_raw, len: chars.len() });
    }
    Ok(Value::string(chars[start..end].iter().collect::<String>()))
}

pub(crate) fn string_ref(s: &Value, i: &Value) -> OpResult<Value> {
    const NAME: &str = "STRREF";
    let s = string(NAME, s)?;
    let i = int(NAME, i)?;
    let s = s.borrow();
    let len = s.chars().count();
    usize::try_from(i)
        .ok()
        .and_then(|idx| s.chars().nth(idx))
        .map(Value::Char)
        .ok_or(RuntimeError::IndexOutOfRange { instruction: NAME, index: i, len })
}

/// Writes `c` at character index `i`, in place.
pub(crate) fn set_string_ref(s: &Value, i: &Value, c: &Value) -> OpResult<Value> {
    const NAME: &str = "SETSTRREF";
    let s = string(NAME, s)?;
    let i = int(NAME, i)?;
    let c = character(NAME, c)?;
    let mut chars: Vec<char> = s.borrow().chars().collect();
    let len = chars.len();
    let slot = usize::try_from(i)
        .ok()
        .and_then(|idx| chars.get_mut(idx))
        .ok_or(RuntimeError::IndexOutOfRange { instruction: NAME, index: i, len })?;
    *slot = c;
    *s.borrow_mut() = chars.into_iter().collect();
    Ok(Value::Char(c))
}

pub(crate) fn append(a: &Value, b: &Value) -> OpResult<Value> {
    let (a, b) = (string("STRAPPEND", a)?, string("STRAPPEND", b)?);
    let mut out = a.borrow().clone();
    out.push_str(&b.borrow());
    Ok(Value::string(out))
}

pub(crate) fn make_string(n: &Value, limit: usize) -> OpResult<Value> {
    let n = int("MAKESTR", n)?;
    let len = usize::try_from(n)
        .map_err(|_| RuntimeError::NegativeArgument { instruction: "MAKESTR", value: n })?;
    if len > limit {
        return Err(RuntimeError::StringTooLong { instruction: "MAKESTR", len, limit });
    }
    Ok(Value::string(" ".repeat(len)))
}

pub(crate) fn int_to_char(n: &Value) -> OpResult<Value> {
    let n = int("INTTOCHR", n)?;
    u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Char)
        .ok_or(RuntimeError::InvalidChar { instruction: "INTTOCHR", value: n })
}

// ── Number ↔ string ─────────────────────────────────────────────────────────

fn radix(instruction: &'static str, v: &Value) -> OpResult<u32> {
    let r = int(instruction, v)?;
    match u32::try_from(r) {
        Ok(r @ 2..=36) => Ok(r),
        _ => Err(RuntimeError::InvalidRadix { instruction, radix: r }),
    }
}

/// `#f` when the text does not parse. Text containing `.` parses as a
/// float and only in radix 10.
pub(crate) fn string_to_number(s: &Value, r: &Value) -> OpResult<Value> {
    const NAME: &str = "STRTONUM";
    let s = string(NAME, s)?;
    let r = radix(NAME, r)?;
    let s = s.borrow();
    let text = s.trim();
    let parsed = if text.contains('.') {
        if r != 10 {
            None
        } else {
            text.parse::<f64>().ok().map(Value::Float)
        }
    } else {
        i32::from_str_radix(text, r).ok().map(Value::Int)
    };
    Ok(parsed.unwrap_or(Value::Bool(false)))
}

/// `#f` for non-numbers and for floats in any radix but 10.
pub(crate) fn number_to_string(v: &Value, r: &Value) -> OpResult<Value> {
    const NAME: &str = "NUMTOSTR";
    let r = radix(NAME, r)?;
    Ok(match v {
        Value::Float(x) if r == 10 => Value::string(format_float(*x)),
        Value::Int(n) => Value::string(format_radix(*n, r)),
        _ => Value::Bool(false),
    })
}

fn format_radix(n: i32, radix: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if radix == 10 {
        return n.to_string();
    }
    let mut magnitude = n.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(magnitude % radix) as usize]);
        magnitude /= radix;
        if magnitude == 0 {
            break;
        }
    }
    if n < 0 {
        digits.push(b'-');
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
