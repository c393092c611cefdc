pub mod symbol;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use symbol::{Interner, Symbol};

/// A runtime value. Everything the machine pushes, binds, or captures is one
/// of these.
#[derive(Clone)]
pub enum Value {
    Int(i32),
    Float(f64),
    Bool(bool),
    Char(char),
    /// Shared, mutable text. `SETSTRREF` writes through every reference.
    Str(Rc<RefCell<String>>),
    Symbol(Symbol),
    Pair(Rc<Pair>),
    /// The empty list.
    Nil,
    /// Instruction-pointer literal: a byte offset into the code.
    Ip(usize),
    Closure(Rc<Closure>),
    /// A variable box in transit. Only appears on the value stack while a
    /// closure call hands its captures to the callee's prologue.
    Variable(Variable),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Value {
        Value::Str(Rc::new(RefCell::new(text.into())))
    }

    pub fn cons(first: Value, second: Value) -> Value {
        Value::Pair(Rc::new(Pair { first, second }))
    }

    /// Builds a proper list ending in [`Value::Nil`].
    pub fn list(items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>) -> Value {
        items.into_iter().rev().fold(Value::Nil, |tail, item| Value::cons(item, tail))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Nil => "empty list",
            Value::Ip(_) => "label",
            Value::Closure(_) => "closure",
            Value::Variable(_) => "variable",
        }
    }

    /// Only the boolean `false` is false; every other value counts as true.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Walks a pair chain. Stops at `Nil`; a non-pair tail is yielded once as
    /// [`ListItem::Tail`].
    pub fn iter(&self) -> ListIter {
        ListIter { next: self.clone() }
    }

    /// Identity comparison used by `OBJEQUAL`: value types by value,
    /// everything else by reference.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Ip(a), Value::Ip(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Symbol(a), Value::Symbol(b)) => a.ptr_eq(b),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Variable(a), Value::Variable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, quoted: bool) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Bool(true) => f.write_str("#t"),
            Value::Bool(false) => f.write_str("#f"),
            Value::Char(c) if quoted => match c {
                ' ' => f.write_str("#\\space"),
                '\n' => f.write_str("#\\newline"),
                _ => write!(f, "#\\{c}"),
            },
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) if quoted => write!(f, "\"{}\"", crate::lexer::escape(&s.borrow())),
            Value::Str(s) => f.write_str(&s.borrow()),
            Value::Symbol(sym) => f.write_str(sym.name()),
            Value::Nil => f.write_str("()"),
            Value::Pair(_) => {
                f.write_str("(")?;
                for (i, item) in self.iter().enumerate() {
                    match item {
                        ListItem::Element(v) => {
                            if i > 0 {
                                f.write_str(" ")?;
                            }
                            v.fmt_with(f, quoted)?;
                        }
                        ListItem::Tail(v) => {
                            f.write_str(" . ")?;
                            v.fmt_with(f, quoted)?;
                        }
                    }
                }
                f.write_str(")")
            }
            Value::Ip(ip) => write!(f, "<label 0x{ip:04x}>"),
            Value::Closure(c) => write!(f, "<closure 0x{:04x}/{}>", c.target, c.captured.len()),
            Value::Variable(_) => f.write_str("<variable>"),
        }
    }
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from ints.
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, false)
    }
}

/// Debug output is the "write" form: strings quoted and escaped, chars as
/// `#\c`.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, true)
    }
}

/// Structural equality for hosts and tests. The machine itself uses
/// [`Value::is_identical`] or the numeric comparisons.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self.clone(), other.clone());
        loop {
            let next = match (&a, &b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if Rc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.first != y.first {
                        return false;
                    }
                    (x.second.clone(), y.second.clone())
                }
                (Value::Str(x), Value::Str(y)) => return *x.borrow() == *y.borrow(),
                (Value::Symbol(x), Value::Symbol(y)) => return x.name() == y.name(),
                _ => return a.is_identical(&b),
            };
            (a, b) = next;
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

// ── Pairs ───────────────────────────────────────────────────────────────────

pub struct Pair {
    pub first: Value,
    pub second: Value,
}

// Unlinks nested pairs through an explicit worklist so dropping a deep
// structure, along either the car or the cdr, cannot overflow the native stack.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach(self, &mut pending);
        while let Some(rc) = pending.pop() {
            if let Ok(mut pair) = Rc::try_unwrap(rc) {
                detach(&mut pair, &mut pending);
            }
        }
    }
}

fn detach(pair: &mut Pair, pending: &mut Vec<Rc<Pair>>) {
    for slot in [&mut pair.first, &mut pair.second] {
        if let Value::Pair(rc) = std::mem::replace(slot, Value::Nil) {
            pending.push(rc);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Element(Value),
    Tail(Value),
}

pub struct ListIter {
    next: Value,
}

impl Iterator for ListIter {
    type Item = ListItem;

    fn next(&mut self) -> Option<ListItem> {
        match std::mem::replace(&mut self.next, Value::Nil) {
            Value::Nil => None,
            Value::Pair(pair) => {
                self.next = pair.second.clone();
                Some(ListItem::Element(pair.first.clone()))
            }
            tail => Some(ListItem::Tail(tail)),
        }
    }
}

// ── Variables and closures ──────────────────────────────────────────────────

/// A shared, mutable binding box. `None` means declared but unassigned.
#[derive(Clone, Default)]
pub struct Variable(Rc<RefCell<Option<Value>>>);

impl Variable {
    pub fn new(value: Value) -> Self {
        Variable(Rc::new(RefCell::new(Some(value))))
    }

    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn is_assigned(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            Some(v) => write!(f, "Variable({v:?})"),
            None => f.write_str("Variable(<unassigned>)"),
        }
    }
}

/// A code address plus the variable boxes it closed over, in declaration order.
pub struct Closure {
    pub target: usize,
    pub captured: Vec<Variable>,
}
