use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An interned name. Two symbols are equal iff they came out of the same
/// [`Interner`] for the same text, so comparison and hashing are by pointer.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0) as *const u8, state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

/// Name → symbol table for one program run.
#[derive(Default)]
pub struct Interner {
    table: HashMap<Rc<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.table.get(name) {
            return sym.clone();
        }
        let text: Rc<str> = Rc::from(name);
        let sym = Symbol(Rc::clone(&text));
        self.table.insert(text, sym.clone());
        sym
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("fac");
        let b = interner.intern("fac");
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn separate_interners_do_not_mix() {
        let mut one = Interner::new();
        let mut two = Interner::new();
        assert_ne!(one.intern("x"), two.intern("x"));
    }

    #[test]
    fn symbols_usable_as_map_keys() {
        let mut interner = Interner::new();
        let mut map = HashMap::new();
        map.insert(interner.intern("n"), 1);
        assert_eq!(map.get(&interner.intern("n")), Some(&1));
        assert_eq!(map.get(&interner.intern("m")), None);
    }
}
