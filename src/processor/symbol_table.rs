//! Two-scope symbol table: class-level statics/fields and subroutine-level
//! arguments/locals. Lookups walk the scopes innermost first.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::error::{CompileResult, UndefinedSymbolSnafu};
use crate::processor::vm::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Var,
}

impl Kind {
    const ALL: [Kind; 4] = [Kind::Static, Kind::Field, Kind::Argument, Kind::Var];

    fn slot(self) -> usize {
        match self {
            Kind::Static => 0,
            Kind::Field => 1,
            Kind::Argument => 2,
            Kind::Var => 3,
        }
    }

    /// Storage segment a variable of this kind lives in.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Var => Segment::Local,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Var => "var",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub ty: String,
    pub kind: Kind,
    pub index: u16,
}

/// One scope frame: its entries plus one monotonic counter per kind.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    entries: HashMap<String, SymbolEntry>,
    counters: [u16; 4],
}

impl Scope {
    /// Assigns the next index for `kind`. A name that is already present is
    /// replaced without complaint.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> u16 {
        let index = self.counters[kind.slot()];
        self.counters[kind.slot()] += 1;
        self.entries.insert(
            name.to_string(),
            SymbolEntry {
                name: name.to_string(),
                ty: ty.to_string(),
                kind,
                index,
            },
        );
        index
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        self.counters[kind.slot()]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.counters = [0; 4];
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    Class,
    Subroutine,
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    class: Scope,
    subroutine: Scope,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statics and fields land in class scope, arguments and locals in subroutine scope.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> u16 {
        self.scope_mut(Self::level_of(kind)).define(name, ty, kind)
    }

    pub fn level_of(kind: Kind) -> ScopeLevel {
        match kind {
            Kind::Static | Kind::Field => ScopeLevel::Class,
            Kind::Argument | Kind::Var => ScopeLevel::Subroutine,
        }
    }

    pub fn scope(&self, level: ScopeLevel) -> &Scope {
        match level {
            ScopeLevel::Class => &self.class,
            ScopeLevel::Subroutine => &self.subroutine,
        }
    }

    fn scope_mut(&mut self, level: ScopeLevel) -> &mut Scope {
        match level {
            ScopeLevel::Class => &mut self.class,
            ScopeLevel::Subroutine => &mut self.subroutine,
        }
    }

    /// Subroutine scope shadows class scope.
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        [ScopeLevel::Subroutine, ScopeLevel::Class]
            .into_iter()
            .find_map(|level| self.scope(level).get(name))
    }

    fn resolve(&self, name: &str) -> CompileResult<&SymbolEntry> {
        match self.lookup(name) {
            Some(entry) => Ok(entry),
            None => UndefinedSymbolSnafu { name }.fail(),
        }
    }

    pub fn kind_of(&self, name: &str) -> CompileResult<Kind> {
        self.resolve(name).map(|e| e.kind)
    }

    pub fn type_of(&self, name: &str) -> CompileResult<&str> {
        self.resolve(name).map(|e| e.ty.as_str())
    }

    pub fn index_of(&self, name: &str) -> CompileResult<u16> {
        self.resolve(name).map(|e| e.index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        self.scope(Self::level_of(kind)).var_count(kind)
    }

    /// Starts a fresh subroutine: drops its entries and zeroes all four counters.
    pub fn clear(&mut self) {
        self.subroutine.clear();
    }

    /// Drops everything, including class scope. Used between classes.
    pub fn reset(&mut self) {
        self.class.clear();
        self.subroutine.clear();
    }

    /// Counter values of every kind in subroutine scope.
    pub fn subroutine_counters(&self) -> [u16; 4] {
        Kind::ALL.map(|k| self.subroutine.var_count(k))
    }
}
