//! Flat symbol table and the expression type side table.

use rustc_hash::FxHashMap;

use crate::ast::{NodeId, VariableType};
use crate::token::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub slot: u32,
    pub var_type: VariableType,
    pub declared_at: Span,
    /// Set while the checker is inside the body of a loop controlled by this
    /// variable; assignments are rejected while it is set.
    pub loop_control: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, Symbol>,
    slot_count: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` in the next free slot. A name that already exists keeps
    /// its original entry, which is handed back as the error.
    pub fn declare(
        &mut self,
        name: &str,
        var_type: VariableType,
        declared_at: Span,
    ) -> Result<u32, &Symbol> {
        if self.symbols.contains_key(name) {
            return Err(&self.symbols[name]);
        }
        let slot = self.slot_count;
        self.slot_count += 1;
        self.symbols.insert(
            name.to_string(),
            Symbol {
                slot,
                var_type,
                declared_at,
                loop_control: false,
            },
        );
        Ok(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn slot(&self, name: &str) -> Option<u32> {
        self.lookup(name).map(|symbol| symbol.slot)
    }

    /// Sets the loop-control flag and returns its previous value.
    pub fn set_loop_control(&mut self, name: &str, active: bool) -> bool {
        match self.symbols.get_mut(name) {
            Some(symbol) => std::mem::replace(&mut symbol.loop_control, active),
            None => false,
        }
    }

    /// Number of slots handed out to declared variables.
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Resolved type of every expression node, filled in by the checker.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: FxHashMap<NodeId, VariableType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: NodeId, var_type: VariableType) {
        let previous = self.types.insert(id, var_type);
        debug_assert!(previous.is_none(), "type of {id:?} recorded twice");
    }

    /// `VariableType::None` for nodes the checker never visited.
    pub fn get(&self, id: NodeId) -> VariableType {
        self.types.get(&id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
