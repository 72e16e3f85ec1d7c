//! Flat symbol table. TinyBasic has a single global namespace, so every
//! frame of a run and every temporary of a lowering unit shares one table.

use indexmap::IndexMap;

use crate::value::Value;

/// Storage slot for one name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slot {
    pub value: Value,
}

/// Insertion-ordered map from names to slots.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    slots: IndexMap<String, Slot>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with an unset value. Returns `false` if it was
    /// already declared, in which case its slot is left untouched.
    pub fn declare(&mut self, name: &str) -> bool {
        if self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(name.to_string(), Slot::default());
        true
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Bind `name` to `value`, declaring it first if needed.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.slots.get_mut(name) {
            Some(slot) => slot.value = value,
            None => {
                self.slots.insert(name.to_string(), Slot { value });
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(name, slot)| (name.as_str(), slot))
    }
}
