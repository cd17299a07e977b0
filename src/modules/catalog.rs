//! Catalog of known module constructors

use std::collections::BTreeMap;

use super::trait_def::ModuleCtor;

/// The discoverable set of modules.
///
/// Registering a name that already exists replaces its constructor, and
/// entries can be removed while a module built from them is still loaded -
/// that is how a definition "vanishes" out from under a reload.
#[derive(Default)]
pub struct ModuleCatalog {
    ctors: BTreeMap<String, ModuleCtor>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, ctor: ModuleCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.ctors.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<ModuleCtor> {
        self.ctors.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.ctors.keys().cloned().collect()
    }
}
