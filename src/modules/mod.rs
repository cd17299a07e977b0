//! Modules - the hot-swappable feature packages and their manager

pub mod catalog;
pub mod core;
pub mod manager;
pub mod moderation;
pub mod trait_def;
pub mod utils;

pub use catalog::ModuleCatalog;
pub use manager::ModuleManager;
pub use trait_def::{BotModule, ModuleContext, ModuleCtor, Registrar};

/// The compiled-in module set.
pub fn built_in_catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    catalog.register("core", self::core::construct);
    catalog.register("moderation", self::moderation::construct);
    catalog.register("utils", self::utils::construct);
    catalog
}
