//! Module trait definitions

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::services::{MuteService, ReminderService};
use crate::domain::entities::{CommandIndex, CommandSpec, HelpEntry, ModuleInfo};
use crate::domain::traits::PlatformDirectory;
use crate::infrastructure::database::Database;

/// Shared collaborators handed to module constructors.
#[derive(Clone)]
pub struct ModuleContext {
    pub db: Arc<Database>,
    pub directory: Arc<dyn PlatformDirectory>,
    pub mutes: Arc<MuteService>,
    pub reminders: Arc<ReminderService>,
    pub mute_sweep: Duration,
    pub reminder_sweep: Duration,
}

/// Constructs a fresh module instance. The catalog of these stands in for
/// dynamic code loading; the load/unload/reload contract is the same.
pub type ModuleCtor = fn(&ModuleContext) -> Box<dyn BotModule>;

/// A hot-swappable unit of commands and metadata.
#[async_trait]
pub trait BotModule: Send + Sync {
    /// Unique name, matching the catalog entry.
    fn name(&self) -> &'static str;

    /// Registers commands, help entries and module info, restores any
    /// persisted state and starts background tasks. An error aborts the
    /// load; the manager rolls the registry metadata back and tears the
    /// instance down.
    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError>;

    /// Cleans up whatever setup created, background tasks included.
    async fn teardown(&mut self) {}
}

/// Registration surface a module sees during setup.
///
/// Mutations go straight into the manager's live tables; the manager
/// snapshots them before setup runs and restores the snapshot if setup
/// fails.
pub struct Registrar<'a> {
    module: String,
    index: &'a mut CommandIndex,
    help: &'a mut HashMap<String, HelpEntry>,
    info: &'a mut HashMap<String, ModuleInfo>,
    registered: Vec<String>,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(
        module: &str,
        index: &'a mut CommandIndex,
        help: &'a mut HashMap<String, HelpEntry>,
        info: &'a mut HashMap<String, ModuleInfo>,
    ) -> Self {
        Self {
            module: module.to_string(),
            index,
            help,
            info,
            registered: Vec::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Registers a command with its help entry. The owning module is always
    /// the one being set up, whatever the spec says.
    pub fn command(&mut self, mut spec: CommandSpec, help: HelpEntry) -> Result<(), BotError> {
        spec.module = self.module.clone();
        let name = spec.name.clone();
        self.index.register(spec)?;
        self.help.insert(name.clone(), help);
        self.registered.push(name);
        Ok(())
    }

    /// Contributes the module's descriptive info (about/usage surfaces).
    pub fn module_info(&mut self, info: ModuleInfo) {
        self.info.insert(self.module.clone(), info);
    }

    pub(crate) fn finish(self) -> Vec<String> {
        self.registered
    }
}
