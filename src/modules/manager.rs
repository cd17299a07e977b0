//! Module manager - transactional load/unload/reload over the registry

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::application::errors::{BotError, CommandError, ModuleError};
use crate::application::services::CommandStateService;
use crate::domain::entities::{
    CommandIndex, CommandState, HelpEntry, LoadState, ModuleInfo, ModuleRecord,
};
use crate::modules::catalog::ModuleCatalog;
use crate::modules::trait_def::{BotModule, ModuleContext, ModuleCtor, Registrar};

/// Coordinates the module catalog, the live command index, the help and
/// module-info tables, and per-command persisted state.
///
/// Loads are transactional with respect to registry metadata: on a setup
/// failure the help and info tables are restored to their pre-attempt
/// snapshot and every command the module managed to register is unregistered
/// again. A bad module never corrupts the global index.
pub struct ModuleManager {
    catalog: ModuleCatalog,
    ctx: ModuleContext,
    states: CommandStateService,
    index: CommandIndex,
    help: HashMap<String, HelpEntry>,
    info: HashMap<String, ModuleInfo>,
    records: HashMap<String, ModuleRecord>,
    active: HashMap<String, Box<dyn BotModule>>,
    loaded_ctors: HashMap<String, ModuleCtor>,
    last_error: Option<String>,
}

impl ModuleManager {
    pub fn new(catalog: ModuleCatalog, ctx: ModuleContext, states: CommandStateService) -> Self {
        Self {
            catalog,
            ctx,
            states,
            index: CommandIndex::new(),
            help: HashMap::new(),
            info: HashMap::new(),
            records: HashMap::new(),
            active: HashMap::new(),
            loaded_ctors: HashMap::new(),
            last_error: None,
        }
    }

    pub fn catalog_mut(&mut self) -> &mut ModuleCatalog {
        &mut self.catalog
    }

    /// Loads a module from the catalog.
    pub async fn load(&mut self, name: &str) -> Result<(), ModuleError> {
        if self.active.contains_key(name) {
            return Err(ModuleError::AlreadyLoaded(name.to_string()));
        }
        let Some(ctor) = self.catalog.get(name) else {
            return Err(ModuleError::NotFound(name.to_string()));
        };
        match self.try_load(name, ctor).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(name, e)),
        }
    }

    /// Unloads an active module, removing every command, help entry and
    /// module info it registered. Never rolls back.
    pub async fn unload(&mut self, name: &str) -> Result<(), ModuleError> {
        let Some(mut module) = self.active.remove(name) else {
            return Err(ModuleError::NotLoaded(name.to_string()));
        };
        module.teardown().await;

        let commands = match self.records.get_mut(name) {
            Some(record) => std::mem::take(&mut record.commands),
            None => Vec::new(),
        };
        for command in &commands {
            self.index.unregister(command);
            self.help.remove(command);
        }
        self.info.remove(name);
        self.loaded_ctors.remove(name);
        if let Some(record) = self.records.get_mut(name) {
            record.state = LoadState::Unloaded;
        }
        info!("Unloaded module `{}` ({} command(s))", name, commands.len());
        Ok(())
    }

    /// Unloads then loads a module again, picking up its current catalog
    /// definition.
    ///
    /// If the fresh definition fails to set up, the pre-reload instance is
    /// restored from the constructor recorded at its original load, so the
    /// caller is left with the loaded state it started from. Only when that
    /// restore itself fails is the module actually gone.
    pub async fn reload(&mut self, name: &str) -> Result<(), ModuleError> {
        if !self.active.contains_key(name) {
            return Err(ModuleError::NotLoaded(name.to_string()));
        }
        let Some(fresh) = self.catalog.get(name) else {
            return Err(ModuleError::Vanished(name.to_string()));
        };
        let prior = self.loaded_ctors.get(name).copied().unwrap_or(fresh);

        self.unload(name).await?;
        match self.try_load(name, fresh).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Reloading module `{}` failed: {}", name, e);
                self.last_error = Some(e.to_string());
                match self.try_load(name, prior).await {
                    Ok(()) => Err(ModuleError::ReloadFailed(name.to_string())),
                    Err(restore_err) => {
                        error!(
                            "Restoring module `{}` after failed reload also failed: {}",
                            name, restore_err
                        );
                        self.last_error = Some(restore_err.to_string());
                        if let Some(record) = self.records.get_mut(name) {
                            record.state = LoadState::FailedLastLoad;
                        }
                        Err(ModuleError::Removed(name.to_string()))
                    }
                }
            }
        }
    }

    async fn try_load(&mut self, name: &str, ctor: ModuleCtor) -> Result<(), BotError> {
        let help_snapshot = self.help.clone();
        let info_snapshot = self.info.clone();

        let mut module = ctor(&self.ctx);
        let mut reg = Registrar::new(name, &mut self.index, &mut self.help, &mut self.info);
        let setup = module.setup(&mut reg).await;
        let registered = reg.finish();

        let result = match setup {
            Ok(()) => self.project_states(&registered),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                let record = self
                    .records
                    .entry(name.to_string())
                    .or_insert_with(|| ModuleRecord::new(name));
                record.state = LoadState::Loaded;
                record.commands = registered;
                self.loaded_ctors.insert(name.to_string(), ctor);
                self.active.insert(name.to_string(), module);
                info!(
                    "Loaded module `{}` with {} command(s)",
                    name,
                    self.records[name].commands.len()
                );
                Ok(())
            }
            Err(e) => {
                // Restore the pre-attempt metadata verbatim and undo the
                // partial command registration.
                for command in &registered {
                    self.index.unregister(command);
                }
                self.help = help_snapshot;
                self.info = info_snapshot;
                module.teardown().await;
                Err(e)
            }
        }
    }

    /// Applies persisted command states to freshly registered commands.
    fn project_states(&mut self, commands: &[String]) -> Result<(), BotError> {
        for command in commands {
            let key = match self.index.get(command) {
                Some(spec) => spec.key(),
                None => continue,
            };
            let state = self.states.state_of(&key)?;
            if let Some(spec) = self.index.get_mut(command) {
                spec.apply_state(state);
            }
        }
        Ok(())
    }

    fn fail(&mut self, name: &str, err: BotError) -> ModuleError {
        error!("Loading module `{}` failed: {}", name, err);
        self.last_error = Some(err.to_string());
        self.records
            .entry(name.to_string())
            .or_insert_with(|| ModuleRecord::new(name))
            .state = LoadState::FailedLastLoad;
        ModuleError::SetupFailed(name.to_string())
    }

    /// Re-applies persisted states to every registered command. Called at
    /// process start after the initial loads.
    pub fn apply_all(&mut self) -> Result<(), BotError> {
        let commands = self.index.names();
        self.project_states(&commands)
    }

    // Command state surface

    /// Sets the hidden bit of a command (looked up by name or alias),
    /// persisting the new state and updating the live flags in lockstep.
    pub fn set_command_hidden(&mut self, input: &str, hidden: bool) -> Result<CommandState, BotError> {
        let spec = self
            .index
            .find(input)
            .ok_or_else(|| CommandError::Unknown(input.to_string()))?;
        let (name, key) = (spec.name.clone(), spec.key());
        let state = self.states.set_hidden(&key, hidden)?;
        if let Some(spec) = self.index.get_mut(&name) {
            spec.apply_state(state);
        }
        Ok(state)
    }

    /// Sets the disabled bit of a command. Core-category commands are
    /// protected and cannot be disabled.
    pub fn set_command_disabled(
        &mut self,
        input: &str,
        disabled: bool,
    ) -> Result<CommandState, BotError> {
        let spec = self
            .index
            .find(input)
            .ok_or_else(|| CommandError::Unknown(input.to_string()))?;
        let (name, key) = (spec.name.clone(), spec.key());
        if disabled && self.help.get(&name).map(HelpEntry::is_core).unwrap_or(false) {
            return Err(CommandError::Protected.into());
        }
        let state = self.states.set_disabled(&key, disabled)?;
        if let Some(spec) = self.index.get_mut(&name) {
            spec.apply_state(state);
        }
        Ok(state)
    }

    // Read surfaces

    pub fn list_available(&self) -> Vec<String> {
        self.catalog.names()
    }

    pub fn list_loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// The most recent load/reload error, full detail. Overwritten by the
    /// next failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn record(&self, name: &str) -> Option<&ModuleRecord> {
        self.records.get(name)
    }

    pub fn module_info(&self, name: &str) -> Option<&ModuleInfo> {
        self.info.get(name)
    }

    pub fn help_entry(&self, command: &str) -> Option<&HelpEntry> {
        self.help.get(command)
    }

    pub fn help_entries(&self) -> &HashMap<String, HelpEntry> {
        &self.help
    }

    pub fn commands(&self) -> &CommandIndex {
        &self.index
    }

    /// Unloads every active module, tearing their background tasks down.
    pub async fn shutdown(&mut self) {
        for name in self.list_loaded() {
            if let Err(e) = self.unload(&name).await {
                warn!("Failed to unload `{}` during shutdown: {}", name, e);
            }
        }
    }
}
