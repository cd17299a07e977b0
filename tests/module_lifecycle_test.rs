//! Module lifecycle integration tests
//! Run with: cargo test --test module_lifecycle_test

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stevedore_bot::application::errors::{BotError, CommandError, ModuleError};
use stevedore_bot::application::services::{CommandStateService, MuteService, ReminderService};
use stevedore_bot::domain::entities::{CommandSpec, HelpEntry, LoadState, ModuleInfo};
use stevedore_bot::domain::traits::PlatformDirectory;
use stevedore_bot::infrastructure::database::Database;
use stevedore_bot::infrastructure::directory::MemoryDirectory;
use stevedore_bot::modules::{
    BotModule, ModuleCatalog, ModuleContext, ModuleCtor, ModuleManager, Registrar,
};

fn test_manager(entries: &[(&str, ModuleCtor)]) -> ModuleManager {
    let db = Arc::new(Database::in_memory().unwrap());
    let dir: Arc<dyn PlatformDirectory> = Arc::new(MemoryDirectory::demo());
    let mutes = Arc::new(MuteService::new(db.clone(), dir.clone(), None, None));
    let reminders = Arc::new(ReminderService::new(db.clone(), dir.clone(), None));
    let ctx = ModuleContext {
        db: db.clone(),
        directory: dir,
        mutes,
        reminders,
        mute_sweep: Duration::from_secs(3600),
        reminder_sweep: Duration::from_secs(3600),
    };
    let mut catalog = ModuleCatalog::new();
    for (name, ctor) in entries {
        catalog.register(*name, *ctor);
    }
    ModuleManager::new(catalog, ctx, CommandStateService::new(db))
}

struct EchoModule;

fn echo_ctor(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(EchoModule)
}

#[async_trait]
impl BotModule for EchoModule {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        reg.module_info(ModuleInfo::new("echo", "tests", "Repeats things back"));
        reg.command(
            CommandSpec::new("echo", "echo").with_description("Repeat the input"),
            HelpEntry::new("echo", "misc"),
        )?;
        reg.command(
            CommandSpec::new("echo", "shout").with_aliases(vec!["yell".into()]),
            HelpEntry::new("shout", "misc"),
        )?;
        Ok(())
    }
}

struct BrokenModule {
    detail: &'static str,
}

fn broken_ctor(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(BrokenModule {
        detail: "registration blew up: first detail",
    })
}

fn broken_ctor_other(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(BrokenModule {
        detail: "registration blew up: second detail",
    })
}

#[async_trait]
impl BotModule for BrokenModule {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        // Partially registers before failing, so rollback has work to do.
        reg.command(CommandSpec::new("broken", "jam"), HelpEntry::new("jam", "misc"))?;
        Err(BotError::Internal(self.detail.to_string()))
    }
}

static FLAKY_SETUPS: AtomicUsize = AtomicUsize::new(0);

/// Sets up cleanly the first time, fails on every later attempt. Used to
/// drive the reload path where even restoring the prior instance fails.
struct FlakyModule;

fn flaky_ctor(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(FlakyModule)
}

#[async_trait]
impl BotModule for FlakyModule {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        if FLAKY_SETUPS.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(BotError::Internal("flaky module gave out".to_string()));
        }
        reg.command(CommandSpec::new("flaky", "flaky"), HelpEntry::new("flaky", "misc"))?;
        Ok(())
    }
}

struct PanelModule;

fn panel_ctor(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(PanelModule)
}

#[async_trait]
impl BotModule for PanelModule {
    fn name(&self) -> &'static str {
        "panel"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        reg.command(CommandSpec::new("panel", "panel"), HelpEntry::new("panel", "core"))?;
        Ok(())
    }
}

#[tokio::test]
async fn load_registers_and_unload_removes_metadata() {
    let mut manager = test_manager(&[("echo", echo_ctor)]);

    manager.load("echo").await.unwrap();
    assert!(manager.is_loaded("echo"));
    assert!(manager.commands().find("echo").is_some());
    assert!(manager.commands().find("yell").is_some());
    assert!(manager.help_entry("shout").is_some());
    assert!(manager.module_info("echo").is_some());
    assert_eq!(manager.record("echo").unwrap().state, LoadState::Loaded);

    assert!(matches!(
        manager.load("echo").await,
        Err(ModuleError::AlreadyLoaded(_))
    ));

    manager.unload("echo").await.unwrap();
    assert!(manager.commands().is_empty());
    assert!(manager.help_entry("shout").is_none());
    assert!(manager.module_info("echo").is_none());
    assert_eq!(manager.record("echo").unwrap().state, LoadState::Unloaded);

    assert!(matches!(
        manager.unload("echo").await,
        Err(ModuleError::NotLoaded(_))
    ));
}

#[tokio::test]
async fn loading_an_unknown_module_is_not_found() {
    let mut manager = test_manager(&[]);
    assert!(matches!(
        manager.load("ghost").await,
        Err(ModuleError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_load_restores_the_pre_attempt_metadata() {
    let mut manager = test_manager(&[("echo", echo_ctor), ("broken", broken_ctor)]);
    manager.load("echo").await.unwrap();

    let help_before: BTreeSet<String> = manager.help_entries().keys().cloned().collect();
    let commands_before = manager.commands().names();

    let err = manager.load("broken").await.unwrap_err();
    assert!(matches!(err, ModuleError::SetupFailed(_)));
    // The caller sees a generic message; the detail is in the error slot.
    assert!(!err.to_string().contains("first detail"));
    assert!(manager.last_error().unwrap().contains("first detail"));

    let help_after: BTreeSet<String> = manager.help_entries().keys().cloned().collect();
    assert_eq!(help_before, help_after);
    assert_eq!(commands_before, manager.commands().names());
    assert!(!manager.is_loaded("broken"));
    assert_eq!(
        manager.record("broken").unwrap().state,
        LoadState::FailedLastLoad
    );
}

#[tokio::test]
async fn the_error_slot_keeps_only_the_most_recent_failure() {
    let mut manager = test_manager(&[("broken", broken_ctor)]);
    manager.load("broken").await.unwrap_err();
    assert!(manager.last_error().unwrap().contains("first detail"));

    manager.catalog_mut().register("broken", broken_ctor_other);
    manager.load("broken").await.unwrap_err();
    let last = manager.last_error().unwrap();
    assert!(last.contains("second detail"));
    assert!(!last.contains("first detail"));
}

#[tokio::test]
async fn reload_of_a_vanished_definition_leaves_the_module_loaded() {
    let mut manager = test_manager(&[("echo", echo_ctor)]);
    manager.load("echo").await.unwrap();

    manager.catalog_mut().remove("echo");
    let err = manager.reload("echo").await.unwrap_err();
    assert!(matches!(err, ModuleError::Vanished(_)));
    // Distinct wording from "never existed".
    assert_ne!(
        err.to_string(),
        ModuleError::NotFound("echo".to_string()).to_string()
    );

    assert!(manager.is_loaded("echo"));
    assert!(manager.commands().find("echo").is_some());
}

#[tokio::test]
async fn failed_reload_restores_the_previously_loaded_instance() {
    let mut manager = test_manager(&[("echo", echo_ctor)]);
    manager.load("echo").await.unwrap();

    manager.catalog_mut().register("echo", broken_ctor);
    let err = manager.reload("echo").await.unwrap_err();
    assert!(matches!(err, ModuleError::ReloadFailed(_)));

    // Still loaded, commands fully intact.
    assert!(manager.is_loaded("echo"));
    assert!(manager.commands().find("echo").is_some());
    assert!(manager.commands().find("shout").is_some());
    assert!(manager.last_error().unwrap().contains("first detail"));
}

#[tokio::test]
async fn failed_reload_and_failed_restore_reports_removal() {
    let mut manager = test_manager(&[("flaky", flaky_ctor)]);
    manager.load("flaky").await.unwrap();

    manager.catalog_mut().register("flaky", broken_ctor);
    let err = manager.reload("flaky").await.unwrap_err();
    assert!(matches!(err, ModuleError::Removed(_)));
    assert_ne!(
        err.to_string(),
        ModuleError::ReloadFailed("flaky".to_string()).to_string()
    );

    assert!(!manager.is_loaded("flaky"));
    assert!(manager.commands().find("flaky").is_none());
    assert_eq!(
        manager.record("flaky").unwrap().state,
        LoadState::FailedLastLoad
    );

    // The error slot holds the most recent failure: the restore attempt,
    // not the fresh definition that triggered it.
    let last = manager.last_error().unwrap();
    assert!(last.contains("flaky module gave out"));
    assert!(!last.contains("first detail"));
}

#[tokio::test]
async fn command_states_survive_unload_and_load() {
    let mut manager = test_manager(&[("echo", echo_ctor)]);
    manager.load("echo").await.unwrap();

    manager.set_command_hidden("echo", true).unwrap();
    manager.set_command_disabled("shout", true).unwrap();

    manager.unload("echo").await.unwrap();
    manager.load("echo").await.unwrap();

    let echo = manager.commands().get("echo").unwrap();
    assert!(echo.hidden);
    assert!(echo.enabled);
    let shout = manager.commands().get("shout").unwrap();
    assert!(!shout.hidden);
    assert!(!shout.enabled);
}

#[tokio::test]
async fn disable_round_trip_restores_the_hidden_bit() {
    let mut manager = test_manager(&[("echo", echo_ctor)]);
    manager.load("echo").await.unwrap();

    manager.set_command_hidden("echo", true).unwrap();
    manager.set_command_disabled("echo", true).unwrap();
    let state = manager.set_command_disabled("echo", false).unwrap();

    assert!(state.hidden());
    assert!(!state.disabled());
    let live = manager.commands().get("echo").unwrap();
    assert!(live.hidden);
    assert!(live.enabled);
}

#[tokio::test]
async fn core_commands_cannot_be_disabled() {
    let mut manager = test_manager(&[("panel", panel_ctor)]);
    manager.load("panel").await.unwrap();

    assert!(matches!(
        manager.set_command_disabled("panel", true),
        Err(BotError::Command(CommandError::Protected))
    ));
    assert!(manager.commands().get("panel").unwrap().enabled);

    // Hiding is still allowed.
    let state = manager.set_command_hidden("panel", true).unwrap();
    assert!(state.hidden());
}

#[tokio::test]
async fn state_changes_for_unknown_commands_are_rejected() {
    let mut manager = test_manager(&[]);
    assert!(matches!(
        manager.set_command_hidden("ghost", true),
        Err(BotError::Command(CommandError::Unknown(_)))
    ));
}
