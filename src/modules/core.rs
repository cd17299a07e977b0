//! Core module - module management, command state and session controls
//!
//! These commands are tagged with the `core` category, which makes them
//! immune to being disabled.

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::{CommandSpec, HelpEntry, ModuleInfo};
use crate::modules::trait_def::{BotModule, ModuleContext, Registrar};

pub struct CoreModule;

pub fn construct(_ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(CoreModule)
}

fn usage() -> String {
    [
        "module load|unload|reload <name> - manage feature modules",
        "module list - loaded and available modules",
        "module error - last module load error",
        "command show|hide|enable|disable <name> - command visibility/enablement",
        "default add|remove|list <name> - modules loaded at startup",
        "about [module] - bot or module credits",
        "usage <module> - module usage text",
        "prefix <new> - change the command prefix",
        "shutdown [delay] - stop the bot, optionally after a delay",
    ]
    .join("\n")
}

#[async_trait]
impl BotModule for CoreModule {
    fn name(&self) -> &'static str {
        "core"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        reg.module_info(
            ModuleInfo::new("core", "stevedore", "Module management and scheduling controls")
                .with_usage(usage),
        );

        reg.command(
            CommandSpec::new("core", "module")
                .with_description("Load, unload, reload and inspect feature modules")
                .with_usage("module <load|unload|reload|list|error> [name]"),
            HelpEntry::new("module", "core")
                .with_description("Manages the set of loaded feature modules")
                .with_examples(vec![
                    "module load moderation".into(),
                    "module reload utils".into(),
                    "module error".into(),
                ])
                .with_permission("administrator"),
        )?;

        reg.command(
            CommandSpec::new("core", "command")
                .with_description("Show, hide, enable or disable a command")
                .with_usage("command <show|hide|enable|disable> <name>"),
            HelpEntry::new("command", "core")
                .with_description("Persists command visibility and enablement across restarts")
                .with_examples(vec!["command hide remindme".into(), "command disable mute".into()])
                .with_permission("administrator"),
        )?;

        reg.command(
            CommandSpec::new("core", "default")
                .with_description("Manage modules loaded automatically at startup")
                .with_usage("default <add|remove|list> [name]"),
            HelpEntry::new("default", "core")
                .with_description("Maintains the startup module list")
                .with_examples(vec!["default add moderation".into()])
                .with_permission("administrator"),
        )?;

        reg.command(
            CommandSpec::new("core", "about")
                .with_description("Show bot or module credits")
                .with_usage("about [module]"),
            HelpEntry::new("about", "core")
                .with_description("Shows descriptive info for the bot or one module"),
        )?;

        reg.command(
            CommandSpec::new("core", "usage")
                .with_description("Show a module's usage text")
                .with_usage("usage <module>"),
            HelpEntry::new("usage", "core")
                .with_description("Prints the usage text a module provides"),
        )?;

        reg.command(
            CommandSpec::new("core", "help")
                .with_description("List commands or show help for one")
                .with_usage("help [command]"),
            HelpEntry::new("help", "core")
                .with_description("Lists visible commands with their descriptions"),
        )?;

        reg.command(
            CommandSpec::new("core", "prefix")
                .with_description("Change the command prefix")
                .with_usage("prefix <new>"),
            HelpEntry::new("prefix", "core")
                .with_description("Changes the command prefix; persists across restarts")
                .with_permission("administrator"),
        )?;

        reg.command(
            CommandSpec::new("core", "shutdown")
                .with_description("Stop the bot, optionally after a bounded delay")
                .with_usage("shutdown [delay]"),
            HelpEntry::new("shutdown", "core")
                .with_description("Stops the bot after an optional delay of up to one day")
                .with_examples(vec!["shutdown".into(), "shutdown 5m".into()])
                .with_permission("administrator"),
        )?;

        Ok(())
    }
}
