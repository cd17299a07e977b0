//! Utils module - reminders and their delivery sweeper

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::services::{spawn_sweeper, ReminderService};
use crate::domain::entities::{CommandSpec, HelpEntry, ModuleInfo};
use crate::modules::trait_def::{BotModule, ModuleContext, Registrar};

pub struct UtilsModule {
    reminders: Arc<ReminderService>,
    period: Duration,
    stop: Option<watch::Sender<bool>>,
    sweeper: Option<JoinHandle<()>>,
}

pub fn construct(ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(UtilsModule {
        reminders: ctx.reminders.clone(),
        period: ctx.reminder_sweep,
        stop: None,
        sweeper: None,
    })
}

fn usage() -> String {
    "remindme <duration> <text> - get the text back after the duration".to_string()
}

#[async_trait]
impl BotModule for UtilsModule {
    fn name(&self) -> &'static str {
        "utils"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        reg.module_info(
            ModuleInfo::new("utils", "stevedore", "Timed reminders").with_usage(usage),
        );

        reg.command(
            CommandSpec::new("utils", "remindme")
                .with_description("Deliver a message back to you after a delay")
                .with_usage("remindme <duration> <text>")
                .with_aliases(vec!["remind".into()]),
            HelpEntry::new("remindme", "utils")
                .with_description("Delivers the text in the origin channel, or by direct message")
                .with_examples(vec!["remindme 1h30m stretch".into()]),
        )?;

        self.reminders.restore().await?;
        let (tx, rx) = watch::channel(false);
        self.stop = Some(tx);
        self.sweeper = Some(spawn_sweeper(self.reminders.clone(), self.period, rx));
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        if let Some(sweeper) = self.sweeper.take() {
            let _ = sweeper.await;
        }
    }
}
