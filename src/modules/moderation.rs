//! Moderation module - timed mutes and their expiry sweeper

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::services::{spawn_sweeper, MuteService};
use crate::domain::entities::{CommandSpec, HelpEntry, ModuleInfo};
use crate::modules::trait_def::{BotModule, ModuleContext, Registrar};

pub struct ModerationModule {
    mutes: Arc<MuteService>,
    period: Duration,
    stop: Option<watch::Sender<bool>>,
    sweeper: Option<JoinHandle<()>>,
}

pub fn construct(ctx: &ModuleContext) -> Box<dyn BotModule> {
    Box::new(ModerationModule {
        mutes: ctx.mutes.clone(),
        period: ctx.mute_sweep,
        stop: None,
        sweeper: None,
    })
}

fn usage() -> String {
    [
        "mute <guild> <user> [duration] - mute a member, indefinitely without a duration",
        "unmute <guild> <user> - lift a mute early",
    ]
    .join("\n")
}

#[async_trait]
impl BotModule for ModerationModule {
    fn name(&self) -> &'static str {
        "moderation"
    }

    async fn setup(&mut self, reg: &mut Registrar<'_>) -> Result<(), BotError> {
        reg.module_info(
            ModuleInfo::new("moderation", "stevedore", "Timed server mutes")
                .with_usage(usage),
        );

        reg.command(
            CommandSpec::new("moderation", "mute")
                .with_description("Mute a member, optionally for a limited time")
                .with_usage("mute <guild> <user> [duration]")
                .with_aliases(vec!["silence".into()]),
            HelpEntry::new("mute", "moderation")
                .with_description("Applies the mute role; without a duration the mute is indefinite")
                .with_examples(vec!["mute 10 3 1h30m".into(), "mute 10 3".into()])
                .with_permission("manage-roles"),
        )?;

        reg.command(
            CommandSpec::new("moderation", "unmute")
                .with_description("Lift a mute before it expires")
                .with_usage("unmute <guild> <user>"),
            HelpEntry::new("unmute", "moderation")
                .with_description("Cancels the pending mute and removes the mute role")
                .with_permission("manage-roles"),
        )?;

        self.mutes.restore().await?;
        let (tx, rx) = watch::channel(false);
        self.stop = Some(tx);
        self.sweeper = Some(spawn_sweeper(self.mutes.clone(), self.period, rx));
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
