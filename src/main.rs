use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};

use stevedore_bot::application::errors::{BotError, ScheduleError};
use stevedore_bot::application::services::{CommandStateService, MuteService, ReminderService};
use stevedore_bot::domain::duration::{parse_duration, RangePolicy};
use stevedore_bot::domain::entities::{ChannelId, GuildId, Reminder, RoleId, UserId};
use stevedore_bot::domain::traits::PlatformDirectory;
use stevedore_bot::infrastructure::config::Config;
use stevedore_bot::infrastructure::database::Database;
use stevedore_bot::infrastructure::directory::MemoryDirectory;
use stevedore_bot::modules::{built_in_catalog, ModuleContext, ModuleManager};

// The operator identity and scope the console session acts under; matches
// the demo directory snapshot.
const SESSION_USER: UserId = UserId(1);
const SESSION_GUILD: GuildId = GuildId(10);
const SESSION_CHANNEL: ChannelId = ChannelId(20);
const DEMO_MUTE_ROLE: RoleId = RoleId(100);
const DEMO_ALERT_CHANNEL: ChannelId = ChannelId(21);

#[derive(Parser)]
#[command(name = "stevedore-bot")]
#[command(about = "A bot core with hot-swappable feature modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot with a console session
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        /// Use the built-in demo directory snapshot
        #[arg(long)]
        dev: bool,
    },
    /// Generate default config
    InitConfig {
        /// Overwrite an existing config.yaml
        #[arg(long)]
        force: bool,
    },
    /// Show version
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, dev } => run_bot(config, dev),
        Commands::Version => {
            println!("stevedore-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig { force } => init_config(force),
    }
}

fn init_config(force: bool) {
    if std::path::Path::new("config.yaml").exists() && !force {
        eprintln!("config.yaml already exists (use --force to overwrite)");
        return;
    }
    match Config::write_default("config.yaml") {
        Ok(()) => println!("Wrote default config.yaml"),
        Err(e) => eprintln!("Failed to write config: {}", e),
    }
}

fn run_bot(config_path: String, dev: bool) {
    let config_path = std::env::var("STEVEDORE_CONFIG").unwrap_or(config_path);
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    };

    tracing::info!("Starting {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to build the runtime: {}", e);
            return;
        }
    };
    rt.block_on(async {
        if let Err(e) = run_session(config, dev).await {
            tracing::error!("Session ended with an error: {}", e);
        }
    });
}

async fn run_session(config: Config, dev: bool) -> Result<(), BotError> {
    let mut db_path = config.database.path.clone();
    if let Ok(path) = std::env::var("STEVEDORE_DB") {
        db_path = path;
    }
    let db = Arc::new(Database::new(&db_path)?);

    let directory = match (&config.platform.snapshot, dev) {
        (Some(path), false) => Arc::new(MemoryDirectory::from_snapshot(path)?),
        _ => Arc::new(MemoryDirectory::demo()),
    };
    directory.set_echo(true).await;
    let dir: Arc<dyn PlatformDirectory> = directory.clone();

    let mute_role = config
        .mute_role()
        .or(if dev { Some(DEMO_MUTE_ROLE) } else { None });
    let alert_channel = config
        .alert_channel()
        .or(if dev { Some(DEMO_ALERT_CHANNEL) } else { None });

    let mutes = Arc::new(MuteService::new(
        db.clone(),
        dir.clone(),
        mute_role,
        alert_channel,
    ));
    let reminders = Arc::new(ReminderService::new(db.clone(), dir.clone(), alert_channel));

    let ctx = ModuleContext {
        db: db.clone(),
        directory: dir.clone(),
        mutes: mutes.clone(),
        reminders: reminders.clone(),
        mute_sweep: Duration::from_secs(config.scheduler.mute_sweep_secs),
        reminder_sweep: Duration::from_secs(config.scheduler.reminder_sweep_secs),
    };
    let mut manager =
        ModuleManager::new(built_in_catalog(), ctx, CommandStateService::new(db.clone()));

    // First run seeds the startup module list.
    if db.setting("defaults-seeded")?.is_none() {
        db.add_default_module("moderation")?;
        db.add_default_module("utils")?;
        db.set_setting("defaults-seeded", "1")?;
    }

    if let Err(e) = manager.load("core").await {
        tracing::error!("Failed to load the core module: {}", e);
    }
    for name in db.default_modules()? {
        if let Err(e) = manager.load(&name).await {
            tracing::warn!("Startup load of `{}` failed: {}", name, e);
        }
    }
    manager.apply_all()?;

    let mut prefix = match db.setting("prefix")? {
        Some(saved) => saved,
        None => config.bot.prefix.clone(),
    };

    println!(
        "{} ready. Type {}help for commands, {}shutdown to exit.",
        config.bot.name, prefix, prefix
    );

    loop {
        let Some(line) = read_line("> ") else { break };
        let line = line.trim();
        if line.is_empty() || !line.starts_with(&prefix) {
            continue;
        }
        let mut parts = line[prefix.len()..].split_whitespace();
        let Some(word) = parts.next() else { continue };
        let args: Vec<&str> = parts.collect();

        let Some(spec) = manager.commands().find(word) else {
            println!("Unknown command `{}`.", word);
            continue;
        };
        if !spec.enabled {
            println!("That command is disabled.");
            continue;
        }
        let canonical = spec.name.clone();

        match canonical.as_str() {
            "module" => handle_module(&mut manager, &args).await,
            "command" => handle_command_state(&mut manager, &args),
            "default" => handle_default(&manager, &db, &args),
            "about" => handle_about(&manager, &config, &args),
            "usage" => handle_usage(&manager, &args),
            "help" => handle_help(&manager, &args),
            "prefix" => match args.first() {
                Some(new) => {
                    prefix = new.to_string();
                    if let Err(e) = db.set_setting("prefix", &prefix) {
                        tracing::warn!("Failed to persist prefix: {}", e);
                    }
                    println!("Prefix is now `{}`.", prefix);
                }
                None => println!("Usage: prefix <new>"),
            },
            "mute" => handle_mute(&mutes, &directory, mute_role, &args).await,
            "unmute" => handle_unmute(&mutes, &dir, mute_role, &args).await,
            "remindme" => handle_remindme(&reminders, &dir, &args).await,
            "shutdown" => {
                let delay = match args.first() {
                    Some(d) => match parse_duration(d, Some(0), Some(86_400), RangePolicy::Reject)
                    {
                        Ok(secs) => secs,
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    },
                    None => 0,
                };
                if delay > 0 {
                    println!("Shutting down in {} second(s).", delay);
                    tokio::time::sleep(Duration::from_secs(delay as u64)).await;
                }
                break;
            }
            other => println!("`{}` has no console handler.", other),
        }
    }

    println!("Shutting down.");
    manager.shutdown().await;
    Ok(())
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();
    let mut input = String::new();
    match std::io::stdin().read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => Some(input),
        Err(_) => None,
    }
}

async fn handle_module(manager: &mut ModuleManager, args: &[&str]) {
    match args {
        ["list"] => {
            println!("Loaded: {}", join_or_none(&manager.list_loaded()));
            println!("Available: {}", join_or_none(&manager.list_available()));
        }
        ["error"] => match manager.last_error() {
            Some(e) => println!("{}", e),
            None => println!("No module errors recorded."),
        },
        ["load", name] => match manager.load(name).await {
            Ok(()) => println!("Loaded `{}`.", name),
            Err(e) => println!("{}", e),
        },
        ["unload", name] => match manager.unload(name).await {
            Ok(()) => println!("Unloaded `{}`.", name),
            Err(e) => println!("{}", e),
        },
        ["reload", name] => match manager.reload(name).await {
            Ok(()) => println!("Reloaded `{}`.", name),
            Err(e) => println!("{}", e),
        },
        _ => println!("Usage: module <load|unload|reload|list|error> [name]"),
    }
}

fn handle_command_state(manager: &mut ModuleManager, args: &[&str]) {
    let result = match args {
        ["show", name] => manager.set_command_hidden(name, false),
        ["hide", name] => manager.set_command_hidden(name, true),
        ["enable", name] => manager.set_command_disabled(name, false),
        ["disable", name] => manager.set_command_disabled(name, true),
        _ => {
            println!("Usage: command <show|hide|enable|disable> <name>");
            return;
        }
    };
    match result {
        Ok(state) => println!("The command is now {}.", state),
        Err(e) => println!("{}", e),
    }
}

fn handle_default(manager: &ModuleManager, db: &Database, args: &[&str]) {
    match args {
        ["list"] => match db.default_modules() {
            Ok(modules) => println!("Startup modules: {}", join_or_none(&modules)),
            Err(e) => println!("{}", e),
        },
        ["add", name] => {
            if !manager.list_available().iter().any(|m| m == name) {
                println!("No module named `{}` exists.", name);
                return;
            }
            match db.add_default_module(name) {
                Ok(true) => println!("`{}` will load at startup.", name),
                Ok(false) => println!("`{}` is already a startup module.", name),
                Err(e) => println!("{}", e),
            }
        }
        ["remove", name] => match db.remove_default_module(name) {
            Ok(true) => println!("`{}` removed from startup modules.", name),
            Ok(false) => println!("`{}` is not a startup module.", name),
            Err(e) => println!("{}", e),
        },
        _ => println!("Usage: default <add|remove|list> [name]"),
    }
}

fn handle_about(manager: &ModuleManager, config: &Config, args: &[&str]) {
    match args.first() {
        Some(name) => match manager.module_info(name) {
            Some(info) => {
                println!("{} - {} (by {})", info.name, info.description, info.author);
                if let Some(credits) = &info.credits {
                    println!("Credits: {}", credits);
                }
            }
            None => println!("No loaded module named `{}`.", name),
        },
        None => {
            println!(
                "{} v{} - modules: {}",
                config.bot.name,
                env!("CARGO_PKG_VERSION"),
                join_or_none(&manager.list_loaded())
            );
        }
    }
}

fn handle_usage(manager: &ModuleManager, args: &[&str]) {
    let Some(name) = args.first() else {
        println!("Usage: usage <module>");
        return;
    };
    match manager.module_info(name).and_then(|info| info.usage) {
        Some(provider) => println!("{}", provider()),
        None => println!("No usage text for `{}`.", name),
    }
}

fn handle_help(manager: &ModuleManager, args: &[&str]) {
    match args.first() {
        Some(name) => match manager.commands().find(name) {
            Some(spec) => {
                let header = match &spec.usage {
                    Some(usage) => usage.clone(),
                    None => spec.name.clone(),
                };
                println!("{}", header);
                if let Some(entry) = manager.help_entry(&spec.name) {
                    if let Some(desc) = &entry.description {
                        println!("{}", desc);
                    }
                    if !entry.examples.is_empty() {
                        println!("Examples: {}", entry.examples.join(", "));
                    }
                    if !entry.permissions.is_empty() {
                        println!("Requires: {}", entry.permissions.join(", "));
                    }
                }
            }
            None => println!("Unknown command `{}`.", name),
        },
        None => {
            for name in manager.commands().names() {
                let Some(spec) = manager.commands().get(&name) else { continue };
                if spec.hidden {
                    continue;
                }
                match &spec.description {
                    Some(desc) => println!("{:<12} {}", name, desc),
                    None => println!("{}", name),
                }
            }
        }
    }
}

async fn handle_mute(
    mutes: &MuteService,
    directory: &MemoryDirectory,
    mute_role: Option<RoleId>,
    args: &[&str],
) {
    let (Some(guild), Some(user)) = (parse_arg::<GuildId>(args, 0), parse_arg::<UserId>(args, 1))
    else {
        println!("Usage: mute <guild> <user> [duration]");
        return;
    };
    let expiry = match args.get(2) {
        Some(text) => match parse_duration(text, Some(1), None, RangePolicy::Reject) {
            Ok(secs) => Some(Utc::now() + chrono::Duration::seconds(secs)),
            Err(e) => {
                println!("{}", e);
                return;
            }
        },
        None => None,
    };
    // Applying the role is the command layer's business; expiry only ever
    // revokes through the directory trait.
    if let Some(role) = mute_role {
        if !directory.grant_role(guild, user, role).await {
            println!("No member {} in guild {}.", user, guild);
            return;
        }
    }
    match mutes.schedule(guild, user, expiry).await {
        Ok(()) => match expiry {
            Some(at) => println!("Muted {} until {}.", user, at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Muted {} indefinitely.", user),
        },
        Err(e) => println!("{}", e),
    }
}

async fn handle_unmute(
    mutes: &MuteService,
    directory: &Arc<dyn PlatformDirectory>,
    mute_role: Option<RoleId>,
    args: &[&str],
) {
    let (Some(guild), Some(user)) = (parse_arg::<GuildId>(args, 0), parse_arg::<UserId>(args, 1))
    else {
        println!("Usage: unmute <guild> <user>");
        return;
    };
    match mutes.cancel(guild, user).await {
        Ok(()) => {
            if let Some(role) = mute_role {
                if let Err(e) = directory.revoke_role(guild, user, role).await {
                    println!("Mute cancelled, but removing the role failed: {}", e);
                    return;
                }
            }
            println!("Unmuted {}.", user);
        }
        Err(BotError::Schedule(ScheduleError::NotScheduled)) => {
            println!("That member is not muted.");
        }
        Err(e) => println!("{}", e),
    }
}

async fn handle_remindme(
    reminders: &ReminderService,
    directory: &Arc<dyn PlatformDirectory>,
    args: &[&str],
) {
    let Some((duration, rest)) = args.split_first() else {
        println!("Usage: remindme <duration> <text>");
        return;
    };
    if rest.is_empty() {
        println!("Usage: remindme <duration> <text>");
        return;
    }
    let secs = match parse_duration(duration, Some(1), None, RangePolicy::Reject) {
        Ok(secs) => secs,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    let due = Utc::now() + chrono::Duration::seconds(secs);
    let mut reminder = Reminder::new(SESSION_USER, due, rest.join(" "));
    if directory.resolve_channel(SESSION_CHANNEL).await.is_ok() {
        reminder = reminder.in_channel(SESSION_GUILD, SESSION_CHANNEL);
    }
    match reminders.schedule(reminder).await {
        Ok(_) => println!("Reminder set for {}.", due.format("%Y-%m-%d %H:%M:%S UTC")),
        Err(e) => println!("{}", e),
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[&str], index: usize) -> Option<T> {
    args.get(index).and_then(|a| a.parse().ok())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
