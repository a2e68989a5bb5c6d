//! foulbot daemon: entry point for running the bot.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use foul_node::{
    init_logging, open_storage, reset_storage, BotConfig, BotRuntime, LogFormat, LogNotifier,
    TickReport, VoteIntent,
};
use foul_store::PollStore;
use foul_types::{ChannelId, Timestamp};

use crate::console::{parse_line, ConsoleCommand, CONSOLE_CHANNEL, USAGE};

#[derive(Parser)]
#[command(name = "foul-daemon", version, about = "foulbot poll daemon")]
struct Cli {
    /// Data directory for the poll database.
    #[arg(long, env = "FOULBOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// How long a poll accepts votes, in seconds.
    #[arg(long, env = "FOULBOT_POLL_DURATION_SECS")]
    poll_duration_secs: Option<u64>,

    /// Period of the expiry sweep, in seconds.
    #[arg(long, env = "FOULBOT_SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: Option<u64>,

    /// Minimum gap between two polls by the same creator, in seconds.
    #[arg(long, env = "FOULBOT_CREATOR_COOLDOWN_SECS")]
    creator_cooldown_secs: Option<u64>,

    /// Chat server the bot serves.
    #[arg(long, env = "FOULBOT_GUILD_ID")]
    guild_id: Option<String>,

    /// Collect Prometheus metrics and log a summary on shutdown.
    #[arg(long, env = "FOULBOT_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "FOULBOT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FOULBOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "FOULBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bot, reading chat requests from stdin.
    Run,
    /// Print the leaderboard for a year (default: the current one).
    Leaderboard {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Delete every poll, gainer and vote.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Layer CLI flags and env vars over the file (or default) config.
    fn merge_into(self, base: BotConfig) -> (BotConfig, Command) {
        let config = BotConfig {
            data_dir: self.data_dir.unwrap_or(base.data_dir),
            poll_duration_secs: self.poll_duration_secs.unwrap_or(base.poll_duration_secs),
            sweep_interval_secs: self.sweep_interval_secs.unwrap_or(base.sweep_interval_secs),
            creator_cooldown_secs: self
                .creator_cooldown_secs
                .unwrap_or(base.creator_cooldown_secs),
            guild_id: self.guild_id.or(base.guild_id),
            enable_metrics: self.metrics || base.enable_metrics,
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
            ..base
        };
        (config, self.command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            BotConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => BotConfig::default(),
    };
    let config_path = cli.config.clone();
    let (config, command) = cli.merge_into(base);
    config.validate().context("invalid configuration")?;

    let format: LogFormat = config.log_format()?;
    init_logging(format, &config.log_level)?;
    if let Some(path) = config_path {
        tracing::info!("Loaded config from {}", path.display());
    }

    match command {
        Command::Run => run(config).await?,
        Command::Leaderboard { year } => print_leaderboard(&config, year)?,
        Command::Reset { yes } => reset(&config, yes)?,
    }

    Ok(())
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        poll_duration_secs = config.poll_duration_secs,
        sweep_interval_secs = config.sweep_interval_secs,
        guild = config.guild_id.as_deref().unwrap_or("-"),
        "starting foulbot"
    );

    // Message ids must not repeat across restarts, so start from wall time.
    let first_id = Timestamp::now().as_secs().saturating_mul(1_000);
    let notifier = Arc::new(LogNotifier::starting_at(first_id));
    let mut runtime =
        BotRuntime::open(config, notifier).context("failed to open poll storage")?;
    runtime.start();

    let shutdown = Arc::clone(runtime.shutdown_controller());
    let mut shutdown_rx = shutdown.subscribe();
    let signals = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move { shutdown.wait_for_signal().await }
    });

    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                match parse_line(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(cmd)) => {
                        let reply = handle(&runtime, cmd).await;
                        println!("{reply}");
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}\n{USAGE}"),
                }
            }
        }
    }

    signals.abort();
    runtime.stop().await?;
    tracing::info!("foulbot daemon exited cleanly");
    Ok(())
}

async fn handle(runtime: &BotRuntime<LogNotifier>, cmd: ConsoleCommand) -> String {
    let bot = runtime.bot();
    match cmd {
        ConsoleCommand::Own(request) => match bot.on_create_request(request).await {
            Ok(poll) => format!(
                "Poll {} created, closes {}",
                poll.key.message_id,
                poll.expiry.to_rfc3339()
            ),
            Err(e) => bot.error_reply(&e),
        },
        ConsoleCommand::Vote {
            voter,
            poll,
            in_favor,
        } => {
            let intent = VoteIntent {
                poll,
                voter_id: voter,
                in_favor,
            };
            match bot.on_vote_intent(intent).await {
                Ok(ack) => ack,
                Err(e) => bot.error_reply(&e),
            }
        }
        ConsoleCommand::Leaderboard { requester, year } => {
            let channel = ChannelId::new(CONSOLE_CHANNEL);
            match bot.on_leaderboard_request(&channel, &requester, year).await {
                Ok(view) => view.message.description.unwrap_or_default(),
                Err(e) => bot.error_reply(&e),
            }
        }
        ConsoleCommand::Sweep => match runtime.scheduler().tick().await {
            TickReport::Swept { resolved } => format!("{resolved} poll(s) resolved"),
            TickReport::Skipped => "A sweep is already running".to_string(),
            TickReport::Failed => "Sweep failed, see logs".to_string(),
        },
        ConsoleCommand::Metrics => match bot.metrics().encode() {
            Ok(text) => text,
            Err(e) => e.to_string(),
        },
        ConsoleCommand::Version => bot.on_version_request(),
        ConsoleCommand::Quit => String::new(),
    }
}

fn print_leaderboard(config: &BotConfig, year: Option<i32>) -> anyhow::Result<()> {
    let env = open_storage(config).context("failed to open poll storage")?;
    let year = year.unwrap_or_else(|| Timestamp::now().year());
    let rows = env.poll_store().sum_points_by_gainer(year)?;

    println!("Leaderboard {year}");
    if rows.is_empty() {
        println!("(no passed polls)");
    }
    for (rank, row) in rows.iter().enumerate() {
        println!("{:>3}. {}: {:+}", rank + 1, row.member_id, row.total_points);
    }
    Ok(())
}

fn reset(config: &BotConfig, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to reset {} without --yes", config.data_dir.display());
    }
    let env = open_storage(config).context("failed to open poll storage")?;
    let dropped = reset_storage(&env, Timestamp::now())?;
    println!("Removed {dropped} poll(s)");
    Ok(())
}
