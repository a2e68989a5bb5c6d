//! Bot runtime: opens storage, wires the engine to the chat surface and
//! runs the background scheduler until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use foul_engine::PollEngine;
use foul_store::{MetaStore, PollStore};
use foul_store_lmdb::environment::MAX_DBS;
use foul_store_lmdb::{
    check_data_dir, check_integrity, LmdbEnvironment, LmdbPollStore, Migrator,
};
use foul_types::{SystemClock, Timestamp};

use crate::cooldown::CreatorCooldown;
use crate::handlers::{Bot, BotSettings};
use crate::metrics::BotMetrics;
use crate::notifier::Notifier;
use crate::runner::StoreRunner;
use crate::scheduler::Scheduler;
use crate::{BotConfig, BotError, ShutdownController};

/// Maximum time to wait for background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Metadata key recording the last administrative reset.
pub const LAST_RESET_KEY: &str = "last_reset";

pub type LmdbBot<N> = Bot<LmdbPollStore, SystemClock, N>;

/// Open the LMDB environment under `config.data_dir`, verifying it and
/// bringing its schema up to date.
pub fn open_storage(config: &BotConfig) -> Result<LmdbEnvironment, BotError> {
    check_data_dir(&config.data_dir).map_err(BotError::Config)?;

    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size_bytes())
        .map_err(|e| BotError::Store(e.into()))?;

    let report = check_integrity(&env).map_err(|e| BotError::Store(e.into()))?;
    if report.is_healthy() {
        tracing::info!(
            databases = report.databases_checked,
            entries = report.total_entries,
            pending_polls = report.pending_polls,
            "storage integrity check passed"
        );
    } else {
        for error in &report.errors {
            tracing::warn!(error = %error, "storage integrity problem");
        }
    }

    Migrator::run(&env.meta_store()).map_err(|e| BotError::Store(e.into()))?;
    Ok(env)
}

/// Drop every poll, gainer and vote, and note when it happened.
pub fn reset_storage(env: &LmdbEnvironment, now: Timestamp) -> Result<u64, BotError> {
    let store = env.poll_store();
    let dropped = store.poll_count()?;
    store.clear()?;
    env.meta_store()
        .put_meta(LAST_RESET_KEY, &now.as_secs().to_be_bytes())?;
    tracing::warn!(polls = dropped, "all poll data cleared");
    Ok(dropped)
}

/// A running foulbot instance backed by LMDB.
pub struct BotRuntime<N: Notifier> {
    config: BotConfig,
    env: LmdbEnvironment,
    bot: Arc<LmdbBot<N>>,
    scheduler: Arc<Scheduler<LmdbPollStore, SystemClock, N>>,
    shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
}

impl<N: Notifier> BotRuntime<N> {
    /// Open storage and assemble the bot. Call [`start`](Self::start) to
    /// begin sweeping expired polls.
    pub fn open(config: BotConfig, notifier: Arc<N>) -> Result<Self, BotError> {
        config.validate()?;
        let env = open_storage(&config)?;

        let engine = Arc::new(PollEngine::new(
            Arc::new(env.poll_store()),
            SystemClock,
            config.engine_config(),
        ));
        let metrics = Arc::new(BotMetrics::new());
        let bot = Arc::new(Bot::new(
            engine,
            notifier,
            CreatorCooldown::new(config.creator_cooldown_secs),
            metrics,
            StoreRunner::new(config.store_timeout()),
            BotSettings::from(&config),
        ));
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&bot), config.sweep_interval()));

        Ok(Self {
            config,
            env,
            bot,
            scheduler,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn bot(&self) -> &Arc<LmdbBot<N>> {
        &self.bot
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<LmdbPollStore, SystemClock, N>> {
        &self.scheduler
    }

    pub fn shutdown_controller(&self) -> &Arc<ShutdownController> {
        &self.shutdown
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    /// Spawn the expiry scheduler.
    pub fn start(&mut self) {
        let handle = Arc::clone(&self.scheduler).spawn(self.shutdown.subscribe());
        self.task_handles.push(handle);
        tracing::info!(
            data_dir = %self.config.data_dir.display(),
            poll_duration_secs = self.config.poll_duration_secs,
            "foulbot started"
        );
    }

    /// Signal every task to stop and wait for them.
    pub async fn stop(&mut self) -> Result<(), BotError> {
        tracing::info!("foulbot stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        if let Err(e) = self.env.force_sync() {
            tracing::warn!("LMDB force_sync failed: {e}");
        }

        if self.config.enable_metrics {
            let summary = self.bot.metrics().encode()?;
            for line in summary.lines().filter(|l| !l.starts_with('#')) {
                tracing::info!(target: "foulbot::metrics", "{line}");
            }
        }

        tracing::info!("foulbot stopped");
        Ok(())
    }
}
