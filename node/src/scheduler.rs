//! Periodic expiry sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use foul_store::PollStore;
use foul_types::Clock;

use crate::handlers::Bot;
use crate::notifier::Notifier;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickReport {
    /// Another tick was still running.
    Skipped,
    /// The sweep could not read or finalize polls; all stay pending.
    Failed,
    Swept { resolved: usize },
}

/// Drives [`Bot::resolve_expired_polls`] on a fixed interval.
pub struct Scheduler<S: PollStore + 'static, C: Clock + 'static, N: Notifier> {
    bot: Arc<Bot<S, C, N>>,
    interval: Duration,
    running: Mutex<()>,
}

impl<S: PollStore + 'static, C: Clock + 'static, N: Notifier> Scheduler<S, C, N> {
    pub fn new(bot: Arc<Bot<S, C, N>>, interval: Duration) -> Self {
        Self {
            bot,
            interval,
            running: Mutex::new(()),
        }
    }

    /// Run one sweep now, unless one is already in progress.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::debug!("previous sweep still running, skipping tick");
            return TickReport::Skipped;
        };

        let metrics = self.bot.metrics();
        let started = Instant::now();
        let result = self.bot.resolve_expired_polls().await;
        metrics
            .sweep_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(resolved) => TickReport::Swept { resolved },
            Err(e) => {
                metrics.sweep_failures.inc();
                tracing::warn!(error = %e, "expiry sweep failed, will retry next tick");
                TickReport::Failed
            }
        }
    }

    /// Spawn the sweep loop. It stops when `shutdown_rx` fires.
    pub fn spawn(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = self.interval.as_secs(), "expiry scheduler started");
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("expiry scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let TickReport::Swept { resolved } = self.tick().await {
                            if resolved > 0 {
                                tracing::info!(resolved, "expiry sweep announced results");
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::CreatorCooldown;
    use crate::handlers::{BotSettings, VoteIntent};
    use crate::metrics::BotMetrics;
    use crate::notifier::RecordingNotifier;
    use crate::runner::StoreRunner;
    use crate::ShutdownController;
    use foul_engine::{EngineConfig, PollEngine, PollRequest};
    use foul_nullables::{NullClock, NullStore};
    use foul_types::{ChannelId, MemberId, PollOutcome};

    type TestScheduler = Scheduler<NullStore, NullClock, RecordingNotifier>;

    fn scheduler() -> (Arc<TestScheduler>, Arc<NullStore>, NullClock, Arc<RecordingNotifier>) {
        scheduler_with_timeout(Duration::from_secs(5))
    }

    fn scheduler_with_timeout(
        store_timeout: Duration,
    ) -> (Arc<TestScheduler>, Arc<NullStore>, NullClock, Arc<RecordingNotifier>) {
        let store = Arc::new(NullStore::new());
        let clock = NullClock::new(1_700_000_000);
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(PollEngine::new(
            Arc::clone(&store),
            clock.clone(),
            EngineConfig {
                poll_duration_secs: 60,
            },
        ));
        let bot = Arc::new(Bot::new(
            engine,
            Arc::clone(&notifier),
            CreatorCooldown::new(300),
            Arc::new(BotMetrics::new()),
            StoreRunner::new(store_timeout),
            BotSettings {
                leaderboard_size: 10,
                show_votes_probability: 0.5,
                guild_id: None,
            },
        ));
        let scheduler = Arc::new(Scheduler::new(bot, Duration::from_millis(10)));
        (scheduler, store, clock, notifier)
    }

    async fn open_poll(scheduler: &TestScheduler, creator: &str) -> foul_types::Poll {
        scheduler
            .bot
            .on_create_request(PollRequest {
                channel_id: ChannelId::new("general"),
                creator_id: MemberId::new(creator),
                gainer_ids: vec![MemberId::new("u1")],
                points: 5,
                reason: "demo".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn tick_resolves_due_polls_once() {
        let (scheduler, _, clock, notifier) = scheduler();
        let poll = open_poll(&scheduler, "c1").await;
        scheduler
            .bot
            .on_vote_intent(VoteIntent {
                poll: poll.key.clone(),
                voter_id: MemberId::new("u2"),
                in_favor: true,
            })
            .await
            .unwrap();

        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 0 });
        clock.advance(60);
        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 1 });
        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 0 });
        assert_eq!(notifier.resolved().len(), 1);
        assert_eq!(notifier.resolved()[0].message.title, "Passed");
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let (scheduler, _, _, _) = scheduler();
        let _held = scheduler.running.lock().await;
        assert_eq!(scheduler.tick().await, TickReport::Skipped);
    }

    #[tokio::test]
    async fn store_outage_fails_tick_and_recovers() {
        let (scheduler, store, clock, _) = scheduler();
        let poll = open_poll(&scheduler, "c1").await;
        clock.advance(60);

        store.set_unavailable(true);
        assert_eq!(scheduler.tick().await, TickReport::Failed);
        assert_eq!(scheduler.bot.metrics().sweep_failures.get(), 1);

        store.set_unavailable(false);
        assert_eq!(
            store.get_poll(&poll.key).unwrap().unwrap().outcome,
            PollOutcome::Pending
        );
        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 1 });
    }

    #[tokio::test]
    async fn slow_sweep_holds_the_tick_until_announced() {
        let (scheduler, store, clock, notifier) = scheduler_with_timeout(Duration::from_millis(50));
        let poll = open_poll(&scheduler, "c1").await;
        clock.advance(60);
        store.set_write_delay(Duration::from_millis(200));

        let (first, overlapping) = tokio::join!(scheduler.tick(), async {
            tokio::time::sleep(Duration::from_millis(80)).await;
            scheduler.tick().await
        });
        assert_eq!(first, TickReport::Swept { resolved: 1 });
        assert_eq!(overlapping, TickReport::Skipped);
        assert_eq!(notifier.resolved().len(), 1);
        assert_eq!(notifier.controls_removed(), vec![poll.key.clone()]);

        store.set_write_delay(Duration::ZERO);
        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 0 });
    }

    #[tokio::test]
    async fn votes_during_sweep_never_reopen_a_poll() {
        let (scheduler, store, clock, notifier) = scheduler();
        let poll = open_poll(&scheduler, "c1").await;
        clock.advance(60);

        let voting = async {
            for i in 0..20 {
                scheduler
                    .bot
                    .on_vote_intent(VoteIntent {
                        poll: poll.key.clone(),
                        voter_id: MemberId::new(format!("v{i}")),
                        in_favor: true,
                    })
                    .await
                    .unwrap();
            }
        };
        let sweeping = async {
            let mut resolved = 0;
            for _ in 0..5 {
                if let TickReport::Swept { resolved: n } = scheduler.tick().await {
                    resolved += n;
                }
                tokio::task::yield_now().await;
            }
            resolved
        };
        let ((), resolved) = tokio::join!(voting, sweeping);

        assert_eq!(resolved, 1);
        assert_eq!(notifier.resolved().len(), 1);
        let stored = store.get_poll(&poll.key).unwrap().unwrap().outcome;
        assert!(stored.is_terminal());
        assert_eq!(scheduler.tick().await, TickReport::Swept { resolved: 0 });
        assert_eq!(store.get_poll(&poll.key).unwrap().unwrap().outcome, stored);
    }

    #[tokio::test]
    async fn spawned_loop_sweeps_and_stops_on_shutdown() {
        let (scheduler, store, clock, notifier) = scheduler();
        let poll = open_poll(&scheduler, "c1").await;
        clock.advance(60);

        let shutdown = ShutdownController::new();
        let handle = Arc::clone(&scheduler).spawn(shutdown.subscribe());

        for _ in 0..100 {
            if !notifier.resolved().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.resolved().len(), 1);
        assert_eq!(
            store.get_poll(&poll.key).unwrap().unwrap().outcome,
            PollOutcome::Failed
        );

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }
}
