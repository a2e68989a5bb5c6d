//! Inbound side of the chat surface: what happens when a member asks the bot
//! for something.

use std::sync::Arc;

use rand::Rng;

use foul_engine::{EngineError, InvalidInput, PollEngine, PollRequest};
use foul_store::PollStore;
use foul_types::{ChannelId, Clock, MemberId, Poll, PollKey};

use crate::cooldown::CreatorCooldown;
use crate::metrics::BotMetrics;
use crate::notifier::Notifier;
use crate::render::{self, LeaderboardView};
use crate::runner::StoreRunner;
use crate::{BotConfig, BotError};

/// A member pressed one of the voting buttons on a poll message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteIntent {
    pub poll: PollKey,
    pub voter_id: MemberId,
    pub in_favor: bool,
}

/// Presentation settings the handlers need from [`BotConfig`].
#[derive(Clone, Debug)]
pub struct BotSettings {
    pub leaderboard_size: usize,
    pub show_votes_probability: f64,
    pub guild_id: Option<String>,
}

impl From<&BotConfig> for BotSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            leaderboard_size: config.leaderboard_size,
            show_votes_probability: config.show_votes_probability,
            guild_id: config.guild_id.clone(),
        }
    }
}

/// The bot: poll engine plus the chat-facing policy around it.
pub struct Bot<S: PollStore + 'static, C: Clock + 'static, N: Notifier> {
    engine: Arc<PollEngine<S, C>>,
    notifier: Arc<N>,
    cooldown: CreatorCooldown,
    metrics: Arc<BotMetrics>,
    runner: StoreRunner,
    settings: BotSettings,
}

impl<S: PollStore + 'static, C: Clock + 'static, N: Notifier> Bot<S, C, N> {
    pub fn new(
        engine: Arc<PollEngine<S, C>>,
        notifier: Arc<N>,
        cooldown: CreatorCooldown,
        metrics: Arc<BotMetrics>,
        runner: StoreRunner,
        settings: BotSettings,
    ) -> Self {
        Self {
            engine,
            notifier,
            cooldown,
            metrics,
            runner,
            settings,
        }
    }

    pub fn engine(&self) -> &Arc<PollEngine<S, C>> {
        &self.engine
    }

    pub fn notifier(&self) -> &Arc<N> {
        &self.notifier
    }

    pub fn metrics(&self) -> &Arc<BotMetrics> {
        &self.metrics
    }

    /// Validate, rate-limit, post and persist a new poll.
    ///
    /// The poll message is posted before the poll is stored, because its
    /// message id is part of the poll's identity. A slow store is waited
    /// out. If storing fails, the posted message loses its voting controls
    /// so nobody votes on a poll that does not exist.
    pub async fn on_create_request(&self, request: PollRequest) -> Result<Poll, BotError> {
        let draft = self.engine.draft(request)?;
        let creator = draft.creator_id.clone();
        let claimed_at = self.engine.now();

        if let Err(e) = self.cooldown.try_acquire(&creator, claimed_at) {
            self.metrics.cooldown_rejections.inc();
            tracing::debug!(creator = %creator, "poll creation refused by cooldown");
            return Err(e);
        }

        let view = render::poll_created(&draft);
        let message_id = match self.notifier.post_poll_created(&draft, &view).await {
            Ok(id) => id,
            Err(e) => {
                self.metrics.adapter_failures.inc();
                self.cooldown.release(&creator, claimed_at);
                tracing::warn!(creator = %creator, error = %e, "failed to post poll");
                return Err(e);
            }
        };

        let engine = Arc::clone(&self.engine);
        let key = PollKey::new(draft.channel_id.clone(), message_id.clone());
        let created = self
            .runner
            .run_to_completion("create_poll", move || engine.create_poll(draft, message_id))
            .await;

        match created {
            Ok(poll) => {
                self.metrics.polls_created.inc();
                Ok(poll)
            }
            Err(e) => {
                tracing::error!(poll = %key, error = %e, "failed to persist posted poll");
                if let Err(adapter) = self.notifier.remove_voting_controls(&key).await {
                    self.metrics.adapter_failures.inc();
                    tracing::warn!(poll = %key, error = %adapter, "failed to disarm orphaned poll");
                }
                Err(e.into())
            }
        }
    }

    /// Record (or change) a member's vote and return the acknowledgement.
    pub async fn on_vote_intent(&self, intent: VoteIntent) -> Result<String, BotError> {
        let engine = Arc::clone(&self.engine);
        let VoteIntent {
            poll,
            voter_id,
            in_favor,
        } = intent;
        self.runner
            .run("record_vote", move || {
                engine.record_vote(&poll, &voter_id, in_favor)
            })
            .await?;
        self.metrics.votes_recorded.inc();
        Ok(render::vote_ack(in_favor))
    }

    /// Render and post the leaderboard for `year` (default: the current one).
    pub async fn on_leaderboard_request(
        &self,
        channel: &ChannelId,
        requester: &MemberId,
        year: Option<i32>,
    ) -> Result<LeaderboardView, BotError> {
        let year = year.unwrap_or_else(|| self.engine.current_year());
        let size = self.settings.leaderboard_size;
        let engine = Arc::clone(&self.engine);
        let rows = self
            .runner
            .run("leaderboard", move || engine.leaderboard_top(year, size))
            .await?;

        let view = render::leaderboard(year, rows, requester);
        if let Err(e) = self.notifier.post_leaderboard(channel, &view).await {
            self.metrics.adapter_failures.inc();
            tracing::warn!(channel = %channel, error = %e, "failed to post leaderboard");
            return Err(e);
        }
        Ok(view)
    }

    pub fn on_version_request(&self) -> String {
        render::version_notice()
    }

    /// Finalize expired polls and announce each one.
    ///
    /// A slow store delays the sweep rather than abandoning it, so every
    /// poll this call finalizes is announced. Announcement failures are
    /// logged and counted; the poll stays final. Returns how many polls
    /// were resolved.
    pub async fn resolve_expired_polls(&self) -> Result<usize, BotError> {
        let engine = Arc::clone(&self.engine);
        let evaluated = self
            .runner
            .run_to_completion("evaluate_expired_polls", move || {
                engine.evaluate_expired_polls()
            })
            .await?;

        for poll in &evaluated {
            if poll.passed() {
                self.metrics.polls_passed.inc();
            } else {
                self.metrics.polls_failed.inc();
            }

            let show_votes = rand::thread_rng().gen::<f64>() < self.settings.show_votes_probability;
            let view = render::poll_resolved(poll, show_votes, self.settings.guild_id.as_deref());
            if let Err(e) = self.notifier.post_poll_resolved(poll, &view).await {
                self.metrics.adapter_failures.inc();
                tracing::warn!(poll = %poll.poll.key, error = %e, "failed to announce result");
            }
            if let Err(e) = self.notifier.remove_voting_controls(&poll.poll.key).await {
                self.metrics.adapter_failures.inc();
                tracing::warn!(poll = %poll.poll.key, error = %e, "failed to remove voting controls");
            }
        }

        self.cooldown.prune(self.engine.now());
        Ok(evaluated.len())
    }

    /// The text shown to a requester whose request failed.
    pub fn error_reply(&self, error: &BotError) -> String {
        match error {
            BotError::Engine(EngineError::InvalidInput(InvalidInput::InvalidPoints)) => {
                "Can't give out 0 points".to_string()
            }
            BotError::Engine(EngineError::InvalidInput(invalid)) => {
                let mut text = invalid.to_string();
                if let Some(first) = text.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                text
            }
            BotError::CooldownActive { .. } => render::cooldown_notice(self.cooldown.window_secs()),
            _ => "Something went wrong, try again later.".to_string(),
        }
    }
}
