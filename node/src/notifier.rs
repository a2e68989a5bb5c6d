//! Outbound side of the chat surface.
//!
//! The bot never talks to a chat platform directly; it hands rendered views
//! to a [`Notifier`]. The daemon ships [`LogNotifier`], which writes every
//! post to the log; tests use [`RecordingNotifier`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use foul_types::{ChannelId, EvaluatedPoll, MessageId, PollDraft, PollKey};

use crate::render::{LeaderboardView, PollCreatedView, PollResolvedView};
use crate::BotError;

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Post a new poll with its voting controls and discussion thread.
    /// Returns the id of the posted poll message.
    async fn post_poll_created(
        &self,
        draft: &PollDraft,
        view: &PollCreatedView,
    ) -> Result<MessageId, BotError>;

    /// Announce a finalized poll and open its result thread.
    async fn post_poll_resolved(
        &self,
        evaluated: &EvaluatedPoll,
        view: &PollResolvedView,
    ) -> Result<(), BotError>;

    /// Strip the voting buttons from a poll message.
    async fn remove_voting_controls(&self, key: &PollKey) -> Result<(), BotError>;

    async fn post_leaderboard(
        &self,
        channel: &ChannelId,
        view: &LeaderboardView,
    ) -> Result<MessageId, BotError>;
}

/// Writes every outbound post to the log instead of a chat platform.
pub struct LogNotifier {
    next_id: AtomicU64,
}

impl LogNotifier {
    /// Message ids are handed out counting up from `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
        }
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn post_poll_created(
        &self,
        draft: &PollDraft,
        view: &PollCreatedView,
    ) -> Result<MessageId, BotError> {
        let message_id = self.next_message_id();
        tracing::info!(
            channel = %draft.channel_id,
            message_id = %message_id,
            title = %view.message.title,
            thread = %view.thread.name,
            expiry = %view.message.timestamp.as_deref().unwrap_or_default(),
            "poll posted"
        );
        for field in &view.message.fields {
            tracing::info!(message_id = %message_id, name = %field.name, value = %field.value, "poll field");
        }
        Ok(message_id)
    }

    async fn post_poll_resolved(
        &self,
        evaluated: &EvaluatedPoll,
        view: &PollResolvedView,
    ) -> Result<(), BotError> {
        tracing::info!(
            poll = %evaluated.poll.key,
            title = %view.message.title,
            color = view.message.color.unwrap_or_default(),
            "poll result posted"
        );
        for field in &view.message.fields {
            tracing::info!(poll = %view.poll, name = %field.name, value = %field.value, "result field");
        }
        Ok(())
    }

    async fn remove_voting_controls(&self, key: &PollKey) -> Result<(), BotError> {
        tracing::debug!(poll = %key, "voting controls removed");
        Ok(())
    }

    async fn post_leaderboard(
        &self,
        channel: &ChannelId,
        view: &LeaderboardView,
    ) -> Result<MessageId, BotError> {
        let message_id = self.next_message_id();
        tracing::info!(
            channel = %channel,
            message_id = %message_id,
            title = %view.message.title,
            rows = view.rows.len(),
            "leaderboard posted"
        );
        if let Some(description) = &view.message.description {
            for line in description.lines().filter(|l| !l.is_empty()) {
                tracing::info!(message_id = %message_id, "{line}");
            }
        }
        Ok(message_id)
    }
}

/// One outbound call seen by a [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq)]
pub enum Posted {
    PollCreated {
        draft: PollDraft,
        view: PollCreatedView,
        message_id: MessageId,
    },
    PollResolved {
        evaluated: EvaluatedPoll,
        view: PollResolvedView,
    },
    ControlsRemoved(PollKey),
    Leaderboard {
        channel: ChannelId,
        view: LeaderboardView,
    },
}

/// A notifier that remembers what it was asked to post.
///
/// Each outbound operation can be switched to fail, to exercise the bot's
/// handling of an unreachable chat platform.
#[derive(Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Posted>>,
    next_id: AtomicU64,
    fail_created: AtomicBool,
    fail_resolved: AtomicBool,
    fail_controls: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_created(&self, fail: bool) {
        self.fail_created.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_resolved(&self, fail: bool) {
        self.fail_resolved.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_controls(&self, fail: bool) {
        self.fail_controls.store(fail, Ordering::SeqCst);
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.lock().clone()
    }

    /// Resolution announcements, in posting order.
    pub fn resolved(&self) -> Vec<PollResolvedView> {
        self.lock()
            .iter()
            .filter_map(|p| match p {
                Posted::PollResolved { view, .. } => Some(view.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn controls_removed(&self) -> Vec<PollKey> {
        self.lock()
            .iter()
            .filter_map(|p| match p {
                Posted::ControlsRemoved(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Posted>> {
        self.posted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), BotError> {
        if flag.load(Ordering::SeqCst) {
            return Err(BotError::AdapterFailure(format!("{op} switched off")));
        }
        Ok(())
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_poll_created(
        &self,
        draft: &PollDraft,
        view: &PollCreatedView,
    ) -> Result<MessageId, BotError> {
        Self::check(&self.fail_created, "post_poll_created")?;
        let message_id = self.next_message_id();
        self.lock().push(Posted::PollCreated {
            draft: draft.clone(),
            view: view.clone(),
            message_id: message_id.clone(),
        });
        Ok(message_id)
    }

    async fn post_poll_resolved(
        &self,
        evaluated: &EvaluatedPoll,
        view: &PollResolvedView,
    ) -> Result<(), BotError> {
        Self::check(&self.fail_resolved, "post_poll_resolved")?;
        self.lock().push(Posted::PollResolved {
            evaluated: evaluated.clone(),
            view: view.clone(),
        });
        Ok(())
    }

    async fn remove_voting_controls(&self, key: &PollKey) -> Result<(), BotError> {
        Self::check(&self.fail_controls, "remove_voting_controls")?;
        self.lock().push(Posted::ControlsRemoved(key.clone()));
        Ok(())
    }

    async fn post_leaderboard(
        &self,
        channel: &ChannelId,
        view: &LeaderboardView,
    ) -> Result<MessageId, BotError> {
        let message_id = self.next_message_id();
        self.lock().push(Posted::Leaderboard {
            channel: channel.clone(),
            view: view.clone(),
        });
        Ok(message_id)
    }
}
