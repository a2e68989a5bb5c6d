//! Per-creator rate limit on poll creation.

use std::collections::HashMap;
use std::sync::Mutex;

use foul_types::{MemberId, Timestamp};

use crate::BotError;

/// Allows one poll per creator per window.
///
/// Check and update happen under one lock acquisition, so concurrent
/// requests from the same creator cannot both pass. State is process-local
/// and starts empty after a restart.
pub struct CreatorCooldown {
    window_secs: u64,
    last_created: Mutex<HashMap<MemberId, Timestamp>>,
}

impl CreatorCooldown {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            last_created: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Claim the creator's slot at `now`, or report how long until it frees.
    pub fn try_acquire(&self, creator: &MemberId, now: Timestamp) -> Result<(), BotError> {
        let mut last = self.lock();
        if let Some(previous) = last.get(creator) {
            let elapsed = previous.elapsed_since(now);
            if elapsed < self.window_secs {
                return Err(BotError::CooldownActive {
                    remaining_secs: self.window_secs - elapsed,
                });
            }
        }
        last.insert(creator.clone(), now);
        Ok(())
    }

    /// Give back a slot claimed at `claimed_at` whose poll never got posted.
    pub fn release(&self, creator: &MemberId, claimed_at: Timestamp) {
        let mut last = self.lock();
        if last.get(creator) == Some(&claimed_at) {
            last.remove(creator);
        }
    }

    /// Drop entries whose window has passed.
    pub fn prune(&self, now: Timestamp) -> usize {
        let mut last = self.lock();
        let before = last.len();
        last.retain(|_, t| t.elapsed_since(now) < self.window_secs);
        before - last.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MemberId, Timestamp>> {
        // Entries are plain timestamps, so a poisoned map is still consistent.
        self.last_created
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
