//! Property tests for the per-creator cooldown window.

use foul_node::{BotError, CreatorCooldown};
use foul_types::{MemberId, Timestamp};
use proptest::prelude::*;

const START: u64 = 1_700_000_000;

proptest! {
    /// A second claim is refused exactly while the window is open, and the
    /// reported wait plus the elapsed time is the full window.
    #[test]
    fn second_claim_respects_window(window in 1u64..10_000, gap in 0u64..20_000) {
        let cooldown = CreatorCooldown::new(window);
        let creator = MemberId::new("c1");
        cooldown.try_acquire(&creator, Timestamp::new(START)).unwrap();

        match cooldown.try_acquire(&creator, Timestamp::new(START + gap)) {
            Ok(()) => prop_assert!(gap >= window),
            Err(BotError::CooldownActive { remaining_secs }) => {
                prop_assert!(gap < window);
                prop_assert_eq!(remaining_secs + gap, window);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// Other creators are never held back by someone else's claim.
    #[test]
    fn creators_are_independent(window in 1u64..10_000, others in 1usize..20) {
        let cooldown = CreatorCooldown::new(window);
        let now = Timestamp::new(START);
        cooldown.try_acquire(&MemberId::new("c0"), now).unwrap();
        for i in 1..=others {
            let creator = MemberId::new(format!("c{i}"));
            prop_assert!(cooldown.try_acquire(&creator, now).is_ok());
        }
    }

    /// Pruning after the window empties the map so every creator may post again.
    #[test]
    fn prune_frees_expired_claims(window in 1u64..1_000, creators in 1usize..20) {
        let cooldown = CreatorCooldown::new(window);
        for i in 0..creators {
            cooldown
                .try_acquire(&MemberId::new(format!("c{i}")), Timestamp::new(START))
                .unwrap();
        }
        let later = Timestamp::new(START + window);
        prop_assert_eq!(cooldown.prune(later), creators);
        prop_assert!(cooldown.try_acquire(&MemberId::new("c0"), later).is_ok());
    }
}
