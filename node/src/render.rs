//! Chat-platform-neutral message views and the bot's canned replies.

use serde::Serialize;

use foul_types::{EvaluatedPoll, LeaderboardEntry, MemberId, PollDraft, PollKey};
use foul_utils::{format_duration, join_or, truncate};

pub const COLOR_PASSED: u32 = 0x417e4b;
pub const COLOR_FAILED: u32 = 0xc94543;

/// Longest thread name the chat platform accepts.
pub const THREAD_NAME_MAX: usize = 100;

/// Component id of the in-favor voting button.
pub const VOTE_YES_ID: &str = "vote_yes";
/// Component id of the against voting button.
pub const VOTE_NO_ID: &str = "vote_no";

pub const THUMBS_UP: &str = "\u{1F44D}";
pub const THUMBS_DOWN: &str = "\u{1F44E}";

/// Rank prefixes for the leaderboard; its length caps the rows shown.
pub const RANK_EMOJI: [&str; 10] = [
    ":one:",
    ":two:",
    ":three:",
    ":four:",
    ":five:",
    ":six:",
    ":seven:",
    ":eight:",
    ":nine:",
    ":keycap_ten:",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

/// A voting button attached to a poll message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: &'static str,
    pub emoji: &'static str,
    pub in_favor: bool,
}

/// An embed-style message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<Field>,
    pub timestamp: Option<String>,
    pub buttons: Vec<Button>,
}

/// A thread opened on a posted message, with an optional first message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadView {
    pub name: String,
    pub intro: Option<String>,
}

/// Everything posted when a poll opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollCreatedView {
    pub message: MessageView,
    pub thread: ThreadView,
}

/// Everything posted when a poll resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollResolvedView {
    pub poll: PollKey,
    pub message: MessageView,
    pub thread: ThreadView,
}

/// A rendered leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardView {
    pub year: i32,
    pub rows: Vec<LeaderboardEntry>,
    pub message: MessageView,
    pub thread: ThreadView,
}

pub fn mentions(members: &[MemberId]) -> Vec<String> {
    members.iter().map(MemberId::mention).collect()
}

/// `+5`, `-3`.
pub fn signed_points(points: i64) -> String {
    format!("{points:+}")
}

pub fn poll_created(draft: &PollDraft) -> PollCreatedView {
    let gainers = mentions(&draft.gainer_ids);
    let message = MessageView {
        title: "Own".to_string(),
        fields: vec![
            Field::new("Creator", draft.creator_id.mention(), true),
            Field::new("Gainers", gainers.join("\n"), true),
            Field::new("Points", signed_points(draft.points), true),
            Field::new("Reason", draft.reason.clone(), false),
        ],
        timestamp: Some(draft.expiry.to_rfc3339()),
        buttons: vec![
            Button {
                custom_id: VOTE_YES_ID,
                emoji: THUMBS_UP,
                in_favor: true,
            },
            Button {
                custom_id: VOTE_NO_ID,
                emoji: THUMBS_DOWN,
                in_favor: false,
            },
        ],
        ..MessageView::default()
    };
    PollCreatedView {
        message,
        thread: ThreadView {
            name: truncate(&draft.reason, THREAD_NAME_MAX),
            intro: Some(gainers.join("\n")),
        },
    }
}

/// Link back to the poll message; plain text when the server is unknown.
pub fn message_link(guild_id: Option<&str>, key: &PollKey) -> Option<String> {
    guild_id.map(|guild| {
        format!(
            "https://discord.com/channels/{guild}/{}/{}",
            key.channel_id, key.message_id
        )
    })
}

pub fn poll_resolved(
    evaluated: &EvaluatedPoll,
    show_votes: bool,
    guild_id: Option<&str>,
) -> PollResolvedView {
    let poll = &evaluated.poll;
    let reason = match message_link(guild_id, &poll.key) {
        Some(link) => format!("[{}]({link})", poll.reason),
        None => poll.reason.clone(),
    };

    let mut fields = vec![
        Field::new("Creator", poll.creator_id.mention(), true),
        Field::new("Gainers", mentions(&poll.gainer_ids).join("\n"), true),
        Field::new("Points", signed_points(poll.points), true),
        Field::new("Reason", reason, false),
    ];
    if show_votes {
        fields.push(Field::new(
            "Votes For",
            join_or(&mentions(&evaluated.votes_for), "\n", "none"),
            true,
        ));
        fields.push(Field::new(
            "Votes Against",
            join_or(&mentions(&evaluated.votes_against), "\n", "none"),
            true,
        ));
    }

    let (title, color) = if evaluated.passed() {
        ("Passed", COLOR_PASSED)
    } else {
        ("Failed", COLOR_FAILED)
    };
    PollResolvedView {
        poll: poll.key.clone(),
        message: MessageView {
            title: title.to_string(),
            color: Some(color),
            fields,
            ..MessageView::default()
        },
        thread: ThreadView {
            name: "Result".to_string(),
            intro: None,
        },
    }
}

pub fn leaderboard(year: i32, rows: Vec<LeaderboardEntry>, requester: &MemberId) -> LeaderboardView {
    let mut description: String = rows
        .iter()
        .zip(RANK_EMOJI)
        .map(|(row, rank)| format!("{rank} {}: {}\n", row.member_id.mention(), row.total_points))
        .collect();
    description.push_str(&format!("\nMade by {}", requester.mention()));

    let shown = rows.len().min(RANK_EMOJI.len());
    let mut rows = rows;
    rows.truncate(shown);
    LeaderboardView {
        year,
        rows,
        message: MessageView {
            title: format!("Leaderboard {year}"),
            description: Some(description),
            ..MessageView::default()
        },
        thread: ThreadView {
            name: "Leaderboard".to_string(),
            intro: None,
        },
    }
}

pub fn vote_ack(in_favor: bool) -> String {
    format!(
        "Vote recorded: {}",
        if in_favor { THUMBS_UP } else { THUMBS_DOWN }
    )
}

pub fn cooldown_notice(window_secs: u64) -> String {
    let window = match window_secs {
        60 => "minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format_duration(s),
    };
    format!("You can only create one poll every {window}.")
}

pub fn version_notice() -> String {
    format!("Current version: {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foul_types::{ChannelId, MessageId, PollOutcome, Timestamp};

    fn draft() -> PollDraft {
        PollDraft {
            channel_id: ChannelId::new("c1"),
            creator_id: MemberId::new("10"),
            points: 5,
            reason: "demo".into(),
            gainer_ids: vec![MemberId::new("20"), MemberId::new("21")],
            expiry: Timestamp::new(1_704_067_200),
        }
    }

    fn evaluated(outcome: PollOutcome, votes_for: &[&str]) -> EvaluatedPoll {
        let mut poll = draft().into_poll(MessageId::new("m1"));
        poll.outcome = outcome;
        EvaluatedPoll {
            poll,
            votes_for: votes_for.iter().map(|v| MemberId::new(*v)).collect(),
            votes_against: vec![],
        }
    }

    #[test]
    fn creation_view_matches_layout() {
        let view = poll_created(&draft());
        assert_eq!(view.message.title, "Own");
        let names: Vec<&str> = view.message.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Creator", "Gainers", "Points", "Reason"]);
        assert_eq!(view.message.fields[1].value, "<@20>\n<@21>");
        assert_eq!(view.message.fields[2].value, "+5");
        assert_eq!(view.message.timestamp.as_deref(), Some("2024-01-01T00:00:00+00:00"));
        assert_eq!(view.message.buttons.len(), 2);
        assert_eq!(view.thread.name, "demo");
        assert_eq!(view.thread.intro.as_deref(), Some("<@20>\n<@21>"));
    }

    #[test]
    fn long_reason_truncates_thread_name() {
        let mut d = draft();
        d.reason = "x".repeat(150);
        let view = poll_created(&d);
        assert_eq!(view.thread.name.chars().count(), THREAD_NAME_MAX);
        assert!(view.thread.name.ends_with("..."));
    }

    #[test]
    fn passed_resolution_is_green_with_votes() {
        let view = poll_resolved(&evaluated(PollOutcome::Passed, &["30"]), true, Some("g"));
        assert_eq!(view.message.title, "Passed");
        assert_eq!(view.message.color, Some(COLOR_PASSED));
        assert_eq!(
            view.message.fields[3].value,
            "[demo](https://discord.com/channels/g/c1/m1)"
        );
        assert_eq!(view.message.fields[4].value, "<@30>");
        assert_eq!(view.message.fields[5].value, "none");
        assert_eq!(view.thread.name, "Result");
    }

    #[test]
    fn failed_resolution_hides_votes_when_not_shown() {
        let view = poll_resolved(&evaluated(PollOutcome::Failed, &[]), false, None);
        assert_eq!(view.message.title, "Failed");
        assert_eq!(view.message.color, Some(COLOR_FAILED));
        assert_eq!(view.message.fields.len(), 4);
        assert_eq!(view.message.fields[3].value, "demo");
    }

    #[test]
    fn negative_points_render_signed() {
        assert_eq!(signed_points(-3), "-3");
        assert_eq!(signed_points(12), "+12");
    }

    #[test]
    fn leaderboard_caps_at_ten_with_footer() {
        let rows: Vec<LeaderboardEntry> = (0..12)
            .map(|i| LeaderboardEntry::new(MemberId::new(format!("{i}")), 100 - i))
            .collect();
        let view = leaderboard(2024, rows, &MemberId::new("99"));
        assert_eq!(view.rows.len(), 10);
        assert_eq!(view.message.title, "Leaderboard 2024");
        let description = view.message.description.unwrap();
        assert!(description.starts_with(":one: <@0>: 100\n"));
        assert!(description.contains(":keycap_ten: <@9>: 91\n"));
        assert!(!description.contains("<@10>"));
        assert!(description.ends_with("\nMade by <@99>"));
    }

    #[test]
    fn empty_leaderboard_still_has_footer() {
        let view = leaderboard(2024, vec![], &MemberId::new("99"));
        assert_eq!(view.message.description.as_deref(), Some("\nMade by <@99>"));
    }

    #[test]
    fn canned_replies() {
        assert_eq!(vote_ack(true), "Vote recorded: 👍");
        assert_eq!(vote_ack(false), "Vote recorded: 👎");
        assert_eq!(
            cooldown_notice(300),
            "You can only create one poll every 5 minutes."
        );
        assert_eq!(cooldown_notice(60), "You can only create one poll every minute.");
        assert_eq!(cooldown_notice(90), "You can only create one poll every 1m 30s.");
        assert!(version_notice().starts_with("Current version: "));
    }
}
