//! Line-oriented chat surface on stdin.
//!
//! Every line is one request, issued on behalf of the member named in it:
//!
//! ```text
//! own <creator> <gainer[,gainer...]> <points> <reason...>
//! vote <voter> <message-id> yes|no
//! leaderboard <requester> [year]
//! sweep
//! metrics
//! version
//! quit
//! ```

use foul_engine::PollRequest;
use foul_types::{ChannelId, MemberId, PollKey};

/// Channel all console requests are issued in.
pub const CONSOLE_CHANNEL: &str = "console";

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Own(PollRequest),
    Vote {
        voter: MemberId,
        poll: PollKey,
        in_favor: bool,
    },
    Leaderboard {
        requester: MemberId,
        year: Option<i32>,
    },
    Sweep,
    Metrics,
    Version,
    Quit,
}

pub const USAGE: &str = "commands: own <creator> <gainer,...> <points> <reason> | \
vote <voter> <message-id> yes|no | leaderboard <requester> [year] | sweep | metrics | version | quit";

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "own" => {
            let creator = next_word(&mut words, "creator")?;
            let gainers = next_word(&mut words, "gainers")?;
            let points = next_word(&mut words, "points")?;
            let points: i64 = points
                .parse()
                .map_err(|_| format!("points must be an integer, got {points:?}"))?;
            let reason = words.collect::<Vec<_>>().join(" ");
            ConsoleCommand::Own(PollRequest {
                channel_id: ChannelId::new(CONSOLE_CHANNEL),
                creator_id: MemberId::new(creator),
                gainer_ids: gainers
                    .split(',')
                    .filter(|g| !g.is_empty())
                    .map(MemberId::new)
                    .collect(),
                points,
                reason,
            })
        }
        "vote" => {
            let voter = next_word(&mut words, "voter")?;
            let message = next_word(&mut words, "message id")?;
            let in_favor = match next_word(&mut words, "yes|no")?.to_ascii_lowercase().as_str() {
                "yes" | "y" | "for" => true,
                "no" | "n" | "against" => false,
                other => return Err(format!("vote must be yes or no, got {other:?}")),
            };
            ConsoleCommand::Vote {
                voter: MemberId::new(voter),
                poll: PollKey::new(CONSOLE_CHANNEL, message),
                in_favor,
            }
        }
        "leaderboard" => {
            let requester = next_word(&mut words, "requester")?;
            let year = words
                .next()
                .map(|y| y.parse::<i32>().map_err(|_| format!("invalid year {y:?}")))
                .transpose()?;
            ConsoleCommand::Leaderboard {
                requester: MemberId::new(requester),
                year,
            }
        }
        "sweep" => ConsoleCommand::Sweep,
        "metrics" => ConsoleCommand::Metrics,
        "version" => ConsoleCommand::Version,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command {other:?}")),
    };
    Ok(Some(command))
}

fn next_word<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<&'a str, String> {
    words.next().ok_or_else(|| format!("missing {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_own_with_multiword_reason() {
        let cmd = parse_line("own alice bob,carol,bob -3 ate the last slice").unwrap();
        let req = match cmd {
            Some(ConsoleCommand::Own(req)) => req,
            other => panic!("expected own, got {other:?}"),
        };
        assert_eq!(req.creator_id, MemberId::new("alice"));
        assert_eq!(req.gainer_ids.len(), 3);
        assert_eq!(req.points, -3);
        assert_eq!(req.reason, "ate the last slice");
        assert_eq!(req.channel_id, ChannelId::new(CONSOLE_CHANNEL));
    }

    #[test]
    fn parses_vote() {
        assert_eq!(
            parse_line("vote bob 17 no").unwrap(),
            Some(ConsoleCommand::Vote {
                voter: MemberId::new("bob"),
                poll: PollKey::new(CONSOLE_CHANNEL, "17"),
                in_favor: false,
            })
        );
    }

    #[test]
    fn parses_leaderboard_with_optional_year() {
        assert_eq!(
            parse_line("leaderboard bob").unwrap(),
            Some(ConsoleCommand::Leaderboard {
                requester: MemberId::new("bob"),
                year: None,
            })
        );
        assert_eq!(
            parse_line("leaderboard bob 2024").unwrap(),
            Some(ConsoleCommand::Leaderboard {
                requester: MemberId::new("bob"),
                year: Some(2024),
            })
        );
        assert!(parse_line("leaderboard bob twenty").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_line("own alice bob many reasons").is_err());
        assert!(parse_line("vote bob 17 maybe").is_err());
        assert!(parse_line("dance").is_err());
        assert!(parse_line("own").is_err());
    }

    #[test]
    fn blank_and_simple_commands() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("SWEEP").unwrap(), Some(ConsoleCommand::Sweep));
        assert_eq!(parse_line("quit").unwrap(), Some(ConsoleCommand::Quit));
    }
}
