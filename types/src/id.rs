//! Opaque chat-platform identifiers.
//!
//! The platform hands out snowflake-like strings; the bot never interprets
//! them beyond equality and ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest identifier, in bytes, that fits a [`PollKey`] segment.
pub const MAX_ID_LEN: usize = u16::MAX as usize;

/// An identifier too long for the binary key layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{field} id is {len} bytes, limit is {max}", max = MAX_ID_LEN)]
pub struct KeyTooLong {
    pub field: &'static str,
    pub len: usize,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Return the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Whether the id fits a binary key segment.
            pub fn fits_key(&self) -> bool {
                self.0.len() <= MAX_ID_LEN
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// A text channel a poll was posted in.
    ChannelId
);
string_id!(
    /// The platform message carrying a poll.
    MessageId
);
string_id!(
    /// A community member: creator, gainer or voter.
    MemberId
);

impl MemberId {
    /// Render the member as a platform mention, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Identity of a poll: the channel and the message it was posted as.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PollKey {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl PollKey {
    pub fn new(channel_id: impl Into<ChannelId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Binary key used by ordered key-value stores.
    ///
    /// Layout: `u16_be(channel.len) ++ channel ++ u16_be(message.len) ++ message`.
    /// The length prefixes make every encoded key a prefix of exactly the keys
    /// that extend it, so `encode() ++ suffix` range scans never bleed into a
    /// neighbouring poll. A segment longer than [`MAX_ID_LEN`] bytes is
    /// refused rather than truncated.
    pub fn encode(&self) -> Result<Vec<u8>, KeyTooLong> {
        let channel = self.channel_id.as_str().as_bytes();
        let message = self.message_id.as_str().as_bytes();
        let mut key = Vec::with_capacity(4 + channel.len() + message.len());
        key.extend_from_slice(&segment_len("channel", channel)?.to_be_bytes());
        key.extend_from_slice(channel);
        key.extend_from_slice(&segment_len("message", message)?.to_be_bytes());
        key.extend_from_slice(message);
        Ok(key)
    }

    /// Decode a key produced by [`PollKey::encode`], returning the key and
    /// the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Option<(Self, usize)> {
        let (channel, rest_at) = read_segment(bytes, 0)?;
        let (message, end) = read_segment(bytes, rest_at)?;
        Some((Self::new(channel, message), end))
    }
}

fn segment_len(field: &'static str, raw: &[u8]) -> Result<u16, KeyTooLong> {
    u16::try_from(raw.len()).map_err(|_| KeyTooLong {
        field,
        len: raw.len(),
    })
}

fn read_segment(bytes: &[u8], at: usize) -> Option<(String, usize)> {
    let len_bytes: [u8; 2] = bytes.get(at..at + 2)?.try_into().ok()?;
    let len = u16::from_be_bytes(len_bytes) as usize;
    let start = at + 2;
    let raw = bytes.get(start..start + len)?;
    let s = std::str::from_utf8(raw).ok()?.to_string();
    Some((s, start + len))
}

impl fmt::Display for PollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}
