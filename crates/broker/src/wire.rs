//! Wire formats for the delivery protocol
//!
//! Everything that touches the store is ASCII text:
//! - queue entries and notify events carry an [`Envelope`],
//!   `"<decimal-sequence>/<payload>"`;
//! - registry members are a [`SubscriptionKey`], `"<subscriberId>/<channel>"`.
//!
//! A payload that is exactly `EXIT` or `QUIT` (any case) is a termination
//! token rather than data.

use thiserror::Error;

/// Wire-level parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("missing '/' separator")]
    MissingSeparator,

    #[error("invalid sequence number: {0:?}")]
    BadSequence(String),
}

/// A sequenced message as it sits in a durable queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Strictly increasing within one publisher stream, never reused
    pub sequence: u64,
    /// Serialized bar set, or a bare termination token
    pub payload: String,
}

impl Envelope {
    pub fn new(sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// Encode to the `"<sequence>/<payload>"` wire form
    pub fn encode(&self) -> String {
        format!("{}/{}", self.sequence, self.payload)
    }

    /// Parse the wire form. The first `/` splits sequence from payload, so
    /// payloads may themselves contain `/`.
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let (sequence, payload) = raw.split_once('/').ok_or(WireError::MissingSeparator)?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| WireError::BadSequence(sequence.to_string()))?;
        Ok(Self {
            sequence,
            payload: payload.to_string(),
        })
    }

    /// Whether the payload is an in-band termination token
    pub fn is_termination(&self) -> bool {
        is_termination_token(&self.payload)
    }
}

/// Case-insensitive exact match against the termination tokens
pub fn is_termination_token(payload: &str) -> bool {
    payload.eq_ignore_ascii_case("exit") || payload.eq_ignore_ascii_case("quit")
}

/// Identity of one subscription: who is listening, and to what
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub subscriber_id: String,
    pub channel: String,
}

impl SubscriptionKey {
    pub fn new(subscriber_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            channel: channel.into(),
        }
    }

    /// Durable string form, also the name of the subscription's queue
    pub fn encode(&self) -> String {
        format!("{}/{}", self.subscriber_id, self.channel)
    }

    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let (subscriber_id, channel) = raw.split_once('/').ok_or(WireError::MissingSeparator)?;
        Ok(Self::new(subscriber_id, channel))
    }
}
