//! Termination-channel records.
//!
//! The termination channel carries free-text lines: one `Terminate` request
//! written by the initiator, then one `Ack <name>` line per peer. Parsing is
//! order-independent set membership, so simultaneous announcements are
//! harmless however the read-modify-write cycles interleave.

use std::collections::BTreeSet;

use crate::error::CodecError;

/// The request line written by the termination initiator.
pub const TERMINATE_REQUEST: &str = "Terminate";

/// Prefix of each acknowledgment line.
pub const ACK_PREFIX: &str = "Ack";

/// Parsed contents of the termination channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationLedger {
    requested: bool,
    acks: BTreeSet<String>,
}

impl TerminationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a frame. Unknown lines are ignored so the format can grow
    /// without breaking old readers.
    pub fn from_frame(frame: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(frame)?;
        Ok(Self::parse(text))
    }

    /// Parses channel text, independent of line ordering.
    pub fn parse(text: &str) -> Self {
        let mut ledger = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == TERMINATE_REQUEST {
                ledger.requested = true;
            } else if let Some(name) = line.strip_prefix(ACK_PREFIX) {
                let name = name.trim();
                if !name.is_empty() {
                    ledger.acks.insert(name.to_string());
                }
            }
        }
        ledger
    }

    /// Serializes the ledger back to channel text: the request line first,
    /// then acknowledgments in name order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        if self.requested {
            out.push_str(TERMINATE_REQUEST);
            out.push('\n');
        }
        for name in &self.acks {
            out.push_str(ACK_PREFIX);
            out.push(' ');
            out.push_str(name);
            out.push('\n');
        }
        out.into_bytes()
    }

    /// Records the shutdown request.
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Whether any process has requested shutdown.
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Records one peer's acknowledgment.
    pub fn acknowledge(&mut self, name: &str) {
        self.acks.insert(name.to_string());
    }

    pub fn has_acknowledged(&self, name: &str) -> bool {
        self.acks.contains(name)
    }

    /// True when every expected peer name has acknowledged.
    pub fn is_complete<'a>(&self, peers: impl IntoIterator<Item = &'a str>) -> bool {
        peers.into_iter().all(|name| self.acks.contains(name))
    }

    /// Acknowledged names, in order.
    pub fn acknowledged(&self) -> impl Iterator<Item = &str> {
        self.acks.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_is_idle() {
        let ledger = TerminationLedger::from_frame(b"").expect("parse");
        assert!(!ledger.is_requested());
        assert!(ledger.is_complete(std::iter::empty()));
    }

    #[test]
    fn test_parse_ignores_ordering() {
        let a = TerminationLedger::parse("Terminate\nAck sensor\nAck display\n");
        let b = TerminationLedger::parse("Ack display\nAck sensor\nTerminate\n");
        assert_eq!(a, b);
        assert!(a.is_requested());
        assert!(a.has_acknowledged("sensor"));
        assert!(a.has_acknowledged("display"));
    }

    #[test]
    fn test_round_trip() {
        let mut ledger = TerminationLedger::new();
        ledger.request();
        ledger.acknowledge("analysis");
        ledger.acknowledge("relay");

        let parsed = TerminationLedger::from_frame(&ledger.encode()).expect("parse");
        assert_eq!(parsed, ledger);
    }

    #[test]
    fn test_is_complete_requires_full_peer_set() {
        let mut ledger = TerminationLedger::new();
        ledger.acknowledge("sensor");
        ledger.acknowledge("analysis");

        assert!(ledger.is_complete(["sensor", "analysis"]));
        assert!(!ledger.is_complete(["sensor", "analysis", "display"]));
    }

    #[test]
    fn test_duplicate_acks_collapse() {
        let ledger = TerminationLedger::parse("Ack sensor\nAck sensor\n");
        assert_eq!(ledger.acknowledged().count(), 1);
    }

    #[test]
    fn test_unknown_lines_are_ignored() {
        let ledger = TerminationLedger::parse("hello world\nTerminate\n");
        assert!(ledger.is_requested());
        assert_eq!(ledger.acknowledged().count(), 0);
    }
}
