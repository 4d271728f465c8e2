//! Distributed termination handshake.
//!
//! Every process owns one coordinator over the shared termination channel.
//! Exactly one process - the initiator - writes the `Terminate` request; every
//! process (initiator included) then writes its own acknowledgment and polls
//! until the full expected peer-name set has acknowledged. Only then may a
//! process release its mappings, and the initiator alone removes the named
//! regions system-wide.
//!
//! If a peer crashes before announcing, the handshake never completes. That
//! liveness gap is accepted by design and deliberately not masked by a
//! timeout: tearing down regions a live peer still maps would be worse.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skymon_core::MonitorConfig;
use skymon_protocol::TerminationLedger;

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::registry::{open_channel, ChannelKind};

/// Lifecycle of one process within the termination protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Normal operation; no shutdown requested anywhere.
    Running,
    /// A request was seen or raised; the own acknowledgment is being written.
    Announcing,
    /// Acknowledged; polling for the remaining peer names.
    AwaitingPeers,
    /// Every peer acknowledged; local resources may be released.
    Teardown,
    /// Handshake finished and channel released.
    Terminated,
}

/// What ended normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// This process decided to shut down (signal, operator exit).
    Local,
    /// A peer's request appeared on the termination channel.
    Observed,
}

/// Per-process driver of the termination handshake.
pub struct TerminationCoordinator {
    channel: Channel,
    process_name: String,
    peers: BTreeSet<String>,
    poll_interval: Duration,
    state: CoordinatorState,
    initiator: bool,
}

impl TerminationCoordinator {
    /// Opens the termination channel of the configured namespace.
    ///
    /// `process_name` must be one of the configured peer names; the expected
    /// set and the poll interval come from the configuration rather than
    /// literals so tests can drive the protocol at speed.
    pub fn open(config: &MonitorConfig, process_name: &str) -> Result<Self, ChannelError> {
        let channel = open_channel(
            &config.namespace,
            ChannelKind::Termination,
            config.max_aircraft,
        )?;
        Ok(Self {
            channel,
            process_name: process_name.to_string(),
            peers: config.peers.iter().cloned().collect(),
            poll_interval: config.periods.termination_poll(),
            state: CoordinatorState::Running,
            initiator: false,
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Reads the channel and reports whether any process has requested
    /// shutdown. An empty channel means no.
    pub fn shutdown_requested(&self) -> Result<bool, ChannelError> {
        Ok(self.read_ledger()?.is_requested())
    }

    /// Raises the shutdown request and acknowledges it in one atomic update.
    /// The caller becomes the initiator and the final teardown owner.
    pub fn initiate(&mut self) -> Result<(), ChannelError> {
        self.state = CoordinatorState::Announcing;
        let name = self.process_name.clone();
        self.channel.update_frame(|current| {
            let mut ledger = TerminationLedger::from_frame(current)?;
            ledger.request();
            ledger.acknowledge(&name);
            Ok(ledger.encode())
        })?;
        self.initiator = true;
        self.state = CoordinatorState::AwaitingPeers;
        info!(process = %self.process_name, "termination initiated");
        Ok(())
    }

    /// Appends this process's acknowledgment, preserving whatever peers wrote
    /// concurrently.
    pub fn acknowledge(&mut self) -> Result<(), ChannelError> {
        self.state = CoordinatorState::Announcing;
        let name = self.process_name.clone();
        self.channel.update_frame(|current| {
            let mut ledger = TerminationLedger::from_frame(current)?;
            ledger.acknowledge(&name);
            Ok(ledger.encode())
        })?;
        self.state = CoordinatorState::AwaitingPeers;
        info!(process = %self.process_name, "termination acknowledged");
        Ok(())
    }

    /// Runs until shutdown is triggered, either locally (the token cancels)
    /// or by observing a peer's request on the channel.
    ///
    /// Read errors are logged and the poll continues: a transient failure must
    /// not take the process down during normal operation.
    pub async fn await_trigger(&mut self, cancel: &CancellationToken) -> Trigger {
        loop {
            match self.shutdown_requested() {
                Ok(true) => {
                    info!(process = %self.process_name, "observed termination request");
                    return Trigger::Observed;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(process = %self.process_name, error = %e, "termination poll failed");
                }
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Trigger::Local,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Polls until every configured peer has acknowledged.
    ///
    /// Never times out: a crashed peer blocks the handshake indefinitely by
    /// design.
    pub async fn wait_for_peers(&mut self) -> Result<(), ChannelError> {
        loop {
            let ledger = self.read_ledger()?;
            if ledger.is_complete(self.peers.iter().map(String::as_str)) {
                self.state = CoordinatorState::Teardown;
                info!(process = %self.process_name, "all peers acknowledged");
                return Ok(());
            }

            let missing: Vec<&str> = self
                .peers
                .iter()
                .map(String::as_str)
                .filter(|p| !ledger.has_acknowledged(p))
                .collect();
            debug!(process = %self.process_name, ?missing, "awaiting peer acknowledgments");

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Drives the rest of the handshake after a trigger: announce (initiating
    /// on a local trigger), wait for every peer, release the channel.
    ///
    /// Returns whether this process ended up the teardown owner. The caller
    /// releases its data-channel mappings after this returns, and the teardown
    /// owner additionally removes every named region.
    pub async fn complete(mut self, trigger: Trigger) -> Result<bool, ChannelError> {
        match trigger {
            Trigger::Local => self.initiate()?,
            Trigger::Observed => self.acknowledge()?,
        }
        self.wait_for_peers().await?;
        let initiator = self.is_initiator();
        self.finish();
        Ok(initiator)
    }

    /// Releases the termination channel: the initiator removes the name
    /// system-wide, everyone else only drops the local mapping.
    pub fn finish(mut self) {
        self.state = CoordinatorState::Terminated;
        info!(
            process = %self.process_name,
            initiator = self.initiator,
            "termination complete"
        );

        let Self {
            channel, initiator, ..
        } = self;
        if initiator {
            channel.destroy();
        } else {
            channel.close();
        }
    }

    fn read_ledger(&self) -> Result<TerminationLedger, ChannelError> {
        match self.channel.read_frame() {
            Ok(frame) => Ok(TerminationLedger::from_frame(&frame.payload)?),
            Err(ChannelError::StaleOrEmptyFrame) => Ok(TerminationLedger::new()),
            Err(e) => Err(e),
        }
    }
}
