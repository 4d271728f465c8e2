//! The operator process: turns command lines into operator-command records.
//!
//! The line syntax is deliberately tiny - the operator console is a thin
//! wrapper, not a feature:
//!
//! ```text
//! speed <id> <vx> <vy> <vz>   request a velocity change
//! info <id>                   request augmented information
//! exit                        initiate system-wide termination
//! ```

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use skymon_core::{config::PROCESS_OPERATOR, DomainError, MonitorConfig, Vec3};
use skymon_ipc::{
    destroy_all, open_channel, Channel, ChannelError, ChannelKind, TerminationCoordinator, Trigger,
};
use skymon_protocol::{encode_operator_command, CommandKind, OperatorCommand};

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    /// Send a command to the analysis process.
    Command(CommandKind),
    /// Initiate termination of the whole network.
    Exit,
}

/// Parses one console line.
pub fn parse_line(line: &str) -> Result<OperatorAction, DomainError> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or("");
    match keyword {
        "speed" => {
            let id = parse_u32(parts.next(), "aircraft id")?;
            let vx = parse_f64(parts.next(), "velocity x")?;
            let vy = parse_f64(parts.next(), "velocity y")?;
            let vz = parse_f64(parts.next(), "velocity z")?;
            Ok(OperatorAction::Command(CommandKind::SpeedChange {
                id,
                velocity: Vec3::new(vx, vy, vz),
            }))
        }
        "info" => {
            let id = parse_u32(parts.next(), "aircraft id")?;
            Ok(OperatorAction::Command(CommandKind::AugmentedInformation {
                id,
            }))
        }
        "exit" => Ok(OperatorAction::Exit),
        other => Err(DomainError::InvalidFieldValue {
            field: "command".to_string(),
            value: other.to_string(),
            expected: "speed | info | exit".to_string(),
        }),
    }
}

fn parse_u32(token: Option<&str>, field: &str) -> Result<u32, DomainError> {
    let token = token.ok_or_else(|| missing(field))?;
    token.parse().map_err(|_| DomainError::InvalidFieldValue {
        field: field.to_string(),
        value: token.to_string(),
        expected: "unsigned integer".to_string(),
    })
}

fn parse_f64(token: Option<&str>, field: &str) -> Result<f64, DomainError> {
    let token = token.ok_or_else(|| missing(field))?;
    token.parse().map_err(|_| DomainError::InvalidFieldValue {
        field: field.to_string(),
        value: token.to_string(),
        expected: "number".to_string(),
    })
}

fn missing(field: &str) -> DomainError {
    DomainError::InvalidFieldValue {
        field: field.to_string(),
        value: String::new(),
        expected: "a value".to_string(),
    }
}

/// The operator's single outbound channel.
pub struct Operator {
    commands_out: Channel,
}

impl Operator {
    pub fn open(config: &MonitorConfig) -> Result<Self, ChannelError> {
        let commands_out = open_channel(
            &config.namespace,
            ChannelKind::OperatorCommands,
            config.max_aircraft,
        )?;
        info!(namespace = %config.namespace, "operator channel open");
        Ok(Self { commands_out })
    }

    /// Stamps and writes one command into the single in-flight slot. An
    /// unconsumed previous command is overwritten - last write wins.
    pub fn send(&self, kind: CommandKind) -> Result<(), ChannelError> {
        let command = OperatorCommand::new(kind);
        self.commands_out
            .write_frame(&encode_operator_command(&command))?;
        info!(kind = ?command.kind, "command sent");
        Ok(())
    }
}

/// Runs the operator process: reads command lines from standard input until
/// `exit`, a local cancellation or an observed termination request.
pub async fn run(config: MonitorConfig, cancel: CancellationToken) -> Result<(), ChannelError> {
    let mut coordinator = TerminationCoordinator::open(&config, PROCESS_OPERATOR)?;
    let operator = Operator::open(&config)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let poll = config.periods.termination_poll();

    let trigger = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break Trigger::Local,

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_line(line) {
                        Ok(OperatorAction::Exit) => {
                            info!("operator requested termination");
                            break Trigger::Local;
                        }
                        Ok(OperatorAction::Command(kind)) => {
                            if let Err(e) = operator.send(kind) {
                                warn!(error = %e, "failed to send command");
                            }
                        }
                        Err(e) => warn!(error = %e, "ignoring invalid command line"),
                    }
                }
                Ok(None) => {
                    // Console closed; stay alive for the termination handshake.
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "console read failed");
                    stdin_open = false;
                }
            },

            _ = tokio::time::sleep(poll) => {
                match coordinator.shutdown_requested() {
                    Ok(true) => break Trigger::Observed,
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "termination poll failed"),
                }
            }
        }
    };

    let teardown_owner = coordinator.complete(trigger).await?;
    drop(operator);
    if teardown_owner {
        destroy_all(&config.namespace, config.max_aircraft)?;
        info!(namespace = %config.namespace, "shared regions removed");
    }

    info!("operator terminated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed_change() {
        let action = parse_line("speed 4 120 -30 0").expect("parse");
        assert_eq!(
            action,
            OperatorAction::Command(CommandKind::SpeedChange {
                id: 4,
                velocity: Vec3::new(120.0, -30.0, 0.0),
            })
        );
    }

    #[test]
    fn test_parse_info() {
        let action = parse_line("info 7").expect("parse");
        assert_eq!(
            action,
            OperatorAction::Command(CommandKind::AugmentedInformation { id: 7 })
        );
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse_line("exit").expect("parse"), OperatorAction::Exit);
    }

    #[test]
    fn test_parse_rejects_unknown_keyword() {
        assert!(parse_line("altitude 4 100").is_err());
        assert!(parse_line("").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_and_bad_args() {
        assert!(parse_line("speed 4 120 -30").is_err());
        assert!(parse_line("speed four 1 2 3").is_err());
        assert!(parse_line("info").is_err());
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let action = parse_line("  speed   4  1   2   3 ").expect("parse");
        assert!(matches!(
            action,
            OperatorAction::Command(CommandKind::SpeedChange { id: 4, .. })
        ));
    }
}
