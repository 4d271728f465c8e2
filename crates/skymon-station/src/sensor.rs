//! The sensor process: the live side of the radar picture.
//!
//! Owns a list of tracks seeded at startup. Every update period it activates
//! tracks whose start time has arrived, advances active tracks by their
//! velocity, retires tracks that leave the airspace and publishes the active
//! set to the binary sensor feed. Speed-change commands arrive on the
//! sensor-commands channel and replace a track's velocity in place.

use std::sync::Mutex;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skymon_core::{config::PROCESS_SENSOR, MonitorConfig, Vec3};
use skymon_ipc::{
    destroy_all, open_channel, spawn_periodic, Channel, ChannelError, ChannelKind,
    TerminationCoordinator,
};
use skymon_protocol::{decode_relay_frame, encode_sensor_frame, SensorRecord};

/// Airspace bounds; a track outside them is retired.
const AIRSPACE_X_FT: f64 = 100_000.0;
const AIRSPACE_Y_FT: f64 = 100_000.0;
const AIRSPACE_Z_FT: f64 = 40_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackPhase {
    /// Seeded but not yet at its start time.
    Pending,
    /// Flying; published on every feed frame.
    Active,
    /// Left the airspace; never published again.
    Retired,
}

#[derive(Debug, Clone)]
struct Track {
    record: SensorRecord,
    phase: TrackPhase,
}

impl Track {
    fn in_bounds(&self) -> bool {
        let p = self.record.position;
        p.x.abs() < AIRSPACE_X_FT && p.y.abs() < AIRSPACE_Y_FT && p.z.abs() < AIRSPACE_Z_FT
    }
}

#[derive(Debug)]
struct Board {
    tracks: Vec<Track>,
    started: Instant,
    last_tick: Option<Instant>,
}

/// The sensor process state: tracks plus its two channels.
pub struct Sensor {
    board: Mutex<Board>,
    max_aircraft: usize,
    feed_out: Channel,
    commands_in: Channel,
}

impl Sensor {
    /// Opens the sensor's channels and seeds the track list.
    pub fn open(config: &MonitorConfig, seeds: Vec<SensorRecord>) -> Result<Self, ChannelError> {
        let feed_out = open_channel(
            &config.namespace,
            ChannelKind::SensorFeed,
            config.max_aircraft,
        )?;
        let commands_in = open_channel(
            &config.namespace,
            ChannelKind::SensorCommands,
            config.max_aircraft,
        )?;

        let tracks = seeds
            .into_iter()
            .map(|record| Track {
                record,
                phase: TrackPhase::Pending,
            })
            .collect();

        info!(namespace = %config.namespace, "sensor channels open");
        Ok(Self {
            board: Mutex::new(Board {
                tracks,
                started: Instant::now(),
                last_tick: None,
            }),
            max_aircraft: config.max_aircraft,
            feed_out,
            commands_in,
        })
    }

    /// One wall-clock update cycle: advance the tracks and publish the feed.
    pub fn tick(&self) -> Result<(), ChannelError> {
        let (now_secs, dt) = {
            let mut board = self.lock_board();
            let now = Instant::now();
            let dt = board
                .last_tick
                .map(|last| now.duration_since(last).as_secs_f64())
                .unwrap_or(0.0);
            board.last_tick = Some(now);
            (board.started.elapsed().as_secs_f64(), dt)
        };
        self.advance_tracks(now_secs, dt);
        self.publish()
    }

    /// Advances the track state machine by `dt` seconds at scenario time
    /// `now_secs`. Separated from [`Sensor::tick`] so tests control time.
    pub fn advance_tracks(&self, now_secs: f64, dt: f64) {
        let mut board = self.lock_board();
        for track in &mut board.tracks {
            match track.phase {
                TrackPhase::Pending => {
                    if now_secs >= track.record.start_time as f64 {
                        track.phase = TrackPhase::Active;
                        info!(id = track.record.id, "aircraft entered the airspace");
                    }
                }
                TrackPhase::Active => {
                    track.record.position =
                        track.record.position.advanced(&track.record.velocity, dt);
                    if !track.in_bounds() {
                        track.phase = TrackPhase::Retired;
                        info!(id = track.record.id, "aircraft left the airspace");
                    }
                }
                TrackPhase::Retired => {}
            }
        }
    }

    /// Publishes the active tracks as one binary feed frame.
    pub fn publish(&self) -> Result<(), ChannelError> {
        let mut active: Vec<SensorRecord> = {
            let board = self.lock_board();
            board
                .tracks
                .iter()
                .filter(|t| t.phase == TrackPhase::Active)
                .map(|t| t.record)
                .collect()
        };

        if active.len() > self.max_aircraft {
            warn!(
                active = active.len(),
                max = self.max_aircraft,
                "more active tracks than the feed carries, truncating"
            );
            active.truncate(self.max_aircraft);
        }
        if active.is_empty() {
            debug!("no active tracks, skipping feed publish");
            return Ok(());
        }

        let frame = encode_sensor_frame(&active)?;
        let version = self.feed_out.write_frame(&frame)?;
        debug!(aircraft = active.len(), version, "sensor feed published");
        Ok(())
    }

    /// Consumes the sensor-commands slot and applies speed changes in place.
    pub fn apply_commands(&self) -> Result<(), ChannelError> {
        let frame = match self.commands_in.take_frame() {
            Ok(frame) => frame,
            Err(ChannelError::StaleOrEmptyFrame) => return Ok(()),
            Err(e) => return Err(e),
        };

        let commands = decode_relay_frame(&frame.payload)?;
        let mut board = self.lock_board();
        for command in commands {
            match board
                .tracks
                .iter_mut()
                .find(|t| t.record.id == command.id && t.phase != TrackPhase::Retired)
            {
                Some(track) => {
                    track.record.velocity = command.velocity;
                    info!(id = command.id, velocity = ?command.velocity, "speed change applied");
                }
                None => {
                    warn!(id = command.id, "speed change for unknown track dropped");
                }
            }
        }
        Ok(())
    }

    /// Current velocity of one track, for inspection.
    pub fn velocity_of(&self, id: u32) -> Option<Vec3> {
        self.lock_board()
            .tracks
            .iter()
            .find(|t| t.record.id == id)
            .map(|t| t.record.velocity)
    }

    fn lock_board(&self) -> std::sync::MutexGuard<'_, Board> {
        self.board
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The built-in traffic scenario: four immediate tracks (including the
/// converging pair) and six staggered arrivals.
pub fn default_scenario() -> Vec<SensorRecord> {
    fn seed(id: u32, pos: (f64, f64, f64), vel: (f64, f64, f64), start_time: i64) -> SensorRecord {
        SensorRecord {
            id,
            position: Vec3::new(pos.0, pos.1, pos.2),
            velocity: Vec3::new(vel.0, vel.1, vel.2),
            start_time,
        }
    }

    vec![
        seed(1, (1000.0, 2000.0, 3000.0), (100.0, 100.0, 0.0), 0),
        seed(2, (4000.0, 5500.0, 3500.0), (-100.0, -100.0, 0.0), 0),
        seed(3, (5000.0, 5000.0, 3000.0), (5.0, 5.0, 0.0), 0),
        seed(4, (1500.0, 2000.0, 3000.0), (-5.0, -5.0, 0.0), 0),
        seed(5, (7000.0, 4000.0, 5000.0), (15.0, 15.0, 0.0), 10),
        seed(6, (8000.0, 4500.0, 5500.0), (-15.0, -15.0, 0.0), 10),
        seed(7, (9000.0, 5000.0, 6000.0), (20.0, 20.0, 0.0), 20),
        seed(8, (10000.0, 5500.0, 6500.0), (-20.0, -20.0, 0.0), 20),
        seed(9, (11000.0, 6000.0, 7000.0), (25.0, 25.0, 0.0), 30),
        seed(10, (12000.0, 6500.0, 7500.0), (-25.0, -25.0, 0.0), 30),
    ]
}

/// Runs the sensor process until shutdown completes.
pub async fn run(
    config: MonitorConfig,
    cancel: CancellationToken,
    seeds: Vec<SensorRecord>,
) -> Result<(), ChannelError> {
    let mut coordinator = TerminationCoordinator::open(&config, PROCESS_SENSOR)?;
    let sensor = std::sync::Arc::new(Sensor::open(&config, seeds)?);

    let update = std::sync::Arc::clone(&sensor);
    let commands = std::sync::Arc::clone(&sensor);
    let handles = vec![
        spawn_periodic(
            "track-update",
            config.periods.sensor_update(),
            cancel.clone(),
            move || update.tick(),
        ),
        spawn_periodic(
            "sensor-commands",
            config.periods.command_poll(),
            cancel.clone(),
            move || commands.apply_commands(),
        ),
    ];
    info!("sensor running");

    let trigger = coordinator.await_trigger(&cancel).await;
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "sensor task did not shut down cleanly");
        }
    }

    let teardown_owner = coordinator.complete(trigger).await?;
    drop(sensor);
    if teardown_owner {
        destroy_all(&config.namespace, config.max_aircraft)?;
        info!(namespace = %config.namespace, "shared regions removed");
    }

    info!("sensor terminated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_ids_are_unique() {
        let seeds = default_scenario();
        let mut ids: Vec<_> = seeds.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), seeds.len());
    }

    #[test]
    fn test_default_scenario_contains_converging_pair() {
        let seeds = default_scenario();
        let a1 = seeds.iter().find(|s| s.id == 1).expect("aircraft 1");
        let a2 = seeds.iter().find(|s| s.id == 2).expect("aircraft 2");
        // The pair from the reference scenario: closing horizontally, already
        // within vertical separation.
        assert!((a1.position.z - a2.position.z).abs() < 1000.0);
        assert!(a1.velocity.x > 0.0 && a2.velocity.x < 0.0);
    }
}
