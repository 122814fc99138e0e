//! Arena match demo - simulated players over an in-process relay
//!
//! Spawns a room full of bot-driven match sessions, runs one match to
//! completion, and prints the final report. Each bot is a full client:
//! its own weapon and health state, its own scoreboard, its own view
//! of the room. A small referee task resolves shots into hits, which
//! is the one job a real deployment leaves to collision geometry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use arena_core::game::MAX_HEALTH;
use arena_core::net::protocol::SHOOT_EVENT;
use arena_core::{
    ChannelEvent, Config, MatchStatus, ModeConfig, PlayerId, PlayerSnapshot, RelayHub,
    SessionCommand, SessionConfig, SessionHandle, ShootEvent, Team, Vec3, WeaponKind,
    WeaponProfile,
};
use arena_core::{MatchReport, MatchSession};

/// Half-extent of the square arena bots patrol
const ARENA_HALF: f32 = 45.0;

/// Flat dampener on per-shot hit probability
const HIT_CHANCE_SCALE: f64 = 0.35;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    info!("Starting arena match demo");
    info!("Room: {}", config.room_key);
    info!("Mode: {}", config.mode.as_str());

    let mode_config = ModeConfig::for_mode(config.mode);
    let bot_count = config.bot_count.min(mode_config.max_players);
    if bot_count < config.bot_count {
        warn!(
            requested = config.bot_count,
            allowed = bot_count,
            "Bot count capped at the mode's player limit"
        );
    }

    let hub = Arc::new(RelayHub::new());
    let ids: Vec<PlayerId> = (0..bot_count).map(|_| Uuid::new_v4()).collect();

    // Alternating team assignment, unused in free-for-all modes
    let mut roster: HashMap<PlayerId, Team> = HashMap::new();
    if mode_config.team_based {
        for (index, id) in ids.iter().enumerate() {
            let team = if index % 2 == 0 { Team::Blue } else { Team::Red };
            roster.insert(*id, team);
        }
    }

    let mut handles: HashMap<PlayerId, SessionHandle> = HashMap::new();
    let mut session_tasks = Vec::new();
    for (index, id) in ids.iter().enumerate() {
        let channel = hub.subscribe(&config.room_key, *id);
        let session_config = SessionConfig {
            player_id: *id,
            display_name: format!("bot-{index}"),
            mode: config.mode,
            seed: config.match_seed.wrapping_add(index as u64),
            roster: roster.clone(),
        };
        let (mut session, handle) = MatchSession::join(session_config, channel).await;
        if index == 0 {
            session.on_match_end(|report| {
                info!(
                    winner = ?report.winner,
                    end_reason = ?report.end_reason,
                    duration_secs = report.duration_secs,
                    "Match ended"
                );
            });
        }
        handles.insert(*id, handle);
        session_tasks.push(tokio::spawn(session.run()));
    }

    for handle in handles.values() {
        handle.commands.send(SessionCommand::StartMatch).await?;
    }
    info!(players = handles.len(), "Match started");

    for (index, id) in ids.iter().enumerate() {
        let handle = handles[id].clone();
        let seed = config.match_seed.wrapping_add(1000 + index as u64);
        tokio::spawn(drive_bot(handle, seed));
    }

    let referee_task = tokio::spawn(referee(
        hub.clone(),
        config.room_key.clone(),
        handles.clone(),
        roster,
        mode_config,
        config.match_seed.wrapping_add(9999),
    ));

    let mut all_sessions = futures::future::join_all(session_tasks);
    let results = tokio::select! {
        results = &mut all_sessions => results,
        _ = shutdown_signal() => {
            info!("Shutting down, asking sessions to leave");
            for handle in handles.values() {
                let _ = handle.commands.send(SessionCommand::Leave).await;
            }
            all_sessions.await
        }
    };
    referee_task.abort();

    let reports: Vec<MatchReport> = results.into_iter().filter_map(Result::ok).collect();
    for report in &reports {
        info!(
            status = ?report.status,
            winner = ?report.winner,
            players = report.scores.len(),
            "Session report"
        );
    }
    if let Some(report) = reports.first() {
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    info!("Demo complete");
    Ok(())
}

/// Random patrol plus bursts of trigger time while peers are visible
async fn drive_bot(handle: SessionHandle, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut position = Vec3::new(
        rng.gen_range(-ARENA_HALF..ARENA_HALF),
        1.0,
        rng.gen_range(-ARENA_HALF..ARENA_HALF),
    );

    loop {
        ticker.tick().await;
        let (finished, peers_visible) = {
            let hud = handle.hud.borrow();
            (hud.status == MatchStatus::Finished, hud.peers > 0)
        };
        if finished {
            break;
        }

        position.x = (position.x + rng.gen_range(-1.5..1.5)).clamp(-ARENA_HALF, ARENA_HALF);
        position.z = (position.z + rng.gen_range(-1.5..1.5)).clamp(-ARENA_HALF, ARENA_HALF);
        let rotation = Vec3::new(0.0, rng.gen_range(0.0..std::f32::consts::TAU), 0.0);
        if handle
            .commands
            .send(SessionCommand::Move { position, rotation })
            .await
            .is_err()
        {
            break;
        }

        if peers_visible && rng.gen_bool(0.35) {
            let direction = Vec3::new(
                rng.gen_range(-1.0..1.0),
                0.0,
                rng.gen_range(-1.0..1.0),
            )
            .normalized();
            if handle
                .commands
                .send(SessionCommand::TriggerDown { direction })
                .await
                .is_err()
            {
                break;
            }
        } else if rng.gen_bool(0.5) {
            if handle.commands.send(SessionCommand::TriggerUp).await.is_err() {
                break;
            }
        }

        if rng.gen_bool(0.05) {
            let _ = handle.commands.send(SessionCommand::Reload).await;
        }
        if rng.gen_bool(0.02) {
            let weapon = WeaponKind::ALL[rng.gen_range(0..WeaponKind::ALL.len())];
            let _ = handle.commands.send(SessionCommand::SwitchWeapon(weapon)).await;
        }
    }
}

/// Resolves broadcast shots into hits and feeds the outcomes back to
/// the sessions, standing in for the rendering layer's collision
/// geometry. Subscribes without tracking presence, so it is invisible
/// to the players.
async fn referee(
    hub: Arc<RelayHub>,
    room_key: String,
    handles: HashMap<PlayerId, SessionHandle>,
    roster: HashMap<PlayerId, Team>,
    mode_config: ModeConfig,
    seed: u64,
) {
    let referee_id = Uuid::new_v4();
    let mut channel = hub.subscribe(&room_key, referee_id);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut hit_points: HashMap<PlayerId, f32> =
        handles.keys().map(|id| (*id, MAX_HEALTH)).collect();
    let mut positions: HashMap<PlayerId, Vec3> = HashMap::new();

    while let Some(event) = channel.recv().await {
        let (sender, name, payload) = match event {
            ChannelEvent::PresenceSync(state) => {
                positions.clear();
                for (id, value) in state {
                    if let Ok(snapshot) = serde_json::from_value::<PlayerSnapshot>(value) {
                        positions.insert(id, snapshot.position);
                    }
                }
                continue;
            }
            ChannelEvent::Broadcast {
                sender,
                event,
                payload,
            } => (sender, event, payload),
        };
        if name != SHOOT_EVENT {
            continue;
        }
        let shot: ShootEvent = match serde_json::from_value(payload) {
            Ok(shot) => shot,
            Err(_) => continue,
        };

        let candidates: Vec<PlayerId> = handles
            .keys()
            .filter(|id| **id != sender)
            .filter(|id| {
                !mode_config.team_based || roster.get(*id) != roster.get(&sender)
            })
            .copied()
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let target = candidates[rng.gen_range(0..candidates.len())];

        // Hit chance: weapon accuracy, scaled down past effective range
        let profile = WeaponProfile::for_kind(shot.weapon);
        let falloff = match positions.get(&target) {
            Some(position) => {
                let dist = distance(shot.origin, *position);
                if dist <= profile.range {
                    1.0
                } else {
                    f64::from(profile.range / dist)
                }
            }
            None => 1.0,
        };
        if !rng.gen_bool(f64::from(profile.accuracy) * HIT_CHANCE_SCALE * falloff) {
            continue;
        }

        let health = hit_points.entry(target).or_insert(MAX_HEALTH);
        *health -= profile.damage;
        let lethal = *health <= 0.0;
        if lethal {
            *health = MAX_HEALTH;
        }

        if let Some(victim) = handles.get(&target) {
            let _ = victim
                .commands
                .send(SessionCommand::DamageTaken {
                    attacker: sender,
                    amount: profile.damage,
                })
                .await;
        }
        if lethal {
            let killer_team = roster.get(&sender).copied();
            for (id, handle) in &handles {
                if *id == target {
                    continue;
                }
                let _ = handle
                    .commands
                    .send(SessionCommand::KillObserved {
                        killer: sender,
                        victim: target,
                        killer_team,
                    })
                    .await;
            }
        }
    }
}

fn distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z).length()
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
