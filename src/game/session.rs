//! Match session actor - one per local player
//!
//! Composes the weapon, health, match state, and network sync pieces
//! into a single task. Callers talk to it through `SessionCommand`s
//! and observe it through a watch channel of `HudSnapshot`s; the task
//! itself owns the simulation frame loop and the countdown clock.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::catalog::{GameMode, Team, WeaponKind};
use crate::game::health::HealthSystem;
use crate::game::match_state::{MatchReport, MatchStateMachine, MatchStatus, TeamScores};
use crate::game::weapon::WeaponSystem;
use crate::net::protocol::{PlayerId, Vec3};
use crate::net::sync::NetworkSync;
use crate::net::transport::{ChannelEvent, ChannelHandle};
use crate::util::time::{COUNTDOWN_TICK, FRAME_DURATION};

/// Shots leave from roughly eye height above the player origin
const MUZZLE_HEIGHT: f32 = 1.5;

/// Directional jitter applied at accuracy 0.0
const MAX_SPREAD: f32 = 0.25;

const COMMAND_BUFFER: usize = 256;

/// Commands accepted by a running session
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Move the match out of the waiting phase
    StartMatch,
    /// New local transform from the movement layer
    Move { position: Vec3, rotation: Vec3 },
    /// Trigger pressed while aiming along `direction`
    TriggerDown { direction: Vec3 },
    /// Trigger released
    TriggerUp,
    Reload,
    SwitchWeapon(WeaponKind),
    PickupAmmo(u32),
    /// The collision layer resolved a hit on the local player
    DamageTaken { attacker: PlayerId, amount: f32 },
    /// A kill elsewhere in the arena was observed
    KillObserved {
        killer: PlayerId,
        victim: PlayerId,
        killer_team: Option<Team>,
    },
    /// An assist on someone else's kill was observed
    AssistObserved { player: PlayerId },
    FlagPickedUp {
        team: Team,
        carrier: PlayerId,
        position: Vec3,
    },
    FlagDropped { team: Team, position: Vec3 },
    FlagCaptured { team: Team, player: PlayerId },
    FlagReturned { team: Team, player: PlayerId },
    /// Leave the room and finish the session
    Leave,
}

/// Static description of one participant's session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub player_id: PlayerId,
    pub display_name: String,
    pub mode: GameMode,
    /// Seed for the session's spread jitter
    pub seed: u64,
    /// Team assignment for every known participant (team modes)
    pub roster: HashMap<PlayerId, Team>,
}

/// Read-only view of the session for HUD rendering
#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub weapon: WeaponKind,
    pub weapon_name: &'static str,
    pub ammo: u32,
    pub reserve: u32,
    pub reloading: bool,
    pub health: f32,
    pub dead: bool,
    pub respawning: bool,
    pub status: MatchStatus,
    pub time_remaining: u32,
    pub team_scores: TeamScores,
    pub kills: u32,
    pub deaths: u32,
    /// Remote players currently visible in the room
    pub peers: usize,
    /// Shoot tracers inside their display window
    pub tracers: usize,
}

/// Caller-side handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub player_id: PlayerId,
    pub commands: mpsc::Sender<SessionCommand>,
    pub hud: watch::Receiver<HudSnapshot>,
}

pub struct MatchSession {
    config: SessionConfig,
    weapon: WeaponSystem,
    health: HealthSystem,
    net: NetworkSync,
    match_state: MatchStateMachine,
    commands: mpsc::Receiver<SessionCommand>,
    hud: watch::Sender<HudSnapshot>,
    rng: ChaCha8Rng,
    position: Vec3,
    rotation: Vec3,
    aim: Vec3,
    trigger_held: bool,
}

impl MatchSession {
    /// Enter a room over the given channel and assemble the session.
    /// The session does not simulate until `run` is awaited.
    pub async fn join(config: SessionConfig, channel: ChannelHandle) -> (Self, SessionHandle) {
        let net = NetworkSync::join(channel, config.player_id).await;
        let weapon = WeaponSystem::new(WeaponKind::default());
        let mut match_state = MatchStateMachine::new(config.mode);
        match_state.initialize_player(config.player_id);
        let health = HealthSystem::new(match_state.config().respawn_delay());

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let initial = Self::build_hud(&weapon, &health, &match_state, &net);
        let (hud_tx, hud_rx) = watch::channel(initial);

        let handle = SessionHandle {
            player_id: config.player_id,
            commands: command_tx,
            hud: hud_rx,
        };

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let session = Self {
            config,
            weapon,
            health,
            net,
            match_state,
            commands: command_rx,
            hud: hud_tx,
            rng,
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::ZERO,
            aim: Vec3::ZERO,
            trigger_held: false,
        };

        (session, handle)
    }

    /// Install the observer fired once when the match ends
    pub fn on_match_end(&mut self, callback: impl FnOnce(&MatchReport) + Send + 'static) {
        self.match_state.on_match_end(callback);
    }

    /// Drive the session until the match finishes, the caller asks to
    /// leave, or the room channel dies. Always leaves the room before
    /// returning its final report.
    pub async fn run(mut self) -> MatchReport {
        info!(
            player_id = %self.config.player_id,
            display_name = %self.config.display_name,
            room = %self.net.room(),
            mode = %self.match_state.mode().as_str(),
            "Session entered room"
        );

        let mut frames = tokio::time::interval(FRAME_DURATION);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First countdown tick lands one full second in
        let mut countdown = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);

        loop {
            tokio::select! {
                _ = frames.tick() => self.on_frame(Instant::now()).await,
                _ = countdown.tick() => self.match_state.tick_second(),
                command = self.commands.recv() => match command {
                    Some(command) => {
                        let starting = matches!(command, SessionCommand::StartMatch);
                        if !self.handle_command(command, Instant::now()).await {
                            break;
                        }
                        if starting {
                            // The match clock measures from the start
                            // command, not from entering the room
                            countdown = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
                        }
                    }
                    None => break,
                },
                event = self.net.next_event() => match event {
                    Some(event) => self.on_channel_event(event, Instant::now()),
                    None => {
                        warn!(player_id = %self.config.player_id, "Room channel closed");
                        break;
                    }
                },
            }

            self.publish_hud();

            if self.match_state.status() == MatchStatus::Finished {
                break;
            }
        }

        self.publish_hud();
        let report = self.match_state.report();
        info!(
            player_id = %self.config.player_id,
            status = ?report.status,
            winner = ?report.winner,
            "Session finished"
        );
        self.net.leave().await;
        report
    }

    /// One local simulation frame: settle timers, run held-trigger
    /// fire for automatic weapons, re-publish the transform.
    async fn on_frame(&mut self, now: Instant) {
        self.weapon.update(now);
        self.health.update(now);
        self.net.expire_tracers(now);

        if self.trigger_held && self.weapon.profile().automatic {
            self.try_fire(self.aim, now).await;
        }

        self.net.publish_transform(self.position, self.rotation).await;
    }

    /// Returns false when the session should terminate
    async fn handle_command(&mut self, command: SessionCommand, now: Instant) -> bool {
        match command {
            SessionCommand::StartMatch => self.match_state.start_match(),
            SessionCommand::Move { position, rotation } => {
                self.position = position;
                self.rotation = rotation;
            }
            SessionCommand::TriggerDown { direction } => {
                self.aim = direction;
                self.trigger_held = true;
                self.try_fire(direction, now).await;
            }
            SessionCommand::TriggerUp => self.trigger_held = false,
            SessionCommand::Reload => {
                if self.weapon.reload(now) {
                    debug!(player_id = %self.config.player_id, "Reload started");
                }
            }
            SessionCommand::SwitchWeapon(weapon) => {
                if self.weapon.switch_weapon(weapon) {
                    debug!(player_id = %self.config.player_id, weapon = ?weapon, "Weapon switched");
                }
            }
            SessionCommand::PickupAmmo(amount) => self.weapon.add_ammo(amount),
            SessionCommand::DamageTaken { attacker, amount } => {
                if self.health.take_damage(amount, now) {
                    self.trigger_held = false;
                    let killer_team = self.team_of(attacker);
                    self.match_state
                        .record_kill(attacker, self.config.player_id, killer_team);
                    info!(
                        player_id = %self.config.player_id,
                        attacker_id = %attacker,
                        "Local player died"
                    );
                }
            }
            SessionCommand::KillObserved {
                killer,
                victim,
                killer_team,
            } => self.match_state.record_kill(killer, victim, killer_team),
            SessionCommand::AssistObserved { player } => self.match_state.record_assist(player),
            SessionCommand::FlagPickedUp {
                team,
                carrier,
                position,
            } => self
                .match_state
                .update_flag_status(team, true, Some(carrier), Some(position)),
            SessionCommand::FlagDropped { team, position } => self
                .match_state
                .update_flag_status(team, false, None, Some(position)),
            SessionCommand::FlagCaptured { team, player } => {
                self.match_state.record_flag_capture(team, player)
            }
            SessionCommand::FlagReturned { team, player } => {
                self.match_state.record_flag_return(team, player)
            }
            SessionCommand::Leave => {
                info!(player_id = %self.config.player_id, "Leave requested");
                return false;
            }
        }
        true
    }

    /// Presence syncs double as join signals for the scoreboard
    fn on_channel_event(&mut self, event: ChannelEvent, now: Instant) {
        if let ChannelEvent::PresenceSync(state) = &event {
            for id in state.keys() {
                self.match_state.initialize_player(*id);
            }
        }
        self.net.apply_event(event, now);
    }

    /// Fire one round if the weapon and the player allow it
    async fn try_fire(&mut self, direction: Vec3, now: Instant) {
        if self.health.is_dead() {
            return;
        }
        if !self.weapon.shoot(now) {
            return;
        }
        let origin = Vec3::new(
            self.position.x,
            self.position.y + MUZZLE_HEIGHT,
            self.position.z,
        );
        let spread_dir = self.apply_spread(direction);
        let event = self
            .net
            .broadcast_shoot(origin, spread_dir, self.weapon.weapon())
            .await;
        debug!(
            player_id = %event.player_id,
            weapon = ?event.weapon,
            ammo = self.weapon.current_ammo(),
            "Shot fired"
        );
    }

    /// Jitter the aim direction by the weapon's inaccuracy
    fn apply_spread(&mut self, direction: Vec3) -> Vec3 {
        let spread = (1.0 - self.weapon.profile().accuracy) * MAX_SPREAD;
        if spread <= 0.0 {
            return direction.normalized();
        }
        Vec3::new(
            direction.x + self.rng.gen_range(-spread..=spread),
            direction.y + self.rng.gen_range(-spread..=spread),
            direction.z + self.rng.gen_range(-spread..=spread),
        )
        .normalized()
    }

    fn team_of(&self, player: PlayerId) -> Option<Team> {
        self.config.roster.get(&player).copied()
    }

    fn publish_hud(&self) {
        let _ = self.hud.send(Self::build_hud(
            &self.weapon,
            &self.health,
            &self.match_state,
            &self.net,
        ));
    }

    fn build_hud(
        weapon: &WeaponSystem,
        health: &HealthSystem,
        match_state: &MatchStateMachine,
        net: &NetworkSync,
    ) -> HudSnapshot {
        let (kills, deaths) = match_state
            .player_score(&net.local_id())
            .map(|score| (score.kills, score.deaths))
            .unwrap_or((0, 0));

        HudSnapshot {
            weapon: weapon.weapon(),
            weapon_name: weapon.profile().name,
            ammo: weapon.current_ammo(),
            reserve: weapon.reserve_ammo(),
            reloading: weapon.is_reloading(),
            health: health.health(),
            dead: health.is_dead(),
            respawning: health.is_respawning(),
            status: match_state.status(),
            time_remaining: match_state.time_remaining(),
            team_scores: match_state.team_scores(),
            kills,
            deaths,
            peers: net.remote_players().count(),
            tracers: net.tracers().len(),
        }
    }
}
