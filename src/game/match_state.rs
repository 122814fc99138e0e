//! Match lifecycle - status, countdown, scores, win conditions
//!
//! Every client runs its own copy of this machine and feeds it the
//! kill and objective signals it observes. There is no authoritative
//! arbiter: convergence comes from everyone seeing the same signals.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::game::catalog::{GameMode, ModeConfig, Team};
use crate::net::protocol::{PlayerId, Vec3};

/// Lifecycle phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    Finished,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    ScoreLimit,
    TimeExpired,
}

/// Match winner. Absent entirely on a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Team(Team),
    Player(PlayerId),
}

/// Scoreboard row for one player
#[derive(Debug, Clone, Serialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub captures: u32,
    pub flag_returns: u32,
    /// Arrival ordinal, breaks scoreboard ties deterministically
    #[serde(skip)]
    join_order: u32,
}

impl PlayerScore {
    fn new(player_id: PlayerId, join_order: u32) -> Self {
        Self {
            player_id,
            kills: 0,
            deaths: 0,
            assists: 0,
            captures: 0,
            flag_returns: 0,
            join_order,
        }
    }
}

/// Kill/capture totals per team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamScores {
    pub blue: u32,
    pub red: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Blue => self.blue,
            Team::Red => self.red,
        }
    }

    fn add(&mut self, team: Team, amount: u32) {
        match team {
            Team::Blue => self.blue += amount,
            Team::Red => self.red += amount,
        }
    }
}

/// State of one team's flag in capture-the-flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagState {
    pub captured: bool,
    pub carrier_id: Option<PlayerId>,
    pub position: Vec3,
}

impl Default for FlagState {
    fn default() -> Self {
        Self {
            captured: false,
            carrier_id: None,
            position: Vec3::ZERO,
        }
    }
}

/// Final snapshot handed to observers when a match ends
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub mode: GameMode,
    pub status: MatchStatus,
    pub winner: Option<Winner>,
    pub end_reason: Option<EndReason>,
    pub team_scores: TeamScores,
    pub duration_secs: u32,
    /// Scoreboard ordered by kills, earliest joiner first on ties
    pub scores: Vec<PlayerScore>,
    pub ended_at: DateTime<Utc>,
}

/// One-shot observer invoked when the match finishes
pub type MatchEndCallback = Box<dyn FnOnce(&MatchReport) + Send>;

pub struct MatchStateMachine {
    mode: GameMode,
    config: ModeConfig,
    status: MatchStatus,
    time_remaining: u32,
    team_scores: TeamScores,
    player_scores: HashMap<PlayerId, PlayerScore>,
    next_join_order: u32,
    blue_flag: FlagState,
    red_flag: FlagState,
    winner: Option<Winner>,
    end_reason: Option<EndReason>,
    ended: bool,
    on_match_end: Option<MatchEndCallback>,
}

impl MatchStateMachine {
    pub fn new(mode: GameMode) -> Self {
        let config = ModeConfig::for_mode(mode);
        Self {
            mode,
            config,
            status: MatchStatus::Waiting,
            time_remaining: config.time_limit_secs,
            team_scores: TeamScores::default(),
            player_scores: HashMap::new(),
            next_join_order: 0,
            blue_flag: FlagState::default(),
            red_flag: FlagState::default(),
            winner: None,
            end_reason: None,
            ended: false,
            on_match_end: None,
        }
    }

    /// Install the observer called exactly once when the match ends
    pub fn on_match_end(&mut self, callback: impl FnOnce(&MatchReport) + Send + 'static) {
        self.on_match_end = Some(Box::new(callback));
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn config(&self) -> &ModeConfig {
        &self.config
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn team_scores(&self) -> TeamScores {
        self.team_scores
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn player_score(&self, player_id: &PlayerId) -> Option<&PlayerScore> {
        self.player_scores.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.player_scores.len()
    }

    pub fn flag(&self, team: Team) -> &FlagState {
        match team {
            Team::Blue => &self.blue_flag,
            Team::Red => &self.red_flag,
        }
    }

    /// Move into the active phase and let the countdown run
    pub fn start_match(&mut self) {
        if self.status == MatchStatus::Finished {
            return;
        }
        self.status = MatchStatus::Active;
        info!(mode = %self.mode.as_str(), time_limit = self.config.time_limit_secs, "Match started");
    }

    /// Advance the countdown by one second. Only the active phase
    /// ticks; reaching zero ends the match on time.
    pub fn tick_second(&mut self) {
        if self.status != MatchStatus::Active {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.end_match(EndReason::TimeExpired);
        }
    }

    /// Ensure a scoreboard row exists for a player. Safe to call on
    /// every join signal.
    pub fn initialize_player(&mut self, player_id: PlayerId) {
        if self.status == MatchStatus::Finished {
            return;
        }
        self.score_entry(player_id);
    }

    /// Record one kill. The killer's team is only consulted in
    /// team-based modes; passing `None` there still counts the player
    /// kill but moves no team score.
    pub fn record_kill(&mut self, killer: PlayerId, victim: PlayerId, killer_team: Option<Team>) {
        if self.status == MatchStatus::Finished {
            return;
        }

        self.score_entry(killer).kills += 1;
        self.score_entry(victim).deaths += 1;
        debug!(killer_id = %killer, victim_id = %victim, "Kill recorded");

        if self.config.team_based {
            if let Some(team) = killer_team {
                self.team_scores.add(team, 1);
                if let Some(limit) = self.config.score_limit {
                    if self.team_scores.get(team) >= limit {
                        self.end_match(EndReason::ScoreLimit);
                    }
                }
            }
        } else if let Some(limit) = self.config.score_limit {
            let kills = self
                .player_scores
                .get(&killer)
                .map(|score| score.kills)
                .unwrap_or(0);
            if kills >= limit {
                self.end_match(EndReason::ScoreLimit);
            }
        }
    }

    /// Credit an assist on someone else's kill
    pub fn record_assist(&mut self, player_id: PlayerId) {
        if self.status == MatchStatus::Finished {
            return;
        }
        self.score_entry(player_id).assists += 1;
    }

    /// A completed capture: the scoring team banks a point and both
    /// flags return to their stands.
    pub fn record_flag_capture(&mut self, team: Team, player_id: PlayerId) {
        if self.status == MatchStatus::Finished {
            return;
        }

        self.team_scores.add(team, 1);
        self.score_entry(player_id).captures += 1;
        self.blue_flag = FlagState::default();
        self.red_flag = FlagState::default();
        info!(team = team.as_str(), player_id = %player_id, "Flag captured");

        if let Some(limit) = self.config.score_limit {
            if self.team_scores.get(team) >= limit {
                self.end_match(EndReason::ScoreLimit);
            }
        }
    }

    /// A dropped flag carried back to its stand by its own team
    pub fn record_flag_return(&mut self, team: Team, player_id: PlayerId) {
        if self.status == MatchStatus::Finished {
            return;
        }
        self.score_entry(player_id).flag_returns += 1;
        *self.flag_mut(team) = FlagState::default();
        debug!(team = team.as_str(), player_id = %player_id, "Flag returned");
    }

    /// Overwrite one flag's live state. A missing position keeps the
    /// flag where it last was.
    pub fn update_flag_status(
        &mut self,
        team: Team,
        captured: bool,
        carrier_id: Option<PlayerId>,
        position: Option<Vec3>,
    ) {
        if self.status == MatchStatus::Finished {
            return;
        }
        let flag = self.flag_mut(team);
        flag.position = position.unwrap_or(flag.position);
        flag.captured = captured;
        flag.carrier_id = carrier_id;
    }

    /// Finish the match and fix the winner. Idempotent: only the
    /// first call decides the reason and fires the end observer.
    pub fn end_match(&mut self, reason: EndReason) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.end_reason = Some(reason);
        self.winner = self.compute_winner();
        self.status = MatchStatus::Finished;

        info!(
            mode = %self.mode.as_str(),
            reason = ?reason,
            winner = ?self.winner,
            blue = self.team_scores.blue,
            red = self.team_scores.red,
            "Match ended"
        );

        let callback = self.on_match_end.take();
        if let Some(callback) = callback {
            let report = self.report();
            callback(&report);
        }
    }

    /// Final snapshot of the machine, valid at any phase
    pub fn report(&self) -> MatchReport {
        let mut scores: Vec<PlayerScore> = self.player_scores.values().cloned().collect();
        scores.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then(a.join_order.cmp(&b.join_order))
        });

        MatchReport {
            mode: self.mode,
            status: self.status,
            winner: self.winner,
            end_reason: self.end_reason,
            team_scores: self.team_scores,
            duration_secs: self.config.time_limit_secs - self.time_remaining,
            scores,
            ended_at: Utc::now(),
        }
    }

    /// Team modes: higher team score wins, equal scores are a draw.
    /// Free-for-all: most kills wins, the earliest joiner takes ties,
    /// and a board with no kills at all is a draw.
    fn compute_winner(&self) -> Option<Winner> {
        if self.config.team_based {
            match self.team_scores.blue.cmp(&self.team_scores.red) {
                std::cmp::Ordering::Greater => Some(Winner::Team(Team::Blue)),
                std::cmp::Ordering::Less => Some(Winner::Team(Team::Red)),
                std::cmp::Ordering::Equal => None,
            }
        } else {
            self.player_scores
                .values()
                .max_by_key(|score| (score.kills, Reverse(score.join_order)))
                .filter(|score| score.kills > 0)
                .map(|score| Winner::Player(score.player_id))
        }
    }

    fn score_entry(&mut self, player_id: PlayerId) -> &mut PlayerScore {
        let join_order = &mut self.next_join_order;
        self.player_scores.entry(player_id).or_insert_with(|| {
            let score = PlayerScore::new(player_id, *join_order);
            *join_order += 1;
            score
        })
    }

    fn flag_mut(&mut self, team: Team) -> &mut FlagState {
        match team {
            Team::Blue => &mut self.blue_flag,
            Team::Red => &mut self.red_flag,
        }
    }
}
