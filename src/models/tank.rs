//! # Tank モジュール
//!
//! 1両分の戦車エージェント。走行制御・目標追跡・射撃管制と、
//! それらが共有する遅延キュー・エージェント時計・乱数列をまとめて所有します。
//!
//! ## ティック内の処理順序
//!
//! 1. 期限切れの遅延キュー項目をまとめて取り出して処理
//! 2. 目標追跡器の検証（消滅した目標の除去）
//! 3. 走行制御と射撃管制（プレイヤー操作時は入力による直接駆動）
//! 4. エージェント時計を進める

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::models::{
    common::{math_utils, AgentId, AgentStatus, PlayerInput},
    context::TickContext,
    errors::AgentError,
    fire_control::{FireControl, FireOutcome, FireState},
    locomotion::{LocomotionController, MovementState},
    scheduler::{DelayQueue, TimerKind},
    tracker::TargetTracker,
    traits::{IAgent, IPhysics, IWorld},
};
use crate::scenario::{ScenarioConfig, TankTuning};

/// 1ティック分の処理結果
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// ティック開始時のエージェント時計
    pub time: f64,
    /// 自律エージェントの走行状態（プレイヤー操作・非アクティブ時はNone）
    pub movement: Option<MovementState>,
    /// 射撃の試行結果（試行しなかった場合はNone）
    pub fire: Option<FireOutcome>,
    /// このティックで消滅が判明した選択目標
    pub target_lost: Option<AgentId>,
}

impl TickReport {
    fn idle(time: f64) -> Self {
        Self {
            time,
            movement: None,
            fire: None,
            target_lost: None,
        }
    }

    pub fn fired(&self) -> bool {
        self.fire.as_ref().is_some_and(FireOutcome::is_fired)
    }
}

/// 戦車エージェント
#[derive(Debug, Clone)]
pub struct TankAgent {
    pub id: AgentId,
    pub team: String,
    /// プレイヤー操作かどうか
    pub player: bool,
    pub status: AgentStatus,
    tuning: TankTuning,
    locomotion: LocomotionController,
    tracker: TargetTracker,
    fire_control: FireControl,
    timers: DelayQueue<TimerKind>,
    /// エージェント時計（起動時に0へ戻る）
    clock: f64,
    rng: ChaCha8Rng,
    input: PlayerInput,
}

impl TankAgent {
    pub fn new(id: AgentId, player: bool, tuning: TankTuning, seed: u64) -> Self {
        Self {
            tracker: TargetTracker::new(id.clone()),
            locomotion: LocomotionController::new(tuning.locomotion.clone()),
            fire_control: FireControl::new(tuning.fire_control.clone()),
            id,
            team: String::new(),
            player,
            status: AgentStatus::Inactive,
            tuning,
            timers: DelayQueue::new(),
            clock: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            input: PlayerInput::default(),
        }
    }

    /// 起動（再起動を含む）
    ///
    /// 走行・追跡・射撃の状態と保留中の期限をすべて初期値へ戻し、
    /// 砲塔を車体の向きに揃えます。乱数列は引き継ぎます。
    pub fn activate<P>(&mut self, physics: &mut P)
    where
        P: IPhysics + ?Sized,
    {
        self.timers.clear();
        self.locomotion.reset();
        self.tracker.reset();
        self.fire_control.reset();
        self.clock = 0.0;
        self.input = PlayerInput::default();

        if let Some(pose) = physics.pose(&self.id) {
            let offset = math_utils::angle_difference(pose.turret_heading_deg, pose.heading_deg);
            if offset != 0.0 {
                physics.rotate_turret_by(&self.id, offset);
            }
        }

        self.status = AgentStatus::Active;
        info!(
            agent_id = %self.id,
            player = self.player,
            ammo = self.fire_control.ammo(),
            "AGENT_ACTIVATED: 戦車を起動しました"
        );
    }

    /// 停止（保留中の期限はすべて破棄）
    pub fn deactivate(&mut self) {
        self.timers.clear();
        if self.status == AgentStatus::Active {
            self.status = AgentStatus::Inactive;
        }
        info!(agent_id = %self.id, status = ?self.status, "AGENT_DEACTIVATED: 戦車を停止しました");
    }

    /// 撃破された
    pub fn mark_destroyed(&mut self) {
        self.timers.clear();
        self.status = AgentStatus::Destroyed;
        warn!(agent_id = %self.id, time = self.clock, "AGENT_DESTROYED: 戦車が撃破されました");
    }

    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    pub fn refill_ammo(&mut self) {
        self.fire_control.refill_ammo();
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn tuning(&self) -> &TankTuning {
        &self.tuning
    }

    pub fn locomotion(&self) -> &LocomotionController {
        &self.locomotion
    }

    pub fn tracker(&self) -> &TargetTracker {
        &self.tracker
    }

    pub fn fire_control(&self) -> &FireControl {
        &self.fire_control
    }

    pub fn fire_state(&self) -> FireState {
        self.fire_control.state()
    }

    pub fn timers(&self) -> &DelayQueue<TimerKind> {
        &self.timers
    }

    fn accepts_visibility_events(&self) -> bool {
        !self.player && self.status == AgentStatus::Active
    }

    /// 視界進入イベント
    pub fn on_target_enter<P>(&mut self, candidate: &str, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        if !self.accepts_visibility_events() {
            return;
        }
        let Some(pose) = physics.pose(&self.id) else {
            return;
        };
        if self.tracker.on_enter(candidate, pose.position, physics) {
            self.locomotion.drop_destination(&mut self.timers);
        }
    }

    /// 視界滞在イベント
    pub fn on_target_stay<P>(&mut self, candidate: &str, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        if !self.accepts_visibility_events() {
            return;
        }
        if let Some(pose) = physics.pose(&self.id) {
            self.tracker.on_stay(candidate, pose.position, physics);
        }
    }

    /// 視界離脱イベント
    pub fn on_target_exit<P>(&mut self, candidate: &str, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        if !self.accepts_visibility_events() {
            return;
        }
        if let Some(pose) = physics.pose(&self.id) {
            self.tracker.on_exit(candidate, pose.position, physics);
        }
    }

    /// 1ティック進める
    pub fn tick<W>(&mut self, world: &mut W, dt: f64) -> TickReport
    where
        W: IWorld + ?Sized,
    {
        if self.status != AgentStatus::Active {
            return TickReport::idle(self.clock);
        }
        let Some(pose) = world.pose(&self.id) else {
            return TickReport::idle(self.clock);
        };

        let now = self.clock;
        let mut report = TickReport::idle(now);
        let mut ctx = TickContext {
            id: &self.id,
            pose,
            world,
            rng: &mut self.rng,
            timers: &mut self.timers,
            now,
            dt,
        };

        for kind in ctx.timers.poll(now) {
            debug!(agent_id = %ctx.id, kind = ?kind, time = now, "TIMER_EXPIRED");
            match kind {
                TimerKind::PathRecompute => self.locomotion.on_recompute_due(&mut ctx),
                TimerKind::EvadeEnd => self.locomotion.on_evade_end(ctx.timers),
                TimerKind::Cooldown => self.fire_control.on_cooldown_expired(),
            }
        }

        if let Err(AgentError::TargetLost { target_id }) = self.tracker.validate(pose.position, &*ctx.world) {
            warn!(agent_id = %ctx.id, target_id = %target_id, "TARGET_LOST: 選択目標が消滅しました");
            report.target_lost = Some(target_id);
        }

        if self.player {
            self.locomotion.drive_player(&mut ctx, &self.input);
            report.fire = self.fire_control.update_player(&mut ctx, &self.input);
            // 引き金は1ティックで消費
            self.input.fire = false;
        } else {
            report.movement = Some(self.locomotion.tick(&mut ctx, &self.tracker));
            let target = self.tracker.resolve_selected(&*ctx.world);
            report.fire = Some(self.fire_control.update_autonomous(&mut ctx, target));
        }

        self.clock += dt;
        report
    }
}

impl IAgent for TankAgent {
    fn initialize(&mut self, scenario_config: &ScenarioConfig) {
        let Some(index) = scenario_config.tanks.iter().position(|tank| tank.id == self.id) else {
            warn!(agent_id = %self.id, "シナリオに戦車設定がありません");
            return;
        };
        let config = &scenario_config.tanks[index];

        self.team = config.team.clone();
        self.player = config.player;
        self.tuning = scenario_config.tuning_for(&self.id);
        self.locomotion = LocomotionController::new(self.tuning.locomotion.clone());
        self.fire_control = FireControl::new(self.tuning.fire_control.clone());
        self.tracker = TargetTracker::new(self.id.clone());
        self.timers.clear();
        self.rng = ChaCha8Rng::seed_from_u64(scenario_config.sim.seed.wrapping_add(index as u64));
        self.status = AgentStatus::Inactive;
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}
