//! # Locomotion モジュール
//!
//! 自律エージェントの走行状態機械（目的地選択・経路追従・障害物回避・到着）と、
//! プレイヤー操作の直接駆動を扱います。
//!
//! ## 状態遷移
//!
//! ```text
//! NoDestination ──目的地決定──> Seeking ──障害物検知──> ObstacleEvade
//!       ^                         │                         │
//!       │                         └──最終ウェイポイント──> Arrived
//!       └───────────── 回避終了（目的地を破棄）─────────────┘
//! ```
//!
//! `Arrived` は次のティックで `NoDestination` と同様に目的地を選び直します。

use rand::Rng;
use tracing::{debug, info, warn};

use crate::models::{
    common::{math_utils, PlayerInput, Vector3},
    context::TickContext,
    navigator::{Navigator, WaypointProgress},
    scheduler::{DelayQueue, TimerKind},
    tracker::TargetTracker,
    traits::{INavSurface, IPhysics, RayMask},
};
use crate::scenario::LocomotionTuning;

/// 走行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    NoDestination,
    Seeking,
    ObstacleEvade,
    Arrived,
}

/// 保持中の目的地の由来
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// 選択目標の周辺
    Pursuit,
    /// 視界から外れた目標の位置へ直行
    Seek,
    /// 自分の周辺を徘徊
    Wander,
}

/// 走行制御
#[derive(Debug, Clone)]
pub struct LocomotionController {
    tuning: LocomotionTuning,
    navigator: Navigator,
    state: MovementState,
    destination_kind: Option<DestinationKind>,
}

impl LocomotionController {
    pub fn new(tuning: LocomotionTuning) -> Self {
        let navigator = Navigator::new(&tuning);
        Self {
            tuning,
            navigator,
            state: MovementState::NoDestination,
            destination_kind: None,
        }
    }

    /// 起動時のリセット
    pub fn reset(&mut self) {
        self.navigator.reset();
        self.state = MovementState::NoDestination;
        self.destination_kind = None;
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn destination_kind(&self) -> Option<DestinationKind> {
        self.destination_kind
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn tuning(&self) -> &LocomotionTuning {
        &self.tuning
    }

    /// 保持中の目的地を破棄して次のティックで選び直させる
    ///
    /// 回避中は後退を最後まで続け、選び直しは回避終了期限の到来まで待ちます。
    pub fn drop_destination(&mut self, timers: &mut DelayQueue<TimerKind>) {
        if self.navigator.has_destination() {
            debug!(state = ?self.state, "DESTINATION_DROPPED: 目的地を破棄しました");
        }
        self.navigator.clear_destination(timers);
        self.destination_kind = None;
        if self.state != MovementState::ObstacleEvade {
            self.state = MovementState::NoDestination;
        }
    }

    /// 回避終了期限の到来：目的地を強制的に取り直す
    pub fn on_evade_end(&mut self, timers: &mut DelayQueue<TimerKind>) {
        if self.state != MovementState::ObstacleEvade {
            return;
        }
        info!("EVADE_END: 回避を終了し目的地を取り直します");
        self.navigator.clear_destination(timers);
        timers.cancel(TimerKind::EvadeEnd);
        self.state = MovementState::NoDestination;
        self.destination_kind = None;
    }

    /// 経路再計算期限の到来
    pub fn on_recompute_due<W, R>(&mut self, ctx: &mut TickContext<'_, W, R>)
    where
        W: INavSurface + ?Sized,
        R: ?Sized,
    {
        let position = ctx.pose.position;
        match self
            .navigator
            .on_recompute_due(&*ctx.world, ctx.timers, position, ctx.now)
        {
            Ok(()) => {
                if self.navigator.has_destination() {
                    debug!(agent_id = %ctx.id, "PATH_RECOMPUTED: 経路を再計算しました");
                }
            }
            Err(error) => {
                warn!(agent_id = %ctx.id, %error, "PATH_INVALID: 再計算した経路が無効です");
                self.destination_kind = None;
                if self.state != MovementState::ObstacleEvade {
                    self.state = MovementState::NoDestination;
                }
            }
        }
    }

    /// プレイヤー入力による直接駆動（状態機械を通さない）
    pub fn drive_player<W, R>(&mut self, ctx: &mut TickContext<'_, W, R>, input: &PlayerInput)
    where
        W: IPhysics + ?Sized,
        R: ?Sized,
    {
        if input.throttle != 0.0 {
            let delta = ctx.pose.forward() * (input.throttle * self.tuning.speed_mps * ctx.dt);
            ctx.world.move_by(ctx.id, delta);
        }
        if input.turn != 0.0 {
            ctx.world
                .rotate_by(ctx.id, input.turn * self.tuning.turn_speed_deg_s * ctx.dt);
        }
    }

    /// 自律エージェントの1ティック分の走行制御
    pub fn tick<W, R>(&mut self, ctx: &mut TickContext<'_, W, R>, tracker: &TargetTracker) -> MovementState
    where
        W: INavSurface + IPhysics + ?Sized,
        R: Rng + ?Sized,
    {
        if matches!(self.state, MovementState::NoDestination | MovementState::Arrived) {
            self.choose_destination(ctx, tracker);
        }

        if self.state == MovementState::Seeking && self.obstacle_ahead(ctx) {
            self.state = MovementState::ObstacleEvade;
            ctx.timers
                .schedule(TimerKind::EvadeEnd, ctx.now + self.tuning.evade_duration_s);
            info!(
                agent_id = %ctx.id,
                x = ctx.pose.position.x,
                y = ctx.pose.position.y,
                evade_duration_s = self.tuning.evade_duration_s,
                "OBSTACLE_DETECTED: 前方に障害物、後退します"
            );
        }

        match self.state {
            MovementState::Seeking => {
                let error = self
                    .navigator
                    .heading_error(ctx.pose.position, ctx.pose.heading_deg);
                if error.abs() > self.tuning.steer_deadband_deg {
                    let step = math_utils::clamp_turn(error, self.tuning.turn_speed_deg_s * ctx.dt);
                    ctx.world.rotate_by(ctx.id, step);
                }
                let delta = ctx.pose.forward() * (self.tuning.speed_mps * ctx.dt);
                ctx.world.move_by(ctx.id, delta);
            }
            MovementState::ObstacleEvade => {
                let delta = -(ctx.pose.forward() * (self.tuning.speed_mps * ctx.dt));
                ctx.world.move_by(ctx.id, delta);
            }
            MovementState::NoDestination | MovementState::Arrived => {}
        }

        if matches!(self.state, MovementState::Seeking | MovementState::ObstacleEvade) {
            let progress = self
                .navigator
                .advance_if_reached(ctx.pose.position, self.tuning.waypoint_reach_m);
            if progress == WaypointProgress::Arrived {
                self.navigator.cancel_recompute(ctx.timers);
                ctx.timers.cancel(TimerKind::EvadeEnd);
                self.state = MovementState::Arrived;
                self.destination_kind = None;
                info!(
                    agent_id = %ctx.id,
                    x = ctx.pose.position.x,
                    y = ctx.pose.position.y,
                    "DESTINATION_REACHED: 目的地に到着しました"
                );
            }
        }

        self.state
    }

    /// 目的地の決定（追跡 → 直行 → 徘徊の優先順）と経路要求
    fn choose_destination<W, R>(&mut self, ctx: &mut TickContext<'_, W, R>, tracker: &TargetTracker)
    where
        W: INavSurface + IPhysics + ?Sized,
        R: Rng + ?Sized,
    {
        let position = ctx.pose.position;

        let choice = if let Some((target_id, target_position)) = tracker.resolve_selected(&*ctx.world) {
            debug!(agent_id = %ctx.id, target_id = %target_id, "DESTINATION_PURSUIT: 目標の周辺へ向かいます");
            self.navigator
                .request_random_point(&*ctx.world, &mut *ctx.rng, target_position, self.tuning.pursuit_radius_m)
                .map(|point| (DestinationKind::Pursuit, point))
        } else if let Some(seek_position) = self.seek_position(ctx, tracker) {
            Ok((DestinationKind::Seek, seek_position))
        } else {
            self.navigator
                .request_random_point(&*ctx.world, &mut *ctx.rng, position, self.tuning.wander_radius_m)
                .map(|point| (DestinationKind::Wander, point))
        };

        let (kind, goal) = match choice {
            Ok(choice) => choice,
            Err(error) => {
                warn!(agent_id = %ctx.id, %error, "DESTINATION_UNAVAILABLE: 目的地を決定できません");
                self.state = MovementState::NoDestination;
                return;
            }
        };

        if let Err(error) = self.navigator.request_path(&*ctx.world, position, goal) {
            warn!(agent_id = %ctx.id, %error, "PATH_INVALID: 次のティックで再試行します");
            self.state = MovementState::NoDestination;
            self.destination_kind = None;
            return;
        }

        self.state = MovementState::Seeking;
        self.destination_kind = Some(kind);
        if kind == DestinationKind::Wander {
            self.navigator.schedule_recompute(ctx.timers, ctx.now);
        } else {
            self.navigator.cancel_recompute(ctx.timers);
        }

        info!(
            agent_id = %ctx.id,
            kind = ?kind,
            destination_x = goal.x,
            destination_y = goal.y,
            waypoint_count = self.navigator.path().len(),
            "DESTINATION_SET: 目的地を設定しました"
        );
    }

    /// 視界から外れた目標が近くにいればその位置
    fn seek_position<W, R>(&self, ctx: &TickContext<'_, W, R>, tracker: &TargetTracker) -> Option<Vector3>
    where
        W: IPhysics + ?Sized,
        R: ?Sized,
    {
        let fallback = tracker.fallback_seek()?;
        let pose = ctx.world.pose(fallback)?;
        if ctx.pose.position.distance(&pose.position) <= self.tuning.seek_range_m {
            Some(pose.position)
        } else {
            None
        }
    }

    /// 車体前方の地形レイ判定
    fn obstacle_ahead<W, R>(&self, ctx: &TickContext<'_, W, R>) -> bool
    where
        W: IPhysics + ?Sized,
        R: ?Sized,
    {
        let origin = ctx.pose.position + Vector3::new(0.0, 0.0, self.tuning.probe_height_m);
        ctx.world
            .raycast(origin, ctx.pose.forward(), self.tuning.obstacle_probe_m, RayMask::Terrain)
            .is_some()
    }
}
