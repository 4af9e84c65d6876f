//! # FireControl モジュール
//!
//! 砲塔の照準補正、射撃可否の判定（角度窓・視線・クールダウン・残弾）、
//! 弾道仰角の解析解、発射ベクトルの計算、再装填状態を扱います。
//!
//! ## 状態
//!
//! - `Idle`: 射撃可能
//! - `Charging`: 射撃後クールダウン中（期限到来で `Idle` に戻る）
//! - `Reloading`: 残弾0。外部から `refill_ammo` が呼ばれるまで射撃不可
//!
//! 状態は残弾数と射撃フラグから導出され、個別のフラグは持ちません。

use tracing::{debug, info, warn};

use crate::models::{
    common::{math_utils, AgentId, Orientation, PlayerInput, Pose, Vector3},
    context::TickContext,
    errors::AgentError,
    scheduler::TimerKind,
    traits::{HitEntity, IPhysics, ISpawner, ProjectileId, RayMask},
};
use crate::scenario::FireControlTuning;

/// 視線判定レイを目標の先まで伸ばす余裕
const LINE_OF_SIGHT_MARGIN_M: f64 = 1.0;

/// 水平距離がこれ未満なら真上・真下への射撃として扱う
const VERTICAL_SHOT_EPSILON_M: f64 = 1e-6;

/// 射撃管制の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Idle,
    Charging,
    Reloading,
}

/// 弾道方程式の解
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticSolution {
    /// 仰角（度）
    pub angle_deg: f64,
    /// 実数解が存在したか（falseならフォールバック仰角）
    pub reachable: bool,
}

/// 高い方の実数解（曲射）の仰角を求める
///
/// `tan θ = (v² + sqrt(v⁴ − g(g x² + 2 v² y))) / (g x)`
///
/// 判別式が負（この初速では届かない）の場合は `fallback_angle_deg` を返し、
/// `reachable` をfalseにします。水平距離がほぼ0の場合は高低差の符号で ±90度。
pub fn solve_lofted_angle(
    speed: f64,
    gravity: f64,
    horizontal_distance: f64,
    height: f64,
    fallback_angle_deg: f64,
) -> BallisticSolution {
    if horizontal_distance < VERTICAL_SHOT_EPSILON_M {
        let angle_deg = if height >= 0.0 { 90.0 } else { -90.0 };
        return BallisticSolution {
            angle_deg,
            reachable: true,
        };
    }

    let v2 = speed * speed;
    let discriminant =
        v2 * v2 - gravity * (gravity * horizontal_distance * horizontal_distance + 2.0 * v2 * height);

    if !discriminant.is_finite() || discriminant < 0.0 {
        return BallisticSolution {
            angle_deg: fallback_angle_deg,
            reachable: false,
        };
    }

    let tan_theta = (v2 + discriminant.sqrt()) / (gravity * horizontal_distance);
    BallisticSolution {
        angle_deg: math_utils::rad_to_deg(tan_theta.atan()),
        reachable: true,
    }
}

/// 1発分の発射解
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchSolution {
    /// 仰角（度、上向き正）
    pub pitch_deg: f64,
    /// 方位角（砲塔から継承、度）
    pub yaw_deg: f64,
    /// 初速（エージェントごとに一定）
    pub speed: f64,
    /// 射程外のためフォールバック仰角を使ったか
    pub used_fallback: bool,
}

impl LaunchSolution {
    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.yaw_deg, self.pitch_deg)
    }

    /// 初速ベクトル（初速 × 砲弾前方軸）
    pub fn velocity(&self) -> Vector3 {
        self.orientation().forward() * self.speed
    }
}

/// 射撃を見送った理由
#[derive(Debug, Clone, PartialEq)]
pub enum FireBlock {
    /// 選択中の目標なし
    NoTarget,
    /// 照準が角度窓の外
    OutsideWindow { error_deg: f64 },
    /// クールダウン中
    Charging,
    /// 残弾なし
    Reloading,
    /// 視線が通らない
    NoLineOfSight,
}

/// 射撃試行の結果
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    Fired {
        projectile: ProjectileId,
        solution: LaunchSolution,
    },
    Blocked(FireBlock),
}

impl FireOutcome {
    pub fn is_fired(&self) -> bool {
        matches!(self, FireOutcome::Fired { .. })
    }
}

/// 発射記録
#[derive(Debug, Clone)]
pub struct ShotRecord {
    pub timestamp: f64,
    pub projectile: ProjectileId,
    pub target_id: Option<AgentId>,
    pub solution: LaunchSolution,
}

/// 射撃統計
#[derive(Debug, Clone)]
pub struct ShotStats {
    pub total_shots: usize,
    pub fallback_shots: usize,
    pub ammo_remaining: u32,
    pub state: FireState,
}

/// 射撃管制
#[derive(Debug, Clone)]
pub struct FireControl {
    tuning: FireControlTuning,
    /// 残弾数
    ammo: u32,
    /// 射撃からクールダウン期限までtrue
    fired: bool,
    /// 直近の砲塔方位誤差（度）
    heading_error: f64,
    shot_history: Vec<ShotRecord>,
}

impl FireControl {
    pub fn new(tuning: FireControlTuning) -> Self {
        let ammo = tuning.max_shells;
        Self {
            tuning,
            ammo,
            fired: false,
            heading_error: 0.0,
            shot_history: Vec::new(),
        }
    }

    /// 起動時のリセット（クールダウン期限はエージェント側のキュー破棄で消える）
    pub fn reset(&mut self) {
        self.ammo = self.tuning.max_shells;
        self.fired = false;
        self.heading_error = 0.0;
        self.shot_history.clear();
    }

    pub fn state(&self) -> FireState {
        if self.ammo == 0 {
            FireState::Reloading
        } else if self.fired {
            FireState::Charging
        } else {
            FireState::Idle
        }
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn max_shells(&self) -> u32 {
        self.tuning.max_shells
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn heading_error(&self) -> f64 {
        self.heading_error
    }

    pub fn shot_history(&self) -> &[ShotRecord] {
        &self.shot_history
    }

    pub fn get_shot_stats(&self) -> ShotStats {
        ShotStats {
            total_shots: self.shot_history.len(),
            fallback_shots: self
                .shot_history
                .iter()
                .filter(|record| record.solution.used_fallback)
                .count(),
            ammo_remaining: self.ammo,
            state: self.state(),
        }
    }

    /// クールダウン期限の到来
    pub fn on_cooldown_expired(&mut self) {
        self.fired = false;
        debug!(ammo = self.ammo, state = ?self.state(), "COOLDOWN_EXPIRED: 射撃可能になりました");
    }

    /// 弾薬補給（外部の補給トリガーから呼ばれる）
    pub fn refill_ammo(&mut self) {
        let previous = self.ammo;
        self.ammo = self.tuning.max_shells;
        info!(
            previous_ammo = previous,
            ammo = self.ammo,
            state = ?self.state(),
            "AMMO_REFILLED: 弾薬が補給されました"
        );
    }

    /// 砲口位置（砲塔前方・上方へのオフセット）
    pub fn muzzle_position(&self, pose: &Pose) -> Vector3 {
        pose.position
            + pose.turret_forward() * self.tuning.muzzle_forward_m
            + Vector3::new(0.0, 0.0, self.tuning.muzzle_height_m)
    }

    /// 1ティックあたりの砲塔旋回量の上限（度）
    fn turret_step(&self, dt: f64) -> f64 {
        self.tuning.turret_turn_speed_deg_s * self.tuning.turret_speed_scale * dt
    }

    fn gate(&self) -> Result<(), FireBlock> {
        match self.state() {
            FireState::Idle => Ok(()),
            FireState::Charging => Err(FireBlock::Charging),
            FireState::Reloading => {
                debug!(error = %AgentError::AmmoExhausted, "FIRE_BLOCKED: 再装填待ち");
                Err(FireBlock::Reloading)
            }
        }
    }

    /// 自律エージェントの1ティック分の照準と射撃
    pub fn update_autonomous<W, R>(
        &mut self,
        ctx: &mut TickContext<'_, W, R>,
        target: Option<(AgentId, Vector3)>,
    ) -> FireOutcome
    where
        W: IPhysics + ISpawner + ?Sized,
        R: ?Sized,
    {
        let Some((target_id, target_position)) = target else {
            self.heading_error = 0.0;
            return FireOutcome::Blocked(FireBlock::NoTarget);
        };

        let pose = ctx.pose;
        let error = math_utils::signed_heading_error(pose.position, pose.turret_heading_deg, target_position);
        self.heading_error = error;

        if error.abs() > self.tuning.aim_deadband_deg {
            let step = math_utils::clamp_turn(error, self.turret_step(ctx.dt));
            ctx.world.rotate_turret_by(ctx.id, step);
        }

        if error.abs() >= self.tuning.fire_window_deg {
            return FireOutcome::Blocked(FireBlock::OutsideWindow { error_deg: error });
        }
        if let Err(block) = self.gate() {
            return FireOutcome::Blocked(block);
        }

        let muzzle = self.muzzle_position(&pose);
        if !self.has_line_of_sight(&*ctx.world, muzzle, &target_id, target_position) {
            debug!(
                agent_id = %ctx.id,
                target_id = %target_id,
                "FIRE_BLOCKED: 視線が通りません"
            );
            return FireOutcome::Blocked(FireBlock::NoLineOfSight);
        }

        let offset = target_position - muzzle;
        let ballistic = solve_lofted_angle(
            self.tuning.launch_speed_mps,
            self.tuning.gravity_mps2,
            offset.magnitude_xy(),
            offset.z,
            self.tuning.fallback_angle_deg,
        );
        if !ballistic.reachable {
            warn!(
                agent_id = %ctx.id,
                target_id = %target_id,
                error = %AgentError::BallisticUnreachable {
                    horizontal_distance: offset.magnitude_xy(),
                    height: offset.z,
                },
                fallback_angle_deg = ballistic.angle_deg,
                "BALLISTIC_UNREACHABLE: フォールバック仰角で射撃します"
            );
        }

        let solution = LaunchSolution {
            pitch_deg: ballistic.angle_deg,
            yaw_deg: pose.turret_heading_deg,
            speed: self.tuning.launch_speed_mps,
            used_fallback: !ballistic.reachable,
        };
        self.fire(ctx, muzzle, solution, Some(target_id))
    }

    /// プレイヤー操作の砲塔旋回と手動射撃（視線判定・弾道計算なし）
    pub fn update_player<W, R>(&mut self, ctx: &mut TickContext<'_, W, R>, input: &PlayerInput) -> Option<FireOutcome>
    where
        W: IPhysics + ISpawner + ?Sized,
        R: ?Sized,
    {
        self.heading_error = 0.0;

        if input.turret_turn != 0.0 {
            let delta = input.turret_turn * self.turret_step(ctx.dt);
            ctx.world.rotate_turret_by(ctx.id, delta);
        }

        if !input.fire {
            return None;
        }
        if let Err(block) = self.gate() {
            return Some(FireOutcome::Blocked(block));
        }

        let pose = ctx.pose;
        let solution = LaunchSolution {
            pitch_deg: 0.0,
            yaw_deg: pose.turret_heading_deg,
            speed: self.tuning.launch_speed_mps,
            used_fallback: false,
        };
        let muzzle = self.muzzle_position(&pose);
        Some(self.fire(ctx, muzzle, solution, None))
    }

    /// 砲口から目標へのレイが目標自身に当たるか
    fn has_line_of_sight<P>(&self, physics: &P, muzzle: Vector3, target_id: &str, target_position: Vector3) -> bool
    where
        P: IPhysics + ?Sized,
    {
        let offset = target_position - muzzle;
        let distance = offset.magnitude();
        if distance <= 0.0 {
            return true;
        }
        match physics.raycast(muzzle, offset.normalize(), distance + LINE_OF_SIGHT_MARGIN_M, RayMask::All) {
            Some(hit) => hit.entity == HitEntity::Agent(target_id.to_string()),
            None => false,
        }
    }

    fn fire<W, R>(
        &mut self,
        ctx: &mut TickContext<'_, W, R>,
        muzzle: Vector3,
        solution: LaunchSolution,
        target_id: Option<AgentId>,
    ) -> FireOutcome
    where
        W: IPhysics + ISpawner + ?Sized,
        R: ?Sized,
    {
        let projectile = ctx.world.spawn_projectile(ctx.id, muzzle, solution.orientation());
        ctx.world.set_projectile_velocity(projectile, solution.velocity());

        self.ammo = self.ammo.saturating_sub(1);
        self.fired = true;
        ctx.timers.schedule(TimerKind::Cooldown, ctx.now + self.tuning.cooldown_s);

        info!(
            agent_id = %ctx.id,
            target_id = ?target_id,
            projectile,
            pitch_deg = solution.pitch_deg,
            yaw_deg = solution.yaw_deg,
            speed = solution.speed,
            used_fallback = solution.used_fallback,
            ammo = self.ammo,
            "SHELL_FIRED: 砲弾を発射しました"
        );
        if self.ammo == 0 {
            info!(agent_id = %ctx.id, "RELOAD_REQUIRED: 残弾0、補給待ちに入ります");
        }

        self.shot_history.push(ShotRecord {
            timestamp: ctx.now,
            projectile,
            target_id,
            solution,
        });

        FireOutcome::Fired { projectile, solution }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scheduler::DelayQueue;
    use crate::models::traits::RaycastHit;

    /// コマンドを記録するだけの物理・生成スタブ
    #[derive(Default)]
    struct RecordingWorld {
        hit: Option<HitEntity>,
        turret_rotations: Vec<f64>,
        spawned: Vec<(Vector3, Orientation)>,
        velocities: Vec<Vector3>,
    }

    impl IPhysics for RecordingWorld {
        fn pose(&self, _: &str) -> Option<Pose> {
            None
        }

        fn raycast(&self, origin: Vector3, direction: Vector3, _: f64, _: RayMask) -> Option<RaycastHit> {
            self.hit.clone().map(|entity| RaycastHit {
                point: origin + direction,
                distance: 1.0,
                entity,
            })
        }

        fn move_by(&mut self, _: &str, _: Vector3) {}

        fn rotate_by(&mut self, _: &str, _: f64) {}

        fn rotate_turret_by(&mut self, _: &str, yaw_delta_deg: f64) {
            self.turret_rotations.push(yaw_delta_deg);
        }
    }

    impl ISpawner for RecordingWorld {
        fn spawn_projectile(&mut self, _: &str, position: Vector3, orientation: Orientation) -> ProjectileId {
            self.spawned.push((position, orientation));
            self.spawned.len() as ProjectileId
        }

        fn set_projectile_velocity(&mut self, _: ProjectileId, velocity: Vector3) {
            self.velocities.push(velocity);
        }
    }

    fn tuning() -> FireControlTuning {
        FireControlTuning {
            max_shells: 3,
            ..FireControlTuning::default()
        }
    }

    fn pose_facing_east() -> Pose {
        Pose::new(Vector3::zero(), 0.0, 0.0)
    }

    /// 期限を処理してから自律射撃を1回試行
    fn attempt(
        fc: &mut FireControl,
        world: &mut RecordingWorld,
        timers: &mut DelayQueue<TimerKind>,
        now: f64,
        target: Vector3,
    ) -> FireOutcome {
        for kind in timers.poll(now) {
            if kind == TimerKind::Cooldown {
                fc.on_cooldown_expired();
            }
        }
        let mut rng = ();
        let mut ctx = TickContext {
            id: "T1",
            pose: pose_facing_east(),
            world,
            rng: &mut rng,
            timers,
            now,
            dt: 0.02,
        };
        fc.update_autonomous(&mut ctx, Some(("T2".to_string(), target)))
    }

    fn visible_world() -> RecordingWorld {
        RecordingWorld {
            hit: Some(HitEntity::Agent("T2".to_string())),
            ..RecordingWorld::default()
        }
    }

    #[test]
    fn test_lofted_angle_in_range() {
        let solution = solve_lofted_angle(30.0, 9.81, 20.0, 0.0, 45.0);
        assert!(solution.reachable);
        assert!(solution.angle_deg.is_finite());
        assert!(solution.angle_deg > 0.0 && solution.angle_deg < 90.0);
        // 高い方の解なので45度より上
        assert!(solution.angle_deg > 45.0);
    }

    #[test]
    fn test_lofted_angle_satisfies_trajectory() {
        let (v, g, x, y) = (30.0, 9.81, 40.0, 2.0);
        let solution = solve_lofted_angle(v, g, x, y, 45.0);
        let theta = math_utils::deg_to_rad(solution.angle_deg);
        // 水平距離xに達した時点の高さがyに一致する
        let t = x / (v * theta.cos());
        let height = v * theta.sin() * t - 0.5 * g * t * t;
        assert!((height - y).abs() < 1e-6);
    }

    #[test]
    fn test_unreachable_uses_fallback_not_nan() {
        let solution = solve_lofted_angle(30.0, 9.81, 200.0, 0.0, 45.0);
        assert!(!solution.reachable);
        assert_eq!(solution.angle_deg, 45.0);
        assert!(!solution.angle_deg.is_nan());
    }

    #[test]
    fn test_vertical_shot() {
        assert_eq!(solve_lofted_angle(30.0, 9.81, 0.0, 5.0, 45.0).angle_deg, 90.0);
        assert_eq!(solve_lofted_angle(30.0, 9.81, 0.0, -5.0, 45.0).angle_deg, -90.0);
    }

    #[test]
    fn test_launch_velocity_preserves_turret_yaw() {
        let solution = LaunchSolution {
            pitch_deg: 30.0,
            yaw_deg: 90.0,
            speed: 30.0,
            used_fallback: false,
        };
        let velocity = solution.velocity();
        assert!((velocity.magnitude() - 30.0).abs() < 1e-9);
        assert!(velocity.x.abs() < 1e-9);
        assert!(velocity.y > 0.0 && velocity.z > 0.0);
    }

    #[test]
    fn test_fires_when_aligned_and_visible() {
        let mut fc = FireControl::new(tuning());
        let mut world = visible_world();
        let mut timers = DelayQueue::new();

        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.0, Vector3::new(20.0, 0.0, 0.0));
        assert!(outcome.is_fired());
        assert_eq!(fc.ammo(), 2);
        assert_eq!(fc.state(), FireState::Charging);
        assert_eq!(world.spawned.len(), 1);
        assert!((world.velocities[0].magnitude() - 30.0).abs() < 1e-9);
        assert_eq!(timers.due_of(TimerKind::Cooldown), Some(2.0));
    }

    #[test]
    fn test_no_line_of_sight_suppresses_fire() {
        let mut fc = FireControl::new(tuning());
        let mut world = RecordingWorld::default();
        let mut timers = DelayQueue::new();

        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.0, Vector3::new(20.0, 0.0, 0.0));
        assert_eq!(outcome, FireOutcome::Blocked(FireBlock::NoLineOfSight));

        // 障害物に当たる場合も同様
        world.hit = Some(HitEntity::Terrain);
        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.1, Vector3::new(20.0, 0.0, 0.0));
        assert_eq!(outcome, FireOutcome::Blocked(FireBlock::NoLineOfSight));
        assert!(world.spawned.is_empty());
        assert_eq!(fc.ammo(), 3);
    }

    #[test]
    fn test_turret_rotates_toward_target_outside_deadband() {
        let mut fc = FireControl::new(tuning());
        let mut world = visible_world();
        let mut timers = DelayQueue::new();

        // 左30度の目標：角度窓の外なので撃たず、正方向へ旋回
        let target = Vector3::from_heading(30.0) * 20.0;
        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.0, target);
        assert!(matches!(outcome, FireOutcome::Blocked(FireBlock::OutsideWindow { .. })));
        assert_eq!(world.turret_rotations.len(), 1);
        assert!(world.turret_rotations[0] > 0.0);
        assert!(world.turret_rotations[0] <= 30.0 + 1e-9);

        // 右側なら負方向
        let target = Vector3::from_heading(-30.0) * 20.0;
        attempt(&mut fc, &mut world, &mut timers, 0.0, target);
        assert!(world.turret_rotations[1] < 0.0);

        // 不感帯内では旋回しないが射撃はする
        let target = Vector3::from_heading(3.0) * 20.0;
        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.0, target);
        assert_eq!(world.turret_rotations.len(), 2);
        assert!(outcome.is_fired());
    }

    #[test]
    fn test_cooldown_rejects_early_and_accepts_at_deadline() {
        let mut fc = FireControl::new(tuning());
        let mut world = visible_world();
        let mut timers = DelayQueue::new();
        let target = Vector3::new(20.0, 0.0, 0.0);

        assert!(attempt(&mut fc, &mut world, &mut timers, 0.0, target).is_fired());
        assert_eq!(
            attempt(&mut fc, &mut world, &mut timers, 1.99, target),
            FireOutcome::Blocked(FireBlock::Charging)
        );
        assert!(attempt(&mut fc, &mut world, &mut timers, 2.0, target).is_fired());
        assert_eq!(world.spawned.len(), 2);
    }

    #[test]
    fn test_ammo_exhaustion_and_refill() {
        let mut fc = FireControl::new(tuning());
        let mut world = visible_world();
        let mut timers = DelayQueue::new();
        let target = Vector3::new(20.0, 0.0, 0.0);

        let mut now = 0.0;
        for _ in 0..fc.max_shells() {
            assert!(attempt(&mut fc, &mut world, &mut timers, now, target).is_fired());
            now += 2.0;
        }
        assert_eq!(fc.ammo(), 0);
        assert_eq!(fc.state(), FireState::Reloading);
        assert_eq!(
            attempt(&mut fc, &mut world, &mut timers, now, target),
            FireOutcome::Blocked(FireBlock::Reloading)
        );

        fc.refill_ammo();
        assert_eq!(fc.ammo(), fc.max_shells());
        assert_eq!(fc.state(), FireState::Idle);
        assert!(attempt(&mut fc, &mut world, &mut timers, now + 0.02, target).is_fired());
    }

    #[test]
    fn test_refill_during_cooldown_returns_to_charging() {
        let tuning = FireControlTuning {
            max_shells: 1,
            ..FireControlTuning::default()
        };
        let mut fc = FireControl::new(tuning);
        let mut world = visible_world();
        let mut timers = DelayQueue::new();
        assert!(attempt(&mut fc, &mut world, &mut timers, 0.0, Vector3::new(20.0, 0.0, 0.0)).is_fired());
        assert_eq!(fc.state(), FireState::Reloading);

        fc.refill_ammo();
        assert_eq!(fc.state(), FireState::Charging);
    }

    #[test]
    fn test_out_of_range_target_still_fires_with_fallback() {
        let mut fc = FireControl::new(tuning());
        let mut world = visible_world();
        let mut timers = DelayQueue::new();

        let outcome = attempt(&mut fc, &mut world, &mut timers, 0.0, Vector3::new(500.0, 0.0, 0.0));
        match outcome {
            FireOutcome::Fired { solution, .. } => {
                assert!(solution.used_fallback);
                assert_eq!(solution.pitch_deg, 45.0);
            }
            other => panic!("expected fire, got {:?}", other),
        }
        assert_eq!(fc.get_shot_stats().fallback_shots, 1);
    }

    #[test]
    fn test_player_fire_is_horizontal_and_ungated_by_sight() {
        let mut fc = FireControl::new(tuning());
        let mut world = RecordingWorld::default();
        let mut timers = DelayQueue::new();
        let mut rng = ();
        let input = PlayerInput {
            turret_turn: 1.0,
            fire: true,
            ..PlayerInput::default()
        };
        let mut ctx = TickContext {
            id: "P1",
            pose: Pose::new(Vector3::zero(), 0.0, 90.0),
            world: &mut world,
            rng: &mut rng,
            timers: &mut timers,
            now: 0.0,
            dt: 0.02,
        };

        let outcome = fc.update_player(&mut ctx, &input);
        match outcome {
            Some(FireOutcome::Fired { solution, .. }) => {
                assert_eq!(solution.pitch_deg, 0.0);
                assert_eq!(solution.yaw_deg, 90.0);
            }
            other => panic!("expected fire, got {:?}", other),
        }
        // 旋回量 = 360 × 50 × 0.02
        assert!((world.turret_rotations[0] - 360.0).abs() < 1e-9);
        assert!(world.velocities[0].z.abs() < 1e-9);
    }
}
