//! # Arena モジュール
//!
//! 戦車コアを駆動・検証するための最小限のワールド実装です。
//! 走行可能面・物理・砲弾生成の3つのコラボレータをまとめて提供します。
//!
//! - 原点中心の正方形アリーナ（外周は壁として扱う）
//! - 円柱障害物（走行不可・レイを遮る）
//! - 車体は半径 [`HULL_RADIUS_M`]・高さ [`HULL_HEIGHT_M`] の円柱
//! - 経路は直線、障害物に遮られる場合は側方に1点迂回
//! - 砲弾は重力下で積分し、地面・障害物・車体との当たりを報告
//!
//! 経路探索エンジンや剛体物理エンジンではありません。

use tracing::{debug, info};

use crate::models::{
    common::{math_utils, AgentId, Orientation, Pose, Vector3, GRAVITY},
    traits::{HitEntity, INavSurface, IPhysics, ISpawner, ProjectileId, RayMask, RaycastHit},
};
use crate::scenario::ArenaConfig;

/// 車体の半径
pub const HULL_RADIUS_M: f64 = 1.0;
/// 車体の高さ
pub const HULL_HEIGHT_M: f64 = 1.5;
/// 障害物の高さ
pub const OBSTACLE_HEIGHT_M: f64 = 4.0;
/// 壁・障害物から確保する走行余裕
pub const NAV_CLEARANCE_M: f64 = 2.0;

const RAY_EPSILON: f64 = 1e-12;

/// 円柱障害物
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vector3,
    pub radius: f64,
}

/// 車体
#[derive(Debug, Clone)]
pub struct TankBody {
    pub id: AgentId,
    pub team: String,
    pub pose: Pose,
    pub health: u32,
    pub alive: bool,
}

/// 飛翔中の砲弾
#[derive(Debug, Clone)]
pub struct Shell {
    pub id: ProjectileId,
    pub owner: AgentId,
    pub position: Vector3,
    pub velocity: Vector3,
    pub orientation: Orientation,
}

/// 砲弾の着弾結果
#[derive(Debug, Clone, PartialEq)]
pub struct ShellImpact {
    pub projectile: ProjectileId,
    pub owner: AgentId,
    pub point: Vector3,
    /// 命中した車体（地形・場外ならNone）
    pub victim: Option<AgentId>,
    /// この命中で撃破したか
    pub destroyed: bool,
}

/// テスト用アリーナワールド
#[derive(Debug, Clone)]
pub struct ArenaWorld {
    pub half_extent: f64,
    pub gravity: f64,
    pub shell_damage: u32,
    obstacles: Vec<Obstacle>,
    bodies: Vec<TankBody>,
    shells: Vec<Shell>,
    next_projectile: ProjectileId,
}

impl ArenaWorld {
    pub fn new(half_extent: f64) -> Self {
        Self {
            half_extent,
            gravity: GRAVITY,
            shell_damage: 1,
            obstacles: Vec::new(),
            bodies: Vec::new(),
            shells: Vec::new(),
            next_projectile: 1,
        }
    }

    /// シナリオのアリーナ設定から作成
    pub fn from_config(config: &ArenaConfig) -> Self {
        let mut world = Self::new(config.half_extent_m);
        world.shell_damage = config.shell_damage;
        for obstacle in &config.obstacles {
            world.add_obstacle(obstacle.center.to_ground(), obstacle.radius_m);
        }
        world
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn add_obstacle(&mut self, center: Vector3, radius: f64) {
        self.obstacles.push(Obstacle {
            center: center.flatten(),
            radius,
        });
    }

    pub fn add_tank(&mut self, id: &str, team: &str, position: Vector3, heading_deg: f64, health: u32) {
        let heading = math_utils::normalize_angle(heading_deg);
        self.bodies.push(TankBody {
            id: id.to_string(),
            team: team.to_string(),
            pose: Pose::new(position.flatten(), heading, heading),
            health,
            alive: true,
        });
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn bodies(&self) -> &[TankBody] {
        &self.bodies
    }

    pub fn body(&self, id: &str) -> Option<&TankBody> {
        self.bodies.iter().find(|body| body.id == id)
    }

    fn body_mut(&mut self, id: &str) -> Option<&mut TankBody> {
        self.bodies.iter_mut().find(|body| body.id == id && body.alive)
    }

    /// 生存している車体を撃破扱いにする
    pub fn destroy(&mut self, id: &str) {
        if let Some(body) = self.body_mut(id) {
            body.alive = false;
            body.health = 0;
        }
    }

    /// 指定戦車から見た生存中の敵一覧
    pub fn opponents_of(&self, id: &str) -> Vec<(AgentId, Vector3)> {
        let Some(team) = self.body(id).map(|body| body.team.clone()) else {
            return Vec::new();
        };
        self.bodies
            .iter()
            .filter(|body| body.alive && body.team != team)
            .map(|body| (body.id.clone(), body.pose.position))
            .collect()
    }

    /// 生存車体が残っているチーム（出現順・重複なし）
    pub fn surviving_teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = Vec::new();
        for body in self.bodies.iter().filter(|body| body.alive) {
            if !teams.contains(&body.team) {
                teams.push(body.team.clone());
            }
        }
        teams
    }

    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    /// 砲弾を1ステップ進め、着弾したものを取り除いて報告
    pub fn step_shells(&mut self, dt: f64) -> Vec<ShellImpact> {
        let mut impacts = Vec::new();
        let mut in_flight = Vec::with_capacity(self.shells.len());

        for mut shell in std::mem::take(&mut self.shells) {
            shell.velocity.z -= self.gravity * dt;
            let displacement = shell.velocity * dt;
            let length = displacement.magnitude();

            let hit = if length > 0.0 {
                self.raycast(shell.position, displacement.normalize(), length, RayMask::All)
            } else {
                None
            };

            match hit {
                Some(hit) => {
                    let victim = match hit.entity {
                        HitEntity::Agent(id) => Some(id),
                        HitEntity::Terrain => None,
                    };
                    impacts.push(ShellImpact {
                        projectile: shell.id,
                        owner: shell.owner.clone(),
                        point: hit.point,
                        victim,
                        destroyed: false,
                    });
                }
                None => {
                    shell.position += displacement;
                    if self.contains_xy(shell.position, 0.0) && shell.position.z >= 0.0 {
                        in_flight.push(shell);
                    } else {
                        debug!(projectile = shell.id, "SHELL_OUT_OF_BOUNDS: 砲弾が場外に出ました");
                    }
                }
            }
        }
        self.shells = in_flight;

        for impact in &mut impacts {
            let Some(victim) = impact.victim.clone() else {
                debug!(
                    projectile = impact.projectile,
                    x = impact.point.x,
                    y = impact.point.y,
                    "SHELL_MISSED: 地形に着弾"
                );
                continue;
            };
            let damage = self.shell_damage;
            if let Some(body) = self.body_mut(&victim) {
                body.health = body.health.saturating_sub(damage);
                if body.health == 0 {
                    body.alive = false;
                    impact.destroyed = true;
                }
                info!(
                    projectile = impact.projectile,
                    owner = %impact.owner,
                    victim = %victim,
                    remaining_health = body.health,
                    destroyed = impact.destroyed,
                    "SHELL_HIT: 砲弾が命中しました"
                );
            }
        }

        impacts
    }

    /// 水平位置がアリーナ内（余裕 `margin` を除く）か
    fn contains_xy(&self, point: Vector3, margin: f64) -> bool {
        let limit = self.half_extent - margin;
        point.x.abs() <= limit && point.y.abs() <= limit
    }

    /// 車体を置ける位置か（障害物の余裕込み）
    fn is_free(&self, point: Vector3, clearance: f64) -> bool {
        self.contains_xy(point, clearance)
            && self
                .obstacles
                .iter()
                .all(|obstacle| obstacle.center.distance_xy(&point) > obstacle.radius + clearance)
    }

    /// 線分が障害物（余裕込み）を横切らないか
    fn segment_clear(&self, from: Vector3, to: Vector3) -> bool {
        self.first_blocking_obstacle(from, to).is_none()
    }

    fn first_blocking_obstacle(&self, from: Vector3, to: Vector3) -> Option<Obstacle> {
        self.obstacles
            .iter()
            .filter(|obstacle| {
                segment_point_distance_xy(from, to, obstacle.center) < obstacle.radius + HULL_RADIUS_M
            })
            .min_by(|a, b| {
                from.distance_xy(&a.center)
                    .partial_cmp(&from.distance_xy(&b.center))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }
}

impl INavSurface for ArenaWorld {
    fn sample_point(&self, point: Vector3, max_snap_distance: f64) -> Option<Vector3> {
        let clearance = HULL_RADIUS_M + NAV_CLEARANCE_M;
        let ground = point.flatten();
        if self.is_free(ground, clearance) {
            return Some(ground);
        }

        // 壁の内側へ寄せる
        let limit = (self.half_extent - clearance).max(0.0);
        let mut snapped = Vector3::new(ground.x.clamp(-limit, limit), ground.y.clamp(-limit, limit), 0.0);

        // 障害物の外周へ押し出す
        for obstacle in &self.obstacles {
            let offset = (snapped - obstacle.center).flatten();
            let required = obstacle.radius + clearance;
            if offset.magnitude_xy() <= required {
                let direction = if offset.magnitude_xy() > 0.0 {
                    offset.normalize()
                } else {
                    Vector3::new(1.0, 0.0, 0.0)
                };
                snapped = obstacle.center + direction * (required + 1e-6);
            }
        }

        if ground.distance_xy(&snapped) <= max_snap_distance && self.is_free(snapped, clearance) {
            Some(snapped)
        } else {
            None
        }
    }

    fn compute_path(&self, from: Vector3, to: Vector3) -> Option<Vec<Vector3>> {
        let from = from.flatten();
        let to = to.flatten();
        if !self.is_free(to, HULL_RADIUS_M) {
            return None;
        }

        let Some(obstacle) = self.first_blocking_obstacle(from, to) else {
            return Some(vec![from, to]);
        };

        // 進行方向に垂直な左右どちらかへ1点迂回
        let direction = (to - from).flatten().normalize();
        let perpendicular = Vector3::new(-direction.y, direction.x, 0.0);
        let offset = obstacle.radius + HULL_RADIUS_M + NAV_CLEARANCE_M;
        let side = (obstacle.center - from).dot(&perpendicular);
        let preferred = if side > 0.0 { -1.0 } else { 1.0 };

        for sign in [preferred, -preferred] {
            let detour = obstacle.center + perpendicular * (offset * sign);
            if self.is_free(detour, HULL_RADIUS_M)
                && self.segment_clear(from, detour)
                && self.segment_clear(detour, to)
            {
                return Some(vec![from, detour, to]);
            }
        }
        None
    }
}

impl IPhysics for ArenaWorld {
    fn pose(&self, id: &str) -> Option<Pose> {
        self.bodies
            .iter()
            .find(|body| body.id == id && body.alive)
            .map(|body| body.pose)
    }

    fn raycast(&self, origin: Vector3, direction: Vector3, max_distance: f64, mask: RayMask) -> Option<RaycastHit> {
        let direction = direction.normalize();
        let mut nearest: Option<(f64, HitEntity)> = None;
        let mut consider = |t: f64, entity: HitEntity| {
            if nearest.as_ref().is_none_or(|(best, _)| t < *best) {
                nearest = Some((t, entity));
            }
        };

        // 地面
        if direction.z < -RAY_EPSILON {
            let t = -origin.z / direction.z;
            if (0.0..=max_distance).contains(&t) {
                consider(t, HitEntity::Terrain);
            }
        }

        // 外周の壁
        if let Some(t) = ray_exit_square(origin, direction, self.half_extent) {
            if t <= max_distance {
                consider(t, HitEntity::Terrain);
            }
        }

        for obstacle in &self.obstacles {
            if let Some(t) = ray_cylinder(origin, direction, obstacle.center, obstacle.radius, OBSTACLE_HEIGHT_M, max_distance) {
                consider(t, HitEntity::Terrain);
            }
        }

        if mask == RayMask::All {
            for body in self.bodies.iter().filter(|body| body.alive) {
                if let Some(t) = ray_cylinder(origin, direction, body.pose.position, HULL_RADIUS_M, HULL_HEIGHT_M, max_distance) {
                    consider(t, HitEntity::Agent(body.id.clone()));
                }
            }
        }

        nearest.map(|(t, entity)| RaycastHit {
            point: origin + direction * t,
            distance: t,
            entity,
        })
    }

    fn move_by(&mut self, id: &str, delta: Vector3) {
        let half_extent = self.half_extent;
        let obstacles = self.obstacles.clone();
        let Some(body) = self.body_mut(id) else {
            return;
        };

        let candidate = body.pose.position + delta.flatten();
        let limit = half_extent - HULL_RADIUS_M;
        let clamped = Vector3::new(candidate.x.clamp(-limit, limit), candidate.y.clamp(-limit, limit), 0.0);
        let blocked = obstacles
            .iter()
            .any(|obstacle| obstacle.center.distance_xy(&clamped) < obstacle.radius + HULL_RADIUS_M);
        if !blocked {
            body.pose.position = clamped;
        }
    }

    fn rotate_by(&mut self, id: &str, yaw_delta_deg: f64) {
        if let Some(body) = self.body_mut(id) {
            // 砲塔は車体に載っているので一緒に回る
            body.pose.heading_deg = math_utils::normalize_angle(body.pose.heading_deg + yaw_delta_deg);
            body.pose.turret_heading_deg = math_utils::normalize_angle(body.pose.turret_heading_deg + yaw_delta_deg);
        }
    }

    fn rotate_turret_by(&mut self, id: &str, yaw_delta_deg: f64) {
        if let Some(body) = self.body_mut(id) {
            body.pose.turret_heading_deg = math_utils::normalize_angle(body.pose.turret_heading_deg + yaw_delta_deg);
        }
    }
}

impl ISpawner for ArenaWorld {
    fn spawn_projectile(&mut self, owner: &str, position: Vector3, orientation: Orientation) -> ProjectileId {
        let id = self.next_projectile;
        self.next_projectile += 1;
        self.shells.push(Shell {
            id,
            owner: owner.to_string(),
            position,
            velocity: Vector3::zero(),
            orientation,
        });
        id
    }

    fn set_projectile_velocity(&mut self, projectile: ProjectileId, velocity: Vector3) {
        if let Some(shell) = self.shells.iter_mut().find(|shell| shell.id == projectile) {
            shell.velocity = velocity;
        }
    }
}

/// 点と線分の水平距離
fn segment_point_distance_xy(from: Vector3, to: Vector3, point: Vector3) -> f64 {
    let segment = (to - from).flatten();
    let length_sq = segment.dot(&segment);
    if length_sq <= 0.0 {
        return from.distance_xy(&point);
    }
    let t = ((point - from).flatten().dot(&segment) / length_sq).clamp(0.0, 1.0);
    (from + segment * t).distance_xy(&point)
}

/// 鉛直円柱（側面と上面）へのレイの進入距離
fn ray_cylinder(
    origin: Vector3,
    direction: Vector3,
    center: Vector3,
    radius: f64,
    height: f64,
    max_distance: f64,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    let ox = origin.x - center.x;
    let oy = origin.y - center.y;

    let a = direction.x * direction.x + direction.y * direction.y;
    if a > RAY_EPSILON {
        let b = 2.0 * (ox * direction.x + oy * direction.y);
        let c = ox * ox + oy * oy - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let t = (-b - discriminant.sqrt()) / (2.0 * a);
            let z = origin.z + direction.z * t;
            if (0.0..=max_distance).contains(&t) && (0.0..=height).contains(&z) {
                best = Some(t);
            }
        }
    }

    if direction.z.abs() > RAY_EPSILON {
        let t = (height - origin.z) / direction.z;
        if (0.0..=max_distance).contains(&t) {
            let x = ox + direction.x * t;
            let y = oy + direction.y * t;
            if x * x + y * y <= radius * radius && best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        }
    }

    best
}

/// 正方形アリーナの外周に達するまでの距離（内側から外向きのみ）
fn ray_exit_square(origin: Vector3, direction: Vector3, half_extent: f64) -> Option<f64> {
    let axis_exit = |position: f64, velocity: f64| -> Option<f64> {
        if velocity > RAY_EPSILON {
            Some((half_extent - position) / velocity)
        } else if velocity < -RAY_EPSILON {
            Some((-half_extent - position) / velocity)
        } else {
            None
        }
    };

    [axis_exit(origin.x, direction.x), axis_exit(origin.y, direction.y)]
        .into_iter()
        .flatten()
        .filter(|t| *t >= 0.0)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaWorld {
        let mut world = ArenaWorld::new(50.0);
        world.add_obstacle(Vector3::new(0.0, 0.0, 0.0), 5.0);
        world.add_tank("RED", "red", Vector3::new(-20.0, 0.0, 0.0), 0.0, 2);
        world.add_tank("BLUE", "blue", Vector3::new(20.0, 0.0, 0.0), 180.0, 2);
        world
    }

    #[test]
    fn test_straight_path_when_clear() {
        let world = arena();
        let path = world
            .compute_path(Vector3::new(-20.0, 20.0, 0.0), Vector3::new(20.0, 20.0, 0.0))
            .unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_detour_around_obstacle() {
        let world = arena();
        let from = Vector3::new(-20.0, 0.0, 0.0);
        let to = Vector3::new(20.0, 0.0, 0.0);
        let path = world.compute_path(from, to).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], from);
        assert_eq!(path[2], to);
        assert!(path[1].distance_xy(&Vector3::zero()) > 5.0 + HULL_RADIUS_M);
    }

    #[test]
    fn test_path_into_obstacle_is_invalid() {
        let world = arena();
        assert!(world.compute_path(Vector3::new(-20.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)).is_none());
        assert!(world.compute_path(Vector3::zero(), Vector3::new(80.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_sample_point_snaps_within_distance() {
        let world = arena();
        let free = Vector3::new(10.0, 30.0, 2.0);
        assert_eq!(world.sample_point(free, 1.0), Some(Vector3::new(10.0, 30.0, 0.0)));
        // 障害物の外周付近は押し出される
        let near_edge = Vector3::new(7.5, 0.0, 0.0);
        let snapped = world.sample_point(near_edge, 1.0).unwrap();
        assert!(snapped.distance_xy(&Vector3::zero()) > 8.0);
        // 中心付近は遠すぎてスナップできない
        assert!(world.sample_point(Vector3::zero(), 1.0).is_none());
    }

    #[test]
    fn test_raycast_hits_obstacle_before_tank() {
        let world = arena();
        let origin = Vector3::new(-18.0, 0.0, 1.0);
        let hit = world
            .raycast(origin, Vector3::new(1.0, 0.0, 0.0), 100.0, RayMask::All)
            .unwrap();
        assert_eq!(hit.entity, HitEntity::Terrain);
        assert!((hit.distance - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_raycast_terrain_mask_ignores_tanks() {
        let mut world = arena();
        // 行く手に車体を置く
        world.add_tank("GREEN", "green", Vector3::new(0.0, 20.0, 0.0), 0.0, 1);
        let origin = Vector3::new(-20.0, 20.0, 1.0);
        let east = Vector3::new(1.0, 0.0, 0.0);
        let all = world.raycast(origin, east, 100.0, RayMask::All).unwrap();
        assert_eq!(all.entity, HitEntity::Agent("GREEN".to_string()));
        let terrain = world.raycast(origin, east, 100.0, RayMask::Terrain).unwrap();
        assert_eq!(terrain.entity, HitEntity::Terrain);
        assert!((terrain.distance - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_carries_turret() {
        let mut world = arena();
        world.rotate_turret_by("RED", 30.0);
        world.rotate_by("RED", 90.0);
        let pose = world.pose("RED").unwrap();
        assert_eq!(pose.heading_deg, 90.0);
        assert_eq!(pose.turret_heading_deg, 120.0);
    }

    #[test]
    fn test_move_blocked_by_obstacle() {
        let mut world = arena();
        world.move_by("RED", Vector3::new(15.0, 0.0, 0.0));
        assert_eq!(world.pose("RED").unwrap().position, Vector3::new(-20.0, 0.0, 0.0));
        world.move_by("RED", Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(world.pose("RED").unwrap().position, Vector3::new(-15.0, 0.0, 0.0));
    }

    #[test]
    fn test_shell_hits_and_destroys_tank() {
        let mut world = ArenaWorld::new(50.0);
        world.add_tank("RED", "red", Vector3::new(0.0, 0.0, 0.0), 0.0, 1);
        world.add_tank("BLUE", "blue", Vector3::new(10.0, 0.0, 0.0), 0.0, 1);

        let shell = world.spawn_projectile("RED", Vector3::new(1.5, 0.0, 1.0), Orientation::new(0.0, 0.0));
        world.set_projectile_velocity(shell, Vector3::new(30.0, 0.0, 0.0));

        let mut impacts = Vec::new();
        for _ in 0..50 {
            impacts.extend(world.step_shells(0.02));
            if !impacts.is_empty() {
                break;
            }
        }
        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].victim.as_deref(), Some("BLUE"));
        assert!(impacts[0].destroyed);
        assert!(world.pose("BLUE").is_none());
        assert!(world.shells().is_empty());
        assert_eq!(world.surviving_teams(), vec!["red".to_string()]);
    }

    #[test]
    fn test_shell_lands_on_ground() {
        let mut world = ArenaWorld::new(50.0);
        let shell = world.spawn_projectile("RED", Vector3::new(0.0, 0.0, 1.0), Orientation::new(0.0, 45.0));
        world.set_projectile_velocity(shell, Orientation::new(0.0, 45.0).forward() * 10.0);
        let mut impacts = Vec::new();
        for _ in 0..500 {
            impacts.extend(world.step_shells(0.01));
        }
        assert_eq!(impacts.len(), 1);
        assert!(impacts[0].victim.is_none());
        assert!(impacts[0].point.z.abs() < 1e-6);
    }

    #[test]
    fn test_opponents_exclude_own_team_and_dead() {
        let mut world = arena();
        world.add_tank("RED2", "red", Vector3::new(-20.0, 10.0, 0.0), 0.0, 1);
        let opponents = world.opponents_of("RED");
        assert_eq!(opponents.len(), 1);
        assert_eq!(opponents[0].0, "BLUE");
        world.destroy("BLUE");
        assert!(world.opponents_of("RED").is_empty());
    }
}
