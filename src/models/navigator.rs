//! # Navigator モジュール
//!
//! 走行可能面コラボレータへの経路要求と、その結果のウェイポイント列を
//! カーソル付きで消費可能な形にまとめます。
//!
//! - ランダム到達点のサンプリング（試行上限付き、上限なしも設定可能）
//! - 経路要求と無効経路の扱い
//! - 徘徊目的地の定期再計算（遅延キューの期限として管理）

use rand::Rng;
use tracing::{debug, warn};

use crate::models::{
    common::{math_utils, Vector3},
    errors::AgentError,
    scheduler::{DelayQueue, TimerKind},
    traits::INavSurface,
};
use crate::scenario::LocomotionTuning;

/// カーソル付きのウェイポイント列
#[derive(Debug, Clone, PartialEq)]
pub struct NavPath {
    waypoints: Vec<Vector3>,
    cursor: usize,
    valid: bool,
}

impl NavPath {
    /// 無効な空経路
    pub fn empty() -> Self {
        Self {
            waypoints: Vec::new(),
            cursor: 0,
            valid: false,
        }
    }

    pub fn from_waypoints(waypoints: Vec<Vector3>) -> Self {
        Self {
            waypoints,
            cursor: 0,
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn waypoints(&self) -> &[Vector3] {
        &self.waypoints
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// 現在のウェイポイント（無効・空の経路ではNone）
    pub fn current_waypoint(&self) -> Option<Vector3> {
        if !self.valid {
            return None;
        }
        self.waypoints.get(self.cursor).copied()
    }

    /// カーソルが最終ウェイポイントを指しているか
    pub fn is_at_final(&self) -> bool {
        self.cursor + 1 >= self.waypoints.len()
    }

    /// カーソルを1つ進める（最終ウェイポイントでは進めずfalse）
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.waypoints.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }
}

/// ウェイポイント到達判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointProgress {
    /// まだ到達していない
    Pending,
    /// 次のウェイポイントへ進んだ
    Advanced,
    /// 最終ウェイポイントに到達し、目的地を解放した
    Arrived,
}

/// 経路要求とウェイポイント消費を管理するナビゲータ
#[derive(Debug, Clone)]
pub struct Navigator {
    path: NavPath,
    destination: Option<Vector3>,
    snap_distance: f64,
    sample_attempt_limit: Option<u32>,
    recompute_interval: f64,
}

impl Navigator {
    pub fn new(tuning: &LocomotionTuning) -> Self {
        Self {
            path: NavPath::empty(),
            destination: None,
            snap_distance: tuning.snap_distance_m,
            sample_attempt_limit: tuning.sample_attempt_limit,
            recompute_interval: tuning.recompute_interval_s,
        }
    }

    /// 経路と目的地を破棄（起動時のリセット用）
    pub fn reset(&mut self) {
        self.path = NavPath::empty();
        self.destination = None;
    }

    pub fn path(&self) -> &NavPath {
        &self.path
    }

    pub fn destination(&self) -> Option<Vector3> {
        self.destination
    }

    pub fn has_destination(&self) -> bool {
        self.destination.is_some()
    }

    /// `center` から `radius` 以内のランダムな到達可能点を要求
    ///
    /// 地表面上の円内で候補点を引き、走行可能面にスナップできるまで繰り返します。
    /// 試行上限が `None` の場合は無制限に再試行するため、
    /// 走行可能面が有効な点を一切返さないとここで停止する点に注意してください。
    pub fn request_random_point<S, R>(
        &self,
        surface: &S,
        rng: &mut R,
        center: Vector3,
        radius: f64,
    ) -> Result<Vector3, AgentError>
    where
        S: INavSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let mut attempts: u32 = 0;
        loop {
            if let Some(limit) = self.sample_attempt_limit {
                if attempts >= limit {
                    warn!(
                        center_x = center.x,
                        center_y = center.y,
                        radius,
                        attempts,
                        "NO_SNAP_FOUND: 到達可能点のサンプリングが上限に達しました"
                    );
                    return Err(AgentError::NoSnapFound { attempts });
                }
            }
            attempts = attempts.saturating_add(1);

            let candidate = center + random_in_disc(rng, radius);
            if let Some(point) = surface.sample_point(candidate, self.snap_distance) {
                return Ok(point);
            }
        }
    }

    /// `from` から `to` への経路を要求し、現在の経路を置き換える
    ///
    /// 無効な経路の場合は目的地も解放し、呼び出し側は次ティックで再試行します。
    pub fn request_path<S>(&mut self, surface: &S, from: Vector3, to: Vector3) -> Result<(), AgentError>
    where
        S: INavSurface + ?Sized,
    {
        match surface.compute_path(from, to) {
            Some(waypoints) if !waypoints.is_empty() => {
                debug!(
                    waypoint_count = waypoints.len(),
                    destination_x = to.x,
                    destination_y = to.y,
                    "PATH_COMPUTED: 経路を取得しました"
                );
                self.path = NavPath::from_waypoints(waypoints);
                self.destination = Some(to);
                Ok(())
            }
            _ => {
                self.path = NavPath::empty();
                self.destination = None;
                Err(AgentError::PathInvalid { from, to })
            }
        }
    }

    /// 定期再計算の期限を登録
    pub fn schedule_recompute(&self, timers: &mut DelayQueue<TimerKind>, now: f64) {
        timers.schedule(TimerKind::PathRecompute, now + self.recompute_interval);
    }

    pub fn cancel_recompute(&self, timers: &mut DelayQueue<TimerKind>) {
        timers.cancel(TimerKind::PathRecompute);
    }

    /// 再計算期限の到来時の処理
    ///
    /// 目的地を保持している間だけ経路を引き直して期限を再登録します。
    /// 目的地が既に無ければ何もせず、再登録もしません。
    pub fn on_recompute_due<S>(
        &mut self,
        surface: &S,
        timers: &mut DelayQueue<TimerKind>,
        from: Vector3,
        now: f64,
    ) -> Result<(), AgentError>
    where
        S: INavSurface + ?Sized,
    {
        let Some(destination) = self.destination else {
            return Ok(());
        };

        self.request_path(surface, from, destination)?;
        self.schedule_recompute(timers, now);
        Ok(())
    }

    /// 目的地と経路を解放し、保留中の再計算をキャンセル
    pub fn clear_destination(&mut self, timers: &mut DelayQueue<TimerKind>) {
        self.destination = None;
        self.path = NavPath::empty();
        self.cancel_recompute(timers);
    }

    /// 前方軸から現在のウェイポイントまでの符号付き方位誤差（度）
    ///
    /// 経路が空・無効な場合は0（補正不要）を返します。
    pub fn heading_error(&self, position: Vector3, heading_deg: f64) -> f64 {
        match self.path.current_waypoint() {
            Some(waypoint) => math_utils::signed_heading_error(position, heading_deg, waypoint),
            None => 0.0,
        }
    }

    /// ウェイポイント到達判定とカーソル前進
    pub fn advance_if_reached(&mut self, position: Vector3, threshold: f64) -> WaypointProgress {
        let Some(waypoint) = self.path.current_waypoint() else {
            return WaypointProgress::Pending;
        };

        if waypoint.distance_xy(&position) > threshold {
            return WaypointProgress::Pending;
        }

        if self.path.advance() {
            WaypointProgress::Advanced
        } else {
            self.destination = None;
            WaypointProgress::Arrived
        }
    }
}

/// 半径 `radius` の水平円内の一様乱数オフセット
fn random_in_disc<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> Vector3 {
    if radius <= 0.0 {
        return Vector3::zero();
    }
    loop {
        let x: f64 = rng.gen_range(-1.0..=1.0);
        let y: f64 = rng.gen_range(-1.0..=1.0);
        if x * x + y * y <= 1.0 {
            return Vector3::new(x * radius, y * radius, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;

    /// 経路とスナップ結果を固定で返す走行可能面
    struct ScriptedSurface {
        path: Option<Vec<Vector3>>,
        snap_after: u32,
        calls: Cell<u32>,
    }

    impl ScriptedSurface {
        fn new(path: Option<Vec<Vector3>>) -> Self {
            Self {
                path,
                snap_after: 0,
                calls: Cell::new(0),
            }
        }
    }

    impl INavSurface for ScriptedSurface {
        fn sample_point(&self, point: Vector3, _max_snap_distance: f64) -> Option<Vector3> {
            let calls = self.calls.get() + 1;
            self.calls.set(calls);
            if calls > self.snap_after { Some(point) } else { None }
        }

        fn compute_path(&self, _from: Vector3, _to: Vector3) -> Option<Vec<Vector3>> {
            self.path.clone()
        }
    }

    fn straight_path() -> Vec<Vector3> {
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(10.0, 10.0, 0.0),
        ]
    }

    fn navigator() -> Navigator {
        Navigator::new(&LocomotionTuning::default())
    }

    #[test]
    fn test_heading_error_zero_when_facing_waypoint() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(Some(straight_path()));
        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();
        nav.path.advance();

        // 現在のウェイポイント (10, 0) を真正面に見ている
        let error = nav.heading_error(Vector3::new(-5.0, 0.0, 0.0), 0.0);
        assert_eq!(error, 0.0);
    }

    #[test]
    fn test_heading_error_sign_matches_side() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(Some(straight_path()));
        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();
        nav.path.advance();

        // +y 向き(90度)から見て (10, 0) は右側 → 負
        let right = nav.heading_error(Vector3::new(5.0, -5.0, 0.0), 90.0);
        assert!(right < 0.0);
        // -y 向き(-90度)から見て (10, 0) は左側 → 正
        let left = nav.heading_error(Vector3::new(5.0, 5.0, 0.0), -90.0);
        assert!(left > 0.0);
    }

    #[test]
    fn test_heading_error_zero_for_empty_path() {
        let nav = navigator();
        assert!(nav.path().is_empty());
        for heading in [-170.0, -45.0, 0.0, 30.0, 179.0] {
            assert_eq!(nav.heading_error(Vector3::new(3.0, 4.0, 0.0), heading), 0.0);
        }
    }

    #[test]
    fn test_cursor_monotonic_and_bounded() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(Some(straight_path()));
        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();

        let mut last_cursor = nav.path().cursor();
        let mut outcomes = Vec::new();
        for waypoint in straight_path() {
            // 何度到達判定しても最終インデックスを超えない
            for _ in 0..3 {
                let outcome = nav.advance_if_reached(waypoint, 2.0);
                outcomes.push(outcome);
                assert!(nav.path().cursor() >= last_cursor);
                assert!(nav.path().cursor() < nav.path().len());
                last_cursor = nav.path().cursor();
            }
        }
        assert!(outcomes.contains(&WaypointProgress::Arrived));
        assert!(!nav.has_destination());
        assert_eq!(nav.path().cursor(), 2);
    }

    #[test]
    fn test_invalid_path_clears_destination() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(None);
        let result = nav.request_path(&surface, Vector3::zero(), Vector3::new(5.0, 0.0, 0.0));
        assert!(matches!(result, Err(AgentError::PathInvalid { .. })));
        assert!(!nav.has_destination());
        assert!(!nav.path().is_valid());
        assert_eq!(nav.heading_error(Vector3::zero(), 45.0), 0.0);
    }

    #[test]
    fn test_new_path_resets_cursor() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(Some(straight_path()));
        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();
        nav.advance_if_reached(Vector3::zero(), 2.0);
        assert_eq!(nav.path().cursor(), 1);

        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();
        assert_eq!(nav.path().cursor(), 0);
    }

    #[test]
    fn test_random_point_within_radius() {
        let nav = navigator();
        let surface = ScriptedSurface::new(None);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let center = Vector3::new(5.0, -5.0, 0.0);
        for _ in 0..50 {
            let point = nav.request_random_point(&surface, &mut rng, center, 10.0).unwrap();
            assert!(point.distance(&center) <= 10.0 + 1e-9);
        }
    }

    #[test]
    fn test_random_point_retries_until_snap() {
        let nav = navigator();
        let mut surface = ScriptedSurface::new(None);
        surface.snap_after = 7;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(nav.request_random_point(&surface, &mut rng, Vector3::zero(), 5.0).is_ok());
        assert_eq!(surface.calls.get(), 8);
    }

    #[test]
    fn test_random_point_gives_up_after_limit() {
        let tuning = LocomotionTuning {
            sample_attempt_limit: Some(4),
            ..LocomotionTuning::default()
        };
        let nav = Navigator::new(&tuning);
        let mut surface = ScriptedSurface::new(None);
        surface.snap_after = u32::MAX;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = nav.request_random_point(&surface, &mut rng, Vector3::zero(), 5.0);
        assert_eq!(result, Err(AgentError::NoSnapFound { attempts: 4 }));
        assert_eq!(surface.calls.get(), 4);
    }

    #[test]
    fn test_recompute_rearms_while_destination_held() {
        let mut nav = navigator();
        let surface = ScriptedSurface::new(Some(straight_path()));
        let mut timers = DelayQueue::new();
        nav.request_path(&surface, Vector3::zero(), Vector3::new(10.0, 10.0, 0.0)).unwrap();
        nav.schedule_recompute(&mut timers, 0.0);
        assert_eq!(timers.due_of(TimerKind::PathRecompute), Some(5.0));

        nav.advance_if_reached(Vector3::zero(), 2.0);
        nav.on_recompute_due(&surface, &mut timers, Vector3::new(1.0, 0.0, 0.0), 5.0).unwrap();
        assert_eq!(nav.path().cursor(), 0);
        assert_eq!(timers.due_of(TimerKind::PathRecompute), Some(10.0));

        // 目的地解放後は再登録されない
        nav.clear_destination(&mut timers);
        assert!(!timers.is_pending(TimerKind::PathRecompute));
        nav.on_recompute_due(&surface, &mut timers, Vector3::zero(), 10.0).unwrap();
        assert!(!timers.is_pending(TimerKind::PathRecompute));
    }
}
