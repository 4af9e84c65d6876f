use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::models::Vector3;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Position2D {
    pub x_m: f64,
    pub y_m: f64,
}

impl Position2D {
    /// 地表（z=0）上の位置ベクトルへ変換
    pub fn to_ground(&self) -> Vector3 {
        Vector3::new(self.x_m, self.y_m, 0.0)
    }
}

/// 円柱障害物の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub center: Position2D,
    pub radius_m: f64,
}

/// アリーナ（テスト用ワールド）設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    /// 正方形アリーナの半幅（原点中心）
    pub half_extent_m: f64,
    /// 視界トリガーの半径
    pub vision_radius_m: f64,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    /// 砲弾1発のダメージ
    #[serde(default = "default_shell_damage")]
    pub shell_damage: u32,
    /// 補給地点（範囲内で残弾0の戦車に再装填）
    #[serde(default)]
    pub supply_points: Vec<SupplyPointConfig>,
}

/// 補給地点の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupplyPointConfig {
    pub center: Position2D,
    pub radius_m: f64,
}

fn default_shell_damage() -> u32 {
    1
}

fn default_health() -> u32 {
    3
}

/// 走行制御のチューニング値
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocomotionTuning {
    pub speed_mps: f64,
    pub turn_speed_deg_s: f64,
    /// 操舵の不感帯（度）
    pub steer_deadband_deg: f64,
    /// ウェイポイント到達判定距離
    pub waypoint_reach_m: f64,
    /// 前方障害物の探索距離
    pub obstacle_probe_m: f64,
    /// 探索レイの高さオフセット
    pub probe_height_m: f64,
    pub evade_duration_s: f64,
    pub recompute_interval_s: f64,
    /// 追跡時に目標周辺でサンプリングする半径
    pub pursuit_radius_m: f64,
    /// 見失った目標を直接追う最大距離
    pub seek_range_m: f64,
    pub wander_radius_m: f64,
    pub snap_distance_m: f64,
    /// ランダム点サンプリングの試行上限（nullで無制限）
    pub sample_attempt_limit: Option<u32>,
}

impl Default for LocomotionTuning {
    fn default() -> Self {
        Self {
            speed_mps: 12.0,
            turn_speed_deg_s: 180.0,
            steer_deadband_deg: 2.0,
            waypoint_reach_m: 2.0,
            obstacle_probe_m: 2.0,
            probe_height_m: 0.5,
            evade_duration_s: 0.5,
            recompute_interval_s: 5.0,
            pursuit_radius_m: 10.0,
            seek_range_m: 30.0,
            wander_radius_m: 100.0,
            snap_distance_m: 1.0,
            sample_attempt_limit: Some(256),
        }
    }
}

/// 射撃管制のチューニング値
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FireControlTuning {
    pub turret_turn_speed_deg_s: f64,
    /// 砲塔旋回速度に掛かる歴史的スケール定数（既存のチューニング値との互換用）
    pub turret_speed_scale: f64,
    /// 砲塔照準の不感帯（度）
    pub aim_deadband_deg: f64,
    /// 射撃許可の角度窓（±度）
    pub fire_window_deg: f64,
    pub cooldown_s: f64,
    pub max_shells: u32,
    pub launch_speed_mps: f64,
    pub gravity_mps2: f64,
    /// 射程外のときに使う仰角
    pub fallback_angle_deg: f64,
    pub muzzle_forward_m: f64,
    pub muzzle_height_m: f64,
}

impl Default for FireControlTuning {
    fn default() -> Self {
        Self {
            turret_turn_speed_deg_s: 360.0,
            turret_speed_scale: 50.0,
            aim_deadband_deg: 5.0,
            fire_window_deg: 10.0,
            cooldown_s: 2.0,
            max_shells: 5,
            launch_speed_mps: 30.0,
            gravity_mps2: crate::models::GRAVITY,
            fallback_angle_deg: 45.0,
            muzzle_forward_m: 1.5,
            muzzle_height_m: 1.2,
        }
    }
}

/// 戦車1両分のチューニング値
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TankTuning {
    pub locomotion: LocomotionTuning,
    pub fire_control: FireControlTuning,
}

/// 戦車の配置設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TankConfig {
    pub id: String,
    pub team: String,
    /// プレイヤー操作かどうか
    #[serde(default)]
    pub player: bool,
    pub position: Position2D,
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default = "default_health")]
    pub health: u32,
    /// 個別チューニング（省略時は tank_defaults）
    #[serde(default)]
    pub tuning: Option<TankTuning>,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub arena: ArenaConfig,
    #[serde(default)]
    pub tank_defaults: TankTuning,
    pub tanks: Vec<TankConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(std::path::PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError("dt_s must be positive".to_string()));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError("t_max_s must be positive".to_string()));
        }
        if self.arena.half_extent_m <= 0.0 {
            return Err(ScenarioError::ValidationError("half_extent_m must be positive".to_string()));
        }
        if self.arena.vision_radius_m <= 0.0 {
            return Err(ScenarioError::ValidationError("vision_radius_m must be positive".to_string()));
        }
        for obstacle in &self.arena.obstacles {
            if obstacle.radius_m <= 0.0 {
                return Err(ScenarioError::ValidationError("Obstacle radius must be positive".to_string()));
            }
        }
        for supply in &self.arena.supply_points {
            if supply.radius_m <= 0.0 {
                return Err(ScenarioError::ValidationError("Supply point radius must be positive".to_string()));
            }
        }

        let mut seen = HashSet::new();
        for tank in &self.tanks {
            if !seen.insert(tank.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!("Duplicate tank id {}", tank.id)));
            }
            if !self.is_position_in_bounds(tank.position.x_m, tank.position.y_m) {
                return Err(ScenarioError::ValidationError(format!(
                    "Tank {} outside arena bounds",
                    tank.id
                )));
            }
            let tuning = self.tuning_for(&tank.id);
            if tuning.locomotion.speed_mps <= 0.0 || tuning.fire_control.launch_speed_mps <= 0.0 {
                return Err(ScenarioError::ValidationError(format!(
                    "Tank {} speeds must be positive",
                    tank.id
                )));
            }
            if tuning.fire_control.gravity_mps2 <= 0.0 {
                return Err(ScenarioError::ValidationError(format!(
                    "Tank {} gravity must be positive",
                    tank.id
                )));
            }
            // 砲弾はアリーナ共通の重力（tank_defaults）で積分される
            if (tuning.fire_control.gravity_mps2 - self.tank_defaults.fire_control.gravity_mps2).abs() > 1e-9 {
                return Err(ScenarioError::ValidationError(format!(
                    "Tank {} gravity_mps2 must match tank_defaults",
                    tank.id
                )));
            }
        }

        Ok(())
    }

    /// 戦車IDに対応するチューニング値（個別設定が無ければデフォルト）
    pub fn tuning_for(&self, tank_id: &str) -> TankTuning {
        self.tanks
            .iter()
            .find(|tank| tank.id == tank_id)
            .and_then(|tank| tank.tuning.clone())
            .unwrap_or_else(|| self.tank_defaults.clone())
    }

    /// 位置がアリーナ内かどうかをチェック
    fn is_position_in_bounds(&self, x: f64, y: f64) -> bool {
        let half = self.arena.half_extent_m;
        x.abs() <= half && y.abs() <= half
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("シード値: {}", self.sim.seed);
        println!();

        println!("=== アリーナ ===");
        println!("半幅: {:.1}m", self.arena.half_extent_m);
        println!("視界半径: {:.1}m", self.arena.vision_radius_m);
        println!("障害物: {}個", self.arena.obstacles.len());
        println!("補給地点: {}個", self.arena.supply_points.len());
        println!();

        println!("=== 戦車 ===");
        for tank in &self.tanks {
            let control = if tank.player { "プレイヤー" } else { "自律" };
            println!(
                "  {} [{}] {} (位置: {:.1}, {:.1} / 耐久: {})",
                tank.id, tank.team, control, tank.position.x_m, tank.position.y_m, tank.health
            );
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
