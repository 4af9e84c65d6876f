use crate::models::common::*;

/// 全てのエージェントが実装する基本インターフェース
pub trait IAgent {
    /// シナリオ設定からのパラメータ適用
    fn initialize(&mut self, scenario_config: &crate::scenario::ScenarioConfig);

    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 走行可能面（ナビメッシュ）コラボレータのインターフェース
///
/// 経路探索アルゴリズムそのものはコアの外側にあります。
pub trait INavSurface {
    /// 指定点を最寄りの到達可能位置へスナップ（`max_snap_distance` 以内に無ければNone）
    fn sample_point(&self, point: Vector3, max_snap_distance: f64) -> Option<Vector3>;

    /// 経路計算（始点を含むウェイポイント列、経路が無効ならNone）
    fn compute_path(&self, from: Vector3, to: Vector3) -> Option<Vec<Vector3>>;
}

/// レイキャストの対象レイヤー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayMask {
    /// 地形・障害物のみ
    Terrain,
    /// 地形と車両の両方
    All,
}

/// レイキャストで当たった対象
#[derive(Debug, Clone, PartialEq)]
pub enum HitEntity {
    Terrain,
    Agent(AgentId),
}

/// レイキャスト結果
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    pub point: Vector3,
    pub distance: f64,
    pub entity: HitEntity,
}

/// 剛体・衝突判定コラボレータのインターフェース
pub trait IPhysics {
    /// 姿勢の取得（破棄済みのエージェントはNone）
    fn pose(&self, id: &str) -> Option<Pose>;

    /// 最も近い当たりを返すレイキャスト
    fn raycast(
        &self,
        origin: Vector3,
        direction: Vector3,
        max_distance: f64,
        mask: RayMask,
    ) -> Option<RaycastHit>;

    /// 車体の平行移動
    fn move_by(&mut self, id: &str, delta: Vector3);

    /// 車体の旋回（度、反時計回り正）
    fn rotate_by(&mut self, id: &str, yaw_delta_deg: f64);

    /// 砲塔の旋回（度、反時計回り正）
    fn rotate_turret_by(&mut self, id: &str, yaw_delta_deg: f64);
}

/// 砲弾ハンドル
pub type ProjectileId = u64;

/// 砲弾生成コラボレータのインターフェース
pub trait ISpawner {
    /// 砲口位置・姿勢で砲弾を生成
    fn spawn_projectile(&mut self, owner: &str, position: Vector3, orientation: Orientation) -> ProjectileId;

    /// 生成済み砲弾の初速設定
    fn set_projectile_velocity(&mut self, projectile: ProjectileId, velocity: Vector3);
}

/// 1ティックでコアが必要とするコラボレータ一式
pub trait IWorld: INavSurface + IPhysics + ISpawner {}

impl<T: INavSurface + IPhysics + ISpawner + ?Sized> IWorld for T {}
