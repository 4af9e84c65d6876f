use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// エージェント識別子
///
/// ターゲット集合などで保持する「弱参照」はこのIDのみで、
/// 実体の位置は毎回物理コラボレータに問い合わせて解決します。
pub type AgentId = String;

/// 重力加速度 [m/s²]
pub const GRAVITY: f64 = 9.81;

/// 3次元ベクトル（位置・方向・速度の共通表現）
///
/// 座標系: x, y が水平面、z が鉛直上向き。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64, // 上方向
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// 水平面上の単位方向ベクトル（+x軸から反時計回りの方位角、度）
    pub fn from_heading(heading_deg: f64) -> Self {
        let rad = math_utils::deg_to_rad(heading_deg);
        Self::new(rad.cos(), rad.sin(), 0.0)
    }

    /// 3次元距離を計算
    pub fn distance(&self, other: &Vector3) -> f64 {
        (*other - *self).magnitude()
    }

    /// XY平面での2次元距離を計算
    pub fn distance_xy(&self, other: &Vector3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// XY平面での長さ
    pub fn magnitude_xy(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    /// 正規化（長さ0の場合はそのまま返す）
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            Self::new(self.x / mag, self.y / mag, self.z / mag)
        } else {
            *self
        }
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// XY平面での方位角（度）
    pub fn heading_deg(&self) -> f64 {
        math_utils::rad_to_deg(self.y.atan2(self.x))
    }

    /// 鉛直成分を落とした水平ベクトル
    pub fn flatten(&self) -> Self {
        Self::new(self.x, self.y, 0.0)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 車体の姿勢（物理コラボレータが所有し、コアからは読み取り専用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3,
    /// 車体の方位角（度）
    pub heading_deg: f64,
    /// 砲塔の方位角（度、ワールド基準）
    pub turret_heading_deg: f64,
}

impl Pose {
    pub fn new(position: Vector3, heading_deg: f64, turret_heading_deg: f64) -> Self {
        Self {
            position,
            heading_deg,
            turret_heading_deg,
        }
    }

    /// 車体前方の単位ベクトル
    pub fn forward(&self) -> Vector3 {
        Vector3::from_heading(self.heading_deg)
    }

    /// 砲塔前方の単位ベクトル
    pub fn turret_forward(&self) -> Vector3 {
        Vector3::from_heading(self.turret_heading_deg)
    }
}

/// 砲弾の発射姿勢
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// 方位角（度）
    pub yaw_deg: f64,
    /// 仰角（度、上向き正）
    pub pitch_deg: f64,
}

impl Orientation {
    pub fn new(yaw_deg: f64, pitch_deg: f64) -> Self {
        Self { yaw_deg, pitch_deg }
    }

    /// 姿勢の前方単位ベクトル
    pub fn forward(&self) -> Vector3 {
        let yaw = math_utils::deg_to_rad(self.yaw_deg);
        let pitch = math_utils::deg_to_rad(self.pitch_deg);
        Vector3::new(
            pitch.cos() * yaw.cos(),
            pitch.cos() * yaw.sin(),
            pitch.sin(),
        )
    }
}

/// プレイヤー操作の入力（入力デバイスのポーリングは外部で行う）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// 前後進軸 [-1, 1]
    pub throttle: f64,
    /// 車体旋回軸 [-1, 1]（正で反時計回り）
    pub turn: f64,
    /// 砲塔旋回軸 [-1, 1]（正で反時計回り）
    pub turret_turn: f64,
    /// このティックで引き金が押されたか
    pub fire: bool,
}

/// エージェントの状態を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentStatus {
    Active,    // アクティブ
    Destroyed, // 撃破
    Inactive,  // 非アクティブ（未起動またはプールへ返却済み）
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use super::Vector3;

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }

    /// 角度を-180度〜180度の範囲に正規化
    pub fn normalize_angle(angle_deg: f64) -> f64 {
        let mut normalized = angle_deg % 360.0;
        if normalized > 180.0 {
            normalized -= 360.0;
        } else if normalized <= -180.0 {
            normalized += 360.0;
        }
        normalized
    }

    /// 2つの角度の差を計算（-180度〜180度の範囲）
    pub fn angle_difference(angle1_deg: f64, angle2_deg: f64) -> f64 {
        normalize_angle(angle2_deg - angle1_deg)
    }

    /// 符号付き方位誤差（度）
    ///
    /// `heading_deg` の前方軸から `from` → `to` 方向までの水平面上の角度。
    /// 正は反時計回り（左）、負は時計回り（右）。
    /// 2点が水平面上で一致する場合は0を返します。
    pub fn signed_heading_error(from: Vector3, heading_deg: f64, to: Vector3) -> f64 {
        let direction = (to - from).flatten();
        if direction.magnitude_xy() < 1e-9 {
            return 0.0;
        }
        angle_difference(heading_deg, direction.heading_deg())
    }

    /// 最大ステップで制限した回転量（残り誤差を越えない）
    pub fn clamp_turn(error_deg: f64, max_step_deg: f64) -> f64 {
        error_deg.signum() * error_deg.abs().min(max_step_deg.abs())
    }
}
