use crate::models::common::{AgentId, Vector3};

/// 制御コアの回復可能な異常
///
/// いずれも致命的ではなく、エージェントは常に次の行動を持ちます。
/// 呼び出し側はログに記録した上で、次ティックの再試行やフォールバックで回復します。
#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 経路計算に失敗した（次ティックで目的地を選び直す）
    PathInvalid { from: Vector3, to: Vector3 },
    /// ランダム点のスナップが試行上限まで成功しなかった
    NoSnapFound { attempts: u32 },
    /// 選択中の目標が消滅した（徘徊・照準なしへ戻る）
    TargetLost { target_id: AgentId },
    /// 弾道方程式の判別式が負（フォールバック仰角で射撃）
    BallisticUnreachable { horizontal_distance: f64, height: f64 },
    /// 残弾なし（想定内の状態で、再装填待ちへ遷移）
    AmmoExhausted,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::PathInvalid { from, to } => write!(
                f,
                "経路が無効です: ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                from.x, from.y, to.x, to.y
            ),
            AgentError::NoSnapFound { attempts } => {
                write!(f, "到達可能な点が見つかりません（{}回試行）", attempts)
            }
            AgentError::TargetLost { target_id } => write!(f, "目標を見失いました: {}", target_id),
            AgentError::BallisticUnreachable { horizontal_distance, height } => write!(
                f,
                "弾道解がありません（水平距離 {:.1}m, 高低差 {:.1}m）",
                horizontal_distance, height
            ),
            AgentError::AmmoExhausted => write!(f, "残弾がありません"),
        }
    }
}

impl std::error::Error for AgentError {}
