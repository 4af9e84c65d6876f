use crate::models::{
    common::Pose,
    scheduler::{DelayQueue, TimerKind},
};

/// 1ティック分の制御に必要な参照の束
///
/// 走行制御と射撃管制はこの束を通してコラボレータへコマンドを発行し、
/// エージェントの遅延キューへ期限を登録します。
pub struct TickContext<'a, W: ?Sized, R: ?Sized> {
    pub id: &'a str,
    /// ティック開始時点の姿勢（このティック中に発行したコマンドは反映されない）
    pub pose: Pose,
    pub world: &'a mut W,
    pub rng: &'a mut R,
    pub timers: &'a mut DelayQueue<TimerKind>,
    /// エージェント時計での現在時刻
    pub now: f64,
    pub dt: f64,
}
