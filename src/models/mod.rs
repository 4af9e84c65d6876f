// 基本的なデータ型と数学ユーティリティ
pub mod common;

// コラボレータとエージェントのインターフェース（trait）定義
pub mod traits;

// 回復可能なエラー
pub mod errors;

// 期限ベースの遅延キュー
pub mod scheduler;

// 1ティック分の参照の束
pub mod context;

// 戦車コアの各コンポーネント
pub mod navigator;
pub mod locomotion;
pub mod tracker;
pub mod fire_control;
pub mod vision;
pub mod tank;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use errors::AgentError;
pub use scheduler::{DelayQueue, TimerKind};
pub use context::TickContext;
pub use navigator::{NavPath, Navigator, WaypointProgress};
pub use locomotion::{DestinationKind, LocomotionController, MovementState};
pub use tracker::TargetTracker;
pub use fire_control::{
    solve_lofted_angle, BallisticSolution, FireBlock, FireControl, FireOutcome, FireState, LaunchSolution,
    ShotRecord, ShotStats,
};
pub use vision::{DetectionEvent, DetectionEventType, DetectionStats, VisionSensor};
pub use tank::{TankAgent, TickReport};
