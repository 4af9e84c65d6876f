//! 自律戦車エージェントの制御コアと、それを駆動するアリーナシミュレーション
//!
//! - [`models`]: 走行制御・目標追跡・射撃管制・弾道計算などのエージェントコア
//! - [`arena`]: コアが必要とするコラボレータ（走行可能面・物理・砲弾生成）の最小実装
//! - [`scenario`]: YAML シナリオの読み込みと検証
//! - [`simulation`]: 固定時間刻みのシミュレーションループ
//! - [`logging`]: tracing の初期化

pub mod arena;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
