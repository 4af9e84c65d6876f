//! # Simulation モジュール
//!
//! 戦車戦シミュレーションのメインループを提供します。
//!
//! 固定時間刻み（Δt）で全戦車を進め、視界イベントの配送、砲弾の積分、
//! 被弾・撃破の反映、補給地点での再装填を行います。
//!
//! ## シミュレーション処理順序
//!
//! 各時間刻みにおいて、以下の順序で処理が実行されます：
//!
//! 1. **視界処理**: 各戦車の視界センサーで進入・滞在・離脱イベントを生成し配送
//! 2. **戦車処理**: 遅延キュー、目標検証、走行制御、射撃管制
//! 3. **砲弾処理**: 重力下の積分、着弾判定、ダメージと撃破
//! 4. **補給処理**: 補給地点内で残弾0の戦車を再装填
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use tankai::simulation::SimulationEngine;
//! use tankai::scenario::ScenarioConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScenarioConfig::from_file("scenarios/arena_duel.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! let summary = engine.run()?;
//! println!("勝者: {:?}", summary.winner);
//! # Ok(())
//! # }
//! ```

use crate::arena::ArenaWorld;
use crate::models::*;
use crate::scenario::*;
use tracing::{debug, info, trace, warn};

/// 無限ループ防止のステップ上限
const MAX_STEPS: u64 = 1_000_000;

/// シミュレーション全体の集計
#[derive(Debug, Clone, Default)]
pub struct BattleStats {
    pub shots_fired: usize,
    pub fallback_shots: usize,
    pub hits: usize,
    pub misses: usize,
    pub refills: usize,
    pub targets_lost: usize,
    /// (撃破された戦車, 時刻)
    pub destroyed: Vec<(AgentId, f64)>,
}

/// 実行結果
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub elapsed: f64,
    pub steps: u64,
    /// 生存戦車が1チームだけになった場合はそのチーム
    pub winner: Option<String>,
    pub stats: BattleStats,
    /// 戦車ごとの射撃・検知統計（シナリオ順）
    pub tanks: Vec<TankSummary>,
}

/// 戦車1両分の集計
#[derive(Debug, Clone)]
pub struct TankSummary {
    pub id: AgentId,
    pub team: String,
    pub status: AgentStatus,
    pub shots: ShotStats,
    pub detections: DetectionStats,
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub seed: u64,
    pub step_count: u64,

    pub world: ArenaWorld,
    pub tanks: Vec<TankAgent>,
    pub sensors: Vec<VisionSensor>,
    pub stats: BattleStats,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let dt = scenario.sim.dt_s;
        let max_time = scenario.sim.t_max_s;
        let seed = scenario.sim.seed;
        let world = ArenaWorld::from_config(&scenario.arena)
            .with_gravity(scenario.tank_defaults.fire_control.gravity_mps2);

        Self {
            current_time: 0.0,
            dt,
            max_time,
            seed,
            step_count: 0,
            world,
            tanks: Vec::new(),
            sensors: Vec::new(),
            stats: BattleStats::default(),
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// シナリオから戦車を配置して起動
    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        for tank_config in &self.scenario_config.tanks {
            self.world.add_tank(
                &tank_config.id,
                &tank_config.team,
                tank_config.position.to_ground(),
                tank_config.heading_deg,
                tank_config.health,
            );

            let mut tank = TankAgent::new(
                tank_config.id.clone(),
                tank_config.player,
                self.scenario_config.tuning_for(&tank_config.id),
                self.seed,
            );
            tank.initialize(&self.scenario_config);
            tank.activate(&mut self.world);

            if self.verbose_level > 1 {
                debug!(
                    "戦車初期化: {} [{}] (位置: {:.1}, {:.1})",
                    tank.get_id(),
                    tank.team,
                    tank_config.position.x_m,
                    tank_config.position.y_m
                );
            }

            self.sensors.push(VisionSensor::new(
                tank_config.id.clone(),
                self.scenario_config.arena.vision_radius_m,
            ));
            self.tanks.push(tank);
        }

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  戦車: {}両", self.tanks.len());
            info!("  障害物: {}個", self.world.obstacles().len());
            info!("  補給地点: {}個", self.scenario_config.arena.supply_points.len());
        }

        Ok(())
    }

    /// プレイヤー戦車への入力
    pub fn set_player_input(&mut self, tank_id: &str, input: PlayerInput) {
        match self.tanks.iter_mut().find(|tank| tank.id == tank_id && tank.player) {
            Some(tank) => tank.set_input(input),
            None => warn!(tank_id = %tank_id, "プレイヤー戦車が見つかりません"),
        }
    }

    /// 勝敗が決したか（生存チームが1つ以下）
    pub fn is_battle_over(&self) -> bool {
        self.world.surviving_teams().len() <= 1
    }

    pub fn run(&mut self) -> Result<SimulationSummary, Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        while self.current_time < self.max_time {
            self.step();

            if self.verbose_level > 2 {
                trace!("時刻: {:.2}秒 (ステップ: {})", self.current_time, self.step_count);
            }

            if self.step_count % 500 == 0 && self.verbose_level > 0 {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!("進行状況: {:.1}% ({:.1}/{:.1}秒)", progress, self.current_time, self.max_time);
            }

            if self.is_battle_over() {
                info!(time = self.current_time, "BATTLE_OVER: 勝敗が決しました");
                break;
            }

            if self.step_count >= MAX_STEPS {
                warn!("ステップ上限に達したため終了します");
                break;
            }
        }

        let summary = self.summary();
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.1}秒", summary.elapsed);
        info!("総ステップ数: {}", summary.steps);
        info!(
            "発射: {}発 (フォールバック: {}発) / 命中: {}発 / 撃破: {}両",
            summary.stats.shots_fired,
            summary.stats.fallback_shots,
            summary.stats.hits,
            summary.stats.destroyed.len()
        );
        for tank in &summary.tanks {
            info!(
                tank_id = %tank.id,
                team = %tank.team,
                status = ?tank.status,
                shots = tank.shots.total_shots,
                fallback_shots = tank.shots.fallback_shots,
                ammo = tank.shots.ammo_remaining,
                sightings = tank.detections.enter_events,
                "TANK_SUMMARY"
            );
        }
        match &summary.winner {
            Some(team) => info!("勝者: {}", team),
            None => info!("勝者なし"),
        }

        Ok(summary)
    }

    pub fn summary(&self) -> SimulationSummary {
        let surviving = self.world.surviving_teams();
        let winner = if surviving.len() == 1 {
            surviving.into_iter().next()
        } else {
            None
        };
        SimulationSummary {
            elapsed: self.current_time,
            steps: self.step_count,
            winner,
            stats: self.stats.clone(),
            tanks: self
                .tanks
                .iter()
                .zip(&self.sensors)
                .map(|(tank, sensor)| TankSummary {
                    id: tank.id.clone(),
                    team: tank.team.clone(),
                    status: tank.status,
                    shots: tank.fire_control().get_shot_stats(),
                    detections: sensor.get_detection_stats(),
                })
                .collect(),
        }
    }

    pub fn step(&mut self) {
        self.process_vision();
        self.process_tanks();
        self.process_shells();
        self.process_supply();

        self.current_time += self.dt;
        self.step_count += 1;
    }

    fn process_vision(&mut self) {
        for (tank, sensor) in self.tanks.iter_mut().zip(self.sensors.iter_mut()) {
            if !tank.is_active() {
                continue;
            }
            let Some(pose) = self.world.pose(&tank.id) else {
                continue;
            };

            let opponents = self.world.opponents_of(&tank.id);
            for event in sensor.scan(self.current_time, pose.position, &opponents) {
                match event.event_type {
                    DetectionEventType::Enter => tank.on_target_enter(&event.candidate_id, &self.world),
                    DetectionEventType::Stay => tank.on_target_stay(&event.candidate_id, &self.world),
                    DetectionEventType::Exit => tank.on_target_exit(&event.candidate_id, &self.world),
                }
            }
        }
    }

    fn process_tanks(&mut self) {
        for tank in &mut self.tanks {
            let report = tank.tick(&mut self.world, self.dt);

            if report.target_lost.is_some() {
                self.stats.targets_lost += 1;
            }
            if let Some(FireOutcome::Fired { solution, .. }) = &report.fire {
                self.stats.shots_fired += 1;
                if solution.used_fallback {
                    self.stats.fallback_shots += 1;
                }
            }
        }
    }

    fn process_shells(&mut self) {
        for impact in self.world.step_shells(self.dt) {
            let Some(victim) = impact.victim else {
                self.stats.misses += 1;
                continue;
            };
            self.stats.hits += 1;
            if !impact.destroyed {
                continue;
            }

            if let Some(tank) = self.tanks.iter_mut().find(|tank| tank.id == victim) {
                tank.mark_destroyed();
            }
            info!(
                victim = %victim,
                shooter = %impact.owner,
                time = self.current_time,
                "TANK_DESTROYED: 戦車が撃破されました"
            );
            self.stats.destroyed.push((victim, self.current_time));
        }
    }

    fn process_supply(&mut self) {
        let supply_points = &self.scenario_config.arena.supply_points;
        if supply_points.is_empty() {
            return;
        }

        for tank in &mut self.tanks {
            if !tank.is_active() || tank.fire_state() != FireState::Reloading {
                continue;
            }
            let Some(pose) = self.world.pose(&tank.id) else {
                continue;
            };
            let in_supply = supply_points
                .iter()
                .any(|supply| supply.center.to_ground().distance_xy(&pose.position) <= supply.radius_m);
            if in_supply {
                tank.refill_ammo();
                self.stats.refills += 1;
            }
        }
    }
}
