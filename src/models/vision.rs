use tracing::trace;

use crate::models::common::{AgentId, Vector3};

/// 視界センサー
///
/// 視界半径内の敵を毎ティック列挙し、前回との差分から
/// 進入・滞在・離脱の視界イベントを生成します。
#[derive(Debug, Clone)]
pub struct VisionSensor {
    /// 所有エージェントのID
    pub owner_id: AgentId,
    /// 視界半径（メートル、球形）
    pub radius: f64,
    /// 現在視界内のID（検知順）
    visible: Vec<AgentId>,
    enter_count: usize,
    exit_count: usize,
}

/// 検知イベント
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub timestamp: f64,
    pub candidate_id: AgentId,
    /// 離脱時に位置を解決できなかった場合はNone
    pub position: Option<Vector3>,
    pub distance: Option<f64>,
    pub event_type: DetectionEventType,
}

/// 検知イベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEventType {
    /// 視界に入った
    Enter,
    /// 視界内に留まっている
    Stay,
    /// 視界から外れた（消滅を含む）
    Exit,
}

/// 検知統計情報
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionStats {
    pub enter_events: usize,
    pub exit_events: usize,
    pub currently_visible: usize,
}

impl VisionSensor {
    pub fn new(owner_id: AgentId, radius: f64) -> Self {
        Self {
            owner_id,
            radius,
            visible: Vec::new(),
            enter_count: 0,
            exit_count: 0,
        }
    }

    /// 視界判定
    ///
    /// `candidates` は現存する敵の (ID, 位置) の一覧です。
    /// 一覧に無い、または半径外になった既知のIDは離脱として報告されます。
    pub fn scan(&mut self, now: f64, self_position: Vector3, candidates: &[(AgentId, Vector3)]) -> Vec<DetectionEvent> {
        let mut events = Vec::new();
        let mut currently_visible = Vec::new();

        for (id, position) in candidates {
            if *id == self.owner_id {
                continue;
            }
            let distance = self_position.distance(position);
            if distance > self.radius {
                continue;
            }

            let event_type = if self.visible.contains(id) {
                DetectionEventType::Stay
            } else {
                DetectionEventType::Enter
            };
            currently_visible.push(id.clone());
            events.push(DetectionEvent {
                timestamp: now,
                candidate_id: id.clone(),
                position: Some(*position),
                distance: Some(distance),
                event_type,
            });
        }

        for id in &self.visible {
            if currently_visible.contains(id) {
                continue;
            }
            let position = candidates
                .iter()
                .find(|(candidate, _)| candidate == id)
                .map(|(_, position)| *position);
            events.push(DetectionEvent {
                timestamp: now,
                candidate_id: id.clone(),
                position,
                distance: position.map(|p| self_position.distance(&p)),
                event_type: DetectionEventType::Exit,
            });
        }

        self.visible = currently_visible;
        self.record(&events);
        events
    }

    /// 進入・離脱だけを数える（滞在は毎ティック発生するため対象外）
    fn record(&mut self, events: &[DetectionEvent]) {
        for event in events {
            match event.event_type {
                DetectionEventType::Enter => self.enter_count += 1,
                DetectionEventType::Exit => self.exit_count += 1,
                DetectionEventType::Stay => continue,
            }
            trace!(
                owner_id = %self.owner_id,
                candidate_id = %event.candidate_id,
                event_type = ?event.event_type,
                "VISION_EVENT"
            );
        }
    }

    pub fn visible(&self) -> &[AgentId] {
        &self.visible
    }

    pub fn get_detection_stats(&self) -> DetectionStats {
        DetectionStats {
            enter_events: self.enter_count,
            exit_events: self.exit_count,
            currently_visible: self.visible.len(),
        }
    }
}
