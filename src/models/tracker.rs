use tracing::{debug, info, warn};

use crate::models::{
    common::{AgentId, Vector3},
    errors::AgentError,
    traits::IPhysics,
};

/// 目標追跡器
///
/// 視界内の敵候補（IDのみを保持する弱参照）を管理し、最も近い候補を選択します。
/// 候補は出現順に保持され、同距離の場合は先に出現した候補が選ばれます。
#[derive(Debug, Clone)]
pub struct TargetTracker {
    /// 自分自身のID（自身の視界イベントは無視）
    pub owner_id: AgentId,
    /// 現在視界内の候補（重複なし・出現順）
    candidates: Vec<AgentId>,
    /// 直近の選択結果
    selected: Option<AgentId>,
    /// 最後に視界から外れた目標（近距離なら直接追う）
    fallback_seek: Option<AgentId>,
}

impl TargetTracker {
    pub fn new(owner_id: AgentId) -> Self {
        Self {
            owner_id,
            candidates: Vec::new(),
            selected: None,
            fallback_seek: None,
        }
    }

    /// 起動時のリセット
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.selected = None;
        self.fallback_seek = None;
    }

    pub fn candidates(&self) -> &[AgentId] {
        &self.candidates
    }

    pub fn contains(&self, id: &str) -> bool {
        self.candidates.iter().any(|candidate| candidate == id)
    }

    pub fn selected(&self) -> Option<&AgentId> {
        self.selected.as_ref()
    }

    pub fn fallback_seek(&self) -> Option<&AgentId> {
        self.fallback_seek.as_ref()
    }

    /// 候補が視界に入った
    ///
    /// 戻り値がtrueの場合、呼び出し側は保持中の目的地を破棄して選び直します。
    pub fn on_enter<P>(&mut self, candidate: &str, self_position: Vector3, physics: &P) -> bool
    where
        P: IPhysics + ?Sized,
    {
        if candidate == self.owner_id {
            return false;
        }

        if !self.contains(candidate) {
            self.candidates.push(candidate.to_string());
        }
        self.fallback_seek = None;

        info!(
            agent_id = %self.owner_id,
            candidate_id = %candidate,
            candidate_count = self.candidates.len(),
            "TARGET_ENTERED: 目標が視界に入りました"
        );

        self.select(self_position, physics);
        true
    }

    /// 候補が視界に留まっている（再選択のみ）
    pub fn on_stay<P>(&mut self, candidate: &str, self_position: Vector3, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        if candidate == self.owner_id {
            return;
        }
        self.select(self_position, physics);
    }

    /// 候補が視界から外れた
    pub fn on_exit<P>(&mut self, candidate: &str, self_position: Vector3, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        if candidate == self.owner_id {
            return;
        }

        let before = self.candidates.len();
        self.candidates.retain(|id| id != candidate);
        let removed = self.candidates.len() != before;

        if removed && self.candidates.is_empty() {
            self.fallback_seek = Some(candidate.to_string());
        }

        info!(
            agent_id = %self.owner_id,
            candidate_id = %candidate,
            candidate_count = self.candidates.len(),
            fallback_seek = ?self.fallback_seek,
            "TARGET_EXITED: 目標が視界から外れました"
        );

        self.select(self_position, physics);
    }

    /// 最も近い候補を選択
    ///
    /// 位置を解決できない（破棄済みの）候補は取り除きます。
    /// 同距離の場合は出現順で先の候補を優先します。
    pub fn select<P>(&mut self, self_position: Vector3, physics: &P) -> Option<&AgentId>
    where
        P: IPhysics + ?Sized,
    {
        self.prune_destroyed(physics);

        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.candidates.iter().enumerate() {
            let Some(pose) = physics.pose(candidate) else {
                continue;
            };
            let distance = self_position.distance(&pose.position);
            let is_better = match best {
                Some((_, best_distance)) => distance < best_distance,
                None => true,
            };
            if is_better {
                best = Some((index, distance));
            }
        }

        let next = best.map(|(index, _)| self.candidates[index].clone());
        if next != self.selected {
            debug!(
                agent_id = %self.owner_id,
                previous = ?self.selected,
                selected = ?next,
                "TARGET_SELECTED: 選択目標が変わりました"
            );
        }
        self.selected = next;
        self.selected.as_ref()
    }

    /// 選択中の目標がまだ存在するかを確認
    ///
    /// 消滅していた場合は候補から外して選び直し、`TargetLost` を返します。
    pub fn validate<P>(&mut self, self_position: Vector3, physics: &P) -> Result<(), AgentError>
    where
        P: IPhysics + ?Sized,
    {
        if let Some(fallback) = &self.fallback_seek {
            if physics.pose(fallback).is_none() {
                self.fallback_seek = None;
            }
        }

        let Some(selected) = self.selected.clone() else {
            return Ok(());
        };
        if physics.pose(&selected).is_some() {
            return Ok(());
        }

        self.select(self_position, physics);
        Err(AgentError::TargetLost { target_id: selected })
    }

    /// 選択中の目標とその位置
    pub fn resolve_selected<P>(&self, physics: &P) -> Option<(AgentId, Vector3)>
    where
        P: IPhysics + ?Sized,
    {
        let id = self.selected.as_ref()?;
        physics.pose(id).map(|pose| (id.clone(), pose.position))
    }

    fn prune_destroyed<P>(&mut self, physics: &P)
    where
        P: IPhysics + ?Sized,
    {
        let owner = &self.owner_id;
        self.candidates.retain(|candidate| {
            let alive = physics.pose(candidate).is_some();
            if !alive {
                warn!(
                    agent_id = %owner,
                    candidate_id = %candidate,
                    "TARGET_LOST: 目標が消滅したため候補から外しました"
                );
            }
            alive
        });
    }
}
