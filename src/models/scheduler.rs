//! 期限（デッドライン）ベースの遅延キュー
//!
//! 回避行動の終了、経路の定期再計算、射撃クールダウンなどのタイマーを
//! スレッドやコルーチンではなく「期限」として保持し、ティックごとに1回ポーリングします。
//! 同じ種類を再スケジュールすると既存の期限は置き換えられ、
//! キャンセルは明示的なキュー削除で行います。

/// 期限判定の許容誤差（dtの累積による丸め誤差対策）
pub const DEADLINE_EPSILON: f64 = 1e-9;

/// エージェントが使用するタイマーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 徘徊目的地への経路再計算
    PathRecompute,
    /// 障害物回避（後退）の終了
    EvadeEnd,
    /// 射撃クールダウンの終了
    Cooldown,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEntry<K> {
    kind: K,
    due: f64,
}

/// 種類ごとに高々1つの期限を持つ遅延キュー
#[derive(Debug, Clone)]
pub struct DelayQueue<K> {
    entries: Vec<ScheduledEntry<K>>,
}

impl<K: Copy + PartialEq> Default for DelayQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + PartialEq> DelayQueue<K> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// 期限を登録（同種の既存エントリは置き換え）
    pub fn schedule(&mut self, kind: K, due: f64) {
        self.cancel(kind);
        self.entries.push(ScheduledEntry { kind, due });
    }

    /// 期限をキャンセル（登録されていた場合はtrue）
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.kind != kind);
        self.entries.len() != before
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn due_of(&self, kind: K) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.due)
    }

    /// 期限切れのエントリを取り出す（期限の早い順）
    pub fn poll(&mut self, now: f64) -> Vec<K> {
        let mut expired: Vec<ScheduledEntry<K>> = self
            .entries
            .iter()
            .copied()
            .filter(|entry| entry.due <= now + DEADLINE_EPSILON)
            .collect();
        self.entries
            .retain(|entry| entry.due > now + DEADLINE_EPSILON);

        expired.sort_by(|a, b| a.due.partial_cmp(&b.due).unwrap_or(std::cmp::Ordering::Equal));
        expired.into_iter().map(|entry| entry.kind).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
