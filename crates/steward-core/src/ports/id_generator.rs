//! IdGenerator port - 監査イベント ID の生成
//!
//! タスク ID はストアが採番する（`TaskStore::generate_id`）。
//! ここで扱うのは executor 側で生成するイベント ID だけ。

use crate::domain::ids::EventId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散環境で衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数 worker から使える）
pub trait IdGenerator: Send + Sync {
    fn generate_event_id(&self) -> EventId;
}

/// ULID ベースの ID 生成器。
///
/// Clock を使って timestamp 部分を決めるので、FixedClock を渡すと
/// timestamp が固定された ID を生成できる。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_event_id(&self) -> EventId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        EventId::from(ulid)
    }
}
