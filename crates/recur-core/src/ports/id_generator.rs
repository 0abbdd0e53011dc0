//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻を timestamp 部分に使う ULID

use ulid::Ulid;

use crate::domain::{OccurrenceId, TemplateId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn template_id(&self) -> TemplateId;

    fn occurrence_id(&self) -> OccurrenceId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn template_id(&self) -> TemplateId {
        TemplateId::from(self.next_ulid())
    }

    fn occurrence_id(&self) -> OccurrenceId {
        OccurrenceId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);
        let a = id_gen.occurrence_id();
        let b = id_gen.occurrence_id();
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_clock_pins_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.template_id();
        let id2 = id_gen.template_id();
        assert_ne!(id1, id2);

        // ランダム部分は異なるが timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }
}
