//! Opaque monotonic 64-bit ID generation.

use std::sync::Mutex;

use chrono::Utc;

/// Custom epoch: 2024-01-01T00:00:00Z, milliseconds.
const EPOCH_MS: i64 = 1_704_067_200_000;

const WORKER_BITS: u8 = 10;
const SEQUENCE_BITS: u8 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: u16 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake-style ID generator: 41 bits of milliseconds since the custom
/// epoch, 10 bits of worker id, 12 bits of per-millisecond sequence.
///
/// IDs are strictly increasing for a single generator, which is what the
/// outbox poll order (`ORDER BY id ASC`) relies on.
pub struct SnowflakeGenerator {
    worker_id: u16,
    state: Mutex<State>,
}

struct State {
    last_ms: i64,
    sequence: u16,
}

impl SnowflakeGenerator {
    /// `worker_id` is masked to 10 bits.
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: worker_id & MAX_WORKER_ID,
            state: Mutex::new(State {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    /// Returns the next ID. Spins into the next millisecond if the
    /// 4096-per-ms sequence overflows; steps forward monotonically if the
    /// wall clock ever runs backwards.
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let mut now = Utc::now().timestamp_millis() - EPOCH_MS;
        if now < state.last_ms {
            now = state.last_ms;
        }

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                now += 1;
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now;

        (now << (WORKER_BITS + SEQUENCE_BITS))
            | ((self.worker_id as i64) << SEQUENCE_BITS)
            | (state.sequence as i64)
    }
}
