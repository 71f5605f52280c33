//! Unique token ID generation.
//!
//! Token IDs are 64-bit snowflake-style values, ordered by generation time
//! and unique across concurrent issuers without coordination:
//!
//! ```text
//! 63 62                    22 21        12 11         0
//! +--+-----------------------+------------+------------+
//! | 0| timestamp (41 bits)   | worker(10) | seq (12)   |
//! +--+-----------------------+------------+------------+
//! ```
//!
//! The timestamp counts milliseconds since a custom epoch, the worker ID
//! distinguishes issuing processes, and the sequence disambiguates IDs
//! minted within the same millisecond. The sign bit stays clear, so IDs are
//! always positive `i64` values.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tessera_storage::TokenId;

use crate::error::{AuthError, Result};

/// Custom epoch for the timestamp field: 2019-01-01T00:00:00Z.
const CUSTOM_EPOCH_MS: i64 = 1_546_300_800_000;

const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;

/// Largest worker ID that fits the 10-bit worker field (1023).
pub const MAX_WORKER_ID: u16 = (1 << WORKER_ID_BITS) - 1;

const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

/// Mutable generator state, guarded by a single mutex.
struct GeneratorState {
    last_timestamp_ms: i64,
    sequence: i64,
}

/// Generator for unique, time-ordered token IDs.
///
/// Two generators with the same worker ID can produce colliding IDs;
/// deployments must assign each issuing process a distinct worker ID.
///
/// The generator never reads the wall clock itself. Callers pass the
/// current time in, which keeps ID generation deterministic under test.
/// If the supplied time moves backwards, the generator keeps counting
/// from the latest timestamp it has seen rather than repeating values.
pub struct TokenIdGenerator {
    worker_id: i64,
    state: Mutex<GeneratorState>,
}

impl TokenIdGenerator {
    /// Creates a generator for the given worker ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if `worker_id` exceeds [`MAX_WORKER_ID`].
    pub fn new(worker_id: u16) -> Result<Self> {
        if worker_id > MAX_WORKER_ID {
            return Err(AuthError::config(format!(
                "worker_id {worker_id} exceeds maximum {MAX_WORKER_ID}"
            )));
        }

        Ok(Self {
            worker_id: i64::from(worker_id),
            state: Mutex::new(GeneratorState { last_timestamp_ms: 0, sequence: 0 }),
        })
    }

    /// Mints the next token ID.
    ///
    /// IDs from one generator are strictly increasing. When more than 4096
    /// IDs are requested within one millisecond, the generator borrows from
    /// the next millisecond rather than blocking.
    #[must_use]
    pub fn next_id(&self, now: DateTime<Utc>) -> TokenId {
        let now_ms = now.timestamp_millis() - CUSTOM_EPOCH_MS;

        let mut state = self.state.lock();
        let mut timestamp = now_ms.max(state.last_timestamp_ms);

        if timestamp == state.last_timestamp_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp_ms = timestamp;

        let id = (timestamp << (WORKER_ID_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence;
        TokenId::from(id)
    }
}
