//! Schema id allocation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{Result, SchemaError};

/// Produces globally unique schema ids. Uniqueness is the only contract.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Process-local counter starting at 1
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    last: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// 2020-09-13T12:26:40Z
const EPOCH_MS: u64 = 1_600_000_000_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake layout: 41-bit millisecond timestamp, 10-bit node, 12-bit sequence.
///
/// Instances with distinct node ids never collide. The clock never runs
/// backwards from the generator's point of view: a regression, or an
/// exhausted sequence, borrows the next millisecond instead of waiting.
#[derive(Debug)]
pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: Mutex<SnowflakeState>,
}

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: u64,
    sequence: u64,
}

impl SnowflakeIdGenerator {
    pub fn new(node_id: u16) -> Result<Self> {
        if node_id > MAX_NODE_ID {
            return Err(SchemaError::InvalidFormat(format!(
                "node id {} exceeds {}",
                node_id, MAX_NODE_ID
            )));
        }
        Ok(Self {
            node_id: u64::from(node_id),
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    fn now_ms() -> u64 {
        since_epoch(Utc::now().timestamp_millis())
    }
}

/// Milliseconds past `EPOCH_MS`, zero for any earlier clock reading
fn since_epoch(unix_ms: i64) -> u64 {
    (unix_ms.max(0) as u64).saturating_sub(EPOCH_MS)
}

impl IdGenerator for SnowflakeIdGenerator {
    fn next_id(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Self::now_ms();
        if now > state.last_ms {
            state.last_ms = now;
            state.sequence = 0;
        } else {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.last_ms += 1;
            }
        }

        (state.last_ms << (NODE_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | state.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequential_starts_at_one() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_clock_before_epoch_clamps_to_zero() {
        assert_eq!(since_epoch(-5_000), 0);
        assert_eq!(since_epoch(0), 0);
        assert_eq!(since_epoch(EPOCH_MS as i64 - 1), 0);
        assert_eq!(since_epoch(EPOCH_MS as i64 + 42), 42);
    }

    #[test]
    fn test_snowflake_rejects_wide_node_id() {
        assert!(SnowflakeIdGenerator::new(MAX_NODE_ID).is_ok());
        assert!(SnowflakeIdGenerator::new(MAX_NODE_ID + 1).is_err());
    }

    #[test]
    fn test_snowflake_unique_under_contention() {
        let ids = Arc::new(SnowflakeIdGenerator::new(7).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..10_000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 40_000);
    }

    #[test]
    fn test_snowflake_nodes_do_not_collide() {
        let a = SnowflakeIdGenerator::new(1).unwrap();
        let b = SnowflakeIdGenerator::new(2).unwrap();
        let from_a: HashSet<_> = (0..1_000).map(|_| a.next_id()).collect();
        assert!((0..1_000).map(|_| b.next_id()).all(|id| !from_a.contains(&id)));
    }

    #[test]
    fn test_snowflake_ids_increase() {
        let ids = SnowflakeIdGenerator::new(0).unwrap();
        let first = ids.next_id();
        let second = ids.next_id();
        assert!(second > first);
    }
}
