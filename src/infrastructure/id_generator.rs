// ID Generator - Snowflake-style 64-bit record ids
// Layout: [timestamp_ms:42][node_id:10][sequence:12]
// Ids from one generator are strictly increasing, so ordering by id is creation order.

use std::sync::Mutex;

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};

pub const MAX_NODE_ID: u16 = 1023;
const SEQUENCE_MASK: u64 = 0xFFF;

#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    // (last timestamp, next sequence)
    state: Mutex<(u64, u64)>,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> AppResult<Self> {
        if node_id > MAX_NODE_ID {
            return Err(AppError::Configuration(format!(
                "Node id must be at most {}, got {}",
                MAX_NODE_ID, node_id
            )));
        }
        Ok(Self {
            node_id,
            state: Mutex::new((0, 0)),
        })
    }

    /// Generate the next unique id
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (last_ts, next_seq) = *state;

        let mut now = current_time_millis().max(0) as u64;
        // Never go backwards if the clock does
        if now < last_ts {
            now = last_ts;
        }

        let sequence = if now == last_ts {
            if next_seq > SEQUENCE_MASK {
                // 4096 ids this millisecond already; borrow the next one
                now = last_ts + 1;
                0
            } else {
                next_seq
            }
        } else {
            0
        };
        *state = (now, sequence + 1);

        let id = ((now & 0x3FF_FFFF_FFFF) << 22) | ((self.node_id as u64) << 12) | (sequence & SEQUENCE_MASK);
        id as i64
    }

    pub fn extract_node_id(id: i64) -> u16 {
        (((id as u64) >> 12) & 0x3FF) as u16
    }

    pub fn extract_timestamp(id: i64) -> u64 {
        (id as u64) >> 22
    }

    pub fn extract_sequence(id: i64) -> u16 {
        ((id as u64) & SEQUENCE_MASK) as u16
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let generator = IdGenerator::new(123).unwrap();
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(ids.iter().all(|id| IdGenerator::extract_node_id(*id) == 123));
    }

    #[test]
    fn sequence_restarts_on_new_millisecond() {
        let generator = IdGenerator::new(1).unwrap();
        let first = generator.next_id();
        std::thread::sleep(std::time::Duration::from_millis(3));
        let later = generator.next_id();

        assert!(IdGenerator::extract_timestamp(later) > IdGenerator::extract_timestamp(first));
        assert_eq!(IdGenerator::extract_sequence(later), 0);
    }

    #[test]
    fn node_id_out_of_range_is_rejected() {
        assert!(IdGenerator::new(1024).is_err());
        assert_eq!(IdGenerator::new(1023).unwrap().node_id(), 1023);
    }
}
