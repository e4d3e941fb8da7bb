// Core types and primitives shared by every layer

pub mod strong_types;

pub use strong_types::{ItemId, PageId, UserId, ViewId};

/// Wall-clock time in milliseconds since the Unix epoch
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
