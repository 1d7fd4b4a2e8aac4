//! Shared time types used across the store, the engine, and the API.

mod clock_time;
mod days_of_week;
mod prep_time;
mod timestamp;

pub use clock_time::{ClockTime, schedule_days};
pub use days_of_week::DaysOfWeek;
pub use prep_time::PrepTime;
pub use timestamp::Timestamp;
