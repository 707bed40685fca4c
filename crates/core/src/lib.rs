#![forbid(unsafe_code)]

pub mod config;
pub mod model;
pub mod progress;
pub mod range;
pub mod time;

pub use config::{ConfigError, EngineConfig};
pub use progress::{Contribution, MalformedRecordError, ScheduleProgressEngine};
pub use range::{LinearPosition, RangeError, RangeMode, RangeResolver, validate_range};
pub use time::Clock;
