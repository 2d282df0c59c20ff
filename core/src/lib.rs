pub mod log;
pub mod task;
pub mod time;

pub use ::log::{debug, error, info, trace, warn};
