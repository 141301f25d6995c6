//! Background Tasks Module
//!
//! Houses the expiry reaper, the cache's only autonomously scheduled
//! activity.

mod reaper;

pub use reaper::{spawn_reaper, sweep_period, MIN_SWEEP_PERIOD};
