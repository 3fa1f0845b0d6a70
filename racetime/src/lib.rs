//! Live timing core for endurance-race events: practice and race clocks, driver stint
//! rotation, fuel tracking, and catch-up reconciliation after downtime.

pub mod core;
pub mod interfaces;
pub mod post;
pub mod pre;
