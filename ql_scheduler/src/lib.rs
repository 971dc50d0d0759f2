//! ABOUTME: Executors that turn due schedules and due authors into generated posts
//! ABOUTME: Claim-first processing, per-item isolation, activity events and a cron-driven loop

pub mod author_posts;
pub mod processor;
pub mod runner;
pub mod types;

pub use author_posts::*;
pub use processor::*;
pub use runner::*;
pub use types::*;
