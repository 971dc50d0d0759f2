//! ABOUTME: Schedule arithmetic: frequencies, next-run calculation and occurrence projection
//! ABOUTME: Pure, synchronous building blocks used by the executor and the calendar

pub mod calendar;
pub mod frequency;
pub mod interval;
pub mod models;
pub mod projector;
pub mod stats;

pub use calendar::*;
pub use frequency::*;
pub use interval::*;
pub use models::*;
pub use projector::*;
pub use stats::*;
