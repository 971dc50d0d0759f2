//! ABOUTME: Generation context: a read-only description of what to generate and how
//! ABOUTME: Template and author-topic variants share one trait consumed by the generators

pub mod context;
pub mod expansion;
pub mod factory;
pub mod records;
pub mod store;
pub mod template_context;
pub mod topic_context;

pub use context::*;
pub use expansion::*;
pub use factory::*;
pub use records::*;
pub use store::*;
pub use template_context::*;
pub use topic_context::*;
