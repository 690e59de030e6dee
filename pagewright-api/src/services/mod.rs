//! Service Layer
//!
//! The render, publish, invalidation and regeneration pipelines. Routes stay
//! thin: they parse a request, call one service and map its result.

mod assembler;
mod invalidation_service;
mod publish_service;
mod regeneration;
mod render_service;
pub mod shell;

pub use assembler::*;
pub use invalidation_service::*;
pub use publish_service::*;
pub use regeneration::*;
pub use render_service::*;
pub use shell::PageMeta;
