//! The two evolution disciplines (spec.md §4): [`StaticEngine`] for
//! synchronous double-buffered updates under a configurable [`Rule`],
//! and [`OrderedEngine`] for strict row-major Conway updates with
//! incrementally-maintained neighbour counts.
//!
//! [`Rule`]: crate::domain::rule::Rule

mod ordered_engine;
mod static_engine;

pub use ordered_engine::OrderedEngine;
pub use static_engine::StaticEngine;
