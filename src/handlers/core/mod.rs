//! Handler infrastructure: context, trait and registry.

pub mod context;
pub mod registry;

pub use context::{Context, Handler, Outcome, Timing};
pub use registry::Registry;
