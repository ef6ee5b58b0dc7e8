//! Tabula Plugin System
//!
//! Every public statistical operation is a [`FunctionPlugin`]: a pure
//! function over [`Value`](tabula_core::Value) arguments with metadata used
//! for help and discovery.

mod context;
mod registry;
mod traits;

pub use context::{EvalContext, DEFAULT_PRECISION};
pub use registry::PluginRegistry;
pub use traits::{ArgMeta, FunctionMeta, FunctionPlugin};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{ArgMeta, EvalContext, FunctionMeta, FunctionPlugin, PluginRegistry};
    pub use tabula_core::prelude::*;
}
