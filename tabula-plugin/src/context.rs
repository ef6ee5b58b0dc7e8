//! Evaluation Context

use crate::PluginRegistry;
use std::sync::Arc;

/// Default significant digits used when rendering results as text
pub const DEFAULT_PRECISION: u32 = 15;

/// Evaluation context passed to plugins
#[derive(Clone)]
pub struct EvalContext {
    /// Significant digits for text rendering; numeric results are never rounded
    pub precision: u32,
    pub registry: Arc<PluginRegistry>,
}

impl EvalContext {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            registry,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.clamp(1, 17);
        self
    }
}
