//! Server configuration from the environment

use tabula_plugin::DEFAULT_PRECISION;

/// Environment variable holding the significant digits for text output
pub const PRECISION_VAR: &str = "TABULA_PRECISION";

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Significant digits used when rendering numbers as text (1 to 17)
    pub precision: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unusable values fall back to the default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(PRECISION_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(p) if (1..=17).contains(&p) => config.precision = p,
                _ => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_PRECISION,
                    "{} must be an integer from 1 to 17, using default",
                    PRECISION_VAR
                ),
            }
        }
        config
    }
}
