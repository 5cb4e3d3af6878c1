//! Configuration for rendered annotation blocks

use serde::Deserialize;
use std::env;

/// Presentation settings consumed by the template renderer
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// URI scheme for the navigation link emitted into block headers
    pub link_scheme: String,
    /// Blockquote prefix for the first quote line (nests it under the header)
    pub lead_quote_prefix: String,
    /// Blockquote prefix for remaining quote and comment lines
    pub quote_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            link_scheme: "marginalia".to_string(),
            lead_quote_prefix: "> > ".to_string(),
            quote_prefix: "> ".to_string(),
        }
    }
}

impl RenderConfig {
    /// Build a config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = RenderConfig::default();
        RenderConfig {
            link_scheme: env::var("MARGINALIA_LINK_SCHEME").unwrap_or(defaults.link_scheme),
            lead_quote_prefix: env::var("MARGINALIA_LEAD_QUOTE_PREFIX")
                .unwrap_or(defaults.lead_quote_prefix),
            quote_prefix: env::var("MARGINALIA_QUOTE_PREFIX").unwrap_or(defaults.quote_prefix),
        }
    }
}
