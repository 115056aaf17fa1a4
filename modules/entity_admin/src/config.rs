use admin_query::{FacetEncoding, ListDefaults};
use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the entity_admin module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Encoding used when filters are written back into a URL.
    #[serde(default)]
    pub facet_encoding: FacetEncoding,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            facet_encoding: FacetEncoding::default(),
        }
    }
}

fn default_page_size() -> u64 {
    50
}

fn default_max_page_size() -> u64 {
    1000
}

impl AdminConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            list: ListDefaults {
                page_size: self.default_page_size,
                max_page_size: self.max_page_size,
            },
            facet_encoding: self.facet_encoding,
        }
    }
}
