use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::facets::{self, Params};
use crate::filter::FilterSet;
use crate::predicate::SortSpec;
use crate::schema::SchemaDescriptor;

pub const QUERY: &str = "query";
pub const PAGE: &str = "page";
pub const PAGE_SIZE: &str = "pageSize";
pub const SORT_KEY: &str = "sortKey";
pub const SORT_ORDER: &str = "sortOrder";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListDefaults {
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

fn default_page_size() -> u64 {
    50
}

fn default_max_page_size() -> u64 {
    1000
}

impl Default for ListDefaults {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Decoded list/search request surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListParams {
    pub query: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub sort: SortSpec,
    pub filters: FilterSet,
}

impl ListParams {
    pub fn from_pairs(
        schema: &SchemaDescriptor,
        pairs: &Params,
        defaults: ListDefaults,
    ) -> Result<Self> {
        let query = last(pairs, QUERY)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let page = match last(pairs, PAGE) {
            Some(raw) => parse_u64(PAGE, raw)?,
            None => 1,
        };

        let page_size = match last(pairs, PAGE_SIZE) {
            Some(raw) => parse_u64(PAGE_SIZE, raw)?,
            None => defaults.page_size,
        };
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }
        let page_size = page_size.min(defaults.max_page_size.max(1));

        let sort = SortSpec::resolve(schema, last(pairs, SORT_KEY), last(pairs, SORT_ORDER))?;
        let filters = facets::decode_filters(schema, pairs)?;

        Ok(Self {
            query,
            page,
            page_size,
            sort,
            filters,
        })
    }
}

fn last<'a>(pairs: &'a Params, key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid_param(name, raw))
}
