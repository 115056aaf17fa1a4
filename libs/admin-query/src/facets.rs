//! Faceted search codec: filter sets ↔ URL query parameters.
//!
//! Two encodings are understood on input at all times:
//!
//! * composite, one self-contained `filter=<field>:<op>:<value>` per filter;
//! * positional, repeated `filter_field` / `filter_op` / `filter_value` keys
//!   where the i-th entry of each list forms one filter. Reordering one list
//!   on its own silently re-pairs the triples, so this form is only produced
//!   when configured for old bookmarks.
//!
//! Removal requests use the same shapes under `remove` / `remove_*`.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::filter::{FilterSet, QueryFilter};
use crate::schema::SchemaDescriptor;

pub const FILTER: &str = "filter";
pub const FILTER_FIELD: &str = "filter_field";
pub const FILTER_OP: &str = "filter_op";
pub const FILTER_VALUE: &str = "filter_value";

pub const REMOVE: &str = "remove";
pub const REMOVE_FIELD: &str = "remove_field";
pub const REMOVE_OP: &str = "remove_op";
pub const REMOVE_VALUE: &str = "remove_value";

const FILTER_PREFIX: &str = "filter_";
const REMOVE_PREFIX: &str = "remove_";

/// Query parameters as ordered, repeatable key/value pairs.
pub type Params = [(String, String)];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetEncoding {
    #[default]
    Composite,
    Positional,
}

/// Encode in canonical filter order.
pub fn encode(filters: &FilterSet, encoding: FacetEncoding) -> Vec<(String, String)> {
    match encoding {
        FacetEncoding::Composite => filters
            .iter()
            .map(|f| (FILTER.to_string(), f.to_string()))
            .collect(),
        FacetEncoding::Positional => filters
            .iter()
            .flat_map(|f| {
                [
                    (FILTER_FIELD.to_string(), f.field.clone()),
                    (FILTER_OP.to_string(), f.op.token().to_string()),
                    (FILTER_VALUE.to_string(), f.value.clone()),
                ]
            })
            .collect(),
    }
}

pub fn decode_filters(schema: &SchemaDescriptor, params: &Params) -> Result<FilterSet> {
    decode(schema, params, FILTER, [FILTER_FIELD, FILTER_OP, FILTER_VALUE])
}

pub fn decode_removals(schema: &SchemaDescriptor, params: &Params) -> Result<FilterSet> {
    decode(schema, params, REMOVE, [REMOVE_FIELD, REMOVE_OP, REMOVE_VALUE])
}

pub fn has_removals(params: &Params) -> bool {
    params
        .iter()
        .any(|(k, _)| k == REMOVE || k.starts_with(REMOVE_PREFIX))
}

/// Keys owned by the codec; stripped when a URL is regenerated.
pub fn is_reserved(key: &str) -> bool {
    key == FILTER
        || key == REMOVE
        || key.starts_with(FILTER_PREFIX)
        || key.starts_with(REMOVE_PREFIX)
}

/// Apply the removal parameters of a request and return the query string to
/// redirect to, or `None` when the request asks for no removal.
///
/// Unrelated parameters keep every value and their original order; the
/// remaining filters are appended after them.
pub fn removal_redirect(
    schema: &SchemaDescriptor,
    params: &Params,
    encoding: FacetEncoding,
) -> Result<Option<String>> {
    if !has_removals(params) {
        return Ok(None);
    }

    let mut working = decode_filters(schema, params)?;
    for removal in decode_removals(schema, params)? {
        if !working.remove(&removal) {
            tracing::debug!(filter = %removal, "removal target not in working set");
        }
    }

    let mut out: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .cloned()
        .collect();
    out.extend(encode(&working, encoding));
    Ok(Some(to_query_string(&out)))
}

/// `?k=v&...`, form-urlencoded; empty when there are no pairs.
pub fn to_query_string(pairs: &Params) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("?{encoded}")
}

/// Inverse of [`to_query_string`]; a leading `?` is optional.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn decode(
    schema: &SchemaDescriptor,
    params: &Params,
    composite_key: &str,
    [field_key, op_key, value_key]: [&str; 3],
) -> Result<FilterSet> {
    let mut set = FilterSet::new();
    let mut fields = Vec::new();
    let mut ops = Vec::new();
    let mut values = Vec::new();

    for (k, v) in params {
        if k == composite_key {
            set.insert(parse_composite(schema, v)?);
        } else if k == field_key {
            fields.push(v.as_str());
        } else if k == op_key {
            ops.push(v.as_str());
        } else if k == value_key {
            values.push(v.as_str());
        }
    }

    if fields.len() != ops.len() || fields.len() != values.len() {
        return Err(Error::MalformedFacets(format!(
            "{field_key}/{op_key}/{value_key} counts differ: {}/{}/{}",
            fields.len(),
            ops.len(),
            values.len()
        )));
    }
    for ((field, op), value) in fields.into_iter().zip(ops).zip(values) {
        set.insert(QueryFilter::for_schema(schema, field, op, value)?);
    }
    Ok(set)
}

fn parse_composite(schema: &SchemaDescriptor, raw: &str) -> Result<QueryFilter> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(op), Some(value)) if !field.is_empty() => {
            QueryFilter::for_schema(schema, field, op, value)
        }
        _ => Err(Error::MalformedFacets(format!(
            "expected <field>:<op>:<value>, got '{raw}'"
        ))),
    }
}
