use admin_query::facets::{
    self, decode_filters, encode, parse_query_string, removal_redirect, to_query_string,
};
use admin_query::{
    CompareOperator, Error, FacetEncoding, FieldDecl, FieldType, FilterSet, QueryFilter,
    SchemaDecl, SchemaDescriptor, SchemaRegistry,
};

fn registry() -> SchemaRegistry {
    SchemaRegistry::build(vec![SchemaDecl::new("Event", "event")
        .field(FieldDecl::new("id", FieldType::Integer).primary_key())
        .field(FieldDecl::new("title", FieldType::String))
        .field(FieldDecl::new("starts_at", FieldType::DateTime))
        .field(FieldDecl::new("seats", FieldType::Integer))])
    .unwrap()
}

fn schema(reg: &SchemaRegistry) -> &SchemaDescriptor {
    reg.find_by_class_name("Event").unwrap()
}

fn sample() -> FilterSet {
    [
        QueryFilter::new("title", CompareOperator::Contains, "rust & co"),
        QueryFilter::new("starts_at", CompareOperator::GreaterThan, "2024-01-01 10:00"),
        QueryFilter::new("seats", CompareOperator::LessThan, "100"),
        QueryFilter::new("seats", CompareOperator::GreaterThan, "10"),
    ]
    .into_iter()
    .collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn encode_decode_encode_is_stable_for_both_encodings() {
    let reg = registry();
    let s = schema(&reg);
    for encoding in [FacetEncoding::Composite, FacetEncoding::Positional] {
        let first = encode(&sample(), encoding);
        let through_url = parse_query_string(&to_query_string(&first));
        let decoded = decode_filters(s, &through_url).unwrap();
        assert_eq!(decoded, sample(), "{encoding:?}");
        assert_eq!(encode(&decoded, encoding), first, "{encoding:?}");
    }
}

#[test]
fn composite_value_may_contain_colons() {
    let reg = registry();
    let params = pairs(&[("filter", "starts_at:lt:2024-05-01 12:30:00")]);
    let set = decode_filters(schema(&reg), &params).unwrap();
    let f = set.iter().next().unwrap();
    assert_eq!(f.value, "2024-05-01 12:30:00");
    assert_eq!(f.op, CompareOperator::LessThan);
}

#[test]
fn both_encodings_merge_on_decode() {
    let reg = registry();
    let params = pairs(&[
        ("filter_field", "seats"),
        ("filter_op", "GT"),
        ("filter_value", "10"),
        ("filter", "Title:contains:rust"),
    ]);
    let set = decode_filters(schema(&reg), &params).unwrap();
    assert_eq!(set.len(), 2);
    // field names take the declared spelling
    assert!(set.contains(&QueryFilter::new("title", CompareOperator::Contains, "rust")));
}

#[test]
fn misaligned_positional_lists_are_rejected() {
    let reg = registry();
    let params = pairs(&[
        ("filter_field", "seats"),
        ("filter_field", "title"),
        ("filter_op", "gt"),
        ("filter_value", "10"),
    ]);
    assert!(matches!(
        decode_filters(schema(&reg), &params),
        Err(Error::MalformedFacets(_))
    ));
}

#[test]
fn unknown_field_and_operator_surface_as_errors() {
    let reg = registry();
    let s = schema(&reg);
    assert!(decode_filters(s, &pairs(&[("filter", "venue:eq:x")]))
        .unwrap_err()
        .is_not_found());
    assert_eq!(
        decode_filters(s, &pairs(&[("filter", "seats:between:1")])).unwrap_err(),
        Error::UnknownOperator("between".into())
    );
    assert!(matches!(
        decode_filters(s, &pairs(&[("filter", "seats")])),
        Err(Error::MalformedFacets(_))
    ));
}

#[test]
fn removal_yields_remaining_set_and_keeps_unrelated_params() {
    let reg = registry();
    let s = schema(&reg);
    let mut params = pairs(&[("query", "meetup"), ("tag", "a"), ("tag", "b"), ("page", "3")]);
    params.extend(encode(&sample(), FacetEncoding::Positional));
    params.extend(pairs(&[
        ("remove_field", "seats"),
        ("remove_op", "lt"),
        ("remove_value", "100"),
    ]));

    let qs = removal_redirect(s, &params, FacetEncoding::Composite)
        .unwrap()
        .expect("removal requested");
    let back = parse_query_string(&qs);

    let unrelated: Vec<_> = back
        .iter()
        .filter(|(k, _)| !facets::is_reserved(k))
        .cloned()
        .collect();
    assert_eq!(
        unrelated,
        pairs(&[("query", "meetup"), ("tag", "a"), ("tag", "b"), ("page", "3")])
    );

    let mut expected = sample();
    expected.remove(&QueryFilter::new("seats", CompareOperator::LessThan, "100"));
    assert_eq!(decode_filters(s, &back).unwrap(), expected);
    assert!(!facets::has_removals(&back));
    assert!(back.iter().all(|(k, _)| !k.starts_with("filter_")));
}

#[test]
fn removing_the_last_filter_with_nothing_else_gives_empty_query() {
    let reg = registry();
    let params = pairs(&[
        ("filter", "seats:gt:10"),
        ("remove", "seats:gt:10"),
    ]);
    let qs = removal_redirect(schema(&reg), &params, FacetEncoding::Composite).unwrap();
    assert_eq!(qs.as_deref(), Some(""));
}

#[test]
fn no_removal_params_means_no_redirect() {
    let reg = registry();
    let params = pairs(&[("filter", "seats:gt:10"), ("page", "1")]);
    assert_eq!(
        removal_redirect(schema(&reg), &params, FacetEncoding::Composite).unwrap(),
        None
    );
}

#[test]
fn query_string_escapes_reserved_characters() {
    let qs = to_query_string(&pairs(&[("filter", "title:contains:a&b=c")]));
    assert_eq!(qs, "?filter=title%3Acontains%3Aa%26b%3Dc");
    assert_eq!(to_query_string(&[]), "");
}
