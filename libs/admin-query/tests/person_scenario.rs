//! Predicate behaviour over an in-memory table.

use admin_query::{
    build_predicate, page_count, validate_page, CompareOperator, Error, FieldDecl, FieldType,
    FilterSet, QueryFilter, Record, SchemaDecl, SchemaRegistry,
};

fn registry() -> SchemaRegistry {
    SchemaRegistry::build(vec![
        SchemaDecl::new("Person", "person")
            .field(FieldDecl::new("id", FieldType::Integer).primary_key())
            .field(FieldDecl::new("name", FieldType::String))
            .field(FieldDecl::new("age", FieldType::Integer)),
        SchemaDecl::new("Reading", "reading")
            .field(FieldDecl::new("id", FieldType::Integer).primary_key())
            .field(FieldDecl::new("value", FieldType::Decimal)),
    ])
    .unwrap()
}

fn people() -> Vec<Record> {
    vec![
        Record::new().with("id", 1).with("name", "Alice").with("age", 30),
        Record::new().with("id", 2).with("name", "Bob").with("age", 25),
        Record::new().with("id", 3).with("name", "alice b").with("age", 40),
    ]
}

fn ids(
    reg: &SchemaRegistry,
    class: &str,
    rows: &[Record],
    text: Option<&str>,
    filters: &FilterSet,
) -> Vec<i64> {
    let schema = reg.find_by_class_name(class).unwrap();
    let pred = build_predicate(schema, text, filters).unwrap();
    rows.iter()
        .filter(|r| pred.as_ref().map_or(true, |p| p.matches(r)))
        .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
        .collect()
}

fn one(field: &str, op: CompareOperator, value: &str) -> FilterSet {
    [QueryFilter::new(field, op, value)].into_iter().collect()
}

#[test]
fn free_text_matches_case_insensitive_substring() {
    let reg = registry();
    assert_eq!(ids(&reg, "Person", &people(), Some("alice"), &FilterSet::new()), vec![1, 3]);
    assert_eq!(ids(&reg, "Person", &people(), Some("ALICE B"), &FilterSet::new()), vec![3]);
}

#[test]
fn typed_greater_than_on_integer() {
    let reg = registry();
    let set = one("age", CompareOperator::GreaterThan, "28");
    assert_eq!(ids(&reg, "Person", &people(), None, &set), vec![1, 3]);
}

#[test]
fn equals_and_contains_ignore_case() {
    let reg = registry();
    let rows = people();
    assert_eq!(
        ids(&reg, "Person", &rows, None, &one("name", CompareOperator::Equals, "BOB")),
        vec![2]
    );
    assert_eq!(
        ids(&reg, "Person", &rows, None, &one("name", CompareOperator::Contains, "LIC")),
        vec![1, 3]
    );
    // stringified integers take part in text operators too
    assert_eq!(
        ids(&reg, "Person", &rows, None, &one("age", CompareOperator::Contains, "0")),
        vec![1, 3]
    );
}

#[test]
fn two_eq_values_on_one_field_yield_nothing() {
    let reg = registry();
    let set: FilterSet = [
        QueryFilter::new("age", CompareOperator::Eq, "30"),
        QueryFilter::new("age", CompareOperator::Eq, "25"),
    ]
    .into_iter()
    .collect();
    assert!(ids(&reg, "Person", &people(), None, &set).is_empty());
}

#[test]
fn free_text_on_schema_without_strings_keeps_all_rows() {
    let reg = registry();
    let rows: Vec<Record> = (1..=3)
        .map(|i| Record::new().with("id", i).with("value", admin_query::FieldValue::Null))
        .collect();
    assert_eq!(ids(&reg, "Reading", &rows, Some("anything"), &FilterSet::new()), vec![1, 2, 3]);
}

#[test]
fn paging_over_the_matches() {
    let total = 101;
    assert_eq!(page_count(total, 50), 3);
    assert!(validate_page(3, 50, total).is_ok());
    assert_eq!(
        validate_page(4, 50, total).unwrap_err(),
        Error::InvalidPage {
            page: 4,
            page_count: 3
        }
    );
}
