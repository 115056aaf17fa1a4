//! Integration-style tests for the entity_admin module.
//!
//! Key points:
//! - Each test runs on a fresh in-memory SQLite DB seeded with a small fixture.
//! - Service is constructed with the SeaORM-backed repository (Domain Port + Adapter).
//! - Everything goes through the local client, the way the binary uses it.

mod common;

use std::sync::Arc;

use admin_db::DbHandle;
use admin_query::{FieldValue, ViolationKind};
use entity_admin::{
    config::AdminConfig,
    contract::{client::EntityAdminApi, error::AdminError, model::ListOutcome, Uploads, CREATE_FLAG},
    EntityAdmin,
};

use common::{create_test_db, pairs, test_registry};

async fn create_test_client() -> (Arc<dyn EntityAdminApi>, DbHandle) {
    let db = create_test_db().await;
    let module = EntityAdmin::init(&AdminConfig::default(), test_registry(), &db);
    (module.client(), db)
}

/// Primary keys of one listed page of people.
async fn list_ids(client: &dyn EntityAdminApi, params: &[(&str, &str)]) -> Vec<FieldValue> {
    match client.list("Person", &pairs(params)).await.unwrap() {
        ListOutcome::Page(page) => page
            .result
            .items
            .iter()
            .map(|r| r.get("id").cloned().unwrap_or(FieldValue::Null))
            .collect(),
        other => panic!("expected a page, got {other:?}"),
    }
}

fn ints(ids: &[i64]) -> Vec<FieldValue> {
    ids.iter().copied().map(FieldValue::Integer).collect()
}

#[tokio::test]
async fn test_index_groups_by_namespace_with_counts() {
    let (client, _db) = create_test_client().await;

    let groups = client.index(None).await.unwrap();
    let namespaces: Vec<_> = groups.iter().map(|g| g.namespace.as_str()).collect();
    assert_eq!(namespaces, vec!["people", "system"]);
    let people: Vec<_> = groups[0]
        .entries
        .iter()
        .map(|e| (e.class_name.as_str(), e.count))
        .collect();
    assert_eq!(people, vec![("Person", 3), ("Team", 2)]);

    let filtered = client.index(Some("TEAM")).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].entries.len(), 1);
    assert_eq!(filtered[0].entries[0].class_name, "Team");
}

#[tokio::test]
async fn test_person_scenario() {
    let (client, _db) = create_test_client().await;
    let client = client.as_ref();

    assert_eq!(list_ids(client, &[("query", "alice")]).await, ints(&[1, 3]));
    assert_eq!(list_ids(client, &[("filter", "age:gt:28")]).await, ints(&[1, 3]));
    assert_eq!(
        list_ids(client, &[("filter_field", "age"), ("filter_op", "lt"), ("filter_value", "28")]).await,
        ints(&[2])
    );
    assert!(list_ids(client, &[("filter", "age:eq:30"), ("filter", "age:eq:25")])
        .await
        .is_empty());
    assert_eq!(
        list_ids(client, &[("sortKey", "age"), ("sortOrder", "desc")]).await,
        ints(&[3, 1, 2])
    );
}

#[tokio::test]
async fn test_list_pages_and_rejects_out_of_range() {
    let (client, _db) = create_test_client().await;

    let outcome = client
        .list("Person", &pairs(&[("page", "3"), ("pageSize", "1")]))
        .await
        .unwrap();
    let ListOutcome::Page(page) = outcome else {
        panic!("expected a page");
    };
    assert_eq!(page.result.total_count, 3);
    assert_eq!(page.result.page_count(), 3);
    assert!(!page.result.has_next());
    assert_eq!(page.result.items.len(), 1);

    let err = client
        .list("Person", &pairs(&[("page", "4"), ("pageSize", "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Usage { .. }), "{err:?}");

    // an empty result is a single valid page
    assert!(list_ids(client.as_ref(), &[("query", "nobody")]).await.is_empty());
}

#[tokio::test]
async fn test_removal_redirects_without_querying() {
    let (client, _db) = create_test_client().await;
    let outcome = client
        .list(
            "Person",
            &pairs(&[
                ("filter", "age:gt:28"),
                ("filter", "name:contains:a"),
                ("sortKey", "age"),
                ("remove", "name:contains:a"),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ListOutcome::Redirect {
            location: "?sortKey=age&filter=age%3Agt%3A28".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_schema_and_record() {
    let (client, _db) = create_test_client().await;
    assert!(matches!(
        client.list("Nope", &[]).await.unwrap_err(),
        AdminError::NotFound { .. }
    ));
    assert!(matches!(
        client.get("Person", "99").await.unwrap_err(),
        AdminError::NotFound { .. }
    ));
    assert!(matches!(
        client.get("Person", "abc").await.unwrap_err(),
        AdminError::Usage { .. }
    ));
}

#[tokio::test]
async fn test_create_with_generated_key() {
    let (client, _db) = create_test_client().await;
    let form = pairs(&[(CREATE_FLAG, "true"), ("id", ""), ("name", "Carol"), ("age", "51")]);

    let saved = client.save("Person", &form, &Uploads::new()).await.unwrap();
    assert!(saved.created);
    assert_eq!(saved.pk, FieldValue::Integer(4));

    let carol = client.get("Person", "4").await.unwrap();
    assert_eq!(carol.get("name"), Some(&FieldValue::from("Carol")));
    assert_eq!(carol.get("email"), Some(&FieldValue::Null));
}

#[tokio::test]
async fn test_create_with_explicit_key_and_duplicate() {
    let (client, _db) = create_test_client().await;

    let form = pairs(&[(CREATE_FLAG, "true"), ("id", "10"), ("name", "Dan")]);
    let saved = client.save("Person", &form, &Uploads::new()).await.unwrap();
    assert_eq!(saved.pk, FieldValue::Integer(10));

    let again = client.save("Person", &form, &Uploads::new()).await.unwrap_err();
    assert!(matches!(again, AdminError::AlreadyExists { .. }), "{again:?}");
}

#[tokio::test]
async fn test_edit_updates_only_submitted_fields() {
    let (client, _db) = create_test_client().await;
    let form = pairs(&[(CREATE_FLAG, "false"), ("id", "1"), ("name", "Alicia")]);

    let saved = client.save("Person", &form, &Uploads::new()).await.unwrap();
    assert!(!saved.created);

    let alice = client.get("Person", "1").await.unwrap();
    assert_eq!(alice.get("name"), Some(&FieldValue::from("Alicia")));
    assert_eq!(alice.get("age"), Some(&FieldValue::Integer(30)));
}

#[tokio::test]
async fn test_form_errors_are_collected() {
    let (client, _db) = create_test_client().await;
    let form = pairs(&[(CREATE_FLAG, "true"), ("age", "old")]);

    let AdminError::Validation(report) = client
        .save("Person", &form, &Uploads::new())
        .await
        .unwrap_err()
    else {
        panic!("expected a validation report");
    };
    assert_eq!(report.len(), 2);
    assert_eq!(report.for_field("age").next().unwrap().kind, ViolationKind::TypeMismatch);
    assert_eq!(report.for_field("name").next().unwrap().kind, ViolationKind::Required);

    let missing_flag = client
        .save("Person", &pairs(&[("name", "x")]), &Uploads::new())
        .await
        .unwrap_err();
    assert!(matches!(missing_flag, AdminError::Usage { .. }));
}

#[tokio::test]
async fn test_store_constraints_become_validation() {
    let (client, _db) = create_test_client().await;

    let dup = pairs(&[(CREATE_FLAG, "true"), ("name", "Eve"), ("email", "alice@example.com")]);
    let AdminError::Validation(report) = client.save("Person", &dup, &Uploads::new()).await.unwrap_err()
    else {
        panic!("expected a validation report");
    };
    let email = report.for_field("email").next().expect("email entry");
    assert_eq!(email.kind, ViolationKind::Unique);

    let dangling = pairs(&[(CREATE_FLAG, "true"), ("name", "Fay"), ("team", "nope")]);
    let AdminError::Validation(report) = client
        .save("Person", &dangling, &Uploads::new())
        .await
        .unwrap_err()
    else {
        panic!("expected a validation report");
    };
    assert_eq!(report.entries()[0].kind, ViolationKind::ForeignKey);

    // referenced rows cannot be deleted either
    let AdminError::Validation(report) = client.delete("Team", "core").await.unwrap_err() else {
        panic!("expected a validation report");
    };
    assert_eq!(report.entries()[0].kind, ViolationKind::ForeignKey);
}

#[tokio::test]
async fn test_capability_flags_block_writes() {
    let (client, _db) = create_test_client().await;

    let form = pairs(&[(CREATE_FLAG, "true"), ("id", "2"), ("message", "hello")]);
    let err = client.save("AuditLog", &form, &Uploads::new()).await.unwrap_err();
    assert!(matches!(err, AdminError::Usage { ref message } if message.contains("CREATE")), "{err:?}");

    let err = client.delete("AuditLog", "1").await.unwrap_err();
    assert!(matches!(err, AdminError::Usage { .. }));

    let groups = client.index(Some("audit")).await.unwrap();
    assert_eq!(groups[0].entries[0].count, 1);
}

#[tokio::test]
async fn test_to_many_relations_are_replaced() {
    let (client, _db) = create_test_client().await;

    let form = pairs(&[
        (CREATE_FLAG, "false"),
        ("code", "core"),
        ("title", "Core"),
        ("members[]", ""),
        ("members[]", "3"),
        ("members[]", "1"),
    ]);
    client.save("Team", &form, &Uploads::new()).await.unwrap();
    let core = client.get("Team", "core").await.unwrap();
    assert_eq!(core.relation("members"), Some(&ints(&[1, 3])[..]));

    let cleared = pairs(&[(CREATE_FLAG, "false"), ("code", "core"), ("title", "Core"), ("members[]", "")]);
    client.save("Team", &cleared, &Uploads::new()).await.unwrap();
    let core = client.get("Team", "core").await.unwrap();
    assert_eq!(core.relation("members"), Some(&[] as &[FieldValue]));
}

#[tokio::test]
async fn test_delete_and_bulk_delete() {
    let (client, _db) = create_test_client().await;

    assert_eq!(client.delete("Person", "2").await.unwrap(), FieldValue::Integer(2));
    assert!(matches!(
        client.delete("Person", "2").await.unwrap_err(),
        AdminError::NotFound { .. }
    ));

    let ids = vec!["1".to_string(), "x".to_string(), "99".to_string()];
    let report = client.delete_many("Person", &ids).await.unwrap();
    assert_eq!(report.deleted, 1);
    let failed: Vec<_> = report.failures.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(failed, vec!["x", "99"]);

    assert_eq!(list_ids(client.as_ref(), &[]).await, ints(&[3]));
}
