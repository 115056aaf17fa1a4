#![allow(dead_code)]

use std::sync::Arc;

use admin_db::{ConnectOpts, DbHandle};
use admin_query::{FieldDecl, FieldType, Operation, SchemaDecl, SchemaRegistry};
use sea_orm::ConnectionTrait;

pub const DDL: &str = r#"
CREATE TABLE team (code TEXT PRIMARY KEY, title TEXT NOT NULL);
CREATE TABLE person (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE,
    age INTEGER,
    team_code TEXT REFERENCES team(code)
);
CREATE TABLE team_member (
    team_code TEXT NOT NULL REFERENCES team(code),
    person_id INTEGER NOT NULL REFERENCES person(id),
    PRIMARY KEY (team_code, person_id)
);
CREATE TABLE audit_log (id INTEGER PRIMARY KEY, message TEXT);
INSERT INTO team (code, title) VALUES ('core', 'Core'), ('web', 'Web');
INSERT INTO person (name, email, age, team_code) VALUES
    ('Alice', 'alice@example.com', 30, 'core'),
    ('Bob', 'bob@example.com', 25, 'web'),
    ('alice b', NULL, 40, NULL);
INSERT INTO audit_log (id, message) VALUES (1, 'boot');
"#;

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::build(vec![
        SchemaDecl::new("Person", "person")
            .namespace("people")
            .field(FieldDecl::new("id", FieldType::Integer).primary_key())
            .field(FieldDecl::new("name", FieldType::String).required())
            .field(FieldDecl::new("email", FieldType::String))
            .field(FieldDecl::new("age", FieldType::Integer))
            .field(
                FieldDecl::new("team", FieldType::RelationToOne)
                    .column("team_code")
                    .references("Team"),
            ),
        SchemaDecl::new("Team", "team")
            .namespace("people")
            .field(FieldDecl::new("code", FieldType::String).primary_key())
            .field(FieldDecl::new("title", FieldType::String).required())
            .field(
                FieldDecl::new("members", FieldType::RelationToMany)
                    .references("Person")
                    .join_table("team_member", "team_code", "person_id"),
            ),
        SchemaDecl::new("AuditLog", "audit_log")
            .namespace("system")
            .disable(Operation::Create)
            .disable(Operation::Edit)
            .disable(Operation::Delete)
            .field(FieldDecl::new("id", FieldType::Integer).primary_key())
            .field(FieldDecl::new("message", FieldType::String)),
    ])
    .expect("valid test registry")
}

/// Fresh in-memory SQLite database with the fixture tables and rows.
pub async fn create_test_db() -> DbHandle {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("Failed to connect to test database");
    db.seaorm()
        .execute_unprepared(DDL)
        .await
        .expect("Failed to create fixture tables");
    db
}

pub fn test_registry() -> Arc<SchemaRegistry> {
    Arc::new(registry())
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
