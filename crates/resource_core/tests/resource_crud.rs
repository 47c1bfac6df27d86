use resource_core::db::DbError;
use resource_core::{
    FilterMap, KeyGeneration, PageRequest, Payload, RepoError, Resource, ResourceRepository,
    SortDirection, SortRequest, TableDescriptor, ValidationError, Value,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn releases_descriptor() -> Arc<TableDescriptor> {
    Arc::new(
        TableDescriptor::builder("releases")
            .columns(["title", "genre", "featured"])
            .sortable(["title", "genre"])
            .default_sort("title", SortDirection::Asc)
            .boolean_columns(["featured"])
            .key_generation(KeyGeneration::UuidV4)
            .build()
            .unwrap(),
    )
}

fn releases_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE releases (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            genre TEXT,
            featured INTEGER NOT NULL DEFAULT 0,
            internal_notes TEXT
        );",
    )
    .unwrap();
    conn
}

fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO releases (id, title, genre) VALUES
            ('r-1', 'Amen Dreams', 'Jungle'),
            ('r-2', 'Bass Weather', 'Jungle Breaks'),
            ('r-3', 'Concrete', 'Techno');",
    )
    .unwrap();
}

fn map(entries: &[(&str, Value)]) -> FilterMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM releases", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn wildcard_filter_returns_matching_rows_in_requested_order() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let records = releases
        .find(
            &map(&[("genre", Value::from("Jungle*"))]),
            &SortRequest::new("title", "desc"),
            &PageRequest::default(),
        )
        .unwrap();

    let titles = records
        .iter()
        .map(|record| record.get("title").unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Bass Weather", "Amen Dreams"]);
}

#[test]
fn wildcard_filter_folds_ascii_case_only() {
    let conn = releases_conn();
    seed(&conn);
    conn.execute_batch("INSERT INTO releases (id, title, genre) VALUES ('r-4', 'Été', 'Éclat');")
        .unwrap();
    let releases = Resource::new(releases_descriptor(), &conn);

    let lower = releases
        .count(&map(&[("genre", Value::from("jungle*"))]))
        .unwrap();
    assert_eq!(lower, 2);

    let accented = releases
        .count(&map(&[("genre", Value::from("éclat*"))]))
        .unwrap();
    assert_eq!(accented, 0);
    assert_eq!(
        releases
            .count(&map(&[("genre", Value::from("Éclat*"))]))
            .unwrap(),
        1
    );
}

#[test]
fn exact_filter_and_count_agree() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let filters = map(&[("genre", Value::from("Jungle"))]);
    let records = releases
        .find(&filters, &SortRequest::default(), &PageRequest::default())
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, Value::from("r-1"));

    assert_eq!(releases.count(&filters).unwrap(), 1);
    assert_eq!(releases.count(&FilterMap::new()).unwrap(), 3);
}

#[test]
fn unknown_sort_field_falls_back_and_page_window_applies() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let records = releases
        .find(
            &FilterMap::new(),
            &SortRequest::new("internal_notes; DROP TABLE releases", "asc"),
            &PageRequest::new("2", "1"),
        )
        .unwrap();

    let ids = records.iter().map(|record| record.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, vec![Value::from("r-2"), Value::from("r-3")]);
    assert_eq!(row_count(&conn), 3);
}

#[test]
fn unknown_filter_key_is_rejected() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let err = releases
        .find(
            &map(&[("internal_notes", Value::from("x"))]),
            &SortRequest::default(),
            &PageRequest::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::UnknownColumn { ref column, .. }) if column == "internal_notes"
    ));
}

#[test]
fn unknown_payload_field_inserts_nothing() {
    let conn = releases_conn();
    let releases = Resource::new(releases_descriptor(), &conn);

    let payload: Payload = map(&[
        ("title", Value::from("X")),
        ("unknownField", Value::from("y")),
    ]);
    let err = releases.create(&payload).unwrap_err();

    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn create_then_find_one_round_trips_declared_fields() {
    let conn = releases_conn();
    let releases = Resource::new(releases_descriptor(), &conn);

    let payload: Payload = map(&[
        ("title", Value::from("Night Bus")),
        ("genre", Value::from("Dub")),
        ("featured", Value::from(true)),
    ]);
    let created = releases.create(&payload).unwrap();
    let Value::Text(id) = &created.id else {
        panic!("uuid key expected, got {:?}", created.id);
    };
    assert_eq!(uuid::Uuid::parse_str(id).unwrap().get_version_num(), 4);

    let loaded = releases.find_one(&created.id).unwrap().unwrap();
    for (column, value) in &payload {
        assert_eq!(loaded.get(column), Some(value), "column {column}");
    }
    assert!(loaded.get("internal_notes").is_none());
}

#[test]
fn payload_primary_key_is_ignored_and_explicit_key_is_honored() {
    let conn = releases_conn();
    let releases = Resource::new(releases_descriptor(), &conn);

    let payload: Payload = map(&[("id", Value::from("forged")), ("title", Value::from("A"))]);
    let created = releases.create(&payload).unwrap();
    assert_ne!(created.id, Value::from("forged"));

    let chosen = releases
        .create_with_id(&Value::from("r-chosen"), &map(&[("title", Value::from("B"))]))
        .unwrap();
    assert_eq!(chosen.id, Value::from("r-chosen"));
}

#[test]
fn update_changes_only_given_columns() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let updated = releases
        .update(&Value::from("r-3"), &map(&[("genre", Value::from("Minimal"))]))
        .unwrap()
        .unwrap();
    assert_eq!(updated.get("genre"), Some(&Value::from("Minimal")));
    assert_eq!(updated.get("title"), Some(&Value::from("Concrete")));

    let missing = releases
        .update(&Value::from("r-404"), &map(&[("genre", Value::from("x"))]))
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn delete_twice_reports_missing_row_the_second_time() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let id = Value::from("r-1");
    assert_eq!(releases.delete(&id).unwrap(), Some(id.clone()));
    assert_eq!(releases.delete(&id).unwrap(), None);
    assert!(releases.find_one(&id).unwrap().is_none());
    assert_eq!(row_count(&conn), 2);
}

#[test]
fn filter_values_are_never_spliced_into_sql() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn);

    let records = releases
        .find(
            &map(&[("title", Value::from("x' OR '1'='1"))]),
            &SortRequest::default(),
            &PageRequest::default(),
        )
        .unwrap();
    assert!(records.is_empty());

    let records = releases
        .find(
            &map(&[("genre", Value::from("Jungle_"))]),
            &SortRequest::default(),
            &PageRequest::default(),
        )
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn store_failures_surface_as_adapter_errors() {
    let conn = Connection::open_in_memory().unwrap();
    let releases = Resource::new(releases_descriptor(), &conn);

    let err = releases
        .find(&FilterMap::new(), &SortRequest::default(), &PageRequest::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::Adapter { ref table, .. } if table == "releases"));
}

#[test]
fn expired_deadline_fails_instead_of_running() {
    let conn = releases_conn();
    seed(&conn);
    let releases = Resource::new(releases_descriptor(), &conn)
        .with_deadline(Instant::now() - Duration::from_millis(1));

    let err = releases.delete(&Value::from("r-1")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Adapter {
            source: DbError::DeadlineExceeded,
            ..
        }
    ));
    assert_eq!(row_count(&conn), 3);
}
