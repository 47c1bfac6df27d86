use resource_core::db::open_db_in_memory;
use resource_core::{
    FilterMap, PageRequest, Payload, RepoError, ResourceRegistry, ResourceRepository,
    ResourceService, SortRequest, Value,
};

fn payload(entries: &[(&str, Value)]) -> Payload {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn duplicate_newsletter_email_is_a_named_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let newsletter = registry.resource("newsletter", &conn).unwrap();

    let first = newsletter
        .create(&payload(&[("email", Value::from("fan@example.com"))]))
        .unwrap();
    assert_eq!(first.id, Value::Integer(1));
    assert_eq!(first.get("is_active"), Some(&Value::Bool(true)));

    let err = newsletter
        .create(&payload(&[("email", Value::from("fan@example.com"))]))
        .unwrap_err();
    match err {
        RepoError::ConstraintViolation {
            table, constraint, ..
        } => {
            assert_eq!(table, "newsletter");
            assert_eq!(constraint.as_deref(), Some("newsletter.email"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(newsletter.count(&FilterMap::new()).unwrap(), 1);
}

#[test]
fn event_status_outside_allowed_set_is_rejected_by_check() {
    let conn = open_db_in_memory().unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let events = registry.resource("events", &conn).unwrap();

    let err = events
        .create(&payload(&[
            ("title", Value::from("Basement Session")),
            ("status", Value::from("postponed")),
        ]))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConstraintViolation { constraint: Some(ref name), .. } if name == "events_status_check"
    ));

    let created = events
        .create(&payload(&[("title", Value::from("Basement Session"))]))
        .unwrap();
    assert_eq!(created.get("status"), Some(&Value::from("upcoming")));
}

#[test]
fn missing_required_release_title_names_the_column() {
    let conn = open_db_in_memory().unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let releases = registry.resource("releases", &conn).unwrap();

    let err = releases
        .create(&payload(&[("genre", Value::from("Jungle"))]))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConstraintViolation { constraint: Some(ref name), .. } if name == "releases.title"
    ));
}

#[test]
fn user_records_never_carry_password_hash() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (email, password_hash, role) VALUES ('admin@example.com', 'secret-hash', 'admin');",
    )
    .unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let users = registry.resource("users", &conn).unwrap();

    let records = users
        .find(&FilterMap::new(), &SortRequest::default(), &PageRequest::default())
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].get("password_hash").is_none());
    assert_eq!(records[0].get("role"), Some(&Value::from("admin")));

    let err = users
        .update(&records[0].id, &payload(&[("password_hash", Value::from("x"))]))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn admin_list_view_pages_releases_with_total() {
    let conn = open_db_in_memory().unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let service = ResourceService::new(registry.resource("releases", &conn).unwrap());

    for (title, date) in [
        ("First Light", "2021-03-01"),
        ("Second Wind", "2022-06-15"),
        ("Third Rail", "2023-09-30"),
    ] {
        service
            .create(&payload(&[
                ("title", Value::from(title)),
                ("release_date", Value::from(date)),
                ("is_featured", Value::from(true)),
            ]))
            .unwrap();
    }

    let page = service
        .list(
            &FilterMap::new(),
            &SortRequest::new("release_date", "DESC"),
            &PageRequest::new("2", "0"),
        )
        .unwrap();
    assert_eq!(page.total, 3);
    let titles = page
        .records
        .iter()
        .map(|record| record.get("title").unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Third Rail", "Second Wind"]);
    assert_eq!(page.records[0].get("is_featured"), Some(&Value::Bool(true)));
    assert_eq!(
        page.records[0].get("artist"),
        Some(&Value::from("SunFixer & OVM"))
    );

    let err = service.get(&Value::from("missing")).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn update_returns_fresh_updated_at() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO events (id, title, updated_at) VALUES ('e-1', 'Warehouse', '2000-01-01 00:00:00');",
    )
    .unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let events = registry.resource("events", &conn).unwrap();

    let updated = events
        .update(&Value::from("e-1"), &payload(&[("venue", Value::from("Dock 5"))]))
        .unwrap()
        .unwrap();
    assert_eq!(updated.get("venue"), Some(&Value::from("Dock 5")));
    assert_ne!(
        updated.get("updated_at"),
        Some(&Value::from("2000-01-01 00:00:00"))
    );

    let stored: String = conn
        .query_row("SELECT updated_at FROM events WHERE id = 'e-1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(updated.get("updated_at"), Some(&Value::from(stored)));
}
