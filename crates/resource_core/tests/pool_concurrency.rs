use resource_core::{
    ConnectionPool, FilterMap, Payload, ResourceRegistry, ResourceRepository, StoreConfig, Value,
};
use std::thread;
use std::time::Duration;

const WORKERS: usize = 6;
const ROWS_PER_WORKER: usize = 10;

#[test]
fn pooled_resources_are_shared_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(
        StoreConfig::file(dir.path().join("site.db"))
            .max_connections(3)
            .acquire_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    let registry = ResourceRegistry::site().unwrap();

    let handles = (0..WORKERS)
        .map(|worker| {
            let newsletter = registry.resource("newsletter", pool.clone()).unwrap();
            thread::spawn(move || {
                for row in 0..ROWS_PER_WORKER {
                    let payload: Payload = [(
                        "email".to_string(),
                        Value::from(format!("w{worker}-r{row}@example.com")),
                    )]
                    .into_iter()
                    .collect();
                    newsletter.create(&payload).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let newsletter = registry.resource("newsletter", pool.clone()).unwrap();
    assert_eq!(
        newsletter.count(&FilterMap::new()).unwrap(),
        (WORKERS * ROWS_PER_WORKER) as u64
    );

    let stats = pool.stats();
    assert!(stats.open <= 3);
    assert_eq!(stats.in_use, 0);
}

#[test]
fn in_memory_pool_serves_sequential_borrowers_one_database() {
    let pool = ConnectionPool::new(StoreConfig::in_memory().max_connections(2)).unwrap();
    let registry = ResourceRegistry::site().unwrap();
    let contacts = registry.resource("contacts", pool.clone()).unwrap();

    let created = contacts
        .create(
            &[
                ("name".to_string(), Value::from("Ada")),
                ("email".to_string(), Value::from("ada@example.com")),
                ("message".to_string(), Value::from("Booking request")),
            ]
            .into_iter()
            .collect(),
        )
        .unwrap();

    let held = pool.get().unwrap();
    let status: String = held
        .query_row(
            "SELECT status FROM contacts WHERE id = ?1",
            [created.id.as_text().unwrap()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(status, "new");
}

#[test]
fn in_memory_pool_serializes_concurrent_writers() {
    let pool = ConnectionPool::new(
        StoreConfig::in_memory()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    assert_eq!(pool.stats().max_connections, 1);
    let registry = ResourceRegistry::site().unwrap();

    let handles = (0..4)
        .map(|worker| {
            let contacts = registry.resource("contacts", pool.clone()).unwrap();
            thread::spawn(move || {
                for row in 0..ROWS_PER_WORKER {
                    let payload: Payload = [
                        ("name".to_string(), Value::from(format!("w{worker}"))),
                        (
                            "email".to_string(),
                            Value::from(format!("w{worker}-r{row}@example.com")),
                        ),
                        ("message".to_string(), Value::from("hello")),
                    ]
                    .into_iter()
                    .collect();
                    let created = contacts.create(&payload).unwrap();
                    assert!(contacts.find_one(&created.id).unwrap().is_some());
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let contacts = registry.resource("contacts", pool.clone()).unwrap();
    assert_eq!(
        contacts.count(&FilterMap::new()).unwrap(),
        (4 * ROWS_PER_WORKER) as u64
    );
    let stats = pool.stats();
    assert_eq!(stats.open, 1);
    assert_eq!(stats.in_use, 0);
}
