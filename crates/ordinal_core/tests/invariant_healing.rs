use ordinal_core::db::open_db_in_memory;
use ordinal_core::{
    BulkInsertEntry, OrderError, OrderedItem, OrderingService, SqliteOrderedItemRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seeded(conn: &Connection, names: &[&str]) -> (Uuid, Vec<OrderedItem>) {
    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(conn).unwrap());
    let parent = Uuid::new_v4();
    service.register_parent(parent).unwrap();
    let items = names
        .iter()
        .map(|name| service.create_appended(parent, *name).unwrap())
        .collect();
    (parent, items)
}

fn order_of(conn: &Connection, parent: Uuid) -> Vec<(String, i64)> {
    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(conn).unwrap());
    service
        .list_active(parent)
        .unwrap()
        .into_iter()
        .map(|item| (item.payload, item.index))
        .collect()
}

fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected
        .iter()
        .map(|(name, index)| (name.to_string(), *index))
        .collect()
}

fn force_position(conn: &Connection, payload: &str, position: i64) {
    conn.execute(
        "UPDATE ordered_items SET position = ?2 WHERE payload = ?1;",
        rusqlite::params![payload, position],
    )
    .unwrap();
}

// Every position write spawns an active twin at the same position, so
// compaction can never converge.
fn install_duplicating_trigger(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER duplicate_on_move
         AFTER UPDATE OF position ON ordered_items
         BEGIN
             INSERT INTO ordered_items (public_id, parent_uuid, position, payload)
             VALUES (lower(hex(randomblob(16))), NEW.parent_uuid, NEW.position, 'twin');
         END;",
    )
    .unwrap();
}

fn drop_duplicating_trigger(conn: &Connection) {
    conn.execute_batch("DROP TRIGGER duplicate_on_move;").unwrap();
}

#[test]
fn append_heals_preexisting_duplicates() {
    let conn = setup();
    let (parent, _) = seeded(&conn, &["A", "B", "C"]);
    force_position(&conn, "C", 0);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    let appended = service.create_appended(parent, "D").unwrap();

    assert_eq!(appended.index, 3);
    assert_eq!(
        order_of(&conn, parent),
        pairs(&[("A", 0), ("C", 1), ("B", 2), ("D", 3)])
    );
}

#[test]
fn soft_delete_heals_duplicates_elsewhere_in_parent() {
    let conn = setup();
    let (parent, items) = seeded(&conn, &["A", "B", "C", "D"]);
    force_position(&conn, "D", 2);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    service.soft_delete(items[0].public_id, "user:1", 9).unwrap();

    assert_eq!(
        order_of(&conn, parent),
        pairs(&[("B", 0), ("C", 1), ("D", 2)])
    );
    assert!(service.check_parent(parent).unwrap().is_dense);
}

#[test]
fn bulk_insert_heals_each_affected_parent() {
    let conn = setup();
    let (left, _) = seeded(&conn, &["L0", "L1"]);
    let (right, _) = seeded(&conn, &["R0", "R1"]);
    force_position(&conn, "L1", 0);
    force_position(&conn, "R0", 1);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    service
        .bulk_insert(&[
            BulkInsertEntry::new(left, 0, "L2"),
            BulkInsertEntry::new(right, 0, "R2"),
        ])
        .unwrap();

    assert_eq!(
        order_of(&conn, left),
        pairs(&[("L0", 0), ("L1", 1), ("L2", 2)])
    );
    assert_eq!(
        order_of(&conn, right),
        pairs(&[("R0", 0), ("R1", 1), ("R2", 2)])
    );
}

#[test]
fn compact_twice_yields_identical_assignments() {
    let conn = setup();
    let (parent, _) = seeded(&conn, &["A", "B", "C", "D"]);
    force_position(&conn, "A", 9);
    force_position(&conn, "C", 9);
    force_position(&conn, "B", 4);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    let first = service.compact(parent).unwrap();
    let after_first = order_of(&conn, parent);
    let second = service.compact(parent).unwrap();
    let after_second = order_of(&conn, parent);

    assert_eq!(first.active_count, 4);
    assert_eq!(second.rewritten, 0);
    assert_eq!(after_first, after_second);
    assert_eq!(
        after_first,
        pairs(&[("D", 0), ("B", 1), ("A", 2), ("C", 3)])
    );
}

#[test]
fn compact_ignores_soft_deleted_rows() {
    let conn = setup();
    let (parent, items) = seeded(&conn, &["A", "B", "C"]);
    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    service.soft_delete(items[0].public_id, "user:1", 3).unwrap();
    force_position(&conn, "C", 7);

    service.compact(parent).unwrap();

    assert_eq!(order_of(&conn, parent), pairs(&[("B", 0), ("C", 1)]));
    let tombstone = service.get_item(items[0].public_id, true).unwrap().unwrap();
    assert_eq!(tombstone.index, 0);
}

#[test]
fn persisting_duplicates_abort_reorder_and_keep_prior_order() {
    let conn = setup();
    let (parent, items) = seeded(&conn, &["A", "B", "C", "D"]);
    install_duplicating_trigger(&conn);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    let err = service.reorder(items[0].public_id, 2).unwrap_err();

    match &err {
        OrderError::InvariantViolation {
            parent_id,
            duplicates,
        } => {
            assert_eq!(*parent_id, parent);
            assert!(!duplicates.is_empty());
            assert!(duplicates.iter().all(|group| group.count > 1));
        }
        other => panic!("expected invariant violation, got {other}"),
    }
    assert!(err.is_retryable());

    drop_duplicating_trigger(&conn);
    assert_eq!(
        order_of(&conn, parent),
        pairs(&[("A", 0), ("B", 1), ("C", 2), ("D", 3)])
    );
}

#[test]
fn persisting_duplicates_abort_soft_delete_without_marking_item() {
    let conn = setup();
    let (parent, items) = seeded(&conn, &["X", "Y", "Z"]);
    install_duplicating_trigger(&conn);

    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn).unwrap());
    let err = service
        .soft_delete(items[1].public_id, "user:1", 11)
        .unwrap_err();
    assert!(matches!(err, OrderError::InvariantViolation { .. }));

    drop_duplicating_trigger(&conn);
    let still_active = service.get_item(items[1].public_id, false).unwrap();
    assert!(still_active.is_some());
    assert_eq!(
        order_of(&conn, parent),
        pairs(&[("X", 0), ("Y", 1), ("Z", 2)])
    );
}
