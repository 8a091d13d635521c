mod helpers;
use helpers::shared;
use statement_engine::statement::options::EXECUTE_FAILED;
use statement_engine::test_helpers::ScriptedConnection;
use statement_engine::{Statement, StatementError};

fn failing_connection() -> ScriptedConnection {
    ScriptedConnection::new("a")
        .respond_with_update("x=1", 4, -1)
        .respond_with_update("x=2", 6, -1)
        .fail_on(
            "INVALID",
            *b"42000",
            1064,
            "You have an error in your SQL syntax near 'INVALID SQL'",
        )
}

#[test]
fn test_batch_partial_failure_reports_every_outcome() {
    let (handle, conn) = shared(failing_connection());
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.add_batch("UPDATE t SET x=1").unwrap();
    stmt.add_batch("INVALID SQL").unwrap();
    stmt.add_batch("UPDATE t SET x=2").unwrap();

    let err = stmt.execute_batch().unwrap_err();
    assert_eq!(err.update_counts(), Some(&[4, EXECUTE_FAILED, 6][..]));
    assert_eq!(&err.sqlstate(), b"42000");
    assert_eq!(err.native_code(), 1064);
    assert!(err.message().contains("INVALID SQL"));

    assert_eq!(stmt.batch_len(), 0);
    assert_eq!(handle.lock().unwrap().dispatched().len(), 3);
}

#[test]
fn test_batch_queue_cleared_after_success_and_failure() {
    let (_handle, conn) = shared(failing_connection());
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.add_batch("UPDATE t SET x=1").unwrap();
    assert_eq!(stmt.execute_batch().unwrap(), vec![4]);
    assert_eq!(stmt.batch_len(), 0);

    stmt.add_batch("INVALID SQL").unwrap();
    assert!(stmt.execute_batch().is_err());
    assert_eq!(stmt.batch_len(), 0);

    assert!(stmt.execute_batch().unwrap().is_empty());
}

#[test]
fn test_batch_entry_returning_rows_counts_as_failure() {
    let (_handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.add_batch("SELECT 1").unwrap();
    stmt.add_batch("UPDATE t SET x=1").unwrap();

    match stmt.execute_batch() {
        Err(StatementError::BatchFailure {
            sqlstate,
            update_counts,
            ..
        }) => {
            assert_eq!(update_counts, vec![EXECUTE_FAILED, 1]);
            assert_eq!(&sqlstate, b"01S03");
        }
        other => panic!("Expected BatchFailure, got {:?}", other),
    }
}

#[test]
fn test_batch_rejected_on_read_only_connection() {
    let mut conn = ScriptedConnection::new("a");
    conn.set_read_only(true);
    let (handle, conn) = shared(conn);
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.add_batch("UPDATE t SET x=1").unwrap();
    assert!(matches!(
        stmt.execute_batch(),
        Err(StatementError::ReadOnlyViolation)
    ));
    assert_eq!(stmt.batch_len(), 0);
    assert!(handle.lock().unwrap().dispatched().is_empty());
}

#[test]
fn test_batch_entries_honor_statement_catalog() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::with_catalog(&conn, "reports").unwrap();

    stmt.add_batch("UPDATE t SET x=1").unwrap();
    stmt.add_batch("UPDATE t SET x=2").unwrap();
    stmt.execute_batch().unwrap();

    let guard = handle.lock().unwrap();
    assert!(guard.dispatched().iter().all(|r| r.catalog == "reports"));
    assert_eq!(guard.catalog_changes().len(), 4);
}

#[test]
fn test_batch_on_closed_statement() {
    let (_handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.close();

    assert!(matches!(
        stmt.add_batch("UPDATE t SET x=1"),
        Err(StatementError::IllegalState(_))
    ));
    assert!(matches!(
        stmt.execute_batch(),
        Err(StatementError::IllegalState(_))
    ));
}
