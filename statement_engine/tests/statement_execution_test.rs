mod helpers;
use helpers::{init_logging, shared, text_rows};
use statement_engine::observability::Metrics;
use statement_engine::statement::limits::SELECT_LIMIT_DEFAULT;
use statement_engine::test_helpers::ScriptedConnection;
use statement_engine::{Connection, ResultSetConcurrency, Statement, StatementError};
use std::sync::Arc;

#[test]
fn test_read_only_rejects_modification_before_dispatch() {
    init_logging();
    let mut conn = ScriptedConnection::new("a");
    conn.set_read_only(true);
    let (handle, conn) = shared(conn);
    let mut stmt = Statement::new(&conn).unwrap();

    assert!(matches!(
        stmt.execute("UPDATE t SET x=1"),
        Err(StatementError::ReadOnlyViolation)
    ));
    assert!(matches!(
        stmt.execute_update("UPDATE t SET x=1"),
        Err(StatementError::ReadOnlyViolation)
    ));
    assert!(handle.lock().unwrap().dispatched().is_empty());

    assert!(stmt.execute("  select 1").unwrap());
    assert_eq!(handle.lock().unwrap().dispatched_sql(), vec!["  select 1"]);
}

#[test]
fn test_read_only_execute_update_rejects_even_queries() {
    let mut conn = ScriptedConnection::new("a");
    conn.set_read_only(true);
    let (_handle, conn) = shared(conn);
    let mut stmt = Statement::new(&conn).unwrap();

    assert!(matches!(
        stmt.execute_update("SELECT 1"),
        Err(StatementError::ReadOnlyViolation)
    ));
    assert!(stmt.execute_query("SELECT 1").is_ok());
}

#[test]
fn test_query_without_limit_issues_session_directive() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let metrics = Arc::new(Metrics::new());
    let mut stmt = Statement::new(&conn)
        .unwrap()
        .with_metrics(Arc::clone(&metrics));
    stmt.set_max_rows(10).unwrap();

    stmt.execute_query("SELECT * FROM t").unwrap();

    let guard = handle.lock().unwrap();
    assert_eq!(
        guard.dispatched_sql(),
        vec!["SET OPTION SQL_SELECT_LIMIT=10", "SELECT * FROM t"]
    );
    assert_eq!(guard.dispatched()[1].max_rows, -1);
    assert!(guard.dispatched()[1].is_query);
    assert_eq!(metrics.get_limit_directive_count(), 1);
}

#[test]
fn test_query_with_limit_clause_passes_cap_inline() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.set_max_rows(10).unwrap();

    stmt.execute("select * from t limit 3").unwrap();

    let guard = handle.lock().unwrap();
    assert_eq!(guard.dispatched_sql(), vec!["select * from t limit 3"]);
    assert_eq!(guard.dispatched()[0].max_rows, 10);
    assert!(guard.dispatched()[0].is_query);
}

#[test]
fn test_update_resets_session_limit() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.set_max_rows(10).unwrap();

    stmt.execute_update("UPDATE t SET x=1").unwrap();
    stmt.execute("DELETE FROM t").unwrap();

    let guard = handle.lock().unwrap();
    assert_eq!(
        guard.dispatched_sql(),
        vec![
            SELECT_LIMIT_DEFAULT,
            "UPDATE t SET x=1",
            SELECT_LIMIT_DEFAULT,
            "DELETE FROM t"
        ]
    );
    assert!(!guard.dispatched()[1].is_query);
    assert_eq!(
        guard.dispatched()[1].concurrency,
        ResultSetConcurrency::ReadOnly
    );
}

#[test]
fn test_unlimited_statement_on_limited_session_sends_default() {
    let (handle, conn) = shared(ScriptedConnection::new("a").with_use_max_rows(true));
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.execute_query("SELECT * FROM t").unwrap();

    assert_eq!(
        handle.lock().unwrap().dispatched_sql(),
        vec![SELECT_LIMIT_DEFAULT, "SELECT * FROM t"]
    );
}

#[test]
fn test_limits_unused_dispatches_directly() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.execute_query("SELECT * FROM t").unwrap();
    stmt.execute_update("UPDATE t SET x=1").unwrap();

    assert_eq!(
        handle.lock().unwrap().dispatched_sql(),
        vec!["SELECT * FROM t", "UPDATE t SET x=1"]
    );
}

#[test]
fn test_execute_query_treats_text_as_query_for_limits() {
    let (handle, conn) = shared(ScriptedConnection::new("a").respond_with_rows(
        "CALL",
        text_rows("v", &["1"]),
    ));
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.set_max_rows(5).unwrap();

    stmt.execute_query("CALL report()").unwrap();

    let guard = handle.lock().unwrap();
    assert_eq!(
        guard.dispatched_sql(),
        vec!["SET OPTION SQL_SELECT_LIMIT=5", "CALL report()"]
    );
    assert!(guard.dispatched()[1].is_query);
}

#[test]
fn test_catalog_swapped_for_dispatch_and_restored() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::with_catalog(&conn, "b").unwrap();
    stmt.set_max_rows(3).unwrap();

    stmt.execute("SELECT * FROM t").unwrap();

    let guard = handle.lock().unwrap();
    assert!(guard.dispatched().iter().all(|r| r.catalog == "b"));
    assert_eq!(guard.catalog_changes(), &["b".to_string(), "a".to_string()]);
    assert_eq!(guard.dispatched().len(), 2);
}

#[test]
fn test_catalog_restored_after_failure() {
    let (handle, conn) = shared(ScriptedConnection::new("a").fail_on(
        "broken",
        *b"42000",
        1064,
        "You have an error in your SQL syntax",
    ));
    let mut stmt = Statement::with_catalog(&conn, "b").unwrap();

    let err = stmt.execute("UPDATE broken SET").unwrap_err();
    assert_eq!(&err.sqlstate(), b"42000");

    let guard = handle.lock().unwrap();
    assert_eq!(guard.catalog_changes(), &["b".to_string(), "a".to_string()]);
}

#[test]
fn test_matching_catalog_is_not_touched() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.execute("SELECT 1").unwrap();
    assert!(handle.lock().unwrap().catalog_changes().is_empty());
}

#[test]
fn test_catalog_restore_failure_surfaces_when_dispatch_succeeded() {
    let (handle, conn) = shared(ScriptedConnection::new("a").with_failing_catalog("a"));
    let mut stmt = Statement::with_catalog(&conn, "b").unwrap();

    let err = stmt.execute("SELECT 1").unwrap_err();
    assert_eq!(err.native_code(), 1049);
    assert!(stmt.result_set().unwrap().is_none());
    assert_eq!(handle.lock().unwrap().dispatched().len(), 1);
}

#[test]
fn test_update_through_query_fails_and_rolls_back() {
    let (handle, conn) = shared(ScriptedConnection::new("a").with_auto_commit(false));
    let mut stmt = Statement::new(&conn).unwrap();

    assert!(matches!(
        stmt.execute_query("UPDATE t SET x=1"),
        Err(StatementError::NotAQuery)
    ));
    assert_eq!(handle.lock().unwrap().rollback_count(), 1);
    assert!(stmt.result_set().unwrap().is_none());
}

#[test]
fn test_query_through_update_fails_and_rolls_back() {
    let (handle, conn) = shared(ScriptedConnection::new("a").with_auto_commit(false));
    let mut stmt = Statement::new(&conn).unwrap();

    stmt.execute_query("SELECT 1").unwrap();
    assert!(matches!(
        stmt.execute_update("SELECT 1"),
        Err(StatementError::ExpectedUpdateGotRows)
    ));
    assert_eq!(handle.lock().unwrap().rollback_count(), 1);
}

#[test]
fn test_mismatch_with_autocommit_skips_rollback() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut stmt = Statement::new(&conn).unwrap();

    assert!(stmt.execute_query("DELETE FROM t").is_err());
    assert_eq!(handle.lock().unwrap().rollback_count(), 0);
}

#[test]
fn test_rollback_failure_does_not_mask_mismatch() {
    let (handle, conn) = shared(
        ScriptedConnection::new("a")
            .with_auto_commit(false)
            .with_failing_rollback(),
    );
    let mut stmt = Statement::new(&conn).unwrap();

    assert!(matches!(
        stmt.execute_query("UPDATE t SET x=1"),
        Err(StatementError::NotAQuery)
    ));
    assert_eq!(handle.lock().unwrap().rollback_count(), 1);
}

#[test]
fn test_dispatch_error_is_recorded() {
    let metrics = Arc::new(Metrics::new());
    let (_handle, conn) = shared(ScriptedConnection::new("a").fail_on(
        "missing",
        *b"42S02",
        1146,
        "Table 'missing' doesn't exist",
    ));
    let mut stmt = Statement::new(&conn)
        .unwrap()
        .with_metrics(Arc::clone(&metrics));

    let err = stmt.execute_query("SELECT * FROM missing").unwrap_err();
    assert_eq!(err.to_structured().sqlstate_str(), "42S02");
    assert_eq!(metrics.get_error_count(), 1);

    stmt.execute_query("SELECT 1").unwrap();
    assert_eq!(metrics.get_statement_metrics().statement_count, 1);
}

#[test]
fn test_statements_share_one_connection() {
    let (handle, conn) = shared(ScriptedConnection::new("a"));
    let mut first = Statement::with_catalog(&conn, "x").unwrap();
    let mut second = Statement::with_catalog(&conn, "y").unwrap();

    first.execute_update("UPDATE t SET x=1").unwrap();
    second.execute_update("UPDATE t SET x=2").unwrap();

    let guard = handle.lock().unwrap();
    let catalogs: Vec<&str> = guard.dispatched().iter().map(|r| r.catalog.as_str()).collect();
    assert_eq!(catalogs, vec!["x", "y"]);
    assert_eq!(guard.catalog().unwrap(), "a");
}

#[test]
fn test_concurrent_statements_never_see_foreign_catalog() {
    use std::thread;

    let (handle, conn) = shared(ScriptedConnection::new("home"));
    let workers: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|catalog| {
            let conn = conn.clone();
            thread::spawn(move || {
                let mut stmt = Statement::with_catalog(&conn, catalog).unwrap();
                for _ in 0..50 {
                    stmt.execute_update(&format!("UPDATE {} SET x=1", catalog))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let guard = handle.lock().unwrap();
    assert_eq!(guard.dispatched().len(), 100);
    for record in guard.dispatched() {
        assert!(record.sql.contains(&record.catalog));
    }
    assert_eq!(guard.catalog().unwrap(), "home");
}
