//! Working-directory tracking on top of the retry policy.

use std::time::Duration;

use test_support::{Fault, MemoryServer, Operation};
use transport::{Connection, EntryKind, RetryPolicy, Session};

fn connection(server: &MemoryServer) -> Connection<test_support::MemorySession> {
    let retry = RetryPolicy::new(5).with_delays(Duration::ZERO, Duration::ZERO);
    Connection::new(server.connect().unwrap(), retry)
}

#[test]
fn repeated_change_to_the_same_directory_is_sent_once() {
    let server = MemoryServer::new();
    server.add_dir("/www/img");
    let mut connection = connection(&server);

    connection.change_directory("/www/img").unwrap();
    connection.change_directory("/www/img").unwrap();

    assert_eq!(server.performed(Operation::ChangeDirectory), ["/www/img"]);
    assert_eq!(connection.working_directory(), Some("/www/img"));
}

#[test]
fn change_is_reissued_after_the_session_drops() {
    let server = MemoryServer::new();
    server.add_dir("/www");
    let mut connection = connection(&server);

    connection.change_directory("/www").unwrap();
    server.disconnect_all();
    connection.change_directory("/www").unwrap();

    assert_eq!(server.performed(Operation::ChangeDirectory), ["/www", "/www"]);
    assert_eq!(server.logins(), 2);
}

#[test]
fn calls_after_a_drop_run_in_the_cached_directory() {
    let server = MemoryServer::new();
    server.add_dir("/www/css");
    let mut connection = connection(&server);
    connection.change_directory("/www/css").unwrap();
    server.disconnect_all();

    connection
        .call(|session| session.create_directory("fonts"))
        .unwrap();

    assert_eq!(server.kind("/www/css/fonts"), Some(EntryKind::Directory));
    assert_eq!(server.kind("/fonts"), None);
}

#[test]
fn failed_change_clears_the_cache() {
    let server = MemoryServer::new();
    server.add_dir("/a");
    let mut connection = connection(&server);
    connection.change_directory("/a").unwrap();
    server.inject_always(Operation::ChangeDirectory, Fault::Status(553));

    connection.change_directory("/b").unwrap_err();

    assert_eq!(connection.working_directory(), None);
}

#[test]
fn missing_directory_exhausts_retries() {
    let server = MemoryServer::new();
    let mut connection = connection(&server);

    let error = connection.change_directory("/missing").unwrap_err();

    assert_eq!(error.code(), Some(550));
    assert_eq!(server.attempts(Operation::ChangeDirectory), 5);
}

#[test]
fn probing_a_missing_directory_is_not_retried() {
    let server = MemoryServer::new();
    server.add_dir("/site");
    let mut connection = connection(&server);

    assert!(!connection.try_change_directory("/nowhere").unwrap());
    assert_eq!(server.attempts(Operation::ChangeDirectory), 1);
    assert_eq!(connection.working_directory(), None);

    assert!(connection.try_change_directory("/site").unwrap());
    assert_eq!(connection.working_directory(), Some("/site"));
}

#[test]
fn probing_propagates_other_failures() {
    let server = MemoryServer::new();
    server.inject_always(Operation::ChangeDirectory, Fault::Status(553));
    let mut connection = connection(&server);

    let error = connection.try_change_directory("/site").unwrap_err();
    assert_eq!(error.code(), Some(553));
    assert_eq!(server.attempts(Operation::ChangeDirectory), 1);
}
