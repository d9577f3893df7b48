//! Connection pool leasing, backpressure and disposal.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use test_support::{Fault, MemoryServer, MemorySession, Operation};
use transport::{ConnectionPool, PoolError, RetryPolicy, Session, SessionError};

fn pool(server: &MemoryServer, capacity: usize) -> ConnectionPool<MemorySession> {
    ConnectionPool::new(
        server.factory(),
        NonZeroUsize::new(capacity).unwrap(),
        RetryPolicy::new(3).with_delays(Duration::ZERO, Duration::ZERO),
    )
}

#[test]
fn sessions_are_opened_lazily() {
    let server = MemoryServer::new();
    let pool = pool(&server, 4);
    assert_eq!(server.sessions_created(), 0);

    let mut lease = pool.lease();
    assert_eq!(server.sessions_created(), 0);
    lease.connection().unwrap();
    assert_eq!(server.sessions_created(), 1);
    drop(lease);

    let mut again = pool.lease();
    again.connection().unwrap();
    assert!(server.sessions_created() <= 2);
}

#[test]
fn leasing_blocks_when_every_slot_is_out() {
    let server = MemoryServer::new();
    let pool = pool(&server, 2);

    let first = pool.lease();
    let second = pool.lease();
    assert_eq!(pool.outstanding(), 2);
    assert!(pool.try_lease().is_none());

    drop(first);
    let third = pool.try_lease().expect("slot freed by drop");
    assert_eq!(pool.available(), 0);
    drop((second, third));
    assert_eq!(pool.available(), 2);
}

#[test]
fn blocked_lease_resumes_on_release() {
    let server = MemoryServer::new();
    let pool = pool(&server, 1);
    let held = pool.lease();

    thread::scope(|scope| {
        let waiter = scope.spawn(|| pool.lease().slot());
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(held);
        assert_eq!(waiter.join().unwrap(), Some(0));
    });
}

#[test]
fn release_is_idempotent() {
    let server = MemoryServer::new();
    let pool = pool(&server, 1);
    let mut lease = pool.lease();

    lease.release();
    lease.release();
    assert!(lease.is_released());
    drop(lease);

    assert_eq!(pool.available(), 1);
    assert!(pool.dispose().is_ok());
}

#[test]
fn released_lease_has_no_connection() {
    let server = MemoryServer::new();
    let pool = pool(&server, 1);
    let mut lease = pool.lease();
    lease.release();

    assert!(matches!(lease.connection(), Err(SessionError::LeaseReleased)));
}

#[test]
fn concurrent_leases_never_exceed_capacity() {
    let server = MemoryServer::new();
    server.set_upload_delay(Duration::from_millis(15));
    let pool = pool(&server, 3);
    let uploads = AtomicUsize::new(0);

    thread::scope(|scope| {
        for index in 0..12 {
            let pool = &pool;
            let uploads = &uploads;
            scope.spawn(move || {
                let mut lease = pool.lease();
                let connection = lease.connection().unwrap();
                connection
                    .call(|session| {
                        session.write_file(&format!("f{index}.txt"), &mut &b"data"[..])
                    })
                    .unwrap();
                uploads.fetch_add(1, Ordering::Relaxed);
            });
        }
    });

    assert_eq!(uploads.load(Ordering::Relaxed), 12);
    assert!(server.peak_concurrent_uploads() <= 3);
    assert!(server.sessions_created() <= 3);
    assert!(pool.dispose().is_ok());
}

#[test]
fn factory_failure_leaves_the_slot_empty() {
    let server = MemoryServer::new();
    server.inject(Operation::Connect, Fault::Status(530), 1);
    let pool = pool(&server, 1);

    let mut lease = pool.lease();
    let error = lease.connection().unwrap_err();
    assert_eq!(error.code(), Some(530));
    assert!(lease.connection().unwrap().session().is_connected());
}

#[test]
fn dispose_reports_leaked_leases() {
    let server = MemoryServer::new();
    let pool = pool(&server, 3);
    std::mem::forget(pool.lease());

    match pool.dispose() {
        Err(PoolError::LeasesOutstanding {
            outstanding,
            capacity,
        }) => {
            assert_eq!(outstanding, 1);
            assert_eq!(capacity, 3);
        }
        other => panic!("unexpected dispose result: {other:?}"),
    }
}

#[test]
fn dispose_collects_every_close_failure() {
    let server = MemoryServer::new();
    let pool = pool(&server, 3);
    {
        let mut first = pool.lease();
        let mut second = pool.lease();
        first.connection().unwrap();
        second.connection().unwrap();
    }
    server.inject(Operation::Close, Fault::Status(421), 2);

    match pool.dispose() {
        Err(PoolError::Close(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().all(|error| error.code() == Some(421)));
        }
        other => panic!("unexpected dispose result: {other:?}"),
    }
    assert_eq!(server.attempts(Operation::Close), 2);
}

#[test]
fn dispose_closes_opened_sessions_only() {
    let server = MemoryServer::new();
    let pool = pool(&server, 4);
    pool.lease().connection().unwrap();

    pool.dispose().unwrap();
    assert_eq!(server.attempts(Operation::Close), 1);
}
