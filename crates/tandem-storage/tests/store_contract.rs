// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour every routing store backend must share, run against both.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tandem_core::{ConversationReference, RoutingStore, TandemError};
use tandem_storage::{Database, InMemoryRoutingStore, SqliteRoutingStore};
use tempfile::TempDir;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn reference(channel: &str, user: &str, conversation: &str) -> ConversationReference {
    ConversationReference::new(channel, user, conversation)
}

fn alice() -> ConversationReference {
    reference("webchat", "alice", "c-alice")
}

fn bob() -> ConversationReference {
    reference("webchat", "bob", "c-bob")
}

fn agent() -> ConversationReference {
    reference("msteams", "agent", "agents")
}

/// A store plus whatever keeps it alive.
struct Subject {
    store: Arc<dyn RoutingStore>,
    _dir: Option<TempDir>,
}

async fn subjects() -> Vec<(&'static str, Subject)> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.db");
    let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
    vec![
        (
            "memory",
            Subject {
                store: Arc::new(InMemoryRoutingStore::new()),
                _dir: None,
            },
        ),
        (
            "sqlite",
            Subject {
                store: Arc::new(SqliteRoutingStore::new(db, "contract")),
                _dir: Some(dir),
            },
        ),
    ]
}

#[tokio::test]
async fn second_request_for_same_user_fails() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_request(&alice(), false, at(0)).await.unwrap();

        let other_thread = reference("webchat", "alice", "c-other");
        let err = store
            .create_request(&other_thread, false, at(1))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyRequested { .. }),
            "{backend}: {err}"
        );
        assert_eq!(store.list_requests().await.unwrap().len(), 1, "{backend}");
    }
}

#[tokio::test]
async fn connected_user_cannot_request() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_connection(&alice(), &agent(), at(0)).await.unwrap();
        let err = store.create_request(&alice(), false, at(1)).await.unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyConnected { .. }),
            "{backend}: {err}"
        );
    }
}

#[tokio::test]
async fn accept_moves_request_into_connection() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_request(&alice(), true, at(0)).await.unwrap();

        let conn = store.accept_request(&alice(), &agent(), at(5)).await.unwrap();
        assert_eq!(conn.reference1, alice(), "{backend}");
        assert_eq!(conn.reference2, agent(), "{backend}");
        assert_eq!(conn.started_at, at(5), "{backend}");
        assert_eq!(conn.last_activity, at(5), "{backend}");

        assert!(store.find_request(&alice()).await.unwrap().is_none(), "{backend}");
        let found = store.find_connection(&agent()).await.unwrap().unwrap();
        assert_eq!(found.id, conn.id, "{backend}");
    }
}

#[tokio::test]
async fn accept_failures_leave_store_unchanged() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;

        let err = store.accept_request(&alice(), &agent(), at(0)).await.unwrap_err();
        assert!(
            matches!(err, TandemError::RequestNotFound { .. }),
            "{backend}: {err}"
        );

        store.create_request(&alice(), false, at(0)).await.unwrap();
        store.create_connection(&bob(), &agent(), at(0)).await.unwrap();
        let err = store.accept_request(&alice(), &agent(), at(1)).await.unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyConnected { .. }),
            "{backend}: {err}"
        );
        assert!(store.find_request(&alice()).await.unwrap().is_some(), "{backend}");
        assert_eq!(store.list_connections().await.unwrap().len(), 1, "{backend}");
    }
}

#[tokio::test]
async fn acceptor_with_own_request_is_rejected() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_request(&alice(), false, at(0)).await.unwrap();
        store.create_request(&bob(), false, at(0)).await.unwrap();
        let err = store.accept_request(&alice(), &bob(), at(1)).await.unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyRequested { .. }),
            "{backend}: {err}"
        );
        assert_eq!(store.list_requests().await.unwrap().len(), 2, "{backend}");
    }
}

#[tokio::test]
async fn separator_in_ids_keeps_users_apart() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        let first = reference("a|b", "c", "x");
        let second = reference("a", "b|c", "y");

        store.create_request(&first, false, at(0)).await.unwrap();
        store.create_request(&second, false, at(1)).await.unwrap();

        let found = store.find_request(&second).await.unwrap().unwrap();
        assert_eq!(found.requestor, second, "{backend}");
        assert_eq!(store.list_requests().await.unwrap().len(), 2, "{backend}");

        let conn = store.accept_request(&second, &agent(), at(2)).await.unwrap();
        assert_eq!(conn.reference1, second, "{backend}");
        assert_eq!(
            store.find_request(&first).await.unwrap().unwrap().requestor,
            first,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn user_cannot_be_connected_to_itself() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_request(&alice(), false, at(0)).await.unwrap();

        let other_thread = reference("webchat", "alice", "c-other");
        let err = store
            .accept_request(&alice(), &other_thread, at(1))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TandemError::SelfConnection { .. }),
            "{backend}: {err}"
        );
        assert!(store.find_request(&alice()).await.unwrap().is_some(), "{backend}");

        let err = store.create_connection(&bob(), &bob(), at(1)).await.unwrap_err();
        assert!(
            matches!(err, TandemError::SelfConnection { .. }),
            "{backend}: {err}"
        );
        assert!(store.list_connections().await.unwrap().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn create_connection_checks_both_legs() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        store.create_request(&bob(), false, at(0)).await.unwrap();
        let err = store
            .create_connection(&agent(), &bob(), at(0))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyRequested { .. }),
            "{backend}: {err}"
        );

        store.create_connection(&alice(), &agent(), at(0)).await.unwrap();
        let err = store
            .create_connection(&reference("msteams", "agent", "dm"), &bob(), at(0))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TandemError::AlreadyConnected { .. }),
            "{backend}: {err}"
        );
    }
}

#[tokio::test]
async fn touch_never_moves_backwards() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        let conn = store.create_connection(&alice(), &agent(), at(0)).await.unwrap();

        let touched = store.touch_connection(&conn, at(100)).await.unwrap().unwrap();
        assert_eq!(touched.last_activity, at(100), "{backend}");

        let stale = store.touch_connection(&conn, at(50)).await.unwrap().unwrap();
        assert_eq!(stale.last_activity, at(100), "{backend}");

        let stored = store.find_connection(&alice()).await.unwrap().unwrap();
        assert_eq!(stored.last_activity, at(100), "{backend}");
    }
}

#[tokio::test]
async fn evict_if_idle_respects_refreshed_activity() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        let conn = store.create_connection(&alice(), &agent(), at(0)).await.unwrap();
        store.touch_connection(&conn, at(100)).await.unwrap();

        // Snapshot says idle since 0, but the stored value was refreshed.
        assert!(!store.evict_if_idle(&conn, at(50)).await.unwrap(), "{backend}");
        assert!(store.evict_if_idle(&conn, at(100)).await.unwrap(), "{backend}");
        assert!(store.find_connection(&alice()).await.unwrap().is_none(), "{backend}");
        assert!(!store.evict_if_idle(&conn, at(200)).await.unwrap(), "{backend}");
    }
}

#[tokio::test]
async fn aggregation_channels_use_strict_identity() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        assert!(store.add_aggregation_channel(&agent()).await.unwrap(), "{backend}");
        assert!(!store.add_aggregation_channel(&agent()).await.unwrap(), "{backend}");

        let other_room = reference("msteams", "agent", "other-room");
        assert!(store.add_aggregation_channel(&other_room).await.unwrap(), "{backend}");
        assert_eq!(
            store.list_aggregation_channels().await.unwrap().len(),
            2,
            "{backend}"
        );

        assert!(store.remove_aggregation_channel(&agent()).await.unwrap(), "{backend}");
        assert!(!store.remove_aggregation_channel(&agent()).await.unwrap(), "{backend}");
    }
}

#[tokio::test]
async fn remove_request_reports_existence() {
    for (backend, subject) in subjects().await {
        let store = &subject.store;
        assert!(!store.remove_request(&alice()).await.unwrap(), "{backend}");
        store.create_request(&alice(), false, at(0)).await.unwrap();
        assert!(
            store
                .remove_request(&reference("webchat", "alice", "elsewhere"))
                .await
                .unwrap(),
            "{backend}"
        );
        assert!(store.list_requests().await.unwrap().is_empty(), "{backend}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_admit_exactly_one() {
    for (backend, subject) in subjects().await {
        let attempts = (0..16).map(|i| {
            let store = Arc::clone(&subject.store);
            let requestor = reference("webchat", "alice", &format!("thread-{i}"));
            tokio::spawn(async move { store.create_request(&requestor, false, at(i)).await })
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(TandemError::AlreadyRequested { .. }))))
            .count();
        assert_eq!(ok, 1, "{backend}");
        assert_eq!(already, 15, "{backend}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_connect_once() {
    for (backend, subject) in subjects().await {
        subject
            .store
            .create_request(&alice(), false, at(0))
            .await
            .unwrap();

        let attempts = (0..8).map(|i| {
            let store = Arc::clone(&subject.store);
            let acceptor = reference("msteams", &format!("agent-{i}"), "agents");
            tokio::spawn(async move { store.accept_request(&alice(), &acceptor, at(1)).await })
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        assert_eq!(ok, 1, "{backend}");
        assert_eq!(
            subject.store.list_connections().await.unwrap().len(),
            1,
            "{backend}"
        );
    }
}
