//! Integration tests for `SqliteStore` against an in-memory database.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use spoke_core::{
  catalog::{ADVENTURES, EVENTS, LIKES_FIELD, RIDERS, ROUTES, default_query},
  document::{Comment, DocumentId, NewDocument, Patch},
  identity::{Identity, IdentityProvider},
  live::{LiveCollection, ViewState},
  mutation::{CounterMode, Mutations, WriteOutcome},
  query::CollectionQuery,
  seed::seed_if_empty,
  session::{AuthSession, AuthState},
  store::{Classify, DocumentStore, FailureKind},
};

use crate::{AccessRules, Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn rider() -> Identity {
  Identity { uid: "u1".into(), display_name: Some("Dawit Abebe".into()) }
}

fn titled(title: &str) -> NewDocument { NewDocument::new().set("title", title) }

/// Wait (bounded) until the view reaches a state matching `pred`.
async fn until(view: &mut LiveCollection, pred: impl Fn(&ViewState) -> bool) -> ViewState {
  tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      let state = view.state();
      if pred(&state) {
        return state;
      }
      if view.changed().await.is_none() {
        return view.state();
      }
    }
  })
  .await
  .expect("view did not reach the expected state")
}

fn titles(state: &ViewState) -> Vec<String> {
  state
    .items
    .iter()
    .filter_map(|d| d.text("title").map(str::to_owned))
    .collect()
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_document() {
  let s = store().await;

  let doc = s
    .add_document(ADVENTURES, titled("Sunset Ridge").server_timestamp("createdAt"))
    .await
    .unwrap();
  assert_eq!(doc.text("title"), Some("Sunset Ridge"));
  assert!(doc.text("createdAt").is_some());

  let fetched = s.get_document(ADVENTURES, &doc.id).await.unwrap().unwrap();
  assert_eq!(fetched, doc);
}

#[tokio::test]
async fn get_document_missing_returns_none() {
  let s = store().await;
  let result = s.get_document(ADVENTURES, &DocumentId::generate()).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn collections_are_isolated() {
  let s = store().await;
  let doc = s.add_document(ADVENTURES, titled("a")).await.unwrap();
  assert!(s.get_document(EVENTS, &doc.id).await.unwrap().is_none());
  let events = s.query(&CollectionQuery::ascending(EVENTS, "title")).await.unwrap();
  assert!(events.is_empty());
}

#[tokio::test]
async fn reserved_id_field_is_rejected() {
  let s = store().await;
  let err = s
    .add_document(ADVENTURES, NewDocument::new().set("id", "mine"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(spoke_core::Error::ReservedField(_))));
  assert_eq!(err.kind(), FailureKind::InvalidArgument);
}

#[tokio::test]
async fn invalid_collection_name_is_rejected() {
  let s = store().await;
  let err = s.add_document("bad name", titled("x")).await.unwrap_err();
  assert!(matches!(err, Error::Core(spoke_core::Error::InvalidName(_))));
}

#[tokio::test]
async fn update_missing_document_is_not_found() {
  let s = store().await;
  let err = s
    .update_document(ADVENTURES, &DocumentId::from("nope"), Patch::new().increment(LIKES_FIELD, 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DocumentNotFound { .. }));
  assert_eq!(err.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn update_applies_every_field_update() {
  let s = store().await;
  let doc = s
    .add_document(ADVENTURES, titled("a").set(LIKES_FIELD, 3).set("tags", json!(["gravel"])))
    .await
    .unwrap();

  let patch = Patch::new()
    .increment(LIKES_FIELD, 2)
    .array_union("tags", json!("gravel"))
    .array_union("tags", json!("night"))
    .set("title", "b");
  let updated = s.update_document(ADVENTURES, &doc.id, patch).await.unwrap();

  assert_eq!(updated.counter(LIKES_FIELD), 5);
  assert_eq!(updated.get("tags"), Some(&json!(["gravel", "night"])));
  assert_eq!(updated.text("title"), Some("b"));
  assert_eq!(s.get_document(ADVENTURES, &doc.id).await.unwrap(), Some(updated));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_orders_ascending_and_descending() {
  let s = store().await;
  for (name, points) in [("b", 20), ("a", 30), ("c", 10)] {
    s.add_document(RIDERS, NewDocument::new().set("name", name).set("points", points))
      .await
      .unwrap();
  }

  let names = |docs: Vec<spoke_core::document::Document>| {
    docs.iter().filter_map(|d| d.text("name").map(str::to_owned)).collect::<Vec<_>>()
  };

  let desc = s.query(&CollectionQuery::descending(RIDERS, "points")).await.unwrap();
  assert_eq!(names(desc), ["a", "b", "c"]);

  let asc = s.query(&CollectionQuery::ascending(RIDERS, "points")).await.unwrap();
  assert_eq!(names(asc), ["c", "b", "a"]);
}

#[tokio::test]
async fn equal_keys_keep_insertion_order() {
  let s = store().await;
  for title in ["first", "second", "third"] {
    s.add_document(ROUTES, titled(title).set("position", 1)).await.unwrap();
  }
  let docs = s.query(&CollectionQuery::ascending(ROUTES, "position")).await.unwrap();
  let got: Vec<_> = docs.iter().filter_map(|d| d.text("title")).collect();
  assert_eq!(got, ["first", "second", "third"]);
}

#[tokio::test]
async fn documents_without_order_field_are_left_out() {
  let s = store().await;
  s.add_document(EVENTS, titled("undated")).await.unwrap();
  s.add_document(EVENTS, titled("dated").set("date", "2024-10-20")).await.unwrap();
  s.add_document(EVENTS, titled("null date").set("date", json!(null))).await.unwrap();

  let docs = s.query(&default_query(EVENTS).unwrap()).await.unwrap();
  let got: Vec<_> = docs.iter().filter_map(|d| d.text("title")).collect();
  assert_eq!(got, ["null date", "dated"]);
  assert!(s.get_document(EVENTS, &docs[0].id).await.unwrap().is_some());
}

#[tokio::test]
async fn server_timestamps_order_newest_first() {
  let s = store().await;
  for title in ["old", "mid", "new"] {
    s.add_document(ADVENTURES, titled(title).server_timestamp("createdAt")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
  }
  let docs = s.query(&default_query(ADVENTURES).unwrap()).await.unwrap();
  let got: Vec<_> = docs.iter().filter_map(|d| d.text("title")).collect();
  assert_eq!(got, ["new", "mid", "old"]);
}

// ─── Access rules ────────────────────────────────────────────────────────────

#[tokio::test]
async fn locked_collection_denies_everything() {
  let s = store().await.with_access_rules(AccessRules::open().lock(EVENTS));

  let err = s.add_document(EVENTS, titled("x")).await.unwrap_err();
  assert!(err.is_permission_denied());

  let err = s.query(&CollectionQuery::ascending(EVENTS, "date")).await.unwrap_err();
  assert!(err.is_permission_denied());

  let err = s.subscribe(CollectionQuery::ascending(EVENTS, "date")).await.unwrap_err();
  assert!(err.is_permission_denied());

  assert!(s.add_document(ADVENTURES, titled("x")).await.is_ok());
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn subscription_pushes_initial_and_updated_snapshots() {
  let s = store().await;
  s.add_document(ROUTES, titled("one").set("position", 1)).await.unwrap();

  let mut sub = s.subscribe(CollectionQuery::ascending(ROUTES, "position")).await.unwrap();
  let first = sub.next().await.unwrap().unwrap();
  assert_eq!(first.len(), 1);

  s.add_document(ROUTES, titled("two").set("position", 2)).await.unwrap();
  let second = sub.next().await.unwrap().unwrap();
  assert_eq!(second.len(), 2);
  assert_eq!(second.documents[1].text("title"), Some("two"));
}

#[tokio::test]
async fn subscription_ignores_other_collections() {
  let s = store().await;
  let mut sub = s.subscribe(CollectionQuery::ascending(ROUTES, "position")).await.unwrap();
  assert!(sub.next().await.unwrap().unwrap().is_empty());

  s.add_document(EVENTS, titled("elsewhere")).await.unwrap();
  s.add_document(ROUTES, titled("here").set("position", 1)).await.unwrap();

  let next = sub.next().await.unwrap().unwrap();
  assert_eq!(next.len(), 1);
  assert_eq!(next.documents[0].text("title"), Some("here"));
}

#[tokio::test]
async fn dropping_subscription_stops_its_pump() {
  let s = store().await;
  let mut sub = s.subscribe(CollectionQuery::ascending(ROUTES, "position")).await.unwrap();
  sub.next().await.unwrap().unwrap();
  assert_eq!(s.listeners(), 1);

  drop(sub);
  tokio::time::timeout(Duration::from_secs(5), async {
    while s.listeners() > 0 {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  })
  .await
  .expect("pump still running");
}

// ─── Live collections ────────────────────────────────────────────────────────

#[tokio::test]
async fn live_view_starts_empty_then_shows_created_item() {
  let s = Arc::new(store().await);
  let mutations = Mutations::new(s.clone());

  let mut view = LiveCollection::open(&*s, default_query(ADVENTURES).unwrap()).await;
  let state = view.loaded().await;
  assert!(!state.loading);
  assert!(state.items.is_empty());
  assert!(state.error.is_none());

  let created = mutations.create_item(&rider(), ADVENTURES, titled("Morning Ride")).await.unwrap();
  assert!(created.text("createdAt").is_some());

  let state = until(&mut view, |s| s.items.len() == 1).await;
  assert_eq!(titles(&state), ["Morning Ride"]);
  assert_eq!(state.items[0].id, created.id);
}

#[tokio::test]
async fn live_view_replaces_mirror_on_every_snapshot() {
  let s = Arc::new(store().await);
  let a = s.add_document(ROUTES, titled("a").set("position", 2)).await.unwrap();

  let mut view = LiveCollection::open(&*s, default_query(ROUTES).unwrap()).await;
  view.loaded().await;

  s.add_document(ROUTES, titled("b").set("position", 1)).await.unwrap();
  let state = until(&mut view, |s| s.items.len() == 2).await;
  assert_eq!(titles(&state), ["b", "a"]);

  s.update_document(ROUTES, &a.id, Patch::new().set("position", 0)).await.unwrap();
  let state = until(&mut view, |s| titles(s) == ["a", "b"]).await;
  assert_eq!(state.items.len(), 2);
}

#[tokio::test]
async fn live_view_reports_permission_denied() {
  let s = store().await.with_access_rules(AccessRules::open().lock(RIDERS));
  let mut view = LiveCollection::open(&s, default_query(RIDERS).unwrap()).await;
  let state = view.loaded().await;
  assert!(!state.loading);
  assert!(state.items.is_empty());
  assert!(state.error.unwrap().is_permission_denied());
}

#[tokio::test]
async fn closing_live_view_releases_subscription() {
  let s = store().await;
  let mut view = LiveCollection::open(&s, default_query(ROUTES).unwrap()).await;
  view.loaded().await;
  assert_eq!(s.listeners(), 1);

  view.close();
  tokio::time::timeout(Duration::from_secs(5), async {
    while s.listeners() > 0 {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  })
  .await
  .expect("subscription still open");
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn like_increments_counter() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s.clone());
  let doc = s
    .add_document(ADVENTURES, titled("a").set(LIKES_FIELD, 5).server_timestamp("createdAt"))
    .await
    .unwrap();

  let mut view = LiveCollection::open(&*s, default_query(ADVENTURES).unwrap()).await;
  let state = until(&mut view, |s| s.items.len() == 1).await;
  assert_eq!(state.items[0].counter(LIKES_FIELD), 5);

  let updated = m.increment_counter(&rider(), ADVENTURES, &doc.id, LIKES_FIELD, 5).await.unwrap();
  assert_eq!(updated.counter(LIKES_FIELD), 6);

  let state = until(&mut view, |s| s.items.first().is_some_and(|d| d.counter(LIKES_FIELD) == 6)).await;
  assert_eq!(state.items[0].id, doc.id);
  view.close();
}

#[tokio::test]
async fn racing_likes_with_observed_value_lose_an_update() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s.clone()).with_counter_mode(CounterMode::ObservedPlusOne);
  let doc = s.add_document(ADVENTURES, titled("a").set(LIKES_FIELD, 10)).await.unwrap();

  let who = rider();
  let (a, b) = tokio::join!(
    m.increment_counter(&who, ADVENTURES, &doc.id, LIKES_FIELD, 10),
    m.increment_counter(&who, ADVENTURES, &doc.id, LIKES_FIELD, 10),
  );
  a.unwrap();
  b.unwrap();

  let stored = s.get_document(ADVENTURES, &doc.id).await.unwrap().unwrap();
  assert_eq!(stored.counter(LIKES_FIELD), 11);
}

#[tokio::test]
async fn racing_atomic_likes_both_count() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s.clone());
  assert_eq!(m.counter_mode(), CounterMode::Atomic);
  let doc = s.add_document(ADVENTURES, titled("a").set(LIKES_FIELD, 10)).await.unwrap();

  let who = rider();
  let (a, b) = tokio::join!(
    m.increment_counter(&who, ADVENTURES, &doc.id, LIKES_FIELD, 10),
    m.increment_counter(&who, ADVENTURES, &doc.id, LIKES_FIELD, 10),
  );
  a.unwrap();
  b.unwrap();

  let stored = s.get_document(ADVENTURES, &doc.id).await.unwrap().unwrap();
  assert_eq!(stored.counter(LIKES_FIELD), 12);
}

#[tokio::test]
async fn blank_append_leaves_document_unchanged() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s.clone());
  let doc = s.add_document(ADVENTURES, titled("a").set("tags", json!([]))).await.unwrap();

  let outcome = m
    .append_to_list(&rider(), ADVENTURES, &doc.id, "tags", json!("   "))
    .await
    .unwrap();
  assert_eq!(outcome, WriteOutcome::Skipped);

  let stored = s.get_document(ADVENTURES, &doc.id).await.unwrap().unwrap();
  assert_eq!(stored, doc);
}

#[tokio::test]
async fn append_to_missing_document_fails() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s);
  let err = m
    .append_to_list(&rider(), ADVENTURES, &DocumentId::from("gone"), "tags", json!("x"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn comments_are_appended_with_author() {
  let s = Arc::new(store().await);
  let m = Mutations::new(s.clone());
  let doc = s
    .add_document(ADVENTURES, titled("a").set(Comment::FIELD, json!([])))
    .await
    .unwrap();

  let outcome = m.add_comment(&rider(), ADVENTURES, &doc.id, "Great ride!").await.unwrap();
  assert!(outcome.is_written());
  assert_eq!(m.add_comment(&rider(), ADVENTURES, &doc.id, " ").await.unwrap(), WriteOutcome::Skipped);

  let stored = s.get_document(ADVENTURES, &doc.id).await.unwrap().unwrap();
  let comments = stored.comments();
  assert_eq!(comments.len(), 1);
  assert_eq!(comments[0].user, "Dawit Abebe");
  assert_eq!(comments[0].text, "Great ride!");
}

// ─── Seeding ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn seeding_only_fills_empty_collections() {
  let s = store().await;
  s.add_document(RIDERS, NewDocument::new().set("name", "me").set("points", 1)).await.unwrap();

  let report = seed_if_empty(&s).await.unwrap();
  assert!(report.total() > 0);
  assert!(report.written.iter().all(|(c, _)| *c != RIDERS));

  let riders = s.query(&default_query(RIDERS).unwrap()).await.unwrap();
  assert_eq!(riders.len(), 1);

  let again = seed_if_empty(&s).await.unwrap();
  assert_eq!(again.total(), 0);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_sign_in_and_resolve() {
  let s = store().await;

  let session = s.sign_up("Rider@Example.com", "secret1", "Helen Kassa").await.unwrap();
  assert_eq!(session.identity.display_name.as_deref(), Some("Helen Kassa"));
  let resolved = s.resolve(&session.token).await.unwrap();
  assert_eq!(resolved, Some(session.identity.clone()));

  let again = s.sign_in("rider@example.com", "secret1").await.unwrap();
  assert_eq!(again.identity, session.identity);
  assert_ne!(again.token, session.token);

  s.sign_out(&session.token).await.unwrap();
  assert!(s.resolve(&session.token).await.unwrap().is_none());
  assert!(s.resolve(&again.token).await.unwrap().is_some());
}

#[tokio::test]
async fn sign_up_errors_are_distinct() {
  let s = store().await;

  let err = s.sign_up("rider@example.com", "12345", "x").await.unwrap_err();
  assert!(matches!(err, Error::WeakPassword(6)));

  let err = s.sign_up("not-an-email", "secret1", "x").await.unwrap_err();
  assert!(matches!(err, Error::InvalidEmail));

  s.sign_up("rider@example.com", "secret1", "x").await.unwrap();
  let err = s.sign_up("RIDER@example.com", "secret2", "y").await.unwrap_err();
  assert!(matches!(err, Error::EmailInUse));
  assert_eq!(err.kind(), FailureKind::InvalidArgument);
}

#[tokio::test]
async fn sign_in_rejects_bad_credentials() {
  let s = store().await;
  s.sign_up("rider@example.com", "secret1", "").await.unwrap();

  let err = s.sign_in("rider@example.com", "wrong-pass").await.unwrap_err();
  assert!(matches!(err, Error::InvalidCredentials));
  let err = s.sign_in("nobody@example.com", "secret1").await.unwrap_err();
  assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn unknown_token_resolves_to_none() {
  let s = store().await;
  assert!(s.resolve("not-a-token").await.unwrap().is_none());
  s.sign_out("not-a-token").await.unwrap();
}

#[tokio::test]
async fn auth_session_tracks_provider_state() {
  let s = Arc::new(store().await);
  let session = AuthSession::new(s.clone());
  assert_eq!(session.state(), AuthState::Loading);

  assert_eq!(session.restore(None).await.unwrap(), AuthState::SignedOut);

  let who = session.sign_up("rider@example.com", "secret1", "Robel Haile").await.unwrap();
  assert_eq!(session.current(), Some(who.clone()));
  let token = session.token().unwrap();

  session.sign_out().await;
  assert_eq!(session.state(), AuthState::SignedOut);
  assert!(s.resolve(&token).await.unwrap().is_none());
}
