#![allow(unused_crate_dependencies)]

use std::sync::Arc;

use normalized_cache::{
    Cache, CacheError, Field, GarbageCollector, IdentityResolver, ListInfo, RecordId, ScalarRegistry, SelectionSet,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_stream::StreamExt;

fn selection<const N: usize>(fields: [(&str, Field); N]) -> SelectionSet {
    fields.into_iter().map(|(alias, field)| (alias.to_string(), field)).collect()
}

fn first_names() -> Arc<SelectionSet> {
    Arc::new(selection([(
        "viewer",
        Field::object(
            "viewer",
            "User",
            [("id", Field::scalar("id", "ID")), ("firstName", Field::scalar("firstName", "String"))],
        ),
    )]))
}

fn avatars() -> Arc<SelectionSet> {
    Arc::new(selection([(
        "viewer",
        Field::object(
            "viewer",
            "User",
            [("id", Field::scalar("id", "ID")), ("avatar", Field::scalar("avatar", "String"))],
        ),
    )]))
}

fn no_variables() -> Value {
    json!({})
}

fn cache(buffer_size: usize) -> Cache {
    Cache::new(
        IdentityResolver::default(),
        Arc::new(ScalarRegistry::default()),
        GarbageCollector::new(buffer_size),
    )
}

#[tokio::test]
async fn subscribers_get_the_new_value() {
    let cache = cache(10);
    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    let mut subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);
    let initial = subscription.next().await.unwrap();
    assert_eq!(initial.data, json!({"viewer": {"id": "1", "firstName": "Ada"}}));

    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Grace"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    let update = subscription.next().await.unwrap();
    assert_eq!(update.data, json!({"viewer": {"id": "1", "firstName": "Grace"}}));
    assert!(!update.has_missing);
}

#[test]
fn only_readers_of_the_changed_field_are_notified() {
    let cache = cache(10);
    let response = json!({"viewer": {"id": "1", "firstName": "Ada", "avatar": "ada.png"}});
    cache
        .write(&first_names(), &response, &RecordId::root(), &no_variables())
        .unwrap();
    cache
        .write(&avatars(), &response, &RecordId::root(), &no_variables())
        .unwrap();

    let mut names = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);
    let mut pictures = cache.subscribe(avatars(), RecordId::root(), no_variables(), false);
    assert!(names.try_next().is_some());
    assert!(pictures.try_next().is_some());

    cache
        .write(
            &avatars(),
            &json!({"viewer": {"id": "1", "avatar": "grace.png"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    assert!(names.try_next().is_none());
    assert_eq!(
        pictures.try_next().unwrap().data,
        json!({"viewer": {"id": "1", "avatar": "grace.png"}})
    );

    // The same response again changes nothing.
    cache
        .write(
            &avatars(),
            &json!({"viewer": {"id": "1", "avatar": "grace.png"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();
    assert!(pictures.try_next().is_none());
}

#[test]
fn subscriptions_follow_their_latest_read() {
    let cache = cache(10);
    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    let mut subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);
    subscription.try_next();

    // The viewer is now someone else.
    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "2", "firstName": "Grace"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();
    assert_eq!(
        subscription.try_next().unwrap().data,
        json!({"viewer": {"id": "2", "firstName": "Grace"}})
    );

    // The previous viewer is not a dependency anymore.
    cache
        .write(
            &selection([("firstName", Field::scalar("firstName", "String"))]),
            &json!({"firstName": "Augusta"}),
            &RecordId::from("User:1"),
            &no_variables(),
        )
        .unwrap();
    assert!(subscription.try_next().is_none());
}

#[test]
fn waiting_for_missing_data() {
    let cache = cache(10);

    let mut subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);
    let initial = subscription.try_next().unwrap();
    assert!(initial.has_missing);
    assert_eq!(initial.data, json!({"viewer": null}));

    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    let update = subscription.try_next().unwrap();
    assert!(!update.has_missing);
}

#[test]
fn garbage_collection_spares_live_queries() {
    for buffer_size in [0, 1, 3] {
        let cache = cache(buffer_size);
        cache
            .write(
                &first_names(),
                &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
                &RecordId::root(),
                &no_variables(),
            )
            .unwrap();
        cache
            .write(
                &selection([(
                    "book",
                    Field::object("book", "Book", [("id", Field::scalar("id", "ID"))]),
                )]),
                &json!({"book": {"id": "7"}}),
                &RecordId::root(),
                &no_variables(),
            )
            .unwrap();

        let subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);

        for _ in 0..buffer_size + 2 {
            cache.collect_garbage();
        }

        assert!(cache.contains(&RecordId::from("User:1")), "buffer size {buffer_size}");
        assert!(!cache.contains(&RecordId::from("Book:7")), "buffer size {buffer_size}");

        drop(subscription);
        for _ in 0..buffer_size + 2 {
            cache.collect_garbage();
        }
        assert!(!cache.contains(&RecordId::from("User:1")), "buffer size {buffer_size}");
    }
}

#[test]
fn list_edits_notify() {
    let favorites = Arc::new(selection([(
        "viewer",
        Field::object(
            "viewer",
            "User",
            [
                ("id", Field::scalar("id", "ID")),
                (
                    "favorites",
                    Field::object("favorites", "Book", [("id", Field::scalar("id", "ID"))])
                        .with_list(ListInfo::new("Viewer_favorites", "Book")),
                ),
            ],
        ),
    )]));

    let cache = cache(10);
    cache
        .write(
            &favorites,
            &json!({"viewer": {"id": "1", "favorites": []}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();

    let mut subscription = cache.subscribe(favorites.clone(), RecordId::root(), no_variables(), false);
    subscription.try_next();

    let list = cache.list("Viewer_favorites");
    let book = selection([("id", Field::scalar("id", "ID"))]);
    list.append(&book, &json!({"id": "1"}), &no_variables()).unwrap();
    list.prepend(&book, &json!({"id": "2"}), &no_variables()).unwrap();

    let mut latest = None;
    while let Some(outcome) = subscription.try_next() {
        latest = Some(outcome);
    }
    assert_eq!(
        latest.unwrap().data,
        json!({"viewer": {"id": "1", "favorites": [{"id": "2"}, {"id": "1"}]}})
    );

    assert!(list.contains(&RecordId::from("Book:1")).unwrap());
    list.remove(&RecordId::from("Book:1")).unwrap();
    assert_eq!(
        subscription.try_next().unwrap().data,
        json!({"viewer": {"id": "1", "favorites": [{"id": "2"}]}})
    );

    assert_eq!(
        cache.list("Nope").remove(&RecordId::from("Book:1")).unwrap_err(),
        CacheError::UnknownList("Nope".into())
    );
}

#[test]
fn reset_empties_everything() {
    let cache = cache(10);
    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();
    let mut subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), false);
    subscription.try_next();

    cache.reset();

    assert!(cache.is_empty());
    let outcome = subscription.try_next().unwrap();
    assert!(outcome.has_missing);
    assert_eq!(outcome.data, json!({"viewer": null}));
}

#[test]
fn deleting_a_record_notifies_its_readers() {
    let cache = cache(10);
    cache
        .write(
            &first_names(),
            &json!({"viewer": {"id": "1", "firstName": "Ada"}}),
            &RecordId::root(),
            &no_variables(),
        )
        .unwrap();
    let mut subscription = cache.subscribe(first_names(), RecordId::root(), no_variables(), true);
    subscription.try_next();

    assert!(cache.delete(&RecordId::from("User:1")));
    assert!(!cache.delete(&RecordId::from("User:1")));

    let outcome = subscription.try_next().unwrap();
    assert!(outcome.has_missing);
    assert_eq!(outcome.data, json!({}));
}
