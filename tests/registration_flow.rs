//! End-to-end coverage of the watch registration flow against a real
//! (in-memory) database.

mod support;

use product_watcher::domain::errors::WatchError;
use product_watcher::domain::repositories::{ProductRepository, SortBy, SortOrder};
use product_watcher::domain::store::Store;

use support::{create_user, snapshot, test_env, PageState};

const ZARA_URL: &str = "https://www.zara.com/es/en/shirt-p100.html";

#[tokio::test]
async fn watching_a_new_url_creates_the_product_with_its_first_history_row() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;

    let watched = env
        .registration
        .watch_product("u1", ZARA_URL, "s, m")
        .await
        .unwrap();
    assert_eq!(watched.product.store, Store::Zara);
    assert_eq!(watched.product.current_price, 1999);
    assert_eq!(watched.sizes_to_watch, "S,M");

    let detail = env
        .registration
        .product_detail("u1", &watched.product.id)
        .await
        .unwrap();
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].current_price, 1999);
}

#[tokio::test]
async fn second_watcher_attaches_to_the_existing_product() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    create_user(&env, "u2", "u2@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;

    let first = env
        .registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap();
    let second = env
        .registration
        .watch_product("u2", ZARA_URL, "M")
        .await
        .unwrap();
    assert_eq!(first.product.id, second.product.id);

    let watchers = env.products.watchers_of(&first.product.id).await.unwrap();
    assert_eq!(watchers.len(), 2);
}

#[tokio::test]
async fn watching_the_same_product_twice_is_rejected() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;

    env.registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap();
    let error = env
        .registration
        .watch_product("u1", ZARA_URL, "M")
        .await
        .unwrap_err();
    assert!(matches!(error, WatchError::AlreadyWatching { .. }));
}

#[tokio::test]
async fn registration_refreshes_a_stale_stored_product() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    create_user(&env, "u2", "u2@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;
    let first = env
        .registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap();

    // The store changed the price between the two registrations.
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1499, "S,M")))
        .await;
    let second = env
        .registration
        .watch_product("u2", ZARA_URL, "M")
        .await
        .unwrap();
    assert_eq!(second.product.id, first.product.id);
    assert_eq!(second.product.current_price, 1499);

    let detail = env
        .registration
        .product_detail("u1", &first.product.id)
        .await
        .unwrap();
    assert_eq!(detail.history.len(), 2);
}

#[tokio::test]
async fn validation_errors_are_surfaced() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;

    let unsupported = env
        .registration
        .watch_product("u1", "https://www.example-store.com/p/1", "S")
        .await
        .unwrap_err();
    assert!(matches!(unsupported, WatchError::StoreNotSupported { .. }));

    env.scraper.set_page(ZARA_URL, PageState::NoProductData).await;
    let missing = env
        .registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap_err();
    assert!(matches!(missing, WatchError::ProductNotFound { .. }));

    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;
    let unavailable = env
        .registration
        .watch_product("u1", ZARA_URL, "S,XXL")
        .await
        .unwrap_err();
    assert!(matches!(unavailable, WatchError::SizesNotAvailable { .. }));

    let unknown_user = env
        .registration
        .watch_product("ghost", ZARA_URL, "S")
        .await
        .unwrap_err();
    assert!(matches!(unknown_user, WatchError::UserNotFound { .. }));
}

#[tokio::test]
async fn unwatching_deletes_the_product_only_when_the_last_watcher_leaves() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    create_user(&env, "u2", "u2@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;
    let watched = env
        .registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap();
    env.registration
        .watch_product("u2", ZARA_URL, "M")
        .await
        .unwrap();

    let removed = env
        .registration
        .unwatch_product("u1", &watched.product.id)
        .await
        .unwrap();
    assert!(!removed.product_deleted);
    assert!(env
        .products
        .find_by_store_item(Store::Zara, "p-100")
        .await
        .unwrap()
        .is_some());

    let removed = env
        .registration
        .unwatch_product("u2", &watched.product.id)
        .await
        .unwrap();
    assert!(removed.product_deleted);
    assert!(env
        .products
        .find_by_store_item(Store::Zara, "p-100")
        .await
        .unwrap()
        .is_none());

    let error = env
        .registration
        .unwatch_product("u2", &watched.product.id)
        .await
        .unwrap_err();
    assert!(matches!(error, WatchError::WatchNotFound { .. }));
}

#[tokio::test]
async fn updating_watched_sizes_validates_against_the_product_vocabulary() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    env.scraper
        .set_page(ZARA_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;
    let watched = env
        .registration
        .watch_product("u1", ZARA_URL, "S")
        .await
        .unwrap();

    let updated = env
        .registration
        .update_watch_sizes("u1", &watched.product.id, "m,xs")
        .await
        .unwrap();
    assert_eq!(updated.sizes_to_watch, "XS,M");

    let error = env
        .registration
        .update_watch_sizes("u1", &watched.product.id, "XXL")
        .await
        .unwrap_err();
    assert!(matches!(error, WatchError::SizesNotAvailable { .. }));
}

#[tokio::test]
async fn listing_pages_and_sorts_the_users_products() {
    let env = test_env().await;
    create_user(&env, "u1", "u1@example.com").await;
    for (index, name) in ["Anorak", "Boots", "Cardigan"].iter().enumerate() {
        let url = format!("https://www.zara.com/es/en/{name}-p{index}.html");
        env.scraper
            .set_page(
                &url,
                PageState::Product(snapshot(&format!("p-{index}"), name, 1000, "S,M")),
            )
            .await;
        env.registration
            .watch_product("u1", &url, "S")
            .await
            .unwrap();
    }

    let (page, total) = env
        .registration
        .products_of_user("u1", SortBy::Name, SortOrder::Asc, 2, 0)
        .await
        .unwrap();
    assert_eq!(total, 3);
    let names: Vec<&str> = page.iter().map(|entry| entry.product.name.as_str()).collect();
    assert_eq!(names, vec!["Anorak", "Boots"]);

    let (rest, _) = env
        .registration
        .products_of_user("u1", SortBy::Name, SortOrder::Asc, 2, 2)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].product.name, "Cardigan");
}
