//! End-to-end coverage of the periodic watch cycle: scrape, detect, persist,
//! group and notify.

mod support;

use product_watcher::domain::repositories::ProductRepository;
use product_watcher::domain::store::Store;

use support::{create_user, snapshot, test_env, PageState, TestEnv};

const SHIRT_URL: &str = "https://www.zara.com/es/en/shirt-p100.html";
const BOOTS_URL: &str = "https://www.bershka.com/es/boots-p200.html";

/// u1 watches both products, u2 watches only the shirt.
async fn seed_two_products(env: &TestEnv) -> (String, String) {
    create_user(env, "u1", "u1@example.com").await;
    create_user(env, "u2", "u2@example.com").await;
    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 1999, "S,M")))
        .await;
    env.scraper
        .set_page(BOOTS_URL, PageState::Product(snapshot("p-200", "Boots", 5999, "S,M")))
        .await;

    let shirt = env
        .registration
        .watch_product("u1", SHIRT_URL, "S")
        .await
        .unwrap()
        .product;
    env.registration
        .watch_product("u2", SHIRT_URL, "M")
        .await
        .unwrap();
    let boots = env
        .registration
        .watch_product("u1", BOOTS_URL, "S")
        .await
        .unwrap()
        .product;
    (shirt.id, boots.id)
}

#[tokio::test]
async fn unchanged_catalog_yields_no_updates_and_no_mail() {
    let env = test_env().await;
    seed_two_products(&env).await;

    let report = env.watcher.run_cycle().await.unwrap();
    assert_eq!(report.message(), "No products were updated.");
    assert_eq!(report.emails_sent, 0);
    assert!(env.mailer.mails().await.is_empty());
}

#[tokio::test]
async fn changed_products_are_persisted_and_grouped_into_one_mail_per_user() {
    let env = test_env().await;
    let (shirt_id, boots_id) = seed_two_products(&env).await;

    // Both products change: the shirt drops in price, the boots restock.
    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 1499, "S,M")))
        .await;
    env.scraper
        .set_page(BOOTS_URL, PageState::Product(snapshot("p-200", "Boots", 5999, "XS,S,M")))
        .await;

    let report = env.watcher.run_cycle().await.unwrap();
    let mut updated = report.updated_product_ids.clone();
    updated.sort();
    let mut expected = vec![shirt_id.clone(), boots_id.clone()];
    expected.sort();
    assert_eq!(updated, expected);
    assert_eq!(report.emails_sent, 2);

    let stored = env
        .products
        .find_by_store_item(Store::Zara, "p-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_price, 1499);
    let history = env
        .registration
        .product_detail("u1", &shirt_id)
        .await
        .unwrap()
        .history;
    assert_eq!(history.len(), 2);

    // One e-mail per user, each covering exactly that user's products.
    let mails = env.mailer.mails().await;
    assert_eq!(mails.len(), 2);
    let to_u1 = mails.iter().find(|mail| mail.to == "u1@example.com").unwrap();
    assert!(to_u1.html.contains("Shirt"));
    assert!(to_u1.html.contains("Boots"));
    assert!(to_u1.html.contains("€14.99"));
    let to_u2 = mails.iter().find(|mail| mail.to == "u2@example.com").unwrap();
    assert!(to_u2.html.contains("Shirt"));
    assert!(!to_u2.html.contains("Boots"));
    assert_eq!(to_u2.subject, "Available Products");
}

#[tokio::test]
async fn a_second_cycle_over_the_same_state_is_idempotent() {
    let env = test_env().await;
    seed_two_products(&env).await;
    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 1499, "S,M")))
        .await;

    let first = env.watcher.run_cycle().await.unwrap();
    assert_eq!(first.updated_product_ids.len(), 1);

    let second = env.watcher.run_cycle().await.unwrap();
    assert_eq!(second.message(), "No products were updated.");
    assert_eq!(env.mailer.mails().await.len(), 2);
}

#[tokio::test]
async fn a_failing_scrape_never_aborts_the_cycle_or_touches_stored_state() {
    let env = test_env().await;
    let (shirt_id, boots_id) = seed_two_products(&env).await;
    env.scraper.set_page(SHIRT_URL, PageState::FetchFails).await;
    env.scraper
        .set_page(BOOTS_URL, PageState::Product(snapshot("p-200", "Boots", 4999, "S,M")))
        .await;

    let report = env.watcher.run_cycle().await.unwrap();
    assert_eq!(report.updated_product_ids, vec![boots_id]);

    // The failing product keeps its stored values and picks the change up
    // once the page recovers.
    let shirt = env
        .products
        .find_by_store_item(Store::Zara, "p-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shirt.current_price, 1999);

    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 999, "S,M")))
        .await;
    let recovery = env.watcher.run_cycle().await.unwrap();
    assert_eq!(recovery.updated_product_ids, vec![shirt_id]);
}

#[tokio::test]
async fn a_page_without_product_data_counts_as_unchanged() {
    let env = test_env().await;
    seed_two_products(&env).await;
    env.scraper.set_page(SHIRT_URL, PageState::NoProductData).await;
    env.scraper.set_page(BOOTS_URL, PageState::NoProductData).await;

    let report = env.watcher.run_cycle().await.unwrap();
    assert_eq!(report.message(), "No products were updated.");
}

#[tokio::test]
async fn overlapping_cycle_invocations_serialize_instead_of_double_notifying() {
    let env = test_env().await;
    seed_two_products(&env).await;
    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 1499, "S,M")))
        .await;

    // Scheduled run and manual trigger racing: the second waits on the cycle
    // guard and then sees the already-persisted state.
    let (first, second) = tokio::join!(env.watcher.run_cycle(), env.watcher.run_cycle());
    let mut update_counts = [
        first.unwrap().updated_product_ids.len(),
        second.unwrap().updated_product_ids.len(),
    ];
    update_counts.sort_unstable();
    assert_eq!(update_counts, [0, 1]);
    assert_eq!(env.mailer.mails().await.len(), 2);
}

#[tokio::test]
async fn one_users_mail_failure_never_blocks_the_others() {
    let env = test_env().await;
    seed_two_products(&env).await;
    env.mailer.fail_for("u1@example.com").await;
    env.scraper
        .set_page(SHIRT_URL, PageState::Product(snapshot("p-100", "Shirt", 1499, "S,M")))
        .await;

    let report = env.watcher.run_cycle().await.unwrap();
    assert_eq!(report.updated_product_ids.len(), 1);
    assert_eq!(report.emails_sent, 1);

    let mails = env.mailer.mails().await;
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "u2@example.com");

    // The update is already persisted: the dropped notification is not
    // resent on the next cycle.
    let retry = env.watcher.run_cycle().await.unwrap();
    assert_eq!(retry.message(), "No products were updated.");
}
