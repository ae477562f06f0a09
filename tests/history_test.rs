//! History Integration Tests
//!
//! Paging through payments served by the Horizon mock and the dust filter
//! applied to what the view shows.
//!
//! Run with: cargo test --test history_test -- --nocapture

mod common;

use account_viewer::horizon::{Direction, HistoryKind};
use account_viewer::{Amount, HorizonClient, Keypair, LedgerApi};
use common::{keypair, TestEnv};
use horizon_mock::PaymentJson;

const CREATED_AT: &str = "2023-11-01T00:00:00Z";

async fn viewer_env() -> anyhow::Result<(TestEnv, Keypair, Keypair)> {
    let env = TestEnv::new().await?;
    let viewer = keypair(30);
    let other = keypair(31);
    env.ledger
        .add_account(&viewer.public_key().account_id(), "1000.0000000", 9)
        .await;
    env.session.sign_in_with_secret(&viewer.secret_seed()).await?;
    Ok((env, viewer, other))
}

#[tokio::test]
async fn test_history_pages_newest_first() -> anyhow::Result<()> {
    let (env, viewer, other) = viewer_env().await?;
    let me = viewer.public_key().account_id();
    let them = other.public_key().account_id();

    for id in 1..=150u64 {
        env.ledger
            .add_payment(PaymentJson::native(id, &them, &me, "2.0000000", CREATED_AT))
            .await;
    }

    env.session.load_history(false).await?;
    let state = env.session.snapshot().await;
    assert_eq!(state.history.entries.len(), 100);
    assert_eq!(state.history.entries[0].id, "150");
    assert_eq!(state.history.entries[99].id, "51");
    assert_eq!(state.history.next_cursor.as_deref(), Some("51"));
    assert!(!state.history.complete);

    env.session.load_history(true).await?;
    let state = env.session.snapshot().await;
    assert_eq!(state.history.entries.len(), 150);
    assert_eq!(state.history.entries[149].id, "1");
    assert!(state.history.complete);

    // Nothing further to load
    env.session.load_history(true).await?;
    assert_eq!(env.session.snapshot().await.history.entries.len(), 150);

    let first = &state.history.entries[0];
    assert_eq!(first.kind, HistoryKind::Payment);
    assert_eq!(first.direction, Direction::Received);
    assert_eq!(first.counterparty.as_deref(), Some(them.as_str()));
    assert_eq!(first.amount, Some(Amount::from_units(2)));
    Ok(())
}

#[tokio::test]
async fn test_dust_filter_hides_small_incoming_payments() -> anyhow::Result<()> {
    let (env, viewer, other) = viewer_env().await?;
    let me = viewer.public_key().account_id();
    let them = other.public_key().account_id();

    env.ledger
        .add_payment(PaymentJson::native(1, &them, &me, "0.1000000", CREATED_AT))
        .await;
    env.ledger
        .add_payment(PaymentJson::native(2, &them, &me, "0.5000000", CREATED_AT))
        .await;
    env.ledger
        .add_payment(PaymentJson::native(3, &them, &me, "0.5000001", CREATED_AT))
        .await;
    env.ledger
        .add_payment(PaymentJson::native(4, &me, &them, "0.0100000", CREATED_AT))
        .await;

    env.session.load_history(false).await?;
    let state = env.session.snapshot().await;
    assert!(state.settings.hide_dust);
    assert_eq!(state.history.entries.len(), 4);

    let visible: Vec<String> = state.visible_history().into_iter().map(|e| e.id).collect();
    assert_eq!(visible, vec!["4", "3"]);

    env.session.set_hide_dust(false).await;
    let state = env.session.snapshot().await;
    assert_eq!(state.visible_history().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_empty_history_for_new_account() -> anyhow::Result<()> {
    let (env, _viewer, _other) = viewer_env().await?;

    env.session.load_history(false).await?;
    let state = env.session.snapshot().await;
    assert!(state.history.entries.is_empty());
    assert!(state.history.complete);
    assert!(state.history.error.is_none());
    Ok(())
}

#[tokio::test]
async fn test_operations_page_through_all_activity() -> anyhow::Result<()> {
    let (env, viewer, other) = viewer_env().await?;
    let me = viewer.public_key().account_id();
    let them = other.public_key().account_id();

    for id in 1..=150u64 {
        env.ledger
            .add_payment(PaymentJson::native(id, &me, &them, "1.0000000", CREATED_AT))
            .await;
    }

    env.session.load_operations(false).await?;
    let state = env.session.snapshot().await;
    assert_eq!(state.operations.entries.len(), 100);
    assert_eq!(state.operations.entries[0].id, "150");
    assert_eq!(state.operations.entries[0].kind, "payment");
    assert_eq!(state.operations.entries[0].source_account, me);
    assert!(state.operations.entries[0].successful);
    assert_eq!(state.operations.next_cursor.as_deref(), Some("51"));
    assert!(!state.operations.complete);

    env.session.load_operations(true).await?;
    let state = env.session.snapshot().await;
    assert_eq!(state.operations.entries.len(), 150);
    assert_eq!(state.operations.entries[149].id, "1");
    assert!(state.operations.complete);
    // The payment history is a separate listing
    assert!(state.history.entries.is_empty());

    // Larger requests are capped at one page
    let client = HorizonClient::new(&env.base_url);
    let page = client.operations(&viewer.public_key(), None, 500).await?;
    assert_eq!(page.records.len(), 100);
    Ok(())
}
