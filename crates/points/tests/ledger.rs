use std::sync::atomic::{AtomicU32, Ordering};

use advisorhub_points::{
    EntrySource, EntryType,
    ledger::{NewEntry, apply_entry, apply_entry_to},
    store::run_transaction,
};
use advisorhub_shared::Error;
use temp_dir::TempDir;

mod helpers;

fn correction(member_id: &str, amount: i64) -> NewEntry {
    NewEntry {
        member_id: member_id.to_owned(),
        entry_type: EntryType::Adjust,
        amount,
        source: EntrySource::Manual {
            reason: "correction".to_owned(),
        },
        expires_at: None,
        created_at: 1_700_000_000,
        created_by: "admin-1".to_owned(),
    }
}

#[tokio::test]
async fn test_stale_member_row_conflicts() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;

    let stale = state.command.find_member(&john).await?.unwrap();
    helpers::credit(&state, &john, 10).await?;

    let mut tx = state.pool.begin().await?;
    let res = apply_entry_to(&mut *tx, stale, correction(&john, 5)).await;
    assert!(matches!(res, Err(Error::Conflict)));
    tx.rollback().await?;

    let member = state.command.find_member(&john).await?.unwrap();
    assert_eq!(member.current_balance, 10);
    assert_eq!(member.version, 1);
    assert_eq!(state.command.list_entries(&john, 10, 0).await?.len(), 1);
    helpers::assert_consistent(&state, &john).await?;

    Ok(())
}

#[tokio::test]
async fn test_conflict_is_retried_with_fresh_row() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;

    let stale = state.command.find_member(&john).await?.unwrap();
    helpers::credit(&state, &john, 10).await?;

    let attempts = &AtomicU32::new(0);
    let member_id = john.to_owned();
    let entry = run_transaction(&state.pool, 3, move |conn| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        let stale = stale.clone();
        let entry = correction(&member_id, 5);
        Box::pin(async move {
            if attempt == 0 {
                return apply_entry_to(conn, stale, entry).await;
            }

            apply_entry(conn, entry).await
        })
    })
    .await?;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(entry.seq, 2);
    assert_eq!(entry.balance_before, 10);
    assert_eq!(entry.balance_after, 15);
    helpers::assert_consistent(&state, &john).await?;

    Ok(())
}

#[tokio::test]
async fn test_entry_for_another_member_is_refused() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let ids = helpers::create_members(&state, ["john", "jane"]).await?;

    let john = state.command.find_member(&ids[0]).await?.unwrap();

    let mut tx = state.pool.begin().await?;
    let res = apply_entry_to(&mut *tx, john, correction(&ids[1], 5)).await;
    assert!(matches!(res, Err(Error::Validation(_))));
    tx.rollback().await?;

    assert!(state.command.list_entries(&ids[1], 10, 0).await?.is_empty());

    Ok(())
}
