use advisorhub_audit::{AuditAction, FilterQuery, Query};
use advisorhub_points::{ItemLimits, PointsConfig, RedemptionError, UNLIMITED_STOCK};
use advisorhub_shared::{Error, Metadata};
use temp_dir::TempDir;

mod helpers;

#[tokio::test]
async fn test_redeem() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;
    let admin = helpers::admin();

    state
        .command
        .save_item(helpers::item("webinar", 80, 10), &admin)
        .await?;
    helpers::credit(&state, &john, 100).await?;

    let outcome = state
        .command
        .redeem(&john, "webinar", &Metadata::by(&john))
        .await?;

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert!(outcome.audit_logged);

    let entry = outcome.entry.unwrap();
    assert_eq!(entry.amount, -80);
    assert_eq!(entry.balance_after, 20);
    assert_eq!(entry.item_id.as_deref(), Some("webinar"));
    assert!(outcome.order_id.is_some());

    let item = state.command.find_item("webinar").await?.unwrap();
    assert_eq!(item.stock_used, 1);

    let member = state.command.find_member(&john).await?.unwrap();
    assert_eq!(member.lifetime_spent, 80);

    let logs = Query(state.pool.clone())
        .filter(FilterQuery {
            action: Some(AuditAction::PointsRedeem),
            ..Default::default()
        })
        .await?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].operator_id, john);

    helpers::assert_consistent(&state, &john).await?;

    Ok(())
}

#[tokio::test]
async fn test_out_of_stock() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let ids = helpers::create_members(&state, ["john", "albert"]).await?;
    let admin = helpers::admin();

    state
        .command
        .save_item(helpers::item("mug", 10, 5), &admin)
        .await?;
    helpers::credit(&state, &ids[0], 100).await?;
    helpers::credit(&state, &ids[1], 100).await?;

    for _ in 0..5 {
        let outcome = state.command.redeem(&ids[0], "mug", &admin).await?;
        assert!(outcome.success);
    }

    let before = state.command.find_member(&ids[1]).await?.unwrap();
    let outcome = state.command.redeem(&ids[1], "mug", &admin).await?;
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(RedemptionError::OutOfStock));
    assert!(outcome.order_id.is_none());

    let after = state.command.find_member(&ids[1]).await?.unwrap();
    assert_eq!(before, after);

    let item = state.command.find_item("mug").await?.unwrap();
    assert_eq!(item.stock_used, 5);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_redeem_last_unit() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let ids = helpers::create_members(&state, ["m1", "m2", "m3", "m4", "m5"]).await?;
    let admin = helpers::admin();

    state
        .command
        .save_item(helpers::item("keynote", 50, 1), &admin)
        .await?;

    for id in ids.iter() {
        helpers::credit(&state, id, 50).await?;
    }

    let handles = ids.iter().map(|id| {
        let command = state.command.clone();
        let id = id.to_owned();
        tokio::spawn(async move { command.redeem(&id, "keynote", &Metadata::by(&id)).await })
    });

    let mut successes = 0;
    for res in futures::future::join_all(handles).await {
        let outcome = res??;
        if outcome.success {
            successes += 1;
        } else {
            assert_eq!(outcome.error, Some(RedemptionError::OutOfStock));
        }
    }

    assert_eq!(successes, 1);

    let item = state.command.find_item("keynote").await?.unwrap();
    assert_eq!(item.stock_used, 1);

    let mut spent = 0;
    for id in ids.iter() {
        let member = state.command.find_member(id).await?.unwrap();
        spent += member.lifetime_spent;
        helpers::assert_consistent(&state, id).await?;
    }
    assert_eq!(spent, 50);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_redeem_last_unit_across_connections() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = PointsConfig {
        max_commit_attempts: 10,
        ..Default::default()
    };
    let state = helpers::setup_test_state_with(dir.child("db.sqlite3"), 5, config).await?;
    let ids = helpers::create_members(&state, ["m1", "m2", "m3", "m4", "m5"]).await?;
    let admin = helpers::admin();

    state
        .command
        .save_item(helpers::item("keynote", 50, 1), &admin)
        .await?;

    for id in ids.iter() {
        helpers::credit(&state, id, 50).await?;
    }

    let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(ids.len()));
    let handles = ids.iter().map(|id| {
        let command = state.command.clone();
        let barrier = barrier.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            barrier.wait().await;
            command.redeem(&id, "keynote", &Metadata::by(&id)).await
        })
    });

    let mut successes = 0;
    for res in futures::future::join_all(handles).await {
        match res? {
            Ok(outcome) if outcome.success => successes += 1,
            Ok(outcome) => assert_eq!(outcome.error, Some(RedemptionError::OutOfStock)),
            Err(err) => assert!(matches!(err, Error::Conflict), "{err:?}"),
        }
    }

    assert_eq!(successes, 1);

    let item = state.command.find_item("keynote").await?.unwrap();
    assert_eq!(item.stock_used, 1);

    let mut spent = 0;
    for id in ids.iter() {
        let member = state.command.find_member(id).await?.unwrap();
        spent += member.lifetime_spent;
        helpers::assert_consistent(&state, id).await?;
    }
    assert_eq!(spent, 50);

    Ok(())
}

#[tokio::test]
async fn test_rejections_in_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;
    let admin = helpers::admin();

    let outcome = state.command.redeem(&john, "missing", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::ItemUnavailable));

    let mut gold_only = helpers::item("gold-dinner", 500, 0);
    gold_only.limits = ItemLimits {
        per_user_max: None,
        membership_required: vec!["gold".to_owned()],
    };
    state.command.save_item(gold_only, &admin).await?;

    // Ineligible tier wins over the empty stock.
    let outcome = state.command.redeem(&john, "gold-dinner", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::TierIneligible));

    state.command.change_tier(&john, "gold", &admin).await?;
    let outcome = state.command.redeem(&john, "gold-dinner", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::OutOfStock));

    let mut limited = helpers::item("ebook", 10, UNLIMITED_STOCK);
    limited.limits.per_user_max = Some(1);
    state.command.save_item(limited, &admin).await?;

    let outcome = state.command.redeem(&john, "ebook", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::InsufficientPoints));

    helpers::credit(&state, &john, 15).await?;
    assert!(state.command.redeem(&john, "ebook", &admin).await?.success);

    let outcome = state.command.redeem(&john, "ebook", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::PerUserLimitReached));

    state.command.set_item_active("ebook", false, &admin).await?;
    let outcome = state.command.redeem(&john, "ebook", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::ItemUnavailable));

    let res = state.command.redeem("ghost", "ebook", &admin).await;
    assert!(matches!(res, Err(Error::NotFound(_))));

    let member = state.command.find_member(&john).await?.unwrap();
    assert_eq!(member.current_balance, 5);
    helpers::assert_consistent(&state, &john).await?;

    Ok(())
}

#[tokio::test]
async fn test_tier_without_redeem_permission() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;
    let admin = helpers::admin();

    let mut trial = helpers::tier("trial", 1.0, false);
    trial.permissions.can_redeem_points = false;
    state.command.save_tier(trial, &admin).await?;
    state.command.change_tier(&john, "trial", &admin).await?;

    state
        .command
        .save_item(helpers::item("mug", 10, UNLIMITED_STOCK), &admin)
        .await?;
    helpers::credit(&state, &john, 100).await?;

    let outcome = state.command.redeem(&john, "mug", &admin).await?;
    assert_eq!(outcome.error, Some(RedemptionError::TierIneligible));

    Ok(())
}
