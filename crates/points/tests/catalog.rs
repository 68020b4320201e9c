use advisorhub_audit::{AuditAction, AuditModule, FilterQuery, Query};
use advisorhub_points::{EnrollInput, SaveRuleInput};
use advisorhub_shared::{Error, Metadata};
use temp_dir::TempDir;

mod helpers;

#[tokio::test]
async fn test_single_default_tier() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let admin = helpers::admin();

    state
        .command
        .save_tier(helpers::tier("starter", 1.0, true), &admin)
        .await?;

    let defaults: Vec<_> = state
        .command
        .list_tiers()
        .await?
        .into_iter()
        .filter(|tier| tier.is_default)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, "starter");

    let member = helpers::create_member(&state, "john").await?;
    let tier = state.command.member_tier(&member).await?;
    assert_eq!(tier.id, "starter");

    let mut inactive = helpers::tier("basic", 1.0, true);
    inactive.is_active = false;
    let res = state.command.save_tier(inactive, &admin).await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let mut bad = helpers::tier("broken", -1.0, false);
    bad.name = String::new();
    let res = state.command.save_tier(bad, &admin).await;
    assert!(matches!(res, Err(Error::Validate(_))));

    let logs = Query(state.pool.clone())
        .filter(FilterQuery {
            module: Some(AuditModule::Tier),
            limit: 100,
            ..Default::default()
        })
        .await?;
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|log| log.action == AuditAction::TierCreate));

    Ok(())
}

#[tokio::test]
async fn test_inactive_primary_tier_falls_back_to_default() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;
    let admin = helpers::admin();

    state.command.change_tier(&john, "gold", &admin).await?;
    assert_eq!(state.command.member_tier(&john).await?.id, "gold");

    let mut gold = helpers::tier("gold", 1.5, false);
    gold.is_active = false;
    state.command.save_tier(gold, &admin).await?;

    assert_eq!(state.command.member_tier(&john).await?.id, "basic");

    let logs = Query(state.pool.clone())
        .filter(FilterQuery {
            action: Some(AuditAction::TierUpdate),
            target_id: Some("gold".to_owned()),
            ..Default::default()
        })
        .await?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].changes.before["isActive"], true);
    assert_eq!(logs[0].changes.after["isActive"], false);

    let res = state.command.change_tier(&john, "gold", &admin).await;
    assert!(matches!(res, Err(Error::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_rules() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let admin = helpers::admin();

    let res = state.command.delete_rule("daily_login", &admin).await;
    assert!(matches!(res, Err(Error::Forbidden)));

    let res = state.command.delete_rule("missing", &admin).await;
    assert!(matches!(res, Err(Error::NotFound(_))));

    state
        .command
        .save_rule(
            SaveRuleInput {
                id: "survey".to_owned(),
                name: "Answer a survey".to_owned(),
                category: "feedback".to_owned(),
                points: 20,
                limits: Default::default(),
                is_active: true,
                is_system_rule: false,
            },
            &admin,
        )
        .await?;
    assert_eq!(state.command.list_rules().await?.len(), 5);

    state.command.delete_rule("survey", &admin).await?;
    assert!(state.command.find_rule("survey").await?.is_none());

    let res = state
        .command
        .save_rule(
            SaveRuleInput {
                id: "free".to_owned(),
                name: "Free points".to_owned(),
                category: "misc".to_owned(),
                points: 0,
                limits: Default::default(),
                is_active: true,
                is_system_rule: false,
            },
            &admin,
        )
        .await;
    assert!(matches!(res, Err(Error::Validate(_))));

    let logs = Query(state.pool.clone())
        .filter(FilterQuery {
            module: Some(AuditModule::Rule),
            target_id: Some("survey".to_owned()),
            ..Default::default()
        })
        .await?;
    let actions: Vec<_> = logs.iter().map(|log| log.action).collect();
    assert!(actions.contains(&AuditAction::RuleCreate));
    assert!(actions.contains(&AuditAction::RuleDelete));

    Ok(())
}

#[tokio::test]
async fn test_items() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let john = helpers::create_member(&state, "john").await?;
    let admin = helpers::admin();

    state
        .command
        .save_item(helpers::item("mug", 10, 3), &admin)
        .await?;
    helpers::credit(&state, &john, 30).await?;
    state.command.redeem(&john, "mug", &admin).await?;
    state.command.redeem(&john, "mug", &admin).await?;

    let res = state
        .command
        .save_item(helpers::item("mug", 10, 1), &admin)
        .await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let item = state
        .command
        .save_item(helpers::item("mug", 12, 10), &admin)
        .await?;
    assert_eq!(item.stock_used, 2);
    assert_eq!(item.points_cost, 12);

    state.command.set_item_active("mug", false, &admin).await?;
    assert!(state.command.list_items(true).await?.is_empty());
    assert_eq!(state.command.list_items(false).await?.len(), 1);

    let res = state.command.set_item_active("missing", true, &admin).await;
    assert!(matches!(res, Err(Error::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_enroll() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let admin = helpers::admin();

    let member = state
        .command
        .enroll(
            EnrollInput {
                member_id: "john".to_owned(),
                timezone: None,
                tier_id: Some("gold".to_owned()),
            },
            &admin,
        )
        .await?;
    assert_eq!(member.primary_tier_id, "gold");
    assert_eq!(member.timezone, "UTC");
    assert_eq!(member.current_balance, 0);
    assert!(!member.referral_code.is_empty());

    let res = state
        .command
        .enroll(
            EnrollInput {
                member_id: "john".to_owned(),
                ..Default::default()
            },
            &admin,
        )
        .await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let res = state
        .command
        .enroll(
            EnrollInput {
                member_id: "albert".to_owned(),
                timezone: Some("Mars/Olympus".to_owned()),
                tier_id: None,
            },
            &admin,
        )
        .await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let res = state
        .command
        .enroll(
            EnrollInput {
                member_id: "albert".to_owned(),
                timezone: None,
                tier_id: Some("platinum".to_owned()),
            },
            &admin,
        )
        .await;
    assert!(matches!(res, Err(Error::NotFound(_))));

    let res = state
        .command
        .enroll(EnrollInput::default(), &Metadata::system())
        .await;
    assert!(matches!(res, Err(Error::Validate(_))));

    let logs = Query(state.pool.clone())
        .filter(FilterQuery {
            action: Some(AuditAction::MemberEnroll),
            ..Default::default()
        })
        .await?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].target_id, "john");

    Ok(())
}
