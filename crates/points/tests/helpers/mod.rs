use std::{path::PathBuf, str::FromStr, time::Duration};

use advisorhub_points::{
    AdjustInput, Command, Direction, EnrollInput, PointsConfig, RuleLimits, SaveItemInput,
    SaveRuleInput, SaveTierInput,
};
use advisorhub_shared::{Metadata, State};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

pub struct TestState {
    pub command: Command,
    pub pool: SqlitePool,
}

/// Single write connection, like the server's write pool.
pub async fn setup_test_state(path: PathBuf) -> anyhow::Result<TestState> {
    setup_test_state_with(path, 1, PointsConfig::default()).await
}

/// WAL database shared by `max_connections` connections, so transactions
/// really interleave and lose races to each other.
#[allow(dead_code)]
pub async fn setup_test_state_with(
    path: PathBuf,
    max_connections: u32,
    config: PointsConfig,
) -> anyhow::Result<TestState> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.to_str().unwrap()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await?;
    advisorhub_db::migrate(&pool).await?;

    let command = Command::new(State::from_pool(pool.clone()), config);
    seed_catalog(&command).await?;

    Ok(TestState { command, pool })
}

#[allow(dead_code)]
pub fn admin() -> Metadata {
    Metadata::new(
        Some("admin-1".to_owned()),
        Some("admin@advisorhub.localhost".to_owned()),
    )
}

async fn seed_catalog(command: &Command) -> anyhow::Result<()> {
    let metadata = admin();

    command
        .save_tier(tier("basic", 1.0, true), &metadata)
        .await?;
    command
        .save_tier(tier("gold", 1.5, false), &metadata)
        .await?;

    let config = command.config.rules.clone();
    for (id, points, limits) in [
        (
            config.daily_login,
            10,
            RuleLimits {
                daily_max: Some(10),
                ..Default::default()
            },
        ),
        (
            config.tool_use,
            5,
            RuleLimits {
                daily_max: Some(25),
                ..Default::default()
            },
        ),
        (
            config.first_client,
            100,
            RuleLimits {
                total_max: Some(100),
                ..Default::default()
            },
        ),
        (config.referral, 50, RuleLimits::default()),
    ] {
        command
            .save_rule(
                SaveRuleInput {
                    id: id.to_owned(),
                    name: id,
                    category: "system".to_owned(),
                    points,
                    limits,
                    is_active: true,
                    is_system_rule: true,
                },
                &metadata,
            )
            .await?;
    }

    Ok(())
}

#[allow(dead_code)]
pub fn tier(id: &str, multiplier: f64, is_default: bool) -> SaveTierInput {
    SaveTierInput {
        id: id.to_owned(),
        name: id.to_uppercase(),
        priority: if is_default { 100 } else { 10 },
        points_multiplier: multiplier,
        permissions: Default::default(),
        is_active: true,
        is_default,
        is_permanent: false,
    }
}

#[allow(dead_code)]
pub fn item(id: &str, points_cost: i64, stock: i64) -> SaveItemInput {
    SaveItemInput {
        id: id.to_owned(),
        name: format!("{id} item"),
        points_cost,
        stock,
        limits: Default::default(),
        is_active: true,
    }
}

#[allow(dead_code)]
pub async fn create_member(state: &TestState, name: impl Into<String>) -> anyhow::Result<String> {
    let ids = create_members(state, vec![name]).await?;

    Ok(ids.first().unwrap().to_owned())
}

#[allow(dead_code)]
pub async fn create_members(
    state: &TestState,
    names: impl IntoIterator<Item = impl Into<String>>,
) -> anyhow::Result<Vec<String>> {
    let mut ids = vec![];
    for name in names.into_iter() {
        let member = state
            .command
            .enroll(
                EnrollInput {
                    member_id: name.into(),
                    timezone: Some("UTC".to_owned()),
                    tier_id: None,
                },
                &Metadata::system(),
            )
            .await?;
        ids.push(member.id);
    }

    Ok(ids)
}

#[allow(dead_code)]
pub async fn credit(state: &TestState, member_id: &str, amount: i64) -> anyhow::Result<()> {
    state
        .command
        .adjust_points(
            AdjustInput {
                member_id: member_id.to_owned(),
                direction: Direction::Credit,
                amount,
                reason: "test credit".to_owned(),
            },
            &admin(),
        )
        .await?;

    Ok(())
}

/// Asserts the balance identities hold for the member's whole ledger.
#[allow(dead_code)]
pub async fn assert_consistent(state: &TestState, member_id: &str) -> anyhow::Result<()> {
    let member = state.command.find_member(member_id).await?.unwrap();
    assert!(member.totals().is_consistent(), "{member:?}");

    let mut entries = state.command.list_entries(member_id, 100, 0).await?;
    entries.reverse();

    let mut balance = 0;
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.seq, index as i64 + 1);
        assert_eq!(entry.balance_before, balance);
        assert_eq!(entry.balance_after, entry.balance_before + entry.amount);
        balance = entry.balance_after;
    }

    assert_eq!(balance, member.current_balance);
    assert_eq!(member.version, entries.len() as i64);

    Ok(())
}
