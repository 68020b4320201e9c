use advisorhub_shared::{Error, Result, invalid, not_found};
use sqlx::SqliteConnection;
use ulid::Ulid;

use crate::{EntrySource, EntryType, LedgerEntry, MemberAccount, repository};

/// Largest amount a single entry may carry, in either direction.
pub const MAX_ENTRY_AMOUNT: i64 = 1_000_000_000;

#[derive(Clone, Debug)]
pub struct NewEntry {
    pub member_id: String,
    pub entry_type: EntryType,
    /// Signed: credits positive, debits negative.
    pub amount: i64,
    pub source: EntrySource,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub created_by: String,
}

fn check_shape(entry: &NewEntry) -> Result<()> {
    let sign_ok = match entry.entry_type {
        EntryType::Earn => entry.amount > 0,
        EntryType::Spend | EntryType::Expire => entry.amount < 0,
        EntryType::Adjust => entry.amount != 0,
    };

    if entry.amount.unsigned_abs() > MAX_ENTRY_AMOUNT.unsigned_abs() {
        invalid!("entry amount {} exceeds {}", entry.amount, MAX_ENTRY_AMOUNT);
    }

    if !sign_ok {
        invalid!(
            "{} entry cannot carry amount {}",
            entry.entry_type,
            entry.amount
        );
    }

    let source_ok = matches!(
        (entry.entry_type, &entry.source),
        (EntryType::Earn, EntrySource::Rule(_))
            | (EntryType::Spend, EntrySource::Item(_))
            | (EntryType::Adjust, EntrySource::Manual { .. })
            | (EntryType::Expire, EntrySource::Expiry { .. })
    );

    if !source_ok {
        invalid!("{} entry has a mismatched source", entry.entry_type);
    }

    if entry.expires_at.is_some() && entry.amount < 0 {
        invalid!("only credits can expire");
    }

    Ok(())
}

/// The only way a balance changes. Appends one ledger entry and moves the
/// member's totals in step with it, guarded by the member version.
///
/// Must run inside a transaction: the caller commits or rolls back both
/// writes together. A concurrent writer surfaces as [`Error::Conflict`].
pub async fn apply_entry(conn: &mut SqliteConnection, entry: NewEntry) -> Result<LedgerEntry> {
    check_shape(&entry)?;

    let Some(member) = repository::find_member(&mut *conn, &entry.member_id).await? else {
        not_found!("member {}", entry.member_id);
    };

    apply_entry_to(conn, member, entry).await
}

/// Like [`apply_entry`], against a member row the caller already loaded in
/// this transaction. If the row moved on since it was read, nothing is
/// written and the result is [`Error::Conflict`].
pub async fn apply_entry_to(
    conn: &mut SqliteConnection,
    member: MemberAccount,
    entry: NewEntry,
) -> Result<LedgerEntry> {
    check_shape(&entry)?;

    if member.id != entry.member_id {
        invalid!("entry for {} applied to member {}", entry.member_id, member.id);
    }

    let balance_before = member.current_balance;
    let Some(totals) = member.totals().apply(entry.entry_type, entry.amount) else {
        invalid!("entry of {} overflows balance {}", entry.amount, balance_before);
    };
    let balance_after = totals.current_balance;

    if balance_after < 0 && entry.entry_type != EntryType::Expire {
        return Err(Error::NegativeBalance {
            balance: balance_before,
            amount: entry.amount,
        });
    }

    let updated = repository::update_member_totals(
        &mut *conn,
        &member.id,
        member.version,
        &totals,
        entry.created_at,
    )
    .await?;

    if !updated {
        return Err(Error::Conflict);
    }

    let (rule_id, item_id, reason, source_entry_id) = match entry.source {
        EntrySource::Rule(id) => (Some(id), None, None, None),
        EntrySource::Item(id) => (None, Some(id), None, None),
        EntrySource::Manual { reason } => (None, None, Some(reason), None),
        EntrySource::Expiry { source_entry_id } => (None, None, None, Some(source_entry_id)),
    };

    let ledger_entry = LedgerEntry {
        id: Ulid::new().to_string(),
        member_id: member.id,
        seq: member.version + 1,
        entry_type: entry.entry_type,
        amount: entry.amount,
        balance_before,
        balance_after,
        rule_id,
        item_id,
        reason,
        source_entry_id,
        expires_at: entry.expires_at,
        is_expired: false,
        created_at: entry.created_at,
        created_by: entry.created_by,
    };

    repository::insert_entry(&mut *conn, &ledger_entry).await?;

    tracing::debug!(
        member_id = %ledger_entry.member_id,
        entry_id = %ledger_entry.id,
        entry_type = %ledger_entry.entry_type,
        amount = ledger_entry.amount,
        balance_after = ledger_entry.balance_after,
        "ledger entry applied"
    );

    Ok(ledger_entry)
}
