use std::collections::VecDeque;

use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Error, Metadata, Result, SYSTEM_ACTOR};
use serde::Serialize;
use sqlx::SqliteConnection;
use time::OffsetDateTime;

use crate::{
    EntrySource, EntryType, LedgerEntry,
    ledger::{NewEntry, apply_entry},
    repository,
};

/// A credit entry and how much of it is still unspent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lot {
    pub entry_id: String,
    pub amount: i64,
    pub remaining: i64,
    pub expires_at: Option<i64>,
    pub is_expired: bool,
}

impl Lot {
    pub fn is_due(&self, as_of: i64) -> bool {
        !self.is_expired && self.expires_at.is_some_and(|at| at <= as_of)
    }
}

/// Replays a member's ledger in `seq` order. Debits consume the oldest open
/// credits first; an expire entry closes the lot it points at.
pub fn replay_lots(entries: &[LedgerEntry]) -> Vec<Lot> {
    let mut lots: Vec<Lot> = Vec::new();
    let mut open: VecDeque<usize> = VecDeque::new();

    for entry in entries {
        if entry.entry_type == EntryType::Expire {
            let source = entry.source_entry_id.as_deref();
            if let Some(lot) = lots.iter_mut().find(|lot| Some(lot.entry_id.as_str()) == source) {
                lot.remaining = (lot.remaining + entry.amount).max(0);
            }
            continue;
        }

        if entry.amount > 0 {
            open.push_back(lots.len());
            lots.push(Lot {
                entry_id: entry.id.to_owned(),
                amount: entry.amount,
                remaining: entry.amount,
                expires_at: entry.expires_at,
                is_expired: entry.is_expired,
            });
            continue;
        }

        let mut debit = -entry.amount;
        while debit > 0 {
            let Some(&index) = open.front() else {
                break;
            };

            let lot = &mut lots[index];
            let taken = lot.remaining.min(debit);
            lot.remaining -= taken;
            debit -= taken;

            if lot.remaining == 0 {
                open.pop_front();
            }
        }
    }

    lots
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub member_id: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Expire entries written.
    pub count: u64,
    pub points_expired: i64,
    /// Lots flagged as expired, including fully spent ones.
    pub lots_closed: u64,
    pub members: u64,
    pub failures: Vec<SweepFailure>,
}

#[derive(Default)]
struct MemberSweep {
    entries: Vec<LedgerEntry>,
    lots_closed: u64,
}

async fn sweep_member(conn: &mut SqliteConnection, member_id: &str, as_of: i64) -> Result<MemberSweep> {
    let history = repository::all_entries(&mut *conn, member_id).await?;
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let mut sweep = MemberSweep::default();

    for lot in replay_lots(&history).into_iter().filter(|lot| lot.is_due(as_of)) {
        if lot.remaining > 0 {
            let entry = apply_entry(
                &mut *conn,
                NewEntry {
                    member_id: member_id.to_owned(),
                    entry_type: EntryType::Expire,
                    amount: -lot.remaining,
                    source: EntrySource::Expiry {
                        source_entry_id: lot.entry_id.to_owned(),
                    },
                    expires_at: None,
                    created_at: now,
                    created_by: SYSTEM_ACTOR.to_owned(),
                },
            )
            .await?;

            sweep.entries.push(entry);
        }

        if !repository::mark_expired(&mut *conn, &lot.entry_id).await? {
            return Err(Error::Conflict);
        }

        sweep.lots_closed += 1;
    }

    Ok(sweep)
}

impl super::Command {
    /// Expires every credit lot due at `as_of`. Each member is swept in its
    /// own transaction; a failing member is reported and the sweep moves on.
    /// Running it again for the same `as_of` writes nothing.
    #[tracing::instrument(skip_all, fields(as_of = as_of.unix_timestamp()))]
    pub async fn sweep_expired(&self, as_of: OffsetDateTime) -> Result<SweepReport> {
        let as_of = as_of.unix_timestamp();
        let member_ids = self
            .read(move || async move {
                let mut conn = self.read_db.acquire().await?;
                repository::members_with_expiring_lots(&mut conn, as_of).await
            })
            .await?;

        let metadata = Metadata::system();
        let mut report = SweepReport::default();

        for member_id in member_ids {
            let id = member_id.clone();
            let res = self
                .transaction(move |conn| {
                    let member_id = id.clone();
                    Box::pin(async move { sweep_member(conn, &member_id, as_of).await })
                })
                .await;

            let sweep = match res {
                Ok(sweep) => sweep,
                Err(err) => {
                    tracing::error!(member_id = %member_id, err = %err, "failed to expire points");
                    report.failures.push(SweepFailure {
                        member_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            report.members += 1;
            report.lots_closed += sweep.lots_closed;

            let (Some(first), Some(last)) = (sweep.entries.first(), sweep.entries.last()) else {
                continue;
            };

            let expired: i64 = sweep.entries.iter().map(|entry| -entry.amount).sum();
            report.count += sweep.entries.len() as u64;
            report.points_expired += expired;

            append_after_commit(
                &self.write_db,
                NewRecord::new(&metadata, AuditAction::PointsExpire, &member_id, &member_id)
                    .changes(Changes::points(first.balance_before, last.balance_after))
                    .description(format!("{} lots, {expired} points", sweep.entries.len())),
            )
            .await;
        }

        tracing::info!(
            count = report.count,
            points_expired = report.points_expired,
            failures = report.failures.len(),
            "expiry sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: i64, entry_type: EntryType, amount: i64, expires_at: Option<i64>) -> LedgerEntry {
        LedgerEntry {
            id: format!("e{seq}"),
            member_id: "m1".to_owned(),
            seq,
            entry_type,
            amount,
            balance_before: 0,
            balance_after: 0,
            rule_id: None,
            item_id: None,
            reason: None,
            source_entry_id: None,
            expires_at,
            is_expired: false,
            created_at: seq,
            created_by: SYSTEM_ACTOR.to_owned(),
        }
    }

    #[test]
    fn debits_consume_oldest_first() {
        let lots = replay_lots(&[
            entry(1, EntryType::Earn, 50, Some(100)),
            entry(2, EntryType::Earn, 30, Some(200)),
            entry(3, EntryType::Spend, -60, None),
        ]);

        assert_eq!(lots[0].remaining, 0);
        assert_eq!(lots[1].remaining, 20);
        assert!(lots[0].is_due(100));
        assert!(!lots[1].is_due(100));
    }

    #[test]
    fn expire_entry_closes_its_lot() {
        let mut expire = entry(3, EntryType::Expire, -30, None);
        expire.source_entry_id = Some("e1".to_owned());

        let lots = replay_lots(&[
            entry(1, EntryType::Earn, 50, Some(100)),
            entry(2, EntryType::Spend, -20, None),
            expire,
            entry(4, EntryType::Adjust, 40, None),
            entry(5, EntryType::Adjust, -10, None),
        ]);

        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].remaining, 0);
        assert_eq!(lots[1].remaining, 30);
        assert_eq!(lots[1].expires_at, None);
    }

    #[test]
    fn swept_lots_are_not_due() {
        let mut earn = entry(1, EntryType::Earn, 50, Some(100));
        earn.is_expired = true;

        let lots = replay_lots(&[earn]);
        assert!(!lots[0].is_due(1_000));
    }
}
