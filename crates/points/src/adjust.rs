use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Error, Metadata, Result, not_found};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    Direction, EntrySource, EntryType, LedgerEntry,
    ledger::{MAX_ENTRY_AMOUNT, NewEntry, apply_entry},
    repository,
    window::add_months,
};

#[derive(Validate, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInput {
    #[validate(length(min = 1, max = 64))]
    pub member_id: String,
    pub direction: Direction,
    /// Unsigned; `direction` decides the sign.
    #[validate(range(min = 1, max = MAX_ENTRY_AMOUNT))]
    pub amount: i64,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustOutcome {
    pub entry: LedgerEntry,
    pub audit_logged: bool,
}

impl super::Command {
    /// Operator credit or debit. Not scaled by the tier multiplier. A debit
    /// that would take the balance below zero is refused and nothing is written.
    #[tracing::instrument(skip_all, fields(member_id = %input.member_id, direction = %input.direction))]
    pub async fn adjust_points(&self, input: AdjustInput, metadata: &Metadata) -> Result<AdjustOutcome> {
        if input.amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let reason = input.reason.trim().to_owned();
        if reason.is_empty() {
            return Err(Error::MissingReason);
        }

        input.validate()?;

        let created_by = metadata.trigger_by()?;
        let credit_expiry_months = self.config.adjust_credit_expiry_months;

        let entry = self
            .transaction(move |conn| {
                let input = input.clone();
                let reason = reason.clone();
                let created_by = created_by.clone();
                Box::pin(async move {
                    let Some(member) = repository::find_member(&mut *conn, &input.member_id).await?
                    else {
                        not_found!("member {}", input.member_id);
                    };

                    if input.direction == Direction::Debit && member.current_balance < input.amount {
                        return Err(Error::ResultingBalanceNegative {
                            balance: member.current_balance,
                            amount: input.amount,
                        });
                    }

                    let now = OffsetDateTime::now_utc();
                    let expires_at = match (input.direction, credit_expiry_months) {
                        (Direction::Credit, months) if months > 0 => {
                            Some(add_months(now, months)?.unix_timestamp())
                        }
                        _ => None,
                    };

                    apply_entry(
                        conn,
                        NewEntry {
                            member_id: member.id,
                            entry_type: EntryType::Adjust,
                            amount: input.direction.signed(input.amount),
                            source: EntrySource::Manual { reason },
                            expires_at,
                            created_at: now.unix_timestamp(),
                            created_by,
                        },
                    )
                    .await
                })
            })
            .await?;

        tracing::info!(
            member_id = %entry.member_id,
            amount = entry.amount,
            operator = %entry.created_by,
            "points adjusted"
        );

        let audit_logged = append_after_commit(
            &self.write_db,
            NewRecord::new(
                metadata,
                AuditAction::PointsManualAdjust,
                &entry.member_id,
                &entry.member_id,
            )
            .changes(Changes::points(entry.balance_before, entry.balance_after))
            .description(entry.reason.to_owned().unwrap_or_default()),
        )
        .await;

        Ok(AdjustOutcome {
            entry,
            audit_logged,
        })
    }
}
