use advisorhub_db::table::AuditLog;
use advisorhub_shared::Metadata;
use sea_query::{Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use ulid::Ulid;

use crate::{AuditAction, Changes};

pub struct NewRecord {
    pub operator_id: String,
    pub operator_email: String,
    pub action: AuditAction,
    pub target_id: String,
    pub target_name: String,
    pub changes: Changes,
    pub description: String,
}

impl NewRecord {
    pub fn new(
        metadata: &Metadata,
        action: AuditAction,
        target_id: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            operator_id: metadata.trigger_by.to_owned().unwrap_or_default(),
            operator_email: metadata.trigger_email(),
            action,
            target_id: target_id.into(),
            target_name: target_name.into(),
            changes: Changes::default(),
            description: String::new(),
        }
    }

    pub fn changes(mut self, changes: Changes) -> Self {
        self.changes = changes;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

pub async fn append_log(pool: &SqlitePool, record: NewRecord) -> advisorhub_shared::Result<String> {
    let id = Ulid::new().to_string();
    let changes = serde_json::to_string(&record.changes).map_err(anyhow::Error::from)?;
    let statement = Query::insert()
        .into_table(AuditLog::Table)
        .columns([
            AuditLog::Id,
            AuditLog::OperatorId,
            AuditLog::OperatorEmail,
            AuditLog::Action,
            AuditLog::Module,
            AuditLog::TargetId,
            AuditLog::TargetName,
            AuditLog::Changes,
            AuditLog::Description,
            AuditLog::CreatedAt,
        ])
        .values_panic([
            id.to_owned().into(),
            record.operator_id.into(),
            record.operator_email.into(),
            record.action.to_string().into(),
            record.action.module().to_string().into(),
            record.target_id.into(),
            record.target_name.into(),
            changes.into(),
            record.description.into(),
            OffsetDateTime::now_utc().unix_timestamp().into(),
        ])
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(id)
}

/// Writes the record after the primary mutation has committed. A failure is
/// logged and reported as `false`; it never undoes the mutation.
pub async fn append_after_commit(pool: &SqlitePool, record: NewRecord) -> bool {
    let action = record.action;
    let target_id = record.target_id.to_owned();

    match append_log(pool, record).await {
        Ok(_) => true,
        Err(err) => {
            tracing::error!(
                err = %err,
                action = %action,
                target_id = %target_id,
                "failed to append audit log"
            );
            false
        }
    }
}
