use std::ops::Deref;

use advisorhub_db::table::AuditLog;
use sea_query::{Expr, ExprTrait, Order, Query as SeaQuery, SelectStatement, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use serde::Serialize;
use sqlx::{SqlitePool, prelude::FromRow};

use crate::{AuditAction, AuditModule, Changes};

#[derive(FromRow)]
struct AuditRow {
    id: String,
    operator_id: String,
    operator_email: String,
    action: sqlx::types::Text<AuditAction>,
    module: sqlx::types::Text<AuditModule>,
    target_id: String,
    target_name: String,
    changes: sqlx::types::Json<Changes>,
    description: String,
    created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub operator_id: String,
    pub operator_email: String,
    pub action: AuditAction,
    pub module: AuditModule,
    pub target_id: String,
    pub target_name: String,
    pub changes: Changes,
    pub description: String,
    pub created_at: i64,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            operator_id: row.operator_id,
            operator_email: row.operator_email,
            action: row.action.0,
            module: row.module.0,
            target_id: row.target_id,
            target_name: row.target_name,
            changes: row.changes.0,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Default)]
pub struct FilterQuery {
    pub module: Option<AuditModule>,
    pub action: Option<AuditAction>,
    pub target_id: Option<String>,
    pub operator_id: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone)]
pub struct Query(pub SqlitePool);

impl Deref for Query {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn select() -> SelectStatement {
    SeaQuery::select()
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
        .from(AuditLog::Table)
        .to_owned()
}

impl Query {
    /// Most recent first.
    pub async fn filter(&self, input: FilterQuery) -> advisorhub_shared::Result<Vec<AuditRecord>> {
        let mut statement = select();

        if let Some(module) = input.module {
            statement.and_where(Expr::col(AuditLog::Module).eq(module.to_string()));
        }

        if let Some(action) = input.action {
            statement.and_where(Expr::col(AuditLog::Action).eq(action.to_string()));
        }

        if let Some(target_id) = input.target_id {
            statement.and_where(Expr::col(AuditLog::TargetId).eq(target_id));
        }

        if let Some(operator_id) = input.operator_id {
            statement.and_where(Expr::col(AuditLog::OperatorId).eq(operator_id));
        }

        let limit = match input.limit {
            0 => 20,
            limit => Ord::min(limit, 100),
        };

        statement
            .order_by(AuditLog::CreatedAt, Order::Desc)
            .order_by(AuditLog::Id, Order::Desc)
            .limit(limit)
            .offset(input.offset);

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, AuditRow, _>(&sql, values)
            .fetch_all(&self.0)
            .await?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    pub async fn find(&self, id: impl Into<String>) -> advisorhub_shared::Result<Option<AuditRecord>> {
        let statement = select()
            .and_where(Expr::col(AuditLog::Id).eq(id.into()))
            .limit(1)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_as_with::<_, AuditRow, _>(&sql, values)
            .fetch_optional(&self.0)
            .await?;

        Ok(row.map(AuditRecord::from))
    }
}
