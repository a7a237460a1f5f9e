//! Log-server models.

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;

use super::entity::{
    get_datetime, get_opt_datetime, Column, ColumnType, Entity, KeyKind, SqlValue, TableSchema,
};

static LOG_SESSIONS: TableSchema = TableSchema {
    table: "log_sessions",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("session_key", ColumnType::Text),
        Column::nullable("user_name", ColumnType::Text),
        Column::new("started_at", ColumnType::Timestamp),
        Column::nullable("ended_at", ColumnType::Timestamp),
    ],
};

/// A logged user session, stored on the `logserver` connection.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSession {
    pub id: Option<i64>,
    pub session_key: String,
    pub user_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Entity for LogSession {
    const MODEL: &'static str = "LogSession";

    fn schema() -> &'static TableSchema {
        &LOG_SESSIONS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.session_key.as_str().into(),
            self.user_name.clone().into(),
            self.started_at.into(),
            self.ended_at.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            session_key: row.try_get("session_key")?,
            user_name: row.try_get("user_name")?,
            started_at: get_datetime(row, "started_at")?,
            ended_at: get_opt_datetime(row, "ended_at")?,
        })
    }
}
