//! Data mapper.
//!
//! Per-model CRUD and schema migration over a single `AnyConnection`, so the
//! same calls work on a pooled connection or inside a transaction.

use std::marker::PhantomData;

use sqlx::any::AnyArguments;
use sqlx::AnyConnection;
use sqlx::query::Query;
use sqlx::{Any, Row};

use common::errors::{AppError, AppResult};
use common::models::{Entity, SqlValue, TableSchema};

use crate::dialect::Dialect;

/// What `migrate_table` did to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    Created,
    /// Columns that were added.
    Altered(Vec<&'static str>),
    Unchanged,
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Bool(v) => query.bind(i64::from(*v)),
        SqlValue::Text(v) => query.bind(v.clone()),
    }
}

/// Creates the table when missing, otherwise adds declared columns it lacks.
/// Existing columns are never dropped or retyped.
pub async fn migrate_table(
    conn: &mut AnyConnection,
    dialect: Dialect,
    schema: &TableSchema,
) -> AppResult<TableChange> {
    let existing: Vec<String> = sqlx::query_scalar(dialect.list_columns())
        .bind(schema.table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseQuery(format!("Failed to inspect table {}: {}", schema.table, e))
        })?;

    if existing.is_empty() {
        sqlx::query(&dialect.create_table(schema))
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseQuery(format!("Failed to create table {}: {}", schema.table, e))
            })?;
        return Ok(TableChange::Created);
    }

    let mut added = Vec::new();
    for column in schema.columns {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column.name)) {
            continue;
        }
        sqlx::query(&dialect.add_column(schema.table, column))
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseQuery(format!(
                    "Failed to add column {}.{}: {}",
                    schema.table, column.name, e
                ))
            })?;
        added.push(column.name);
    }

    if added.is_empty() {
        Ok(TableChange::Unchanged)
    } else {
        Ok(TableChange::Altered(added))
    }
}

/// CRUD operations for one model.
pub struct Mapper<E> {
    dialect: Dialect,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Mapper<E> {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            _entity: PhantomData,
        }
    }

    fn schema(&self) -> &'static TableSchema {
        E::schema()
    }

    fn column_list(&self) -> String {
        let schema = self.schema();
        std::iter::once(schema.key)
            .chain(schema.columns.iter().map(|c| c.name))
            .map(|c| self.dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders `WHERE a = ? AND b = ?`; criteria may only name declared columns.
    fn where_clause(&self, criteria: &[(&str, SqlValue)]) -> AppResult<String> {
        let schema = self.schema();
        let mut parts = Vec::with_capacity(criteria.len());
        for (i, (column, _)) in criteria.iter().enumerate() {
            if *column != schema.key && schema.column(column).is_none() {
                return Err(AppError::DatabaseQuery(format!(
                    "Unknown column '{}' on {}",
                    column, schema.table
                )));
            }
            parts.push(format!(
                "{} = {}",
                self.dialect.quote(column),
                self.dialect.placeholder(i + 1)
            ));
        }
        if parts.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", parts.join(" AND ")))
        }
    }

    /// Fetches a row by primary key.
    pub async fn get(&self, conn: &mut AnyConnection, id: i64) -> AppResult<Option<E>> {
        self.first(conn, &[(self.schema().key, id.into())]).await
    }

    /// First row matching all criteria, lowest key first.
    pub async fn first(
        &self,
        conn: &mut AnyConnection,
        criteria: &[(&str, SqlValue)],
    ) -> AppResult<Option<E>> {
        let schema = self.schema();
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT 1",
            self.column_list(),
            self.dialect.quote(schema.table),
            self.where_clause(criteria)?,
            self.dialect.quote(schema.key)
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in criteria {
            query = bind_value(query, value);
        }
        let row = query.fetch_optional(&mut *conn).await?;
        row.map(|r| E::from_row(&r)).transpose().map_err(AppError::from)
    }

    pub async fn count(
        &self,
        conn: &mut AnyConnection,
        criteria: &[(&str, SqlValue)],
    ) -> AppResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            self.dialect.quote(self.schema().table),
            self.where_clause(criteria)?
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in criteria {
            query = bind_value(query, value);
        }
        let row = query.fetch_one(&mut *conn).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Inserts the entity and stores the resulting key on it.
    ///
    /// An entity that already carries a key is inserted with that key.
    pub async fn insert(&self, conn: &mut AnyConnection, entity: &mut E) -> AppResult<i64> {
        let schema = self.schema();
        let explicit_key = entity.id();

        let mut columns = Vec::with_capacity(schema.columns.len() + 1);
        let mut values = Vec::with_capacity(schema.columns.len() + 1);
        if let Some(id) = explicit_key {
            columns.push(schema.key);
            values.push(SqlValue::from(id));
        }
        columns.extend(schema.columns.iter().map(|c| c.name));
        values.extend(entity.values());

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dialect.quote(schema.table),
            columns
                .iter()
                .map(|c| self.dialect.quote(c))
                .collect::<Vec<_>>()
                .join(", "),
            (1..=values.len())
                .map(|i| self.dialect.placeholder(i))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let id = match explicit_key {
            Some(id) => {
                let mut query = sqlx::query(&sql);
                for value in &values {
                    query = bind_value(query, value);
                }
                query.execute(&mut *conn).await?;
                id
            }
            None if self.dialect.uses_returning() => {
                sql.push_str(&format!(" RETURNING {}", self.dialect.quote(schema.key)));
                let mut query = sqlx::query(&sql);
                for value in &values {
                    query = bind_value(query, value);
                }
                let row = query.fetch_one(&mut *conn).await?;
                row.try_get::<i64, _>(0)?
            }
            None => {
                let mut query = sqlx::query(&sql);
                for value in &values {
                    query = bind_value(query, value);
                }
                query
                    .execute(&mut *conn)
                    .await?
                    .last_insert_id()
                    .ok_or_else(|| {
                        AppError::DatabaseQuery(format!(
                            "No generated key returned for {}",
                            schema.table
                        ))
                    })?
            }
        };

        entity.set_id(id);
        tracing::debug!(table = schema.table, id, "Row inserted");
        Ok(id)
    }

    /// Updates every declared column of an entity that carries a key.
    pub async fn update(&self, conn: &mut AnyConnection, entity: &E) -> AppResult<()> {
        let schema = self.schema();
        let id = entity.id().ok_or_else(|| {
            AppError::DatabaseQuery(format!("Cannot update {} row without a key", schema.table))
        })?;

        let assignments = schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{} = {}",
                    self.dialect.quote(c.name),
                    self.dialect.placeholder(i + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.dialect.quote(schema.table),
            assignments,
            self.dialect.quote(schema.key),
            self.dialect.placeholder(schema.columns.len() + 1)
        );

        let mut query = sqlx::query(&sql);
        for value in &entity.values() {
            query = bind_value(query, value);
        }
        query.bind(id).execute(&mut *conn).await?;
        tracing::debug!(table = schema.table, id, "Row updated");
        Ok(())
    }

    /// Updates the row when the entity's key is already stored, inserts otherwise.
    pub async fn save(&self, conn: &mut AnyConnection, entity: &mut E) -> AppResult<i64> {
        match entity.id() {
            Some(id) if self.count(conn, &[(self.schema().key, id.into())]).await? > 0 => {
                self.update(conn, entity).await?;
                Ok(id)
            }
            _ => self.insert(conn, entity).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use common::models::{PermissionRecord, Role, UserRole};

    #[tokio::test]
    async fn test_migrate_creates_then_leaves_table() {
        let (pool, dialect) = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = migrate_table(&mut conn, dialect, Role::schema()).await.unwrap();
        assert_eq!(first, TableChange::Created);
        let second = migrate_table(&mut conn, dialect, Role::schema()).await.unwrap();
        assert_eq!(second, TableChange::Unchanged);
    }

    #[tokio::test]
    async fn test_migrate_adds_missing_column() {
        let (pool, dialect) = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        sqlx::query(
            "CREATE TABLE \"roles\" \
             (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" TEXT NOT NULL)",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let change = migrate_table(&mut conn, dialect, Role::schema()).await.unwrap();
        assert_eq!(
            change,
            TableChange::Altered(vec!["active", "protected", "weight"])
        );
    }

    #[tokio::test]
    async fn test_insert_get_and_save_auto_key() {
        let (pool, dialect) = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        migrate_table(&mut conn, dialect, Role::schema()).await.unwrap();

        let mapper = Mapper::<Role>::new(dialect);
        let mut role = Role {
            id: None,
            name: "Editors".into(),
            active: true,
            protected: false,
            weight: 3,
        };
        let id = mapper.save(&mut conn, &mut role).await.unwrap();
        assert_eq!(role.id, Some(id));

        role.weight = 9;
        mapper.save(&mut conn, &mut role).await.unwrap();

        let stored = mapper.get(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(stored.weight, 9);
        assert!(stored.active);
        assert_eq!(mapper.count(&mut conn, &[]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_natural_key_upserts() {
        let (pool, dialect) = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        migrate_table(&mut conn, dialect, PermissionRecord::schema())
            .await
            .unwrap();

        let mapper = Mapper::<PermissionRecord>::new(dialect);
        let mut record = PermissionRecord {
            id: 5,
            name: "A".into(),
            caption: "first".into(),
        };
        mapper.save(&mut conn, &mut record).await.unwrap();
        record.caption = "second".into();
        mapper.save(&mut conn, &mut record).await.unwrap();

        assert_eq!(mapper.count(&mut conn, &[]).await.unwrap(), 1);
        let stored = mapper.get(&mut conn, 5).await.unwrap().unwrap();
        assert_eq!(stored.caption, "second");
    }

    #[tokio::test]
    async fn test_first_by_criteria_and_unknown_column() {
        let (pool, dialect) = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        migrate_table(&mut conn, dialect, UserRole::schema()).await.unwrap();

        let mapper = Mapper::<UserRole>::new(dialect);
        let mut link = UserRole {
            id: None,
            user_id: 1,
            role_id: 2,
        };
        mapper.insert(&mut conn, &mut link).await.unwrap();

        let found = mapper
            .first(&mut conn, &[("user_id", 1i64.into()), ("role_id", 2i64.into())])
            .await
            .unwrap();
        assert_eq!(found, Some(link));

        let missing = mapper
            .first(&mut conn, &[("user_id", 1i64.into()), ("role_id", 3i64.into())])
            .await
            .unwrap();
        assert!(missing.is_none());

        let err = mapper
            .first(&mut conn, &[("nope", 1i64.into())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }
}
