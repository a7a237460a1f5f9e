//! SQL rendering per backend.
//!
//! Identifier quoting, placeholders, column types and the handful of
//! statements whose syntax differs between MySQL, PostgreSQL and SQLite.

use common::models::{Column, ColumnType, DbType, KeyKind, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    db_type: DbType,
}

impl Dialect {
    pub fn new(db_type: DbType) -> Self {
        Self { db_type }
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn quote(&self, ident: &str) -> String {
        match self.db_type {
            DbType::MySQL => format!("`{}`", ident),
            DbType::Postgres | DbType::SQLite => format!("\"{}\"", ident),
        }
    }

    /// Bind placeholder for the `n`-th parameter (1-based).
    pub fn placeholder(&self, n: usize) -> String {
        match self.db_type {
            DbType::Postgres => format!("${}", n),
            DbType::MySQL | DbType::SQLite => "?".to_string(),
        }
    }

    /// Whether inserted keys are read back with `RETURNING` rather than from
    /// the driver's last-insert-id.
    pub fn uses_returning(&self) -> bool {
        !matches!(self.db_type, DbType::MySQL)
    }

    pub fn column_type(&self, kind: ColumnType) -> &'static str {
        match (self.db_type, kind) {
            (DbType::SQLite, ColumnType::BigInt | ColumnType::Bool) => "INTEGER",
            (DbType::SQLite, _) => "TEXT",
            (_, ColumnType::BigInt | ColumnType::Bool) => "BIGINT",
            (_, ColumnType::Text | ColumnType::Timestamp | ColumnType::Date) => "VARCHAR(255)",
        }
    }

    fn key_definition(&self, schema: &TableSchema) -> String {
        let key = self.quote(schema.key);
        match (schema.key_kind, self.db_type) {
            (KeyKind::AutoIncrement, DbType::SQLite) => {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", key)
            }
            (KeyKind::AutoIncrement, DbType::MySQL) => {
                format!("{} BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY", key)
            }
            (KeyKind::AutoIncrement, DbType::Postgres) => format!("{} BIGSERIAL PRIMARY KEY", key),
            (KeyKind::Natural, DbType::SQLite) => format!("{} INTEGER NOT NULL PRIMARY KEY", key),
            (KeyKind::Natural, _) => format!("{} BIGINT NOT NULL PRIMARY KEY", key),
        }
    }

    fn column_definition(&self, column: &Column, allow_not_null: bool) -> String {
        let mut def = format!("{} {}", self.quote(column.name), self.column_type(column.kind));
        if allow_not_null && !column.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }

    pub fn create_table(&self, schema: &TableSchema) -> String {
        let mut defs = vec![self.key_definition(schema)];
        defs.extend(schema.columns.iter().map(|c| self.column_definition(c, true)));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote(schema.table),
            defs.join(", ")
        )
    }

    /// Columns added to an existing table are nullable so rows already
    /// present stay valid.
    pub fn add_column(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table),
            self.column_definition(column, false)
        )
    }

    /// Query listing a table's column names; binds the table name once.
    pub fn list_columns(&self) -> &'static str {
        match self.db_type {
            DbType::SQLite => "SELECT name FROM pragma_table_info(?)",
            DbType::MySQL => {
                "SELECT CAST(COLUMN_NAME AS CHAR) AS name FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?"
            }
            DbType::Postgres => {
                "SELECT column_name::text AS name FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Entity, PermissionRecord, UserRole};

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::new(DbType::Postgres).placeholder(3), "$3");
        assert_eq!(Dialect::new(DbType::MySQL).placeholder(3), "?");
    }

    #[test]
    fn test_create_table_sqlite() {
        let sql = Dialect::new(DbType::SQLite).create_table(UserRole::schema());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"user_roles\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"user_id\" INTEGER NOT NULL, \"role_id\" INTEGER NOT NULL)"
        );
    }

    #[test]
    fn test_create_lookup_table_mysql() {
        let sql = Dialect::new(DbType::MySQL).create_table(PermissionRecord::schema());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `permissions` (`id` BIGINT NOT NULL PRIMARY KEY, \
             `name` VARCHAR(255) NOT NULL, `caption` VARCHAR(255) NOT NULL)"
        );
    }

    #[test]
    fn test_added_columns_are_nullable() {
        let column = Column::new("weight", ColumnType::BigInt);
        assert_eq!(
            Dialect::new(DbType::Postgres).add_column("roles", &column),
            "ALTER TABLE \"roles\" ADD COLUMN \"weight\" BIGINT"
        );
    }
}
