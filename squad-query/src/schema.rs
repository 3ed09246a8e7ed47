//! Table definitions used to create tables in a record store.

use crate::sql::DatabaseType;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// UTF-8 text.
    Text,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Storage class.
    pub ty: ColumnType,
    /// Whether null is allowed.
    pub nullable: bool,
    /// Generated primary key.
    pub primary_key: bool,
    /// Referenced `(table, column)`, if any.
    pub references: Option<(&'static str, &'static str)>,
}

impl ColumnDef {
    /// A generated integer primary key.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
            nullable: false,
            primary_key: true,
            references: None,
        }
    }

    /// A non-null column.
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            primary_key: false,
            references: None,
        }
    }

    /// A nullable column.
    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            primary_key: false,
            references: None,
        }
    }

    /// Add a foreign key reference.
    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    fn write_sql(&self, db_type: DatabaseType, sql: &mut String) {
        sql.push_str(self.name);
        match (self.primary_key, db_type) {
            (true, DatabaseType::SQLite) => {
                sql.push_str(" INTEGER PRIMARY KEY AUTOINCREMENT");
                return;
            }
            (false, _) => {}
        }
        sql.push_str(match (self.ty, db_type) {
            (ColumnType::Integer, DatabaseType::SQLite) => " INTEGER",
            (ColumnType::Text, _) => " TEXT",
        });
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some((table, column)) = self.references {
            sql.push_str(" REFERENCES ");
            sql.push_str(table);
            sql.push('(');
            sql.push_str(column);
            sql.push(')');
        }
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a table definition.
    pub fn new(name: &'static str, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        Self {
            name,
            columns: columns.into_iter().collect(),
        }
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The generated primary key column, if any.
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Render `CREATE TABLE IF NOT EXISTS`.
    pub fn to_create_sql(&self, db_type: DatabaseType) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", self.name);
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            column.write_sql(db_type, &mut sql);
        }
        sql.push(')');
        sql
    }
}
