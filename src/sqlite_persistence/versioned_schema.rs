use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

/// Offset added to schema versions when stored in `PRAGMA user_version`, so
/// that a fresh SQLite file (user_version 0) is never mistaken for version 0.
pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(SqlType::Text),
            "INTEGER" => Some(SqlType::Integer),
            _ => None,
        }
    }
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'a str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    /// (index name, indexed columns)
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    fn create_sql(&self) -> String {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    def.push_str(" NOT NULL");
                }
                if column.is_unique {
                    def.push_str(" UNIQUE");
                }
                if let Some(default_value) = column.default_value {
                    def.push_str(&format!(" DEFAULT {}", default_value));
                }
                def
            })
            .collect();
        for unique in self.unique_constraints {
            columns.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        format!("CREATE TABLE {} ({});", self.name, columns.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )
            .with_context(|| format!("Failed to create index {}", index_name))?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        self.validate_columns(conn)?;
        self.validate_indices(conn)?;
        self.validate_unique_constraints(conn)
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            sql_type: String,
            non_null: bool,
            default_value: Option<String>,
            is_primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<ActualColumn> = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}, expected: {}",
                self.name,
                actual.len(),
                self.columns.len(),
                actual
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if SqlType::parse(&actual.sql_type).as_ref() != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            let actual_default = actual.default_value.as_deref().map(strip_parentheses);
            let expected_default = expected.default_value.map(strip_parentheses);
            if actual_default != expected_default {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(()),
                )
                .is_ok();
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        if self.unique_constraints.is_empty() {
            return Ok(());
        }

        // Unique constraints show up as unique indices in PRAGMA index_list.
        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, unique)| *unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut indexed_column_sets: Vec<Vec<String>> = Vec::new();
        for index_name in &unique_indices {
            let mut stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut columns: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            columns.sort();
            indexed_column_sets.push(columns);
        }

        for expected in self.unique_constraints {
            let mut expected_sorted: Vec<&str> = expected.to_vec();
            expected_sorted.sort();
            let found = indexed_column_sets
                .iter()
                .any(|columns| columns.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected.join(", ")
                );
            }
        }
        Ok(())
    }
}

fn strip_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    /// Brings a database at `version - 1` up to `version`.
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        set_db_version(conn, self.version)
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Read the schema version stored in the database, if it was created by us.
pub fn read_db_version(conn: &Connection) -> Result<Option<usize>> {
    let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let user_version = usize::try_from(user_version).unwrap_or(0);
    Ok(user_version.checked_sub(BASE_DB_VERSION))
}

fn set_db_version(conn: &Connection, version: usize) -> Result<()> {
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + version),
        [],
    )?;
    Ok(())
}

/// Bring `conn` to the latest of `schemas`.
///
/// An empty database gets the latest schema created from scratch. A database
/// at an older version is validated against that version and then migrated
/// forward one step at a time. `schemas` must be ordered by version, with
/// versions starting at 0 and increasing by one.
pub fn initialize(conn: &mut Connection, schemas: &[VersionedSchema], label: &str) -> Result<()> {
    let Some(latest) = schemas.last() else {
        bail!("No schema defined for {}", label);
    };

    let has_tables: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table')",
        [],
        |row| row.get(0),
    )?;
    if !has_tables {
        info!("Creating {} database at version {}", label, latest.version);
        let tx = conn.transaction()?;
        latest.create(&tx)?;
        tx.commit()?;
        return Ok(());
    }

    let Some(current) = read_db_version(conn)? else {
        bail!("{} database has tables but no recognizable schema version", label);
    };
    let Some(current_schema) = schemas.iter().find(|s| s.version == current) else {
        bail!(
            "{} database is at version {}, latest known is {}",
            label,
            current,
            latest.version
        );
    };
    current_schema
        .validate(conn)
        .with_context(|| format!("{} database failed validation at version {}", label, current))?;

    for schema in schemas.iter().filter(|s| s.version > current) {
        info!("Migrating {} database to version {}", label, schema.version);
        let tx = conn.transaction()?;
        if let Some(migration) = schema.migration {
            migration(&tx)?;
        }
        set_db_version(&tx, schema.version)?;
        tx.commit()?;
    }
    if current < latest.version {
        latest.validate(conn)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS_V0: Table = Table {
        name: "items",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("name", &SqlType::Text, non_null = true),
        ],
        indices: &[("idx_items_name", "name")],
        unique_constraints: &[],
    };

    const TAGS_V1: Table = Table {
        name: "tags",
        columns: &[
            sqlite_column!("item_id", &SqlType::Integer, non_null = true),
            sqlite_column!("tag", &SqlType::Text, non_null = true),
            sqlite_column!("weight", &SqlType::Integer, default_value = Some("0")),
        ],
        indices: &[],
        unique_constraints: &[&["item_id", "tag"]],
    };

    fn add_tags_table(conn: &Connection) -> Result<()> {
        TAGS_V1.create(conn)
    }

    const SCHEMAS: &[VersionedSchema] = &[
        VersionedSchema {
            version: 0,
            tables: &[ITEMS_V0],
            migration: None,
        },
        VersionedSchema {
            version: 1,
            tables: &[ITEMS_V0, TAGS_V1],
            migration: Some(add_tags_table),
        },
    ];

    #[test]
    fn creates_latest_schema_on_empty_db() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn, SCHEMAS, "test").unwrap();

        assert_eq!(read_db_version(&conn).unwrap(), Some(1));
        SCHEMAS[1].validate(&conn).unwrap();
    }

    #[test]
    fn migrates_from_older_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        SCHEMAS[0].create(&conn).unwrap();
        assert_eq!(read_db_version(&conn).unwrap(), Some(0));

        initialize(&mut conn, SCHEMAS, "test").unwrap();

        assert_eq!(read_db_version(&conn).unwrap(), Some(1));
        conn.execute("INSERT INTO tags (item_id, tag) VALUES (1, 'a')", [])
            .unwrap();
        let duplicate = conn.execute("INSERT INTO tags (item_id, tag) VALUES (1, 'a')", []);
        assert!(duplicate.is_err());
    }

    #[test]
    fn rejects_unknown_tables_without_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE other (x INTEGER)", []).unwrap();

        let result = initialize(&mut conn, SCHEMAS, "test");
        assert!(result.is_err());
    }

    #[test]
    fn validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let err = SCHEMAS[0].validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_items_name"));
    }

    #[test]
    fn validate_detects_type_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name INTEGER NOT NULL)",
            [],
        )
        .unwrap();

        let err = SCHEMAS[0].validate(&conn).unwrap_err().to_string();
        assert!(err.contains("type mismatch"));
    }

    #[test]
    fn validate_detects_missing_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE tags (item_id INTEGER NOT NULL, tag TEXT NOT NULL, weight INTEGER DEFAULT 0)",
            [],
        )
        .unwrap();

        let err = TAGS_V1.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing unique constraint"));
    }

    #[test]
    fn validate_detects_default_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE tags (item_id INTEGER NOT NULL, tag TEXT NOT NULL, weight INTEGER DEFAULT 5, UNIQUE (tag, item_id))",
            [],
        )
        .unwrap();

        let err = TAGS_V1.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("default value mismatch"));
    }
}
