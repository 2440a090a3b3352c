//! Resolved column and table value types
//!
//! Equality and hashing on these types follow SQLite identifier semantics:
//! case-insensitive on every name field, with the alias history compared as
//! an ordered list. Declared aliases, display names and flags are not part
//! of identity.

use std::hash::{Hash, Hasher};
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Case-insensitive identifier equality. All identifier comparisons in the
/// resolver go through here.
pub(crate) fn ieq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

pub(crate) fn opt_ieq(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ieq(a, b),
        _ => false,
    }
}

fn hash_ci<H: Hasher>(value: Option<&str>, state: &mut H) {
    value.unwrap_or("").to_ascii_lowercase().hash(state);
}

/// What a resolved result column refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// A real table column
    Column,
    /// An expression or a column that could not be mapped to a table
    #[default]
    Other,
}

/// Bitset of tags a column picks up from enclosing constructs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFlags(u8);

impl ColumnFlags {
    pub const FROM_DISTINCT_SELECT: ColumnFlags = ColumnFlags(0x01);
    pub const FROM_GROUPED_SELECT: ColumnFlags = ColumnFlags(0x02);
    pub const FROM_COMPOUND_SELECT: ColumnFlags = ColumnFlags(0x04);
    pub const FROM_ANONYMOUS_SELECT: ColumnFlags = ColumnFlags(0x08);
    pub const FROM_CTE_SELECT: ColumnFlags = ColumnFlags(0x10);

    pub fn empty() -> Self {
        ColumnFlags(0)
    }

    pub fn contains(self, other: ColumnFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ColumnFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ColumnFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the set flags, for display purposes
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::FROM_DISTINCT_SELECT) {
            names.push("distinct");
        }
        if self.contains(Self::FROM_GROUPED_SELECT) {
            names.push("grouped");
        }
        if self.contains(Self::FROM_COMPOUND_SELECT) {
            names.push("compound");
        }
        if self.contains(Self::FROM_ANONYMOUS_SELECT) {
            names.push("anonymous");
        }
        if self.contains(Self::FROM_CTE_SELECT) {
            names.push("cte");
        }
        names
    }
}

impl BitOr for ColumnFlags {
    type Output = ColumnFlags;

    fn bitor(self, rhs: ColumnFlags) -> ColumnFlags {
        ColumnFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColumnFlags {
    fn bitor_assign(&mut self, rhs: ColumnFlags) {
        self.0 |= rhs.0;
    }
}

/// The resolved origin of one result column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    pub kind: ColumnKind,
    /// Database name as written in the query
    pub database: Option<String>,
    /// Attached-database name before any alias translation
    pub original_database: Option<String>,
    /// Underlying table name; absent for expressions and unmapped columns
    pub table: Option<String>,
    /// Alias the table carries in the FROM clause
    pub table_alias: Option<String>,
    /// Aliases peeled off while resolution moved outward through sub-selects
    pub old_table_aliases: Vec<String>,
    /// Column name, or the detokenized expression text
    pub column: Option<String>,
    /// Alias declared on the result column or inside a sub-select
    pub alias: Option<String>,
    pub alias_defined_in_sub_query: bool,
    /// Name presented to the user, unique within a core after fix-up
    pub display_name: Option<String>,
    /// Index of the originating result column in its core's projection
    pub result_column: Option<usize>,
    pub flags: ColumnFlags,
}

impl Column {
    /// Record the current table alias in the history; the caller then
    /// installs the replacement alias.
    pub fn push_table_alias(&mut self) {
        if let Some(alias) = &self.table_alias {
            if !alias.is_empty() {
                self.old_table_aliases.push(alias.clone());
            }
        }
    }

    /// Project this column onto its containing table
    pub fn to_table(&self) -> Table {
        Table {
            database: self.database.clone(),
            original_database: self.original_database.clone(),
            table: self.table.clone(),
            table_alias: self.table_alias.clone(),
            old_table_aliases: self.old_table_aliases.clone(),
            flags: self.flags,
        }
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        opt_ieq(self.column.as_deref(), other.column.as_deref())
            && opt_ieq(self.table.as_deref(), other.table.as_deref())
            && opt_ieq(self.database.as_deref(), other.database.as_deref())
            && opt_ieq(self.table_alias.as_deref(), other.table_alias.as_deref())
            && self.old_table_aliases.len() == other.old_table_aliases.len()
            && self
                .old_table_aliases
                .iter()
                .zip(&other.old_table_aliases)
                .all(|(a, b)| ieq(a, b))
    }
}

impl Eq for Column {}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ci(self.database.as_deref(), state);
        hash_ci(self.table.as_deref(), state);
        hash_ci(self.column.as_deref(), state);
        hash_ci(self.table_alias.as_deref(), state);
        for alias in &self.old_table_aliases {
            alias.to_ascii_lowercase().hash(state);
        }
    }
}

/// A table contributing columns to a core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub database: Option<String>,
    pub original_database: Option<String>,
    pub table: Option<String>,
    pub table_alias: Option<String>,
    pub old_table_aliases: Vec<String>,
    pub flags: ColumnFlags,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        opt_ieq(self.table.as_deref(), other.table.as_deref())
            && opt_ieq(self.database.as_deref(), other.database.as_deref())
            && opt_ieq(self.table_alias.as_deref(), other.table_alias.as_deref())
            && self.old_table_aliases.len() == other.old_table_aliases.len()
            && self
                .old_table_aliases
                .iter()
                .zip(&other.old_table_aliases)
                .all(|(a, b)| ieq(a, b))
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ci(self.database.as_deref(), state);
        hash_ci(self.table.as_deref(), state);
        hash_ci(self.table_alias.as_deref(), state);
        for alias in &self.old_table_aliases {
            alias.to_ascii_lowercase().hash(state);
        }
    }
}
