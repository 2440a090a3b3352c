//! SQLite data type descriptors
//!
//! SQLite type names are declarations, not constraints: a column may carry
//! any spelling, including one outside the well-known vocabulary. The
//! descriptor therefore keeps the original spelling verbatim next to the
//! classified kind.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed vocabulary of recognized type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataTypeKind {
    BigInt,
    Blob,
    Boolean,
    Char,
    Date,
    DateTime,
    Decimal,
    Double,
    Integer,
    Int,
    None,
    Numeric,
    Real,
    String,
    Text,
    Time,
    Varchar,
    /// Name not in the vocabulary (original spelling kept on the descriptor)
    Unknown,
}

impl DataTypeKind {
    /// The canonical upper-case spelling of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DataTypeKind::BigInt => "BIGINT",
            DataTypeKind::Blob => "BLOB",
            DataTypeKind::Boolean => "BOOLEAN",
            DataTypeKind::Char => "CHAR",
            DataTypeKind::Date => "DATE",
            DataTypeKind::DateTime => "DATETIME",
            DataTypeKind::Decimal => "DECIMAL",
            DataTypeKind::Double => "DOUBLE",
            DataTypeKind::Integer => "INTEGER",
            DataTypeKind::Int => "INT",
            DataTypeKind::None => "NONE",
            DataTypeKind::Numeric => "NUMERIC",
            DataTypeKind::Real => "REAL",
            DataTypeKind::String => "STRING",
            DataTypeKind::Text => "TEXT",
            DataTypeKind::Time => "TIME",
            DataTypeKind::Varchar => "VARCHAR",
            DataTypeKind::Unknown => "",
        }
    }

    /// Case-insensitive lookup of a type name; unknown names map to `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "BIGINT" => DataTypeKind::BigInt,
            "BLOB" => DataTypeKind::Blob,
            "BOOLEAN" => DataTypeKind::Boolean,
            "CHAR" => DataTypeKind::Char,
            "DATE" => DataTypeKind::Date,
            "DATETIME" => DataTypeKind::DateTime,
            "DECIMAL" => DataTypeKind::Decimal,
            "DOUBLE" => DataTypeKind::Double,
            "INTEGER" => DataTypeKind::Integer,
            "INT" => DataTypeKind::Int,
            "NONE" => DataTypeKind::None,
            "NUMERIC" => DataTypeKind::Numeric,
            "REAL" => DataTypeKind::Real,
            "STRING" => DataTypeKind::String,
            "TEXT" => DataTypeKind::Text,
            "TIME" => DataTypeKind::Time,
            "VARCHAR" => DataTypeKind::Varchar,
            _ => DataTypeKind::Unknown,
        }
    }

    /// Every recognized kind, `Unknown` excluded
    pub fn all() -> &'static [DataTypeKind] {
        use DataTypeKind::*;
        &[
            BigInt, Blob, Boolean, Char, Date, DateTime, Decimal, Double, Integer, Int, None,
            Numeric, Real, String, Text, Time, Varchar,
        ]
    }

    /// Names of every recognized kind, `Unknown` excluded
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|k| k.as_str()).collect()
    }

    /// The fixed sequence offered by UI type dropdowns
    pub fn ui_dropdown() -> &'static [DataTypeKind] {
        use DataTypeKind::*;
        &[Blob, Integer, Numeric, Real, Text]
    }
}

/// Grammar: `NAME ( '(' NUM ( ',' NUM )? ')' )?` with the name being any run
/// of characters up to the opening parenthesis.
static TYPE_STRING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?x)
        ^ \s* (?P<name>[^(]*?) \s*
        (?: \( \s* (?P<scale>\d+) \s* (?: , \s* (?P<precision>\d+) \s* )? \) )?
        \s* $
    ")
    .expect("type string pattern is valid")
});

impl Default for DataTypeKind {
    fn default() -> Self {
        DataTypeKind::Unknown
    }
}

/// A parsed SQL type declaration, e.g. `DECIMAL(10,2)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    kind: DataTypeKind,
    name: String,
    scale: Option<u32>,
    precision: Option<u32>,
}

impl DataType {
    /// The empty descriptor (no declared type)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a descriptor from an already-known kind
    pub fn from_kind(kind: DataTypeKind) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            scale: None,
            precision: None,
        }
    }

    /// Build a descriptor from raw parts, classifying the name
    pub fn with_parts(name: impl Into<String>, scale: Option<u32>, precision: Option<u32>) -> Self {
        let name = name.into();
        Self {
            kind: DataTypeKind::from_name(&name),
            name,
            scale,
            precision,
        }
    }

    /// Parse a full type string. Strings that do not match the grammar yield
    /// the empty descriptor.
    pub fn parse(full_type: &str) -> Self {
        let Some(caps) = TYPE_STRING_RE.captures(full_type) else {
            return Self::empty();
        };

        let name = caps.name("name").map(|m| m.as_str().trim()).unwrap_or("");
        if name.is_empty() {
            return Self::empty();
        }

        let scale = caps.name("scale").and_then(|m| m.as_str().parse().ok());
        let precision = caps.name("precision").and_then(|m| m.as_str().parse().ok());
        Self::with_parts(name, scale, precision)
    }

    pub fn kind(&self) -> DataTypeKind {
        self.kind
    }

    /// The type name exactly as written in the declaration
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// True for the exact-width and floating numeric kinds
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::BigInt
                | DataTypeKind::Decimal
                | DataTypeKind::Double
                | DataTypeKind::Integer
                | DataTypeKind::Int
                | DataTypeKind::Numeric
                | DataTypeKind::Real
        )
    }

    /// Checks the raw spelling, so declarations like `CLOB` outside the
    /// vocabulary are still reported as binary.
    pub fn is_binary(&self) -> bool {
        matches!(self.name.to_ascii_uppercase().as_str(), "BLOB" | "CLOB" | "LOB")
    }

    /// True when the name did not classify into the vocabulary
    pub fn is_null(&self) -> bool {
        self.kind == DataTypeKind::Unknown
    }

    /// True when no type was declared at all
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// The declaration with scale and precision re-attached; re-parsing the
    /// result yields an equal descriptor.
    pub fn to_full_string(&self) -> String {
        match (self.scale, self.precision) {
            (Some(scale), Some(precision)) => format!("{} ({}, {})", self.name, scale, precision),
            (Some(scale), None) => format!("{} ({})", self.name, scale),
            _ => self.name.clone(),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_string())
    }
}
