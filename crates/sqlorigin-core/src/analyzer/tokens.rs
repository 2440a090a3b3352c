//! Token-level helpers for the resolver

use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Span, Token, Tokenizer};

/// Drop a trailing `AS alias` from a result-column rendering.
///
/// The scan tracks parenthesis depth so an `AS` inside a call such as
/// `CAST(x AS INTEGER)` is not mistaken for the alias keyword; only the
/// first top-level `AS` cuts the text.
pub(crate) fn strip_trailing_alias(sql: &str, dialect: &dyn Dialect) -> String {
    let Ok(tokens) = Tokenizer::new(dialect, sql).tokenize() else {
        return sql.trim().to_string();
    };

    let mut depth = 0i32;
    let mut cut = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::Word(word) if word.keyword == Keyword::AS && depth <= 0 => {
                cut = Some(i);
                break;
            }
            _ => {}
        }
    }

    match cut {
        Some(i) => tokens[..i]
            .iter()
            .map(|t| t.to_string())
            .collect::<String>()
            .trim()
            .to_string(),
        None => sql.trim().to_string(),
    }
}

/// Remove one layer of identifier quoting (`"x"`, `'x'`, `` `x` ``, `[x]`)
pub(crate) fn strip_object_name(name: &str) -> String {
    let name = name.trim();
    let bytes = name.as_bytes();
    if bytes.len() >= 2 {
        let quoted = matches!(
            (bytes[0], bytes[bytes.len() - 1]),
            (b'"', b'"') | (b'\'', b'\'') | (b'`', b'`') | (b'[', b']')
        );
        if quoted {
            return name[1..name.len() - 1].to_string();
        }
    }
    name.to_string()
}

/// The unquoted text a token refers to
pub(crate) fn token_text(token: &Token) -> String {
    match token {
        Token::Word(word) => word.value.clone(),
        Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => s.clone(),
        other => strip_object_name(&other.to_string()),
    }
}

/// True when `loc` falls inside `span` (start inclusive, end exclusive)
pub(crate) fn span_contains(span: Span, loc: Location) -> bool {
    let start = (span.start.line, span.start.column);
    let end = (span.end.line, span.end.column);
    let at = (loc.line, loc.column);
    start <= at && at < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::SQLiteDialect;

    fn strip(sql: &str) -> String {
        strip_trailing_alias(sql, &SQLiteDialect {})
    }

    #[test]
    fn test_strip_simple_alias() {
        assert_eq!(strip("a + 1 AS s"), "a + 1");
        assert_eq!(strip("a + 1 as s"), "a + 1");
    }

    #[test]
    fn test_strip_keeps_parenthesized_as() {
        assert_eq!(strip("CAST(a AS INTEGER) AS n"), "CAST(a AS INTEGER)");
        assert_eq!(strip("CAST(a AS INTEGER)"), "CAST(a AS INTEGER)");
    }

    #[test]
    fn test_strip_without_alias_is_identity() {
        assert_eq!(strip("count(*)"), "count(*)");
        assert_eq!(strip("  a || b  "), "a || b");
    }

    #[test]
    fn test_strip_object_name() {
        assert_eq!(strip_object_name("\"col\""), "col");
        assert_eq!(strip_object_name("[col]"), "col");
        assert_eq!(strip_object_name("`col`"), "col");
        assert_eq!(strip_object_name("col"), "col");
        assert_eq!(strip_object_name("\""), "\"");
    }
}
