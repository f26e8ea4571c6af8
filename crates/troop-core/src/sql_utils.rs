//! SQL quoting utilities for statements built around the ledger table.

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use troop_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("migrations"), r#""migrations""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name (e.g. `ops.migrations`).
///
/// # Examples
/// ```
/// use troop_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("ops.migrations"), r#""ops"."migrations""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a table name into an optional schema and the bare table name.
///
/// `None` means the name is unqualified and resolves against the connection's
/// current schema.
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Render `value` as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
