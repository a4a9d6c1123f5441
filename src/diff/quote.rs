//! SQL identifier quoting for generated statements.

/// All SQLite keywords, in alphabetical order for binary search.
static KEYWORDS: &[&str] = &[
    "ABORT",
    "ACTION",
    "ADD",
    "AFTER",
    "ALL",
    "ALTER",
    "ANALYZE",
    "AND",
    "AS",
    "ASC",
    "ATTACH",
    "AUTOINCREMENT",
    "BEFORE",
    "BEGIN",
    "BETWEEN",
    "BY",
    "CASCADE",
    "CASE",
    "CAST",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "COMMIT",
    "CONFLICT",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "DATABASE",
    "DEFAULT",
    "DEFERRABLE",
    "DEFERRED",
    "DELETE",
    "DESC",
    "DETACH",
    "DISTINCT",
    "DROP",
    "EACH",
    "ELSE",
    "END",
    "ESCAPE",
    "EXCEPT",
    "EXCLUSIVE",
    "EXISTS",
    "EXPLAIN",
    "FAIL",
    "FOR",
    "FOREIGN",
    "FROM",
    "FULL",
    "GLOB",
    "GROUP",
    "HAVING",
    "IF",
    "IGNORE",
    "IMMEDIATE",
    "IN",
    "INDEX",
    "INDEXED",
    "INITIALLY",
    "INNER",
    "INSERT",
    "INSTEAD",
    "INTERSECT",
    "INTO",
    "IS",
    "ISNULL",
    "JOIN",
    "KEY",
    "LEFT",
    "LIKE",
    "LIMIT",
    "MATCH",
    "NATURAL",
    "NO",
    "NOT",
    "NOTNULL",
    "NULL",
    "OF",
    "OFFSET",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "PLAN",
    "PRAGMA",
    "PRIMARY",
    "QUERY",
    "RAISE",
    "RECURSIVE",
    "REFERENCES",
    "REGEXP",
    "REINDEX",
    "RELEASE",
    "RENAME",
    "REPLACE",
    "RESTRICT",
    "RIGHT",
    "ROLLBACK",
    "ROW",
    "SAVEPOINT",
    "SELECT",
    "SET",
    "TABLE",
    "TEMP",
    "TEMPORARY",
    "THEN",
    "TO",
    "TRANSACTION",
    "TRIGGER",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "USING",
    "VACUUM",
    "VALUES",
    "VIEW",
    "VIRTUAL",
    "WHEN",
    "WHERE",
    "WITH",
    "WITHOUT",
];

/// Wrap in double quotes, doubling any internal double quote.
fn double_quote(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for c in id.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Safely quote an SQL identifier, using the minimum transformation needed
/// for the result to stand alone in generated SQL.
///
/// Plain alphabetic names pass through verbatim; names with a numeric suffix
/// after at least one letter also pass through; keywords and anything else
/// are wrapped in double quotes with internal quotes doubled.
pub fn quote_identifier(id: &str) -> String {
    if id.is_empty() {
        return "\"\"".to_string();
    }
    // Already a quoted token with no internal quotes: leave it alone, so
    // quoting is idempotent on its own output.
    if id.len() >= 2
        && id.starts_with('"')
        && id.ends_with('"')
        && !id[1..id.len() - 1].contains('"')
    {
        return id.to_string();
    }
    let mut numeric_suffix = false;
    for (i, c) in id.chars().enumerate() {
        if !c.is_ascii_alphabetic() && c != '_' {
            if i > 0 && c.is_ascii_digit() {
                numeric_suffix = true;
            } else {
                return double_quote(id);
            }
        }
    }
    if numeric_suffix {
        return id.to_string();
    }
    let upper = id.to_ascii_uppercase();
    if KEYWORDS.binary_search(&upper.as_str()).is_ok() {
        return double_quote(id);
    }
    id.to_string()
}

/// Double every single quote so `s` can sit inside a single-quoted SQL
/// literal. Used for table names inside the RBU `data_` DDL.
pub fn escape_single_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out
}
