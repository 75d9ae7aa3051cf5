//! Destination table name rules.
//!
//! Two distinct strip rules are in play. Delta-table targets use
//! [`sanitize_table_name`] (dots to underscores, default-schema prefix
//! dropped). Bracket-quoted identifiers coming from the bcp path use
//! [`strip_brackets`]. Callers pick one according to the naming convention
//! their source uses; neither enforces uniqueness, colliding names silently
//! overwrite each other remotely.

/// Derives a lakehouse table name from a table identifier or override.
///
/// Every `.` becomes `_`, then a literal leading `dbo_` is dropped. The
/// prefix match is case-sensitive and applies only to the exact default
/// schema name, `aw.DimCurrency` stays `aw_DimCurrency`.
pub fn sanitize_table_name(identifier: &str) -> String {
    let name = identifier.replace('.', "_");
    match name.strip_prefix("dbo_") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// Removes bracket quoting from an identifier, e.g. `[Account]` to `Account`.
pub fn strip_brackets(identifier: &str) -> String {
    identifier
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_drops_default_schema() {
        assert_eq!(sanitize_table_name("dbo.Orders"), "Orders");
        assert_eq!(sanitize_table_name("aw.DimCurrency"), "aw_DimCurrency");
    }

    #[test]
    fn test_sanitize_prefix_is_literal() {
        // Case-sensitive, exact prefix only.
        assert_eq!(sanitize_table_name("DBO.Orders"), "DBO_Orders");
        assert_eq!(sanitize_table_name("sdbo.Orders"), "sdbo_Orders");
        assert_eq!(sanitize_table_name("dbo_dbo.X"), "dbo_X");
    }

    #[test]
    fn test_sanitize_passthrough() {
        assert_eq!(sanitize_table_name("Orders"), "Orders");
        assert_eq!(sanitize_table_name("a.b.c"), "a_b_c");
    }

    #[test]
    fn test_strip_brackets() {
        assert_eq!(strip_brackets("[Account]"), "Account");
        assert_eq!(strip_brackets("Account"), "Account");
        assert_eq!(strip_brackets("[[Fact Table]]"), "Fact Table");
    }
}
