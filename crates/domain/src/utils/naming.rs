//! Metric and label naming rules
//!
//! Fully-qualified names are built the Prometheus way: the non-empty parts
//! among namespace, subsystem and name are joined with `_`. Validation
//! follows the exposition grammar so a bad name fails at construction
//! rather than at the first scrape.

use crate::errors::{PoolStatsError, Result};

/// Join the non-empty parts of a metric name with `_`.
///
/// ```rust
/// use poolstats_domain::build_fq_name;
///
/// assert_eq!(build_fq_name("db", "pool", "idle"), "db_pool_idle");
/// assert_eq!(build_fq_name("", "pool", "idle"), "pool_idle");
/// assert_eq!(build_fq_name("db", "", "idle"), "db_idle");
/// ```
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let parts: Vec<&str> =
        [namespace, subsystem, name].into_iter().filter(|part| !part.is_empty()).collect();
    parts.join("_")
}

/// Validate a namespace or subsystem.
///
/// Empty parts are allowed (they are skipped when building the name); a
/// non-empty part must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` naming the offending field.
pub fn validate_metric_part(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }

    if is_valid_name(value, true) {
        Ok(())
    } else {
        Err(PoolStatsError::InvalidConfiguration(format!(
            "{field} '{value}' is not a valid metric name component"
        )))
    }
}

/// Validate a label name.
///
/// Label names must be non-empty, match `[a-zA-Z_][a-zA-Z0-9_]*` and must not
/// use the reserved `__` prefix.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` for an invalid label name.
pub fn validate_label_name(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PoolStatsError::InvalidConfiguration("label name must not be empty".into()));
    }

    if value.starts_with("__") {
        return Err(PoolStatsError::InvalidConfiguration(format!(
            "label name '{value}' uses the reserved '__' prefix"
        )));
    }

    if is_valid_name(value, false) {
        Ok(())
    } else {
        Err(PoolStatsError::InvalidConfiguration(format!("label name '{value}' is not valid")))
    }
}

fn is_valid_name(value: &str, allow_colon: bool) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    let valid_first = first.is_ascii_alphabetic() || first == '_' || (allow_colon && first == ':');
    valid_first
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fq_name_all_parts() {
        assert_eq!(
            build_fq_name("database_sql_stats", "rust", "max_open"),
            "database_sql_stats_rust_max_open"
        );
    }

    #[test]
    fn test_build_fq_name_skips_empty_parts() {
        assert_eq!(build_fq_name("", "", "idle"), "idle");
        assert_eq!(build_fq_name("ns", "", "idle"), "ns_idle");
        assert_eq!(build_fq_name("ns", "sub", ""), "");
    }

    #[test]
    fn test_metric_part_validation() {
        assert!(validate_metric_part("namespace", "").is_ok());
        assert!(validate_metric_part("namespace", "app:db").is_ok());
        assert!(validate_metric_part("namespace", "_private").is_ok());

        let err = validate_metric_part("subsystem", "9lives").unwrap_err();
        assert!(matches!(err, PoolStatsError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("subsystem"));

        assert!(validate_metric_part("namespace", "has-dash").is_err());
        assert!(validate_metric_part("namespace", "has space").is_err());
    }

    #[test]
    fn test_label_name_validation() {
        assert!(validate_label_name("db_name").is_ok());
        assert!(validate_label_name("db_stat").is_ok());

        assert!(validate_label_name("").is_err());
        assert!(validate_label_name("__reserved").is_err());
        assert!(validate_label_name("db:name").is_err());
        assert!(validate_label_name("1db").is_err());
    }
}
