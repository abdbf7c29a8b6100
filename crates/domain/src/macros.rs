//! Macro for implementing Display and FromStr for small domain enums
//!
//! Used for value kinds, loop states and log formats so that their string
//! forms (as written in config files and log fields) stay in one table.
//!
//! # Example
//!
//! ```rust
//! use poolstats_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum PoolMode {
//!     Shared,
//!     Exclusive,
//! }
//!
//! impl_domain_enum_conversions!(PoolMode {
//!     Shared => "shared",
//!     Exclusive => "exclusive",
//! });
//!
//! assert_eq!(PoolMode::Shared.to_string(), "shared");
//! assert_eq!("EXCLUSIVE".parse::<PoolMode>(), Ok(PoolMode::Exclusive));
//! ```

/// Implements Display and FromStr traits for unit-only enums
///
/// This macro generates:
/// - Display trait: converts enum variants to lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "GAUGE", "gauge", "Gauge" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
