//! Macros for reducing boilerplate code
//!
//! Declarative macros for patterns repeated across modules, such as string
//! conversions of small status-like enums.

/// Implements `Display` and `FromStr` for status-like enums
///
/// Each variant maps to a canonical lowercase string used by `Display`.
/// Extra spellings accepted by `FromStr` can be listed after a `|`.
/// Parsing is case-insensitive and ignores surrounding whitespace.
///
/// # Example
///
/// ```rust
/// use keeper_common::impl_status_conversions;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum Verbosity {
///     Quiet,
///     Normal,
///     Loud,
/// }
///
/// impl_status_conversions!(Verbosity {
///     Quiet => "quiet" | "silent",
///     Normal => "normal",
///     Loud => "loud",
/// });
///
/// assert_eq!(Verbosity::Quiet.to_string(), "quiet");
/// assert_eq!("SILENT".parse::<Verbosity>(), Ok(Verbosity::Quiet));
/// ```
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
