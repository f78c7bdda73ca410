//! # Utility Functions Module
//!
//! This module provides utility functions that improve code readability
//! and reduce boilerplate across the application.

/// Converts a vector of string-like items to Vec<String>.
///
/// Accepts any iterable of items that can be converted to String,
/// eliminating repetitive `.to_string()` calls when building external tool
/// argument lists.
///
/// # Example
/// ```rust
/// use pressroom::utils::to_string_vec;
///
/// let args = to_string_vec(["-optimize", "-progressive"]);
/// assert_eq!(args, vec!["-optimize".to_string(), "-progressive".to_string()]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for even more convenient argument building.
///
/// # Example
/// ```rust
/// use pressroom::args;
///
/// let level = 3;
/// let args = args![&format!("-O{}", level), "-o", "out.gif"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item),*])
    };
}
