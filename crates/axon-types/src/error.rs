//! Unified error contract.
//!
//! Axon distinguishes two error tiers. Invariant violations (wrong
//! thread, double close, kind/table mismatch) are bugs in the embedding
//! code and panic. Everything else is a value: an enum deriving
//! `thiserror::Error` and implementing [`ErrorCode`] so callers can
//! branch on a stable machine-readable code and decide whether a retry
//! is worth attempting.
//!
//! # Example
//!
//! ```
//! use axon_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Unreachable,
//!     BadAddress,
//! }
//!
//! impl ErrorCode for FetchError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Unreachable => "FETCH_UNREACHABLE",
//!             Self::BadAddress => "FETCH_BAD_ADDRESS",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Unreachable)
//!     }
//! }
//! ```

/// Stable machine-readable error classification.
///
/// Codes are `UPPER_SNAKE_CASE`, prefixed with the owning domain
/// (`MSG_`, `ADDON_`, `BRIDGE_`, ...), and part of the API contract:
/// once published they do not change.
///
/// Recoverability answers one question: could retrying, or a caller-side
/// correction at runtime, make the operation succeed? Malformed input is
/// not recoverable (the input must change); a full queue is.
pub trait ErrorCode {
    /// The stable code for this error value.
    fn code(&self) -> &'static str;

    /// Whether a retry or runtime correction may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that one error's code follows axon conventions.
///
/// Checks the code is non-empty `UPPER_SNAKE_CASE` and carries the
/// expected domain prefix. Intended for tests covering every variant of
/// an error enum.
///
/// # Panics
///
/// Panics with a descriptive message when any check fails.
pub fn assert_error_code<E: ErrorCode>(err: &E, prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(prefix),
        "error code '{code}' must start with '{prefix}'"
    );
    assert!(
        upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts a whole table of error values at once.
///
/// ```
/// use axon_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self { E::A => "X_A", E::B => "X_B" }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "X_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], prefix: &str) {
    for err in errors {
        assert_error_code(err, prefix);
    }
}

fn upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum SampleError {
        Full,
        Invalid,
    }

    impl ErrorCode for SampleError {
        fn code(&self) -> &'static str {
            match self {
                Self::Full => "SAMPLE_FULL",
                Self::Invalid => "SAMPLE_INVALID",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Full)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(SampleError::Full.code(), "SAMPLE_FULL");
        assert!(SampleError::Full.is_recoverable());
        assert!(!SampleError::Invalid.is_recoverable());
    }

    #[test]
    fn assert_helpers_accept_valid_tables() {
        assert_error_codes(&[SampleError::Full, SampleError::Invalid], "SAMPLE_");
    }

    #[test]
    #[should_panic(expected = "must start with")]
    fn wrong_prefix_panics() {
        assert_error_code(&SampleError::Full, "OTHER_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(upper_snake_case("A_B_1"));
        assert!(!upper_snake_case(""));
        assert!(!upper_snake_case("a_b"));
        assert!(!upper_snake_case("_A"));
        assert!(!upper_snake_case("A_"));
        assert!(!upper_snake_case("A__B"));
    }
}
