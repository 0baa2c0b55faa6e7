//! Assertion helpers in the style of the layout-test description library.
//!
//! Each helper reports exactly one pass or fail message and returns whether
//! the check held, so callers can fold the result into a step outcome.

use std::fmt::Display;

use crate::report::Reporter;

/// Reports whether `actual == expected`.
pub fn should_be<T>(reporter: &dyn Reporter, expr: &str, actual: &T, expected: &T) -> bool
where
    T: PartialEq + Display + ?Sized,
{
    if actual == expected {
        reporter.passed(&format!("{} is {}", expr, expected));
        true
    } else {
        reporter.failed(&format!("{} should be {}. Was {}.", expr, expected, actual));
        false
    }
}

/// Reports whether two named values are equal, naming both in the pass message.
pub fn should_be_same<T>(
    reporter: &dyn Reporter,
    expr: &str,
    actual: &T,
    expected_expr: &str,
    expected: &T,
) -> bool
where
    T: PartialEq + Display + ?Sized,
{
    if actual == expected {
        reporter.passed(&format!("{} is {}", expr, expected_expr));
        true
    } else {
        reporter.failed(&format!("{} should be {}. Was {}.", expr, expected, actual));
        false
    }
}

/// Reports whether a value is present.
pub fn should_be_defined<T>(reporter: &dyn Reporter, expr: &str, value: &Option<T>) -> bool {
    if value.is_some() {
        reporter.passed(&format!("{} is defined.", expr));
        true
    } else {
        reporter.failed(&format!("{} should be defined. Was undefined.", expr));
        false
    }
}
