//! Password strength checks.

use vindex_types::config::PasswordPolicy;
use vindex_types::{Result, VindexError};

/// Checks `password` against `policy`.
///
/// Length is counted in Unicode scalar values. The character classes are
/// lowercase, uppercase, digit and everything else.
///
/// # Errors
///
/// Returns [`VindexError::WeakPassword`] naming the first rule violated.
/// The password itself never appears in the error.
pub fn check_password(policy: &PasswordPolicy, password: &str) -> Result<()> {
    let length = password.chars().count();

    if length < policy.min_length {
        return Err(VindexError::WeakPassword {
            reason: format!("must be at least {} characters", policy.min_length),
        });
    }
    if length > policy.max_length {
        return Err(VindexError::WeakPassword {
            reason: format!("must be at most {} characters", policy.max_length),
        });
    }

    let classes = char_classes(password);
    if classes < policy.min_char_classes {
        return Err(VindexError::WeakPassword {
            reason: format!(
                "must mix at least {} of: lowercase, uppercase, digits, symbols",
                policy.min_char_classes
            ),
        });
    }

    Ok(())
}

/// Checks that a password and its confirmation are identical.
///
/// # Errors
///
/// Returns [`VindexError::PasswordMismatch`] if they differ.
pub fn confirm_password(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(VindexError::PasswordMismatch);
    }
    Ok(())
}

fn char_classes(password: &str) -> usize {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut other = false;

    for c in password.chars() {
        if c.is_lowercase() {
            lower = true;
        } else if c.is_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            other = true;
        }
    }

    [lower, upper, digit, other].iter().filter(|b| **b).count()
}
