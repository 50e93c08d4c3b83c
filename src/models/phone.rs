// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! E.164 phone number handling.

use crate::error::AppError;

/// Normalize a phone number to strict E.164 (`+` followed by 8-15 digits).
///
/// Accepts spaces, dashes and parentheses in the input since mobile clients
/// forward whatever the contact picker gave them.
pub fn normalize_e164(input: &str) -> Result<String, AppError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let digits = match cleaned.strip_prefix('+') {
        Some(rest) => rest,
        None => return Err(AppError::InvalidPhone(redact(input))),
    };

    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidPhone(redact(input)));
    }

    Ok(format!("+{}", digits))
}

/// Redacted form safe for logs and error details: country prefix + last two
/// digits only.
pub fn redact(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 6 {
        return "+***".to_string();
    }
    let head: String = digits[..3].iter().collect();
    let tail: String = digits[digits.len() - 2..].iter().collect();
    format!("+{}***{}", head, tail)
}
