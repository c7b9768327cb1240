//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// International phone number regex (E.164 format)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{6,14}$").expect("E.164 pattern is valid")
});

/// Characters users commonly type between digits
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '.' | '(' | ')' | '/')
}

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check if a phone number is already in E.164 format
pub fn is_valid_e164(phone: &str) -> bool {
    E164_REGEX.is_match(phone)
}

/// Convert user input into canonical E.164 form
///
/// Accepts `+<digits>`, `00<digits>` and, when `default_country_code` is
/// given, national numbers with an optional single trunk `0`. Separators
/// (spaces, dashes, dots, parentheses, slashes) are ignored; any other
/// character makes the input invalid.
///
/// ```
/// use mv_shared::utils::phone::to_e164;
///
/// assert_eq!(to_e164("+1 (555) 123-4567", None).as_deref(), Some("+15551234567"));
/// assert_eq!(to_e164("0912 345 6789", Some("98")).as_deref(), Some("+989123456789"));
/// assert_eq!(to_e164("0912 345 6789", None), None);
/// ```
pub fn to_e164(phone: &str, default_country_code: Option<&str>) -> Option<String> {
    let trimmed = phone.trim();
    let (has_plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !is_separator(c) {
            return None;
        }
    }

    let international = if has_plus {
        digits
    } else if let Some(stripped) = digits.strip_prefix("00") {
        stripped.to_string()
    } else {
        let country_code = default_country_code?;
        let national = digits.strip_prefix('0').unwrap_or(&digits);
        format!("{}{}", country_code, national)
    };

    let candidate = format!("+{}", international);
    is_valid_e164(&candidate).then_some(candidate)
}

/// Mask a phone number for logs and display (e.g., +98****6789)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}
