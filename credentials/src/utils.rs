//! User key handling.
//!
//! A user key is the address a challenge code is delivered to: an email
//! address or an E.164 phone number. Keys are normalized before they reach
//! the user repository so `User@Example.com` and `user@example.com` share one
//! pending challenge.

/// Normalize a raw user key, or return `None` if it is neither a plausible
/// email address nor an E.164 phone number.
///
/// Emails are trimmed and lowercased. Phone numbers are trimmed and stripped
/// of spaces, dashes and parentheses.
///
/// # Examples
///
/// ```
/// use credential_issuer::utils::normalize_user_key;
///
/// assert_eq!(normalize_user_key(" User@Example.com "), Some("user@example.com".to_string()));
/// assert_eq!(normalize_user_key("+1 (555) 010-9999"), Some("+15550109999".to_string()));
/// assert_eq!(normalize_user_key("not a key"), None);
/// ```
#[must_use]
pub fn normalize_user_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.contains('@') {
        let lowered = trimmed.to_lowercase();
        return is_valid_email(&lowered).then_some(lowered);
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    is_valid_phone(&compact).then_some(compact)
}

/// Validate email address format.
///
/// Checks the shape only: one `@`, a non-empty local part, and a dotted
/// domain made of alphanumerics and hyphens.
///
/// # Examples
///
/// ```
/// use credential_issuer::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-'));

    local_ok && domain_ok
}

/// Validate an E.164 phone number: `+` followed by 8 to 15 digits.
///
/// # Examples
///
/// ```
/// use credential_issuer::utils::is_valid_phone;
///
/// assert!(is_valid_phone("+15550109999"));
/// assert!(!is_valid_phone("15550109999"));
/// assert!(!is_valid_phone("+123"));
/// ```
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };

    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
