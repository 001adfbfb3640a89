/// Strip every non-digit character from a submitted phone number.
/// Returns the normalized number only when exactly ten digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        Some(digits)
    } else {
        None
    }
}

/// Light-weight shape check for email addresses: one '@', a non-empty local
/// part, and a domain containing a dot with non-empty labels. Deliverability
/// is not verified.
pub fn email_is_valid(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = match parts.next() {
        Some(local) if !local.is_empty() => local,
        _ => return false,
    };
    let domain = match parts.next() {
        Some(domain) => domain,
        None => return false,
    };
    if local.contains('@') || domain.contains('@') {
        return false;
    }
    if !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_ten_digits_after_stripping() {
        assert_eq!(
            normalize_phone("(936) 942-8170"),
            Some("9369428170".to_string())
        );
        assert_eq!(normalize_phone("936-942-8170"), Some("9369428170".to_string()));
        assert_eq!(normalize_phone("9369428170"), Some("9369428170".to_string()));
    }

    #[test]
    fn phone_rejects_anything_else() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("12345678901"), None);
        assert_eq!(normalize_phone("abc-def-ghij"), None);
    }

    #[test]
    fn email_shape() {
        assert!(email_is_valid("a@b.co"));
        assert!(email_is_valid("parent.name@school.example.org"));
        assert!(!email_is_valid("a@b"));
        assert!(!email_is_valid("not-an-email"));
        assert!(!email_is_valid("@b.co"));
        assert!(!email_is_valid("a@.co"));
        assert!(!email_is_valid("a b@c.co"));
        assert!(!email_is_valid(""));
    }
}
