use std::fmt;

pub const OWNER_ID_MAX_LEN: usize = 64;
pub const DESCRIPTION_MAX_LEN: usize = 255;
const MSISDN_LEN: usize = 12;
const MSISDN_PREFIX: &str = "254";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T = ()> = Result<T, ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a phone number to the gateway's 2547XXXXXXXX form.
/// Accepts local `07...` numbers and `+254...` international form.
pub fn normalize_msisdn(raw: &str) -> ValidationResult<String> {
    let mut phone = raw.trim().to_string();

    if let Some(rest) = phone.strip_prefix('+') {
        phone = rest.to_string();
    } else if let Some(rest) = phone.strip_prefix('0') {
        phone = format!("{MSISDN_PREFIX}{rest}");
    }

    if !phone.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "phone_number",
            "must contain only digits",
        ));
    }

    if phone.len() != MSISDN_LEN || !phone.starts_with(MSISDN_PREFIX) {
        return Err(ValidationError::new(
            "phone_number",
            format!("must be {MSISDN_LEN} digits starting with {MSISDN_PREFIX}"),
        ));
    }

    Ok(phone)
}

pub fn validate_amount(amount: i64) -> ValidationResult {
    if amount <= 0 {
        return Err(ValidationError::new(
            "amount",
            "must be a positive integer in the smallest currency unit",
        ));
    }

    Ok(())
}

pub fn validate_owner_id(owner_id: &str) -> ValidationResult {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(ValidationError::new("owner_id", "must not be empty"));
    }
    if owner_id.len() > OWNER_ID_MAX_LEN {
        return Err(ValidationError::new(
            "owner_id",
            format!("must be at most {OWNER_ID_MAX_LEN} characters"),
        ));
    }
    if !owner_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        return Err(ValidationError::new(
            "owner_id",
            "must contain only letters, digits, '_', '-' or '.'",
        ));
    }

    Ok(())
}

/// Sanitize a free-text description and cap its length.
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let description = sanitize_string(description);
    if description.len() > DESCRIPTION_MAX_LEN {
        return Err(ValidationError::new(
            "description",
            format!("must be at most {DESCRIPTION_MAX_LEN} characters"),
        ));
    }

    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_local_numbers() {
        assert_eq!(normalize_msisdn("0712345678").unwrap(), "254712345678");
        assert_eq!(normalize_msisdn("  0101234567 ").unwrap(), "254101234567");
    }

    #[test]
    fn normalizes_international_numbers() {
        assert_eq!(normalize_msisdn("+254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_msisdn("254712345678").unwrap(), "254712345678");
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(normalize_msisdn("071234567").is_err()); // too short
        assert!(normalize_msisdn("07123456789").is_err()); // too long
        assert!(normalize_msisdn("0712-345-678").is_err());
        assert!(normalize_msisdn("+15551234567").is_err()); // wrong country
        assert!(normalize_msisdn("").is_err());
    }

    #[test]
    fn validates_amount() {
        assert!(validate_amount(1).is_ok());
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-500).is_err());
    }

    #[test]
    fn validates_owner_id() {
        assert!(validate_owner_id("user-42").is_ok());
        assert!(validate_owner_id("a.b_c").is_ok());
        assert!(validate_owner_id("").is_err());
        assert!(validate_owner_id("has space").is_err());
        assert!(validate_owner_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
        assert_eq!(sanitize_string(" \n "), "");
    }

    #[test]
    fn caps_description_length() {
        assert_eq!(validate_description("Taxi fare").unwrap(), "Taxi fare");
        assert!(validate_description(&"d".repeat(300)).is_err());
    }
}
