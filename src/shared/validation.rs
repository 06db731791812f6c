use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for vehicle registration numbers (checked after upper-casing)
    /// Alphanumeric with inner spaces or hyphens, 3-20 characters
    /// - Valid: "KA-01-AB-1234", "MH12 XY 9", "AMB001"
    /// - Invalid: "-KA01", "KA01-", "AB", "KA_01"
    pub static ref VEHICLE_NUMBER_REGEX: Regex =
        Regex::new(r"^[A-Z0-9][A-Z0-9 -]{1,18}[A-Z0-9]$").unwrap();
}

/// Upper-cases and trims a vehicle number, returning it if it is well-formed
pub fn normalize_vehicle_number(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_uppercase();
    VEHICLE_NUMBER_REGEX
        .is_match(&normalized)
        .then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_number_regex_valid() {
        assert!(VEHICLE_NUMBER_REGEX.is_match("KA-01-AB-1234"));
        assert!(VEHICLE_NUMBER_REGEX.is_match("MH12 XY 9"));
        assert!(VEHICLE_NUMBER_REGEX.is_match("AMB001"));
        assert!(VEHICLE_NUMBER_REGEX.is_match("ABC"));
    }

    #[test]
    fn test_vehicle_number_regex_invalid() {
        assert!(!VEHICLE_NUMBER_REGEX.is_match("-KA01")); // leading hyphen
        assert!(!VEHICLE_NUMBER_REGEX.is_match("KA01-")); // trailing hyphen
        assert!(!VEHICLE_NUMBER_REGEX.is_match("AB")); // too short
        assert!(!VEHICLE_NUMBER_REGEX.is_match("KA_01")); // underscore
        assert!(!VEHICLE_NUMBER_REGEX.is_match("ka01")); // lowercase
        assert!(!VEHICLE_NUMBER_REGEX.is_match(""));
    }

    #[test]
    fn test_normalize_vehicle_number() {
        assert_eq!(
            normalize_vehicle_number("  ka-01-ab-1234 "),
            Some("KA-01-AB-1234".to_string())
        );
        assert_eq!(normalize_vehicle_number("x"), None);
    }
}
