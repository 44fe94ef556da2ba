//! Input rules checked locally before any backend call.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Callsign must be 1-5 digits only.")]
    Callsign,
    #[error("IFC username must be 3-30 characters (letters, digits, `_`, `.` or `-`).")]
    IfcUsername,
    #[error("Flight must be two 4-letter ICAO codes separated by `-`, e.g. `KJFK-EGLL`.")]
    Route,
    #[error("VA code must be 3-5 letters or digits.")]
    VaCode,
    #[error("VA name must be 3-50 characters.")]
    VaName,
    #[error("`{field}` must be a whole number.")]
    NotANumber { field: String },
    #[error("`{field}` is required.")]
    MissingField { field: String },
    #[error("unknown role `{0}` (expected pilot|staff)")]
    UnknownRole(String),
}

pub fn validate_callsign(value: &str) -> Result<(), ValidationError> {
    let valid = (1..=5).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit());
    valid.then_some(()).ok_or(ValidationError::Callsign)
}

pub fn validate_ifc_username(value: &str) -> Result<(), ValidationError> {
    let valid = (3..=30).contains(&value.chars().count())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    valid.then_some(()).ok_or(ValidationError::IfcUsername)
}

/// Normalises `kjfk-egll` to `KJFK-EGLL`.
pub fn normalize_route(value: &str) -> Result<String, ValidationError> {
    let upper = value.trim().to_ascii_uppercase();
    let (origin, dest) = upper.split_once('-').ok_or(ValidationError::Route)?;
    let is_icao = |code: &str| code.len() == 4 && code.bytes().all(|b| b.is_ascii_alphanumeric());
    if is_icao(origin) && is_icao(dest) {
        Ok(upper)
    } else {
        Err(ValidationError::Route)
    }
}

pub fn validate_va_code(value: &str) -> Result<(), ValidationError> {
    let valid = (3..=5).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_alphanumeric());
    valid.then_some(()).ok_or(ValidationError::VaCode)
}

pub fn validate_va_name(value: &str) -> Result<(), ValidationError> {
    (3..=50).contains(&value.chars().count()).then_some(()).ok_or(ValidationError::VaName)
}

/// Parses an optional numeric form field; blank means absent.
pub fn parse_optional_number(field: &str, value: Option<&str>) -> Result<Option<u32>, ValidationError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ValidationError::NotANumber { field: field.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callsign_accepts_one_to_five_digits() {
        assert!(validate_callsign("001").is_ok());
        assert!(validate_callsign("12345").is_ok());
        assert_eq!(validate_callsign(""), Err(ValidationError::Callsign));
        assert_eq!(validate_callsign("123456"), Err(ValidationError::Callsign));
        assert_eq!(validate_callsign("12a"), Err(ValidationError::Callsign));
    }

    #[test]
    fn ifc_username_length_and_charset() {
        assert!(validate_ifc_username("john_doe123").is_ok());
        assert!(validate_ifc_username("ab").is_err());
        assert!(validate_ifc_username("has space").is_err());
    }

    #[test]
    fn route_is_uppercased_and_checked() {
        assert_eq!(normalize_route(" kjfk-egll ").expect("valid route"), "KJFK-EGLL");
        assert_eq!(normalize_route("JFK-LHR"), Err(ValidationError::Route));
        assert_eq!(normalize_route("KJFKEGLL"), Err(ValidationError::Route));
    }

    #[test]
    fn va_code_and_name_bounds() {
        assert!(validate_va_code("AAVA").is_ok());
        assert!(validate_va_code("AA").is_err());
        assert!(validate_va_name("Air India Virtual").is_ok());
        assert!(validate_va_name("AI").is_err());
    }

    #[test]
    fn optional_numbers_treat_blank_as_absent() {
        assert_eq!(parse_optional_number("fuel_kg", None), Ok(None));
        assert_eq!(parse_optional_number("fuel_kg", Some("  ")), Ok(None));
        assert_eq!(parse_optional_number("fuel_kg", Some("15000")), Ok(Some(15000)));
        assert_eq!(
            parse_optional_number("fuel_kg", Some("lots")),
            Err(ValidationError::NotANumber { field: "fuel_kg".to_owned() })
        );
    }
}
