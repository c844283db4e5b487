//! Phone-number canonicalisation.
//!
//! Patient phone numbers arrive from the intake flow in whatever shape the
//! patient typed them: `0712 345 678`, `712345678`, `+254712345678`.
//! Before a number is handed to the messaging gateway it is rewritten into
//! the international form the gateway expects.

/// International dialling prefix applied to local numbers.
pub const COUNTRY_PREFIX: &str = "254";

/// Rewrites a raw phone number into canonical international form.
///
/// Pure and total: malformed input is passed through best-effort and never
/// fails. Rules, applied in order:
///
/// 1. Trim surrounding whitespace.
/// 2. A leading `0` is replaced by the country prefix.
/// 3. A value already starting with the country prefix or `+` is left
///    unchanged.
/// 4. Anything else gets the country prefix prepended.
///
/// Empty or whitespace-only input comes back as the empty string; callers
/// treat that as "no phone number on file" before ever reaching this
/// function.
pub fn canonicalise(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(rest) = trimmed.strip_prefix('0') {
        return format!("{COUNTRY_PREFIX}{rest}");
    }

    if trimmed.starts_with(COUNTRY_PREFIX) || trimmed.starts_with('+') {
        return trimmed.to_owned();
    }

    format!("{COUNTRY_PREFIX}{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_leading_zero_with_country_prefix() {
        assert_eq!(canonicalise("0712345678"), "254712345678");
    }

    #[test]
    fn leaves_international_forms_unchanged() {
        assert_eq!(canonicalise("+254712345678"), "+254712345678");
        assert_eq!(canonicalise("254712345678"), "254712345678");
    }

    #[test]
    fn prepends_prefix_to_bare_local_numbers() {
        assert_eq!(canonicalise("712345678"), "254712345678");
    }

    #[test]
    fn passes_empty_input_through() {
        assert_eq!(canonicalise(""), "");
        assert_eq!(canonicalise("   "), "");
    }

    #[test]
    fn trims_before_applying_rules() {
        assert_eq!(canonicalise("  0700111222 "), "254700111222");
    }
}
