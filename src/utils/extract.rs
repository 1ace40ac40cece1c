use regex::Regex;
use std::sync::OnceLock;

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Standalone run of 6-8 digits. Word boundaries keep longer runs
    // (phone numbers, account ids) from matching.
    RE.get_or_init(|| Regex::new(r"\b([0-9]{6,8})\b").unwrap())
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // URL in the message body, optionally bracketed or angle-quoted.
    RE.get_or_init(|| Regex::new(r"<?\[?(https?://[^\s\]>]+)\]?>?").unwrap())
}

/// Pulls a one-time code out of free-text SMS/email content.
/// Carriers word these messages differently ("Your code is 482913",
/// "482913 is your Bell verification code") so we only key on the digit run.
pub fn extract_code(text: &str) -> Option<String> {
    code_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pulls a confirmation link out of a message body. Used where the MFA
/// factor is a clickable allow/deny link rather than a numeric code.
pub fn extract_link(text: &str) -> Option<String> {
    link_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_six_digit_code() {
        assert_eq!(
            extract_code("Your code is 482913"),
            Some("482913".to_string())
        );
        assert_eq!(
            extract_code("482913 is your Bell verification code"),
            Some("482913".to_string())
        );
    }

    #[test]
    fn test_extract_eight_digit_code() {
        assert_eq!(
            extract_code("Use 12345678 to sign in."),
            Some("12345678".to_string())
        );
    }

    #[test]
    fn test_phone_number_does_not_match() {
        // 10+ digit runs are not codes
        assert_eq!(extract_code("Call us at 5551234567"), None);
        assert_eq!(extract_code("+15551234567"), None);
    }

    #[test]
    fn test_short_run_does_not_match() {
        assert_eq!(extract_code("PIN 12345 expired"), None);
        assert_eq!(extract_code("no digits here"), None);
    }

    #[test]
    fn test_code_with_punctuation() {
        assert_eq!(
            extract_code("T-Mobile: 604512."),
            Some("604512".to_string())
        );
    }

    #[test]
    fn test_extract_bracketed_link() {
        assert_eq!(
            extract_link("Approve this sign-in: [https://sso.verizon.com/approve?t=abc123]"),
            Some("https://sso.verizon.com/approve?t=abc123".to_string())
        );
    }

    #[test]
    fn test_extract_labelled_link() {
        assert_eq!(
            extract_link("Click https://vzw.com/c/9f2e to confirm."),
            Some("https://vzw.com/c/9f2e".to_string())
        );
        assert_eq!(extract_link("nothing to click"), None);
    }
}
