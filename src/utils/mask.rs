/// Masks sensitive values before they hit the logs
pub fn mask_sensitive(value: &str) -> String {
    if value.is_empty() {
        return "".to_string();
    }

    let len = value.len();
    if len <= 4 {
        return "*".repeat(len);
    }

    // Keep first 2 and last 2 characters, mask the rest
    format!(
        "{}{}{}",
        &value[..2],
        "*".repeat(len - 4),
        &value[len - 2..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(mask_sensitive("MyPassword123"), "My*********23");
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive(""), "");
    }
}
