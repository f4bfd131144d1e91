/// Get environment variable with MONEY_BUDDY_ prefix, falling back to unprefixed version
///
/// Checks `MONEY_BUDDY_{key}` first, then `{key}`, so hosted environments that
/// only expose plain names (e.g. `PORT`, `DATABASE_URL`) keep working.
///
/// # Examples
///
/// ```rust
/// use money_buddy::utils::get_env_with_prefix;
///
/// // Checks MONEY_BUDDY_SQUARE_WEBHOOK_SIGNATURE_KEY first, then SQUARE_WEBHOOK_SIGNATURE_KEY
/// let key = get_env_with_prefix("SQUARE_WEBHOOK_SIGNATURE_KEY");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("MONEY_BUDDY_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("MONEY_BUDDY_ENV_TEST_VAR", "prefixed_value");
            std::env::set_var("ENV_TEST_VAR", "unprefixed_value");
        }
        // Prefixed wins over plain
        assert_eq!(get_env_with_prefix("ENV_TEST_VAR"), Some("prefixed_value".to_string()));
        unsafe {
            std::env::remove_var("MONEY_BUDDY_ENV_TEST_VAR");
        }
        assert_eq!(get_env_with_prefix("ENV_TEST_VAR"), Some("unprefixed_value".to_string()));
        unsafe {
            std::env::remove_var("ENV_TEST_VAR");
        }

        assert_eq!(get_env_with_prefix("ENV_TEST_NON_EXISTENT_VAR"), None);
    }
}
