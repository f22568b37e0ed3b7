//! Input checks applied to user-provided strings before they reach the store.

use super::user_models::UserField;
use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_SEARCH_QUERY_LEN: usize = 3;
pub const MIN_FRIEND_KEY_LEN: usize = 22;

const SQL_KEYWORDS: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "CREATE",
    "ALTER",
    "EXEC",
    "EXECUTE",
    "UNION",
    "DECLARE",
    "SCRIPT",
    "JAVASCRIPT",
];

lazy_static! {
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^\w\s@._-]").expect("valid regex");
    static ref BASE58_PUBKEY: Regex =
        Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid regex");
}

/// Strip characters outside `[\w\s@._-]` and reject anything that still
/// contains an SQL keyword. Rejected input becomes the empty string.
pub fn sql_filter(input: &str) -> String {
    let cleaned = DISALLOWED_CHARS.replace_all(input, "");
    let upper = cleaned.to_uppercase();
    if SQL_KEYWORDS.iter().any(|keyword| upper.contains(keyword)) {
        return String::new();
    }
    cleaned.trim().to_string()
}

/// Base58, 32 to 44 characters.
pub fn is_valid_pubkey(pubkey: &str) -> bool {
    BASE58_PUBKEY.is_match(pubkey)
}

pub fn is_valid_username(username: &str) -> bool {
    username.chars().count() >= MIN_USERNAME_LEN
}

pub fn are_valid_friend_keys(pubkey: &str, friend: &str) -> bool {
    pubkey.len() >= MIN_FRIEND_KEY_LEN && friend.len() >= MIN_FRIEND_KEY_LEN
}

/// Value to store for `field`, or `None` if it is not acceptable.
pub fn prepare_field_value(field: UserField, value: &str) -> Option<String> {
    if field.accepts_raw_input() {
        return Some(value.to_string());
    }
    let filtered = sql_filter(value);
    if field == UserField::Username && !is_valid_username(&filtered) {
        return None;
    }
    Some(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_strips_special_characters() {
        assert_eq!(sql_filter("al'ice;--"), "alice--");
        assert_eq!(sql_filter("  bob@mail.com "), "bob@mail.com");
        assert_eq!(sql_filter("a<b>c"), "abc");
    }

    #[test]
    fn filter_rejects_sql_keywords() {
        assert_eq!(sql_filter("drop table users"), "");
        assert_eq!(sql_filter("xSeLeCtx"), "");
        assert_eq!(sql_filter("1 UNION 2"), "");
    }

    #[test]
    fn filter_keeps_plain_names() {
        assert_eq!(sql_filter("satoshi_nakamoto"), "satoshi_nakamoto");
    }

    #[test]
    fn pubkey_validation() {
        assert!(is_valid_pubkey("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
        assert!(!is_valid_pubkey("short"));
        // 0, O, I and l are not in the base58 alphabet
        assert!(!is_valid_pubkey("0xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
        assert!(!is_valid_pubkey(&"1".repeat(45)));
    }

    #[test]
    fn username_and_friend_key_lengths() {
        assert!(is_valid_username("bob"));
        assert!(!is_valid_username("bo"));
        assert!(are_valid_friend_keys(&"a".repeat(22), &"b".repeat(30)));
        assert!(!are_valid_friend_keys(&"a".repeat(21), &"b".repeat(30)));
    }

    #[test]
    fn field_values_are_filtered_unless_free_form() {
        assert_eq!(
            prepare_field_value(UserField::Description, "<i>gm</i>").as_deref(),
            Some("<i>gm</i>")
        );
        assert_eq!(
            prepare_field_value(UserField::City, "Paris!").as_deref(),
            Some("Paris")
        );
        assert_eq!(prepare_field_value(UserField::Username, "a!b"), None);
        assert_eq!(
            prepare_field_value(UserField::Username, "carol").as_deref(),
            Some("carol")
        );
    }
}
