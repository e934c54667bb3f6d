use serde::{Deserialize, Serialize};

/// Longest accepted userId, in characters, after normalisation.
pub const MAX_USER_ID_LEN: usize = 64;

/// Registration input. Both fields are optional on the wire; validation
/// happens in [`super::UserService::register`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterInput {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub user_id: String,
    pub token: String,
}

/// Trim and replace spaces with underscores. Everything else is kept as-is.
pub fn normalize_user_id(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}

/// A userId becomes one directory name under the notes folder, so it must be
/// a single plain path segment.
pub fn is_path_safe_user_id(user_id: &str) -> bool {
    !user_id.contains(['/', '\\']) && user_id != "." && user_id != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_are_trimmed_and_underscored() {
        assert_eq!(normalize_user_id("  alice  "), "alice");
        assert_eq!(normalize_user_id("alice smith"), "alice_smith");
        assert_eq!(normalize_user_id("a  b"), "a__b");
        assert_eq!(normalize_user_id("Ünï.cöde-1"), "Ünï.cöde-1");
    }

    #[test]
    fn path_unsafe_user_ids_are_flagged() {
        assert!(is_path_safe_user_id("alice"));
        assert!(is_path_safe_user_id("a.b"));
        assert!(is_path_safe_user_id("..."));
        assert!(!is_path_safe_user_id("a/b"));
        assert!(!is_path_safe_user_id("a\\b"));
        assert!(!is_path_safe_user_id("."));
        assert!(!is_path_safe_user_id(".."));
    }

    #[test]
    fn register_input_reads_camel_case() {
        let input: RegisterInput = serde_json::from_str(r#"{"userId":"bob","displayName":"Bob"}"#).unwrap();
        assert_eq!(input.user_id.as_deref(), Some("bob"));
        assert_eq!(input.display_name.as_deref(), Some("Bob"));
        let empty: RegisterInput = serde_json::from_str("{}").unwrap();
        assert!(empty.user_id.is_none());
    }
}
