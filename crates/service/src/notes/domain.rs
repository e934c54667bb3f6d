use serde::{Deserialize, Serialize};

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadInput {
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub file: Option<UploadedFile>,
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredNote {
    pub url: String,
    pub path: String,
    pub size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteInput {
    #[serde(rename = "filePath", default)]
    pub file_path: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Keep alphanumerics and `. _ -`; everything else becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

/// `<timestamp>_<sanitized>`; a missing or blank name falls back to `file`.
pub fn stored_file_name(timestamp_ms: i64, original: Option<&str>) -> String {
    let name = match original {
        Some(n) if !n.is_empty() => sanitize_filename(n),
        _ => "file".to_string(),
    };
    format!("{timestamp_ms}_{name}")
}

pub fn namespace_prefix(notes_folder: &str, user_id: &str) -> String {
    format!("{notes_folder}/{user_id}/")
}

/// True when `path` names a file directly inside the user's namespace.
///
/// Uploads never create subdirectories, so exactly one plain segment must
/// follow the prefix. That also keeps a userId from reaching into a longer
/// one that shares its prefix.
pub fn is_within_namespace(path: &str, notes_folder: &str, user_id: &str) -> bool {
    let prefix = namespace_prefix(notes_folder, user_id);
    let Some(rest) = path.strip_prefix(&prefix) else {
        return false;
    };
    !rest.is_empty() && !rest.contains('/') && rest != "." && rest != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("a.txt"), "a.txt");
        assert_eq!(sanitize_filename("my notes (v2).pdf"), "my_notes__v2_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("résumé-final_1.doc"), "résumé-final_1.doc");
        assert_eq!(sanitize_filename("a/b\\c?d"), "a_b_c_d");
    }

    #[test]
    fn stored_names_carry_timestamp() {
        assert_eq!(stored_file_name(1700000000000, Some("a.txt")), "1700000000000_a.txt");
        assert_eq!(stored_file_name(5, None), "5_file");
        assert_eq!(stored_file_name(5, Some("")), "5_file");
    }

    #[test]
    fn namespace_check_accepts_own_files() {
        assert!(is_within_namespace("notes/alice/1_a.txt", "notes", "alice"));
    }

    #[test]
    fn namespace_check_rejects_escapes() {
        assert!(!is_within_namespace("notes/bob/1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("notes/alicex/1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice/", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice/../bob/1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice/./1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice//1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("users.json", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice/sub/1_a.txt", "notes", "alice"));
        assert!(!is_within_namespace("notes/alice/..", "notes", "alice"));
    }

    #[test]
    fn namespace_check_keeps_prefix_ids_apart() {
        // `a` must not reach files stored under a longer id beginning with `a/`
        assert!(!is_within_namespace("notes/a/b/1_x.txt", "notes", "a"));
        assert!(is_within_namespace("notes/a/1_x.txt", "notes", "a"));
        assert!(!is_within_namespace("notes/ab/1_x.txt", "notes", "a"));
    }

    #[test]
    fn delete_input_reads_camel_case() {
        let input: DeleteInput =
            serde_json::from_str(r#"{"filePath":"notes/a/1_x","userId":"a","token":"t"}"#).unwrap();
        assert_eq!(input.file_path.as_deref(), Some("notes/a/1_x"));
        assert_eq!(input.user_id.as_deref(), Some("a"));
    }
}
