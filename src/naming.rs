//! Storage name generation
//!
//! User-supplied filenames never touch the filesystem directly. Every blob is
//! stored under a generated name: a 128-bit random token plus a sanitized
//! rendering of the original filename, so names cannot collide and cannot
//! escape the blob directory.

use uuid::Uuid;

/// Longest sanitized stem kept in a storage name; anything beyond is cut.
const MAX_STEM_LEN: usize = 96;

/// Fallback stem when sanitization leaves nothing usable.
const DEFAULT_STEM: &str = "artifact";

/// Produce a collision-resistant storage name for a user-supplied filename.
///
/// The result is always a single safe path component of the form
/// `{32-hex-token}-{sanitized-filename}`. The original extension, when
/// present, is preserved for later display and content-type guessing.
pub fn storage_name(original_filename: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}-{}", token, sanitize_filename(original_filename))
}

/// Reduce a user-supplied filename to a safe path component.
///
/// Directory components and bytes outside `[A-Za-z0-9._-]` are dropped, and
/// leading dots are stripped so the result can never be a traversal sequence
/// or a hidden file. Degenerate inputs (empty, all-invalid) fall back to a
/// deterministic default stem.
fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => {
            let stem = normalize_stem(stem);
            format!("{}.{}", stem, ext)
        }
        _ => normalize_stem(&cleaned),
    }
}

fn normalize_stem(stem: &str) -> String {
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        return DEFAULT_STEM.to_string();
    }
    stem.chars().take(MAX_STEM_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_extension_and_prefixes_token() {
        let name = storage_name("app.apk");
        assert!(name.ends_with("-app.apk"));
        // 32 hex chars, then the separator
        assert_eq!(name.len(), 32 + 1 + "app.apk".len());
        assert!(name[..32].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn distinct_names_for_identical_input() {
        assert_ne!(storage_name("app.apk"), storage_name("app.apk"));
    }

    #[test]
    fn strips_directory_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("c:\\temp\\tool.exe"), "tool.exe");
        assert_eq!(sanitize_filename("a/b/c/installer.msi"), "installer.msi");
    }

    #[test]
    fn drops_unsafe_characters() {
        assert_eq!(sanitize_filename("my app (1).zip"), "myapp1.zip");
        assert_eq!(sanitize_filename("bundle\0.pkg"), "bundle.pkg");
    }

    #[test]
    fn traversal_sequences_cannot_survive() {
        // Path separators are stripped first, then dots cannot lead the stem.
        assert_eq!(sanitize_filename(".."), DEFAULT_STEM);
        assert_eq!(sanitize_filename("..."), DEFAULT_STEM);
        assert!(!sanitize_filename("..zip").starts_with('.'));
    }

    #[test]
    fn degenerate_inputs_get_deterministic_default() {
        assert_eq!(sanitize_filename(""), DEFAULT_STEM);
        assert_eq!(sanitize_filename("///"), DEFAULT_STEM);
        assert_eq!(sanitize_filename(".apk"), format!("{}.apk", DEFAULT_STEM));
    }

    #[test]
    fn extension_less_inputs_stay_extension_less() {
        assert_eq!(sanitize_filename("README"), "README");
        assert_eq!(sanitize_filename("binary."), "binary");
    }

    #[test]
    fn overlong_stems_are_truncated() {
        let long = "a".repeat(500);
        let sanitized = sanitize_filename(&format!("{}.zip", long));
        assert_eq!(sanitized.len(), MAX_STEM_LEN + ".zip".len());
        assert!(sanitized.ends_with(".zip"));
    }
}
