//! crates/studyforge_core/src/validate.rs
//!
//! Upload validation against the single MIME/extension allow-list shared by
//! every upload surface. Adding a new supported format means adding one row
//! to [`ALLOWED_FILE_TYPES`].

use crate::domain::UploadFile;

/// Hard cap on a single uploaded file.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50MB

/// MIME type to allowed filename extensions. `image/*` matches any MIME
/// with the `image/` prefix.
pub const ALLOWED_FILE_TYPES: &[(&str, &[&str])] = &[
    ("application/pdf", &[".pdf"]),
    ("image/*", &[".png", ".jpg", ".jpeg", ".gif"]),
    ("application/msword", &[".doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &[".docx"],
    ),
    ("application/vnd.ms-excel", &[".xls"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &[".xlsx"],
    ),
    ("text/plain", &[".txt"]),
];

/// Why an upload was refused. Reported to the user immediately and never
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file size exceeds 50MB limit")]
    TooLarge,
    #[error("file has no extension")]
    MissingExtension,
    #[error("file type not supported")]
    UnsupportedType,
}

/// Checks one file's size, declared MIME type, and filename extension
/// against the allow-list.
pub fn validate_upload(
    file_name: &str,
    file_size: u64,
    mime_type: &str,
) -> Result<(), ValidationError> {
    if file_size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge);
    }

    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => return Err(ValidationError::MissingExtension),
    };

    let allowed_extensions = ALLOWED_FILE_TYPES
        .iter()
        .find(|(mime, _)| mime_matches(mime, mime_type))
        .map(|(_, extensions)| *extensions)
        .ok_or(ValidationError::UnsupportedType)?;

    if !allowed_extensions.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedType);
    }

    Ok(())
}

fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => mime_type
            .split_once('/')
            .is_some_and(|(main, _)| main == prefix),
        None => pattern == mime_type,
    }
}

/// True when a file with the same name and size is already in the pending
/// batch. A duplicate is a non-fatal notice: the handler skips the file and
/// keeps the rest of the batch.
pub fn is_duplicate(pending: &[UploadFile], file_name: &str, file_size: u64) -> bool {
    pending
        .iter()
        .any(|f| f.file_name == file_name && f.file_size == file_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, size: u64) -> UploadFile {
        UploadFile {
            id: "f1".to_string(),
            file_name: name.to_string(),
            file_size: size,
            mime_type: "text/plain".to_string(),
            data: Vec::new(),
        }
    }

    #[test]
    fn every_allow_list_pair_is_accepted() {
        for (mime, extensions) in ALLOWED_FILE_TYPES {
            // The wildcard row is exercised with a concrete image MIME.
            let mime = if *mime == "image/*" { "image/png" } else { mime };
            for ext in *extensions {
                let name = format!("notes{ext}");
                assert_eq!(
                    validate_upload(&name, 1024, mime),
                    Ok(()),
                    "expected {mime} {ext} to pass"
                );
            }
        }
    }

    #[test]
    fn mismatched_mime_and_extension_is_rejected() {
        assert_eq!(
            validate_upload("notes.pdf", 1024, "text/plain"),
            Err(ValidationError::UnsupportedType)
        );
        assert_eq!(
            validate_upload("notes.txt", 1024, "application/pdf"),
            Err(ValidationError::UnsupportedType)
        );
    }

    #[test]
    fn unknown_mime_is_rejected() {
        assert_eq!(
            validate_upload("clip.mp4", 1024, "video/mp4"),
            Err(ValidationError::UnsupportedType)
        );
    }

    #[test]
    fn image_wildcard_covers_image_subtypes() {
        assert_eq!(validate_upload("scan.jpeg", 1024, "image/jpeg"), Ok(()));
        assert_eq!(validate_upload("scan.gif", 1024, "image/gif"), Ok(()));
        assert_eq!(
            validate_upload("scan.bmp", 1024, "image/bmp"),
            Err(ValidationError::UnsupportedType)
        );
    }

    #[test]
    fn size_limit_is_exclusive_at_50_mib() {
        assert_eq!(validate_upload("big.txt", MAX_FILE_SIZE, "text/plain"), Ok(()));
        assert_eq!(
            validate_upload("big.txt", MAX_FILE_SIZE + 1, "text/plain"),
            Err(ValidationError::TooLarge)
        );
    }

    #[test]
    fn missing_extension_is_rejected() {
        assert_eq!(
            validate_upload("README", 10, "text/plain"),
            Err(ValidationError::MissingExtension)
        );
        assert_eq!(
            validate_upload("notes.", 10, "text/plain"),
            Err(ValidationError::MissingExtension)
        );
        assert_eq!(
            validate_upload(".gitignore", 10, "text/plain"),
            Err(ValidationError::MissingExtension)
        );
    }

    #[test]
    fn extension_comparison_is_case_insensitive() {
        assert_eq!(validate_upload("NOTES.TXT", 10, "text/plain"), Ok(()));
    }

    #[test]
    fn duplicate_matches_on_name_and_size() {
        let pending = vec![upload("notes.txt", 100)];
        assert!(is_duplicate(&pending, "notes.txt", 100));
        assert!(!is_duplicate(&pending, "notes.txt", 101));
        assert!(!is_duplicate(&pending, "other.txt", 100));
    }
}
