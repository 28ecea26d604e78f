//! Submission validation
//!
//! Checks a submission bundle before any storage is touched. Rules run in a
//! fixed order so the first failing rule produces the error the client sees,
//! and every rejection names the offending field or filename together with
//! the accepted set. Validation is pure: no side effects, no I/O.

use bytes::Bytes;
use thiserror::Error;

/// Accepted artifact extensions (installer/package/archive formats).
pub const ARTIFACT_EXTENSIONS: &[&str] = &["apk", "zip", "exe", "msi", "dmg", "pkg"];

/// Accepted preview image extensions (common raster formats).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// One uploaded file: the user-supplied filename and its content.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// An upload request as received from the client, before validation.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub name: String,
    pub description: String,
    pub artifact: Option<FilePart>,
    pub image: Option<FilePart>,
}

/// Deployment policy applied during validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPolicy {
    /// When set, submissions without a preview image are rejected.
    pub require_image: bool,
}

/// Why a submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    MissingName,

    #[error("description must not be empty")]
    MissingDescription,

    #[error("an artifact file is required")]
    MissingArtifact,

    #[error("a preview image is required")]
    MissingImage,

    #[error("{filename:?} does not have an accepted {kind} extension (allowed: {})", .allowed.join(", "))]
    DisallowedExtension {
        filename: String,
        kind: &'static str,
        allowed: &'static [&'static str],
    },
}

/// Validate a submission against the deployment policy.
///
/// Rules, first failure wins: non-empty `name`, non-empty `description`,
/// artifact present with a non-empty filename, artifact extension in
/// [`ARTIFACT_EXTENSIONS`], image presence per policy, and any provided
/// image's extension in [`IMAGE_EXTENSIONS`]. The image content rule applies
/// even when the image itself is optional.
pub fn validate(submission: &Submission, policy: &UploadPolicy) -> Result<(), ValidationError> {
    if submission.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if submission.description.trim().is_empty() {
        return Err(ValidationError::MissingDescription);
    }

    let artifact = submission
        .artifact
        .as_ref()
        .filter(|f| !f.filename.is_empty())
        .ok_or(ValidationError::MissingArtifact)?;
    check_extension(&artifact.filename, "artifact", ARTIFACT_EXTENSIONS)?;

    let image = submission.image.as_ref().filter(|f| !f.filename.is_empty());
    if policy.require_image && image.is_none() {
        return Err(ValidationError::MissingImage);
    }
    if let Some(image) = image {
        check_extension(&image.filename, "image", IMAGE_EXTENSIONS)?;
    }

    Ok(())
}

/// The extension is the text after the final `.`, compared case-insensitively.
fn check_extension(
    filename: &str,
    kind: &'static str,
    allowed: &'static [&'static str],
) -> Result<(), ValidationError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError::DisallowedExtension {
            filename: filename.to_string(),
            kind,
            allowed,
        }),
    }
}
