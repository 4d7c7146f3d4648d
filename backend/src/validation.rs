use shared::{DetectionFailure, FailureKind, MediaKind};

pub const MAX_ARTIFACT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactDescriptor<'a> {
    pub content_type: &'a str,
    pub byte_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFile,
    #[error("API key is required")]
    MissingCredential,
    #[error("Invalid file type. Only images and videos are supported.")]
    UnsupportedType,
    #[error("File size too large. Maximum size is 100MB.")]
    FileTooLarge,
}

impl ValidationError {
    pub fn kind(self) -> FailureKind {
        match self {
            ValidationError::MissingFile => FailureKind::MissingFile,
            ValidationError::MissingCredential => FailureKind::MissingCredential,
            ValidationError::UnsupportedType => FailureKind::UnsupportedType,
            ValidationError::FileTooLarge => FailureKind::FileTooLarge,
        }
    }
}

impl From<ValidationError> for DetectionFailure {
    fn from(err: ValidationError) -> Self {
        DetectionFailure::new(err.kind(), err.to_string())
    }
}

/// Pre-flight check run before any vendor is contacted. Rules are applied in
/// order and the first failing one is reported.
pub fn validate(
    artifact: Option<&ArtifactDescriptor<'_>>,
    credential: Option<&str>,
) -> Result<MediaKind, ValidationError> {
    let artifact = artifact.ok_or(ValidationError::MissingFile)?;

    if credential.map(str::trim).unwrap_or_default().is_empty() {
        return Err(ValidationError::MissingCredential);
    }

    let kind =
        MediaKind::from_content_type(artifact.content_type).ok_or(ValidationError::UnsupportedType)?;

    if artifact.byte_size > MAX_ARTIFACT_BYTES {
        return Err(ValidationError::FileTooLarge);
    }

    Ok(kind)
}
