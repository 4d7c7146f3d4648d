use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PredictionClass {
    Real,
    Fake,
}

impl PredictionClass {
    pub fn complement(self) -> Self {
        match self {
            PredictionClass::Real => PredictionClass::Fake,
            PredictionClass::Fake => PredictionClass::Real,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: PredictionClass,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(class: PredictionClass, confidence: f64) -> Self {
        Self { class, confidence }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Vendor-independent detection result. The first prediction is the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub metadata: DetectionMetadata,
}

impl CanonicalResult {
    pub fn primary(&self) -> Option<&Prediction> {
        self.predictions.first()
    }

    pub fn confidence_of(&self, class: PredictionClass) -> Option<f64> {
        self.predictions
            .iter()
            .find(|p| p.class == class)
            .map(|p| p.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingFile,
    MissingCredential,
    UnsupportedType,
    FileTooLarge,
    CredentialRequired,
    NetworkError,
    VendorError,
    MalformedResponse,
    Internal,
}

impl FailureKind {
    pub fn is_preflight(self) -> bool {
        matches!(
            self,
            FailureKind::MissingFile
                | FailureKind::MissingCredential
                | FailureKind::UnsupportedType
                | FailureKind::FileTooLarge
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DetectionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DetectionOutcome {
    Success(CanonicalResult),
    Failure(DetectionFailure),
}

impl DetectionOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        DetectionOutcome::Failure(DetectionFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DetectionOutcome::Success(_))
    }

    pub fn primary(&self) -> Option<&Prediction> {
        match self {
            DetectionOutcome::Success(result) => result.primary(),
            DetectionOutcome::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            DetectionOutcome::Success(_) => None,
            DetectionOutcome::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn into_result(self) -> Result<CanonicalResult, DetectionFailure> {
        match self {
            DetectionOutcome::Success(result) => Ok(result),
            DetectionOutcome::Failure(failure) => Err(failure),
        }
    }
}

impl From<DetectionFailure> for DetectionOutcome {
    fn from(failure: DetectionFailure) -> Self {
        DetectionOutcome::Failure(failure)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Pending,
    Done(DetectionOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId(value.to_string())
    }
}
