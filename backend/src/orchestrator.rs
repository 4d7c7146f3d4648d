use crate::config::RunMode;
use crate::validation::{self, ArtifactDescriptor};
use crate::vendor::{AdapterError, AdapterFactory, DetectionAdapter, DetectionRequest};
use bytes::Bytes;
use futures::FutureExt;
use serde_json::Value;
use shared::{DetectionFailure, DetectionOutcome, FailureKind, MediaKind, PollOutcome, TaskId};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    // Uploaded size; `data` stops growing once an upload passes the ceiling.
    pub byte_size: u64,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        let byte_size = data.len() as u64;
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
            byte_size,
        }
    }

    fn descriptor(&self) -> ArtifactDescriptor<'_> {
        ArtifactDescriptor {
            content_type: &self.content_type,
            byte_size: self.byte_size,
        }
    }

    fn into_request(self, media_kind: MediaKind) -> DetectionRequest {
        DetectionRequest {
            media: self.data,
            media_kind,
            file_name: self.file_name,
            content_type: self.content_type,
        }
    }
}

/// Boundary entry point: validates, binds an adapter to the caller's
/// credential and turns every fault into a `DetectionOutcome::Failure`.
#[derive(Clone)]
pub struct Detector {
    factory: Arc<dyn AdapterFactory>,
    run_mode: RunMode,
}

impl Detector {
    pub fn new(factory: Arc<dyn AdapterFactory>, run_mode: RunMode) -> Self {
        Self { factory, run_mode }
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub async fn run_detection(
        &self,
        artifact: Option<Artifact>,
        credential: Option<&str>,
    ) -> DetectionOutcome {
        let outcome = match self.prepare(artifact, credential) {
            Ok((request, credential)) => self.detect_with(request, credential).await,
            Err(failure) => DetectionOutcome::Failure(failure),
        };
        self.finish(outcome)
    }

    async fn detect_with(&self, request: DetectionRequest, credential: &str) -> DetectionOutcome {
        let adapter = match self.build_adapter(|factory| factory.build(credential)) {
            Ok(adapter) => adapter,
            Err(failure) => return DetectionOutcome::Failure(failure),
        };

        log::info!(
            "Running {} detection on {} ({} bytes) via {}",
            request.media_kind,
            request.file_name,
            request.media.len(),
            adapter.name()
        );

        match AssertUnwindSafe(adapter.detect(&request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => DetectionOutcome::Failure(panic_failure(adapter.name(), panic)),
        }
    }

    pub async fn submit_detection(
        &self,
        artifact: Option<Artifact>,
        credential: Option<&str>,
    ) -> Result<TaskId, DetectionFailure> {
        let (request, credential) = self.prepare(artifact, credential).map_err(|f| self.redact(f))?;
        let adapter = self
            .build_adapter(|factory| factory.build(credential))
            .map_err(|f| self.redact(f))?;

        let Some(capability) = adapter.as_async() else {
            return Err(self.redact(DetectionFailure::new(
                FailureKind::VendorError,
                format!("{} does not support asynchronous detection", adapter.name()),
            )));
        };

        match AssertUnwindSafe(capability.submit(&request)).catch_unwind().await {
            Ok(Ok(task_id)) => Ok(task_id),
            Ok(Err(e)) => Err(self.redact(e.into())),
            Err(panic) => Err(self.redact(panic_failure(adapter.name(), panic))),
        }
    }

    pub async fn poll_detection(&self, task_id: &TaskId, credential: Option<&str>) -> PollOutcome {
        let credential = match require_credential(credential) {
            Ok(credential) => credential,
            Err(failure) => return PollOutcome::Done(self.finish(failure.into())),
        };
        let adapter = match self.build_adapter(|factory| factory.build(credential)) {
            Ok(adapter) => adapter,
            Err(failure) => return PollOutcome::Done(self.finish(failure.into())),
        };

        let Some(capability) = adapter.as_async() else {
            let failure = DetectionFailure::new(
                FailureKind::VendorError,
                format!("{} does not support asynchronous detection", adapter.name()),
            );
            return PollOutcome::Done(self.finish(failure.into()));
        };

        match AssertUnwindSafe(capability.poll(task_id)).catch_unwind().await {
            Ok(PollOutcome::Pending) => PollOutcome::Pending,
            Ok(PollOutcome::Done(outcome)) => PollOutcome::Done(self.finish(outcome)),
            Err(panic) => {
                PollOutcome::Done(self.finish(panic_failure(adapter.name(), panic).into()))
            }
        }
    }

    pub async fn verify_credential(&self, credential: Option<&str>) -> Result<Value, DetectionFailure> {
        let credential = require_credential(credential).map_err(|f| self.redact(f))?;
        let adapter = self
            .build_adapter(|factory| factory.build_verifier(credential))
            .map_err(|f| self.redact(f))?;

        match AssertUnwindSafe(adapter.verify_credential()).catch_unwind().await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(e)) => Err(self.redact(e.into())),
            Err(panic) => Err(self.redact(panic_failure(adapter.name(), panic))),
        }
    }

    fn build_adapter<F>(&self, build: F) -> Result<Box<dyn DetectionAdapter>, DetectionFailure>
    where
        F: FnOnce(&dyn AdapterFactory) -> Result<Box<dyn DetectionAdapter>, AdapterError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(|| build(&*self.factory))) {
            Ok(Ok(adapter)) => Ok(adapter),
            Ok(Err(e)) => Err(e.into()),
            Err(panic) => Err(panic_failure("adapter factory", panic)),
        }
    }

    fn prepare<'c>(
        &self,
        artifact: Option<Artifact>,
        credential: Option<&'c str>,
    ) -> Result<(DetectionRequest, &'c str), DetectionFailure> {
        let descriptor = artifact.as_ref().map(Artifact::descriptor);
        let media_kind = validation::validate(descriptor.as_ref(), credential).map_err(|e| {
            log::warn!("Rejected upload before contacting vendor: {}", e);
            DetectionFailure::from(e)
        })?;

        match (artifact, credential) {
            (Some(artifact), Some(credential)) => Ok((artifact.into_request(media_kind), credential)),
            _ => Err(DetectionFailure::new(
                FailureKind::Internal,
                "Validated upload is incomplete",
            )),
        }
    }

    fn finish(&self, outcome: DetectionOutcome) -> DetectionOutcome {
        match outcome {
            DetectionOutcome::Failure(failure) => DetectionOutcome::Failure(self.redact(failure)),
            success => success,
        }
    }

    fn redact(&self, mut failure: DetectionFailure) -> DetectionFailure {
        if !self.run_mode.exposes_details() {
            failure.detail = None;
        }
        failure
    }
}

fn require_credential(credential: Option<&str>) -> Result<&str, DetectionFailure> {
    match credential {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(validation::ValidationError::MissingCredential.into()),
    }
}

fn panic_failure(source: &str, panic: Box<dyn Any + Send>) -> DetectionFailure {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    log::error!("{} panicked: {}", source, reason);
    DetectionFailure::new(FailureKind::Internal, "Internal server error").with_detail(reason)
}
