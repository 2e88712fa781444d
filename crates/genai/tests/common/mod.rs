//! Shared fixtures for `veil-genai` integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;
use veil_core::generation::{Artifact, ArtifactLocator, GenerationRequest, JobHandle, JobStatus};
use veil_genai::service::{GenerationService, ServiceError};

/// One scripted answer to a status query.
pub enum Step {
    Status(JobStatus),
    Error(ServiceError),
}

pub fn pending() -> Step {
    Step::Status(JobStatus::Pending)
}

pub fn done(uri: &str) -> Step {
    Step::Status(JobStatus::Done(vec![ArtifactLocator::Uri(uri.to_string())]))
}

pub fn failed(message: &str) -> Step {
    Step::Status(JobStatus::Failed(message.to_string()))
}

/// Deterministic in-memory [`GenerationService`] that records every call.
///
/// Status queries consume the script in order; once it runs dry every
/// further query reports `Pending`.
pub struct ScriptedService {
    script: Mutex<VecDeque<Step>>,
    submit_error: Mutex<Option<ServiceError>>,
    fetch_error: Mutex<Option<ServiceError>>,
    content_type: String,
    next_token: AtomicUsize,
    pub tokens: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
    pub poll_times: Mutex<Vec<Instant>>,
    pub fetched: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            submit_error: Mutex::new(None),
            fetch_error: Mutex::new(None),
            content_type: "video/mp4".to_string(),
            next_token: AtomicUsize::new(1),
            tokens: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            poll_times: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn failing_submit(self, err: ServiceError) -> Self {
        *self.submit_error.lock().unwrap() = Some(err);
        self
    }

    pub fn failing_fetch(self, err: ServiceError) -> Self {
        *self.fetch_error.lock().unwrap() = Some(err);
        self
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ServiceError> {
        if let Some(err) = self.submit_error.lock().unwrap().take() {
            return Err(err);
        }
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("operations/job-{n}");
        self.tokens.lock().unwrap().push(token.clone());
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(JobHandle::new(token))
    }

    async fn poll(&self, _handle: &JobHandle) -> Result<JobStatus, ServiceError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.poll_times.lock().unwrap().push(Instant::now());
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Status(status)) => Ok(status),
            Some(Step::Error(err)) => Err(err),
            None => Ok(JobStatus::Pending),
        }
    }

    async fn fetch(&self, locator: &ArtifactLocator) -> Result<Artifact, ServiceError> {
        if let Some(err) = self.fetch_error.lock().unwrap().take() {
            return Err(err);
        }
        let uri = match locator {
            ArtifactLocator::Uri(uri) => uri.clone(),
            ArtifactLocator::Inline { .. } => panic!("inline locators must not be fetched"),
        };
        let mut fetched = self.fetched.lock().unwrap();
        fetched.push(uri.clone());
        Ok(Artifact {
            bytes: format!("{uri}#{}", fetched.len()).into_bytes(),
            mime_type: self.content_type.clone(),
            source_uri: Some(uri),
        })
    }
}
