//! Scripted backend doubles shared by the worker and orchestrator tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;

use super::client::{ChunkStream, LlmBackend, LlmError, TextGenerator};

/// How a [`MockGenerator`] answers `stream_generate`.
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Yield the chunks, then end.
    Chunks(Vec<String>),
    /// Yield the chunks, then fail mid-stream.
    FailAfter(Vec<String>, String),
    /// Fail before any chunk is produced.
    FailToStart(String),
    /// Yield the chunks, then stay open without ending.
    Stall(Vec<String>),
    /// Never answer.
    Hang,
}

/// Generator that replays a [`StreamScript`] and records prompts.
pub struct MockGenerator {
    model: String,
    script: StreamScript,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(script: StreamScript) -> Self {
        Self {
            model: "mock-model".into(),
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Self::new(StreamScript::Chunks(chunks.iter().map(|c| c.to_string()).collect()))
    }

    pub fn fail_after(chunks: &[&str], message: &str) -> Self {
        Self::new(StreamScript::FailAfter(
            chunks.iter().map(|c| c.to_string()).collect(),
            message.into(),
        ))
    }

    pub fn stall(chunks: &[&str]) -> Self {
        Self::new(StreamScript::Stall(chunks.iter().map(|c| c.to_string()).collect()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_generate(&self, prompt: &str) -> Result<ChunkStream, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let StreamScript::Stall(chunks) = &self.script {
            let chunks: Vec<Result<String, LlmError>> = chunks.iter().cloned().map(Ok).collect();
            return Ok(futures_util::stream::iter(chunks)
                .chain(futures_util::stream::pending())
                .boxed());
        }

        let items: Vec<Result<String, LlmError>> = match &self.script {
            StreamScript::Chunks(chunks) => chunks.iter().cloned().map(Ok).collect(),
            StreamScript::FailAfter(chunks, message) => chunks
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(LlmError::Request(message.clone()))))
                .collect(),
            StreamScript::FailToStart(message) => {
                return Err(LlmError::Request(message.clone()));
            }
            StreamScript::Stall(_) => Vec::new(),
            StreamScript::Hang => {
                std::future::pending::<()>().await;
                Vec::new()
            }
        };

        Ok(futures_util::stream::iter(items).boxed())
    }
}

/// How a [`MockBackend`] answers one `validate` call.
#[derive(Debug, Clone)]
pub enum ValidateScript {
    Accept,
    Reject(String),
    Hang,
}

/// Backend whose `connect` / `validate` behaviour is scripted per test.
pub struct MockBackend {
    generator: Mutex<Arc<MockGenerator>>,
    connect_error: Mutex<Option<String>>,
    validations: Mutex<VecDeque<ValidateScript>>,
    connect_calls: Mutex<Vec<(String, String)>>,
    validate_calls: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new(generator: MockGenerator) -> Self {
        Self {
            generator: Mutex::new(Arc::new(generator)),
            connect_error: Mutex::new(None),
            validations: Mutex::new(VecDeque::new()),
            connect_calls: Mutex::new(Vec::new()),
            validate_calls: Mutex::new(Vec::new()),
        }
    }

    /// The generator handed out by the next `connect`.
    pub fn generator(&self) -> Arc<MockGenerator> {
        Arc::clone(&self.generator.lock().unwrap())
    }

    pub fn set_generator(&self, generator: MockGenerator) {
        *self.generator.lock().unwrap() = Arc::new(generator);
    }

    /// Make every `connect` fail with `message` (`None` to succeed again).
    pub fn set_connect_error(&self, message: Option<&str>) {
        *self.connect_error.lock().unwrap() = message.map(str::to_string);
    }

    /// Queue the answer for the next `validate`; unqueued calls accept.
    pub fn push_validation(&self, script: ValidateScript) {
        self.validations.lock().unwrap().push_back(script);
    }

    pub fn connect_calls(&self) -> Vec<(String, String)> {
        self.connect_calls.lock().unwrap().clone()
    }

    pub fn validate_calls(&self) -> Vec<(String, String)> {
        self.validate_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn connect(&self, api_key: &str, model: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        self.connect_calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), model.to_string()));

        if let Some(message) = self.connect_error.lock().unwrap().clone() {
            return Err(LlmError::Client(message));
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::EmptyKey);
        }
        Ok(self.generator())
    }

    async fn validate(&self, api_key: &str, model: &str) -> Result<(), LlmError> {
        self.validate_calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), model.to_string()));

        let script = self
            .validations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ValidateScript::Accept);

        match script {
            ValidateScript::Accept => Ok(()),
            ValidateScript::Reject(message) => Err(LlmError::Api {
                status: 400,
                message,
            }),
            ValidateScript::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
