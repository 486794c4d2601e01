//! Reply generation with a retry budget and the quality gate.

use rand::seq::SliceRandom;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::backend::{self, ChatBackend, Message};
use crate::quality::{self, Rejection, Verdict};

/// Attempts per prompt, the first one included.
pub const MAX_ATTEMPTS: usize = 5;

/// Why a single attempt produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Backend(backend::Error),
    Rejected(Rejection),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Backend(e) => write!(f, "{e}"),
            AttemptFailure::Rejected(r) => write!(f, "rejected: {r}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    NoModels,
    Exhausted { attempts: usize, last: AttemptFailure },
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::NoModels => write!(f, "no models configured"),
            GenerateError::Exhausted { attempts, last } => {
                write!(f, "no usable reply after {attempts} attempt(s), last: {last}")
            }
        }
    }
}

impl std::error::Error for GenerateError {}

pub struct Generator<B> {
    backend: B,
    models: Vec<String>,
    max_attempts: usize,
}

impl<B: ChatBackend> Generator<B> {
    pub fn new(backend: B, models: Vec<String>) -> Self {
        Self { backend, models, max_attempts: MAX_ATTEMPTS }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn pick_model(&self) -> Option<&str> {
        self.models.choose(&mut rand::thread_rng()).map(String::as_str)
    }

    /// Ask the backend until a reply passes the quality gate.
    pub async fn try_generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let messages = [Message::user(prompt)];
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            let model = self.pick_model().ok_or(GenerateError::NoModels)?;
            debug!("Attempt {attempt}/{} with {model}", self.max_attempts);

            let failure = match self.backend.complete(model, &messages).await {
                Ok(content) => match quality::check(&content) {
                    Verdict::Accept => {
                        info!("Generated reply on attempt {attempt} ({} chars)", content.chars().count());
                        return Ok(content);
                    }
                    Verdict::Reject(reason) => {
                        warn!("Attempt {attempt}: reply {reason}, regenerating");
                        AttemptFailure::Rejected(reason)
                    }
                },
                Err(e) => {
                    error!("Error in attempt {attempt}: {e}");
                    AttemptFailure::Backend(e)
                }
            };
            last = Some(failure);
        }

        match last {
            Some(last) => Err(GenerateError::Exhausted { attempts: self.max_attempts, last }),
            None => Err(GenerateError::NoModels),
        }
    }

    /// Like [`try_generate`](Self::try_generate), but a total failure is an empty string.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error generating response: {e}");
                String::new()
            }
        }
    }
}
