use crate::error::{IftaError, Result};

/// Ticket handed out when a form submits. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    generation: u64,
}

#[derive(Debug)]
pub enum Outcome {
    /// The result became the form's data
    Committed,
    /// The request failed; the form is back to showing nothing
    Failed(IftaError),
    /// A newer submission exists; the result was dropped
    Stale,
}

/// View state of one form: whether a request is out, and the last result it accepted.
#[derive(Debug)]
pub struct FormState<T> {
    name: &'static str,
    generation: u64,
    loading: bool,
    data: Option<T>,
}

impl<T> FormState<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            loading: false,
            data: None,
        }
    }

    /// Start a request. Any submission still in flight can no longer commit.
    pub fn begin(&mut self) -> Submission {
        self.generation += 1;
        self.loading = true;
        log::info!("{}: submission {} started", self.name, self.generation);
        Submission {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, submission: Submission) -> bool {
        submission.generation == self.generation
    }

    /// Settle a request. Failures are logged and clear the data.
    pub fn finish(&mut self, submission: Submission, result: Result<T>) -> Outcome {
        if !self.is_current(submission) {
            log::warn!(
                "{}: dropping result of submission {} (current is {})",
                self.name,
                submission.generation,
                self.generation
            );
            return Outcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                Outcome::Committed
            }
            Err(e) => {
                log::error!("{}: {e}", self.name);
                self.data = None;
                Outcome::Failed(e)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn take(&mut self) -> Option<T> {
        self.data.take()
    }
}
