//! Named-parameter job payloads.
//!
//! A job is an open-ended map from parameter name to value; which names are
//! required is a contract between the submitter and the runner that executes
//! the job, checked at apply time rather than on submission.

use std::collections::BTreeMap;

use crate::frame::EncodedFrame;
use crate::tensor::Tensor;

/// A single job parameter: either raw input data or a representation that
/// already went through the encode stage.
#[derive(Debug, Clone, PartialEq)]
pub enum JobValue {
    Raw(Tensor),
    Encoded(EncodedFrame),
}

/// Immutable-once-submitted job payload; ownership moves into the worker
/// that dequeues it.
#[derive(Debug, Clone, Default)]
pub struct Job {
    params: BTreeMap<String, JobValue>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style parameter insertion.
    pub fn with(mut self, name: impl Into<String>, value: JobValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: JobValue) {
        self.params.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&JobValue> {
        self.params.get(name)
    }

    /// Removes and returns a parameter, if present.
    pub fn take(&mut self, name: &str) -> Option<JobValue> {
        self.params.remove(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
