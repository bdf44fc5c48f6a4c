//! The job queue capability interface.

use std::cell::RefCell;
use std::collections::BTreeMap;

use cutsync_common::CutsyncResult;
use serde::{Deserialize, Serialize};

/// Opaque id of a queued job. Host-side background renders and jobs we
/// submit ourselves share this type so dependency chains can mix both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The work a job performs on the farm: a target method plus arguments,
/// and the serialized calling environment needed to reconstruct the
/// session on a different machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Name of the method the remote runner invokes.
    pub method: String,

    /// Method arguments, JSON-serialized.
    pub args: serde_json::Value,

    /// Serialized session context (project, user, app instance).
    pub context: serde_json::Value,

    /// Environment fingerprint captured at submission time.
    pub environment: BTreeMap<String, String>,
}

/// One unit of background work ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Human-readable job name (sanitized by the dispatcher).
    pub name: String,

    /// Longer description shown in the queue UI.
    pub description: String,

    /// Jobs that must complete before this one starts.
    pub run_after: Vec<JobId>,

    /// What the job does.
    pub payload: JobPayload,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, payload: JobPayload) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            run_after: Vec::new(),
            payload,
        }
    }

    pub fn after(mut self, predecessors: Vec<JobId>) -> Self {
        self.run_after = predecessors;
        self
    }
}

/// Capability interface for job submission.
///
/// `Ok(None)` means the submission was deliberately skipped (the user
/// declined re-authentication); `Err` means the queue rejected the job.
/// The queue itself guarantees dependency ordering; this code only
/// threads predecessor ids through.
pub trait JobQueue {
    fn submit(&self, spec: JobSpec) -> CutsyncResult<Option<JobId>>;
}

/// In-memory queue for tests and offline replay: records every spec and
/// hands out sequential ids.
#[derive(Debug, Default)]
pub struct FakeQueue {
    inner: RefCell<FakeInner>,
}

#[derive(Debug, Default)]
struct FakeInner {
    submitted: Vec<(JobId, JobSpec)>,
    next: u64,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All submitted jobs in submission order.
    pub fn submitted(&self) -> Vec<(JobId, JobSpec)> {
        self.inner.borrow().submitted.clone()
    }

    /// Specs of jobs whose payload method matches.
    pub fn jobs_with_method(&self, method: &str) -> Vec<JobSpec> {
        self.inner
            .borrow()
            .submitted
            .iter()
            .filter(|(_, spec)| spec.payload.method == method)
            .map(|(_, spec)| spec.clone())
            .collect()
    }
}

impl JobQueue for FakeQueue {
    fn submit(&self, spec: JobSpec) -> CutsyncResult<Option<JobId>> {
        let mut inner = self.inner.borrow_mut();
        inner.next += 1;
        let id = JobId::new(format!("fake-{}", inner.next));
        inner.submitted.push((id.clone(), spec));
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(method: &str) -> JobPayload {
        JobPayload {
            method: method.to_string(),
            args: serde_json::json!({}),
            context: serde_json::json!({}),
            environment: BTreeMap::new(),
        }
    }

    #[test]
    fn test_fake_queue_assigns_sequential_ids() {
        let queue = FakeQueue::new();
        let a = queue
            .submit(JobSpec::new("a", "", payload("m")))
            .unwrap()
            .unwrap();
        let b = queue
            .submit(JobSpec::new("b", "", payload("m")))
            .unwrap()
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(queue.submitted().len(), 2);
    }

    #[test]
    fn test_dependencies_are_recorded() {
        let queue = FakeQueue::new();
        let first = queue
            .submit(JobSpec::new("render", "", payload("render")))
            .unwrap()
            .unwrap();
        queue
            .submit(JobSpec::new("upload", "", payload("upload")).after(vec![first.clone()]))
            .unwrap();

        let (_, upload) = queue.submitted()[1].clone();
        assert_eq!(upload.run_after, vec![first]);
    }
}
