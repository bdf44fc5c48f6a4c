//! Thumbnail and preview job bundling.
//!
//! Several tracking entities often share one rendered source (a batch
//! publish and a Version both want a thumbnail of the same frames).
//! Submitting a transcode per entity would repeat the expensive work, so
//! targets are accumulated per source path and turned into jobs only at
//! `finalize()`: one transcode job and one upload job per unique source,
//! no matter how many entities subscribed to it.

use std::collections::BTreeMap;

use cutsync_common::CutsyncResult;
use cutsync_tracking::EntityRef;
use serde_json::json;

use crate::queue::{JobId, JobPayload, JobQueue, JobSpec};

#[derive(Debug, Clone)]
struct PendingSource {
    targets: Vec<EntityRef>,
    predecessors: Vec<JobId>,
}

/// Accumulates thumbnail targets and defers submission until finalized.
#[derive(Debug, Default)]
pub struct ThumbnailGenerator {
    /// Keyed by source path; insertion order preserved separately.
    pending: BTreeMap<String, PendingSource>,
    order: Vec<String>,
    /// Serialized session context attached to every emitted job.
    context: serde_json::Value,
}

impl ThumbnailGenerator {
    pub fn new(context: serde_json::Value) -> Self {
        Self {
            pending: BTreeMap::new(),
            order: Vec::new(),
            context,
        }
    }

    /// Register an entity that wants a thumbnail generated from
    /// `source_path`. `predecessor` is the job that produces the source
    /// media, when it is still rendering.
    pub fn request(&mut self, source_path: &str, entity: EntityRef, predecessor: Option<JobId>) {
        if !self.pending.contains_key(source_path) {
            self.order.push(source_path.to_string());
        }
        let pending = self
            .pending
            .entry(source_path.to_string())
            .or_insert_with(|| PendingSource {
                targets: Vec::new(),
                predecessors: Vec::new(),
            });
        pending.targets.push(entity);
        if let Some(job) = predecessor {
            if !pending.predecessors.contains(&job) {
                pending.predecessors.push(job);
            }
        }
    }

    /// Number of distinct source paths currently pending.
    pub fn pending_sources(&self) -> usize {
        self.order.len()
    }

    /// Submit the accumulated work: per unique source path, one transcode
    /// job (after the source's render jobs) and one upload job (after the
    /// transcode). Clears the pending set; returns ids of submitted jobs.
    /// Sources whose transcode was skipped by a cancelled authentication
    /// skip their upload too.
    pub fn finalize(&mut self, queue: &dyn JobQueue) -> CutsyncResult<Vec<JobId>> {
        let mut submitted = Vec::new();

        for path in std::mem::take(&mut self.order) {
            let Some(source) = self.pending.remove(&path) else {
                continue;
            };
            let targets: Vec<serde_json::Value> =
                source.targets.iter().map(|e| e.to_value()).collect();

            let transcode = JobSpec::new(
                format!("Generate thumbnail {path}"),
                format!("Transcode preview media for {} entities", targets.len()),
                JobPayload {
                    method: "generate_preview".to_string(),
                    args: json!({ "source_path": path, "targets": targets }),
                    context: self.context.clone(),
                    environment: BTreeMap::new(),
                },
            )
            .after(source.predecessors.clone());

            let Some(transcode_id) = queue.submit(transcode)? else {
                tracing::info!(path = %path, "thumbnail transcode skipped, skipping upload");
                continue;
            };

            let upload = JobSpec::new(
                format!("Upload thumbnail {path}"),
                "Upload preview media to the tracking database".to_string(),
                JobPayload {
                    method: "upload_preview".to_string(),
                    args: json!({ "source_path": path, "targets": targets }),
                    context: self.context.clone(),
                    environment: BTreeMap::new(),
                },
            )
            .after(vec![transcode_id.clone()]);

            let upload_id = queue.submit(upload)?;
            submitted.push(transcode_id);
            submitted.extend(upload_id);
        }

        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FakeQueue;

    fn entity(id: i64) -> EntityRef {
        EntityRef::new("Version", id)
    }

    #[test]
    fn test_shared_source_bundles_into_one_transcode() {
        let queue = FakeQueue::new();
        let mut gen = ThumbnailGenerator::new(json!({}));

        gen.request("renders/010.mov", entity(1), None);
        gen.request("renders/010.mov", entity(2), None);
        gen.request("renders/010.mov", entity(3), None);
        assert_eq!(gen.pending_sources(), 1);

        gen.finalize(&queue).unwrap();

        // One transcode and one upload, not three of each.
        let jobs = queue.submitted();
        assert_eq!(jobs.len(), 2);
        let targets = jobs[0].1.payload.args["targets"].as_array().unwrap();
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn test_distinct_sources_submit_separately_in_order() {
        let queue = FakeQueue::new();
        let mut gen = ThumbnailGenerator::new(json!({}));

        gen.request("renders/b.mov", entity(1), None);
        gen.request("renders/a.mov", entity(2), None);

        gen.finalize(&queue).unwrap();

        let jobs = queue.submitted();
        assert_eq!(jobs.len(), 4);
        assert!(jobs[0].1.name.contains("renders/b.mov"));
        assert!(jobs[2].1.name.contains("renders/a.mov"));
    }

    #[test]
    fn test_upload_depends_on_transcode_which_depends_on_render() {
        let queue = FakeQueue::new();
        let mut gen = ThumbnailGenerator::new(json!({}));

        let render_job = JobId::new("8842");
        gen.request("renders/010.mov", entity(1), Some(render_job.clone()));
        gen.finalize(&queue).unwrap();

        let jobs = queue.submitted();
        let (transcode_id, transcode) = &jobs[0];
        let (_, upload) = &jobs[1];
        assert_eq!(transcode.run_after, vec![render_job]);
        assert_eq!(upload.run_after, vec![transcode_id.clone()]);
    }

    #[test]
    fn test_finalize_clears_pending() {
        let queue = FakeQueue::new();
        let mut gen = ThumbnailGenerator::new(json!({}));
        gen.request("renders/010.mov", entity(1), None);
        gen.finalize(&queue).unwrap();
        assert_eq!(gen.pending_sources(), 0);

        gen.finalize(&queue).unwrap();
        assert_eq!(queue.submitted().len(), 2);
    }
}
