//! Replay a captured host callback stream against in-memory services.
//!
//! The events file is a JSON array of host callback records, the same
//! shape the export crate serializes. Tracking-database calls go to an
//! in-memory store, job submissions to a recording queue, and the modal
//! dialogs auto-accept, so a session captured on a Flame workstation can
//! be re-run and inspected anywhere.

use std::path::PathBuf;

use cutsync_backburner::FakeQueue;
use cutsync_common::{AppConfig, CutsyncResult};
use cutsync_export::events::HostEvent;
use cutsync_export::preset::DefaultCodecSettings;
use cutsync_export::registry::EngineState;
use cutsync_export::session::{
    Collaborators, ExportSettings, PublishRequest, SessionEnv, SessionSummary,
    SubmissionService, UiService,
};
use cutsync_tracking::{EntityRef, MemoryTracking};

/// Auto-accepting UI: picks the requested preset (or the first one) and
/// prints whatever the session would have shown in a dialog.
struct ReplayUi {
    preset: Option<String>,
    comments: String,
}

impl UiService for ReplayUi {
    fn request_export_settings(&self, preset_names: &[&str]) -> Option<ExportSettings> {
        let preset = self
            .preset
            .clone()
            .or_else(|| preset_names.first().map(|n| n.to_string()))?;
        Some(ExportSettings {
            preset,
            comments: self.comments.clone(),
        })
    }

    fn show_warning(&self, message: &str) {
        println!("[WARN] {message}");
    }

    fn show_summary(&self, summary: &SessionSummary) {
        println!("[SUMMARY] {}", summary.message);
    }
}

/// Counts publish registrations instead of touching a real pipeline.
#[derive(Default)]
struct ReplaySubmission {
    counter: std::cell::Cell<i64>,
}

impl SubmissionService for ReplaySubmission {
    fn register_batch_publish(&self, request: &PublishRequest) -> CutsyncResult<EntityRef> {
        self.counter.set(self.counter.get() + 1);
        println!("[PUBLISH] batch   {} -> {}", request.name, request.path);
        Ok(EntityRef::new("PublishedFile", self.counter.get()))
    }

    fn register_video_publish(&self, request: &PublishRequest) -> CutsyncResult<EntityRef> {
        self.counter.set(self.counter.get() + 1);
        println!("[PUBLISH] video   {} -> {}", request.name, request.path);
        Ok(EntityRef::new("PublishedFile", self.counter.get()))
    }
}

pub fn run(
    config: AppConfig,
    events_path: PathBuf,
    preset: Option<String>,
    comments: String,
    destination: PathBuf,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&events_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", events_path.display()))?;
    let mut events: Vec<HostEvent> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse events: {e}"))?;

    println!("Replaying {} event(s) from {}", events.len(), events_path.display());

    let env = SessionEnv::new(
        config,
        EntityRef::new("Project", 1),
        "cutsync-replay",
        "localhost",
        destination,
    )?;
    let tracking = MemoryTracking::with_cut_support();
    let ui = ReplayUi { preset, comments };
    let submission = ReplaySubmission::default();
    let queue = FakeQueue::new();
    let collab = Collaborators {
        tracking: &tracking,
        ui: &ui,
        submission: &submission,
        queue: &queue,
        codec: &DefaultCodecSettings,
    };

    let mut engine = EngineState::new();
    for event in &mut events {
        engine.dispatch("replay", &env, &collab, event)?;
    }

    println!();
    println!("Tracking calls:");
    for call in tracking.calls() {
        println!("  {call}");
    }
    println!();
    println!("Jobs submitted:");
    for (id, spec) in queue.submitted() {
        println!("  {} {} ({})", id, spec.payload.method, spec.name);
    }

    Ok(())
}
