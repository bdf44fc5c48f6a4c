//! The export session orchestrator.
//!
//! One `ExportSession` lives from `preCustomExport` to `postCustomExport`
//! and accumulates the Sequence → Shot → Segment graph as the host walks
//! its timeline. Every handler runs synchronously on the host's main
//! thread; the host is blocked until it returns, so nothing here spawns
//! threads or waits on anything but the collaborators it is handed.
//!
//! End-of-session reconciliation happens on `postCustomExport`:
//! cut updates and Version creates go out in
//! a single batch round trip per sequence, Version ids come back by
//! correlation id, publishes and thumbnail jobs are registered, and a
//! summary is shown to the user.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use cutsync_backburner::{JobId, JobPayload, JobQueue, JobSpec, ThumbnailGenerator};
use cutsync_common::{AppConfig, CutsyncError, CutsyncResult};
use cutsync_model::{BatchData, SegmentData, Sequence};
use cutsync_templates::{FieldMap, TemplateSet};
use cutsync_tracking::{BatchRequest, EntityRef, FieldData, Filter, ShotContext, TrackingService};
use regex::Regex;
use serde_json::json;

use crate::events::{AssetInfo, BatchExportInfo, CustomExportInfo, SequenceExportInfo};
use crate::preset::{find_preset_for_path, CodecSettings, ExportPreset};

/// What the user picked in the export setup dialog.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Name of the chosen preset.
    pub preset: String,

    /// Free-form comments attached to created Versions.
    pub comments: String,
}

/// Modal UI collaborator. The host is blocked while a dialog is up, so
/// implementations must not themselves wait on host callbacks.
pub trait UiService {
    /// Show the export setup dialog. `None` means the user cancelled.
    fn request_export_settings(&self, preset_names: &[&str]) -> Option<ExportSettings>;

    /// Blocking warning dialog.
    fn show_warning(&self, message: &str);

    /// End-of-session summary dialog.
    fn show_summary(&self, summary: &SessionSummary);
}

/// One publish to register against the tracking database.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Working context of the owning Shot.
    pub context: ShotContext,

    /// Publish name shown in the tracking UI.
    pub name: String,

    /// Path of the published file or frame sequence.
    pub path: String,

    pub version_number: i64,

    /// Session comments, carried onto the publish description.
    pub comments: String,

    /// Render job that produces the published media, when it is still
    /// rendering on the farm.
    pub dependency: Option<JobId>,
}

/// Publish registration, behind a seam so tests and studio-specific
/// pipelines can supply their own implementation.
pub trait SubmissionService {
    /// Register a batch setup file publish. Returns the created publish
    /// entity.
    fn register_batch_publish(&self, request: &PublishRequest) -> CutsyncResult<EntityRef>;

    /// Register a rendered-media publish.
    fn register_video_publish(&self, request: &PublishRequest) -> CutsyncResult<EntityRef>;
}

/// What happened over the whole session, for the summary dialog.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    /// Set when the session never reached the post-asset phase.
    pub failed: bool,

    pub new_shots: usize,

    /// Shots that already existed but had cut fields updated.
    pub cut_updates: usize,

    pub versions_created: usize,
    pub cuts_created: usize,

    pub message: String,
}

/// Immutable per-session environment, resolved once at engine start.
pub struct SessionEnv {
    pub config: AppConfig,
    pub templates: TemplateSet,
    pub presets: Vec<ExportPreset>,

    /// Project every created entity is linked to.
    pub project: EntityRef,

    /// App instance name, keys the profile cache location.
    pub app_instance: String,

    /// Host the export runs on.
    pub destination_host: String,

    /// Root directory all exported files land under.
    pub destination_path: PathBuf,
}

impl SessionEnv {
    pub fn new(
        config: AppConfig,
        project: EntityRef,
        app_instance: impl Into<String>,
        destination_host: impl Into<String>,
        destination_path: impl Into<PathBuf>,
    ) -> CutsyncResult<Self> {
        let templates = TemplateSet::from_pairs(
            config.templates.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .map_err(|e| CutsyncError::config(e.to_string()))?;
        let presets = config.presets.iter().map(ExportPreset::from).collect();
        Ok(Self {
            config,
            templates,
            presets,
            project,
            app_instance: app_instance.into(),
            destination_host: destination_host.into(),
            destination_path: destination_path.into(),
        })
    }
}

/// Everything the session calls out to, injected per dispatch so the
/// session itself stays `'static` and storable in the engine registry.
pub struct Collaborators<'a> {
    pub tracking: &'a dyn TrackingService,
    pub ui: &'a dyn UiService,
    pub submission: &'a dyn SubmissionService,
    pub queue: &'a dyn JobQueue,
    pub codec: &'a dyn CodecSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
}

/// Per-sequence reconciliation counts.
#[derive(Debug, Clone, Copy, Default)]
struct SequenceCounts {
    new_shots: usize,
    cut_updates: usize,
    versions: usize,
    cuts: usize,
}

/// One export session, driven by host callbacks.
pub struct ExportSession {
    id: String,
    state: SessionState,
    sequences: Vec<Sequence>,
    preset: Option<ExportPreset>,
    comments: String,

    /// Set the first time a `postExportAsset` lands. If it is still unset
    /// at session end, the export produced nothing and the user gets the
    /// generic failure warning.
    reached_post_asset: bool,

    /// Stashed between `batchExportBegin` and `batchExportEnd`.
    batch_state: Option<BatchExportInfo>,
}

/// Discriminates concurrently-diverted assets sharing a timestamp.
static TRASH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sentinel discard location for assets whose shot was never named. The
/// host offers no abort hook at asset time, so the media has to land
/// somewhere out of the way.
fn trash_path(original: &str) -> String {
    let n = TRASH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let file = Path::new(original)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    format!("flame_trash/{stamp}_{n}/{file}")
}

/// Pull the frame counter or frame range out of a host-resolved path.
/// The host writes either `name.[1001-1100].dpx` or `name.1001.dpx`.
fn frame_token(resolved_path: &str) -> Option<String> {
    let re = Regex::new(r"\[(\d+)-\d+\]|\.(\d+)\.").ok()?;
    let caps = re.captures(resolved_path)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

impl ExportSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            sequences: Vec::new(),
            preset: None,
            comments: String::new(),
            reached_post_asset: false,
            batch_state: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Asset callbacks route to the most recently appended sequence. The
    /// host drives sequences one at a time; interleaved multi-sequence
    /// exports are not supported by this design.
    fn active_sequence_mut(&mut self) -> Option<&mut Sequence> {
        self.sequences.last_mut()
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.sequences.clear();
        self.preset = None;
        self.comments.clear();
        self.reached_post_asset = false;
        self.batch_state = None;
    }

    /// `preCustomExport`: reset, prompt for preset + comments, resolve
    /// the export profile, and write destination and profile path back to
    /// the host. A cancelled dialog aborts the whole custom export.
    pub fn pre_custom_export(
        &mut self,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
        info: &mut CustomExportInfo,
    ) -> CutsyncResult<()> {
        // Defensive reset in case a previous session never reached its
        // postCustomExport.
        self.reset();

        let names: Vec<&str> = env.presets.iter().map(|p| p.name.as_str()).collect();
        let Some(settings) = collab.ui.request_export_settings(&names) else {
            tracing::info!(session = %self.id, "export cancelled at setup dialog");
            info.abort = true;
            info.abort_message = Some("Export cancelled by user.".to_string());
            return Ok(());
        };

        let preset = env
            .presets
            .iter()
            .find(|p| p.name == settings.preset)
            .ok_or_else(|| {
                CutsyncError::config(format!("unknown export preset '{}'", settings.preset))
            })?
            .clone();

        let profile_path = preset.resolve_profile(
            &env.templates,
            collab.codec,
            &settings.comments,
            &env.config.cache_dir,
            &env.app_instance,
        )?;

        info.destination_host = Some(env.destination_host.clone());
        info.destination_path = Some(env.destination_path.to_string_lossy().into_owned());
        info.preset_path = Some(profile_path.to_string_lossy().into_owned());

        self.comments = settings.comments;
        self.preset = Some(preset);
        self.state = SessionState::Collecting;
        tracing::info!(session = %self.id, preset = %settings.preset, "export session started");
        Ok(())
    }

    /// `preExportSequence`: validate, sync the shot structure to the
    /// tracking database, append the sequence. Validation failures abort
    /// this sequence only; siblings keep exporting.
    pub fn pre_export_sequence(
        &mut self,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
        info: &mut SequenceExportInfo,
    ) -> CutsyncResult<()> {
        if info.shot_names.is_empty() {
            let message = format!(
                "Sequence '{}' has no shots set up and will not be exported.",
                info.sequence_name
            );
            collab.ui.show_warning(&message);
            info.abort = true;
            info.abort_message = Some(message);
            return Ok(());
        }
        if info.sequence_name.is_empty() || info.sequence_name.chars().any(char::is_whitespace) {
            let message = format!(
                "Sequence name '{}' contains spaces and cannot be exported.",
                info.sequence_name
            );
            collab.ui.show_warning(&message);
            info.abort = true;
            info.abort_message = Some(message);
            return Ok(());
        }

        let mut sequence = Sequence::new(info.sequence_name.as_str())?;
        for name in &info.shot_names {
            sequence.add_shot(name);
        }
        sequence.process_shotgun_shot_structure(
            collab.tracking,
            &env.project,
            env.config.task_template.as_deref(),
        )?;
        self.sequences.push(sequence);
        Ok(())
    }

    /// `preExportAsset`: rewrite the asset's output path through the
    /// preset's templates. The rewritten path is root-relative; the host
    /// joins it under the destination path itself.
    pub fn pre_export_asset(
        &mut self,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
        info: &mut AssetInfo,
    ) -> CutsyncResult<()> {
        use crate::events::AssetType;

        let preset = self
            .preset
            .clone()
            .ok_or_else(|| CutsyncError::export("asset callback before export setup"))?;

        let template_name = match info.asset_type {
            AssetType::Video | AssetType::Movie => &preset.render_template,
            AssetType::Batch => &preset.batch_template,
            AssetType::BatchOpenClip => &preset.shot_clip_template,
            AssetType::OpenClip => &preset.segment_clip_template,
            AssetType::Audio => return Ok(()),
        };

        if info.shot_name.is_empty() {
            // No abort hook exists at this point; divert the render
            // somewhere it cannot clobber real output.
            collab.ui.show_warning(
                "An exported asset has no shot name and will be discarded. \
                 Name your shots before exporting.",
            );
            info.resolved_path = trash_path(&info.resolved_path);
            tracing::warn!(
                session = %self.id,
                asset = %info.asset_name,
                path = %info.resolved_path,
                "unnamed shot, asset diverted to trash"
            );
            return Ok(());
        }

        let template = preset.template(&env.templates, template_name)?;

        let mut fields = FieldMap::new();
        fields.insert("Sequence".to_string(), info.sequence_name.clone());
        fields.insert("SequenceParent".to_string(), info.sequence_name.clone());
        fields.insert("Shot".to_string(), info.shot_name.clone());
        fields.insert("Segment".to_string(), info.asset_name.clone());
        fields.insert("version".to_string(), info.version_number.to_string());
        fields.insert("width".to_string(), info.width.to_string());
        fields.insert("height".to_string(), info.height.to_string());

        let now = Local::now();
        fields.insert("YYYY".to_string(), now.format("%Y").to_string());
        fields.insert("MM".to_string(), now.format("%m").to_string());
        fields.insert("DD".to_string(), now.format("%d").to_string());
        fields.insert("hh".to_string(), now.format("%H").to_string());
        fields.insert("mm".to_string(), now.format("%M").to_string());
        fields.insert("ss".to_string(), now.format("%S").to_string());

        if let Some(frame) = frame_token(&info.resolved_path) {
            fields.insert("frame".to_string(), frame.clone());
            fields.insert("SEQ".to_string(), frame);
        }

        // Template output is already relative to the destination root
        // the host was handed at setup time, which is the form it wants
        // back.
        let rewritten = template
            .apply_fields(&fields)
            .map_err(|e| CutsyncError::template(e.to_string()))?;
        tracing::debug!(
            session = %self.id,
            asset = %info.asset_name,
            path = %rewritten,
            "resolved asset path"
        );
        info.resolved_path = rewritten;
        Ok(())
    }

    /// `postExportAsset`: attach reported render metadata to the graph.
    /// Video/movie assets become Segments; a batch asset attaches to the
    /// Shot itself.
    pub fn post_export_asset(&mut self, info: &AssetInfo) -> CutsyncResult<()> {
        use crate::events::AssetType;

        let preset_handles = self.preset.as_ref().map(|p| p.handle_length).unwrap_or(0);

        if info.shot_name.is_empty() {
            return Ok(());
        }
        let session = self.id.clone();
        let Some(sequence) = self.active_sequence_mut() else {
            tracing::warn!(session = %session, "asset reported with no sequence in flight");
            return Ok(());
        };
        if sequence.name() != info.sequence_name {
            tracing::warn!(
                session = %session,
                active = %sequence.name(),
                reported = %info.sequence_name,
                "asset reported for a non-active sequence, routing to active"
            );
        }
        let Some(shot) = sequence.shot_mut(&info.shot_name) else {
            tracing::warn!(
                session = %session,
                shot = %info.shot_name,
                "asset reported for unknown shot, ignoring"
            );
            return Ok(());
        };

        match info.asset_type {
            AssetType::Video | AssetType::Movie => {
                let segment = shot.add_segment(&info.asset_name);
                segment.set_data(SegmentData {
                    track: info.track,
                    source_in: info.source_in,
                    source_out: info.source_out,
                    record_in: info.record_in,
                    record_out: info.record_out,
                    handle_in: info.handle_in.unwrap_or(preset_handles),
                    handle_out: info.handle_out.unwrap_or(preset_handles),
                    fps: info.fps,
                    drop_frame: info.drop_frame,
                    width: info.width,
                    height: info.height,
                    aspect_ratio: info.aspect_ratio,
                    background_job_id: info.background_job_id.clone(),
                    render_path: info.resolved_path.clone(),
                    version_number: info.version_number,
                });
            }
            AssetType::Batch => {
                shot.set_batch_data(BatchData {
                    path: info.resolved_path.clone(),
                    version_number: info.version_number,
                });
            }
            AssetType::BatchOpenClip | AssetType::OpenClip | AssetType::Audio => return Ok(()),
        }
        self.reached_post_asset = true;
        Ok(())
    }

    /// `postCustomExport`: reconcile every accumulated sequence against
    /// the tracking database, register publishes and farm jobs, and show
    /// the summary. A remote failure aborts only the sequence it happened
    /// in; the loop moves on to the next one.
    pub fn do_submission_and_summary(
        &mut self,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
    ) -> CutsyncResult<SessionSummary> {
        if !self.reached_post_asset {
            let summary = SessionSummary {
                failed: true,
                message: "The export did not produce any media. Something went wrong, \
                          please check the logs for details."
                    .to_string(),
                ..SessionSummary::default()
            };
            collab.ui.show_warning(&summary.message);
            self.reset();
            return Ok(summary);
        }

        let preset = self
            .preset
            .clone()
            .ok_or_else(|| CutsyncError::export("session end before export setup"))?;

        let mut totals = SequenceCounts::default();
        let mut thumbnails = ThumbnailGenerator::new(json!({
            "session": self.id,
            "project": env.project.to_value(),
        }));

        for idx in 0..self.sequences.len() {
            match self.process_sequence(idx, collab, &preset, &mut thumbnails) {
                Ok(counts) => {
                    totals.new_shots += counts.new_shots;
                    totals.cut_updates += counts.cut_updates;
                    totals.versions += counts.versions;
                    totals.cuts += counts.cuts;
                }
                Err(e) => {
                    tracing::error!(
                        session = %self.id,
                        sequence = %self.sequences[idx].name(),
                        error = %e,
                        "sequence reconciliation failed, continuing with next sequence"
                    );
                }
            }
        }

        thumbnails.finalize(collab.queue)?;

        // High-res quicktimes go out strictly after the thumbnail jobs so
        // the queue never starves fast preview transcodes behind them.
        if preset.highres_quicktime {
            self.submit_highres_jobs(collab.queue)?;
        }

        let summary = SessionSummary {
            failed: false,
            new_shots: totals.new_shots,
            cut_updates: totals.cut_updates,
            versions_created: totals.versions,
            cuts_created: totals.cuts,
            message: format!(
                "Created {} new shot(s), updated cut information on {} shot(s), \
                 created {} version(s).",
                totals.new_shots, totals.cut_updates, totals.versions
            ),
        };
        collab.ui.show_summary(&summary);
        tracing::info!(
            session = %self.id,
            new_shots = summary.new_shots,
            cut_updates = summary.cut_updates,
            versions = summary.versions_created,
            "export session complete"
        );
        self.reset();
        Ok(summary)
    }

    /// Reconcile one sequence: cut updates + Version creates in a single
    /// batch round trip, then the Cut record, then publishes and
    /// thumbnail requests.
    fn process_sequence(
        &mut self,
        idx: usize,
        collab: &Collaborators<'_>,
        preset: &ExportPreset,
        thumbnails: &mut ThumbnailGenerator,
    ) -> CutsyncResult<SequenceCounts> {
        let comments = self.comments.clone();
        let sequence = &mut self.sequences[idx];
        let mut counts = SequenceCounts::default();

        let mut requests = sequence.compute_shot_cut_changes();
        let updated_ids: Vec<i64> = requests
            .iter()
            .filter_map(|r| match r {
                BatchRequest::Update { id, .. } => Some(*id),
                BatchRequest::Create { .. } => None,
            })
            .collect();

        // One Version create per segment with render output, correlated
        // by render path so the response can be matched back.
        let mut version_creates = 0;
        for shot in sequence.shots() {
            let Some(shot_id) = shot.shotgun_id else { continue };
            let Some(context) = &shot.context else { continue };
            for segment in shot.render_segments() {
                let Some(data) = segment.data() else { continue };
                let mut fields = FieldData::new();
                fields.insert(
                    "code".to_string(),
                    json!(format!("{}_v{:03}", segment.name(), data.version_number)),
                );
                fields.insert("project".to_string(), context.project.to_value());
                fields.insert(
                    "entity".to_string(),
                    EntityRef::new("Shot", shot_id).to_value(),
                );
                if let Some(task) = &context.task {
                    fields.insert("sg_task".to_string(), task.to_value());
                }
                fields.insert("description".to_string(), json!(comments));
                fields.insert("sg_path_to_frames".to_string(), json!(data.render_path));
                fields.insert("sg_first_frame".to_string(), json!(data.head_in_frame()));
                fields.insert("sg_last_frame".to_string(), json!(data.tail_out_frame()));
                fields.insert(
                    "frame_count".to_string(),
                    json!(data.tail_out_frame() - data.head_in_frame() + 1),
                );
                requests.push(BatchRequest::Create {
                    entity_type: "Version".to_string(),
                    data: fields,
                    correlation: Some(data.render_path.clone()),
                });
                version_creates += 1;
            }
        }

        if !requests.is_empty() {
            let results = collab.tracking.batch(requests)?;
            for result in results {
                if result.entity.entity_type != "Version" {
                    continue;
                }
                let Some(path) = result.correlation else { continue };
                'shots: for shot in sequence.shots_mut() {
                    for segment in shot.segments_mut() {
                        let matches = segment
                            .data()
                            .map(|d| d.render_path == path)
                            .unwrap_or(false);
                        if matches {
                            segment.set_version_id(result.entity.id);
                            break 'shots;
                        }
                    }
                }
            }
        }
        counts.versions = version_creates;

        counts.new_shots = sequence.shots().iter().filter(|s| s.new_in_shotgun).count();
        counts.cut_updates = sequence
            .shots()
            .iter()
            .filter(|s| {
                !s.new_in_shotgun
                    && s.shotgun_id
                        .map(|id| updated_ids.contains(&id))
                        .unwrap_or(false)
            })
            .count();

        if sequence.create_cut(collab.tracking, &preset.cut_type)?.is_some() {
            counts.cuts = 1;
        }

        // Publishes and thumbnail requests, per shot.
        for shot in sequence.shots() {
            let Some(context) = &shot.context else { continue };

            if let Some(batch) = shot.batch_data() {
                let request = PublishRequest {
                    context: context.clone(),
                    name: format!("{} batch", shot.name()),
                    path: batch.path.clone(),
                    version_number: batch.version_number,
                    comments: comments.clone(),
                    dependency: None,
                };
                collab.submission.register_batch_publish(&request)?;
            }

            for segment in shot.render_segments() {
                let Some(data) = segment.data() else { continue };
                let dependency = data.background_job_id.clone().map(JobId::new);
                let request = PublishRequest {
                    context: context.clone(),
                    name: format!("{} {}", shot.name(), segment.name()),
                    path: data.render_path.clone(),
                    version_number: data.version_number,
                    comments: comments.clone(),
                    dependency: dependency.clone(),
                };
                let publish = collab.submission.register_video_publish(&request)?;
                thumbnails.request(&data.render_path, publish, dependency.clone());
                if preset.upload_quicktime {
                    if let Some(version_id) = segment.version_id() {
                        thumbnails.request(
                            &data.render_path,
                            EntityRef::new("Version", version_id),
                            dependency,
                        );
                    }
                }
            }
        }

        Ok(counts)
    }

    /// One high-res quicktime job per Version, dependent on the render
    /// job that produces its source media.
    fn submit_highres_jobs(&self, queue: &dyn JobQueue) -> CutsyncResult<()> {
        for sequence in &self.sequences {
            for shot in sequence.shots() {
                for segment in shot.render_segments() {
                    let Some(data) = segment.data() else { continue };
                    let Some(version_id) = segment.version_id() else { continue };
                    let payload = JobPayload {
                        method: "generate_highres_quicktime".to_string(),
                        args: json!({
                            "version_id": version_id,
                            "source_path": data.render_path,
                        }),
                        context: json!({ "session": self.id }),
                        environment: Default::default(),
                    };
                    let spec = JobSpec::new(
                        format!("High-res quicktime {} {}", shot.name(), segment.name()),
                        format!("High-resolution quicktime for version {version_id}"),
                        payload,
                    )
                    .after(
                        data.background_job_id
                            .clone()
                            .map(JobId::new)
                            .into_iter()
                            .collect(),
                    );
                    queue.submit(spec)?;
                }
            }
        }
        Ok(())
    }

    /// `batchExportBegin`: remember the in-flight batch render.
    pub fn batch_export_begin(&mut self, info: &BatchExportInfo) {
        self.batch_state = Some(info.clone());
    }

    /// `batchExportEnd`: reconcile a standalone batch render (no export
    /// session graph exists in this mode). The preset is recovered by
    /// matching the rendered path against each preset's batch-render
    /// template; an unmatched path is logged and skipped, never an error.
    pub fn batch_export_end(
        &mut self,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
        info: &BatchExportInfo,
    ) -> CutsyncResult<()> {
        if self.batch_state.take().is_none() {
            tracing::warn!(path = %info.resolved_path, "batch end without a matching begin");
        }
        if info.aborted {
            tracing::info!(path = %info.resolved_path, "batch render aborted, nothing to publish");
            return Ok(());
        }

        let relative = info
            .resolved_path
            .strip_prefix(info.export_path.as_str())
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(info.resolved_path.as_str());

        let Some(preset) = find_preset_for_path(relative, &env.presets, &env.templates) else {
            tracing::warn!(
                path = %info.resolved_path,
                "no preset matches this batch render, skipping publish"
            );
            return Ok(());
        };
        let template = preset.template(&env.templates, &preset.batch_render_template)?;
        let fields = template
            .get_fields(relative)
            .map_err(|e| CutsyncError::template(e.to_string()))?;
        let Some(shot_name) = fields.get("Shot") else {
            tracing::warn!(path = %relative, "batch render path carries no shot field, skipping");
            return Ok(());
        };

        let Some(record) = collab.tracking.find_one(
            "Shot",
            &[
                Filter::is("code", shot_name.as_str()),
                Filter::is_entity("project", &env.project),
            ],
            &["code"],
        )?
        else {
            tracing::warn!(shot = %shot_name, "batch render for unknown shot, skipping publish");
            return Ok(());
        };
        let context = collab.tracking.resolve_context(&record.entity, &env.project)?;

        let version_number = fields
            .get("version")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(info.version_number);
        let dependency = info.background_job_id.clone().map(JobId::new);

        let request = PublishRequest {
            context,
            name: format!("{shot_name} batch render"),
            path: info.resolved_path.clone(),
            version_number,
            comments: String::new(),
            dependency: dependency.clone(),
        };
        let publish = collab.submission.register_video_publish(&request)?;

        let mut thumbnails = ThumbnailGenerator::new(json!({
            "session": self.id,
            "project": env.project.to_value(),
        }));
        thumbnails.request(&info.resolved_path, publish, dependency);
        thumbnails.finalize(collab.queue)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trash_paths_are_unique() {
        let a = trash_path("/exports/seq/010/clip.0001.dpx");
        let b = trash_path("/exports/seq/010/clip.0001.dpx");
        assert_ne!(a, b);
        assert!(a.starts_with("flame_trash/"));
        assert!(a.ends_with("/clip.0001.dpx"));
    }

    #[test]
    fn test_frame_token_from_range() {
        assert_eq!(
            frame_token("/x/shot.[00001001-00001100].dpx").as_deref(),
            Some("00001001")
        );
    }

    #[test]
    fn test_frame_token_from_single_frame() {
        assert_eq!(frame_token("/x/shot.1001.dpx").as_deref(), Some("1001"));
    }

    #[test]
    fn test_frame_token_absent() {
        assert_eq!(frame_token("/x/shot.mov"), None);
    }
}
