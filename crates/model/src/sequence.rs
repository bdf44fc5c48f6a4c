//! Export sequences: the root of the Sequence → Shot → Segment graph.
//!
//! A sequence is created when the host announces a sequence export, is
//! synced to the tracking database once per session, and has its cut
//! computed once all assets have arrived.

use cutsync_common::{CutsyncError, CutsyncResult};
use cutsync_tracking::{
    BatchRequest, EntityRef, FieldData, Filter, TrackingService,
};
use serde_json::{json, Value};

use crate::shot::Shot;

/// Summary of a created Cut record.
#[derive(Debug, Clone)]
pub struct CutSummary {
    pub cut: EntityRef,
    pub revision_number: i64,
    pub item_count: usize,
}

/// One sequence being exported.
#[derive(Debug, Clone)]
pub struct Sequence {
    name: String,

    /// Remote id, assigned on first sync.
    pub shotgun_id: Option<i64>,

    shots: Vec<Shot>,
}

impl Sequence {
    /// Create a sequence. Names containing whitespace are rejected; the
    /// host allows them but downstream paths and remote records do not.
    pub fn new(name: impl Into<String>) -> CutsyncResult<Self> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CutsyncError::validation(format!(
                "sequence name '{name}' must be non-empty and contain no whitespace"
            )));
        }
        Ok(Self {
            name,
            shotgun_id: None,
            shots: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get or create a shot by name. Name collisions merge into the same
    /// Shot.
    pub fn add_shot(&mut self, name: &str) -> &mut Shot {
        if let Some(idx) = self.shots.iter().position(|s| s.name() == name) {
            return &mut self.shots[idx];
        }
        self.shots.push(Shot::new(name));
        self.shots.last_mut().unwrap()
    }

    pub fn shot(&self, name: &str) -> Option<&Shot> {
        self.shots.iter().find(|s| s.name() == name)
    }

    pub fn shot_mut(&mut self, name: &str) -> Option<&mut Shot> {
        self.shots.iter_mut().find(|s| s.name() == name)
    }

    /// Shots in insertion order.
    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn shots_mut(&mut self) -> &mut [Shot] {
        &mut self.shots
    }

    /// Link value for this sequence's remote record.
    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.shotgun_id.map(|id| EntityRef::new("Sequence", id))
    }

    /// Ensure the sequence and all its shots exist remotely, and cache
    /// their ids, remote cut fields, and contexts.
    ///
    /// Idempotent with respect to already-synced shots: a Shot found
    /// remotely is never recreated. Remote failures propagate unretried.
    pub fn process_shotgun_shot_structure(
        &mut self,
        tracking: &dyn TrackingService,
        project: &EntityRef,
        task_template: Option<&str>,
    ) -> CutsyncResult<()> {
        // Find or create the sequence container.
        let sequence_entity = match tracking.find_one(
            "Sequence",
            &[
                Filter::is("code", self.name.as_str()),
                Filter::is_entity("project", project),
            ],
            &["code"],
        )? {
            Some(record) => record.entity,
            None => {
                tracing::info!(sequence = %self.name, "creating sequence in tracking database");
                let mut data = FieldData::new();
                data.insert("code".to_string(), json!(self.name));
                data.insert("project".to_string(), project.to_value());
                tracking.create("Sequence", data)?.entity
            }
        };
        self.shotgun_id = Some(sequence_entity.id);

        // Bulk-query existing shots by name within this sequence.
        let names: Vec<Value> = self.shots.iter().map(|s| json!(s.name())).collect();
        let existing = tracking.find(
            "Shot",
            &[
                Filter::any_of("code", names),
                Filter::is_entity("sg_sequence", &sequence_entity),
            ],
            &["code", "sg_cut_in", "sg_cut_out", "sg_cut_order"],
        )?;

        for record in &existing {
            let Some(code) = record.get_str("code").map(str::to_owned) else {
                continue;
            };
            if let Some(shot) = self.shot_mut(&code) {
                shot.shotgun_id = Some(record.entity.id);
                shot.remote_cut.cut_in = record.get_i64("sg_cut_in");
                shot.remote_cut.cut_out = record.get_i64("sg_cut_out");
                shot.remote_cut.cut_order = record.get_i64("sg_cut_order");
            }
        }

        // Batch-create the rest in a single call.
        let task_template_link = match task_template {
            Some(name) => tracking
                .find_one("TaskTemplate", &[Filter::is("code", name)], &["code"])?
                .map(|r| r.entity.to_value()),
            None => None,
        };

        let mut creates = Vec::new();
        for shot in self.shots.iter().filter(|s| s.shotgun_id.is_none()) {
            let mut data = FieldData::new();
            data.insert("code".to_string(), json!(shot.name()));
            data.insert("project".to_string(), project.to_value());
            data.insert("sg_sequence".to_string(), sequence_entity.to_value());
            if let Some(link) = &task_template_link {
                data.insert("task_template".to_string(), link.clone());
            }
            creates.push(BatchRequest::Create {
                entity_type: "Shot".to_string(),
                data,
                correlation: Some(shot.name().to_string()),
            });
        }

        if !creates.is_empty() {
            tracing::info!(
                sequence = %self.name,
                count = creates.len(),
                "creating shots in tracking database"
            );
            for result in tracking.batch(creates)? {
                let Some(name) = result.correlation else {
                    continue;
                };
                if let Some(shot) = self.shot_mut(&name) {
                    shot.shotgun_id = Some(result.entity.id);
                    shot.new_in_shotgun = true;
                }
            }
        }

        // Cache the working context for every shot.
        for shot in &mut self.shots {
            let Some(id) = shot.shotgun_id else { continue };
            let entity = EntityRef::new("Shot", id);
            shot.context = Some(tracking.resolve_context(&entity, project)?);
        }

        Ok(())
    }

    /// Assign 1-based cut orders: edit-in frame ascending, ties broken by
    /// insertion order. Shots without a base segment get no order.
    pub fn compute_cut_order(&mut self) {
        let mut ordered: Vec<(usize, i64)> = self
            .shots
            .iter()
            .enumerate()
            .filter_map(|(idx, shot)| shot.base_data().map(|d| (idx, d.edit_in_frame())))
            .collect();
        ordered.sort_by_key(|&(idx, edit_in)| (edit_in, idx));

        for shot in &mut self.shots {
            shot.cut_order = None;
        }
        for (order, (idx, _)) in ordered.into_iter().enumerate() {
            self.shots[idx].cut_order = Some(order as i64 + 1);
        }
    }

    /// Compare each shot's freshly computed cut values against the cached
    /// remote fields and return update requests for the ones that moved.
    /// Nothing is sent from here; the session batches the result with its
    /// Version creates.
    pub fn compute_shot_cut_changes(&mut self) -> Vec<BatchRequest> {
        self.compute_cut_order();

        let mut updates = Vec::new();
        for shot in &self.shots {
            let Some(data) = shot.base_data() else { continue };
            let Some(shot_id) = shot.shotgun_id else { continue };

            let cut_in = data.cut_in_frame();
            let cut_out = data.cut_out_frame();
            let unchanged = shot.remote_cut.cut_in == Some(cut_in)
                && shot.remote_cut.cut_out == Some(cut_out)
                && shot.remote_cut.cut_order == shot.cut_order;
            if unchanged {
                continue;
            }

            let mut fields = FieldData::new();
            fields.insert("sg_cut_in".to_string(), json!(cut_in));
            fields.insert("sg_cut_out".to_string(), json!(cut_out));
            fields.insert("sg_cut_duration".to_string(), json!(data.cut_duration()));
            fields.insert("sg_cut_order".to_string(), json!(shot.cut_order));
            fields.insert("sg_head_in".to_string(), json!(data.head_in_frame()));
            fields.insert("sg_tail_out".to_string(), json!(data.tail_out_frame()));
            updates.push(BatchRequest::Update {
                entity_type: "Shot".to_string(),
                id: shot_id,
                data: fields,
            });
        }
        updates
    }

    /// Shots that carry a base segment, in cut order.
    fn shots_in_cut_order(&self) -> Vec<&Shot> {
        let mut shots: Vec<&Shot> = self
            .shots
            .iter()
            .filter(|s| s.cut_order.is_some() && s.base_data().is_some())
            .collect();
        shots.sort_by_key(|s| s.cut_order);
        shots
    }

    /// Create a Cut record plus one CutItem per shot, in cut order.
    ///
    /// Returns `Ok(None)` without touching the remote service when the
    /// server predates the Cut schema, or when no shot has render output.
    /// Must run after Version ids have been attached so CutItems can link
    /// their Versions.
    pub fn create_cut(
        &self,
        tracking: &dyn TrackingService,
        cut_type: &str,
    ) -> CutsyncResult<Option<CutSummary>> {
        if !tracking.server_caps().supports_cuts() {
            tracing::debug!(
                sequence = %self.name,
                "server does not support Cut entities, skipping cut creation"
            );
            return Ok(None);
        }

        let shots = self.shots_in_cut_order();
        let (Some(first), Some(last)) = (shots.first(), shots.last()) else {
            return Ok(None);
        };
        let sequence_entity = self.entity_ref().ok_or_else(|| {
            CutsyncError::tracking(format!(
                "sequence '{}' has not been synced, cannot create cut",
                self.name
            ))
        })?;

        // Revision: one above the highest existing cut for this sequence.
        let revision_number = tracking
            .find(
                "Cut",
                &[
                    Filter::is("code", self.name.as_str()),
                    Filter::is_entity("entity", &sequence_entity),
                ],
                &["revision_number"],
            )?
            .iter()
            .filter_map(|r| r.get_i64("revision_number"))
            .max()
            .map(|max| max + 1)
            .unwrap_or(1);

        let (Some(first_data), Some(last_data)) = (first.base_data(), last.base_data()) else {
            return Ok(None);
        };
        let duration: i64 = shots
            .iter()
            .filter_map(|s| s.base_data())
            .map(|d| d.cut_duration())
            .sum();

        let mut cut_fields = FieldData::new();
        cut_fields.insert("code".to_string(), json!(self.name));
        cut_fields.insert("entity".to_string(), sequence_entity.to_value());
        cut_fields.insert("revision_number".to_string(), json!(revision_number));
        cut_fields.insert("sg_cut_type".to_string(), json!(cut_type));
        cut_fields.insert("fps".to_string(), json!(first_data.fps));
        cut_fields.insert("duration".to_string(), json!(duration));
        cut_fields.insert(
            "timecode_start_text".to_string(),
            json!(first_data.edit_in_timecode()),
        );
        cut_fields.insert(
            "timecode_end_text".to_string(),
            json!(last_data.edit_out_timecode()),
        );

        let cut = tracking.create("Cut", cut_fields)?.entity;
        tracing::info!(
            sequence = %self.name,
            cut_id = cut.id,
            revision = revision_number,
            "created cut"
        );

        let mut items = Vec::with_capacity(shots.len());
        for shot in &shots {
            let Some(data) = shot.base_data() else { continue };
            let mut fields = FieldData::new();
            fields.insert("code".to_string(), json!(shot.name()));
            fields.insert("cut".to_string(), cut.to_value());
            fields.insert("cut_order".to_string(), json!(shot.cut_order));
            fields.insert("cut_item_in".to_string(), json!(data.cut_in_frame()));
            fields.insert("cut_item_out".to_string(), json!(data.cut_out_frame()));
            fields.insert("edit_in".to_string(), json!(data.edit_in_frame()));
            fields.insert("edit_out".to_string(), json!(data.edit_out_frame()));
            fields.insert(
                "timecode_cut_item_in_text".to_string(),
                json!(data.cut_in_timecode()),
            );
            fields.insert(
                "timecode_cut_item_out_text".to_string(),
                json!(data.cut_out_timecode()),
            );
            fields.insert(
                "timecode_edit_in_text".to_string(),
                json!(data.edit_in_timecode()),
            );
            fields.insert(
                "timecode_edit_out_text".to_string(),
                json!(data.edit_out_timecode()),
            );
            if let Some(shot_id) = shot.shotgun_id {
                fields.insert(
                    "shot".to_string(),
                    EntityRef::new("Shot", shot_id).to_value(),
                );
            }
            if let Some(version_id) = shot.base_segment().and_then(|s| s.version_id()) {
                fields.insert(
                    "version".to_string(),
                    EntityRef::new("Version", version_id).to_value(),
                );
            }
            items.push(BatchRequest::Create {
                entity_type: "CutItem".to_string(),
                data: fields,
                correlation: None,
            });
        }

        let item_count = items.len();
        tracking.batch(items)?;

        Ok(Some(CutSummary {
            cut,
            revision_number,
            item_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentData;
    use cutsync_tracking::MemoryTracking;

    fn seg_data(track: i64, source_in: i64, record_in: i64) -> SegmentData {
        SegmentData {
            track,
            source_in,
            source_out: source_in + 100,
            record_in,
            record_out: record_in + 91,
            handle_in: 8,
            handle_out: 8,
            fps: 24.0,
            drop_frame: false,
            width: 1920,
            height: 1080,
            aspect_ratio: 1.0,
            background_job_id: None,
            render_path: format!("renders/{track}_{source_in}.exr"),
            version_number: 1,
        }
    }

    fn project() -> EntityRef {
        EntityRef::new("Project", 1)
    }

    #[test]
    fn test_sequence_name_validation() {
        assert!(Sequence::new("seq_010").is_ok());
        assert!(Sequence::new("seq 010").is_err());
        assert!(Sequence::new("").is_err());
    }

    #[test]
    fn test_add_shot_merges_by_name() {
        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("010");
        seq.add_shot("010");
        seq.add_shot("020");
        assert_eq!(seq.shots().len(), 2);
    }

    #[test]
    fn test_shot_structure_creates_missing_and_finds_existing() {
        let db = MemoryTracking::with_cut_support();
        let project = project();

        let seq_entity = db.seed("Sequence", {
            let mut d = FieldData::new();
            d.insert("code".to_string(), json!("aaa"));
            d.insert("project".to_string(), project.to_value());
            d
        });
        let existing_shot = db.seed("Shot", {
            let mut d = FieldData::new();
            d.insert("code".to_string(), json!("010"));
            d.insert("sg_sequence".to_string(), seq_entity.to_value());
            d.insert("sg_cut_in".to_string(), json!(1008));
            d
        });

        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("010");
        seq.add_shot("020");
        seq.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();

        let existing = seq.shot("010").unwrap();
        assert_eq!(existing.shotgun_id, Some(existing_shot.id));
        assert!(!existing.new_in_shotgun);
        assert_eq!(existing.remote_cut.cut_in, Some(1008));

        let created = seq.shot("020").unwrap();
        assert!(created.shotgun_id.is_some());
        assert!(created.new_in_shotgun);
        assert!(created.context.is_some());

        // Only the missing shot was created.
        assert_eq!(db.all("Shot").len(), 2);
    }

    #[test]
    fn test_shot_structure_is_idempotent() {
        let db = MemoryTracking::with_cut_support();
        let project = project();

        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("010");
        seq.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();
        let first_id = seq.shot("010").unwrap().shotgun_id;

        let mut seq2 = Sequence::new("aaa").unwrap();
        seq2.add_shot("010");
        seq2.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();

        assert_eq!(seq2.shot("010").unwrap().shotgun_id, first_id);
        assert_eq!(db.all("Sequence").len(), 1);
        assert_eq!(db.all("Shot").len(), 1);
    }

    #[test]
    fn test_cut_order_sorted_by_edit_in_with_stable_ties() {
        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("late").add_segment("s").set_data(seg_data(1, 1000, 500));
        seq.add_shot("early").add_segment("s").set_data(seg_data(1, 2000, 100));
        seq.add_shot("tied").add_segment("s").set_data(seg_data(1, 3000, 500));
        seq.add_shot("empty");

        seq.compute_cut_order();

        assert_eq!(seq.shot("early").unwrap().cut_order, Some(1));
        assert_eq!(seq.shot("late").unwrap().cut_order, Some(2));
        assert_eq!(seq.shot("tied").unwrap().cut_order, Some(3));
        assert_eq!(seq.shot("empty").unwrap().cut_order, None);
    }

    #[test]
    fn test_cut_changes_skip_unchanged_shots() {
        let mut seq = Sequence::new("aaa").unwrap();
        let shot = seq.add_shot("010");
        shot.shotgun_id = Some(7);
        shot.add_segment("s").set_data(seg_data(1, 1000, 0));
        // Mirror exactly what the fresh computation will produce.
        shot.remote_cut.cut_in = Some(1008);
        shot.remote_cut.cut_out = Some(1098);
        shot.remote_cut.cut_order = Some(1);

        assert!(seq.compute_shot_cut_changes().is_empty());
    }

    #[test]
    fn test_cut_changes_emit_update_on_drift() {
        let mut seq = Sequence::new("aaa").unwrap();
        let shot = seq.add_shot("010");
        shot.shotgun_id = Some(7);
        shot.add_segment("s").set_data(seg_data(1, 1000, 0));
        shot.remote_cut.cut_in = Some(900);
        shot.remote_cut.cut_out = Some(1098);
        shot.remote_cut.cut_order = Some(1);

        let changes = seq.compute_shot_cut_changes();
        assert_eq!(changes.len(), 1);
        let BatchRequest::Update { entity_type, id, data } = &changes[0] else {
            panic!("expected update request");
        };
        assert_eq!(entity_type, "Shot");
        assert_eq!(*id, 7);
        assert_eq!(data["sg_cut_in"], json!(1008));
        assert_eq!(data["sg_cut_out"], json!(1098));
        assert_eq!(data["sg_head_in"], json!(1000));
        assert_eq!(data["sg_tail_out"], json!(1106));
    }

    #[test]
    fn test_create_cut_skipped_without_server_support() {
        let db = MemoryTracking::without_cut_support();
        let project = project();

        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("010").add_segment("s").set_data(seg_data(1, 1000, 0));
        seq.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();
        seq.compute_cut_order();
        let calls_before = db.calls().len();

        let summary = seq.create_cut(&db, "Conform").unwrap();
        assert!(summary.is_none());
        // No remote traffic at all for the gated call.
        assert_eq!(db.calls().len(), calls_before);
    }

    #[test]
    fn test_create_cut_revision_increments() {
        let db = MemoryTracking::with_cut_support();
        let project = project();

        let mut seq = Sequence::new("aaa").unwrap();
        seq.add_shot("010").add_segment("s").set_data(seg_data(1, 1000, 0));
        seq.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();
        seq.compute_cut_order();

        let first = seq.create_cut(&db, "Conform").unwrap().unwrap();
        assert_eq!(first.revision_number, 1);
        assert_eq!(first.item_count, 1);

        let second = seq.create_cut(&db, "Conform").unwrap().unwrap();
        assert_eq!(second.revision_number, 2);
    }

    #[test]
    fn test_cut_items_link_versions_and_carry_frames() {
        let db = MemoryTracking::with_cut_support();
        let project = project();

        let mut seq = Sequence::new("aaa").unwrap();
        {
            let shot = seq.add_shot("010");
            shot.add_segment("s").set_data(seg_data(1, 1000, 0));
            shot.segments_mut()[0].set_version_id(55);
        }
        seq.process_shotgun_shot_structure(&db, &project, None)
            .unwrap();
        seq.compute_cut_order();
        seq.create_cut(&db, "Conform").unwrap().unwrap();

        let items = db.all("CutItem");
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.data["cut_item_in"], json!(1008));
        assert_eq!(item.data["cut_item_out"], json!(1098));
        assert_eq!(item.data["version"]["id"], json!(55));
        assert_eq!(item.data["timecode_cut_item_in_text"], json!("00:00:42:00"));
    }
}
