//! Shots: named containers for segments, mirrored to the tracking database.

use cutsync_tracking::ShotContext;
use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentData};

/// Batch setup metadata attached to a Shot when the host exports a batch
/// file. One batch file per Shot regardless of segment count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchData {
    /// Resolved path of the exported batch setup.
    pub path: String,

    /// Version number the host assigned to the setup.
    pub version_number: i64,
}

/// Cut fields cached from the remote Shot record during structure sync.
///
/// All fields are nullable: a Shot that has never been through a cut
/// update has none of them populated remotely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCutFields {
    pub cut_in: Option<i64>,
    pub cut_out: Option<i64>,
    pub cut_order: Option<i64>,
}

/// One shot in an export sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    name: String,

    /// Remote id, assigned during structure sync.
    pub shotgun_id: Option<i64>,

    /// Whether this session created the remote Shot record.
    pub new_in_shotgun: bool,

    /// Remote cut fields as they were at sync time, used to suppress
    /// no-op cut updates.
    pub remote_cut: RemoteCutFields,

    /// Resolved working context, cached once after sync.
    pub context: Option<ShotContext>,

    /// Cut order computed for this session, 1-based. None until the
    /// sequence computes orders, or when the shot has no base segment.
    pub cut_order: Option<i64>,

    segments: Vec<Segment>,
    batch_data: Option<BatchData>,
}

impl Shot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shotgun_id: None,
            new_in_shotgun: false,
            remote_cut: RemoteCutFields::default(),
            context: None,
            cut_order: None,
            segments: Vec::new(),
            batch_data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get or create the segment with the given name. Segments are keyed
    /// by name; repeats return the existing one.
    pub fn add_segment(&mut self, name: &str) -> &mut Segment {
        if let Some(idx) = self.segments.iter().position(|s| s.name() == name) {
            return &mut self.segments[idx];
        }
        self.segments.push(Segment::new(name));
        self.segments.last_mut().unwrap()
    }

    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name() == name)
    }

    /// Segments in insertion order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Segments that produced render output, in insertion order.
    pub fn render_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.has_render_export())
    }

    /// The base segment: lowest host track id among segments with render
    /// output. Ties resolve to the earliest-created segment, so repeated
    /// calls are stable. A shot with no rendered segments has no base
    /// segment (a valid state, e.g. the user declined an overwrite).
    pub fn base_segment(&self) -> Option<&Segment> {
        let mut best: Option<&Segment> = None;
        for segment in self.segments.iter().filter(|s| s.has_render_export()) {
            let track = segment.data().map(|d| d.track);
            match best.and_then(|b| b.data()).map(|d| d.track) {
                Some(best_track) if track >= Some(best_track) => {}
                _ => best = Some(segment),
            }
        }
        best
    }

    /// Cut metadata from the base segment, if any.
    pub fn base_data(&self) -> Option<&SegmentData> {
        self.base_segment().and_then(|s| s.data())
    }

    /// Attach batch setup metadata. At most one batch file per Shot; a
    /// repeat is logged and ignored.
    pub fn set_batch_data(&mut self, data: BatchData) {
        if self.batch_data.is_some() {
            tracing::warn!(shot = %self.name, "batch data already attached, ignoring repeat");
            return;
        }
        self.batch_data = Some(data);
    }

    pub fn batch_data(&self) -> Option<&BatchData> {
        self.batch_data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentData;

    fn seg_data(track: i64, source_in: i64) -> SegmentData {
        SegmentData {
            track,
            source_in,
            source_out: source_in + 100,
            record_in: 0,
            record_out: 91,
            handle_in: 8,
            handle_out: 8,
            fps: 24.0,
            drop_frame: false,
            width: 1920,
            height: 1080,
            aspect_ratio: 1.0,
            background_job_id: None,
            render_path: format!("renders/t{track}.exr"),
            version_number: 1,
        }
    }

    #[test]
    fn test_base_segment_is_lowest_track() {
        let mut shot = Shot::new("010");
        shot.add_segment("high").set_data(seg_data(3, 1000));
        shot.add_segment("low").set_data(seg_data(1, 2000));
        shot.add_segment("mid").set_data(seg_data(2, 3000));

        assert_eq!(shot.base_segment().unwrap().name(), "low");
        // Stable across repeated calls.
        assert_eq!(shot.base_segment().unwrap().name(), "low");
    }

    #[test]
    fn test_base_segment_tie_resolves_to_first_inserted() {
        let mut shot = Shot::new("010");
        shot.add_segment("first").set_data(seg_data(2, 1000));
        shot.add_segment("second").set_data(seg_data(2, 2000));

        assert_eq!(shot.base_segment().unwrap().name(), "first");
    }

    #[test]
    fn test_base_segment_none_for_empty_shot() {
        let shot = Shot::new("010");
        assert!(shot.base_segment().is_none());
    }

    #[test]
    fn test_base_segment_ignores_segments_without_data() {
        let mut shot = Shot::new("010");
        shot.add_segment("bare");
        shot.add_segment("rendered").set_data(seg_data(5, 1000));

        assert_eq!(shot.base_segment().unwrap().name(), "rendered");
    }

    #[test]
    fn test_add_segment_is_idempotent_by_name() {
        let mut shot = Shot::new("010");
        shot.add_segment("a");
        shot.add_segment("a");
        assert_eq!(shot.segments().len(), 1);
    }

    #[test]
    fn test_batch_data_at_most_once() {
        let mut shot = Shot::new("010");
        shot.set_batch_data(BatchData {
            path: "setups/010.batch".to_string(),
            version_number: 1,
        });
        shot.set_batch_data(BatchData {
            path: "setups/other.batch".to_string(),
            version_number: 2,
        });
        assert_eq!(shot.batch_data().unwrap().path, "setups/010.batch");
    }
}
