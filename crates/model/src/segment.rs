//! Timeline segments: one rendered media range within a Shot.

use cutsync_common::timecode::frames_to_timecode;
use serde::{Deserialize, Serialize};

/// Raw per-segment metadata reported by the host when a video asset is
/// exported. Set exactly once per segment and immutable for the rest of
/// the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentData {
    /// Host-assigned track id. The lowest track in a shot is authoritative
    /// for cut metadata.
    pub track: i64,

    /// First source frame, including the head handle.
    pub source_in: i64,

    /// Exclusive source frame bound, one past the trailing handle
    /// boundary frame.
    pub source_out: i64,

    /// First sequence-relative record frame.
    pub record_in: i64,

    /// Exclusive sequence-relative record bound.
    pub record_out: i64,

    /// Head handle length in frames.
    pub handle_in: i64,

    /// Tail handle length in frames.
    pub handle_out: i64,

    /// Frame rate of the exported media.
    pub fps: f64,

    /// Whether timecodes for this media use drop-frame counting.
    pub drop_frame: bool,

    /// Render dimensions.
    pub width: u32,
    pub height: u32,

    /// Pixel aspect ratio.
    pub aspect_ratio: f64,

    /// Id of the host-side background render job, when the render was
    /// deferred to the farm.
    pub background_job_id: Option<String>,

    /// Resolved path of the rendered media.
    pub render_path: String,

    /// Version number the host assigned to this export.
    pub version_number: i64,
}

impl SegmentData {
    /// First frame of the cut, after trimming the head handle.
    pub fn cut_in_frame(&self) -> i64 {
        self.source_in + self.handle_in
    }

    /// Last frame of the cut. `source_out` is an exclusive bound and the
    /// frame directly before it marks the trailing handle boundary.
    pub fn cut_out_frame(&self) -> i64 {
        self.source_out - 2
    }

    /// Number of frames in the cut, inclusive of both ends.
    pub fn cut_duration(&self) -> i64 {
        self.cut_out_frame() - self.cut_in_frame() + 1
    }

    /// First frame as placed in the sequence edit.
    pub fn edit_in_frame(&self) -> i64 {
        self.record_in
    }

    /// Last frame as placed in the sequence edit.
    pub fn edit_out_frame(&self) -> i64 {
        self.record_out - 1
    }

    /// First rendered frame, handles included.
    pub fn head_in_frame(&self) -> i64 {
        self.source_in
    }

    /// Last rendered frame, handles included.
    pub fn tail_out_frame(&self) -> i64 {
        self.cut_out_frame() + self.handle_out
    }

    pub fn cut_in_timecode(&self) -> String {
        self.timecode(self.cut_in_frame())
    }

    pub fn cut_out_timecode(&self) -> String {
        self.timecode(self.cut_out_frame())
    }

    pub fn edit_in_timecode(&self) -> String {
        self.timecode(self.edit_in_frame())
    }

    pub fn edit_out_timecode(&self) -> String {
        self.timecode(self.edit_out_frame())
    }

    fn timecode(&self, frame: i64) -> String {
        frames_to_timecode(frame, self.fps, self.drop_frame)
    }
}

/// One timeline clip instance within a Shot's track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    name: String,
    data: Option<SegmentData>,
    version_id: Option<i64>,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
            version_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach the host metadata. Only the first attachment sticks; the
    /// host reports each segment's media exactly once per session, so a
    /// repeat is logged and ignored.
    pub fn set_data(&mut self, data: SegmentData) {
        if self.data.is_some() {
            tracing::warn!(segment = %self.name, "segment metadata already set, ignoring repeat");
            return;
        }
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&SegmentData> {
        self.data.as_ref()
    }

    /// Whether this segment produced render output. Only such segments
    /// participate in cut and Version reconciliation.
    pub fn has_render_export(&self) -> bool {
        self.data.is_some()
    }

    /// Id of the Version created for this segment, once reconciled.
    pub fn version_id(&self) -> Option<i64> {
        self.version_id
    }

    /// Record the Version id after batch creation. Set at most once.
    pub fn set_version_id(&mut self, id: i64) {
        if self.version_id.is_some() {
            tracing::warn!(segment = %self.name, "version id already set, ignoring repeat");
            return;
        }
        self.version_id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn data_with(source_in: i64, source_out: i64, handles: i64) -> SegmentData {
        SegmentData {
            track: 1,
            source_in,
            source_out,
            record_in: 0,
            record_out: source_out - source_in - handles - 1,
            handle_in: handles,
            handle_out: handles,
            fps: 24.0,
            drop_frame: false,
            width: 1920,
            height: 1080,
            aspect_ratio: 1.0,
            background_job_id: None,
            render_path: "renders/seg.exr".to_string(),
            version_number: 1,
        }
    }

    #[test]
    fn test_cut_frames_with_handles() {
        let d = data_with(1000, 1100, 8);
        assert_eq!(d.cut_in_frame(), 1008);
        assert_eq!(d.cut_out_frame(), 1098);
        assert_eq!(d.cut_duration(), 91);
    }

    #[test]
    fn test_cut_duration_matches_edit_duration() {
        let d = data_with(1000, 1100, 8);
        let edit_duration = d.edit_out_frame() - d.edit_in_frame() + 1;
        assert_eq!(d.cut_duration(), edit_duration);
    }

    #[test]
    fn test_head_and_tail() {
        let d = data_with(1000, 1100, 8);
        assert_eq!(d.head_in_frame(), 1000);
        assert_eq!(d.tail_out_frame(), 1106);
    }

    #[test]
    fn test_timecodes_use_segment_rate() {
        let mut d = data_with(0, 26, 0);
        d.fps = 24.0;
        assert_eq!(d.cut_in_timecode(), "00:00:00:00");
        assert_eq!(d.cut_out_timecode(), "00:00:01:00");
    }

    #[test]
    fn test_data_set_once() {
        let mut seg = Segment::new("seg_a");
        assert!(!seg.has_render_export());

        seg.set_data(data_with(10, 30, 2));
        let mut repeat = data_with(99, 120, 2);
        repeat.track = 42;
        seg.set_data(repeat);
        assert_eq!(seg.data().unwrap().source_in, 10);
    }

    #[test]
    fn test_version_id_set_once() {
        let mut seg = Segment::new("seg_a");
        seg.set_version_id(5);
        seg.set_version_id(9);
        assert_eq!(seg.version_id(), Some(5));
    }
}
