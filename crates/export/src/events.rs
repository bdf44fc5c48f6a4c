//! Host callback records.
//!
//! The host drives the export through synchronous callbacks, each
//! carrying a mutable info record the handler may write into to steer
//! host behavior (abort flags, rewritten paths). These records are also
//! serializable so a captured callback stream can be replayed offline.

use serde::{Deserialize, Serialize};

/// Asset categories the host reports during export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
    /// Frame-sequence render of a segment.
    Video,
    /// Container movie render of a segment.
    Movie,
    /// Batch setup file for a shot.
    Batch,
    /// Open clip referencing a shot's batch renders.
    BatchOpenClip,
    /// Open clip referencing a segment's renders.
    OpenClip,
    /// Audio export (not tracked).
    Audio,
}

impl AssetType {
    /// Whether this asset carries rendered segment media.
    pub fn is_segment_media(self) -> bool {
        matches!(self, AssetType::Video | AssetType::Movie)
    }
}

/// Info record for `preCustomExport`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomExportInfo {
    /// Host to run the export on, written back by the handler.
    pub destination_host: Option<String>,

    /// Root path for all exported files, written back by the handler.
    pub destination_path: Option<String>,

    /// Path to the generated export profile, written back by the handler.
    pub preset_path: Option<String>,

    /// Set to abort the whole custom export.
    pub abort: bool,
    pub abort_message: Option<String>,
}

/// Info record for `preExportSequence`. The abort flag is scoped to this
/// sequence only; sibling sequences continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceExportInfo {
    pub sequence_name: String,

    /// Names of the shots the host detected in this sequence.
    pub shot_names: Vec<String>,

    pub abort: bool,
    pub abort_message: Option<String>,
}

impl SequenceExportInfo {
    pub fn new(sequence_name: impl Into<String>, shot_names: Vec<String>) -> Self {
        Self {
            sequence_name: sequence_name.into(),
            shot_names,
            abort: false,
            abort_message: None,
        }
    }
}

/// Info record for `preExportAsset` / `postExportAsset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_type: AssetType,

    /// Segment name for media assets.
    pub asset_name: String,

    /// Shot this asset belongs to. May be empty when the user never
    /// named the shot; the host offers no abort hook at this point.
    pub shot_name: String,

    pub sequence_name: String,

    /// Host-assigned track id.
    pub track: i64,

    pub source_in: i64,
    pub source_out: i64,
    pub record_in: i64,
    pub record_out: i64,

    /// Handle lengths; absent when the preset default applies.
    pub handle_in: Option<i64>,
    pub handle_out: Option<i64>,

    pub fps: f64,
    pub drop_frame: bool,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,

    pub version_number: i64,

    /// Path the host resolved for this asset. `preExportAsset` rewrites
    /// it root-relative; `postExportAsset` reports the final location.
    pub resolved_path: String,

    /// Whether the render was deferred to a background job.
    pub is_background: bool,
    pub background_job_id: Option<String>,
}

/// Info record for `batchExportBegin` / `batchExportEnd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExportInfo {
    /// Path of the batch setup being rendered.
    pub setup_resolved_path: String,

    /// Path of the rendered output.
    pub resolved_path: String,

    /// Export destination root.
    pub export_path: String,

    pub version_number: i64,
    pub fps: f64,
    pub drop_frame: bool,

    /// Set on `batchExportEnd` when the render was cancelled or failed.
    #[serde(default)]
    pub aborted: bool,

    #[serde(default)]
    pub background_job_id: Option<String>,
}

/// One recorded host callback, for offline replay of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "camelCase")]
pub enum HostEvent {
    PreCustomExport(CustomExportInfo),
    PreExportSequence(SequenceExportInfo),
    PreExportAsset(AssetInfo),
    PostExportAsset(AssetInfo),
    PostCustomExport,
    BatchExportBegin(BatchExportInfo),
    BatchExportEnd(BatchExportInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_serialization_uses_host_names() {
        assert_eq!(
            serde_json::to_value(AssetType::BatchOpenClip).unwrap(),
            serde_json::json!("batchOpenClip")
        );
        assert_eq!(
            serde_json::to_value(AssetType::Video).unwrap(),
            serde_json::json!("video")
        );
    }

    #[test]
    fn test_segment_media_predicate() {
        assert!(AssetType::Video.is_segment_media());
        assert!(AssetType::Movie.is_segment_media());
        assert!(!AssetType::Batch.is_segment_media());
        assert!(!AssetType::Audio.is_segment_media());
    }

    #[test]
    fn test_host_event_round_trip() {
        let event = HostEvent::PreExportSequence(SequenceExportInfo::new(
            "aaa",
            vec!["010".to_string(), "020".to_string()],
        ));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("preExportSequence"));
        let parsed: HostEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, HostEvent::PreExportSequence(_)));
    }
}
