//! The export pipeline: host callback records, preset resolution, and
//! the session orchestrator that reconciles exported media against the
//! tracking database.

pub mod events;
pub mod preset;
pub mod profile;
pub mod registry;
pub mod session;

pub use events::{AssetInfo, AssetType, BatchExportInfo, CustomExportInfo, HostEvent, SequenceExportInfo};
pub use preset::{find_preset_for_path, CodecSettings, DefaultCodecSettings, ExportPreset};
pub use registry::EngineState;
pub use session::{
    Collaborators, ExportSession, ExportSettings, PublishRequest, SessionEnv, SessionState,
    SessionSummary, SubmissionService, UiService,
};
