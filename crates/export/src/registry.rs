//! Engine-level session registry and callback dispatch.
//!
//! The host hands every callback to a single engine object. Instead of
//! ambient globals mutated from scattered call sites, all engine state
//! lives in one [`EngineState`] owned by the embedder: the id → session
//! map, the per-callback handler registrations, and nothing else. The
//! lifecycle is explicit: built at engine start, [`EngineState::clear`]
//! at engine stop.

use std::collections::HashMap;

use cutsync_common::{CutsyncError, CutsyncResult};

use crate::events::HostEvent;
use crate::session::{Collaborators, ExportSession, SessionEnv, SessionSummary};

/// All mutable engine state, owned by the embedder.
#[derive(Default)]
pub struct EngineState {
    sessions: HashMap<String, ExportSession>,

    /// Handler instance names registered per callback name, in
    /// registration order. The host invokes instances in this order.
    registered: HashMap<String, Vec<String>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all sessions and registrations. Called at engine stop.
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.registered.clear();
    }

    /// Register a handler instance for a named callback. Repeat
    /// registrations of the same instance are ignored.
    pub fn register_instance(&mut self, callback: &str, instance: &str) {
        let chain = self.registered.entry(callback.to_string()).or_default();
        if !chain.iter().any(|name| name == instance) {
            chain.push(instance.to_string());
        }
    }

    /// Instances registered for a callback, in registration order.
    pub fn handlers(&self, callback: &str) -> &[String] {
        self.registered
            .get(callback)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn session(&self, id: &str) -> Option<&ExportSession> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut ExportSession> {
        self.sessions.get_mut(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Route one host callback to the session with the given id. A
    /// `PreCustomExport` creates the session; a `PostCustomExport` ends
    /// it and yields the summary. All other events require the session to
    /// already exist.
    pub fn dispatch(
        &mut self,
        session_id: &str,
        env: &SessionEnv,
        collab: &Collaborators<'_>,
        event: &mut HostEvent,
    ) -> CutsyncResult<Option<SessionSummary>> {
        if let HostEvent::PreCustomExport(info) = event {
            let session = self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| ExportSession::new(session_id));
            session.pre_custom_export(env, collab, info)?;
            return Ok(None);
        }

        let session = self.sessions.get_mut(session_id).ok_or_else(|| {
            CutsyncError::export(format!("no export session with id '{session_id}'"))
        })?;

        match event {
            HostEvent::PreCustomExport(_) => unreachable!("handled above"),
            HostEvent::PreExportSequence(info) => {
                session.pre_export_sequence(env, collab, info)?;
                Ok(None)
            }
            HostEvent::PreExportAsset(info) => {
                session.pre_export_asset(env, collab, info)?;
                Ok(None)
            }
            HostEvent::PostExportAsset(info) => {
                session.post_export_asset(info)?;
                Ok(None)
            }
            HostEvent::PostCustomExport => {
                let summary = session.do_submission_and_summary(env, collab)?;
                self.sessions.remove(session_id);
                Ok(Some(summary))
            }
            HostEvent::BatchExportBegin(info) => {
                session.batch_export_begin(info);
                Ok(None)
            }
            HostEvent::BatchExportEnd(info) => {
                session.batch_export_end(env, collab, info)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_instance_dedupes() {
        let mut state = EngineState::new();
        state.register_instance("preExportSequence", "export_a");
        state.register_instance("preExportSequence", "export_b");
        state.register_instance("preExportSequence", "export_a");
        assert_eq!(state.handlers("preExportSequence"), ["export_a", "export_b"]);
    }

    #[test]
    fn test_handlers_empty_for_unknown_callback() {
        let state = EngineState::new();
        assert!(state.handlers("nope").is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut state = EngineState::new();
        state.register_instance("preExportAsset", "export_a");
        state.clear();
        assert!(state.handlers("preExportAsset").is_empty());
        assert_eq!(state.session_count(), 0);
    }
}
