//! The tracking database capability interface.

use cutsync_common::CutsyncResult;

use crate::types::{
    BatchRequest, BatchResult, EntityRef, FieldData, Filter, Record, ServerCaps, ShotContext,
};

/// Narrow interface over the remote tracking database.
///
/// The export pipeline only ever talks to the remote service through this
/// trait; production code wraps the real API client, tests and the replay
/// tool use [`crate::memory::MemoryTracking`]. All calls are synchronous
/// and blocking; the host application is itself blocked on the callback
/// that triggered them.
pub trait TrackingService {
    /// Find all records of a type matching every filter.
    fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> CutsyncResult<Vec<Record>>;

    /// Find the first record matching every filter, if any.
    fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> CutsyncResult<Option<Record>> {
        Ok(self.find(entity_type, filters, fields)?.into_iter().next())
    }

    /// Create a single entity.
    fn create(&self, entity_type: &str, data: FieldData) -> CutsyncResult<Record>;

    /// Update a single entity.
    fn update(&self, entity_type: &str, id: i64, data: FieldData) -> CutsyncResult<Record>;

    /// Execute a combined batch of creates and updates in one round trip.
    ///
    /// Results are returned in request order, with create correlation ids
    /// echoed back.
    fn batch(&self, requests: Vec<BatchRequest>) -> CutsyncResult<Vec<BatchResult>>;

    /// Capability report for the connected server.
    fn server_caps(&self) -> ServerCaps;

    /// Resolve the working context for an entity within a project.
    fn resolve_context(
        &self,
        entity: &EntityRef,
        project: &EntityRef,
    ) -> CutsyncResult<ShotContext>;
}
