//! In-memory tracking backend for tests and offline replay.

use std::cell::RefCell;

use cutsync_common::CutsyncResult;
use serde_json::Value;

use crate::service::TrackingService;
use crate::types::{
    BatchRequest, BatchResult, EntityRef, FieldData, Filter, FilterOp, Record, ServerCaps,
    ShotContext,
};

/// A fully functional in-memory stand-in for the remote database.
///
/// Assigns auto-incrementing ids, evaluates `is` / `in` filters against
/// stored field data, and records every call for assertion in tests. The
/// orchestrator is single-threaded, so interior mutability via `RefCell`
/// is sufficient.
#[derive(Debug)]
pub struct MemoryTracking {
    inner: RefCell<Inner>,
    caps: ServerCaps,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Record>,
    next_id: i64,
    calls: Vec<String>,
}

impl MemoryTracking {
    pub fn new(caps: ServerCaps) -> Self {
        Self {
            inner: RefCell::new(Inner {
                records: Vec::new(),
                next_id: 1,
                calls: Vec::new(),
            }),
            caps,
        }
    }

    /// A backend reporting a modern, cut-capable server.
    pub fn with_cut_support() -> Self {
        Self::new(ServerCaps::new(8, 0, 0))
    }

    /// A backend reporting a server predating the Cut schema.
    pub fn without_cut_support() -> Self {
        Self::new(ServerCaps::new(6, 3, 0))
    }

    /// Seed a record directly, returning its reference.
    pub fn seed(&self, entity_type: &str, data: FieldData) -> EntityRef {
        let mut inner = self.inner.borrow_mut();
        inner.insert(entity_type, data)
    }

    /// Every call made so far, as `method:detail` strings.
    pub fn calls(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }

    /// Number of batch round trips executed.
    pub fn batch_calls(&self) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with("batch:"))
            .count()
    }

    /// All stored records of a type, in creation order.
    pub fn all(&self, entity_type: &str) -> Vec<Record> {
        self.inner
            .borrow()
            .records
            .iter()
            .filter(|r| r.entity.entity_type == entity_type)
            .cloned()
            .collect()
    }
}

impl Inner {
    fn insert(&mut self, entity_type: &str, data: FieldData) -> EntityRef {
        let entity = EntityRef::new(entity_type, self.next_id);
        self.next_id += 1;
        self.records.push(Record {
            entity: entity.clone(),
            data,
        });
        entity
    }
}

fn matches(record: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let actual = record.data.get(&f.field).unwrap_or(&Value::Null);
        match f.op {
            FilterOp::Is => actual == &f.value,
            FilterOp::In => f
                .value
                .as_array()
                .map(|set| set.contains(actual))
                .unwrap_or(false),
        }
    })
}

fn project_fields(record: &Record, fields: &[&str]) -> Record {
    let data = record
        .data
        .iter()
        .filter(|(k, _)| fields.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Record {
        entity: record.entity.clone(),
        data,
    }
}

impl TrackingService for MemoryTracking {
    fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> CutsyncResult<Vec<Record>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(format!("find:{entity_type}"));
        Ok(inner
            .records
            .iter()
            .filter(|r| r.entity.entity_type == entity_type && matches(r, filters))
            .map(|r| project_fields(r, fields))
            .collect())
    }

    fn create(&self, entity_type: &str, data: FieldData) -> CutsyncResult<Record> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(format!("create:{entity_type}"));
        let entity = inner.insert(entity_type, data.clone());
        Ok(Record { entity, data })
    }

    fn update(&self, entity_type: &str, id: i64, data: FieldData) -> CutsyncResult<Record> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(format!("update:{entity_type}:{id}"));
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.entity.entity_type == entity_type && r.entity.id == id)
            .ok_or_else(|| {
                cutsync_common::CutsyncError::tracking(format!(
                    "{entity_type} {id} does not exist"
                ))
            })?;
        record.data.extend(data);
        Ok(record.clone())
    }

    fn batch(&self, requests: Vec<BatchRequest>) -> CutsyncResult<Vec<BatchResult>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(format!("batch:{}", requests.len()));

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            match request {
                BatchRequest::Create {
                    entity_type,
                    data,
                    correlation,
                } => {
                    let entity = inner.insert(&entity_type, data.clone());
                    results.push(BatchResult {
                        entity,
                        data,
                        correlation,
                    });
                }
                BatchRequest::Update {
                    entity_type,
                    id,
                    data,
                } => {
                    let record = inner
                        .records
                        .iter_mut()
                        .find(|r| r.entity.entity_type == entity_type && r.entity.id == id)
                        .ok_or_else(|| {
                            cutsync_common::CutsyncError::tracking(format!(
                                "{entity_type} {id} does not exist"
                            ))
                        })?;
                    record.data.extend(data);
                    results.push(BatchResult {
                        entity: record.entity.clone(),
                        data: record.data.clone(),
                        correlation: None,
                    });
                }
            }
        }
        Ok(results)
    }

    fn server_caps(&self) -> ServerCaps {
        self.caps
    }

    fn resolve_context(
        &self,
        entity: &EntityRef,
        project: &EntityRef,
    ) -> CutsyncResult<ShotContext> {
        let mut inner = self.inner.borrow_mut();
        inner
            .calls
            .push(format!("context:{}:{}", entity.entity_type, entity.id));
        Ok(ShotContext {
            project: project.clone(),
            entity: entity.clone(),
            task: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> FieldData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_find_with_is_filter() {
        let db = MemoryTracking::with_cut_support();
        db.seed("Shot", data(&[("code", json!("010"))]));
        db.seed("Shot", data(&[("code", json!("020"))]));

        let found = db
            .find("Shot", &[Filter::is("code", "010")], &["code"])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("code"), Some("010"));
    }

    #[test]
    fn test_find_with_in_filter() {
        let db = MemoryTracking::with_cut_support();
        db.seed("Shot", data(&[("code", json!("010"))]));
        db.seed("Shot", data(&[("code", json!("020"))]));
        db.seed("Shot", data(&[("code", json!("030"))]));

        let found = db
            .find(
                "Shot",
                &[Filter::any_of("code", vec![json!("010"), json!("030")])],
                &["code"],
            )
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_batch_echoes_correlation_in_order() {
        let db = MemoryTracking::with_cut_support();
        let results = db
            .batch(vec![
                BatchRequest::Create {
                    entity_type: "Version".to_string(),
                    data: FieldData::new(),
                    correlation: Some("a".to_string()),
                },
                BatchRequest::Create {
                    entity_type: "Version".to_string(),
                    data: FieldData::new(),
                    correlation: Some("b".to_string()),
                },
            ])
            .unwrap();
        assert_eq!(results[0].correlation.as_deref(), Some("a"));
        assert_eq!(results[1].correlation.as_deref(), Some("b"));
        assert_ne!(results[0].entity.id, results[1].entity.id);
        assert_eq!(db.batch_calls(), 1);
    }

    #[test]
    fn test_update_missing_entity_is_tracking_error() {
        let db = MemoryTracking::with_cut_support();
        let err = db.update("Shot", 999, FieldData::new()).unwrap_err();
        assert!(err.to_string().contains("999"));
    }
}
