//! [`ReplicatedStore`] backed by a Loro document.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "elements": LoroMap<ElementId, String> (one JSON record per element)
//! └── "z_order": LoroList<String> (element ids, bottom to top)
//! ```
//!
//! Each element is one opaque map value, so concurrent writes to the same id
//! resolve to one writer's whole record. Concurrent inserts may leave an id
//! in the list twice; readers keep its first occurrence. Ids in the map but
//! missing from the list are drawn on top in id order.

use super::ReplicatedStore;
use crate::error::EngineResult;
use crate::shapes::{Element, ElementId};
use loro::{ExportMode, LoroDoc, LoroList, LoroMap, LoroValue, ValueOrContainer, VersionVector};
use std::collections::HashSet;

/// Key for the elements map in the document.
pub const ELEMENTS_KEY: &str = "elements";
/// Key for the z-order list in the document.
pub const Z_ORDER_KEY: &str = "z_order";

pub struct LoroStore {
    doc: LoroDoc,
    /// Version already handed out by `take_outbound` (or received from peers).
    exported: VersionVector,
}

impl LoroStore {
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let exported = doc.oplog_vv();
        Self { doc, exported }
    }

    /// Create with a fixed peer id. Mostly useful for deterministic tests.
    pub fn with_peer_id(peer_id: u64) -> EngineResult<Self> {
        let store = Self::new();
        store.doc.set_peer_id(peer_id)?;
        Ok(store)
    }

    /// Restore from a full-state export.
    pub fn from_snapshot(bytes: &[u8]) -> EngineResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        let exported = doc.oplog_vv();
        Ok(Self { doc, exported })
    }

    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn elements_map(&self) -> LoroMap {
        self.doc.get_map(ELEMENTS_KEY)
    }

    fn z_order_list(&self) -> LoroList {
        self.doc.get_list(Z_ORDER_KEY)
    }

    /// Raw z-order list, duplicates included.
    fn z_order(&self) -> Vec<String> {
        let list = self.z_order_list();
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(id))) = list.get(i) {
                result.push(id.to_string());
            }
        }
        result
    }

    /// Delete every occurrence of `id` from the z-order list.
    fn unlist(&self, id: &str) -> EngineResult<()> {
        let list = self.z_order_list();
        for i in (0..list.len()).rev() {
            if let Some(ValueOrContainer::Value(LoroValue::String(s))) = list.get(i) {
                if s.as_ref() == id {
                    list.delete(i, 1)?;
                }
            }
        }
        Ok(())
    }

    /// Map keys in draw order.
    fn ordered_keys(&self, records: &LoroValue) -> Vec<String> {
        let LoroValue::Map(records) = records else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut ordered: Vec<String> = self
            .z_order()
            .into_iter()
            .filter(|id| records.contains_key(id.as_str()) && seen.insert(id.clone()))
            .collect();
        let mut unlisted: Vec<String> = records.keys().filter(|id| !seen.contains(*id)).cloned().collect();
        unlisted.sort();
        ordered.extend(unlisted);
        ordered
    }
}

impl Default for LoroStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one map record. Records that do not parse, carry another id, or
/// fail validation are dropped whole.
fn decode_record(key: &str, value: Option<&LoroValue>) -> Option<Element> {
    let Some(LoroValue::String(json)) = value else {
        log::warn!("Dropping replicated entry {key}: not a string record");
        return None;
    };
    let json: &str = json.as_ref();
    let element: Element = match serde_json::from_str(json) {
        Ok(element) => element,
        Err(err) => {
            log::warn!("Dropping replicated entry {key}: {err}");
            return None;
        }
    };
    if element.id().to_string() != key {
        log::warn!("Dropping replicated entry {key}: record carries id {}", element.id());
        return None;
    }
    if let Err(reason) = element.validate() {
        log::warn!("Dropping replicated entry {key}: {reason}");
        return None;
    }
    Some(element)
}

impl ReplicatedStore for LoroStore {
    fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }

    fn set(&mut self, element: &Element) -> EngineResult<()> {
        let id = element.id().to_string();
        let json = serde_json::to_string(element)?;
        self.elements_map().insert(&id, json)?;
        if !self.z_order().contains(&id) {
            self.z_order_list().push(LoroValue::String(id.into()))?;
        }
        self.doc.commit();
        Ok(())
    }

    fn delete(&mut self, ids: &[ElementId]) -> EngineResult<()> {
        let map = self.elements_map();
        for id in ids {
            let id = id.to_string();
            map.delete(&id)?;
            self.unlist(&id)?;
        }
        self.doc.commit();
        Ok(())
    }

    fn clear_all(&mut self) -> EngineResult<()> {
        let map = self.elements_map();
        if let LoroValue::Map(records) = map.get_deep_value() {
            for id in records.keys() {
                map.delete(id)?;
            }
        }
        let list = self.z_order_list();
        if !list.is_empty() {
            list.delete(0, list.len())?;
        }
        self.doc.commit();
        Ok(())
    }

    fn set_order(&mut self, ids: &[ElementId]) -> EngineResult<()> {
        let list = self.z_order_list();
        if !list.is_empty() {
            list.delete(0, list.len())?;
        }
        for id in ids {
            list.push(LoroValue::String(id.to_string().into()))?;
        }
        self.doc.commit();
        Ok(())
    }

    fn elements(&self) -> Vec<Element> {
        let records = self.elements_map().get_deep_value();
        let keys = self.ordered_keys(&records);
        let LoroValue::Map(records) = records else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| decode_record(key, records.get(key.as_str())))
            .collect()
    }

    fn ids(&self) -> Vec<ElementId> {
        let records = self.elements_map().get_deep_value();
        self.ordered_keys(&records)
            .iter()
            .filter_map(|key| key.parse().ok())
            .collect()
    }

    fn len(&self) -> usize {
        self.elements_map().len()
    }

    fn take_outbound(&mut self) -> Option<Vec<u8>> {
        let version = self.doc.oplog_vv();
        if version == self.exported {
            return None;
        }
        let bytes = self.doc.export(ExportMode::updates(&self.exported)).unwrap_or_default();
        self.exported = version;
        if bytes.is_empty() { None } else { Some(bytes) }
    }

    fn apply_remote(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let caught_up = self.doc.oplog_vv() == self.exported;
        self.doc.import(bytes)?;
        // Remote ops need not be echoed back, unless local ones are still pending.
        if caught_up {
            self.exported = self.doc.oplog_vv();
        }
        Ok(())
    }

    fn export_state(&self) -> Vec<u8> {
        self.doc.export(ExportMode::Snapshot).unwrap_or_default()
    }
}
