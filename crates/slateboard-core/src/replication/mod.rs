//! Replication of the element store between participants.
//!
//! Local commits are translated into operations on a [`ReplicatedStore`]
//! (a conflict-free id → element map) and queued as transport messages.
//! Inbound messages are merged into the replica, and the engine rebuilds
//! its store from the merged state without touching history.

mod awareness;
mod loro_store;
mod protocol;

pub use awareness::{Awareness, RemoteCursor};
pub use loro_store::{ELEMENTS_KEY, LoroStore, Z_ORDER_KEY};
pub use protocol::{WireMessage, decode_payload, encode_payload};

use crate::error::{EngineError, EngineResult};
use crate::shapes::{Element, ElementId, SerializableColor};
use crate::store::Snapshot;
use kurbo::Point;
use std::collections::HashSet;

/// Shared id → element map with last-writer-wins merge per key.
///
/// Mutations apply locally at once; `take_outbound` yields the encoded
/// changes made since the last call, for the transport.
pub trait ReplicatedStore {
    /// Identity of this replica among its peers.
    fn peer_id(&self) -> u64;

    fn set(&mut self, element: &Element) -> EngineResult<()>;

    /// Delete several elements in one transaction.
    fn delete(&mut self, ids: &[ElementId]) -> EngineResult<()>;

    /// Delete every element in one transaction.
    fn clear_all(&mut self) -> EngineResult<()>;

    /// Replace the stored z-order.
    fn set_order(&mut self, ids: &[ElementId]) -> EngineResult<()>;

    /// Current elements bottom to top. Malformed entries are skipped.
    fn elements(&self) -> Vec<Element>;

    fn ids(&self) -> Vec<ElementId> {
        self.elements().iter().map(Element::id).collect()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded local changes not yet handed out.
    fn take_outbound(&mut self) -> Option<Vec<u8>>;

    /// Merge an encoded update from a peer.
    fn apply_remote(&mut self, bytes: &[u8]) -> EngineResult<()>;

    /// Full encoded state, for resync.
    fn export_state(&self) -> Vec<u8>;
}

/// What an inbound message changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Document,
    Cursors,
    Nothing,
}

/// One participant's connection to the shared document.
pub struct Collaboration {
    replica: Box<dyn ReplicatedStore>,
    awareness: Awareness,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl Collaboration {
    pub fn new(replica: Box<dyn ReplicatedStore>, color: SerializableColor, cursor_throttle_ms: u64) -> Self {
        Self {
            replica,
            awareness: Awareness::new(color, cursor_throttle_ms),
            outgoing: Vec::new(),
        }
    }

    pub fn peer_id(&self) -> u64 {
        self.replica.peer_id()
    }

    pub fn replica(&self) -> &dyn ReplicatedStore {
        self.replica.as_ref()
    }

    /// Merged document, as the engine should show it.
    pub fn replica_elements(&self) -> Vec<Element> {
        self.replica.elements()
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn remote_cursors(&self) -> Vec<RemoteCursor> {
        self.awareness.cursors()
    }

    fn queue(&mut self, msg: WireMessage) {
        match msg.to_json() {
            Ok(json) => self.outgoing.push(json),
            Err(err) => log::error!("Failed to encode {} message: {err}", msg.kind()),
        }
    }

    /// Queue whatever the replica produced since the last message.
    fn flush(&mut self, make: impl FnOnce(String) -> WireMessage) {
        if let Some(bytes) = self.replica.take_outbound() {
            self.queue(make(encode_payload(&bytes)));
        }
    }

    /// Propagate the local change `before` → `after`. Failures are logged;
    /// local editing carries on regardless.
    pub fn publish(&mut self, before: &Snapshot, after: &Snapshot) {
        if let Err(err) = self.try_publish(before, after) {
            log::error!("Failed to replicate local change: {err}");
        }
    }

    fn try_publish(&mut self, before: &Snapshot, after: &Snapshot) -> EngineResult<()> {
        if after.is_empty() && !before.is_empty() {
            self.replica.clear_all()?;
            self.flush(|data| WireMessage::ClearAll { data });
            return Ok(());
        }

        let diff = before.diff(after);
        for element in &diff.upserted {
            self.replica.set(element)?;
            let id = element.id();
            self.flush(|data| WireMessage::Set { id, data });
        }
        if !diff.removed.is_empty() {
            self.replica.delete(&diff.removed)?;
            let ids = diff.removed.clone();
            self.flush(|data| WireMessage::Delete { ids, data });
        }

        let local: Vec<ElementId> = after.ids();
        let present: HashSet<ElementId> = local.iter().copied().collect();
        let shared: Vec<ElementId> = self.replica.ids().into_iter().filter(|id| present.contains(id)).collect();
        if shared != local {
            self.replica.set_order(&local)?;
            self.flush(|data| WireMessage::Reorder { data });
        }
        Ok(())
    }

    /// Called on (re)connection. An empty shared document is seeded with
    /// the local elements; then the full state goes out.
    pub fn connected(&mut self, local: &Snapshot) {
        if self.replica.is_empty() && !local.is_empty() {
            log::info!("Seeding shared document with {} local elements", local.len());
            if let Err(err) = self.seed(local) {
                log::error!("Failed to seed shared document: {err}");
            }
        }
        // The resync below carries everything, including the seed.
        let _ = self.replica.take_outbound();
        let data = encode_payload(&self.replica.export_state());
        self.queue(WireMessage::Resync { data });
    }

    fn seed(&mut self, local: &Snapshot) -> EngineResult<()> {
        for element in local.iter() {
            self.replica.set(element)?;
        }
        self.replica.set_order(&local.ids())
    }

    /// Merge one inbound message.
    pub fn receive(&mut self, json: &str) -> EngineResult<Inbound> {
        let msg = WireMessage::from_json(json).inspect_err(|err| log::warn!("Dropping inbound message: {err}"))?;
        match msg {
            WireMessage::Cursor { peer_id, x, y, color } => {
                if peer_id == self.peer_id() {
                    return Ok(Inbound::Nothing);
                }
                let Some(color) = SerializableColor::from_hex(&color) else {
                    log::warn!("Dropping cursor from peer {peer_id}: bad color {color:?}");
                    return Err(EngineError::MalformedRemote(format!("cursor color {color:?}")));
                };
                let position = Point::new(x, y);
                if !(x.is_finite() && y.is_finite()) {
                    log::warn!("Dropping cursor from peer {peer_id}: non-finite position");
                    return Err(EngineError::MalformedRemote("cursor position is not finite".into()));
                }
                self.awareness.upsert(RemoteCursor {
                    peer_id,
                    position,
                    color,
                });
                Ok(Inbound::Cursors)
            }
            WireMessage::CursorLeft { peer_id } => Ok(if self.awareness.remove(peer_id) {
                Inbound::Cursors
            } else {
                Inbound::Nothing
            }),
            doc_msg => {
                let data = doc_msg.payload().unwrap_or_default();
                let bytes = decode_payload(data)
                    .inspect_err(|err| log::warn!("Dropping {} message: {err}", doc_msg.kind()))?;
                self.replica
                    .apply_remote(&bytes)
                    .inspect_err(|err| log::warn!("Dropping {} message: {err}", doc_msg.kind()))?;
                log::debug!("Merged remote {} ({} bytes)", doc_msg.kind(), bytes.len());
                Ok(Inbound::Document)
            }
        }
    }

    /// Local pointer moved. Broadcasts at most once per throttle interval.
    pub fn move_cursor(&mut self, position: Point, timestamp_ms: u64) {
        if !self.awareness.should_broadcast(timestamp_ms) {
            return;
        }
        let msg = WireMessage::Cursor {
            peer_id: self.peer_id(),
            x: position.x,
            y: position.y,
            color: self.awareness.color().to_hex(),
        };
        self.queue(msg);
    }

    /// Local pointer left the canvas.
    pub fn leave(&mut self) {
        if !self.awareness.is_visible() {
            return;
        }
        self.awareness.hide();
        let peer_id = self.peer_id();
        self.queue(WireMessage::CursorLeft { peer_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Shape, ShapeKind};

    fn rect(x: f64) -> Element {
        Element::Shape(Shape::new(ShapeKind::Rectangle, Point::new(x, 0.0), Point::new(x + 10.0, 10.0)))
    }

    fn collab(peer: u64) -> Collaboration {
        let replica = LoroStore::with_peer_id(peer).unwrap();
        Collaboration::new(Box::new(replica), SerializableColor::new(255, 0, 0, 255), 50)
    }

    fn kinds(messages: &[String]) -> Vec<&'static str> {
        messages.iter().map(|m| WireMessage::from_json(m).unwrap().kind()).collect()
    }

    #[test]
    fn test_publish_set_and_delete() {
        let mut c = collab(1);
        let empty = Snapshot::empty();
        let one = empty.insert(rect(0.0));
        c.publish(&empty, &one);
        assert_eq!(kinds(&c.take_outgoing()), vec!["set"]);

        let two = one.insert(rect(20.0));
        let id = two.ids()[0];
        let after_delete = two.remove(&[id]);
        c.publish(&one, &two);
        c.publish(&two, &after_delete);
        assert_eq!(kinds(&c.take_outgoing()), vec!["set", "delete"]);
        assert_eq!(c.replica().ids(), after_delete.ids());
    }

    #[test]
    fn test_publish_clear_is_one_message() {
        let mut c = collab(1);
        let empty = Snapshot::empty();
        let full = Snapshot::from_elements([rect(0.0), rect(20.0), rect(40.0)]);
        c.publish(&empty, &full);
        c.take_outgoing();
        c.publish(&full, &empty);
        assert_eq!(kinds(&c.take_outgoing()), vec!["clear_all"]);
        assert!(c.replica().is_empty());
    }

    #[test]
    fn test_publish_reorder() {
        let mut c = collab(1);
        let empty = Snapshot::empty();
        let (a, b) = (rect(0.0), rect(20.0));
        let stacked = Snapshot::from_elements([a.clone(), b.clone()]);
        c.publish(&empty, &stacked);
        c.take_outgoing();
        let restacked = stacked.restack(&[a.id()], true);
        c.publish(&stacked, &restacked);
        assert_eq!(kinds(&c.take_outgoing()), vec!["reorder"]);
        assert_eq!(c.replica().ids(), vec![b.id(), a.id()]);
    }

    #[test]
    fn test_messages_merge_on_peer() {
        let mut c1 = collab(1);
        let mut c2 = collab(2);
        let empty = Snapshot::empty();
        let one = empty.insert(rect(0.0));
        c1.publish(&empty, &one);
        for msg in c1.take_outgoing() {
            assert_eq!(c2.receive(&msg).unwrap(), Inbound::Document);
        }
        assert_eq!(c2.replica_elements(), one.to_elements());
    }

    #[test]
    fn test_connect_seeds_empty_document() {
        let mut c1 = collab(1);
        let local = Snapshot::from_elements([rect(0.0), rect(20.0)]);
        c1.connected(&local);
        let out = c1.take_outgoing();
        assert_eq!(kinds(&out), vec!["resync"]);

        let mut c2 = collab(2);
        c2.receive(&out[0]).unwrap();
        assert_eq!(c2.replica_elements(), local.to_elements());

        // A non-empty shared document is not reseeded.
        let other = Snapshot::from_elements([rect(99.0)]);
        c2.connected(&other);
        assert_eq!(c2.replica().len(), 2);
    }

    #[test]
    fn test_cursor_throttle_and_leave() {
        let mut c = collab(1);
        c.move_cursor(Point::new(1.0, 1.0), 1000);
        c.move_cursor(Point::new(2.0, 2.0), 1010);
        c.move_cursor(Point::new(3.0, 3.0), 1060);
        c.leave();
        c.leave();
        assert_eq!(kinds(&c.take_outgoing()), vec!["cursor", "cursor", "cursor_left"]);
    }

    #[test]
    fn test_remote_cursor_lifecycle() {
        let mut c = collab(1);
        let msg = r##"{"type":"cursor","peer_id":9,"x":10.0,"y":20.0,"color":"#00ff00"}"##;
        assert_eq!(c.receive(msg).unwrap(), Inbound::Cursors);
        let cursors = c.remote_cursors();
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].position, Point::new(10.0, 20.0));
        assert_eq!(cursors[0].color, SerializableColor::new(0, 255, 0, 255));

        assert_eq!(c.receive(r#"{"type":"cursor_left","peer_id":9}"#).unwrap(), Inbound::Cursors);
        assert!(c.remote_cursors().is_empty());
    }

    #[test]
    fn test_own_cursor_ignored() {
        let mut c = collab(1);
        let msg = r##"{"type":"cursor","peer_id":1,"x":0.0,"y":0.0,"color":"#000"}"##;
        assert_eq!(c.receive(msg).unwrap(), Inbound::Nothing);
        assert!(c.remote_cursors().is_empty());
    }

    #[test]
    fn test_malformed_messages_rejected() {
        let mut c = collab(1);
        assert!(c.receive("not json").is_err());
        assert!(c.receive(r#"{"type":"resync","data":"%%%"}"#).is_err());
        assert!(c.receive(r#"{"type":"resync","data":"AAAA"}"#).is_err());
        assert!(c.receive(r##"{"type":"cursor","peer_id":9,"x":1.0,"y":2.0,"color":"#€"}"##).is_err());
        assert!(c.receive(r##"{"type":"cursor","peer_id":9,"x":1.0,"y":2.0,"color":"#1€2"}"##).is_err());
        assert!(c.replica().is_empty());
        assert!(c.remote_cursors().is_empty());
    }
}
