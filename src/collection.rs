//! Live object collection.
//!
//! The authoritative in-memory store of currently spawned map objects,
//! keyed by [`ObjectId`]. Wrappers despawn an object before mutating it and
//! respawn it afterwards, so every index the collection keeps stays
//! consistent under arbitrary script edit order.
//!
//! Single-threaded by design (see the runner): shared as `Rc<RefCell<..>>`,
//! never across threads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::beatmap::{ObjectId, ObjectKind, TimedObject};

/// Shared handle to the live collection, cloned into script wrappers.
pub type SharedCollection = Rc<RefCell<LiveCollection>>;

#[derive(Debug, Default)]
pub struct LiveCollection {
    next_id: u64,
    objects: HashMap<ObjectId, TimedObject>,
    /// Per-kind id lists in insertion order. Insertion order is the
    /// documented tiebreak for equal beats, so these are append-only under
    /// spawn and compacted under delete.
    by_kind: HashMap<ObjectKind, Vec<ObjectId>>,
    /// Bumped on every non-batched spawn/delete; the stand-in for the
    /// editor's per-mutation re-render.
    refresh_count: u64,
}

impl LiveCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedCollection {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Allocate an identity without inserting anything. Used for objects a
    /// script constructs despawned.
    pub fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    /// Bulk insert at document load time. Counts as a batched spawn.
    pub fn load(&mut self, object: TimedObject) -> ObjectId {
        let id = self.allocate_id();
        self.spawn(id, object, true);
        id
    }

    /// Insert an object under a known identity.
    ///
    /// Returns false (and leaves the collection untouched) if the id is
    /// already present. `in_batch` suppresses the per-mutation refresh so a
    /// group of spawns renders once.
    pub fn spawn(&mut self, id: ObjectId, object: TimedObject, in_batch: bool) -> bool {
        if self.objects.contains_key(&id) {
            return false;
        }
        self.by_kind.entry(object.kind()).or_default().push(id);
        self.objects.insert(id, object);
        if !in_batch {
            self.refresh_count += 1;
        }
        true
    }

    /// Remove an object, returning it if it was present.
    pub fn delete(&mut self, id: ObjectId, in_batch: bool) -> Option<TimedObject> {
        let object = self.objects.remove(&id)?;
        if let Some(ids) = self.by_kind.get_mut(&object.kind()) {
            ids.retain(|other| *other != id);
        }
        if !in_batch {
            self.refresh_count += 1;
        }
        Some(object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&TimedObject> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// How many non-batched mutations have happened. Exposed so tests can
    /// assert batch spawns/deletes do not redundantly refresh.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// All objects of one kind, ascending by beat. Equal beats keep their
    /// insertion order (stable sort over the insertion-ordered id list).
    pub fn sorted(&self, kind: ObjectKind) -> Vec<(ObjectId, TimedObject)> {
        let mut out: Vec<(ObjectId, TimedObject)> = self
            .by_kind
            .get(&kind)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.objects.get(id).map(|o| (*id, o.clone())))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.1.beat().total_cmp(&b.1.beat()));
        out
    }
}
