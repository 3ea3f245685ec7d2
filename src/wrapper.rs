//! Script-writable object wrappers.
//!
//! A [`Handle`] is the script-facing proxy over one map object. Reads go
//! straight to the wrapped data; every write first despawns the object from
//! the live collection so the collection's indices never see a mutated key.
//! The object stays despawned until the script (or host batch logic)
//! explicitly respawns it, trading respawn cost for correctness under any
//! mutation order.
//!
//! Handles come into being two ways:
//! - wrapping an existing live object (spawned = true), or
//! - being constructed from a plain script map via the value bridge
//!   (spawned = false, followed by a symmetric no-op delete so both paths
//!   leave the state machine in a known state).
//!
//! Invariant: the wrapped object is present in the live collection if and
//! only if `spawned` is true.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, Map};

use crate::beatmap::{
    ArcData, BombData, BpmEventData, ChainData, CustomEventData, EventData, NoteData, ObjectId,
    TimedObject, WallData,
};
use crate::collection::SharedCollection;
use crate::errors::ScriptBindingError;
use crate::script_value::{
    custom_data, custom_data_to_map, get_f32, get_i32, get_string, map_to_json, opt_f32, opt_i32,
};

/// Per-kind data behind a [`Handle`].
pub trait ObjectData: Clone + 'static {
    fn into_object(self) -> TimedObject;
    fn from_object(object: TimedObject) -> Option<Self>;
    /// Build fresh data from a script-supplied map, resolving field aliases.
    fn from_script(map: &Map) -> Result<Self, ScriptBindingError>;
}

struct HandleState<T> {
    id: ObjectId,
    data: T,
    spawned: bool,
}

/// Shared-state wrapper over one object. Clones alias the same state, which
/// matters because the script engine clones values freely.
pub struct Handle<T: ObjectData> {
    state: Rc<RefCell<HandleState<T>>>,
    collection: SharedCollection,
}

impl<T: ObjectData> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Handle")
            .field("id", &state.id)
            .field("spawned", &state.spawned)
            .finish_non_exhaustive()
    }
}

impl<T: ObjectData> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            collection: Rc::clone(&self.collection),
        }
    }
}

impl<T: ObjectData> Handle<T> {
    /// Wrap an object that is already live in the collection.
    pub fn from_live(id: ObjectId, data: T, collection: SharedCollection) -> Self {
        Self {
            state: Rc::new(RefCell::new(HandleState {
                id,
                data,
                spawned: true,
            })),
            collection,
        }
    }

    /// Construct brand-new data from a script map. The handle starts
    /// despawned; the trailing delete is a deliberate no-op establishing
    /// the same state both construction paths end in.
    pub fn from_script(map: &Map, collection: SharedCollection) -> Result<Self, ScriptBindingError> {
        let data = T::from_script(map)?;
        let id = collection.borrow_mut().allocate_id();
        let handle = Self {
            state: Rc::new(RefCell::new(HandleState {
                id,
                data,
                spawned: false,
            })),
            collection,
        };
        handle.delete();
        Ok(handle)
    }

    pub fn id(&self) -> ObjectId {
        self.state.borrow().id
    }

    pub fn spawned(&self) -> bool {
        self.state.borrow().spawned
    }

    /// Pure read of the wrapped data.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow().data)
    }

    /// Mutate the wrapped data, despawning first if needed. The object is
    /// left despawned; the caller decides when to respawn.
    pub fn write(&self, f: impl FnOnce(&mut T)) {
        let mut state = self.state.borrow_mut();
        if state.spawned {
            self.collection.borrow_mut().delete(state.id, true);
            state.spawned = false;
        }
        f(&mut state.data);
    }

    /// Insert the wrapped object into the live collection as part of a
    /// batch of spawns. Returns false if already spawned.
    pub fn spawn(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.spawned {
            return false;
        }
        self.collection
            .borrow_mut()
            .spawn(state.id, state.data.clone().into_object(), true);
        state.spawned = true;
        true
    }

    /// Remove the wrapped object from the live collection as part of a
    /// batch of deletes. Returns false if already despawned.
    pub fn delete(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.spawned {
            return false;
        }
        self.collection.borrow_mut().delete(state.id, true);
        state.spawned = false;
        true
    }
}

pub type NoteHandle = Handle<NoteData>;
pub type BombHandle = Handle<BombData>;
pub type ArcHandle = Handle<ArcData>;
pub type ChainHandle = Handle<ChainData>;
pub type WallHandle = Handle<WallData>;
pub type EventHandle = Handle<EventData>;
pub type CustomEventHandle = Handle<CustomEventData>;
pub type BpmEventHandle = Handle<BpmEventData>;

impl ObjectData for NoteData {
    fn into_object(self) -> TimedObject {
        TimedObject::Note(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Note(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(NoteData {
            beat: get_f32(map, &["b", "_time"])?,
            x: get_i32(map, &["x", "_lineIndex"])?,
            y: get_i32(map, &["y", "_lineLayer"])?,
            color: get_i32(map, &["c", "_type"])?,
            cut_direction: get_i32(map, &["d", "_cutDirection"])?,
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for BombData {
    fn into_object(self) -> TimedObject {
        TimedObject::Bomb(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Bomb(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(BombData {
            beat: get_f32(map, &["b", "_time"])?,
            x: get_i32(map, &["x", "_lineIndex"])?,
            y: get_i32(map, &["y", "_lineLayer"])?,
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for ArcData {
    fn into_object(self) -> TimedObject {
        TimedObject::Arc(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Arc(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(ArcData {
            beat: get_f32(map, &["b", "_time"])?,
            x: get_i32(map, &["x", "_lineIndex"])?,
            y: get_i32(map, &["y", "_lineLayer"])?,
            tail_beat: get_f32(map, &["tb"])?,
            tail_x: get_i32(map, &["tx"])?,
            tail_y: get_i32(map, &["ty"])?,
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for ChainData {
    fn into_object(self) -> TimedObject {
        TimedObject::Chain(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Chain(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(ChainData {
            beat: get_f32(map, &["b", "_time"])?,
            x: get_i32(map, &["x", "_lineIndex"])?,
            y: get_i32(map, &["y", "_lineLayer"])?,
            tail_beat: get_f32(map, &["tb"])?,
            tail_x: get_i32(map, &["tx"])?,
            tail_y: get_i32(map, &["ty"])?,
            slice_count: opt_i32(map, &["sc"], 3),
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for WallData {
    fn into_object(self) -> TimedObject {
        TimedObject::Wall(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Wall(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(WallData {
            beat: get_f32(map, &["b", "_time"])?,
            duration: get_f32(map, &["d", "_duration"])?,
            x: get_i32(map, &["x", "_lineIndex"])?,
            // Full-height walls in the legacy format carry no y/h fields.
            y: opt_i32(map, &["y"], 0),
            width: get_i32(map, &["w", "_width"])?,
            height: opt_i32(map, &["h"], 5),
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for EventData {
    fn into_object(self) -> TimedObject {
        TimedObject::Event(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::Event(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(EventData {
            beat: get_f32(map, &["b", "_time"])?,
            event_type: get_i32(map, &["et", "_type"])?,
            value: get_i32(map, &["i", "_value"])?,
            float_value: opt_f32(map, &["f", "_floatValue"], 1.0),
            custom_data: custom_data(map, &["customData", "_customData"]),
        })
    }
}

impl ObjectData for CustomEventData {
    fn into_object(self) -> TimedObject {
        TimedObject::CustomEvent(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::CustomEvent(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(CustomEventData {
            beat: get_f32(map, &["b", "_time"])?,
            name: get_string(map, &["t", "_type"])?,
            data: custom_data(map, &["d", "_data"]),
        })
    }
}

impl ObjectData for BpmEventData {
    fn into_object(self) -> TimedObject {
        TimedObject::BpmEvent(self)
    }

    fn from_object(object: TimedObject) -> Option<Self> {
        match object {
            TimedObject::BpmEvent(data) => Some(data),
            _ => None,
        }
    }

    fn from_script(map: &Map) -> Result<Self, ScriptBindingError> {
        Ok(BpmEventData {
            beat: get_f32(map, &["b", "_time"])?,
            bpm: get_f32(map, &["m", "_BPM"])?,
        })
    }
}

/// Wrap a sorted `(id, object)` sequence into a rhai array of live handles.
///
/// Objects whose kind does not match `T` are skipped; the collection hands
/// out pre-partitioned sequences so this never drops anything in practice.
pub fn wrap_objects<T: ObjectData>(
    objects: &[(ObjectId, TimedObject)],
    collection: &SharedCollection,
) -> rhai::Array {
    objects
        .iter()
        .filter_map(|(id, object)| {
            T::from_object(object.clone())
                .map(|data| Dynamic::from(Handle::from_live(*id, data, Rc::clone(collection))))
        })
        .collect()
}

/// Recover an object identity (and its beat, for seeking) from whichever
/// handle type a script report entry contains.
pub fn handle_identity(value: &Dynamic) -> Option<(ObjectId, f32)> {
    macro_rules! try_handle {
        ($ty:ty, $beat:expr) => {
            if let Some(handle) = value.clone().try_cast::<Handle<$ty>>() {
                let beat = handle.read($beat);
                return Some((handle.id(), beat));
            }
        };
    }
    try_handle!(NoteData, |n: &NoteData| n.beat);
    try_handle!(BombData, |b: &BombData| b.beat);
    try_handle!(ArcData, |a: &ArcData| a.beat);
    try_handle!(ChainData, |c: &ChainData| c.beat);
    try_handle!(WallData, |w: &WallData| w.beat);
    try_handle!(EventData, |e: &EventData| e.beat);
    try_handle!(CustomEventData, |c: &CustomEventData| c.beat);
    try_handle!(BpmEventData, |b: &BpmEventData| b.beat);
    None
}

fn runtime_err(err: ScriptBindingError) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// Register every handle type, its field accessors, spawn/delete methods,
/// and the map-taking constructors with a script engine.
pub fn register_object_api(engine: &mut Engine, collection: &SharedCollection) {
    register_note(engine, collection);
    register_bomb(engine, collection);
    register_arc(engine, collection);
    register_chain(engine, collection);
    register_wall(engine, collection);
    register_event(engine, collection);
    register_custom_event(engine, collection);
    register_bpm_event(engine, collection);
}

fn register_note(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<NoteHandle>("Note");

    engine.register_get_set(
        "b",
        |h: &mut NoteHandle| h.read(|n| n.beat),
        |h: &mut NoteHandle, v: f32| h.write(|n| n.beat = v),
    );
    engine.register_get_set(
        "x",
        |h: &mut NoteHandle| h.read(|n| n.x as i64),
        |h: &mut NoteHandle, v: i64| h.write(|n| n.x = v as i32),
    );
    engine.register_get_set(
        "y",
        |h: &mut NoteHandle| h.read(|n| n.y as i64),
        |h: &mut NoteHandle, v: i64| h.write(|n| n.y = v as i32),
    );
    engine.register_get_set(
        "c",
        |h: &mut NoteHandle| h.read(|n| n.color as i64),
        |h: &mut NoteHandle, v: i64| h.write(|n| n.color = v as i32),
    );
    engine.register_get_set(
        "d",
        |h: &mut NoteHandle| h.read(|n| n.cut_direction as i64),
        |h: &mut NoteHandle, v: i64| h.write(|n| n.cut_direction = v as i32),
    );
    engine.register_get_set(
        "customData",
        |h: &mut NoteHandle| h.read(|n| custom_data_to_map(&n.custom_data)),
        |h: &mut NoteHandle, v: Map| h.write(|n| n.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut NoteHandle| h.spawn());
    engine.register_fn("delete", |h: &mut NoteHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("note", move |map: Map| -> Result<NoteHandle, Box<EvalAltResult>> {
        NoteHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_bomb(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<BombHandle>("Bomb");

    engine.register_get_set(
        "b",
        |h: &mut BombHandle| h.read(|b| b.beat),
        |h: &mut BombHandle, v: f32| h.write(|b| b.beat = v),
    );
    engine.register_get_set(
        "x",
        |h: &mut BombHandle| h.read(|b| b.x as i64),
        |h: &mut BombHandle, v: i64| h.write(|b| b.x = v as i32),
    );
    engine.register_get_set(
        "y",
        |h: &mut BombHandle| h.read(|b| b.y as i64),
        |h: &mut BombHandle, v: i64| h.write(|b| b.y = v as i32),
    );
    engine.register_get_set(
        "customData",
        |h: &mut BombHandle| h.read(|b| custom_data_to_map(&b.custom_data)),
        |h: &mut BombHandle, v: Map| h.write(|b| b.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut BombHandle| h.spawn());
    engine.register_fn("delete", |h: &mut BombHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("bomb", move |map: Map| -> Result<BombHandle, Box<EvalAltResult>> {
        BombHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_arc(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<ArcHandle>("Arc");

    engine.register_get_set(
        "b",
        |h: &mut ArcHandle| h.read(|a| a.beat),
        |h: &mut ArcHandle, v: f32| h.write(|a| a.beat = v),
    );
    engine.register_get_set(
        "x",
        |h: &mut ArcHandle| h.read(|a| a.x as i64),
        |h: &mut ArcHandle, v: i64| h.write(|a| a.x = v as i32),
    );
    engine.register_get_set(
        "y",
        |h: &mut ArcHandle| h.read(|a| a.y as i64),
        |h: &mut ArcHandle, v: i64| h.write(|a| a.y = v as i32),
    );
    engine.register_get_set(
        "tb",
        |h: &mut ArcHandle| h.read(|a| a.tail_beat),
        |h: &mut ArcHandle, v: f32| h.write(|a| a.tail_beat = v),
    );
    engine.register_get_set(
        "tx",
        |h: &mut ArcHandle| h.read(|a| a.tail_x as i64),
        |h: &mut ArcHandle, v: i64| h.write(|a| a.tail_x = v as i32),
    );
    engine.register_get_set(
        "ty",
        |h: &mut ArcHandle| h.read(|a| a.tail_y as i64),
        |h: &mut ArcHandle, v: i64| h.write(|a| a.tail_y = v as i32),
    );
    engine.register_get_set(
        "customData",
        |h: &mut ArcHandle| h.read(|a| custom_data_to_map(&a.custom_data)),
        |h: &mut ArcHandle, v: Map| h.write(|a| a.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut ArcHandle| h.spawn());
    engine.register_fn("delete", |h: &mut ArcHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("arc", move |map: Map| -> Result<ArcHandle, Box<EvalAltResult>> {
        ArcHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_chain(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<ChainHandle>("Chain");

    engine.register_get_set(
        "b",
        |h: &mut ChainHandle| h.read(|c| c.beat),
        |h: &mut ChainHandle, v: f32| h.write(|c| c.beat = v),
    );
    engine.register_get_set(
        "x",
        |h: &mut ChainHandle| h.read(|c| c.x as i64),
        |h: &mut ChainHandle, v: i64| h.write(|c| c.x = v as i32),
    );
    engine.register_get_set(
        "y",
        |h: &mut ChainHandle| h.read(|c| c.y as i64),
        |h: &mut ChainHandle, v: i64| h.write(|c| c.y = v as i32),
    );
    engine.register_get_set(
        "tb",
        |h: &mut ChainHandle| h.read(|c| c.tail_beat),
        |h: &mut ChainHandle, v: f32| h.write(|c| c.tail_beat = v),
    );
    engine.register_get_set(
        "tx",
        |h: &mut ChainHandle| h.read(|c| c.tail_x as i64),
        |h: &mut ChainHandle, v: i64| h.write(|c| c.tail_x = v as i32),
    );
    engine.register_get_set(
        "ty",
        |h: &mut ChainHandle| h.read(|c| c.tail_y as i64),
        |h: &mut ChainHandle, v: i64| h.write(|c| c.tail_y = v as i32),
    );
    engine.register_get_set(
        "sc",
        |h: &mut ChainHandle| h.read(|c| c.slice_count as i64),
        |h: &mut ChainHandle, v: i64| h.write(|c| c.slice_count = v as i32),
    );
    engine.register_get_set(
        "customData",
        |h: &mut ChainHandle| h.read(|c| custom_data_to_map(&c.custom_data)),
        |h: &mut ChainHandle, v: Map| h.write(|c| c.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut ChainHandle| h.spawn());
    engine.register_fn("delete", |h: &mut ChainHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("chain", move |map: Map| -> Result<ChainHandle, Box<EvalAltResult>> {
        ChainHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_wall(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<WallHandle>("Wall");

    engine.register_get_set(
        "b",
        |h: &mut WallHandle| h.read(|w| w.beat),
        |h: &mut WallHandle, v: f32| h.write(|w| w.beat = v),
    );
    engine.register_get_set(
        "d",
        |h: &mut WallHandle| h.read(|w| w.duration),
        |h: &mut WallHandle, v: f32| h.write(|w| w.duration = v),
    );
    engine.register_get_set(
        "x",
        |h: &mut WallHandle| h.read(|w| w.x as i64),
        |h: &mut WallHandle, v: i64| h.write(|w| w.x = v as i32),
    );
    engine.register_get_set(
        "y",
        |h: &mut WallHandle| h.read(|w| w.y as i64),
        |h: &mut WallHandle, v: i64| h.write(|w| w.y = v as i32),
    );
    engine.register_get_set(
        "w",
        |h: &mut WallHandle| h.read(|w| w.width as i64),
        |h: &mut WallHandle, v: i64| h.write(|w| w.width = v as i32),
    );
    engine.register_get_set(
        "h",
        |h: &mut WallHandle| h.read(|w| w.height as i64),
        |h: &mut WallHandle, v: i64| h.write(|w| w.height = v as i32),
    );
    engine.register_get_set(
        "customData",
        |h: &mut WallHandle| h.read(|w| custom_data_to_map(&w.custom_data)),
        |h: &mut WallHandle, v: Map| h.write(|w| w.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut WallHandle| h.spawn());
    engine.register_fn("delete", |h: &mut WallHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("wall", move |map: Map| -> Result<WallHandle, Box<EvalAltResult>> {
        WallHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_event(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<EventHandle>("Event");

    engine.register_get_set(
        "b",
        |h: &mut EventHandle| h.read(|e| e.beat),
        |h: &mut EventHandle, v: f32| h.write(|e| e.beat = v),
    );
    engine.register_get_set(
        "et",
        |h: &mut EventHandle| h.read(|e| e.event_type as i64),
        |h: &mut EventHandle, v: i64| h.write(|e| e.event_type = v as i32),
    );
    engine.register_get_set(
        "i",
        |h: &mut EventHandle| h.read(|e| e.value as i64),
        |h: &mut EventHandle, v: i64| h.write(|e| e.value = v as i32),
    );
    engine.register_get_set(
        "f",
        |h: &mut EventHandle| h.read(|e| e.float_value),
        |h: &mut EventHandle, v: f32| h.write(|e| e.float_value = v),
    );
    engine.register_get_set(
        "customData",
        |h: &mut EventHandle| h.read(|e| custom_data_to_map(&e.custom_data)),
        |h: &mut EventHandle, v: Map| h.write(|e| e.custom_data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut EventHandle| h.spawn());
    engine.register_fn("delete", |h: &mut EventHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn("event", move |map: Map| -> Result<EventHandle, Box<EvalAltResult>> {
        EventHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
    });
}

fn register_custom_event(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<CustomEventHandle>("CustomEvent");

    engine.register_get_set(
        "b",
        |h: &mut CustomEventHandle| h.read(|c| c.beat),
        |h: &mut CustomEventHandle, v: f32| h.write(|c| c.beat = v),
    );
    engine.register_get_set(
        "t",
        |h: &mut CustomEventHandle| h.read(|c| c.name.clone()),
        |h: &mut CustomEventHandle, v: String| h.write(|c| c.name = v),
    );
    engine.register_get_set(
        "d",
        |h: &mut CustomEventHandle| h.read(|c| custom_data_to_map(&c.data)),
        |h: &mut CustomEventHandle, v: Map| h.write(|c| c.data = map_to_json(&v)),
    );

    engine.register_fn("spawn", |h: &mut CustomEventHandle| h.spawn());
    engine.register_fn("delete", |h: &mut CustomEventHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn(
        "custom_event",
        move |map: Map| -> Result<CustomEventHandle, Box<EvalAltResult>> {
            CustomEventHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
        },
    );
}

fn register_bpm_event(engine: &mut Engine, collection: &SharedCollection) {
    engine.register_type_with_name::<BpmEventHandle>("BpmEvent");

    engine.register_get_set(
        "b",
        |h: &mut BpmEventHandle| h.read(|b| b.beat),
        |h: &mut BpmEventHandle, v: f32| h.write(|b| b.beat = v),
    );
    engine.register_get_set(
        "m",
        |h: &mut BpmEventHandle| h.read(|b| b.bpm),
        |h: &mut BpmEventHandle, v: f32| h.write(|b| b.bpm = v),
    );

    engine.register_fn("spawn", |h: &mut BpmEventHandle| h.spawn());
    engine.register_fn("delete", |h: &mut BpmEventHandle| h.delete());

    let shared = Rc::clone(collection);
    engine.register_fn(
        "bpm_event",
        move |map: Map| -> Result<BpmEventHandle, Box<EvalAltResult>> {
            BpmEventHandle::from_script(&map, Rc::clone(&shared)).map_err(runtime_err)
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::CustomData;
    use crate::collection::LiveCollection;

    fn live_note(collection: &SharedCollection, beat: f32) -> NoteHandle {
        let data = NoteData {
            beat,
            x: 1,
            y: 0,
            color: 0,
            cut_direction: 1,
            custom_data: CustomData::new(),
        };
        let id = collection
            .borrow_mut()
            .load(TimedObject::Note(data.clone()));
        NoteHandle::from_live(id, data, Rc::clone(collection))
    }

    #[test]
    fn test_write_despawns_and_stays_despawned() {
        let collection = LiveCollection::new_shared();
        let handle = live_note(&collection, 1.0);
        assert!(handle.spawned());

        handle.write(|n| n.beat = 2.0);
        assert!(!handle.spawned());
        assert!(!collection.borrow().contains(handle.id()));

        // Further writes stay despawned.
        handle.write(|n| n.x = 3);
        assert!(!handle.spawned());
        assert_eq!(handle.read(|n| n.beat), 2.0);
        assert_eq!(handle.read(|n| n.x), 3);
    }

    #[test]
    fn test_spawn_is_idempotent() {
        let collection = LiveCollection::new_shared();
        let handle = live_note(&collection, 1.0);
        handle.write(|n| n.beat = 5.0);

        assert!(handle.spawn());
        assert!(handle.spawned());
        assert!(collection.borrow().contains(handle.id()));
        // The respawned object carries the mutated field.
        assert_eq!(collection.borrow().get(handle.id()).unwrap().beat(), 5.0);

        assert!(!handle.spawn());
        assert_eq!(collection.borrow().len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let collection = LiveCollection::new_shared();
        let handle = live_note(&collection, 1.0);

        assert!(handle.delete());
        assert!(!handle.delete());
        assert!(!collection.borrow().contains(handle.id()));
    }

    #[test]
    fn test_clones_share_state() {
        let collection = LiveCollection::new_shared();
        let handle = live_note(&collection, 1.0);
        let alias = handle.clone();

        alias.write(|n| n.beat = 7.0);
        assert!(!handle.spawned());
        assert_eq!(handle.read(|n| n.beat), 7.0);
    }

    #[test]
    fn test_from_script_roundtrip() {
        let collection = LiveCollection::new_shared();
        let mut map = Map::new();
        map.insert("b".into(), Dynamic::from(1.25_f32));
        map.insert("x".into(), Dynamic::from(2_i64));
        map.insert("y".into(), Dynamic::from(1_i64));
        map.insert("c".into(), Dynamic::from(1_i64));
        map.insert("d".into(), Dynamic::from(8_i64));

        let handle = NoteHandle::from_script(&map, Rc::clone(&collection)).unwrap();
        assert!(!handle.spawned());
        assert!(!collection.borrow().contains(handle.id()));
        // Byte-for-byte numeric round-trip.
        assert_eq!(handle.read(|n| n.beat).to_bits(), 1.25_f32.to_bits());
        assert_eq!(handle.read(|n| n.x), 2);
        assert_eq!(handle.read(|n| n.y), 1);
        assert_eq!(handle.read(|n| n.color), 1);
        assert_eq!(handle.read(|n| n.cut_direction), 8);

        assert!(handle.spawn());
        assert!(collection.borrow().contains(handle.id()));
    }

    #[test]
    fn test_bomb_missing_both_aliases() {
        let collection = LiveCollection::new_shared();
        let mut map = Map::new();
        map.insert("b".into(), Dynamic::from(1.0_f32));
        // No "x" and no "_lineIndex".
        map.insert("y".into(), Dynamic::from(0_i64));

        let err = BombHandle::from_script(&map, Rc::clone(&collection)).unwrap_err();
        assert_eq!(err.key, "x");
    }

    #[test]
    fn test_bomb_legacy_aliases_succeed() {
        let collection = LiveCollection::new_shared();
        let mut map = Map::new();
        map.insert("_time".into(), Dynamic::from(3.5_f32));
        map.insert("_lineIndex".into(), Dynamic::from(2_i64));
        map.insert("_lineLayer".into(), Dynamic::from(0_i64));

        let handle = BombHandle::from_script(&map, Rc::clone(&collection)).unwrap();
        assert_eq!(handle.read(|b| b.beat), 3.5);
        assert_eq!(handle.read(|b| b.x), 2);
    }

    #[test]
    fn test_handle_identity_across_kinds() {
        let collection = LiveCollection::new_shared();
        let note = live_note(&collection, 2.0);
        let dynamic = Dynamic::from(note.clone());
        let (id, beat) = handle_identity(&dynamic).unwrap();
        assert_eq!(id, note.id());
        assert_eq!(beat, 2.0);

        assert!(handle_identity(&Dynamic::from(42_i64)).is_none());
    }
}
