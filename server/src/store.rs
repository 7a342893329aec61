use crate::game::Room;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Storage seam for room state. Handlers read a copy, mutate it and write it
/// back, so the backing store can be swapped without touching game code.
pub trait RoomStore: Send + Sync {
    fn get(&self, room_code: &str) -> Option<Room>;
    fn put(&self, room_code: String, room: Room);
    fn remove(&self, room_code: &str) -> Option<Room>;
    fn contains(&self, room_code: &str) -> bool {
        self.get(room_code).is_some()
    }
    fn room_codes(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Room>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn get(&self, room_code: &str) -> Option<Room> {
        self.inner.lock().get(room_code).cloned()
    }

    fn put(&self, room_code: String, room: Room) {
        self.inner.lock().insert(room_code, room);
    }

    fn remove(&self, room_code: &str) -> Option<Room> {
        self.inner.lock().remove(room_code)
    }

    fn contains(&self, room_code: &str) -> bool {
        self.inner.lock().contains_key(room_code)
    }

    fn room_codes(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }
}

/// Drop every room whose last activity is older than `cutoff`.
pub fn evict_idle(store: &dyn RoomStore, cutoff: DateTime<Utc>) -> Vec<String> {
    let mut evicted = Vec::new();
    for code in store.room_codes() {
        let idle = store
            .get(&code)
            .map(|room| room.last_activity < cutoff)
            .unwrap_or(false);
        if idle && store.remove(&code).is_some() {
            evicted.push(code);
        }
    }
    evicted
}
