//! Room registry — maps rooms to members and back.

use std::collections::HashSet;

use dashmap::DashMap;

use fleetpulse_core::resource::Room;

use crate::connection::ClientId;

/// Registry of room memberships with a reverse index for cheap cleanup.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room → member connection IDs.
    members: DashMap<Room, HashSet<ClientId>>,
    /// Connection ID → joined rooms.
    memberships: DashMap<ClientId, HashSet<Room>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Returns `false` if it was already a
    /// member.
    pub fn join(&self, room: Room, id: ClientId) -> bool {
        let inserted = self.members.entry(room).or_default().insert(id);
        self.memberships.entry(id).or_default().insert(room);
        inserted
    }

    /// Removes a connection from a room.
    pub fn leave(&self, room: Room, id: ClientId) {
        if let Some(mut members) = self.members.get_mut(&room) {
            members.remove(&id);
            if members.is_empty() {
                drop(members);
                self.members.remove(&room);
            }
        }
        if let Some(mut rooms) = self.memberships.get_mut(&id) {
            rooms.remove(&room);
        }
    }

    /// Removes a connection from every room it joined.
    pub fn leave_all(&self, id: ClientId) -> Vec<Room> {
        let rooms: Vec<Room> = self
            .memberships
            .remove(&id)
            .map(|(_, rooms)| rooms.into_iter().collect())
            .unwrap_or_default();
        for room in &rooms {
            if let Some(mut members) = self.members.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    drop(members);
                    self.members.remove(room);
                }
            }
        }
        rooms
    }

    /// Member connection IDs of a room.
    pub fn members(&self, room: Room) -> Vec<ClientId> {
        self.members
            .get(&room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is in a room.
    pub fn is_member(&self, room: Room, id: ClientId) -> bool {
        self.members
            .get(&room)
            .is_some_and(|members| members.contains(&id))
    }

    /// Member count of a room.
    pub fn member_count(&self, room: Room) -> usize {
        self.members.get(&room).map(|m| m.len()).unwrap_or(0)
    }
}
