//! Room registry: room → user ID → connection.
//!
//! A reverse index (connection → memberships) is kept in step with the room
//! map so that disconnect cleanup only touches the rooms the connection
//! actually joined.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Opaque handle for a live transport connection
///
/// Minted by the transport; the registry only compares and stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw transport identifier
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw transport identifier
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// One (room, user ID) entry held by a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Membership {
    /// Room key
    pub room: String,
    /// User ID within the room
    pub user_id: String,
}

impl Membership {
    /// Create a membership
    #[must_use]
    pub fn new(room: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            user_id: user_id.into(),
        }
    }
}

/// Registry of rooms and their members
///
/// A user ID maps to at most one connection per room. Rooms are created on
/// first join and dropped when their last member is removed.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room key → (user ID → connection)
    rooms: HashMap<String, BTreeMap<String, ConnectionId>>,
    /// Connection → memberships it holds
    memberships: HashMap<ConnectionId, BTreeSet<Membership>>,
}

impl RoomRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user_id` in `room` for `conn`
    ///
    /// An existing entry for the same user ID is overwritten. Returns the
    /// connection that previously held the user ID, if any.
    pub fn join(&mut self, room: &str, user_id: &str, conn: ConnectionId) -> Option<ConnectionId> {
        let displaced = self
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(user_id.to_string(), conn);

        if let Some(previous) = displaced {
            if previous != conn {
                self.unindex(previous, room, user_id);
            }
        }

        self.memberships
            .entry(conn)
            .or_default()
            .insert(Membership::new(room, user_id));

        displaced
    }

    /// Remove `user_id` from `room`
    ///
    /// Returns the connection that held the entry, or `None` if there was none.
    pub fn leave(&mut self, room: &str, user_id: &str) -> Option<ConnectionId> {
        let members = self.rooms.get_mut(room)?;
        let removed = members.remove(user_id);
        if members.is_empty() {
            self.rooms.remove(room);
        }

        if let Some(conn) = removed {
            self.unindex(conn, room, user_id);
        }

        removed
    }

    /// Remove every entry held by `conn`
    ///
    /// Returns the removed memberships in (room, user ID) order.
    pub fn purge(&mut self, conn: ConnectionId) -> Vec<Membership> {
        let Some(held) = self.memberships.remove(&conn) else {
            return Vec::new();
        };

        for membership in &held {
            if let Some(members) = self.rooms.get_mut(&membership.room) {
                if members.get(&membership.user_id) == Some(&conn) {
                    members.remove(&membership.user_id);
                }
                if members.is_empty() {
                    self.rooms.remove(&membership.room);
                }
            }
        }

        held.into_iter().collect()
    }

    /// Connection registered for `user_id` in `room`
    #[must_use]
    pub fn lookup(&self, room: &str, user_id: &str) -> Option<ConnectionId> {
        self.rooms.get(room)?.get(user_id).copied()
    }

    /// Members of `room` as (user ID, connection), ordered by user ID
    #[must_use]
    pub fn members(&self, room: &str) -> Vec<(&str, ConnectionId)> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .map(|(user_id, conn)| (user_id.as_str(), *conn))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Memberships currently held by `conn`
    #[must_use]
    pub fn memberships_of(&self, conn: ConnectionId) -> Vec<&Membership> {
        self.memberships
            .get(&conn)
            .map(|held| held.iter().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty rooms
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total (room, user ID) entries across all rooms
    #[must_use]
    pub fn membership_count(&self) -> usize {
        self.rooms.values().map(BTreeMap::len).sum()
    }

    /// Whether no room has any member
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn unindex(&mut self, conn: ConnectionId, room: &str, user_id: &str) {
        if let Some(held) = self.memberships.get_mut(&conn) {
            held.remove(&Membership::new(room, user_id));
            if held.is_empty() {
                self.memberships.remove(&conn);
            }
        }
    }
}
