use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        RwLock,
    },
};

use log::*;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event_types::{role_room, user_room, ServerEvent};
use crate::db_types::{OrderId, Role};

pub type SessionId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("The event hub has been shut down")]
    Closed,
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),
    #[error("The event hub state is unavailable because another thread panicked while holding it")]
    Poisoned,
}

struct Session {
    user_id: String,
    role: Role,
    sender: mpsc::UnboundedSender<ServerEvent>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, Session>,
    rooms: HashMap<String, HashSet<SessionId>>,
    closed: bool,
}

impl HubState {
    fn add_to_room(&mut self, id: SessionId, room: &str) -> Result<(), HubError> {
        let session = self.sessions.get_mut(&id).ok_or(HubError::UnknownSession(id))?;
        session.rooms.insert(room.to_string());
        self.rooms.entry(room.to_string()).or_default().insert(id);
        Ok(())
    }

    fn remove_from_room(&mut self, id: SessionId, room: &str) -> Result<(), HubError> {
        let session = self.sessions.get_mut(&id).ok_or(HubError::UnknownSession(id))?;
        session.rooms.remove(room);
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
        Ok(())
    }

    fn remove_session(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        for room in &session.rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }
        Some(session)
    }
}

/// A connected client's handle on the hub. Events published to any of its rooms arrive on `receiver`.
pub struct HubSession {
    pub id: SessionId,
    pub receiver: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Room-based fan-out of [`ServerEvent`]s to connected clients.
///
/// Clones share the same state. Delivery is fire-and-forget: there are no acknowledgements, and a client that is not
/// connected when an event is published never sees it.
#[derive(Clone, Default)]
pub struct EventHub {
    state: Arc<RwLock<HubState>>,
    next_id: Arc<AtomicU64>,
}

impl Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventHub ({} sessions)", self.session_count())
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and joins it to the rooms for its user id and its role.
    pub fn connect(&self, user_id: &str, role: Role) -> Result<HubSession, HubError> {
        let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
        if state.closed {
            return Err(HubError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        state.sessions.insert(id, Session { user_id: user_id.to_string(), role, sender, rooms: HashSet::new() });
        state.add_to_room(id, &user_room(user_id))?;
        state.add_to_room(id, &role_room(role))?;
        debug!("📡️ Session {id} connected for {user_id} ({role})");
        Ok(HubSession { id, receiver })
    }

    pub fn join(&self, session: SessionId, room: &str) -> Result<(), HubError> {
        let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
        if state.closed {
            return Err(HubError::Closed);
        }
        state.add_to_room(session, room)?;
        trace!("📡️ Session {session} joined {room}");
        Ok(())
    }

    pub fn leave(&self, session: SessionId, room: &str) -> Result<(), HubError> {
        let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
        state.remove_from_room(session, room)?;
        trace!("📡️ Session {session} left {room}");
        Ok(())
    }

    pub fn join_order(&self, session: SessionId, order_id: OrderId) -> Result<(), HubError> {
        self.join(session, &order_id.room())
    }

    pub fn leave_order(&self, session: SessionId, order_id: OrderId) -> Result<(), HubError> {
        self.leave(session, &order_id.room())
    }

    /// Removes the session from every room. Disconnecting an unknown session is a no-op.
    pub fn disconnect(&self, session: SessionId) -> Result<(), HubError> {
        let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
        if let Some(s) = state.remove_session(session) {
            debug!("📡️ Session {session} for {} ({}) disconnected", s.user_id, s.role);
        }
        Ok(())
    }

    /// Sends `event` to every session in `room` and returns how many received it. An empty room is not an error.
    pub fn publish(&self, room: &str, event: ServerEvent) -> Result<usize, HubError> {
        let mut stale = Vec::new();
        let delivered = {
            let state = self.state.read().map_err(|_| HubError::Poisoned)?;
            if state.closed {
                return Err(HubError::Closed);
            }
            let Some(members) = state.rooms.get(room) else {
                trace!("📡️ Nobody is listening on {room} for {}", event.name());
                return Ok(0);
            };
            let mut delivered = 0;
            for id in members {
                match state.sessions.get(id) {
                    Some(session) if session.sender.send(event.clone()).is_ok() => delivered += 1,
                    _ => stale.push(*id),
                }
            }
            delivered
        };
        if !stale.is_empty() {
            let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
            for id in stale {
                state.remove_session(id);
            }
        }
        trace!("📡️ Published {} to {room} ({delivered} session(s))", event.name());
        Ok(delivered)
    }

    pub fn publish_to_order(&self, order_id: OrderId, event: ServerEvent) -> Result<usize, HubError> {
        self.publish(&order_id.room(), event)
    }

    /// Drops every session and refuses further connections and publishes.
    pub fn shutdown(&self) -> Result<(), HubError> {
        let mut state = self.state.write().map_err(|_| HubError::Poisoned)?;
        state.closed = true;
        state.sessions.clear();
        state.rooms.clear();
        info!("📡️ Event hub has shut down");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.state.read().map(|s| s.sessions.len()).unwrap_or_default()
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.state.read().map(|s| s.rooms.get(room).map(HashSet::len).unwrap_or_default()).unwrap_or_default()
    }
}
