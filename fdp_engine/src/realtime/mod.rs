//! Real-time fan-out of order events to connected clients.
//!
//! Every client session sits in a room for its user id (`user:<id>`) and one for its role (`role:<role>`). Clients can
//! also join the room for a specific order (`order:<id>`). The prefixes keep the three kinds of room apart, so a user
//! id can never name a role or order room. The transport (websockets, in the server) is not part of this module.
mod event_types;
mod hub;

pub use event_types::{
    role_room,
    user_room,
    ClientErrorEvent,
    ClientMessage,
    NewOrderEvent,
    OrderUpdateEvent,
    ServerEvent,
    StatusChangeEvent,
    SUPERADMIN_ROOM,
};
pub use hub::{EventHub, HubError, HubSession, SessionId};
