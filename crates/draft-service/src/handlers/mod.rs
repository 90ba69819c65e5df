//! HTTP request handlers for the draft service.

pub mod rooms;

pub use rooms::{create_room, delete_room, get_capacity, get_room, list_rooms, parse_room_code};
