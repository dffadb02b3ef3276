//! Axum handlers. Each one unpacks the request, calls one service
//! operation, and serializes the result; the rules live in `services`.

pub mod auth;
pub mod chats;
pub mod questions;
pub mod reviews;
pub mod system;
pub mod trust;
pub mod users;
