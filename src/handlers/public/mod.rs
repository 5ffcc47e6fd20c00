// Handlers reachable without a session token
pub mod auth;
