//! Module for administrative API endpoints.
//!
//! User listing, user deactivation and the dashboard summary. Every route is
//! gated by a role permission on top of bearer authentication.

pub mod handlers;
pub mod routes;
