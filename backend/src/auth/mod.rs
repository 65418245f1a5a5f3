//! Authentication module for managing user sessions and access control.
//!
//! This module provides login, registration and token refresh, the token
//! service that signs and rotates JWTs, the role/permission table, and the
//! authorization middleware.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod service;
pub mod token_service;
