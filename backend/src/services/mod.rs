//! Business services sitting between the HTTP handlers and the stores.

pub mod user_service;
