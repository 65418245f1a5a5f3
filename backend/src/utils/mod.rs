//! Shared helpers: clock abstraction, JWT encoding and random identifiers.

pub mod clock;
pub mod generate_random_string;
pub mod jwt;
