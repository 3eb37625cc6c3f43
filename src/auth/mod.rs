// src/auth/mod.rs
// Session verification sits outside the orchestrator's core (spec.md §1), but
// the HTTP layer needs a concrete way to resolve an authenticated user_id.

pub mod jwt;

pub use jwt::{verify_token, Claims};
