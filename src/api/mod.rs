// src/api/mod.rs
// HTTP surface (spec.md §6), mirroring the teacher's `api/http/*` + `api/ws/*`
// placement: one module per transport, routes grouped by resource.

pub mod http;

pub use http::router;
