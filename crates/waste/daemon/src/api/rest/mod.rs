//! REST API: router, shared state, extractors and handlers

pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
