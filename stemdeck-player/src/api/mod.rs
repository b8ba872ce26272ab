//! HTTP control surface
//!
//! REST endpoints under `/api/v1` drive the transport; `/api/v1/events`
//! streams transport events over SSE.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
