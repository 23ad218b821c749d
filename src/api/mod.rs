//! API Module
//!
//! HTTP handlers and routing that expose one cache over REST.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /contains/:key` - Check presence without touching recency
//! - `GET /stats` - Provider, group and entry count
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
