//! Request and Response models for the demo HTTP surface
//!
//! DTOs serialized to and from the HTTP bodies served by the binary.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::SetRequest;
pub use responses::{
    ContainsResponse, ErrorResponse, GetResponse, HealthResponse, SetResponse, StatsResponse,
};
