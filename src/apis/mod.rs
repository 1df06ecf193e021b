/// API client plumbing shared by every domain service client
pub mod client;
pub mod descriptor;
pub mod market;

pub use client::{ApiClient, RateLimiter, API_KEY_HEADER};
pub use descriptor::{RequestDescriptor, ServiceClientConfig, ROUTING_PARAM};
