pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fake;
pub mod object;
pub mod scheme;
pub mod tracked;
pub mod types;

pub use client::{Client, WatchEvent};
pub use context::Context;
pub use error::{AggregateError, ClientError};
pub use object::{Object, ObjectMeta, Unstructured};
pub use scheme::Scheme;
pub use tracked::{Tracked, TrackedClient};

#[cfg(test)]
pub mod testing;
