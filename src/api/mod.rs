// Built-in resource types
pub mod core;

pub use self::core::{ConfigMap, Secret};
