//! Configuration: the mapping file, runtime settings, and validation.
pub mod mapping;
pub mod settings;
pub mod validation;

pub use mapping::{Mapping, MappingEntry};
pub use settings::{Backend, Overrides, Settings};
