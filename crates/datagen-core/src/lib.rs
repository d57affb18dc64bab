//! Core types for the datagen engine.
//!
//! This crate holds everything that describes *what* to generate, without
//! generating anything itself:
//!
//! - [`FieldKind`] - the closed set of logical field types
//! - [`Value`] - a generated value, including structured dictionary values
//! - [`ModelDefinition`] / [`FieldDefinition`] - the model file format (YAML or JSON)
//! - [`ModelOptions`] - typed generation options with defaults
//!
//! ```text
//! datagen-core (this crate)
//!    │
//!    ├─── datagen-generator  (builds a Model and produces rows)
//!    ├─── datagen-sinks      (consumes rows)
//!    └─── datagen-engine     (runs commands against sinks)
//! ```
//!
//! # Example
//!
//! ```rust
//! use datagen_core::{FieldKind, ModelDefinition};
//!
//! let model = ModelDefinition::from_yaml(r#"
//! model_name: users
//! fields:
//!   - name: id
//!     type: increment_long
//!   - name: email
//!     type: email
//! "#).unwrap();
//!
//! assert_eq!(model.fields[1].kind, FieldKind::Email);
//! ```

pub mod kinds;
pub mod options;
pub mod schema;
pub mod values;

pub use kinds::FieldKind;
pub use options::{table_names, ModelOptions, OptionKey, OptionValue};
pub use schema::{FieldDefinition, ModelDefinition, SchemaError};
pub use values::{City, Person, Value};
