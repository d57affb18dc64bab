//! Synthetic row generation for datagen.
//!
//! This crate turns a [`ModelDefinition`](datagen_core::ModelDefinition)
//! into a validated [`Model`] and produces [`Row`]s from it.
//!
//! # Architecture
//!
//! ```text
//! ModelDefinition (YAML / JSON)
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │        Model         │
//! │                      │
//! │  - fields (ordered)  │
//! │  - computed order    │
//! │  - counter bank      │
//! │  - options           │
//! └──────────┬───────────┘
//!            │  RowGenerator (seed per batch)
//!            ▼
//!      Row { name -> value }
//! ```
//!
//! # Example
//!
//! ```rust
//! use datagen_core::ModelDefinition;
//! use datagen_generator::{Dictionaries, Model, RowGenerator};
//! use std::sync::Arc;
//!
//! let definition = ModelDefinition::from_yaml(r#"
//! model_name: users
//! fields:
//!   - name: id
//!     type: increment_long
//!   - name: age
//!     type: integer
//!     min: 18
//!     max: 80
//!   - name: adult
//!     type: boolean
//!     conditionals:
//!       "$age>20": "true"
//!       "default": "false"
//! "#).unwrap();
//!
//! let model = Model::from_definition(&definition, &Dictionaries::embedded()).unwrap();
//! let generator = RowGenerator::new(Arc::new(model), Some(42));
//! let rows = generator.generate_batch(0, 10);
//! assert_eq!(rows.len(), 10);
//! println!("{}", rows[0].to_json());
//! ```
//!
//! # Computed fields
//!
//! - `conditionals` - first matching condition line wins
//! - `formula` - arithmetic over numeric fields
//! - `injection` - `${field}` string templates
//! - `link` - attributes of city and name values

pub mod conditions;
pub mod dictionaries;
pub mod field;
pub mod generator;
pub mod generators;
pub mod model;
pub mod row;

// Re-exports for convenience
pub use conditions::{ComputedExpr, EvalError};
pub use dictionaries::{Dictionaries, PhoneCode};
pub use field::{cast_value, Field};
pub use generator::{RowGenerator, RowIterator};
pub use model::Model;
pub use row::{Row, RowLayout};
