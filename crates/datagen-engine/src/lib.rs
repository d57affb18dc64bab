//! Batch execution and scheduling for datagen.
//!
//! A [`GenerationRequest`] becomes a [`Command`] once its model validates.
//! The [`CommandRunner`] queues commands to a fixed set of runner threads;
//! each run creates the command's sinks, then feeds batch indices to
//! `min(threads, batches)` workers over a bounded channel. Every worker
//! generates a batch with a per-batch seeded RNG and hands it to every sink
//! in list order.
//!
//! Commands with a delay are re-armed by a scheduler thread after each
//! finished run, until removed. They are saved to a [`CommandStore`] so a
//! restarted runner picks them up again.
//!
//! Status moves through [`CommandStatus`]:
//!
//! ```text
//! Queued -> Running -> Finished -> (delay) -> Queued ...
//!                   \-> Failed
//! any non-terminal  --remove--> Removed
//! ```

pub mod command;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod registry;
pub mod runner;
pub mod store;

pub use command::{
    Command, CommandId, CommandSnapshot, CommandStatus, GenerationRequest, RequestDefaults,
};
pub use error::EngineError;
pub use executor::execute;
pub use metrics::RunMetrics;
pub use registry::CommandRegistry;
pub use runner::{CommandRunner, RunnerConfig};
pub use store::{CommandStore, StoredCommand};
