//! Configuration: the TOML settings file and duration parsing.

mod duration;
mod settings;

pub use duration::parse_duration;
pub use settings::DatagenConfig;
