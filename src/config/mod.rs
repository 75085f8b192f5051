// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{default_config_path, load_config, load_from_file};
pub use settings::{
    ArchiveConfig, SweepConfig, TrainerConfig, DEFAULT_BUCKET_ROOT, DEFAULT_SETTLE_SECS,
};
