pub mod settings;

pub use settings::{CacheSettings, IgnoreSettings, NobusConfig, UiConfig, CONFIG_FILE_NAME};
