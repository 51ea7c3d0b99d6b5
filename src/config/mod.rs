mod settings;

pub use settings::{ChatConfig, LoggingConfig, Settings, StoreConfig};
