pub mod history;
pub mod local;
pub mod settings;

pub use history::{HistoryEntry, HistoryKind, HistoryStats, HistoryStore, MAX_HISTORY_ENTRIES};
pub use local::LocalFileStorage;
pub use settings::{Settings, SettingsStore};
