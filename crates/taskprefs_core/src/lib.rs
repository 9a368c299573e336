//! Core logic for task list preferences.
//! Persists user preferences and derives the filtered, sorted task view.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::settings::{Settings, SortFlags, SortOrder, UnknownSortOrder};
pub use model::task::{Task, TaskId, TaskPriority};
pub use repo::preferences_repo::{RepoError, RepoResult, UserPreferencesRepository};
pub use repo::task_repo::{InMemoryTaskRepository, TaskRepository};
pub use service::tasks_view::{
    combine_tasks_ui_model, filter_sort_tasks, TasksUiModel, TasksViewService,
};
pub use store::{
    MemoryPreferenceStore, PrefValue, PreferenceStore, Preferences, SqlitePreferenceStore,
    StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
