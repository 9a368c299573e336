//! Task list view composition.
//!
//! # Responsibility
//! - Combine the task stream and the settings stream into `TasksUiModel`s.
//! - Forward presentation-level preference mutations to the repository.
//!
//! # Invariants
//! - Nothing is emitted until both inputs have produced a value; afterwards
//!   every input emission yields exactly one model.
//! - Filtering and sorting are pure and stable.
//! - A settings error is forwarded once and ends the combined stream.
//! - Dropping the combined stream drops both upstream subscriptions.

use crate::model::settings::{Settings, SortOrder};
use crate::model::task::Task;
use crate::repo::preferences_repo::{RepoResult, UserPreferencesRepository};
use crate::repo::task_repo::TaskRepository;
use crate::store::PreferenceStore;
use futures::stream::{BoxStream, Stream, StreamExt};
use log::{debug, info};
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;

/// Display-ready task list with the settings it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TasksUiModel {
    pub tasks: Vec<Task>,
    pub show_completed: bool,
    pub sort_order: SortOrder,
}

impl TasksUiModel {
    pub fn compose(tasks: &[Task], settings: &Settings) -> Self {
        Self {
            tasks: filter_sort_tasks(tasks, settings),
            show_completed: settings.show_completed,
            sort_order: settings.sort_order(),
        }
    }
}

/// Filters out completed tasks unless shown, then stable-sorts by the active axes.
///
/// Deadline sorts descending; priority sorts ascending and breaks deadline ties.
pub fn filter_sort_tasks(tasks: &[Task], settings: &Settings) -> Vec<Task> {
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| settings.show_completed || !task.completed)
        .cloned()
        .collect();

    let sort = settings.sort;
    match (sort.by_deadline, sort.by_priority) {
        (false, false) => {}
        (true, false) => visible.sort_by_key(|task| Reverse(task.deadline)),
        (false, true) => visible.sort_by_key(|task| task.priority),
        (true, true) => visible.sort_by_key(|task| (Reverse(task.deadline), task.priority)),
    }
    visible
}

enum Input {
    Tasks(Option<Vec<Task>>),
    Settings(Option<RepoResult<Settings>>),
}

/// Combine-latest of a task stream and a settings stream.
pub fn combine_tasks_ui_model<T, P>(
    tasks: T,
    settings: P,
) -> BoxStream<'static, RepoResult<TasksUiModel>>
where
    T: Stream<Item = Vec<Task>> + Send + 'static,
    P: Stream<Item = RepoResult<Settings>> + Send + 'static,
{
    let mut tasks = Box::pin(tasks);
    let mut settings = Box::pin(settings);

    Box::pin(async_stream::stream! {
        let mut latest_tasks: Option<Vec<Task>> = None;
        let mut latest_settings: Option<Settings> = None;
        let mut tasks_open = true;
        let mut settings_open = true;

        while tasks_open || settings_open {
            let input = tokio::select! {
                next = tasks.next(), if tasks_open => Input::Tasks(next),
                next = settings.next(), if settings_open => Input::Settings(next),
                else => break,
            };

            match input {
                Input::Tasks(Some(value)) => latest_tasks = Some(value),
                Input::Tasks(None) => {
                    tasks_open = false;
                    continue;
                }
                Input::Settings(Some(Ok(value))) => latest_settings = Some(value),
                Input::Settings(Some(Err(err))) => {
                    yield Err(err);
                    break;
                }
                Input::Settings(None) => {
                    settings_open = false;
                    continue;
                }
            }

            if let (Some(current_tasks), Some(current_settings)) = (&latest_tasks, &latest_settings) {
                let model = TasksUiModel::compose(current_tasks, current_settings);
                debug!(
                    "event=ui_model_emit module=service status=ok visible={} sort_order={}",
                    model.tasks.len(),
                    model.sort_order
                );
                yield Ok(model);
            }
        }
    })
}

/// Presentation-facing entry point for the task list screen.
pub struct TasksViewService<S: PreferenceStore, T: TaskRepository> {
    preferences: UserPreferencesRepository<S>,
    tasks: Arc<T>,
}

impl<S, T> TasksViewService<S, T>
where
    S: PreferenceStore + 'static,
    T: TaskRepository,
{
    pub fn new(preferences: UserPreferencesRepository<S>, tasks: Arc<T>) -> Self {
        Self { preferences, tasks }
    }

    /// Streams UI models for the current tasks and settings.
    pub fn ui_model_stream(&self) -> BoxStream<'static, RepoResult<TasksUiModel>> {
        combine_tasks_ui_model(self.tasks.tasks(), self.preferences.settings_stream())
    }

    /// One-shot settings used to initialize toggles before the first model arrives.
    pub async fn initial_setup(&self) -> RepoResult<Settings> {
        self.preferences.fetch_initial().await
    }

    pub async fn show_completed_tasks(&self, show: bool) -> RepoResult<()> {
        info!("event=view_action module=service action=show_completed value={show}");
        self.preferences.set_show_completed(show).await
    }

    pub async fn enable_sort_by_deadline(&self, enable: bool) -> RepoResult<SortOrder> {
        info!("event=view_action module=service action=sort_by_deadline value={enable}");
        self.preferences.enable_sort_by_deadline(enable).await
    }

    pub async fn enable_sort_by_priority(&self, enable: bool) -> RepoResult<SortOrder> {
        info!("event=view_action module=service action=sort_by_priority value={enable}");
        self.preferences.enable_sort_by_priority(enable).await
    }
}
