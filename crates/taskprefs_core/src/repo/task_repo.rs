//! Task source contracts and in-memory implementation.
//!
//! # Responsibility
//! - Supply the ordered task list as a stream of snapshots.
//!
//! # Invariants
//! - Every subscriber first receives the current list, then each replacement.
//! - Task order is preserved exactly as supplied.

use crate::model::task::{Task, TaskPriority};
use futures::stream::BoxStream;
use log::debug;
use tokio::sync::watch;

/// Source of task list snapshots.
pub trait TaskRepository: Send + Sync {
    /// Streams the current task list and every later replacement.
    fn tasks(&self) -> BoxStream<'static, Vec<Task>>;
}

/// Task source holding the list in memory.
pub struct InMemoryTaskRepository {
    tasks: watch::Sender<Vec<Task>>,
}

impl InMemoryTaskRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        let (sender, _) = watch::channel(tasks);
        Self { tasks: sender }
    }

    /// Creates a repository seeded with a fixed demo list.
    ///
    /// Deadlines are fixed epoch milliseconds so output stays deterministic.
    pub fn with_sample_tasks() -> Self {
        use TaskPriority::{High, Low, Medium};

        let seed = [
            ("Open the project", 1_591_574_400_000, Low, false),
            ("Import the sample data", 1_591_660_800_000, Medium, true),
            ("Check out the code", 1_591_747_200_000, Low, false),
            ("Read about preference stores", 1_592_352_000_000, High, false),
            ("Implement each step", 1_591_747_200_000, Medium, false),
            ("Persist the sort order", 1_592_697_600_000, High, true),
            ("Migrate legacy settings", 1_592_697_600_000, High, false),
        ];
        Self::new(
            seed.into_iter()
                .map(|(name, deadline, priority, completed)| {
                    Task::new(name, deadline, priority, completed)
                })
                .collect(),
        )
    }

    /// Replaces the whole task list and notifies subscribers.
    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        let count = tasks.len();
        self.tasks.send_replace(tasks);
        debug!("event=tasks_replace module=repo status=ok count={count}");
    }

    /// Number of live task subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tasks.receiver_count()
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn tasks(&self) -> BoxStream<'static, Vec<Task>> {
        let mut receiver = self.tasks.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                let snapshot = receiver.borrow_and_update().clone();
                yield snapshot;
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
