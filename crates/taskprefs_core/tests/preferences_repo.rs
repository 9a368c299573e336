use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskprefs_core::store::EditFn;
use taskprefs_core::{
    MemoryPreferenceStore, PreferenceStore, Preferences, RepoError, Settings, SortOrder,
    StoreError, StoreResult, UserPreferencesRepository,
};
use tokio::sync::watch;
use tokio::time::timeout;

const STEP: Duration = Duration::from_secs(5);

fn memory_repo() -> UserPreferencesRepository<MemoryPreferenceStore> {
    UserPreferencesRepository::new(Arc::new(MemoryPreferenceStore::new()))
}

fn repo_with(entries: &[(&str, &str)]) -> UserPreferencesRepository<MemoryPreferenceStore> {
    let mut prefs = Preferences::new();
    for (key, value) in entries {
        prefs.set_str(key, *value);
    }
    UserPreferencesRepository::new(Arc::new(MemoryPreferenceStore::with_preferences(prefs)))
}

/// Memory store whose reads can be scripted to fail.
struct FlakyStore {
    inner: MemoryPreferenceStore,
    read_failures: Mutex<VecDeque<StoreError>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryPreferenceStore::new(),
            read_failures: Mutex::new(VecDeque::new()),
        }
    }

    fn fail_next_read(&self, err: StoreError) {
        self.read_failures.lock().unwrap().push_back(err);
    }
}

#[async_trait]
impl PreferenceStore for FlakyStore {
    async fn data(&self) -> StoreResult<Preferences> {
        let scripted = self.read_failures.lock().unwrap().pop_front();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.data().await,
        }
    }

    async fn edit(&self, transform: EditFn) -> StoreResult<Preferences> {
        self.inner.edit(transform).await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes()
    }
}

#[tokio::test]
async fn empty_store_resolves_to_defaults() {
    let repo = memory_repo();

    let settings = repo.fetch_initial().await.unwrap();
    assert_eq!(settings, Settings::default());
    assert!(!settings.show_completed);
    assert_eq!(settings.sort_order(), SortOrder::None);
}

#[tokio::test]
async fn set_show_completed_overwrites_flag() {
    let repo = memory_repo();

    repo.set_show_completed(true).await.unwrap();
    assert!(repo.fetch_initial().await.unwrap().show_completed);

    repo.set_show_completed(false).await.unwrap();
    assert!(!repo.fetch_initial().await.unwrap().show_completed);
}

#[tokio::test]
async fn sort_toggles_follow_composition_table_from_every_state() {
    let cases = [
        (SortOrder::None, true, true, SortOrder::ByDeadline),
        (SortOrder::ByPriority, true, true, SortOrder::ByDeadlineAndPriority),
        (SortOrder::ByDeadlineAndPriority, true, false, SortOrder::ByPriority),
        (SortOrder::ByPriority, true, false, SortOrder::ByPriority),
        (SortOrder::ByDeadline, false, true, SortOrder::ByDeadlineAndPriority),
        (SortOrder::ByDeadline, false, false, SortOrder::ByDeadline),
        (SortOrder::ByPriority, false, false, SortOrder::None),
        (SortOrder::ByDeadlineAndPriority, false, false, SortOrder::ByDeadline),
    ];

    for (start, deadline_axis, enable, expected) in cases {
        let repo = repo_with(&[("sort_order", start.as_str())]);
        let returned = if deadline_axis {
            repo.enable_sort_by_deadline(enable).await.unwrap()
        } else {
            repo.enable_sort_by_priority(enable).await.unwrap()
        };
        assert_eq!(returned, expected, "from {start}");
        assert_eq!(repo.fetch_initial().await.unwrap().sort_order(), expected);
    }
}

#[tokio::test]
async fn enabling_deadline_twice_is_idempotent() {
    let repo = memory_repo();

    let once = repo.enable_sort_by_deadline(true).await.unwrap();
    let twice = repo.enable_sort_by_deadline(true).await.unwrap();
    assert_eq!(once, SortOrder::ByDeadline);
    assert_eq!(twice, once);
}

#[tokio::test]
async fn toggles_invert_each_other() {
    let repo = memory_repo();
    repo.enable_sort_by_deadline(true).await.unwrap();
    repo.enable_sort_by_deadline(false).await.unwrap();
    assert_eq!(repo.fetch_initial().await.unwrap().sort_order(), SortOrder::None);

    let repo = repo_with(&[("sort_order", "BY_DEADLINE_AND_PRIORITY")]);
    assert_eq!(
        repo.enable_sort_by_deadline(false).await.unwrap(),
        SortOrder::ByPriority
    );
    assert_eq!(
        repo.enable_sort_by_priority(false).await.unwrap(),
        SortOrder::None
    );
}

#[tokio::test]
async fn unknown_sort_order_is_fatal_for_reads_and_toggles() {
    let repo = repo_with(&[("sort_order", "BY_COLOUR")]);

    let err = repo.fetch_initial().await.unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(ref message) if message.contains("BY_COLOUR")));

    let err = repo.enable_sort_by_priority(true).await.unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));

    let prefs = repo.store().data().await.unwrap();
    assert_eq!(prefs.get_str("sort_order").unwrap(), Some("BY_COLOUR"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_axis_toggles_do_not_lose_updates() {
    for _ in 0..50 {
        let repo = memory_repo();
        let deadline = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.enable_sort_by_deadline(true).await })
        };
        let priority = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.enable_sort_by_priority(true).await })
        };
        deadline.await.unwrap().unwrap();
        priority.await.unwrap().unwrap();

        assert_eq!(
            repo.fetch_initial().await.unwrap().sort_order(),
            SortOrder::ByDeadlineAndPriority
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn alternating_toggle_storm_settles_on_last_writes() {
    let repo = memory_repo();
    let deadline = {
        let repo = repo.clone();
        tokio::spawn(async move {
            for i in 0..1000 {
                repo.enable_sort_by_deadline(i % 2 == 0).await?;
            }
            Ok::<_, RepoError>(())
        })
    };
    let priority = {
        let repo = repo.clone();
        tokio::spawn(async move {
            for i in 0..1000 {
                repo.enable_sort_by_priority(i % 2 == 1).await?;
            }
            Ok::<_, RepoError>(())
        })
    };
    deadline.await.unwrap().unwrap();
    priority.await.unwrap().unwrap();

    // Last deadline write disables, last priority write enables.
    assert_eq!(
        repo.fetch_initial().await.unwrap().sort_order(),
        SortOrder::ByPriority
    );
}

#[tokio::test]
async fn settings_stream_emits_current_then_each_change() {
    let repo = memory_repo();
    let mut stream = repo.settings_stream();

    let first = timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(first, Settings::default());

    repo.set_show_completed(true).await.unwrap();
    let second = timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();
    assert!(second.show_completed);

    repo.enable_sort_by_priority(true).await.unwrap();
    let third = timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(third, Settings::new(true, SortOrder::ByPriority));
}

#[tokio::test]
async fn settings_stream_is_restartable_per_subscriber() {
    let repo = memory_repo();
    repo.enable_sort_by_deadline(true).await.unwrap();

    let mut first = repo.settings_stream();
    let value = timeout(STEP, first.next()).await.unwrap().unwrap().unwrap();
    drop(first);

    let mut second = repo.settings_stream();
    let again = timeout(STEP, second.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(value, again);
    assert_eq!(again.sort_order(), SortOrder::ByDeadline);
    drop(second);

    assert_eq!(repo.store().subscriber_count(), 0);
}

#[tokio::test]
async fn transient_io_read_yields_defaults_and_stream_continues() {
    let store = Arc::new(FlakyStore::new());
    let repo = UserPreferencesRepository::new(Arc::clone(&store));
    repo.set_show_completed(true).await.unwrap();

    store.fail_next_read(StoreError::Io(std::io::Error::other("read interrupted")));
    let mut stream = repo.settings_stream();

    let recovered = timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(recovered, Settings::default());

    repo.enable_sort_by_deadline(true).await.unwrap();
    let next = timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(next, Settings::new(true, SortOrder::ByDeadline));
}

#[tokio::test]
async fn non_io_read_failure_ends_stream() {
    let store = Arc::new(FlakyStore::new());
    let repo = UserPreferencesRepository::new(Arc::clone(&store));
    let mut stream = repo.settings_stream();
    timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();

    store.fail_next_read(StoreError::Poisoned);
    repo.set_show_completed(true).await.unwrap();

    let failed = timeout(STEP, stream.next()).await.unwrap().unwrap();
    assert!(matches!(failed, Err(RepoError::Store(StoreError::Poisoned))));
    assert!(timeout(STEP, stream.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_initial_propagates_io_failures() {
    let store = Arc::new(FlakyStore::new());
    let repo = UserPreferencesRepository::new(Arc::clone(&store));

    store.fail_next_read(StoreError::Io(std::io::Error::other("disk gone")));
    let err = repo.fetch_initial().await.unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::Io(_))));
}

#[tokio::test]
async fn corrupted_sort_order_ends_stream_with_error() {
    let repo = memory_repo();
    let mut stream = repo.settings_stream();
    timeout(STEP, stream.next()).await.unwrap().unwrap().unwrap();

    repo.store()
        .edit(Box::new(|prefs: &mut Preferences| {
            prefs.set_str("sort_order", "SIDEWAYS");
            Ok(())
        }))
        .await
        .unwrap();

    let failed = timeout(STEP, stream.next()).await.unwrap().unwrap();
    assert!(matches!(failed, Err(RepoError::InvalidData(_))));
    assert!(timeout(STEP, stream.next()).await.unwrap().is_none());
}
