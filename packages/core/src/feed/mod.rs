//! Change Feed
//!
//! Live, full-snapshot subscriptions over one user's lists or tasks.
//!
//! Each feed emits the current snapshot immediately (even when empty) and
//! then a fresh snapshot after every committed batch that touched its
//! collection for its user. Snapshots are complete, never diffs, so a
//! subscriber that falls behind the store's broadcast channel just re-reads
//! and loses nothing.
//!
//! The list and task feeds are independent streams; no ordering between them
//! is guaranteed, and a snapshot is not causally tied to the subscriber's own
//! writes.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::db::{Collection, EntityStore, StoreResult, TaskFilter};
use crate::models::{Task, TaskList, UserId};
use crate::ordering;

/// Snapshot subscriptions backed by an [`EntityStore`]
#[derive(Clone)]
pub struct ChangeFeed {
    store: Arc<dyn EntityStore>,
}

impl ChangeFeed {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Stream of the user's lists, sorted by rank
    pub fn list_snapshots(
        &self,
        user: UserId,
    ) -> impl Stream<Item = StoreResult<Vec<TaskList>>> + Send + 'static {
        snapshot_stream(self.store.clone(), user, Collection::Lists, read_lists)
    }

    /// Stream of all the user's tasks, sorted by list, depth, then rank
    pub fn task_snapshots(
        &self,
        user: UserId,
    ) -> impl Stream<Item = StoreResult<Vec<Task>>> + Send + 'static {
        snapshot_stream(self.store.clone(), user, Collection::Tasks, read_tasks)
    }

    /// Invoke `callback` with every list snapshot until unsubscribed
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_lists<F>(&self, user: UserId, callback: F) -> Subscription
    where
        F: FnMut(Vec<TaskList>) + Send + 'static,
    {
        Subscription::spawn(
            self.list_snapshots(user.clone()),
            Collection::Lists,
            user,
            callback,
        )
    }

    /// Invoke `callback` with every task snapshot until unsubscribed
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_tasks<F>(&self, user: UserId, callback: F) -> Subscription
    where
        F: FnMut(Vec<Task>) + Send + 'static,
    {
        Subscription::spawn(
            self.task_snapshots(user.clone()),
            Collection::Tasks,
            user,
            callback,
        )
    }
}

/// Handle to a running callback subscription
///
/// Dropping the handle, or calling [`Subscription::unsubscribe`], stops
/// delivery and releases the underlying broadcast receiver.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    user: UserId,
    handle: JoinHandle<()>,
}

impl Subscription {
    fn spawn<T, S, F>(stream: S, collection: Collection, user: UserId, mut callback: F) -> Self
    where
        T: Send + 'static,
        S: Stream<Item = StoreResult<Vec<T>>> + Send + 'static,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let task_user = user.clone();
        let handle = tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(items) => callback(items),
                    Err(e) => tracing::warn!(
                        "Failed to read {} snapshot for '{}': {}",
                        collection.as_str(),
                        task_user,
                        e
                    ),
                }
            }
        });

        tracing::debug!("Subscribed to {} of '{}'", collection.as_str(), user);
        Self {
            collection,
            user,
            handle,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Whether the subscription is still delivering
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!("Unsubscribed from {} of '{}'", self.collection.as_str(), self.user);
    }
}

fn snapshot_stream<T, F, Fut>(
    store: Arc<dyn EntityStore>,
    user: UserId,
    collection: Collection,
    read: F,
) -> impl Stream<Item = StoreResult<Vec<T>>> + Send + 'static
where
    T: Send + 'static,
    F: Fn(Arc<dyn EntityStore>, UserId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<Vec<T>>> + Send + 'static,
{
    // Subscribe before the initial read so no commit in between is missed
    let mut changes = BroadcastStream::new(store.subscribe_changes());

    async_stream::stream! {
        yield read(store.clone(), user.clone()).await;

        while let Some(change) = changes.next().await {
            match change {
                Ok(change) => {
                    if !change.affects(&user, collection) {
                        continue;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        "{} feed of '{}' lagged by {} change(s), re-reading",
                        collection.as_str(),
                        user,
                        skipped
                    );
                }
            }
            yield read(store.clone(), user.clone()).await;
        }
    }
}

async fn read_lists(store: Arc<dyn EntityStore>, user: UserId) -> StoreResult<Vec<TaskList>> {
    let lists = store.lists(&user).await?;
    Ok(ordering::sorted_by_rank(&lists)
        .into_iter()
        .cloned()
        .collect())
}

async fn read_tasks(store: Arc<dyn EntityStore>, user: UserId) -> StoreResult<Vec<Task>> {
    let mut tasks = store.query_tasks(&user, &TaskFilter::default()).await?;
    tasks.sort_by(|a, b| {
        a.list_id
            .cmp(&b.list_id)
            .then_with(|| a.depth().cmp(&b.depth()))
            .then_with(|| a.order.cmp(&b.order))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, WriteBatch};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn setup() -> (Arc<MemoryStore>, ChangeFeed) {
        let store = Arc::new(MemoryStore::new());
        let feed = ChangeFeed::new(store.clone());
        (store, feed)
    }

    async fn put_list(store: &MemoryStore, user: &UserId, id: &str, order: i64) {
        let mut batch = WriteBatch::new();
        batch.put_list(TaskList::new(id, id, order));
        store.commit(user, batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_emitted_when_empty() {
        let (_store, feed) = setup();
        let stream = feed.list_snapshots(UserId::new("alice"));
        tokio::pin!(stream);

        let first = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("initial snapshot")
            .unwrap()
            .unwrap();
        assert!(first.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_follows_commit_sorted_by_rank() {
        let (store, feed) = setup();
        let user = UserId::new("alice");
        let stream = feed.list_snapshots(user.clone());
        tokio::pin!(stream);
        timeout(Duration::from_secs(1), stream.next()).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put_list(TaskList::new("b", "B", 1))
            .put_list(TaskList::new("a", "A", 0));
        store.commit(&user, batch).await.unwrap();

        let snapshot = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("snapshot after commit")
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = snapshot.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_other_users_and_collections_do_not_emit() {
        let (store, feed) = setup();
        let alice = UserId::new("alice");
        let stream = feed.task_snapshots(alice.clone());
        tokio::pin!(stream);
        timeout(Duration::from_secs(1), stream.next()).await.unwrap();

        // A list write for alice and any write for bob are both irrelevant
        put_list(&store, &alice, "l", 0).await;
        put_list(&store, &UserId::new("bob"), "l", 0).await;

        let next = timeout(Duration::from_millis(100), stream.next()).await;
        assert!(next.is_err(), "task feed must stay quiet");
    }

    #[tokio::test]
    async fn test_subscription_delivers_until_unsubscribed() {
        let (store, feed) = setup();
        let user = UserId::new("alice");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let subscription = feed.subscribe_lists(user.clone(), move |lists| {
            let _ = tx.send(lists.len());
        });
        assert_eq!(subscription.collection(), Collection::Lists);

        let initial = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(initial, Some(0));

        put_list(&store, &user, "l", 0).await;
        let after = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(after, Some(1));

        subscription.unsubscribe();
        put_list(&store, &user, "m", 1).await;

        // The callback, and with it the sender, is gone
        let closed = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(closed, None);
    }
}
