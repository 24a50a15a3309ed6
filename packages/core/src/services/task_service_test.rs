//! Tests for TaskService task operations
//!
//! Tests cover:
//! - Creation at the end of a sibling group, with depth bound
//! - Toggles and field updates
//! - Subtree deletion with gap closing
//! - Sibling reorders with and without arrangement validation
//! - Reparenting within and across lists, and every rejection path
//! - Intent dispatch

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::db::{
        EntityStore, MemoryStore, StoreChange, StoreError, StoreResult, TaskFilter, WriteBatch,
    };
    use crate::models::{Intent, IntentResult, Task, TaskList, TaskUpdate, UserId};
    use crate::ordering::ArrangementError;
    use crate::services::{Outcome, Rejection, ServiceError, TaskService};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::{broadcast, Mutex};

    /// Helper to create a service over a fresh in-memory store
    fn create_test_service() -> (TaskService, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(store.clone());
        (service, store, UserId::new("alice"))
    }

    async fn list(service: &TaskService, user: &UserId, title: &str) -> TaskList {
        service.create_list(user, title, None).await.unwrap()
    }

    async fn root(service: &TaskService, user: &UserId, list_id: &str, title: &str) -> Task {
        service
            .create_root_task(user, list_id, title, None)
            .await
            .unwrap()
            .applied()
            .expect("root task created")
    }

    async fn child(service: &TaskService, user: &UserId, parent_id: &str, title: &str) -> Task {
        service
            .create_child_task(user, parent_id, title, None)
            .await
            .unwrap()
            .applied()
            .expect("child task created")
    }

    /// Every task of the user, sorted by id, for before/after comparisons
    async fn all_tasks(store: &MemoryStore, user: &UserId) -> Vec<Task> {
        let mut tasks = store.query_tasks(user, &TaskFilter::default()).await.unwrap();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        tasks
    }

    async fn fetch(store: &MemoryStore, user: &UserId, id: &str) -> Task {
        store.get_task(user, id).await.unwrap().expect("task exists")
    }

    fn ids(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_create_root_tasks_append() {
        let (service, _store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;

        let a = root(&service, &user, &work.id, "A").await;
        let b = root(&service, &user, &work.id, "B").await;

        assert_eq!((a.order, b.order), (0, 1));
        assert!(a.path.is_empty());
        assert!(a.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_create_root_task_in_missing_list_is_noop() {
        let (service, store, user) = create_test_service();

        let outcome = service
            .create_root_task(&user, "nope", "A", None)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Rejected(Rejection::list_not_found("nope")));
        assert!(all_tasks(&store, &user).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_child_appends_under_parent() {
        let (service, _store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let p = root(&service, &user, &work.id, "P").await;
        child(&service, &user, &p.id, "C0").await;
        child(&service, &user, &p.id, "C1").await;

        let c2 = service
            .create_child_task(&user, &p.id, "C2", Some("local-7".to_string()))
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(c2.order, 2);
        assert_eq!(c2.path, vec![p.id.clone()]);
        assert_eq!(c2.parent_id.as_deref(), Some(p.id.as_str()));
        assert_eq!(c2.list_id, work.id);
        assert_eq!(c2.client_id.as_deref(), Some("local-7"));
    }

    #[tokio::test]
    async fn test_create_child_at_max_depth_leaves_store_unchanged() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let d1 = root(&service, &user, &work.id, "1").await;
        let d2 = child(&service, &user, &d1.id, "2").await;
        let d3 = child(&service, &user, &d2.id, "3").await;
        let d4 = child(&service, &user, &d3.id, "4").await;
        assert_eq!(d4.depth(), 4);

        let before = all_tasks(&store, &user).await;
        let outcome = service
            .create_child_task(&user, &d4.id, "5", None)
            .await
            .unwrap();

        assert_eq!(
            outcome.rejection(),
            Some(&Rejection::DepthExceeded {
                depth: 5,
                max_depth: 4
            })
        );
        assert_eq!(all_tasks(&store, &user).await, before);
    }

    #[tokio::test]
    async fn test_create_child_of_missing_parent_is_noop() {
        let (service, _store, user) = create_test_service();

        let outcome = service
            .create_child_task(&user, "ghost", "x", None)
            .await
            .unwrap();
        assert_eq!(outcome.applied(), None);
    }

    #[tokio::test]
    async fn test_raising_max_depth_allows_deeper_children() {
        let (service, _store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let d1 = root(&service, &user, &work.id, "1").await;
        let d2 = child(&service, &user, &d1.id, "2").await;

        service.set_max_depth(2).unwrap();
        let rejected = service.create_child_task(&user, &d2.id, "3", None).await.unwrap();
        assert!(!rejected.is_applied());

        // Lowering the bound did not touch the existing depth-2 task
        assert!(service.get_task(&user, &d2.id).await.unwrap().is_some());

        service.set_max_depth(3).unwrap();
        let accepted = service.create_child_task(&user, &d2.id, "3", None).await.unwrap();
        assert!(accepted.is_applied());

        assert!(service.set_max_depth(0).is_err());
        assert_eq!(service.max_depth(), 3);
    }

    #[tokio::test]
    async fn test_toggles_flip_and_report_value() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;

        assert_eq!(
            service.toggle_complete(&user, &a.id).await.unwrap(),
            Outcome::Applied(true)
        );
        assert_eq!(
            service.toggle_complete(&user, &a.id).await.unwrap(),
            Outcome::Applied(false)
        );
        assert_eq!(
            service.toggle_collapse(&user, &a.id).await.unwrap(),
            Outcome::Applied(true)
        );

        let stored = fetch(&store, &user, &a.id).await;
        assert!(!stored.completed);
        assert!(stored.collapsed);

        let missing = service.toggle_complete(&user, "ghost").await.unwrap();
        assert_eq!(missing, Outcome::Rejected(Rejection::task_not_found("ghost")));
    }

    #[tokio::test]
    async fn test_update_task_merges_fields() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;

        assert!(service
            .rename_task(&user, &a.id, "Renamed")
            .await
            .unwrap()
            .is_applied());
        let outcome = service
            .update_task(
                &user,
                &a.id,
                TaskUpdate {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.is_applied());

        let stored = fetch(&store, &user, &a.id).await;
        assert_eq!(stored.title, "Renamed");
        assert!(stored.completed);
        assert_eq!(stored.order, a.order);
    }

    #[tokio::test]
    async fn test_delete_middle_root_closes_gap() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let first = root(&service, &user, &work.id, "0").await;
        let a = root(&service, &user, &work.id, "A").await;
        let third = root(&service, &user, &work.id, "2").await;
        let fourth = root(&service, &user, &work.id, "3").await;
        let a1 = child(&service, &user, &a.id, "A1").await;
        let a1a = child(&service, &user, &a1.id, "A1a").await;

        let outcome = service.delete_task_subtree(&user, &a.id).await.unwrap();
        assert_eq!(outcome, Outcome::Applied(3));

        for gone in [&a, &a1, &a1a] {
            assert!(store.get_task(&user, &gone.id).await.unwrap().is_none());
        }
        let remaining = service.children(&user, &work.id, None).await.unwrap();
        assert_eq!(ids(&remaining), vec![first.id, third.id, fourth.id]);
        let orders: Vec<i64> = remaining.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reorder_siblings_swaps_ranks() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let b = root(&service, &user, &work.id, "B").await;

        let outcome = service
            .reorder_siblings(&user, &work.id, None, &[b.id.clone(), a.id.clone()])
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(fetch(&store, &user, &a.id).await.order, 1);
        assert_eq!(fetch(&store, &user, &b.id).await.order, 0);
    }

    #[tokio::test]
    async fn test_reorder_siblings_rejects_foreign_ids() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let b = root(&service, &user, &work.id, "B").await;
        let a1 = child(&service, &user, &a.id, "A1").await;

        let before = all_tasks(&store, &user).await;
        let outcome = service
            .reorder_siblings(&user, &work.id, None, &[a1.id.clone(), b.id.clone()])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::SiblingSetMismatch(ArrangementError::UnknownId(
                a1.id.clone()
            )))
        );
        assert_eq!(all_tasks(&store, &user).await, before);
    }

    #[tokio::test]
    async fn test_reorder_without_validation_trusts_caller() {
        let store = Arc::new(MemoryStore::new());
        let config = EngineConfig {
            validate_reorders: false,
            ..Default::default()
        };
        let service = TaskService::with_config(store.clone(), &config).unwrap();
        assert!(!service.validates_reorders());
        let user = UserId::new("alice");
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let b = root(&service, &user, &work.id, "B").await;

        // Partial arrangement: only `b` is named, so it alone gets rank 0
        let outcome = service
            .reorder_siblings(&user, &work.id, None, &[b.id.clone()])
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(fetch(&store, &user, &a.id).await.order, 0);
        assert_eq!(fetch(&store, &user, &b.id).await.order, 0);
    }

    #[tokio::test]
    async fn test_reparent_under_deep_target_is_rejected() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let a1 = child(&service, &user, &a.id, "A1").await;
        child(&service, &user, &a1.id, "A1a").await;
        let x = root(&service, &user, &work.id, "X").await;
        let x1 = child(&service, &user, &x.id, "X1").await;
        let c = child(&service, &user, &x1.id, "C").await;
        assert_eq!(c.depth(), 3);

        let before = all_tasks(&store, &user).await;
        let outcome = service
            .reparent_subtree(&user, &a.id, &work.id, Some(&c.id), None)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::DepthExceeded {
                depth: 6,
                max_depth: 4
            })
        );
        assert_eq!(all_tasks(&store, &user).await, before);
    }

    #[tokio::test]
    async fn test_reparent_into_own_subtree_is_rejected() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let a1 = child(&service, &user, &a.id, "A1").await;

        let before = all_tasks(&store, &user).await;

        let into_child = service
            .reparent_subtree(&user, &a.id, &work.id, Some(&a1.id), None)
            .await
            .unwrap();
        assert_eq!(
            into_child,
            Outcome::Rejected(Rejection::Cycle {
                task_id: a.id.clone(),
                target_id: a1.id.clone()
            })
        );

        let into_self = service
            .reparent_subtree(&user, &a.id, &work.id, Some(&a.id), None)
            .await
            .unwrap();
        assert_eq!(
            into_self,
            Outcome::Rejected(Rejection::SelfParent {
                task_id: a.id.clone()
            })
        );

        assert_eq!(all_tasks(&store, &user).await, before);
    }

    #[tokio::test]
    async fn test_reparent_rejects_missing_and_mismatched_targets() {
        let (service, _store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let home = list(&service, &user, "Home").await;
        let a = root(&service, &user, &work.id, "A").await;
        let h = root(&service, &user, &home.id, "H").await;

        let ghost_parent = service
            .reparent_subtree(&user, &a.id, &work.id, Some("ghost"), None)
            .await
            .unwrap();
        assert_eq!(ghost_parent.rejection(), Some(&Rejection::parent_not_found("ghost")));

        let ghost_task = service
            .reparent_subtree(&user, "ghost", &work.id, None, None)
            .await
            .unwrap();
        assert_eq!(ghost_task.rejection(), Some(&Rejection::task_not_found("ghost")));

        let ghost_list = service
            .reparent_subtree(&user, &a.id, "ghost", None, None)
            .await
            .unwrap();
        assert_eq!(ghost_list.rejection(), Some(&Rejection::list_not_found("ghost")));

        let mismatch = service
            .reparent_subtree(&user, &a.id, &work.id, Some(&h.id), None)
            .await
            .unwrap();
        assert!(matches!(
            mismatch.rejection(),
            Some(Rejection::ListMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_reparent_across_lists_moves_subtree() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let home = list(&service, &user, "Home").await;
        let w0 = root(&service, &user, &work.id, "W0").await;
        let a = root(&service, &user, &work.id, "A").await;
        let w2 = root(&service, &user, &work.id, "W2").await;
        let a1 = child(&service, &user, &a.id, "A1").await;
        let a1a = child(&service, &user, &a1.id, "A1a").await;
        let h = root(&service, &user, &home.id, "H").await;
        let h0 = child(&service, &user, &h.id, "H0").await;
        let h1 = child(&service, &user, &h.id, "H1").await;

        let outcome = service
            .reparent_subtree(&user, &a.id, &home.id, Some(&h.id), Some(1))
            .await
            .unwrap();
        assert!(outcome.is_applied());

        let moved = fetch(&store, &user, &a.id).await;
        assert_eq!(moved.list_id, home.id);
        assert_eq!(moved.parent_id.as_deref(), Some(h.id.as_str()));
        assert_eq!(moved.path, vec![h.id.clone()]);
        assert_eq!(moved.order, 1);

        let moved_a1a = fetch(&store, &user, &a1a.id).await;
        assert_eq!(moved_a1a.list_id, home.id);
        assert_eq!(moved_a1a.path, vec![h.id.clone(), a.id.clone(), a1.id.clone()]);

        let under_h = service.children(&user, &home.id, Some(&h.id)).await.unwrap();
        assert_eq!(ids(&under_h), vec![h0.id, a.id.clone(), h1.id]);

        let work_roots = service.children(&user, &work.id, None).await.unwrap();
        assert_eq!(ids(&work_roots), vec![w0.id, w2.id.clone()]);
        assert_eq!(fetch(&store, &user, &w2.id).await.order, 1);

        assert!(service.tasks_in_list(&user, &work.id).await.unwrap().len() == 2);
    }

    #[tokio::test]
    async fn test_reparent_within_group_is_positional_move() {
        let (service, _store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let b = root(&service, &user, &work.id, "B").await;
        let c = root(&service, &user, &work.id, "C").await;

        let outcome = service
            .reparent_subtree(&user, &a.id, &work.id, None, Some(2))
            .await
            .unwrap();
        assert!(outcome.is_applied());

        let roots = service.children(&user, &work.id, None).await.unwrap();
        assert_eq!(ids(&roots), vec![b.id, c.id, a.id]);
        let orders: Vec<i64> = roots.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reparent_child_to_top_level_appends() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;
        let a0 = child(&service, &user, &a.id, "A0").await;
        let a1 = child(&service, &user, &a.id, "A1").await;
        let a1x = child(&service, &user, &a1.id, "A1x").await;

        let outcome = service
            .reparent_subtree(&user, &a1.id, &work.id, None, None)
            .await
            .unwrap();
        assert!(outcome.is_applied());

        let promoted = fetch(&store, &user, &a1.id).await;
        assert!(promoted.parent_id.is_none());
        assert!(promoted.path.is_empty());
        assert_eq!(promoted.order, 1);
        assert_eq!(fetch(&store, &user, &a1x.id).await.path, vec![a1.id.clone()]);
        assert_eq!(fetch(&store, &user, &a0.id).await.order, 0);
    }

    #[tokio::test]
    async fn test_apply_dispatches_intents() {
        let (service, store, user) = create_test_service();

        let created = service
            .apply(
                &user,
                Intent::CreateList {
                    title: "Work".to_string(),
                    client_id: None,
                },
            )
            .await
            .unwrap();
        let Outcome::Applied(IntentResult::Created { id: list_id }) = created else {
            panic!("expected a created list");
        };

        let task = service
            .apply(
                &user,
                Intent::CreateRootTask {
                    list_id: list_id.clone(),
                    title: "A".to_string(),
                    client_id: None,
                },
            )
            .await
            .unwrap();
        let Outcome::Applied(IntentResult::Created { id: task_id }) = task else {
            panic!("expected a created task");
        };

        let toggled = service
            .apply(
                &user,
                Intent::ToggleComplete {
                    task_id: task_id.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(toggled, Outcome::Applied(IntentResult::Toggled { value: true }));

        let deleted = service
            .apply(&user, Intent::DeleteList { list_id })
            .await
            .unwrap();
        assert_eq!(deleted, Outcome::Applied(IntentResult::Deleted { count: 1 }));
        assert!(store.get_task(&user, &task_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lowering_max_depth_keeps_deeper_tasks_usable() {
        let (service, store, user) = create_test_service();
        let work = list(&service, &user, "Work").await;
        let d1 = root(&service, &user, &work.id, "1").await;
        let d2 = child(&service, &user, &d1.id, "2").await;
        let d3a = child(&service, &user, &d2.id, "3a").await;
        let d3b = child(&service, &user, &d2.id, "3b").await;

        service.set_max_depth(2).unwrap();

        // Nothing deeper than the new bound is removed or rewritten
        assert_eq!(fetch(&store, &user, &d3a.id).await, d3a);
        assert_eq!(fetch(&store, &user, &d3b.id).await, d3b);

        let reordered = service
            .reorder_siblings(&user, &work.id, Some(&d2.id), &[d3b.id.clone(), d3a.id.clone()])
            .await
            .unwrap();
        assert!(reordered.is_applied());
        assert_eq!(fetch(&store, &user, &d3b.id).await.order, 0);
        assert_eq!(fetch(&store, &user, &d3a.id).await.order, 1);

        let before = all_tasks(&store, &user).await;
        let outcome = service
            .create_child_task(&user, &d3a.id, "4", None)
            .await
            .unwrap();
        assert_eq!(
            outcome.rejection(),
            Some(&Rejection::DepthExceeded {
                depth: 4,
                max_depth: 2
            })
        );
        assert_eq!(all_tasks(&store, &user).await, before);
    }

    /// Store that interferes with the next commit: another session removes a
    /// task right before the batch lands, or the backend goes away
    struct RacingStore {
        inner: Arc<MemoryStore>,
        pending_removal: Mutex<Option<String>>,
        fail_next_commit: Mutex<bool>,
    }

    impl RacingStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                pending_removal: Mutex::new(None),
                fail_next_commit: Mutex::new(false),
            }
        }

        async fn remove_before_next_commit(&self, id: &str) {
            *self.pending_removal.lock().await = Some(id.to_string());
        }

        async fn go_offline_for_next_commit(&self) {
            *self.fail_next_commit.lock().await = true;
        }
    }

    #[async_trait]
    impl EntityStore for RacingStore {
        async fn get_list(&self, user: &UserId, id: &str) -> StoreResult<Option<TaskList>> {
            self.inner.get_list(user, id).await
        }

        async fn lists(&self, user: &UserId) -> StoreResult<Vec<TaskList>> {
            self.inner.lists(user).await
        }

        async fn get_task(&self, user: &UserId, id: &str) -> StoreResult<Option<Task>> {
            self.inner.get_task(user, id).await
        }

        async fn query_tasks(&self, user: &UserId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
            self.inner.query_tasks(user, filter).await
        }

        async fn tasks_with_ancestor(
            &self,
            user: &UserId,
            ancestor_id: &str,
        ) -> StoreResult<Vec<Task>> {
            self.inner.tasks_with_ancestor(user, ancestor_id).await
        }

        async fn commit(&self, user: &UserId, batch: WriteBatch) -> StoreResult<()> {
            if std::mem::take(&mut *self.fail_next_commit.lock().await) {
                return Err(StoreError::unavailable("connection dropped"));
            }
            if let Some(id) = self.pending_removal.lock().await.take() {
                let mut removal = WriteBatch::new();
                removal.delete_task(id);
                self.inner.commit(user, removal).await?;
            }
            self.inner.commit(user, batch).await
        }

        fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
            self.inner.subscribe_changes()
        }
    }

    fn create_racing_service() -> (TaskService, Arc<RacingStore>, Arc<MemoryStore>, UserId) {
        let inner = Arc::new(MemoryStore::new());
        let racing = Arc::new(RacingStore::new(inner.clone()));
        let service = TaskService::new(racing.clone());
        (service, racing, inner, UserId::new("alice"))
    }

    #[tokio::test]
    async fn test_delete_subtree_tolerates_concurrently_removed_descendant() {
        let (service, racing, inner, user) = create_racing_service();
        let work = list(&service, &user, "Work").await;
        let p = root(&service, &user, &work.id, "P").await;
        let c = child(&service, &user, &p.id, "C").await;
        let d = child(&service, &user, &p.id, "D").await;

        racing.remove_before_next_commit(&c.id).await;
        let outcome = service.delete_task_subtree(&user, &p.id).await.unwrap();

        assert!(outcome.is_applied());
        for gone in [&p, &c, &d] {
            assert!(inner.get_task(&user, &gone.id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_delete_list_tolerates_concurrently_removed_task() {
        let (service, racing, inner, user) = create_racing_service();
        let doomed = list(&service, &user, "Doomed").await;
        let kept = list(&service, &user, "Kept").await;
        let a = root(&service, &user, &doomed.id, "A").await;
        let b = root(&service, &user, &doomed.id, "B").await;

        racing.remove_before_next_commit(&a.id).await;
        let outcome = service.delete_list(&user, &doomed.id).await.unwrap();

        assert!(outcome.is_applied());
        assert!(inner.get_list(&user, &doomed.id).await.unwrap().is_none());
        assert!(inner.get_task(&user, &b.id).await.unwrap().is_none());
        let remaining = service.lists(&user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept.id);
        assert_eq!(remaining[0].order, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_error_not_rejection() {
        let (service, racing, inner, user) = create_racing_service();
        let work = list(&service, &user, "Work").await;
        let a = root(&service, &user, &work.id, "A").await;

        racing.go_offline_for_next_commit().await;
        let err = service.rename_task(&user, &a.id, "Renamed").await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Store(StoreError::Unavailable { .. })
        ));
        assert_eq!(fetch(&inner, &user, &a.id).await.title, "A");

        // The next attempt goes through
        assert!(service
            .rename_task(&user, &a.id, "Renamed")
            .await
            .unwrap()
            .is_applied());
    }
}
