//! Session - explicit current-user context
//!
//! The auth layer is reduced to one value: the signed-in user, or none.
//! While nobody is signed in every intent is a no-op and no feed
//! subscriptions exist. Switching users drops the previous user's
//! subscriptions before anything else happens.

use crate::feed::{ChangeFeed, Subscription};
use crate::models::{Intent, IntentResult, Task, TaskList, UserId};
use crate::services::error::ServiceResult;
use crate::services::outcome::{Outcome, Rejection};
use crate::services::TaskService;

pub struct Session {
    service: TaskService,
    feed: ChangeFeed,
    user: Option<UserId>,
    subscriptions: Vec<Subscription>,
}

impl Session {
    /// A signed-out session over `service`'s store
    pub fn new(service: TaskService) -> Self {
        let feed = ChangeFeed::new(service.store().clone());
        Self {
            service,
            feed,
            user: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Make `user` current, dropping subscriptions of any previous user
    pub fn sign_in(&mut self, user: UserId) {
        if self.user.as_ref() == Some(&user) {
            return;
        }
        self.subscriptions.clear();
        tracing::info!("Signed in as '{}'", user);
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.subscriptions.clear();
        if let Some(user) = self.user.take() {
            tracing::info!("Signed out '{}'", user);
        }
    }

    /// Apply an intent as the current user
    pub async fn apply(&self, intent: Intent) -> ServiceResult<Outcome<IntentResult>> {
        match &self.user {
            Some(user) => self.service.apply(user, intent).await,
            None => Ok(Outcome::rejected(Rejection::NotSignedIn)),
        }
    }

    /// Deliver list snapshots of the current user to `callback`
    pub fn watch_lists<F>(&mut self, callback: F) -> Outcome<()>
    where
        F: FnMut(Vec<TaskList>) + Send + 'static,
    {
        let Some(user) = self.user.clone() else {
            return Outcome::rejected(Rejection::NotSignedIn);
        };
        self.subscriptions
            .push(self.feed.subscribe_lists(user, callback));
        Outcome::Applied(())
    }

    /// Deliver task snapshots of the current user to `callback`
    pub fn watch_tasks<F>(&mut self, callback: F) -> Outcome<()>
    where
        F: FnMut(Vec<Task>) + Send + 'static,
    {
        let Some(user) = self.user.clone() else {
            return Outcome::rejected(Rejection::NotSignedIn);
        };
        self.subscriptions
            .push(self.feed.subscribe_tasks(user, callback));
        Outcome::Applied(())
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }
}
