//! Client composition root.
//!
//! [`EventsClient`] wires the session, the subscription manager and one
//! mutation coordinator per screen from provider handles passed in by the
//! caller. It owns two views: the dashboard (all events or the user's own)
//! and the favorites list.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::document::EVENTS_COLLECTION;
use crate::error::Result;
use crate::filter::DashboardScope;
use crate::mutation::MutationCoordinator;
use crate::session::Session;
use crate::store::DocumentStore;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use crate::view::LocalViewState;
use crate::{CollectionHandle, Document};

/// A screen backed by a live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Dashboard,
    Favorites,
}

#[derive(Debug, Clone)]
struct Feed {
    handle: CollectionHandle,
    subscription_id: SubscriptionId,
}

/// Everything one app instance needs to talk to its providers.
pub struct EventsClient {
    session: Session,
    subscriptions: SubscriptionManager,
    dashboard: MutationCoordinator,
    favorites: MutationCoordinator,
    feeds: Mutex<HashMap<Screen, Feed>>,
}

impl EventsClient {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let coordinator = |view| {
            MutationCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&auth),
                view,
                EVENTS_COLLECTION,
            )
        };
        let dashboard = coordinator(LocalViewState::shared());
        let favorites = coordinator(LocalViewState::shared());

        Self {
            session: Session::new(Arc::clone(&auth)),
            subscriptions: SubscriptionManager::new(Arc::clone(&store)),
            dashboard,
            favorites,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutations against the dashboard view. Creates and edits go here too.
    pub fn dashboard(&self) -> &MutationCoordinator {
        &self.dashboard
    }

    /// Mutations against the favorites view.
    pub fn favorites(&self) -> &MutationCoordinator {
        &self.favorites
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Start (or re-scope) the dashboard feed.
    ///
    /// `Mine` filters on the signed-in uid and falls back to all events when
    /// nobody is signed in. Returns the handle now feeding the view.
    pub async fn open_dashboard(&self, scope: DashboardScope) -> Result<CollectionHandle> {
        let uid = self.session.current_uid().await;
        let handle = scope.handle(uid.as_deref());
        self.open(Screen::Dashboard, handle).await
    }

    /// Start the favorites feed.
    pub async fn open_favorites(&self) -> Result<CollectionHandle> {
        self.open(Screen::Favorites, CollectionHandle::favorites())
            .await
    }

    /// Stop feeding a screen's view. The view keeps its last contents.
    pub async fn close(&self, screen: Screen) -> bool {
        let feed = self.feeds.lock().await.remove(&screen);
        match feed {
            Some(feed) => self.subscriptions.unsubscribe(&feed.subscription_id).await,
            None => false,
        }
    }

    /// Handle currently feeding a screen.
    pub async fn handle(&self, screen: Screen) -> Option<CollectionHandle> {
        self.feeds
            .lock()
            .await
            .get(&screen)
            .map(|feed| feed.handle.clone())
    }

    /// Documents currently shown on a screen.
    pub async fn documents(&self, screen: Screen) -> Vec<Document> {
        self.coordinator(screen).view().lock().await.all().to_vec()
    }

    /// Sign out, close every feed and clear both views.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;

        self.feeds.lock().await.clear();
        self.subscriptions.unsubscribe_all().await;
        for screen in [Screen::Dashboard, Screen::Favorites] {
            self.coordinator(screen)
                .view()
                .lock()
                .await
                .replace(Vec::new());
        }
    }

    fn coordinator(&self, screen: Screen) -> &MutationCoordinator {
        match screen {
            Screen::Dashboard => &self.dashboard,
            Screen::Favorites => &self.favorites,
        }
    }

    async fn open(&self, screen: Screen, handle: CollectionHandle) -> Result<CollectionHandle> {
        let mut feeds = self.feeds.lock().await;

        if let Some(feed) = feeds.get(&screen) {
            if feed.handle == handle && self.subscriptions.is_live(&feed.subscription_id) {
                return Ok(handle);
            }
        }
        if let Some(previous) = feeds.remove(&screen) {
            self.subscriptions
                .unsubscribe(&previous.subscription_id)
                .await;
        }

        let view = Arc::clone(self.coordinator(screen).view());
        let subscription_id = self.subscriptions.sync_into(handle.clone(), view).await?;
        tracing::debug!(
            screen = ?screen,
            subscription_id = %subscription_id,
            filter = ?handle.filter,
            "Feed opened"
        );

        feeds.insert(
            screen,
            Feed {
                handle: handle.clone(),
                subscription_id,
            },
        );
        Ok(handle)
    }
}
