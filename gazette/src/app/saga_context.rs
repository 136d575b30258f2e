use super::{AppAction, AppState};
use crate::api::ArticleApi;
use crate::config::GazetteConfig;
use crate::identity::IdentityProvider;
use crate::session_storage::SessionStorage;
use crate::toasts::ToastId;
use crate::{ActionStream, GazetteError, StateStore};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Everything a saga needs: the store plus the external collaborators.
#[derive(Clone)]
pub struct SagaContext {
    store: StateStore<AppState>,
    api: Arc<dyn ArticleApi>,
    identity: Arc<dyn IdentityProvider>,
    session: Arc<dyn SessionStorage>,
    config: Arc<GazetteConfig>,
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
    toast_ids: Arc<AtomicU64>,
    in_flight: Arc<Mutex<HashSet<(&'static str, String)>>>,
    shutdown: CancellationToken,
}

impl SagaContext {
    pub fn new(
        store: StateStore<AppState>,
        api: Arc<dyn ArticleApi>,
        identity: Arc<dyn IdentityProvider>,
        session: Arc<dyn SessionStorage>,
        config: GazetteConfig,
    ) -> Self {
        Self {
            store,
            api,
            identity,
            session,
            config: Arc::new(config),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
            toast_ids: Arc::new(AtomicU64::new(1)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &StateStore<AppState> {
        &self.store
    }

    pub fn api(&self) -> &dyn ArticleApi {
        self.api.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn session(&self) -> &dyn SessionStorage {
        self.session.as_ref()
    }

    pub fn config(&self) -> &GazetteConfig {
        &self.config
    }

    /// Serialises token refreshes across sagas.
    pub(crate) fn refresh_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.refresh_gate
    }

    pub fn next_toast_id(&self) -> ToastId {
        self.toast_ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Dispatches and waits for the reducer, so a following `select` sees the change.
    pub async fn put(&self, action: impl Into<AppAction>) -> Result<(), GazetteError> {
        Ok(self.store.put(action.into()).await?)
    }

    pub fn select<T, F>(&self, selector: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        self.store.select(selector)
    }

    pub fn actions(&self) -> ActionStream<AppAction> {
        self.store.subscribe()
    }

    /// Marks `key` as busy for `kind` until the returned guard is dropped.
    ///
    /// Returns `None` when another task already holds it. Claim before the
    /// first await; the check and the insert happen under one lock.
    pub fn claim(&self, kind: &'static str, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = (kind, key.into());
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: self.in_flight.clone(),
            key,
        })
    }

    /// Runs `task` on its own, logging the error that ends it, if any.
    ///
    /// The task is dropped at its next await point once [`SagaContext::cancel_forks`]
    /// has been called.
    pub fn fork<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), GazetteError>> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => debug!(task = name, "forked task cancelled"),
                result = task => {
                    if let Err(error) = result {
                        error!(task = name, %error, "forked task failed");
                    }
                }
            }
        });
    }

    /// Cancels every task started through [`SagaContext::fork`], including
    /// ones forked later.
    pub fn cancel_forks(&self) {
        self.shutdown.cancel();
    }
}

/// Releases an in-flight claim when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<(&'static str, String)>>>,
    key: (&'static str, String),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Forks `worker` for every action `matcher` accepts, so several can run at once.
pub async fn take_every<T, M, W, F>(
    ctx: &SagaContext,
    mut actions: ActionStream<AppAction>,
    name: &'static str,
    mut matcher: M,
    worker: W,
) -> Result<(), GazetteError>
where
    M: FnMut(AppAction) -> Option<T>,
    W: Fn(T) -> F,
    F: Future<Output = Result<(), GazetteError>> + Send + 'static,
{
    loop {
        let payload = actions.take_map(&mut matcher).await?;
        ctx.fork(name, worker(payload));
    }
}
