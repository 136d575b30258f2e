mod error;
mod memo;
mod store;

pub mod api;
pub mod app;
pub mod articles;
pub mod auth;
pub mod config;
pub mod drafts;
pub mod identity;
pub mod mock;
pub mod models;
pub mod navigation;
pub mod publications;
pub mod session_storage;
pub mod toasts;

pub use error::*;
pub use memo::*;
pub use store::*;

pub use app::{AppAction, AppState, GazetteApp, SagaContext};

/// A tree of data owned by a [`StateStore`] and changed only by [`State::reduce`].
pub trait State: Clone + Send + Sync + 'static {
    type Action: Action;

    /// Pure and total: an action the state does not care about returns it unchanged.
    fn reduce(self, action: &Self::Action) -> Self;
}

/// An immutable record of something that happened.
pub trait Action: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Stable discriminator, used for logging.
    fn kind(&self) -> &'static str;
}
