use crate::articles::{ArticlesAction, ArticlesState};
use crate::auth::{AuthAction, AuthState};
use crate::drafts::{DraftsAction, DraftsState};
use crate::navigation::{NavigationAction, NavigationState};
use crate::publications::{PublicationsAction, PublicationsState};
use crate::toasts::{ToastsAction, ToastsState};
use crate::{Action, State};

/// The root state tree. Each branch is owned by its own reducer.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub auth: AuthState,
    pub toasts: ToastsState,
    pub publications: PublicationsState,
    pub articles: ArticlesState,
    pub drafts: DraftsState,
    pub navigation: NavigationState,
}

#[derive(Debug, Clone)]
pub enum AppAction {
    Auth(AuthAction),
    Toasts(ToastsAction),
    Publications(PublicationsAction),
    Articles(ArticlesAction),
    Drafts(DraftsAction),
    Navigation(NavigationAction),
}

macro_rules! app_action_from {
    ($($variant:ident($action:ty)),+ $(,)?) => {
        $(
            impl From<$action> for AppAction {
                fn from(action: $action) -> Self {
                    AppAction::$variant(action)
                }
            }
        )+
    };
}

app_action_from!(
    Auth(AuthAction),
    Toasts(ToastsAction),
    Publications(PublicationsAction),
    Articles(ArticlesAction),
    Drafts(DraftsAction),
    Navigation(NavigationAction),
);

impl Action for AppAction {
    fn kind(&self) -> &'static str {
        match self {
            AppAction::Auth(action) => action.kind(),
            AppAction::Toasts(action) => action.kind(),
            AppAction::Publications(action) => action.kind(),
            AppAction::Articles(action) => action.kind(),
            AppAction::Drafts(action) => action.kind(),
            AppAction::Navigation(action) => action.kind(),
        }
    }
}

impl State for AppState {
    type Action = AppAction;

    fn reduce(self, action: &AppAction) -> Self {
        match action {
            AppAction::Auth(action) => AppState {
                auth: self.auth.reduce(action),
                ..self
            },
            AppAction::Toasts(action) => AppState {
                toasts: self.toasts.reduce(action),
                ..self
            },
            AppAction::Publications(action) => AppState {
                publications: self.publications.reduce(action),
                ..self
            },
            AppAction::Articles(action) => AppState {
                articles: self.articles.reduce(action),
                ..self
            },
            AppAction::Drafts(action) => AppState {
                drafts: self.drafts.reduce(action),
                ..self
            },
            AppAction::Navigation(action) => AppState {
                navigation: self.navigation.reduce(action),
                ..self
            },
        }
    }
}
