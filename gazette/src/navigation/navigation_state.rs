use crate::Action;

/// Where the view layer is. Only the sagas' redirects and "go back" need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    SignIn,
    Publication {
        publication_id: String,
    },
    NewArticle {
        publication_id: String,
    },
    EditArticle {
        publication_id: String,
        article_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    Push(Route),
    Replace(Route),
    Back,
}

impl Action for NavigationAction {
    fn kind(&self) -> &'static str {
        match self {
            NavigationAction::Push(_) => "navigation/push",
            NavigationAction::Replace(_) => "navigation/replace",
            NavigationAction::Back => "navigation/back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    history: Vec<Route>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            history: vec![Route::Home],
        }
    }
}

impl NavigationState {
    pub fn location(&self) -> &Route {
        self.history.last().unwrap_or(&Route::Home)
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    pub fn reduce(mut self, action: &NavigationAction) -> Self {
        match action {
            NavigationAction::Push(route) => self.history.push(route.clone()),
            NavigationAction::Replace(route) => {
                self.history.pop();
                self.history.push(route.clone());
            }
            NavigationAction::Back => {
                if self.can_go_back() {
                    self.history.pop();
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(id: &str) -> Route {
        Route::Publication {
            publication_id: id.to_string(),
        }
    }

    #[test]
    fn test_push_and_back() {
        let state = NavigationState::default()
            .reduce(&NavigationAction::Push(publication("p1")))
            .reduce(&NavigationAction::Push(Route::NewArticle {
                publication_id: "p1".into(),
            }));
        assert!(matches!(state.location(), Route::NewArticle { .. }));

        let state = state.reduce(&NavigationAction::Back);
        assert_eq!(state.location(), &publication("p1"));
    }

    #[test]
    fn test_replace_keeps_depth() {
        let state = NavigationState::default().reduce(&NavigationAction::Replace(publication("p2")));
        assert_eq!(state.location(), &publication("p2"));
        assert!(!state.can_go_back());
    }

    #[test]
    fn test_back_on_root_is_noop() {
        let state = NavigationState::default().reduce(&NavigationAction::Back);
        assert_eq!(state, NavigationState::default());
    }
}
