use crate::models::Publication;
use crate::{Action, Memo};
use im::OrdMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationsAction {
    /// Fired by the view at startup; an empty id means nothing is pre-selected.
    Select { publication_id: String },
    StartLoading,
    Receive(Vec<Publication>),
    ReceiveError,
}

impl Action for PublicationsAction {
    fn kind(&self) -> &'static str {
        match self {
            PublicationsAction::Select { .. } => "publications/select",
            PublicationsAction::StartLoading => "publications/start-loading",
            PublicationsAction::Receive(_) => "publications/receive",
            PublicationsAction::ReceiveError => "publications/receive-error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationsState {
    pub publications: OrdMap<String, Publication>,
    pub selected_publication_id: String,
    pub is_loading: bool,
}

impl PublicationsState {
    pub fn reduce(self, action: &PublicationsAction) -> Self {
        match action {
            PublicationsAction::Select { publication_id } => Self {
                selected_publication_id: publication_id.clone(),
                ..self
            },
            PublicationsAction::StartLoading => Self {
                is_loading: true,
                ..self
            },
            PublicationsAction::Receive(items) => {
                let mut publications = self.publications;
                for publication in items {
                    publications.insert(publication.id.clone(), publication.clone());
                }
                Self {
                    publications,
                    is_loading: false,
                    ..self
                }
            }
            PublicationsAction::ReceiveError => Self {
                is_loading: false,
                ..self
            },
        }
    }
}

thread_local! {
    static SORTED_PUBLICATIONS: Memo<OrdMap<String, Publication>, Arc<Vec<Publication>>> =
        const { Memo::new() };
}

/// Publications ordered by name, recomputed only when the map changes.
pub fn select_sorted_publications(state: &PublicationsState) -> Arc<Vec<Publication>> {
    SORTED_PUBLICATIONS.with(|memo| {
        memo.get(&state.publications, OrdMap::ptr_eq, |publications| {
            let mut sorted: Vec<Publication> = publications.values().cloned().collect();
            sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            Arc::new(sorted)
        })
    })
}

/// The alphabetically first publication, used when nothing was selected.
pub fn select_default_publication_id(state: &PublicationsState) -> Option<String> {
    select_sorted_publications(state)
        .first()
        .map(|publication| publication.id.clone())
}
