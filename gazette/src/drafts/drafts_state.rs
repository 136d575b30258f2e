use crate::models::{Article, ArticleDraft, Author, FullArticle};
use crate::Action;
use im::OrdMap;
use std::fmt;
use std::sync::Arc;

/// Draft key of the article being created.
pub const NEW_ARTICLE_ID: &str = "";

/// A shallow partial update. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub authors: Option<Vec<Author>>,
    pub header_image: Option<Option<String>>,
    pub content: Option<String>,
}

impl DraftPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = Some(authors);
        self
    }

    pub fn header_image(mut self, header_image: Option<String>) -> Self {
        self.header_image = Some(header_image);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn apply(self, draft: ArticleDraft) -> ArticleDraft {
        ArticleDraft {
            title: self.title.unwrap_or(draft.title),
            authors: self.authors.unwrap_or(draft.authors),
            header_image: self.header_image.unwrap_or(draft.header_image),
            content: self.content.unwrap_or(draft.content),
        }
    }
}

type PatchFn = dyn Fn(&ArticleDraft) -> DraftPatch + Send + Sync;

/// Computes a patch from the draft as it is when the update is reduced, so
/// updates queued back to back build on each other.
#[derive(Clone)]
pub struct DraftUpdater(Arc<PatchFn>);

impl DraftUpdater {
    pub fn new<F>(updater: F) -> Self
    where
        F: Fn(&ArticleDraft) -> DraftPatch + Send + Sync + 'static,
    {
        Self(Arc::new(updater))
    }

    /// An updater that ignores the current draft.
    pub fn patch(patch: DraftPatch) -> Self {
        Self::new(move |_| patch.clone())
    }

    pub fn apply(&self, draft: ArticleDraft) -> ArticleDraft {
        (self.0)(&draft).apply(draft)
    }
}

impl fmt::Debug for DraftUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DraftUpdater(..)")
    }
}

impl PartialEq for DraftUpdater {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftsAction {
    Load {
        publication_id: String,
        article_id: String,
    },
    /// Seeds a draft from `source`, or from the blank template. An existing
    /// draft for the id is kept.
    Create {
        article_id: String,
        source: Option<Article>,
    },
    Update {
        article_id: String,
        updater: DraftUpdater,
    },
    Discard {
        article_id: String,
    },
    Submit {
        publication_id: String,
        article_id: String,
    },
    StartSubmit {
        article_id: String,
    },
    ReceiveSubmitSuccess {
        article_id: String,
        article: FullArticle,
        is_new: bool,
    },
    ReceiveSubmitError {
        article_id: String,
    },
}

impl Action for DraftsAction {
    fn kind(&self) -> &'static str {
        match self {
            DraftsAction::Load { .. } => "drafts/load",
            DraftsAction::Create { .. } => "drafts/create",
            DraftsAction::Update { .. } => "drafts/update",
            DraftsAction::Discard { .. } => "drafts/discard",
            DraftsAction::Submit { .. } => "drafts/submit",
            DraftsAction::StartSubmit { .. } => "drafts/start-submit",
            DraftsAction::ReceiveSubmitSuccess { .. } => "drafts/receive-submit-success",
            DraftsAction::ReceiveSubmitError { .. } => "drafts/receive-submit-error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftsState {
    pub drafts: OrdMap<String, ArticleDraft>,
    pub submitting: Vec<String>,
}

impl DraftsState {
    fn without_submitting(mut self, article_id: &str) -> Self {
        self.submitting.retain(|id| id != article_id);
        self
    }

    pub fn reduce(self, action: &DraftsAction) -> Self {
        match action {
            DraftsAction::Load { .. } | DraftsAction::Submit { .. } => self,
            DraftsAction::Create { article_id, source } => {
                if self.drafts.contains_key(article_id) {
                    return self;
                }
                let draft = source
                    .as_ref()
                    .map(ArticleDraft::from)
                    .unwrap_or_else(ArticleDraft::empty);
                Self {
                    drafts: self.drafts.update(article_id.clone(), draft),
                    ..self
                }
            }
            DraftsAction::Update {
                article_id,
                updater,
            } => match self.drafts.get(article_id) {
                Some(draft) => {
                    let draft = updater.apply(draft.clone());
                    Self {
                        drafts: self.drafts.update(article_id.clone(), draft),
                        ..self
                    }
                }
                None => self,
            },
            DraftsAction::Discard { article_id }
            | DraftsAction::ReceiveSubmitSuccess { article_id, .. } => {
                let mut state = self.without_submitting(article_id);
                state.drafts.remove(article_id);
                state
            }
            DraftsAction::StartSubmit { article_id } => {
                if self.submitting.contains(article_id) {
                    return self;
                }
                let mut state = self;
                state.submitting.push(article_id.clone());
                state
            }
            DraftsAction::ReceiveSubmitError { article_id } => self.without_submitting(article_id),
        }
    }
}

pub fn select_draft(state: &DraftsState, article_id: &str) -> Option<ArticleDraft> {
    state.drafts.get(article_id).cloned()
}

pub fn select_is_submitting(state: &DraftsState, article_id: &str) -> bool {
    state.submitting.iter().any(|id| id == article_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortArticle;

    fn article(id: &str) -> Article {
        Article {
            summary: ShortArticle {
                id: id.to_string(),
                publication_id: "p1".to_string(),
                title: "Original".to_string(),
                authors: vec![Author::new("Ada", "ada@example.com")],
                publish_date: None,
                header_image: Some("header.png".to_string()),
            },
            content: Some("Body".to_string()),
            edit_date: None,
        }
    }

    fn create(article_id: &str, source: Option<Article>) -> DraftsAction {
        DraftsAction::Create {
            article_id: article_id.to_string(),
            source,
        }
    }

    #[test]
    fn test_create_new_draft_from_template() {
        let state = DraftsState::default().reduce(&create(NEW_ARTICLE_ID, None));
        let draft = select_draft(&state, NEW_ARTICLE_ID).unwrap();
        assert_eq!(draft.authors, vec![Author::default()]);
        assert!(draft.title.is_empty());
    }

    #[test]
    fn test_create_keeps_existing_draft() {
        let state = DraftsState::default()
            .reduce(&create("a1", Some(article("a1"))))
            .reduce(&DraftsAction::Update {
                article_id: "a1".to_string(),
                updater: DraftUpdater::patch(DraftPatch::default().title("Edited")),
            })
            .reduce(&create("a1", Some(article("a1"))));
        assert_eq!(select_draft(&state, "a1").unwrap().title, "Edited");
    }

    #[test]
    fn test_update_patches_current_draft_only() {
        let source = article("a1");
        let state = DraftsState::default()
            .reduce(&create("a1", Some(source.clone())))
            .reduce(&create("a2", Some(article("a2"))));
        let append = DraftUpdater::new(|draft| {
            DraftPatch::default().content(format!("{} and more", draft.content))
        });
        let update = DraftsAction::Update {
            article_id: "a1".to_string(),
            updater: append,
        };
        let state = state.reduce(&update).reduce(&update);

        let draft = select_draft(&state, "a1").unwrap();
        assert_eq!(draft.content, "Body and more and more");
        assert_eq!(draft.title, "Original");
        assert_eq!(draft.header_image.as_deref(), Some("header.png"));
        assert_eq!(select_draft(&state, "a2").unwrap().content, "Body");
        assert_eq!(source.content.as_deref(), Some("Body"));
    }

    #[test]
    fn test_update_can_clear_header_image() {
        let state = DraftsState::default()
            .reduce(&create("a1", Some(article("a1"))))
            .reduce(&DraftsAction::Update {
                article_id: "a1".to_string(),
                updater: DraftUpdater::patch(DraftPatch::default().header_image(None)),
            });
        assert_eq!(select_draft(&state, "a1").unwrap().header_image, None);
    }

    #[test]
    fn test_update_of_missing_draft_is_ignored() {
        let state = DraftsState::default().reduce(&DraftsAction::Update {
            article_id: "a1".to_string(),
            updater: DraftUpdater::patch(DraftPatch::default().title("x")),
        });
        assert_eq!(state, DraftsState::default());
    }

    #[test]
    fn test_submit_lifecycle() {
        let state = DraftsState::default()
            .reduce(&create("a1", Some(article("a1"))))
            .reduce(&DraftsAction::StartSubmit {
                article_id: "a1".to_string(),
            });
        assert!(select_is_submitting(&state, "a1"));

        let failed = state.clone().reduce(&DraftsAction::ReceiveSubmitError {
            article_id: "a1".to_string(),
        });
        assert!(!select_is_submitting(&failed, "a1"));
        assert!(select_draft(&failed, "a1").is_some());

        let full = FullArticle {
            summary: article("a1").summary,
            content: "Body".to_string(),
            edit_date: None,
        };
        let done = state.reduce(&DraftsAction::ReceiveSubmitSuccess {
            article_id: "a1".to_string(),
            article: full,
            is_new: false,
        });
        assert!(!select_is_submitting(&done, "a1"));
        assert!(select_draft(&done, "a1").is_none());
    }

    #[test]
    fn test_discard() {
        let state = DraftsState::default()
            .reduce(&create(NEW_ARTICLE_ID, None))
            .reduce(&DraftsAction::Discard {
                article_id: NEW_ARTICLE_ID.to_string(),
            });
        assert!(state.drafts.is_empty());
    }
}
