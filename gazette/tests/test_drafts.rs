use crate::common::{collect_kinds_until, full_article, Harness};
use gazette::drafts::{
    load_draft, select_draft, select_is_submitting, submit_draft, DraftPatch, DraftUpdater,
    NEW_ARTICLE_ID,
};
use gazette::mock::{ApiCall, MockArticleApi, MockIdentity};
use gazette::models::Author;
use gazette::navigation::Route;

mod common;

#[tokio::test]
async fn test_new_article_starts_from_template() {
    let harness = Harness::with_defaults();
    harness.app.load_draft("p1", NEW_ARTICLE_ID).unwrap();

    let state = harness
        .wait_for(|state| state.drafts.drafts.contains_key(NEW_ARTICLE_ID))
        .await;
    let draft = select_draft(&state.drafts, NEW_ARTICLE_ID).unwrap();
    assert_eq!(draft.authors, vec![Author::default()]);
    assert_eq!(
        state.navigation.location(),
        &Route::NewArticle {
            publication_id: "p1".to_string()
        }
    );
}

#[tokio::test]
async fn test_edit_draft_fetches_article_once() {
    let api = MockArticleApi::new();
    api.add_article(full_article("p1", "a1", "Existing"));
    let harness = Harness::start(api, MockIdentity::new(), false);
    let ctx = harness.app.context().clone();

    load_draft(&ctx, "p1", "a1").await.unwrap();
    let state = harness.settle().await;
    let draft = select_draft(&state.drafts, "a1").unwrap();
    assert_eq!(draft.title, "Existing");
    assert_eq!(draft.content, "Content of Existing");
    assert!(state.articles.get("a1").unwrap().is_full());

    harness
        .app
        .update_draft("a1", DraftUpdater::patch(DraftPatch::default().title("Edited")))
        .unwrap();
    harness.settle().await;
    load_draft(&ctx, "p1", "a1").await.unwrap();

    let state = harness.settle().await;
    assert_eq!(select_draft(&state.drafts, "a1").unwrap().title, "Edited");
    assert_eq!(state.articles.get("a1").unwrap().title(), "Existing");
    assert_eq!(harness.api.calls().len(), 1);
}

#[tokio::test]
async fn test_missing_article_navigates_back() {
    let harness = Harness::with_defaults();
    harness.app.load_draft("p1", "gone").unwrap();

    let state = harness
        .wait_for(|state| {
            state.navigation.location() == &Route::Home && !harness.api.calls().is_empty()
        })
        .await;
    assert!(select_draft(&state.drafts, "gone").is_none());
}

#[tokio::test]
async fn test_submit_new_article() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;
    harness.app.load_draft("p1", NEW_ARTICLE_ID).unwrap();
    harness
        .wait_for(|state| state.drafts.drafts.contains_key(NEW_ARTICLE_ID))
        .await;
    harness
        .app
        .update_draft(
            NEW_ARTICLE_ID,
            DraftUpdater::new(|draft| {
                DraftPatch::default()
                    .title("Fresh")
                    .content(format!("{}Hello", draft.content))
            }),
        )
        .unwrap();
    let token = harness.settle().await.auth.token;

    let mut actions = harness.app.store().subscribe();
    harness.app.submit_draft("p1", NEW_ARTICLE_ID).unwrap();
    let kinds = collect_kinds_until(&mut actions, "navigation/back").await;
    let position = |kind: &str| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(position("drafts/start-submit") < position("drafts/receive-submit-success"));
    assert!(position("drafts/receive-submit-success") < position("articles/receive-article"));
    assert!(position("articles/receive-article") < position("navigation/back"));

    let mutations = harness.api.mutations();
    assert_eq!(mutations.len(), 1);
    match &mutations[0] {
        ApiCall::CreateArticle {
            publication_id,
            draft,
            token: sent,
        } => {
            assert_eq!(publication_id, "p1");
            assert_eq!(draft.title, "Fresh");
            assert_eq!(draft.content, "Hello");
            assert_eq!(sent, &token);
        }
        other => panic!("unexpected call {other:?}"),
    }

    let state = harness.settle().await;
    assert!(select_draft(&state.drafts, NEW_ARTICLE_ID).is_none());
    assert!(!select_is_submitting(&state.drafts, NEW_ARTICLE_ID));
    assert_eq!(state.navigation.location(), &Route::Home);
    assert_eq!(state.articles.get("created-1").unwrap().title(), "Fresh");
}

#[tokio::test]
async fn test_joined_submits_create_one_article() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;
    harness.app.load_draft("p1", NEW_ARTICLE_ID).unwrap();
    harness
        .wait_for(|state| state.drafts.drafts.contains_key(NEW_ARTICLE_ID))
        .await;
    let ctx = harness.app.context().clone();

    let (first, second) = tokio::join!(
        submit_draft(&ctx, "p1", NEW_ARTICLE_ID),
        submit_draft(&ctx, "p1", NEW_ARTICLE_ID)
    );
    first.unwrap();
    second.unwrap();
    assert_eq!(harness.api.mutations().len(), 1);
    let state = harness.settle().await;
    assert!(state.articles.get("created-1").is_some());
    assert!(state.articles.get("created-2").is_none());
}

#[tokio::test]
async fn test_repeated_submit_actions_create_one_article() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;
    harness.app.load_draft("p1", NEW_ARTICLE_ID).unwrap();
    harness
        .wait_for(|state| state.drafts.drafts.contains_key(NEW_ARTICLE_ID))
        .await;

    let mut actions = harness.app.store().subscribe();
    harness.app.submit_draft("p1", NEW_ARTICLE_ID).unwrap();
    harness.app.submit_draft("p1", NEW_ARTICLE_ID).unwrap();
    collect_kinds_until(&mut actions, "navigation/back").await;
    harness.settle().await;
    assert_eq!(harness.api.mutations().len(), 1);
}

#[tokio::test]
async fn test_submit_edit_uses_patch() {
    let api = MockArticleApi::new();
    api.add_article(full_article("p1", "a1", "Existing"));
    let harness = Harness::start(api, MockIdentity::new(), false);
    harness.sign_in("ada", "secret").await;
    let ctx = harness.app.context().clone();
    load_draft(&ctx, "p1", "a1").await.unwrap();

    submit_draft(&ctx, "p1", "a1").await.unwrap();
    assert!(matches!(
        harness.api.mutations().as_slice(),
        [ApiCall::UpdateArticle { article_id, .. }] if article_id == "a1"
    ));
    let state = harness.settle().await;
    assert!(select_draft(&state.drafts, "a1").is_none());
}

#[tokio::test]
async fn test_failed_submit_keeps_draft() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;
    let ctx = harness.app.context().clone();
    load_draft(&ctx, "p1", NEW_ARTICLE_ID).await.unwrap();
    harness.api.set_fail_mutations(true);

    submit_draft(&ctx, "p1", NEW_ARTICLE_ID).await.unwrap();
    harness.wait_for_toast("Could not save \"Untitled\"").await;
    let state = harness.settle().await;
    assert!(select_draft(&state.drafts, NEW_ARTICLE_ID).is_some());
    assert!(!select_is_submitting(&state.drafts, NEW_ARTICLE_ID));
}

#[tokio::test]
async fn test_submit_without_session_goes_to_auth_handler() {
    let harness = Harness::with_defaults();
    let ctx = harness.app.context().clone();
    load_draft(&ctx, "p1", NEW_ARTICLE_ID).await.unwrap();

    submit_draft(&ctx, "p1", NEW_ARTICLE_ID).await.unwrap();
    harness.wait_for_toast("Please sign in").await;
    let state = harness.settle().await;
    assert!(select_draft(&state.drafts, NEW_ARTICLE_ID).is_some());
    assert!(!select_is_submitting(&state.drafts, NEW_ARTICLE_ID));
    assert!(harness.api.mutations().is_empty());
}

#[tokio::test]
async fn test_discard_navigates_back() {
    let harness = Harness::with_defaults();
    harness.app.load_draft("p1", NEW_ARTICLE_ID).unwrap();
    harness
        .wait_for(|state| state.drafts.drafts.contains_key(NEW_ARTICLE_ID))
        .await;

    harness.app.discard_draft(NEW_ARTICLE_ID).unwrap();
    let state = harness
        .wait_for(|state| state.navigation.location() == &Route::Home)
        .await;
    assert!(state.drafts.drafts.is_empty());
}
