use crate::common::{publication, Harness};
use gazette::mock::{ApiCall, MockArticleApi, MockIdentity};
use gazette::models::PaginatedPage;
use gazette::navigation::Route;
use gazette::publications::select_sorted_publications;

mod common;

fn scripted_api() -> MockArticleApi {
    let api = MockArticleApi::new();
    api.add_publication_page(
        "",
        PaginatedPage::new(vec![publication("p2", "Zeta"), publication("p1", "Beta")], "t2"),
    );
    api.add_publication_page("t2", PaginatedPage::last(vec![publication("p3", "Alpha")]));
    api
}

#[tokio::test]
async fn test_loads_every_page_and_redirects_to_first_publication() {
    let harness = Harness::start(scripted_api(), MockIdentity::new(), false);
    harness.app.select_publication("").unwrap();

    let state = harness
        .wait_for(|state| {
            matches!(state.navigation.location(), Route::Publication { .. })
        })
        .await;
    assert_eq!(
        state.navigation.location(),
        &Route::Publication {
            publication_id: "p3".to_string()
        }
    );
    assert!(!state.publications.is_loading);
    let names: Vec<String> = select_sorted_publications(&state.publications)
        .iter()
        .map(|publication| publication.name.clone())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Zeta"]);
    assert_eq!(
        harness.api.calls(),
        vec![
            ApiCall::ListPublications {
                page_token: String::new()
            },
            ApiCall::ListPublications {
                page_token: "t2".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_preselected_publication_is_kept() {
    let harness = Harness::start(scripted_api(), MockIdentity::new(), false);
    harness.app.select_publication("p2").unwrap();

    harness.wait_for(|state| state.publications.publications.len() == 3).await;
    let state = harness.settle().await;
    assert_eq!(state.publications.selected_publication_id, "p2");
    assert_eq!(state.navigation.location(), &Route::Home);
}

#[tokio::test]
async fn test_fetch_error_is_toasted_and_not_retried() {
    let api = MockArticleApi::new();
    api.add_publication_page(
        "",
        PaginatedPage::new(vec![publication("p1", "Beta")], "t2"),
    );
    api.fail_publication_page("t2");
    let harness = Harness::start(api, MockIdentity::new(), false);
    harness.app.select_publication("").unwrap();

    harness.wait_for_toast("Could not load publications").await;
    let state = harness.settle().await;
    assert!(!state.publications.is_loading);
    assert_eq!(state.publications.publications.len(), 1);
    assert_eq!(state.navigation.location(), &Route::Home);

    // The saga is done; a second selection does not trigger another load.
    harness.app.select_publication("").unwrap();
    harness.settle().await;
    assert_eq!(harness.api.calls().len(), 2);
}
