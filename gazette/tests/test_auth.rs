use crate::common::{eventually, Harness};
use gazette::auth::{refresh_auth, select_token};
use gazette::mock::{IdentityCall, MockArticleApi, MockIdentity};
use gazette::session_storage::SessionStorage;

mod common;

const NEW_PASSWORD: &str = "Abcdefghijklmnop1";

#[tokio::test]
async fn test_sign_in_stores_session_and_flag() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;

    let state = harness.settle().await;
    assert_eq!(state.auth.username, "ada");
    assert!(!state.auth.is_loading);
    assert!(select_token(&state.auth, chrono::Utc::now().timestamp()).is_some());
    assert!(harness.has_session());
}

#[tokio::test]
async fn test_wrong_password_goes_to_auth_handler() {
    let harness = Harness::with_defaults();
    harness.identity.add_user("ada", "secret");
    harness.app.sign_in("ada", "wrong").unwrap();

    harness
        .wait_for_toast("Incorrect username or password.")
        .await;
    let state = harness.settle().await;
    assert!(state.auth.token.is_empty());
    assert!(!state.auth.is_loading);
    assert!(!harness.has_session());

    // The flow starts over and accepts the next attempt.
    harness.app.sign_in("ada", "secret").unwrap();
    harness.wait_for(|state| !state.auth.token.is_empty()).await;
}

#[tokio::test]
async fn test_new_password_sub_flow() {
    let harness = Harness::with_defaults();
    harness.identity.add_user("ada", "temporary");
    harness.identity.require_new_password("ada");
    harness.app.sign_in("ada", "temporary").unwrap();

    let state = harness.wait_for(|state| state.auth.new_password.is_some()).await;
    assert!(!state.auth.is_loading);

    harness.app.validate_new_password(NEW_PASSWORD, "").unwrap();
    let state = harness
        .wait_for(|state| {
            state
                .auth
                .new_password
                .as_ref()
                .is_some_and(|form| form.validation.length_ok)
        })
        .await;
    let validation = state.auth.new_password.unwrap().validation;
    assert!(validation.characters_ok);
    assert!(!validation.matching_ok);

    // An invalid submission keeps the user in the sub-flow.
    harness.app.submit_new_password(NEW_PASSWORD, "other").unwrap();
    let state = harness.settle().await;
    assert!(state.auth.new_password.is_some());
    assert!(state.auth.token.is_empty());

    harness.app.submit_new_password(NEW_PASSWORD, NEW_PASSWORD).unwrap();
    let state = harness.wait_for(|state| !state.auth.token.is_empty()).await;
    assert!(state.auth.new_password.is_none());
    assert_eq!(harness.identity.password_of("ada").as_deref(), Some(NEW_PASSWORD));
    assert_eq!(
        harness.identity.count(&IdentityCall::CompleteNewPassword {
            username: "ada".to_string()
        }),
        1
    );
}

#[tokio::test]
async fn test_cancelling_new_password_signs_out() {
    let harness = Harness::with_defaults();
    harness.identity.add_user("ada", "temporary");
    harness.identity.require_new_password("ada");
    harness.app.sign_in("ada", "temporary").unwrap();
    harness.wait_for(|state| state.auth.new_password.is_some()).await;

    harness.app.cancel_new_password().unwrap();
    harness
        .wait_for_toast("A new password is required to sign in")
        .await;
    let state = harness.settle().await;
    assert!(state.auth.new_password.is_none());
    assert!(state.auth.token.is_empty());
    assert!(!harness.has_session());
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;

    harness.app.sign_out().unwrap();
    let identity = harness.identity.clone();
    eventually(move || identity.count(&IdentityCall::SignOut) == 1).await;
    let session = harness.session.clone();
    eventually(move || !session.has_session()).await;
    assert!(harness.settle().await.auth.token.is_empty());
}

#[tokio::test]
async fn test_load_info_restores_previous_session() {
    let harness = Harness::start(MockArticleApi::new(), MockIdentity::new(), true);
    harness.identity.remember_user("ada");
    harness.app.load_auth_info().unwrap();

    let state = harness.wait_for(|state| !state.auth.token.is_empty()).await;
    assert_eq!(state.auth.username, "ada");
    assert_eq!(harness.identity.count(&IdentityCall::CurrentSession), 1);
}

#[tokio::test]
async fn test_load_info_without_previous_session() {
    let harness = Harness::with_defaults();
    let mut actions = harness.app.store().subscribe();
    harness.app.load_auth_info().unwrap();

    let kinds = common::collect_kinds_until(&mut actions, "auth/session-unavailable").await;
    assert_eq!(kinds, vec!["auth/load-info", "auth/session-unavailable"]);
    assert!(harness.identity.calls().is_empty());
    assert!(harness.settle().await.toasts.toasts.is_empty());
}

#[tokio::test]
async fn test_valid_token_needs_no_refresh() {
    let harness = Harness::with_defaults();
    harness.sign_in("ada", "secret").await;
    let before = harness.identity.calls().len();

    let token = refresh_auth(harness.app.context()).await.unwrap();
    assert_eq!(token, harness.settle().await.auth.token);
    assert_eq!(harness.identity.calls().len(), before);
}

#[tokio::test]
async fn test_refresh_without_flag_asks_to_sign_in() {
    let harness = Harness::with_defaults();
    let error = refresh_auth(harness.app.context()).await.unwrap_err();
    assert!(error.is_auth());
    assert_eq!(error.to_string(), "Please sign in");
    assert!(harness.identity.calls().is_empty());
}
