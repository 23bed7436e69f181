//! Reset link verification and password reset.

mod common;

use clubdesk::constants::messages;
use clubdesk::controllers::{ResetPasswordController, ResetState};
use clubdesk::fragment::{Location, MemoryLocation};
use clubdesk::services::AuthError;
use clubdesk::validation::Field;
use common::{Call, FakeBackend, local_state, remote_state, secret};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const LINK: &str = "https://club.test/reset-password#token=tok-123&email=ana%40club.test";

fn reset_controller(
    backend: &Arc<FakeBackend>,
    link: &str,
) -> (ResetPasswordController, MemoryLocation) {
    let state = remote_state(backend);
    let location = MemoryLocation::parse(link).unwrap();
    let controller =
        ResetPasswordController::new(state.reset.clone(), Arc::new(location.clone()));
    (controller, location)
}

fn fill(controller: &ResetPasswordController, password: &str, confirm: &str) {
    controller.edit(|form| {
        form.new_password = secret(password);
        form.confirm_password = secret(confirm);
    });
}

#[tokio::test]
async fn test_incomplete_links_are_invalid_without_request() {
    let links = [
        "https://club.test/reset-password",
        "https://club.test/reset-password#token=tok-123",
        "https://club.test/reset-password#email=ana%40club.test",
        "https://club.test/reset-password#token=&email=ana%40club.test",
        // credentials in the query string are not accepted
        "https://club.test/reset-password?token=tok-123&email=ana%40club.test",
    ];

    for link in links {
        let backend = FakeBackend::new();
        let (controller, _) = reset_controller(&backend, link);

        assert_eq!(
            controller.mount().await,
            ResetState::Invalid(messages::INVALID_RESET_LINK.to_string()),
            "{link}"
        );
        assert!(backend.calls().is_empty(), "{link} reached the backend");

        fill(&controller, "better22", "better22");
        let err = controller.submit(|| panic!("must not complete")).await;
        assert!(matches!(err, Err(AuthError::InvalidResetLink(_))));
        assert!(backend.calls().is_empty());
    }
}

#[tokio::test]
async fn test_valid_token_resets_password() {
    let backend = FakeBackend::new();
    backend.reply(200, json!({ "valid": true }));
    backend.reply(200, json!({ "success": true }));
    let (controller, location) = reset_controller(&backend, LINK);

    assert_eq!(controller.mount().await, ResetState::Valid);
    assert_eq!(
        backend.calls(),
        vec![Call::InvokeFunction(
            "verify-reset-token".to_string(),
            json!({ "token": "tok-123", "email": "ana@club.test" })
        )]
    );

    fill(&controller, "better22", "better22");
    let completions = AtomicUsize::new(0);
    controller
        .submit(|| {
            completions.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ResetState::Done);
    assert_eq!(location.fragment(), None);
    assert_eq!(location.current().as_str(), "https://club.test/reset-password");
    assert_eq!(
        backend.function_bodies()[1],
        json!({ "token": "tok-123", "email": "ana@club.test", "newPassword": "better22" })
    );

    // a finished reset cannot be submitted again
    let again = controller.submit(|| panic!("must not complete twice")).await;
    assert!(again.is_err());
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_token_blocks_submission() {
    let backend = FakeBackend::new();
    backend.reply(200, json!({ "valid": false }));
    let (controller, location) = reset_controller(&backend, LINK);

    assert_eq!(
        controller.mount().await,
        ResetState::Invalid(messages::EXPIRED_RESET_LINK.to_string())
    );

    fill(&controller, "better22", "better22");
    assert!(controller.submit(|| {}).await.is_err());
    assert_eq!(backend.count(|c| matches!(c, Call::InvokeFunction(..))), 1);
    assert!(location.fragment().is_some());
}

#[tokio::test]
async fn test_server_error_on_verify_is_invalid() {
    let backend = FakeBackend::new();
    backend.reply(400, json!({ "error": "Token expired" }));
    let (controller, _) = reset_controller(&backend, LINK);

    assert_eq!(
        controller.mount().await,
        ResetState::Invalid("Token expired".to_string())
    );

    let backend = FakeBackend::new();
    backend.reply(500, json!({}));
    let (controller, _) = reset_controller(&backend, LINK);
    assert_eq!(
        controller.mount().await,
        ResetState::Invalid(messages::EXPIRED_RESET_LINK.to_string())
    );
}

#[tokio::test]
async fn test_consume_failure_keeps_form_usable() {
    let backend = FakeBackend::new();
    backend.reply(200, json!({ "valid": true }));
    backend.reply(400, json!({ "error": "Token already used" }));
    let (controller, location) = reset_controller(&backend, LINK);
    controller.mount().await;

    fill(&controller, "better22", "better22");
    let mut completed = false;
    let err = controller.submit(|| completed = true).await.unwrap_err();

    assert_eq!(err, AuthError::ResetFailed("Token already used".to_string()));
    assert!(!completed);
    assert_eq!(controller.state(), ResetState::Valid);
    assert_eq!(controller.error().as_deref(), Some("Token already used"));
    assert!(location.fragment().is_some());
}

#[tokio::test]
async fn test_consume_failure_without_message_is_generic() {
    let backend = FakeBackend::new();
    backend.reply(200, json!({ "valid": true }));
    backend.reply(502, json!(null));
    let (controller, _) = reset_controller(&backend, LINK);
    controller.mount().await;

    fill(&controller, "better22", "better22");
    let err = controller.submit(|| {}).await.unwrap_err();
    assert_eq!(err, AuthError::ResetFailed(messages::RESET_FAILED.to_string()));
}

#[tokio::test]
async fn test_password_rules_checked_before_consume() {
    let backend = FakeBackend::new();
    let (controller, _) = reset_controller(&backend, LINK);
    controller.mount().await;

    fill(&controller, "abc", "abd");
    let err = controller.submit(|| {}).await.unwrap_err();
    let errors = err.field_errors().unwrap();
    assert!(errors.contains(Field::Password));
    assert!(errors.contains(Field::ConfirmPassword));
    assert_eq!(backend.count(|c| matches!(c, Call::InvokeFunction(..))), 1);
    assert_eq!(controller.state(), ResetState::Valid);
}

#[tokio::test]
async fn test_slow_verification_shows_notice() {
    let backend = FakeBackend::new();
    backend.delay_functions(Duration::from_millis(200));
    let (controller, _) = reset_controller(&backend, LINK);
    let controller = controller.with_slow_notice(Duration::from_millis(20));

    let observe = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.state(), ResetState::Checking);
        assert!(controller.is_slow());
        assert_eq!(controller.notice(), Some(messages::RESET_STILL_CHECKING));
    };

    let (state, ()) = tokio::join!(controller.mount(), observe);
    assert_eq!(state, ResetState::Valid);
    assert_eq!(controller.notice(), None);
}

#[tokio::test]
async fn test_slow_notice_is_reported_once() {
    let backend = FakeBackend::new();
    backend.delay_functions(Duration::from_millis(400));
    let (controller, _) = reset_controller(&backend, LINK);
    let controller = controller.with_slow_notice(Duration::from_millis(20));

    let mut notices = Vec::new();
    let state = controller.mount_with_notice(|n| notices.push(n)).await;

    assert_eq!(state, ResetState::Valid);
    assert_eq!(notices, vec![messages::RESET_STILL_CHECKING]);
}

#[tokio::test]
async fn test_fast_verification_reports_no_notice() {
    let backend = FakeBackend::new();
    let (controller, _) = reset_controller(&backend, LINK);

    let mut notices = Vec::new();
    let state = controller.mount_with_notice(|n| notices.push(n)).await;

    assert_eq!(state, ResetState::Valid);
    assert!(notices.is_empty());
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_refused() {
    let backend = FakeBackend::new();
    let (controller, _) = reset_controller(&backend, LINK);
    controller.mount().await;
    backend.delay_functions(Duration::from_millis(50));

    fill(&controller, "better22", "better22");
    let (first, second) = tokio::join!(controller.submit(|| {}), controller.submit(|| {}));

    assert!(first.is_ok());
    assert_eq!(second, Err(AuthError::Busy));
    assert_eq!(backend.count(|c| matches!(c, Call::InvokeFunction(..))), 2);
}

#[tokio::test]
async fn test_unmount_cancels_verification() {
    let backend = FakeBackend::new();
    backend.delay_functions(Duration::from_secs(30));
    let (controller, _) = reset_controller(&backend, LINK);

    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.unmount();
    };
    let (state, ()) = tokio::join!(controller.mount(), cancel);
    assert_eq!(state, ResetState::Checking);
}

#[tokio::test]
async fn test_local_mode_cannot_verify() {
    let state = local_state();
    let location = MemoryLocation::parse(LINK).unwrap();
    let controller = ResetPasswordController::new(state.reset.clone(), Arc::new(location));

    assert_eq!(
        controller.mount().await,
        ResetState::Invalid(messages::UNAVAILABLE.to_string())
    );
}
