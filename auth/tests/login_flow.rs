//! End-to-end login flows over in-memory collaborators.
//!
//! signup → login (verification required) → redemption → login → logout

#![allow(clippy::expect_used)]

mod common;

use account_auth::constants::messages;
use account_auth::{
    AuthError, Channel, ChannelKind, LoginMethod, LoginOutcome, LoginRequest, ResourceTarget,
};
use common::{email_signup, harness, last_link, login, phone_signup};

#[tokio::test]
async fn test_signup_then_duplicate_email_is_taken() {
    let h = harness();

    let outcome = h
        .service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("first signup succeeds");
    assert_eq!(outcome.message(), messages::VERIFICATION_EMAIL_SENT);
    assert_eq!(h.dispatcher.count().expect("lock"), 1);

    let err = h
        .service
        .signup(email_signup("a@x.com", "different"))
        .await
        .expect_err("second signup is rejected");
    assert_eq!(err, AuthError::EmailTaken);
    assert_eq!(err.code(), "EMAIL_TAKEN");
    assert_eq!(h.users.count().expect("lock"), 1);
}

#[tokio::test]
async fn test_unverified_login_sends_exactly_one_message() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");

    let dispatched = h.dispatcher.count().expect("lock");
    let issued = h.tokens.writes();

    let outcome = h
        .service
        .login(login("a@x.com", "abcdef"))
        .await
        .expect("login");

    assert_eq!(
        outcome,
        LoginOutcome::VerificationRequired {
            channel: Channel::Email("a@x.com".to_string()),
        }
    );
    assert_eq!(h.dispatcher.count().expect("lock"), dispatched + 1);
    assert_eq!(h.tokens.writes(), issued + 1);
    assert_eq!(h.sessions.count().expect("lock"), 0);
}

#[tokio::test]
async fn test_full_email_flow() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");

    // Act: follow the link from the signup email
    let (reference, redirect) = last_link(&h.dispatcher);
    assert!(redirect.is_none());
    let redemption = h
        .service
        .redeem_token(&reference, None)
        .await
        .expect("redemption");

    assert!(redemption.newly_verified);
    assert_eq!(redemption.message(), messages::LOGIN_SUCCESSFUL);
    assert_eq!(redemption.session.login_method, LoginMethod::Token);

    // Replaying the link fails
    let replay = h
        .service
        .redeem_token(&reference, None)
        .await
        .expect_err("reference is single-use");
    assert_eq!(replay, AuthError::TokenInvalidOrExpired);

    // Password login now succeeds without sending anything
    let dispatched = h.dispatcher.count().expect("lock");
    let LoginOutcome::Authenticated(session) = h
        .service
        .login(login("A@X.com", "abcdef"))
        .await
        .expect("login")
    else {
        unreachable!("verified channel logs in directly");
    };
    assert_eq!(session.login_method, LoginMethod::Password);
    assert_eq!(session.user_id, redemption.session.user_id);
    assert_eq!(h.dispatcher.count().expect("lock"), dispatched);

    let profile = h
        .service
        .current_user(session.session_id, ResourceTarget::Me)
        .await
        .expect("own profile");
    assert_eq!(profile.email.as_deref(), Some("a@x.com"));

    // Logout is idempotent and ends the session
    h.service.logout(session.session_id).await.expect("logout");
    h.service
        .logout(session.session_id)
        .await
        .expect("second logout");
    let err = h
        .service
        .current_user(session.session_id, ResourceTarget::Me)
        .await
        .expect_err("session is gone");
    assert_eq!(err, AuthError::NotAuthenticated);
}

#[tokio::test]
async fn test_full_phone_flow() {
    let h = harness();
    let outcome = h
        .service
        .signup(phone_signup("+91", "111-111-1111", "abcdef"))
        .await
        .expect("signup");
    assert_eq!(outcome.message(), messages::VERIFICATION_SMS_SENT);

    let request = LoginRequest {
        identifier: "1111111111".to_string(),
        phone_country_code: Some("+91".to_string()),
        password: "abcdef".to_string(),
    };
    let channel = Channel::phone("+91", "1111111111").expect("valid phone");

    let outcome = h.service.login(request.clone()).await.expect("login");
    assert_eq!(
        outcome,
        LoginOutcome::VerificationRequired {
            channel: channel.clone()
        }
    );

    // Act: type in the code from the latest SMS
    let sms = h
        .dispatcher
        .last()
        .expect("lock")
        .expect("an SMS was sent");
    let code = sms.variable("code").expect("SMS carries a code");
    assert_eq!(code.len(), 6);

    let redemption = h
        .service
        .redeem_code(&channel, code, None)
        .await
        .expect("code redeems");
    assert_eq!(redemption.channel.kind(), ChannelKind::Phone);
    assert!(redemption.newly_verified);

    let outcome = h.service.login(request).await.expect("login");
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
}

#[tokio::test]
async fn test_magic_login_without_password_attempt() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");

    let channel = Channel::Email("a@x.com".to_string());
    let dispatch = h
        .service
        .send_verification_token(&channel, Some("https://app.example.com/courses/7"))
        .await
        .expect("send");
    assert_eq!(dispatch.message(), messages::EMAIL_MAYBE_SENT);

    let (reference, redirect) = last_link(&h.dispatcher);
    let redemption = h
        .service
        .redeem_token(&reference, redirect.as_deref())
        .await
        .expect("redemption");

    assert_eq!(
        redemption.redirect.as_deref(),
        Some("https://app.example.com/courses/7")
    );
}

#[tokio::test]
async fn test_malformed_identifier_is_validation_error() {
    let h = harness();

    let err = h
        .service
        .login(login("1111111111", "abcdef"))
        .await
        .expect_err("phone without country code");
    assert!(matches!(err, AuthError::Validation(_)));
    assert_eq!(err.code(), "INVALID_DATA");
}
