//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::expect_used)]

use account_auth::mocks::{
    MockPasswordHasher, MockRateLimiter, MockSessionStore, MockTokenStore, MockUserRepository,
    RecordingDispatcher,
};
use account_auth::{AccountService, AuthConfig, AuthEnvironment, LoginRequest, SignupRequest};

pub const API_LOCATION: &str = "https://api.example.com";
pub const FRONTEND_LOCATION: &str = "https://app.example.com";

pub type MockService = AccountService<
    MockTokenStore,
    MockUserRepository,
    MockSessionStore,
    MockPasswordHasher,
    RecordingDispatcher,
    MockRateLimiter,
>;

/// Service over in-memory collaborators, with handles kept for inspection.
pub struct Harness {
    pub tokens: MockTokenStore,
    pub users: MockUserRepository,
    pub sessions: MockSessionStore,
    pub dispatcher: RecordingDispatcher,
    pub service: MockService,
}

pub fn config() -> AuthConfig {
    AuthConfig::new(API_LOCATION.to_string(), FRONTEND_LOCATION.to_string())
}

pub fn harness() -> Harness {
    let tokens = MockTokenStore::new();
    let users = MockUserRepository::new();
    let sessions = MockSessionStore::new();
    let dispatcher = RecordingDispatcher::new();

    let service = AccountService::new(AuthEnvironment::new(
        tokens.clone(),
        users.clone(),
        sessions.clone(),
        MockPasswordHasher::new(),
        dispatcher.clone(),
        MockRateLimiter::new(),
        config(),
    ));

    Harness {
        tokens,
        users,
        sessions,
        dispatcher,
        service,
    }
}

pub fn email_signup(email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: Some(email.to_string()),
        phone_country_code: None,
        phone: None,
        password: password.to_string(),
    }
}

pub fn phone_signup(country_code: &str, phone: &str, password: &str) -> SignupRequest {
    SignupRequest {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: None,
        phone_country_code: Some(country_code.to_string()),
        phone: Some(phone.to_string()),
        password: password.to_string(),
    }
}

pub fn login(identifier: &str, password: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.to_string(),
        phone_country_code: None,
        password: password.to_string(),
    }
}

/// Reference and encoded redirect from the most recently sent link.
pub fn last_link(dispatcher: &RecordingDispatcher) -> (String, Option<String>) {
    let message = dispatcher
        .last()
        .expect("dispatcher lock")
        .expect("a message was sent");
    let link = message.variable("link").expect("message carries a link");
    let path = link
        .strip_prefix(&format!("{API_LOCATION}/auth/login/"))
        .expect("link points at the login route");

    match path.split_once("?redirectUrl=") {
        Some((reference, redirect)) => (reference.to_string(), Some(redirect.to_string())),
        None => (path.to_string(), None),
    }
}
