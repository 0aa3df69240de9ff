//! Token lifecycle properties: supersession, single use, TTL and
//! concurrent redemption.

#![allow(clippy::expect_used)]

mod common;

use account_auth::mocks::{
    MockPasswordHasher, MockRateLimiter, MockSessionStore, MockTokenStore, MockUserRepository,
    RecordingDispatcher,
};
use account_auth::providers::UserRepository;
use account_auth::{
    AccountService, AuthEnvironment, AuthError, Channel, OpaqueReference, PhoneNumber, User,
    UserId,
};
use common::{config, email_signup, harness, last_link};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Barrier;

#[tokio::test]
async fn test_reissue_invalidates_previous_token() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (first, _) = last_link(&h.dispatcher);

    // Act: a second token for the same channel
    h.service
        .send_verification_token(&Channel::Email("a@x.com".to_string()), None)
        .await
        .expect("reissue");
    let (second, _) = last_link(&h.dispatcher);
    assert_ne!(first, second);

    // Assert: only the latest token redeems
    let err = h
        .service
        .redeem_token(&first, None)
        .await
        .expect_err("superseded token");
    assert_eq!(err, AuthError::TokenInvalidOrExpired);

    h.service
        .redeem_token(&second, None)
        .await
        .expect("latest token redeems");
}

#[tokio::test]
async fn test_wrong_guess_does_not_burn_live_token() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);

    let guess = OpaqueReference::encode("a@x.com", "guessedtokenvalue");
    let err = h
        .service
        .redeem_token(guess.as_str(), None)
        .await
        .expect_err("wrong token");
    assert_eq!(err, AuthError::TokenInvalidOrExpired);

    h.service
        .redeem_token(&reference, None)
        .await
        .expect("real token still redeems");
}

#[tokio::test]
async fn test_expired_token_fails_like_missing_token() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);

    h.tokens.expire("a@x.com").expect("lock");
    let expired = h
        .service
        .redeem_token(&reference, None)
        .await
        .expect_err("expired token");

    let never_issued = OpaqueReference::encode("b@x.com", "abcdefghij");
    let missing = h
        .service
        .redeem_token(never_issued.as_str(), None)
        .await
        .expect_err("missing token");

    assert_eq!(expired, AuthError::TokenInvalidOrExpired);
    assert_eq!(expired, missing);
    assert_eq!(expired.to_string(), missing.to_string());
}

#[tokio::test]
async fn test_redirect_does_not_keep_token_alive() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);

    let redemption = h
        .service
        .redeem_token(&reference, Some("not base64 at all!"))
        .await
        .expect("redemption");
    assert_eq!(redemption.redirect, None);
    assert_eq!(h.tokens.token_for("a@x.com").expect("lock"), None);
}

#[tokio::test]
async fn test_concurrent_redemption_succeeds_once() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);
    let writes = h.users.writes();

    // Act: two callers present the same reference at once
    let first = h.service.clone();
    let second = h.service.clone();
    let first_ref = reference.clone();
    let second_ref = reference.clone();
    let (a, b) = tokio::join!(
        async move { first.redeem_token(&first_ref, None).await },
        async move { second.redeem_token(&second_ref, None).await },
    );

    // Assert: exactly one wins and the flag is written exactly once
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == AuthError::TokenInvalidOrExpired)
    );
    assert_eq!(h.users.writes(), writes + 1);
    assert_eq!(h.sessions.count().expect("lock"), 1);
}

#[tokio::test]
async fn test_concurrent_redemption_across_tasks() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let reference = reference.clone();
            tokio::spawn(async move { service.redeem_token(&reference, None).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("task completes").is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_already_verified_channel_redeems_without_write() {
    let h = harness();
    h.service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup");
    let (reference, _) = last_link(&h.dispatcher);
    h.service
        .redeem_token(&reference, None)
        .await
        .expect("first redemption");

    let channel = Channel::Email("a@x.com".to_string());
    h.service
        .send_verification_token(&channel, None)
        .await
        .expect("send");
    let (reference, _) = last_link(&h.dispatcher);
    let writes = h.users.writes();

    let redemption = h
        .service
        .redeem_token(&reference, None)
        .await
        .expect("second token");
    assert!(!redemption.newly_verified);
    assert_eq!(h.users.writes(), writes);
}

/// Once armed, every email or phone lookup waits for a second caller, so
/// two redemptions both read the user before either one writes.
#[derive(Clone)]
struct LockstepUsers {
    inner: MockUserRepository,
    armed: Arc<AtomicBool>,
    barrier: Arc<Barrier>,
}

impl LockstepUsers {
    async fn rendezvous(&self) {
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
    }
}

impl UserRepository for LockstepUsers {
    async fn get_user_by_id(&self, user_id: UserId) -> account_auth::Result<User> {
        self.inner.get_user_by_id(user_id).await
    }

    async fn find_by_email(&self, email: &str) -> account_auth::Result<Option<User>> {
        let found = self.inner.find_by_email(email).await;
        self.rendezvous().await;
        found
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> account_auth::Result<Option<User>> {
        let found = self.inner.find_by_phone(phone).await;
        self.rendezvous().await;
        found
    }

    async fn create_user(&self, user: &User) -> account_auth::Result<User> {
        self.inner.create_user(user).await
    }

    async fn update_user(&self, user: &User) -> account_auth::Result<User> {
        self.inner.update_user(user).await
    }

    async fn mark_channel_verified(
        &self,
        user_id: UserId,
        channel: &Channel,
    ) -> account_auth::Result<bool> {
        self.inner.mark_channel_verified(user_id, channel).await
    }
}

#[tokio::test]
async fn test_concurrent_email_and_phone_redemptions_keep_both_flags() {
    let tokens = MockTokenStore::new();
    let dispatcher = RecordingDispatcher::new();
    let users = LockstepUsers {
        inner: MockUserRepository::new(),
        armed: Arc::new(AtomicBool::new(false)),
        barrier: Arc::new(Barrier::new(2)),
    };
    let service = AccountService::new(AuthEnvironment::new(
        tokens.clone(),
        users.clone(),
        MockSessionStore::new(),
        MockPasswordHasher::new(),
        dispatcher.clone(),
        MockRateLimiter::new(),
        config(),
    ));

    let mut request = email_signup("a@x.com", "abcdef");
    request.phone_country_code = Some("+91".to_string());
    request.phone = Some("1111111111".to_string());
    let user_id = service.signup(request).await.expect("signup").user_id();
    let (reference, _) = last_link(&dispatcher);

    let phone = Channel::phone("+91", "1111111111").expect("phone");
    service
        .send_verification_token(&phone, None)
        .await
        .expect("sms");
    let code = tokens
        .token_for("+911111111111")
        .expect("lock")
        .expect("code issued");

    // Act: both redemptions look the user up before either marks a flag
    users.armed.store(true, Ordering::SeqCst);
    let (email_result, phone_result) = tokio::join!(
        service.redeem_token(&reference, None),
        service.redeem_code(&phone, &code, None),
    );

    // Assert: neither write overwrote the other
    assert!(email_result.expect("email redeems").newly_verified);
    assert!(phone_result.expect("phone redeems").newly_verified);
    let stored = users.inner.get_user_by_id(user_id).await.expect("user");
    assert!(stored.email_verified);
    assert!(stored.phone_verified);
}

#[tokio::test]
async fn test_redemption_bumps_updated_at() {
    let h = harness();
    let user_id = h
        .service
        .signup(email_signup("a@x.com", "abcdef"))
        .await
        .expect("signup")
        .user_id();
    let before = h.users.get_user_by_id(user_id).await.expect("user").updated_at;
    let (reference, _) = last_link(&h.dispatcher);

    h.service
        .redeem_token(&reference, None)
        .await
        .expect("redemption");

    let after = h.users.get_user_by_id(user_id).await.expect("user");
    assert!(after.email_verified);
    assert!(after.updated_at > before);
}
