//! Login walkthrough binary
//!
//! Runs the account service against in-memory stores with real Argon2
//! hashing. Emails are captured so the walkthrough can follow the link;
//! SMS codes are printed to the console.

use account_auth::mocks::{
    MockRateLimiter, MockSessionStore, MockTokenStore, MockUserRepository, RecordingDispatcher,
};
use account_auth::constants::messages;
use account_auth::providers::{Argon2PasswordHasher, ChannelRouter, ConsoleDispatcher};
use account_auth::{
    AccountService, AuthConfig, AuthEnvironment, Channel, LoginOutcome, LoginRequest,
    ResourceTarget, SignupRequest,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_walkthrough=info,account_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    println!("=== Login Walkthrough ===\n");

    let config = AuthConfig::from_env().unwrap_or_else(|e| {
        tracing::info!(error = %e, "Using local defaults");
        AuthConfig::new(
            "http://localhost:8080".to_string(),
            "http://localhost:3000".to_string(),
        )
    });

    let emails = RecordingDispatcher::new();
    let service = AccountService::new(AuthEnvironment::new(
        MockTokenStore::new(),
        MockUserRepository::new(),
        MockSessionStore::new(),
        Argon2PasswordHasher::new(),
        ChannelRouter::new(emails.clone(), ConsoleDispatcher::new()),
        MockRateLimiter::new(),
        config,
    ));

    // Signup
    println!(">>> signup a@x.com");
    let outcome = service
        .signup(SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("a@x.com".to_string()),
            phone_country_code: Some("+44".to_string()),
            phone: Some("7700 900123".to_string()),
            password: "abcdef".to_string(),
        })
        .await?;
    println!("{}\n", outcome.message());

    // Password login before verification
    let request = LoginRequest {
        identifier: "a@x.com".to_string(),
        phone_country_code: None,
        password: "abcdef".to_string(),
    };
    println!(">>> login a@x.com");
    match service.login(request.clone()).await? {
        LoginOutcome::Authenticated(_) => println!("{}\n", messages::LOGIN_SUCCESSFUL),
        LoginOutcome::VerificationRequired { channel } => {
            println!("verification required, link sent to {channel}\n");
        }
    }

    // Follow the latest link
    let link = emails
        .last()?
        .and_then(|message| message.variable("link").map(str::to_string))
        .ok_or_else(|| anyhow::anyhow!("no verification email was sent"))?;
    println!(">>> GET {link}");
    let reference = link
        .rsplit('/')
        .next()
        .ok_or_else(|| anyhow::anyhow!("malformed link"))?;
    let redemption = service.redeem_token(reference, None).await?;
    println!(
        "{} (newly verified: {})\n",
        redemption.message(),
        redemption.newly_verified
    );

    println!(">>> GET {link} (again)");
    match service.redeem_token(reference, None).await {
        Ok(_) => println!("unexpected success\n"),
        Err(e) => println!("{}\n", e.code()),
    }

    // Password login on the verified channel
    println!(">>> login a@x.com");
    let LoginOutcome::Authenticated(session) = service.login(request).await? else {
        anyhow::bail!("verified email should log in directly");
    };
    println!("{} (session {})\n", messages::LOGIN_SUCCESSFUL, session.session_id);

    let profile = service
        .current_user(session.session_id, ResourceTarget::Me)
        .await?;
    println!(">>> GET /users/me\n{} {}\n", profile.first_name, profile.last_name);

    // Phone verification by SMS code
    let phone = Channel::phone("+44", "7700900123")?;
    println!(">>> send verification SMS to {phone}");
    let dispatch = service.send_verification_token(&phone, None).await?;
    println!("{}\n", dispatch.message());

    service.logout(session.session_id).await?;
    println!(">>> logout\n{}", messages::LOGOUT_SUCCESSFUL);

    Ok(())
}
