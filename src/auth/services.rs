use anyhow::Context;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};

pub const EMAIL_TAKEN: &str = "Email already in use";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn required<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a user with a freshly hashed password.
pub async fn register(users: &dyn UserStore, req: RegisterRequest) -> AppResult<User> {
    let name = required(&req.name, "name")?.to_string();
    let email = normalize_email(required(&req.email, "email")?);
    if req.password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }

    // The unique index still backs this up when two registrations race.
    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("join hash task")??;

    let user = users
        .insert(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks credentials and issues a signed token.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<LoginResponse> {
    let email = normalize_email(&req.email);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let password = req.password;
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("join verify task")?;
    if !ok {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        token,
        user: PublicUser::from(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;
    use crate::config::JwtConfig;

    async fn seed(store: &MemoryUserStore, email: &str, password_hash: String) {
        store
            .insert(NewUser {
                name: "Grace".into(),
                email: email.into(),
                password_hash,
            })
            .await
            .unwrap();
    }

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24,
        })
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alan".into(),
            email: email.into(),
            password: "enigma-1912".into(),
        }
    }

    fn credentials(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let store = MemoryUserStore::default();
        register(&store, registration("alan@example.com")).await.unwrap();
        let err = register(&store, registration("alan@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_normalizes_email_before_uniqueness_check() {
        let store = MemoryUserStore::default();
        register(&store, registration("alan@example.com")).await.unwrap();
        let err = register(&store, registration("  ALAN@Example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let store = MemoryUserStore::default();
        let user = register(&store, registration("alan@example.com")).await.unwrap();
        assert_ne!(user.password_hash, "enigma-1912");
        assert!(verify_password("enigma-1912", &user.password_hash));
    }

    #[tokio::test]
    async fn register_requires_fields() {
        let store = MemoryUserStore::default();
        let mut req = registration("alan@example.com");
        req.name = "   ".into();
        let err = register(&store, req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("name")));

        let mut req = registration("alan@example.com");
        req.password.clear();
        assert!(matches!(
            register(&store, req).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let store = MemoryUserStore::default();
        register(&store, registration("alan@example.com")).await.unwrap();
        let err = login(&store, &keys(), credentials("alan@example.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_with_unknown_email_is_unauthorized() {
        let store = MemoryUserStore::default();
        let err = login(&store, &keys(), credentials("nobody@example.com", "whatever"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_returns_token_and_public_projection() {
        let store = MemoryUserStore::default();
        let user = register(&store, registration("alan@example.com")).await.unwrap();
        let keys = keys();
        let res = login(&store, &keys, credentials("alan@example.com", "enigma-1912"))
            .await
            .unwrap();

        assert_eq!(res.user.id, user.id);
        let json = serde_json::to_value(&res).unwrap();
        let projection = json["user"].as_object().unwrap();
        assert_eq!(projection.len(), 3);
        assert!(projection.contains_key("id"));
        assert!(projection.contains_key("name"));
        assert!(projection.contains_key("email"));
        assert!(!json.to_string().contains("$2b$"));

        let claims = keys.verify(&res.token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "alan@example.com");
    }

    #[tokio::test]
    async fn login_against_unreadable_stored_hash_is_unauthorized() {
        let store = MemoryUserStore::default();
        seed(&store, "grace@example.com", "$2b$12$UREFnotreallyahash".into()).await;
        seed(
            &store,
            "hopper@example.com",
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo".into(),
        )
        .await;

        for email in ["grace@example.com", "hopper@example.com"] {
            let err = login(&store, &keys(), credentials(email, "wrong"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)), "{email}: {err:?}");
        }
    }

    #[tokio::test]
    async fn login_accepts_existing_bcrypt_records() {
        let store = MemoryUserStore::default();
        seed(&store, "grace@example.com", bcrypt::hash("cobol", 4).unwrap()).await;
        let res = login(&store, &keys(), credentials("grace@example.com", "cobol"))
            .await
            .unwrap();
        assert_eq!(res.user.email, "grace@example.com");
    }
}
