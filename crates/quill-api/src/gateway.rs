use std::sync::{Arc, OnceLock};

use chrono::Duration;
use regex::Regex;
use tracing::{debug, info};

use quill_types::api::LoginResponse;
use quill_types::models::{PublicUser, User};

use crate::error::{ApiError, AuthFailure, DuplicateField};
use crate::password::PasswordHasher;
use crate::store::CredentialStore;
use crate::token::{ACCESS_TOKEN_EXPIRE_MINUTES, TokenService};

/// Signup, login and bearer-token resolution on top of a credential store.
#[derive(Clone)]
pub struct AuthGateway {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl AuthGateway {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ApiError> {
        let email = &normalize_email(email);
        validate_signup(username, email, password)?;

        // Cheap duplicate checks before paying for argon2.
        if self.store.find_by_email(email)?.is_some() {
            return Err(ApiError::Duplicate(DuplicateField::Email));
        }
        if self.store.find_by_username(username)?.is_some() {
            return Err(ApiError::Duplicate(DuplicateField::Username));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self.store.create(username, email, &password_hash)?;

        info!("User {} signed up", user.username);
        Ok(user.public())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let email = &normalize_email(email);
        let user = match self.store.find_by_email(email)? {
            Some(user) if self.hasher.verify(password, &user.password_hash) => user,
            _ => {
                debug!("Rejected login for {}", email);
                return Err(ApiError::Authentication(AuthFailure::IncorrectCredentials));
            }
        };

        let access_token = self
            .tokens
            .issue(&user.email, Duration::minutes(ACCESS_TOKEN_EXPIRE_MINUTES))?;

        info!("User {} logged in", user.username);
        Ok(LoginResponse {
            access_token,
            token_type: "bearer".to_string(),
            user: user.public(),
        })
    }

    /// Maps a bearer token to the account it names. Token failures and
    /// vanished subjects are indistinguishable to the caller.
    pub fn resolve_current_user(&self, token: &str) -> Result<User, ApiError> {
        let invalid = ApiError::Authentication(AuthFailure::InvalidSession);

        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                return Err(invalid);
            }
        };

        match self.store.find_by_email(&claims.sub)? {
            Some(user) => Ok(user),
            None => {
                debug!("Bearer token subject {} has no account", claims.sub);
                Err(invalid)
            }
        }
    }
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Regex should compile")
    })
}

/// Lowercases the domain part; the local part is case-sensitive.
fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    if !email_regex().is_match(email) {
        return Err(ApiError::Validation("email is not a valid address".into()));
    }
    if password.trim().is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_db::Database;

    fn gateway() -> AuthGateway {
        let db = Arc::new(Database::open_in_memory().unwrap());
        AuthGateway::new(db, PasswordHasher::new(), TokenService::new("test-secret"))
    }

    #[test]
    fn signup_login_resolve_round_trip() {
        let gw = gateway();
        let user = gw.signup("alice", "alice@example.com", "pw-alice").unwrap();
        assert_eq!(user.username, "alice");

        let login = gw.login("alice@example.com", "pw-alice").unwrap();
        assert_eq!(login.token_type, "bearer");
        assert_eq!(login.user.username, "alice");

        let current = gw.resolve_current_user(&login.access_token).unwrap();
        assert_eq!(current.username, "alice");
        assert_eq!(current.email, "alice@example.com");
    }

    #[test]
    fn stored_password_is_hashed() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let gw = AuthGateway::new(db.clone(), PasswordHasher::new(), TokenService::new("s"));
        gw.signup("alice", "alice@example.com", "pw-alice").unwrap();

        let stored = db.find_by_email("alice@example.com").unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw-alice");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn duplicate_email_or_username_is_rejected() {
        let gw = gateway();
        gw.signup("alice", "alice@example.com", "pw").unwrap();

        let err = gw.signup("someone-else", "alice@example.com", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Email)));
        assert_eq!(err.to_string(), "email already registered");

        let err = gw.signup("alice", "fresh@example.com", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Username)));
        assert_eq!(err.to_string(), "username already taken");
    }

    #[test]
    fn bad_login_does_not_reveal_which_part_was_wrong() {
        let gw = gateway();
        gw.signup("alice", "alice@example.com", "pw-alice").unwrap();

        let wrong_password = gw.login("alice@example.com", "nope").unwrap_err();
        let unknown_email = gw.login("ghost@example.com", "pw-alice").unwrap_err();

        assert!(matches!(
            wrong_password,
            ApiError::Authentication(AuthFailure::IncorrectCredentials)
        ));
        assert!(matches!(
            unknown_email,
            ApiError::Authentication(AuthFailure::IncorrectCredentials)
        ));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn invalid_tokens_and_unknown_subjects_look_the_same() {
        let gw = gateway();
        let orphan = TokenService::new("test-secret")
            .issue("ghost@example.com", Duration::minutes(30))
            .unwrap();

        let garbage = gw.resolve_current_user("not-a-token").unwrap_err();
        let no_account = gw.resolve_current_user(&orphan).unwrap_err();

        assert!(matches!(garbage, ApiError::Authentication(AuthFailure::InvalidSession)));
        assert!(matches!(no_account, ApiError::Authentication(AuthFailure::InvalidSession)));
        assert_eq!(garbage.to_string(), "could not validate credentials");
        assert_eq!(garbage.to_string(), no_account.to_string());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let gw = gateway();
        gw.signup("alice", "alice@example.com", "pw").unwrap();
        let foreign = TokenService::new("other-secret")
            .issue("alice@example.com", Duration::minutes(30))
            .unwrap();

        assert!(matches!(
            gw.resolve_current_user(&foreign),
            Err(ApiError::Authentication(AuthFailure::InvalidSession))
        ));
    }

    #[test]
    fn signup_validates_input() {
        let gw = gateway();
        for (username, email, password) in [
            ("", "a@example.com", "pw"),
            ("   ", "a@example.com", "pw"),
            ("alice", "not-an-email", "pw"),
            ("alice", "a@b", "pw"),
            ("alice", "a b@example.com", "pw"),
            ("alice", "a@example.com", ""),
            ("alice", "a@example.com", "   "),
        ] {
            let err = gw.signup(username, email, password).unwrap_err();
            assert!(
                matches!(err, ApiError::Validation(_)),
                "{username:?} {email:?} {password:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn email_domain_case_does_not_create_a_second_account() {
        let gw = gateway();
        let user = gw.signup("alice", "Alice@EXAMPLE.com", "pw-alice").unwrap();
        assert_eq!(user.email, "Alice@example.com");

        let err = gw.signup("alice2", "Alice@example.COM", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Email)));

        let login = gw.login("Alice@Example.Com", "pw-alice").unwrap();
        assert_eq!(login.user.username, "alice");
        let current = gw.resolve_current_user(&login.access_token).unwrap();
        assert_eq!(current.email, "Alice@example.com");
    }

    #[test]
    fn concurrent_signups_with_one_email_create_one_account() {
        // The duplicate check and the insert are not one transaction; the
        // store's UNIQUE constraint is what keeps this to a single account.
        let gw = gateway();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gw = gw.clone();
                std::thread::spawn(move || {
                    gw.signup(&format!("racer{i}"), "race@example.com", "pw")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(created, 1);
        for err in results.into_iter().filter_map(Result::err) {
            assert!(matches!(err, ApiError::Duplicate(DuplicateField::Email)));
        }
    }
}
