use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use ticketry_core::domain::user::User;

use crate::repositories::{RepositoryError, UserRepository};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub fn hash_password(password: &SecretString) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password.expose_secret(), bcrypt::DEFAULT_COST)
}

/// Looks up the account by email and verifies the password against the
/// stored bcrypt hash. Returns `None` for unknown emails, wrong passwords,
/// and deactivated accounts alike; callers cannot distinguish which check
/// failed.
pub async fn verify_credentials(
    users: &dyn UserRepository,
    email: &str,
    password: &SecretString,
) -> Result<Option<User>, AuthError> {
    let Some(user) = users.find_by_email(email).await? else {
        return Ok(None);
    };

    if !user.is_active {
        return Ok(None);
    }

    if bcrypt::verify(password.expose_secret(), &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use ticketry_core::domain::category::{CompanyId, DepartmentId};
    use ticketry_core::domain::user::{Role, User, UserId};

    use super::{hash_password, verify_credentials};
    use crate::repositories::{InMemoryUserRepository, UserRepository};

    async fn store_user(repo: &InMemoryUserRepository, email: &str, password: &str, active: bool) {
        let now = Utc::now();
        let hash = hash_password(&SecretString::from(password.to_string())).expect("hash");
        repo.save(User {
            id: UserId(format!("u-{email}")),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash,
            role: Role::User,
            department_id: DepartmentId("d-1".to_string()),
            company_id: CompanyId("c-1".to_string()),
            site_id: None,
            reporting_manager_id: None,
            is_active: active,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("save user");
    }

    #[tokio::test]
    async fn accepts_matching_credentials() {
        let repo = InMemoryUserRepository::default();
        store_user(&repo, "dana@corp.test", "s3cret-pass", true).await;

        let user =
            verify_credentials(&repo, "dana@corp.test", &SecretString::from("s3cret-pass"))
                .await
                .expect("verify");
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn rejects_wrong_password_and_unknown_email() {
        let repo = InMemoryUserRepository::default();
        store_user(&repo, "dana@corp.test", "s3cret-pass", true).await;

        let wrong = verify_credentials(&repo, "dana@corp.test", &SecretString::from("nope"))
            .await
            .expect("verify");
        assert!(wrong.is_none());

        let unknown = verify_credentials(&repo, "ghost@corp.test", &SecretString::from("x"))
            .await
            .expect("verify");
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn rejects_deactivated_accounts() {
        let repo = InMemoryUserRepository::default();
        store_user(&repo, "old@corp.test", "s3cret-pass", false).await;

        let user = verify_credentials(&repo, "old@corp.test", &SecretString::from("s3cret-pass"))
            .await
            .expect("verify");
        assert!(user.is_none());
    }
}
