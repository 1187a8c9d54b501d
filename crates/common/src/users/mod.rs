//! Account creation and credential checks
//!
//! Shared by the HTTP registration/login endpoints and the `create-admin`
//! console command.

use crate::auth::{hash_password, verify_password};
use crate::db::models::User;
use crate::db::{NewUser, Repository};
use crate::errors::{AppError, Result};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

/// Keep in sync with the `password` length rule below
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Input for creating any account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[serde(default)]
    #[validate(email)]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 3, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_characters"))
    }
}

impl CreateUser {
    /// Required-field check, then format validation
    pub fn check(&self) -> Result<()> {
        for (field, value) in [("email", &self.email), ("username", &self.username), ("password", &self.password)] {
            if value.trim().is_empty() {
                return Err(AppError::MissingField { field: field.to_string() });
            }
        }
        self.validate()?;
        Ok(())
    }
}

/// Creates accounts and verifies credentials
#[derive(Clone)]
pub struct UserService {
    repo: Repository,
}

impl UserService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Regular account
    pub async fn create_user(&self, input: CreateUser) -> Result<User> {
        self.create(input, false).await
    }

    /// Staff + superuser account
    pub async fn create_superuser(&self, input: CreateUser) -> Result<User> {
        self.create(input, true).await
    }

    async fn create(&self, input: CreateUser, privileged: bool) -> Result<User> {
        input.check()?;

        let user = self
            .repo
            .create_user(NewUser {
                email: input.email,
                username: input.username,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                password_hash: hash_password(&input.password)?,
                is_staff: privileged,
                is_superuser: privileged,
            })
            .await?;

        info!(
            user_id = %user.id,
            username = %user.username,
            superuser = privileged,
            "User created"
        );

        Ok(user)
    }

    /// Email/password login. Unknown, inactive and wrong-password all look alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        self.repo.touch_last_login(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    fn input(email: &str, username: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            username: username.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "engine-no-2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_superuser_sets_flags() {
        let service = UserService::new(test_support::memory_repository().await);

        let user = service.create_superuser(input("Ada@Example.com", "ada")).await.unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "engine-no-2");
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username() {
        let service = UserService::new(test_support::memory_repository().await);
        service.create_user(input("ada@example.com", "ada")).await.unwrap();

        let err = service.create_user(input("ADA@example.com", "other")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail { .. }));

        let err = service.create_user(input("new@example.com", "ada")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername { .. }));
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let service = UserService::new(test_support::memory_repository().await);

        let err = service.create_user(input("", "ada")).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "email"));

        let err = service.create_user(input("not-an-email", "ada")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let mut short = input("ada@example.com", "ada");
        short.password = "short".to_string();
        let err = service.create_user(short).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = service.create_user(input("ada@example.com", "a d a")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let service = UserService::new(test_support::memory_repository().await);
        service.create_user(input("ada@example.com", "ada")).await.unwrap();

        let user = service.authenticate("ada@example.com", "engine-no-2").await.unwrap();
        assert!(user.last_login.is_some());

        let err = service.authenticate("ada@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = service.authenticate("nobody@example.com", "engine-no-2").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
