//! Mock session validator for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, ADMIN_ROLE};
use crate::ports::SessionValidator;

/// Maps fixed tokens to users; unknown tokens are `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a token for a generated user with the given id.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str) -> Self {
        let user = test_user(user_id);
        self.with_user(token, user)
    }

    /// Adds a token for a generated administrator.
    pub fn with_admin(self, token: impl Into<String>, user_id: &str) -> Self {
        let user = test_user(user_id).with_role(ADMIN_ROLE);
        self.with_user(token, user)
    }

    /// Forces every validation to fail with `error`.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(|p| p.into_inner()) = Some(error);
        self
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(token.into(), user);
    }
}

fn test_user(user_id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(user_id).expect("test user id must not be blank"),
        format!("{}@test.example.com", user_id),
        Some(format!("Test {}", user_id)),
    )
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self.force_error.read().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
