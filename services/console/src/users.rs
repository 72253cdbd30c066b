//! Staff user management

use common::{ApiClient, ApiError, UserRole};
use password::PasswordGenerator;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::validation::{validate_email, validate_full_name, validate_password, validate_username};

/// Staff account as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
}

/// Operator input for a new account; the password may be left to the generator
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub password: Option<String>,
}

/// Request body for `POST /users`
#[derive(Debug, Clone, Serialize)]
pub struct NewStaffUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub password: String,
}

impl NewStaffUser {
    /// Check every field, collecting all problems
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = validate_username(&self.username) {
            errors.push(e);
        }
        if let Err(e) = validate_email(&self.email) {
            errors.push(e);
        }
        if let Err(e) = validate_full_name(self.full_name.as_deref()) {
            errors.push(e);
        }
        if let Err(mut e) = validate_password(&self.password) {
            errors.append(&mut e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A created account, with the generated password when one was generated
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: StaffUser,
    pub generated_password: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateUser {
    is_active: bool,
}

#[derive(Debug, Serialize)]
struct ResetPassword<'a> {
    new_password: &'a str,
}

/// Custom error type for user operations
#[derive(Error, Debug)]
pub enum UserError {
    /// Input rejected before anything was sent
    #[error("Invalid user details: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Client for the staff user endpoints
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    /// Create a new user service over an authorized client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List every staff account
    pub async fn list(&self) -> Result<Vec<StaffUser>, UserError> {
        Ok(self.client.get_json("users", &[]).await?)
    }

    /// Create an account, generating a password when none was given
    pub async fn create<R: Rng>(
        &self,
        draft: UserDraft,
        generator: &mut PasswordGenerator<R>,
    ) -> Result<CreatedUser, UserError> {
        let (password, generated) = match draft.password {
            Some(password) => (password, false),
            None => (generator.generate(), true),
        };

        let new_user = NewStaffUser {
            username: draft.username.trim().to_string(),
            email: draft.email.trim().to_string(),
            full_name: draft.full_name.map(|n| n.trim().to_string()),
            role: draft.role,
            password,
        };
        new_user.validate().map_err(UserError::Invalid)?;

        let user: StaffUser = self.client.post_json("users", &new_user).await?;
        info!("Created {} account {}", user.role.as_str(), user.username);

        Ok(CreatedUser {
            user,
            generated_password: generated.then_some(new_user.password),
        })
    }

    /// Enable or disable an account
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<StaffUser, UserError> {
        let user: StaffUser = self
            .client
            .put_json(&format!("users/{}", id), &UpdateUser { is_active })
            .await?;
        info!(
            "{} account {}",
            if is_active { "Activated" } else { "Deactivated" },
            user.username
        );
        Ok(user)
    }

    /// Delete an account
    pub async fn delete(&self, id: i64) -> Result<(), UserError> {
        self.client.delete(&format!("users/{}", id)).await?;
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Set a new password, generating one when none was given
    ///
    /// Returns the password that was set.
    pub async fn reset_password<R: Rng>(
        &self,
        id: i64,
        password: Option<String>,
        generator: &mut PasswordGenerator<R>,
    ) -> Result<String, UserError> {
        let password = password.unwrap_or_else(|| generator.generate());
        validate_password(&password).map_err(UserError::Invalid)?;

        self.client
            .post_empty(
                &format!("users/{}/reset-password", id),
                &ResetPassword {
                    new_password: &password,
                },
            )
            .await?;
        info!("Reset password for user {}", id);
        Ok(password)
    }
}
