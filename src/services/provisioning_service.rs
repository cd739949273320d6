use crate::auth::password::hash_password;
use crate::error::{ProvisioningError, Result, ValidationError};
use crate::models::user::{NewUser, User, UserRole};
use crate::repositories::user_repository::{
    RepositoryError, RepositoryResult, UserRepository, UserSession,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_SUPERADMIN_EMAIL: &str = "admin@family.com";
pub const DEFAULT_SUPERADMIN_FULL_NAME: &str = "Super Admin";

pub struct CreateSuperadminRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub full_name: String,
    /// Report an existing account with the same email instead of failing.
    pub skip_existing: bool,
}

#[derive(Debug)]
pub enum ProvisioningOutcome {
    Created(User),
    AlreadyExists(User),
}

impl ProvisioningOutcome {
    pub fn user(&self) -> &User {
        match self {
            ProvisioningOutcome::Created(user) | ProvisioningOutcome::AlreadyExists(user) => user,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ProvisioningOutcome::Created(_))
    }
}

pub struct ProvisioningService {
    repository: Arc<dyn UserRepository>,
}

impl ProvisioningService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Insert one active super-admin user.
    ///
    /// The session is acquired only after validation and hashing succeed, and
    /// it is closed exactly once whether the insert commits or rolls back.
    pub async fn create_superadmin(
        &self,
        request: CreateSuperadminRequest,
    ) -> Result<ProvisioningOutcome> {
        self.validate(&request)?;
        let skip_existing = request.skip_existing;

        if skip_existing {
            if let Some(existing) = self.repository.find_by_email(&request.email).await? {
                log_existing(&existing);
                return Ok(ProvisioningOutcome::AlreadyExists(existing));
            }
        }

        let hashed_password = hash_password(&request.password)
            .map_err(|e| ProvisioningError::Hashing(e.to_string()))?;

        let new_user = NewUser {
            email: request.email,
            hashed_password,
            full_name: request.full_name,
            is_active: true,
            role: UserRole::SuperAdmin,
        };

        let mut session = self.repository.open_session().await?;
        let written = write(session.as_mut(), &new_user).await;
        let committed = written.is_ok();
        let result = match written {
            Ok(()) => session.refresh().await,
            Err(err) => Err(err),
        };

        if let Err(ref err) = result {
            warn!(email = %new_user.email, error = %err, "provisioning failed, rolling back");
            if let Err(rollback_err) = session.rollback().await {
                error!(error = %rollback_err, "rollback failed");
            }
        }
        session.close();

        let user = match result {
            Ok(user) => user,
            Err(err) => {
                // Another run may have inserted the same email between the
                // lookup above and our insert.
                if skip_existing && !committed {
                    if let Some(existing) = self.lookup_after_conflict(&new_user.email).await {
                        log_existing(&existing);
                        return Ok(ProvisioningOutcome::AlreadyExists(existing));
                    }
                }
                return Err(match err {
                    RepositoryError::AlreadyExists => ProvisioningError::EmailTaken,
                    other => ProvisioningError::Storage(other),
                });
            }
        };

        info!(
            user_id = user.id,
            email = %user.email,
            super_admin = user.role.is_super_admin(),
            "superadmin created"
        );
        Ok(ProvisioningOutcome::Created(user))
    }

    async fn lookup_after_conflict(&self, email: &str) -> Option<User> {
        match self.repository.find_by_email(email).await {
            Ok(found) => found,
            Err(err) => {
                warn!(email = %email, error = %err, "lookup after failed insert failed");
                None
            }
        }
    }

    fn validate(&self, request: &CreateSuperadminRequest) -> std::result::Result<(), ValidationError> {
        validate_email(&request.email)?;

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(ValidationError::PasswordMismatch);
            }
        }

        validate_password(&request.password)?;

        if request.full_name.trim().is_empty() {
            return Err(ValidationError::MissingFullName);
        }
        Ok(())
    }
}

async fn write(session: &mut dyn UserSession, user: &NewUser) -> RepositoryResult<()> {
    session.add(user).await?;
    session.commit().await
}

fn log_existing(existing: &User) {
    if existing.role.is_super_admin() {
        info!(user_id = existing.id, email = %existing.email, "superadmin already exists, skipping");
    } else {
        warn!(
            user_id = existing.id,
            email = %existing.email,
            role = %existing.role,
            "email belongs to a user without super_admin role, skipping"
        );
    }
}

fn validate_email(email: &str) -> std::result::Result<(), ValidationError> {
    if !email.contains('@') || email.len() > 255 {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn validate_password(password: &str) -> std::result::Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}
