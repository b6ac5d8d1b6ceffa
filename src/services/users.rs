use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, Role};
use crate::entities::user::{self, Entity as UserEntity, Model as UserModel};
use crate::errors::ServiceError;
use crate::services::require_str;

/// Input for account creation; agents and customers share the shape.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Service for managing user accounts.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Public registration: always a customer account.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: CreateUserInput) -> Result<UserModel, ServiceError> {
        self.create_user(input, Role::Customer).await
    }

    /// Agent-account creation; the admin-only gate sits at the route.
    #[instrument(skip(self, input))]
    pub async fn create_agent(&self, input: CreateUserInput) -> Result<UserModel, ServiceError> {
        self.create_user(input, Role::Agent).await
    }

    async fn create_user(
        &self,
        input: CreateUserInput,
        role: Role,
    ) -> Result<UserModel, ServiceError> {
        let username = require_str("username", input.username)?;
        let email = require_str("email", input.email)?;
        let password = require_str("password", input.password)?;

        if !email.contains('@') {
            return Err(ServiceError::validation(
                "email",
                "Enter a valid email address.",
            ));
        }

        let now = Utc::now();
        let record = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email.clone()),
            password_hash: Set(hash_password(&password)?),
            role: Set(role.as_str().to_string()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = match record.insert(&*self.db).await {
            Ok(model) => model,
            Err(err) => {
                return Err(match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::validation(
                        "email",
                        "A user with that email address already exists.",
                    ),
                    _ => ServiceError::DatabaseError(err),
                })
            }
        };

        info!(user_id = %model.id, role = %role, "user account created");
        Ok(model)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, ServiceError> {
        let user = UserEntity::find_by_id(id).one(&*self.db).await?;
        Ok(user)
    }

    /// Resolve an email to an active staff account, the way branch and
    /// agent assignment wants it.
    pub async fn find_active_agent_by_email(
        &self,
        email: &str,
    ) -> Result<UserModel, ServiceError> {
        let not_an_agent = || {
            ServiceError::invalid("There is no agent registered with the provided email address.")
        };

        let user = self.find_by_email(email).await?.ok_or_else(not_an_agent)?;
        let role: Role = user.role.parse()?;
        if !user.active || role < Role::Agent {
            return Err(not_an_agent());
        }
        Ok(user)
    }

    /// Password login. Failures are deliberately indistinguishable.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let rejected = || ServiceError::AuthError("Invalid email or password".to_string());

        let user = self.find_by_email(email).await?.ok_or_else(rejected)?;
        if !user.active || !verify_password(password, &user.password_hash) {
            return Err(rejected());
        }
        Ok(user)
    }
}
