use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::branch::{self, Entity as BranchEntity, Model as BranchModel};
use crate::entities::user::{Entity as UserEntity, Model as UserModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::require_str;
use crate::services::users::UserService;

/// Branch payload with the agent id resolved to an email address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchResponse {
    pub id: Uuid,
    pub city: String,
    pub branch_agent: String,
    pub main_branch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Input for branch creation; `branch_agent` is an email address.
#[derive(Debug, Clone)]
pub struct CreateBranchInput {
    pub city: Option<String>,
    pub branch_agent: Option<String>,
    pub main_branch: bool,
}

/// Service for the branch registry: one city, one agent, at most one
/// main branch globally.
#[derive(Clone)]
pub struct BranchService {
    db: Arc<DatabaseConnection>,
    users: UserService,
    event_sender: EventSender,
}

impl BranchService {
    pub fn new(db: Arc<DatabaseConnection>, users: UserService, event_sender: EventSender) -> Self {
        Self {
            db,
            users,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(city = ?input.city))]
    pub async fn create_branch(
        &self,
        input: CreateBranchInput,
    ) -> Result<BranchModel, ServiceError> {
        let agent_email = match input.branch_agent {
            Some(email) if !email.trim().is_empty() => email,
            _ => {
                return Err(ServiceError::validation(
                    "branch_agent",
                    "Branches must have an agent.",
                ))
            }
        };
        let agent = self.users.find_active_agent_by_email(&agent_email).await?;

        let city = require_str("city", input.city).map_err(|_| {
            ServiceError::validation("city", "Branches must have a city.")
        })?;

        if self.search_by_city_exact(&city).await?.is_some() {
            return Err(ServiceError::validation(
                "city",
                "There already exists a branch in this city.",
            ));
        }

        let assigned = BranchEntity::find()
            .filter(branch::Column::AgentId.eq(agent.id))
            .one(&*self.db)
            .await?;
        if assigned.is_some() {
            return Err(ServiceError::validation(
                "branch_agent",
                "This agent is already assigned to another branch.",
            ));
        }

        if input.main_branch {
            let existing_main = BranchEntity::find()
                .filter(branch::Column::MainBranch.eq(true))
                .one(&*self.db)
                .await?;
            if existing_main.is_some() {
                return Err(ServiceError::validation(
                    "main_branch",
                    "There can only be one main branch.",
                ));
            }
        }

        let record = branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            city: Set(city.clone()),
            agent_id: Set(agent.id),
            main_branch: Set(input.main_branch),
            created_at: Set(Utc::now()),
        };

        let txn = self.db.begin().await?;
        let model = match record.insert(&txn).await {
            Ok(model) => model,
            Err(err) => {
                // Lost a creation race; surface it as the same domain
                // failure the precheck reports.
                return Err(match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("agent") => {
                        ServiceError::validation(
                            "branch_agent",
                            "This agent is already assigned to another branch.",
                        )
                    }
                    Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::validation(
                        "city",
                        "There already exists a branch in this city.",
                    ),
                    _ => ServiceError::DatabaseError(err),
                });
            }
        };
        txn.commit().await?;

        info!(branch_id = %model.id, city = %model.city, "branch created");

        self.event_sender
            .send(Event::BranchCreated {
                branch_id: model.id,
                city: model.city.clone(),
                agent_email: agent.email,
            })
            .await;

        Ok(model)
    }

    /// Case-insensitive substring search. An empty query matches
    /// nothing rather than everything.
    pub async fn search_by_city(&self, city: &str) -> Result<Vec<BranchModel>, ServiceError> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(Vec::new());
        }

        let branches = BranchEntity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(branch::Column::City)))
                    .like(format!("%{}%", city.to_lowercase())),
            )
            .order_by_asc(branch::Column::City)
            .all(&*self.db)
            .await?;
        Ok(branches)
    }

    /// Exact city match; uniqueness makes "first hit" the only hit.
    pub async fn search_by_city_exact(
        &self,
        city: &str,
    ) -> Result<Option<BranchModel>, ServiceError> {
        let branch = BranchEntity::find()
            .filter(branch::Column::City.eq(city))
            .one(&*self.db)
            .await?;
        Ok(branch)
    }

    pub async fn list_branches(&self) -> Result<Vec<BranchModel>, ServiceError> {
        let branches = BranchEntity::find()
            .order_by_asc(branch::Column::City)
            .all(&*self.db)
            .await?;
        Ok(branches)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BranchModel>, ServiceError> {
        let branch = BranchEntity::find_by_id(id).one(&*self.db).await?;
        Ok(branch)
    }

    async fn agent_for(&self, model: &BranchModel) -> Result<UserModel, ServiceError> {
        UserEntity::find_by_id(model.agent_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "branch {} references a missing agent account",
                    model.id
                ))
            })
    }

    /// Resolve the agent id to an email for serialization.
    pub async fn to_response(&self, model: BranchModel) -> Result<BranchResponse, ServiceError> {
        let agent = self.agent_for(&model).await?;
        Ok(BranchResponse {
            id: model.id,
            city: model.city,
            branch_agent: agent.email,
            main_branch: model.main_branch,
            message: None,
        })
    }

    pub async fn to_responses(
        &self,
        models: Vec<BranchModel>,
    ) -> Result<Vec<BranchResponse>, ServiceError> {
        let mut responses = Vec::with_capacity(models.len());
        for model in models {
            responses.push(self.to_response(model).await?);
        }
        Ok(responses)
    }
}
