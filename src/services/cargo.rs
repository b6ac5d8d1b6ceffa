use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::branch::{Entity as BranchEntity, Model as BranchModel};
use crate::entities::cargo::{self, Entity as CargoEntity, Model as CargoModel};
use crate::entities::user::{self, Entity as UserEntity, Model as UserModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::branches::BranchService;
use crate::services::users::UserService;
use crate::services::{require, require_str};

/// Cargo payload with foreign keys resolved to emails and cities.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CargoResponse {
    pub id: Uuid,
    pub title: String,
    pub sender: String,
    pub recipient: String,
    pub destination: String,
    pub booking_station: String,
    pub booking_agent: String,
    pub clearing_agent: String,
    /// Rendered to two decimals, matching the stored scale.
    pub weight: String,
    pub current_location: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCargoInput {
    pub title: Option<String>,
    pub recipient: Option<String>,
    pub destination: Option<String>,
    pub booking_station: Option<String>,
    pub weight: Option<Decimal>,
}

/// Mutable subset of a cargo record. Everything else in a PATCH body is
/// dropped at deserialization, which is what makes the immutable fields
/// immutable.
#[derive(Debug, Clone, Default)]
pub struct UpdateCargoInput {
    pub current_location: Option<String>,
    pub destination: Option<String>,
}

/// Visibility filter over cargo rows for the acting user. `None` means
/// unrestricted (admin).
pub(crate) fn scope_condition(actor: &AuthUser) -> Option<Condition> {
    if actor.is_admin() {
        return None;
    }
    let condition = if actor.is_staff() {
        Condition::any()
            .add(cargo::Column::BookingAgentId.eq(actor.user_id))
            .add(cargo::Column::ClearingAgentId.eq(actor.user_id))
    } else {
        Condition::any()
            .add(cargo::Column::SenderId.eq(actor.user_id))
            .add(cargo::Column::RecipientId.eq(actor.user_id))
    };
    Some(condition)
}

/// Service for the cargo ledger.
#[derive(Clone)]
pub struct CargoService {
    db: Arc<DatabaseConnection>,
    users: UserService,
    branches: BranchService,
    event_sender: EventSender,
}

impl CargoService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        users: UserService,
        branches: BranchService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            users,
            branches,
            event_sender,
        }
    }

    #[instrument(skip(self, sender, input), fields(sender_id = %sender.id))]
    pub async fn create_cargo(
        &self,
        sender: &UserModel,
        input: CreateCargoInput,
    ) -> Result<CargoModel, ServiceError> {
        let title = require_str("title", input.title)?;
        let recipient_email = require_str("recipient", input.recipient)?;
        let destination_city = require_str("destination", input.destination)?;
        let booking_city = require_str("booking_station", input.booking_station)?;
        let weight = require("weight", input.weight)?;

        if weight <= Decimal::ZERO {
            return Err(ServiceError::validation(
                "weight",
                "weight must be greater than 0.",
            ));
        }

        let destination = self
            .branches
            .search_by_city_exact(&destination_city)
            .await?
            .ok_or_else(|| {
                ServiceError::validation("destination", "We don't have a branch in that city.")
            })?;
        let booking_station = self
            .branches
            .search_by_city_exact(&booking_city)
            .await?
            .ok_or_else(|| {
                ServiceError::validation("booking_station", "We don't have a branch in that city.")
            })?;

        if destination.city == booking_station.city {
            return Err(ServiceError::validation(
                "destination",
                "You cannot send a parcel to the same origin.",
            ));
        }

        let recipient = self
            .users
            .find_by_email(&recipient_email)
            .await?
            .ok_or_else(|| {
                ServiceError::invalid("There is no user registered with that email.")
            })?;

        if sender.id == recipient.id {
            return Err(ServiceError::invalid("Users cannot send themselves parcels."));
        }

        let now = Utc::now();
        let record = cargo::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title),
            weight: Set(weight),
            sender_id: Set(sender.id),
            recipient_id: Set(recipient.id),
            destination_id: Set(destination.id),
            booking_branch_id: Set(booking_station.id),
            booking_agent_id: Set(booking_station.agent_id),
            clearing_agent_id: Set(destination.agent_id),
            current_location: Set("pending".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;
        let model = record.insert(&txn).await?;
        txn.commit().await?;

        info!(cargo_id = %model.id, "cargo booked");

        // Notification is best-effort; the booking is already committed.
        match self.users.find_by_id(booking_station.agent_id).await {
            Ok(Some(agent)) => {
                self.event_sender
                    .send(Event::CargoBooked {
                        cargo_id: model.id,
                        city: booking_station.city,
                        sender_email: sender.email.clone(),
                        agent_email: agent.email,
                    })
                    .await;
            }
            Ok(None) => warn!(cargo_id = %model.id, "booking agent account vanished"),
            Err(err) => {
                warn!(error = %err, cargo_id = %model.id, "cargo notification could not be prepared")
            }
        }

        Ok(model)
    }

    pub async fn list_scoped(&self, actor: &AuthUser) -> Result<Vec<CargoModel>, ServiceError> {
        let mut query = CargoEntity::find().order_by_desc(cargo::Column::CreatedAt);
        if let Some(condition) = scope_condition(actor) {
            query = query.filter(condition);
        }
        let records = query.all(&*self.db).await?;
        Ok(records)
    }

    /// Fetch one cargo the actor is allowed to see. Rows outside the
    /// actor's scope report not-found, same as rows that don't exist.
    pub async fn get_scoped(
        &self,
        id: Uuid,
        actor: &AuthUser,
    ) -> Result<CargoModel, ServiceError> {
        let mut query = CargoEntity::find().filter(cargo::Column::Id.eq(id));
        if let Some(condition) = scope_condition(actor) {
            query = query.filter(condition);
        }
        query
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cargo not found.".to_string()))
    }

    /// Apply a staff update. Re-routing the destination re-points the
    /// clearing agent at the new destination branch's agent.
    #[instrument(skip(self, actor, input), fields(cargo_id = %id))]
    pub async fn update_cargo(
        &self,
        id: Uuid,
        actor: &AuthUser,
        input: UpdateCargoInput,
    ) -> Result<CargoModel, ServiceError> {
        let current = self.get_scoped(id, actor).await?;
        let booking_branch =
            self.branches
                .find_by_id(current.booking_branch_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "cargo {} references a missing booking branch",
                        current.id
                    ))
                })?;

        let mut active: cargo::ActiveModel = current.into();

        if let Some(city) = input.destination {
            let destination = self
                .branches
                .search_by_city_exact(&city)
                .await?
                .ok_or_else(|| {
                    ServiceError::validation("destination", "We don't have a branch in that city.")
                })?;
            if destination.city == booking_branch.city {
                return Err(ServiceError::validation(
                    "destination",
                    "You cannot send a parcel to the same origin.",
                ));
            }
            active.destination_id = Set(destination.id);
            active.clearing_agent_id = Set(destination.agent_id);
        }

        if let Some(location) = input.current_location {
            if !location.trim().is_empty() {
                active.current_location = Set(location);
            }
        }

        active.updated_at = Set(Utc::now());
        let model = active.update(&*self.db).await?;
        Ok(model)
    }

    async fn load_users(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, UserModel>, ServiceError> {
        let users = UserEntity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn load_branches(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, BranchModel>, ServiceError> {
        let branches = BranchEntity::find()
            .filter(crate::entities::branch::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?;
        Ok(branches.into_iter().map(|b| (b.id, b)).collect())
    }

    pub async fn to_response(&self, model: CargoModel) -> Result<CargoResponse, ServiceError> {
        let mut responses = self.to_responses(vec![model]).await?;
        responses
            .pop()
            .ok_or_else(|| ServiceError::InternalError("cargo response vanished".to_string()))
    }

    /// Resolve the foreign keys of a batch of cargo rows to emails and
    /// city names for serialization.
    pub async fn to_responses(
        &self,
        models: Vec<CargoModel>,
    ) -> Result<Vec<CargoResponse>, ServiceError> {
        let user_ids: Vec<Uuid> = models
            .iter()
            .flat_map(|m| {
                [
                    m.sender_id,
                    m.recipient_id,
                    m.booking_agent_id,
                    m.clearing_agent_id,
                ]
            })
            .collect();
        let branch_ids: Vec<Uuid> = models
            .iter()
            .flat_map(|m| [m.destination_id, m.booking_branch_id])
            .collect();

        let users = self.load_users(user_ids).await?;
        let branches = self.load_branches(branch_ids).await?;

        let email = |id: Uuid| -> Result<String, ServiceError> {
            users
                .get(&id)
                .map(|u| u.email.clone())
                .ok_or_else(|| {
                    ServiceError::InternalError(format!("cargo references missing user {id}"))
                })
        };
        let city = |id: Uuid| -> Result<String, ServiceError> {
            branches
                .get(&id)
                .map(|b| b.city.clone())
                .ok_or_else(|| {
                    ServiceError::InternalError(format!("cargo references missing branch {id}"))
                })
        };

        models
            .into_iter()
            .map(|m| {
                Ok(CargoResponse {
                    id: m.id,
                    title: m.title,
                    sender: email(m.sender_id)?,
                    recipient: email(m.recipient_id)?,
                    destination: city(m.destination_id)?,
                    booking_station: city(m.booking_branch_id)?,
                    booking_agent: email(m.booking_agent_id)?,
                    clearing_agent: email(m.clearing_agent_id)?,
                    weight: format!("{:.2}", m.weight),
                    current_location: m.current_location,
                    created_at: m.created_at,
                    message: None,
                })
            })
            .collect()
    }
}
