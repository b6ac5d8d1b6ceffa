use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A shipment request between a sender and a recipient, bound to a
/// booking branch and a destination branch. Never deleted; referenced by
/// at most one order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cargo")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub weight: Decimal,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub destination_id: Uuid,
    pub booking_branch_id: Uuid,
    pub booking_agent_id: Uuid,
    pub clearing_agent_id: Uuid,
    pub current_location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id"
    )]
    Recipient,
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::DestinationId",
        to = "super::branch::Column::Id"
    )]
    Destination,
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BookingBranchId",
        to = "super::branch::Column::Id"
    )]
    BookingBranch,
    #[sea_orm(has_one = "super::order::Entity")]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
