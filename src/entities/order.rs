use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The priced, tracked realization of a cargo booking. Price and both
/// delivery estimates are computed once at creation; only the
/// status/progress fields mutate afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cargo_id: Uuid,
    pub price_per_unit_weight: Decimal,
    pub price: Decimal,
    pub status: String,
    pub past_main_branch: bool,
    pub cargo_picked_up: bool,
    pub estimated_time_to_main_station: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub tracking_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cargo::Entity",
        from = "Column::CargoId",
        to = "super::cargo::Column::Id"
    )]
    Cargo,
}

impl Related<super::cargo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cargo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
