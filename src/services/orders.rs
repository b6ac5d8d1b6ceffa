use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::cargo::{Entity as CargoEntity, Model as CargoModel};
use crate::entities::order::{self, Entity as OrderEntity, Model as OrderModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::cargo::{scope_condition, CargoService};
use crate::services::require;

/// Shipment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InTransit,
    Delivered,
}

impl OrderStatus {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Human-readable form used in responses and notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(status: &str) -> Result<Self, ServiceError> {
        match status.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "in_transit" | "in transit" => Ok(OrderStatus::InTransit),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(ServiceError::validation(
                "status",
                format!("Unknown order status: {other}"),
            )),
        }
    }
}

/// Cargo details embedded in an order payload, foreign keys resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCargoDetail {
    pub sender: String,
    pub recipient: String,
    pub booking_agent: String,
    pub clearing_agent: String,
    pub destination: String,
    /// Rendered to three decimals, matching the pricing arithmetic.
    pub weight: String,
}

/// Order payload returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub tracking_id: Uuid,
    pub status: String,
    /// Rendered to three decimals regardless of storage backend.
    pub price: String,
    pub price_per_unit_weight: String,
    pub past_main_branch: bool,
    pub cargo_picked_up: bool,
    pub estimated_time_to_main_station: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub cargo: OrderCargoDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub cargo: Option<Uuid>,
    pub price_per_unit_weight: Option<Decimal>,
    pub past_main_branch: bool,
    pub status: Option<String>,
}

/// Mutable subset of an order. Price, the estimates and the tracking id
/// never appear here; PATCH bodies naming them are silently stripped.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrderInput {
    pub status: Option<String>,
    pub past_main_branch: Option<bool>,
    pub cargo_picked_up: Option<bool>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
}

/// Total price: the untaxed subtotal plus an 18% surcharge on top,
/// quantized to three decimals.
pub(crate) fn calculate_price(weight: Decimal, price_per_unit_weight: Decimal) -> Decimal {
    let untaxed = weight * price_per_unit_weight;
    (untaxed * dec!(0.18) + untaxed).round_dp(3)
}

/// Simulated delivery expectation: a uniformly random whole-second
/// delivery offset in [300, 600), with arrival at the main station at
/// exactly half that offset.
pub(crate) fn approximate_delivery_offsets() -> (ChronoDuration, ChronoDuration) {
    let delivery_secs: i64 = rand::thread_rng().gen_range(300..600);
    let to_main_station = ChronoDuration::milliseconds(delivery_secs * 500);
    (to_main_station, ChronoDuration::seconds(delivery_secs))
}

/// Service for the order ledger.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    cargo: CargoService,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, cargo: CargoService, event_sender: EventSender) -> Self {
        Self {
            db,
            cargo,
            event_sender,
        }
    }

    async fn find_by_cargo(&self, cargo_id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        let existing = OrderEntity::find()
            .filter(order::Column::CargoId.eq(cargo_id))
            .one(&*self.db)
            .await?;
        Ok(existing)
    }

    /// Idempotent order creation. The first call for a cargo computes
    /// price, estimates and tracking id; every later call returns the
    /// stored order untouched, flagged `created = false`.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id))]
    pub async fn get_or_create_order(
        &self,
        actor: &AuthUser,
        input: CreateOrderInput,
    ) -> Result<(OrderModel, bool), ServiceError> {
        let cargo_id = input.cargo.ok_or_else(|| {
            ServiceError::validation("cargo", "You must provide cargo for this order.")
        })?;

        let cargo_record = self.cargo.get_scoped(cargo_id, actor).await.map_err(|err| {
            match err {
                ServiceError::NotFound(_) => {
                    ServiceError::NotFound("Provided cargo does not exist.".to_string())
                }
                other => other,
            }
        })?;

        if let Some(existing) = self.find_by_cargo(cargo_record.id).await? {
            return Ok((existing, false));
        }

        let price_per_unit_weight = require("price_per_unit_weight", input.price_per_unit_weight)?;
        if price_per_unit_weight <= Decimal::ZERO {
            return Err(ServiceError::validation(
                "price_per_unit_weight",
                "Please provide the price for this order greater than 0.",
            ));
        }

        let status = match input.status.as_deref() {
            Some(raw) => OrderStatus::parse(raw)?,
            None => OrderStatus::Pending,
        };

        let now = Utc::now();
        let price = calculate_price(cargo_record.weight, price_per_unit_weight);
        let (to_main_station, to_delivery) = approximate_delivery_offsets();

        let record = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            cargo_id: Set(cargo_record.id),
            price_per_unit_weight: Set(price_per_unit_weight),
            price: Set(price),
            status: Set(status.as_str().to_string()),
            past_main_branch: Set(input.past_main_branch),
            cargo_picked_up: Set(false),
            estimated_time_to_main_station: Set(now + to_main_station),
            estimated_delivery_time: Set(now + to_delivery),
            actual_delivery_time: Set(None),
            tracking_id: Set(Uuid::new_v4()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;
        let model = match record.insert(&txn).await {
            Ok(model) => model,
            Err(err) => {
                // Another request finalized this cargo first; hand back
                // its order instead of failing.
                if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
                    if let Some(existing) = self.find_by_cargo(cargo_record.id).await? {
                        return Ok((existing, false));
                    }
                }
                return Err(ServiceError::DatabaseError(err));
            }
        };
        txn.commit().await?;

        info!(order_id = %model.id, cargo_id = %cargo_record.id, "order created");

        // Notification is best-effort; the order is already committed.
        if let Err(err) = self.notify_order_created(&model, &cargo_record, status).await {
            warn!(error = %err, order_id = %model.id, "order notification could not be prepared");
        }

        Ok((model, true))
    }

    async fn notify_order_created(
        &self,
        model: &OrderModel,
        cargo_record: &CargoModel,
        status: OrderStatus,
    ) -> Result<(), ServiceError> {
        let detail = self.cargo.to_response(cargo_record.clone()).await?;
        self.event_sender
            .send(Event::OrderCreated {
                order_id: model.id,
                tracking_id: model.tracking_id,
                status: status.display_name().to_string(),
                price: model.price,
                booking_agent_email: detail.booking_agent,
                sender_email: detail.sender,
                recipient_email: detail.recipient,
            })
            .await;
        Ok(())
    }

    pub async fn list_scoped(
        &self,
        actor: &AuthUser,
    ) -> Result<Vec<(OrderModel, CargoModel)>, ServiceError> {
        let mut query = OrderEntity::find()
            .find_also_related(CargoEntity)
            .order_by_desc(order::Column::CreatedAt);
        if let Some(condition) = scope_condition(actor) {
            query = query.filter(condition);
        }

        let rows = query.all(&*self.db).await?;
        rows.into_iter()
            .map(|(order, cargo)| {
                let cargo = cargo.ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "order {} references a missing cargo record",
                        order.id
                    ))
                })?;
                Ok((order, cargo))
            })
            .collect()
    }

    /// Public lookup key is the tracking id, never the row id.
    pub async fn get_by_tracking_scoped(
        &self,
        tracking_id: Uuid,
        actor: &AuthUser,
    ) -> Result<(OrderModel, CargoModel), ServiceError> {
        let mut query = OrderEntity::find()
            .find_also_related(CargoEntity)
            .filter(order::Column::TrackingId.eq(tracking_id));
        if let Some(condition) = scope_condition(actor) {
            query = query.filter(condition);
        }

        let (order, cargo) = query
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found.".to_string()))?;
        let cargo = cargo.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "order {} references a missing cargo record",
                order.id
            ))
        })?;
        Ok((order, cargo))
    }

    /// Staff update of the mutable progress fields. Price and the two
    /// estimates are never recomputed here.
    #[instrument(skip(self, actor, input), fields(tracking_id = %tracking_id))]
    pub async fn update_order(
        &self,
        tracking_id: Uuid,
        actor: &AuthUser,
        input: UpdateOrderInput,
    ) -> Result<(OrderModel, CargoModel), ServiceError> {
        let (current, cargo_record) = self.get_by_tracking_scoped(tracking_id, actor).await?;
        let mut active: order::ActiveModel = current.into();

        if let Some(raw) = input.status {
            let status = OrderStatus::parse(&raw)?;
            active.status = Set(status.as_str().to_string());
        }
        if let Some(past_main_branch) = input.past_main_branch {
            active.past_main_branch = Set(past_main_branch);
        }
        if let Some(picked_up) = input.cargo_picked_up {
            active.cargo_picked_up = Set(picked_up);
        }
        if let Some(delivered_at) = input.actual_delivery_time {
            active.actual_delivery_time = Set(Some(delivered_at));
        }

        active.updated_at = Set(Utc::now());
        let model = active.update(&*self.db).await?;
        Ok((model, cargo_record))
    }

    /// Resolve an order and its cargo into the response shape.
    pub async fn to_response(
        &self,
        model: OrderModel,
        cargo_record: CargoModel,
    ) -> Result<OrderResponse, ServiceError> {
        let status = OrderStatus::parse(&model.status)?;
        let weight = cargo_record.weight;
        let detail = self.cargo.to_response(cargo_record).await?;

        Ok(OrderResponse {
            tracking_id: model.tracking_id,
            status: status.display_name().to_string(),
            price: format!("{:.3}", model.price),
            price_per_unit_weight: format!("{:.3}", model.price_per_unit_weight),
            past_main_branch: model.past_main_branch,
            cargo_picked_up: model.cargo_picked_up,
            estimated_time_to_main_station: model.estimated_time_to_main_station,
            estimated_delivery_time: model.estimated_delivery_time,
            actual_delivery_time: model.actual_delivery_time,
            cargo: OrderCargoDetail {
                sender: detail.sender,
                recipient: detail.recipient,
                booking_agent: detail.booking_agent,
                clearing_agent: detail.clearing_agent,
                destination: detail.destination,
                weight: format!("{weight:.3}"),
            },
            created: None,
            message: None,
        })
    }

    pub async fn to_responses(
        &self,
        rows: Vec<(OrderModel, CargoModel)>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let mut responses = Vec::with_capacity(rows.len());
        for (order, cargo_record) in rows {
            responses.push(self.to_response(order, cargo_record).await?);
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn price_applies_the_surcharge_on_top_of_the_subtotal() {
        let price = calculate_price(dec!(10.00), dec!(5.000));
        assert_eq!(price.to_string(), "59.000");
    }

    #[test]
    fn price_keeps_three_decimals() {
        let price = calculate_price(dec!(2.50), dec!(3.333));
        // 2.50 * 3.333 = 8.3325; * 1.18 = 9.83235 -> 9.832
        assert_eq!(price.to_string(), "9.832");
    }

    #[test]
    fn delivery_offsets_stay_in_range_and_ordered() {
        for _ in 0..100 {
            let (to_station, to_delivery) = approximate_delivery_offsets();
            assert!(to_delivery >= ChronoDuration::seconds(300));
            assert!(to_delivery < ChronoDuration::seconds(600));
            assert!(to_station < to_delivery);
            assert_eq!(to_station * 2, to_delivery);
        }
    }

    #[test]
    fn status_parsing_accepts_both_spellings_of_transit() {
        assert_eq!(OrderStatus::parse("in transit").unwrap(), OrderStatus::InTransit);
        assert_eq!(OrderStatus::parse("IN_TRANSIT").unwrap(), OrderStatus::InTransit);
        assert!(OrderStatus::parse("lost").is_err());
    }

    #[test]
    fn status_display_is_title_cased() {
        assert_eq!(OrderStatus::InTransit.display_name(), "In Transit");
    }

    proptest! {
        #[test]
        fn surcharge_form_matches_single_multiplier(
            weight_cents in 1i64..=99_999,
            unit_price_mills in 1i64..=9_999_999,
        ) {
            let weight = Decimal::new(weight_cents, 2);
            let unit_price = Decimal::new(unit_price_mills, 3);
            let expected = (weight * unit_price * dec!(1.18)).round_dp(3);
            prop_assert_eq!(calculate_price(weight, unit_price), expected);
        }
    }
}
