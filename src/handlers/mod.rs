pub mod auth;
pub mod branches;
pub mod cargo;
pub mod common;
pub mod orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::events::EventSender;
use crate::services::branches::BranchService;
use crate::services::cargo::CargoService;
use crate::services::orders::OrderService;
use crate::services::users::UserService;

/// Aggregate of the domain services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub branches: BranchService,
    pub cargo: CargoService,
    pub orders: OrderService,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        let users = UserService::new(db.clone());
        let branches = BranchService::new(db.clone(), users.clone(), event_sender.clone());
        let cargo = CargoService::new(
            db.clone(),
            users.clone(),
            branches.clone(),
            event_sender.clone(),
        );
        let orders = OrderService::new(db, cargo.clone(), event_sender);

        Self {
            users,
            branches,
            cargo,
            orders,
        }
    }
}
