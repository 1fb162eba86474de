//! Business logic.
//!
//! Services borrow the pool for the duration of one request and are built
//! inside route handlers. Every operation that touches more than one table
//! runs in a single transaction.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod authz;
pub mod cart;
pub mod catalog;
pub mod dispatch;
mod error;
pub mod goals;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod reviews;

pub use admin::AdminService;
pub use analytics::AnalyticsService;
pub use auth::{AuthError, AuthService, TokenService};
pub use authz::Guard;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use dispatch::DispatchService;
pub use error::ServiceError;
pub use goals::GoalService;
pub use menu::MenuService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use reviews::ReviewService;
