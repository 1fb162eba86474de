//! Domain models.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Most of them serialize directly as API responses.

pub mod cafe;
pub mod cart;
pub mod dispatch;
pub mod goal;
pub mod item;
pub mod order;
pub mod payment;
pub mod review;
pub mod user;

pub use cafe::{Cafe, StaffMember};
pub use cart::{Cart, CartLineView, CartView};
pub use dispatch::{DriverLocation, DriverState};
pub use goal::CalorieGoal;
pub use item::{Item, NewItem};
pub use order::{Order, OrderItem};
pub use payment::{Payment, RefundRequest};
pub use review::{Review, ReviewSummary};
pub use user::{NewUser, User};
