//! Newtype IDs for type-safe entity references.
//!
//! Every table uses an integer surrogate key. The `define_id!` macro wraps
//! each one so a `CafeId` can never be passed where an `OrderId` is expected.

/// Declares an integer key newtype.
///
/// The generated type serializes as a bare number, prints as its value and
/// maps to an `INTEGER` column when the `postgres` feature is on.
///
/// ```rust
/// # use cafe_calories_core::define_id;
/// define_id!(TableId);
///
/// let id = TableId::new(4);
/// assert_eq!(id.as_i32(), 4);
/// assert_eq!(id.to_string(), "4");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize, ::serde::Deserialize,
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Entity IDs
define_id!(UserId);
define_id!(CafeId);
define_id!(ItemId);
define_id!(StaffAssignmentId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(PaymentId);
define_id!(RefundRequestId);
define_id!(GoalId);
define_id!(DriverLocationId);
define_id!(ReviewId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&OrderId::new(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));

        let parsed: Option<CafeId> = serde_json::from_str("7").ok();
        assert_eq!(parsed, Some(CafeId::new(7)));
    }

    #[test]
    fn ids_display_their_value() {
        assert_eq!(UserId::from(3).to_string(), "3");
        assert_eq!(i32::from(ItemId::new(9)), 9);
    }
}
