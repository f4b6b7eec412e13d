//! Domain records for camps, needs, assistance and volunteers.
//!
//! Every relation gets an explicit record type. Enumerated columns are
//! stored as lowercase strings and parsed back through [`FromStr`], so a row
//! with an unknown value is rejected at the store boundary instead of
//! leaking into the services.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Error constants for record validation.
pub mod errmsg {
    pub const QUANTITY_POSITIVE: &str = "quantity must be positive";
    pub const QUANTITY_NEEDED_POSITIVE: &str = "quantity_needed must be positive";
    pub const ITEM_NAME_EMPTY: &str = "item_name cannot be empty";
    pub const CAMP_NAME_EMPTY: &str = "camp name cannot be empty";
    pub const LOCATION_EMPTY: &str = "camp location cannot be empty";
    pub const CAPACITY_NEGATIVE: &str = "total_capacity cannot be negative";
    pub const FULL_NAME_EMPTY: &str = "full_name cannot be empty";
    pub const VOLUNTEER_TYPE_EMPTY: &str = "volunteer_type cannot be empty";
    pub const LATITUDE_RANGE: &str = "latitude must be within -90..=90";
    pub const LONGITUDE_RANGE: &str = "longitude must be within -180..=180";
}

/// Declares a string-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ValidationError(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum!(
    /// Actor role, fixed when the profile is created.
    Role {
        User => "user",
        Camp => "camp",
        Ngo => "ngo",
    }
);

string_enum!(
    /// Camp lifecycle. `Full` follows occupancy and is never set by hand.
    CampStatus {
        Active => "active",
        Inactive => "inactive",
        Full => "full",
    }
);

string_enum!(
    /// Qualitative priority of a need. Ordered `Low < Medium < High < Critical`.
    Urgency {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

string_enum!(
    NeedStatus {
        Pending => "pending",
        Partial => "partial",
        Fulfilled => "fulfilled",
    }
);

string_enum!(
    /// Delivery progress of a ledger entry.
    DeliveryStatus {
        Pledged => "pledged",
        InTransit => "in_transit",
        Delivered => "delivered",
    }
);

impl Urgency {
    fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl PartialOrd for Urgency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Urgency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl NeedStatus {
    /// Status is a pure function of the two quantities.
    pub fn derive(quantity_fulfilled: i64, quantity_needed: i64) -> Self {
        if quantity_fulfilled >= quantity_needed {
            Self::Fulfilled
        } else if quantity_fulfilled > 0 {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

impl DeliveryStatus {
    /// The only status this one may advance to, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pledged => Some(Self::InTransit),
            Self::InTransit => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    pub fn can_advance_to(&self, next: DeliveryStatus) -> bool {
        self.next() == Some(next)
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Profile as supplied by the identity provider on first sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

impl NewProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::new(errmsg::FULL_NAME_EMPTY));
        }
        Ok(())
    }
}

// ============================================================================
// Camps
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camp {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub name: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_capacity: i64,
    pub occupied_seats: i64,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub status: CampStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Camp {
    pub fn available_seats(&self) -> i64 {
        self.total_capacity - self.occupied_seats
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCamp {
    pub admin_id: Uuid,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub total_capacity: i64,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl NewCamp {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new(errmsg::CAMP_NAME_EMPTY));
        }
        if self.location.trim().is_empty() {
            return Err(ValidationError::new(errmsg::LOCATION_EMPTY));
        }
        if self.total_capacity < 0 {
            return Err(ValidationError::new(errmsg::CAPACITY_NEGATIVE));
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ValidationError::new(errmsg::LATITUDE_RANGE));
            }
        }
        if let Some(long) = self.longitude {
            if !(-180.0..=180.0).contains(&long) {
                return Err(ValidationError::new(errmsg::LONGITUDE_RANGE));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Needs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    pub id: Uuid,
    pub camp_id: Uuid,
    pub item_name: String,
    pub quantity_needed: i64,
    pub quantity_fulfilled: i64,
    pub urgency: Urgency,
    pub status: NeedStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Need {
    /// Quantity still open for pledges.
    pub fn remaining(&self) -> i64 {
        (self.quantity_needed - self.quantity_fulfilled).max(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNeed {
    pub camp_id: Uuid,
    pub item_name: String,
    pub quantity_needed: i64,
    pub urgency: Urgency,
}

impl NewNeed {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.item_name.trim().is_empty() {
            return Err(ValidationError::new(errmsg::ITEM_NAME_EMPTY));
        }
        if self.quantity_needed <= 0 {
            return Err(ValidationError::new(errmsg::QUANTITY_NEEDED_POSITIVE));
        }
        Ok(())
    }
}

/// Orders needs most urgent first; equal urgency keeps creation order.
pub fn sort_by_urgency(needs: &mut [Need]) {
    needs.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

// ============================================================================
// Assistance ledger
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistance {
    pub id: Uuid,
    pub ngo_id: Uuid,
    pub camp_id: Uuid,
    /// Cleared when the need is removed together with its camp.
    pub need_id: Option<Uuid>,
    pub items_provided: String,
    pub quantity: i64,
    pub delivery_status: DeliveryStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssistance {
    pub ngo_id: Uuid,
    pub camp_id: Uuid,
    pub need_id: Option<Uuid>,
    pub items_provided: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl NewAssistance {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity <= 0 {
            return Err(ValidationError::new(errmsg::QUANTITY_POSITIVE));
        }
        if self.items_provided.trim().is_empty() {
            return Err(ValidationError::new(errmsg::ITEM_NAME_EMPTY));
        }
        Ok(())
    }
}

/// An NGO's commitment against a need, before it is committed.
#[derive(Debug, Clone)]
pub struct Pledge {
    pub need_id: Uuid,
    pub ngo_id: Uuid,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// Outcome of a committed pledge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PledgeReceipt {
    pub need: Need,
    pub assistance: Assistance,
}

// ============================================================================
// Volunteers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerRegistration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub camp_id: Uuid,
    pub volunteer_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVolunteerRegistration {
    pub user_id: Uuid,
    pub camp_id: Uuid,
    pub volunteer_type: String,
}

impl NewVolunteerRegistration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.volunteer_type.trim().is_empty() {
            return Err(ValidationError::new(errmsg::VOLUNTEER_TYPE_EMPTY));
        }
        Ok(())
    }
}
