//! Shared storage helper functions.
//!
//! Row-level state transitions used by every backend. Each backend reads the
//! current row inside its write unit, calls one of these, and writes the
//! result back conditioned on the values it read.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{
    errmsg, Assistance, Camp, CampStatus, DeliveryStatus, Need, NeedStatus, ValidationError,
};

use super::{Result, StorageError};

/// Compute the need after fulfilling `delta` more units.
///
/// Rejects a delta that would push `quantity_fulfilled` past
/// `quantity_needed`; the need is never clamped.
pub fn fulfill(need: &Need, delta: i64, now: DateTime<Utc>) -> Result<Need> {
    if delta <= 0 {
        return Err(ValidationError::new(errmsg::QUANTITY_POSITIVE).into());
    }
    let remaining = need.remaining();
    if delta > remaining {
        return Err(StorageError::OverCommit {
            need_id: need.id,
            requested: delta,
            remaining,
        });
    }
    let quantity_fulfilled = need.quantity_fulfilled + delta;
    Ok(Need {
        quantity_fulfilled,
        status: NeedStatus::derive(quantity_fulfilled, need.quantity_needed),
        updated_at: now,
        ..need.clone()
    })
}

/// Compute the camp after occupying one seat.
pub fn occupy_seat(camp: &Camp, now: DateTime<Utc>) -> Result<Camp> {
    if camp.status == CampStatus::Inactive {
        return Err(ValidationError::new(format!(
            "camp {} is not accepting volunteers",
            camp.id
        ))
        .into());
    }
    if camp.occupied_seats >= camp.total_capacity {
        return Err(StorageError::CapacityExceeded {
            camp_id: camp.id,
            capacity: camp.total_capacity,
        });
    }
    let occupied_seats = camp.occupied_seats + 1;
    let status = if occupied_seats >= camp.total_capacity {
        CampStatus::Full
    } else {
        camp.status
    };
    Ok(Camp {
        occupied_seats,
        status,
        updated_at: now,
        ..camp.clone()
    })
}

/// Compute the camp after freeing one seat. A full camp becomes active.
pub fn free_seat(camp: &Camp, now: DateTime<Utc>) -> Result<Camp> {
    if camp.occupied_seats <= 0 {
        return Err(ValidationError::new(format!("camp {} has no occupied seats", camp.id)).into());
    }
    let status = if camp.status == CampStatus::Full {
        CampStatus::Active
    } else {
        camp.status
    };
    Ok(Camp {
        occupied_seats: camp.occupied_seats - 1,
        status,
        updated_at: now,
        ..camp.clone()
    })
}

/// Compute the camp after an admin status change.
///
/// `full` is derived from occupancy and cannot be requested. Activating a
/// camp that is at capacity yields `full`.
pub fn set_camp_status(camp: &Camp, requested: CampStatus, now: DateTime<Utc>) -> Result<Camp> {
    let status = match requested {
        CampStatus::Full => {
            return Err(ValidationError::new("camp status 'full' is derived from occupancy").into())
        }
        CampStatus::Active if camp.occupied_seats >= camp.total_capacity => CampStatus::Full,
        other => other,
    };
    Ok(Camp {
        status,
        updated_at: now,
        ..camp.clone()
    })
}

/// Validate a forward delivery transition and produce the updated entry.
pub fn advance_delivery(entry: &Assistance, next: DeliveryStatus) -> Result<Assistance> {
    if !entry.delivery_status.can_advance_to(next) {
        return Err(StorageError::InvalidTransition {
            from: entry.delivery_status,
            to: next,
        });
    }
    Ok(Assistance {
        delivery_status: next,
        ..entry.clone()
    })
}

/// Current time truncated to what RFC 3339 storage round-trips.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Format a timestamp for storage (RFC 3339, microsecond precision).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp '{}': {}", value, e)))
}

/// Parse a stored UUID column.
pub fn parse_uuid(value: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(value)?)
}

/// Parse a stored enum column.
pub fn parse_enum<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    value
        .parse()
        .map_err(|e: ValidationError| StorageError::Corrupt(e.0))
}
