use crate::resource::ResourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ReservationId = u64;

pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Immutable ledger entry written once per successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub quantity: u32,
    pub requester: String,
    pub created_at: DateTime<Utc>,
}

/// A reservation before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub resource_id: ResourceId,
    pub quantity: u32,
    pub requester: String,
}

impl NewReservation {
    pub(crate) fn into_reservation(self, id: ReservationId) -> Reservation {
        Reservation {
            id,
            resource_id: self.resource_id,
            quantity: self.quantity,
            requester: self.requester,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a successful `book` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub reservation: Reservation,
    pub resource_name: String,
    pub remaining_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub reservation_id: ReservationId,
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub quantity: u32,
    pub remaining_capacity: u32,
    pub status: String,
}

impl From<Booking> for BookingReceipt {
    fn from(b: Booking) -> Self {
        Self {
            reservation_id: b.reservation.id,
            resource_id: b.reservation.resource_id,
            resource_name: b.resource_name,
            quantity: b.reservation.quantity,
            remaining_capacity: b.remaining_capacity,
            status: "success".to_string(),
        }
    }
}

/// Falls back to [`ANONYMOUS_REQUESTER`] for missing or blank names.
pub fn requester_or_anonymous(requester: Option<&str>) -> String {
    match requester.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => ANONYMOUS_REQUESTER.to_string(),
    }
}
