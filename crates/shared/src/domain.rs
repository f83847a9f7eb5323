use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ProfessionalId);
id_newtype!(ServiceId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

/// Status values are owned by the backend contract; anything outside this
/// set must fail deserialization instead of being coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub slug: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: i64,
}

/// A bookable (date, start-time) pair. The server alone decides which pairs
/// are legal; the client only ever re-offers what a query returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub professional_id: ProfessionalId,
    pub service_id: ServiceId,
    pub slot: TimeSlot,
    pub client_name: String,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Transient client-held aggregate assembled across the wizard steps.
/// Submitted once, atomically, never in parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub service: Option<Service>,
    pub slot: Option<TimeSlot>,
    pub client: Option<ClientInfo>,
}

impl BookingDraft {
    pub fn is_complete(&self) -> bool {
        self.service.is_some() && self.slot.is_some() && self.client.is_some()
    }
}
