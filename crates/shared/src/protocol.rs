use serde::{Deserialize, Serialize};

use crate::domain::{Booking, Professional, Service, ServiceId, TimeSlot};

/// Response body for `GET /public/professional/:slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub professional: Professional,
    pub services: Vec<Service>,
}

/// Response body for `GET /public/availability/:professional_id/:date`.
/// Slots arrive ordered by start time; an empty list means "fully booked
/// that day" and is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub slots: Vec<TimeSlot>,
}

/// Request body for `POST /bookings`. Carries the complete draft; partial
/// submissions do not exist in the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: ServiceId,
    pub slot: TimeSlot,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Response body for a successful `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingResponse {
    pub booking: Booking,
}
