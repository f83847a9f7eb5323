use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Booking, ProfessionalId, TimeSlot},
    error::{ApiError, ErrorCode},
    protocol::{AvailabilityResponse, CreateBookingRequest, CreateBookingResponse, ProfessionalProfile},
};
use tracing::{info, warn};
use url::Url;

pub mod auth;
pub mod config;
pub mod error;
pub mod wizard;

pub use auth::AuthSession;
pub use error::{BookingApiError, WizardError};
pub use wizard::{BookingWizard, SlotBoard, WizardEvent, WizardStep};

/// Seam to the remote collaborator that owns professionals, availability and
/// bookings. The wizard never computes availability itself; everything it
/// knows about legal slots came through this trait.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_professional(&self, slug: &str)
        -> Result<ProfessionalProfile, BookingApiError>;
    async fn fetch_availability(
        &self,
        professional_id: ProfessionalId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BookingApiError>;
    async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingApiError>;
}

/// REST implementation of [`BookingApi`] over the public JSON endpoints.
pub struct HttpBookingApi {
    http: Client,
    base_url: Url,
    auth: Option<AuthSession>,
}

impl HttpBookingApi {
    pub fn new(server_url: &str) -> Result<Self, BookingApiError> {
        let base_url = Url::parse(server_url)
            .map_err(|err| BookingApiError::Transport(format!("invalid server url: {err}")))?;
        Ok(Self {
            http: Client::new(),
            base_url,
            auth: None,
        })
    }

    /// Attach the process-wide auth session so a 401 from any endpoint tears
    /// the session down. The public booking flow itself needs no auth.
    pub fn with_auth(mut self, auth: AuthSession) -> Self {
        self.auth = Some(auth);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
    }

    async fn map_failure(&self, response: Response) -> BookingApiError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(auth) = &self.auth {
                auth.on_unauthorized().await;
            }
        }
        match response.json::<ApiError>().await {
            Ok(body) => match body.code {
                ErrorCode::NotFound => BookingApiError::NotFound(body.message),
                ErrorCode::Validation => BookingApiError::Validation {
                    fields: body.field_errors,
                },
                ErrorCode::SlotConflict => BookingApiError::SlotConflict,
                ErrorCode::Unauthorized | ErrorCode::Internal => {
                    BookingApiError::Transport(format!("{status}: {}", body.message))
                }
            },
            // No decodable envelope; fall back to the HTTP status.
            Err(_) => match status {
                StatusCode::NOT_FOUND => BookingApiError::NotFound(status.to_string()),
                StatusCode::CONFLICT => BookingApiError::SlotConflict,
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    BookingApiError::Validation { fields: Vec::new() }
                }
                other => BookingApiError::Transport(other.to_string()),
            },
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, BookingApiError> {
        if !response.status().is_success() {
            return Err(self.map_failure(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|err| BookingApiError::Transport(format!("invalid response body: {err}")))
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn fetch_professional(
        &self,
        slug: &str,
    ) -> Result<ProfessionalProfile, BookingApiError> {
        let response = self
            .http
            .get(self.endpoint(&format!("public/professional/{slug}")))
            .send()
            .await
            .map_err(BookingApiError::transport)?;
        let profile: ProfessionalProfile = self.decode(response).await?;
        info!(
            slug,
            professional_id = profile.professional.id.0,
            services = profile.services.len(),
            "public profile fetched"
        );
        Ok(profile)
    }

    async fn fetch_availability(
        &self,
        professional_id: ProfessionalId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BookingApiError> {
        let response = self
            .http
            .get(self.endpoint(&format!(
                "public/availability/{}/{}",
                professional_id.0,
                date.format("%Y-%m-%d")
            )))
            .send()
            .await
            .map_err(BookingApiError::transport)?;
        let body: AvailabilityResponse = self.decode(response).await?;
        info!(
            professional_id = professional_id.0,
            date = %date,
            slots = body.slots.len(),
            "availability fetched"
        );
        Ok(body.slots)
    }

    async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingApiError> {
        let response = self
            .http
            .post(self.endpoint("bookings"))
            .json(&request)
            .send()
            .await
            .map_err(BookingApiError::transport)?;
        if response.status() == StatusCode::CONFLICT {
            warn!(
                service_id = request.service_id.0,
                date = %request.slot.date,
                start = %request.slot.start,
                "booking rejected: slot taken in the meantime"
            );
        }
        let body: CreateBookingResponse = self.decode(response).await?;
        info!(
            booking_id = %body.booking.id.0,
            status = ?body.booking.status,
            "booking created"
        );
        Ok(body.booking)
    }
}

#[cfg(test)]
#[path = "tests/http_api_tests.rs"]
mod http_api_tests;

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod wizard_tests;
