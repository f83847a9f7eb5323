use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    domain::{Booking, BookingDraft, ClientInfo, Professional, Service, ServiceId, TimeSlot},
    error::FieldError,
    protocol::CreateBookingRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    error::{BookingApiError, WizardError},
    BookingApi,
};

/// The four ordered views of the public booking flow. No skipping: every
/// advance requires the step's own data to be present and valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectService,
    SelectSlot,
    EnterClientInfo,
    Confirmation,
}

impl WizardStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectService => "select_service",
            Self::SelectSlot => "select_slot",
            Self::EnterClientInfo => "enter_client_info",
            Self::Confirmation => "confirmation",
        }
    }
}

/// Availability currently on screen for one date. An empty `slots` list is a
/// loaded answer ("fully booked"), not a failure; a failed query never
/// produces a board at all.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotBoard {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone)]
pub enum WizardEvent {
    StepChanged(WizardStep),
    SlotsLoaded {
        date: NaiveDate,
        slots: Vec<TimeSlot>,
    },
    SlotsLoadFailed {
        date: NaiveDate,
        reason: String,
    },
    BookingConfirmed(Booking),
}

struct WizardState {
    step: WizardStep,
    draft: BookingDraft,
    board: Option<SlotBoard>,
    // Monotonic counter enforcing last-issued-wins for availability queries.
    slot_generation: u64,
    booking: Option<Booking>,
}

/// Controller for the public booking wizard. Holds the draft being
/// assembled and delegates every availability and persistence decision to
/// the remote collaborator behind [`BookingApi`].
pub struct BookingWizard {
    api: Arc<dyn BookingApi>,
    professional: Professional,
    services: Vec<Service>,
    inner: Mutex<WizardState>,
    events: broadcast::Sender<WizardEvent>,
}

impl BookingWizard {
    /// Fetches the professional's public profile and opens the wizard at
    /// `SelectService`. An unknown slug ends the flow here; no wizard is
    /// constructed.
    pub async fn start(
        api: Arc<dyn BookingApi>,
        slug: &str,
    ) -> Result<Self, BookingApiError> {
        let profile = api.fetch_professional(slug).await?;
        let (events, _) = broadcast::channel(64);
        info!(
            slug,
            professional = %profile.professional.display_name,
            "booking wizard opened"
        );
        Ok(Self {
            api,
            professional: profile.professional,
            services: profile.services,
            inner: Mutex::new(WizardState {
                step: WizardStep::SelectService,
                draft: BookingDraft::default(),
                board: None,
                slot_generation: 0,
                booking: None,
            }),
            events,
        })
    }

    pub fn professional(&self) -> &Professional {
        &self.professional
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub async fn step(&self) -> WizardStep {
        self.inner.lock().await.step
    }

    pub async fn draft(&self) -> BookingDraft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn board(&self) -> Option<SlotBoard> {
        self.inner.lock().await.board.clone()
    }

    pub async fn booking(&self) -> Option<Booking> {
        self.inner.lock().await.booking.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WizardEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WizardEvent) {
        let _ = self.events.send(event);
    }

    /// `SelectService` advance. The service must come from the fetched
    /// profile; the chosen service lands in the draft.
    pub async fn select_service(&self, service_id: ServiceId) -> Result<(), WizardError> {
        let mut guard = self.inner.lock().await;
        if guard.step != WizardStep::SelectService {
            return Err(WizardError::StepMismatch {
                step: guard.step.name(),
            });
        }
        let service = self
            .services
            .iter()
            .find(|service| service.id == service_id)
            .cloned()
            .ok_or(WizardError::UnknownService(service_id.0))?;
        info!(service_id = service.id.0, service = %service.name, "service selected");
        guard.draft.service = Some(service);
        guard.step = WizardStep::SelectSlot;
        drop(guard);
        self.emit(WizardEvent::StepChanged(WizardStep::SelectSlot));
        Ok(())
    }

    /// Queries availability for `date` and publishes the board once the
    /// response lands, unless a newer query was issued in the meantime or
    /// the wizard has moved on (last-issued-wins, not last-resolved-wins).
    pub async fn load_slots(&self, date: NaiveDate) -> Result<(), WizardError> {
        let generation = {
            let mut guard = self.inner.lock().await;
            if guard.step != WizardStep::SelectSlot {
                return Err(WizardError::StepMismatch {
                    step: guard.step.name(),
                });
            }
            guard.slot_generation += 1;
            guard.slot_generation
        };

        match self
            .api
            .fetch_availability(self.professional.id, date)
            .await
        {
            Ok(slots) => {
                let mut guard = self.inner.lock().await;
                if guard.slot_generation != generation || guard.step != WizardStep::SelectSlot {
                    info!(date = %date, generation, "stale availability response dropped");
                    return Ok(());
                }
                guard.board = Some(SlotBoard {
                    date,
                    slots: slots.clone(),
                });
                drop(guard);
                self.emit(WizardEvent::SlotsLoaded { date, slots });
                Ok(())
            }
            Err(err) => {
                let still_current = {
                    let guard = self.inner.lock().await;
                    guard.slot_generation == generation && guard.step == WizardStep::SelectSlot
                };
                if still_current {
                    warn!(date = %date, error = %err, "availability query failed");
                    self.emit(WizardEvent::SlotsLoadFailed {
                        date,
                        reason: err.to_string(),
                    });
                }
                Err(err.into())
            }
        }
    }

    /// `SelectSlot` advance. The slot must be on the currently displayed
    /// board; the client does not second-guess the server beyond "was
    /// returned by the query".
    pub async fn select_slot(&self, slot: TimeSlot) -> Result<(), WizardError> {
        let mut guard = self.inner.lock().await;
        if guard.step != WizardStep::SelectSlot {
            return Err(WizardError::StepMismatch {
                step: guard.step.name(),
            });
        }
        let offered = guard
            .board
            .as_ref()
            .is_some_and(|board| board.date == slot.date && board.slots.contains(&slot));
        if !offered {
            return Err(WizardError::SlotNotOffered);
        }
        info!(date = %slot.date, start = %slot.start, "slot selected");
        guard.draft.slot = Some(slot);
        // Leaving the step abandons any in-flight availability query, so it
        // cannot resurface on a later return to slot selection.
        guard.slot_generation += 1;
        guard.step = WizardStep::EnterClientInfo;
        drop(guard);
        self.emit(WizardEvent::StepChanged(WizardStep::EnterClientInfo));
        Ok(())
    }

    /// `EnterClientInfo` advance: validates the contact form, then issues
    /// the single atomic booking call carrying the whole draft. The wizard
    /// only reaches `Confirmation` after that call succeeds; on failure the
    /// draft is retained so the user can retry explicitly.
    pub async fn submit(&self, client: ClientInfo) -> Result<Booking, WizardError> {
        let client = validate_client_info(client)
            .map_err(|fields| WizardError::InvalidClientInfo { fields })?;

        let request = {
            let mut guard = self.inner.lock().await;
            if guard.step != WizardStep::EnterClientInfo {
                return Err(WizardError::StepMismatch {
                    step: guard.step.name(),
                });
            }
            let (Some(service), Some(slot)) = (guard.draft.service.clone(), guard.draft.slot)
            else {
                return Err(WizardError::StepMismatch {
                    step: guard.step.name(),
                });
            };
            guard.draft.client = Some(client.clone());
            CreateBookingRequest {
                service_id: service.id,
                slot,
                client_name: client.name.clone(),
                client_phone: client.phone.clone(),
                notes: client.notes.clone(),
            }
        };

        match self.api.create_booking(request).await {
            Ok(booking) => {
                let mut guard = self.inner.lock().await;
                guard.booking = Some(booking.clone());
                guard.step = WizardStep::Confirmation;
                drop(guard);
                self.emit(WizardEvent::StepChanged(WizardStep::Confirmation));
                self.emit(WizardEvent::BookingConfirmed(booking.clone()));
                Ok(booking)
            }
            Err(BookingApiError::SlotConflict) => {
                // The offered slot was taken in the race window. Send the
                // user back to re-pick; service and contact info survive.
                let mut guard = self.inner.lock().await;
                guard.draft.slot = None;
                guard.board = None;
                guard.slot_generation += 1;
                guard.step = WizardStep::SelectSlot;
                drop(guard);
                warn!("slot conflict on submit; returning to slot selection");
                self.emit(WizardEvent::StepChanged(WizardStep::SelectSlot));
                Err(BookingApiError::SlotConflict.into())
            }
            Err(err) => {
                warn!(error = %err, "booking submission failed; draft retained");
                Err(err.into())
            }
        }
    }

    /// `onBack`. From `SelectSlot` this clears the slot and the board and
    /// abandons any in-flight availability query, keeping the chosen
    /// service; from `EnterClientInfo` it discards nothing else.
    pub async fn back(&self) -> Result<(), WizardError> {
        let mut guard = self.inner.lock().await;
        let target = match guard.step {
            WizardStep::SelectSlot => {
                guard.draft.slot = None;
                guard.board = None;
                guard.slot_generation += 1;
                WizardStep::SelectService
            }
            WizardStep::EnterClientInfo => WizardStep::SelectSlot,
            WizardStep::SelectService | WizardStep::Confirmation => {
                return Err(WizardError::StepMismatch {
                    step: guard.step.name(),
                });
            }
        };
        guard.step = target;
        drop(guard);
        self.emit(WizardEvent::StepChanged(target));
        Ok(())
    }

    /// Full-wizard reset, offered only from the terminal `Confirmation`
    /// view: fresh draft, same professional profile.
    pub async fn reset(&self) -> Result<(), WizardError> {
        let mut guard = self.inner.lock().await;
        if guard.step != WizardStep::Confirmation {
            return Err(WizardError::StepMismatch {
                step: guard.step.name(),
            });
        }
        guard.draft = BookingDraft::default();
        guard.board = None;
        guard.booking = None;
        guard.slot_generation += 1;
        guard.step = WizardStep::SelectService;
        drop(guard);
        self.emit(WizardEvent::StepChanged(WizardStep::SelectService));
        Ok(())
    }
}

/// Schema validation for the contact form. Rejection carries field-level
/// errors and never reaches the network.
pub fn validate_client_info(info: ClientInfo) -> Result<ClientInfo, Vec<FieldError>> {
    let mut fields = Vec::new();

    let name = info.name.trim().to_string();
    if name.is_empty() {
        fields.push(FieldError::new("name", "name must not be empty"));
    }

    let phone = match normalize_phone(&info.phone) {
        Some(phone) => phone,
        None => {
            fields.push(FieldError::new(
                "phone",
                "expected a WhatsApp-reachable number like +5511999999999",
            ));
            String::new()
        }
    };

    if !fields.is_empty() {
        return Err(fields);
    }

    let notes = info
        .notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());

    Ok(ClientInfo { name, phone, notes })
}

/// E.164-shaped check: optional leading `+`, 8 to 15 digits, first digit
/// non-zero. Separators people habitually type are tolerated and stripped.
fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits = String::new();
    let mut has_plus = false;
    for (index, ch) in raw.trim().char_indices() {
        match ch {
            '+' if index == 0 => has_plus = true,
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '(' | ')' | '.' => {}
            _ => return None,
        }
    }
    if !(8..=15).contains(&digits.len()) || digits.starts_with('0') {
        return None;
    }
    let mut normalized = String::with_capacity(digits.len() + 1);
    if has_plus {
        normalized.push('+');
    }
    normalized.push_str(&digits);
    Some(normalized)
}
