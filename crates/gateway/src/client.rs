//! HTTP client for the scheduling provider

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use dashmap::DashMap;
use reqwest::{Client, StatusCode};

use meeting_agent_config::GatewaySettings;
use meeting_agent_core::{BookingReceipt, BookingRequest, GatewayError, SchedulingGateway, Slot};

use crate::payload::{
    Appointment, AppointmentPreferences, AppointmentRequest, AppointmentResponse,
    AvailabilityRequest, AvailabilityResponse, Customer, ZonedDateTime, PRICE_TYPE_NOT_SET,
    STATUS_AVAILABLE,
};

/// Client for the provider's booking business endpoints
pub struct BookingsClient {
    client: Client,
    settings: GatewaySettings,
    // Availability answers barely change within minutes; bookings always
    // bypass this.
    slot_cache: DashMap<NaiveDate, (Vec<Slot>, Instant)>,
}

impl BookingsClient {
    /// Create a new client. Settings must already be validated.
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Unknown(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            settings,
            slot_cache: DashMap::new(),
        })
    }

    fn availability_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.availability_timeout_secs)
    }

    fn booking_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.booking_timeout_secs)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(err: reqwest::Error, deadline: Duration) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(deadline)
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    fn map_status(status: StatusCode, body: String) -> GatewayError {
        match status {
            StatusCode::BAD_REQUEST => GatewayError::BadRequest(truncate(&body)),
            StatusCode::UNAUTHORIZED => GatewayError::Auth,
            StatusCode::FORBIDDEN => GatewayError::Forbidden,
            StatusCode::NOT_FOUND => GatewayError::NotFound(truncate(&body)),
            StatusCode::CONFLICT => GatewayError::Conflict(truncate(&body)),
            StatusCode::REQUEST_TIMEOUT => GatewayError::Timeout(Duration::ZERO),
            s if s.is_server_error() => GatewayError::ServerUnavailable(truncate(&body)),
            s => GatewayError::Unknown(format!("status {s}: {}", truncate(&body))),
        }
    }

    /// Reduce a raw availability response to the slots for one date:
    /// available status only, on-date only, ascending, de-duplicated across
    /// staff members.
    fn collect_slots(response: AvailabilityResponse, date: NaiveDate) -> Vec<Slot> {
        let mut slots: Vec<Slot> = Vec::new();

        for staff in response.staff_availability_response {
            for item in staff.availability_items {
                if item.status != STATUS_AVAILABLE {
                    continue;
                }
                let Some(start) = item.start_date_time.as_ref().and_then(|s| s.parse()) else {
                    tracing::warn!(staff_id = %staff.staff_id, "skipping slot with unparseable start time");
                    continue;
                };
                if start.date() != date {
                    continue;
                }
                slots.push(Slot::new(start));
            }
        }

        slots.sort_by_key(|slot| slot.start);
        slots.dedup_by_key(|slot| slot.start);
        slots
    }
}

#[async_trait]
impl SchedulingGateway for BookingsClient {
    async fn fetch_slots(&self, date: NaiveDate) -> Result<Vec<Slot>, GatewayError> {
        let ttl = Duration::from_secs(self.settings.slot_cache_ttl_secs);
        if let Some(entry) = self.slot_cache.get(&date) {
            let (slots, fetched_at) = entry.value();
            if fetched_at.elapsed() < ttl {
                tracing::debug!(%date, count = slots.len(), "availability cache hit");
                return Ok(slots.clone());
            }
        }

        let request = AvailabilityRequest {
            service_id: self.settings.service_id.clone(),
            staff_ids: self.settings.staff_ids.clone(),
            start_date_time: ZonedDateTime::new(
                date.and_time(NaiveTime::MIN),
                &self.settings.timezone,
            ),
            end_date_time: ZonedDateTime::new(
                date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
                &self.settings.timezone,
            ),
        };

        let deadline = self.availability_timeout();
        tracing::info!(%date, "fetching availability");
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint("GetStaffAvailability"))
            .timeout(deadline)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, deadline))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%date, %status, "availability request failed");
            return Err(Self::map_status(status, body));
        }

        let parsed: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("invalid availability payload: {e}")))?;

        let slots = Self::collect_slots(parsed, date);
        tracing::info!(
            %date,
            count = slots.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "availability fetched"
        );

        self.slot_cache.insert(date, (slots.clone(), Instant::now()));
        Ok(slots)
    }

    async fn book(&self, request: &BookingRequest) -> Result<BookingReceipt, GatewayError> {
        let time = NaiveTime::parse_from_str(&request.time, "%I:%M %p")
            .map_err(|_| GatewayError::BadRequest(format!("unusable slot time: {}", request.time)))?;

        let start = request.date.and_time(time);
        let end = start + ChronoDuration::minutes(self.settings.meeting_duration_minutes);

        let payload = AppointmentRequest {
            appointment: Appointment {
                start_time: ZonedDateTime::new(start, &self.settings.timezone),
                end_time: ZonedDateTime::new(end, &self.settings.timezone),
                service_id: self.settings.service_id.clone(),
                staff_member_ids: self.settings.staff_ids.iter().take(1).cloned().collect(),
                customers: vec![Customer {
                    name: request.name.clone(),
                    email_address: request.email.clone(),
                    phone: request.phone.clone(),
                    notes: request.notes.clone(),
                    time_zone: self.settings.timezone.clone(),
                    sms_notifications_enabled: false,
                    price: 0.0,
                    price_type: PRICE_TYPE_NOT_SET.to_string(),
                }],
                is_location_online: true,
                sms_notifications_enabled: false,
                customer_time_zone: self.settings.timezone.clone(),
                price: 0.0,
                price_type: PRICE_TYPE_NOT_SET.to_string(),
                is_all_day: false,
            },
            preferences: AppointmentPreferences {
                staff_candidates: self.settings.staff_ids.clone(),
            },
        };

        let deadline = self.booking_timeout();
        tracing::info!(date = %request.date, time = %request.time, "committing booking");
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint("appointments"))
            .timeout(deadline)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, deadline))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "booking request failed");
            return Err(Self::map_status(status, body));
        }

        let booking_id = response
            .json::<AppointmentResponse>()
            .await
            .ok()
            .and_then(|r| r.id);

        tracing::info!(
            ?booking_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "booking committed"
        );

        Ok(BookingReceipt { booking_id })
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}
