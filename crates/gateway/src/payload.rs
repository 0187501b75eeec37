//! Wire types for the provider's private booking API

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const WIRE_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Timestamp with an explicit named timezone, as the provider expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonedDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl ZonedDateTime {
    pub fn new(moment: NaiveDateTime, time_zone: &str) -> Self {
        Self {
            date_time: moment.format(WIRE_DATETIME).to_string(),
            time_zone: time_zone.to_string(),
        }
    }

    pub fn parse(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date_time, WIRE_DATETIME).ok()
    }
}

/// `GetStaffAvailability` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub service_id: String,
    pub staff_ids: Vec<String>,
    pub start_date_time: ZonedDateTime,
    pub end_date_time: ZonedDateTime,
}

/// `GetStaffAvailability` response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub staff_availability_response: Vec<StaffAvailability>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffAvailability {
    #[serde(default)]
    pub staff_id: String,
    #[serde(default)]
    pub availability_items: Vec<AvailabilityItem>,
}

/// Only the `AVAILABLE` status contributes a bookable slot
pub const STATUS_AVAILABLE: &str = "BOOKINGSAVAILABILITYSTATUS_AVAILABLE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityItem {
    #[serde(default)]
    pub status: String,
    pub start_date_time: Option<ZonedDateTime>,
}

/// `appointments` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub appointment: Appointment,
    pub preferences: AppointmentPreferences,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub start_time: ZonedDateTime,
    pub end_time: ZonedDateTime,
    pub service_id: String,
    pub staff_member_ids: Vec<String>,
    pub customers: Vec<Customer>,
    pub is_location_online: bool,
    pub sms_notifications_enabled: bool,
    pub customer_time_zone: String,
    pub price: f64,
    pub price_type: String,
    pub is_all_day: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email_address: String,
    pub phone: String,
    pub notes: String,
    pub time_zone: String,
    pub sms_notifications_enabled: bool,
    pub price: f64,
    pub price_type: String,
}

pub const PRICE_TYPE_NOT_SET: &str = "SERVICEDEFAULTPRICETYPES_NOT_SET";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPreferences {
    pub staff_candidates: Vec<String>,
}

/// `appointments` success response; only the id matters to us
#[derive(Debug, Deserialize)]
pub struct AppointmentResponse {
    #[serde(default)]
    pub id: Option<String>,
}
