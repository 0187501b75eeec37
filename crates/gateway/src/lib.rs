//! Scheduling provider integration
//!
//! Talks to a Microsoft-Bookings-style private API: one endpoint for staff
//! availability, one for committing appointments. The client implements the
//! `SchedulingGateway` trait from the core crate and maps every provider
//! failure onto the closed `GatewayError` taxonomy.

mod client;
mod payload;

pub use client::BookingsClient;
