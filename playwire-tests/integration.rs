//! Integration tests for Playwire
//!
//! These tests drive the full negotiation pipeline through scripted
//! collaborators: bitrate resolution, profile building, the playback-info
//! exchange, source matching and URL resolution, wired together the way a
//! playback surface uses them.

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/on_demand_negotiation.rs"]
mod on_demand_negotiation;

#[path = "integration/live_negotiation.rs"]
mod live_negotiation;

#[path = "integration/concurrency.rs"]
mod concurrency;
