//! End-to-end tests for Playwire
//!
//! These tests run the negotiation pipeline over real HTTP against a fake
//! media server, covering the wire format of the probe and playback-info
//! endpoints, the authorization header and the playability of the resolved URL.

mod fake_server;
mod http_negotiation;
