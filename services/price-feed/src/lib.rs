//! Price Feed Service
//!
//! Generates synthetic per-symbol prices and streams them to any number of
//! WebSocket clients over one shared subscription.
//!
//! # Architecture
//!
//! ```text
//!   ReferenceTable
//!        │
//!   ┌────▼──────┐
//!   │TickSource │  ← sine (default) or random walk, seeded
//!   └────┬──────┘
//!        │ Vec<UpdateRecord>
//!   ┌────▼──────┐
//!   │   Hub     │  ← one ticker + heartbeat while ≥ 1 client
//!   └────┬──────┘
//!        │ encoded Update frame
//!   ┌────▼──────┐
//!   │ /ws conns │  ← Directory first, then Updates
//!   └───────────┘
//! ```

pub mod config;
pub mod hub;
pub mod metrics;
pub mod oscillator;
pub mod registry;
pub mod server;

pub const SERVICE_VERSION: &str = "0.1.0";
