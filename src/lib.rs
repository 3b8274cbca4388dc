//! Clearway - Customs Manifest Filing Gateway
//!
//! Clearway is a thin web gateway that collects CBP Type 86 customs manifest
//! form data and relays it as JSON to a customs-filing REST API. The browser
//! never talks to the filing API directly: the gateway holds the bearer
//! credential, applies form defaults, retries transient upstream failures and
//! normalizes every outcome into a predictable JSON envelope.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Clearway Gateway                        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                     HTTP API (axum)                    │  │
//! │  │   /submit_manifest  /review_hts  /delete_manifest      │  │
//! │  │   /view_manifest    /send_manifest  /get_manifest      │  │
//! │  └──────────────────────────┬─────────────────────────────┘  │
//! │                             │ cookie session                 │
//! │  ┌──────────────────────────▼─────────────────────────────┐  │
//! │  │                        Gateway                         │  │
//! │  │  - Merge form input with manifest defaults             │  │
//! │  │  - Track bill-of-lading numbers per session            │  │
//! │  │  - Interpret HTS review verdicts                       │  │
//! │  └──────────────────────────┬─────────────────────────────┘  │
//! │                             │                                │
//! │  ┌──────────────────────────▼─────────────────────────────┐  │
//! │  │                    Upstream Client                     │  │
//! │  │  - Bearer auth, 10s timeout                            │  │
//! │  │  - Escalating-backoff retries on 429/5xx               │  │
//! │  │  - Error-body normalization                            │  │
//! │  └──────────────────────────┬─────────────────────────────┘  │
//! └─────────────────────────────┼────────────────────────────────┘
//!                               │ HTTPS + Bearer
//!                ┌──────────────▼──────────────┐
//!                │    Customs Filing REST API  │
//!                │  documents / send / review  │
//!                └─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: HTTP routes, JSON envelopes and CORS
//! - [`gateway`]: Operation logic tying forms, sessions and the upstream
//! - [`manifest`]: Form model, defaults and upstream payload builders
//! - [`upstream`]: Retrying HTTP client for the filing API
//! - [`session`]: Cookie-keyed correlation-state store
//! - [`config`]: Configuration management
//! - [`error`]: Error taxonomy shared by all layers

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod manifest;
pub mod session;
pub mod upstream;

pub use config::ClearwayConfig;
pub use error::{Error, Result};
