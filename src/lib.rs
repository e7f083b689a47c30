//! # ActiveTigger client
//!
//! A typed client for the ActiveTigger annotation platform: projects, coding
//! schemes, element annotation, features, quick and BERT models,
//! projections, and data export, all driven through the platform's HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │  CLI / UI    │──▶│  ops        │──▶│  ApiClient     │──▶ HTTP API
//! │  (tigger)    │   │  Session    │   │  + auth headers│
//! └──────┬───────┘   └──────┬──────┘   └───────┬───────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!  ┌───────────┐     ┌────────────┐    ┌──────────────────┐
//!  │ resource  │     │  notify    │    │ CredentialStore  │
//!  │ poll      │     │  Notifier  │    │ (file / memory)  │
//!  └───────────┘     └────────────┘    └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tigger login --username ada
//! tigger projects list
//! tigger --project tweets --scheme default next
//! tigger --project tweets --scheme default annotate 1042 positive
//! tigger --project tweets export annotations --format csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | HTTP client with bearer-auth interception |
//! | [`config`] | TOML configuration parsing |
//! | [`credential`] | Credential store and auth headers |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Request/response contracts |
//! | [`notify`] | User-facing notifications |
//! | [`ops`] | Domain operations |
//! | [`poll`] | Background-job polling |
//! | [`resource`] | Sequence-guarded async resource |
//! | [`routes`] | Path/method contract of the API |

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod notify;
pub mod ops;
pub mod poll;
pub mod resource;
pub mod routes;
