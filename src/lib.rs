//! # softcon
//!
//! Data core of the softcon project showcase: migrates exported project data
//! into a document store and renders stored projects as post pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────────────┐
//! │ export JSON  │──▶│   upload    │──▶│  users               │
//! │ (array)      │   │ transform   │   │  softcon_projects    │
//! └──────────────┘   └─────────────┘   └──────────┬───────────┘
//!                                                 │
//!                                          ┌──────▼──────┐
//!                                          │   resolve   │
//!                                          └──────┬──────┘
//!                                  ┌──────────────┤
//!                                  ▼              ▼
//!                            ┌──────────┐   ┌──────────┐
//!                            │   CLI    │   │   HTTP   │
//!                            │ (view)   │   │ (axum)   │
//!                            └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! softcon init                     # create the SQLite schema
//! softcon upload                   # migrate ./softcon_data/project_details.json
//! softcon get <uid>                # print one stored project
//! softcon view <uid> --out p.html  # render the post page
//! softcon serve                    # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Record types and document field names |
//! | [`transform`] | Raw export entry → project record |
//! | [`store`] | Document store trait, backends, typed repository |
//! | [`migrate`] | SQLite schema |
//! | [`upload`] | Migration pipeline and per-record report |
//! | [`progress`] | Upload progress reporting |
//! | [`author`] | Author document maintenance |
//! | [`get`] | Project retrieval |
//! | [`viewer`] | Post viewer: markdown, preview, download |
//! | [`resolve`] | Stored record → viewer props |
//! | [`server`] | HTTP server |

pub mod author;
pub mod config;
pub mod get;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod resolve;
pub mod server;
pub mod store;
pub mod transform;
pub mod upload;
pub mod viewer;
