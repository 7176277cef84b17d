//! AetherQuery mock server
//!
//! Answers the AetherQuery REST protocol (`/query`, `/batch`, `/health`)
//! with fabricated results, for exercising clients without a real database.
//!
//! # Embedded Usage
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use aetherquery_server::api::{self, AppState};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = web::Data::new(AppState::new(Default::default()));
//!     HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
//!         .bind("127.0.0.1:8080")?
//!         .run()
//!         .await
//! }
//! ```
//!
//! # Server Usage
//!
//! Run the binary; it reads `config.json` from the working directory:
//! ```bash
//! aetherquery-server
//! ```

pub use aetherquery_core;

pub mod api;
pub mod mock;
