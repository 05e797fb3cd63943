//! High-level control client for Logitech/Lyrion Media Server players
//!
//! This crate ties the workspace together: it discovers (or is configured
//! with) a server via `lms-discovery`, issues JSON-RPC queries through
//! `rpc-client`, and exposes convenience accessors for player state on top.
//!
//! Every operation is synchronous and blocking; each call is at most one
//! network round trip (discovery being the one timeout-bounded exception).
//!
//! # Quick Start
//!
//! ```no_run
//! use lms_api::LmsClient;
//!
//! // Scan the network for a server and attach to a named player
//! let client = LmsClient::builder()
//!     .player_name("Living Room")
//!     .build();
//!
//! let playing = client.now_playing();
//! println!("{} — {}", playing.artist(), playing.title());
//! ```
//!
//! # Explicit configuration
//!
//! ```no_run
//! use lms_api::LmsClient;
//! use serde_json::json;
//!
//! let mut client = LmsClient::builder()
//!     .host("192.168.1.10")
//!     .port(9000)
//!     .build();
//! client.set_player_id("aa:bb:cc:dd:ee:ff");
//!
//! // Raw queries stay available next to the convenience accessors
//! let status = client.query("", &[json!("serverstatus"), json!(0), json!(99)]);
//! ```

pub mod client;
pub mod commands;
pub mod error;
pub mod now_playing;
mod value;

pub use client::{LmsClient, LmsClientBuilder};
pub use commands::{NextAlarm, Player};
pub use error::{ApiError, Result};
pub use now_playing::{NowPlaying, NO_ALBUM_ID};
