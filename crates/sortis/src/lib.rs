//! # SORTIS
//!
//! The client crate, tying the rules and the network together.
//!
//! ## Layers
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          SORTIS CLIENT                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌──────────────────┐   ┌──────────────────┐                  │
//! │  │  sortis_core     │   │ sortis_networking│                  │
//! │  │  • Hands         │   │  • Transport     │                  │
//! │  │  • Battle rules  │   │  • Battle sync   │                  │
//! │  │  • Skills        │   │  • Draft sync    │                  │
//! │  └────────┬─────────┘   └────────┬─────────┘                  │
//! │           │                      │                            │
//! │           ▼                      ▼                            │
//! │  ┌──────────────────────────────────────────┐                 │
//! │  │  sortis                                  │                 │
//! │  │  • Outcome reconciler (dice physics)     │                 │
//! │  │  • PvP match loop                        │                 │
//! │  │  • Offline practice engine               │                 │
//! │  │  • Skill notices, config                 │                 │
//! │  └──────────────────────────────────────────┘                 │
//! │                                                               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `reconciler`: dice land on the server's numbers
//! - `game_loop`: battle events to animated turns
//! - `offline`: local stand-in for the battle service
//! - `notifications`: skill effect notices
//! - `config`: TOML client configuration
//!
//! ## Example
//!
//! ```rust
//! use sortis::{OutcomeReconciler, ReconcilerConfig};
//! use sortis_core::DiceTriple;
//!
//! let mut dice = OutcomeReconciler::new(ReconcilerConfig::default(), 7);
//! let server_roll = DiceTriple::new([4, 5, 6]).unwrap();
//! assert_eq!(dice.resolve_toward(server_roll), server_roll);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod game_loop;
pub mod math;
pub mod notifications;
pub mod offline;
pub mod physics;
pub mod reconciler;

pub use sortis_core as core;
pub use sortis_networking as networking;
pub use sortis_shared as shared;

pub use config::ClientConfig;
pub use error::{SortisError, SortisResult};
pub use game_loop::{MatchEvent, PvpMatchLoop, ResolvedTurn};
pub use notifications::{SkillEffectQueue, SkillNotice, DEFAULT_NOTICE_DURATION};
pub use offline::{OfflineEngine, OFFLINE_HASH};
pub use reconciler::{OutcomeReconciler, ReconcilerConfig};
