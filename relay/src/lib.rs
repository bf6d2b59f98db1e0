//! # jvc-relay
//!
//! Handshaking TCP relay for JVC projector control connections.
//!
//! JVC D-ILA projectors accept a single TCP control connection and expect
//! a fixed greeting exchange before any command flows. This crate sits
//! between a controller and the projector: it performs that handshake on
//! the controller's behalf, with bounded retries while the projector wakes
//! up, then forwards the command/response stream verbatim. The relay never
//! interprets the post-handshake bytes.
//!
//! ## Architecture
//!
//! ```text
//! Controller ──────────► jvc-relay ──────────► Projector
//!                            │
//!                            │   PJ_OK  ◄──  (greeting)
//!                            │   PJREQ  ──►  (request)
//!                            │   PJACK  ◄──  (acknowledgement)
//!                            │
//!              bytes ◄─────► │ ◄─────► bytes   (verbatim relay)
//! ```
//!
//! ## Lifecycle
//!
//! One session at a time: accept a client, establish the projector
//! connection (connect, handshake, retry per policy), drain the client's
//! command bytes to the projector, drain the projector's response bytes
//! back, close both connections, accept the next client. No session
//! failure ever stops the server.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod upstream;
pub mod wire;
