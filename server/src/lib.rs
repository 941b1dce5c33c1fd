//! # Authoritative-role server
//!
//! The server runs the definitive simulation of every connected character.
//! Each tick it consumes at most one buffered intent per client, in
//! strictly increasing tick order, advances the character through the
//! exact same deterministic movement code the client predicts with, and
//! sends the owner a post-move snapshot tagged with the tick of the last
//! intent it applied. The client uses that tag to discard acknowledged
//! intents and replay the rest.
//!
//! A missing intent never stalls the simulation: the character is advanced
//! with a neutral intent and the gap is logged. Clients that stay silent
//! past the timeout are removed.
//!
//! ## Modules
//!
//! - [`client_manager`]: connection registry, timeouts and per-client
//!   tick-keyed intent queues.
//! - [`game`]: authoritative characters plus the health and
//!   rotation-override entry points.
//! - [`network`]: UDP tasks and the tick-driven main loop.

pub mod client_manager;
pub mod game;
pub mod network;
