//! # Predicting-role client
//!
//! Client-side implementation of the predictive character controller. The
//! locally controlled character simulates ahead of confirmed server state
//! for responsiveness and reconciles against authoritative snapshots as
//! they arrive.
//!
//! ## How prediction works here
//!
//! Input is polled on a rendered-frame cadence and fed to the character's
//! state machine immediately, so triggers like an attack press are noticed
//! without waiting for the next simulation tick. On every fixed tick the
//! predictor first applies the newest authoritative snapshot and replays
//! all unacknowledged intents buffered after it, then builds this tick's
//! intent through the active state, applies it speculatively, buffers it
//! and hands it to the transport.
//!
//! Because client and server run the identical deterministic simulation
//! from `shared`, replaying the same intents from a confirmed snapshot
//! reproduces exactly the state an uninterrupted simulation would have
//! produced.
//!
//! ## Modules
//!
//! - [`input`]: input-source trait, scripted bot source and press-edge
//!   detection.
//! - [`prediction`]: intent replay buffer and the reconcile-then-simulate
//!   tick loop.
//! - [`network`]: UDP transport, covering the handshake, intent send,
//!   snapshot and rotation-override receive.

pub mod input;
pub mod network;
pub mod prediction;
