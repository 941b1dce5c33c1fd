//! UDP client driving the two simulation cadences: frame-rate input
//! polling and fixed-rate prediction ticks.

use crate::input::{InputSource, InputTracker};
use crate::prediction::Predictor;
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::animation::LoggingAnimator;
use shared::character::{Character, CharacterTuning};
use shared::collision::ArenaBounds;
use shared::{Packet, ReconcileSnapshot, TICK_DELTA};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Rendered-frame cadence for input polling; independent of the tick rate.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    predictor: Predictor,
    input_source: Box<dyn InputSource>,
    tracker: InputTracker,
    world: ArenaBounds,

    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        input_source: Box<dyn InputSource>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        let character = Character::new(CharacterTuning::default(), Box::new(LoggingAnimator))?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            predictor: Predictor::new(character),
            input_source,
            tracker: InputTracker::new(),
            world: ArenaBounds::default(),
            fake_ping_ms,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect { client_version: 1 };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::Snapshot {
                tick,
                position,
                orientation,
            } => {
                self.predictor.receive_snapshot(
                    tick,
                    ReconcileSnapshot {
                        position,
                        orientation,
                    },
                );
            }

            Packet::RotationOverride { orientation } => {
                // Authoritative out-of-band correction; bypasses the intent
                // flow entirely.
                self.predictor
                    .character_mut()
                    .apply_rotation_override(orientation);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    async fn send_intent(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        let (tick, intent) = self.predictor.simulation_tick(&self.world);
        let packet = Packet::Intent {
            tick,
            movement: intent.movement,
            facing: intent.facing,
            is_running: intent.is_running,
        };

        self.send_packet(&packet).await
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut frame_interval = interval(FRAME_INTERVAL);
        let mut tick_interval = interval(Duration::from_secs_f32(TICK_DELTA));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = frame_interval.tick() => {
                    let raw = self.input_source.poll();
                    let input = self.tracker.update(raw);
                    self.predictor.character_mut().handle_frame_input(input);
                },

                _ = tick_interval.tick() => {
                    if let Err(e) = self.send_intent().await {
                        error!("Error sending intent: {}", e);
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down...");
                    break;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
