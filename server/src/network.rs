//! Server network layer handling UDP communications and tick coordination.

use crate::client_manager::ClientManager;
use crate::game::GameWorld;
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::math::Quat;
use shared::{MoveIntent, Packet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    /// Out-of-band authoritative rotation for a client, e.g. from an admin
    /// or game-rule collaborator.
    #[allow(dead_code)]
    ForceRotation {
        client_id: u32,
        orientation: Quat,
    },
}

/// Messages sent from the game loop to the network sender task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating networking and the authoritative simulation.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: GameWorld,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game: GameWorld::new(),
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Channel for external collaborators (admin tooling, game rules) to
    /// inject authoritative commands such as rotation overrides.
    #[allow(dead_code)]
    pub fn command_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns the task that continuously listens for incoming packets.
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue.
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that monitors client timeouts.
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes incoming packets and updates connection state.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // Remove any existing connection from the same address.
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game.remove_player(&existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    match self.game.add_player(client_id) {
                        Ok(()) => {
                            let response = Packet::Connected { client_id };
                            self.send_packet(&response, addr);
                        }
                        Err(e) => {
                            // Unbound state table: fatal setup error, never
                            // start simulating this character.
                            error!("Failed to set up character for {}: {}", client_id, e);
                            let mut clients = self.clients.write().await;
                            clients.remove_client(&client_id);
                            let response = Packet::Disconnected {
                                reason: "Server configuration error".to_string(),
                            };
                            self.send_packet(&response, addr);
                        }
                    }
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr);
                }
            }

            Packet::Intent {
                tick,
                movement,
                facing,
                is_running,
            } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let intent = MoveIntent {
                        movement,
                        facing,
                        is_running,
                    };

                    let mut clients = self.clients.write().await;
                    clients.add_intent(client_id, tick, intent);
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// One authoritative tick: consume at most one pending intent per
    /// client, advance its character, and send the owner the post-move
    /// snapshot tagged with the tick of the last intent applied.
    async fn run_tick(&mut self) {
        self.game.advance_tick();

        let client_ids = {
            let clients = self.clients.read().await;
            clients.client_ids()
        };
        if client_ids.is_empty() {
            return;
        }

        for client_id in client_ids {
            let (pending, ack_tick, addr) = {
                let mut clients = self.clients.write().await;
                let pending = clients.take_next_intent(client_id);
                (
                    pending,
                    clients.last_processed_tick(client_id),
                    clients.addr_of(client_id),
                )
            };

            let snapshot = self
                .game
                .tick_character(client_id, pending.as_ref().map(|(_, intent)| intent));

            // No acknowledgment to echo until the first intent arrives;
            // the peer has nothing buffered to reconcile against yet.
            if let (Some(snapshot), Some(ack_tick), Some(addr)) = (snapshot, ack_tick, addr) {
                let packet = Packet::Snapshot {
                    tick: ack_tick,
                    position: snapshot.position,
                    orientation: snapshot.orientation,
                };
                self.send_packet(&packet, addr);
            }
        }
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            warn!("Client {} timed out", client_id);
                            let mut clients = self.clients.write().await;
                            clients.remove_client(&client_id);
                            self.game.remove_player(&client_id);
                        },
                        Some(ServerMessage::ForceRotation { client_id, orientation }) => {
                            if self.game.set_rotation(client_id, orientation) {
                                let addr = {
                                    let clients = self.clients.read().await;
                                    clients.addr_of(client_id)
                                };
                                if let Some(addr) = addr {
                                    self.send_packet(
                                        &Packet::RotationOverride { orientation },
                                        addr,
                                    );
                                }
                            }
                        },
                        None => {
                            error!("Server message channel closed");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.run_tick().await;
                },
            }
        }

        Ok(())
    }
}
