//! LiveKit-backed [`Transport`].

use crate::error::VoiceError;
use crate::pipeline::{PipelineMode, SessionSpec};
use crate::session::{RoomInputOptions, Transport};
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::Room;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// JWT lifetime of the agent's join token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// How often a connected transport checks that its room still exists.
pub const ROOM_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, PartialEq)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl: Duration,
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

/// Participant metadata the orchestrator reads for admission decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetadata {
    pub load_threshold: f32,
}

#[derive(Debug)]
struct Attached {
    mode: PipelineMode,
    input: RoomInputOptions,
}

/// Runs a session in a LiveKit room as the agent participant.
#[derive(Debug)]
pub struct LiveKitTransport {
    config: LiveKitConfig,
    room_client: RoomClient,
    room_name: String,
    identity: String,
    metadata: WorkerMetadata,
    attached: Option<Attached>,
    connection: Option<Connection>,
    replies_requested: u32,
}

/// A room the agent has been admitted to.
#[derive(Debug)]
struct Connection {
    room: Room,
    /// Token the agent participant joins with; rotated on every connect.
    join_token: String,
}

impl LiveKitTransport {
    pub fn new(
        config: LiveKitConfig,
        room_name: impl Into<String>,
        identity: impl Into<String>,
        metadata: WorkerMetadata,
    ) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config,
            room_client,
            room_name: room_name.into(),
            identity: identity.into(),
            metadata,
            attached: None,
            connection: None,
            replies_requested: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Server-assigned id of the room, once connected.
    pub fn room_sid(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .map(|connection| connection.room.sid.as_str())
    }

    /// Join token minted by the last successful connect.
    pub fn join_token(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .map(|connection| connection.join_token.as_str())
    }

    pub fn replies_requested(&self) -> u32 {
        self.replies_requested
    }

    /// Noise cancellation stage applied to the room's input, once attached.
    pub fn input_options(&self) -> Option<&RoomInputOptions> {
        self.attached.as_ref().map(|attached| &attached.input)
    }

    /// Mints the agent's join token, carrying the worker metadata.
    pub fn generate_join_token(&self) -> Result<String, VoiceError> {
        let metadata = serde_json::to_string(&self.metadata)
            .map_err(|e| VoiceError::Transport(format!("failed to encode metadata: {}", e)))?;

        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(&self.identity)
            .with_name(&self.identity)
            .with_metadata(&metadata)
            .with_grants(VideoGrants {
                room_join: true,
                room: self.room_name.clone(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(self.config.token_ttl);

        token.to_jwt().map_err(VoiceError::LiveKit)
    }
}

#[async_trait]
impl Transport for LiveKitTransport {
    async fn start(
        &mut self,
        session: &SessionSpec,
        input: &RoomInputOptions,
    ) -> Result<(), VoiceError> {
        if self.config.url.is_empty() {
            return Err(VoiceError::Transport(
                "LiveKit URL is not configured".to_string(),
            ));
        }

        info!(
            room = %self.room_name,
            mode = %session.mode(),
            noise_cancellation = ?input.noise_cancellation.as_ref().map(|nc| nc.provider),
            "attaching session to room"
        );

        self.attached = Some(Attached {
            mode: session.mode(),
            input: input.clone(),
        });
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), VoiceError> {
        let Some(attached) = &self.attached else {
            return Err(VoiceError::Transport(
                "no session attached; call start() before connect()".to_string(),
            ));
        };
        let mode = attached.mode;

        let room = self
            .room_client
            .create_room(&self.room_name, CreateRoomOptions::default())
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;

        let token = self.generate_join_token()?;

        info!(
            room = %room.name,
            sid = %room.sid,
            identity = %self.identity,
            %mode,
            load_threshold = self.metadata.load_threshold,
            "agent connected to room"
        );

        self.connection = Some(Connection {
            room,
            join_token: token,
        });
        Ok(())
    }

    async fn generate_reply(&mut self, instructions: &str) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::Transport(
                "Agent is not connected to a room".to_string(),
            ));
        }

        self.replies_requested += 1;
        info!(
            room = %self.room_name,
            instructions,
            "requested generated reply"
        );
        Ok(())
    }

    async fn closed(&mut self) -> Result<(), VoiceError> {
        let Some(sid) = self.room_sid().map(str::to_string) else {
            return Err(VoiceError::Transport(
                "Agent is not connected to a room".to_string(),
            ));
        };

        let mut ticker = interval(ROOM_POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let rooms = self
                .room_client
                .list_rooms(vec![self.room_name.clone()])
                .await
                .map_err(|e| {
                    self.connection = None;
                    VoiceError::Transport(format!("lost contact with room service: {}", e))
                })?;

            if !rooms.iter().any(|room| room.sid == sid) {
                warn!(room = %self.room_name, %sid, "room closed, ending session");
                self.connection = None;
                return Ok(());
            }
        }
    }
}
