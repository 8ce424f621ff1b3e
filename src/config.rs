//! 메시 설정 관리

use crate::channel::ChannelKind;
use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::env;

fn default_local_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Socket, ChannelKind::Rtc]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// 이 메시 참가자의 피어 ID
    #[serde(default = "default_local_id")]
    pub local_id: String,
    /// 채널 등록 순서. 전송은 마지막 채널부터 시도한다.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            local_id: default_local_id(),
            channels: default_channels(),
        }
    }
}

impl MeshConfig {
    pub fn with_local_id(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            ..Self::default()
        }
    }

    /// `MESH_PEER_ID`, `MESH_CHANNELS` 환경 변수에서 로드
    pub fn from_env() -> Result<Self> {
        let local_id = env::var("MESH_PEER_ID").unwrap_or_else(|_| default_local_id());

        let channels = match env::var("MESH_CHANNELS") {
            Ok(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<ChannelKind>().map_err(MeshError::Config))
                .collect::<Result<Vec<_>>>()?,
            Err(_) => default_channels(),
        };

        let config = Self { local_id, channels };
        config.validate()?;
        Ok(config)
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        if self.local_id.trim().is_empty() {
            return Err(MeshError::Config("local_id must not be empty".to_string()));
        }

        if self.channels.is_empty() {
            return Err(MeshError::Config(
                "at least one channel kind is required".to_string(),
            ));
        }

        for (i, kind) in self.channels.iter().enumerate() {
            if self.channels[..i].contains(kind) {
                return Err(MeshError::Config(format!(
                    "channel kind {} listed more than once",
                    kind
                )));
            }
        }

        Ok(())
    }
}
