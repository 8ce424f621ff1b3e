//! Transport Channel 계약
//!
//! 실제 전송(소켓 릴레이, WebRTC 데이터 채널)은 메시 외부에서 구현한다.
//! 노드는 이 트레이트만 보고 채널을 열고, 닫고, 메시지를 보낸다.
//!
//! ## 모듈 구조
//! - `memory`: 프로세스 내 채널 허브 (로컬 메시/테스트용)

pub mod memory;

pub use memory::{MemoryChannel, MemoryHub};

use crate::node::Node;
use crate::protocol::InboundMessage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 채널 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// 시그널링 서버 경유 소켓 릴레이
    Socket,
    /// WebRTC 직접 연결
    Rtc,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Socket => write!(f, "socket"),
            ChannelKind::Rtc => write!(f, "rtc"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" => Ok(ChannelKind::Socket),
            "rtc" | "webrtc" => Ok(ChannelKind::Rtc),
            other => Err(format!("unknown channel kind: {}", other)),
        }
    }
}

/// 채널이 발생시키는 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Message,
}

pub type OpenHandler = Arc<dyn Fn() + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// 점대점 메시지 전송 채널
pub trait Channel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// 연결 시작. 연결되면 `open` 핸들러 호출. 이미 열린 채널에 다시 호출해도 안전해야 한다.
    fn open(&self);

    fn close(&self);

    /// 전송 시도. 이 채널이 메시지를 받아들였는지만 반환하며 전달 확인은 아니다.
    fn send(&self, message: &str) -> bool;

    fn bind_open(&self, handler: OpenHandler);

    fn bind_message(&self, handler: MessageHandler);

    /// 해당 이벤트의 핸들러 전부 제거
    fn unbind(&self, event: ChannelEvent);
}

/// 메시가 제공하는 채널 생성기. `connect()` 최초 호출 시 채널 종류별로 한 번씩 불린다.
pub trait ChannelFactory: Send + Sync {
    fn create(&self, kind: ChannelKind, local_id: &str, remote: &Node) -> Arc<dyn Channel>;
}
