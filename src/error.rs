//! 메시 노드 에러 타입

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    /// 보호된 이벤트는 프로토콜 내부에서만 발생시킬 수 있음
    #[error("Event type {event_type} protected")]
    ProtectedEvent { event_type: String },

    /// 트리거 인자를 JSON으로 직렬화할 수 없음
    #[error("Trigger not serializable: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 수신 메시지 형식 오류
    #[error("Invalid wire message: {0}")]
    InvalidMessage(String),

    #[error("Invalid mesh config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MeshError>;
