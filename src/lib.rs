//! Mesh Node - P2P 메시의 원격 참가자 프록시
//!
//! 원격 이벤트 바인딩 프로토콜 구현: 원격 피어가 관심을 등록한 이벤트만 전송하고,
//! 수신 메시지는 로컬 이벤트로 다시 발생시킨다.
//!
//! ## 모듈 구조
//! - `protocol`: `[type, ...args]` 와이어 메시지, 보호 이벤트
//! - `emitter`: 로컬 bind/unbind/trigger
//! - `registry`: 원격 관심 테이블, 채널 선택 전송
//! - `channel`: 전송 채널 계약과 메모리 허브
//! - `node`: 피어 프록시
//! - `mesh`: 노드 생성 컨텍스트

pub mod channel;
pub mod config;
pub mod emitter;
pub mod error;
pub mod logging;
pub mod mesh;
pub mod node;
pub mod protocol;
pub mod registry;

pub use channel::{Channel, ChannelEvent, ChannelFactory, ChannelKind, MemoryChannel, MemoryHub};
pub use config::MeshConfig;
pub use emitter::{EventEmitter, Handler};
pub use error::{MeshError, Result};
pub use logging::init_logging;
pub use mesh::Mesh;
pub use node::{handler, ConnectionState, EventArg, Node, NodeHandler};
pub use protocol::{EventArgs, InboundMessage, WireMessage, PROTECTED_EVENTS};
pub use registry::SubscriptionRegistry;
