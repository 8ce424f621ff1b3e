//! Mesh Wire Protocol
//!
//! 피어 간에 주고받는 `[type, ...args]` JSON 배열 메시지와 보호 이벤트 정의.

pub mod wire;

pub use wire::{
    is_protected, ControlKind, EventArgs, InboundMessage, WireMessage, PROTECTED_EVENTS,
};
