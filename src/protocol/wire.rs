//! Mesh Wire Protocol - 피어 간 메시지 형식
//!
//! 모든 메시지는 첫 원소가 이벤트 타입인 JSON 배열입니다.
//! 예: `["bind","score"]`, `["chat","hello",42]`
//!
//! 발신자 ID와 타임스탬프는 채널 계층이 붙이며, 이 모듈은 순수 배열만 다룹니다.

use crate::error::{MeshError, Result};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// 프로토콜 자체가 사용하는 구조/제어 이벤트.
/// 원격 관심 등록 대상이 아니며 애플리케이션이 직접 트리거할 수 없다.
pub const PROTECTED_EVENTS: [&str; 6] = ["open", "exist", "enter", "leave", "bind", "unbind"];

pub fn is_protected(event_type: &str) -> bool {
    PROTECTED_EVENTS.contains(&event_type)
}

/// 관심 등록/해제 제어 메시지 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Bind,
    Unbind,
}

impl ControlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Bind => "bind",
            ControlKind::Unbind => "unbind",
        }
    }
}

/// `[type, ...args]` 형태의 와이어 메시지
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub event_type: String,
    pub args: Vec<Value>,
}

impl WireMessage {
    pub fn new(event_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            args,
        }
    }

    /// `["bind", type]` / `["unbind", type]` 제어 메시지 생성 헬퍼
    pub fn control(kind: ControlKind, event_type: &str) -> Self {
        Self::new(kind.as_str(), vec![Value::String(event_type.to_string())])
    }

    /// 메시지 직렬화 (채널 `send`에 넘길 문자열)
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON 배열 값으로 변환
    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Value::String(self.event_type.clone()));
        items.extend(self.args.iter().cloned());
        Value::Array(items)
    }

    /// 채널이 디코딩한 페이로드에서 메시지 복원
    pub fn from_value(payload: &Value) -> Result<Self> {
        let items = payload.as_array().ok_or_else(|| {
            MeshError::InvalidMessage(format!("expected array, got {}", payload))
        })?;

        let (head, rest) = items
            .split_first()
            .ok_or_else(|| MeshError::InvalidMessage("empty message".to_string()))?;

        let event_type = head.as_str().ok_or_else(|| {
            MeshError::InvalidMessage(format!("event type is not a string: {}", head))
        })?;

        Ok(Self::new(event_type, rest.to_vec()))
    }

    /// 원시 문자열 디코딩
    pub fn decode(raw: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(raw)
            .map_err(|e| MeshError::InvalidMessage(format!("not JSON: {}", e)))?;
        Self::from_value(&payload)
    }

    /// 제어 메시지 대상 이벤트 타입 (`bind`/`unbind`의 첫 인자)
    pub fn target_type(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}

impl Serialize for WireMessage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.args.len() + 1))?;
        seq.serialize_element(&self.event_type)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

/// 트리거 인자 목록.
///
/// 인자 개수는 타입으로 정해진다: `()`는 인자 없음, 튜플은 원소마다 인자 하나,
/// `[Value]`/`Vec<Value>`는 원소 그대로. `(None::<u32>,)`는 `null` 인자 하나,
/// `(vec![1, 2],)`는 배열 인자 하나가 된다.
pub trait EventArgs {
    fn to_args(&self) -> Result<Vec<Value>>;
}

impl EventArgs for () {
    fn to_args(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl EventArgs for [Value] {
    fn to_args(&self) -> Result<Vec<Value>> {
        Ok(self.to_vec())
    }
}

impl EventArgs for Vec<Value> {
    fn to_args(&self) -> Result<Vec<Value>> {
        Ok(self.clone())
    }
}

macro_rules! impl_event_args_for_tuple {
    ($($ty:ident $arg:ident),+) => {
        impl<$($ty: Serialize),+> EventArgs for ($($ty,)+) {
            fn to_args(&self) -> Result<Vec<Value>> {
                let ($($arg,)+) = self;
                Ok(vec![$(serde_json::to_value($arg)?),+])
            }
        }
    };
}

impl_event_args_for_tuple!(A a);
impl_event_args_for_tuple!(A a, B b);
impl_event_args_for_tuple!(A a, B b, C c);
impl_event_args_for_tuple!(A a, B b, C c, D d);
impl_event_args_for_tuple!(A a, B b, C c, D d, E e);
impl_event_args_for_tuple!(A a, B b, C c, D d, E e, F f);

/// 채널이 `message` 핸들러에 넘기는 수신 메시지
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// 발신 피어 ID
    pub from: String,
    /// 밀리초 단위 Unix 타임스탬프
    pub timestamp: i64,
    /// 디코딩된 `[type, ...args]` 배열
    pub payload: Value,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, payload: Value) -> Self {
        Self {
            from: from.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_control_message_encoding() {
        let bind = WireMessage::control(ControlKind::Bind, "score");
        assert_eq!(bind.encode().unwrap(), r#"["bind","score"]"#);

        let unbind = WireMessage::control(ControlKind::Unbind, "score");
        assert_eq!(unbind.encode().unwrap(), r#"["unbind","score"]"#);
        assert_eq!(unbind.target_type(), Some("score"));
    }

    #[test]
    fn test_event_type_with_quotes_is_escaped() {
        let msg = WireMessage::control(ControlKind::Bind, "we\"ird");
        let raw = msg.encode().unwrap();

        assert_eq!(raw, r#"["bind","we\"ird"]"#);
        assert_eq!(WireMessage::decode(&raw).unwrap(), msg);
    }

    #[test]
    fn test_decode_chat_message() {
        let msg = WireMessage::decode(r#"["chat","hello",42]"#).unwrap();

        assert_eq!(msg.event_type, "chat");
        assert_eq!(msg.args, vec![json!("hello"), json!(42)]);
        assert_eq!(msg.to_value(), json!(["chat", "hello", 42]));
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        assert!(matches!(
            WireMessage::from_value(&json!({"type": "chat"})),
            Err(MeshError::InvalidMessage(_))
        ));
        assert!(matches!(
            WireMessage::from_value(&json!([])),
            Err(MeshError::InvalidMessage(_))
        ));
        assert!(matches!(
            WireMessage::from_value(&json!([7, "x"])),
            Err(MeshError::InvalidMessage(_))
        ));
        assert!(matches!(
            WireMessage::decode("not json"),
            Err(MeshError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_event_args_shapes() {
        assert_eq!(("hi", 7).to_args().unwrap(), vec![json!("hi"), json!(7)]);
        assert_eq!(().to_args().unwrap(), Vec::<Value>::new());
        assert_eq!(("solo",).to_args().unwrap(), vec![json!("solo")]);
        assert_eq!(
            vec![json!(1), json!("two")].to_args().unwrap(),
            vec![json!(1), json!("two")]
        );
    }

    #[test]
    fn test_single_null_and_array_arguments_are_kept_whole() {
        assert_eq!((None::<u32>,).to_args().unwrap(), vec![Value::Null]);
        assert_eq!((vec![1, 2],).to_args().unwrap(), vec![json!([1, 2])]);
        assert_eq!(((), 1).to_args().unwrap(), vec![Value::Null, json!(1)]);
    }

    #[test]
    fn test_event_args_rejects_non_string_map_keys() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), 3);

        assert!(matches!(
            (bad,).to_args(),
            Err(MeshError::Serialization(_))
        ));
    }

    #[test]
    fn test_protected_events() {
        for event_type in PROTECTED_EVENTS {
            assert!(is_protected(event_type));
        }
        assert!(!is_protected("chat"));
        assert!(!is_protected("Bind"));
    }
}
