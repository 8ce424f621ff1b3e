//! Node - 원격 참가자 하나를 대신하는 로컬 프록시
//!
//! 로컬 이벤트 이미터를 내장하고 bind/unbind/trigger를 가로채 원격 의미를 부여한다.
//!
//! - `bind`/`unbind`: 로컬 등록 후 상대에게 `["bind", type]`/`["unbind", type]` 알림
//! - `trigger`: 상대가 관심을 등록한 타입만 직렬화하여 전송 (로컬 디스패치 없음)
//! - 수신 메시지: 디코딩 후 로컬 이미터로 다시 발생시켜 애플리케이션에 전달

use crate::channel::{Channel, ChannelEvent};
use crate::emitter::{EventEmitter, Handler};
use crate::error::{MeshError, Result};
use crate::mesh::Mesh;
use crate::protocol::{is_protected, ControlKind, EventArgs, InboundMessage, WireMessage};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};


/// 로컬 디스패치 인자
#[derive(Clone)]
pub enum EventArg {
    /// 원격에서 온 일반 JSON 인자
    Value(Value),
    /// `exist`/`enter`/`leave`로 전달된 참가자
    Node(Node),
    /// `open` 이벤트의 채널
    Channel(Arc<dyn Channel>),
}

impl EventArg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            EventArg::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            EventArg::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Arc<dyn Channel>> {
        match self {
            EventArg::Channel(channel) => Some(channel),
            _ => None,
        }
    }
}

impl From<Value> for EventArg {
    fn from(value: Value) -> Self {
        EventArg::Value(value)
    }
}

impl fmt::Debug for EventArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventArg::Value(value) => write!(f, "Value({})", value),
            EventArg::Node(node) => write!(f, "Node({}, {})", node, node.id()),
            EventArg::Channel(channel) => write!(f, "Channel({})", channel.kind()),
        }
    }
}

pub type NodeHandler = Handler<EventArg>;

/// 클로저를 노드 핸들러로 감싸는 헬퍼
pub fn handler<F>(f: F) -> NodeHandler
where
    F: Fn(&[EventArg]) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 채널 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct NodeInner {
    uid: u64,
    mesh: Arc<Mesh>,
    id: String,
    channels: Mutex<Vec<Arc<dyn Channel>>>,
    state: Mutex<ConnectionState>,
    emitter: EventEmitter<EventArg>,
}

/// 원격 피어 프록시. 복제본은 식별자, 채널, 핸들러를 공유한다.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub(crate) fn new(mesh: Arc<Mesh>, id: String) -> Self {
        let uid = mesh.registry().next_uid();
        trace!("🆕 노드 생성: Node@{} ({})", uid, id);

        Self {
            inner: Arc::new(NodeInner {
                uid,
                mesh,
                id,
                channels: Mutex::new(Vec::new()),
                state: Mutex::new(ConnectionState::Disconnected),
                emitter: EventEmitter::new(),
            }),
        }
    }

    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    /// 원격 참가자 ID
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.inner.mesh
    }

    /// 등록 순서대로의 채널 목록
    pub fn channels(&self) -> Vec<Arc<dyn Channel>> {
        self.inner.channels.lock().clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// 원격 노드에 연결.
    ///
    /// 최초 호출 시 설정된 순서대로 채널을 만든다. 이후 호출은 채널을 재생성하지 않고
    /// 핸들러를 다시 붙인 뒤 모든 채널을 다시 연다.
    pub fn connect(&self) {
        let mesh = self.inner.mesh.clone();

        if self.inner.channels.lock().is_empty() {
            let created: Vec<Arc<dyn Channel>> = mesh
                .config()
                .channels
                .iter()
                .map(|kind| mesh.factory().create(*kind, mesh.local_id(), self))
                .collect();

            info!("🔗 {} 채널 {}개 생성: {}", self, created.len(), self.id());
            self.inner.channels.lock().extend(created);
        }

        *self.inner.state.lock() = ConnectionState::Connecting;

        for channel in self.channels() {
            channel.unbind(ChannelEvent::Open);
            channel.unbind(ChannelEvent::Message);

            let node = Arc::downgrade(&self.inner);
            let weak_channel: Weak<dyn Channel> = Arc::downgrade(&channel);
            channel.bind_open(Arc::new(move || {
                if let (Some(inner), Some(channel)) = (node.upgrade(), weak_channel.upgrade()) {
                    Node { inner }.handle_open(channel);
                }
            }));

            let node = Arc::downgrade(&self.inner);
            channel.bind_message(Arc::new(move |message: &InboundMessage| {
                if let Some(inner) = node.upgrade() {
                    Node { inner }.handle_message(message);
                }
            }));

            channel.open();
        }
    }

    /// 수신 핸들러를 떼고 모든 채널을 닫는다. 채널 목록은 재사용을 위해 유지.
    pub fn disconnect(&self) {
        for channel in self.channels() {
            channel.unbind(ChannelEvent::Message);
            channel.close();
        }

        *self.inner.state.lock() = ConnectionState::Disconnected;
        info!("👋 {} 연결 종료: {}", self, self.id());
    }

    /// 로컬 핸들러 등록 후, 보호 이벤트가 아니면 상대에게 관심을 알린다.
    pub fn bind(&self, event_type: &str, handler: NodeHandler) {
        self.inner.emitter.bind(event_type, handler);

        if !is_protected(event_type) {
            self.announce(ControlKind::Bind, event_type);
        }
    }

    pub fn unbind(&self, event_type: &str, handler: &NodeHandler) {
        self.inner.emitter.unbind(event_type, handler);

        if !is_protected(event_type) {
            self.announce(ControlKind::Unbind, event_type);
        }
    }

    /// 원격 트리거.
    ///
    /// 상대가 `event_type`에 관심을 등록하지 않았으면 아무 것도 하지 않는다.
    /// `args`는 튜플(`("hi", 7)`, 단일 인자는 `("hi",)`), `Vec<Value>`, 또는 인자 없음(`()`).
    pub fn trigger<A>(&self, event_type: &str, args: &A) -> Result<()>
    where
        A: EventArgs + ?Sized,
    {
        ensure_unprotected(event_type)?;

        if !self.inner.mesh.registry().has_interest(&self.inner.id, event_type) {
            trace!("🔇 {} 관심 없음, 전송 생략: {}", self, event_type);
            return Ok(());
        }

        let message = self.preprocess_outgoing(event_type, args.to_args()?)?;
        let raw = message.encode()?;

        debug!("📤 [{}] {}", self.id(), event_type);
        self.inner.mesh.registry().dispatch(self, &raw);
        Ok(())
    }

    /// 송신 전처리. 보호 이벤트는 거부하고 나머지는 그대로 메시지로 만든다.
    pub fn preprocess_outgoing(&self, event_type: &str, args: Vec<Value>) -> Result<WireMessage> {
        ensure_unprotected(event_type)?;
        Ok(WireMessage::new(event_type, args))
    }

    /// 수신 메시지를 로컬 디스패치용 (타입, 인자)로 디코딩
    pub fn preprocess_incoming(
        &self,
        from: &str,
        timestamp: i64,
        payload: &Value,
    ) -> Result<(String, Vec<EventArg>)> {
        let message = WireMessage::from_value(payload)?;
        trace!("📥 [{}@{}] {}", from, timestamp, message.event_type);

        let args = match message.event_type.as_str() {
            "exist" | "enter" | "leave" => message
                .args
                .iter()
                .map(|arg| {
                    arg.as_str()
                        .map(|peer_id| EventArg::Node(self.inner.mesh.node(peer_id)))
                        .ok_or_else(|| {
                            MeshError::InvalidMessage(format!(
                                "{} expects peer ids, got {}",
                                message.event_type, arg
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,

            "bind" => {
                if let Some(target) = message.target_type() {
                    self.inner.mesh.registry().record_bind(from, target);
                }
                passthrough(&message)
            }

            "unbind" => {
                if let Some(target) = message.target_type() {
                    self.inner.mesh.registry().record_unbind(from, target);
                }
                passthrough(&message)
            }

            _ => passthrough(&message),
        };

        Ok((message.event_type, args))
    }

    fn announce(&self, kind: ControlKind, event_type: &str) {
        match WireMessage::control(kind, event_type).encode() {
            Ok(raw) => {
                debug!("📣 [{}] {} {}", self.id(), kind.as_str(), event_type);
                self.inner.mesh.registry().dispatch(self, &raw);
            }
            Err(e) => warn!("⚠️ 제어 메시지 직렬화 실패: {}", e),
        }
    }

    fn handle_open(&self, channel: Arc<dyn Channel>) {
        {
            // 연결 중일 때만 승격. disconnect 이후 늦게 열린 채널은 상태를 되살리지 않는다.
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Connected;
            }
        }
        info!("✅ {} {} 채널 열림: {}", self, channel.kind(), self.id());

        self.inner
            .emitter
            .trigger("open", &[EventArg::Channel(channel)]);
    }

    fn handle_message(&self, message: &InboundMessage) {
        match self.preprocess_incoming(&message.from, message.timestamp, &message.payload) {
            Ok((event_type, args)) => {
                self.inner.emitter.trigger(&event_type, &args);
            }
            Err(e) => {
                warn!("⚠️ {} 수신 메시지 폐기 (from {}): {}", self, message.from, e);
            }
        }
    }
}

fn ensure_unprotected(event_type: &str) -> Result<()> {
    if is_protected(event_type) {
        return Err(MeshError::ProtectedEvent {
            event_type: event_type.to_string(),
        });
    }
    Ok(())
}

fn passthrough(message: &WireMessage) -> Vec<EventArg> {
    message.args.iter().cloned().map(EventArg::Value).collect()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node@{}", self.inner.uid)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("uid", &self.inner.uid)
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.inner.uid == other.inner.uid
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.uid.hash(state);
    }
}
