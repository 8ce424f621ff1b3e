//! 프로세스 내 채널 허브
//!
//! 같은 허브를 공유하는 메시끼리 네트워크 없이 메시지를 주고받는다.
//! 채널은 (종류, 로컬 ID, 원격 ID)로 등록되며, 전송 시 같은 종류의 반대 방향 채널이
//! 열려 있을 때만 메시지를 받아들이고 동기적으로 전달한다.
//!
//! 같은 키에 여러 채널이 있을 수 있다 (같은 피어의 프록시를 여러 번 만든 경우).
//! 전송은 살아있고 열린 반대편 채널 모두에 전달된다.

use super::{Channel, ChannelEvent, ChannelFactory, ChannelKind, MessageHandler, OpenHandler};
use crate::node::Node;
use crate::protocol::{InboundMessage, WireMessage};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type EndpointKey = (ChannelKind, String, String);

#[derive(Default)]
struct HubInner {
    endpoints: DashMap<EndpointKey, Vec<Weak<MemoryChannel>>>,
}

/// 메모리 채널 허브 (`ChannelFactory` 구현)
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 아직 살아있는 채널 수
    pub fn endpoint_count(&self) -> usize {
        self.inner
            .endpoints
            .iter()
            .map(|entry| entry.value().iter().filter(|w| w.strong_count() > 0).count())
            .sum()
    }

    /// 허브에 직접 채널 등록
    pub fn channel(
        &self,
        kind: ChannelKind,
        local_id: &str,
        remote_id: &str,
    ) -> Arc<MemoryChannel> {
        let channel = Arc::new(MemoryChannel {
            kind,
            local_id: local_id.to_string(),
            remote_id: remote_id.to_string(),
            hub: Arc::downgrade(&self.inner),
            is_open: AtomicBool::new(false),
            open_handlers: Mutex::new(Vec::new()),
            message_handlers: Mutex::new(Vec::new()),
        });

        let mut entry = self
            .inner
            .endpoints
            .entry((kind, local_id.to_string(), remote_id.to_string()))
            .or_default();
        entry.retain(|weak| weak.strong_count() > 0);
        entry.push(Arc::downgrade(&channel));
        drop(entry);

        debug!("🔧 메모리 채널 생성: {} {} -> {}", kind, local_id, remote_id);
        channel
    }
}

impl ChannelFactory for MemoryHub {
    fn create(&self, kind: ChannelKind, local_id: &str, remote: &Node) -> Arc<dyn Channel> {
        self.channel(kind, local_id, remote.id())
    }
}

pub struct MemoryChannel {
    kind: ChannelKind,
    local_id: String,
    remote_id: String,
    hub: Weak<HubInner>,
    is_open: AtomicBool,
    open_handlers: Mutex<Vec<OpenHandler>>,
    message_handlers: Mutex<Vec<MessageHandler>>,
}

impl MemoryChannel {
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    /// 살아있고 열린 반대편 채널들. 맵 가드는 반환 전에 해제된다.
    fn open_counterparts(&self) -> Vec<Arc<MemoryChannel>> {
        let Some(hub) = self.hub.upgrade() else {
            return Vec::new();
        };
        let key = (self.kind, self.remote_id.clone(), self.local_id.clone());
        let weaks = match hub.endpoints.get(&key) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };

        weaks
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|peer| peer.is_open())
            .collect()
    }

    fn deliver(&self, message: InboundMessage) {
        let handlers = self.message_handlers.lock().clone();
        for handler in &handlers {
            handler(&message);
        }
    }
}

impl Channel for MemoryChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn open(&self) {
        self.is_open.store(true, Ordering::SeqCst);

        let handlers = self.open_handlers.lock().clone();
        for handler in &handlers {
            handler();
        }
    }

    fn close(&self) {
        if self.is_open.swap(false, Ordering::SeqCst) {
            debug!(
                "🔌 메모리 채널 종료: {} {} -> {}",
                self.kind, self.local_id, self.remote_id
            );
        }
    }

    fn send(&self, message: &str) -> bool {
        if !self.is_open() {
            return false;
        }

        let peers = self.open_counterparts();
        if peers.is_empty() {
            return false;
        }

        let payload = match WireMessage::decode(message) {
            Ok(message) => message.to_value(),
            Err(e) => {
                warn!("⚠️ 잘못된 메시지 거부: {}", e);
                return false;
            }
        };

        let inbound = InboundMessage::new(self.local_id.clone(), payload);
        for peer in &peers {
            peer.deliver(inbound.clone());
        }
        true
    }

    fn bind_open(&self, handler: OpenHandler) {
        self.open_handlers.lock().push(handler);
    }

    fn bind_message(&self, handler: MessageHandler) {
        self.message_handlers.lock().push(handler);
    }

    fn unbind(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Open => self.open_handlers.lock().clear(),
            ChannelEvent::Message => self.message_handlers.lock().clear(),
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let key = (self.kind, self.local_id.clone(), self.remote_id.clone());
            if let Some(mut entry) = hub.endpoints.get_mut(&key) {
                entry.retain(|weak| weak.strong_count() > 0);
            }
            hub.endpoints.remove_if(&key, |_, weaks| weaks.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(channel: &MemoryChannel) -> Arc<Mutex<Vec<InboundMessage>>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = received.clone();
        channel.bind_message(Arc::new(move |msg: &InboundMessage| {
            r.lock().push(msg.clone());
        }));
        received
    }

    #[test]
    fn test_send_requires_both_ends_open() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Rtc, "alice", "bob");
        let bob = hub.channel(ChannelKind::Rtc, "bob", "alice");
        let received = recorder(&bob);

        assert!(!alice.send(r#"["chat"]"#));

        alice.open();
        assert!(!alice.send(r#"["chat"]"#));

        bob.open();
        assert!(alice.send(r#"["chat","hi"]"#));

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].from, "alice");
        assert_eq!(received[0].payload, json!(["chat", "hi"]));
        assert!(received[0].timestamp > 0);
    }

    #[test]
    fn test_channel_kinds_are_isolated() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Socket, "alice", "bob");
        let bob = hub.channel(ChannelKind::Rtc, "bob", "alice");
        alice.open();
        bob.open();

        assert!(!alice.send(r#"["chat"]"#));
    }

    #[test]
    fn test_close_and_unbind() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Socket, "alice", "bob");
        let bob = hub.channel(ChannelKind::Socket, "bob", "alice");
        let received = recorder(&bob);
        alice.open();
        bob.open();

        bob.unbind(ChannelEvent::Message);
        assert!(alice.send(r#"["chat"]"#));
        assert!(received.lock().is_empty());

        bob.close();
        assert!(!bob.is_open());
        assert!(!alice.send(r#"["chat"]"#));
    }

    #[test]
    fn test_open_fires_handlers_each_time() {
        let hub = MemoryHub::new();
        let channel = hub.channel(ChannelKind::Socket, "alice", "bob");
        let opened = Arc::new(Mutex::new(0));
        let o = opened.clone();
        channel.bind_open(Arc::new(move || *o.lock() += 1));

        channel.open();
        channel.open();
        assert_eq!(*opened.lock(), 2);
    }

    #[test]
    fn test_dropped_channel_leaves_hub() {
        let hub = MemoryHub::new();
        let channel = hub.channel(ChannelKind::Socket, "alice", "bob");
        assert_eq!(hub.endpoint_count(), 1);

        drop(channel);
        assert_eq!(hub.endpoint_count(), 0);
    }

    #[test]
    fn test_rejects_non_json() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Socket, "alice", "bob");
        let bob = hub.channel(ChannelKind::Socket, "bob", "alice");
        alice.open();
        bob.open();

        assert!(!alice.send("not json"));
        assert!(!alice.send(r#"{"type":"chat"}"#));
        assert!(alice.send(r#"["chat"]"#));
    }

    #[test]
    fn test_every_open_instance_on_a_key_receives() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Socket, "alice", "bob");
        let first = hub.channel(ChannelKind::Socket, "bob", "alice");
        let second = hub.channel(ChannelKind::Socket, "bob", "alice");
        let first_received = recorder(&first);
        let second_received = recorder(&second);
        alice.open();
        first.open();
        second.open();

        assert!(alice.send(r#"["chat","hi"]"#));
        assert_eq!(first_received.lock().len(), 1);
        assert_eq!(second_received.lock().len(), 1);
        assert_eq!(hub.endpoint_count(), 3);
    }

    #[test]
    fn test_dropping_duplicate_keeps_original_reachable() {
        let hub = MemoryHub::new();
        let alice = hub.channel(ChannelKind::Socket, "alice", "bob");
        let bob = hub.channel(ChannelKind::Socket, "bob", "alice");
        let received = recorder(&bob);
        alice.open();
        bob.open();

        let duplicate = hub.channel(ChannelKind::Socket, "bob", "alice");
        duplicate.open();
        drop(duplicate);
        assert_eq!(hub.endpoint_count(), 2);

        assert!(alice.send(r#"["chat"]"#));
        assert_eq!(received.lock().len(), 1);
    }
}
