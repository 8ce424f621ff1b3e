//! Subscription Registry
//!
//! 원격 피어가 이 쪽에 대해 등록한 관심 이벤트 목록(원격 관심)과
//! 노드 식별자 발급, 채널 목록을 통한 메시지 전송을 담당한다.
//! 메시 인스턴스마다 하나씩 만들어 모든 노드가 공유한다.

use crate::channel::Channel;
use crate::node::Node;
use crate::protocol::is_protected;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

pub struct SubscriptionRegistry {
    /// peer_id -> 원격 피어가 bind 한 이벤트 타입 (등록 순서 유지)
    remote_interest: DashMap<String, Vec<String>>,
    uid_seed: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            remote_interest: DashMap::new(),
            uid_seed: AtomicU64::new(1),
        }
    }

    /// 노드 고유 ID 발급 (1부터 단조 증가)
    pub fn next_uid(&self) -> u64 {
        self.uid_seed.fetch_add(1, Ordering::Relaxed)
    }

    /// 노드의 채널 목록으로 메시지 전송
    pub fn dispatch(&self, node: &Node, message: &str) -> bool {
        self.send_via(&node.channels(), message)
    }

    /// 채널 목록을 마지막에 추가된 것부터 시도하고, 처음 수락한 채널에서 멈춘다.
    /// 모든 채널이 거절하면 조용히 버린다.
    pub fn send_via(&self, channels: &[Arc<dyn Channel>], message: &str) -> bool {
        for channel in channels.iter().rev() {
            if channel.send(message) {
                trace!("📤 {} 채널로 전송: {}", channel.kind(), message);
                return true;
            }
        }

        debug!("📭 수락한 채널 없음, 메시지 폐기: {}", message);
        false
    }

    pub fn record_bind(&self, peer_id: &str, event_type: &str) {
        if is_protected(event_type) {
            return;
        }

        let mut types = self.remote_interest.entry(peer_id.to_string()).or_default();
        if !types.iter().any(|t| t == event_type) {
            types.push(event_type.to_string());
            debug!("🔔 원격 관심 등록: {} -> {}", peer_id, event_type);
        }
    }

    pub fn record_unbind(&self, peer_id: &str, event_type: &str) {
        let Some(mut types) = self.remote_interest.get_mut(peer_id) else {
            return;
        };

        if let Some(index) = types.iter().position(|t| t == event_type) {
            types.remove(index);
            debug!("🔕 원격 관심 해제: {} -> {}", peer_id, event_type);
        }
    }

    pub fn has_interest(&self, peer_id: &str, event_type: &str) -> bool {
        self.remote_interest
            .get(peer_id)
            .map(|types| types.iter().any(|t| t == event_type))
            .unwrap_or(false)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
