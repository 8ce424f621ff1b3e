//! Mesh - 노드 생성 컨텍스트
//!
//! 설정, 구독 레지스트리, 채널 생성기를 묶는다. 토폴로지/탐색은 다루지 않는다.

use crate::channel::ChannelFactory;
use crate::config::MeshConfig;
use crate::error::Result;
use crate::node::Node;
use crate::registry::SubscriptionRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub struct Mesh {
    config: MeshConfig,
    registry: SubscriptionRegistry,
    factory: Arc<dyn ChannelFactory>,
}

impl Mesh {
    pub fn new(config: MeshConfig, factory: Arc<dyn ChannelFactory>) -> Result<Arc<Self>> {
        config.validate()?;
        info!("🕸️ 메시 생성: {} (채널: {:?})", config.local_id, config.channels);

        Ok(Arc::new(Self {
            config,
            registry: SubscriptionRegistry::new(),
            factory,
        }))
    }

    /// 원격 참가자를 나타내는 새 노드. 같은 ID라도 매번 새 인스턴스를 만든다.
    pub fn node(self: &Arc<Self>, peer_id: impl Into<String>) -> Node {
        Node::new(self.clone(), peer_id.into())
    }

    pub fn local_id(&self) -> &str {
        &self.config.local_id
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub(crate) fn factory(&self) -> &Arc<dyn ChannelFactory> {
        &self.factory
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("local_id", &self.config.local_id)
            .field("channels", &self.config.channels)
            .finish()
    }
}
