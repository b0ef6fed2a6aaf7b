//! 连接流水线注册表
//! Connection pipeline registry
//!
//! 连接处理层在 TCP 建连时登记流水线句柄，断连时注销并拆除。
//!
//! The connection-handling layer registers a pipeline handle on TCP
//! connect and deregisters (tearing it down) on disconnect.

use crate::pipeline::actor::PipelineHandle;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identifies one TCP connection within the process.
/// 标识进程内的一个TCP连接。
pub type ConnectionId = u64;

/// A concurrent table mapping live connections to their pipeline handles.
/// 存活连接到其流水线句柄的并发映射表。
#[derive(Debug)]
pub struct PipelineRegistry<R> {
    pipelines: DashMap<ConnectionId, PipelineHandle<R>>,
    next_id: AtomicU64,
}

impl<R> Default for PipelineRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PipelineRegistry<R> {
    pub fn new() -> Self {
        Self {
            pipelines: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new connection's pipeline, returning its id.
    /// 登记新连接的流水线，返回其 id。
    pub fn register(&self, handle: PipelineHandle<R>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pipelines.insert(id, handle);
        debug!(connection_id = id, "Pipeline registered");
        id
    }

    /// Looks up the pipeline handle for a live connection.
    /// 查找存活连接的流水线句柄。
    pub fn lookup(&self, id: ConnectionId) -> Option<PipelineHandle<R>> {
        self.pipelines.get(&id).map(|entry| entry.value().clone())
    }

    /// Deregisters a connection, returning its handle so the caller can
    /// tear the pipeline down. Unknown ids return `None`.
    /// 注销连接并返回其句柄，供调用方拆除流水线。未知 id 返回 `None`。
    pub fn remove(&self, id: ConnectionId) -> Option<PipelineHandle<R>> {
        let removed = self.pipelines.remove(&id).map(|(_, handle)| handle);
        if removed.is_some() {
            debug!(connection_id = id, "Pipeline deregistered");
        }
        removed
    }

    /// Number of live connections.
    /// 存活连接数。
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
