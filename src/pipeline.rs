//! 保序响应流水线调度器
//! Ordered-response pipelining scheduler
//!
//! 该模块保证在单个持久连接上，异步产生的响应严格按请求到达顺序
//! 送达线路：每个请求在解析完成的瞬间按到达顺序获得一个槽位；
//! 处理器无论以何种顺序、在哪个线程上完成，队首之前的响应未发完时，
//! 后完成的响应只被暂存，随队首冲刷自动级联放行。
//!
//! This module guarantees that asynchronously produced responses reach
//! the wire of a single persistent connection strictly in request-arrival
//! order: each request claims a slot in arrival order the instant it is
//! parsed; however and wherever handlers complete, a response finishing
//! early is merely held, and is released automatically by the cascade
//! when the head of the queue flushes.

pub mod actor;
pub mod registry;
mod sequencer;
mod sink;

pub use actor::{ConnectionPipeline, PipelineCommand, PipelineHandle, spawn_pipeline};
pub use registry::{ConnectionId, PipelineRegistry};
pub use sequencer::{Sequencer, SlotToken};
pub use sink::ResponseSink;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::testing::{FailingSink, RecordingSink};

    #[tokio::test]
    async fn responses_flush_in_arrival_order() {
        let (sink, written) = RecordingSink::new();
        let (handle, join) = spawn_pipeline::<&str, _>(sink, &PipelineConfig::default());

        let t0 = handle.request_parsed().await.unwrap();
        let t1 = handle.request_parsed().await.unwrap();
        let t2 = handle.request_parsed().await.unwrap();

        // completions arrive out of order
        handle.response_ready(t1, "r1").await;
        handle.response_ready(t2, "r2").await;
        handle.response_ready(t0, "r0").await;

        handle.shutdown().await;
        join.await.unwrap();

        assert_eq!(*written.lock().unwrap(), vec!["r0", "r1", "r2"]);
    }

    #[tokio::test]
    async fn early_completion_is_held_until_head_flushes() {
        let (sink, written) = RecordingSink::new();
        let (handle, join) = spawn_pipeline::<&str, _>(sink, &PipelineConfig::default());

        let t0 = handle.request_parsed().await.unwrap();
        let t1 = handle.request_parsed().await.unwrap();

        handle.response_ready(t1, "r1").await;
        tokio::task::yield_now().await;
        assert!(written.lock().unwrap().is_empty());

        handle.response_ready(t0, "r0").await;
        handle.shutdown().await;
        join.await.unwrap();

        assert_eq!(*written.lock().unwrap(), vec!["r0", "r1"]);
    }

    #[tokio::test]
    async fn shutdown_discards_unflushed_slots() {
        let (sink, written) = RecordingSink::new();
        let (handle, join) = spawn_pipeline::<&str, _>(sink, &PipelineConfig::default());

        let t0 = handle.request_parsed().await.unwrap();
        let _t1 = handle.request_parsed().await.unwrap();

        handle.shutdown().await;
        join.await.unwrap();

        // a handler completing after teardown must not write or crash
        handle.response_ready(t0, "too late").await;
        assert!(written.lock().unwrap().is_empty());
        assert!(handle.request_parsed().await.is_err());
    }

    #[tokio::test]
    async fn sink_failure_tears_pipeline_down() {
        let (handle, join) = spawn_pipeline::<&str, _>(FailingSink, &PipelineConfig::default());

        let t0 = handle.request_parsed().await.unwrap();
        handle.response_ready(t0, "r0").await;
        join.await.unwrap();

        assert!(handle.request_parsed().await.is_err());
    }

    #[tokio::test]
    async fn registry_round_trip() {
        let registry: PipelineRegistry<&str> = PipelineRegistry::new();
        let (sink, _written) = RecordingSink::new();
        let (handle, join) = spawn_pipeline::<&str, _>(sink, &PipelineConfig::default());

        let id = registry.register(handle);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(id).is_some());
        assert!(registry.lookup(id + 1).is_none());

        let removed = registry.remove(id).unwrap();
        removed.shutdown().await;
        join.await.unwrap();
        assert!(registry.is_empty());
        assert!(registry.remove(id).is_none());
    }
}
