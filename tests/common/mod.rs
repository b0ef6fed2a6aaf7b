//! Shared helpers for integration tests.
//! 集成测试共享辅助工具。

// not every test binary uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex, Once};
use tickline::error::Result;
use tickline::pipeline::ResponseSink;

/// Helper to initialize tracing for tests.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .init();
    });
}

/// A sink that appends every written response to a shared, ordered log,
/// standing in for a connection's outgoing wire.
/// 将每个写入的响应追加到共享有序日志的 sink，代替连接的发送线路。
pub struct WireLog<R> {
    written: Arc<Mutex<Vec<R>>>,
}

impl<R> WireLog<R> {
    pub fn new() -> (Self, Arc<Mutex<Vec<R>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                written: written.clone(),
            },
            written,
        )
    }
}

#[async_trait]
impl<R: Send + 'static> ResponseSink<R> for WireLog<R> {
    async fn write_response(&mut self, response: R) -> Result<()> {
        self.written.lock().unwrap().push(response);
        Ok(())
    }
}

/// Yields a few times so spawned actors can drain their queues.
/// 让出若干次调度，使已启动的 actor 能排空其队列。
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
