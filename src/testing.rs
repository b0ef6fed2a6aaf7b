//! 测试辅助工具模块
//! Test utilities module

#![cfg(test)]

use crate::error::{Error, Result};
use crate::pipeline::ResponseSink;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A sink that records every response written to it, in write order.
/// 按写入顺序记录所有响应的 sink。
pub struct RecordingSink<R> {
    written: Arc<Mutex<Vec<R>>>,
}

impl<R> RecordingSink<R> {
    /// Creates the sink and the shared log of written responses.
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
impl<R: Send + 'static> ResponseSink<R> for RecordingSink<R> {
    async fn write_response(&mut self, response: R) -> Result<()> {
        match self.written.lock() {
            Ok(mut guard) => guard.push(response),
            Err(poisoned) => poisoned.into_inner().push(response),
        }
        Ok(())
    }
}

/// A sink whose every write fails, for exercising teardown paths.
/// 每次写入都失败的 sink，用于检验拆除路径。
pub struct FailingSink;

#[async_trait]
impl<R: Send + 'static> ResponseSink<R> for FailingSink {
    async fn write_response(&mut self, _response: R) -> Result<()> {
        Err(Error::ConnectionClosed)
    }
}
