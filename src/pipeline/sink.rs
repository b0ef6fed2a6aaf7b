//! Traits for abstracting over the wire-write side of a connection.
//! 对连接的线路写入端进行抽象的 trait。

use crate::error::Result;
use async_trait::async_trait;

/// The collaborator that writes a released response to the wire.
///
/// The pipeline actor calls this strictly in request-arrival order; an
/// implementation only needs to append to its connection's outgoing
/// stream. A returned error tears the connection's pipeline down.
///
/// 将放行的响应写入线路的协作者。
///
/// 流水线 actor 严格按请求到达顺序调用它；实现只需向其连接的发送流
/// 追加数据。返回错误会拆除该连接的流水线。
#[async_trait]
pub trait ResponseSink<R>: Send + 'static {
    /// Writes one response to the wire.
    /// 向线路写入一个响应。
    async fn write_response(&mut self, response: R) -> Result<()>;
}

/// Any mpsc sender can act as a sink, which keeps the wiring between the
/// pipeline and a connection's writer task a plain channel.
///
/// 任意 mpsc 发送端都可以充当 sink，使流水线与连接写任务之间的
/// 连接方式保持为普通通道。
#[async_trait]
impl<R: Send + 'static> ResponseSink<R> for tokio::sync::mpsc::Sender<R> {
    async fn write_response(&mut self, response: R) -> Result<()> {
        self.send(response)
            .await
            .map_err(|_| crate::error::Error::ConnectionClosed)
    }
}
