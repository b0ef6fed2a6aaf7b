//! 每连接流水线 actor 与句柄
//! Per-connection pipeline actor and handle
//!
//! 槽位队列只在连接的拥有者任务上被触碰，因此队列本身不需要锁；
//! 跨线程的响应完成通过命令通道封送回该任务。
//!
//! The slot queue is only ever touched on the connection's owning task,
//! so the queue itself needs no lock; cross-thread response completion
//! is marshaled back onto that task through the command channel.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::pipeline::sequencer::{Sequencer, SlotToken};
use crate::pipeline::sink::ResponseSink;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// Commands accepted by a connection's pipeline actor.
/// 连接流水线 actor 接受的命令。
#[derive(Debug)]
pub enum PipelineCommand<R> {
    /// A request finished parsing; allocate its arrival-order slot.
    /// 一个请求解析完毕；为其分配到达顺序槽位。
    RequestParsed {
        reply: oneshot::Sender<SlotToken>,
    },
    /// A handler produced its response, possibly out of order.
    /// 处理器产生了响应，可能是乱序的。
    ResponseReady { token: SlotToken, response: R },
    /// Tear the connection down, discarding unflushed slots.
    /// 拆除连接，丢弃未冲刷的槽位。
    Shutdown,
}

/// The actor that owns one connection's slot queue and wire sink.
/// 拥有单个连接槽位队列与线路 sink 的 actor。
pub struct ConnectionPipeline<R, S: ResponseSink<R>> {
    sequencer: Sequencer<R>,
    sink: S,
    command_rx: mpsc::Receiver<PipelineCommand<R>>,
}

impl<R: Send + 'static, S: ResponseSink<R>> ConnectionPipeline<R, S> {
    /// Creates the actor and its command sender.
    /// 创建 actor 与其命令发送端。
    pub fn new(sink: S, config: &PipelineConfig) -> (Self, mpsc::Sender<PipelineCommand<R>>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let actor = Self {
            sequencer: Sequencer::new(),
            sink,
            command_rx,
        };
        (actor, command_tx)
    }

    /// Runs until shutdown or until every handle is dropped
    /// (disconnection). Unflushed slots are discarded on exit.
    /// 运行直到关闭或所有句柄被丢弃（断连）。退出时丢弃未冲刷的槽位。
    pub async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            match command {
                PipelineCommand::RequestParsed { reply } => {
                    let token = self.sequencer.enqueue();
                    trace!(token = token.sequence(), "Slot created");
                    let _ = reply.send(token);
                }
                PipelineCommand::ResponseReady { token, response } => {
                    let run = self.sequencer.fulfill(token, response);
                    if run.is_empty() {
                        trace!(
                            token = token.sequence(),
                            in_flight = self.sequencer.in_flight(),
                            "Response held, head not ready"
                        );
                        continue;
                    }
                    for response in run {
                        if let Err(e) = self.sink.write_response(response).await {
                            warn!(error = %e, "Wire write failed, tearing pipeline down");
                            let discarded = self.sequencer.discard_all();
                            debug!(discarded, "Pipeline stopped after sink failure");
                            return;
                        }
                    }
                }
                PipelineCommand::Shutdown => break,
            }
        }

        let discarded = self.sequencer.discard_all();
        if discarded > 0 {
            debug!(discarded, "Pipeline stopped, unflushed slots discarded");
        }
    }
}

/// A clonable handle to one connection's pipeline actor.
///
/// `response_ready` may be called from any task or thread; delivery over
/// the command channel is the hop back onto the connection's owning task.
///
/// 单个连接流水线 actor 的可克隆句柄。
///
/// `response_ready` 可从任意任务或线程调用；经命令通道的投递就是
/// 回到连接拥有者任务的封送。
#[derive(Debug)]
pub struct PipelineHandle<R> {
    command_tx: mpsc::Sender<PipelineCommand<R>>,
}

impl<R> Clone for PipelineHandle<R> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<R: Send + 'static> PipelineHandle<R> {
    /// Allocates the arrival-order slot for a freshly parsed request.
    /// Fails only if the connection is already gone.
    /// 为刚解析完的请求分配到达顺序槽位。仅当连接已不存在时失败。
    pub async fn request_parsed(&self) -> Result<SlotToken> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(PipelineCommand::RequestParsed { reply: reply_tx })
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        reply_rx.await.map_err(|_| Error::ConnectionClosed)
    }

    /// Hands a completed response to the pipeline. A response arriving
    /// after the connection was torn down is silently dropped; the
    /// handler that produced it has nowhere to deliver.
    /// 将完成的响应交给流水线。连接拆除后才到达的响应被静默丢弃；
    /// 产生它的处理器已无处投递。
    pub async fn response_ready(&self, token: SlotToken, response: R) {
        if self
            .command_tx
            .send(PipelineCommand::ResponseReady { token, response })
            .await
            .is_err()
        {
            trace!(
                token = token.sequence(),
                "Connection gone, orphaned response dropped"
            );
        }
    }

    /// Requests pipeline teardown; unflushed slots are discarded.
    /// 请求拆除流水线；未冲刷的槽位被丢弃。
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(PipelineCommand::Shutdown).await;
    }
}

/// Spawns a pipeline actor for one connection and returns its handle.
/// 为一个连接启动流水线 actor 并返回其句柄。
pub fn spawn_pipeline<R, S>(
    sink: S,
    config: &PipelineConfig,
) -> (PipelineHandle<R>, tokio::task::JoinHandle<()>)
where
    R: Send + 'static,
    S: ResponseSink<R>,
{
    let (actor, command_tx) = ConnectionPipeline::new(sink, config);
    let join = tokio::spawn(async move {
        actor.run().await;
    });
    debug!("Pipeline task started");
    (PipelineHandle { command_tx }, join)
}
