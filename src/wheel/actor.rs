//! 时间轮 actor 任务与句柄
//! Timing wheel actor task and handle
//!
//! 时间轮由一个专属任务独占拥有；跨线程调用方通过命令通道把操作
//! 封送到该任务上，而不是用锁保护轮的内部状态。
//!
//! The wheel is exclusively owned by a dedicated task; cross-thread
//! callers marshal operations onto it through a command channel instead
//! of guarding the wheel's internals with locks.

use crate::config::WheelConfig;
use crate::error::{Error, Result};
use crate::wheel::core::{TimingWheel, WheelStats};
use crate::wheel::entry::ExpiryHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

/// Commands accepted by the wheel actor.
/// 时间轮 actor 接受的命令。
#[derive(Debug)]
pub enum WheelCommand {
    /// Arm an entry `delay` in the future.
    /// 在未来 `delay` 处装载一个条目。
    Insert {
        delay: Duration,
        handle: ExpiryHandle,
    },
    /// Query wheel state.
    /// 查询时间轮状态。
    Stats {
        reply: oneshot::Sender<WheelStats>,
    },
    /// Stop ticking; outstanding entries fire during teardown.
    /// 停止走时；拆除期间触发尚未处理的条目。
    Shutdown,
}

/// The task that exclusively owns a [`TimingWheel`] and drives its ticks.
/// 独占拥有 [`TimingWheel`] 并驱动其走时的任务。
pub struct WheelActor {
    wheel: TimingWheel,
    config: WheelConfig,
    command_rx: mpsc::UnboundedReceiver<WheelCommand>,
}

impl WheelActor {
    /// Creates the actor and its command sender.
    /// 创建 actor 与其命令发送端。
    pub fn new(config: WheelConfig) -> (Self, mpsc::UnboundedSender<WheelCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let actor = Self {
            wheel: TimingWheel::new(&config),
            config,
            command_rx,
        };
        (actor, command_tx)
    }

    /// Runs the actor's main loop until shutdown or until every handle
    /// is dropped.
    /// 运行 actor 主循环，直到关闭或所有句柄被丢弃。
    pub async fn run(mut self) {
        // The first tick must land one full interval from now, not
        // immediately, or the wheel would advance at time zero.
        // 第一个 tick 必须落在一个完整间隔之后，而不是立即触发，
        // 否则时间轮会在零时刻被推进。
        let mut ticker = interval_at(
            Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let fired = self.wheel.tick();
                    if fired > 0 {
                        trace!(tick = self.wheel.current_tick(), fired, "Wheel advanced");
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(WheelCommand::Insert { delay, handle }) => {
                            let ticks = self.config.delay_to_ticks(delay);
                            if ticks == 0 {
                                trace!("Ignoring zero-delay insert");
                            } else {
                                self.wheel.insert(ticks, handle);
                            }
                        }
                        Some(WheelCommand::Stats { reply }) => {
                            let _ = reply.send(self.wheel.stats());
                        }
                        Some(WheelCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        let fired = self.wheel.clear_all();
        debug!(fired, "Wheel actor stopped");
    }
}

/// A clonable, thread-safe handle to a wheel actor.
///
/// [`insert`](Self::insert) is synchronous: the send over the unbounded
/// command channel *is* the hop onto the owning task, so non-async
/// callers (such as the expiring map's mutex-guarded paths) can arm
/// entries without awaiting.
///
/// 时间轮 actor 的可克隆、线程安全句柄。
///
/// [`insert`](Self::insert) 是同步的：经无界命令通道的发送本身就是
/// 到拥有者任务的封送，因此非异步调用方（如过期映射的持锁路径）
/// 无需 await 即可装载条目。
#[derive(Debug, Clone)]
pub struct WheelHandle {
    command_tx: mpsc::UnboundedSender<WheelCommand>,
}

impl WheelHandle {
    /// Arms `handle` to fire `delay` in the future. Marshaled onto the
    /// owning task; safe from any thread.
    /// 装载 `handle` 于未来 `delay` 处触发。封送到拥有者任务；
    /// 任意线程调用均安全。
    pub fn insert(&self, delay: Duration, handle: ExpiryHandle) -> Result<()> {
        self.command_tx
            .send(WheelCommand::Insert { delay, handle })
            .map_err(|_| Error::ChannelClosed)
    }

    /// Fetches a snapshot of the wheel state.
    /// 获取时间轮状态快照。
    pub async fn stats(&self) -> Result<WheelStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(WheelCommand::Stats { reply: reply_tx })
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Requests actor shutdown. Entries still armed fire during teardown.
    /// 请求 actor 关闭。仍处于装载状态的条目在拆除期间触发。
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(WheelCommand::Shutdown);
    }
}

/// Spawns a wheel actor and returns its handle.
/// 启动一个时间轮 actor 并返回其句柄。
pub fn spawn_wheel(config: WheelConfig) -> WheelHandle {
    config.validate();
    let (actor, command_tx) = WheelActor::new(config);

    tokio::spawn(async move {
        actor.run().await;
    });

    info!("Timing wheel task started");
    WheelHandle { command_tx }
}
