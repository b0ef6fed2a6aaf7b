//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the expiry and pipelining library.
/// 过期与流水线库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying I/O error occurred while writing a response to the wire.
    /// 向线路写入响应时发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// The owning actor (wheel or pipeline) has already shut down.
    ///
    /// 用于任务间通信的内部通道意外关闭。
    /// 拥有者 actor（时间轮或流水线）已经关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// The connection backing a pipeline was torn down before the
    /// operation could complete.
    /// 流水线所属的连接在操作完成前已被拆除。
    #[error("Connection closed")]
    ConnectionClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::ChannelClosed => ErrorKind::BrokenPipe.into(),
            Error::ConnectionClosed => ErrorKind::ConnectionReset.into(),
        }
    }
}
