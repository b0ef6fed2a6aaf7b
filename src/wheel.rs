//! 时间轮过期引擎
//! Timing wheel expiry engine
//!
//! 该模块实现了分层时间轮算法，以摊还 O(1) 的代价管理大量定时清理
//! 动作。条目随其所在桶的轮转被触发；剩余延迟缩小到更细层级可表示
//! 时，条目通过显式的级联槽下沉一层。
//!
//! This module implements the hierarchical timing wheel algorithm,
//! managing large numbers of scheduled cleanup actions at amortized O(1)
//! cost. Entries fire as their bucket rotates out; as an entry's
//! remaining delay shrinks into a finer level's range, it cascades down
//! one level through an explicit cascade slot.

pub mod actor;
mod core;
mod entry;

pub use actor::{WheelActor, WheelCommand, WheelHandle, spawn_wheel};
pub use core::{TimingWheel, WheelStats, WheelTick};
pub use entry::{ExpiryAction, ExpiryEntry, ExpiryHandle};
