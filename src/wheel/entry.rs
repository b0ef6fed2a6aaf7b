//! 时间轮过期条目实现
//! Expiry entry implementation for the timing wheel
//!
//! 条目持有一个一次性的清理动作。动作的生命周期是一个显式的
//! 状态转换（已装载 -> 已消耗），而不是依赖析构时机的副作用。
//!
//! An entry holds a one-shot cleanup action. The action's lifecycle is an
//! explicit state transition (armed -> spent) rather than a side effect
//! of destruction timing.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tracing::error;

/// A one-shot cleanup action fired when an entry expires.
/// 条目过期时触发的一次性清理动作。
pub type ExpiryAction = Box<dyn FnOnce() + Send>;

/// A shared, reference-counted expiry entry handle.
/// 共享的、引用计数的过期条目句柄。
pub type ExpiryHandle = Arc<ExpiryEntry>;

/// A destruction-triggered callback holder.
///
/// The action fires exactly once: either when a bucket rotation reaches
/// it ([`fire`](Self::fire)), or, as a last resort, when the entry itself
/// is dropped while still armed. [`disarm`](Self::disarm) makes the entry
/// permanently inert.
///
/// 析构触发式回调持有者。
///
/// 动作恰好触发一次：要么在桶轮转到它时（[`fire`](Self::fire)），
/// 要么在条目仍处于装载状态被丢弃时作为兜底触发。
/// [`disarm`](Self::disarm) 使条目永久失效。
pub struct ExpiryEntry {
    /// `Some` while armed, `None` once fired or disarmed.
    /// 装载时为 `Some`，触发或撤防后为 `None`。
    action: Mutex<Option<ExpiryAction>>,
}

impl std::fmt::Debug for ExpiryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryEntry")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl ExpiryEntry {
    /// Creates a new armed entry.
    /// 创建一个新的已装载条目。
    pub fn new(action: ExpiryAction) -> ExpiryHandle {
        Arc::new(Self {
            action: Mutex::new(Some(action)),
        })
    }

    /// Fires the action if still armed. Returns whether it ran.
    ///
    /// A panicking action is caught here so it cannot escape into the
    /// wheel actor's dispatch loop.
    ///
    /// 若仍处于装载状态则触发动作，返回是否执行。
    /// 动作中的 panic 在此被捕获，不会逃逸到时间轮 actor 的调度循环。
    pub fn fire(&self) -> bool {
        match self.take_action() {
            Some(action) => {
                if catch_unwind(AssertUnwindSafe(action)).is_err() {
                    error!("expiry action panicked; panic contained at wheel boundary");
                }
                true
            }
            None => false,
        }
    }

    /// Silently discards the action. The entry may still sit in a wheel
    /// bucket; rotation will find it inert and drop it.
    ///
    /// 静默丢弃动作。条目可能仍在时间轮的桶中；
    /// 轮转时会发现其已失效并直接丢弃。
    pub fn disarm(&self) {
        let _ = self.take_action();
    }

    /// Whether the action has not yet fired or been disarmed.
    /// 动作是否尚未触发且未被撤防。
    pub fn is_armed(&self) -> bool {
        self.action
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn take_action(&self) -> Option<ExpiryAction> {
        match self.action.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Drop for ExpiryEntry {
    fn drop(&mut self) {
        // Last-resort firing: an armed entry dropped with its wheel still
        // runs its cleanup exactly once.
        // 兜底触发：随时间轮一起被丢弃的已装载条目仍恰好执行一次清理。
        if let Some(action) = self.take_action() {
            if catch_unwind(AssertUnwindSafe(action)).is_err() {
                error!("expiry action panicked during drop");
            }
        }
    }
}
