//! 分层时间轮核心实现
//! Hierarchical timing wheel core implementation
//!
//! 单一所有者的数据结构：所有变更都通过 `&mut self` 在拥有者
//! 任务上进行，桶本身不需要任何锁。
//!
//! A single-owner data structure: all mutation goes through `&mut self`
//! on the owning task, so the buckets themselves need no locking.

use crate::config::WheelConfig;
use crate::wheel::entry::ExpiryHandle;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// A monotonically increasing tick counter, one increment per tick
/// interval. Wraps only at integer overflow, which is ignored in practice.
/// 单调递增的 tick 计数器，每个 tick 间隔递增一次。
/// 仅在整数溢出时回绕，实践中忽略。
pub type WheelTick = u64;

/// One scheduled occupant of a bucket.
///
/// Cascading is an explicit state machine instead of a self-referential
/// re-insertion closure: when a `Cascade` slot's bucket rotates out, the
/// inner entry is re-inserted with the remaining delay at a finer level.
///
/// 桶中的一个已调度占位。
///
/// 级联是显式状态机而不是自引用的重插入闭包：当 `Cascade` 槽所在的桶
/// 被轮转弹出时，内部条目以剩余延迟重新插入到更细的层级。
#[derive(Debug)]
pub(crate) enum WheelSlot {
    /// Fires when its bucket rotates out.
    /// 所在桶被轮转弹出时触发。
    Leaf(ExpiryHandle),
    /// Re-inserts `inner` with `remaining` ticks when its bucket rotates out.
    /// 所在桶被轮转弹出时，以剩余 `remaining` 个 tick 重新插入 `inner`。
    Cascade { remaining: u64, inner: ExpiryHandle },
}

type Bucket = Vec<WheelSlot>;

/// Snapshot of wheel state, for logging and diagnostics.
/// 时间轮状态快照，用于日志与诊断。
#[derive(Debug, Clone)]
pub struct WheelStats {
    /// Current tick counter value.
    /// 当前 tick 计数器值。
    pub tick: WheelTick,
    /// Number of wheel levels.
    /// 时间轮层数。
    pub levels: usize,
    /// Buckets per level.
    /// 每层桶数。
    pub buckets_per_wheel: usize,
    /// Slots still holding an armed entry.
    /// 仍持有已装载条目的槽数量。
    pub armed_slots: usize,
}

/// The full wheel hierarchy: level 0 is the finest granularity (one tick
/// per bucket), level i covers `buckets_per_wheel^i` ticks per bucket.
///
/// 完整的时间轮层级：第 0 层粒度最细（每桶一个 tick），
/// 第 i 层每桶覆盖 `buckets_per_wheel^i` 个 tick。
#[derive(Debug)]
pub struct TimingWheel {
    buckets_per_wheel: u64,
    tick: WheelTick,
    /// One ring of buckets per level; rotation pops the front bucket and
    /// pushes a fresh empty one at the back.
    /// 每层一个桶环；轮转弹出队首桶并在队尾补一个空桶。
    levels: Vec<VecDeque<Bucket>>,
    /// Rotation count per level.
    /// 每层的轮转次数。
    rotations: Vec<u64>,
}

impl TimingWheel {
    /// Creates a wheel hierarchy sized for `config`. Panics on a
    /// misconfigured service (see [`WheelConfig::validate`]).
    /// 按 `config` 构建时间轮层级。服务配置错误时 panic
    /// （见 [`WheelConfig::validate`]）。
    pub fn new(config: &WheelConfig) -> Self {
        config.validate();
        let level_count = config.levels();
        let buckets = config.buckets_per_wheel;

        let mut levels = Vec::with_capacity(level_count);
        for _ in 0..level_count {
            let mut ring = VecDeque::with_capacity(buckets);
            for _ in 0..buckets {
                ring.push_back(Bucket::new());
            }
            levels.push(ring);
        }

        debug!(
            levels = level_count,
            buckets_per_wheel = buckets,
            max_ticks = config.max_ticks(),
            "Timing wheel created"
        );

        Self {
            buckets_per_wheel: buckets as u64,
            tick: 0,
            levels,
            rotations: vec![0; level_count],
        }
    }

    /// Current tick counter.
    /// 当前 tick 计数。
    pub fn current_tick(&self) -> WheelTick {
        self.tick
    }

    /// Rotation count per level, finest first.
    /// 每层轮转次数，最细层在前。
    pub fn rotations(&self) -> &[u64] {
        &self.rotations
    }

    /// Inserts an entry `ticks` ticks in the future. Zero-tick delays and
    /// already-inert entries are no-ops. Delays beyond the hierarchy's
    /// capacity are clamped into the coarsest level's last bucket.
    ///
    /// 在未来 `ticks` 个 tick 处插入条目。零延迟与已失效条目为空操作。
    /// 超出层级容量的延迟被截断到最粗层的最后一个桶。
    pub fn insert(&mut self, ticks: u64, handle: ExpiryHandle) {
        if ticks == 0 || !handle.is_armed() {
            return;
        }

        let buckets = self.buckets_per_wheel;
        // granularity of the current level, in ticks
        let mut granularity = 1u64;

        for level in 0..self.levels.len() {
            // ticks until this level's next rotation
            let next_rotation = granularity - (self.tick % granularity);
            let level_reach = next_rotation + (buckets - 1) * granularity;

            if ticks <= level_reach {
                let offset = ticks.saturating_sub(next_rotation) / granularity;
                let pops_in = next_rotation + offset * granularity;
                let remaining = ticks.saturating_sub(pops_in);

                let slot = if remaining == 0 {
                    WheelSlot::Leaf(handle)
                } else {
                    WheelSlot::Cascade {
                        remaining,
                        inner: handle,
                    }
                };
                trace!(ticks, level, offset, remaining, "Entry inserted into wheel");
                self.levels[level][offset as usize].push(slot);
                return;
            }
            granularity = granularity.saturating_mul(buckets);
        }

        // Silent truncation: park in the furthest representable bucket.
        // 静默截断：放入可表示的最远的桶。
        warn!(
            requested_ticks = ticks,
            "delay exceeds wheel capacity, clamping to maximum"
        );
        let last_level = self.levels.len() - 1;
        let last_bucket = self.buckets_per_wheel as usize - 1;
        self.levels[last_level][last_bucket].push(WheelSlot::Leaf(handle));
    }

    /// Advances the wheel by one tick, rotating every level whose
    /// granularity divides the new tick count. Returns the number of
    /// entries fired.
    ///
    /// 将时间轮推进一个 tick，轮转所有粒度整除新 tick 计数的层级。
    /// 返回触发的条目数。
    pub fn tick(&mut self) -> usize {
        self.tick = self.tick.wrapping_add(1);
        let mut fired = 0;
        let mut granularity = 1u64;

        for level in 0..self.levels.len() {
            if self.tick % granularity != 0 {
                // Coarser levels rotate even less often.
                // 更粗的层级轮转得更少。
                break;
            }
            self.rotations[level] += 1;

            let popped = match self.levels[level].pop_front() {
                Some(bucket) => bucket,
                None => Bucket::new(),
            };
            self.levels[level].push_back(Bucket::new());

            for slot in popped {
                match slot {
                    WheelSlot::Leaf(handle) => {
                        if handle.fire() {
                            fired += 1;
                        }
                    }
                    WheelSlot::Cascade { remaining, inner } => {
                        if inner.is_armed() {
                            self.insert(remaining, inner);
                        } else {
                            trace!(level, "Dropping disarmed cascade entry");
                        }
                    }
                }
            }
            granularity = granularity.saturating_mul(self.buckets_per_wheel);
        }

        if fired > 0 {
            trace!(tick = self.tick, fired, "Wheel tick fired entries");
        }
        fired
    }

    /// Drains all levels coarsest-to-finest, firing outstanding entries.
    /// Draining in that order means cascade slots are consumed before the
    /// finer levels they would re-insert into are torn down.
    ///
    /// 从最粗到最细清空所有层级，触发尚未处理的条目。按此顺序清空
    /// 保证级联槽在其目标细层被拆除之前已被消耗。
    pub fn clear_all(&mut self) -> usize {
        let mut fired = 0;
        for level in (0..self.levels.len()).rev() {
            let buckets = std::mem::take(&mut self.levels[level]);
            for bucket in buckets {
                for slot in bucket {
                    let handle = match slot {
                        WheelSlot::Leaf(handle) => handle,
                        WheelSlot::Cascade { inner, .. } => inner,
                    };
                    if handle.fire() {
                        fired += 1;
                    }
                }
            }
        }
        if fired > 0 {
            debug!(fired, "Wheel cleared, outstanding entries fired");
        }
        fired
    }

    /// Counts slots whose entries are still armed.
    /// 统计仍持有已装载条目的槽。
    pub fn armed_slots(&self) -> usize {
        self.levels
            .iter()
            .flatten()
            .flatten()
            .filter(|slot| match slot {
                WheelSlot::Leaf(handle) => handle.is_armed(),
                WheelSlot::Cascade { inner, .. } => inner.is_armed(),
            })
            .count()
    }

    /// Whether no armed entry remains anywhere in the hierarchy.
    /// 层级结构中是否已不存在任何已装载条目。
    pub fn is_empty(&self) -> bool {
        self.armed_slots() == 0
    }

    /// Snapshot of the wheel state.
    /// 时间轮状态快照。
    pub fn stats(&self) -> WheelStats {
        WheelStats {
            tick: self.tick,
            levels: self.levels.len(),
            buckets_per_wheel: self.buckets_per_wheel as usize,
            armed_slots: self.armed_slots(),
        }
    }
}
