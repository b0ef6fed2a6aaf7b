//! 保序响应序列器核心
//! Ordered-response sequencer core
//!
//! 一个纯粹的 FIFO 槽位队列：请求解析完成时按到达顺序入队，响应
//! 以任意顺序完成，但只按到达顺序从队首放行。队列从不重排，它只
//! 决定队首*何时*可以冲刷。
//!
//! A pure FIFO slot queue: requests enqueue in arrival order at parse
//! completion; responses complete in any order but are only released
//! from the head in arrival order. The queue never reorders, it only
//! decides *when* the head may be flushed.

use std::collections::VecDeque;
use tracing::{trace, warn};

/// An opaque arrival-order token for one request's slot.
/// 一个请求槽位的不透明到达顺序令牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotToken(u64);

impl SlotToken {
    /// The token's position in arrival order, for logging.
    /// 该令牌在到达顺序中的位置，用于日志。
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// The state of one in-flight request slot.
/// 单个在途请求槽位的状态。
#[derive(Debug)]
enum SlotState<R> {
    /// The handler has not yet produced a response.
    /// 处理器尚未产生响应。
    Pending,
    /// The response is stored, waiting for every earlier slot to flush.
    /// 响应已存储，等待所有更早的槽位冲刷完毕。
    Ready(R),
}

/// Per-connection ordered queue of in-flight request slots.
///
/// Invariant: responses drain in exactly slot-creation order, regardless
/// of the order in which they were fulfilled.
///
/// 每连接的在途请求槽位保序队列。
///
/// 不变量：无论履行顺序如何，响应严格按槽位创建顺序放行。
#[derive(Debug)]
pub struct Sequencer<R> {
    slots: VecDeque<SlotState<R>>,
    /// Requests parsed so far; also the next token to hand out.
    /// 迄今解析的请求数，同时是下一个要发出的令牌。
    parsed: u64,
    /// Responses flushed so far; also the head slot's token.
    /// 迄今冲刷的响应数，同时是队首槽位的令牌。
    flushed: u64,
}

impl<R> Default for Sequencer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Sequencer<R> {
    pub fn new() -> Self {
        Self {
            slots: VecDeque::new(),
            parsed: 0,
            flushed: 0,
        }
    }

    /// Creates a slot at the tail, in strict arrival order. Called the
    /// instant a request is fully parsed.
    /// 在队尾创建槽位，严格按到达顺序。请求完整解析的瞬间调用。
    pub fn enqueue(&mut self) -> SlotToken {
        let token = SlotToken(self.parsed);
        self.parsed += 1;
        self.slots.push_back(SlotState::Pending);
        token
    }

    /// Stores a completed response and returns the maximal in-order run
    /// of ready responses from the head, which the caller must write to
    /// the wire in the returned order.
    ///
    /// A token already flushed, already fulfilled, or never issued is a
    /// silent no-op (empty run). The flush cascade is a bounded loop,
    /// never recursion.
    ///
    /// 存入完成的响应，并返回从队首开始的最长连续就绪响应序列，
    /// 调用方必须按返回顺序写入线路。
    ///
    /// 已冲刷、已履行或从未发出的令牌是静默空操作（空序列）。
    /// 冲刷级联是有界循环，绝非递归。
    pub fn fulfill(&mut self, token: SlotToken, response: R) -> Vec<R> {
        if token.0 < self.flushed {
            trace!(token = token.0, "Response for already-flushed slot, dropping");
            return Vec::new();
        }
        let index = (token.0 - self.flushed) as usize;
        let Some(slot) = self.slots.get_mut(index) else {
            warn!(token = token.0, "Response for unknown slot, dropping");
            return Vec::new();
        };
        match slot {
            SlotState::Pending => *slot = SlotState::Ready(response),
            SlotState::Ready(_) => {
                warn!(token = token.0, "Duplicate response for slot, dropping");
                return Vec::new();
            }
        }

        let mut run = Vec::new();
        while let Some(SlotState::Ready(_)) = self.slots.front() {
            match self.slots.pop_front() {
                Some(SlotState::Ready(response)) => {
                    self.flushed += 1;
                    run.push(response);
                }
                _ => break,
            }
        }
        run
    }

    /// Discards every slot, pending or ready, without flushing. Used on
    /// connection teardown. Returns the number discarded.
    /// 丢弃所有槽位（无论等待中或已就绪），不做冲刷。用于连接拆除。
    /// 返回丢弃数量。
    pub fn discard_all(&mut self) -> usize {
        let discarded = self.slots.len();
        self.slots.clear();
        self.flushed = self.parsed;
        discarded
    }

    /// Slots created but not yet flushed.
    /// 已创建但尚未冲刷的槽位数。
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Requests parsed so far on this connection.
    /// 此连接迄今解析的请求数。
    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    /// Responses flushed to the wire so far.
    /// 迄今冲刷到线路的响应数。
    pub fn flushed(&self) -> u64 {
        self.flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_completion_flushes_immediately() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        let t0 = seq.enqueue();
        let t1 = seq.enqueue();

        assert_eq!(seq.fulfill(t0, "r0"), vec!["r0"]);
        assert_eq!(seq.fulfill(t1, "r1"), vec!["r1"]);
        assert!(seq.is_empty());
        assert_eq!(seq.flushed(), 2);
    }

    #[test]
    fn out_of_order_completion_holds_until_head_ready() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        let t0 = seq.enqueue();
        let t1 = seq.enqueue();
        let t2 = seq.enqueue();

        // r1 and r2 complete first; nothing may reach the wire
        assert!(seq.fulfill(t1, "r1").is_empty());
        assert!(seq.fulfill(t2, "r2").is_empty());
        assert_eq!(seq.in_flight(), 3);

        // head completes: the whole run drains in arrival order
        assert_eq!(seq.fulfill(t0, "r0"), vec!["r0", "r1", "r2"]);
        assert!(seq.is_empty());
    }

    #[test]
    fn partial_run_stops_at_next_pending() {
        let mut seq: Sequencer<u32> = Sequencer::new();
        let t0 = seq.enqueue();
        let t1 = seq.enqueue();
        let t2 = seq.enqueue();
        let t3 = seq.enqueue();

        assert!(seq.fulfill(t1, 1).is_empty());
        assert!(seq.fulfill(t3, 3).is_empty());
        assert_eq!(seq.fulfill(t0, 0), vec![0, 1]);
        assert_eq!(seq.in_flight(), 2);
        assert_eq!(seq.fulfill(t2, 2), vec![2, 3]);
    }

    #[test]
    fn duplicate_fulfillment_is_dropped() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        let t0 = seq.enqueue();
        let t1 = seq.enqueue();

        assert!(seq.fulfill(t1, "first").is_empty());
        assert!(seq.fulfill(t1, "second").is_empty());
        assert_eq!(seq.fulfill(t0, "r0"), vec!["r0", "first"]);
    }

    #[test]
    fn stale_token_after_flush_is_dropped() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        let t0 = seq.enqueue();
        assert_eq!(seq.fulfill(t0, "r0"), vec!["r0"]);
        assert!(seq.fulfill(t0, "again").is_empty());
        assert_eq!(seq.flushed(), 1);
    }

    #[test]
    fn discard_drops_pending_and_ready_alike() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        let _t0 = seq.enqueue();
        let t1 = seq.enqueue();
        assert!(seq.fulfill(t1, "r1").is_empty());

        assert_eq!(seq.discard_all(), 2);
        assert!(seq.is_empty());
        // counters stay consistent for late stragglers
        assert!(seq.fulfill(t1, "late").is_empty());
    }

    #[test]
    fn tokens_are_sequential_arrival_order() {
        let mut seq: Sequencer<()> = Sequencer::new();
        for expected in 0..5u64 {
            assert_eq!(seq.enqueue().sequence(), expected);
        }
        assert_eq!(seq.parsed(), 5);
    }
}
