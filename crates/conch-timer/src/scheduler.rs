use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conch_core::error::codes;
use conch_core::time::{Clock, SystemClock};
use conch_core::{CoreError, Result};
use tracing::trace;

/// 事件标识，由调用方自行分配与解释。
pub type EventId = u64;

/// 周期事件的循环次数。
///
/// - [`Forever`](Self::Forever)：无限重复；
/// - [`Times(n)`](Self::Times)：事件总计被弹出 `n` 次后移除；
///   `Times(0)` 是非法参数——这样的事件永远不会产出，接受它只会在集合里
///   留下一个不可达的占位。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

/// 堆内条目：排序键为 `(deadline, seq)`，`seq` 承载稳定的插入序。
#[derive(Debug)]
struct Entry<T> {
    deadline: Instant,
    seq: u64,
    id: EventId,
    data: T,
    periodic: Option<Periodic>,
}

#[derive(Clone, Copy, Debug)]
struct Periodic {
    period: Duration,
    remaining: Repeat,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    /// 比较方向刻意反转：`BinaryHeap` 是大顶堆，反转后堆顶即最早到期、
    /// 同一截止时间中最先插入的条目。
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// `EventScheduler` 维护按截止时间排序的计划事件集合。
///
/// # 设计背景（Why）
/// - 外部循环需要一个纯内存、零 I/O 的时间簿记组件：先问
///   [`next_interval`](Self::next_interval) 算等待时长，醒来后循环
///   [`pop`](Self::pop) 分发到期事件；
/// - 负载数据对调度器完全不透明，以泛型 `T` 承载；周期事件每次弹出都要
///   交付负载且自身还需保留一份用于重挂，因此 `pop` 要求 `T: Clone`，
///   让这份共享成本在类型层面显式可见。
///
/// # 契约说明（What）
/// - 集合恒按 `(截止时间, 插入序号)` 升序，平键稳定；
/// - 周期事件重挂截止时间为 `上次截止 + 周期`，与当前时刻无关（防漂移）；
/// - 剩余循环数降为零的周期事件被移除而非重挂；
/// - 调度器不提供按标识移除的原语：取消语义由调用方自身的簿记承担。
///
/// # 设计取舍（Trade-offs）
/// - 二叉堆丢失了“遍历全部条目”的能力，但本组件的全部操作只触及堆顶，
///   对数复杂度显著优于每次插入后整表重排；
/// - 重挂的条目获得新的插入序号：它与原集合中平键条目的相对顺序视为
///   一次新插入，这与“稳定平键”描述的外部可观察行为一致。
pub struct EventScheduler<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
    clock: Arc<dyn Clock>,
}

impl<T> EventScheduler<T> {
    /// 以系统时钟创建空调度器。
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 以注入时钟创建空调度器（测试场景注入手动时钟）。
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            clock,
        }
    }

    /// 当前集合中的事件数。
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// 集合是否为空。
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 移除并释放全部事件。
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// 插入一次性事件，`deadline` 不晚于当前时刻即为立即到期。
    pub fn schedule_at(&mut self, deadline: Instant, id: EventId, data: T) {
        self.push(deadline, id, data, None);
    }

    /// 便捷形式：截止时间 = 当前时刻 + `delay`；`Duration::ZERO` 表示立即到期。
    pub fn schedule_after(&mut self, delay: Duration, id: EventId, data: T) {
        let deadline = self.clock.now() + delay;
        self.push(deadline, id, data, None);
    }

    /// 插入周期事件：首个截止时间为 `first`，此后每次到期弹出时以
    /// `上次截止 + period` 重挂，直至循环次数耗尽。
    ///
    /// # 契约说明（What）
    /// - `period` 为零或 `repeat == Times(0)` 视为非法参数，返回
    ///   [`codes::TIMER_CONFIG`] 且不改动集合；
    /// - `Times(n)` 的事件总计会被 [`pop`](Self::pop) 产出恰好 `n` 次。
    pub fn schedule_periodic_at(
        &mut self,
        first: Instant,
        id: EventId,
        data: T,
        period: Duration,
        repeat: Repeat,
    ) -> Result<()> {
        if period.is_zero() {
            return Err(CoreError::new(
                codes::TIMER_CONFIG,
                "周期事件的周期不得为零",
            ));
        }
        if repeat == Repeat::Times(0) {
            return Err(CoreError::new(
                codes::TIMER_CONFIG,
                "循环次数为零的周期事件永远不会产出",
            ));
        }
        self.push(
            first,
            id,
            data,
            Some(Periodic {
                period,
                remaining: repeat,
            }),
        );
        Ok(())
    }

    /// 便捷形式：首个截止时间 = 当前时刻 + `period`。
    pub fn schedule_periodic(
        &mut self,
        id: EventId,
        data: T,
        period: Duration,
        repeat: Repeat,
    ) -> Result<()> {
        let first = self.clock.now() + period;
        self.schedule_periodic_at(first, id, data, period, repeat)
    }

    /// 距最早事件到期还有多久。
    ///
    /// - 集合为空时返回 `None`（调用方可据此选择无限等待）；
    /// - 最早事件已到期时返回 `Duration::ZERO`；
    /// - 本操作不改动任何状态。
    pub fn next_interval(&self) -> Option<Duration> {
        let earliest = self.heap.peek()?;
        Some(
            earliest
                .deadline
                .saturating_duration_since(self.clock.now()),
        )
    }

    fn push(&mut self, deadline: Instant, id: EventId, data: T, periodic: Option<Periodic>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(event_id = id, seq, periodic = periodic.is_some(), "调度事件入队");
        self.heap.push(Entry {
            deadline,
            seq,
            id,
            data,
            periodic,
        });
    }
}

impl<T: Clone> EventScheduler<T> {
    /// 弹出最早到期的事件，未到期或集合为空时返回 `None` 且不改动状态。
    ///
    /// # 执行步骤（How）
    /// 1. 观察堆顶：截止时间晚于当前时刻则直接返回 `None`；
    /// 2. 取出堆顶条目，产出 `(id, data)`；
    /// 3. 周期事件若仍有剩余循环，则克隆负载并以
    ///    `上次截止 + 周期` 作为新截止时间重挂（防漂移），
    ///    剩余次数随之递减；降为零者不再重挂。
    pub fn pop(&mut self) -> Option<(EventId, T)> {
        let due = {
            let earliest = self.heap.peek()?;
            earliest.deadline <= self.clock.now()
        };
        if !due {
            return None;
        }
        let entry = match self.heap.pop() {
            Some(entry) => entry,
            None => unreachable!("peek 刚刚观察到堆顶条目"),
        };
        if let Some(periodic) = entry.periodic {
            let rearm = match periodic.remaining {
                Repeat::Forever => Some(Repeat::Forever),
                Repeat::Times(n) => {
                    let left = n - 1;
                    (left > 0).then_some(Repeat::Times(left))
                }
            };
            if let Some(remaining) = rearm {
                trace!(event_id = entry.id, "周期事件重挂");
                self.push(
                    entry.deadline + periodic.period,
                    entry.id,
                    entry.data.clone(),
                    Some(Periodic {
                        period: periodic.period,
                        remaining,
                    }),
                );
            }
        }
        Some((entry.id, entry.data))
    }
}

impl<T> Default for EventScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
