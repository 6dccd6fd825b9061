#![doc = r#"
# conch-timer

## 设计动机（Why）
- **定位**：为外部就绪循环维护一组按绝对截止时间排序的计划事件，
  回答两个问题——“离最近一个事件还有多久”（用于计算 select/poll 超时）
  与“哪些事件已经到期”（唤醒后逐个弹出分发）。
- **架构角色**：与 I/O 引擎互不调用，二者由同一个外部循环驱动；
  调度器自身不做任何 I/O，也不产生线程。

## 核心契约（What）
- **有序性**：集合恒按截止时间升序，截止时间相同者按插入顺序稳定排序，
  [`EventScheduler::pop`] 因此总是先产出最早到期的事件；
- **周期事件**：到期弹出后以 `上次截止时间 + 周期` 重挂（而非“现在 + 周期”），
  避免处理延迟造成的漂移；循环次数耗尽后移除而非重挂；
- **到期判定**：`pop` 只产出截止时间不晚于当前时刻的事件，否则不改动任何状态。

## 实现策略（How）
- 底层为按 `(截止时间, 插入序号)` 键控的二叉堆，插入与弹出均为对数代价，
  平键稳定性由单调递增的插入序号保证，无需整表重排；
- 时间来源经 [`conch_core::time::Clock`] 注入，测试以手动时钟推进虚拟时间。
"#]

mod scheduler;

pub use scheduler::{EventId, EventScheduler, Repeat};
