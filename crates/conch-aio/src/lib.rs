#![doc = r#"
# conch-aio

## 设计动机（Why）
- **定位**：[`AioEngine`] 独占一个非阻塞文件描述符与输入/输出两个分块缓冲，
  提供“入队即冲刷”的写路径与“排空即分发”的读路径，是 Shell 框架里
  反应器式机制的执行半部；
- **架构边界**：就绪多路复用（select/poll/epoll）按契约留在外部——
  调用方在描述符可读时调用 [`AioEngine::drain_in`]、可写或停滞后调用
  [`AioEngine::flush_out`]；引擎自身绝不阻塞调用线程，也不管理多个描述符。

## 核心契约（What）
- **构造**：绑定描述符并强制切换为非阻塞模式，失败即拒绝构造；
  描述符不被引擎持有（析构不关闭），生命周期由调用方负责；
- **写路径**：[`write`](AioEngine::write) 把数据拷入输出缓冲
  （受写溢出上限约束，越限整体失败）后立即尝试非阻塞冲刷；
  内核无法全量吸收时以 stall 回调上报积压长度；
- **读路径**：[`drain_in`](AioEngine::drain_in) 循环把内核数据直读进输入
  缓冲，每次提交后按读阈值（`min`/`max`）切块分发给读回调，回调持有
  块的所有权；
- **错误面**：would-block / interrupted 是被内部吸收的瞬态条件，
  **不是**错误；其余描述符故障以 [`conch_core::error::codes::AIO_IO`]
  上报，此后引擎仅供诊断，调用方应销毁之。

## 实现策略（How）
- 系统调用直接指向缓冲的锁定视图（授予-提交协议），热路径零中间拷贝；
- errno 分类收敛在 [`std::io::ErrorKind`] 层面，调用方永远不需要比对
  平台错误码；
- 回调以单方法能力 trait 表达（[`ReadHandler`] / [`StallHandler`]），
  闭包经由毯式实现可直接充当回调。
"#]

mod config;
mod engine;
mod handler;
mod sys;

pub use config::{EngineConfig, DEFAULT_OVERFLOW_LIMIT};
pub use engine::AioEngine;
pub use handler::{HandlerFlow, ReadHandler, StallHandler};
