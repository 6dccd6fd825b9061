#![doc = r#"
# conch-core

## 设计动机（Why）
- **定位**：为 conch 运行时族（缓冲、I/O 引擎、事件调度器）提供最小共享契约，
  避免每个实现 crate 各自发明错误表示与时间来源。
- **架构角色**：处于依赖图最底层，不做任何 I/O，也不持有任何资源；
  上层 crate 只从这里取走 [`CoreError`]、[`Result`] 与 [`time::Clock`]。

## 核心契约（What）
- **错误域**：[`CoreError`] 以稳定字符串错误码（`<域>.<语义>`）区分五类故障，
  调用方依据 [`error::codes`] 分支处置，而非解析消息文本；
- **时间域**：[`time::Clock`] 抽象“当前单调时间点”，生产环境用
  [`time::SystemClock`]，测试注入 [`time::ManualClock`] 以获得确定性。

## 实现策略（How）
- 错误结构手写而非依赖派生宏，保持字段语义完全可控；
- 时钟仅保留同步的 `now()` 能力：本运行时按契约由外部就绪循环驱动，
  不存在内部挂起点，因此不提供异步睡眠接口。
"#]

pub mod error;
pub mod time;

pub use error::CoreError;

/// 统一的结果别名：默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;
