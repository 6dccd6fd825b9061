#![doc = r#"
# conch-buffer

## 设计动机（Why）
- **定位**：提供一个按固定尺寸分块、动态增长的 FIFO 字节队列 [`ChunkedBuf`]，
  是 I/O 引擎输入/输出两侧的底层存储，也可独立用作普通字节队列。
- **热路径诉求**：引擎把内核 read/write 系统调用直接指向缓冲内部存储，
  因此缓冲必须暴露“锁定视图”协议——先授予一段有界切片，再以实际消费/生产
  的字节数显式提交。

## 核心契约（What）
- **普通读写**：`write` 追加字节（受可配置的字节上限约束），`read` 从队首
  拷出并释放已完全耗尽的块；
- **锁定视图**：[`ReadView`] 授予最大连续可读段（以单块为界），
  [`WriteView`] 授予尾块空闲区（必要时新分配一块）；两者均以
  `commit(n)` 作为作用域化提交步骤，`n` 不得超过授予长度；
- **溢出策略**：上限检查发生在追加**之前**，一次 `write` 要么全部入队、
  要么原样失败，不存在部分入队。

## 实现策略（How）
- 块存储采用 `bytes::BytesMut::zeroed` 的定长块加显式读写游标，
  视图因此是纯安全切片，提交即推进游标；
- 读锁与写锁各自独占借用缓冲（`&mut self`），借用检查器天然保证
  同侧至多一个在途视图。
"#]

mod chunked;
mod config;

pub use chunked::{ChunkedBuf, ReadView, WriteView};
pub use config::ChunkedBufConfig;
