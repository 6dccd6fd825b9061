use std::num::NonZeroUsize;

use conch_buffer::ChunkedBufConfig;

/// 每个方向缓冲的默认溢出上限：一千万字节。
///
/// 取值刻意宽松：上限的职责是兜住“对端长期不消费”这类病态场景，
/// 而不是参与正常流量的节流。两个方向可分别覆盖。
pub const DEFAULT_OVERFLOW_LIMIT: usize = 10_000_000;

/// I/O 引擎的构造参数。
///
/// # 设计目的（Why）
/// - 把块尺寸、双向溢出上限与初始读阈值集中为一个值对象，
///   与运行时其它设置结构保持同一风格；
/// - 全部字段均有保守默认值，`EngineConfig::default()` 即可直接使用。
///
/// # 契约说明（What）
/// - `chunk_size`：两个内部缓冲共用的块尺寸，必须大于 0；
/// - `read_overflow` / `write_overflow`：对应方向的字节上限，`0` 表示不限；
/// - `min_read` / `max_read`：读分发阈值的初始值，约束与
///   [`AioEngine::set_read_limits`](crate::AioEngine::set_read_limits) 一致。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    chunk_size: usize,
    read_overflow: usize,
    write_overflow: usize,
    min_read: usize,
    max_read: Option<NonZeroUsize>,
}

impl EngineConfig {
    /// 构造全默认配置：4096 字节块、双向一千万字节上限、`min = 1`、`max` 不限。
    pub const fn new() -> Self {
        Self {
            chunk_size: ChunkedBufConfig::DEFAULT_CHUNK_SIZE,
            read_overflow: DEFAULT_OVERFLOW_LIMIT,
            write_overflow: DEFAULT_OVERFLOW_LIMIT,
            min_read: 1,
            max_read: None,
        }
    }

    /// 覆盖块尺寸。
    ///
    /// # Panics
    /// `chunk_size == 0` 时 panic（零尺寸块没有合法语义）。
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size 必须大于 0");
        self.chunk_size = chunk_size;
        self
    }

    /// 覆盖读方向溢出上限（`0` = 不限）。
    pub const fn with_read_overflow(mut self, limit: usize) -> Self {
        self.read_overflow = limit;
        self
    }

    /// 覆盖写方向溢出上限（`0` = 不限）。
    pub const fn with_write_overflow(mut self, limit: usize) -> Self {
        self.write_overflow = limit;
        self
    }

    /// 覆盖初始读阈值；构造后仍可经
    /// [`AioEngine::set_read_limits`](crate::AioEngine::set_read_limits) 调整。
    ///
    /// # Panics
    /// `min == 0`，或设置上界且 `min > max` 时 panic——配置期的约束违规
    /// 属于编码错误，与运行期 [`set_read_limits`] 的错误返回有意区分。
    ///
    /// [`set_read_limits`]: crate::AioEngine::set_read_limits
    pub const fn with_read_limits(mut self, min: usize, max: Option<NonZeroUsize>) -> Self {
        assert!(min >= 1, "读阈值下界必须至少为 1 字节");
        if let Some(max) = max {
            assert!(min <= max.get(), "读阈值组合非法：min 不得大于 max");
        }
        self.min_read = min;
        self.max_read = max;
        self
    }

    /// 块尺寸。
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 读方向溢出上限。
    pub const fn read_overflow(&self) -> usize {
        self.read_overflow
    }

    /// 写方向溢出上限。
    pub const fn write_overflow(&self) -> usize {
        self.write_overflow
    }

    /// 初始读阈值下界。
    pub const fn min_read(&self) -> usize {
        self.min_read
    }

    /// 初始读阈值上界（`None` = 不限）。
    pub const fn max_read(&self) -> Option<NonZeroUsize> {
        self.max_read
    }

    /// 输入缓冲的派生配置。
    pub(crate) const fn input_buffer(&self) -> ChunkedBufConfig {
        ChunkedBufConfig::new(self.chunk_size, self.read_overflow)
    }

    /// 输出缓冲的派生配置。
    pub(crate) const fn output_buffer(&self) -> ChunkedBufConfig {
        ChunkedBufConfig::new(self.chunk_size, self.write_overflow)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
