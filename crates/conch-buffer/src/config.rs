/// 链式缓冲的构造参数。
///
/// # 设计目的（Why）
/// - 将块尺寸与字节上限集中为一个值对象，避免构造函数随参数演进膨胀；
/// - 与运行时其它设置结构保持同一风格：`const fn new` + 只读访问器 + `Default`。
///
/// # 契约说明（What）
/// - `chunk_size`：单块容量（字节），必须大于 0；
/// - `limit`：缓冲允许驻留的最大字节数，`0` 表示不设上限。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkedBufConfig {
    chunk_size: usize,
    limit: usize,
}

impl ChunkedBufConfig {
    /// 默认块尺寸：4096 字节。
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    /// 构造自定义配置。
    ///
    /// # Panics
    /// `chunk_size == 0` 时立即 panic：零尺寸块没有任何合法语义，
    /// 属于调用方的编码错误而非运行时故障。
    pub const fn new(chunk_size: usize, limit: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size 必须大于 0");
        Self { chunk_size, limit }
    }

    /// 单块容量（字节）。
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 字节上限，`0` 表示不限。
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for ChunkedBufConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_SIZE, 0)
    }
}
