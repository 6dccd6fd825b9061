use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// `CoreError` 是 conch 各运行时 crate 跨层共享的稳定错误形态。
///
/// # 设计背景（Why）
/// - 缓冲溢出、描述符故障、参数非法等故障产生于不同层次，必须合流为统一错误码，
///   外部驱动循环才能据此决定“销毁引擎”“诊断后继续”或“拒绝本次配置”；
/// - 相比全局 errno 风格的负数返回值，按调用的显式结果类型让五类故障在类型层面可分支；
///   瞬态的 would-block 类条件被内部吸收为 stall/drain-end，**不会**以错误形式出现。
///
/// # 契约说明（What）
/// - `code`：`'static` 稳定字符串，遵循 `<域>.<语义>` 约定，取值见 [`codes`]；
/// - `message`：面向排障人员的自然语言描述，不承载机读语义；
/// - `cause`：可选底层原因（典型为 [`std::io::Error`]），经 `source()` 暴露完整链路。
///
/// # 设计取舍（Trade-offs）
/// - 消息采用 `Cow<'static, str>`，静态文案零分配，动态上下文按需堆分配；
/// - 不区分“错误结构体”与“错误枚举”两套体系：上层 crate 内部可以用枚举辅助分类，
///   但公共边界一律折算为本类型。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 契约说明（What）
    /// - **输入**：`code` 必须取自 [`codes`] 或遵循 `<域>.<语义>` 约定；
    ///   `message` 可为静态文案或动态拼接字符串；
    /// - **后置条件**：返回值拥有独立所有权，可跨线程传递（`Send + Sync`），
    ///   初始不含底层原因，需要时经 [`with_cause`](Self::with_cause) 追加。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 人类可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// 稳定错误码清单。
///
/// # 分类依据（Why）
/// - 对应运行时的五类故障面：构造失败、配置非法、缓冲溢出、致命 I/O、调度参数非法；
/// - 瞬态 I/O 条件（would-block / interrupted）被设计为**非错误**，因此没有对应码值。
pub mod codes {
    /// 链式缓冲的字节上限被突破；对该方向而言属硬性失败。
    pub const BUFFER_OVERFLOW: &str = "buffer.overflow";
    /// 绑定描述符失败：描述符非法或无法切换为非阻塞模式。
    pub const AIO_BIND: &str = "aio.bind";
    /// 引擎配置非法（如读阈值组合违反 `min >= 1 && min <= max`），原状态保持不变。
    pub const AIO_CONFIG: &str = "aio.config";
    /// 描述符上的致命 I/O 故障；引擎仍可查询但逻辑上已不可用，调用方应销毁之。
    pub const AIO_IO: &str = "aio.io";
    /// 事件调度器收到非法参数（零周期、零循环次数等）。
    pub const TIMER_CONFIG: &str = "timer.config";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let err = CoreError::new(codes::BUFFER_OVERFLOW, "限额 16 字节已用尽");
        assert_eq!(err.code(), "buffer.overflow");
        assert_eq!(format!("{err}"), "[buffer.overflow] 限额 16 字节已用尽");
        assert!(err.source().is_none());
    }

    #[test]
    fn cause_is_reachable_via_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let err = CoreError::new(codes::AIO_IO, "写入失败").with_cause(io);
        let source = err.source().expect("应暴露底层原因");
        assert!(source.to_string().contains("peer gone"));
    }
}
