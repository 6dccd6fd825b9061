use bytes::Bytes;

/// 回调返回的续行意向。
///
/// 预留给未来的取消语义：当前引擎接受但**忽略**该返回值。
/// 调用方已经可以开始返回 [`Stop`](Self::Stop)，
/// 以便将来升级时无需改动回调实现。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerFlow {
    Continue,
    Stop,
}

/// 读回调能力：输入缓冲积累到阈值后，引擎按块调用 [`on_data`](Self::on_data)。
///
/// # 契约说明（What）
/// - `block` 是引擎为本次分发新切出的独立数据块，所有权随调用转移，
///   长度恒满足 `min <= len`，且在设置了上界时 `len <= max`；
/// - 回调在引擎所在线程同步执行，**不得**在其中再进入同一引擎
///   （单线程协作式契约，非重入）。
///
/// 任何 `FnMut(Bytes) -> HandlerFlow` 闭包经毯式实现自动满足本 trait。
pub trait ReadHandler {
    /// 处理一块已按阈值切分的输入数据。
    fn on_data(&mut self, block: Bytes) -> HandlerFlow;
}

impl<F> ReadHandler for F
where
    F: FnMut(Bytes) -> HandlerFlow,
{
    fn on_data(&mut self, block: Bytes) -> HandlerFlow {
        self(block)
    }
}

/// 停滞回调能力：输出缓冲未能全量冲刷时，引擎以当前积压长度调用
/// [`on_stall`](Self::on_stall)。
///
/// 收到停滞通知后，调用方应在描述符再次可写时调用
/// [`AioEngine::flush_out`](crate::AioEngine::flush_out) 续刷。
///
/// 任何 `FnMut(usize) -> HandlerFlow` 闭包经毯式实现自动满足本 trait。
pub trait StallHandler {
    /// 接收停滞通知，`pending` 为输出缓冲当前驻留的字节数。
    fn on_stall(&mut self, pending: usize) -> HandlerFlow;
}

impl<F> StallHandler for F
where
    F: FnMut(usize) -> HandlerFlow,
{
    fn on_stall(&mut self, pending: usize) -> HandlerFlow {
        self(pending)
    }
}
