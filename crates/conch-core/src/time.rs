use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 抽象可注入的单调时钟。
///
/// # 设计背景（Why）
/// - 事件调度器的全部语义（到期判定、漂移无关的周期重挂）都锚定在“当前时间点”上；
///   若直接调用系统时钟，相关测试将无法复现；
/// - 通过 trait 注入，生产环境用 [`SystemClock`]，测试用 [`ManualClock`] 手动推进。
///
/// # 接口约束（What）
/// - `now` 返回当前的单调时间点，实现必须保证单调不减；
/// - 本运行时为同步协作式设计，不存在内部挂起点，因此刻意不提供睡眠能力：
///   外部驱动循环自行根据 `next_interval` 计算等待时长。
pub trait Clock: Send + Sync + 'static {
    /// 返回当前的单调时间点。
    fn now(&self) -> Instant;
}

/// 直接委托 [`Instant::now`] 的系统时钟。
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 测试用手动时钟：时间仅在显式调用 [`advance`](Self::advance) 时前进。
///
/// # 使用指引（How）
/// - 以 `Arc<ManualClock>` 同时交给被测组件与测试代码；
/// - 测试侧调用 `advance` 推进虚拟时间，再观察被测组件的到期行为；
/// - 起点取构造时刻的真实 `Instant`，保证与 `Instant` 算术完全兼容。
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// 以当前真实时间为起点创建手动时钟。
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// 以指定时间点为起点创建手动时钟。
    pub fn starting_at(origin: Instant) -> Self {
        Self {
            now: Mutex::new(origin),
        }
    }

    /// 将虚拟时间推进 `delta`。
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("时钟锁不应中毒");
        *now += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("时钟锁不应中毒")
    }
}
