//! 健康检测模块
//!
//! 提供URL探测、状态机、检测队列和轮询调度功能

pub mod prober;
pub mod queue;
pub mod scheduler;
pub mod tracker;

// 重新导出主要类型
pub use prober::{HttpProber, ProbeOutcome, Prober};
pub use queue::{CheckItem, CheckQueue};
pub use scheduler::PollScheduler;
pub use tracker::{Effect, Transition};
