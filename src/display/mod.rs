//! 摘要视图模块

pub mod surface;
pub mod sync;

pub use surface::{DisplaySurface, NoOpDisplay, RenderOutcome, SummaryView, WebhookDisplay};
pub use sync::{DisplaySync, SyncReport};
