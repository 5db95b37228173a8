// SEO page server: rendering-resource pooling subsystem.
//
// The crate is organized around `PoolManager`, the single process-wide
// facade owning every pool family (reusable, consumable, and object pools),
// plus the request-orchestration layer (`page_handler`) and template
// compilation/rendering (`template`) that sit on top of it.

pub mod api;
pub mod emoji;
pub mod error;
pub mod html_entity;
pub mod page_handler;
pub mod pool;
pub mod stats_archiver;
pub mod storage;
pub mod template;

pub use error::{Result, SeoError};
pub use page_handler::PageHandler;
pub use pool::PoolManager;
pub use stats_archiver::StatsArchiver;
