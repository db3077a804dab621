pub mod cdp;
pub mod controller;
pub mod error;
pub mod frontier;
pub mod result;
pub mod session;
pub mod signature;

pub use cdp::CdpBrowser;
pub use controller::{CrawlBudget, CrawlController, ProgressCallback, RecordCallback};
pub use error::CrawlError;
pub use frontier::{CrawlFrontier, FrontierEntry, same_origin};
pub use result::{CrawlResult, MetricsRecord, PageMetrics};
pub use session::{Browser, PageSession};
pub use signature::dom_signature;
