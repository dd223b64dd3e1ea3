mod attachment;
mod finding;
mod report;
mod severity;
mod summary;

pub use attachment::Attachment;
pub use finding::Finding;
pub use report::{FindingBuckets, Report};
pub use severity::Severity;
pub use summary::{GroupSummary, IngressRow, SummaryStats};
