pub mod kpi;
pub mod monthly;
pub mod summary;

pub use kpi::{calculate_kpi_metrics, KpiMetrics};
pub use monthly::{group_by_month, MonthlyBucket};
pub use summary::{summarize, Summary};
