#![forbid(unsafe_code)]

pub mod metrics_log;
pub mod pcd;

pub use metrics_log::{default_log_file_name, CsvMetricsLog};
pub use pcd::{parse_pcd, read_pcd, write_pcd, write_pcd_binary};
