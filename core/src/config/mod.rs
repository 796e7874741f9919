mod load;
mod run;
mod types;

pub use load::{get_data_dir, load, load_from_path, warn_on_timeout_hierarchy};
pub use run::{AnalysisOptions, CollectorOptions, ReportOptions, RunConfig};
pub use types::*;
