//! Capture analysis and composite report assembly.

mod pipeline;
mod prompt;
mod report;

pub use pipeline::AnalysisPipeline;
pub use prompt::render_prompt;
pub use report::render_report;
