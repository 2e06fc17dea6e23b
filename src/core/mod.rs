pub mod agent;
pub mod batch;
pub mod comments;
pub mod merge;
pub mod pipeline;
pub mod repair;
pub mod sanitize;
pub mod storage;

pub use agent::OpenAiInsightAgent;
pub use comments::{YouTubeCommentsClient, extract_video_id};
pub use merge::{FinalReport, merge_results};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
