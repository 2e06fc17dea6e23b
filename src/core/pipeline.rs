use crate::config::Settings;
use crate::core::agent::{InsightAgent, PromptConfig, RateLimiter};
use crate::core::batch::{Chunk, split_into_chunks};
use crate::core::merge::{FinalReport, merge_results};
use crate::core::repair::parse_agent_output;
use crate::core::storage::{self, ResultStore};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub chunk_size: NonZeroUsize,
    pub timeout: Option<Duration>,
    pub max_rpm: u32,
    pub comments_path: PathBuf,
    pub raw_results_path: PathBuf,
    pub final_results_path: PathBuf,
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            timeout: settings.timeout,
            max_rpm: settings.agent.max_rpm,
            comments_path: settings.comments_path.clone(),
            raw_results_path: settings.raw_results_path.clone(),
            final_results_path: settings.final_results_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sourcing,
    Batching,
    ProcessingChunk(usize),
    ChunkFailed(usize),
    Merging,
    Done,
}

#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub comments: usize,
    pub chunks: usize,
    pub stored: usize,
    pub failures: Vec<ChunkFailure>,
    pub report: FinalReport,
    pub report_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn failed_indexes(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

/// Drives one analysis run: load comments, analyse them chunk by chunk,
/// persist every parsed answer, then merge everything into the final report.
///
/// Chunks are processed strictly in order, one at a time. A chunk that fails
/// (agent error, timeout, unparseable answer, store write error) is logged and
/// skipped; only a missing comment source aborts the run.
pub struct Pipeline<A> {
    agent: A,
    prompt: PromptConfig,
    options: PipelineOptions,
    limiter: RateLimiter,
    state: PipelineState,
}

impl<A: InsightAgent> Pipeline<A> {
    pub fn new(agent: A, options: PipelineOptions) -> Self {
        Self {
            agent,
            prompt: PromptConfig::default(),
            limiter: RateLimiter::per_minute(options.max_rpm),
            options,
            state: PipelineState::Idle,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline state change");
        self.state = next;
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();

        self.transition(PipelineState::Sourcing);
        let comments = storage::load_comments(&self.options.comments_path).await?;
        info!(
            path = %self.options.comments_path.display(),
            count = comments.len(),
            "Loaded comments"
        );
        debug!(preview = ?&comments[..comments.len().min(5)], "First comments");

        let mut store = match ResultStore::reset(&self.options.raw_results_path).await {
            Ok(store) => Some(store),
            Err(e) => {
                error!(
                    path = %self.options.raw_results_path.display(),
                    error = %e,
                    "Could not initialise the result store; chunk results will not be persisted"
                );
                None
            }
        };

        self.transition(PipelineState::Batching);
        let chunks = split_into_chunks(&comments, self.options.chunk_size);
        info!(
            chunks = chunks.len(),
            chunk_size = self.options.chunk_size.get(),
            "Comments split into chunks"
        );

        let mut stored = Vec::new();
        let mut failures = Vec::new();

        for chunk in &chunks {
            self.transition(PipelineState::ProcessingChunk(chunk.index));
            match self.process_chunk(chunk, store.as_mut()).await {
                Ok(entry) => stored.push(entry),
                Err(e) => {
                    self.transition(PipelineState::ChunkFailed(chunk.index));
                    failures.push(ChunkFailure {
                        index: chunk.index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.transition(PipelineState::Merging);
        let entries = match store.as_ref() {
            Some(store) => store.read_all().await.unwrap_or_else(|e| {
                warn!(error = %e, "Result store unreadable, merging results kept in memory");
                stored.clone()
            }),
            None => stored.clone(),
        };
        let report = merge_results(&entries);
        let report_path = match storage::write_report(&self.options.final_results_path, &report)
            .await
        {
            Ok(()) => Some(self.options.final_results_path.clone()),
            Err(e) => {
                error!(
                    path = %self.options.final_results_path.display(),
                    error = %e,
                    "Failed to write the final report"
                );
                None
            }
        };

        self.transition(PipelineState::Done);
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            comments: comments.len(),
            chunks: chunks.len(),
            stored: stored.len(),
            failures,
            report,
            report_path,
        };
        info!(
            chunks = summary.chunks,
            stored = summary.stored,
            failed = ?summary.failed_indexes(),
            insights = summary.report.total_insights(),
            "Analysis finished"
        );

        Ok(summary)
    }

    async fn process_chunk(
        &self,
        chunk: &Chunk<'_>,
        store: Option<&mut ResultStore>,
    ) -> Result<Value> {
        let task = chunk.task_number();

        let raw = self.invoke(chunk).await.inspect_err(|e| {
            error!(task, error = %e, "Agent invocation failed");
        })?;
        debug!(task, raw = %raw, "Task raw result");

        let parsed = parse_agent_output(&raw).inspect_err(|e| {
            error!(task, error = %e, raw = %raw, "Problematic result");
        })?;

        let Some(store) = store else {
            error!(task, "No result store available, task result lost");
            return Err(Error::custom("result store unavailable"));
        };
        store.append(&parsed).await.inspect_err(|e| {
            error!(task, error = %e, "Failed to append the result");
        })?;
        info!(task, stored = store.len(), "Task result stored");

        Ok(parsed)
    }

    /// The timeout covers the agent call only, not the wait for a rate slot.
    async fn invoke(&self, chunk: &Chunk<'_>) -> Result<String> {
        let text = chunk.to_prompt_text();
        self.limiter.acquire().await;
        let call = self.agent.invoke(&text, &self.prompt);

        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        }
    }
}
