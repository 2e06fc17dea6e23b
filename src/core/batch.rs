use std::num::NonZeroUsize;

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// A batch of comments sent to the agent in a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub comments: &'a [String],
}

impl Chunk<'_> {
    /// One-based number used in log lines.
    pub fn task_number(&self) -> usize {
        self.index + 1
    }

    /// Render the chunk as a JSON array so the model sees exact comment boundaries.
    pub fn to_prompt_text(&self) -> String {
        serde_json::to_string(self.comments).unwrap_or_else(|_| self.comments.join("\n"))
    }
}

pub fn split_into_chunks(comments: &[String], chunk_size: NonZeroUsize) -> Vec<Chunk<'_>> {
    comments
        .chunks(chunk_size.get())
        .enumerate()
        .map(|(index, comments)| Chunk { index, comments })
        .collect()
}
