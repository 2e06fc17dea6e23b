use crate::core::sanitize::sanitize_comment;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::{debug, info};

const COMMENT_THREADS_URL: &str = "https://www.googleapis.com/youtube/v3/commentThreads";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadsPage {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
}

impl CommentThreadsPage {
    fn into_comments(self) -> (Vec<String>, Option<String>) {
        let comments = self
            .items
            .into_iter()
            .map(|thread| sanitize_comment(&thread.snippet.top_level_comment.snippet.text_display))
            .collect();
        (comments, self.next_page_token.filter(|t| !t.is_empty()))
    }
}

/// Fetches the top-level comments of a video through the YouTube Data API.
#[derive(Clone)]
pub struct YouTubeCommentsClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeCommentsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Walk every page of comment threads and return the sanitized comments
    /// in API order.
    pub async fn fetch_comments(&self, video_id: &str) -> Result<Vec<String>> {
        let video_id = sanitize_video_id(video_id)?;
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = vec![
                ("part", "snippet"),
                ("videoId", video_id.as_str()),
                ("maxResults", PAGE_SIZE),
                ("textFormat", "plainText"),
                ("key", self.api_key.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self.http.get(COMMENT_THREADS_URL).query(&query).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::custom(format!(
                    "YouTube API failed with status {status}: {body}"
                )));
            }

            let page: CommentThreadsPage = response.json().await?;
            let (mut batch, next) = page.into_comments();
            pages += 1;
            debug!(page = pages, comments = batch.len(), "Fetched comment page");
            comments.append(&mut batch);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(video_id = %video_id, total = comments.len(), pages, "Comments retrieved");
        Ok(comments)
    }
}

pub fn extract_video_id(url: &str) -> Option<String> {
    // Extract video ID from various YouTube URL formats
    let raw_id = if let Some(v_param) = url.split("v=").nth(1) {
        v_param.split('&').next().unwrap_or(v_param)
    } else if let Some(youtu_be) = url.split("youtu.be/").nth(1) {
        youtu_be.split(['?', '/']).next().unwrap_or(youtu_be)
    } else if let Some(path) = url
        .split("/shorts/")
        .nth(1)
        .or_else(|| url.split("/embed/").nth(1))
    {
        path.split(['?', '/', '&']).next().unwrap_or(path)
    } else {
        url
    };

    sanitize_video_id(raw_id).ok()
}

const MAX_VIDEO_ID_LEN: usize = 128;

/// Ensure a video identifier is safe to put in an API query.
/// Only ASCII alphanumeric characters plus `_` and `-` are allowed.
pub fn sanitize_video_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(Error::custom("Video ID cannot be empty"));
    }

    if trimmed.len() > MAX_VIDEO_ID_LEN {
        return Err(Error::custom("Video ID is unexpectedly long"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::custom(
            "Video ID contains unsupported characters; expected only letters, numbers, '-' or '_'",
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_expected_characters() {
        let id = sanitize_video_id("abcDEF123-_x").expect("valid ID");
        assert_eq!(id, "abcDEF123-_x");
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_video_id("   ").is_err());
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(sanitize_video_id("abc/../../etc").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_VIDEO_ID_LEN + 1);
        assert!(sanitize_video_id(&long).is_err());
    }

    #[test]
    fn extracts_ids_from_common_url_shapes() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ?si=abc", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ?start=3", "dQw4w9WgXcQ"),
            ("dQw4w9WgXcQ", "dQw4w9WgXcQ"),
        ];
        for (url, expected) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(expected), "{url}");
        }
        assert_eq!(extract_video_id("https://example.com/not a video"), None);
    }

    #[test]
    fn page_yields_sanitized_comments_and_token() {
        let body = r#"{
            "nextPageToken": "QURTSl9p",
            "items": [
                {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "  Love   this\\n video "}}}},
                {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "Audio \"is\" quiet"}}}}
            ]
        }"#;

        let page: CommentThreadsPage = serde_json::from_str(body).unwrap();
        let (comments, next) = page.into_comments();

        assert_eq!(comments, vec!["Love this video", "Audio is quiet"]);
        assert_eq!(next.as_deref(), Some("QURTSl9p"));
    }

    #[test]
    fn last_page_has_no_token() {
        let page: CommentThreadsPage =
            serde_json::from_str(r#"{"items": [], "nextPageToken": ""}"#).unwrap();
        let (comments, next) = page.into_comments();
        assert!(comments.is_empty());
        assert!(next.is_none());
    }
}
