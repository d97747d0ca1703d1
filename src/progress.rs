//! Progress events emitted while a job runs.
//!
//! Every job produces one totally ordered sequence:
//!
//! ```text
//! started, (processing, processing)*, saving, (complete | error)
//! ```
//!
//! Each source unit contributes a pair of `processing` events: the first as
//! soon as its image is ready (so a live UI can show the slide while the
//! narration request is still in flight), the second once the narration is
//! attached. A fatal error truncates the sequence; `error` is then the last
//! event.
//!
//! Events serialise to the JSON records a push channel (SSE, WebSocket)
//! forwards verbatim:
//!
//! ```json
//! {"status":"processing","current_slide":2,"total_slides":5,"message":"…","slide_image":"iVBOR…"}
//! ```

use serde::{Deserialize, Serialize};

/// One unit of the ordered status sequence reported to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    Started {
        total_slides: usize,
        message: String,
    },
    Processing {
        /// 1-based index of the unit being processed.
        current_slide: usize,
        total_slides: usize,
        message: String,
        /// Base64-encoded PNG preview; omitted when the unit has no visual.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slide_image: Option<String>,
    },
    Saving {
        total_slides: usize,
        message: String,
    },
    Complete {
        total_slides: usize,
        message: String,
        filename: String,
    },
    Error {
        message: String,
        error: String,
    },
}

impl ProgressEvent {
    /// The `status` tag as it appears on the wire.
    pub fn status(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => "started",
            ProgressEvent::Processing { .. } => "processing",
            ProgressEvent::Saving { .. } => "saving",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// `true` for `complete` and `error`, the only events that end a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Started { message, .. }
            | ProgressEvent::Processing { message, .. }
            | ProgressEvent::Saving { message, .. }
            | ProgressEvent::Complete { message, .. }
            | ProgressEvent::Error { message, .. } => message,
        }
    }
}
