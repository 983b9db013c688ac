// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Message formatting: bounded line length and correlation tagging.
//!
//! Line-oriented sinks (syslog in particular, see RFC 3164 / RFC 5426)
//! reject or truncate long messages. A message is therefore split on
//! newlines and every line cut into chunks of at most
//! [`MAX_LINE_CHARS`] characters. When that yields more than one chunk,
//! every emitted line carries the same short correlation id so a reader
//! can regroup them:
//!
//! ```text
//! (Xk3p9Q) #0 GET /orders          <- prepend, if given
//! (Xk3p9Q) #1 <first 300 chars>
//! (Xk3p9Q) #2 <next chunk>
//! (Xk3p9Q) #3 took too long        <- append, if given
//! ```
//!
//! A message that fits on one line is rendered as
//! `[(id)] [prepend] message [append] [request context]`.

use super::context::{ContextProvider, NoContext, RequestContext};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Maximum characters per emitted line
pub const MAX_LINE_CHARS: usize = 300;

/// Length of generated correlation ids
pub const CORRELATION_ID_LEN: usize = 6;

/// Optional decorations for a single emit call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub prepend: Option<String>,
    pub append: Option<String>,
    pub duration: Option<Duration>,
    pub correlation_id: Option<String>,
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(mut self, text: impl Into<String>) -> Self {
        self.prepend = Some(text.into());
        self
    }

    pub fn append(mut self, text: impl Into<String>) -> Self {
        self.append = Some(text.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Turns raw messages into render-ready lines
pub struct MessageFormatter {
    max_line_chars: usize,
    context: Arc<dyn ContextProvider>,
}

impl MessageFormatter {
    pub fn new(context: Arc<dyn ContextProvider>) -> Self {
        Self {
            max_line_chars: MAX_LINE_CHARS,
            context,
        }
    }

    /// Override the chunk width (minimum 1)
    pub fn with_max_line_chars(mut self, max: usize) -> Self {
        self.max_line_chars = max.max(1);
        self
    }

    /// Format `raw` into zero or more lines
    ///
    /// A message that is empty after trimming yields no lines.
    pub fn format(&self, raw: &str, options: &EmitOptions) -> Vec<String> {
        let message = raw.trim();
        if message.is_empty() {
            return Vec::new();
        }

        let mut message = message.to_string();
        if let Some(duration) = options.duration {
            message.push_str(&format!(" (DURATION: {})", format_seconds(duration)));
        }

        let chunks: Vec<String> = message
            .lines()
            .flat_map(|line| split_chunks(line, self.max_line_chars))
            .collect();

        match chunks.len() {
            0 => Vec::new(),
            1 => {
                let context = self.context.current_context();
                vec![render_single(&chunks[0], options, context.as_ref())]
            }
            _ => render_batch(chunks, options),
        }
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(Arc::new(NoContext))
    }
}

fn render_single(message: &str, options: &EmitOptions, context: Option<&RequestContext>) -> String {
    let tag = options.correlation_id.as_deref().map(|id| format!("({})", id));
    let request = context.map(RequestContext::render);

    [
        tag.as_deref(),
        options.prepend.as_deref(),
        Some(message),
        options.append.as_deref(),
        request.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn render_batch(chunks: Vec<String>, options: &EmitOptions) -> Vec<String> {
    let id = options
        .correlation_id
        .clone()
        .unwrap_or_else(correlation_id);
    let trailing_seq = chunks.len() + 1;
    let mut lines = Vec::with_capacity(chunks.len() + 2);

    if let Some(prepend) = options.prepend.as_deref() {
        lines.push(format!("({}) #0 {}", id, prepend));
    }
    for (idx, chunk) in chunks.iter().enumerate() {
        lines.push(format!("({}) #{} {}", id, idx + 1, chunk));
    }
    if let Some(append) = options.append.as_deref() {
        lines.push(format!("({}) #{} {}", id, trailing_seq, append));
    }

    lines
}

/// Split `line` into chunks of at most `width` characters
///
/// Empty lines produce no chunks. Splits on character boundaries, never
/// inside a multi-byte character.
pub fn split_chunks(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Fresh random correlation id of ASCII letters and digits
pub fn correlation_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CORRELATION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Human friendly duration: `12.500ms`, `3.250s` or `1h 02m 05s`
pub fn format_seconds(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let total = secs.round() as u64;
        return format!(
            "{}h {:02}m {:02}s",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        );
    }
    if secs >= 1.0 {
        return format!("{:.3}s", secs);
    }
    format!("{:.3}ms", secs * 1000.0)
}
