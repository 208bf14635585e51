//! `GO` batch separation

/// A `GO`-delimited slice of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub content: &'a str,
    /// 1-based line where the batch starts
    pub start_line: usize,
    /// Count of the `GO <count>` line ending the batch; 1 for a bare `GO`
    pub repeat: u32,
}

/// Repeat count of a batch separator line: `GO`, `GO;` or `GO <count>` on its
/// own line. `None` when the line is not a separator.
pub fn separator_repeat(line: &str) -> Option<u32> {
    let trimmed = line.trim().trim_end_matches(';').trim_end();
    let head = trimmed.get(..2)?;
    if !head.eq_ignore_ascii_case("go") {
        return None;
    }
    let rest = &trimmed[2..];
    if rest.is_empty() {
        return Some(1);
    }
    let count = rest.trim();
    if rest.starts_with(char::is_whitespace) && count.chars().all(|c| c.is_ascii_digit()) {
        return Some(count.parse().unwrap_or(1));
    }
    None
}

/// Split SQL content into batches by GO lines, tracking line numbers.
///
/// Batches that hold only whitespace are dropped.
pub fn split_batches(content: &str) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1;
    let mut batch_start_line = 1;

    for line in content.lines() {
        let line_end = current_pos + line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end
        };

        if let Some(repeat) = separator_repeat(line) {
            let batch = &content[batch_start..current_pos];
            if !batch.trim().is_empty() {
                batches.push(Batch {
                    content: batch,
                    start_line: batch_start_line,
                    repeat,
                });
            }
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }

        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() && !content[batch_start..].trim().is_empty() {
        batches.push(Batch {
            content: &content[batch_start..],
            start_line: batch_start_line,
            repeat: 1,
        });
    }

    batches
}

/// An owned batch that remembers how often its `GO` repeats it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBatch {
    pub text: String,
    pub repeat: u32,
}

impl ScriptBatch {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            repeat: 1,
        }
    }
}

impl From<Batch<'_>> for ScriptBatch {
    fn from(batch: Batch<'_>) -> Self {
        Self {
            text: batch.content.trim().to_string(),
            repeat: batch.repeat,
        }
    }
}

/// Something [`join_batches`] can write out.
pub trait BatchText {
    fn text(&self) -> &str;

    fn repeat(&self) -> u32 {
        1
    }
}

impl BatchText for &str {
    fn text(&self) -> &str {
        self
    }
}

impl BatchText for String {
    fn text(&self) -> &str {
        self
    }
}

impl BatchText for ScriptBatch {
    fn text(&self) -> &str {
        &self.text
    }

    fn repeat(&self) -> u32 {
        self.repeat
    }
}

/// Join batches into a script, each batch trimmed and followed by its `GO`
/// line (`GO <count>` when the batch repeats).
pub fn join_batches<B: BatchText>(batches: &[B]) -> String {
    let mut script = String::new();
    for batch in batches {
        let text = batch.text().trim();
        if text.is_empty() {
            continue;
        }
        script.push_str(text);
        match batch.repeat() {
            1 => script.push_str("\nGO\n\n"),
            count => {
                script.push_str("\nGO ");
                script.push_str(&count.to_string());
                script.push_str("\n\n");
            }
        }
    }
    script
}
