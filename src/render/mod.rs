//! Turns an API response into terminal output.
//!
//! Extraction never fails past this module: a response without
//! `choices[0].message.content` becomes a diagnostic plus a dump of the
//! payload.

pub mod markdown;

use crate::api::ResponseEnvelope;
use crossterm::style::Stylize;
use serde_json::Value;
use std::io::{self, Write};

/// How output should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// ANSI-styled Markdown for an interactive terminal of the given width.
    Terminal { width: u16 },
    /// Text exactly as received, for pipes and files.
    Plain,
}

impl OutputMode {
    /// Styled output when stdout is a terminal, plain otherwise.
    pub fn detect() -> Self {
        if atty::is(atty::Stream::Stdout) {
            let width = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80);
            OutputMode::Terminal { width }
        } else {
            OutputMode::Plain
        }
    }
}

/// What to show for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutput {
    /// The body exactly as received.
    Raw(String),
    /// The answer text, with the model that produced it when reported.
    Answer {
        model: Option<String>,
        content: String,
    },
    /// The envelope did not have the expected shape.
    Unexpected { reason: &'static str, payload: String },
}

/// Decide what to display for `envelope`.
pub fn render(envelope: &ResponseEnvelope, raw: bool) -> DisplayOutput {
    if raw {
        return DisplayOutput::Raw(envelope.raw().to_string());
    }

    let body = envelope.body();
    match extract_content(body) {
        Ok(content) => DisplayOutput::Answer {
            model: body.get("model").and_then(Value::as_str).map(str::to_string),
            content: content.to_string(),
        },
        Err(reason) => DisplayOutput::Unexpected {
            reason,
            payload: serde_json::to_string_pretty(body).unwrap_or_else(|_| envelope.raw().to_string()),
        },
    }
}

/// Read `choices[0].message.content`, or say which part is missing.
pub fn extract_content(body: &Value) -> Result<&str, &'static str> {
    let choices = body
        .get("choices")
        .and_then(Value::as_array)
        .ok_or("missing 'choices' array")?;
    let first = choices.first().ok_or("'choices' array is empty")?;
    first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or("missing 'choices[0].message.content'")
}

impl DisplayOutput {
    /// Why no answer could be shown, if so.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            DisplayOutput::Unexpected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Write the output. Answers go to `out`, diagnostics to `err`.
    pub fn write_to<W: Write, E: Write>(
        &self,
        out: &mut W,
        err: &mut E,
        mode: OutputMode,
    ) -> io::Result<()> {
        match self {
            DisplayOutput::Raw(raw) => writeln!(out, "{}", raw),
            DisplayOutput::Answer { model, content } => match mode {
                OutputMode::Terminal { width } => {
                    let model = model.as_deref().unwrap_or("unknown model");
                    writeln!(out, "{}", format!("Response from {}", model).bold().blue())?;
                    writeln!(out, "{}", "─".repeat(width as usize))?;
                    writeln!(out, "{}", markdown::render(content, width))
                }
                OutputMode::Plain => writeln!(out, "{}", content),
            },
            DisplayOutput::Unexpected { reason, payload } => {
                let headline = "Error parsing response from Perplexity API";
                match mode {
                    OutputMode::Terminal { .. } => writeln!(err, "{}", headline.bold().red())?,
                    OutputMode::Plain => writeln!(err, "{}", headline)?,
                }
                writeln!(err, "Unexpected response shape: {}", reason)?;
                writeln!(err, "{}", payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: &str) -> ResponseEnvelope {
        ResponseEnvelope::parse(raw.to_string()).unwrap()
    }

    /// Write `output` and return what landed on (stdout, stderr).
    fn written(output: &DisplayOutput, mode: OutputMode) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        output.write_to(&mut out, &mut err, mode).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    fn to_string(output: &DisplayOutput, mode: OutputMode) -> String {
        let (out, err) = written(output, mode);
        assert!(err.is_empty());
        out
    }

    const PARIS: &str = r#"{"choices":[{"message":{"content":"Paris"}}]}"#;

    #[test]
    fn test_render_answer() {
        let output = render(&envelope(PARIS), false);
        assert_eq!(
            output,
            DisplayOutput::Answer {
                model: None,
                content: "Paris".to_string()
            }
        );
        assert!(to_string(&output, OutputMode::Plain).contains("Paris"));
        assert!(to_string(&output, OutputMode::Terminal { width: 40 }).contains("Paris"));
    }

    #[test]
    fn test_render_raw_is_exact() {
        let output = render(&envelope(PARIS), true);
        assert_eq!(output, DisplayOutput::Raw(PARIS.to_string()));
        assert_eq!(to_string(&output, OutputMode::Plain), format!("{}\n", PARIS));
    }

    #[test]
    fn test_render_reports_model() {
        let raw = r#"{"model":"sonar","choices":[{"message":{"role":"assistant","content":"42"}}]}"#;
        let output = render(&envelope(raw), false);
        assert!(matches!(&output, DisplayOutput::Answer { model: Some(m), .. } if m == "sonar"));
        assert!(to_string(&output, OutputMode::Terminal { width: 20 }).contains("Response from sonar"));
        assert_eq!(to_string(&output, OutputMode::Plain), "42\n");
    }

    #[test]
    fn test_render_empty_object() {
        let output = render(&envelope("{}"), false);
        assert_eq!(output.failure_reason(), Some("missing 'choices' array"));
        let (out, err) = written(&output, OutputMode::Plain);
        assert!(out.is_empty());
        assert!(err.contains("Unexpected response shape"));
        assert!(err.contains("choices"));
        assert!(err.contains("{}"));
    }

    #[test]
    fn test_answer_has_no_failure_reason() {
        assert_eq!(render(&envelope(PARIS), false).failure_reason(), None);
        assert_eq!(render(&envelope("{}"), true).failure_reason(), None);
    }

    #[test]
    fn test_render_empty_choices() {
        let output = render(&envelope(r#"{"choices":[]}"#), false);
        assert!(matches!(output, DisplayOutput::Unexpected { reason, .. } if reason.contains("empty")));
    }

    #[test]
    fn test_extract_content_wrong_types() {
        let body = serde_json::json!({ "choices": [{ "message": { "content": 7 } }] });
        assert!(extract_content(&body).is_err());
        let body = serde_json::json!({ "choices": "nope" });
        assert!(extract_content(&body).is_err());
    }
}
