//! Checker collaborators: prose in, findings out.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::diagnostic::{self, CheckResult, MAX_REPLACEMENTS, Severity};
use crate::error::CheckerError;
use crate::span::Span;

/// A grammar and style checker operating on plain text.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Checks `text` written in `language`, returning findings in checker order.
    async fn check(&self, text: &str, language: &str) -> Result<Vec<CheckResult>, CheckerError>;
}

/// Client for a LanguageTool HTTP server.
#[derive(Debug, Clone)]
pub struct LanguageToolChecker {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Match {
    message: String,
    #[serde(default)]
    short_message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
    context: Option<Context>,
    rule: Rule,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Replacement {
    value: String,
    short_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Context {
    text: String,
    offset: usize,
    length: usize,
}

#[derive(Debug, Deserialize)]
struct Rule {
    id: String,
    category: Category,
}

#[derive(Debug, Deserialize)]
struct Category {
    id: String,
}

impl LanguageToolChecker {
    /// Creates a client for the server at `endpoint`.
    pub fn new(endpoint: Url) -> Result<Self, CheckerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kousei/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn check_url(&self) -> String {
        format!("{}/v2/check", self.endpoint.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl Checker for LanguageToolChecker {
    async fn check(&self, text: &str, language: &str) -> Result<Vec<CheckResult>, CheckerError> {
        let url = self.check_url();
        debug!("Checking {} bytes at {}", text.len(), url);

        let response: CheckResponse = self
            .client
            .post(&url)
            .form(&[("text", text), ("language", language)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .matches
            .into_iter()
            .map(|m| to_check_result(m, text))
            .collect()
    }
}

fn to_check_result(m: Match, text: &str) -> Result<CheckResult, CheckerError> {
    let start = utf16_to_byte(text, m.offset);
    let end = utf16_to_byte(text, m.offset + m.length);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(CheckerError::unavailable(format!(
            "match at {}+{} does not fit the checked text",
            m.offset, m.length
        )));
    };

    let mut message = String::new();
    if !m.short_message.is_empty() {
        message.push_str(&m.short_message);
        message.push('\n');
    }
    message.push_str(&m.message);
    if let Some(context) = m.context.as_ref().and_then(mark_context) {
        message.push_str("\nContext: ");
        message.push_str(&context);
    }

    Ok(CheckResult {
        rule_id: m.rule.id.to_lowercase(),
        severity: Severity::from_category(&m.rule.category.id),
        category: m.rule.category.id,
        message,
        span: Span::new(start as u32, end as u32),
        matched: text[start..end].to_string(),
        replacements: m
            .replacements
            .into_iter()
            .take(MAX_REPLACEMENTS)
            .map(|r| diagnostic::Replacement {
                value: r.value,
                description: r.short_description,
            })
            .collect(),
    })
}

/// Surrounds the problem inside the context snippet with `>>>` and `<<<`.
fn mark_context(context: &Context) -> Option<String> {
    let text = &context.text;
    let start = utf16_to_byte(text, context.offset)?;
    let end = utf16_to_byte(text, context.offset + context.length)?;
    Some(format!(
        "{}>>>{}<<<{}",
        &text[..start],
        &text[start..end],
        &text[end..]
    ))
}

/// Converts a UTF-16 code unit offset into a byte offset.
///
/// Returns `None` when the offset is past the end or splits a surrogate pair.
fn utf16_to_byte(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units == offset {
            return Some(byte);
        }
        if units > offset {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == offset).then_some(text.len())
}
