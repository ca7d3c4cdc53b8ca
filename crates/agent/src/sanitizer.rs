//! Reply sanitization.
//!
//! Models served by the agent service sometimes think out loud inside
//! `<think>` / `<thinking>` tags and wrap answers in Markdown code fences.
//! Neither may reach the user. The removed reasoning is handed back so the
//! caller can log it for operators.

use regex_lite::Regex;
use std::sync::LazyLock;

static THINK_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>(.*?)</think>").expect("THINK_SPAN is a compile-time constant")
});

static THINKING_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<thinking>(.*?)</thinking>").expect("THINKING_SPAN is a compile-time constant")
});

/// A cleaned reply plus whatever reasoning was cut out of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sanitized {
    pub text: String,
    pub reasoning: Vec<String>,
}

/// Remove reasoning spans and code fences, then trim.
///
/// Runs to a fixpoint, so `sanitize(sanitize(x).text).text == sanitize(x).text`
/// even when removing one span exposes another. Unterminated tags are left
/// alone.
pub fn sanitize(text: &str) -> Sanitized {
    let mut reasoning = Vec::new();
    let mut current = text.to_string();

    loop {
        let next = clean_once(&current, &mut reasoning);
        if next == current {
            break;
        }
        current = next;
    }

    Sanitized {
        text: current,
        reasoning,
    }
}

/// Only strip reasoning spans, keeping fences and surrounding whitespace.
/// Used on the healer's working copy.
pub fn strip_reasoning(text: &str) -> String {
    let mut discarded = Vec::new();
    let mut current = text.to_string();
    loop {
        let next = remove_spans(&current, &mut discarded);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str, reasoning: &mut Vec<String>) -> String {
    let without_spans = remove_spans(text, reasoning);
    without_spans
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn remove_spans(text: &str, reasoning: &mut Vec<String>) -> String {
    let mut result = text.to_string();
    for pattern in [&*THINK_SPAN, &*THINKING_SPAN] {
        for caps in pattern.captures_iter(&result) {
            if let Some(inner) = caps.get(1) {
                let inner = inner.as_str().trim();
                if !inner.is_empty() {
                    reasoning.push(inner.to_string());
                }
            }
        }
        result = pattern.replace_all(&result, "").into_owned();
    }
    result
}
