//! Live adapters for the `IntentClassifier` port.
//!
//! Two implementations: [`RuleClassifier`], a deterministic keyword matcher
//! that needs no network and ships as the default, and [`HttpClassifier`],
//! which asks the Anthropic messages API for a structured label. Both
//! produce the same [`Classification`] shape, so the engine cannot tell
//! them apart.

use std::collections::BTreeMap;
use std::env;
use std::fmt::Write as _;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::ports::classifier::{
    Classification, ClassifyFuture, ClassifyRequest, IntentClassifier, IntentLabel, SmallTalkKind,
};
use crate::registry::schema::first_number;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const AFFIRM_WORDS: &[&str] =
    &["yes", "y", "yeah", "yep", "sure", "ok", "okay", "confirm", "approve", "proceed", "go"];
const DENY_WORDS: &[&str] = &["no", "n", "nope", "cancel", "stop", "abort", "decline"];
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];
const FAREWELL_PHRASES: &[&str] = &["thank you", "thanks", "goodbye", "bye"];
const CHITCHAT_PHRASES: &[&str] = &["how are you", "you are a bot", "who are you"];
const OFF_TOPIC_PHRASES: &[&str] = &["capital of", "joke", "weather"];
const STOPWORDS: &[&str] = &["the", "a", "an", "to", "of", "for", "your", "with", "and", "from"];

/// Deterministic keyword classifier. No network, no model.
pub struct RuleClassifier;

impl RuleClassifier {
    fn label(request: &ClassifyRequest) -> Classification {
        let lowered = request.utterance.to_lowercase();
        let busy = request.digest.pending_task.is_some();

        // Mid-task, a short yes or no is an answer to our own question and
        // outranks every phrase override.
        if busy {
            if is_short_match(&lowered, DENY_WORDS) || lowered.trim() == "never mind" {
                return Classification::of(IntentLabel::Deny);
            }
            if is_short_match(&lowered, AFFIRM_WORDS) {
                return Classification::of(IntentLabel::Affirm);
            }
        }

        if let Some(id) = best_task(&lowered, request) {
            let mut classification = Classification::of(IntentLabel::Task { id });
            classification.entities = extract_entities(&request.utterance);
            return classification;
        }

        if !busy {
            if is_short_match(&lowered, DENY_WORDS) {
                return Classification::of(IntentLabel::Deny);
            }
            if is_short_match(&lowered, AFFIRM_WORDS) {
                return Classification::of(IntentLabel::Affirm);
            }
        }

        // Fallback refinements, mirroring what a would-be clarification
        // usually turns out to be.
        if FAREWELL_PHRASES.iter().any(|p| contains_phrase(&lowered, p)) {
            return Classification::of(IntentLabel::SmallTalk { kind: SmallTalkKind::Farewell });
        }
        if CHITCHAT_PHRASES.iter().any(|p| contains_phrase(&lowered, p)) {
            return Classification::of(IntentLabel::SmallTalk { kind: SmallTalkKind::Chitchat });
        }
        if OFF_TOPIC_PHRASES.iter().any(|p| contains_phrase(&lowered, p)) {
            return Classification::of(IntentLabel::SmallTalk { kind: SmallTalkKind::OffTopic });
        }
        if is_short_match(&lowered, GREETING_WORDS)
            || ["good morning", "good afternoon", "good evening"]
                .iter()
                .any(|p| lowered.contains(p))
        {
            return Classification::of(IntentLabel::SmallTalk { kind: SmallTalkKind::Greeting });
        }

        if request.digest.awaiting_field.is_some() {
            return Classification::of(IntentLabel::FieldInput);
        }
        Classification::of(IntentLabel::Unclear)
    }
}

impl IntentClassifier for RuleClassifier {
    fn classify(&self, request: &ClassifyRequest) -> ClassifyFuture<'_> {
        let classification = Self::label(request);
        Box::pin(async move { Ok(classification) })
    }
}

fn tokens(lowered: &str) -> impl Iterator<Item = &str> {
    lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

/// Single words match whole tokens only; multiword phrases match anywhere.
fn contains_phrase(lowered: &str, phrase: &str) -> bool {
    if phrase.contains(' ') {
        lowered.contains(phrase)
    } else {
        tokens(lowered).any(|t| t == phrase)
    }
}

/// A short utterance whose first token is in `words`. Three tokens at most,
/// so "ok, send 10 to anna" is not an affirmation.
fn is_short_match(lowered: &str, words: &[&str]) -> bool {
    let collected: Vec<&str> = tokens(lowered).collect();
    match collected.first() {
        Some(first) if collected.len() <= 3 => words.contains(first),
        _ => false,
    }
}

/// Best-scoring catalogue task, by overlap between utterance tokens and the
/// task's identifier and description words. Ties keep the first task in
/// catalogue order; a zero score matches nothing.
fn best_task(lowered: &str, request: &ClassifyRequest) -> Option<String> {
    let utterance_tokens: Vec<&str> = tokens(lowered).collect();
    let mut best: Option<(usize, &str)> = None;
    for outline in &request.catalogue {
        let description = outline.description.to_lowercase();
        let mut candidates: Vec<&str> = outline.id.split('_').collect();
        candidates.extend(
            tokens(&description).filter(|w| w.len() >= 4 && !STOPWORDS.contains(w)),
        );
        candidates.sort_unstable();
        candidates.dedup();

        let score =
            candidates.iter().filter(|w| utterance_tokens.contains(&w.to_lowercase().as_str())).count();
        if score > 0 && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, &outline.id));
        }
    }
    best.map(|(_, id)| id.to_string())
}

/// Pulls obvious entities out of free text: the first number becomes
/// `amount`, the word after "to" becomes `recipient`. Seeding validates
/// against the target schema, so a wrong guess is dropped there.
#[allow(clippy::cast_possible_truncation)]
fn extract_entities(utterance: &str) -> BTreeMap<String, String> {
    let mut entities = BTreeMap::new();
    if let Some(number) = first_number(utterance) {
        let rendered = if number.fract() == 0.0 && number.abs() < 1e15 {
            format!("{}", number as i64)
        } else {
            number.to_string()
        };
        entities.insert("amount".to_string(), rendered);
    }
    let words: Vec<&str> = utterance.split_whitespace().collect();
    for pair in words.windows(2) {
        if pair[0].eq_ignore_ascii_case("to") {
            let candidate = pair[1].trim_matches(|c: char| !c.is_alphanumeric());
            if !candidate.is_empty() && first_number(candidate).is_none() {
                entities.insert("recipient".to_string(), candidate.to_string());
                break;
            }
        }
    }
    entities
}

/// Classifier that asks the Anthropic messages API for a structured label.
pub struct HttpClassifier {
    client: Client,
    settings: LlmSettings,
}

impl HttpClassifier {
    /// Creates a classifier with the given model settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self { client: Client::new(), settings }
    }
}

/// Request body sent to the Anthropic messages API.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

/// A single message in the Anthropic API request.
#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Top-level response from the Anthropic messages API.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

/// A content block in the Anthropic response.
#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

/// Error response from the Anthropic API.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

/// Detail inside an Anthropic error response.
#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// The JSON object the model is instructed to reply with.
#[derive(Deserialize)]
struct WireIntent {
    label: String,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    entities: BTreeMap<String, String>,
}

fn build_prompt(request: &ClassifyRequest) -> String {
    let mut prompt = String::from(
        "You are the intent router for a task assistant. \
         Label the user's latest message.\n\nTasks you can start:\n",
    );
    for outline in &request.catalogue {
        let _ = writeln!(prompt, "- {}: {}", outline.id, outline.description);
    }
    let _ = writeln!(prompt, "\nConversation state:");
    match &request.digest.pending_task {
        Some(task) => {
            let _ = writeln!(prompt, "- pending task: {task}");
            if let Some(field) = &request.digest.awaiting_field {
                let _ = writeln!(prompt, "- awaiting field: {field}");
            }
            let _ = writeln!(
                prompt,
                "- awaiting confirmation: {}",
                if request.digest.confirming { "yes" } else { "no" }
            );
        }
        None => {
            let _ = writeln!(prompt, "- no task pending");
        }
    }
    if !request.digest.recent_turns.is_empty() {
        let _ = writeln!(prompt, "\nRecent turns:");
        for turn in &request.digest.recent_turns {
            let _ = writeln!(prompt, "{turn}");
        }
    }
    let _ = write!(
        prompt,
        "\nMessage: {:?}\n\n\
         Reply with only a JSON object, no prose:\n\
         {{\"label\": \"task|affirm|deny|field_input|small_talk|unclear\",\n\
         \x20\"task_id\": \"<task id when label is task>\",\n\
         \x20\"kind\": \"greeting|farewell|chitchat|off_topic\",\n\
         \x20\"entities\": {{\"<field>\": \"<value>\"}}}}",
        request.utterance
    );
    prompt
}

fn strip_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(body) = s.trim_end().strip_suffix("```") {
            s = body;
        }
    }
    s.trim()
}

/// Maps the model's JSON reply to a classification. Anything the wire
/// shape cannot express degrades to `Unclear` rather than failing the turn.
fn parse_reply(text: &str) -> Classification {
    let wire: WireIntent = match serde_json::from_str(strip_fences(text)) {
        Ok(wire) => wire,
        Err(error) => {
            tracing::warn!(%error, "unparseable classifier reply");
            return Classification::of(IntentLabel::Unclear);
        }
    };
    let label = match wire.label.as_str() {
        "task" => match wire.task_id {
            Some(id) => IntentLabel::Task { id },
            None => IntentLabel::Unclear,
        },
        "affirm" => IntentLabel::Affirm,
        "deny" => IntentLabel::Deny,
        "field_input" => IntentLabel::FieldInput,
        "small_talk" => IntentLabel::SmallTalk {
            kind: match wire.kind.as_deref() {
                Some("greeting") => SmallTalkKind::Greeting,
                Some("farewell") => SmallTalkKind::Farewell,
                Some("off_topic") => SmallTalkKind::OffTopic,
                _ => SmallTalkKind::Chitchat,
            },
        },
        other => {
            tracing::warn!(label = other, "unknown classifier label");
            IntentLabel::Unclear
        }
    };
    Classification { label, entities: wire.entities }
}

impl IntentClassifier for HttpClassifier {
    fn classify(&self, request: &ClassifyRequest) -> ClassifyFuture<'_> {
        let prompt = build_prompt(request);
        let api_url =
            self.settings.api_url.clone().unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
        let model = self.settings.model.clone();
        let max_tokens = self.settings.max_tokens;

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
                Box::<dyn std::error::Error + Send + Sync>::from(
                    "ANTHROPIC_API_KEY environment variable not set",
                )
            })?;

            let body = AnthropicRequest {
                model: &model,
                max_tokens,
                messages: vec![AnthropicMessage { role: "user", content: &prompt }],
            };

            let response = self
                .client
                .post(&api_url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("classifier request failed: {e}").into()
                })?;

            let status = response.status();
            let response_text =
                response.text().await.map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("failed to read classifier response: {e}").into()
                })?;

            if !status.is_success() {
                let msg = serde_json::from_str::<AnthropicError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(format!("classifier error ({}): {msg}", status.as_u16()).into());
            }

            let api_response: AnthropicResponse = serde_json::from_str(&response_text).map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("failed to parse classifier response: {e}").into()
                },
            )?;

            let text =
                api_response.content.into_iter().map(|block| block.text).collect::<String>();
            Ok(parse_reply(&text))
        })
    }
}
