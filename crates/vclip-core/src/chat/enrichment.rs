//! Enrichment controller (§4.11): picks an enrichment level and model for
//! a chat question, decides whether to invoke external fact-checking
//! search, and assembles the base generation prompt.

use std::sync::Arc;

use regex::Regex;
use vclip_llm::completion::{ChatRole, ChatTurn, CompletionRequest};
use vclip_llm::search::SearchAugmentedResponse;
use vclip_llm::{CompletionClient, SearchAugmentedClient};
use vclip_models::{ChatMessage, EnrichmentLevel, PlanTier};

use crate::error::ChatError;

const AUTO_TRIGGER_KEYWORDS: &[&str] = &[
    "verify", "true", "false", "current", "recent", "today", "source", "evidence", "compare", "statistics",
];

const COMPLEX_KEYWORDS: &[&str] = &["compare", "versus", "vs", "why", "how does", "explain the difference", "implications"];

fn critical_fact_check_patterns(person_names: &[String]) -> Vec<Regex> {
    let mut patterns = vec![
        Regex::new(r"\b(19|20)\d{2}\b").unwrap(),
        Regex::new(r"(?i)\brecently\b").unwrap(),
        Regex::new(r"(?i)\belected\b").unwrap(),
        Regex::new(r"(?i)\bdied\b").unwrap(),
        Regex::new(r"(?i)\barrested\b").unwrap(),
        Regex::new(r"(?i)\bprice\b").unwrap(),
        Regex::new(r"(?i)\branking\b").unwrap(),
        Regex::new(r"(?i)current (statistic|rate|price)").unwrap(),
    ];
    for name in person_names {
        if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b.*\b(said|claims?|announced|died|resigned)\b", regex::escape(name))) {
            patterns.push(re);
        }
    }
    patterns
}

fn is_critical(question: &str, person_names: &[String]) -> bool {
    critical_fact_check_patterns(person_names).iter().any(|p| p.is_match(question))
}

fn has_auto_trigger_keyword(question: &str) -> bool {
    let lower = question.to_lowercase();
    AUTO_TRIGGER_KEYWORDS.iter().any(|kw| lower.contains(kw)) || question.split_whitespace().count() > 15
}

fn is_complex(question: &str) -> bool {
    let lower = question.to_lowercase();
    COMPLEX_KEYWORDS.iter().any(|kw| lower.contains(kw)) || question.split_whitespace().count() > 20
}

pub fn enrichment_level_for(plan: PlanTier) -> EnrichmentLevel {
    match plan {
        PlanTier::Free => EnrichmentLevel::None,
        PlanTier::Student | PlanTier::Starter => EnrichmentLevel::Light,
        PlanTier::Pro => EnrichmentLevel::Full,
        PlanTier::Expert | PlanTier::Team | PlanTier::Unlimited => EnrichmentLevel::Deep,
    }
}

fn model_for(plan: PlanTier, question: &str, default_model: &str, premium_model: &str) -> String {
    if plan.at_least(PlanTier::Pro) && is_complex(question) {
        premium_model.to_string()
    } else {
        default_model.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichDecision {
    Enrich,
    /// Enrich, but at a temporarily elevated level for this turn only
    /// (e.g. a Starter-plan critical question gets Full parameters without
    /// permanently upgrading the plan's baseline level).
    EnrichWithLevel(EnrichmentLevel),
    DoNotEnrichWithDisclaimer,
    DoNotEnrich,
}

/// §4.11's decision table, evaluated top to bottom.
pub fn decide(
    plan: PlanTier,
    question: &str,
    user_requested_web_search: bool,
    level: EnrichmentLevel,
    person_names: &[String],
) -> EnrichDecision {
    let critical = is_critical(question, person_names);

    if user_requested_web_search && level != EnrichmentLevel::None {
        return EnrichDecision::Enrich;
    }
    if critical && matches!(plan, PlanTier::Pro | PlanTier::Expert | PlanTier::Unlimited) {
        return EnrichDecision::Enrich;
    }
    if critical && plan == PlanTier::Starter {
        return EnrichDecision::EnrichWithLevel(EnrichmentLevel::Full);
    }
    if critical && plan == PlanTier::Free {
        return EnrichDecision::DoNotEnrichWithDisclaimer;
    }
    if !critical
        && matches!(plan, PlanTier::Pro | PlanTier::Expert | PlanTier::Unlimited)
        && has_auto_trigger_keyword(question)
    {
        return EnrichDecision::Enrich;
    }
    EnrichDecision::DoNotEnrich
}

fn response_style(plan: PlanTier) -> &'static str {
    if plan.at_least(PlanTier::Pro) {
        "expert"
    } else if plan.at_least(PlanTier::Starter) {
        "standard"
    } else {
        "accessible"
    }
}

fn question_class(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    if lower.starts_with("is ") || lower.starts_with("does ") || lower.starts_with("did ") {
        "yes_no"
    } else if lower.contains("summar") {
        "summary"
    } else if is_complex(question) {
        "deep_analysis"
    } else if lower.starts_with("what") || lower.starts_with("when") || lower.starts_with("who") {
        "factual"
    } else {
        "generic"
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn transcript_budget(level: EnrichmentLevel) -> usize {
    match level {
        EnrichmentLevel::None | EnrichmentLevel::Light => 8_000,
        EnrichmentLevel::Full => 15_000,
        EnrichmentLevel::Deep => 25_000,
    }
}

const CANNED_PREAMBLES: &[&str] = &["Certainly! ", "Sure, ", "Great question! ", "Based on the video, "];
const CANNED_CLOSINGS: &[&str] = &[" Let me know if you have other questions!", " Hope that helps!"];

fn strip_canned_phrases(text: &str) -> String {
    let mut out = text.to_string();
    for phrase in CANNED_PREAMBLES {
        if out.starts_with(phrase) {
            out = out[phrase.len()..].to_string();
        }
    }
    for phrase in CANNED_CLOSINGS {
        if out.ends_with(phrase) {
            out.truncate(out.len() - phrase.len());
        }
    }
    out.trim().to_string()
}

fn build_prompt(
    video_title: &str,
    video_summary: &str,
    transcript: &str,
    history: &[ChatMessage],
    question: &str,
    plan: PlanTier,
    level: EnrichmentLevel,
) -> Vec<ChatTurn> {
    let style = response_style(plan);
    let class = question_class(question);
    let system = format!(
        "You are answering questions about the YouTube video \"{video_title}\". \
         Response style: {style}. Question type: {class}. \
         Use only the provided video content unless external sources are supplied. \
         Enrichment level: {level:?}.",
    );

    let mut messages = vec![ChatTurn { role: ChatRole::System, content: system }];
    messages.push(ChatTurn {
        role: ChatRole::System,
        content: format!("Video summary: {}", truncate_chars(video_summary, 4000)),
    });
    messages.push(ChatTurn {
        role: ChatRole::System,
        content: format!("Transcript: {}", truncate_chars(transcript, transcript_budget(level))),
    });

    for turn in history.iter().rev().take(6).rev() {
        let role = match turn.role {
            vclip_models::ChatRole::User => ChatRole::User,
            vclip_models::ChatRole::Assistant => ChatRole::Assistant,
        };
        messages.push(ChatTurn { role, content: turn.content.clone() });
    }

    messages.push(ChatTurn { role: ChatRole::User, content: question.to_string() });
    messages
}

fn disclaimer(plan: PlanTier) -> String {
    if plan == PlanTier::Free {
        "\n\nNote: this answer is based only on the video content. Upgrade to the Starter plan to enable web-search fact-checking for time-sensitive questions.".to_string()
    } else {
        "\n\nNote: this answer is based only on the video content. Enable web search for this question to fact-check time-sensitive claims.".to_string()
    }
}

pub struct EnrichmentOutput {
    pub response: String,
    pub web_search_used: bool,
    pub fact_checked: bool,
    pub sources: Vec<String>,
    pub enrichment_level: EnrichmentLevel,
}

pub struct EnrichmentRequest<'a> {
    pub question: &'a str,
    pub video_title: &'a str,
    pub video_summary: &'a str,
    pub transcript: &'a str,
    pub history: &'a [ChatMessage],
    pub user_plan: PlanTier,
    pub user_requested_web_search: bool,
    pub default_model: &'a str,
    pub premium_model: &'a str,
    pub fact_check_person_names: &'a [String],
}

pub async fn run(
    completion_client: &Arc<dyn CompletionClient>,
    search_client: Option<&Arc<dyn SearchAugmentedClient>>,
    request: EnrichmentRequest<'_>,
) -> Result<EnrichmentOutput, ChatError> {
    let level = enrichment_level_for(request.user_plan);
    let model = model_for(request.user_plan, request.question, request.default_model, request.premium_model);
    let decision = decide(
        request.user_plan,
        request.question,
        request.user_requested_web_search,
        level,
        request.fact_check_person_names,
    );

    // A temporary per-turn override takes the prompt's transcript budget
    // and source cap to that level without changing the plan's baseline.
    let effective_level = match decision {
        EnrichDecision::EnrichWithLevel(elevated) => elevated,
        _ => level,
    };

    let messages = build_prompt(
        request.video_title,
        request.video_summary,
        request.transcript,
        request.history,
        request.question,
        request.user_plan,
        effective_level,
    );

    let completion = completion_client
        .complete(CompletionRequest {
            messages,
            temperature: 0.2,
            model,
            fallback_models: Vec::new(),
            expect_json: false,
        })
        .await
        .map_err(|e| ChatError::LlmUnavailable(e.to_string()))?;

    let mut response = strip_canned_phrases(&completion);
    let mut web_search_used = false;
    let mut fact_checked = false;
    let mut sources = Vec::new();

    if matches!(decision, EnrichDecision::Enrich | EnrichDecision::EnrichWithLevel(_)) {
        if let Some(search_client) = search_client {
            let context = format!("{} {}", request.video_title, truncate_chars(request.video_summary, 1500));
            if let Ok(SearchAugmentedResponse { text, sources: found_sources }) =
                search_client.search_and_answer(request.question, &context).await
            {
                response = format!("{response}\n\n{text}");
                fact_checked = !found_sources.is_empty();
                sources = found_sources;
                web_search_used = true;
            }
        }
    } else if decision == EnrichDecision::DoNotEnrichWithDisclaimer {
        response.push_str(&disclaimer(request.user_plan));
    }

    Ok(EnrichmentOutput {
        response,
        web_search_used,
        fact_checked,
        sources,
        enrichment_level: effective_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_plan_never_gets_more_than_none_level() {
        assert_eq!(enrichment_level_for(PlanTier::Free), EnrichmentLevel::None);
    }

    #[test]
    fn critical_question_on_free_plan_gets_disclaimer() {
        let decision = decide(PlanTier::Free, "who was elected in 2024?", false, EnrichmentLevel::None, &[]);
        assert_eq!(decision, EnrichDecision::DoNotEnrichWithDisclaimer);
    }

    #[test]
    fn critical_question_on_pro_plan_enriches() {
        let decision = decide(PlanTier::Pro, "who was elected in 2024?", false, EnrichmentLevel::Full, &[]);
        assert_eq!(decision, EnrichDecision::Enrich);
    }

    #[test]
    fn critical_question_on_starter_plan_gets_temporarily_elevated_to_full() {
        let decision = decide(PlanTier::Starter, "who was elected in 2024?", false, EnrichmentLevel::Light, &[]);
        assert_eq!(decision, EnrichDecision::EnrichWithLevel(EnrichmentLevel::Full));
    }

    #[test]
    fn explicit_request_enriches_when_level_allows() {
        let decision = decide(PlanTier::Student, "what is this video about?", true, EnrichmentLevel::Light, &[]);
        assert_eq!(decision, EnrichDecision::Enrich);
    }

    #[test]
    fn non_critical_question_with_no_trigger_does_not_enrich() {
        let decision = decide(PlanTier::Pro, "what is this video about?", false, EnrichmentLevel::Full, &[]);
        assert_eq!(decision, EnrichDecision::DoNotEnrich);
    }

    #[test]
    fn strips_canned_preamble_and_closing() {
        let cleaned = strip_canned_phrases("Sure, here is the answer. Let me know if you have other questions!");
        assert_eq!(cleaned, "here is the answer.");
    }
}
