//! Query reformulator (§4.10): one LLM call producing up to 5 academic-
//! leaning query variants, with a heuristic fallback when the LLM is
//! unavailable or its output doesn't parse.

use std::sync::Arc;

use vclip_llm::completion::{parse_json_value, ChatRole, ChatTurn, CompletionRequest};
use vclip_llm::CompletionClient;

const SYSTEM_PROMPT: &str = "You help find high-quality educational videos. Given a search query, \
produce up to 5 alternative search queries that favor academic, documentary, and expert-interview \
language, and avoid sensational or clickbait phrasing. Respond with strict JSON: {\"queries\": [\"...\"]}.";

const TRANSLATIONS: &[(&str, &str, &str)] = &[
    ("fr", "en", "intelligence artificielle", "artificial intelligence"),
    ("en", "fr", "artificial intelligence", "intelligence artificielle"),
    ("fr", "en", "climat", "climate"),
    ("en", "fr", "climate", "climat"),
];

fn academic_suffixes(language: &str) -> &'static [&'static str] {
    match language {
        "fr" => &["analyse", "documentaire", "conférence", "expert"],
        "de" => &["analyse", "dokumentation", "vortrag"],
        "es" => &["análisis", "documental", "conferencia"],
        _ => &["analysis", "documentary", "lecture", "expert interview"],
    }
}

fn cross_language_hint(language: &str) -> Option<&'static str> {
    match language {
        "fr" => Some("english"),
        "en" => Some("français"),
        _ => None,
    }
}

/// Heuristic fallback used when the LLM is unavailable or returns
/// unparseable JSON: the bare query, plus its first two language-specific
/// academic suffixes, plus a cross-language hint for fr/en.
pub fn heuristic_reformulations(query: &str, language: &str) -> Vec<String> {
    let mut queries = vec![query.to_string()];
    for suffix in academic_suffixes(language).iter().take(2) {
        queries.push(format!("{query} {suffix}"));
    }
    if let Some(hint) = cross_language_hint(language) {
        queries.push(format!("{query} {hint}"));
    }
    queries
}

pub async fn reformulate(
    completion_client: Option<&Arc<dyn CompletionClient>>,
    query: &str,
    language: &str,
    model: &str,
) -> Vec<String> {
    let Some(client) = completion_client else {
        return heuristic_reformulations(query, language);
    };

    let request = CompletionRequest {
        messages: vec![
            ChatTurn { role: ChatRole::System, content: SYSTEM_PROMPT.to_string() },
            ChatTurn { role: ChatRole::User, content: format!("Query: {query}\nLanguage: {language}") },
        ],
        temperature: 0.3,
        model: model.to_string(),
        fallback_models: Vec::new(),
        expect_json: true,
    };

    match client.complete(request).await {
        Ok(text) => match parse_json_value(&text) {
            Ok(value) => {
                let queries: Vec<String> = value
                    .get("queries")
                    .and_then(|q| q.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).take(5).collect())
                    .unwrap_or_default();
                if queries.is_empty() {
                    heuristic_reformulations(query, language)
                } else {
                    queries
                }
            }
            Err(_) => heuristic_reformulations(query, language),
        },
        Err(_) => heuristic_reformulations(query, language),
    }
}

/// Translate `text` from `from` to `to`: consult the static table first,
/// only invoking the LLM on a miss.
pub async fn translate_query(
    completion_client: Option<&Arc<dyn CompletionClient>>,
    text: &str,
    from: &str,
    to: &str,
    model: &str,
) -> String {
    let lower = text.to_lowercase();
    for (src, dst, src_term, dst_term) in TRANSLATIONS {
        if *src == from && *dst == to && lower == *src_term {
            return dst_term.to_string();
        }
    }

    let Some(client) = completion_client else {
        return text.to_string();
    };

    let request = CompletionRequest {
        messages: vec![
            ChatTurn {
                role: ChatRole::System,
                content: format!("Translate the user's search query from {from} to {to}. Reply with only the translated query."),
            },
            ChatTurn { role: ChatRole::User, content: text.to_string() },
        ],
        temperature: 0.0,
        model: model.to_string(),
        fallback_models: Vec::new(),
        expect_json: false,
    };

    client.complete(request).await.unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_keeps_bare_query_then_two_suffixes_then_cross_language_hint() {
        let variants = heuristic_reformulations("vaccines", "en");
        assert_eq!(variants.len(), 4);
        assert_eq!(variants[0], "vaccines");
        assert_eq!(variants[1], "vaccines analysis");
        assert_eq!(variants[2], "vaccines documentary");
        assert!(variants[3].contains("français"));
    }

    #[tokio::test]
    async fn translate_uses_static_table_without_a_client() {
        let translated = translate_query(None, "climate", "en", "fr", "gpt").await;
        assert_eq!(translated, "climat");
    }
}
