use vclip_models::Segment;

/// What a single extraction method produced, before it's wrapped into a
/// full `TranscriptResult` by the orchestrator.
pub struct MethodOutcome {
    pub segments: Vec<Segment>,
    pub language: String,
    pub is_auto_generated: bool,
}

/// Pick the best caption track for the preferred-language list: manual
/// tracks before auto-generated ones, first matching language before
/// falling back to whatever is first in the list.
pub fn select_track<'a, T>(
    tracks: &'a [T],
    preferred_languages: &[String],
    lang_of: impl Fn(&T) -> &str,
    is_manual: impl Fn(&T) -> bool,
) -> Option<&'a T> {
    if tracks.is_empty() {
        return None;
    }

    for lang in preferred_languages {
        if let Some(track) = tracks.iter().find(|t| lang_of(t) == lang && is_manual(t)) {
            return Some(track);
        }
    }
    for lang in preferred_languages {
        if let Some(track) = tracks.iter().find(|t| lang_of(t) == lang) {
            return Some(track);
        }
    }
    tracks.iter().find(|t| is_manual(t)).or_else(|| tracks.first())
}
