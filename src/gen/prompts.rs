/// Number of portrait variants produced per generation request.
pub const PROMPT_VARIANTS: usize = 4;

/// Fixed stylistic descriptors, one per output frame, in presentation
/// order. The wording is part of the bot's look and is not configurable.
pub const BASE_PROMPTS: [&str; PROMPT_VARIANTS] = [
    "soft smile, warm golden-hour light, shallow depth of field, editorial portrait",
    "confident gaze, studio softbox lighting, clean neutral backdrop, fashion portrait",
    "laughing, candid motion, natural daylight, lifestyle photography",
    "serene profile, window light, muted tones, fine-art portrait",
];

/// Expands optional free text into the four prompt variants. With text
/// present each variant becomes `"{text}, {base}"`; otherwise the bases
/// are returned untouched. Pure and order-preserving.
pub fn build_internal_prompts(user_text: Option<&str>) -> [String; PROMPT_VARIANTS] {
    BASE_PROMPTS.map(|base| match user_text {
        Some(text) if !text.trim().is_empty() => format!("{}, {base}", text.trim()),
        _ => base.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_text_returns_bases_unchanged_in_order() {
        let prompts = build_internal_prompts(None);
        assert_eq!(prompts.len(), PROMPT_VARIANTS);
        for (prompt, base) in prompts.iter().zip(BASE_PROMPTS) {
            assert_eq!(prompt, base);
        }
    }

    #[test]
    fn text_prefixes_every_variant() {
        let prompts = build_internal_prompts(Some("x"));
        for (prompt, base) in prompts.iter().zip(BASE_PROMPTS) {
            assert_eq!(prompt, &format!("x, {base}"));
        }
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let prompts = build_internal_prompts(Some("  зимний лес \n"));
        assert!(prompts.iter().all(|p| p.starts_with("зимний лес, ")));
    }

    #[test]
    fn blank_text_counts_as_absent() {
        assert_eq!(build_internal_prompts(Some("   ")), build_internal_prompts(None));
    }
}
