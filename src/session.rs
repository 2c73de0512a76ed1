use std::path::PathBuf;

use crate::gen::prompts::{build_internal_prompts, PROMPT_VARIANTS};
use crate::store::records::{UserRecord, MAX_REFS};

/// Where a user currently sits in the reference-collection cycle.
///
/// `Collecting` covers both first contact (no refs yet) and an explicit
/// re-upload; `Ready` means at least one reference exists and the user
/// is not mid-upload. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Ready,
}

pub fn phase(record: &UserRecord) -> Phase {
    if !record.refs.is_empty() && !record.awaiting_refs {
        Phase::Ready
    } else {
        Phase::Collecting
    }
}

/// What an inbound photo means for this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRole {
    Reference,
    Style,
}

pub fn classify_photo(record: &UserRecord) -> PhotoRole {
    if record.awaiting_refs || record.refs.len() < MAX_REFS {
        PhotoRole::Reference
    } else {
        PhotoRole::Style
    }
}

/// Result of appending a stored reference path to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub total: usize,
    pub remaining: usize,
    /// Oldest path rotated out when a reference arrives at the cap
    /// during an explicit re-upload. The caller deletes it best-effort.
    pub displaced: Option<String>,
}

/// Appends `path` as the newest reference. At the cap the oldest
/// reference is rotated out rather than rejected, so a re-upload can
/// replace photos one by one. Recomputes `awaiting_refs`.
pub fn push_ref(record: &mut UserRecord, path: String) -> RefUpdate {
    record.refs.push(path);
    let displaced = if record.refs.len() > MAX_REFS {
        Some(record.refs.remove(0))
    } else {
        None
    };
    record.awaiting_refs = record.refs.len() < MAX_REFS;
    RefUpdate {
        total: record.refs.len(),
        remaining: MAX_REFS - record.refs.len(),
        displaced,
    }
}

/// Re-enters the collecting phase, even when all slots are filled.
pub fn begin_upload(record: &mut UserRecord) {
    record.awaiting_refs = true;
}

/// Empties the reference list and hands back the old paths so the
/// caller can delete the files.
pub fn take_refs(record: &mut UserRecord) -> Vec<String> {
    record.awaiting_refs = false;
    std::mem::take(&mut record.refs)
}

/// Per-user scratch that never reaches the record document: the latest
/// free-text fragment and the latest style-image path. Cleared after a
/// successful generation.
#[derive(Debug, Clone, Default)]
pub struct SessionScratch {
    pub prompt_text: Option<String>,
    pub style_path: Option<PathBuf>,
}

/// Everything the generation collaborator needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub ref_paths: Vec<String>,
    pub style_path: Option<PathBuf>,
    pub prompts: [String; PROMPT_VARIANTS],
}

/// Assembles a generation request, or `None` when the record has no
/// references yet. Reads only; nothing is mutated until the collaborator
/// succeeds.
pub fn plan_generation(record: &UserRecord, scratch: &SessionScratch) -> Option<GenerationPlan> {
    if record.refs.is_empty() {
        return None;
    }
    Some(GenerationPlan {
        ref_paths: record.refs.clone(),
        style_path: scratch.style_path.clone(),
        prompts: build_internal_prompts(scratch.prompt_text.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::prompts::BASE_PROMPTS;

    fn accept(record: &mut UserRecord, name: &str) -> RefUpdate {
        assert_eq!(classify_photo(record), PhotoRole::Reference);
        push_ref(record, name.to_string())
    }

    #[test]
    fn first_contact_starts_collecting() {
        let record = UserRecord::default();
        assert_eq!(phase(&record), Phase::Collecting);
        assert_eq!(classify_photo(&record), PhotoRole::Reference);
    }

    #[test]
    fn awaiting_tracks_ref_count_up_to_the_cap() {
        let mut record = UserRecord::default();

        for (index, name) in ["a.jpg", "b.jpg"].iter().enumerate() {
            let update = accept(&mut record, name);
            assert_eq!(update.total, index + 1);
            assert_eq!(update.displaced, None);
            assert!(record.awaiting_refs);
            assert_eq!(phase(&record), Phase::Collecting);
        }

        let update = accept(&mut record, "c.jpg");
        assert_eq!(update.total, 3);
        assert_eq!(update.remaining, 0);
        assert!(!record.awaiting_refs);
        assert_eq!(phase(&record), Phase::Ready);
    }

    #[test]
    fn photo_at_cap_without_upload_intent_is_a_style_image() {
        let mut record = UserRecord::default();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            accept(&mut record, name);
        }

        assert_eq!(classify_photo(&record), PhotoRole::Style);
        assert_eq!(record.refs.len(), 3);
    }

    #[test]
    fn upload_at_cap_rotates_out_the_oldest_reference() {
        let mut record = UserRecord::default();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            accept(&mut record, name);
        }

        begin_upload(&mut record);
        assert_eq!(phase(&record), Phase::Collecting);
        assert_eq!(classify_photo(&record), PhotoRole::Reference);

        let update = push_ref(&mut record, "d.jpg".to_string());
        assert_eq!(update.total, 3);
        assert_eq!(update.displaced.as_deref(), Some("a.jpg"));
        assert_eq!(record.refs, vec!["b.jpg", "c.jpg", "d.jpg"]);
        assert!(!record.awaiting_refs);
    }

    #[test]
    fn clear_returns_all_paths_and_resets_the_record() {
        let mut record = UserRecord::default();
        for name in ["a.jpg", "b.jpg"] {
            accept(&mut record, name);
        }

        let removed = take_refs(&mut record);
        assert_eq!(removed, vec!["a.jpg", "b.jpg"]);
        assert!(record.refs.is_empty());
        assert!(!record.awaiting_refs);
        assert_eq!(phase(&record), Phase::Collecting);
    }

    #[test]
    fn planning_without_references_yields_nothing() {
        let record = UserRecord::default();
        let before = record.clone();
        assert!(plan_generation(&record, &SessionScratch::default()).is_none());
        assert_eq!(record, before);
    }

    #[test]
    fn full_collection_plans_with_base_prompts_and_all_refs() {
        let mut record = UserRecord::default();
        accept(&mut record, "a.jpg");
        accept(&mut record, "b.jpg");
        assert_eq!(record.refs.len(), 2);
        assert!(record.awaiting_refs);

        accept(&mut record, "c.jpg");
        assert_eq!(record.refs.len(), 3);
        assert!(!record.awaiting_refs);

        let plan =
            plan_generation(&record, &SessionScratch::default()).expect("plan");
        assert_eq!(plan.ref_paths, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(plan.style_path, None);
        for (prompt, base) in plan.prompts.iter().zip(BASE_PROMPTS) {
            assert_eq!(prompt, base);
        }
    }

    #[test]
    fn plan_carries_scratch_text_and_style_path() {
        let mut record = UserRecord::default();
        accept(&mut record, "a.jpg");

        let scratch = SessionScratch {
            prompt_text: Some("в осеннем парке".to_string()),
            style_path: Some(PathBuf::from("style.jpg")),
        };
        let plan = plan_generation(&record, &scratch).expect("plan");
        assert_eq!(plan.style_path.as_deref(), Some(std::path::Path::new("style.jpg")));
        assert!(plan
            .prompts
            .iter()
            .all(|prompt| prompt.starts_with("в осеннем парке, ")));
    }
}
