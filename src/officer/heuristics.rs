use crate::artifact::ArtifactKind;
use crate::package::{ExpectedOutput, PackageKind};
use crate::target::{Target, TargetCategory};

/// Everything needed to open a draft package for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDraft {
    pub kind: PackageKind,
    pub summary: String,
    pub endpoints: Vec<String>,
    pub expected_outputs: Vec<ExpectedOutput>,
}

const MEDIA_KEYWORDS: &[&str] = &[
    "podcast",
    "interview",
    "radio",
    "video",
    "audio",
    "episode",
    "speech",
    "keynote",
    "webinar",
    "broadcast",
];

const DOCUMENT_KEYWORDS: &[&str] = &[
    "report",
    "filing",
    "paper",
    "document",
    "memo",
    "press",
    "article",
    "statement",
    "publication",
    "whitepaper",
];

/// Pure function from target attributes to a collection plan. No hidden
/// state: the same target always yields the same plan.
pub fn synthesize_plan(target: &Target) -> PlanDraft {
    let kind = choose_kind(target);
    let slug = slugify(&target.name);
    let query = query_string(&target.name);

    let mut endpoints = Vec::new();
    let mut expected_outputs = Vec::new();

    if matches!(kind, PackageKind::Media | PackageKind::Composite) {
        endpoints.push(format!(
            "https://archive.org/advancedsearch.php?q={}&mediatype=audio&output=json",
            query
        ));
        endpoints.push(format!("https://podcastindex.org/search?q={}", query));
        expected_outputs.push(ExpectedOutput::new(
            format!("{}/audio/{}-e001.mp3", slug, slug),
            ArtifactKind::Media,
        ));
        expected_outputs.push(ExpectedOutput::new(
            format!("{}/transcripts/{}-e001.vtt", slug, slug),
            ArtifactKind::Transcript,
        ));
    }
    if matches!(kind, PackageKind::Document | PackageKind::Composite) {
        endpoints.push(format!(
            "https://archive.org/advancedsearch.php?q={}&mediatype=texts&output=json",
            query
        ));
        endpoints.push(format!("https://scholar.archive.org/search?q={}", query));
        expected_outputs.push(ExpectedOutput::new(
            format!("{}/documents/{}-collection.pdf", slug, slug),
            ArtifactKind::Document,
        ));
        expected_outputs.push(ExpectedOutput::new(
            format!("{}/documents/{}-sources.txt", slug, slug),
            ArtifactKind::Document,
        ));
    }

    let summary = format!(
        "Collect {} evidence for {} target '{}': query the configured endpoints, \
         verify produced artifacts, and stage them for evidence ingestion.",
        kind, target.category, target.name
    );

    PlanDraft {
        kind,
        summary,
        endpoints,
        expected_outputs,
    }
}

/// Keyword match on the name wins; the category default covers the rest.
fn choose_kind(target: &Target) -> PackageKind {
    let lower = target.name.to_lowercase();
    let media = MEDIA_KEYWORDS.iter().any(|k| lower.contains(k));
    let document = DOCUMENT_KEYWORDS.iter().any(|k| lower.contains(k));

    match (media, document) {
        (true, true) => PackageKind::Composite,
        (true, false) => PackageKind::Media,
        (false, true) => PackageKind::Document,
        (false, false) => match target.category {
            TargetCategory::Event => PackageKind::Media,
            TargetCategory::Location | TargetCategory::Tech => PackageKind::Document,
            TargetCategory::Person | TargetCategory::Org | TargetCategory::Operation => {
                PackageKind::Composite
            }
        },
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { "target".to_string() } else { slug }
}

fn query_string(name: &str) -> String {
    slugify(name).replace('-', "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_podcast_name_yields_media() {
        let target = Target::new("t-001", "Northlight Podcast", TargetCategory::Org);
        let plan = synthesize_plan(&target);
        assert_eq!(plan.kind, PackageKind::Media);
        assert!(!plan.endpoints.is_empty());
        assert!(!plan.expected_outputs.is_empty());
    }

    #[test]
    fn test_report_name_yields_document() {
        let target = Target::new("t-002", "Annual report archive", TargetCategory::Org);
        let plan = synthesize_plan(&target);
        assert_eq!(plan.kind, PackageKind::Document);
    }

    #[test]
    fn test_mixed_keywords_yield_composite() {
        let target = Target::new("t-003", "Interview and filing trail", TargetCategory::Person);
        let plan = synthesize_plan(&target);
        assert_eq!(plan.kind, PackageKind::Composite);
        assert_eq!(plan.endpoints.len(), 4);
        assert_eq!(plan.expected_outputs.len(), 4);
    }

    #[test]
    fn test_category_defaults() {
        let event = Target::new("t-004", "Harbor summit", TargetCategory::Event);
        assert_eq!(synthesize_plan(&event).kind, PackageKind::Media);

        let tech = Target::new("t-005", "Meshnet protocol", TargetCategory::Tech);
        assert_eq!(synthesize_plan(&tech).kind, PackageKind::Document);

        let person = Target::new("t-006", "J. Halloway", TargetCategory::Person);
        assert_eq!(synthesize_plan(&person).kind, PackageKind::Composite);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let target = Target::new("t-001", "Northlight Podcast", TargetCategory::Org);
        assert_eq!(synthesize_plan(&target), synthesize_plan(&target));
    }

    #[test]
    fn test_endpoints_are_parseable_uris() {
        let target = Target::new("t-001", "Dr. Ana O'Neill & Partners", TargetCategory::Person);
        for endpoint in synthesize_plan(&target).endpoints {
            url::Url::parse(&endpoint).unwrap();
        }
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Dr. Ana O'Neill & Partners"), "dr-ana-o-neill-partners");
        assert_eq!(slugify("   "), "target");
    }
}
