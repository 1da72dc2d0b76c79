//! Content-advisory tags that campaigns and sessions can carry.

use serde::Serialize;

use crate::validate::ValidationError;

/// One catalogue entry.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TriggerWarning {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const CATALOGUE: &[TriggerWarning] = &[
    TriggerWarning {
        id: "violence",
        label: "Violence",
        description: "Combat scenes, injuries",
    },
    TriggerWarning {
        id: "graphic_violence",
        label: "Graphic violence",
        description: "Detailed descriptions of violence",
    },
    TriggerWarning {
        id: "sexual_content",
        label: "Sexual content",
        description: "Sexual references or scenes",
    },
    TriggerWarning {
        id: "nudity",
        label: "Nudity",
        description: "Descriptions of nudity",
    },
    TriggerWarning {
        id: "racism",
        label: "Racism",
        description: "Themes of racial discrimination",
    },
    TriggerWarning {
        id: "sexism",
        label: "Sexism",
        description: "Themes of sexist discrimination",
    },
    TriggerWarning {
        id: "homophobia",
        label: "Homophobia",
        description: "Themes of LGBT+ discrimination",
    },
    TriggerWarning {
        id: "transphobia",
        label: "Transphobia",
        description: "Themes of anti-trans discrimination",
    },
    TriggerWarning {
        id: "substance_abuse",
        label: "Drugs/alcohol",
        description: "Substance use",
    },
    TriggerWarning {
        id: "mental_health",
        label: "Mental health",
        description: "Themes of mental illness",
    },
    TriggerWarning {
        id: "child_harm",
        label: "Harm to children",
        description: "Children in danger",
    },
    TriggerWarning {
        id: "animal_harm",
        label: "Harm to animals",
        description: "Animals in danger",
    },
    TriggerWarning {
        id: "body_horror",
        label: "Body horror",
        description: "Bodily modification, mutilation",
    },
    TriggerWarning {
        id: "torture",
        label: "Torture",
        description: "Torture scenes",
    },
    TriggerWarning {
        id: "suicide",
        label: "Suicide",
        description: "Suicidal themes",
    },
    TriggerWarning {
        id: "domestic_abuse",
        label: "Domestic abuse",
        description: "Abuse within families",
    },
];

pub fn lookup(id: &str) -> Option<&'static TriggerWarning> {
    CATALOGUE.iter().find(|w| w.id == id)
}

/// Trim, lower-case, de-duplicate and sort a tag list. Unknown tags are
/// rejected, one error per offending tag.
pub fn normalize(tags: &[String]) -> Result<Vec<String>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut out: Vec<String> = Vec::with_capacity(tags.len());

    for raw in tags {
        let tag = raw.trim().to_ascii_lowercase();
        if tag.is_empty() {
            continue;
        }
        if lookup(&tag).is_none() {
            errors.push(ValidationError::UnknownTriggerWarning { tag });
            continue;
        }
        out.push(tag);
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    out.sort();
    out.dedup();
    Ok(out)
}
