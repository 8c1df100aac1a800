//! Triple model, name canonicalization and relation-type normalization.

use serde::Deserialize;

/// Controlled vocabulary of entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Mission,
    Group,
    Mouse,
    Training,
    Diet,
    Habitat,
    Measurement,
    Tissue,
    Method,
    Outcome,
    Institution,
}

impl EntityType {
    /// Parse a type name exactly as emitted by the extraction prompt.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "Mission" => Some(Self::Mission),
            "Group" => Some(Self::Group),
            "Mouse" => Some(Self::Mouse),
            "Training" => Some(Self::Training),
            "Diet" => Some(Self::Diet),
            "Habitat" => Some(Self::Habitat),
            "Measurement" => Some(Self::Measurement),
            "Tissue" => Some(Self::Tissue),
            "Method" => Some(Self::Method),
            "Outcome" => Some(Self::Outcome),
            "Institution" => Some(Self::Institution),
            _ => None,
        }
    }

    /// Node label applied in the graph store.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mission => "Mission",
            Self::Group => "Group",
            Self::Mouse => "Mouse",
            Self::Training => "Training",
            Self::Diet => "Diet",
            Self::Habitat => "Habitat",
            Self::Measurement => "Measurement",
            Self::Tissue => "Tissue",
            Self::Method => "Method",
            Self::Outcome => "Outcome",
            Self::Institution => "Institution",
        }
    }
}

/// Relation types allowed in the graph, plus the generic fallback that
/// carries the original predicate as a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationType {
    HasGroup,
    Contains,
    Underwent,
    Fed,
    HousedIn,
    HasMeasurement,
    SampledFor,
    AnalyzedBy,
    ResultedIn,
    Conducted,
    RelatesTo { predicate: String },
}

impl RelationType {
    /// Relationship label in the graph store. Safe to interpolate into
    /// Cypher because every value comes from this closed enum.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HasGroup => "HAS_GROUP",
            Self::Contains => "CONTAINS",
            Self::Underwent => "UNDERWENT",
            Self::Fed => "FED",
            Self::HousedIn => "HOUSED_IN",
            Self::HasMeasurement => "HAS_MEASUREMENT",
            Self::SampledFor => "SAMPLED_FOR",
            Self::AnalyzedBy => "ANALYZED_BY",
            Self::ResultedIn => "RESULTED_IN",
            Self::Conducted => "CONDUCTED",
            Self::RelatesTo { .. } => "RELATES_TO",
        }
    }

    fn from_allowed(name: &str) -> Option<Self> {
        match name {
            "HAS_GROUP" => Some(Self::HasGroup),
            "CONTAINS" => Some(Self::Contains),
            "UNDERWENT" => Some(Self::Underwent),
            "FED" => Some(Self::Fed),
            "HOUSED_IN" => Some(Self::HousedIn),
            "HAS_MEASUREMENT" => Some(Self::HasMeasurement),
            "SAMPLED_FOR" => Some(Self::SampledFor),
            "ANALYZED_BY" => Some(Self::AnalyzedBy),
            "RESULTED_IN" => Some(Self::ResultedIn),
            "CONDUCTED" => Some(Self::Conducted),
            _ => None,
        }
    }
}

/// Per-triple provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleSource {
    pub doc_id: String,
    pub title: String,
    pub url: String,
}

/// A (subject, relation, object) fact extracted from a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    pub subject: String,
    pub subject_canonical: String,
    pub subject_type: String,
    pub rel_type: RelationType,
    pub object: String,
    pub object_canonical: String,
    pub object_type: String,
    pub confidence: f64,
    pub source: TripleSource,
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn canonicalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased canonical form, used for matching only (storage keys stay
/// raw).
pub fn canonical_key(name: &str) -> String {
    canonicalize_name(name).to_lowercase()
}

/// Uppercase the predicate, replace every character outside `A-Z_` with
/// an underscore, then collapse runs and trim the ends so punctuation
/// around an allow-listed name does not defeat the match.
fn normalize_predicate(predicate: &str) -> String {
    let mapped: String = predicate
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_uppercase() { c } else { '_' })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Resolve a relation type from the model's predicate and the
/// subject/object type pair. Allow-listed predicates win; otherwise the
/// type pair decides; otherwise the generic relation keeps the original
/// predicate.
pub fn normalize_rel_type(subject_type: &str, object_type: &str, predicate: &str) -> RelationType {
    let p = normalize_predicate(predicate);
    if let Some(rel) = RelationType::from_allowed(&p) {
        return rel;
    }

    use EntityType::*;
    let pair = (EntityType::parse(subject_type), EntityType::parse(object_type));
    match pair {
        (Some(Mission), Some(Group)) => RelationType::HasGroup,
        (Some(Group), Some(Mouse)) => RelationType::Contains,
        (Some(Mouse), Some(Training)) => RelationType::Underwent,
        (Some(Mouse), Some(Diet)) => RelationType::Fed,
        (Some(Mouse), Some(Habitat)) => RelationType::HousedIn,
        (Some(Mouse), Some(Measurement)) => RelationType::HasMeasurement,
        (Some(Mouse), Some(Tissue)) => RelationType::SampledFor,
        (Some(Tissue), Some(Method)) => RelationType::AnalyzedBy,
        (Some(Mouse), Some(Outcome)) => RelationType::ResultedIn,
        (Some(Institution), Some(Mission)) => RelationType::Conducted,
        _ => RelationType::RelatesTo { predicate: p },
    }
}

/// Raw extraction payload as returned by the LLM.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractionPayload {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractedEntity {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractedRelation {
    #[serde(default)]
    pub subject: String,
    #[serde(rename = "subjectType", default)]
    pub subject_type: String,
    #[serde(default)]
    pub predicate: String,
    #[serde(default)]
    pub object: String,
    #[serde(rename = "objectType", default)]
    pub object_type: String,
    pub confidence: Option<f64>,
}

/// Strip a leading/trailing Markdown code fence if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Confidence used when the model omits a numeric value.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Turn raw relations into normalized triples, dropping relations whose
/// subject or object is empty after canonicalization.
pub fn triples_from_relations(
    relations: Vec<ExtractedRelation>,
    source: &TripleSource,
) -> Vec<Triple> {
    relations
        .into_iter()
        .filter_map(|r| {
            let subject = canonicalize_name(&r.subject);
            let object = canonicalize_name(&r.object);
            if subject.is_empty() || object.is_empty() {
                return None;
            }

            let subject_type = r.subject_type.trim().to_string();
            let object_type = r.object_type.trim().to_string();
            let rel_type = normalize_rel_type(&subject_type, &object_type, &r.predicate);

            Some(Triple {
                subject_canonical: canonical_key(&subject),
                object_canonical: canonical_key(&object),
                subject,
                subject_type,
                rel_type,
                object,
                object_type,
                confidence: r.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                source: source.clone(),
            })
        })
        .collect()
}
