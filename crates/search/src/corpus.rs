//! Corpus normalization
//!
//! Turns raw policy records into `CorpusEntry` values with a canonical text
//! block and a stable identifier. Raw records are validated first; records
//! missing a required field are skipped with a warning, never fatal.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

/// Boolean tag columns of the policy schema, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTag {
    RenewableEnergy,
    CarbonPricing,
    PlasticReduction,
    EmissionsReduction,
    ElectricVehicles,
    Conservation,
    CircularEconomy,
    CleanAir,
    WaterQuality,
    BiodiversityProtection,
    FossilFuelPhaseOut,
    EnergyEfficiency,
    SustainableAgriculture,
    GreenBuilding,
    WasteManagement,
}

impl PolicyTag {
    pub const ALL: [PolicyTag; 15] = [
        PolicyTag::RenewableEnergy,
        PolicyTag::CarbonPricing,
        PolicyTag::PlasticReduction,
        PolicyTag::EmissionsReduction,
        PolicyTag::ElectricVehicles,
        PolicyTag::Conservation,
        PolicyTag::CircularEconomy,
        PolicyTag::CleanAir,
        PolicyTag::WaterQuality,
        PolicyTag::BiodiversityProtection,
        PolicyTag::FossilFuelPhaseOut,
        PolicyTag::EnergyEfficiency,
        PolicyTag::SustainableAgriculture,
        PolicyTag::GreenBuilding,
        PolicyTag::WasteManagement,
    ];

    /// Column name in the raw record
    pub fn field_name(&self) -> &'static str {
        match self {
            PolicyTag::RenewableEnergy => "renewable_energy",
            PolicyTag::CarbonPricing => "carbon_pricing",
            PolicyTag::PlasticReduction => "plastic_reduction",
            PolicyTag::EmissionsReduction => "emissions_reduction",
            PolicyTag::ElectricVehicles => "electric_vehicles",
            PolicyTag::Conservation => "conservation",
            PolicyTag::CircularEconomy => "circular_economy",
            PolicyTag::CleanAir => "clean_air",
            PolicyTag::WaterQuality => "water_quality",
            PolicyTag::BiodiversityProtection => "biodiversity_protection",
            PolicyTag::FossilFuelPhaseOut => "fossil_fuel_phase_out",
            PolicyTag::EnergyEfficiency => "energy_efficiency",
            PolicyTag::SustainableAgriculture => "sustainable_agriculture",
            PolicyTag::GreenBuilding => "green_building",
            PolicyTag::WasteManagement => "waste_management",
        }
    }
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Tag value marking a tag as active. Compared case-sensitively.
pub const ACTIVE_TAG_VALUE: &str = "Yes";

/// A policy record as delivered by the corpus source.
///
/// Scalars may be JSON strings or numbers; blank strings count as missing.
/// Every column not named here lands in `columns`, where tags are looked up.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RawPolicyRecord {
    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub country: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub year: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub category: Option<String>,

    #[serde(default, rename = "type", deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub policy_type: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    #[validate(required)]
    pub effectiveness: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    pub official_url: Option<String>,

    #[serde(flatten)]
    pub columns: HashMap<String, Value>,
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text))
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RawPolicyRecord {
    /// Set a tag column to the active sentinel
    pub fn with_tag(mut self, tag: PolicyTag) -> Self {
        self.columns
            .insert(tag.field_name().to_string(), Value::String(ACTIVE_TAG_VALUE.to_string()));
        self
    }

    fn is_active(&self, tag: PolicyTag) -> bool {
        matches!(self.columns.get(tag.field_name()), Some(Value::String(v)) if v == ACTIVE_TAG_VALUE)
    }
}

/// Why a raw record was not admitted to the corpus
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("duplicate identifier `{0}`")]
    DuplicateId(String),
}

/// A validated policy record with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub id: String,
    pub title: String,
    pub country: String,
    pub year: String,
    pub category: String,
    pub policy_type: String,
    pub summary: String,
    pub effectiveness: String,
    pub region: Option<String>,
    pub official_url: Option<String>,
    /// Active tags in schema order
    pub tags: Vec<PolicyTag>,
}

impl TryFrom<RawPolicyRecord> for PolicyRecord {
    type Error = RecordError;

    fn try_from(raw: RawPolicyRecord) -> Result<Self, Self::Error> {
        if let Err(errors) = raw.validate() {
            let mut missing: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| match field.as_ref() {
                    "policy_type" => "type".to_string(),
                    other => other.to_string(),
                })
                .collect();
            missing.sort();
            return Err(RecordError::MissingFields(missing));
        }

        let tags = PolicyTag::ALL
            .into_iter()
            .filter(|tag| raw.is_active(*tag))
            .collect();

        let RawPolicyRecord {
            id: Some(id),
            title: Some(title),
            country: Some(country),
            year: Some(year),
            category: Some(category),
            policy_type: Some(policy_type),
            summary: Some(summary),
            effectiveness: Some(effectiveness),
            region,
            official_url,
            ..
        } = raw
        else {
            // validate() guarantees every required field is present
            return Err(RecordError::MissingFields(Vec::new()));
        };

        Ok(PolicyRecord {
            id,
            title,
            country,
            year,
            category,
            policy_type,
            summary,
            effectiveness,
            region,
            official_url,
            tags,
        })
    }
}

impl PolicyRecord {
    /// Canonical text block. Field order is fixed so embeddings stay stable
    /// across rebuilds of unchanged data.
    pub fn canonical_text(&self) -> String {
        let location = match &self.region {
            Some(region) => format!("{}, {}", region, self.country),
            None => self.country.clone(),
        };

        let mut lines = vec![
            format!("policy title: {}", self.title),
            format!("location: {} ({})", location, self.year),
            format!("category: {} | type: {}", self.category, self.policy_type),
            format!("summary: {}", self.summary),
        ];

        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(PolicyTag::field_name).collect();
            lines.push(format!("tags: {}", tags.join(", ")));
        }

        lines.push(format!("effectiveness score: {}/100", self.effectiveness));
        lines.join("\n")
    }

    pub fn into_entry(self) -> CorpusEntry {
        let text = self.canonical_text();

        let mut metadata = BTreeMap::new();
        metadata.insert("id".to_string(), self.id.clone());
        metadata.insert("title".to_string(), self.title);
        metadata.insert("country".to_string(), self.country);
        if let Some(url) = self.official_url {
            metadata.insert("official_url".to_string(), url);
        }

        CorpusEntry {
            id: self.id,
            text,
            metadata,
        }
    }
}

/// One retrievable unit of the corpus. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of normalizing a whole corpus
#[derive(Debug, Default)]
pub struct NormalizedCorpus {
    /// Valid entries in corpus order
    pub entries: Vec<CorpusEntry>,
    /// (position in input, error) for every skipped record
    pub skipped: Vec<(usize, RecordError)>,
}

/// Normalize every record, skipping invalid ones and later duplicates of an id.
pub fn normalize_corpus(records: Vec<RawPolicyRecord>) -> NormalizedCorpus {
    let total = records.len();
    let mut seen = HashSet::new();
    let mut corpus = NormalizedCorpus::default();

    for (position, raw) in records.into_iter().enumerate() {
        let raw_id = raw.id.clone();
        let result = PolicyRecord::try_from(raw).and_then(|record| {
            if seen.insert(record.id.clone()) {
                Ok(record)
            } else {
                Err(RecordError::DuplicateId(record.id))
            }
        });

        match result {
            Ok(record) => corpus.entries.push(record.into_entry()),
            Err(error) => {
                warn!(
                    position,
                    id = raw_id.as_deref().unwrap_or("<none>"),
                    error = %error,
                    "Skipping policy record"
                );
                corpus.skipped.push((position, error));
            }
        }
    }

    info!(
        total,
        valid = corpus.entries.len(),
        skipped = corpus.skipped.len(),
        "Corpus normalized"
    );
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> RawPolicyRecord {
        RawPolicyRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            country: Some("Germany".to_string()),
            year: Some("2021".to_string()),
            category: Some("Energy".to_string()),
            policy_type: Some("Subsidy".to_string()),
            summary: Some("Feed-in tariffs for rooftop solar.".to_string()),
            effectiveness: Some("82".to_string()),
            ..RawPolicyRecord::default()
        }
    }

    #[test]
    fn test_canonical_text_layout() {
        let raw = record("1", "Solar Subsidy")
            .with_tag(PolicyTag::EnergyEfficiency)
            .with_tag(PolicyTag::RenewableEnergy);
        let entry = PolicyRecord::try_from(raw).unwrap().into_entry();

        assert_eq!(
            entry.text,
            "policy title: Solar Subsidy\n\
             location: Germany (2021)\n\
             category: Energy | type: Subsidy\n\
             summary: Feed-in tariffs for rooftop solar.\n\
             tags: renewable_energy, energy_efficiency\n\
             effectiveness score: 82/100"
        );
        assert_eq!(entry.metadata.get("id").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_region_prefixes_location() {
        let mut raw = record("7", "Clean Air Zone");
        raw.region = Some("Bavaria".to_string());
        let text = PolicyRecord::try_from(raw).unwrap().canonical_text();
        assert!(text.contains("location: Bavaria, Germany (2021)"));
    }

    #[test]
    fn test_tag_sentinel_is_case_sensitive() {
        let mut raw = record("2", "Carbon Tax");
        raw.columns.insert("carbon_pricing".into(), Value::String("yes".into()));
        raw.columns.insert("clean_air".into(), Value::String("No".into()));
        let parsed = PolicyRecord::try_from(raw).unwrap();
        assert!(parsed.tags.is_empty());
        assert!(!parsed.canonical_text().contains("tags:"));
    }

    #[test]
    fn test_deserialize_numeric_scalars() {
        let json = r#"{
            "id": 12, "title": "EV Rebate", "country": "Norway", "year": 2017,
            "category": "Transport", "type": "Incentive", "summary": "Rebates for EVs.",
            "effectiveness": 91, "electric_vehicles": "Yes", "official_url": ""
        }"#;
        let raw: RawPolicyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id.as_deref(), Some("12"));
        assert!(raw.official_url.is_none());

        let entry = PolicyRecord::try_from(raw).unwrap().into_entry();
        assert!(entry.text.contains("tags: electric_vehicles"));
        assert!(entry.text.ends_with("effectiveness score: 91/100"));
        assert!(!entry.metadata.contains_key("official_url"));
    }

    #[test]
    fn test_missing_fields_reported() {
        let mut raw = record("3", "Plastic Ban");
        raw.summary = None;
        raw.policy_type = None;
        let err = PolicyRecord::try_from(raw).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingFields(vec!["summary".to_string(), "type".to_string()])
        );
    }

    #[test]
    fn test_normalize_skips_invalid_and_duplicates() {
        let mut broken = record("4", "No Title");
        broken.title = None;

        let corpus = normalize_corpus(vec![
            record("1", "Solar Subsidy"),
            broken,
            record("1", "Solar Subsidy Again"),
            record("5", "Wetland Protection"),
        ]);

        let ids: Vec<&str> = corpus.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(corpus.skipped.len(), 2);
        assert_eq!(corpus.skipped[1], (2, RecordError::DuplicateId("1".to_string())));
    }

    #[test]
    fn test_zero_valid_records_is_not_an_error() {
        let corpus = normalize_corpus(vec![RawPolicyRecord::default()]);
        assert!(corpus.entries.is_empty());
        assert_eq!(corpus.skipped.len(), 1);
    }

    #[test]
    fn test_canonical_text_is_stable() {
        let a = PolicyRecord::try_from(record("9", "Same")).unwrap().canonical_text();
        let b = PolicyRecord::try_from(record("9", "Same")).unwrap().canonical_text();
        assert_eq!(a, b);
    }
}
