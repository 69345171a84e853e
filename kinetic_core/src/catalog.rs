//! Exercise catalog: base movements, their modifications, and intensity profiles.
//!
//! Profiles are declared with raw strings ("45s", "3") and parsed exactly once
//! when the catalog is built. A malformed value never fails the load; it falls
//! back to [`DEFAULT_DURATION_SECONDS`] or [`DEFAULT_SET_COUNT`].

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_DURATION_SECONDS: u32 = 60;
pub const DEFAULT_SET_COUNT: u32 = 4;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(|| Catalog::from_entries(default_entries()));

/// Get a reference to the cached built-in catalog
pub fn default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

// ============================================================================
// Raw entry schema
// ============================================================================

/// Unparsed profile as declared in a catalog source
#[derive(Clone, Debug, Deserialize)]
pub struct RawProfile {
    pub duration: String,
    pub sets: String,
    pub reps: String,
    #[serde(default)]
    pub insight: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawProfiles {
    #[serde(rename = "Low")]
    pub low: RawProfile,
    #[serde(rename = "Medium")]
    pub medium: RawProfile,
    #[serde(rename = "High")]
    pub high: RawProfile,
}

/// A catalog entry: a base exercise and (one level of) modifications
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: Option<VariantKind>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub form_protocol: Vec<String>,
    pub profiles: RawProfiles,
    #[serde(default)]
    pub modifications: Vec<ExerciseEntry>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Read the leading run of digits, skipping leading whitespace ("45s" -> 45).
///
/// Zero counts as unparsable.
fn leading_integer(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Parse a duration string such as "45s", falling back to 60 seconds
pub fn parse_duration_seconds(raw: &str) -> u32 {
    leading_integer(raw).unwrap_or_else(|| {
        tracing::warn!(
            "Unparsable duration {:?}, using {}s",
            raw,
            DEFAULT_DURATION_SECONDS
        );
        DEFAULT_DURATION_SECONDS
    })
}

/// Parse a set count such as "3", falling back to 4 sets
pub fn parse_set_count(raw: &str) -> u32 {
    leading_integer(raw).unwrap_or_else(|| {
        tracing::warn!("Unparsable set count {:?}, using {}", raw, DEFAULT_SET_COUNT);
        DEFAULT_SET_COUNT
    })
}

impl From<&RawProfile> for IntensityProfile {
    fn from(raw: &RawProfile) -> Self {
        IntensityProfile {
            duration_seconds: parse_duration_seconds(&raw.duration),
            duration_label: raw.duration.trim().to_string(),
            set_count: parse_set_count(&raw.sets),
            rep_target: raw.reps.clone(),
            guidance: raw.insight.clone(),
        }
    }
}

impl From<&RawProfiles> for IntensityProfiles {
    fn from(raw: &RawProfiles) -> Self {
        IntensityProfiles {
            low: (&raw.low).into(),
            medium: (&raw.medium).into(),
            high: (&raw.high).into(),
        }
    }
}

fn to_variant(entry: &ExerciseEntry, base_id: Option<&str>, default_kind: VariantKind) -> ExerciseVariant {
    ExerciseVariant {
        id: entry.id.clone(),
        name: entry.name.clone(),
        description: entry.description.clone(),
        kind: entry.kind.unwrap_or(default_kind),
        base_id: base_id.map(str::to_string),
        video_url: entry.video_url.clone(),
        form_protocol: entry.form_protocol.clone(),
        profiles: (&entry.profiles).into(),
    }
}

// ============================================================================
// Catalog
// ============================================================================

impl Catalog {
    /// Build a catalog from raw entries, parsing every profile once
    pub fn from_entries(entries: Vec<ExerciseEntry>) -> Self {
        let mut variants = Vec::new();

        for entry in &entries {
            variants.push(to_variant(entry, None, VariantKind::Base));
            for modification in &entry.modifications {
                if !modification.modifications.is_empty() {
                    tracing::warn!(
                        "Ignoring nested modifications under '{}'",
                        modification.id
                    );
                }
                variants.push(to_variant(
                    modification,
                    Some(&entry.id),
                    VariantKind::Alternative,
                ));
            }
        }

        tracing::debug!("Built catalog with {} variants", variants.len());
        Catalog { variants }
    }

    /// Parse a catalog from its JSON representation (array of entries)
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<ExerciseEntry> = serde_json::from_str(text)?;
        Ok(Self::from_entries(entries))
    }

    /// Load a catalog file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!("Loaded catalog from {:?}", path);
        Ok(catalog)
    }

    /// Base exercises, in declaration order
    pub fn list_exercises(&self) -> Vec<&ExerciseVariant> {
        self.variants.iter().filter(|v| v.is_base()).collect()
    }

    /// Modifications of a base exercise, in declaration order
    pub fn list_modifications(&self, base_id: &str) -> Result<Vec<&ExerciseVariant>> {
        let base = self.get_variant(base_id)?;
        if !base.is_base() {
            return Err(Error::not_found("base exercise", base_id));
        }
        Ok(self
            .variants
            .iter()
            .filter(|v| v.base_id.as_deref() == Some(base_id))
            .collect())
    }

    pub fn get_variant(&self, variant_id: &str) -> Result<&ExerciseVariant> {
        self.variants
            .iter()
            .find(|v| v.id == variant_id)
            .ok_or_else(|| Error::not_found("exercise variant", variant_id))
    }

    pub fn get_profile(&self, variant_id: &str, intensity: IntensityLevel) -> Result<&IntensityProfile> {
        Ok(self.get_variant(variant_id)?.profile(intensity))
    }

    /// The base exercise owning a variant (a base owns itself)
    pub fn base_of(&self, variant_id: &str) -> Result<&ExerciseVariant> {
        let variant = self.get_variant(variant_id)?;
        match &variant.base_id {
            Some(base_id) => self.get_variant(base_id),
            None => Ok(variant),
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.variants.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        for variant in &self.variants {
            if variant.id.is_empty() {
                errors.push(format!("Variant '{}' has empty ID", variant.name));
            } else if !seen.insert(variant.id.as_str()) {
                errors.push(format!("Duplicate variant ID '{}'", variant.id));
            }
            if variant.name.is_empty() {
                errors.push(format!("Variant '{}' has empty name", variant.id));
            }
            match (&variant.base_id, variant.kind) {
                (None, kind) if kind != VariantKind::Base => errors.push(format!(
                    "Base exercise '{}' has kind {}",
                    variant.id, kind
                )),
                (Some(base), VariantKind::Base) => errors.push(format!(
                    "Modification '{}' of '{}' has kind Base",
                    variant.id, base
                )),
                _ => {}
            }
        }

        errors
    }
}

// ============================================================================
// Built-in entries
// ============================================================================

fn raw(duration: &str, sets: &str, reps: &str, insight: &str) -> RawProfile {
    RawProfile {
        duration: duration.into(),
        sets: sets.into(),
        reps: reps.into(),
        insight: insight.into(),
    }
}

fn profiles(low: RawProfile, medium: RawProfile, high: RawProfile) -> RawProfiles {
    RawProfiles { low, medium, high }
}

fn cues(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

fn default_entries() -> Vec<ExerciseEntry> {
    vec![
        // Push pattern
        ExerciseEntry {
            id: "ex-1".into(),
            name: "Pushups".into(),
            description: "Horizontal pressing with a rigid trunk.".into(),
            kind: Some(VariantKind::Base),
            video_url: Some("https://youtube.com/results?search_query=pushups+tutorial".into()),
            form_protocol: cues(&[
                "Brace the trunk and keep the pelvis tucked.",
                "Elbows track about 45 degrees from the torso.",
                "Push the floor away fully at the top.",
            ]),
            profiles: profiles(
                raw("30s", "2", "8-12", "Slow lowering, pause at the bottom."),
                raw("45s", "3", "15-20", "Two-second eccentric on every rep."),
                raw("60s", "5", "25-30", "Drive up fast, lower under control."),
            ),
            modifications: vec![
                ExerciseEntry {
                    id: "ex-1-reg".into(),
                    name: "Incline Pushups".into(),
                    description: "Hands elevated to reduce the load.".into(),
                    kind: Some(VariantKind::Regression),
                    video_url: Some(
                        "https://youtube.com/results?search_query=incline+pushups+tutorial".into(),
                    ),
                    form_protocol: cues(&[
                        "Hands on a bench or sturdy ledge.",
                        "Same rigid trunk as the floor version.",
                    ]),
                    profiles: profiles(
                        raw("30s", "2", "12-15", "Steady breathing, build volume."),
                        raw("45s", "3", "20-25", "Endurance without shoulder strain."),
                        raw("60s", "4", "30+", "Conditioning pace."),
                    ),
                    modifications: vec![],
                },
                ExerciseEntry {
                    id: "ex-1-prog".into(),
                    name: "Plyometric Pushups".into(),
                    description: "Explosive pushups where the hands leave the floor.".into(),
                    kind: Some(VariantKind::Progression),
                    video_url: Some(
                        "https://youtube.com/results?search_query=plyometric+pushups+tutorial"
                            .into(),
                    ),
                    form_protocol: cues(&[
                        "Push hard enough for the hands to leave the floor.",
                        "Land with soft elbows.",
                    ]),
                    profiles: profiles(
                        raw("20s", "3", "5-8", "Maximum height on each rep."),
                        raw("30s", "4", "10-12", "Hold power output across the set."),
                        raw("45s", "5", "15+", "Power endurance."),
                    ),
                    modifications: vec![],
                },
            ],
        },
        // Squat pattern
        ExerciseEntry {
            id: "ex-2".into(),
            name: "Air Squats".into(),
            description: "Bodyweight squat for leg endurance and hip control.".into(),
            kind: Some(VariantKind::Base),
            video_url: Some("https://youtube.com/results?search_query=air+squats+tutorial".into()),
            form_protocol: cues(&[
                "Weight through the mid-foot.",
                "Chest up, spine neutral.",
                "Start with a small hip hinge.",
            ]),
            profiles: profiles(
                raw("45s", "3", "15-20", "Full depth, slow tempo."),
                raw("60s", "4", "25-30", "Steady rhythm and breathing."),
                raw("90s", "5", "40-50", "High volume, keep form crisp."),
            ),
            modifications: vec![ExerciseEntry {
                id: "ex-2-prog".into(),
                name: "Cossack Squats".into(),
                description: "Lateral squat shifting between legs.".into(),
                kind: Some(VariantKind::Progression),
                video_url: Some(
                    "https://youtube.com/results?search_query=cossack+squats+tutorial".into(),
                ),
                form_protocol: cues(&[
                    "Wide stance, sit into one side with the other leg straight.",
                    "Keep the working heel down.",
                ]),
                profiles: profiles(
                    raw("40s", "2", "5/side", "Range of motion first."),
                    raw("60s", "3", "8/side", "Controlled strength through the range."),
                    raw("90s", "4", "12/side", "Drive out of the bottom."),
                ),
                modifications: vec![],
            }],
        },
        // Trunk
        ExerciseEntry {
            id: "ex-3".into(),
            name: "Plank Hold".into(),
            description: "Isometric trunk stability.".into(),
            kind: Some(VariantKind::Base),
            video_url: Some("https://youtube.com/results?search_query=plank+tutorial".into()),
            form_protocol: cues(&[
                "Elbows under shoulders.",
                "Squeeze glutes, ribs down.",
            ]),
            profiles: profiles(
                raw("30s", "2", "1 hold", "Quality position over time."),
                raw("45s", "3", "1 hold", "Breathe behind the brace."),
                raw("60s", "4", "1 hold", "Add a reach if it gets easy."),
            ),
            modifications: vec![ExerciseEntry {
                id: "ex-3-alt".into(),
                name: "Side Plank".into(),
                description: "Lateral trunk stability.".into(),
                kind: Some(VariantKind::Alternative),
                video_url: Some("https://youtube.com/results?search_query=side+plank+tutorial".into()),
                form_protocol: cues(&["Stack the feet.", "Push the hip up and forward."]),
                profiles: profiles(
                    raw("20s", "2", "1/side", "Knees down if needed."),
                    raw("30s", "3", "1/side", "Straight line head to heel."),
                    raw("45s", "3", "1/side", "Top leg raised."),
                ),
                modifications: vec![],
            }],
        },
    ]
}
