//! Core domain types for the Kinetic system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise variants and their intensity profiles
//! - Workout records kept in the archive
//! - Daily schedule tasks
//! - Health ecosystem links

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Intensity
// ============================================================================

/// Intensity level selecting a duration/sets/reps profile
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IntensityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl IntensityLevel {
    pub const ALL: [IntensityLevel; 3] = [
        IntensityLevel::Low,
        IntensityLevel::Medium,
        IntensityLevel::High,
    ];

    /// Multiplier applied to total reps when computing the metabolic score
    pub fn multiplier(self) -> f64 {
        match self {
            IntensityLevel::High => 1.5,
            IntensityLevel::Medium => 1.1,
            IntensityLevel::Low => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntensityLevel::Low => "Low",
            IntensityLevel::Medium => "Medium",
            IntensityLevel::High => "High",
        }
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for IntensityLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(IntensityLevel::Low),
            "medium" | "med" => Ok(IntensityLevel::Medium),
            "high" => Ok(IntensityLevel::High),
            other => Err(crate::Error::Validation(format!(
                "unknown intensity '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

// ============================================================================
// Exercise Variants
// ============================================================================

/// Role of a variant relative to its base movement pattern
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariantKind {
    Base,
    Regression,
    Progression,
    Alternative,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariantKind::Base => "Base",
            VariantKind::Regression => "Regression",
            VariantKind::Progression => "Progression",
            VariantKind::Alternative => "Alternative",
        };
        f.pad(s)
    }
}

/// Parsed prescription for one intensity level
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntensityProfile {
    pub duration_seconds: u32,
    /// Duration as written in the catalog ("45s", "1 min"), archived verbatim
    #[serde(default)]
    pub duration_label: String,
    pub set_count: u32,
    /// Display only; may encode ranges ("15-20") or per-side counts ("8/side")
    pub rep_target: String,
    pub guidance: String,
}

/// Exactly one profile per intensity level
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntensityProfiles {
    pub low: IntensityProfile,
    pub medium: IntensityProfile,
    pub high: IntensityProfile,
}

impl IntensityProfiles {
    pub fn get(&self, level: IntensityLevel) -> &IntensityProfile {
        match level {
            IntensityLevel::Low => &self.low,
            IntensityLevel::Medium => &self.medium,
            IntensityLevel::High => &self.high,
        }
    }
}

/// A movement pattern or one of its modifications
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseVariant {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: VariantKind,
    /// Id of the base exercise for modifications, `None` for bases
    pub base_id: Option<String>,
    pub video_url: Option<String>,
    pub form_protocol: Vec<String>,
    pub profiles: IntensityProfiles,
}

impl ExerciseVariant {
    pub fn profile(&self, level: IntensityLevel) -> &IntensityProfile {
        self.profiles.get(level)
    }

    pub fn is_base(&self) -> bool {
        self.base_id.is_none()
    }
}

/// The complete, immutable exercise catalog
///
/// Variants are kept in declaration order: each base is followed by its
/// modifications.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub(crate) variants: Vec<ExerciseVariant>,
}

// ============================================================================
// Workout Records
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkoutStatus {
    Completed,
    Skipped,
}

impl fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkoutStatus::Completed => f.pad("Completed"),
            WorkoutStatus::Skipped => f.pad("Skipped"),
        }
    }
}

/// A finished session as stored in the archive
///
/// Field names on the wire match the archive blob format
/// (`exerciseName`, `date`, `totalSets`, ...).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    pub id: String,
    pub exercise_name: String,
    #[serde(rename = "date")]
    pub date_label: String,
    /// Number of sets actually completed
    #[serde(rename = "totalSets")]
    pub set_count: u32,
    pub total_reps: u32,
    #[serde(default)]
    pub duration_per_set: String,
    pub intensity: IntensityLevel,
    pub status: WorkoutStatus,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub metabolic_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem_id: Option<Ecosystem>,
}

// ============================================================================
// Health Ecosystem
// ============================================================================

/// Third-party health platform a workout can be synced with
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    HealthKit,
    GoogleFit,
}

impl Ecosystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::HealthKit => "healthkit",
            Ecosystem::GoogleFit => "googlefit",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Ecosystem::HealthKit => "HealthKit",
            Ecosystem::GoogleFit => "Google Fit",
        }
    }
}

impl FromStr for Ecosystem {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "healthkit" => Ok(Ecosystem::HealthKit),
            "googlefit" | "google_fit" | "google-fit" => Ok(Ecosystem::GoogleFit),
            other => Err(crate::Error::Validation(format!(
                "unknown ecosystem '{}' (expected healthkit or googlefit)",
                other
            ))),
        }
    }
}

// ============================================================================
// Schedule Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskCategory {
    Work,
    Health,
    Personal,
    Leisure,
    Chore,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskCategory::Work => "Work",
            TaskCategory::Health => "Health",
            TaskCategory::Personal => "Personal",
            TaskCategory::Leisure => "Leisure",
            TaskCategory::Chore => "Chore",
        };
        f.pad(s)
    }
}

impl FromStr for TaskCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "work" => Ok(TaskCategory::Work),
            "health" => Ok(TaskCategory::Health),
            "personal" => Ok(TaskCategory::Personal),
            "leisure" => Ok(TaskCategory::Leisure),
            "chore" => Ok(TaskCategory::Chore),
            other => Err(crate::Error::Validation(format!(
                "unknown task category '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        };
        f.pad(s)
    }
}

impl FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" | "in_progress" | "active" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "skipped" => Ok(TaskStatus::Skipped),
            other => Err(crate::Error::Validation(format!(
                "unknown task status '{}'",
                other
            ))),
        }
    }
}

/// One block on the daily schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Local wall-clock start, "HH:MM"
    pub start_time: String,
    pub duration_minutes: u32,
    pub category: TaskCategory,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
