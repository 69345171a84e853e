//! Kinetic session state machine.
//!
//! Drives one exercise variant at one intensity through a repeating
//! set → rest → set cycle. The machine never reads a clock of its own: the
//! caller delivers [`KineticSession::tick`] once per second while the timer
//! runs, plus user intents (toggle, reps, complete set). Rendering is left to
//! whoever consumes [`SessionSnapshot`]s.
//!
//! Every intent is total. Calls made outside their precondition (ticking a
//! stopped timer, resuming an exhausted timer, restarting a session that is
//! still active) are ignored rather than reported.

use crate::score::metabolic_score;
use crate::{
    Catalog, Ecosystem, ExerciseVariant, IntensityLevel, IntensityProfile, Result,
    WorkoutRecord, WorkoutStatus,
};
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

/// Observable phase of a session
///
/// Selection passes through an idle state and the set-complete state advances
/// immediately, so neither is ever observable between calls.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum SessionPhase {
    SetActive,
    Finished,
}

/// Immutable view of the session for rendering
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub variant_id: String,
    pub variant_name: String,
    pub intensity: IntensityLevel,
    pub active_set_index: u32,
    pub set_count: u32,
    pub time_remaining_seconds: u32,
    pub duration_seconds: u32,
    pub is_running: bool,
    pub current_reps: u32,
    pub completed_set_reps: Vec<u32>,
    pub rep_target: String,
    pub guidance: String,
    pub record: Option<WorkoutRecord>,
}

/// The session controller
#[derive(Clone, Debug)]
pub struct KineticSession<'c> {
    catalog: &'c Catalog,
    variant: &'c ExerciseVariant,
    intensity: IntensityLevel,
    link: Option<Ecosystem>,
    active_set: u32,
    time_remaining: u32,
    running: bool,
    current_reps: u32,
    completed_set_reps: Vec<u32>,
    record: Option<WorkoutRecord>,
}

/// Catalog duration text, or whole seconds when the catalog left it blank
fn duration_label(profile: &IntensityProfile) -> String {
    if profile.duration_label.is_empty() {
        format!("{}s", profile.duration_seconds)
    } else {
        profile.duration_label.clone()
    }
}

impl<'c> KineticSession<'c> {
    /// Start a session on a variant at the default (Medium) intensity
    pub fn new(catalog: &'c Catalog, variant_id: &str) -> Result<Self> {
        Self::with_intensity(catalog, variant_id, IntensityLevel::default())
    }

    /// Start a session on a variant at a given intensity
    pub fn with_intensity(
        catalog: &'c Catalog,
        variant_id: &str,
        intensity: IntensityLevel,
    ) -> Result<Self> {
        let variant = catalog.get_variant(variant_id)?;
        let mut session = KineticSession {
            catalog,
            variant,
            intensity,
            link: None,
            active_set: 1,
            time_remaining: 0,
            running: false,
            current_reps: 0,
            completed_set_reps: Vec::new(),
            record: None,
        };
        session.reinitialize();
        Ok(session)
    }

    /// Stamp records produced by this session with a health ecosystem link
    pub fn with_link(mut self, link: Option<Ecosystem>) -> Self {
        self.link = link;
        self
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Switch to another variant, resetting intensity to Medium.
    ///
    /// An unknown id leaves the session untouched.
    pub fn select_variant(&mut self, variant_id: &str) -> Result<()> {
        let variant = self.catalog.get_variant(variant_id)?;
        self.variant = variant;
        self.intensity = IntensityLevel::default();
        self.reinitialize();
        tracing::debug!("Selected variant {}", variant_id);
        Ok(())
    }

    /// Switch intensity; always discards the current run
    pub fn select_intensity(&mut self, intensity: IntensityLevel) {
        self.intensity = intensity;
        self.reinitialize();
        tracing::debug!("Selected intensity {}", intensity);
    }

    /// Begin the same variant and intensity again after finishing
    pub fn restart(&mut self) {
        if self.record.is_some() {
            self.reinitialize();
            tracing::debug!("Restarted {}", self.variant.id);
        }
    }

    fn reinitialize(&mut self) {
        self.active_set = 1;
        self.current_reps = 0;
        self.completed_set_reps.clear();
        self.time_remaining = self.profile().duration_seconds;
        self.running = false;
        self.record = None;
    }

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------

    /// One second elapsed on the external clock
    pub fn tick(&mut self) {
        if self.is_finished() || !self.running || self.time_remaining == 0 {
            return;
        }
        self.time_remaining -= 1;
        if self.time_remaining == 0 {
            // Countdown stops; the user still has to complete the set.
            self.running = false;
            tracing::debug!("Set {} timer exhausted", self.active_set);
        }
    }

    /// Start or pause the countdown. An exhausted timer cannot be resumed.
    pub fn toggle_run(&mut self) {
        if self.is_finished() || self.time_remaining == 0 {
            return;
        }
        self.running = !self.running;
    }

    /// Stop the countdown and refill it; reps and set index are kept
    pub fn reset_timer(&mut self) {
        if self.is_finished() {
            return;
        }
        self.running = false;
        self.time_remaining = self.profile().duration_seconds;
    }

    // ------------------------------------------------------------------
    // Reps and sets
    // ------------------------------------------------------------------

    pub fn increment_reps(&mut self) {
        if !self.is_finished() {
            self.current_reps = self.current_reps.saturating_add(1);
        }
    }

    pub fn decrement_reps(&mut self) {
        if !self.is_finished() {
            self.current_reps = self.current_reps.saturating_sub(1);
        }
    }

    /// Record the current set. Returns the workout record when this was the
    /// final set.
    pub fn complete_set(&mut self) -> Option<WorkoutRecord> {
        if self.is_finished() {
            return None;
        }

        self.completed_set_reps.push(self.current_reps);
        self.running = false;

        if self.active_set < self.set_count() {
            self.active_set += 1;
            self.current_reps = 0;
            self.time_remaining = self.profile().duration_seconds;
            tracing::debug!("Advanced to set {}/{}", self.active_set, self.set_count());
            return None;
        }

        Some(self.finish(WorkoutStatus::Completed, self.active_set))
    }

    /// End the session early. Only completed sets count toward the score.
    pub fn skip(&mut self) -> Option<WorkoutRecord> {
        if self.is_finished() {
            return None;
        }
        self.running = false;
        let completed = self.completed_set_reps.len() as u32;
        Some(self.finish(WorkoutStatus::Skipped, completed))
    }

    fn finish(&mut self, status: WorkoutStatus, completed_sets: u32) -> WorkoutRecord {
        let profile = self.profile();
        let total_reps: u32 = self.completed_set_reps.iter().sum();
        let score = metabolic_score(total_reps, self.intensity, completed_sets, profile.set_count);

        let record = WorkoutRecord {
            id: Uuid::new_v4().to_string(),
            exercise_name: self.variant.name.clone(),
            date_label: Local::now().format("%b %-d, %H:%M").to_string(),
            set_count: self.completed_set_reps.len() as u32,
            total_reps,
            duration_per_set: duration_label(profile),
            intensity: self.intensity,
            status,
            synced: self.link.is_some(),
            metabolic_score: score,
            ecosystem_id: self.link,
        };

        tracing::info!(
            "Session {} for {}: {} reps over {} sets, score {}",
            status,
            record.exercise_name,
            total_reps,
            record.set_count,
            score
        );

        self.record = Some(record.clone());
        record
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn variant(&self) -> &'c ExerciseVariant {
        self.variant
    }

    pub fn intensity(&self) -> IntensityLevel {
        self.intensity
    }

    pub fn profile(&self) -> &'c IntensityProfile {
        self.variant.profile(self.intensity)
    }

    pub fn set_count(&self) -> u32 {
        self.profile().set_count
    }

    pub fn active_set(&self) -> u32 {
        self.active_set
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_reps(&self) -> u32 {
        self.current_reps
    }

    pub fn completed_set_reps(&self) -> &[u32] {
        &self.completed_set_reps
    }

    pub fn is_finished(&self) -> bool {
        self.record.is_some()
    }

    /// The record emitted by the finishing transition, if any
    pub fn record(&self) -> Option<&WorkoutRecord> {
        self.record.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_finished() {
            SessionPhase::Finished
        } else {
            SessionPhase::SetActive
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let profile = self.profile();
        SessionSnapshot {
            phase: self.phase(),
            variant_id: self.variant.id.clone(),
            variant_name: self.variant.name.clone(),
            intensity: self.intensity,
            active_set_index: self.active_set,
            set_count: profile.set_count,
            time_remaining_seconds: self.time_remaining,
            duration_seconds: profile.duration_seconds,
            is_running: self.running,
            current_reps: self.current_reps,
            completed_set_reps: self.completed_set_reps.clone(),
            rep_target: profile.rep_target.clone(),
            guidance: profile.guidance.clone(),
            record: self.record.clone(),
        }
    }
}
