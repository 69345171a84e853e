//! Boundary to the generative assistant.
//!
//! [`AiGateway`] is the seam a concrete model client implements. The view
//! layer talks to [`Assistant`], which never fails: gateway errors are logged
//! and replaced with fixed placeholder responses.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Maximum number of briefs shown per day
pub const MAX_HEALTH_BRIEFS: usize = 4;

pub const CHAT_FALLBACK: &str = "Connection error.";
pub const CHAT_EMPTY: &str = "Synchronizing...";
pub const ADVICE_FALLBACK: &str = "Error fetching cultivation advice.";
pub const ADVICE_EMPTY: &str = "I couldn't find organic data for that.";
pub const NUTRITION_FALLBACK: &str = "Calibration failed.";
pub const INSPIRATION_FALLBACK: &str = "Optimize your focus blocks.";
pub const INSPIRATION_EMPTY: &str = "Focus on deep work.";

// ============================================================================
// Value types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Web,
    Maps,
}

/// Citation attached to a grounded reply
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    pub title: String,
    pub uri: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GroundedReply {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl GroundedReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NutritionEstimate {
    #[serde(default)]
    pub food: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub advice: String,
}

impl NutritionEstimate {
    fn failed(food: &str) -> Self {
        Self {
            food: food.to_string(),
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            advice: NUTRITION_FALLBACK.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthBrief {
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

// ============================================================================
// Gateway seam
// ============================================================================

/// Request/response access to a generative model.
///
/// Implementations return [`Error::RemoteUnavailable`] when the model cannot
/// be reached or its answer cannot be used.
pub trait AiGateway {
    /// Free-form question answered with the user's schedule as context
    fn chat(
        &self,
        schedule_context: &str,
        prompt: &str,
        location: Option<GeoPoint>,
    ) -> Result<GroundedReply>;

    /// Chemical-free growing and nutrition guidance for a plant or food
    fn cultivation_advice(&self, query: &str) -> Result<GroundedReply>;

    fn nutrition_estimate(&self, food: &str) -> Result<NutritionEstimate>;

    fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>>;

    /// One short productivity ritual suggestion
    fn daily_inspiration(&self) -> Result<String>;
}

impl<G: AiGateway + ?Sized> AiGateway for &G {
    fn chat(
        &self,
        schedule_context: &str,
        prompt: &str,
        location: Option<GeoPoint>,
    ) -> Result<GroundedReply> {
        (**self).chat(schedule_context, prompt, location)
    }

    fn cultivation_advice(&self, query: &str) -> Result<GroundedReply> {
        (**self).cultivation_advice(query)
    }

    fn nutrition_estimate(&self, food: &str) -> Result<NutritionEstimate> {
        (**self).nutrition_estimate(food)
    }

    fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>> {
        (**self).daily_health_briefs()
    }

    fn daily_inspiration(&self) -> Result<String> {
        (**self).daily_inspiration()
    }
}

impl<G: AiGateway + ?Sized> AiGateway for Box<G> {
    fn chat(
        &self,
        schedule_context: &str,
        prompt: &str,
        location: Option<GeoPoint>,
    ) -> Result<GroundedReply> {
        (**self).chat(schedule_context, prompt, location)
    }

    fn cultivation_advice(&self, query: &str) -> Result<GroundedReply> {
        (**self).cultivation_advice(query)
    }

    fn nutrition_estimate(&self, food: &str) -> Result<NutritionEstimate> {
        (**self).nutrition_estimate(food)
    }

    fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>> {
        (**self).daily_health_briefs()
    }

    fn daily_inspiration(&self) -> Result<String> {
        (**self).daily_inspiration()
    }
}

/// Gateway for running without a model backend: every call fails
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineGateway;

impl OfflineGateway {
    fn unavailable<T>(what: &str) -> Result<T> {
        Err(Error::RemoteUnavailable(format!(
            "{}: no assistant backend configured",
            what
        )))
    }
}

impl AiGateway for OfflineGateway {
    fn chat(&self, _: &str, _: &str, _: Option<GeoPoint>) -> Result<GroundedReply> {
        Self::unavailable("chat")
    }

    fn cultivation_advice(&self, _: &str) -> Result<GroundedReply> {
        Self::unavailable("cultivation advice")
    }

    fn nutrition_estimate(&self, _: &str) -> Result<NutritionEstimate> {
        Self::unavailable("nutrition estimate")
    }

    fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>> {
        Self::unavailable("health briefs")
    }

    fn daily_inspiration(&self) -> Result<String> {
        Self::unavailable("inspiration")
    }
}

/// Gateway that pipes each prompt through an external program.
///
/// The prompt goes to the program's stdin and its trimmed stdout is the
/// answer, so any local model runner or API wrapper script can back the
/// assistant. Failing to start, or a non-zero exit, is `RemoteUnavailable`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandGateway {
    program: String,
    args: Vec<String>,
}

impl CommandGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `["llm", "-m", "mini"]` runs `llm -m mini`. `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn run(&self, prompt: &str) -> Result<String> {
        let unavailable =
            |what: String| Error::RemoteUnavailable(format!("{}: {}", self.program, what));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start: {}", e)))?;

        // Closing stdin on drop marks the end of the prompt
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(prompt.as_bytes()),
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .map_err(|e| unavailable(format!("failed to wait: {}", e)))?;

        match written {
            // The program may answer without reading its input
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(unavailable(format!("failed to send prompt: {}", e))),
            Ok(()) => {}
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!("{} answered with {} bytes", self.program, answer.len());
        Ok(answer)
    }
}

impl AiGateway for CommandGateway {
    fn chat(
        &self,
        schedule_context: &str,
        prompt: &str,
        location: Option<GeoPoint>,
    ) -> Result<GroundedReply> {
        let mut request = format!(
            "You help plan a balanced day. Today's schedule:\n{}\n",
            schedule_context
        );
        if let Some(at) = location {
            request.push_str(&format!(
                "The user is near latitude {}, longitude {}.\n",
                at.latitude, at.longitude
            ));
        }
        request.push_str(&format!("Question: {}\n", prompt));
        self.run(&request).map(GroundedReply::plain)
    }

    fn cultivation_advice(&self, query: &str) -> Result<GroundedReply> {
        let request = format!(
            "Explain how to grow {} without synthetic chemicals, and what it offers nutritionally.\n",
            query
        );
        self.run(&request).map(GroundedReply::plain)
    }

    fn nutrition_estimate(&self, food: &str) -> Result<NutritionEstimate> {
        let request = format!(
            "Estimate one serving of {}. Reply with a single JSON object with the keys \
             food, calories, protein, carbs, fat (grams) and advice.\n",
            food
        );
        let answer = self.run(&request)?;
        parse_nutrition(&answer, food).map_err(|e| {
            Error::RemoteUnavailable(format!("unusable nutrition answer for {:?}: {}", food, e))
        })
    }

    fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>> {
        let request = format!(
            "List up to {} of today's health and wellness news items as a JSON array of \
             objects with the keys title, summary, url and timestamp.\n",
            MAX_HEALTH_BRIEFS
        );
        Ok(parse_health_briefs(&self.run(&request)?))
    }

    fn daily_inspiration(&self) -> Result<String> {
        self.run("Suggest one short productivity ritual for today, in a single sentence.\n")
    }
}

// ============================================================================
// Degrading facade
// ============================================================================

pub struct Assistant<G: AiGateway> {
    gateway: G,
    location: Option<GeoPoint>,
}

impl<G: AiGateway> Assistant<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }

    pub fn chat(&self, schedule_context: &str, prompt: &str) -> GroundedReply {
        match self.gateway.chat(schedule_context, prompt, self.location) {
            Ok(reply) if reply.text.trim().is_empty() => GroundedReply {
                text: CHAT_EMPTY.to_string(),
                sources: reply.sources,
            },
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                GroundedReply::plain(CHAT_FALLBACK)
            }
        }
    }

    pub fn cultivation_advice(&self, query: &str) -> GroundedReply {
        match self.gateway.cultivation_advice(query) {
            Ok(reply) if reply.text.trim().is_empty() => GroundedReply {
                text: ADVICE_EMPTY.to_string(),
                sources: reply.sources,
            },
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Cultivation advice failed: {}", e);
                GroundedReply::plain(ADVICE_FALLBACK)
            }
        }
    }

    pub fn nutrition_estimate(&self, food: &str) -> NutritionEstimate {
        match self.gateway.nutrition_estimate(food) {
            Ok(estimate) => estimate,
            Err(e) => {
                tracing::warn!("Nutrition estimate for {:?} failed: {}", food, e);
                NutritionEstimate::failed(food)
            }
        }
    }

    pub fn daily_health_briefs(&self) -> Vec<HealthBrief> {
        match self.gateway.daily_health_briefs() {
            Ok(mut briefs) => {
                briefs.truncate(MAX_HEALTH_BRIEFS);
                briefs
            }
            Err(e) => {
                tracing::warn!("Health brief fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn daily_inspiration(&self) -> String {
        match self.gateway.daily_inspiration() {
            Ok(text) if text.trim().is_empty() => INSPIRATION_EMPTY.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Inspiration fetch failed: {}", e);
                INSPIRATION_FALLBACK.to_string()
            }
        }
    }
}

// ============================================================================
// Response parsing helpers
// ============================================================================

/// Slice from the first `[` to the last `]`, if both exist in that order
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse a briefs array that may be wrapped in prose. Malformed input
/// yields an empty list.
pub fn parse_health_briefs(text: &str) -> Vec<HealthBrief> {
    let candidate = extract_json_array(text).unwrap_or(text);
    match serde_json::from_str::<Vec<HealthBrief>>(candidate) {
        Ok(briefs) => briefs,
        Err(e) => {
            tracing::warn!("Failed to parse health briefs: {}", e);
            Vec::new()
        }
    }
}

/// Slice from the first `{` to the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse a nutrition JSON object, possibly wrapped in prose. A missing
/// `food` is filled in from the query.
pub fn parse_nutrition(text: &str, food: &str) -> Result<NutritionEstimate> {
    let candidate = extract_json_object(text).unwrap_or(text).trim();
    let mut estimate: NutritionEstimate = serde_json::from_str(candidate)?;
    if estimate.food.trim().is_empty() {
        estimate.food = food.to_string();
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Scripted gateway: answers from fixed values, or fails every call
    #[derive(Default)]
    struct FakeGateway {
        fail: bool,
        reply: String,
        briefs: Vec<HealthBrief>,
        seen_location: RefCell<Option<GeoPoint>>,
        seen_context: RefCell<String>,
    }

    impl FakeGateway {
        fn check(&self) -> Result<()> {
            if self.fail {
                return Err(Error::RemoteUnavailable("fake outage".into()));
            }
            Ok(())
        }
    }

    impl AiGateway for FakeGateway {
        fn chat(
            &self,
            schedule_context: &str,
            _prompt: &str,
            location: Option<GeoPoint>,
        ) -> Result<GroundedReply> {
            self.check()?;
            *self.seen_location.borrow_mut() = location;
            *self.seen_context.borrow_mut() = schedule_context.to_string();
            Ok(GroundedReply {
                text: self.reply.clone(),
                sources: vec![Source {
                    kind: SourceKind::Web,
                    title: "Ref".into(),
                    uri: "https://example.org".into(),
                }],
            })
        }

        fn cultivation_advice(&self, _query: &str) -> Result<GroundedReply> {
            self.check()?;
            Ok(GroundedReply::plain(self.reply.clone()))
        }

        fn nutrition_estimate(&self, food: &str) -> Result<NutritionEstimate> {
            self.check()?;
            parse_nutrition(
                r#"{"calories": 95, "protein": 0.5, "carbs": 25, "fat": 0.3, "advice": "Eat the skin."}"#,
                food,
            )
        }

        fn daily_health_briefs(&self) -> Result<Vec<HealthBrief>> {
            self.check()?;
            Ok(self.briefs.clone())
        }

        fn daily_inspiration(&self) -> Result<String> {
            self.check()?;
            Ok(self.reply.clone())
        }
    }

    fn brief(n: usize) -> HealthBrief {
        HealthBrief {
            title: format!("Brief {}", n),
            summary: "Summary".into(),
            url: format!("https://example.org/{}", n),
            timestamp: "2h ago".into(),
        }
    }

    #[test]
    fn test_failures_become_placeholders() {
        crate::logging::init_test();
        let assistant = Assistant::new(FakeGateway {
            fail: true,
            ..FakeGateway::default()
        });

        let reply = assistant.chat("", "hello");
        assert_eq!(reply.text, CHAT_FALLBACK);
        assert!(reply.sources.is_empty());
        assert_eq!(assistant.cultivation_advice("kale").text, ADVICE_FALLBACK);

        let estimate = assistant.nutrition_estimate("apple");
        assert_eq!(estimate.food, "apple");
        assert_eq!(estimate.calories, 0.0);
        assert_eq!(estimate.protein, 0.0);
        assert_eq!(estimate.advice, NUTRITION_FALLBACK);

        assert!(assistant.daily_health_briefs().is_empty());
        assert_eq!(assistant.daily_inspiration(), INSPIRATION_FALLBACK);
    }

    #[test]
    fn test_offline_gateway_always_degrades() {
        let assistant = Assistant::new(OfflineGateway);
        assert_eq!(assistant.chat("- 07:00: Run (Health)", "plan").text, CHAT_FALLBACK);
        assert_eq!(assistant.daily_inspiration(), INSPIRATION_FALLBACK);
        assert!(matches!(
            OfflineGateway.daily_health_briefs(),
            Err(Error::RemoteUnavailable(_))
        ));
    }

    #[test]
    fn test_successful_replies_pass_through() {
        let gateway = FakeGateway {
            reply: "Take a walk at noon.".into(),
            ..FakeGateway::default()
        };
        let location = GeoPoint {
            latitude: 35.68,
            longitude: 139.76,
        };
        let assistant = Assistant::new(&gateway).with_location(Some(location));

        let reply = assistant.chat("- 12:00: Lunch (Health)", "what next?");
        assert_eq!(reply.text, "Take a walk at noon.");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(*gateway.seen_location.borrow(), Some(location));
        assert_eq!(*gateway.seen_context.borrow(), "- 12:00: Lunch (Health)");

        let estimate = assistant.nutrition_estimate("apple");
        assert_eq!(estimate.food, "apple");
        assert_eq!(estimate.calories, 95.0);
    }

    #[test]
    fn test_empty_text_uses_defaults() {
        let assistant = Assistant::new(FakeGateway::default());
        let reply = assistant.chat("", "hi");
        assert_eq!(reply.text, CHAT_EMPTY);
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(assistant.cultivation_advice("basil").text, ADVICE_EMPTY);
        assert_eq!(assistant.daily_inspiration(), INSPIRATION_EMPTY);
    }

    #[test]
    fn test_briefs_truncated() {
        let assistant = Assistant::new(FakeGateway {
            briefs: (0..6).map(brief).collect(),
            ..FakeGateway::default()
        });
        let briefs = assistant.daily_health_briefs();
        assert_eq!(briefs.len(), MAX_HEALTH_BRIEFS);
        assert_eq!(briefs[3].title, "Brief 3");
    }

    #[test]
    fn test_extract_json_array() {
        assert_eq!(extract_json_array("noise [1, 2] more ] end"), Some("[1, 2] more ]"));
        assert_eq!(extract_json_array("[]"), Some("[]"));
        assert_eq!(extract_json_array("no array"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }

    #[test]
    fn test_parse_health_briefs_with_noise() {
        let text = r#"Here are today's updates:
[{"title": "Sleep study", "summary": "Short naps help.", "url": "https://example.org/a", "timestamp": "1h ago"}]
Sources were checked."#;
        let briefs = parse_health_briefs(text);
        assert_eq!(briefs.len(), 1);
        assert_eq!(briefs[0].title, "Sleep study");
    }

    #[test]
    fn test_parse_health_briefs_malformed() {
        assert!(parse_health_briefs("[{\"title\": ").is_empty());
        assert!(parse_health_briefs("nothing here").is_empty());
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandGateway {
        CommandGateway::new("sh", vec!["-c".into(), script.into()])
    }

    #[cfg(unix)]
    #[test]
    fn test_command_gateway_sends_prompt_on_stdin() {
        let gateway = shell("cat");
        let location = GeoPoint {
            latitude: 48.85,
            longitude: 2.35,
        };
        let reply = gateway
            .chat("- 07:00: Run (Health)", "when should I eat?", Some(location))
            .unwrap();
        assert!(reply.text.contains("- 07:00: Run (Health)"));
        assert!(reply.text.contains("Question: when should I eat?"));
        assert!(reply.text.contains("48.85"));
        assert!(reply.sources.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_gateway_parses_structured_answers() {
        let briefs = shell(
            r#"echo 'Top stories: [{"title": "Hydration", "summary": "Drink water.", "url": "https://example.org/h"}] (2 sources)'"#,
        )
        .daily_health_briefs()
        .unwrap();
        assert_eq!(briefs.len(), 1);
        assert_eq!(briefs[0].title, "Hydration");
        assert_eq!(briefs[0].timestamp, "");

        let estimate = shell(
            r#"echo 'Sure: {"calories": 52, "protein": 0.3, "carbs": 14, "fat": 0.2, "advice": "Keep the peel."}'"#,
        )
        .nutrition_estimate("apple")
        .unwrap();
        assert_eq!(estimate.food, "apple");
        assert_eq!(estimate.calories, 52.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_gateway_failures_degrade() {
        crate::logging::init_test();
        let failing = shell("echo overloaded >&2; exit 3");
        assert!(matches!(
            failing.daily_inspiration(),
            Err(Error::RemoteUnavailable(msg)) if msg.contains("overloaded")
        ));
        assert!(matches!(
            shell("echo 'no numbers here'").nutrition_estimate("kale"),
            Err(Error::RemoteUnavailable(_))
        ));

        let missing = CommandGateway::new("kinetic-no-such-program", Vec::new());
        let assistant = Assistant::new(Box::new(missing) as Box<dyn AiGateway>);
        assert_eq!(assistant.daily_inspiration(), INSPIRATION_FALLBACK);
        assert_eq!(assistant.chat("", "hi").text, CHAT_FALLBACK);
    }

    #[test]
    fn test_command_gateway_from_argv() {
        let argv = vec!["llm".to_string(), "-m".to_string(), "mini".to_string()];
        assert_eq!(
            CommandGateway::from_argv(&argv),
            Some(CommandGateway::new("llm", vec!["-m".into(), "mini".into()]))
        );
        assert_eq!(CommandGateway::from_argv(&[]), None);
    }

    #[test]
    fn test_parse_nutrition() {
        let text = r#"{"food": "Banana", "calories": 105, "protein": 1.3, "carbs": 27, "fat": 0.4, "advice": "Good pre-workout."}"#;
        let estimate = parse_nutrition(text, "banana").unwrap();
        assert_eq!(estimate.food, "Banana");
        assert_eq!(estimate.carbs, 27.0);

        assert!(matches!(
            parse_nutrition("not json", "banana"),
            Err(Error::Json(_))
        ));
    }
}
