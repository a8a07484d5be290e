// Wire data types shared with the simulation backend
//
// Field names follow the backend's JSON (camelCase for most records,
// snake_case for the draft). Every record is a concrete struct so that a
// malformed payload fails at decode time instead of at the render site.

use serde::{Deserialize, Deserializer, Serialize};

/// Email draft submitted for simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub cta: String,
    /// Opaque audience identifier (e.g. "marketing-managers")
    pub audience: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
}

fn default_sample_size() -> u32 {
    10
}

/// A synthetic recipient profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub psychographics: String,
    #[serde(default)]
    pub past_behavior: String,
}

/// What a persona did with the email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Opened,
    Ignored,
    Clicked,
    Spam,
    Replied,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Opened => "opened",
            Action::Ignored => "ignored",
            Action::Clicked => "clicked",
            Action::Spam => "spam",
            Action::Replied => "replied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

/// One persona's simulated reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    pub persona: Persona,
    pub action: Action,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub comment: String,
    /// Why the persona took this action
    #[serde(default)]
    pub detailed_reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Positive,
    Negative,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
}

/// Aggregate rates, each a whole percentage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationMetrics {
    pub open_rate: u32,
    pub click_rate: u32,
    pub reply_rate: u32,
    pub spam_rate: u32,
    pub ignore_rate: u32,
    pub forward_rate: u32,
    /// Share of recipients who read attentively
    pub read_rate: u32,
}

/// Terminal payload of a successful run
///
/// Fields other than `id` default when absent so a partial result from an
/// older backend still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub metrics: SimulationMetrics,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub responses: Vec<SimulationResponse>,
}

/// Audience as listed by `GET /api/audiences`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    /// Database row id; numeric on the wire, kept as text here
    #[serde(deserialize_with = "number_or_string")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub personas: Vec<Persona>,
}

/// Accept an identifier sent either as a JSON number or a string
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Headline rates stored alongside a history entry
///
/// The backend stores the full metrics object; only the two rates shown in
/// listings are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryMetrics {
    pub open_rate: u32,
    pub click_rate: u32,
}

/// One row of `GET /api/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: i64,
    pub subject: String,
    #[serde(default)]
    pub metrics: HistoryMetrics,
    #[serde(default)]
    pub audience: String,
}

/// Full stored run from `GET /api/history/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationDetail {
    pub id: String,
    pub timestamp: i64,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default)]
    pub metrics: SimulationMetrics,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub responses: Vec<SimulationResponse>,
}

impl SimulationDetail {
    /// View the stored run as a result so it renders like a live one
    pub fn to_result(&self) -> SimulationResult {
        SimulationResult {
            id: self.id.clone(),
            timestamp: self.timestamp,
            metrics: self.metrics,
            insights: self.insights.clone(),
            responses: self.responses.clone(),
        }
    }
}

/// Body of `/health` and `DELETE /api/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
}
