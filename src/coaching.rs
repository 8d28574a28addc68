// src/coaching.rs
//
// Async HTTP client that asks an external chat-completion endpoint to
// phrase the coaching report as prose. The analysis itself is already
// done; the model only rewords it. When no endpoint is configured or the
// call fails, a rule-based fallback builds the text locally so a report
// is always produced.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::report::DriverReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingConfig {
    /// Chat-completion endpoint URL. `None` disables remote generation.
    pub endpoint: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "llama-3.3-70b-versatile".to_string(),
            timeout_secs: 30,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

// ============================================================================
// REQUEST / RESPONSE TYPES (chat-completion wire format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Generated coaching prose plus provenance.
#[derive(Debug, Clone, Serialize)]
pub struct CoachingReport {
    pub coaching_text: String,
    pub generated_by: String,
    pub model: Option<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct CoachingClient {
    config: CoachingConfig,
    http_client: reqwest::Client,
}

impl CoachingClient {
    pub fn new(config: CoachingConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Produce coaching prose for a driver report. Falls back to local
    /// templating whenever the remote call is unavailable or fails; this
    /// never returns an error.
    pub async fn coaching_report(&self, report: &DriverReport) -> CoachingReport {
        let Some(endpoint) = &self.config.endpoint else {
            return fallback_coaching(report);
        };

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert race engineer providing coaching to \
                              professional drivers. Be specific, actionable, and encouraging."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(report),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        info!(vehicle = %report.vehicle_id, "requesting coaching text");

        match self.http_client.post(endpoint).json(&request).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<ChatResponse>().await {
                Ok(parsed) => match parsed.choices.into_iter().next() {
                    Some(choice) => CoachingReport {
                        coaching_text: choice.message.content,
                        generated_by: "AI".to_string(),
                        model: Some(self.config.model.clone()),
                    },
                    None => {
                        warn!("coaching endpoint returned no choices, using fallback");
                        fallback_coaching(report)
                    }
                },
                Err(e) => {
                    warn!("failed to parse coaching response: {e}");
                    fallback_coaching(report)
                }
            },
            Ok(resp) => {
                warn!("coaching endpoint error {}", resp.status());
                fallback_coaching(report)
            }
            Err(e) => {
                warn!("failed to reach coaching endpoint: {e}");
                fallback_coaching(report)
            }
        }
    }
}

/// Prompt assembled from the merged analysis, mirroring what the report
/// already states numerically.
fn build_prompt(report: &DriverReport) -> String {
    let ideal = &report.ideal_lap;
    let fmt = |v: Option<f64>| {
        v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "N/A".to_string())
    };

    format!(
        "Analyze this driver's performance and provide coaching:\n\n\
         DRIVER: {}\n\n\
         LAP ANALYSIS:\n\
         - Current Average Lap: {}s\n\
         - Realistic Target Lap: {}s\n\
         - Potential Gain: {}s\n\
         - Confidence: {}\n\n\
         ANOMALY ANALYSIS:\n\
         - Anomalies Detected: {}\n\
         - High Severity: {}\n\
         - Signals Affected: {}\n\
         - Key Recommendation: {}\n\n\
         Provide 3 specific coaching points for the next session.",
        report.vehicle_id,
        fmt(ideal.current_avg_lap),
        fmt(ideal.siwtl_lap),
        fmt(ideal.potential_gain_sec),
        ideal.confidence_level.as_str(),
        report.summary.total_anomalies,
        report.summary.high_severity_count,
        report.summary.signals_affected.join(", "),
        report.summary.recommendation,
    )
}

/// Deterministic coaching text assembled from the analysis alone.
fn fallback_coaching(report: &DriverReport) -> CoachingReport {
    let mut lines = vec![format!("Coaching summary for {}:", report.vehicle_id)];

    lines.push(format!("- {}", report.summary.recommendation));

    if let (Some(gain), Some(target)) = (
        report.ideal_lap.potential_gain_sec,
        report.ideal_lap.siwtl_lap,
    ) {
        lines.push(format!(
            "- A realistic target lap is {target:.3}s, {gain:.3}s under the current average."
        ));
    } else {
        lines.push("- Not enough valid laps yet for a reliable target lap.".to_string());
    }

    if let Some(worst) = report.anomalies.first() {
        lines.push(format!(
            "- Biggest single issue: {} (severity {:.1}). {}",
            worst.description, worst.severity, worst.recommended_action
        ));
    }

    CoachingReport {
        coaching_text: lines.join("\n"),
        generated_by: "Rule-based fallback".to_string(),
        model: None,
    }
}
