// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Personalized routine generation.
//!
//! Handles the onboarding workflow:
//! 1. Build a prompt from the user's state of life, struggle and patron saint
//! 2. Request JSON constrained to the routine schema
//! 3. Validate and sanitize every item, assigning fresh ids
//! 4. Fall back to a fixed three-item routine on any failure

use crate::models::routine::every_day;
use crate::models::{ActionLink, OnboardingData, RoutineIcon, RoutineItem, TimeOfDay};
use crate::services::gemini::{GeminiClient, GenerateRequest, GenerationError};
use crate::text_utils::{clean_or, clean_output};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

const FALLBACK_DESCRIPTION: &str = "Buscador de Deus";
const FALLBACK_REASONING: &str = "Um caminho de paz e constância para sua jornada.";

/// Generated routine plus the profile texts shown after onboarding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub routine: Vec<RoutineItem>,
    pub profile_description: String,
    pub profile_reasoning: String,
}

/// Turns onboarding answers into a routine. Never fails; degrades to
/// [`fallback_plan`].
#[derive(Clone)]
pub struct RoutineGenerator {
    client: Option<GeminiClient>,
    model: String,
}

impl RoutineGenerator {
    pub fn new(client: Option<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate a routine for the given onboarding answers.
    pub async fn generate(&self, data: &OnboardingData) -> GeneratedPlan {
        match self.try_generate(data).await {
            Ok(plan) => {
                tracing::info!(items = plan.routine.len(), "Generated personalized routine");
                plan
            }
            Err(GenerationError::Unavailable) => {
                tracing::info!("Generative API not configured, using fallback routine");
                fallback_plan()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Routine generation failed, using fallback routine");
                fallback_plan()
            }
        }
    }

    async fn try_generate(&self, data: &OnboardingData) -> Result<GeneratedPlan, GenerationError> {
        let client = self.client.as_ref().ok_or(GenerationError::Unavailable)?;
        let prompt = build_prompt(data);
        let text = client
            .generate_content(GenerateRequest {
                model: &self.model,
                prompt: &prompt,
                system_instruction: None,
                response_schema: Some(routine_schema()),
            })
            .await?;
        parse_plan(&text)
    }
}

/// Prompt embedding the user's answers.
pub fn build_prompt(data: &OnboardingData) -> String {
    format!(
        "Crie um caminho de fé simples para {}.\n\
         - Estado: {}\n\
         - Luta principal: {}\n\
         - Guia: {}\n\n\
         RETORNE APENAS JSON.",
        data.name.trim(),
        data.state_of_life.trim(),
        data.primary_struggle.trim(),
        data.patron_saint.trim(),
    )
}

/// Response schema the generator is constrained to.
pub fn routine_schema() -> Value {
    let icons: Vec<&str> = RoutineIcon::ALL.iter().map(|i| i.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "profileDescription": { "type": "STRING" },
            "profileReasoning": { "type": "STRING" },
            "routine": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "xpReward": { "type": "NUMBER" },
                        "icon": { "type": "STRING", "description": icons.join(", ") },
                        "timeOfDay": { "type": "STRING", "description": "morning, afternoon, night" },
                        "dayOfWeek": { "type": "ARRAY", "items": { "type": "INTEGER" } },
                        "actionLink": { "type": "STRING", "description": "READ_LITURGY, OPEN_MAP, NONE" }
                    },
                    "required": ["title", "description", "xpReward", "icon", "timeOfDay", "dayOfWeek"]
                }
            }
        },
        "required": ["profileDescription", "profileReasoning", "routine"]
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    #[serde(default)]
    profile_description: Option<String>,
    #[serde(default)]
    profile_reasoning: Option<String>,
    #[serde(default)]
    routine: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    title: String,
    description: String,
    xp_reward: f64,
    icon: String,
    time_of_day: String,
    day_of_week: Vec<i64>,
    #[serde(default)]
    action_link: Option<String>,
}

impl RawItem {
    /// Validate against the schema vocabulary and sanitize text.
    fn into_item(self) -> Result<RoutineItem, String> {
        let title = clean_output(&self.title);
        if title.is_empty() {
            return Err("empty title".to_string());
        }
        let xp = self.xp_reward.round();
        if !xp.is_finite() || xp < 1.0 || xp > f64::from(u32::MAX) {
            return Err(format!("invalid xpReward {}", self.xp_reward));
        }
        let icon: RoutineIcon = self.icon.parse().map_err(|e| format!("{e}"))?;
        let time_of_day: TimeOfDay = self.time_of_day.parse().map_err(|e| format!("{e}"))?;
        let day_of_week = self
            .day_of_week
            .iter()
            .map(|d| u8::try_from(*d).ok().filter(|d| *d <= 6))
            .collect::<Option<BTreeSet<u8>>>()
            .ok_or_else(|| format!("invalid dayOfWeek {:?}", self.day_of_week))?;
        let action_link = self
            .action_link
            .as_deref()
            .map(|raw| raw.parse().unwrap_or_default())
            .unwrap_or(ActionLink::None);

        Ok(RoutineItem {
            id: new_item_id(),
            title,
            description: clean_output(&self.description),
            xp_reward: xp as u32,
            completed: false,
            icon,
            time_of_day,
            day_of_week,
            action_link,
        })
    }
}

/// Parse a generation response into a plan.
///
/// Items failing validation are dropped; if none survive the response counts
/// as empty. Every surviving item gets a fresh id and `completed = false`.
pub fn parse_plan(text: &str) -> Result<GeneratedPlan, GenerationError> {
    let raw: RawPlan = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let items = raw.routine.unwrap_or_default();
    if items.is_empty() {
        return Err(GenerationError::EmptyRoutine);
    }

    let total = items.len();
    let routine: Vec<RoutineItem> = items
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value::<RawItem>(value)
                .map_err(|e| e.to_string())
                .and_then(RawItem::into_item)
                .map_err(|reason| tracing::debug!(reason, "Dropping invalid routine item"))
                .ok()
        })
        .collect();

    if routine.is_empty() {
        return Err(GenerationError::EmptyRoutine);
    }
    if routine.len() < total {
        tracing::warn!(kept = routine.len(), total, "Dropped invalid generated routine items");
    }

    Ok(GeneratedPlan {
        routine,
        profile_description: clean_or(raw.profile_description.as_deref(), FALLBACK_DESCRIPTION),
        profile_reasoning: clean_or(raw.profile_reasoning.as_deref(), FALLBACK_REASONING),
    })
}

/// Fixed routine used whenever generation is unavailable or unusable.
pub fn fallback_plan() -> GeneratedPlan {
    let item = |title: &str, description: &str, xp_reward, icon, time_of_day, action_link| {
        RoutineItem {
            id: new_item_id(),
            title: title.to_string(),
            description: description.to_string(),
            xp_reward,
            completed: false,
            icon,
            time_of_day,
            day_of_week: every_day(),
            action_link,
        }
    };

    GeneratedPlan {
        routine: vec![
            item(
                "Oração da Manhã",
                "Entregar o dia ao Senhor",
                20,
                RoutineIcon::Sun,
                TimeOfDay::Morning,
                ActionLink::None,
            ),
            item(
                "Evangelho do Dia",
                "Escutar a voz de Jesus",
                30,
                RoutineIcon::Book,
                TimeOfDay::Morning,
                ActionLink::ReadLiturgy,
            ),
            item(
                "Exame de Consciência",
                "Revisar o dia com gratidão",
                20,
                RoutineIcon::Moon,
                TimeOfDay::Night,
                ActionLink::None,
            ),
        ],
        profile_description: FALLBACK_DESCRIPTION.to_string(),
        profile_reasoning: FALLBACK_REASONING.to_string(),
    }
}

fn new_item_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Drop a surrounding ```json fence if the model added one anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
