//! Conversational and short-text generation capabilities.
//!
//! Every method returns usable text. Failures of the generative API are
//! logged and replaced by fixed devotional fallbacks.

use crate::models::UserProfile;
use crate::services::gemini::{GeminiClient, GenerateRequest, GenerationError};
use crate::text_utils::{clean_or, clean_output};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const CHAT_FALLBACK: &str = "Um momento de oração silenciosa. Em breve voltaremos a conversar.";
const CHAT_EMPTY: &str = "Deus te abençoe.";
const THEME_FALLBACK: &str = "Buscai as coisas do alto.";
const REFLECTION_FALLBACK: &str = "A paz de Cristo esteja convosco.";
const DIRECTOR_FALLBACK_REFLECTION: &str = "Deus olha para o seu coração com amor.";
const DIRECTOR_FALLBACK_VERSE: &str = "Salmo 23";

/// Structured reply of the spiritual director.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorReply {
    pub reflection: String,
    pub verse: String,
}

impl DirectorReply {
    fn fallback() -> Self {
        Self {
            reflection: DIRECTOR_FALLBACK_REFLECTION.to_string(),
            verse: DIRECTOR_FALLBACK_VERSE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AssistantService {
    client: Option<GeminiClient>,
    model: String,
}

impl AssistantService {
    pub fn new(client: Option<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate free text with an optional system instruction.
    ///
    /// Never fails: any error yields `fallback`.
    pub async fn generate_text(
        &self,
        prompt: &str,
        context: Option<&str>,
        fallback: &str,
    ) -> String {
        match self.call(prompt, context, None).await {
            Ok(text) => clean_output(&text),
            Err(GenerationError::Unavailable) => fallback.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Text generation failed, using fallback");
                fallback.to_string()
            }
        }
    }

    /// Reply to a chat message from `user`.
    pub async fn send_message(&self, message: &str, user: Option<&UserProfile>) -> String {
        let instruction = chat_instruction(user);
        match self.call(message, Some(&instruction), None).await {
            Ok(text) => clean_or(Some(&text), CHAT_EMPTY),
            Err(e) => {
                tracing::warn!(error = %e, "Assistant chat failed, using fallback");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// One short poetic line summarizing the day's gospel.
    pub async fn daily_theme(&self, gospel: &str) -> String {
        let prompt = format!(
            "Resuma este Evangelho em uma frase curta e poética (max 10 palavras) em Português: {}",
            gospel
        );
        self.generate_text(&prompt, None, THEME_FALLBACK).await
    }

    /// A short Catholic reflection inspired by the saint of the day.
    pub async fn daily_reflection(&self, saint: &str) -> String {
        let prompt = format!(
            "Gere uma frase católica inspirada em {}. Max 20 palavras.",
            saint
        );
        self.generate_text(&prompt, None, REFLECTION_FALLBACK).await
    }

    /// Reflection plus a related verse, as structured JSON.
    pub async fn spiritual_director(&self, message: &str) -> DirectorReply {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "reflection": { "type": "STRING", "description": "Breve reflexão espiritual" },
                "verse": { "type": "STRING", "description": "Versículo bíblico relacionado" }
            },
            "required": ["reflection", "verse"]
        });
        let instruction =
            "Irmão na fé. Responda em JSON com { 'reflection': '...', 'verse': '...' }.";

        let reply = self
            .call(message, Some(instruction), Some(schema))
            .await
            .and_then(|text| {
                serde_json::from_str::<DirectorReply>(&text)
                    .map_err(|e| GenerationError::Malformed(e.to_string()))
            });

        match reply {
            Ok(reply) => DirectorReply {
                reflection: clean_or(Some(&reply.reflection), DIRECTOR_FALLBACK_REFLECTION),
                verse: clean_or(Some(&reply.verse), DIRECTOR_FALLBACK_VERSE),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Spiritual director failed, using fallback");
                DirectorReply::fallback()
            }
        }
    }

    async fn call(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String, GenerationError> {
        let client = self.client.as_ref().ok_or(GenerationError::Unavailable)?;
        client
            .generate_content(GenerateRequest {
                model: &self.model,
                prompt,
                system_instruction,
                response_schema,
            })
            .await
    }
}

fn chat_instruction(user: Option<&UserProfile>) -> String {
    let context = match user {
        Some(user) => format!(
            "Usuário: {}. Luta: {}. Santo: {}.",
            user.name,
            user.spiritual_focus.as_deref().unwrap_or("não informada"),
            user.patron_saint.as_deref().unwrap_or("não informado"),
        ),
        None => "Irmão em busca de luz.".to_string(),
    };
    format!(
        "Você é um assistente católico humilde e acolhedor.\n\
         RESPONDA SEMPRE EM PORTUGUÊS DO BRASIL.\n\
         Seu tom deve ser de um irmão que caminha junto, nunca autoritário.\n\
         Não use negritos ou asteriscos na resposta.\n\
         Contexto: {}",
        context
    )
}
