//! Onboarding: register, generate a routine, then store both.

use crate::error::SessionError;
use crate::models::{AuthSession, OnboardingData, RoutineItem};
use crate::services::content::ContentService;
use crate::services::routine::RoutineGenerator;
use crate::services::session::SessionManager;
use chrono::Utc;
use serde::Serialize;

/// Everything the client needs after onboarding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResult {
    pub session: AuthSession,
    pub routine: Vec<RoutineItem>,
    pub profile_reasoning: String,
}

/// Register the user and seed their profile and routine.
///
/// Registration errors abort. Generation never fails, and a failed routine
/// save is logged since the routine is still returned to the caller.
pub async fn complete_onboarding(
    sessions: &SessionManager,
    content: &ContentService,
    generator: &RoutineGenerator,
    data: &OnboardingData,
) -> Result<OnboardingResult, SessionError> {
    let session = sessions.register(data).await?;
    let plan = generator.generate(data).await;

    let mut profile = session.user.clone();
    profile.spiritual_maturity = Some(plan.profile_description.clone());
    profile.last_routine_update = Utc::now();
    let profile = sessions.update_profile(profile).await?;

    if let Err(e) = content.save_routine(&profile.id, &plan.routine).await {
        tracing::warn!(user_id = %profile.id, error = %e, "Failed to save generated routine");
    }

    tracing::info!(
        user_id = %profile.id,
        items = plan.routine.len(),
        "Onboarding complete"
    );

    Ok(OnboardingResult {
        session: AuthSession {
            user: profile,
            ..session
        },
        routine: plan.routine,
        profile_reasoning: plan.profile_reasoning,
    })
}
