// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod assistant;
pub mod content;
pub mod coordinator;
pub mod gemini;
pub mod onboarding;
pub mod places;
pub mod routine;
pub mod session;

pub use assistant::{AssistantService, DirectorReply};
pub use content::{ContentError, ContentService};
pub use coordinator::{OptimisticCoordinator, PrayOutcome, ToggleOutcome};
pub use gemini::{GeminiClient, GenerationError};
pub use onboarding::{complete_onboarding, OnboardingResult};
pub use places::{LookupError, PlacesService};
pub use routine::{GeneratedPlan, RoutineGenerator};
pub use session::{SessionManager, SessionMode};
