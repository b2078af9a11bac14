// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod intention;
pub mod place;
pub mod routine;
pub mod user;

pub use intention::PrayerIntention;
pub use place::{GeoPoint, Parish};
pub use routine::{ActionLink, NewRoutineItem, RoutineIcon, RoutineItem, TimeOfDay};
pub use user::{AuthSession, OnboardingData, SubscriptionStatus, UserProfile};
