use serde::Serialize;

use crate::geo::haversine_km;
use crate::matching::MAX_LIVE_DELIVERIES;
use crate::models::announcement::{Announcement, Priority};
use crate::models::user::{GeoPoint, UserAccount};

const DISTANCE_WEIGHT: f64 = 0.40;
const LOAD_WEIGHT: f64 = 0.30;
const RATING_WEIGHT: f64 = 0.20;
const PRIORITY_WEIGHT: f64 = 0.10;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub load_score: f64,
    pub rating_score: f64,
    pub priority_score: f64,
}

pub fn compute_score(
    deliverer: &UserAccount,
    location: &GeoPoint,
    live_load: usize,
    announcement: &Announcement,
) -> (f64, ScoreBreakdown) {
    let distance_km = haversine_km(location, &announcement.pickup);

    let breakdown = ScoreBreakdown {
        distance_score: distance_score(distance_km),
        load_score: load_score(live_load),
        rating_score: rating_score(deliverer.effective_rating()),
        priority_score: priority_score(&announcement.priority),
    };

    let score = weighted_score(&breakdown);
    (score, breakdown)
}

pub fn weighted_score(breakdown: &ScoreBreakdown) -> f64 {
    (breakdown.distance_score * DISTANCE_WEIGHT)
        + (breakdown.load_score * LOAD_WEIGHT)
        + (breakdown.rating_score * RATING_WEIGHT)
        + (breakdown.priority_score * PRIORITY_WEIGHT)
}

fn distance_score(distance_km: f64) -> f64 {
    1.0 / (1.0 + distance_km.max(0.0))
}

fn load_score(live_load: usize) -> f64 {
    let utilization = live_load as f64 / MAX_LIVE_DELIVERIES as f64;
    (1.0 - utilization).clamp(0.0, 1.0)
}

fn rating_score(rating: f64) -> f64 {
    (rating / 5.0).clamp(0.0, 1.0)
}

fn priority_score(priority: &Priority) -> f64 {
    match priority {
        Priority::Low => 0.5,
        Priority::Normal => 0.7,
        Priority::High => 0.85,
        Priority::Urgent => 1.0,
    }
}
