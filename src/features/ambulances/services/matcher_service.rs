use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use super::ResourceRegistry;
use crate::core::error::Result;
use crate::features::ambulances::models::Candidate;
use crate::shared::geo::{distance, Coordinate};

/// Nearest candidate for a pickup point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub ambulance_id: Uuid,
    pub distance_km: f64,
}

/// Pure nearest-candidate selection.
///
/// Ties on distance go to the lowest ambulance id so repeated runs over the
/// same snapshot pick the same ambulance.
pub fn select_nearest(pickup: Coordinate, candidates: &[Candidate]) -> Option<Match> {
    candidates
        .iter()
        .map(|c| Match {
            ambulance_id: c.id,
            distance_km: distance(pickup, c.position),
        })
        .min_by(|a, b| match a.distance_km.total_cmp(&b.distance_km) {
            Ordering::Equal => a.ambulance_id.cmp(&b.ambulance_id),
            other => other,
        })
}

/// Reads the candidate snapshot from the registry and picks the nearest.
///
/// The result is a hint; the caller still has to win the claim.
pub struct DispatchMatcher {
    registry: Arc<ResourceRegistry>,
}

impl DispatchMatcher {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry }
    }

    pub async fn find_nearest(&self, pickup: Coordinate) -> Result<Option<Match>> {
        let candidates = self.registry.list_candidates().await?;
        let selected = select_nearest(pickup, &candidates);

        match &selected {
            Some(m) => tracing::debug!(
                "Nearest ambulance to {} is {} at {:.3} km ({} candidates)",
                pickup,
                m.ambulance_id,
                m.distance_km,
                candidates.len()
            ),
            None => tracing::debug!("No candidate ambulances for pickup {}", pickup),
        }

        Ok(selected)
    }
}
