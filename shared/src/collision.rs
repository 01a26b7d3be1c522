use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::LayoutConfig;
use crate::error::ParamError;
use crate::motion::bob_position;
use crate::pendulum::Pendulum;

/// First pair of bobs found closer than the collision threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct CollisionPair {
    pub first_id: String,
    pub second_id: String,
    /// Projected distance (px) at the scan instant
    pub distance: f64,
}

/// Scan every unordered pair of bobs at a single instant `now_ms`.
///
/// Pendulums are projected in slice order. Pairs are visited by ascending `i`
/// then ascending `j > i`, and the first pair strictly closer than
/// `layout.collision_threshold` is returned. O(n^2), fine for tens of pendulums.
pub fn find_collision(
    pendulums: &[Pendulum],
    layout: &LayoutConfig,
    now_ms: i64,
) -> Result<Option<CollisionPair>, ParamError> {
    let positions = pendulums
        .iter()
        .enumerate()
        .map(|(index, p)| bob_position(p, index, layout, now_ms))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, a) in positions.iter().enumerate() {
        for (j, b) in positions.iter().enumerate().skip(i + 1) {
            let distance = a.distance(*b);
            if distance < layout.collision_threshold {
                return Ok(Some(CollisionPair {
                    first_id: pendulums[i].id.clone(),
                    second_id: pendulums[j].id.clone(),
                    distance,
                }));
            }
        }
    }

    Ok(None)
}
