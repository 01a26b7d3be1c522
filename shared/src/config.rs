/// Screen layout shared by the collision check and every renderer.
///
/// Pendulums hang from one horizontal ceiling line, evenly spaced from left to
/// right in enumeration order. Renderers must use these exact numbers or a
/// displayed near-miss will disagree with a triggered collision.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// X of the first anchor (px)
    pub x_offset: f64,
    /// Horizontal distance between neighbouring anchors (px)
    pub spacing: f64,
    /// Y of the ceiling line all anchors sit on (px)
    pub ceiling_y: f64,
    /// Pixels per meter of arm length
    pub scale: f64,
    /// Bobs closer than this (px) count as colliding
    pub collision_threshold: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_offset: 100.0,
            spacing: 120.0,
            ceiling_y: 40.0,
            scale: 10.0,            // 1 m = 10 px
            collision_threshold: 10.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.x_offset.is_finite() {
            return Err("x_offset must be finite".to_string());
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err("spacing must be finite and >= 0".to_string());
        }
        if !self.ceiling_y.is_finite() {
            return Err("ceiling_y must be finite".to_string());
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be finite and > 0".to_string());
        }
        if !self.collision_threshold.is_finite() || self.collision_threshold < 0.0 {
            return Err("collision_threshold must be finite and >= 0".to_string());
        }
        Ok(())
    }

    /// Anchor point for the pendulum at `index` in enumeration order.
    pub fn anchor(&self, index: usize) -> crate::vec2::Vec2 {
        crate::vec2::Vec2::new(self.x_offset + index as f64 * self.spacing, self.ceiling_y)
    }
}
