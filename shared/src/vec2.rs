/// 2D screen-space vector. Y grows downwards, matching SVG/canvas coordinates.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, ts_rs::TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset by `len` along the direction `angle` radians away from straight down.
    pub fn polar_offset(self, len: f64, angle: f64) -> Self {
        Self::new(self.x + len * angle.sin(), self.y + len * angle.cos())
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
