use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }
}

impl From<[f64; 3]> for Point {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Point { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A tag that has been seen for the first time, expressed in the target frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocatedObject {
    /// Decimal tag id.
    pub label: String,
    pub frame: String,
    pub position: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Cube,
    Sphere,
    Cylinder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerAction {
    Add,
    Delete,
}

/// Display marker for a located tag. Markers sharing `namespace` and `id` replace each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualizationMarker {
    pub namespace: String,
    pub id: i32,
    pub frame: String,
    pub kind: MarkerKind,
    pub action: MarkerAction,
    pub position: Point,
    pub orientation: Quaternion,
    pub scale: Point,
    pub color: Color,
    /// Seconds until the marker expires, `None` keeps it forever.
    pub lifetime: Option<f64>,
}

impl VisualizationMarker {
    pub const NAMESPACE: &'static str = "basic_shapes";
    pub const SCALE: f64 = 0.2;
    pub const GREEN: Color = Color {
        r: 0.0,
        g: 1.0,
        b: 0.0,
        a: 1.0,
    };

    /// Solid green cylinder standing on the ground plane below `position`.
    pub fn cylinder(id: i32, frame: impl Into<String>, position: Point) -> Self {
        VisualizationMarker {
            namespace: Self::NAMESPACE.to_string(),
            id,
            frame: frame.into(),
            kind: MarkerKind::Cylinder,
            action: MarkerAction::Add,
            position: Point::new(position.x, position.y, 0.0),
            orientation: Quaternion::IDENTITY,
            scale: Point::new(Self::SCALE, Self::SCALE, Self::SCALE),
            color: Self::GREEN,
            lifetime: None,
        }
    }
}

impl LocatedObject {
    pub fn new(id: i32, frame: impl Into<String>, position: Point) -> Self {
        LocatedObject {
            label: id.to_string(),
            frame: frame.into(),
            position,
        }
    }

    pub fn marker(&self, id: i32) -> VisualizationMarker {
        VisualizationMarker::cylinder(id, self.frame.clone(), self.position)
    }
}
