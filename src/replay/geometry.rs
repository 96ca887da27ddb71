// Track geometry: boundary derivation from the centerline and the
// world -> screen projection used for drawing and hit-testing

use serde::{Deserialize, Serialize};

/// Full width of the drawn track surface in world units
pub const TRACK_WIDTH: f64 = 200.;
/// Fraction of the surface left empty on each side
pub const SURFACE_PADDING: f64 = 0.05;

/// Represents a 2D coordinate point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Bounding box for coordinate calculations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_y..=self.max_y).contains(&point.y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Offsets every centerline point by `half_width` along its local left
/// normal, producing the `(inner, outer)` boundary curves.
///
/// The polyline is treated as closed: the tangent at point `i` is taken
/// between its neighbours with wrap-around at both ends. Points whose
/// neighbours coincide have no defined normal and produce no boundary
/// point, so the boundaries can be shorter than the centerline.
pub fn compute_boundaries(centerline: &[Point], half_width: f64) -> (Vec<Point>, Vec<Point>) {
    let n = centerline.len();
    let mut inner = Vec::with_capacity(n);
    let mut outer = Vec::with_capacity(n);

    for (i, point) in centerline.iter().enumerate() {
        let prev = centerline[if i == 0 { n - 1 } else { i - 1 }];
        let next = centerline[if i == n - 1 { 0 } else { i + 1 }];

        let dx = next.x - prev.x;
        let dy = next.y - prev.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= 0. || !len.is_finite() {
            continue;
        }

        let nx = -dy / len;
        let ny = dx / len;
        inner.push(Point::new(point.x - nx * half_width, point.y - ny * half_width));
        outer.push(Point::new(point.x + nx * half_width, point.y + ny * half_width));
    }

    (inner, outer)
}

/// Axis-aligned bounds over the union of all given point sets.
pub fn compute_bounds(point_sets: &[&[Point]]) -> BoundingBox {
    let mut bounds = BoundingBox::new();
    point_sets
        .iter()
        .flat_map(|set| set.iter())
        .for_each(|p| bounds.update(*p));
    bounds
}

/// Uniform scale and translation fitting the world bounds onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            scale: 1.,
            offset_x: 0.,
            offset_y: 0.,
        }
    }
}

/// Fits `bounds` into a `surface_width` x `surface_height` surface, keeping
/// `padding` of each dimension free on both sides and centering the world
/// bounding box on the surface.
pub fn compute_projection(
    bounds: &BoundingBox,
    surface_width: f64,
    surface_height: f64,
    padding: f64,
) -> Projection {
    if bounds.is_empty() {
        return Projection::default();
    }

    let usable_width = surface_width * (1. - 2. * padding);
    let usable_height = surface_height * (1. - 2. * padding);

    // a flat world only constrains the other axis
    let scale_x = if bounds.width() > 0. {
        usable_width / bounds.width()
    } else {
        f64::INFINITY
    };
    let scale_y = if bounds.height() > 0. {
        usable_height / bounds.height()
    } else {
        f64::INFINITY
    };
    let mut scale = scale_x.min(scale_y);
    if !scale.is_finite() || scale <= 0. {
        scale = 1.;
    }

    let center = bounds.center();
    Projection {
        scale,
        offset_x: surface_width / 2. - scale * center.x,
        offset_y: surface_height / 2. - scale * center.y,
    }
}

/// World -> screen mapping: rotation about the world center followed by
/// the projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub rotation_degrees: f64,
    pub world_center: Point,
    pub projection: Projection,
}

impl ScreenTransform {
    pub fn world_to_screen(&self, point: Point) -> Point {
        let mut x = point.x;
        let mut y = point.y;

        if self.rotation_degrees != 0. {
            let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
            let tx = x - self.world_center.x;
            let ty = y - self.world_center.y;
            x = tx * cos - ty * sin + self.world_center.x;
            y = tx * sin + ty * cos + self.world_center.y;
        }

        Point::new(
            x * self.projection.scale + self.projection.offset_x,
            y * self.projection.scale + self.projection.offset_y,
        )
    }

    /// Inverse of the projection only. The circuit rotation is not undone,
    /// so for rotated circuits the result is in the rotated frame.
    pub fn screen_to_world(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.projection.offset_x) / self.projection.scale,
            (point.y - self.projection.offset_y) / self.projection.scale,
        )
    }
}

/// Everything derived from the track layout that the renderer needs.
/// Rebuilt when the layout changes; only the projection is redone on resize.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGeometry {
    pub centerline: Vec<Point>,
    pub inner: Vec<Point>,
    pub outer: Vec<Point>,
    pub world_bounds: BoundingBox,
    pub projection: Projection,
    pub rotation_degrees: f64,
}

impl TrackGeometry {
    pub fn new(
        centerline: Vec<Point>,
        rotation_degrees: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> Self {
        let (inner, outer) = compute_boundaries(&centerline, TRACK_WIDTH / 2.);
        let world_bounds = compute_bounds(&[&centerline, &inner, &outer]);
        let projection =
            compute_projection(&world_bounds, surface_width, surface_height, SURFACE_PADDING);
        Self {
            centerline,
            inner,
            outer,
            world_bounds,
            projection,
            rotation_degrees,
        }
    }

    pub fn resize(&mut self, surface_width: f64, surface_height: f64) {
        self.projection = compute_projection(
            &self.world_bounds,
            surface_width,
            surface_height,
            SURFACE_PADDING,
        );
    }

    pub fn transform(&self) -> ScreenTransform {
        ScreenTransform {
            rotation_degrees: self.rotation_degrees,
            world_center: if self.world_bounds.is_empty() {
                Point::default()
            } else {
                self.world_bounds.center()
            },
            projection: self.projection,
        }
    }
}
