//! Geometric primitives for mark coordinates.
//!
//! Only what pdfmark needs: 2×3 affine matrices with point and distance
//! transforms, inversion for form XObjects, and corner-form rectangles.

/// A 2D point in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle given by two corner points, as in a PDF `/Rect` entry.
///
/// The corners are kept in the order they were written; no normalization
/// is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// First corner
    pub p: Point,
    /// Opposite corner
    pub q: Point,
}

impl Rect {
    /// Create a rectangle from two corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0);
    /// assert_eq!(rect.p.x, 10.0);
    /// assert_eq!(rect.q.y, 70.0);
    /// ```
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            p: Point::new(x0, y0),
            q: Point::new(x1, y1),
        }
    }

    /// The four coordinates in `[x0 y0 x1 y1]` order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.p.x, self.p.y, self.q.x, self.q.y]
    }
}

/// Transformation matrix.
///
/// Represents the affine transform `[a b c d e f]` mapping
/// `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scaling
    pub a: f64,
    /// Vertical skewing
    pub b: f64,
    /// Horizontal skewing
    pub c: f64,
    /// Vertical scaling
    pub d: f64,
    /// Horizontal translation
    pub e: f64,
    /// Vertical translation
    pub f: f64,
}

impl Matrix {
    /// Create an identity matrix.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Matrix;
    ///
    /// let m = Matrix::identity();
    /// assert_eq!(m.a, 1.0);
    /// assert_eq!(m.d, 1.0);
    /// assert_eq!(m.e, 0.0);
    /// ```
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Create a matrix from its six components.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Create a scaling matrix.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rescale a device-space matrix by per-axis factors.
    ///
    /// The x factor applies to `a`, `c` and `e`, the y factor to `b`, `d`
    /// and `f`, which maps device units onto a different resolution.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Matrix;
    ///
    /// let device = Matrix::new(10.0, 0.0, 0.0, 10.0, 100.0, 200.0);
    /// let m = device.rescaled(0.1, 0.1);
    /// assert!((m.a - 1.0).abs() < 1e-12);
    /// assert!((m.f - 20.0).abs() < 1e-12);
    /// ```
    pub fn rescaled(&self, xscale: f64, yscale: f64) -> Matrix {
        Matrix {
            a: self.a * xscale,
            b: self.b * yscale,
            c: self.c * xscale,
            d: self.d * yscale,
            e: self.e * xscale,
            f: self.f * yscale,
        }
    }

    /// Multiply this matrix with another matrix.
    ///
    /// The result represents first applying `self`, then applying `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point using this matrix (translation included).
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Matrix;
    ///
    /// let m = Matrix::new(1.0, 0.0, 0.0, 1.0, 10.0, 20.0);
    /// let p = m.transform_point(5.0, 10.0);
    /// assert_eq!(p.x, 15.0);
    /// assert_eq!(p.y, 30.0);
    /// ```
    pub fn transform_point(&self, x: f64, y: f64) -> Point {
        Point {
            x: self.a * x + self.c * y + self.e,
            y: self.b * x + self.d * y + self.f,
        }
    }

    /// Transform a distance vector (translation ignored).
    pub fn transform_distance(&self, dx: f64, dy: f64) -> Point {
        Point {
            x: self.a * dx + self.c * dy,
            y: self.b * dx + self.d * dy,
        }
    }

    /// Bounding box of a rectangle after transformation.
    ///
    /// All four corners are transformed; the result is normalized so that
    /// `p` is the lower-left and `q` the upper-right corner.
    pub fn transform_bbox(&self, rect: &Rect) -> Rect {
        let corners = [
            self.transform_point(rect.p.x, rect.p.y),
            self.transform_point(rect.p.x, rect.q.y),
            self.transform_point(rect.q.x, rect.p.y),
            self.transform_point(rect.q.x, rect.q.y),
        ];
        let mut out = Rect {
            p: corners[0],
            q: corners[0],
        };
        for c in &corners[1..] {
            out.p.x = out.p.x.min(c.x);
            out.p.y = out.p.y.min(c.y);
            out.q.x = out.q.x.max(c.x);
            out.q.y = out.q.y.max(c.y);
        }
        out
    }

    /// Get the determinant of this matrix.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse matrix, or `None` if the matrix is singular.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmark_oxide::geometry::Matrix;
    ///
    /// let m = Matrix::new(2.0, 0.0, 0.0, 4.0, 10.0, 20.0);
    /// let inv = m.invert().unwrap();
    /// let p = inv.transform_point(12.0, 24.0);
    /// assert!((p.x - 1.0).abs() < 1e-12);
    /// assert!((p.y - 1.0).abs() < 1e-12);
    /// ```
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}
