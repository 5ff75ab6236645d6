/// Scattered-data interpolation on a Delaunay triangulation.
///
/// `Triangulation` is a Bowyer-Watson Delaunay triangulation of planar
/// points. `CloughTocher` fits a piecewise cubic, C1-continuous surface over
/// it: each triangle is split at its centroid into three cubic Bezier
/// patches, with vertex gradients estimated globally by minimizing the
/// second derivative along every edge. Points outside the convex hull have
/// no value; the surface is never extrapolated.

use std::collections::{BTreeMap, BTreeSet};

pub type Point = [f64; 2];

/// Barycentric coordinates below this are treated as outside a triangle.
const BARY_EPS: f64 = 1e-10;

const GRADIENT_TOL: f64 = 1e-6;
const GRADIENT_MAX_ITER: usize = 400;

// ---------------------------------------------------------------------------
// Delaunay triangulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<Point>,
    /// Counter-clockwise vertex triples.
    triangles: Vec<[usize; 3]>,
    /// `neighbors[t][k]` is the triangle across the edge opposite vertex `k`.
    neighbors: Vec<[Option<usize>; 3]>,
}

/// Positive when `p` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `a, b, c`.
fn in_circle(a: Point, b: Point, c: Point, p: Point) -> f64 {
    let (adx, ady) = (a[0] - p[0], a[1] - p[1]);
    let (bdx, bdy) = (b[0] - p[0], b[1] - p[1]);
    let (cdx, cdy) = (c[0] - p[0], c[1] - p[1]);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;
    alift * (bdx * cdy - cdx * bdy) + blift * (cdx * ady - adx * cdy) + clift * (adx * bdy - bdx * ady)
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl Triangulation {
    /// Triangulates `points`. Exact duplicates must already be removed.
    /// Returns `None` for fewer than three points or when every point is
    /// collinear, since no triangle can be formed.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        let n = points.len();
        if n < 3 {
            return None;
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &points {
            min_x = min_x.min(p[0]);
            min_y = min_y.min(p[1]);
            max_x = max_x.max(p[0]);
            max_y = max_y.max(p[1]);
        }
        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

        // Super-triangle vertices live after the real points
        let mut coords = points.clone();
        coords.push([mid_x - 50.0 * span, mid_y - 20.0 * span]);
        coords.push([mid_x + 50.0 * span, mid_y - 20.0 * span]);
        coords.push([mid_x, mid_y + 50.0 * span]);

        let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

        for i in 0..n {
            let p = coords[i];
            let bad: Vec<bool> = triangles
                .iter()
                .map(|t| in_circle(coords[t[0]], coords[t[1]], coords[t[2]], p) > 0.0)
                .collect();
            if !bad.iter().any(|b| *b) {
                continue;
            }

            // Cavity boundary: edges used by exactly one bad triangle, kept
            // in that triangle's counter-clockwise orientation.
            let mut edges: BTreeMap<(usize, usize), ((usize, usize), u32)> = BTreeMap::new();
            for (t, _) in triangles.iter().zip(&bad).filter(|(_, b)| **b) {
                for k in 0..3 {
                    let (a, b) = (t[k], t[(k + 1) % 3]);
                    edges.entry(edge_key(a, b)).or_insert(((a, b), 0)).1 += 1;
                }
            }

            let mut kept: Vec<[usize; 3]> = triangles
                .iter()
                .zip(&bad)
                .filter(|(_, b)| !**b)
                .map(|(t, _)| *t)
                .collect();
            kept.extend(
                edges
                    .values()
                    .filter(|(_, count)| *count == 1)
                    .map(|((a, b), _)| [*a, *b, i]),
            );
            triangles = kept;
        }

        triangles.retain(|t| t.iter().all(|v| *v < n));
        if triangles.is_empty() {
            return None;
        }

        let neighbors = Self::build_neighbors(&triangles);
        Some(Self { points, triangles, neighbors })
    }

    fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
        let mut by_edge: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for (ti, t) in triangles.iter().enumerate() {
            for k in 0..3 {
                by_edge.entry(edge_key(t[(k + 1) % 3], t[(k + 2) % 3])).or_default().push(ti);
            }
        }
        triangles
            .iter()
            .enumerate()
            .map(|(ti, t)| {
                let mut row = [None; 3];
                for (k, slot) in row.iter_mut().enumerate() {
                    let key = edge_key(t[(k + 1) % 3], t[(k + 2) % 3]);
                    *slot = by_edge
                        .get(&key)
                        .and_then(|owners| owners.iter().copied().find(|o| *o != ti));
                }
                row
            })
            .collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn neighbors(&self, triangle: usize) -> [Option<usize>; 3] {
        self.neighbors[triangle]
    }

    /// Sorted neighbour lists for every vertex.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.points.len()];
        for t in &self.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                sets[a].insert(b);
                sets[b].insert(a);
            }
        }
        sets.into_iter().map(|s| s.into_iter().collect()).collect()
    }

    pub fn barycentric(&self, triangle: usize, p: Point) -> [f64; 3] {
        let t = self.triangles[triangle];
        let [x0, y0] = self.points[t[0]];
        let [x1, y1] = self.points[t[1]];
        let [x2, y2] = self.points[t[2]];
        let det = (y1 - y2) * (x0 - x2) + (x2 - x1) * (y0 - y2);
        let l0 = ((y1 - y2) * (p[0] - x2) + (x2 - x1) * (p[1] - y2)) / det;
        let l1 = ((y2 - y0) * (p[0] - x2) + (x0 - x2) * (p[1] - y2)) / det;
        [l0, l1, 1.0 - l0 - l1]
    }

    /// First triangle containing `p`, by linear scan.
    pub fn locate(&self, p: Point) -> Option<usize> {
        (0..self.triangles.len())
            .find(|t| self.barycentric(*t, p).iter().all(|b| *b >= -BARY_EPS))
    }

    fn centroid(&self, triangle: usize) -> Point {
        let t = self.triangles[triangle];
        let sum = t.iter().fold([0.0, 0.0], |acc, v| {
            [acc[0] + self.points[*v][0], acc[1] + self.points[*v][1]]
        });
        [sum[0] / 3.0, sum[1] / 3.0]
    }
}

// ---------------------------------------------------------------------------
// Gradient estimation
// ---------------------------------------------------------------------------

/// Vertex gradients minimizing the integrated squared second derivative
/// of the cubic along every edge, solved by Gauss-Seidel sweeps.
pub fn estimate_gradients(tri: &Triangulation, values: &[f64]) -> Vec<[f64; 2]> {
    let points = tri.points();
    let neighbors = tri.vertex_neighbors();
    let mut grad = vec![[0.0f64; 2]; points.len()];

    for _ in 0..GRADIENT_MAX_ITER {
        let mut err = 0.0f64;
        for i in 0..points.len() {
            let mut q = [0.0f64; 3];
            let mut s = [0.0f64; 2];
            for &j in &neighbors[i] {
                let ex = points[j][0] - points[i][0];
                let ey = points[j][1] - points[i][1];
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;
                let df2 = -ex * grad[j][0] - ey * grad[j][1];
                let rhs = 6.0 * (values[i] - values[j]) - 2.0 * df2;
                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;
                s[0] += rhs * ex / l3;
                s[1] += rhs * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if det.abs() < f64::EPSILON {
                continue;
            }
            let r0 = (q[2] * s[0] - q[1] * s[1]) / det;
            let r1 = (-q[1] * s[0] + q[0] * s[1]) / det;

            let change = (grad[i][0] + r0).abs().max((grad[i][1] + r1).abs());
            grad[i] = [-r0, -r1];
            err = err.max(change / r0.abs().max(r1.abs()).max(1.0));
        }
        if err < GRADIENT_TOL {
            break;
        }
    }
    grad
}

// ---------------------------------------------------------------------------
// Clough-Tocher interpolant
// ---------------------------------------------------------------------------

/// Bezier control net of one macro-triangle. Index `ijkl` weights vertex
/// 0, 1, 2 and the centroid respectively.
#[derive(Debug, Clone, Copy)]
struct Patch {
    c3000: f64, c0300: f64, c0030: f64, c0003: f64,
    c2100: f64, c2010: f64, c2001: f64,
    c1200: f64, c0210: f64, c0201: f64,
    c1020: f64, c0120: f64, c0021: f64,
    c1101: f64, c1011: f64, c0111: f64,
    c1002: f64, c0102: f64, c0012: f64,
}

impl Patch {
    fn evaluate(&self, b: [f64; 3]) -> f64 {
        let min = b[0].min(b[1]).min(b[2]);
        let (b1, b2, b3, b4) = (b[0] - min, b[1] - min, b[2] - min, 3.0 * min);
        b1.powi(3) * self.c3000
            + 3.0 * b1 * b1 * b2 * self.c2100
            + 3.0 * b1 * b1 * b3 * self.c2010
            + 3.0 * b1 * b1 * b4 * self.c2001
            + 3.0 * b1 * b2 * b2 * self.c1200
            + 6.0 * b1 * b2 * b4 * self.c1101
            + 3.0 * b1 * b3 * b3 * self.c1020
            + 6.0 * b1 * b3 * b4 * self.c1011
            + 3.0 * b1 * b4 * b4 * self.c1002
            + b2.powi(3) * self.c0300
            + 3.0 * b2 * b2 * b3 * self.c0210
            + 3.0 * b2 * b2 * b4 * self.c0201
            + 3.0 * b2 * b3 * b3 * self.c0120
            + 6.0 * b2 * b3 * b4 * self.c0111
            + 3.0 * b2 * b4 * b4 * self.c0102
            + b3.powi(3) * self.c0030
            + 3.0 * b3 * b3 * b4 * self.c0021
            + 3.0 * b3 * b4 * b4 * self.c0012
            + b4.powi(3) * self.c0003
    }
}

pub struct CloughTocher {
    tri: Triangulation,
    values: Vec<f64>,
    gradients: Vec<[f64; 2]>,
}

impl CloughTocher {
    /// Fits the surface through `(point, value)` pairs. `None` when no
    /// triangle can be formed.
    pub fn new(points: Vec<Point>, values: Vec<f64>) -> Option<Self> {
        if points.len() != values.len() {
            return None;
        }
        let tri = Triangulation::new(points)?;
        let gradients = estimate_gradients(&tri, &values);
        Some(Self { tri, values, gradients })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    fn patch(&self, triangle: usize) -> Patch {
        let t = self.tri.triangles()[triangle];
        let p = self.tri.points();
        let [p0, p1, p2] = [p[t[0]], p[t[1]], p[t[2]]];
        let e12 = [p1[0] - p0[0], p1[1] - p0[1]];
        let e23 = [p2[0] - p1[0], p2[1] - p1[1]];
        let e31 = [p0[0] - p2[0], p0[1] - p2[1]];
        let dot = |g: [f64; 2], e: [f64; 2]| g[0] * e[0] + g[1] * e[1];

        let [g0, g1, g2] = [self.gradients[t[0]], self.gradients[t[1]], self.gradients[t[2]]];
        let df12 = dot(g0, e12);
        let df21 = -dot(g1, e12);
        let df23 = dot(g1, e23);
        let df32 = -dot(g2, e23);
        let df31 = dot(g2, e31);
        let df13 = -dot(g0, e31);

        let c3000 = self.values[t[0]];
        let c0300 = self.values[t[1]];
        let c0030 = self.values[t[2]];
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        // Cross-edge derivative direction: toward the neighbour's centroid,
        // or the edge's own centroid direction on the hull.
        let mut g = [-0.5f64; 3];
        for (k, nb) in self.tri.neighbors(triangle).iter().enumerate() {
            let Some(nb) = nb else { continue };
            let c = self.tri.barycentric(triangle, self.tri.centroid(*nb));
            g[k] = match k {
                0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
                1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
                _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
            };
        }

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;
        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        Patch {
            c3000, c0300, c0030, c0003,
            c2100, c2010, c2001,
            c1200, c0210, c0201,
            c1020, c0120, c0021,
            c1101, c1011, c0111,
            c1002, c0102, c0012,
        }
    }

    /// Value at a single point, or `None` outside the convex hull.
    pub fn interpolate(&self, p: Point) -> Option<f64> {
        let t = self.tri.locate(p)?;
        Some(self.patch(t).evaluate(self.tri.barycentric(t, p)))
    }

    /// Values over the mesh `xs` x `ys`, row-major by `ys`. Nodes outside
    /// the hull are `None`. Where triangles share a node, the first
    /// triangle in triangulation order supplies its value.
    pub fn rasterize(&self, xs: &[f64], ys: &[f64]) -> Vec<Option<f64>> {
        let mut out = vec![None; xs.len() * ys.len()];
        let points = self.tri.points();

        for (ti, t) in self.tri.triangles().iter().enumerate() {
            let vx = t.map(|v| points[v][0]);
            let vy = t.map(|v| points[v][1]);
            let (x_lo, x_hi) = (vx[0].min(vx[1]).min(vx[2]), vx[0].max(vx[1]).max(vx[2]));
            let (y_lo, y_hi) = (vy[0].min(vy[1]).min(vy[2]), vy[0].max(vy[1]).max(vy[2]));

            let cols = axis_span(xs, x_lo, x_hi);
            let rows = axis_span(ys, y_lo, y_hi);
            if cols.is_empty() || rows.is_empty() {
                continue;
            }

            let patch = self.patch(ti);
            for r in rows {
                for c in cols.clone() {
                    let slot = &mut out[r * xs.len() + c];
                    if slot.is_some() {
                        continue;
                    }
                    let b = self.tri.barycentric(ti, [xs[c], ys[r]]);
                    if b.iter().all(|v| *v >= -BARY_EPS) {
                        *slot = Some(patch.evaluate(b));
                    }
                }
            }
        }
        out
    }
}

/// Index range of the ascending `axis` values falling in `[lo, hi]`.
fn axis_span(axis: &[f64], lo: f64, hi: f64) -> std::ops::Range<usize> {
    let start = axis.partition_point(|v| *v < lo);
    let end = axis.partition_point(|v| *v <= hi);
    start..end.max(start)
}
