use crate::math::{line_intersects_triangle, Vec3};

pub type FaceId = u8;

/// One face of a classification solid. Vertices are stored CCW from
/// outside; `n` is the outward unit normal and `center` the unit vector
/// through the face centroid.
#[derive(Clone, Copy, Debug)]
pub struct Face {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub n: Vec3,
    pub center: Vec3,
}

impl Face {
    fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let mut f = Self { a, b, c, n: Vec3::ZERO, center: Vec3::ZERO };
        // Outward iff dot(normal, centroid) > 0; flip winding otherwise.
        let centroid = f.a.add(f.b).add(f.c);
        let mut n = f.b.sub(f.a).cross(f.c.sub(f.a)).normalized();
        if n.dot(centroid) < 0.0 {
            std::mem::swap(&mut f.b, &mut f.c);
            n = f.b.sub(f.a).cross(f.c.sub(f.a)).normalized();
        }
        f.n = n;
        f.center = centroid.normalized();
        f
    }
}

/// An origin-centered solid used to classify directions into faces.
#[derive(Clone, Debug)]
pub struct Solid {
    faces: Vec<Face>,
}

/// Canonical regular tetrahedron (alternating cube corners), faces in
/// fixed table order for deterministic tie-breaks.
#[must_use]
pub fn tetrahedron() -> Solid {
    let v = [
        Vec3::new(1.0, 1.0, 1.0).normalized(),
        Vec3::new(1.0, -1.0, -1.0).normalized(),
        Vec3::new(-1.0, 1.0, -1.0).normalized(),
        Vec3::new(-1.0, -1.0, 1.0).normalized(),
    ];
    let faces_idx: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];
    Solid { faces: faces_idx.iter().map(|t| Face::new(v[t[0]], v[t[1]], v[t[2]])).collect() }
}

/// Canonical regular octahedron (axis vertices), one face per octant,
/// faces in fixed table order for deterministic tie-breaks.
#[must_use]
pub fn octahedron() -> Solid {
    let px = Vec3::new(1.0, 0.0, 0.0);
    let nx = Vec3::new(-1.0, 0.0, 0.0);
    let py = Vec3::new(0.0, 1.0, 0.0);
    let ny = Vec3::new(0.0, -1.0, 0.0);
    let pz = Vec3::new(0.0, 0.0, 1.0);
    let nz = Vec3::new(0.0, 0.0, -1.0);
    let faces = [
        (px, py, pz),
        (px, py, nz),
        (px, ny, pz),
        (px, ny, nz),
        (nx, py, pz),
        (nx, py, nz),
        (nx, ny, pz),
        (nx, ny, nz),
    ];
    Solid { faces: faces.iter().map(|&(a, b, c)| Face::new(a, b, c)).collect() }
}

impl Solid {
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Face whose barycentric ray from the origin contains `p`: first
    /// face, in table order, that the origin→p line crosses. Only faces
    /// oriented toward `p` qualify; the line also passes through the
    /// antipodal exit face of the solid, which must not win. `None` only
    /// on a numerical miss.
    #[must_use]
    pub fn face_of(&self, p: Vec3) -> Option<FaceId> {
        for (i, f) in self.faces.iter().enumerate() {
            if f.n.dot(p) <= 0.0 {
                continue;
            }
            if line_intersects_triangle(Vec3::ZERO, p, &(f.a, f.b, f.c)) {
                return u8::try_from(i).ok();
            }
        }
        None
    }

    /// Argmax `dot(center, p)` over faces; total fallback for points the
    /// ray test misses.
    #[must_use]
    pub fn nearest_face(&self, p: Vec3) -> FaceId {
        let mut best_i = 0u8;
        let mut best_d = f64::NEG_INFINITY;
        for (i, f) in self.faces.iter().enumerate() {
            let d = f.center.dot(p);
            if d > best_d {
                best_d = d;
                best_i = u8::try_from(i).unwrap_or(0);
            }
        }
        best_i
    }

    /// Classify with the nearest-face fallback; never leaves a point
    /// without a face.
    #[must_use]
    pub fn classify(&self, p: Vec3) -> FaceId {
        self.face_of(p).unwrap_or_else(|| self.nearest_face(p))
    }
}
