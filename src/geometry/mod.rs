pub mod curve;
pub mod nurbs;
pub mod surface;

pub use curve::{Arc, Curve, CurveEnd, ExtendStyle, Line};
pub use nurbs::{ArcLengthTable, NurbsCurve};
pub use surface::{
    Cone, Cylinder, NurbsSurface, Plane, Sphere, Surface, SurfaceDomain, SurfacePoint, Torus,
};
