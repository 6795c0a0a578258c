// src/lib.rs
//! Progressive triangle-mesh reduction built on quadric error metrics.
//!
//! A mesh is loaded from a Wavefront OBJ file into a [`MeshModel`], reduced
//! edge collapse by edge collapse while every step is logged, and either
//! written back out (the log rides in OBJ comments, so reduced files stay
//! valid for other consumers) or expanded again to the exact original via
//! [`MeshModel::reproduce`].
//!
//! ```no_run
//! use promesh::{process_obj_file, ReduceOptions};
//!
//! # fn main() -> promesh::Result<()> {
//! let mut model = process_obj_file("chair.obj")?;
//! let outcome = model.reduce(ReduceOptions::new().iterations(40))?;
//! println!("removed {:.1}% of polygons", outcome.reduction_percent());
//! model.write(true)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod json_export;
pub mod model;
pub mod obj_codec;
pub mod reduction;
pub mod vector_ops;
pub mod vertex_graph;

pub use error::{Error, Result};
pub use json_export::GeometryDocument;
pub use model::{MeshModel, ReduceOptions, ReduceOutcome, StopPredicate};
pub use obj_codec::{process_obj_file, write_obj_file};
pub use reduction::{ReductionLog, ReductionRecord};
pub use vertex_graph::{GraphError, Polygon, QuadricOptions, VertexGraph};
