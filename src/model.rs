// src/model.rs
//! A loaded OBJ mesh with its reduction lifecycle.
//!
//! [`MeshModel`] composes the vertex graph with the reduction log and the
//! pass-through data recovered at parse time. `reduce` collapses edges one
//! at a time while logging enough to reverse each step; `reproduce`
//! replays the log backwards and restores the original geometry exactly.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, info};
use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::json_export::{self, GeometryDocument};
use crate::obj_codec;
use crate::reduction::{ReductionLog, ReductionRecord};
use crate::vertex_graph::{PolygonKey, QuadricOptions, VertexGraph};

/// Callback deciding whether reduction should stop. Receives the iteration
/// count and the current polygon count.
pub type StopPredicate = Box<dyn FnMut(u32, usize) -> bool>;

/// Arguments for [`MeshModel::reduce`]. At least one of the iteration cap
/// and the stop predicate must be set.
#[derive(Default)]
pub struct ReduceOptions {
    pub iterations: Option<u32>,
    pub stop: Option<StopPredicate>,
    pub quadric: QuadricOptions,
}

impl ReduceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn iterations(mut self, cap: u32) -> Self {
        self.iterations = Some(cap);
        self
    }

    pub fn stop_when<F>(mut self, predicate: F) -> Self
    where
        F: FnMut(u32, usize) -> bool + 'static,
    {
        self.stop = Some(Box::new(predicate));
        self
    }

    #[inline(always)]
    pub fn quadric(mut self, options: QuadricOptions) -> Self {
        self.quadric = options;
        self
    }
}

/// Summary of a completed reduction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOutcome {
    pub iterations: u32,
    pub start_polygons: usize,
    pub end_polygons: usize,
}

impl ReduceOutcome {
    /// Percentage of polygons removed by the pass. Can be negative: a
    /// collapse may close a previously open wedge into a new triangle.
    pub fn reduction_percent(&self) -> f64 {
        if self.start_polygons == 0 {
            return 0.0;
        }
        let removed = self.start_polygons as f64 - self.end_polygons as f64;
        removed / self.start_polygons as f64 * 100.0
    }
}

/// A mesh loaded from an OBJ file, together with everything needed to
/// reduce it and to reconstruct the original.
#[derive(Debug)]
pub struct MeshModel {
    stem: String,
    graph: VertexGraph,
    preserved_headers: Vec<String>,
    log: ReductionLog,
    original_index_map: HashMap<usize, String>,
    maximum_vertices: usize,
    maximum_polygons: usize,
    already_reproduced: bool,
}

impl MeshModel {
    /// Assemble a model from already parsed parts. The vertex and polygon
    /// maxima are derived from the graph as loaded.
    pub fn from_parts(
        stem: impl Into<String>,
        graph: VertexGraph,
        preserved_headers: Vec<String>,
        log: ReductionLog,
        original_index_map: HashMap<usize, String>,
    ) -> Self {
        let maximum_vertices = graph.vertex_count();
        let maximum_polygons = graph.polygon_count();
        Self {
            stem: stem.into(),
            graph,
            preserved_headers,
            log,
            original_index_map,
            maximum_vertices,
            maximum_polygons,
            already_reproduced: false,
        }
    }

    #[inline(always)]
    pub fn graph(&self) -> &VertexGraph {
        &self.graph
    }

    #[inline(always)]
    pub fn log(&self) -> &ReductionLog {
        &self.log
    }

    #[inline(always)]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    #[inline(always)]
    pub fn preserved_headers(&self) -> &[String] {
        &self.preserved_headers
    }

    /// Original vertex names keyed by their 1-based emission index, as
    /// restored from a reduced file's key comment.
    #[inline(always)]
    pub fn original_index_map(&self) -> &HashMap<usize, String> {
        &self.original_index_map
    }

    #[inline(always)]
    pub fn maximum_vertices(&self) -> usize {
        self.maximum_vertices
    }

    #[inline(always)]
    pub fn maximum_polygons(&self) -> usize {
        self.maximum_polygons
    }

    /// A model is reduced iff its log is non-empty.
    #[inline(always)]
    pub fn already_reduced(&self) -> bool {
        !self.log.is_empty()
    }

    #[inline(always)]
    pub fn already_reproduced(&self) -> bool {
        self.already_reproduced
    }

    /// Collapse edges in preferred order until the cap or the stopping
    /// condition fires, or no edges remain. Each collapse is logged with
    /// the state needed to reverse it.
    pub fn reduce(&mut self, mut options: ReduceOptions) -> Result<ReduceOutcome> {
        if options.iterations.is_none() && options.stop.is_none() {
            return Err(Error::MissingStopCondition);
        }
        if self.already_reduced() {
            return Err(Error::AlreadyReduced);
        }

        let start_polygons = self.graph.polygon_count();
        let mut iteration = 0u32;

        loop {
            iteration += 1;

            let edge = self
                .graph
                .determine_preferred_collapsible_edge(&options.quadric)?;
            let Some((left, right)) = edge else {
                // No edges left: normal end of reduction.
                break;
            };

            // Snapshot both endpoints before the collapse mutates them.
            let left_coords = self.graph.coords(&left)?;
            let right_coords = self.graph.coords(&right)?;
            let left_neighbours: Vec<String> =
                self.graph.neighbours(&left)?.iter().cloned().collect();
            let right_neighbours: Vec<String> =
                self.graph.neighbours(&right)?.iter().cloned().collect();
            let mut polygons: BTreeSet<PolygonKey> =
                self.graph.compute_polygons(&left)?.into_keys().collect();
            polygons.extend(self.graph.compute_polygons(&right)?.into_keys());

            let midpoint = self.graph.collapse_edge(&left, &right)?;
            debug!("iteration {iteration}: collapsed ({left}, {right}) into {midpoint}");

            self.log.push(ReductionRecord {
                iteration,
                midpoint,
                left,
                left_coords: [left_coords.x, left_coords.y, left_coords.z],
                left_neighbours,
                right,
                right_coords: [right_coords.x, right_coords.y, right_coords.z],
                right_neighbours,
                polygons: polygons.into_iter().collect(),
            });

            if let Some(cap) = options.iterations {
                if iteration >= cap {
                    debug!("iteration cap reached after {iteration}");
                    break;
                }
            }
            if let Some(stop) = options.stop.as_mut() {
                let polygon_count = self.graph.polygon_count();
                if stop(iteration, polygon_count) {
                    debug!("stopping condition reached at {polygon_count} polygons");
                    break;
                }
            }
        }

        let end_polygons = self.graph.polygon_count();
        let outcome = ReduceOutcome {
            iterations: self.log.len() as u32,
            start_polygons,
            end_polygons,
        };
        info!(
            "reduced {}: {} -> {} polygons over {} iterations",
            self.stem, start_polygons, end_polygons, outcome.iterations
        );
        Ok(outcome)
    }

    /// Replay the reduction log backwards, splitting every midpoint back
    /// into its recorded endpoints. Clears the log on success.
    pub fn reproduce(&mut self) -> Result<()> {
        if self.log.is_empty() {
            return Err(Error::NotReduced);
        }

        for record in self.log.records().iter().rev() {
            let left_neighbours: BTreeSet<String> =
                record.left_neighbours.iter().cloned().collect();
            let right_neighbours: BTreeSet<String> =
                record.right_neighbours.iter().cloned().collect();
            self.graph.split_vertex(
                &record.midpoint,
                &record.left,
                Vector3::from(record.left_coords),
                &left_neighbours,
                &record.right,
                Vector3::from(record.right_coords),
                &right_neighbours,
            )?;
        }

        self.log.clear();
        self.already_reproduced = true;
        info!(
            "reproduced {}: {} vertices restored",
            self.stem,
            self.graph.vertex_count()
        );
        Ok(())
    }

    /// Write the current mesh as an OBJ file, optionally embedding the
    /// reduction log. Returns the generated path.
    pub fn write(&self, include_log: bool) -> Result<PathBuf> {
        obj_codec::write_obj_file(self, include_log)
    }

    /// Build the viewer JSON document, writing it to `path` when given.
    pub fn to_json(&self, path: Option<&Path>) -> Result<GeometryDocument> {
        let document = json_export::document(self);
        if let Some(path) = path {
            json_export::write_document(&document, path)?;
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_ops::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tetrahedron_model() -> MeshModel {
        let mut graph = VertexGraph::new();
        graph.add_node("1", Vec3::new(0.0, 0.0, 0.0)).unwrap();
        graph.add_node("2", Vec3::new(1.0, 0.0, 0.0)).unwrap();
        graph.add_node("3", Vec3::new(0.0, 1.0, 0.0)).unwrap();
        graph.add_node("4", Vec3::new(0.0, 0.0, 1.0)).unwrap();
        for (a, b) in [
            ("1", "2"),
            ("1", "3"),
            ("1", "4"),
            ("2", "3"),
            ("2", "4"),
            ("3", "4"),
        ] {
            graph.add_edge(a, b).unwrap();
        }
        MeshModel::from_parts(
            "tetra",
            graph,
            Vec::new(),
            ReductionLog::new(),
            HashMap::new(),
        )
    }

    /// Two rows of `columns` vertices, each quad split into two triangles.
    fn strip_model(columns: usize) -> MeshModel {
        let mut graph = VertexGraph::new();
        for row in 0..2 {
            for col in 0..columns {
                let name = (row * columns + col + 1).to_string();
                graph
                    .add_node(name, Vec3::new(col as f64, row as f64, 0.0))
                    .unwrap();
            }
        }
        for col in 0..columns - 1 {
            let top_left = (col + 1).to_string();
            let top_right = (col + 2).to_string();
            let bottom_left = (columns + col + 1).to_string();
            let bottom_right = (columns + col + 2).to_string();
            graph.add_edge(&top_left, &top_right).unwrap();
            graph.add_edge(&bottom_left, &bottom_right).unwrap();
            graph.add_edge(&top_left, &bottom_left).unwrap();
            graph.add_edge(&top_right, &bottom_left).unwrap();
        }
        let last_top = columns.to_string();
        let last_bottom = (2 * columns).to_string();
        graph.add_edge(&last_top, &last_bottom).unwrap();
        MeshModel::from_parts(
            "strip",
            graph,
            Vec::new(),
            ReductionLog::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn test_reduce_requires_a_bound() {
        let mut model = tetrahedron_model();
        let err = model.reduce(ReduceOptions::new()).unwrap_err();
        assert!(matches!(err, Error::MissingStopCondition));
    }

    #[test]
    fn test_reduce_once_then_reproduce() {
        let mut model = tetrahedron_model();
        assert_eq!(model.maximum_vertices(), 4);
        assert_eq!(model.maximum_polygons(), 4);

        let outcome = model.reduce(ReduceOptions::new().iterations(1)).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.start_polygons, 4);
        assert!(model.already_reduced());
        assert_eq!(model.log().len(), 1);
        assert_eq!(model.log().records()[0].midpoint, "m1");
        assert_eq!(model.graph().vertex_count(), 3);

        model.reproduce().unwrap();
        assert!(!model.already_reduced());
        assert!(model.already_reproduced());
        assert_eq!(model.graph().vertex_count(), 4);
        assert_eq!(model.graph().polygon_count(), 4);
        for (name, coords) in [
            ("1", Vec3::new(0.0, 0.0, 0.0)),
            ("2", Vec3::new(1.0, 0.0, 0.0)),
            ("3", Vec3::new(0.0, 1.0, 0.0)),
            ("4", Vec3::new(0.0, 0.0, 1.0)),
        ] {
            assert_eq!(model.graph().coords(name).unwrap(), coords);
        }
    }

    #[test]
    fn test_full_reduction_round_trip_restores_topology() {
        let mut model = strip_model(6);
        let reference = model.graph().clone();

        model.reduce(ReduceOptions::new().iterations(5)).unwrap();
        assert_eq!(model.log().len(), 5);
        model.reproduce().unwrap();

        let restored = model.graph();
        assert_eq!(restored.vertex_count(), reference.vertex_count());
        for name in reference.names() {
            assert_eq!(restored.coords(name).unwrap(), reference.coords(name).unwrap());
            assert_eq!(
                restored.neighbours(name).unwrap(),
                reference.neighbours(name).unwrap()
            );
        }
        let reference_polygons: Vec<_> =
            reference.compute_all_polygons().into_keys().collect();
        let restored_polygons: Vec<_> =
            restored.compute_all_polygons().into_keys().collect();
        assert_eq!(restored_polygons, reference_polygons);
    }

    #[test]
    fn test_reduce_twice_is_rejected() {
        let mut model = tetrahedron_model();
        model.reduce(ReduceOptions::new().iterations(1)).unwrap();
        let err = model.reduce(ReduceOptions::new().iterations(1)).unwrap_err();
        assert!(matches!(err, Error::AlreadyReduced));
    }

    #[test]
    fn test_reproduce_without_log_is_rejected() {
        let mut model = tetrahedron_model();
        let err = model.reproduce().unwrap_err();
        assert!(matches!(err, Error::NotReduced));
    }

    #[test]
    fn test_reduce_terminates_on_edgeless_graph() {
        let mut graph = VertexGraph::new();
        graph.add_node("1", Vec3::zeros()).unwrap();
        graph.add_node("2", Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let mut model = MeshModel::from_parts(
            "points",
            graph,
            Vec::new(),
            ReductionLog::new(),
            HashMap::new(),
        );

        let outcome = model.reduce(ReduceOptions::new().iterations(100)).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert!(model.log().is_empty());
        assert_eq!(model.graph().vertex_count(), 2);
    }

    #[test]
    fn test_stop_predicate_halts_below_budget() {
        let mut model = strip_model(101);
        assert_eq!(model.maximum_polygons(), 200);

        let history: Rc<RefCell<Vec<(u32, usize)>>> = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&history);
        let outcome = model
            .reduce(ReduceOptions::new().stop_when(move |iteration, polygons| {
                probe.borrow_mut().push((iteration, polygons));
                polygons < 50
            }))
            .unwrap();

        assert!(outcome.end_polygons < 50);
        let history = history.borrow();
        let (_, last) = history[history.len() - 1];
        assert!(last < 50);
        for (_, polygons) in &history[..history.len() - 1] {
            assert!(*polygons >= 50);
        }
    }

    #[test]
    fn test_outcome_reduction_percent() {
        let outcome = ReduceOutcome {
            iterations: 3,
            start_polygons: 200,
            end_polygons: 50,
        };
        assert!((outcome.reduction_percent() - 75.0).abs() < 1e-12);

        let empty = ReduceOutcome {
            iterations: 0,
            start_polygons: 0,
            end_polygons: 0,
        };
        assert_eq!(empty.reduction_percent(), 0.0);
    }
}
