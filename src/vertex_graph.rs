// src/vertex_graph.rs
//! Mutable undirected vertex graph backing the reduction engine.
//!
//! **Key properties**
//! - Vertices are addressed by stable string names and refer to their
//!   neighbours symbolically, so the structure carries no cyclic ownership.
//! - Adjacency is always symmetric and never contains self-loops.
//! - Insertion order is preserved and observable; emitters use it to
//!   assign output indices.
//! - Triangles are never stored. They are discovered on demand from the
//!   adjacency sets and keyed by their sorted name triple, so every
//!   triangle is reported exactly once.
//! - The graph owns the Garland-Heckbert quadric computation and the
//!   preferred-edge selection that drives reduction.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use nalgebra::RowVector4;
use thiserror::Error;

use crate::vector_ops::{self, Mat4, Vec3, Vec4, EPSILON};

/// Errors raised when a graph invariant would be violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("vertex already exists: {0}")]
    DuplicateName(String),

    #[error("unknown vertex: {0}")]
    UnknownVertex(String),

    #[error("self-loop rejected on vertex: {0}")]
    SelfLoop(String),

    #[error("no edge between {0} and {1}")]
    NotAnEdge(String, String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Per-vertex payload. Raw geometry only; other attributes do not survive
/// reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    coords: Vec3,
}

impl VertexData {
    fn new(coords: Vec3) -> Self {
        Self { coords }
    }

    #[inline(always)]
    pub fn coords(&self) -> Vec3 {
        self.coords
    }
}

/// Canonical triangle key: the sorted name triple.
pub type PolygonKey = [String; 3];

/// A discovered triangle with its unit normal.
///
/// The normal is computed from the canonical vertex order, so it is
/// deterministic per triangle but its orientation is not consistent across
/// the mesh.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: PolygonKey,
    pub normal: Vec3,
}

/// Tuning for preferred-edge selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadricOptions {
    /// Evaluate candidate edges at the error-minimising position instead
    /// of the midpoint. The solve only engages when the derivative matrix
    /// is comfortably invertible; otherwise the midpoint is used.
    pub use_optimal_position: bool,
}

impl QuadricOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn optimal_position(mut self, flag: bool) -> Self {
        self.use_optimal_position = flag;
        self
    }
}

/// Undirected graph of named vertices with 3D coordinates.
#[derive(Debug, Clone, Default)]
pub struct VertexGraph {
    order: Vec<String>,
    data: HashMap<String, VertexData>,
    edges: HashMap<String, BTreeSet<String>>,
    m_count: u64,
}

impl VertexGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline(always)]
    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Vertex names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Vertices in insertion order with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec3)> {
        self.order
            .iter()
            .filter_map(|name| self.data.get(name).map(|d| (name.as_str(), d.coords())))
    }

    pub fn coords(&self, name: &str) -> Result<Vec3> {
        self.data
            .get(name)
            .map(VertexData::coords)
            .ok_or_else(|| GraphError::UnknownVertex(name.to_string()))
    }

    /// Number of collapse names handed out so far.
    #[inline(always)]
    pub fn collapse_count(&self) -> u64 {
        self.m_count
    }

    /// Insert a new isolated vertex.
    pub fn add_node(&mut self, name: impl Into<String>, coords: Vec3) -> Result<()> {
        let name = name.into();
        if self.data.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        self.order.push(name.clone());
        self.edges.insert(name.clone(), BTreeSet::new());
        self.data.insert(name, VertexData::new(coords));
        Ok(())
    }

    /// Connect two existing vertices. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<()> {
        if !self.data.contains_key(a) {
            return Err(GraphError::UnknownVertex(a.to_string()));
        }
        if !self.data.contains_key(b) {
            return Err(GraphError::UnknownVertex(b.to_string()));
        }
        if a == b {
            return Err(GraphError::SelfLoop(a.to_string()));
        }
        if let Some(set) = self.edges.get_mut(a) {
            set.insert(b.to_string());
        }
        if let Some(set) = self.edges.get_mut(b) {
            set.insert(a.to_string());
        }
        Ok(())
    }

    pub fn neighbours(&self, name: &str) -> Result<&BTreeSet<String>> {
        self.edges
            .get(name)
            .ok_or_else(|| GraphError::UnknownVertex(name.to_string()))
    }

    #[inline(always)]
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.get(a).map_or(false, |set| set.contains(b))
    }

    /// Number of unique undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Detach a vertex from all neighbours and drop it.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let neighbours = self
            .edges
            .remove(name)
            .ok_or_else(|| GraphError::UnknownVertex(name.to_string()))?;
        for neighbour in &neighbours {
            if let Some(set) = self.edges.get_mut(neighbour) {
                set.remove(name);
            }
        }
        self.order.retain(|n| n != name);
        self.data.remove(name);
        Ok(())
    }

    /// Replace the edge (left, right) with a fresh midpoint vertex `m<k>`
    /// inheriting the union of both neighbour sets. Returns the new name.
    ///
    /// Triangles that contained both endpoints degenerate into a pair of
    /// edges and are absorbed by the set semantics of the adjacency.
    pub fn collapse_edge(&mut self, left: &str, right: &str) -> Result<String> {
        let left_coords = self.coords(left)?;
        let right_coords = self.coords(right)?;
        if !self.has_edge(left, right) {
            return Err(GraphError::NotAnEdge(left.to_string(), right.to_string()));
        }

        // Collapse names are never reused, even if the vertex goes away.
        self.m_count += 1;
        let midpoint_name = format!("m{}", self.m_count);
        self.add_node(
            midpoint_name.clone(),
            vector_ops::midpoint(left_coords, right_coords),
        )?;

        let left_neighbours: Vec<String> = self.neighbours(left)?.iter().cloned().collect();
        let right_neighbours: Vec<String> = self.neighbours(right)?.iter().cloned().collect();
        for neighbour in left_neighbours.iter().chain(right_neighbours.iter()) {
            if neighbour == &midpoint_name {
                continue;
            }
            self.add_edge(&midpoint_name, neighbour)?;
        }

        // Removing the endpoints also detaches the midpoint from them.
        self.remove_node(left)?;
        self.remove_node(right)?;
        Ok(midpoint_name)
    }

    /// Inverse of [`collapse_edge`](Self::collapse_edge): remove `name` and
    /// reinstate the two recorded endpoints with their neighbour sets.
    ///
    /// The caller supplies both names; the collapse counter is untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn split_vertex(
        &mut self,
        name: &str,
        a_name: &str,
        a_coords: Vec3,
        a_neighbours: &BTreeSet<String>,
        b_name: &str,
        b_coords: Vec3,
        b_neighbours: &BTreeSet<String>,
    ) -> Result<()> {
        if !self.contains(name) {
            return Err(GraphError::UnknownVertex(name.to_string()));
        }
        if self.contains(a_name) {
            return Err(GraphError::DuplicateName(a_name.to_string()));
        }
        if self.contains(b_name) {
            return Err(GraphError::DuplicateName(b_name.to_string()));
        }

        self.remove_node(name)?;
        self.add_node(a_name, a_coords)?;
        self.add_node(b_name, b_coords)?;

        for neighbour in a_neighbours {
            self.add_edge(a_name, neighbour)?;
        }
        for neighbour in b_neighbours {
            self.add_edge(b_name, neighbour)?;
        }
        Ok(())
    }

    /// Triangles incident to `origin`: pairs of its neighbours that are
    /// themselves adjacent, keyed by the sorted name triple.
    pub fn compute_polygons(&self, origin: &str) -> Result<BTreeMap<PolygonKey, Polygon>> {
        let neighbours = self.neighbours(origin)?;
        let mut polygons = BTreeMap::new();

        for u in neighbours {
            let shared = self.neighbours(u)?;
            for v in shared.intersection(neighbours) {
                let key = canonical_triple(origin, u, v);
                if polygons.contains_key(&key) {
                    continue;
                }
                let normal = self.polygon_normal(&key)?;
                polygons.insert(key.clone(), Polygon { vertices: key, normal });
            }
        }
        Ok(polygons)
    }

    /// Union of [`compute_polygons`](Self::compute_polygons) over every
    /// vertex, deduplicated by canonical key.
    pub fn compute_all_polygons(&self) -> BTreeMap<PolygonKey, Polygon> {
        let mut polygons = BTreeMap::new();
        for name in &self.order {
            if let Ok(found) = self.compute_polygons(name) {
                polygons.extend(found);
            }
        }
        polygons
    }

    #[inline(always)]
    pub fn polygon_count(&self) -> usize {
        self.compute_all_polygons().len()
    }

    /// Garland-Heckbert quadric of a vertex: the sum of the plane quadrics
    /// of every incident triangle, each plane anchored at the vertex.
    ///
    /// The result is symmetric by construction and orientation of the
    /// triangle normals cancels in the outer product.
    pub fn compute_vertex_quadric(&self, name: &str) -> Result<Mat4> {
        let anchor = self.coords(name)?;
        let mut quadric = Mat4::zeros();
        for polygon in self.compute_polygons(name)?.values() {
            quadric += vector_ops::plane_quadric(polygon.normal, anchor);
        }
        Ok(quadric)
    }

    /// The edge whose collapse candidate carries the smallest quadric
    /// error, or `None` when the graph has no edges left.
    ///
    /// Edges are enumerated in lexicographic order and the first minimum
    /// wins, so the result is deterministic for a given graph.
    pub fn determine_preferred_collapsible_edge(
        &self,
        options: &QuadricOptions,
    ) -> Result<Option<(String, String)>> {
        let mut edge_pairs: BTreeSet<(String, String)> = BTreeSet::new();
        for (start, neighbours) in &self.edges {
            for neighbour in neighbours {
                let (a, b) = if start < neighbour {
                    (start, neighbour)
                } else {
                    (neighbour, start)
                };
                edge_pairs.insert((a.clone(), b.clone()));
            }
        }
        if edge_pairs.is_empty() {
            return Ok(None);
        }

        let mut quadrics: HashMap<&str, Mat4> = HashMap::with_capacity(self.order.len());
        for name in &self.order {
            quadrics.insert(name.as_str(), self.compute_vertex_quadric(name)?);
        }

        let mut best: Option<(f64, (String, String))> = None;
        for (a, b) in edge_pairs {
            let combined = quadrics[a.as_str()] + quadrics[b.as_str()];
            let v_bar = self.candidate_position(&combined, &a, &b, options)?;
            let error = vector_ops::quadric_error(&combined, &v_bar);
            if best.as_ref().map_or(true, |(smallest, _)| error < *smallest) {
                best = Some((error, (a, b)));
            }
        }
        Ok(best.map(|(_, edge)| edge))
    }

    /// First vertex (in insertion order) whose coordinates match exactly.
    pub fn find_by_coords(&self, coords: Vec3) -> Option<&str> {
        self.iter()
            .find(|(_, candidate)| *candidate == coords)
            .map(|(name, _)| name)
    }

    /// Keep the collapse counter ahead of `m<k>` names reinstated from a
    /// previously written reduction file, so later collapses never reuse a
    /// live name.
    pub(crate) fn reserve_collapse_name(&mut self, name: &str) {
        if let Some(k) = name.strip_prefix('m').and_then(|rest| rest.parse::<u64>().ok()) {
            self.m_count = self.m_count.max(k);
        }
    }

    fn candidate_position(
        &self,
        combined: &Mat4,
        a: &str,
        b: &str,
        options: &QuadricOptions,
    ) -> Result<Vec4> {
        if options.use_optimal_position {
            let mut derivatives = *combined;
            derivatives.set_row(3, &RowVector4::new(0.0, 0.0, 0.0, 1.0));
            if derivatives.determinant().abs() > EPSILON {
                if let Some(inverse) = derivatives.try_inverse() {
                    return Ok(inverse * Vec4::new(0.0, 0.0, 0.0, 1.0));
                }
            }
        }
        let mid = vector_ops::midpoint(self.coords(a)?, self.coords(b)?);
        Ok(vector_ops::homogeneous(mid))
    }

    fn polygon_normal(&self, key: &PolygonKey) -> Result<Vec3> {
        let a = self.coords(&key[0])?;
        let b = self.coords(&key[1])?;
        let c = self.coords(&key[2])?;
        Ok(vector_ops::triangle_normal(a, b, c))
    }
}

fn canonical_triple(a: &str, b: &str, c: &str) -> PolygonKey {
    let mut key = [a.to_string(), b.to_string(), c.to_string()];
    key.sort();
    key
}
