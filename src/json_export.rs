// src/json_export.rs
//! Viewer-facing JSON export.
//!
//! Produces a single document with the current geometry, the load-time
//! maxima and the reduction timeline, shaped for level-of-detail playback
//! front-ends. Polygon vertices are referenced by name, not index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::model::MeshModel;
use crate::reduction::ReductionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Maximums {
    pub vertices: usize,
    pub polygons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexEntry {
    pub name: String,
    pub coords: [f64; 3],
}

/// Everything a viewer needs to draw the mesh and animate its reduction.
#[derive(Debug, Clone, Serialize)]
pub struct GeometryDocument {
    pub maximums: Maximums,
    pub vertices: Vec<VertexEntry>,
    pub polygons: Vec<[String; 3]>,
    pub graph_index_map: BTreeMap<String, usize>,
    pub reduction: Vec<ReductionRecord>,
}

/// Build the viewer document for the model's current state.
pub fn document(model: &MeshModel) -> GeometryDocument {
    let graph = model.graph();

    let mut vertices = Vec::with_capacity(graph.vertex_count());
    let mut graph_index_map = BTreeMap::new();
    for (position, (name, coords)) in graph.iter().enumerate() {
        vertices.push(VertexEntry {
            name: name.to_string(),
            coords: [coords.x, coords.y, coords.z],
        });
        graph_index_map.insert(name.to_string(), position);
    }

    let polygons = graph.compute_all_polygons().into_keys().collect();

    GeometryDocument {
        maximums: Maximums {
            vertices: model.maximum_vertices(),
            polygons: model.maximum_polygons(),
        },
        vertices,
        polygons,
        graph_index_map,
        reduction: model.log().records().to_vec(),
    }
}

/// Write the document as pretty-printed JSON.
pub fn write_document(document: &GeometryDocument, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReduceOptions;
    use crate::reduction::ReductionLog;
    use crate::vector_ops::Vec3;
    use crate::vertex_graph::VertexGraph;
    use std::collections::HashMap;

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

    #[test]
    fn test_document_shape() {
        let model = tetrahedron_model();
        let document = document(&model);

        assert_eq!(document.maximums.vertices, 4);
        assert_eq!(document.maximums.polygons, 4);
        assert_eq!(document.vertices.len(), 4);
        assert_eq!(document.vertices[0].name, "1");
        assert_eq!(document.polygons.len(), 4);
        assert_eq!(document.graph_index_map["1"], 0);
        assert_eq!(document.graph_index_map["4"], 3);
        assert!(document.reduction.is_empty());
    }

    #[test]
    fn test_document_carries_reduction_records() {
        let mut model = tetrahedron_model();
        model.reduce(ReduceOptions::new().iterations(1)).unwrap();
        let document = document(&model);

        assert_eq!(document.reduction.len(), 1);
        assert_eq!(document.reduction[0].midpoint, "m1");
        // Maximums reflect load time, not the reduced state.
        assert_eq!(document.maximums.vertices, 4);
        assert_eq!(document.vertices.len(), 3);
    }

    #[test]
    fn test_serialised_field_names() {
        let model = tetrahedron_model();
        let value = serde_json::to_value(document(&model)).unwrap();
        for key in [
            "maximums",
            "vertices",
            "polygons",
            "graph_index_map",
            "reduction",
        ] {
            assert!(value.get(key).is_some(), "missing `{key}`");
        }
        assert_eq!(value["maximums"]["vertices"], 4);
    }
}
