// src/obj_codec.rs
//! Wavefront OBJ ingestion and emission.
//!
//! The codec is line oriented: the first whitespace-delimited token of a
//! line is the opcode, the rest are arguments. Reduction metadata rides in
//! structured comments (`# REDUCTION_VERTEX_KEYS ...` first and
//! `# REDUCTION_DATA ...` last) so a reduced file stays valid for any
//! other OBJ consumer. Unknown opcodes are preserved verbatim and written
//! back out on emit, with the exception of `usemtl` which is dropped.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::error::{Error, Result};
use crate::model::MeshModel;
use crate::reduction::ReductionLog;
use crate::vector_ops::Vec3;
use crate::vertex_graph::VertexGraph;

const KEYS_COMMENT: &str = "REDUCTION_VERTEX_KEYS";
const DATA_COMMENT: &str = "REDUCTION_DATA";

/// Parse an OBJ file into a [`MeshModel`].
///
/// Vertices are named by ascending 1-based integers unless a key comment
/// earlier in the file reinstates the names of a previous reduction run.
/// Faces must be triangles; only the leading index of each `i/t/n`
/// argument is consumed.
pub fn process_obj_file(path: impl AsRef<Path>) -> Result<MeshModel> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut graph = VertexGraph::new();
    let mut preserved_headers: Vec<String> = Vec::new();
    let mut log = ReductionLog::new();
    let mut original_index_map: HashMap<usize, String> = HashMap::new();
    let mut vertex_count = 0usize;

    for (line_index, line) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(op_code) = tokens.next() else {
            continue;
        };
        let arguments: Vec<&str> = tokens.collect();

        match op_code {
            "v" => {
                if arguments.len() != 3 {
                    return Err(Error::parse(
                        line_number,
                        format!("vertex needs 3 coordinates, found {}", arguments.len()),
                    ));
                }
                let mut coords = [0.0f64; 3];
                for (slot, raw) in coords.iter_mut().zip(&arguments) {
                    *slot = raw.parse().map_err(|_| {
                        Error::parse(line_number, format!("bad float literal `{raw}`"))
                    })?;
                }
                vertex_count += 1;
                let name = match original_index_map.get(&vertex_count) {
                    Some(key) => key.clone(),
                    None => vertex_count.to_string(),
                };
                graph.reserve_collapse_name(&name);
                graph
                    .add_node(name, Vec3::from(coords))
                    .map_err(|e| Error::parse(line_number, e.to_string()))?;
            }
            // Texture and normal data carry no reducible geometry.
            "vt" | "vn" => {}
            "vp" => return Err(Error::unsupported(line_number, "free-form geometry (vp)")),
            "f" => {
                if arguments.len() != 3 {
                    return Err(Error::unsupported(
                        line_number,
                        format!("polygon with {} vertices", arguments.len()),
                    ));
                }
                let mut names = Vec::with_capacity(3);
                for raw in &arguments {
                    let index_token = match raw.split_once('/') {
                        Some((head, _)) => head,
                        None => raw,
                    };
                    let index: usize = index_token.parse().map_err(|_| {
                        Error::parse(line_number, format!("bad face index `{index_token}`"))
                    })?;
                    let name = match original_index_map.get(&index) {
                        Some(key) => key.clone(),
                        None => index.to_string(),
                    };
                    names.push(name);
                }
                for (a, b) in [(0, 1), (0, 2), (1, 2)] {
                    graph
                        .add_edge(&names[a], &names[b])
                        .map_err(|e| Error::parse(line_number, e.to_string()))?;
                }
            }
            "l" => return Err(Error::unsupported(line_number, "line elements (l)")),
            "#" => {
                let Some(first) = arguments.first() else {
                    continue;
                };
                if first.starts_with(DATA_COMMENT) {
                    if let Some(payload) = arguments.get(1) {
                        log = ReductionLog::from_json(payload).map_err(|e| {
                            Error::parse(line_number, format!("bad reduction data: {e}"))
                        })?;
                    }
                } else if *first == KEYS_COMMENT {
                    let Some(payload) = arguments.get(1) else {
                        continue;
                    };
                    let keys: Vec<String> = serde_json::from_str(payload).map_err(|e| {
                        Error::parse(line_number, format!("bad vertex keys: {e}"))
                    })?;
                    for (offset, key) in keys.into_iter().enumerate() {
                        original_index_map.insert(offset + 1, key);
                    }
                }
            }
            // Material assignments cannot survive reduction; everything
            // else passes through untouched.
            "usemtl" => {}
            other => {
                if arguments.is_empty() {
                    preserved_headers.push(other.to_string());
                } else {
                    preserved_headers.push(format!("{} {}", other, arguments.join(" ")));
                }
            }
        }
    }

    info!(
        "loaded {}: {} vertices, {} preserved headers, log length {}",
        path.display(),
        graph.vertex_count(),
        preserved_headers.len(),
        log.len()
    );
    Ok(MeshModel::from_parts(
        isolate_stem(path),
        graph,
        preserved_headers,
        log,
        original_index_map,
    ))
}

/// Write `model` as `<stem>_reduced_<timestamp>[.rr].obj` and return the
/// generated path. The `.rr` infix marks files that embed a reduction log.
pub fn write_obj_file(model: &MeshModel, include_log: bool) -> Result<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let log_len = if include_log { model.log().len() } else { 0 };
    let mut lines: Vec<String> = vec![
        format!("# REDUCTION_V1_LEN_{log_len}"),
        format!("# Generated by promesh at {timestamp}"),
        "# Preserved Headers".to_string(),
    ];
    lines.extend(model.preserved_headers().iter().cloned());

    lines.push(String::new());
    lines.push("# Vertices".to_string());

    // Emission indices restart at 1 in insertion order.
    let mut emission_index: HashMap<String, usize> = HashMap::new();
    let mut save_order: Vec<String> = Vec::new();
    for (position, (name, coords)) in model.graph().iter().enumerate() {
        lines.push(format!("v {} {} {}", coords.x, coords.y, coords.z));
        emission_index.insert(name.to_string(), position + 1);
        save_order.push(name.to_string());
    }

    let mut seen_normals: HashSet<String> = HashSet::new();
    let mut normal_lines: Vec<String> = Vec::new();
    let mut face_lines: Vec<String> = Vec::new();
    for polygon in model.graph().compute_all_polygons().values() {
        let normal_line = format!(
            "vn {} {} {}",
            polygon.normal.x, polygon.normal.y, polygon.normal.z
        );
        if seen_normals.insert(normal_line.clone()) {
            normal_lines.push(normal_line);
        }
        // The slot after the second slash stays empty.
        let [a, b, c] = &polygon.vertices;
        face_lines.push(format!(
            "f {}// {}// {}//",
            emission_index[a], emission_index[b], emission_index[c]
        ));
    }

    lines.push(String::new());
    lines.push("# Normal Vectors".to_string());
    lines.extend(normal_lines);
    lines.push(String::new());
    lines.push("# Polygon Faces".to_string());
    lines.extend(face_lines);

    if include_log {
        lines.push(String::new());
        let keys = serde_json::to_string(&save_order)?;
        lines.insert(0, format!("# {KEYS_COMMENT} {keys}"));
        lines.push(format!("# {DATA_COMMENT} {}", model.log().to_compact_json()?));
    }

    let out_path = PathBuf::from(format!(
        "{}_reduced_{}{}.obj",
        model.stem(),
        timestamp,
        if include_log { ".rr" } else { "" }
    ));
    let mut writer = BufWriter::new(File::create(&out_path)?);
    for line in &lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;

    info!("wrote {} ({} lines)", out_path.display(), lines.len());
    Ok(out_path)
}

/// Path text up to the last extension dot, keeping any directory prefix.
fn isolate_stem(path: &Path) -> String {
    let text = path.to_string_lossy();
    match text.rfind('.') {
        Some(position) => text[..position].to_string(),
        None => text.into_owned(),
    }
}
