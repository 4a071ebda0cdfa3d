//! Model decoders turning fetched asset bytes into template meshes

use gltf::buffer::Source;
use gltf::mesh::Mode;
use gltf::Gltf;
use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::DecoderKind;
use crate::error::DecodeError;
use crate::geometry::{Mesh, Triangle, Vertex};

/// Decodes a fetched asset into a renderable mesh.
pub trait ModelDecoder {
    fn decode(&self, bytes: &[u8], url: &str) -> Result<Mesh, DecodeError>;
}

pub fn decoder_for(kind: DecoderKind) -> Box<dyn ModelDecoder> {
    match kind {
        DecoderKind::Gltf => Box::new(GltfDecoder),
        DecoderKind::Placeholder => Box::new(PlaceholderDecoder),
    }
}

/// Scaffolding decoder: ignores the asset entirely and returns a unit cube,
/// so the placement loop can be exercised without real model files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderDecoder;

impl ModelDecoder for PlaceholderDecoder {
    fn decode(&self, _bytes: &[u8], url: &str) -> Result<Mesh, DecodeError> {
        log::debug!("placeholder decoder standing in for {}", url);
        Ok(Mesh::cube(1.0))
    }
}

/// Binary glTF decoder. Buffers must live in the GLB binary chunk.
///
/// Only triangle-list primitives are kept. Node transforms of the default
/// scene are baked into the vertices; missing normals fall back to face normals.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfDecoder;

impl ModelDecoder for GltfDecoder {
    fn decode(&self, bytes: &[u8], url: &str) -> Result<Mesh, DecodeError> {
        let gltf = Gltf::from_slice(bytes)?;
        let buffers = load_buffers(&gltf)?;
        let mut mesh = Mesh::new();

        match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    append_node(&node, &Matrix4::identity(), &buffers, &mut mesh)?;
                }
            }
            None => {
                for gltf_mesh in gltf.meshes() {
                    append_mesh(&gltf_mesh, &Matrix4::identity(), &buffers, &mut mesh)?;
                }
            }
        }

        if mesh.is_empty() {
            return Err(DecodeError::Empty);
        }
        log::debug!("decoded {} triangles from {}", mesh.triangles.len(), url);
        Ok(mesh)
    }
}

fn load_buffers(gltf: &Gltf) -> Result<Vec<Vec<u8>>, DecodeError> {
    gltf.buffers()
        .map(|buffer| match buffer.source() {
            Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| DecodeError::UnsupportedBuffer("missing binary chunk".into())),
            Source::Uri(uri) => Err(DecodeError::UnsupportedBuffer(uri.to_string())),
        })
        .collect()
}

fn append_node(
    node: &gltf::Node,
    parent: &Matrix4<f32>,
    buffers: &[Vec<u8>],
    out: &mut Mesh,
) -> Result<(), DecodeError> {
    let world = parent * Matrix4::from(node.transform().matrix());

    if let Some(gltf_mesh) = node.mesh() {
        append_mesh(&gltf_mesh, &world, buffers, out)?;
    }
    for child in node.children() {
        append_node(&child, &world, buffers, out)?;
    }
    Ok(())
}

fn append_mesh(
    gltf_mesh: &gltf::Mesh,
    world: &Matrix4<f32>,
    buffers: &[Vec<u8>],
    out: &mut Mesh,
) -> Result<(), DecodeError> {
    let mut local = Mesh::new();

    for primitive in gltf_mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            log::debug!("skipping {:?} primitive", primitive.mode());
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| DecodeError::InvalidGeometry("primitive without positions".into()))?
            .collect();
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        for corner in indices.chunks_exact(3) {
            let vertex = |i: u32| -> Result<(Point3<f32>, Option<Vector3<f32>>), DecodeError> {
                let i = i as usize;
                let p = positions.get(i).ok_or_else(|| {
                    DecodeError::InvalidGeometry(format!("index {} out of range", i))
                })?;
                let n = normals.as_ref().and_then(|n| n.get(i)).map(|n| Vector3::from(*n));
                Ok((Point3::from(*p), n))
            };
            let (p0, n0) = vertex(corner[0])?;
            let (p1, n1) = vertex(corner[1])?;
            let (p2, n2) = vertex(corner[2])?;

            let face = (p1 - p0).cross(&(p2 - p0)).try_normalize(f32::EPSILON);
            let Some(face) = face.or(n0) else {
                // Degenerate triangle without a usable normal
                continue;
            };

            let make = |p: Point3<f32>, n: Option<Vector3<f32>>| {
                let n = n.unwrap_or(face);
                Vertex::new(p.x, p.y, p.z, n.x, n.y, n.z)
            };
            local.add_triangle(Triangle::new(make(p0, n0), make(p1, n1), make(p2, n2)));
        }
    }

    out.triangles.extend(local.transformed(world).triangles);
    Ok(())
}
