//! Wavefront OBJ parsing into a flat triangle list.
//!
//! Only geometry is read: `v`, `vt`, `vn` and `f`. Everything else (groups, materials, smoothing)
//! is skipped. Polygons are fan-triangulated from their first corner.

use glam::{Vec2, Vec3};

use super::{MeshBuffer, Vertex};
use crate::error::MeshLoadError;

/// One corner of a face as written in the file, before index resolution.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: i64,
    uv: Option<i64>,
    normal: Option<i64>,
}

/// A face together with the attribute counts seen when it was declared, which is what
/// negative (relative) indices are measured against.
#[derive(Debug)]
struct Face {
    line: usize,
    corners: Vec<Corner>,
    seen: [usize; 3],
}

/// Parses OBJ text into a triangle list.
pub fn parse_obj(source: &str) -> Result<MeshBuffer, MeshLoadError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let content = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let mut tokens = content.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, line, 3)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut tokens, line, 1)?;
                uvs.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, line, 3)?;
                normals.push(Vec3::new(x, y, z));
            }
            "f" => {
                let corners = tokens
                    .map(|token| parse_corner(token, line))
                    .collect::<Result<Vec<_>, _>>()?;
                if corners.len() < 3 {
                    return Err(MeshLoadError::Parse {
                        line,
                        message: format!("face has {} corners, at least 3 required", corners.len()),
                    });
                }
                faces.push(Face {
                    line,
                    corners,
                    seen: [positions.len(), uvs.len(), normals.len()],
                });
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(MeshLoadError::Empty);
    }

    let mut vertices = Vec::with_capacity(faces.iter().map(|f| (f.corners.len() - 2) * 3).sum());
    for face in &faces {
        let resolved = face
            .corners
            .iter()
            .map(|corner| resolve_corner(corner, face, &positions, &uvs, &normals))
            .collect::<Result<Vec<_>, _>>()?;

        for i in 1..resolved.len() - 1 {
            let triangle = [resolved[0], resolved[i], resolved[i + 1]];
            let flat = face_normal(&triangle);
            for (position, uv, normal) in triangle {
                vertices.push(Vertex::new(
                    position,
                    normal.unwrap_or(flat),
                    uv.unwrap_or(Vec2::ZERO),
                ));
            }
        }
    }

    MeshBuffer::new(vertices)
}

type ResolvedCorner = (Vec3, Option<Vec2>, Option<Vec3>);

fn resolve_corner(
    corner: &Corner,
    face: &Face,
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
) -> Result<ResolvedCorner, MeshLoadError> {
    let position = lookup(positions, corner.position, face.seen[0], face.line)?;
    let uv = corner
        .uv
        .map(|i| lookup(uvs, i, face.seen[1], face.line))
        .transpose()?;
    let normal = corner
        .normal
        .map(|i| lookup(normals, i, face.seen[2], face.line))
        .transpose()?;
    Ok((position, uv, normal))
}

/// Resolves a one-based (or negative, relative) OBJ index.
fn lookup<T: Copy>(items: &[T], index: i64, seen: usize, line: usize) -> Result<T, MeshLoadError> {
    let out_of_range = MeshLoadError::IndexOutOfRange {
        line,
        index,
        len: items.len(),
    };
    let zero_based = if index > 0 {
        index - 1
    } else if index < 0 {
        seen as i64 + index
    } else {
        return Err(out_of_range);
    };
    usize::try_from(zero_based)
        .ok()
        .and_then(|i| items.get(i).copied())
        .ok_or(out_of_range)
}

fn face_normal(triangle: &[ResolvedCorner; 3]) -> Vec3 {
    let a = triangle[0].0;
    let b = triangle[1].0;
    let c = triangle[2].0;
    (b - a).cross(c - a).normalize_or_zero()
}

fn parse_corner(token: &str, line: usize) -> Result<Corner, MeshLoadError> {
    let mut parts = token.split('/');
    let position = parse_index(parts.next().unwrap_or(""), line)?;
    let uv = match parts.next() {
        Some("") | None => None,
        Some(p) => Some(parse_index(p, line)?),
    };
    let normal = match parts.next() {
        Some("") | None => None,
        Some(p) => Some(parse_index(p, line)?),
    };
    if parts.next().is_some() {
        return Err(MeshLoadError::Parse {
            line,
            message: format!("malformed face corner \"{token}\""),
        });
    }
    Ok(Corner {
        position,
        uv,
        normal,
    })
}

fn parse_index(token: &str, line: usize) -> Result<i64, MeshLoadError> {
    token.parse::<i64>().map_err(|_| MeshLoadError::Parse {
        line,
        message: format!("invalid index \"{token}\""),
    })
}

/// Reads up to `N` floats, requiring at least `required` of them. Missing optional components
/// are zero.
fn parse_floats<const N: usize>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    line: usize,
    required: usize,
) -> Result<[f32; N], MeshLoadError> {
    let mut out = [0.0; N];
    let mut count = 0;
    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token.parse::<f32>().map_err(|_| MeshLoadError::Parse {
            line,
            message: format!("invalid number \"{token}\""),
        })?;
        count += 1;
    }
    if count < required {
        return Err(MeshLoadError::Parse {
            line,
            message: format!("expected {required} components, found {count}"),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);

        let positions: Vec<Vec3> = mesh.vertices().iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]
        );
        assert_eq!(mesh.vertices()[5].uv, Vec2::new(0.0, 1.0));
        assert!(mesh.vertices().iter().all(|v| v.normal == Vec3::Z));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 7\n";
        assert_eq!(
            parse_obj(src),
            Err(MeshLoadError::IndexOutOfRange {
                line: 4,
                index: 7,
                len: 3
            })
        );
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse_obj(src).unwrap();
        assert_eq!(mesh.vertices()[1].position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_normals_fall_back_to_face_normal() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_obj(src).unwrap();
        assert_eq!(mesh.vertices()[0].normal, Vec3::Z);
        assert_eq!(mesh.vertices()[0].uv, Vec2::ZERO);
    }

    #[test]
    fn test_position_only_and_normal_only_corners() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let mesh = parse_obj(src).unwrap();
        assert_eq!(mesh.vertices()[2].normal, Vec3::NEG_Z);
    }

    #[test]
    fn test_degenerate_face_and_garbage() {
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n"),
            Err(MeshLoadError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 zero 0\n"),
            Err(MeshLoadError::Parse { line: 1, .. })
        ));
        assert_eq!(parse_obj("# nothing here\n"), Err(MeshLoadError::Empty));
    }

    #[test]
    fn test_zero_index_is_invalid() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(matches!(
            parse_obj(src),
            Err(MeshLoadError::IndexOutOfRange { index: 0, .. })
        ));
    }
}
