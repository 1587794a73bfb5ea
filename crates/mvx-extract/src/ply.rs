//! ASCII PLY mesh writer
//!
//! Scan meshes are exported as text PLY with white-colored faces, the shape
//! downstream mesh viewers already consume.

use mvx_archive::ScanMesh;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a scan mesh as an ASCII PLY file
pub fn write_ply(path: &Path, mesh: &ScanMesh) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", mesh.vertices.len())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "element face {}", mesh.triangles.len())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "property uchar red")?;
    writeln!(out, "property uchar green")?;
    writeln!(out, "property uchar blue")?;
    writeln!(out, "end_header")?;

    for [x, y, z] in &mesh.vertices {
        writeln!(out, "{} {} {}", x, y, z)?;
    }
    for [a, b, c] in &mesh.triangles {
        writeln!(out, "3 {} {} {} 255 255 255", a, b, c)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ply_output() {
        let mesh = ScanMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[0, 1, 2]],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.ply");
        write_ply(&path, &mesh).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ply");
        assert!(lines.contains(&"element vertex 3"));
        assert!(lines.contains(&"element face 1"));
        assert!(lines.contains(&"end_header"));
        assert_eq!(lines.last().unwrap(), &"3 0 1 2 255 255 255");
    }
}
