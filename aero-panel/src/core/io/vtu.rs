//! Minimal VTK XML UnstructuredGrid writer (ASCII)
//!
//! Enough of the format for the per-step output files: points, mixed
//! cells (vertices, lines, triangles, quads) and named cell/point data
//! arrays.

use crate::core::types::Vec3;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// A named float data array with a fixed number of components per tuple
#[derive(Debug, Clone)]
pub struct DataArray {
    /// Array name as shown in the viewer
    pub name: String,
    /// Components per tuple (1 for scalars, 3 for vectors)
    pub components: usize,
    /// Flat data, tuple-major
    pub data: Vec<f64>,
}

impl DataArray {
    /// Scalar array from values.
    pub fn scalars<S: Into<String>>(name: S, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            components: 1,
            data,
        }
    }

    /// Vector array from 3-vectors.
    pub fn vectors<S: Into<String>>(name: S, data: &[Vec3]) -> Self {
        Self {
            name: name.into(),
            components: 3,
            data: data.iter().flat_map(|v| [v.x, v.y, v.z]).collect(),
        }
    }
}

/// One piece of an unstructured grid
#[derive(Debug, Clone, Default)]
pub struct VtuPiece {
    /// Point coordinates
    pub points: Vec<Vec3>,
    /// Cell connectivity; cell type is inferred from the length
    /// (1 = vertex, 2 = line, 3 = triangle, 4 = quad)
    pub cells: Vec<Vec<usize>>,
    /// Cell-centered data arrays
    pub cell_data: Vec<DataArray>,
    /// Point-centered data arrays
    pub point_data: Vec<DataArray>,
}

fn cell_type(len: usize) -> u8 {
    match len {
        1 => 1,  // VTK_VERTEX
        2 => 3,  // VTK_LINE
        3 => 5,  // VTK_TRIANGLE
        _ => 9,  // VTK_QUAD
    }
}

fn write_data_arrays(out: &mut String, arrays: &[DataArray]) {
    for array in arrays {
        let _ = write!(
            out,
            "        <DataArray type=\"Float64\" Name=\"{}\" NumberOfComponents=\"{}\" format=\"ascii\">\n          ",
            array.name, array.components
        );
        for v in &array.data {
            let _ = write!(out, "{:.12e} ", v);
        }
        out.push_str("\n        </DataArray>\n");
    }
}

/// Write pieces to a `.vtu` file.
pub fn write_vtu(path: &Path, pieces: &[VtuPiece]) -> io::Result<()> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\"?>\n");
    out.push_str(
        "<VTKFile type=\"UnstructuredGrid\" version=\"0.1\" byte_order=\"LittleEndian\">\n",
    );
    out.push_str("  <UnstructuredGrid>\n");

    for piece in pieces {
        let _ = write!(
            out,
            "    <Piece NumberOfPoints=\"{}\" NumberOfCells=\"{}\">\n",
            piece.points.len(),
            piece.cells.len()
        );

        out.push_str("      <Points>\n        <DataArray type=\"Float64\" NumberOfComponents=\"3\" format=\"ascii\">\n          ");
        for p in &piece.points {
            let _ = write!(out, "{:.12e} {:.12e} {:.12e} ", p.x, p.y, p.z);
        }
        out.push_str("\n        </DataArray>\n      </Points>\n");

        out.push_str("      <Cells>\n        <DataArray type=\"Int64\" Name=\"connectivity\" format=\"ascii\">\n          ");
        for cell in &piece.cells {
            for &v in cell {
                let _ = write!(out, "{} ", v);
            }
        }
        out.push_str("\n        </DataArray>\n        <DataArray type=\"Int64\" Name=\"offsets\" format=\"ascii\">\n          ");
        let mut offset = 0usize;
        for cell in &piece.cells {
            offset += cell.len();
            let _ = write!(out, "{} ", offset);
        }
        out.push_str("\n        </DataArray>\n        <DataArray type=\"UInt8\" Name=\"types\" format=\"ascii\">\n          ");
        for cell in &piece.cells {
            let _ = write!(out, "{} ", cell_type(cell.len()));
        }
        out.push_str("\n        </DataArray>\n      </Cells>\n");

        out.push_str("      <CellData>\n");
        write_data_arrays(&mut out, &piece.cell_data);
        out.push_str("      </CellData>\n");

        out.push_str("      <PointData>\n");
        write_data_arrays(&mut out, &piece.point_data);
        out.push_str("      </PointData>\n");

        out.push_str("    </Piece>\n");
    }

    out.push_str("  </UnstructuredGrid>\n</VTKFile>\n");
    fs::write(path, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_triangle_piece() {
        let piece = VtuPiece {
            points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            cells: vec![vec![0, 1, 2]],
            cell_data: vec![DataArray::scalars("Cp", vec![0.5])],
            point_data: vec![],
        };

        let dir = std::env::temp_dir().join("aeropanel-vtu-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tri.vtu");
        write_vtu(&path, &[piece]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("UnstructuredGrid"));
        assert!(contents.contains("Name=\"Cp\""));
        assert!(contents.contains("NumberOfCells=\"1\""));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cell_types() {
        assert_eq!(cell_type(1), 1);
        assert_eq!(cell_type(2), 3);
        assert_eq!(cell_type(3), 5);
        assert_eq!(cell_type(4), 9);
    }
}
