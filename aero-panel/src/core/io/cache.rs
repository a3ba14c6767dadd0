//! Influence-coefficient cache
//!
//! The dense A and B matrices depend only on geometry and dominate
//! case start-up, so they are persisted next to the geometry file as
//! `<geomFile>.infCoeff`: a 12-byte header (magic, nBody, nWake)
//! followed by A then B in row-major little-endian f64. An absent or
//! incompatible file is a miss, never an error.

use crate::core::error::AeroError;
use ndarray::Array2;
use std::fs;
use std::path::Path;

const MAGIC: u32 = 0xC0EF_F1A0;
const HEADER_LEN: usize = 12;

/// Load cached matrices, checking the header against the current panel
/// counts. Returns `None` (a cache miss) when the file is absent,
/// truncated or belongs to a different panelization.
pub fn load(path: &Path, n_body: usize, n_wake: usize) -> Option<(Array2<f64>, Array2<f64>)> {
    let bytes = fs::read(path).ok()?;
    if bytes.len() < HEADER_LEN {
        log::warn!("influence cache {} is truncated; recomputing", path.display());
        return None;
    }

    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let file_body = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let file_wake = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;

    if magic != MAGIC || file_body != n_body || file_wake != n_wake {
        log::warn!(
            "influence cache {} is incompatible ({} body / {} wake panels, expected {} / {}); recomputing",
            path.display(),
            file_body,
            file_wake,
            n_body,
            n_wake
        );
        return None;
    }

    let n = n_body * n_body;
    if bytes.len() != HEADER_LEN + 2 * n * 8 {
        log::warn!("influence cache {} has wrong length; recomputing", path.display());
        return None;
    }

    let read_matrix = |offset: usize| -> Array2<f64> {
        let mut data = Vec::with_capacity(n);
        for i in 0..n {
            let start = offset + i * 8;
            data.push(f64::from_le_bytes(bytes[start..start + 8].try_into().unwrap()));
        }
        Array2::from_shape_vec((n_body, n_body), data).unwrap()
    };

    let a = read_matrix(HEADER_LEN);
    let b = read_matrix(HEADER_LEN + n * 8);
    Some((a, b))
}

/// Write the matrices to the cache file.
pub fn save(path: &Path, a: &Array2<f64>, b: &Array2<f64>, n_wake: usize) -> Result<(), AeroError> {
    let n_body = a.nrows();
    let mut bytes = Vec::with_capacity(HEADER_LEN + 2 * n_body * n_body * 8);
    bytes.extend_from_slice(&MAGIC.to_le_bytes());
    bytes.extend_from_slice(&(n_body as u32).to_le_bytes());
    bytes.extend_from_slice(&(n_wake as u32).to_le_bytes());
    for &v in a.iter() {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    for &v in b.iter() {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cache_roundtrip_bit_identical() {
        let a = array![[1.0, 2.5e-17], [-3.75, f64::MIN_POSITIVE]];
        let b = array![[0.1, 0.2], [0.3, 0.4]];

        let dir = std::env::temp_dir().join("aeropanel-cache-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.tri.infCoeff");

        save(&path, &a, &b, 7).unwrap();
        let (a2, b2) = load(&path, 2, 7).expect("cache should hit");

        // Bit-identical round trip
        for (x, y) in a.iter().zip(a2.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        for (x, y) in b.iter().zip(b2.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cache_incompatible_is_miss() {
        let a = array![[1.0]];
        let b = array![[2.0]];
        let dir = std::env::temp_dir().join("aeropanel-cache-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mismatch.tri.infCoeff");
        save(&path, &a, &b, 0).unwrap();

        // Different panel counts: treated as a miss
        assert!(load(&path, 2, 0).is_none());
        assert!(load(&path, 1, 3).is_none());
        assert!(load(&path, 1, 0).is_some());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cache_missing_file_is_miss() {
        assert!(load(Path::new("/nonexistent/xyz.infCoeff"), 1, 0).is_none());
    }
}
