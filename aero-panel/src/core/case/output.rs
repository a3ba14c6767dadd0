//! Per-step output files
//!
//! Each case writes into `./V<V>_Mach<M>_alpha<α>_beta<β>/`: surface,
//! wake, filament and particle VTU files indexed by time step, spanwise
//! load CSVs per wake, and `streamlines.vtu` when tracing is enabled.

use super::AeroCase;
use crate::core::error::AeroError;
use crate::core::io::vtu::{write_vtu, DataArray, VtuPiece};
use crate::core::types::Vec3;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

impl AeroCase<'_> {
    fn output_dir(&self) -> PathBuf {
        self.output_root.join(format!(
            "V{}_Mach{}_alpha{}_beta{}",
            self.flow.v_mag, self.flow.mach, self.flow.alpha, self.flow.beta
        ))
    }

    /// Write the per-step output tree. Failure to create the output
    /// directory is fatal.
    pub(super) fn write_files(&mut self) -> Result<(), AeroError> {
        if !self.config.write_vtu {
            return Ok(());
        }
        let dir = self.output_dir();
        fs::create_dir_all(&dir)?;

        self.write_body_data(&dir)?;
        if !self.geom.wake_panels.is_empty() {
            self.write_wake_data(&dir)?;
            self.write_spanwise_data(&dir)?;
        }
        if self.config.vortex_particles && self.time_step > 0 {
            self.write_particle_data(&dir)?;
            self.write_filament_data(&dir)?;
        }
        if self.config.surf_stream_flag && !self.streamlines.is_empty() {
            self.write_streamlines()?;
        }
        Ok(())
    }

    fn write_body_data(&self, dir: &PathBuf) -> Result<(), AeroError> {
        let points: Vec<Vec3> = self.geom.nodes.iter().map(|n| n.pnt).collect();
        let panels = &self.geom.body_panels;

        let piece = VtuPiece {
            points,
            cells: panels.iter().map(|p| p.base.verts.clone()).collect(),
            cell_data: vec![
                DataArray::scalars(
                    "Doublet Strengths",
                    panels.iter().map(|p| p.base.mu).collect(),
                ),
                DataArray::scalars(
                    "Source Strengths",
                    panels.iter().map(|p| p.base.sigma).collect(),
                ),
                DataArray::scalars(
                    "Velocity Potential",
                    panels.iter().map(|p| p.base.potential).collect(),
                ),
                DataArray::vectors(
                    "Velocity",
                    &panels.iter().map(|p| p.velocity).collect::<Vec<_>>(),
                ),
                DataArray::scalars("Cp", panels.iter().map(|p| p.cp).collect()),
                DataArray::vectors(
                    "bezNormals",
                    &panels.iter().map(|p| p.base.bez_normal).collect::<Vec<_>>(),
                ),
                DataArray::scalars(
                    "xPosition",
                    panels.iter().map(|p| p.base.centroid.x).collect(),
                ),
                DataArray::scalars(
                    "yPosition",
                    panels.iter().map(|p| p.base.centroid.y).collect(),
                ),
                DataArray::scalars(
                    "zPosition",
                    panels.iter().map(|p| p.base.centroid.z).collect(),
                ),
            ],
            point_data: vec![],
        };

        let path = dir.join(format!("surfaceData-{}.vtu", self.time_step));
        write_vtu(&path, &[piece])?;
        Ok(())
    }

    fn write_wake_data(&self, dir: &PathBuf) -> Result<(), AeroError> {
        let points: Vec<Vec3> = self.geom.nodes.iter().map(|n| n.pnt).collect();
        let panels = &self.geom.wake_panels;

        let piece = VtuPiece {
            points,
            cells: panels.iter().map(|p| p.base.verts.clone()).collect(),
            cell_data: vec![
                DataArray::scalars(
                    "Doublet Strengths",
                    panels.iter().map(|p| p.base.mu).collect(),
                ),
                DataArray::scalars(
                    "Velocity Potential",
                    panels.iter().map(|p| p.base.potential).collect(),
                ),
            ],
            point_data: vec![],
        };

        let path = dir.join(format!("wakeData-{}.vtu", self.time_step));
        write_vtu(&path, &[piece])?;
        Ok(())
    }

    fn write_filament_data(&self, dir: &PathBuf) -> Result<(), AeroError> {
        let mut points = Vec::with_capacity(2 * self.filaments.len());
        let mut cells = Vec::with_capacity(self.filaments.len());
        for (i, f) in self.filaments.iter().enumerate() {
            points.push(f.p1);
            points.push(f.p2);
            cells.push(vec![2 * i, 2 * i + 1]);
        }

        let piece = VtuPiece {
            points,
            cells,
            cell_data: vec![DataArray::scalars(
                "Gamma",
                self.filaments.iter().map(|f| f.strength).collect(),
            )],
            point_data: vec![],
        };

        let path = dir.join(format!("filaments-{}.vtu", self.time_step));
        write_vtu(&path, &[piece])?;
        Ok(())
    }

    fn write_particle_data(&self, dir: &PathBuf) -> Result<(), AeroError> {
        let piece = VtuPiece {
            points: self.particles.iter().map(|p| p.pos).collect(),
            cells: (0..self.particles.len()).map(|i| vec![i]).collect(),
            cell_data: vec![DataArray::vectors(
                "Strength",
                &self.particles.iter().map(|p| p.strength).collect::<Vec<_>>(),
            )],
            point_data: vec![],
        };

        let path = dir.join(format!("particleData-{}.vtu", self.time_step));
        write_vtu(&path, &[piece])?;
        Ok(())
    }

    fn write_spanwise_data(&self, dir: &PathBuf) -> Result<(), AeroError> {
        let pg = self.flow.pg;
        for (k, result) in self.trefftz_results.iter().enumerate() {
            let path = dir.join(format!("spanwiseData_Wake{}.csv", k + 1));
            let mut file = fs::File::create(&path)?;
            writeln!(file, "2y/b,Cl,Cdi")?;
            for i in 0..result.span_loc.len() {
                writeln!(
                    file,
                    "{},{},{}",
                    2.0 * result.span_loc[i] / self.refs.bref,
                    result.cl[i] / pg,
                    result.cd[i] / (pg * pg)
                )?;
            }
        }
        Ok(())
    }

    /// Spanwise loads become available only after the Trefftz analysis;
    /// particle-mode cases write them once at the end.
    pub(super) fn write_final_spanwise(&self) -> Result<(), AeroError> {
        if !self.config.write_vtu || self.trefftz_results.is_empty() {
            return Ok(());
        }
        let dir = self.output_dir();
        fs::create_dir_all(&dir)?;
        self.write_spanwise_data(&dir)
    }

    pub(super) fn write_streamlines(&self) -> Result<(), AeroError> {
        if !self.config.write_vtu {
            return Ok(());
        }
        let dir = self.output_dir();
        fs::create_dir_all(&dir)?;

        let pieces: Vec<VtuPiece> = self
            .streamlines
            .iter()
            .map(|s| VtuPiece {
                points: s.points.clone(),
                cells: (0..s.points.len().saturating_sub(1))
                    .map(|i| vec![i, i + 1])
                    .collect(),
                cell_data: vec![],
                point_data: vec![DataArray::vectors("Velocity", &s.velocities)],
            })
            .collect();

        write_vtu(&dir.join("streamlines.vtu"), &pieces)?;
        Ok(())
    }
}
