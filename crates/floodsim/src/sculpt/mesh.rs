//! A sculptable terrain grid made of named additive layers.

use std::path::Path;

use glam::Vec3;
use noise::{NoiseFn, Simplex};

use super::brush::{Brush, DisplacementChange, Profile};
use crate::error::{NameKind, Result, SimError};
use crate::grid::{AffectedCell, Grid, HeightField};

/// Named grid of signed height offsets.
#[derive(Clone, Debug)]
pub struct SculptLayer {
    pub name: String,
    pub data: Vec<f32>,
}

impl SculptLayer {
    fn new(name: &str, cells: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0.0; cells],
        }
    }

    /// Shift every sample so the minimum is exactly zero.
    fn shift_min_to_zero(&mut self) {
        let min = self.data.iter().copied().fold(f32::INFINITY, f32::min);
        if min.is_finite() {
            for v in &mut self.data {
                *v -= min;
            }
        }
    }
}

/// Terrain grid whose height is `base_height + Σ layers`.
#[derive(Clone, Debug)]
pub struct SculptMesh {
    grid: Grid,
    base_height: f32,
    layers: Vec<SculptLayer>,
    current: Option<usize>,
    displacement: Vec<f32>,
    heights: HeightField,
    normals: Vec<Vec3>,
    normals_dirty: bool,
    noise_seed: u32,
}

impl SculptMesh {
    /// Create a flat mesh with no layers.
    pub fn new(grid: Grid, base_height: f32) -> Self {
        let cells = grid.cell_count();
        Self {
            grid,
            base_height,
            layers: Vec::new(),
            current: None,
            displacement: vec![0.0; cells],
            heights: HeightField::new(grid, base_height),
            normals: vec![Vec3::Y; cells],
            normals_dirty: false,
            noise_seed: 0,
        }
    }

    /// Seed used by [`SculptMesh::add_noise`].
    pub fn with_noise_seed(mut self, seed: u32) -> Self {
        self.noise_seed = seed;
        self
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn base_height(&self) -> f32 {
        self.base_height
    }

    // ===== Layers =====

    /// Create a zero-filled layer and make it current.
    pub fn add_layer(&mut self, name: &str) -> Result<()> {
        if self.layer_index(name).is_some() {
            return Err(SimError::duplicate(NameKind::Layer, name));
        }
        self.layers.push(SculptLayer::new(name, self.grid.cell_count()));
        self.current = Some(self.layers.len() - 1);
        log::debug!("added sculpt layer '{}'", name);
        Ok(())
    }

    /// Drop a layer; its contribution leaves the composite immediately.
    pub fn remove_layer(&mut self, name: &str) -> Result<SculptLayer> {
        let index = self
            .layer_index(name)
            .ok_or_else(|| SimError::not_found(NameKind::Layer, name))?;
        let removed = self.layers.remove(index);
        self.current = match self.current {
            Some(c) if c == index => self.layers.len().checked_sub(1),
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        self.update_all();
        log::debug!("removed sculpt layer '{}'", name);
        Ok(removed)
    }

    pub fn set_current_layer(&mut self, name: &str) -> Result<()> {
        let index = self
            .layer_index(name)
            .ok_or_else(|| SimError::not_found(NameKind::Layer, name))?;
        self.current = Some(index);
        Ok(())
    }

    pub fn current_layer_name(&self) -> Option<&str> {
        self.current.map(|c| self.layers[c].name.as_str())
    }

    pub fn layer(&self, name: &str) -> Option<&SculptLayer> {
        self.layer_index(name).map(|i| &self.layers[i])
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    fn current_index(&self) -> Result<usize> {
        self.current
            .ok_or_else(|| SimError::not_found(NameKind::Layer, "<current>"))
    }

    /// Per-cell sum of every layer except `skip`.
    fn others_sum(&self, skip: usize) -> Vec<f32> {
        let mut others = vec![0.0; self.grid.cell_count()];
        for (i, layer) in self.layers.iter().enumerate() {
            if i == skip {
                continue;
            }
            for (o, v) in others.iter_mut().zip(&layer.data) {
                *o += v;
            }
        }
        others
    }

    // ===== Whole-layer generators =====

    /// Fill the current layer from greyscale samples (`res * res`, row-major).
    ///
    /// Samples map to `[0, 1]`; with `mid_grey_is_lowest` the value becomes
    /// `|v - 0.5|`. The result is scaled by `amount` and shifted so the
    /// layer minimum is 0.
    pub fn load_from_image_data(
        &mut self,
        samples: &[u8],
        amount: f32,
        mid_grey_is_lowest: bool,
    ) -> Result<()> {
        if samples.len() != self.grid.cell_count() {
            return Err(SimError::config(format!(
                "image data has {} samples, mesh needs {}",
                samples.len(),
                self.grid.cell_count()
            )));
        }
        let current = self.current_index()?;
        let layer = &mut self.layers[current];
        for (v, &s) in layer.data.iter_mut().zip(samples) {
            let mut grey = s as f32 / 255.0;
            if mid_grey_is_lowest {
                grey = (grey - 0.5).abs();
            }
            *v = grey * amount;
        }
        layer.shift_min_to_zero();
        self.update_all();
        Ok(())
    }

    /// Decode a greyscale image, resample it to the grid and load it into
    /// the current layer. Rows of the image run along +Z.
    pub fn load_layer_from_image(
        &mut self,
        path: &Path,
        amount: f32,
        mid_grey_is_lowest: bool,
    ) -> Result<()> {
        let res = self.grid.res() as u32;
        let luma = image::open(path)?.to_luma8();
        let resized = image::imageops::resize(&luma, res, res, image::imageops::FilterType::Triangle);
        log::info!(
            "loaded heightmap {} ({}x{} -> {}x{})",
            path.display(),
            luma.width(),
            luma.height(),
            res,
            res
        );
        self.load_from_image_data(resized.as_raw(), amount, mid_grey_is_lowest)
    }

    /// Fill the current layer with 3D simplex noise sampled at each vertex.
    pub fn add_noise(&mut self, amplitude: f32, frequency: Vec3, offset: Vec3) -> Result<()> {
        let current = self.current_index()?;
        let simplex = Simplex::new(self.noise_seed);
        let grid = self.grid;
        let base = self.base_height;
        let layer = &mut self.layers[current];
        for (idx, v) in layer.data.iter_mut().enumerate() {
            let p = grid.cell_center(idx) + Vec3::new(0.0, base, 0.0);
            let n = simplex.get([
                (p.x * frequency.x + offset.x) as f64,
                (p.y * frequency.y + offset.y) as f64,
                (p.z * frequency.z + offset.z) as f64,
            ]) as f32;
            *v = (n + 1.0) * 0.5 * amplitude;
        }
        layer.shift_min_to_zero();
        self.update_all();
        Ok(())
    }

    /// Zero every layer.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.data.fill(0.0);
        }
        self.update_all();
    }

    // ===== Brushes =====

    /// Vertices under a circular brush of `radius` centred at `position`.
    pub fn affected_vertices(&self, position: Vec3, radius: f32) -> Vec<AffectedCell> {
        self.grid.gather(position, radius)
    }

    /// Apply `brush` of diameter `size` to the current layer.
    pub fn apply_brush(
        &mut self,
        brush: Brush,
        position: Vec3,
        size: f32,
        amount: f32,
        profile: Profile,
    ) -> Result<Vec<DisplacementChange>> {
        let current = self.current_index()?;
        let affected = self.affected_vertices(position, size * 0.5);
        if affected.is_empty() {
            return Ok(Vec::new());
        }
        let others = self.others_sum(current);
        let changes = brush.apply(
            &mut self.layers[current].data,
            &others,
            &affected,
            amount,
            profile,
        );
        let ids: Vec<usize> = affected.iter().map(|c| c.id).collect();
        self.update(&ids);
        Ok(changes)
    }

    // ===== Composite =====

    /// Recompute the composite at every vertex.
    pub fn update_all(&mut self) {
        for idx in 0..self.grid.cell_count() {
            self.recompute(idx);
        }
        self.normals_dirty = true;
    }

    /// Recompute the composite at the given vertices.
    pub fn update(&mut self, ids: &[usize]) {
        for &idx in ids {
            self.recompute(idx);
        }
        self.normals_dirty = true;
    }

    fn recompute(&mut self, idx: usize) {
        let sum: f32 = self.layers.iter().map(|l| l.data[idx]).sum();
        self.displacement[idx] = sum;
        self.heights.set(idx, self.base_height + sum);
    }

    /// Composite displacement (sum of layers) per vertex.
    pub fn displacements(&self) -> &[f32] {
        &self.displacement
    }

    pub fn displacement(&self, idx: usize) -> f32 {
        self.displacement[idx]
    }

    /// Terrain elevation: base height plus composite displacement.
    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    pub fn normals_dirty(&self) -> bool {
        self.normals_dirty
    }

    /// Vertex normals, recomputed from central differences when dirty.
    pub fn normals(&mut self) -> &[Vec3] {
        if self.normals_dirty {
            self.recompute_normals();
            self.normals_dirty = false;
        }
        &self.normals
    }

    fn recompute_normals(&mut self) {
        let res = self.grid.res();
        let seg = self.grid.segment_size();
        let h = &self.heights;
        for row in 0..res {
            for col in 0..res {
                let l = h.get_height(row, col.saturating_sub(1));
                let r = h.get_height(row, (col + 1).min(res - 1));
                let t = h.get_height(row.saturating_sub(1), col);
                let b = h.get_height((row + 1).min(res - 1), col);
                let n = Vec3::new((l - r) / (2.0 * seg), 1.0, (t - b) / (2.0 * seg));
                self.normals[self.grid.idx(row, col)] = n.normalize();
            }
        }
    }
}
