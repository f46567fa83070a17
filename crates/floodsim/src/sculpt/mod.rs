//! Terrain sculpting: layered height offsets edited with brushes.
//!
//! A [`SculptEngine`] owns named [`SculptMesh`]es plus the active brush
//! settings. Each mesh composites its layers into a terrain
//! [`HeightField`](crate::grid::HeightField) that the water solver consumes
//! as base height or as a terrain obstacle.

mod brush;
mod mesh;

use std::collections::BTreeMap;

use glam::Vec3;

pub use brush::{Brush, DisplacementChange, Profile};
pub use mesh::{SculptLayer, SculptMesh};

use crate::config::SculptConfig;
use crate::error::{NameKind, Result, SimError};

/// Named sculpt meshes and the brush that edits them.
#[derive(Debug, Default)]
pub struct SculptEngine {
    meshes: BTreeMap<String, SculptMesh>,
    config: SculptConfig,
}

impl SculptEngine {
    pub fn new(config: SculptConfig) -> Self {
        Self {
            meshes: BTreeMap::new(),
            config,
        }
    }

    pub fn add_mesh(&mut self, name: &str, mesh: SculptMesh) -> Result<()> {
        if self.meshes.contains_key(name) {
            return Err(SimError::duplicate(NameKind::Mesh, name));
        }
        log::info!(
            "added sculpt mesh '{}' ({}x{})",
            name,
            mesh.grid().res(),
            mesh.grid().res()
        );
        self.meshes.insert(name.to_string(), mesh);
        Ok(())
    }

    pub fn remove_mesh(&mut self, name: &str) -> Result<SculptMesh> {
        self.meshes
            .remove(name)
            .ok_or_else(|| SimError::not_found(NameKind::Mesh, name))
    }

    pub fn mesh(&self, name: &str) -> Result<&SculptMesh> {
        self.meshes
            .get(name)
            .ok_or_else(|| SimError::not_found(NameKind::Mesh, name))
    }

    pub fn mesh_mut(&mut self, name: &str) -> Result<&mut SculptMesh> {
        self.meshes
            .get_mut(name)
            .ok_or_else(|| SimError::not_found(NameKind::Mesh, name))
    }

    /// Add a layer to a mesh and make it current.
    pub fn add_layer(&mut self, mesh: &str, layer: &str) -> Result<()> {
        self.mesh_mut(mesh)?.add_layer(layer)
    }

    /// Apply `brush` at `position` on `mesh`'s current layer.
    ///
    /// `amount` scales the configured brush amount (e.g. stylus pressure).
    pub fn sculpt(
        &mut self,
        mesh: &str,
        brush: Brush,
        position: Vec3,
        amount: f32,
    ) -> Result<Vec<DisplacementChange>> {
        let SculptConfig {
            brush_size,
            brush_amount,
            profile,
        } = self.config;
        self.mesh_mut(mesh)?
            .apply_brush(brush, position, brush_size, brush_amount * amount, profile)
    }

    pub fn config(&self) -> &SculptConfig {
        &self.config
    }

    /// Brush diameter in world units.
    pub fn set_brush_size(&mut self, size: f32) {
        self.config.brush_size = size.max(0.0);
    }

    pub fn set_brush_amount(&mut self, amount: f32) {
        self.config.brush_amount = amount;
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.config.profile = profile;
    }

    /// Zero every layer of every mesh.
    pub fn clear(&mut self) {
        for mesh in self.meshes.values_mut() {
            mesh.clear();
        }
    }
}
