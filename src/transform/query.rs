//! Coordinate conversion between node frames
//!
//! Every query reads the node's cached matrices (computing them first if
//! needed) and never mutates parameters or structure.

use glam::{DAffine2, DVec2};

use super::error::{Result, TransformError};
use super::node::NodeId;
use super::tree::TransformTree;
use crate::math::try_normalize;

impl TransformTree {
    // -------------------------------------------------------------------------
    // Cached Matrices
    // -------------------------------------------------------------------------

    /// Local frame to parent frame
    pub fn local_to_parent_matrix(&self, id: NodeId) -> Result<DAffine2> {
        Ok(self.matrices(id)?.local_to_parent)
    }

    /// Parent frame to local frame
    pub fn parent_to_local_matrix(&self, id: NodeId) -> Result<DAffine2> {
        Ok(self.matrices(id)?.parent_to_local)
    }

    /// Local frame to world frame
    pub fn local_to_world_matrix(&self, id: NodeId) -> Result<DAffine2> {
        Ok(self.matrices(id)?.local_to_world)
    }

    /// World frame to local frame
    pub fn world_to_local_matrix(&self, id: NodeId) -> Result<DAffine2> {
        Ok(self.matrices(id)?.world_to_local)
    }

    // -------------------------------------------------------------------------
    // Distant Frames
    // -------------------------------------------------------------------------

    /// Matrix mapping `id`'s local frame into `other`'s local frame.
    ///
    /// Composed through the world frame on every call, so it works across
    /// separate trees and always reflects both nodes' current state.
    pub fn local_to_distant_matrix(&self, id: NodeId, other: NodeId) -> Result<DAffine2> {
        Ok(self.world_to_local_matrix(other)? * self.local_to_world_matrix(id)?)
    }

    /// Matrix mapping `other`'s local frame into `id`'s local frame.
    pub fn distant_to_local_matrix(&self, id: NodeId, other: NodeId) -> Result<DAffine2> {
        Ok(self.world_to_local_matrix(id)? * self.local_to_world_matrix(other)?)
    }

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    /// Map a point from local to parent coordinates
    pub fn local_to_parent(&self, id: NodeId, point: DVec2) -> Result<DVec2> {
        Ok(self.local_to_parent_matrix(id)?.transform_point2(point))
    }

    /// Map a point from parent to local coordinates
    pub fn parent_to_local(&self, id: NodeId, point: DVec2) -> Result<DVec2> {
        Ok(self.parent_to_local_matrix(id)?.transform_point2(point))
    }

    /// Map a point from local to world coordinates
    pub fn local_to_world(&self, id: NodeId, point: DVec2) -> Result<DVec2> {
        Ok(self.local_to_world_matrix(id)?.transform_point2(point))
    }

    /// Map a point from world to local coordinates
    pub fn world_to_local(&self, id: NodeId, point: DVec2) -> Result<DVec2> {
        Ok(self.world_to_local_matrix(id)?.transform_point2(point))
    }

    /// Map a point from `id`'s local frame to `other`'s local frame
    pub fn local_to_distant(&self, id: NodeId, other: NodeId, point: DVec2) -> Result<DVec2> {
        let world = self.local_to_world(id, point)?;
        self.world_to_local(other, world)
    }

    /// Map a point from `other`'s local frame to `id`'s local frame
    pub fn distant_to_local(&self, id: NodeId, other: NodeId, point: DVec2) -> Result<DVec2> {
        let world = self.local_to_world(other, point)?;
        self.world_to_local(id, world)
    }

    // -------------------------------------------------------------------------
    // Directions
    // -------------------------------------------------------------------------

    /// Map a direction from local to world coordinates (ignores translation)
    pub fn local_to_world_vector(&self, id: NodeId, vector: DVec2) -> Result<DVec2> {
        Ok(self.local_to_world_matrix(id)?.transform_vector2(vector))
    }

    /// Map a direction from world to local coordinates (ignores translation)
    pub fn world_to_local_vector(&self, id: NodeId, vector: DVec2) -> Result<DVec2> {
        Ok(self.world_to_local_matrix(id)?.transform_vector2(vector))
    }

    // -------------------------------------------------------------------------
    // Derived Geometry
    // -------------------------------------------------------------------------

    /// World position of the node's origin
    pub fn world_position(&self, id: NodeId) -> Result<DVec2> {
        self.local_to_world(id, DVec2::ZERO)
    }

    /// The node's local X axis as a unit vector in world space.
    ///
    /// # Errors
    ///
    /// [`TransformError::Degenerate`] if the axis collapses to zero length.
    pub fn x_axis(&self, id: NodeId) -> Result<DVec2> {
        self.world_axis(id, DVec2::X)
    }

    /// The node's local Y axis as a unit vector in world space.
    ///
    /// # Errors
    ///
    /// [`TransformError::Degenerate`] if the axis collapses to zero length.
    pub fn y_axis(&self, id: NodeId) -> Result<DVec2> {
        self.world_axis(id, DVec2::Y)
    }

    fn world_axis(&self, id: NodeId, unit: DVec2) -> Result<DVec2> {
        let origin = self.world_position(id)?;
        let tip = self.local_to_world(id, unit)?;
        try_normalize(tip - origin).ok_or(TransformError::Degenerate { node: id })
    }

    /// World-space displacement from `id` to `other`
    pub fn dist(&self, id: NodeId, other: NodeId) -> Result<DVec2> {
        Ok(self.world_position(other)? - self.world_position(id)?)
    }
}
