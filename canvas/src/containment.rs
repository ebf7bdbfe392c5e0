//! Boundary containment: membership, drag enter/leave decisions, and the
//! resize cascade.
//!
//! A boundary's `member` list is the vertical stacking order of its children.
//! Members are laid out from just below the header downward, and the boundary
//! is sized to fit its shown members:
//!
//! - height: header + each shown member's height + one gap per shown member
//! - width: the minimum width, or the widest shown member (nested boundaries
//!   need extra room for their inset) if that is wider
//!
//! Sizing runs deepest boundary first so a parent always measures children
//! that are already final; running the cascade twice changes nothing.

#[cfg(test)]
#[path = "containment_test.rs"]
mod containment_test;

use tracing::{debug, info};

use crate::consts::{
    BOUNDARY_HEADER_HEIGHT, BOUNDARY_ID_PREFIX, BOUNDARY_MEMBER_GAP, DRAG_GROW_HEIGHT_MARGIN,
    DRAG_GROW_WIDTH_MARGIN, NESTED_BOUNDARY_INSET, NESTED_BOUNDARY_PAD,
};
use crate::doc::{Boundary, BoxSource, Member, MemberKind, ObjectId};
use crate::engine::{Action, EngineCore, ObjectKind};
use crate::error::EngineError;
use crate::geom::Point;

/// Parameters for creating a boundary.
#[derive(Debug, Clone, Default)]
pub struct NewBoundary {
    pub at: Point,
    pub id: Option<ObjectId>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl NewBoundary {
    #[must_use]
    pub fn at(at: Point) -> Self {
        Self { at, ..Self::default() }
    }
}

impl EngineCore {
    // --- Lifecycle ---

    /// Create an empty top-level boundary and return its id.
    ///
    /// # Errors
    ///
    /// `DuplicateId` for a taken id.
    pub fn create_boundary(&mut self, new: NewBoundary) -> Result<ObjectId, EngineError> {
        let id = new.id.unwrap_or_else(|| ObjectId::generate(BOUNDARY_ID_PREFIX));
        let boundary = Boundary {
            id: id.clone(),
            x: new.at.x,
            y: new.at.y,
            name: new.name.unwrap_or_else(|| "Boundary".to_string()),
            description: new.description.unwrap_or_else(|| "Description".to_string()),
            parent: None,
            member: Vec::new(),
            width: self.config.boundary_min_width,
            height: BOUNDARY_HEADER_HEIGHT,
            z_index: 0,
        };
        let size = boundary.size();
        self.doc.insert_boundary(boundary)?;
        debug!(%id, "boundary created");
        self.emit(Action::ObjectCreated { id: id.clone(), kind: ObjectKind::Boundary });
        self.emit(Action::MoveObject { id: id.clone(), x: new.at.x, y: new.at.y });
        self.emit(Action::ResizeObject { id: id.clone(), width: size.width, height: size.height });
        self.refresh_canvas_size();
        Ok(id)
    }

    /// Delete a boundary together with everything nested in it.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` if `id` is unknown.
    pub fn delete_boundary(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        let parent = self
            .doc
            .boundary(id)
            .ok_or_else(|| EngineError::BoundaryNotFound(id.clone()))?
            .parent
            .clone();
        if let Some(parent) = &parent {
            self.remove_member_from_boundary(parent, id)?;
        }
        self.delete_boundary_tree(id)?;
        if let Some(parent) = parent {
            self.resize_parent_boundary(&parent)?;
            self.relayout_from(&parent);
        }
        self.refresh_canvas_size();
        Ok(())
    }

    fn delete_boundary_tree(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        let members = self.doc.members(id).map(<[Member]>::to_vec).unwrap_or_default();
        for member in members {
            match member.kind {
                MemberKind::Vertex => self.delete_vertex(&member.id)?,
                MemberKind::Boundary => self.delete_boundary_tree(&member.id)?,
            }
        }
        self.doc.remove_boundary(id);
        debug!(%id, "boundary removed");
        self.emit(Action::ObjectRemoved { id: id.clone(), kind: ObjectKind::Boundary });
        Ok(())
    }

    // --- Drag containment ---

    /// Drop test for a top-level object: join the topmost top-level boundary
    /// that accepts it. Returns the boundary joined, if any.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if `src` is unknown.
    pub fn check_drag_object_inside_boundary(&mut self, src: &ObjectId) -> Result<Option<ObjectId>, EngineError> {
        let kind = self.doc.kind_of(src).ok_or_else(|| EngineError::ObjectNotFound(src.clone()))?;
        if self.doc.parent_of(src).is_some() {
            return Ok(None);
        }
        let Some(rect) = self.doc.rect_of(src) else {
            return Err(EngineError::ObjectNotFound(src.clone()));
        };
        let target = self
            .doc
            .boundaries_top_down()
            .into_iter()
            .filter(|b| b.parent.is_none() && b.id != *src)
            .find(|b| b.rect().accepts_drop(&rect))
            .map(|b| b.id.clone());
        let Some(target) = target else {
            return Ok(None);
        };
        let index = self.index_from_position(&target, src);
        self.add_member_to_boundary_with_index(&target, Member::new(src.clone(), kind), index)?;
        info!(object = %src, boundary = %target, index, "object entered boundary");
        Ok(Some(target))
    }

    /// Leave the parent boundary when `src` is no longer fully inside it.
    /// Returns whether it left.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if `src` is unknown.
    pub fn check_drag_object_outside_boundary(&mut self, src: &ObjectId) -> Result<bool, EngineError> {
        let Some(rect) = self.doc.rect_of(src) else {
            return Err(EngineError::ObjectNotFound(src.clone()));
        };
        let Some(parent) = self.doc.parent_of(src).cloned() else {
            return Ok(false);
        };
        let parent_rect = self.doc.rect_of(&parent).ok_or_else(|| EngineError::BoundaryNotFound(parent.clone()))?;
        if parent_rect.contains_rect(&rect) {
            return Ok(false);
        }
        self.remove_member_from_boundary(&parent, src)?;
        info!(object = %src, boundary = %parent, "object left boundary");
        Ok(true)
    }

    /// Move `src` within its parent's member list to match its vertical position.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if `src` is unknown, `NotAMember` if the parent does
    /// not list it.
    pub fn change_index_in_boundary_for_object(&mut self, src: &ObjectId) -> Result<(), EngineError> {
        if self.doc.kind_of(src).is_none() {
            return Err(EngineError::ObjectNotFound(src.clone()));
        }
        let Some(parent) = self.doc.parent_of(src).cloned() else {
            return Ok(());
        };
        let from = self
            .doc
            .boundary(&parent)
            .and_then(|b| b.member_index(src))
            .ok_or_else(|| EngineError::NotAMember { boundary: parent.clone(), member: src.clone() })?;
        let to = self.index_from_position(&parent, src);
        self.change_index_member_to_boundary(&parent, from, to)
    }

    /// Slot in `boundary`'s member list (with `src` left out) that follows
    /// every shown member whose top is above `src`'s top.
    #[must_use]
    pub fn index_from_position(&self, boundary: &ObjectId, src: &ObjectId) -> usize {
        let Some(b) = self.doc.boundary(boundary) else {
            return 0;
        };
        let top = self.doc.origin_of(src).map_or(0.0, |p| p.y);
        let mut index = 0;
        for (slot, member) in b.member.iter().filter(|m| m.id != *src).enumerate() {
            let above = self.doc.origin_of(&member.id).is_some_and(|p| p.y < top);
            if member.show && above {
                index = slot + 1;
            }
        }
        index
    }

    /// Grow every other top-level boundary that the dragged object would
    /// match or exceed in either dimension.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if `src` is unknown.
    pub fn resize_boundary_as_object_dragged(&mut self, src: &ObjectId) -> Result<(), EngineError> {
        let size = self.doc.bounding_box(src).ok_or_else(|| EngineError::ObjectNotFound(src.clone()))?;
        let others: Vec<(ObjectId, f64, f64)> = self
            .doc
            .boundaries()
            .iter()
            .filter(|b| b.parent.is_none() && b.id != *src)
            .map(|b| (b.id.clone(), b.width, b.height))
            .collect();
        for (id, width, height) in others {
            if size.height >= height {
                self.set_height_boundary(&id, size.height + DRAG_GROW_HEIGHT_MARGIN)?;
            }
            if size.width >= width {
                self.set_width_boundary(&id, size.width + DRAG_GROW_WIDTH_MARGIN)?;
            }
        }
        Ok(())
    }

    // --- Resize cascade ---

    /// Fit every boundary to its shown members, deepest first.
    pub fn reset_size_boundary(&mut self) {
        for id in self.boundaries_deepest_first() {
            self.fit_boundary(&id);
        }
    }

    /// Refit nested boundaries and their ancestors, restack every top-level
    /// boundary that has members, then recompute the canvas size.
    pub fn update_height_boundary(&mut self) {
        let nested: Vec<ObjectId> = self
            .boundaries_deepest_first()
            .into_iter()
            .filter(|id| self.doc.parent_of(id).is_some())
            .collect();
        for id in nested {
            self.fit_with_ancestors(&id);
        }
        let top_level: Vec<ObjectId> = self
            .doc
            .boundaries()
            .iter()
            .filter(|b| b.parent.is_none() && !b.member.is_empty())
            .map(|b| b.id.clone())
            .collect();
        for id in top_level {
            self.layout_members(&id);
        }
        self.refresh_canvas_size();
    }

    fn boundaries_deepest_first(&self) -> Vec<ObjectId> {
        let mut ordered: Vec<(usize, ObjectId)> =
            self.doc.boundaries().iter().map(|b| (self.doc.depth_of(&b.id), b.id.clone())).collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));
        ordered.into_iter().map(|(_, id)| id).collect()
    }

    fn fit_boundary(&mut self, id: &ObjectId) {
        let Some(boundary) = self.doc.boundary(id) else {
            return;
        };
        let mut width = self.config.boundary_min_width;
        let mut height = BOUNDARY_HEADER_HEIGHT;
        let mut shown = 0.0;
        for member in boundary.member.iter().filter(|m| m.show) {
            let Some(size) = self.doc.bounding_box(&member.id) else {
                continue;
            };
            let pad = match member.kind {
                MemberKind::Boundary => NESTED_BOUNDARY_PAD,
                MemberKind::Vertex => 0.0,
            };
            width = width.max(size.width + pad);
            height += size.height;
            shown += 1.0;
        }
        height += BOUNDARY_MEMBER_GAP * shown;
        let changed = (boundary.width - width).abs() > f64::EPSILON || (boundary.height - height).abs() > f64::EPSILON;
        if changed {
            self.store_boundary_size(id, width, height);
        }
    }

    fn fit_with_ancestors(&mut self, id: &ObjectId) {
        self.fit_boundary(id);
        for ancestor in self.doc.ancestors(id) {
            self.fit_boundary(&ancestor);
        }
    }

    fn store_boundary_size(&mut self, id: &ObjectId, width: f64, height: f64) {
        if let Some(b) = self.doc.boundary_mut(id) {
            b.width = width;
            b.height = height;
            self.emit(Action::ResizeObject { id: id.clone(), width, height });
        }
    }

    /// Stack members below the header in member order. Hidden members keep
    /// their slot position but take no space.
    pub(crate) fn layout_members(&mut self, id: &ObjectId) {
        let Some(boundary) = self.doc.boundary(id) else {
            return;
        };
        let origin = boundary.origin();
        let members = boundary.member.clone();
        let mut y = origin.y + BOUNDARY_HEADER_HEIGHT;
        for member in members {
            let inset = match member.kind {
                MemberKind::Boundary => NESTED_BOUNDARY_INSET,
                MemberKind::Vertex => 0.0,
            };
            self.place_object(&member.id, Point::new(origin.x + inset, y));
            if member.show {
                if let Some(size) = self.doc.bounding_box(&member.id) {
                    y += size.height + BOUNDARY_MEMBER_GAP;
                }
            }
        }
    }

    /// Restack the top-level boundary enclosing `id` and refresh the canvas.
    pub(crate) fn relayout_from(&mut self, id: &ObjectId) {
        let top = self.doc.ancestors(id).pop().unwrap_or_else(|| id.clone());
        self.layout_members(&top);
        self.refresh_canvas_size();
    }

    // --- Boundary operations ---

    /// Insert `member` into `boundary` at `index` and make the boundary its parent.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` / `ObjectNotFound` for unknown ids, `AlreadyMember`
    /// when the object already has a parent, `WouldCycle` when a boundary
    /// would contain itself, `IndexOutOfRange` past the end of the list.
    pub fn add_member_to_boundary_with_index(
        &mut self,
        boundary: &ObjectId,
        member: Member,
        index: usize,
    ) -> Result<(), EngineError> {
        let len = self
            .doc
            .boundary(boundary)
            .ok_or_else(|| EngineError::BoundaryNotFound(boundary.clone()))?
            .member
            .len();
        let kind = self.doc.kind_of(&member.id).ok_or_else(|| EngineError::ObjectNotFound(member.id.clone()))?;
        if let Some(parent) = self.doc.parent_of(&member.id) {
            return Err(EngineError::AlreadyMember { boundary: parent.clone(), member: member.id });
        }
        if kind == MemberKind::Boundary && (member.id == *boundary || self.doc.is_ancestor(&member.id, boundary)) {
            return Err(EngineError::WouldCycle { object: member.id, boundary: boundary.clone() });
        }
        if index > len {
            return Err(EngineError::IndexOutOfRange { boundary: boundary.clone(), index });
        }

        let id = member.id.clone();
        if let Some(b) = self.doc.boundary_mut(boundary) {
            b.member.insert(index, Member { kind, ..member });
        }
        self.doc.set_parent(&id, Some(boundary.clone()));
        Ok(())
    }

    /// Drop `member` from `boundary` and clear its parent.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` for an unknown boundary, `NotAMember` if the
    /// boundary does not list `member`.
    pub fn remove_member_from_boundary(&mut self, boundary: &ObjectId, member: &ObjectId) -> Result<(), EngineError> {
        let b = self.doc.boundary_mut(boundary).ok_or_else(|| EngineError::BoundaryNotFound(boundary.clone()))?;
        let index = b
            .member_index(member)
            .ok_or_else(|| EngineError::NotAMember { boundary: boundary.clone(), member: member.clone() })?;
        b.member.remove(index);
        if self.doc.parent_of(member) == Some(boundary) {
            self.doc.set_parent(member, None);
        }
        Ok(())
    }

    /// Move the member entry at `from` to `to`, shifting the entries between.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` for an unknown boundary, `IndexOutOfRange` when
    /// either index is past the end.
    pub fn change_index_member_to_boundary(&mut self, boundary: &ObjectId, from: usize, to: usize) -> Result<(), EngineError> {
        let b = self.doc.boundary_mut(boundary).ok_or_else(|| EngineError::BoundaryNotFound(boundary.clone()))?;
        let len = b.member.len();
        for index in [from, to] {
            if index >= len {
                return Err(EngineError::IndexOutOfRange { boundary: boundary.clone(), index });
            }
        }
        if from != to {
            let entry = b.member.remove(from);
            b.member.insert(to, entry);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `BoundaryNotFound` if `id` is unknown.
    pub fn set_height_boundary(&mut self, id: &ObjectId, height: f64) -> Result<(), EngineError> {
        let width = self.doc.boundary(id).ok_or_else(|| EngineError::BoundaryNotFound(id.clone()))?.width;
        self.store_boundary_size(id, width, height);
        Ok(())
    }

    /// # Errors
    ///
    /// `BoundaryNotFound` if `id` is unknown.
    pub fn set_width_boundary(&mut self, id: &ObjectId, width: f64) -> Result<(), EngineError> {
        let height = self.doc.boundary(id).ok_or_else(|| EngineError::BoundaryNotFound(id.clone()))?.height;
        self.store_boundary_size(id, width, height);
        Ok(())
    }

    /// Fit `id` to its members, then each enclosing boundary in turn.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` if `id` is unknown.
    pub fn resize_parent_boundary(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        if self.doc.boundary(id).is_none() {
            return Err(EngineError::BoundaryNotFound(id.clone()));
        }
        self.fit_with_ancestors(id);
        Ok(())
    }

    /// Stack the shown members of `id` vertically from the header down.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` if `id` is unknown.
    pub fn reorder_position_member(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        if self.doc.boundary(id).is_none() {
            return Err(EngineError::BoundaryNotFound(id.clone()));
        }
        self.layout_members(id);
        Ok(())
    }

    /// Show or hide a member together with everything nested under it, then
    /// refit and restack the enclosing boundaries.
    ///
    /// # Errors
    ///
    /// `BoundaryNotFound` for an unknown boundary, `NotAMember` if the
    /// boundary does not list `member`.
    pub fn select_member_visible(&mut self, boundary: &ObjectId, member: &ObjectId, show: bool) -> Result<(), EngineError> {
        let b = self.doc.boundary_mut(boundary).ok_or_else(|| EngineError::BoundaryNotFound(boundary.clone()))?;
        let entry = b
            .member
            .iter_mut()
            .find(|m| m.id == *member)
            .ok_or_else(|| EngineError::NotAMember { boundary: boundary.clone(), member: member.clone() })?;
        entry.show = show;
        let kind = entry.kind;

        let mut affected = vec![member.clone()];
        if kind == MemberKind::Boundary {
            affected.extend(self.doc.descendants(member).into_iter().map(|(id, _)| id));
        }
        for id in affected {
            let visible = self.doc.is_shown(&id);
            self.emit(Action::SetObjectVisible { id, visible });
        }
        debug!(%boundary, %member, show, "member visibility changed");

        self.fit_with_ancestors(boundary);
        self.relayout_from(boundary);
        Ok(())
    }

    /// Snapshot of a boundary, as the host would render it.
    #[must_use]
    pub fn boundary(&self, id: &ObjectId) -> Option<&Boundary> {
        self.doc.boundary(id)
    }
}
