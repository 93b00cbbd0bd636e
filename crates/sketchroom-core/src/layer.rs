//! The local drawing layer: surface plus its snapshot history.

use crate::history::{HistoryCache, RedoBuffer};
use crate::surface::{Surface, render_stroke, replay};
use crate::stroke::StrokeEvent;

/// Local surface together with its history cache and redo buffer.
pub struct LocalLayer<S: Surface> {
    surface: S,
    history: HistoryCache<S::Snapshot>,
    redo: RedoBuffer<S::Snapshot>,
}

impl<S: Surface> LocalLayer<S> {
    /// Wrap a surface, seeding history with its current content.
    pub fn new(surface: S) -> Self {
        let mut history = HistoryCache::new();
        history.push(surface.snapshot());
        Self {
            surface,
            history,
            redo: RedoBuffer::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn history(&self) -> &HistoryCache<S::Snapshot> {
        &self.history
    }

    pub fn redo(&self) -> &RedoBuffer<S::Snapshot> {
        &self.redo
    }

    pub fn draw(&mut self, event: &StrokeEvent) -> bool {
        render_stroke(&mut self.surface, event)
    }

    /// Restore the most recent snapshot, or blank the surface if there is none.
    pub fn rollback(&mut self) {
        match self.history.latest() {
            Some(snapshot) => self.surface.restore(snapshot),
            None => self.surface.clear(),
        }
    }

    /// Record the current raster as a committed edit.
    pub fn commit(&mut self) {
        self.history.push(self.surface.snapshot());
        self.redo.clear();
    }

    /// Blank the surface and truncate history to one blank snapshot.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.redo.clear();
        self.history.reset_to(self.surface.snapshot());
    }

    /// Replace the raster with a replay of `strokes`.
    ///
    /// History ends up holding exactly one snapshot of the replayed raster.
    pub fn rebuild<'a, I>(&mut self, strokes: I) -> usize
    where
        I: IntoIterator<Item = &'a StrokeEvent>,
    {
        self.surface.clear();
        self.history.clear();
        self.redo.clear();
        let drawn = replay(&mut self.surface, strokes);
        self.history.push(self.surface.snapshot());
        drawn
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }
}

/// Overlay surface that mirrors other participants' strokes.
///
/// Kept apart from the local surface so local previews and remote strokes
/// never overwrite each other.
pub struct RemoteReplica<S: Surface> {
    surface: S,
}

impl<S: Surface> RemoteReplica<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Render one remote stroke.
    pub fn apply(&mut self, event: &StrokeEvent) -> bool {
        render_stroke(&mut self.surface, event)
    }

    /// Draw a backlog on top of the current content.
    pub fn replay<'a, I>(&mut self, strokes: I) -> usize
    where
        I: IntoIterator<Item = &'a StrokeEvent>,
    {
        replay(&mut self.surface, strokes)
    }

    /// Clear, then replay `strokes`.
    pub fn rebuild<'a, I>(&mut self, strokes: I) -> usize
    where
        I: IntoIterator<Item = &'a StrokeEvent>,
    {
        self.surface.clear();
        replay(&mut self.surface, strokes)
    }

    pub fn clear(&mut self) {
        self.surface.clear();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }
}
