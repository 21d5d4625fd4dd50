//! Pattern tiles: bake content once, stamp it onto any number of shapes.
//!
//! A tile is a pixmap covering exactly one pattern cell. Stamping builds the
//! tile-to-device transform for a consuming shape and fills the shape with a
//! repeating pattern shader, so content paint commands never run again.

use glam::dvec2;
use tiny_skia::{Color, FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, Pixmap, SpreadMode};

use crate::errors::BakeError;
use crate::log::{debug, trace, warn};
use crate::paint_server::{BakedTransformChain, Units};
use crate::transform::Transform;
use crate::types::Rect;

/// Upper bound on direct-render cell repetitions
const MAX_DIRECT_CELLS: u64 = 1 << 16;

/// Outline bounds are `f32`; bake boxes are `f64`
const BBOX_TOLERANCE: f64 = 1e-4;

/// One filled path of pattern content, in content units
#[derive(Clone, Debug)]
pub struct PaintCommand {
    pub path: Path,
    pub color: Color,
    pub fill_rule: FillRule,
}

impl PaintCommand {
    pub fn fill(path: Path, color: Color) -> Self {
        PaintCommand {
            path,
            color,
            fill_rule: FillRule::Winding,
        }
    }

    /// Axis-aligned rectangle; `None` for a non-finite or empty rect
    pub fn rect(rect: Rect, color: Color) -> Option<Self> {
        let r = tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)?;
        Some(Self::fill(PathBuilder::from_rect(r), color))
    }

    fn paint(&self, anti_alias: bool) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.color);
        paint.anti_alias = anti_alias;
        paint
    }
}

/// Bakes pattern content into tiles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternTileBaker {
    /// Longest tile side in pixels
    pub max_tile_side: u32,
    pub anti_alias: bool,
}

impl Default for PatternTileBaker {
    fn default() -> Self {
        PatternTileBaker {
            max_tile_side: 4096,
            anti_alias: true,
        }
    }
}

impl PatternTileBaker {
    /// Tile size in device pixels for one cell of `chain`.
    ///
    /// Uses the device lengths of the cell edges, so rotation and skew do not
    /// inflate the tile.
    pub fn tile_bounds(&self, chain: &BakedTransformChain) -> Result<(u32, u32), BakeError> {
        let cell = chain.cell.ok_or(BakeError::MissingCell)?;
        let to_device = chain.cell_to_device();
        let w = to_device.map_vector(dvec2(cell.width, 0.0)).length();
        let h = to_device.map_vector(dvec2(0.0, cell.height)).length();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(BakeError::DegenerateTransform);
        }

        // rounding noise must not add a pixel column
        let side = |len: f64| (len - 1e-6).ceil().clamp(1.0, f64::from(self.max_tile_side.max(1))) as u32;
        Ok((side(w), side(h)))
    }

    /// Render `commands` once into a `tile_bounds`-sized pixmap covering one cell
    pub fn bake(
        &self,
        commands: &[PaintCommand],
        chain: &BakedTransformChain,
        tile_bounds: (u32, u32),
    ) -> Result<PatternTile, BakeError> {
        let cell = chain.cell.ok_or(BakeError::MissingCell)?;
        let (width, height) = tile_bounds;
        if cell.is_empty() || width == 0 || height == 0 {
            return Err(BakeError::DegenerateTransform);
        }

        let tile_to_cell = Transform::translate(cell.x, cell.y)
            * Transform::scale(cell.width / f64::from(width), cell.height / f64::from(height));
        let cell_to_tile = tile_to_cell.inverse().ok_or(BakeError::DegenerateTransform)?;
        let content_to_tile = (cell_to_tile * chain.content_to_server).to_skia();

        let mut pixmap = Pixmap::new(width, height).ok_or(BakeError::AllocationFailed { width, height })?;
        for command in commands {
            pixmap.fill_path(
                &command.path,
                &command.paint(self.anti_alias),
                command.fill_rule,
                content_to_tile,
                None,
            );
        }
        debug!(width, height, commands = commands.len(), "baked pattern tile");

        Ok(PatternTile {
            pixmap,
            tile_to_cell,
            server_transform: chain.server_transform,
            placement_units: chain.placement_units,
            shape_independent: chain.is_shape_independent(),
            baked_bbox: chain.bbox,
            anti_alias: self.anti_alias,
        })
    }

    /// Single-pass reference: draw content for every cell under `outline`,
    /// clipped to the cell and the outline, straight into `target`.
    pub fn render_direct(
        &self,
        commands: &[PaintCommand],
        chain: &BakedTransformChain,
        target: &mut Pixmap,
        outline: &Path,
    ) -> Result<(), BakeError> {
        let cell = chain.cell.ok_or(BakeError::MissingCell)?;
        let cell_to_device = chain.cell_to_device();
        let device_to_cell = cell_to_device.inverse().ok_or(BakeError::DegenerateTransform)?;
        let cell_path = PaintCommand::rect(cell, Color::BLACK)
            .ok_or(BakeError::DegenerateTransform)?
            .path;

        let device_outline = outline
            .clone()
            .transform(chain.shape_transform.to_skia())
            .ok_or(BakeError::InvalidOutline)?;
        let covered = device_to_cell.map_rect(device_outline.bounds().into());

        let first_col = ((covered.left() - cell.x) / cell.width).floor();
        let last_col = ((covered.right() - cell.x) / cell.width).ceil();
        let first_row = ((covered.top() - cell.y) / cell.height).floor();
        let last_row = ((covered.bottom() - cell.y) / cell.height).ceil();
        let count = (last_col - first_col).max(0.0) * (last_row - first_row).max(0.0);
        if !count.is_finite() || count > MAX_DIRECT_CELLS as f64 {
            warn!(count, "too many cells for direct rendering");
            return Err(BakeError::TooManyCells { count: count.min(u64::MAX as f64) as u64 });
        }
        trace!(first_col, last_col, first_row, last_row, "direct pattern render");

        let mut row = first_row;
        while row < last_row {
            let mut col = first_col;
            while col < last_col {
                let offset = Transform::translate(col * cell.width, row * cell.height);
                let Some(mut mask) = Mask::new(target.width(), target.height()) else {
                    return Err(BakeError::AllocationFailed {
                        width: target.width(),
                        height: target.height(),
                    });
                };
                mask.fill_path(&device_outline, FillRule::Winding, self.anti_alias, tiny_skia::Transform::identity());
                mask.intersect_path(&cell_path, FillRule::Winding, self.anti_alias, (cell_to_device * offset).to_skia());

                let content_to_device = (cell_to_device * offset * chain.content_to_server).to_skia();
                for command in commands {
                    target.fill_path(
                        &command.path,
                        &command.paint(self.anti_alias),
                        command.fill_rule,
                        content_to_device,
                        Some(&mask),
                    );
                }
                col += 1.0;
            }
            row += 1.0;
        }
        Ok(())
    }
}

/// A baked pattern cell plus what is needed to place it on a shape.
///
/// Read-only after baking; any number of shapes may stamp the same tile.
#[derive(Clone, Debug)]
pub struct PatternTile {
    pixmap: Pixmap,
    tile_to_cell: Transform,
    server_transform: Transform,
    placement_units: Units,
    shape_independent: bool,
    /// Bounding box the content was placed against
    baked_bbox: Rect,
    anti_alias: bool,
}

impl PatternTile {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Tile pixel space to cell (server) space
    pub fn tile_to_cell(&self) -> Transform {
        self.tile_to_cell
    }

    pub fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// See [`BakedTransformChain::is_shape_independent`]
    pub fn is_shape_independent(&self) -> bool {
        self.shape_independent
    }

    /// Tile pixel space to device space for a consuming shape.
    ///
    /// `shape * placement(bbox of outline) * server_transform * tile_to_cell`.
    /// A shape-dependent tile only fits outlines with the bounding box it was
    /// baked against; anything else is [`BakeError::ShapeDependentTile`].
    pub fn stamp(&self, outline: &Path, shape_transform: Transform) -> Result<Transform, BakeError> {
        let bbox: Rect = outline.bounds().into();
        if !self.shape_independent && !bbox.approx_eq(&self.baked_bbox, BBOX_TOLERANCE) {
            debug!(?bbox, baked = ?self.baked_bbox, "shape-dependent tile, rebake needed");
            return Err(BakeError::ShapeDependentTile);
        }

        let placement = match self.placement_units {
            Units::ObjectBoundingBox => Transform::from_bbox(bbox),
            Units::UserSpaceOnUse => Transform::IDENTITY,
        };
        Ok(shape_transform * placement * self.server_transform * self.tile_to_cell)
    }

    /// Fill `outline` (in shape space) on `target` with the repeating tile
    pub fn fill(&self, target: &mut Pixmap, outline: &Path, shape_transform: Transform) -> Result<(), BakeError> {
        let stamp = self.stamp(outline, shape_transform)?;
        if !stamp.is_invertible() {
            return Err(BakeError::DegenerateTransform);
        }

        let device_outline = outline
            .clone()
            .transform(shape_transform.to_skia())
            .ok_or(BakeError::InvalidOutline)?;

        let mut paint = Paint::default();
        paint.anti_alias = self.anti_alias;
        paint.shader = tiny_skia::Pattern::new(
            self.pixmap.as_ref(),
            SpreadMode::Repeat,
            FilterQuality::Nearest,
            1.0,
            stamp.to_skia(),
        );
        // the path is already in device space, so the shader keeps the stamp as is
        target.fill_path(
            &device_outline,
            &paint,
            FillRule::Winding,
            tiny_skia::Transform::identity(),
            None,
        );
        Ok(())
    }
}
