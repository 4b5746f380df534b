//! Visual-region detection: where on a slide is there non-text content?
//!
//! A page's raster images and vector drawings are collected as candidate
//! rectangles, tiny shapes (bullets, underlines, hairline rules) are dropped,
//! and the rest are grown by a small margin and merged so that a diagram built
//! from dozens of paths comes out as one region.
//!
//! Coordinates use a top-left origin in page units (1/72 inch). Callers
//! rendering at `dpi` scale by `dpi / 72` to get bitmap pixels.

use crate::pipeline::render::SlidePage;
use tracing::{debug, warn};

/// An axis-aligned rectangle, `x1 > x0` and `y1 > y0` for any real region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True for rectangles with no area, NaN corners, or a side below `min_size`.
    pub fn is_degenerate(&self, min_size: f64) -> bool {
        let (w, h) = (self.width(), self.height());
        // NaN fails every comparison, so test for the good case and negate.
        !(w > 0.0 && h > 0.0 && w >= min_size && h >= min_size)
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self::new(self.x0 - margin, self.y0 - margin, self.x1 + margin, self.y1 + margin)
    }

    /// Closed-interval overlap: rectangles that merely share an edge touch.
    pub fn touches(&self, other: &Rect) -> bool {
        !(self.x1 < other.x0 || self.x0 > other.x1 || self.y1 < other.y0 || self.y0 > other.y1)
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Bounding box of all rectangles, or `None` for an empty slice.
    pub fn union_all(rects: &[Rect]) -> Option<Rect> {
        let (first, rest) = rects.split_first()?;
        Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
    }

    /// Bounding box of a point cloud.
    pub fn from_points(points: &[[f64; 2]]) -> Option<Rect> {
        let (first, rest) = points.split_first()?;
        let start = Rect::new(first[0], first[1], first[0], first[1]);
        Some(rest.iter().fold(start, |acc, p| {
            Rect::new(acc.x0.min(p[0]), acc.y0.min(p[1]), acc.x1.max(p[0]), acc.y1.max(p[1]))
        }))
    }
}

/// Kind of a structural block reported by the page's raw text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralBlock {
    pub kind: BlockKind,
    pub bbox: Rect,
}

impl StructuralBlock {
    pub fn image(bbox: Rect) -> Self {
        Self {
            kind: BlockKind::Image,
            bbox,
        }
    }

    pub fn text(bbox: Rect) -> Self {
        Self {
            kind: BlockKind::Text,
            bbox,
        }
    }
}

/// A vector drawing, described either by its bounding rectangle or by the
/// points its path visits.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingShape {
    Rect(Rect),
    Points(Vec<[f64; 2]>),
}

impl DrawingShape {
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            DrawingShape::Rect(r) => Some(*r),
            DrawingShape::Points(points) => Rect::from_points(points),
        }
    }
}

/// Everything region detection and the inclusion policy need to know about a
/// page's non-text content.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub blocks: Vec<StructuralBlock>,
    pub drawings: Vec<DrawingShape>,
}

impl PageLayout {
    /// Collect blocks and drawings from `page`. Either probe may fail; a
    /// failure is logged and treated as "nothing found".
    pub fn probe(page: &dyn SlidePage) -> Self {
        let blocks = page.structural_blocks().unwrap_or_else(|e| {
            warn!("Structural extraction failed, assuming no blocks: {}", e);
            Vec::new()
        });
        let drawings = page.drawings().unwrap_or_else(|e| {
            warn!("Drawing extraction failed, assuming no drawings: {}", e);
            Vec::new()
        });
        Self { blocks, drawings }
    }

    pub fn has_raster_images(&self) -> bool {
        self.blocks.iter().any(|b| b.kind == BlockKind::Image)
    }

    pub fn has_vector_drawings(&self) -> bool {
        !self.drawings.is_empty()
    }

    /// Merged visual regions, sorted top-to-bottom then left-to-right.
    pub fn visual_regions(&self, min_size: f64, merge_margin: f64) -> Vec<Rect> {
        let candidates = self
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Image)
            .map(|b| b.bbox)
            .chain(self.drawings.iter().filter_map(DrawingShape::bounds))
            .filter(|r| !r.is_degenerate(min_size));

        let mut regions = merge_rects(candidates, merge_margin);
        regions.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0)));
        debug!("Detected {} visual region(s)", regions.len());
        regions
    }
}

/// Detect visual regions on `page`.
pub fn detect_visual_regions(page: &dyn SlidePage, min_size: f64, merge_margin: f64) -> Vec<Rect> {
    PageLayout::probe(page).visual_regions(min_size, merge_margin)
}

/// Grow each rectangle by `margin` and fold it into the merged set. A new
/// rectangle swallows every merged rectangle it touches, including ones it
/// only reaches after an earlier absorption.
fn merge_rects(rects: impl IntoIterator<Item = Rect>, margin: f64) -> Vec<Rect> {
    let mut merged: Vec<Rect> = Vec::new();
    for rect in rects {
        let mut current = rect.expand(margin);
        while let Some(pos) = merged.iter().position(|m| m.touches(&current)) {
            current = current.union(&merged.swap_remove(pos));
        }
        merged.push(current);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_with_images(boxes: &[[f64; 4]]) -> PageLayout {
        PageLayout {
            blocks: boxes
                .iter()
                .map(|b| StructuralBlock::image(Rect::new(b[0], b[1], b[2], b[3])))
                .collect(),
            drawings: Vec::new(),
        }
    }

    #[test]
    fn single_block_is_expanded_by_margin() {
        let layout = layout_with_images(&[[10.0, 20.0, 110.0, 180.0]]);
        assert_eq!(
            layout.visual_regions(12.0, 6.0),
            vec![Rect::new(4.0, 14.0, 116.0, 186.0)]
        );
    }

    #[test]
    fn overlapping_blocks_merge_into_union() {
        let layout =
            layout_with_images(&[[50.0, 50.0, 150.0, 150.0], [140.0, 140.0, 220.0, 220.0]]);
        assert_eq!(
            layout.visual_regions(12.0, 6.0),
            vec![Rect::new(44.0, 44.0, 226.0, 226.0)]
        );
    }

    #[test]
    fn distant_blocks_stay_separate_and_sorted() {
        let layout = layout_with_images(&[[300.0, 400.0, 380.0, 480.0], [20.0, 30.0, 100.0, 90.0]]);
        assert_eq!(
            layout.visual_regions(12.0, 6.0),
            vec![
                Rect::new(14.0, 24.0, 106.0, 96.0),
                Rect::new(294.0, 394.0, 386.0, 486.0),
            ]
        );
    }

    #[test]
    fn same_row_sorts_left_to_right() {
        let layout = layout_with_images(&[[400.0, 50.0, 500.0, 150.0], [20.0, 50.0, 120.0, 150.0]]);
        let regions = layout.visual_regions(12.0, 6.0);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].x0 < regions[1].x0);
    }

    #[test]
    fn small_shapes_are_filtered() {
        let layout = layout_with_images(&[[10.0, 10.0, 15.0, 15.0]]);
        assert!(layout.visual_regions(12.0, 6.0).is_empty());
    }

    #[test]
    fn degenerate_shapes_are_filtered() {
        let layout = layout_with_images(&[[10.0, 10.0, 10.0, 80.0], [50.0, 90.0, 40.0, 10.0]]);
        assert!(layout.visual_regions(0.0, 6.0).is_empty());
    }

    #[test]
    fn bridging_rect_merges_two_existing_regions() {
        // The third rectangle touches both earlier regions and folds them together.
        let layout = layout_with_images(&[
            [0.0, 0.0, 50.0, 50.0],
            [200.0, 0.0, 250.0, 50.0],
            [40.0, 10.0, 210.0, 40.0],
        ]);
        assert_eq!(
            layout.visual_regions(12.0, 6.0),
            vec![Rect::new(-6.0, -6.0, 256.0, 56.0)]
        );
    }

    #[test]
    fn text_blocks_are_not_visual() {
        let layout = PageLayout {
            blocks: vec![StructuralBlock::text(Rect::new(10.0, 10.0, 300.0, 60.0))],
            drawings: Vec::new(),
        };
        assert!(layout.visual_regions(12.0, 6.0).is_empty());
        assert!(!layout.has_raster_images());
    }

    #[test]
    fn point_drawings_use_their_bounding_box() {
        let layout = PageLayout {
            blocks: Vec::new(),
            drawings: vec![DrawingShape::Points(vec![
                [100.0, 100.0],
                [160.0, 130.0],
                [120.0, 200.0],
            ])],
        };
        assert!(layout.has_vector_drawings());
        assert_eq!(
            layout.visual_regions(12.0, 6.0),
            vec![Rect::new(94.0, 94.0, 166.0, 206.0)]
        );
    }

    #[test]
    fn drawings_and_images_merge_together() {
        let layout = PageLayout {
            blocks: vec![StructuralBlock::image(Rect::new(10.0, 10.0, 100.0, 100.0))],
            drawings: vec![DrawingShape::Rect(Rect::new(105.0, 10.0, 200.0, 100.0))],
        };
        assert_eq!(layout.visual_regions(12.0, 6.0).len(), 1);
    }

    #[test]
    fn touching_edges_count_as_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.touches(&b));
        let c = Rect::new(10.5, 0.0, 20.0, 10.0);
        assert!(!a.touches(&c));
    }

    #[test]
    fn union_all_of_nothing_is_none() {
        assert_eq!(Rect::union_all(&[]), None);
        assert_eq!(
            Rect::union_all(&[Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, 5.0, 6.0, 7.0)]),
            Some(Rect::new(0.0, 0.0, 6.0, 7.0))
        );
    }
}
