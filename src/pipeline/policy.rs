//! Should a slide get a preview image?
//!
//! A slide keeps its rendered preview unless it is plain text: any raster
//! image, vector drawing or detected visual region is enough to include it.
//! Whether the slide also has text does not matter either way.

/// What the pipeline learned about a page's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub has_text: bool,
    pub has_raster_images: bool,
    pub has_vector_drawings: bool,
    pub has_visual_regions: bool,
}

pub fn should_include_image(signals: PageSignals) -> bool {
    signals.has_visual_regions || signals.has_raster_images || signals.has_vector_drawings
}
