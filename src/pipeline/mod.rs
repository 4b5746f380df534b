//! Pipeline stages for slide-to-notes conversion.
//!
//! Each submodule implements exactly one step and is testable on its own;
//! [`crate::convert`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ (OCR) ──▶ entries ──▶ lines ──┐
//!              │                                     ├──▶ bundle
//!              └────▶ regions ──▶ policy ────────────┘
//! ```
//!
//! 1. [`input`]: validate a path or byte buffer before pdfium sees it
//! 2. [`render`]: page access and rasterisation behind the
//!    [`render::SlideDocument`] / [`render::SlidePage`] traits
//! 3. [`entries`]: normalise raw OCR detections into [`entries::RecognitionEntry`]
//! 4. [`lines`]: cluster entries into reading-order bullets
//! 5. [`regions`]: find merged visual regions (images, diagrams)
//! 6. [`policy`]: decide whether a slide keeps its preview image
//! 7. [`bundle`]: front-matter, Markdown assembly, assets and the zip archive

pub mod bundle;
pub mod entries;
pub mod input;
pub mod lines;
pub mod policy;
pub mod regions;
pub mod render;
