//! stavelib: music engraving layout for single-stave measures.
//!
//! Lays out one measure per stave (clef, key and time signatures, barlines,
//! repeats, voltas, tempo), groups and angles beams, spaces notes in
//! proportion to their duration, and routes tuplet brackets, ties and slurs.
//! Output goes to any [`RenderSurface`]; an SVG surface is built in.
//!
//! # Example
//! ```no_run
//! let request = r#"{
//!     "surface": { "canvasDivId": "score", "canvasWidth": 600, "canvasHeight": 150, "scale": 1.0 },
//!     "bars": [{
//!         "stave": { "x": 10, "y": 40, "width": 400, "barNo": 0 },
//!         "keySignature": "D",
//!         "timeSignature": { "numerator": 4, "denominator": 4 },
//!         "musicSpec": { "noteSpecs": [
//!             { "vexNote": { "keys": ["d/4"], "duration": "q" } },
//!             { "vexNote": { "keys": ["f#/4"], "duration": "q" } },
//!             { "vexNote": { "keys": ["a/4"], "duration": "h" } }
//!         ] }
//!     }]
//! }"#;
//! let svg = stavelib::render_score_json(request).unwrap();
//! println!("{}", svg);
//! ```

pub mod error;
pub mod model;
pub mod parser;
pub mod renderer;

pub use error::{ConfigError, OverflowError, OverflowKind, RangeKind, RenderError, SurfaceError};
pub use model::*;
pub use parser::{parse_bar, parse_score_request, BarRequest, ScoreRequest};
pub use renderer::{
    layout_measure, render_measure, DisplayList, GlyphMetrics, MeasureLayout, RenderSurface,
    StandardMetrics, SurfaceConfig, SvgSurface,
};

/// Lay out every bar of `request`, then draw them all onto a fresh SVG
/// surface. A bar that fails leaves the surface blank.
pub fn render_score(request: &ScoreRequest) -> Result<(SvgSurface, Vec<MeasureLayout>), RenderError> {
    let mut surface = SvgSurface::initialize(&request.surface)?;
    let layouts = layout_score(request)?;
    for layout in &layouts {
        layout.display_list.replay(&mut surface)?;
    }
    log::debug!("rendered {} bar(s), {} SVG elements", layouts.len(), surface.element_count());
    Ok((surface, layouts))
}

/// Lay out every bar of `request` without drawing.
pub fn layout_score(request: &ScoreRequest) -> Result<Vec<MeasureLayout>, RenderError> {
    let metrics = StandardMetrics;
    request
        .bars
        .iter()
        .map(|bar| {
            let (stave, measure) = parse_bar(bar)?;
            layout_measure(&stave, &measure, &metrics)
        })
        .collect()
}

/// Parse a JSON request and render it to an SVG string.
pub fn render_score_json(json: &str) -> Result<String, RenderError> {
    let request = parse_score_request(json)?;
    let (surface, _) = render_score(&request)?;
    Ok(surface.to_svg())
}

/// Parse a JSON request and return the resolved layout of every bar as JSON.
pub fn layout_to_json(json: &str) -> Result<String, RenderError> {
    let request = parse_score_request(json)?;
    let layouts = layout_score(&request)?;
    Ok(serde_json::to_string_pretty(&layouts)?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Render a JSON request and return SVG as a C string, or null on failure.
/// The caller must free the returned string with `stavelib_free_string`.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn stavelib_render_json(json: *const c_char) -> *mut c_char {
    if json.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(json) };
    let request = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => {
            log::error!("render request is not valid UTF-8");
            return std::ptr::null_mut();
        }
    };

    match render_score_json(request) {
        Ok(svg) => match CString::new(svg) {
            Ok(c_svg) => c_svg.into_raw(),
            Err(e) => {
                log::error!("rendered SVG holds a NUL byte at {}", e.nul_position());
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            log::error!("render failed: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by stavelib functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a stavelib function, or null.
#[no_mangle]
pub unsafe extern "C" fn stavelib_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
