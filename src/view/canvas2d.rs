use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, ImageBitmap};

use crate::error::{describe_js, Error, Result};
use crate::view::draw_list::{BackgroundLayer, DrawList, VideoLayer};

/// HAVE_CURRENT_DATA
const VIDEO_READY: u16 = 2;
const RAIN_COLOR: &str = "#00c846";

/// Segmentation output as delivered by the page
pub enum MaskImage {
    Bitmap(ImageBitmap),
    Canvas(HtmlCanvasElement),
}

impl MaskImage {
    pub fn from_js(value: JsValue) -> Option<Self> {
        if value.is_null() || value.is_undefined() {
            return None;
        }
        if value.is_instance_of::<ImageBitmap>() {
            return Some(MaskImage::Bitmap(value.unchecked_into()));
        }
        if value.is_instance_of::<HtmlCanvasElement>() {
            return Some(MaskImage::Canvas(value.unchecked_into()));
        }
        tracing::warn!("Ignoring segmentation mask of unsupported type");
        None
    }
}

impl Clone for MaskImage {
    fn clone(&self) -> Self {
        match self {
            MaskImage::Bitmap(b) => MaskImage::Bitmap(b.clone()),
            MaskImage::Canvas(c) => MaskImage::Canvas(c.clone()),
        }
    }
}

fn js_err(e: JsValue) -> Error {
    Error::render(describe_js(&e))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .map_err(js_err)?
        .ok_or_else(|| Error::render("canvas has no 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| Error::render("2d context has unexpected type"))
}

/// Draws frames into the page canvas with the 2D context.
///
/// The masked video is cut out on an offscreen canvas (mask, then
/// `source-in` video) and stamped over the background.
pub struct CanvasCompositor {
    ctx: CanvasRenderingContext2d,
    scratch: HtmlCanvasElement,
    scratch_ctx: CanvasRenderingContext2d,
    video: Option<HtmlVideoElement>,
}

impl CanvasCompositor {
    pub fn new(canvas: HtmlCanvasElement, video: Option<HtmlVideoElement>, width: u32, height: u32) -> Result<Self> {
        canvas.set_width(width);
        canvas.set_height(height);
        let ctx = context_2d(&canvas)?;

        let document = canvas
            .owner_document()
            .ok_or_else(|| Error::render("canvas is not attached to a document"))?;
        let scratch = document
            .create_element("canvas")
            .map_err(js_err)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| Error::render("created element is not a canvas"))?;
        scratch.set_width(width);
        scratch.set_height(height);
        let scratch_ctx = context_2d(&scratch)?;

        Ok(Self { ctx, scratch, scratch_ctx, video })
    }

    /// Whether a camera frame can be drawn right now
    pub fn has_video(&self) -> bool {
        self.video.as_ref().map(|v| v.ready_state() >= VIDEO_READY).unwrap_or(false)
    }

    pub fn draw(&self, list: &DrawList, mask: Option<&MaskImage>) -> Result<()> {
        let (w, h) = (list.width as f64, list.height as f64);
        let ctx = &self.ctx;
        ctx.clear_rect(0.0, 0.0, w, h);
        ctx.set_font(&format!("{}px sans-serif", list.font_px));

        match &list.background {
            BackgroundLayer::PianoKeys { white, black } => {
                ctx.set_fill_style_str("white");
                ctx.fill_rect(0.0, 0.0, w, h);
                ctx.set_stroke_style_str("black");
                for k in white {
                    ctx.stroke_rect(k.x as f64, k.y as f64, k.w as f64, k.h as f64);
                }
                ctx.set_fill_style_str("black");
                for k in black {
                    ctx.fill_rect(k.x as f64, k.y as f64, k.w as f64, k.h as f64);
                }
            }
            BackgroundLayer::Rain { sprites } => {
                ctx.set_fill_style_str("black");
                ctx.fill_rect(0.0, 0.0, w, h);
                ctx.set_fill_style_str(RAIN_COLOR);
                for s in sprites {
                    ctx.fill_text(s.glyph, s.x as f64, s.y as f64).map_err(js_err)?;
                }
            }
            BackgroundLayer::Blank => {}
        }

        if let Some(video) = self.video.as_ref() {
            match (list.video, mask) {
                (VideoLayer::Masked, Some(mask)) => {
                    self.cut_out(video, mask, w, h)?;
                    ctx.draw_image_with_html_canvas_element_and_dw_and_dh(&self.scratch, 0.0, 0.0, w, h)
                        .map_err(js_err)?;
                }
                (VideoLayer::Masked, None) | (VideoLayer::Raw, _) => {
                    ctx.draw_image_with_html_video_element_and_dw_and_dh(video, 0.0, 0.0, w, h)
                        .map_err(js_err)?;
                }
                (VideoLayer::Hidden, _) => {}
            }
        }

        let glyph_color = match list.background {
            BackgroundLayer::Rain { .. } => "white",
            _ => "black",
        };
        ctx.set_fill_style_str(glyph_color);
        for s in &list.sprites {
            ctx.fill_text(s.glyph, s.x as f64, s.y as f64).map_err(js_err)?;
        }
        Ok(())
    }

    fn cut_out(&self, video: &HtmlVideoElement, mask: &MaskImage, w: f64, h: f64) -> Result<()> {
        let sc = &self.scratch_ctx;
        sc.set_global_composite_operation("source-over").map_err(js_err)?;
        sc.clear_rect(0.0, 0.0, w, h);
        match mask {
            MaskImage::Bitmap(b) => sc.draw_image_with_image_bitmap_and_dw_and_dh(b, 0.0, 0.0, w, h),
            MaskImage::Canvas(c) => sc.draw_image_with_html_canvas_element_and_dw_and_dh(c, 0.0, 0.0, w, h),
        }
        .map_err(js_err)?;
        sc.set_global_composite_operation("source-in").map_err(js_err)?;
        sc.draw_image_with_html_video_element_and_dw_and_dh(video, 0.0, 0.0, w, h)
            .map_err(js_err)?;
        sc.set_global_composite_operation("source-over").map_err(js_err)
    }
}
