// VIEW: Frame description and its renderers
pub mod draw_list;

#[cfg(target_arch = "wasm32")]
pub mod canvas2d;

#[cfg(not(target_arch = "wasm32"))]
pub mod gpu_init;
#[cfg(not(target_arch = "wasm32"))]
pub mod overlay;

pub use draw_list::{BackgroundLayer, DrawList, Sprite, VideoLayer};

#[cfg(target_arch = "wasm32")]
pub use canvas2d::{CanvasCompositor, MaskImage};
#[cfg(not(target_arch = "wasm32"))]
pub use gpu_init::GpuContext;
