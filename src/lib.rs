// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
#[cfg(not(target_arch = "wasm32"))]
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::{BackgroundStyle, GameConfig};
pub use controller::GameSession;
pub use error::{Error, Result};

#[cfg(target_arch = "wasm32")]
pub use web::SwatGame;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use wasm_bindgen_futures::{future_to_promise, JsFuture};
    use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, HtmlCanvasElement, HtmlVideoElement, Url, Window};

    use crate::controller::retry::initialize_with_retry;
    use crate::controller::sound::play_on_page;
    use crate::controller::{
        latest_slot, GameSession, InputProcessor, NoteQueue, Recording, SlotReceiver, SlotSender, SourceKind,
        SourceStatus,
    };
    use crate::error::{describe_js, Error};
    use crate::model::landmarks::wasm::pose_from_js;
    use crate::model::{CategoryId, PoseFrame};
    use crate::utils::now_ms;
    use crate::view::{CanvasCompositor, MaskImage, VideoLayer};
    use crate::{logging, GameConfig};

    #[wasm_bindgen(start)]
    pub fn start() {
        logging::init();
        tracing::info!("swat-piano module loaded");
    }

    /// Everything the frame loop touches; dropped on shutdown
    struct Running {
        session: GameSession,
        masks: SlotReceiver<MaskImage>,
        compositor: CanvasCompositor,
    }

    impl Running {
        fn frame(&mut self, now: f64) -> crate::Result<()> {
            self.session.tick(now);
            let mask = match self.session.source_status(SourceKind::Segmentation) {
                SourceStatus::Disabled => None,
                _ => self.masks.latest(),
            };
            let video = VideoLayer::choose(self.compositor.has_video(), mask.is_some());
            let list = self.session.draw_list(video);
            self.compositor.draw(&list, mask.as_ref())
        }
    }

    /// Game handle exported to the page
    #[wasm_bindgen]
    pub struct SwatGame {
        state: Rc<RefCell<Option<Running>>>,
        pose_tx: SlotSender<PoseFrame>,
        mask_tx: SlotSender<MaskImage>,
        notes: Rc<RefCell<NoteQueue>>,
        note_handler: Rc<RefCell<Option<js_sys::Function>>>,
        input: InputProcessor,
        window: Window,
        document: Document,
        started: bool,
    }

    #[wasm_bindgen]
    impl SwatGame {
        #[wasm_bindgen(constructor)]
        pub fn new(canvas_id: &str, video_id: Option<String>, config_json: Option<String>) -> Result<SwatGame, JsValue> {
            let window = web_sys::window().ok_or_else(|| Error::render("no window"))?;
            let document = window.document().ok_or_else(|| Error::render("no document"))?;

            let config = match config_json {
                Some(json) => GameConfig::from_json(&json)?,
                None => GameConfig::default(),
            };

            let canvas = document
                .get_element_by_id(canvas_id)
                .ok_or_else(|| Error::render(format!("no element #{canvas_id}")))?
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| Error::render(format!("#{canvas_id} is not a canvas")))?;
            let video = match video_id {
                Some(id) => Some(
                    document
                        .get_element_by_id(&id)
                        .ok_or_else(|| Error::render(format!("no element #{id}")))?
                        .dyn_into::<HtmlVideoElement>()
                        .map_err(|_| Error::render(format!("#{id} is not a video")))?,
                ),
                None => None,
            };

            let field = config.playfield;
            let compositor = CanvasCompositor::new(canvas, video, field.width as u32, field.height as u32)?;
            let notes = Rc::new(RefCell::new(NoteQueue::default()));
            let (session, pose_tx) = GameSession::new(config, Box::new(notes.clone()))?;
            let (mask_tx, masks) = latest_slot();

            Ok(SwatGame {
                state: Rc::new(RefCell::new(Some(Running { session, masks, compositor }))),
                pose_tx,
                mask_tx,
                notes,
                note_handler: Rc::new(RefCell::new(None)),
                input: InputProcessor::default(),
                window,
                document,
                started: false,
            })
        }

        /// Start the requestAnimationFrame loop
        pub fn start(&mut self) -> Result<(), JsValue> {
            if self.started {
                return Ok(());
            }
            let state = self.state.clone();
            let notes = self.notes.clone();
            let note_handler = self.note_handler.clone();
            FrameLoop::new(self.window.clone(), move || {
                {
                    let mut guard = state.borrow_mut();
                    let Some(running) = guard.as_mut() else {
                        tracing::info!("Frame loop stopped");
                        return false;
                    };
                    if let Err(e) = running.frame(now_ms()) {
                        tracing::error!("Frame failed: {}", e);
                    }
                }
                // the handler may call back into the game, so no borrow is held here
                let pending = notes.borrow_mut().drain();
                let handler = note_handler.borrow().clone();
                if let Some(handler) = handler {
                    for note in &pending {
                        if let Err(e) = play_on_page(&handler, note) {
                            tracing::warn!("Note handler failed: {}", e);
                        }
                    }
                }
                true
            })
            .start()?;
            self.started = true;
            Ok(())
        }

        /// Tear the session down; late source results are ignored
        pub fn shutdown(&mut self) {
            let Ok(mut guard) = self.state.try_borrow_mut() else {
                tracing::warn!("Shutdown requested mid-frame; ignored");
                return;
            };
            if guard.take().is_some() {
                tracing::info!("Session shut down");
            }
        }

        #[wasm_bindgen(js_name = pushPose)]
        pub fn push_pose(&self, landmarks: JsValue) {
            if landmarks.is_null() || landmarks.is_undefined() {
                return;
            }
            match pose_from_js(&landmarks) {
                Some(frame) => {
                    self.pose_tx.publish(frame);
                }
                None => tracing::debug!("Ignoring malformed pose result"),
            }
        }

        #[wasm_bindgen(js_name = pushSegmentation)]
        pub fn push_segmentation(&self, mask: JsValue) {
            match MaskImage::from_js(mask) {
                Some(mask) => {
                    self.mask_tx.publish(mask);
                }
                // no mask this frame: show the raw video
                None => {
                    self.mask_tx.clear();
                }
            }
        }

        /// Run `init_fn` under the retry policy; resolves to whether the source came up
        #[wasm_bindgen(js_name = initSource)]
        pub fn init_source(&self, kind: &str, init_fn: js_sys::Function) -> Result<js_sys::Promise, JsValue> {
            let kind: SourceKind = kind.parse()?;
            let policy = {
                let mut guard = self.state.try_borrow_mut().map_err(|_| Error::render("session is busy"))?;
                let running = guard.as_mut().ok_or_else(|| Error::render("session is shut down"))?;
                running.session.set_source_status(kind, SourceStatus::Pending);
                running.session.config().init_retry
            };
            let state = self.state.clone();
            Ok(future_to_promise(async move {
                let status = initialize_with_retry(
                    kind,
                    policy,
                    || call_init(init_fn.clone()),
                    sleep_ms,
                )
                .await;
                match state.try_borrow_mut() {
                    Ok(mut guard) => {
                        if let Some(running) = guard.as_mut() {
                            running.session.set_source_status(kind, status);
                        }
                    }
                    Err(_) => tracing::warn!("Could not record {} status {:?}", kind, status),
                }
                Ok(JsValue::from_bool(status == SourceStatus::Ready))
            }))
        }

        #[wasm_bindgen(js_name = setSpeed)]
        pub fn set_speed(&self, multiplier: f32) {
            self.with_session(|s| s.set_speed(multiplier));
        }

        #[wasm_bindgen(js_name = setDropsPerPeriod)]
        pub fn set_drops_per_period(&self, drops: u32) {
            self.with_session(|s| s.set_drops_per_period(drops));
        }

        #[wasm_bindgen(js_name = setCategoryEnabled)]
        pub fn set_category_enabled(&self, index: usize, enabled: bool) -> bool {
            self.with_session(|s| s.set_category_enabled(index, enabled)).unwrap_or(false)
        }

        /// `[{glyph, name, enabled}]` in catalog order
        pub fn categories(&self) -> js_sys::Array {
            let out = js_sys::Array::new();
            self.with_session(|s| {
                for (id, c) in s.catalog().iter() {
                    let entry = js_sys::Object::new();
                    let _ = js_sys::Reflect::set(&entry, &"glyph".into(), &c.glyph.into());
                    let _ = js_sys::Reflect::set(&entry, &"name".into(), &c.name.into());
                    let _ = js_sys::Reflect::set(
                        &entry,
                        &"enabled".into(),
                        &s.is_category_enabled(id.0).into(),
                    );
                    out.push(&entry);
                }
            });
            out
        }

        /// Callback `(timbre, frequencyHz, length, name)` invoked per note
        #[wasm_bindgen(js_name = setNoteHandler)]
        pub fn set_note_handler(&self, handler: Option<js_sys::Function>) {
            *self.note_handler.borrow_mut() = handler;
        }

        /// Start or stop capture; stopping downloads the take. Returns whether recording is on.
        #[wasm_bindgen(js_name = toggleRecording)]
        pub fn toggle_recording(&self) -> Result<bool, JsValue> {
            let (take, recording) = self
                .with_session(|s| (s.toggle_recording(now_ms()), s.is_recording()))
                .unwrap_or((None, false));
            if let Some(take) = take {
                download_recording(&self.document, &take)?;
            }
            Ok(recording)
        }

        #[wasm_bindgen(js_name = tallyText)]
        pub fn tally_text(&self) -> String {
            self.with_session(|s| s.tally().to_string()).unwrap_or_default()
        }

        #[wasm_bindgen(js_name = recentEvents)]
        pub fn recent_events(&self) -> js_sys::Array {
            let out = js_sys::Array::new();
            self.with_session(|s| {
                for line in s.events().recent() {
                    out.push(&JsValue::from_str(&line.stamped()));
                }
            });
            out
        }

        /// Apply a keyboard shortcut (`KeyboardEvent.key`); returns whether it was bound
        #[wasm_bindgen(js_name = handleKey)]
        pub fn handle_key(&self, key: &str) -> Result<bool, JsValue> {
            let Some(command) = self.input.command_for_key(key) else {
                return Ok(false);
            };
            if let Some(Some(take)) = self.with_session(|s| s.apply(command, now_ms())) {
                download_recording(&self.document, &take)?;
            }
            Ok(true)
        }

        #[wasm_bindgen(js_name = categoryCount)]
        pub fn category_count(&self) -> usize {
            self.with_session(|s| s.catalog().len()).unwrap_or(0)
        }

        #[wasm_bindgen(js_name = hitCount)]
        pub fn hit_count(&self, index: usize) -> u32 {
            self.with_session(|s| s.tally().count(CategoryId(index))).unwrap_or(0)
        }
    }

    impl SwatGame {
        /// `None` once shut down, or while the frame loop holds the session
        fn with_session<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> Option<R> {
            let mut guard = self.state.try_borrow_mut().ok()?;
            guard.as_mut().map(|running| f(&mut running.session))
        }
    }

    /// Invoke a page init function; a rejected promise, a throw or `false` is a failure
    async fn call_init(init_fn: js_sys::Function) -> Result<(), String> {
        let mut value = init_fn.call0(&JsValue::NULL).map_err(|e| describe_js(&e))?;
        if let Some(promise) = value.dyn_ref::<js_sys::Promise>() {
            value = JsFuture::from(promise.clone()).await.map_err(|e| describe_js(&e))?;
        }
        if value.as_bool() == Some(false) {
            return Err("init function reported failure".to_string());
        }
        Ok(())
    }

    async fn sleep_ms(ms: u32) {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().and_then(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32).ok()
            });
            if scheduled.is_none() {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }

    fn download_recording(document: &Document, take: &Recording) -> crate::Result<()> {
        let js = |e: JsValue| Error::recording(describe_js(&e));

        let bytes = take.to_midi_bytes();
        let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
        let props = BlobPropertyBag::new();
        props.set_type("audio/midi");
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &props).map_err(js)?;
        let url = Url::create_object_url_with_blob(&blob).map_err(js)?;

        let anchor = document
            .create_element("a")
            .map_err(js)?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|_| Error::recording("created element is not an anchor"))?;
        anchor.set_href(&url);
        anchor.set_download(&take.file_name());
        anchor.click();
        Url::revoke_object_url(&url).map_err(js)?;
        tracing::info!("Downloaded {} ({} notes)", take.file_name(), take.notes.len());
        Ok(())
    }

    /// requestAnimationFrame driver; the callback returns `false` to stop
    struct FrameLoop {
        inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
        window: Window,
    }

    impl FrameLoop {
        fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) -> Result<(), JsValue> {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                if !inner.borrow_mut().as_mut()() {
                    return;
                }
                // Schedule next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        tracing::error!("RAF failed: {}", describe_js(&e));
                    }
                }
            }) as Box<dyn FnMut()>));

            let first = callback.borrow();
            match first.as_ref() {
                Some(cb) => self.window.request_animation_frame(cb.as_ref().unchecked_ref()).map(|_| ()),
                None => Ok(()),
            }
        }
    }
}
