//! Browser bindings
//!
//! - `CanvasSurface`: `DrawSurface` over a 2D canvas context
//! - Default sprite frames and the background tile, drawn procedurally
//! - Custom art loading with a CORS retry, rasterized to the frame ladder
//! - `WorldHandle`: the JS-facing API and the animation-frame loop

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rand::Rng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, CustomEvent, CustomEventInit, Document, HtmlCanvasElement,
    HtmlImageElement, MouseEvent, PointerEvent, WheelEvent,
};

use super::FrameClock;
use crate::camera::{Camera, FocusOptions};
use crate::consts::{TIER_COUNT, WORLD_HEIGHT, WORLD_WIDTH};
use crate::error::WorldError;
use crate::events::WorldEvent;
use crate::persistence::{ClientPrefs, KeyValueStore, LocalStorageStore};
use crate::renderer::{DrawSurface, FrameRenderer, FrameSet, RenderOptions, build_frame_set};
use crate::settings::Settings;
use crate::sim::math::seeded_rng;
use crate::sim::{EntityRecord, WorldState, parse_deltas, parse_snapshot};
use crate::tuning::Tuning;

/// Background tile edge (px)
const TILE_SIZE: u32 = 256;
/// Zoom factor per wheel pixel
const WHEEL_ZOOM_RATE: f64 = 0.0015;

const ALIVE_PALETTE: [&str; TIER_COUNT] = ["#ff7ab8", "#8f7bff", "#4fc3ff", "#59e39a", "#ffd45c"];
const DEAD_BODY: &str = "#6d6f78";

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// Monotonic clock shared with `requestAnimationFrame` timestamps
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| JsValue::from_str("not a 2d context"))
}

fn create_canvas(
    width: u32,
    height: u32,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let canvas: HtmlCanvasElement = document()?.create_element("canvas")?.dyn_into()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx = context_2d(&canvas)?;
    Ok((canvas, ctx))
}

// ---- Canvas surface ----

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn circle_path(&self, center: Vec2, radius: f32) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            std::f64::consts::TAU,
        );
    }
}

impl DrawSurface for CanvasSurface {
    type Image = HtmlCanvasElement;

    fn size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn clear(&mut self, color: &str) {
        let size = self.size();
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(0.0, 0.0, size.x as f64, size.y as f64);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
    }

    fn fill_pattern(&mut self, tile: &HtmlCanvasElement, offset: Vec2, scale: f32) {
        let Ok(Some(pattern)) = self
            .ctx
            .create_pattern_with_html_canvas_element(tile, "repeat")
        else {
            return;
        };
        let scale = scale.max(0.01) as f64;
        let size = self.size();
        self.ctx.save();
        let _ = self.ctx.translate(offset.x as f64, offset.y as f64);
        let _ = self.ctx.scale(scale, scale);
        self.ctx.set_fill_style_canvas_pattern(&pattern);
        // Cover the viewport expressed in pattern space
        self.ctx.fill_rect(
            -offset.x as f64 / scale,
            -offset.y as f64 / scale,
            size.x as f64 / scale,
            size.y as f64 / scale,
        );
        self.ctx.restore();
    }

    fn fill_radial(
        &mut self,
        center: Vec2,
        inner_radius: f32,
        outer_radius: f32,
        inner: &str,
        outer: &str,
    ) {
        let Ok(gradient) = self.ctx.create_radial_gradient(
            center.x as f64,
            center.y as f64,
            inner_radius as f64,
            center.x as f64,
            center.y as f64,
            outer_radius as f64,
        ) else {
            return;
        };
        let _ = gradient.add_color_stop(0.0, inner);
        let _ = gradient.add_color_stop(1.0, outer);
        let size = self.size();
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.ctx.fill_rect(0.0, 0.0, size.x as f64, size.y as f64);
    }

    fn draw_image(&mut self, image: &HtmlCanvasElement, x: f32, y: f32, w: f32, h: f32) {
        let _ = self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
            image, x as f64, y as f64, w as f64, h as f64,
        );
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str) {
        self.circle_path(center, radius);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: &str) {
        self.circle_path(center, radius);
        self.ctx.set_line_width(width as f64);
        self.ctx.set_stroke_style_str(color);
        self.ctx.stroke();
    }

    fn fill_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, color: &str) {
        let (x, y, w, h) = (x as f64, y as f64, w as f64, h as f64);
        let r = (radius as f64).min(w * 0.5).min(h * 0.5);
        let ctx = &self.ctx;
        ctx.begin_path();
        ctx.move_to(x + r, y);
        let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
        let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
        let _ = ctx.arc_to(x, y + h, x, y, r);
        let _ = ctx.arc_to(x, y, x + w, y, r);
        ctx.close_path();
        ctx.set_fill_style_str(color);
        ctx.fill();
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn measure_text(&mut self, text: &str) -> f32 {
        self.ctx
            .measure_text(text)
            .map(|m| m.width() as f32)
            .unwrap_or(0.0)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: &str) {
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(color);
        let _ = self.ctx.fill_text(text, x as f64, y as f64);
    }
}

// ---- Procedural assets ----

/// Round blob with eyes; dead blobs are grey with X eyes
fn draw_blob(
    ctx: &CanvasRenderingContext2d,
    size: u32,
    tier: usize,
    alive: bool,
) -> Result<(), JsValue> {
    let s = size as f64;
    let c = s * 0.5;
    let r = s * 0.44;

    ctx.begin_path();
    ctx.ellipse(c, c + s * 0.03, r, r * 0.92, 0.0, 0.0, std::f64::consts::TAU)?;
    ctx.set_fill_style_str(if alive { ALIVE_PALETTE[tier % TIER_COUNT] } else { DEAD_BODY });
    ctx.fill();
    ctx.set_line_width((s * 0.04).max(1.0));
    ctx.set_stroke_style_str("rgba(0, 0, 0, 0.35)");
    ctx.stroke();

    let eye_dx = r * 0.36;
    let eye_y = c - r * 0.12;
    let eye_r = r * 0.18;
    for x in [c - eye_dx, c + eye_dx] {
        if alive {
            ctx.begin_path();
            ctx.arc(x, eye_y, eye_r, 0.0, std::f64::consts::TAU)?;
            ctx.set_fill_style_str("#ffffff");
            ctx.fill();
            ctx.begin_path();
            ctx.arc(x, eye_y + eye_r * 0.2, eye_r * 0.5, 0.0, std::f64::consts::TAU)?;
            ctx.set_fill_style_str("#1a1a22");
            ctx.fill();
        } else {
            ctx.begin_path();
            ctx.move_to(x - eye_r, eye_y - eye_r);
            ctx.line_to(x + eye_r, eye_y + eye_r);
            ctx.move_to(x + eye_r, eye_y - eye_r);
            ctx.line_to(x - eye_r, eye_y + eye_r);
            ctx.set_stroke_style_str("#1a1a22");
            ctx.stroke();
        }
    }
    Ok(())
}

fn default_frames(alive: bool) -> Result<FrameSet<HtmlCanvasElement>, JsValue> {
    build_frame_set(|tier, size| {
        let (canvas, ctx) = create_canvas(size, size)?;
        draw_blob(&ctx, size, tier, alive)?;
        Ok(canvas)
    })
}

/// Seamless grass tile: speckles are drawn into a 3x3 overscanned source with
/// wrap-around copies, then the center cell is cropped out
fn background_tile(seed: u64) -> Result<HtmlCanvasElement, JsValue> {
    let t = TILE_SIZE as f64;
    let (source, src) = create_canvas(TILE_SIZE * 3, TILE_SIZE * 3)?;
    src.set_fill_style_str("#2a4a2f");
    src.fill_rect(0.0, 0.0, t * 3.0, t * 3.0);

    let mut rng = seeded_rng(seed);
    let shades = ["#315a36", "#264229", "#3b6b3f", "#22391f"];
    for _ in 0..220 {
        let x = rng.random::<f64>() * t;
        let y = rng.random::<f64>() * t;
        let r = 1.0 + rng.random::<f64>() * 3.5;
        src.set_fill_style_str(shades[rng.random_range(0..shades.len())]);
        for dx in 0..3 {
            for dy in 0..3 {
                src.begin_path();
                src.arc(x + dx as f64 * t, y + dy as f64 * t, r, 0.0, std::f64::consts::TAU)?;
                src.fill();
            }
        }
    }

    let (tile, ctx) = create_canvas(TILE_SIZE, TILE_SIZE)?;
    ctx.draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
        &source, t, t, t, t, 0.0, 0.0, t, t,
    )?;
    Ok(tile)
}

// ---- Custom art ----

async fn load_image(url: &str, cross_origin: bool) -> Result<HtmlImageElement, JsValue> {
    let image = HtmlImageElement::new()?;
    if cross_origin {
        image.set_cross_origin(Some("anonymous"));
    }
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        image.set_onload(Some(&resolve));
        image.set_onerror(Some(&reject));
    });
    image.set_src(url);
    JsFuture::from(promise).await?;
    image.set_onload(None);
    image.set_onerror(None);
    Ok(image)
}

/// Fit `image` into each frame size, preserving aspect ratio
fn rasterize(image: &HtmlImageElement) -> Result<FrameSet<HtmlCanvasElement>, JsValue> {
    let (iw, ih) = (image.natural_width() as f64, image.natural_height() as f64);
    if iw <= 0.0 || ih <= 0.0 {
        return Err(JsValue::from_str("image has no size"));
    }
    build_frame_set(|_, size| {
        let (canvas, ctx) = create_canvas(size, size)?;
        let s = size as f64;
        let k = (s / iw).min(s / ih);
        let (w, h) = (iw * k, ih * k);
        ctx.draw_image_with_html_image_element_and_dw_and_dh(
            image,
            (s - w) * 0.5,
            (s - h) * 0.5,
            w,
            h,
        )?;
        Ok(canvas)
    })
}

/// Load custom art, retrying once without CORS when the host rejects anonymous requests
pub async fn load_variant(url: &str) -> Result<FrameSet<HtmlCanvasElement>, WorldError> {
    let image = match load_image(url, true).await {
        Ok(image) => image,
        Err(_) => {
            log::debug!("retrying {url} without crossOrigin");
            load_image(url, false).await.map_err(|e| WorldError::AssetLoad {
                url: url.to_string(),
                reason: format!("{e:?}"),
            })?
        }
    };
    rasterize(&image).map_err(|e| WorldError::AssetLoad {
        url: url.to_string(),
        reason: format!("{e:?}"),
    })
}

// ---- App ----

struct App {
    world: WorldState,
    camera: Camera,
    renderer: FrameRenderer<HtmlCanvasElement>,
    surface: CanvasSurface,
    settings: Settings,
    prefs: ClientPrefs,
    store: LocalStorageStore,
    clock: FrameClock,
    /// Canvas CSS size and dpr last applied
    css_size: (i32, i32, f64),
    running: bool,
    last_pointer_ms: f64,
}

impl App {
    fn apply_settings(&mut self) {
        self.world.animate_entry = self.settings.animate_entry();
        self.renderer.options = RenderOptions::from(&self.settings);
    }

    /// Match the backing store to CSS size x dpr and keep the camera's page origin current
    fn sync_canvas(&mut self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let canvas = self.surface.canvas();
        let dpr = window.device_pixel_ratio();
        let css = (canvas.client_width(), canvas.client_height(), dpr);
        let rect = canvas.get_bounding_client_rect();
        let origin = Vec2::new(
            (rect.left() + window.scroll_x().unwrap_or(0.0)) as f32,
            (rect.top() + window.scroll_y().unwrap_or(0.0)) as f32,
        );
        let css_vec = Vec2::new(css.0 as f32, css.1 as f32);

        if css == self.css_size {
            self.camera.set_viewport(css_vec, dpr as f32, origin);
            return;
        }
        let previous = self.camera.canvas_size();
        canvas.set_width((css.0 as f64 * dpr).round() as u32);
        canvas.set_height((css.1 as f64 * dpr).round() as u32);
        self.css_size = css;
        self.camera.set_viewport(css_vec, dpr as f32, origin);
        let fit_fully = !self.camera.is_initialized();
        self.camera.position_to_world(self.world.size, fit_fully, Some(previous));
        log::debug!("canvas resized to {}x{} @{dpr}", css.0, css.1);
    }

    fn pointer_screen(&self, event: &MouseEvent) -> Vec2 {
        self.camera
            .page_to_screen(Vec2::new(event.page_x() as f32, event.page_y() as f32))
    }
}

fn dispatch_events(events: Vec<WorldEvent>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    for event in events {
        let detail = serde_json::to_string(&event)
            .ok()
            .and_then(|json| js_sys::JSON::parse(&json).ok())
            .unwrap_or(JsValue::NULL);
        let init = CustomEventInit::new();
        init.set_detail(&detail);
        match CustomEvent::new_with_event_init_dict(event.name(), &init) {
            Ok(custom) => {
                let _ = window.dispatch_event(&custom);
            }
            Err(e) => log::warn!("failed to build {} event: {e:?}", event.name()),
        }
    }
}

fn request_animation_frame(app: Rc<RefCell<App>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        frame(app, time);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn frame(app: Rc<RefCell<App>>, time: f64) {
    let (events, missing) = {
        let mut guard = app.borrow_mut();
        if !guard.running {
            return;
        }
        let a = &mut *guard;
        a.sync_canvas();
        let dt = a.clock.tick(time);
        a.world
            .drive_slot_job(a.settings.quality.slot_attempts_per_frame());
        a.renderer
            .render(&mut a.surface, &mut a.world, &mut a.camera, time, dt);

        let urls: Vec<(String, bool)> = a
            .renderer
            .atlas
            .missing_urls(a.world.sprites())
            .into_iter()
            .map(|(url, alive)| (url.to_string(), alive))
            .collect();
        for (url, alive) in &urls {
            a.renderer.atlas.request(url, *alive);
        }
        (a.world.drain_events(), urls)
    };

    // Listeners may call back into the handle, so dispatch with the app released
    dispatch_events(events);

    for (url, alive) in missing {
        let app = app.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = load_variant(&url).await;
            let mut a = app.borrow_mut();
            match result {
                Ok(frames) => a.renderer.atlas.insert(&url, alive, frames),
                Err(e) => {
                    log::warn!("{e}");
                    a.renderer.atlas.mark_failed(&url);
                }
            }
        });
    }

    request_animation_frame(app);
}

fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
    // Drag start
    {
        let app = app.clone();
        let target = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
            let _ = target.set_pointer_capture(event.pointer_id());
            let mut a = app.borrow_mut();
            let at = a.pointer_screen(&event);
            a.camera.begin_drag(at);
            a.last_pointer_ms = now_ms();
        });
        let _ = canvas
            .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // Drag
    {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
            let mut a = app.borrow_mut();
            if !a.camera.is_dragging() {
                return;
            }
            let now = now_ms();
            let dt = now - a.last_pointer_ms;
            a.last_pointer_ms = now;
            let at = a.pointer_screen(&event);
            a.camera.drag_to(at, dt);
        });
        let _ = canvas
            .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // Release
    for name in ["pointerup", "pointercancel", "pointerleave"] {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
            app.borrow_mut().camera.end_drag();
        });
        let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // Wheel zoom about the cursor
    {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: WheelEvent| {
            event.prevent_default();
            let mut a = app.borrow_mut();
            let at = a.pointer_screen(&event);
            let factor = (-event.delta_y() * WHEEL_ZOOM_RATE).exp() as f32;
            a.camera.zoom_at(at, factor);
        });
        let _ = canvas.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // Drop the frame clock while hidden so the first visible frame is not a huge step
    if let Ok(document) = document() {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().clock.reset();
        });
        let _ = document.add_event_listener_with_callback(
            "visibilitychange",
            closure.as_ref().unchecked_ref(),
        );
        closure.forget();
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// JS-facing handle to one world canvas
#[wasm_bindgen]
pub struct WorldHandle {
    app: Rc<RefCell<App>>,
}

#[wasm_bindgen]
impl WorldHandle {
    /// Attach to the canvas with `canvas_id`. `tuning_json` may override any tunable.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, tuning_json: Option<String>) -> Result<WorldHandle, JsValue> {
        let canvas: HtmlCanvasElement = document()?
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas not found"))?
            .dyn_into()?;

        let tuning = match tuning_json.as_deref() {
            Some(json) => Tuning::from_json(json).map_err(js_err)?,
            None => Tuning::default(),
        };
        let store = LocalStorageStore;
        let settings = Settings::load_from(&store);
        let prefs = ClientPrefs::load(&store);
        let seed = js_sys::Date::now() as u64;

        let camera = Camera::new(tuning.camera.clone());
        let mut world = WorldState::new(Vec2::new(WORLD_WIDTH, WORLD_HEIGHT), tuning, seed);
        if let Some(me) = prefs.self_address() {
            world.set_self_address(Some(me));
        }
        let prewarm = world.tuning.slots.prewarm_counts.clone();
        let generation = world.start_slot_job(&prewarm);
        log::info!("world created (seed {seed}); prewarming slots as generation {generation}");

        let mut renderer = FrameRenderer::new(RenderOptions::from(&settings));
        renderer.atlas.set_defaults(default_frames(true)?, default_frames(false)?);
        match background_tile(seed) {
            Ok(tile) => renderer.background = Some(tile),
            Err(e) => log::warn!("background tile unavailable: {e:?}"),
        }

        let mut app = App {
            world,
            camera,
            renderer,
            surface: CanvasSurface::new(canvas.clone())?,
            settings,
            prefs,
            store,
            clock: FrameClock::new(),
            css_size: (0, 0, 0.0),
            running: false,
            last_pointer_ms: 0.0,
        };
        app.apply_settings();
        app.sync_canvas();

        let app = Rc::new(RefCell::new(app));
        setup_input_handlers(&canvas, app.clone());
        Ok(WorldHandle { app })
    }

    /// Start the animation-frame loop (idempotent)
    pub fn start(&self) {
        let mut a = self.app.borrow_mut();
        if a.running {
            return;
        }
        a.running = true;
        a.clock.reset();
        drop(a);
        request_animation_frame(self.app.clone());
    }

    pub fn stop(&self) {
        self.app.borrow_mut().running = false;
    }

    /// Replace all sprites from a JSON array of entity records
    #[wasm_bindgen(js_name = applySnapshot)]
    pub fn apply_snapshot(&self, json: &str) -> Result<usize, JsValue> {
        let records = parse_snapshot(json).map_err(js_err)?;
        let mut a = self.app.borrow_mut();
        a.world.apply_snapshot(&records, now_ms());
        Ok(a.world.len())
    }

    /// Apply a JSON array of deltas; returns the number of sprites changed
    #[wasm_bindgen(js_name = applyDeltas)]
    pub fn apply_deltas(&self, json: &str) -> Result<usize, JsValue> {
        let deltas = parse_deltas(json).map_err(js_err)?;
        Ok(self.app.borrow_mut().world.apply_deltas(&deltas))
    }

    #[wasm_bindgen(js_name = addSprite)]
    pub fn add_sprite(&self, json: &str, replace: bool) -> Result<usize, JsValue> {
        let record: EntityRecord = serde_json::from_str(json).map_err(js_err)?;
        let now = now_ms();
        self.app
            .borrow_mut()
            .world
            .add_sprite(&record, replace, now)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = removeSprite)]
    pub fn remove_sprite(&self, address: &str) -> bool {
        self.app.borrow_mut().world.remove_sprite(address)
    }

    #[wasm_bindgen(js_name = focusOnAddress)]
    pub fn focus_on_address(
        &self,
        address: &str,
        zoom: Option<f32>,
        duration_ms: Option<f64>,
    ) -> bool {
        let defaults = FocusOptions::default();
        let options = FocusOptions {
            zoom: zoom.or(defaults.zoom),
            duration_ms: duration_ms.unwrap_or(defaults.duration_ms),
        };
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        a.camera
            .focus_on_address(&a.world, address, options, now_ms())
    }

    #[wasm_bindgen(js_name = fitToWorld)]
    pub fn fit_to_world(&self) {
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        a.camera.position_to_world(a.world.size, true, None);
    }

    #[wasm_bindgen(js_name = setHovered)]
    pub fn set_hovered(&self, address: Option<String>) -> bool {
        self.app.borrow_mut().world.set_hovered(address.as_deref())
    }

    #[wasm_bindgen(js_name = setInspected)]
    pub fn set_inspected(&self, address: Option<String>) -> bool {
        self.app.borrow_mut().world.set_inspected(address.as_deref())
    }

    #[wasm_bindgen(js_name = selectOpponent)]
    pub fn select_opponent(&self, address: Option<String>) -> bool {
        self.app.borrow_mut().world.select_opponent(address.as_deref())
    }

    /// Set the local player's address and remember it for the next visit
    #[wasm_bindgen(js_name = setSelfAddress)]
    pub fn set_self_address(&self, address: Option<String>) -> bool {
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        a.prefs.display_address = address.clone();
        a.prefs.save(&mut a.store);
        a.world.set_self_address(address.as_deref())
    }

    #[wasm_bindgen(js_name = setWalletAddress)]
    pub fn set_wallet_address(&self, address: Option<String>) {
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        a.prefs.wallet_address = address;
        a.prefs.save(&mut a.store);
    }

    #[wasm_bindgen(js_name = setHighlightMode)]
    pub fn set_highlight_mode(&self, active: bool) {
        self.app.borrow_mut().world.set_highlight_mode(active);
    }

    #[wasm_bindgen(js_name = ownedLandmarkCount)]
    pub fn owned_landmark_count(&self, owner: &str) -> usize {
        self.app.borrow().world.owned_landmark_count(owner)
    }

    /// Page coordinates `[x, y]` of a sprite, for DOM overlays
    #[wasm_bindgen(js_name = worldToPage)]
    pub fn world_to_page(&self, address: &str) -> Option<Vec<f32>> {
        let a = self.app.borrow();
        let sprite = a.world.sprite(address)?;
        let page = a.camera.world_to_page(sprite.draw_pos(now_ms(), false));
        Some(vec![page.x, page.y])
    }

    /// Start a background slot generation; returns its generation id
    #[wasm_bindgen(js_name = startSlotJob)]
    pub fn start_slot_job(&self, counts: Vec<u32>) -> u64 {
        let counts: Vec<usize> = counts.into_iter().map(|c| c as usize).collect();
        self.app.borrow_mut().world.start_slot_job(&counts)
    }

    /// Replace display settings from JSON and persist them
    #[wasm_bindgen(js_name = setSettings)]
    pub fn set_settings(&self, json: &str) -> Result<(), JsValue> {
        let settings: Settings = serde_json::from_str(json).map_err(js_err)?;
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        settings.save_to(&mut a.store);
        a.settings = settings;
        a.apply_settings();
        Ok(())
    }

    #[wasm_bindgen(js_name = settings)]
    pub fn settings_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.app.borrow().settings).map_err(js_err)
    }

    #[wasm_bindgen(js_name = navHintSeen)]
    pub fn nav_hint_seen(&self) -> bool {
        self.app.borrow().prefs.nav_hint_seen
    }

    #[wasm_bindgen(js_name = markNavHintSeen)]
    pub fn mark_nav_hint_seen(&self) {
        let mut guard = self.app.borrow_mut();
        let a = &mut *guard;
        a.prefs.nav_hint_seen = true;
        a.prefs.save(&mut a.store);
    }

    /// Raw stored value for a preference key (debug aid)
    #[wasm_bindgen(js_name = storedValue)]
    pub fn stored_value(&self, key: &str) -> Option<String> {
        self.app.borrow().store.get(key)
    }
}

/// Install the panic hook and console logger
#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
    log::info!("Bloblets World module loaded");
}
