use std::path::PathBuf;

use glam::{Vec2, Vec3};

#[cfg(feature = "audio")]
use crate::audio::{load_audio_buffer, AudioBuffer, AudioListener, Sound};
use crate::camera::{Camera, OrthographicFrustum, Projection};
use crate::config::ControllerConfig;
use crate::controls::OrbitControls;
use crate::core::{FrameCounter, FrameInfo, HostEvent, ListenerId, ListenerKind, Listeners, Viewport};
use crate::error::{Result, SceneError};
use crate::geometry::{set_bary_coord, Geometry};
use crate::loaders::{load_fbx, load_gltf, load_in_background};
use crate::material::{Material, ShaderMaterial, UniformValue, RESOLUTION_UNIFORM};
use crate::math::Color;
use crate::pointer::{normalized_pointer, MouseSpeedTracker};
use crate::raycaster::{Intersection, Raycaster};
use crate::render::{Canvas, CreateBackend, EffectComposer, RenderBackend, ShadowMapType};
use crate::scene::{Light, Model, Node, NodeId, NodeKind, Scene};
use crate::stats::Stats;

const DIRECTIONAL_LIGHT_INTENSITY: f32 = 0.5;
const DIRECTIONAL_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 50.0, 0.0);
const AMBIENT_LIGHT_INTENSITY: f32 = 0.4;

/// Optional-field description of a mesh. Missing fields fall back to a unit
/// cube, the default standard material and the origin.
#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    pub geometry: Option<Geometry>,
    pub material: Option<Material>,
    pub position: Option<Vec3>,
}

impl MeshObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    fn into_node(self) -> Node {
        let mesh = crate::scene::Mesh {
            geometry: self.geometry.unwrap_or_else(|| Geometry::cuboid(1.0, 1.0, 1.0)),
            material: self.material.unwrap_or_default(),
        };
        Node::new("mesh", NodeKind::Mesh(mesh)).with_position(self.position.unwrap_or(Vec3::ZERO))
    }
}

/// Per-frame state handed to [`SceneHooks::update`]
pub struct FrameContext<'a> {
    pub frame: FrameInfo,
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    /// Renderer canvas after this frame's resize check
    pub canvas: Canvas,
    pub mouse_speed: f32,
}

/// Per-frame logic plugged into the render loop
pub trait SceneHooks {
    /// Runs after the resize check and before controls, stats and render
    fn update(&mut self, _ctx: FrameContext<'_>) {}
}

impl SceneHooks for () {}

fn new_scene(config: &ControllerConfig) -> (Scene, Option<Stats>) {
    let mut scene = Scene::new();
    scene.background = config.scene_color;
    if !config.debug {
        return (scene, None);
    }
    scene.add_to_root(Node::new(
        "axes",
        NodeKind::AxesHelper {
            size: config.axes_size,
        },
    ));
    log::debug!("debug scene: axes helper and stats overlay enabled");
    (scene, Some(Stats::new()))
}

fn perspective_camera<V: Viewport>(viewport: &V, config: &ControllerConfig) -> Camera {
    Camera::perspective(&config.perspective, viewport.aspect(), config.camera_position(), config.look_at())
}

fn add_lights(scene: &mut Scene) {
    let white = Color::from_hex(0xffffff);
    scene.add_to_root(
        Node::new(
            "directional_light",
            NodeKind::DirectionalLight(Light {
                color: white,
                intensity: DIRECTIONAL_LIGHT_INTENSITY,
            }),
        )
        .with_position(DIRECTIONAL_LIGHT_POSITION),
    );
    scene.add_to_root(Node::new(
        "ambient_light",
        NodeKind::AmbientLight(Light {
            color: white,
            intensity: AMBIENT_LIGHT_INTENSITY,
        }),
    ));
}

/// Setup stage of the controller. Each `create_*` step can be called on its
/// own; [`SceneBuilder::create_renderer`] turns it into a ready
/// [`SceneController`].
pub struct SceneBuilder<V: Viewport> {
    viewport: V,
    config: ControllerConfig,
    scene: Option<Scene>,
    camera: Option<Camera>,
    stats: Option<Stats>,
    ortho_frustum: OrthographicFrustum,
}

impl<V: Viewport> SceneBuilder<V> {
    pub fn new(viewport: V, config: ControllerConfig) -> Self {
        let ortho_frustum = config.orthographic_params.frustum(viewport.aspect());
        Self {
            viewport,
            config,
            scene: None,
            camera: None,
            stats: None,
            ortho_frustum,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Empty scene; in debug mode with an axes helper and a stats counter
    pub fn create_scene(&mut self) -> &mut Self {
        let (scene, stats) = new_scene(&self.config);
        self.scene = Some(scene);
        self.stats = stats;
        self
    }

    pub fn set_scene_color(&mut self, color: Color) -> Result<()> {
        let scene = self.scene.as_mut().ok_or(SceneError::NotReady("scene"))?;
        scene.background = Some(color);
        Ok(())
    }

    pub fn create_perspective_camera(&mut self) -> &mut Self {
        self.camera = Some(perspective_camera(&self.viewport, &self.config));
        self
    }

    pub fn create_orthographic_camera(&mut self) -> &mut Self {
        let frustum = self.update_orthographic_camera_params();
        self.camera = Some(Camera::orthographic(
            frustum,
            self.config.camera_position(),
            self.config.look_at(),
        ));
        self
    }

    /// Recompute the stored orthographic frustum from the container aspect
    pub fn update_orthographic_camera_params(&mut self) -> OrthographicFrustum {
        self.ortho_frustum = self.config.orthographic_params.frustum(self.viewport.aspect());
        self.ortho_frustum
    }

    pub fn set_camera_up_z(&mut self) -> Result<()> {
        let camera = self.camera.as_mut().ok_or(SceneError::NotReady("camera"))?;
        camera.up = Vec3::Z;
        Ok(())
    }

    /// Add a mesh under `parent` (the scene root when `None`)
    pub fn create_mesh(&mut self, object: MeshObject, parent: Option<NodeId>) -> Result<NodeId> {
        let scene = self.scene.as_mut().ok_or(SceneError::NotReady("scene"))?;
        let parent = parent.unwrap_or(scene.root());
        scene
            .try_add(parent, object.into_node())
            .ok_or(SceneError::UnknownNode(parent))
    }

    pub fn create_light(&mut self) -> Result<()> {
        let scene = self.scene.as_mut().ok_or(SceneError::NotReady("scene"))?;
        add_lights(scene);
        Ok(())
    }

    /// Build the renderer and hand over to the ready stage.
    ///
    /// The renderer is sized to the container, resized for the pixel
    /// ratio right away, attached to the container and cleared to
    /// transparent black. `use_gl_fallback` asks for the GL backend.
    pub fn create_renderer<R: CreateBackend<V>>(mut self, use_gl_fallback: bool) -> Result<SceneController<R, V>> {
        let scene = self.scene.take().ok_or(SceneError::NotReady("scene"))?;
        let camera = self.camera.take().ok_or(SceneError::NotReady("camera"))?;

        let mut renderer = R::create(&self.viewport, self.config.renderer.settings(), use_gl_fallback)?;
        let (width, height) = self.viewport.client_size();
        renderer.set_size(width, height, true);
        resize_to_display_size(&mut renderer, self.viewport.device_pixel_ratio());
        self.viewport.append_canvas();
        renderer.set_clear_color(Color::BLACK, 0.0);
        log::info!(
            "renderer created: {}x{} (gl fallback: {})",
            renderer.canvas().width,
            renderer.canvas().height,
            use_gl_fallback
        );

        Ok(SceneController {
            viewport: self.viewport,
            config: self.config,
            scene,
            camera,
            renderer,
            ortho_frustum: self.ortho_frustum,
            controls: None,
            composer: None,
            stats: self.stats,
            #[cfg(feature = "audio")]
            audio_listener: None,
            #[cfg(feature = "audio")]
            sound: None,
            raycaster: None,
            pointer: Vec2::ZERO,
            mouse_speed: MouseSpeedTracker::new(),
            fullscreen_shader: None,
            listeners: Listeners::new(),
            frames: FrameCounter::new(),
            looping: false,
        })
    }

    /// Same as `create_renderer(false)`
    pub fn build<R: CreateBackend<V>>(self) -> Result<SceneController<R, V>> {
        self.create_renderer(false)
    }
}

/// Backing-buffer size for the canvas layout size at `pixel_ratio`;
/// resizes only on change
fn resize_to_display_size<R: RenderBackend + ?Sized>(renderer: &mut R, pixel_ratio: f64) -> bool {
    let canvas = *renderer.canvas();
    let width = (canvas.client_width * pixel_ratio).floor();
    let height = (canvas.client_height * pixel_ratio).floor();
    let needed = canvas.width as f64 != width || canvas.height as f64 != height;
    if needed {
        log::debug!("resizing backing buffer to {}x{}", width, height);
        renderer.set_size(width, height, false);
    }
    needed
}

/// Ready scene controller: scene, camera and renderer all exist
pub struct SceneController<R: RenderBackend, V: Viewport> {
    viewport: V,
    config: ControllerConfig,
    scene: Scene,
    camera: Camera,
    renderer: R,
    ortho_frustum: OrthographicFrustum,
    controls: Option<OrbitControls>,
    composer: Option<EffectComposer>,
    stats: Option<Stats>,
    #[cfg(feature = "audio")]
    audio_listener: Option<AudioListener>,
    #[cfg(feature = "audio")]
    sound: Option<Sound>,
    raycaster: Option<Raycaster>,
    pointer: Vec2,
    mouse_speed: MouseSpeedTracker,
    fullscreen_shader: Option<NodeId>,
    listeners: Listeners,
    frames: FrameCounter,
    looping: bool,
}

impl<R: CreateBackend<V>, V: Viewport> SceneController<R, V> {
    /// Full setup in fixed order: scene, camera, renderer, default mesh,
    /// lights, orbit controls, listeners, loop.
    pub fn init(viewport: V, config: ControllerConfig) -> Result<Self> {
        Self::init_with(viewport, config, false)
    }

    /// [`init`](Self::init) with the renderer's GL fallback switch
    pub fn init_with(viewport: V, config: ControllerConfig, use_gl_fallback: bool) -> Result<Self> {
        let orthographic = config.orthographic;
        let mut builder = SceneBuilder::new(viewport, config);
        builder.create_scene();
        if orthographic {
            builder.create_orthographic_camera();
        } else {
            builder.create_perspective_camera();
        }
        let mut controller = builder.create_renderer::<R>(use_gl_fallback)?;
        controller.create_mesh(MeshObject::default(), None)?;
        controller.create_light();
        controller.create_orbit_controls();
        controller.add_listeners();
        controller.set_loop();
        Ok(controller)
    }
}

impl<R: RenderBackend, V: Viewport> SceneController<R, V> {
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn orthographic_frustum(&self) -> OrthographicFrustum {
        self.ortho_frustum
    }

    pub fn set_scene_color(&mut self, color: Color) {
        self.scene.background = Some(color);
    }

    /// Replace the active camera with a perspective one
    pub fn create_perspective_camera(&mut self) {
        self.camera = perspective_camera(&self.viewport, &self.config);
    }

    /// Replace the active camera with an orthographic one
    pub fn create_orthographic_camera(&mut self) {
        let frustum = self.update_orthographic_camera_params();
        self.camera = Camera::orthographic(frustum, self.config.camera_position(), self.config.look_at());
    }

    /// Recompute the stored orthographic frustum from the container aspect
    pub fn update_orthographic_camera_params(&mut self) -> OrthographicFrustum {
        self.ortho_frustum = self.config.orthographic_params.frustum(self.viewport.aspect());
        self.ortho_frustum
    }

    pub fn set_camera_up_z(&mut self) {
        self.camera.up = Vec3::Z;
    }

    pub fn enable_shadow(&mut self) {
        self.renderer.settings_mut().shadow_map.enabled = true;
    }

    pub fn use_vsm_shadow_map(&mut self) {
        self.renderer.settings_mut().shadow_map.kind = ShadowMapType::Vsm;
    }

    /// Match the backing buffer to `floor(client size * pixel ratio)`.
    /// Returns whether a resize happened.
    pub fn resize_renderer_to_display_size(&mut self) -> bool {
        resize_to_display_size(&mut self.renderer, self.viewport.device_pixel_ratio())
    }

    /// Add a mesh under `parent` (the scene root when `None`)
    pub fn create_mesh(&mut self, object: MeshObject, parent: Option<NodeId>) -> Result<NodeId> {
        let parent = parent.unwrap_or(self.scene.root());
        self.scene
            .try_add(parent, object.into_node())
            .ok_or(SceneError::UnknownNode(parent))
    }

    pub fn create_light(&mut self) {
        add_lights(&mut self.scene);
    }

    /// Orbit controls around the look-at point, fed by pointer input
    pub fn create_orbit_controls(&mut self) {
        let mut controls = OrbitControls::new(self.config.look_at());
        controls.set_viewport_height(self.viewport.client_size().1 as f32);
        controls.update(&mut self.camera);
        self.controls = Some(controls);
        self.listeners.subscribe(ListenerKind::OrbitInput);
    }

    pub fn set_composer(&mut self, composer: EffectComposer) {
        self.composer = Some(composer);
    }

    pub fn composer_mut(&mut self) -> Option<&mut EffectComposer> {
        self.composer.as_mut()
    }

    /// Register the resize listener
    pub fn add_listeners(&mut self) -> ListenerId {
        self.listeners.subscribe(ListenerKind::Resize)
    }

    /// Unsubscribe every listener; events are ignored afterwards
    pub fn remove_listeners(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        log::debug!("removed {count} listeners");
        count
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Reaction to a window resize
    pub fn on_resize(&mut self) {
        if let Some(id) = self.fullscreen_shader {
            let (width, height) = self.viewport.window_size();
            self.set_resolution_uniform(id, width, height);
            self.renderer.set_size(width, height, true);
            return;
        }

        match self.camera.projection {
            Projection::Perspective(_) => {
                let aspect = self.viewport.aspect();
                self.camera.update_projection(aspect, &self.config.orthographic_params);
            }
            Projection::Orthographic(_) => {
                let frustum = self.update_orthographic_camera_params();
                self.camera.projection = Projection::Orthographic(frustum);
            }
        }
        let (width, height) = self.viewport.client_size();
        if let Some(controls) = &mut self.controls {
            controls.set_viewport_height(height as f32);
        }
        self.renderer.set_size(width, height, true);
    }

    fn set_resolution_uniform(&mut self, id: NodeId, width: f64, height: f64) {
        let resolution = UniformValue::Vec2(Vec2::new(width as f32, height as f32));
        match self.scene.node_mut(id).and_then(|n| n.mesh_mut()) {
            Some(mesh) => match &mut mesh.material {
                Material::Shader(shader) => shader.set_uniform(RESOLUTION_UNIFORM, resolution),
                Material::Standard { .. } => log::warn!("full-screen mesh {:?} has no shader material", id),
            },
            None => log::warn!("full-screen mesh {:?} is gone", id),
        }
    }

    /// Add a 2x2 plane with `material` and route resizes through its
    /// resolution uniform
    pub fn set_fullscreen_shader(&mut self, material: ShaderMaterial) -> NodeId {
        let id = self.scene.add_to_root(
            MeshObject::new()
                .with_geometry(Geometry::plane(2.0, 2.0))
                .with_material(Material::Shader(material))
                .into_node(),
        );
        let (width, height) = self.viewport.window_size();
        self.set_resolution_uniform(id, width, height);
        self.fullscreen_shader = Some(id);
        id
    }

    pub fn fullscreen_shader(&self) -> Option<NodeId> {
        self.fullscreen_shader
    }

    /// Start the continuous loop; the host calls [`tick`](Self::tick) once
    /// per redraw from then on
    pub fn set_loop(&mut self) {
        self.looping = true;
        log::debug!("render loop started");
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// One loop iteration: resize check, update hook, controls, stats,
    /// render (through the composer when set)
    pub fn tick<H: SceneHooks + ?Sized>(&mut self, hooks: &mut H) -> Result<()> {
        self.resize_renderer_to_display_size();

        let frame = self.frames.next_frame();
        hooks.update(FrameContext {
            frame,
            scene: &mut self.scene,
            camera: &mut self.camera,
            canvas: *self.renderer.canvas(),
            mouse_speed: self.mouse_speed.speed(),
        });

        if let Some(controls) = &mut self.controls {
            controls.update(&mut self.camera);
        }

        if let Some(stats) = &mut self.stats {
            stats.update();
            self.renderer.set_overlay(Some(stats.panel()));
        }

        match &mut self.composer {
            Some(composer) => composer.render(&mut self.renderer, &self.scene, &self.camera),
            None => self.renderer.render(&self.scene, &self.camera),
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    /// Dispatch a host event to every listener interested in it
    pub fn handle_event(&mut self, event: &HostEvent) {
        for kind in self.listeners.matching(event) {
            match kind {
                ListenerKind::Resize => self.on_resize(),
                ListenerKind::PointerTracking => self.track_pointer(event),
                ListenerKind::MouseSpeed => match event {
                    HostEvent::PointerMove { page, .. } => {
                        self.mouse_speed.on_move(*page);
                    }
                    HostEvent::PointerLeave => self.mouse_speed.on_leave(),
                    _ => {}
                },
                ListenerKind::OrbitInput => {
                    if let Some(controls) = &mut self.controls {
                        controls.handle_event(event);
                    }
                }
            }
        }
    }

    fn track_pointer(&mut self, event: &HostEvent) {
        let client = match event {
            HostEvent::PointerMove { client, .. }
            | HostEvent::TouchStart { client }
            | HostEvent::TouchMove { client } => *client,
            _ => return,
        };
        self.pointer = normalized_pointer(client, self.viewport.window_size(), self.config.pointer_mapping);
    }

    /// Raycaster plus pointer/touch tracking
    pub fn create_raycaster(&mut self) -> ListenerId {
        self.raycaster = Some(Raycaster::new());
        self.listeners.subscribe(ListenerKind::PointerTracking)
    }

    /// Current pointer in normalized device coordinates
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn set_pointer(&mut self, ndc: Vec2) {
        self.pointer = ndc;
    }

    /// Every hit below `container` (the scene when `None`), nearest first
    pub fn get_intersects(&mut self, container: Option<NodeId>) -> Result<Vec<Intersection>> {
        let raycaster = self.raycaster.as_mut().ok_or(SceneError::NotReady("raycaster"))?;
        raycaster.set_from_camera(self.pointer, &self.camera);
        let container = container.unwrap_or(self.scene.root());
        Ok(raycaster.intersect_objects(&self.scene, self.scene.children(container), true))
    }

    /// The nearest hit, if it has a face and belongs to `target`
    pub fn on_choose_intersect(&mut self, target: NodeId, container: Option<NodeId>) -> Result<Option<Intersection>> {
        let nearest = self.get_intersects(container)?.into_iter().next();
        Ok(nearest.filter(|hit| hit.face.is_some() && hit.object == target))
    }

    /// Start tracking pointer speed
    pub fn track_mouse_speed(&mut self) -> ListenerId {
        self.listeners.subscribe(ListenerKind::MouseSpeed)
    }

    pub fn mouse_speed(&self) -> f32 {
        self.mouse_speed.speed()
    }

    /// Attach the `aCenter` barycentric attribute to a mesh's geometry
    pub fn get_bary_coord(&mut self, mesh: NodeId) -> Result<()> {
        let mesh = self
            .scene
            .node_mut(mesh)
            .and_then(|n| n.mesh_mut())
            .ok_or(SceneError::NotReady("mesh"))?;
        set_bary_coord(&mut mesh.geometry);
        Ok(())
    }

    /// Vertical field of view (degrees) at which one world unit at the
    /// camera distance covers one window pixel
    pub fn get_screen_fov(&self) -> f32 {
        let (_, height) = self.viewport.window_size();
        let distance = self.config.camera_position[2] as f64;
        (2.0 * (height / 2.0 / distance).atan()).to_degrees() as f32
    }

    /// Load a glTF model on a worker thread. The model is returned detached;
    /// insert it with [`Scene::add_model`].
    pub async fn load_model(&self, path: impl Into<PathBuf>) -> Result<Model> {
        load_in_background(path, "glTF", |p| load_gltf(p)).await
    }

    /// Load a binary FBX model on a worker thread
    pub async fn load_fbx_model(&self, path: impl Into<PathBuf>) -> Result<Model> {
        load_in_background(path, "FBX", |p| load_fbx(p)).await
    }
}

#[cfg(feature = "audio")]
impl<R: RenderBackend, V: Viewport> SceneController<R, V> {
    /// Audio listener on the camera plus one sound source
    pub fn create_audio_source(&mut self) {
        self.audio_listener = Some(AudioListener::new());
        self.sound = Some(Sound::new());
    }

    pub fn sound(&self) -> Option<&Sound> {
        self.sound.as_ref()
    }

    pub fn sound_mut(&mut self) -> Option<&mut Sound> {
        self.sound.as_mut()
    }

    /// Decode an audio file on a worker thread and set it on the sound.
    /// The audio source is created first if needed.
    pub async fn load_audio(&mut self, path: impl Into<PathBuf>) -> Result<AudioBuffer> {
        let buffer = load_in_background(path, "audio", load_audio_buffer).await?;
        if self.sound.is_none() {
            log::debug!("creating audio source for loaded buffer");
            self.create_audio_source();
        }
        if let Some(sound) = &mut self.sound {
            sound.set_buffer(buffer.clone());
        }
        Ok(buffer)
    }

    pub fn play_audio(&mut self) -> Result<()> {
        match (&mut self.sound, &mut self.audio_listener) {
            (Some(sound), Some(listener)) => sound.play(listener),
            _ => Err(SceneError::NotReady("audio source")),
        }
    }
}
