use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;
use winit::window::Window;

use super::{Canvas, CreateBackend, OutputEncoding, RenderBackend, RendererSettings};
use crate::camera::Camera;
use crate::core::WinitViewport;
use crate::error::{Result, SceneError};
use crate::geometry::Geometry;
use crate::scene::{NodeId, Scene};
use crate::stats::StatsPanel;

const MAX_LIGHTS: usize = 4;
const MSAA_SAMPLES: u32 = 4;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-frame camera and lighting data
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    light_dirs: [[f32; 4]; MAX_LIGHTS],
    light_colors: [[f32; 4]; MAX_LIGHTS],
    light_count: [u32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
}

/// GPU copy of one mesh node
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    // Source sizes, used to spot replaced geometry
    vertex_len: usize,
    index_len: usize,
}

/// Forward renderer drawing a [`Scene`] into a winit window
pub struct WgpuRenderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    mesh_layout: wgpu::BindGroupLayout,
    meshes: HashMap<NodeId, GpuMesh>,
    canvas: Canvas,
    settings: RendererSettings,
    overlay: Option<StatsPanel>,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl WgpuRenderer {
    /// `use_gl_fallback` restricts the instance to the GL backend
    pub async fn new(window: Arc<Window>, settings: RendererSettings, use_gl_fallback: bool) -> Result<Self> {
        let size = window.inner_size();

        let backends = if use_gl_fallback {
            wgpu::Backends::GL
        } else {
            wgpu::Backends::PRIMARY
        };
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| SceneError::Render(e.to_string()))?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let config = Self::create_surface_config(&surface, &adapter, size, &settings);
        surface.configure(&device, &config);

        let sample_count = if settings.antialias
            && adapter
                .get_texture_format_features(config.format)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

        let depth_view = Self::create_depth_view(&device, &config, sample_count);
        let msaa_view = Self::create_msaa_view(&device, &config, sample_count);

        let globals_layout = Self::uniform_layout(&device, "globals_layout", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let mesh_layout = Self::uniform_layout(&device, "mesh_layout", wgpu::ShaderStages::VERTEX_FRAGMENT);

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[GlobalsUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });

        let pipeline = Self::create_pipeline(&device, &globals_layout, &mesh_layout, config.format, sample_count);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, egui_wgpu::RendererOptions::default());

        let logical = size.to_logical::<f64>(window.scale_factor());
        let canvas = Canvas {
            client_width: logical.width,
            client_height: logical.height,
            width: config.width,
            height: config.height,
        };

        log::info!(
            "wgpu renderer ready: {:?} {}x{} {:?}, {}x msaa",
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format,
            sample_count
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            sample_count,
            depth_view,
            msaa_view,
            pipeline,
            globals_buffer,
            globals_bind_group,
            mesh_layout,
            meshes: HashMap::new(),
            canvas,
            settings,
            overlay: None,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    async fn request_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SceneError::Render(format!("no suitable adapter: {e}")))
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| SceneError::Render(e.to_string()))
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        size: winit::dpi::PhysicalSize<u32>,
        settings: &RendererSettings,
    ) -> wgpu::SurfaceConfiguration {
        let caps = surface.get_capabilities(adapter);
        let want_srgb = settings.output_encoding == OutputEncoding::Srgb;
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb() == want_srgb)
            .unwrap_or(caps.formats[0]);

        let alpha_mode = if settings.alpha && caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes[0]
        };

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn uniform_layout(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(label),
        })
    }

    fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, sample_count: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_msaa_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Option<wgpu::TextureView> {
        if sample_count == 1 {
            return None;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn create_pipeline(
        device: &wgpu::Device,
        globals_layout: &wgpu::BindGroupLayout,
        mesh_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[globals_layout, mesh_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    /// Let the overlay see window input. Returns whether egui consumed it.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.egui_state.on_window_event(&self.window, event).consumed
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn upload_mesh(&self, geometry: &Geometry) -> GpuMesh {
        let normals_ok = geometry.normals.len() == geometry.positions.len();
        let lit;
        let source = if normals_ok {
            geometry
        } else {
            let mut copy = geometry.clone();
            copy.compute_vertex_normals();
            lit = copy;
            &lit
        };

        let vertices: Vec<Vertex> = source
            .positions
            .chunks_exact(3)
            .zip(source.normals.chunks_exact(3))
            .map(|(p, n)| Vertex {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect();

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = geometry.indices.as_ref().filter(|i| !i.is_empty()).map(|indices| {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Uniform"),
            contents: bytemuck::cast_slice(&[MeshUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.mesh_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("mesh_bind_group"),
        });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            uniform_buffer,
            bind_group,
            vertex_len: geometry.positions.len(),
            index_len: geometry.indices.as_ref().map_or(0, Vec::len),
        }
    }

    /// Upload new meshes, refresh transforms, drop meshes that left the scene
    fn sync_meshes(&mut self, scene: &Scene) {
        let mut live = HashSet::new();

        for (id, mesh) in scene.meshes() {
            let geometry = &mesh.geometry;
            if geometry.vertex_count() == 0 || !scene.is_visible(id) {
                continue;
            }
            live.insert(id);

            let index_len = geometry.indices.as_ref().map_or(0, Vec::len);
            let stale = self
                .meshes
                .get(&id)
                .map_or(true, |gpu| gpu.vertex_len != geometry.positions.len() || gpu.index_len != index_len);
            if stale {
                let gpu = self.upload_mesh(geometry);
                self.meshes.insert(id, gpu);
            }

            let world = scene.world_matrix(id);
            let color = mesh.material.base_color();
            let uniform = MeshUniform {
                model: world.to_cols_array_2d(),
                normal_matrix: normal_matrix(world).to_cols_array_2d(),
                color: [color.r, color.g, color.b, 1.0],
            };
            if let Some(gpu) = self.meshes.get(&id) {
                self.queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
            }
        }

        self.meshes.retain(|id, _| live.contains(id));
    }

    fn write_globals(&self, scene: &Scene, camera: &Camera) {
        let mut globals = GlobalsUniform::zeroed();
        globals.view_proj = camera.view_projection().to_cols_array_2d();
        globals.ambient = scene.ambient_light().extend(1.0).to_array();

        let lights = scene.directional_lights();
        if lights.len() > MAX_LIGHTS {
            log::warn!("{} directional lights, only {} are shaded", lights.len(), MAX_LIGHTS);
        }
        for (i, (direction, radiance)) in lights.iter().take(MAX_LIGHTS).enumerate() {
            globals.light_dirs[i] = direction.extend(0.0).to_array();
            globals.light_colors[i] = radiance.extend(1.0).to_array();
        }
        globals.light_count[0] = lights.len().min(MAX_LIGHTS) as u32;

        self.queue.write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));
    }

    fn draw_overlay(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, panel: StatsPanel) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Stats")
                .title_bar(false)
                .resizable(false)
                .fixed_pos(egui::pos2(10.0, 10.0))
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    ui.label(
                        egui::RichText::new(format!("{:.0} FPS", panel.fps))
                            .size(20.0)
                            .color(egui::Color32::from_rgb(0, 255, 255)),
                    );
                    ui.label(
                        egui::RichText::new(format!("{:.1} ms", panel.frame_ms))
                            .size(12.0)
                            .color(egui::Color32::GRAY),
                    );
                });
        });

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.egui_renderer
            .update_buffers(&self.device, &self.queue, encoder, &tris, &screen_descriptor);

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

/// Inverse transpose of the upper 3x3, kept as a 4x4 for uniform layout
fn normal_matrix(model: Mat4) -> Mat4 {
    let det = model.determinant();
    if det.abs() < f32::EPSILON {
        return model;
    }
    model.inverse().transpose()
}

impl RenderBackend for WgpuRenderer {
    fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    fn set_size(&mut self, width: f64, height: f64, update_style: bool) {
        self.canvas.set_size(width, height, update_style);
        let (w, h) = (self.canvas.width.max(1), self.canvas.height.max(1));
        if w == self.config.width && h == self.config.height {
            return;
        }
        self.config.width = w;
        self.config.height = h;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, &self.config, self.sample_count);
        self.msaa_view = Self::create_msaa_view(&self.device, &self.config, self.sample_count);
        log::debug!("surface resized to {}x{}", w, h);
    }

    fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        self.sync_meshes(scene);
        self.write_globals(scene, camera);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(SceneError::Render(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        let clear = match scene.background {
            Some(color) => color.to_wgpu(1.0),
            None => self.settings.clear_color.to_wgpu(self.settings.clear_alpha),
        };

        {
            let (target, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for gpu in self.meshes.values() {
                render_pass.set_bind_group(1, &gpu.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                match &gpu.index_buffer {
                    Some((buffer, count)) => {
                        render_pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => render_pass.draw(0..gpu.vertex_count, 0..1),
                }
            }
        }

        if let Some(panel) = self.overlay {
            self.draw_overlay(&mut encoder, &view, panel);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn set_overlay(&mut self, panel: Option<StatsPanel>) {
        self.overlay = panel;
    }
}

impl CreateBackend<WinitViewport> for WgpuRenderer {
    fn create(viewport: &WinitViewport, settings: RendererSettings, use_gl_fallback: bool) -> Result<Self> {
        pollster::block_on(Self::new(viewport.window().clone(), settings, use_gl_fallback))
    }
}
