// Renderer module for the car viewer

use std::sync::Arc;

use log::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, Instance, RenderPipeline};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopProxy, EventLoopWindowTarget},
    keyboard::PhysicalKey,
    window::{Window, WindowBuilder},
};

use crate::commands::{self, ViewerCommand};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::input;
use crate::loader::{self, LoadedModel, MeshData, Vertex};
use crate::presenter::{Flow, ScenePresenter};
use crate::scene::SurfaceId;
use crate::tasks::TaskSet;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Pixels of trackpad scroll treated as one wheel line.
const PIXELS_PER_LINE: f64 = 50.0;

/// Messages delivered to the event loop from background tasks.
pub enum ViewerEvent {
    ModelLoaded(Result<LoadedModel>),
    Command(ViewerCommand),
}

// Per-frame uniforms shared by every draw
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
}

impl Globals {
    fn from_presenter(presenter: &ScenePresenter) -> Self {
        let light = presenter.light();
        Self {
            view_proj: presenter.camera().view_projection_matrix().to_cols_array_2d(),
            light_dir: light.direction_to_light().extend(0.0).to_array(),
            light_color: light.color.scaled(light.intensity).to_array(),
            ambient: presenter.ambient().to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
}

/// GPU side of one surface.
struct GpuMesh {
    surface: SurfaceId,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    material_buffer: Buffer,
    material_bind_group: wgpu::BindGroup,
    translucent: bool,
}

pub struct Renderer {
    _instance: Instance,
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
    opaque_pipeline: RenderPipeline,
    translucent_pipeline: RenderPipeline,
    depth_view: wgpu::TextureView,
    globals_buffer: Buffer,
    globals_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    meshes: Vec<GpuMesh>,
    presenter: ScenePresenter,
    tasks: TaskSet,
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<ViewerEvent>, config: &ViewerConfig) -> Result<Self> {
        // Create window with Arc for shared ownership
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(format!("Car Viewer - {}", config.model.display()))
                .with_inner_size(LogicalSize::new(config.width, config.height))
                .build(event_loop)
                .map_err(|e| ViewerError::Window(e.to_string()))?,
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;
        info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, surface_config.width, surface_config.height);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Viewer Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let vertex_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        };

        let globals_layout = uniform_layout(&device, "Globals Layout", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let material_layout = uniform_layout(&device, "Material Layout", wgpu::ShaderStages::FRAGMENT);

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let [opaque_pipeline, translucent_pipeline] = [true, false].map(|depth_write| {
            create_pipeline(
                &device,
                &render_pipeline_layout,
                &shader_module,
                &vertex_buffer_layout,
                surface_format,
                depth_write,
            )
        });

        let mut presenter = ScenePresenter::new(config);
        presenter.resize(surface_config.width, surface_config.height);

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[Globals::from_presenter(&presenter)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            window,
            opaque_pipeline,
            translucent_pipeline,
            depth_view,
            globals_buffer,
            globals_bind_group,
            material_layout,
            meshes: Vec::new(),
            presenter,
            tasks: TaskSet::new(),
        })
    }

    /// Kick off the model load and, if enabled, the stdin command reader.
    pub fn start(&mut self, proxy: EventLoopProxy<ViewerEvent>, config: &ViewerConfig) {
        let load_proxy = proxy.clone();
        self.tasks.push(loader::spawn_load(config.model.clone(), move |result| {
            if load_proxy.send_event(ViewerEvent::ModelLoaded(result)).is_err() {
                debug!("viewer closed before the model finished loading");
            }
        }));

        if config.commands {
            info!("reading commands from stdin");
            self.tasks.push(commands::spawn_stdin_reader(move |command| {
                proxy.send_event(ViewerEvent::Command(command)).is_ok()
            }));
        }
    }

    pub fn run(mut self, event_loop: EventLoop<ViewerEvent>) -> Result<()> {
        event_loop.set_control_flow(ControlFlow::Wait);

        event_loop
            .run(move |event, target| match event {
                Event::UserEvent(ViewerEvent::ModelLoaded(result)) => {
                    if let Some(meshes) = self.presenter.on_model_loaded(result) {
                        self.upload(meshes);
                    }
                }
                Event::UserEvent(ViewerEvent::Command(command)) => {
                    if self.presenter.apply_command(command) == Flow::Exit {
                        target.exit();
                    }
                }
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    self.handle_window_event(event, target);
                }
                Event::AboutToWait => {
                    if self.presenter.needs_redraw() {
                        self.window.request_redraw();
                    }
                }
                Event::LoopExiting => {
                    self.tasks.abort_all();
                    info!("viewer closed");
                }
                _ => {}
            })
            .map_err(|e| ViewerError::EventLoop(e.to_string()))
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<ViewerEvent>) {
        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::Resized(physical_size) => self.resize(physical_size),
            WindowEvent::RedrawRequested => {
                self.presenter.update();
                self.sync_materials();
                if self.render() == Flow::Exit {
                    target.exit();
                }
                self.presenter.mark_drawn();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if self.handle_keyboard_input(event) == Flow::Exit {
                    target.exit();
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.presenter.set_dragging(state == ElementState::Pressed),
            WindowEvent::CursorMoved { position, .. } => {
                self.presenter.cursor_moved(position.x, position.y)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.presenter.scroll(lines);
            }
            _ => {}
        }
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) -> Flow {
        if event.state != ElementState::Pressed {
            return Flow::Continue;
        }
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return Flow::Continue;
        };
        match input::action_for_key(keycode) {
            Some(action) if !event.repeat || input::repeats(action) => self.presenter.apply_key(action),
            _ => Flow::Continue,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
        self.presenter.resize(new_size.width, new_size.height);
    }

    fn reconfigure(&mut self) {
        let caps = self.surface.get_capabilities(&self.adapter);
        if !caps.formats.contains(&self.surface_config.format) {
            warn!("surface format {:?} no longer supported", self.surface_config.format);
        }
        self.resize(self.window.inner_size());
    }

    /// Create GPU buffers for freshly loaded geometry.
    fn upload(&mut self, meshes: Vec<MeshData>) {
        for mesh in meshes {
            if mesh.vertices.is_empty() || mesh.indices.is_empty() {
                continue;
            }
            let color = self
                .presenter
                .surface_color(mesh.surface)
                .map(|c| c.to_array())
                .unwrap_or([1.0; 4]);

            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let material_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[MaterialUniform { base_color: color }]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let material_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &self.material_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                }],
            });

            self.meshes.push(GpuMesh {
                surface: mesh.surface,
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                material_buffer,
                material_bind_group,
                translucent: is_translucent(color),
            });
        }
        debug!("uploaded {} meshes", self.meshes.len());
    }

    /// Push repainted surface colors to their uniform buffers.
    fn sync_materials(&mut self) {
        for surface in self.presenter.take_dirty_surfaces() {
            let Some(color) = self.presenter.surface_color(surface) else {
                continue;
            };
            let uniform = MaterialUniform {
                base_color: color.to_array(),
            };
            for mesh in self.meshes.iter_mut().filter(|m| m.surface == surface) {
                self.queue
                    .write_buffer(&mesh.material_buffer, 0, bytemuck::cast_slice(&[uniform]));
                mesh.translucent = is_translucent(uniform.base_color);
            }
        }
    }

    fn render(&mut self) -> Flow {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Flow::Continue;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("out of GPU memory, closing viewer");
                return Flow::Exit;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out waiting for the next frame");
                return Flow::Continue;
            }
        };

        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::cast_slice(&[Globals::from_presenter(&self.presenter)]),
        );

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.presenter.background().to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
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

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            let translucent: Vec<bool> = self.meshes.iter().map(|m| m.translucent).collect();
            let mut bound = None;
            for index in draw_order(&translucent) {
                let mesh = &self.meshes[index];
                if bound != Some(mesh.translucent) {
                    let pipeline = if mesh.translucent {
                        &self.translucent_pipeline
                    } else {
                        &self.opaque_pipeline
                    };
                    render_pass.set_pipeline(pipeline);
                    bound = Some(mesh.translucent);
                }
                render_pass.set_bind_group(1, &mesh.material_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Flow::Continue
    }
}

/// Scene pipeline. Translucent surfaces are drawn with `depth_write` off so they
/// never hide geometry behind them.
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    vertex_buffer_layout: &wgpu::VertexBufferLayout<'_>,
    format: wgpu::TextureFormat,
    depth_write: bool,
) -> RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if depth_write { "Opaque Pipeline" } else { "Translucent Pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: std::slice::from_ref(vertex_buffer_layout),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // glTF car bodies are often single-sided shells
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn is_translucent(color: [f32; 4]) -> bool {
    color[3] < 1.0
}

/// Draw order for a list of meshes: opaque ones first, translucent ones after,
/// each group keeping its upload order.
fn draw_order(translucent: &[bool]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..translucent.len()).collect();
    order.sort_by_key(|&i| translucent[i]);
    order
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
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
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
