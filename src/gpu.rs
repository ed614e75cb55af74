use std::mem;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::animation::Frame;
use crate::driver::{RenderAdapter, SceneData};
use crate::error::InitError;
use crate::types::*;

/// Upper bound on the device pixel ratio used for point sizes
const MAX_PIXEL_RATIO: f32 = 2.0;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Pick the surface format and the format of the view drawn into.
///
/// Scene colors are sRGB-encoded already, so the view must not encode them a
/// second time. A non-sRGB surface is used directly; an sRGB-only surface is
/// drawn through its non-sRGB view.
pub fn choose_formats(
    formats: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, wgpu::TextureFormat)> {
    if let Some(&format) = formats.iter().find(|f| !f.is_srgb()) {
        return Some((format, format));
    }
    formats
        .first()
        .map(|&format| (format, format.remove_srgb_suffix()))
}

/// Holds all GPU resources and pipelines
pub struct GpuState {
    // Core
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,

    // Static geometry
    galaxy_buffers: [wgpu::Buffer; 3], // positions, colors, sizes
    galaxy_count: u32,
    star_buffer: wgpu::Buffer,
    star_count: u32,
    sphere_vertices: wgpu::Buffer,
    sphere_indices: wgpu::Buffer,
    sphere_index_count: u32,

    // Per-frame data
    camera_buffer: wgpu::Buffer,
    galaxy_field_buffer: wgpu::Buffer,
    star_field_buffer: wgpu::Buffer,
    body_instance_buffer: wgpu::Buffer,
    body_instances: Vec<BodyInstance>,

    // Pipelines
    galaxy_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    body_pipeline: wgpu::RenderPipeline,
    scene_bind_group: wgpu::BindGroup,
    galaxy_bind_group: wgpu::BindGroup,
    star_bind_group: wgpu::BindGroup,

    // Depth buffer
    depth_texture: wgpu::TextureView,
    /// Format of the color view the pipelines draw into
    target_format: wgpu::TextureFormat,

    // Shading constants
    clear_color: wgpu::Color,
    point_scale: f32,
    star_size: f32,
    star_tint: ([f32; 3], f32),
}

impl GpuState {
    pub async fn new(window: Arc<Window>, scene: &SceneData) -> Result<Self, InitError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;

        log::info!("GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Galaxy Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let (surface_format, target_format) =
            choose_formats(&surface_caps.formats).ok_or(InitError::NoSurfaceFormat)?;
        log::info!("Surface format: {:?}, drawing as {:?}", surface_format, target_format);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync paces the frame loop
            alpha_mode,
            view_formats: if target_format == surface_format {
                vec![]
            } else {
                vec![target_format]
            },
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Shader and pipeline errors surface through this scope
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let points_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Points Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/points.wgsl").into()),
        });

        let bodies_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bodies Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/bodies.wgsl").into()),
        });

        // ====================================================================
        // Static buffers, uploaded once
        // ====================================================================

        let galaxy = &scene.galaxy;
        if galaxy.is_empty() {
            log::warn!("Galaxy has no particles");
        }
        let galaxy_buffers = [
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Galaxy Positions"),
                contents: bytemuck::cast_slice(&galaxy.positions),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Galaxy Colors"),
                contents: bytemuck::cast_slice(&galaxy.colors),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Galaxy Sizes"),
                contents: bytemuck::cast_slice(&galaxy.sizes),
                usage: wgpu::BufferUsages::VERTEX,
            }),
        ];

        let star_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Positions"),
            contents: bytemuck::cast_slice(&scene.stars.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let sphere_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Vertices"),
            contents: bytemuck::cast_slice(&scene.sphere.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Indices"),
            contents: bytemuck::cast_slice(&scene.sphere.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        // ====================================================================
        // Uniforms
        // ====================================================================

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera"),
            size: mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lighting = LightingUniform::from(&scene.config.lighting);
        let lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting"),
            contents: bytemuck::bytes_of(&lighting),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let pixel_ratio = (window.scale_factor() as f32).min(MAX_PIXEL_RATIO);
        let point_scale = scene.config.point_scale * pixel_ratio;
        let galaxy_field = FieldUniform::new(0.0, point_scale, [1.0; 3], 1.0);
        let galaxy_field_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Galaxy Field"),
            contents: bytemuck::bytes_of(&galaxy_field),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let stars = &scene.config.stars;
        let star_tint = (stars.color, stars.opacity);
        let star_field = FieldUniform::new(
            0.0,
            Self::star_point_scale(stars.point_size, config.height),
            stars.color,
            stars.opacity,
        );
        let star_field_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Field"),
            contents: bytemuck::bytes_of(&star_field),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let body_instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Body Instances"),
            size: (MAX_BODIES * mem::size_of::<BodyInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // ====================================================================
        // Bind groups
        // ====================================================================

        let uniform_entry = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let all_stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[uniform_entry(0, all_stages), uniform_entry(1, all_stages)],
        });
        let field_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Field BGL"),
            entries: &[uniform_entry(0, all_stages)],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene BG"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
            ],
        });
        let galaxy_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Galaxy BG"),
            layout: &field_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: galaxy_field_buffer.as_entire_binding(),
            }],
        });
        let star_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Star BG"),
            layout: &field_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: star_field_buffer.as_entire_binding(),
            }],
        });

        let points_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points PL"),
            bind_group_layouts: &[&scene_layout, &field_layout],
            push_constant_ranges: &[],
        });
        let bodies_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bodies PL"),
            bind_group_layouts: &[&scene_layout],
            push_constant_ranges: &[],
        });

        // ====================================================================
        // Render pipelines
        // ====================================================================

        let blend_additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let depth_read_only = wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false, // no depth write for transparent
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };

        let instance_attr = |format: wgpu::VertexFormat, location: u32| wgpu::VertexAttribute {
            format,
            offset: 0,
            shader_location: location,
        };
        let position_attr = [instance_attr(wgpu::VertexFormat::Float32x3, 0)];
        let color_attr = [instance_attr(wgpu::VertexFormat::Float32x3, 1)];
        let size_attr = [instance_attr(wgpu::VertexFormat::Float32, 2)];

        // One buffer per parallel array
        let galaxy_buffer_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &position_attr,
            },
            wgpu::VertexBufferLayout {
                array_stride: mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &color_attr,
            },
            wgpu::VertexBufferLayout {
                array_stride: mem::size_of::<f32>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &size_attr,
            },
        ];

        let galaxy_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Galaxy Render"),
            layout: Some(&points_layout),
            vertex: wgpu::VertexState {
                module: &points_shader,
                entry_point: "vs_galaxy",
                compilation_options: Default::default(),
                buffers: &galaxy_buffer_layouts,
            },
            fragment: Some(wgpu::FragmentState {
                module: &points_shader,
                entry_point: "fs_galaxy",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(blend_additive),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(depth_read_only.clone()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let star_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Star Render"),
            layout: Some(&points_layout),
            vertex: wgpu::VertexState {
                module: &points_shader,
                entry_point: "vs_star",
                compilation_options: Default::default(),
                buffers: &[galaxy_buffer_layouts[0].clone()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &points_shader,
                entry_point: "fs_star",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(depth_read_only),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        // Sphere mesh vertex + body instance layouts
        let mesh_attr = [instance_attr(wgpu::VertexFormat::Float32x3, 0)];
        let body_instance_layout = wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<BodyInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 0, shader_location: 1 },
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 16, shader_location: 2 },
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 32, shader_location: 3 },
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 48, shader_location: 4 },
            ],
        };

        let body_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Body Render"),
            layout: Some(&bodies_layout),
            vertex: wgpu::VertexState {
                module: &bodies_shader,
                entry_point: "vs_body",
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &mesh_attr,
                    },
                    body_instance_layout,
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &bodies_shader,
                entry_point: "fs_body",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(blend_additive),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(InitError::Validation(err.to_string()));
        }

        let depth_texture = Self::create_depth_texture(&device, &config);

        let [r, g, b] = scene.config.clear_color;
        let body_count = scene.config.bodies.len().min(MAX_BODIES);
        if body_count < scene.config.bodies.len() {
            log::warn!(
                "Only the first {} of {} bodies will be drawn",
                MAX_BODIES,
                scene.config.bodies.len()
            );
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            window,
            galaxy_buffers,
            galaxy_count: galaxy.len() as u32,
            star_buffer,
            star_count: scene.stars.positions.len() as u32,
            sphere_vertices,
            sphere_indices,
            sphere_index_count: scene.sphere.indices.len() as u32,
            camera_buffer,
            galaxy_field_buffer,
            star_field_buffer,
            body_instance_buffer,
            body_instances: Vec::with_capacity(body_count),
            galaxy_pipeline,
            star_pipeline,
            body_pipeline,
            scene_bind_group,
            galaxy_bind_group,
            star_bind_group,
            depth_texture,
            target_format,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            point_scale,
            star_size: stars.point_size,
            star_tint,
        })
    }

    /// Stars attenuate like fixed-size points: half the viewport height per unit depth.
    fn star_point_scale(point_size: f32, height: u32) -> f32 {
        point_size * height as f32 * 0.5
    }

    /// Star attenuation depends on viewport height, so it is refreshed on resize.
    fn write_star_field(&self) {
        let (tint, opacity) = self.star_tint;
        let field = FieldUniform::new(
            0.0,
            Self::star_point_scale(self.star_size, self.config.height),
            tint,
            opacity,
        );
        self.queue
            .write_buffer(&self.star_field_buffer, 0, bytemuck::bytes_of(&field));
    }

    fn pixel_ratio(&self) -> f32 {
        (self.window.scale_factor() as f32).min(MAX_PIXEL_RATIO)
    }

    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"),
            size: wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
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

    fn write_uniforms(&mut self, frame: &Frame<'_>) {
        let camera = CameraUniform::from_frame(
            frame,
            self.config.width,
            self.config.height,
            self.pixel_ratio(),
        );
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));

        let field = FieldUniform::new(frame.galaxy_rotation, self.point_scale, [1.0; 3], 1.0);
        self.queue
            .write_buffer(&self.galaxy_field_buffer, 0, bytemuck::bytes_of(&field));

        self.body_instances.clear();
        self.body_instances.extend(
            frame
                .bodies
                .iter()
                .zip(frame.poses)
                .take(MAX_BODIES)
                .map(|(body, pose)| BodyInstance::new(body, pose)),
        );
        if !self.body_instances.is_empty() {
            self.queue.write_buffer(
                &self.body_instance_buffer,
                0,
                bytemuck::cast_slice(&self.body_instances),
            );
        }
    }
}

impl RenderAdapter for GpuState {
    fn render(&mut self, frame: &Frame<'_>) {
        self.write_uniforms(frame);

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.target_format),
            ..Default::default()
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame") });

        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.scene_bind_group, &[]);

            // 1. Background stars
            if self.star_count > 0 {
                rp.set_pipeline(&self.star_pipeline);
                rp.set_bind_group(1, &self.star_bind_group, &[]);
                rp.set_vertex_buffer(0, self.star_buffer.slice(..));
                rp.draw(0..6, 0..self.star_count);
            }

            // 2. Galaxy point cloud
            if self.galaxy_count > 0 {
                rp.set_pipeline(&self.galaxy_pipeline);
                rp.set_bind_group(1, &self.galaxy_bind_group, &[]);
                for (slot, buffer) in self.galaxy_buffers.iter().enumerate() {
                    rp.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                rp.draw(0..6, 0..self.galaxy_count);
            }

            // 3. Orbiting bodies
            if !self.body_instances.is_empty() {
                rp.set_pipeline(&self.body_pipeline);
                rp.set_vertex_buffer(0, self.sphere_vertices.slice(..));
                rp.set_vertex_buffer(1, self.body_instance_buffer.slice(..));
                rp.set_index_buffer(self.sphere_indices.slice(..), wgpu::IndexFormat::Uint32);
                rp.draw_indexed(
                    0..self.sphere_index_count,
                    0,
                    0..self.body_instances.len() as u32,
                );
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
            self.write_star_field();
        }
    }
}
