//= IMPORTS ==================================================================

use pollster::FutureExt as _;
use raw_window_handle::{HasDisplayHandle as _, HasWindowHandle as _};
use wgpu::{
    Adapter, AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Color,
    ColorTargetState, ColorWrites, CommandEncoderDescriptor, CompositeAlphaMode, Device,
    DeviceDescriptor, Extent3d, Features, FilterMode, FragmentState, ImageCopyTexture,
    ImageDataLayout, Instance, InstanceDescriptor, Limits, LoadOp, MultisampleState, Operations,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PowerPreference, PresentMode,
    PrimitiveState, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, Sampler, SamplerBindingType,
    SamplerDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceTargetUnsafe, SurfaceTexture, Texture, TextureDescriptor,
    TextureDimension, TextureFormat, TextureSampleType, TextureUsages, TextureView,
    TextureViewDescriptor, TextureViewDimension, VertexState,
};
use winit::window::Window;

//= GPU CONTEXT ==============================================================

/// Device and queue bundled so the render core can create and feed display
/// images without seeing the rest of the presentation layer.
pub(crate) struct Gpu {
    pub(crate) device: Device,
    pub(crate) queue: Queue,
}

//= DISPLAY ==================================================================

/// Everything needed to put a [`DisplayImage`] on screen: surface, gpu
/// context and the fullscreen blit pipeline.
pub(crate) struct Display {
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    gpu: Gpu,
    output: Option<SurfaceTexture>,
    screen_blit: ScreenBlit,
}

impl Display {
    pub(crate) fn new(window: &Window) -> Result<Self, String> {
        let instance = Instance::new(InstanceDescriptor {
            backends: supported_backends(),
            ..Default::default()
        });

        let surface = create_surface(window, &instance)?;
        let adapter = request_adapter(instance, &surface)?;

        let size = window.inner_size();
        let surface_config = create_surface_config(&surface, &adapter, size.width, size.height)?;

        let (device, queue) = request_device(adapter)?;
        surface.configure(&device, &surface_config);

        let screen_blit = ScreenBlit::new(&device, surface_config.format);

        Ok(Self {
            surface,
            surface_config,
            gpu: Gpu { device, queue },
            output: None,
            screen_blit,
        })
    }

    pub(crate) fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Reconfigure the surface for a new window size. Zero-sized requests
    /// are skipped; the surface keeps its last valid configuration.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if self.surface_config.width == width && self.surface_config.height == height {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.gpu.device, &self.surface_config);
    }

    /// Point the blit pipeline at a (re)created display image. Must be
    /// called after every resize of the image.
    pub(crate) fn rebind(&mut self, image: &DisplayImage) {
        self.screen_blit.rebind(&self.gpu.device, image);
    }

    /// Draw the bound image over the whole surface. Presentation happens
    /// separately in [`Display::present`].
    pub(crate) fn draw(&mut self) -> Result<(), String> {
        let output = self
            .surface
            .get_current_texture()
            .map_err(|e| e.to_string())?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());
        self.screen_blit.encode_pass(&mut encoder, &view);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.output = Some(output);

        Ok(())
    }

    pub(crate) fn present(&mut self) {
        if let Some(output) = self.output.take() {
            output.present();
        }
    }
}

//= DISPLAY SETUP ============================================================

/// The backends are in order of support, the greater the first.
fn supported_backends() -> wgpu::Backends {
    #[cfg(target_os = "windows")]
    return wgpu::Backends::DX12 | wgpu::Backends::VULKAN;

    #[cfg(target_os = "linux")]
    return wgpu::Backends::VULKAN;

    #[cfg(target_os = "macos")]
    return wgpu::Backends::METAL | wgpu::Backends::VULKAN;
}

fn create_surface(window: &Window, instance: &Instance) -> Result<Surface<'static>, String> {
    let raw_display_handle = window
        .display_handle()
        .map_err(|e| format!("Raw display handle error on surface creation: {e}"))?
        .as_raw();
    let raw_window_handle = window
        .window_handle()
        .map_err(|e| format!("Raw window handle error on surface creation: {e}"))?
        .as_raw();

    let surface_target = SurfaceTargetUnsafe::RawHandle {
        raw_display_handle,
        raw_window_handle,
    };
    unsafe { instance.create_surface_unsafe(surface_target) }.map_err(|e| e.to_string())
}

fn request_adapter(instance: Instance, surface: &Surface<'static>) -> Result<Adapter, String> {
    for (i, adapter) in instance
        .enumerate_adapters(supported_backends())
        .iter()
        .enumerate()
    {
        log::debug!("Possible Adapter #{}: {:?}", i, adapter.get_info());
    }

    let adapter = async {
        instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
    }
    .block_on();

    let Some(adapter) = adapter else {
        return Err("No adapters were found with requested options.".to_string());
    };

    log::info!("Picked Adapter: {:?}", adapter.get_info());
    Ok(adapter)
}

fn request_device(adapter: Adapter) -> Result<(Device, Queue), String> {
    let dq = async {
        adapter
            .request_device(
                &DeviceDescriptor {
                    required_features: Features::default(),
                    required_limits: Limits::default(),
                    label: None,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
    }
    .block_on();

    dq.map_err(|e| e.to_string())
}

fn create_surface_config(
    surface: &Surface<'static>,
    adapter: &Adapter,
    width: u32,
    height: u32,
) -> Result<SurfaceConfiguration, String> {
    if width == 0 || height == 0 {
        return Err("Impossible to create a surface configuration with zero size".to_string());
    }

    let texture_formats = surface.get_capabilities(adapter).formats;
    let Some(texture_format) = texture_formats.first() else {
        return Err("A valid surface texture format isn't supported by this adapter.".to_string());
    };

    Ok(SurfaceConfiguration {
        usage: TextureUsages::RENDER_ATTACHMENT,
        format: *texture_format,
        width,
        height,
        desired_maximum_frame_latency: 2,
        present_mode: PresentMode::Fifo,
        alpha_mode: CompositeAlphaMode::Auto,
        view_formats: vec![],
    })
}

//= DISPLAY IMAGE ============================================================

/// The displayable image the render core uploads frames into. Resizing
/// swaps the backing texture while the handle held by callers stays valid.
pub(crate) struct DisplayImage {
    texture: Texture,
    view: TextureView,
    sampler: Sampler,
}

impl DisplayImage {
    pub(crate) fn new(gpu: &Gpu, width: u32, height: u32) -> Self {
        let texture = create_texture(&gpu.device, width, height);
        let view = texture.create_view(&TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&SamplerDescriptor {
            label: Some("display_image_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Free and recreate the backing texture at the new size.
    pub(crate) fn resize(&mut self, gpu: &Gpu, width: u32, height: u32) {
        self.texture.destroy();
        self.texture = create_texture(&gpu.device, width, height);
        self.view = self.texture.create_view(&TextureViewDescriptor::default());
    }

    /// Upload one full frame of tightly packed RGBA bytes.
    pub(crate) fn set_data(&self, queue: &Queue, data: &[u8]) {
        queue.write_texture(
            ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width()),
                rows_per_image: Some(self.height()),
            },
            self.texture.size(),
        );
    }

    pub(crate) fn width(&self) -> u32 {
        self.texture.size().width
    }

    pub(crate) fn height(&self) -> u32 {
        self.texture.size().height
    }
}

fn create_texture(device: &Device, width: u32, height: u32) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: Some("display_image"),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8Unorm,
        view_formats: &[],
        usage: TextureUsages::COPY_DST.union(TextureUsages::TEXTURE_BINDING),
    })
}

//= SCREEN BLIT ==============================================================

static SCREEN_BLIT_SRC: &str = include_str!("../shaders/screen_blit.wgsl");

/// Fullscreen pass sampling the display image into the swapchain.
struct ScreenBlit {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: Option<BindGroup>,
}

impl ScreenBlit {
    fn new(device: &Device, surface_format: TextureFormat) -> Self {
        let shader_module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("screen_blit_module"),
            source: ShaderSource::Wgsl(SCREEN_BLIT_SRC.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("screen_blit_bind_group_layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::default(),
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("screen_blit_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("screen_blit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            bind_group: None,
        }
    }

    fn rebind(&mut self, device: &Device, image: &DisplayImage) {
        self.bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("screen_blit_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&image.view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&image.sampler),
                },
            ],
        }));
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &TextureView) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("screen_blit_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(Color::BLACK),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // Nothing to sample before the first resize binds an image.
        let Some(bind_group) = &self.bind_group else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}
