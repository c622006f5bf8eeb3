use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu;

use crate::renderer::{FrameBuffer, GpuContext};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

const VERTEX_BUFFER_SIZE: u64 = 1024 * 1024; // room for thousands of primitives

/// GPU-accelerated batch renderer for the solid shapes of a frame: quads and
/// triangle-fan circles accumulate into one vertex buffer, then `flush`
/// renders offscreen and reads the result back into the frame buffer. Strokes
/// and text stay on the CPU compositor, which blends on top afterwards.
pub struct GpuRenderer {
    context: GpuContext,
    render_pipeline: wgpu::RenderPipeline,
    width: u32,
    height: u32,
    vertex_buffer: wgpu::Buffer,
    vertices: Vec<Vertex>,
}

impl GpuRenderer {
    /// Create a new GPU renderer
    pub async fn new(width: u32, height: u32) -> Result<Self> {
        let context = GpuContext::new().await?;

        // Load shader
        let shader = context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
            });

        let pipeline_layout =
            context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Render Pipeline Layout"),
                    bind_group_layouts: &[],
                    push_constant_ranges: &[],
                });

        let render_pipeline =
            context
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Render Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::desc()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: wgpu::TextureFormat::Rgba8Unorm,
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

        let vertex_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: VERTEX_BUFFER_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            context,
            render_pipeline,
            width,
            height,
            vertex_buffer,
            vertices: Vec::new(),
        })
    }

    fn to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        [
            (x / self.width as f32) * 2.0 - 1.0,
            -((y / self.height as f32) * 2.0 - 1.0), // Flip Y
        ]
    }

    fn to_linear(color: [u8; 4]) -> [f32; 4] {
        [
            color[0] as f32 / 255.0,
            color[1] as f32 / 255.0,
            color[2] as f32 / 255.0,
            color[3] as f32 / 255.0,
        ]
    }

    /// Queue a filled axis-aligned rectangle centered at (cx, cy)
    pub fn fill_rect(&mut self, cx: f32, cy: f32, width: f32, height: f32, color: [u8; 4]) {
        let color = Self::to_linear(color);
        let x0 = cx - width / 2.0;
        let x1 = cx + width / 2.0;
        let y0 = cy - height / 2.0;
        let y1 = cy + height / 2.0;

        let corners = [
            self.to_ndc(x0, y0),
            self.to_ndc(x1, y0),
            self.to_ndc(x1, y1),
            self.to_ndc(x0, y1),
        ];
        for idx in [0, 1, 2, 0, 2, 3] {
            self.vertices.push(Vertex {
                position: corners[idx],
                color,
            });
        }
    }

    /// Queue a filled circle as a triangle fan centered at (cx, cy)
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 4]) {
        let color = Self::to_linear(color);
        // Segment count scales with radius; enough to hide facets at 1080p
        let segments = ((radius * 0.8) as u32).clamp(12, 64);
        let center = self.to_ndc(cx, cy);
        for i in 0..segments {
            let a0 = i as f32 / segments as f32 * std::f32::consts::TAU;
            let a1 = (i + 1) as f32 / segments as f32 * std::f32::consts::TAU;
            let p0 = self.to_ndc(cx + radius * a0.cos(), cy + radius * a0.sin());
            let p1 = self.to_ndc(cx + radius * a1.cos(), cy + radius * a1.sin());
            self.vertices.push(Vertex {
                position: center,
                color,
            });
            self.vertices.push(Vertex {
                position: p0,
                color,
            });
            self.vertices.push(Vertex {
                position: p1,
                color,
            });
        }
    }

    /// Whether anything has been queued since the last flush
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Render the accumulated batch offscreen, clearing to `clear_color`
    /// first, and read the pixels back into the frame buffer.
    pub fn flush(&mut self, frame_buffer: &mut FrameBuffer, clear_color: [u8; 4]) -> Result<()> {
        let start_time = std::time::Instant::now();

        let byte_len = (self.vertices.len() * std::mem::size_of::<Vertex>()) as u64;
        if byte_len > VERTEX_BUFFER_SIZE {
            anyhow::bail!(
                "GPU vertex batch overflow: {} bytes exceeds {}",
                byte_len,
                VERTEX_BUFFER_SIZE
            );
        }
        if !self.vertices.is_empty() {
            self.context.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.vertices),
            );
        }

        let (width, height) = frame_buffer.dimensions();
        let clear = Self::to_linear(clear_color);

        let output_texture = self
            .context
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Output Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });

        let view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !self.vertices.is_empty() {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..self.vertices.len() as u32, 0..1);
            }
        }

        // Read back to CPU
        let buffer_size = (width * height * 4) as u64;
        let staging_buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &output_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let index = self.context.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);

        // Use pollster to block on the async map/readback
        pollster::block_on(async {
            let (tx, rx) = std::sync::mpsc::channel();
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
            loop {
                if self
                    .context
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: Some(index.clone()),
                        timeout: None,
                    })
                    .is_err()
                {
                    tracing::warn!("GPU device poll failed during readback");
                    return;
                }
                match rx.try_recv() {
                    Ok(Ok(())) => break,
                    Ok(Err(e)) => {
                        tracing::warn!("GPU buffer map failed: {e}");
                        return;
                    }
                    Err(_) => continue,
                }
            }

            {
                let data = buffer_slice.get_mapped_range();
                frame_buffer.copy_from_slice(&data);
            }

            staging_buffer.unmap();
        });

        self.vertices.clear();

        tracing::trace!(
            elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0,
            "GPU flush"
        );
        Ok(())
    }
}
