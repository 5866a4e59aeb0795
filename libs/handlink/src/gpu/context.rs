// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Software GL context.
//!
//! Work touching textures runs inside [`GlHelper::run_in_gl_context`], which
//! holds the context lock and marks the context current on the calling
//! thread for the duration of the closure. Every texture created inside a
//! scope must be released before the closure returns.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

use super::GpuBuffer;
use crate::core::{HandlinkError, Result};
use crate::pipeline::ImageFrame;

#[derive(Debug, Default)]
struct ContextStats {
    scopes: u64,
    textures: u64,
}

/// Shared graphics context handed to the graph and the detector.
#[derive(Debug)]
pub struct GpuResources {
    context: Mutex<ContextStats>,
    current: AtomicBool,
    next_texture_id: AtomicU32,
}

impl GpuResources {
    pub fn create() -> Result<Arc<Self>> {
        tracing::info!("Created software GL context");
        Ok(Arc::new(Self {
            context: Mutex::new(ContextStats::default()),
            current: AtomicBool::new(false),
            next_texture_id: AtomicU32::new(1),
        }))
    }

    /// Whether a GL scope is active right now.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    pub fn scopes_entered(&self) -> u64 {
        self.context.lock().scopes
    }

    pub fn textures_created(&self) -> u64 {
        self.context.lock().textures
    }
}

/// Detector-side handle that runs work on the graph's GL context.
#[derive(Debug, Default)]
pub struct GlHelper {
    resources: Option<Arc<GpuResources>>,
}

impl GlHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, resources: Arc<GpuResources>) {
        self.resources = Some(resources);
    }

    /// Run `f` with the context current.
    ///
    /// Fails with [`HandlinkError::GpuContext`] when the helper has no
    /// context, or when `f` returns while a texture it created is still
    /// alive.
    pub fn run_in_gl_context<T>(&self, f: impl FnOnce(&GlScope<'_>) -> Result<T>) -> Result<T> {
        let resources = self
            .resources
            .as_ref()
            .ok_or_else(|| HandlinkError::GpuContext("GL helper has no context".to_string()))?;

        let mut stats = resources.context.lock();
        resources.current.store(true, Ordering::Release);
        let scope = GlScope {
            resources,
            live_textures: Cell::new(0),
            created: Cell::new(0),
            framebuffer: RefCell::new(None),
        };

        let result = f(&scope);

        resources.current.store(false, Ordering::Release);
        stats.scopes += 1;
        stats.textures += scope.created.get();
        drop(stats);

        let value = result?;
        let leaked = scope.live_textures.get();
        if leaked > 0 {
            return Err(HandlinkError::GpuContext(format!(
                "{} texture(s) still alive when leaving the GL context",
                leaked
            )));
        }
        Ok(value)
    }
}

/// The context while it is current.
pub struct GlScope<'a> {
    resources: &'a GpuResources,
    live_textures: Cell<usize>,
    created: Cell<u64>,
    framebuffer: RefCell<Option<GpuBuffer>>,
}

impl GlScope<'_> {
    /// Upload a CPU frame into a new texture.
    pub fn create_source_texture(&self, frame: &ImageFrame) -> Result<GlTexture<'_>> {
        let buffer = GpuBuffer::from_frame(frame)?;
        Ok(self.wrap(buffer))
    }

    /// Bind an existing buffer as a texture.
    pub fn create_source_texture_from_buffer(&self, buffer: &GpuBuffer) -> GlTexture<'_> {
        self.wrap(buffer.clone())
    }

    fn wrap(&self, buffer: GpuBuffer) -> GlTexture<'_> {
        let id = self.resources.next_texture_id.fetch_add(1, Ordering::AcqRel);
        self.live_textures.set(self.live_textures.get() + 1);
        self.created.set(self.created.get() + 1);
        tracing::trace!(
            "GL texture {} ({}x{} {:?})",
            id,
            buffer.width(),
            buffer.height(),
            buffer.format()
        );
        GlTexture {
            scope_live: &self.live_textures,
            buffer,
        }
    }

    /// Attach `texture` as the read framebuffer.
    pub fn bind_framebuffer(&self, texture: &GlTexture<'_>) {
        *self.framebuffer.borrow_mut() = Some(texture.buffer.clone());
    }

    /// Read the bound framebuffer into `dst`, honoring its row stride.
    pub fn read_pixels(&self, dst: &mut ImageFrame) -> Result<()> {
        let framebuffer = self.framebuffer.borrow();
        let source = framebuffer
            .as_ref()
            .ok_or_else(|| HandlinkError::GpuContext("no framebuffer bound".to_string()))?;

        if source.width() != dst.width()
            || source.height() != dst.height()
            || source.format().bytes_per_pixel() != dst.channels()
        {
            return Err(HandlinkError::GpuContext(format!(
                "cannot read {}x{} {:?} framebuffer into {}x{} {:?} frame",
                source.width(),
                source.height(),
                source.format(),
                dst.width(),
                dst.height(),
                dst.format()
            )));
        }

        for y in 0..dst.height() {
            dst.row_mut(y).copy_from_slice(source.row(y));
        }
        Ok(())
    }

    pub fn flush(&self) {
        tracing::trace!("glFlush");
    }
}

/// A texture alive inside one [`GlScope`].
pub struct GlTexture<'s> {
    scope_live: &'s Cell<usize>,
    buffer: GpuBuffer,
}

impl GlTexture<'_> {
    pub fn internal_format(&self) -> u32 {
        self.buffer.format().gl_internal_format()
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Buffer view of the texture contents, valid after release.
    pub fn get_frame(&self) -> GpuBuffer {
        self.buffer.clone()
    }

    pub fn release(self) {
        self.scope_live.set(self.scope_live.get().saturating_sub(1));
    }
}
