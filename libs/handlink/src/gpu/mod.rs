// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Texture round trip for the GPU detector.

mod buffer;
mod context;

pub use buffer::{GpuBuffer, GpuBufferFormat, image_format_for_gpu_buffer_format};
pub use context::{GlHelper, GlScope, GlTexture, GpuResources};

/// OpenGL constants reported by textures.
pub mod gl_constants {
    /// GL_RGB8 - 8-bit RGB internal format.
    pub const GL_RGB8: u32 = 0x8051;
    /// GL_RGBA8 - 8-bit RGBA internal format.
    pub const GL_RGBA8: u32 = 0x8058;
}
