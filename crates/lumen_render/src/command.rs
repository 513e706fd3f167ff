//! Command recording
//!
//! Every subsystem records into its own named [`CommandBuffer`] and flushes
//! it into the host context. The host executes commands in order; the core
//! never touches the GPU directly.

use glam::{Mat4, Vec4};

use crate::context::RenderContext;
use crate::property::ShaderId;
use crate::resource::{LoadAction, Rect, RenderTargetId, StoreAction, TemporaryTargetDesc};

/// A single recorded render command
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Open a profiling/debug sample scope
    BeginSample(String),
    /// Close a profiling/debug sample scope
    EndSample(String),
    /// Allocate a temporary target for the rest of the frame
    GetTemporaryTarget { id: ShaderId, desc: TemporaryTargetDesc },
    /// Release a temporary target
    ReleaseTemporaryTarget(ShaderId),
    SetRenderTarget {
        target: RenderTargetId,
        load: LoadAction,
        store: StoreAction,
    },
    ClearRenderTarget {
        depth: bool,
        color: bool,
        color_value: Vec4,
    },
    SetViewport(Rect),
    SetViewProjection { view: Mat4, projection: Mat4 },
    /// Constant and slope-scaled depth bias for subsequent draws
    SetGlobalDepthBias { bias: f32, slope_bias: f32 },
    SetGlobalInt { id: ShaderId, value: i32 },
    SetGlobalFloat { id: ShaderId, value: f32 },
    SetGlobalVector { id: ShaderId, value: Vec4 },
    SetGlobalVectorArray { id: ShaderId, values: Vec<Vec4> },
    SetGlobalMatrixArray { id: ShaderId, values: Vec<Mat4> },
    SetGlobalTexture { id: ShaderId, target: RenderTargetId },
    SetKeyword { keyword: &'static str, enabled: bool },
    /// Full-screen triangle using a pass of the post-processing material
    DrawFullscreen { pass: u32 },
}

/// Named, ordered list of render commands
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<RenderCommand>,
}

impl CommandBuffer {
    /// Create an empty buffer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Hand the recorded commands to the context, then clear
    pub fn flush<C: RenderContext>(&mut self, context: &mut C) {
        if !self.commands.is_empty() {
            log::trace!("{}: executing {} commands", self.name, self.commands.len());
            context.execute_command_buffer(self);
        }
        self.commands.clear();
    }

    /// Open a sample scope named after the buffer
    pub fn begin_sample(&mut self) {
        self.commands.push(RenderCommand::BeginSample(self.name.clone()));
    }

    /// Close the sample scope named after the buffer
    pub fn end_sample(&mut self) {
        self.commands.push(RenderCommand::EndSample(self.name.clone()));
    }

    pub fn get_temporary_target(&mut self, id: ShaderId, desc: TemporaryTargetDesc) {
        self.commands.push(RenderCommand::GetTemporaryTarget { id, desc });
    }

    pub fn release_temporary_target(&mut self, id: ShaderId) {
        self.commands.push(RenderCommand::ReleaseTemporaryTarget(id));
    }

    pub fn set_render_target(
        &mut self,
        target: impl Into<RenderTargetId>,
        load: LoadAction,
        store: StoreAction,
    ) {
        self.commands.push(RenderCommand::SetRenderTarget {
            target: target.into(),
            load,
            store,
        });
    }

    pub fn clear_render_target(&mut self, depth: bool, color: bool, color_value: Vec4) {
        self.commands.push(RenderCommand::ClearRenderTarget {
            depth,
            color,
            color_value,
        });
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        self.commands.push(RenderCommand::SetViewport(rect));
    }

    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.commands
            .push(RenderCommand::SetViewProjection { view, projection });
    }

    pub fn set_global_depth_bias(&mut self, bias: f32, slope_bias: f32) {
        self.commands
            .push(RenderCommand::SetGlobalDepthBias { bias, slope_bias });
    }

    pub fn set_global_int(&mut self, id: ShaderId, value: i32) {
        self.commands.push(RenderCommand::SetGlobalInt { id, value });
    }

    pub fn set_global_float(&mut self, id: ShaderId, value: f32) {
        self.commands.push(RenderCommand::SetGlobalFloat { id, value });
    }

    pub fn set_global_vector(&mut self, id: ShaderId, value: Vec4) {
        self.commands.push(RenderCommand::SetGlobalVector { id, value });
    }

    pub fn set_global_vector_array(&mut self, id: ShaderId, values: &[Vec4]) {
        self.commands.push(RenderCommand::SetGlobalVectorArray {
            id,
            values: values.to_vec(),
        });
    }

    pub fn set_global_matrix_array(&mut self, id: ShaderId, values: &[Mat4]) {
        self.commands.push(RenderCommand::SetGlobalMatrixArray {
            id,
            values: values.to_vec(),
        });
    }

    pub fn set_global_texture(&mut self, id: ShaderId, target: impl Into<RenderTargetId>) {
        self.commands.push(RenderCommand::SetGlobalTexture {
            id,
            target: target.into(),
        });
    }

    pub fn set_keyword(&mut self, keyword: &'static str, enabled: bool) {
        self.commands
            .push(RenderCommand::SetKeyword { keyword, enabled });
    }

    /// Enable at most one keyword of a mutually exclusive group
    ///
    /// Every keyword in `keywords` is disabled except the one at `enabled`.
    pub fn set_keyword_group(&mut self, keywords: &[&'static str], enabled: Option<usize>) {
        for (i, keyword) in keywords.iter().enumerate() {
            self.set_keyword(keyword, enabled == Some(i));
        }
    }

    pub fn draw_fullscreen(&mut self, pass: u32) {
        self.commands.push(RenderCommand::DrawFullscreen { pass });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_uses_buffer_name() {
        let mut buffer = CommandBuffer::new("Shadows");
        buffer.begin_sample();
        buffer.end_sample();
        assert_eq!(
            buffer.commands(),
            &[
                RenderCommand::BeginSample("Shadows".into()),
                RenderCommand::EndSample("Shadows".into()),
            ]
        );
    }

    #[test]
    fn test_keyword_group() {
        let mut buffer = CommandBuffer::new("test");
        buffer.set_keyword_group(&["_A", "_B", "_C"], Some(1));
        assert_eq!(
            buffer.commands(),
            &[
                RenderCommand::SetKeyword { keyword: "_A", enabled: false },
                RenderCommand::SetKeyword { keyword: "_B", enabled: true },
                RenderCommand::SetKeyword { keyword: "_C", enabled: false },
            ]
        );

        buffer.clear();
        buffer.set_keyword_group(&["_A", "_B"], None);
        assert!(buffer
            .commands()
            .iter()
            .all(|c| matches!(c, RenderCommand::SetKeyword { enabled: false, .. })));
    }

    #[test]
    fn test_array_upload_copies_values() {
        let mut buffer = CommandBuffer::new("test");
        let values = [Vec4::ONE, Vec4::ZERO];
        buffer.set_global_vector_array(ShaderId::from_name("_X"), &values);
        match &buffer.commands()[0] {
            RenderCommand::SetGlobalVectorArray { values, .. } => assert_eq!(values.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_target_conversion() {
        let mut buffer = CommandBuffer::new("test");
        let id = ShaderId::from_name("_CameraFrameBuffer");
        buffer.set_render_target(id, LoadAction::DontCare, StoreAction::Store);
        assert_eq!(
            buffer.commands()[0],
            RenderCommand::SetRenderTarget {
                target: RenderTargetId::Temporary(id),
                load: LoadAction::DontCare,
                store: StoreAction::Store,
            }
        );
    }
}
