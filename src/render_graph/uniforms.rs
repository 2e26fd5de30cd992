//! Per-frame uniform block shared by every pass

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::scene::CameraDecl;

/// Number of band values per audio channel
pub const AUDIO_BANDS: usize = 4;
/// Number of audio channels
pub const AUDIO_CHANNELS: usize = 2;

/// Audio band values written by the audio analysis thread.
///
/// Writes and reads never block; a reader may see bands from two consecutive
/// analysis updates, which is fine for visualisation.
#[derive(Debug, Default)]
pub struct AudioBands {
    bands: [[AtomicU32; AUDIO_BANDS]; AUDIO_CHANNELS],
}

impl AudioBands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one band. Out of range indices are ignored.
    pub fn set(&self, channel: usize, band: usize, value: f32) {
        if let Some(slot) = self.bands.get(channel).and_then(|c| c.get(band)) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn set_channel(&self, channel: usize, values: [f32; AUDIO_BANDS]) {
        for (band, value) in values.into_iter().enumerate() {
            self.set(channel, band, value);
        }
    }

    pub fn snapshot(&self) -> [[f32; AUDIO_BANDS]; AUDIO_CHANNELS] {
        let mut out = [[0.0; AUDIO_BANDS]; AUDIO_CHANNELS];
        for (channel, bands) in self.bands.iter().enumerate() {
            for (band, value) in bands.iter().enumerate() {
                out[channel][band] = f32::from_bits(value.load(Ordering::Relaxed));
            }
        }
        out
    }
}

/// Shader compatibility block, uploaded as is.
///
/// Some shaders expect a fragment-coordinate offset and per-channel time
/// resolution in a fixed slot of the frame block. The render graph doesn't
/// interpret these values.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CompatBlock {
    pub values: [Vec4; 4],
}

/// Values shared by every pass in a frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInputs {
    /// Seconds since the scene was loaded
    pub time: f32,
    /// Seconds since the previous frame
    pub delta: f32,
    pub frame_index: u64,
    pub audio: [[f32; AUDIO_BANDS]; AUDIO_CHANNELS],
    pub compat: CompatBlock,
}

/// Uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    /// width, height, 1/width, 1/height of the pass targets
    pub resolution: Vec4,
    /// time, delta, frame index, unused
    pub time: Vec4,
    pub audio: [Vec4; AUDIO_CHANNELS],
    pub compat: CompatBlock,
}

impl FrameUniforms {
    pub fn new(inputs: &FrameInputs, camera: Option<&CameraDecl>, size: (u32, u32)) -> Self {
        let (width, height) = (size.0.max(1) as f32, size.1.max(1) as f32);
        let (view, projection) = match camera {
            Some(camera) => (
                camera.view_matrix(),
                camera.projection_matrix(size.0, size.1),
            ),
            None => (Mat4::IDENTITY, Mat4::IDENTITY),
        };
        Self {
            view,
            projection,
            resolution: Vec4::new(width, height, 1.0 / width, 1.0 / height),
            time: Vec4::new(inputs.time, inputs.delta, inputs.frame_index as f32, 0.0),
            audio: inputs.audio.map(Vec4::from_array),
            compat: inputs.compat,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_bands_snapshot() {
        let bands = AudioBands::new();
        bands.set_channel(0, [0.1, 0.2, 0.3, 0.4]);
        bands.set(1, 3, 0.9);
        bands.set(5, 0, 1.0);

        let snapshot = bands.snapshot();
        assert_eq!(snapshot[0], [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(snapshot[1], [0.0, 0.0, 0.0, 0.9]);
    }

    #[test]
    fn test_uniform_layout() {
        // Two matrices, four vec4s and the compat block, std140 friendly.
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 64 * 2 + 16 * 4 + 64);

        let inputs = FrameInputs {
            time: 1.5,
            delta: 0.25,
            frame_index: 7,
            ..Default::default()
        };
        let uniforms = FrameUniforms::new(&inputs, None, (200, 100));
        assert_eq!(uniforms.resolution, Vec4::new(200.0, 100.0, 0.005, 0.01));
        assert_eq!(uniforms.time, Vec4::new(1.5, 0.25, 7.0, 0.0));
        assert_eq!(uniforms.view, Mat4::IDENTITY);
    }
}
