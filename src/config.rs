//! Runtime technique toggles and startup tuning constants.
//!
//! [`RenderConfig`] is the set of per-frame switches the user flips while the
//! renderer runs. Every combination of its fields is a valid frame. The
//! orchestrator reads a copy once at the start of each frame.
//!
//! [`RendererSettings`] holds the tuning constants that size GPU resources
//! (shadow map resolution, bloom iterations, SSAO kernel). They are fixed for
//! the lifetime of a [`Renderer`](crate::Renderer) and validated once at
//! startup.
//!
//! # Example
//!
//! ```
//! use lumen::{RenderConfig, RendererSettings};
//!
//! let mut config = RenderConfig::default();
//! config.ssao = true;
//! assert!(config.needs_geometry_pass());
//!
//! let settings = RendererSettings::default().bloom_iterations(6);
//! assert!(settings.validate().is_ok());
//! ```

use std::fmt;

/// Which G-buffer attachment the composite pass shows instead of the lit image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GBufferChannel {
    /// The normal lit (and bloomed) image.
    #[default]
    Final,
    Diffuse,
    Normal,
    Position,
    Ambient,
    /// Scalar specular strength, stored beside the ambient color.
    Specular,
}

impl GBufferChannel {
    pub const ALL: [GBufferChannel; 6] = [
        GBufferChannel::Final,
        GBufferChannel::Diffuse,
        GBufferChannel::Normal,
        GBufferChannel::Position,
        GBufferChannel::Ambient,
        GBufferChannel::Specular,
    ];

    /// Cycles to the next channel, wrapping back to [`GBufferChannel::Final`].
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Index of the G-buffer color attachment holding this channel.
    pub fn attachment(self) -> Option<usize> {
        match self {
            GBufferChannel::Final => None,
            GBufferChannel::Diffuse => Some(0),
            GBufferChannel::Normal => Some(1),
            GBufferChannel::Position => Some(2),
            GBufferChannel::Ambient | GBufferChannel::Specular => Some(3),
        }
    }

    /// Channel index the composite shader switches on; 0 is the lit image.
    pub fn code(self) -> u32 {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0) as u32
    }
}

/// Per-frame technique toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderConfig {
    /// Blinn-Phong half-vector specular; Phong reflection when off.
    pub blinn_phong: bool,
    pub directional_shadow: bool,
    pub point_shadow: bool,
    pub deferred_shading: bool,
    pub gbuffer_view: GBufferChannel,
    pub normal_mapping: bool,
    pub bloom: bool,
    pub ssao: bool,
    /// Quantised toon-style diffuse and specular bands.
    pub stylized: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            blinn_phong: true,
            directional_shadow: true,
            point_shadow: true,
            deferred_shading: true,
            gbuffer_view: GBufferChannel::Final,
            normal_mapping: true,
            bloom: true,
            ssao: false,
            stylized: false,
        }
    }
}

impl RenderConfig {
    /// Every optional technique off, Blinn-Phong on.
    pub fn minimal() -> Self {
        Self {
            blinn_phong: true,
            directional_shadow: false,
            point_shadow: false,
            deferred_shading: false,
            gbuffer_view: GBufferChannel::Final,
            normal_mapping: false,
            bloom: false,
            ssao: false,
            stylized: false,
        }
    }

    /// The geometry pass runs for deferred shading, for SSAO (which reads its
    /// normals and positions even in forward mode) and for G-buffer debug views.
    pub fn needs_geometry_pass(&self) -> bool {
        self.deferred_shading || self.ssao || self.gbuffer_view != GBufferChannel::Final
    }

    /// Enumerates every distinct configuration.
    pub fn combinations() -> Vec<RenderConfig> {
        const FLAGS: u32 = 8;
        let mut out = Vec::with_capacity((1 << FLAGS) * GBufferChannel::ALL.len());
        for bits in 0..(1u32 << FLAGS) {
            for channel in GBufferChannel::ALL {
                let bit = |n: u32| bits & (1 << n) != 0;
                out.push(RenderConfig {
                    blinn_phong: bit(0),
                    directional_shadow: bit(1),
                    point_shadow: bit(2),
                    deferred_shading: bit(3),
                    gbuffer_view: channel,
                    normal_mapping: bit(4),
                    bloom: bit(5),
                    ssao: bit(6),
                    stylized: bit(7),
                });
            }
        }
        out
    }

    /// Short human-readable summary of the active toggles.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(if self.blinn_phong { "blinn-phong" } else { "phong" });
        if self.deferred_shading {
            parts.push("deferred");
        } else {
            parts.push("forward");
        }
        for (on, name) in [
            (self.directional_shadow, "dir-shadow"),
            (self.point_shadow, "point-shadow"),
            (self.normal_mapping, "normal-map"),
            (self.ssao, "ssao"),
            (self.bloom, "bloom"),
            (self.stylized, "stylized"),
        ] {
            if on {
                parts.push(name);
            }
        }
        let mut summary = parts.join(" ");
        if self.gbuffer_view != GBufferChannel::Final {
            summary.push_str(&format!(" [{:?}]", self.gbuffer_view));
        }
        summary
    }
}

/// A tuning constant outside its documented range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name} = {value} is outside {range}")]
pub struct SettingsError {
    pub name: &'static str,
    pub value: String,
    pub range: &'static str,
}

impl SettingsError {
    fn new(name: &'static str, value: impl fmt::Display, range: &'static str) -> Self {
        Self {
            name,
            value: value.to_string(),
            range,
        }
    }
}

/// Directional shadow map edge length in texels. Power of two in [256, 8192].
pub const DEFAULT_SHADOW_MAP_SIZE: u32 = 1024;
/// Point light cube face edge length in texels. Power of two in [64, 4096].
pub const DEFAULT_POINT_SHADOW_SIZE: u32 = 512;
/// Constant depth bias for shadow comparisons. In [0, 0.1].
pub const DEFAULT_SHADOW_BIAS: f32 = 0.005;
/// Separable blur iterations for bloom. In [1, 64].
pub const DEFAULT_BLOOM_ITERATIONS: u32 = 10;
/// SSAO hemisphere samples. In [1, 64].
pub const DEFAULT_SSAO_KERNEL_SIZE: u32 = 64;
/// SSAO sample radius in world units. In (0, 10].
pub const DEFAULT_SSAO_RADIUS: f32 = 0.5;
/// SSAO depth comparison bias. In [0, 1).
pub const DEFAULT_SSAO_BIAS: f32 = 0.025;
/// Edge length of the tiled SSAO rotation-noise texture.
pub const SSAO_NOISE_SIZE: u32 = 4;
/// Largest kernel the SSAO uniform block can hold.
pub const MAX_SSAO_KERNEL_SIZE: u32 = 64;

/// Startup tuning constants.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    pub shadow_map_size: u32,
    pub point_shadow_size: u32,
    pub shadow_bias: f32,
    pub bloom_iterations: u32,
    pub ssao_kernel_size: u32,
    pub ssao_radius: f32,
    pub ssao_bias: f32,
    /// Seed for the SSAO kernel and noise generator.
    pub ssao_seed: u64,
    /// Background color of the lit buffer, display-referred.
    pub clear_color: [f32; 3],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            point_shadow_size: DEFAULT_POINT_SHADOW_SIZE,
            shadow_bias: DEFAULT_SHADOW_BIAS,
            bloom_iterations: DEFAULT_BLOOM_ITERATIONS,
            ssao_kernel_size: DEFAULT_SSAO_KERNEL_SIZE,
            ssao_radius: DEFAULT_SSAO_RADIUS,
            ssao_bias: DEFAULT_SSAO_BIAS,
            ssao_seed: 0x5eed,
            clear_color: [0.19, 0.19, 0.19],
        }
    }
}

impl RendererSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    pub fn point_shadow_size(mut self, size: u32) -> Self {
        self.point_shadow_size = size;
        self
    }

    pub fn bloom_iterations(mut self, iterations: u32) -> Self {
        self.bloom_iterations = iterations;
        self
    }

    pub fn ssao_kernel_size(mut self, size: u32) -> Self {
        self.ssao_kernel_size = size;
        self
    }

    pub fn clear_color(mut self, color: [f32; 3]) -> Self {
        self.clear_color = color;
        self
    }

    /// Checks every constant against its documented range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let pow2_in = |v: u32, lo: u32, hi: u32| v.is_power_of_two() && (lo..=hi).contains(&v);

        if !pow2_in(self.shadow_map_size, 256, 8192) {
            return Err(SettingsError::new(
                "shadow_map_size",
                self.shadow_map_size,
                "powers of two in [256, 8192]",
            ));
        }
        if !pow2_in(self.point_shadow_size, 64, 4096) {
            return Err(SettingsError::new(
                "point_shadow_size",
                self.point_shadow_size,
                "powers of two in [64, 4096]",
            ));
        }
        if !(0.0..=0.1).contains(&self.shadow_bias) {
            return Err(SettingsError::new("shadow_bias", self.shadow_bias, "[0, 0.1]"));
        }
        if !(1..=64).contains(&self.bloom_iterations) {
            return Err(SettingsError::new(
                "bloom_iterations",
                self.bloom_iterations,
                "[1, 64]",
            ));
        }
        if !(1..=MAX_SSAO_KERNEL_SIZE).contains(&self.ssao_kernel_size) {
            return Err(SettingsError::new(
                "ssao_kernel_size",
                self.ssao_kernel_size,
                "[1, 64]",
            ));
        }
        if !(self.ssao_radius > 0.0 && self.ssao_radius <= 10.0) {
            return Err(SettingsError::new("ssao_radius", self.ssao_radius, "(0, 10]"));
        }
        if !(0.0..1.0).contains(&self.ssao_bias) {
            return Err(SettingsError::new("ssao_bias", self.ssao_bias, "[0, 1)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_cover_every_toggle() {
        let all = RenderConfig::combinations();
        assert_eq!(all.len(), 256 * GBufferChannel::ALL.len());

        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert!(all.contains(&RenderConfig::default()));
        assert!(all.contains(&RenderConfig::minimal()));
    }

    #[test]
    fn ssao_alone_requires_geometry_pass() {
        let config = RenderConfig {
            ssao: true,
            ..RenderConfig::minimal()
        };
        assert!(config.needs_geometry_pass());
        assert!(!RenderConfig::minimal().needs_geometry_pass());
    }

    #[test]
    fn channel_cycle_wraps() {
        let mut channel = GBufferChannel::Final;
        for _ in 0..GBufferChannel::ALL.len() {
            channel = channel.next();
        }
        assert_eq!(channel, GBufferChannel::Final);
    }

    #[test]
    fn ambient_and_specular_share_the_material_attachment() {
        assert_eq!(GBufferChannel::Ambient.attachment(), Some(3));
        assert_eq!(GBufferChannel::Specular.attachment(), Some(3));
        assert_ne!(GBufferChannel::Ambient.code(), GBufferChannel::Specular.code());
        assert_eq!(GBufferChannel::Final.code(), 0);
        assert_eq!(GBufferChannel::Specular.code(), 5);
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(RendererSettings::default().validate().is_ok());
    }

    #[test]
    fn settings_reject_out_of_range() {
        let err = RendererSettings::default()
            .shadow_map_size(1000)
            .validate()
            .unwrap_err();
        assert_eq!(err.name, "shadow_map_size");

        let err = RendererSettings::default()
            .bloom_iterations(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.name, "bloom_iterations");

        let err = RendererSettings::default()
            .ssao_kernel_size(65)
            .validate()
            .unwrap_err();
        assert_eq!(err.name, "ssao_kernel_size");
    }
}
