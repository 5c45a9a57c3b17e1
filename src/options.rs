/*
 * Copyright (c) 2026 Yumechi <yume@yumechi.jp>
 *
 * Created on Tuesday, October 6, 2026
 * Author: Yumechi <yume@yumechi.jp>
 *
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use core::{fmt::Display, str::FromStr};

use crate::kernel::constants::BYTE_SCALE;

/// An 8-bit per channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is opaque.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque red, the default error color.
    pub const RED: Self = Self::new(255, 0, 0, 255);

    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a `0xRRGGBBAA` value.
    #[must_use]
    pub const fn from_rgba_u32(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Pack into a `0xRRGGBBAA` value.
    #[must_use]
    pub const fn to_rgba_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Normalize to `[r, g, b, a]` in `[0, 1]`.
    #[must_use]
    pub fn to_unit(self) -> [f32; 4] {
        [
            f32::from(self.r) / BYTE_SCALE,
            f32::from(self.g) / BYTE_SCALE,
            f32::from(self.b) / BYTE_SCALE,
            f32::from(self.a) / BYTE_SCALE,
        ]
    }
}

/// A color string that is not `RRGGBB` or `RRGGBBAA` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected a RRGGBB or RRGGBBAA hex color")]
pub struct ParseColorError;

impl FromStr for Rgba8 {
    type Err = ParseColorError;

    /// Parse `RRGGBB` or `RRGGBBAA`, with an optional leading `#`. Six digits imply an opaque color.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError);
        }

        match hex.len() {
            6 => u32::from_str_radix(hex, 16)
                .map(|rgb| Self::from_rgba_u32((rgb << 8) | 0xff))
                .map_err(|_| ParseColorError),
            8 => u32::from_str_radix(hex, 16)
                .map(Self::from_rgba_u32)
                .map_err(|_| ParseColorError),
            _ => Err(ParseColorError),
        }
    }
}

impl Display for Rgba8 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{:08x}", self.to_rgba_u32())
    }
}

/// How dissimilar pixels are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum OverlayType {
    /// Blend the right pixel toward the error color.
    #[default]
    Flat = 0,
    /// Tint the right pixel by the error color, then blend toward it, forcing full opacity.
    Movement = 1,
}

/// An overlay name other than `flat` or `movement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected overlay type 'flat' or 'movement'")]
pub struct ParseOverlayTypeError;

impl FromStr for OverlayType {
    type Err = ParseOverlayTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("flat") {
            Ok(Self::Flat)
        } else if s.eq_ignore_ascii_case("movement") {
            Ok(Self::Movement)
        } else {
            Err(ParseOverlayTypeError)
        }
    }
}

impl Display for OverlayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Flat => "flat",
            Self::Movement => "movement",
        })
    }
}

/// Options for a single comparison.
///
/// Numeric options outside their nominal range are accepted as-is and only produce a warning in the log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffOptions {
    /// Color used to render dissimilar pixels.
    pub error_color: Rgba8,
    /// Euclidean RGBA distance at or below which two pixels are similar. Nominally non-negative.
    pub tolerance: f32,
    /// Base blend weight toward the error color for dissimilar pixels, nominally in `[0, 1]`.
    pub overlay_transparency: f32,
    /// Rendering mode for dissimilar pixels.
    pub overlay_type: OverlayType,
    /// Scale the blend weight by the pixel distance.
    pub weight_by_diff_percentage: bool,
    /// Greyscale both inputs (in place) before comparing them.
    pub ignore_color: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            error_color: Rgba8::RED,
            tolerance: 0.0,
            overlay_transparency: 1.0,
            overlay_type: OverlayType::Flat,
            weight_by_diff_percentage: false,
            ignore_color: false,
        }
    }
}

impl DiffOptions {
    /// Log a warning for every numeric option outside its nominal range.
    ///
    /// Returns whether all options were in range.
    pub fn warn_out_of_range(&self) -> bool {
        let mut in_range = true;

        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            log::warn!(
                "tolerance {} is not a non-negative number, every pixel may be classified dissimilar",
                self.tolerance
            );
            in_range = false;
        }

        if !(0.0..=1.0).contains(&self.overlay_transparency) {
            log::warn!(
                "overlay transparency {} is outside [0, 1], blend weights will be clamped",
                self.overlay_transparency
            );
            in_range = false;
        }

        in_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!("ff0000".parse::<Rgba8>(), Ok(Rgba8::RED));
        assert_eq!("#FF0000ff".parse::<Rgba8>(), Ok(Rgba8::RED));
        assert_eq!(
            "11223344".parse::<Rgba8>(),
            Ok(Rgba8::new(0x11, 0x22, 0x33, 0x44))
        );
        assert_eq!("ff00".parse::<Rgba8>(), Err(ParseColorError));
        assert_eq!("+f0000".parse::<Rgba8>(), Err(ParseColorError));
        assert_eq!("gg0000".parse::<Rgba8>(), Err(ParseColorError));
    }

    #[test]
    fn test_color_packing() {
        let color = Rgba8::new(1, 2, 3, 4);
        assert_eq!(color.to_rgba_u32(), 0x0102_0304);
        assert_eq!(Rgba8::from_rgba_u32(0x0102_0304), color);
        assert_eq!(Rgba8::RED.to_unit(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parse_overlay() {
        assert_eq!("flat".parse::<OverlayType>(), Ok(OverlayType::Flat));
        assert_eq!("Movement".parse::<OverlayType>(), Ok(OverlayType::Movement));
        assert_eq!("blend".parse::<OverlayType>(), Err(ParseOverlayTypeError));
    }

    #[test]
    fn test_out_of_range_options() {
        assert!(DiffOptions::default().warn_out_of_range());

        let options = DiffOptions {
            tolerance: f32::NAN,
            ..Default::default()
        };
        assert!(!options.warn_out_of_range());

        let options = DiffOptions {
            overlay_transparency: 1.5,
            ..Default::default()
        };
        assert!(!options.warn_out_of_range());
    }
}
