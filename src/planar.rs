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

use core::{fmt::Debug, marker::PhantomData, ptr::NonNull};

use alloc::vec::Vec;
use generic_array::typenum::U8;

use crate::{
    DiffError,
    alignment::{AlignedBuffer, AllocationError},
    kernel::{constants::BYTE_SCALE, type_traits::SupportedLanes},
};

/// One channel of a [`PlanarBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    /// Red.
    Red = 0,
    /// Green.
    Green = 1,
    /// Blue.
    Blue = 2,
    /// Alpha.
    Alpha = 3,
}

/// Byte order of one pixel in an interleaved 8-bit image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelOrder {
    /// `R, G, B, A`, the order used by `ImageData` and most image decoders.
    #[default]
    Rgba,
    /// `B, G, R, A`, the in-memory order of a little-endian 32-bit ARGB bitmap.
    Bgra,
}

impl ChannelOrder {
    /// Byte offsets of red, green, blue and alpha within one pixel.
    #[must_use]
    pub const fn offsets(self) -> [usize; 4] {
        match self {
            Self::Rgba => [0, 1, 2, 3],
            Self::Bgra => [2, 1, 0, 3],
        }
    }
}

/// Denormalize a channel value to a byte, rounding half up.
///
/// Out of range values saturate, NaN maps to 0.
#[inline]
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float to int casts saturate"
)]
pub fn unit_to_byte(value: f32) -> u8 {
    (value * BYTE_SCALE + 0.5) as u8
}

/// Normalize a byte to a channel value in `[0, 1]`.
#[inline]
#[must_use]
pub fn byte_to_unit(value: u8) -> f32 {
    f32::from(value) / BYTE_SCALE
}

/// Number of bytes an interleaved RGBA image of the given size occupies, `None` on overflow.
#[must_use]
pub const fn interleaved_len(width: usize, height: usize) -> Option<usize> {
    match width.checked_mul(height) {
        Some(pixels) => pixels.checked_mul(4),
        None => None,
    }
}

/// An RGBA image stored as four separate `f32` channel planes.
///
/// Each row is followed by `padding_columns` zero elements so that the row stride is a multiple of `L` lanes,
/// and every plane starts on a 64-byte boundary, so a kernel can process whole lane groups with aligned loads.
///
/// Padding elements are never part of the image: only kernels touch them, and they are zero outside of a kernel call.
pub struct PlanarBuffer<L: SupportedLanes = U8> {
    width: usize,
    height: usize,
    padding_columns: usize,
    channels: [AlignedBuffer<f32>; 4],
    _lanes: PhantomData<L>,
}

impl<L: SupportedLanes> PlanarBuffer<L> {
    /// Padding columns needed to round `width` up to a multiple of `L`.
    #[must_use]
    pub const fn padding_for(width: usize) -> usize {
        (L::USIZE - width % L::USIZE) % L::USIZE
    }

    fn plane_len(width: usize, height: usize) -> Result<usize, AllocationError> {
        width
            .checked_add(Self::padding_for(width))
            .and_then(|stride| stride.checked_mul(height))
            .ok_or(AllocationError { bytes: usize::MAX })
    }

    /// Allocate a fully transparent black image.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the planes cannot be allocated.
    pub fn new(width: usize, height: usize) -> Result<Self, AllocationError> {
        let len = Self::plane_len(width, height)?;

        Ok(Self {
            width,
            height,
            padding_columns: Self::padding_for(width),
            channels: [
                AlignedBuffer::zeroed(len)?,
                AlignedBuffer::zeroed(len)?,
                AlignedBuffer::zeroed(len)?,
                AlignedBuffer::zeroed(len)?,
            ],
            _lanes: PhantomData,
        })
    }

    /// Allocate an image and fill every real pixel from `f(x, y) -> [r, g, b, a]`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the planes cannot be allocated.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self, AllocationError>
    where
        F: FnMut(usize, usize) -> [f32; 4],
    {
        let mut out = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                out.set_pixel(x, y, f(x, y));
            }
        }
        Ok(out)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Filler elements at the end of each row.
    #[must_use]
    pub const fn padding_columns(&self) -> usize {
        self.padding_columns
    }

    /// Elements per row, padding included.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.width + self.padding_columns
    }

    /// Elements per channel plane, padding included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stride() * self.height
    }

    /// Whether the image has no elements at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pixels that belong to the image, padding excluded.
    #[must_use]
    pub const fn real_pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether `other` has the same width, height and stride.
    #[must_use]
    pub fn same_layout<L2: SupportedLanes>(&self, other: &PlanarBuffer<L2>) -> bool {
        self.width == other.width && self.height == other.height && self.stride() == other.stride()
    }

    /// Borrow one channel plane.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> &[f32] {
        &self.channels[channel as usize]
    }

    /// Mutably borrow one channel plane.
    pub fn channel_mut(&mut self, channel: Channel) -> &mut [f32] {
        &mut self.channels[channel as usize]
    }

    /// Borrow the red, green, blue and alpha planes.
    #[must_use]
    pub fn channels(&self) -> [&[f32]; 4] {
        let [r, g, b, a] = &self.channels;
        [&r[..], &g[..], &b[..], &a[..]]
    }

    /// Mutably borrow the red, green, blue and alpha planes.
    pub fn channels_mut(&mut self) -> [&mut [f32]; 4] {
        let [r, g, b, a] = &mut self.channels;
        [&mut r[..], &mut g[..], &mut b[..], &mut a[..]]
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) is outside of a {}x{} image",
            self.width,
            self.height
        );
        y * self.stride() + x
    }

    /// Read one pixel as `[r, g, b, a]`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside of the image.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        let i = self.index(x, y);
        self.channels.each_ref().map(|plane| plane[i])
    }

    /// Write one pixel from `[r, g, b, a]`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside of the image.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [f32; 4]) {
        let i = self.index(x, y);
        for (plane, value) in self.channels.iter_mut().zip(rgba) {
            plane[i] = value;
        }
    }

    /// Allocate a copy of this image.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the planes cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, AllocationError> {
        let [r, g, b, a] = &self.channels;

        Ok(Self {
            width: self.width,
            height: self.height,
            padding_columns: self.padding_columns,
            channels: [r.try_clone()?, g.try_clone()?, b.try_clone()?, a.try_clone()?],
            _lanes: PhantomData,
        })
    }

    /// Give up ownership of the planes, returning `([r, g, b, a], width, height)`.
    ///
    /// The planes must be handed back to [`PlanarBuffer::from_raw_parts`] with the same lane width, otherwise they leak.
    #[must_use]
    pub fn into_raw_parts(self) -> ([NonNull<f32>; 4], usize, usize) {
        let Self {
            width,
            height,
            channels,
            ..
        } = self;

        (channels.map(|plane| plane.into_raw_parts().0), width, height)
    }

    /// Take back ownership of planes released by [`PlanarBuffer::into_raw_parts`].
    ///
    /// # Safety
    ///
    /// The planes must come from a single call to [`PlanarBuffer::into_raw_parts`] on a `PlanarBuffer<L>` of the same
    /// `width` and `height`, and must not be owned by any other buffer.
    ///
    /// # Panics
    ///
    /// Panics if a plane pointer is not aligned to 64 bytes or the size overflows.
    pub unsafe fn from_raw_parts(channels: [NonNull<f32>; 4], width: usize, height: usize) -> Self {
        let len = Self::plane_len(width, height).unwrap_or_else(|_| {
            panic!("a {width}x{height} image cannot come from an existing allocation")
        });

        Self {
            width,
            height,
            padding_columns: Self::padding_for(width),
            // SAFETY: forwarded to the caller.
            channels: channels.map(|ptr| unsafe { AlignedBuffer::from_raw_parts(ptr, len) }),
            _lanes: PhantomData,
        }
    }

    /// Convert an interleaved 8-bit image, normalizing every channel with `v / 255`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::BufferLength`] if `bytes` is not exactly `width * height * 4` long,
    /// or [`DiffError::Allocation`] if the planes cannot be allocated.
    pub fn from_interleaved8(
        width: usize,
        height: usize,
        bytes: &[u8],
        order: ChannelOrder,
    ) -> Result<Self, DiffError> {
        check_interleaved_len(width, height, bytes.len())?;

        let mut out = Self::new(width, height)?;
        if width == 0 {
            return Ok(out);
        }

        let stride = out.stride();
        for (plane, offset) in out.channels.iter_mut().zip(order.offsets()) {
            for (src_row, dst_row) in bytes
                .chunks_exact(width * 4)
                .zip(plane.chunks_exact_mut(stride))
            {
                for (px, dst) in src_row.chunks_exact(4).zip(dst_row.iter_mut()) {
                    *dst = byte_to_unit(px[offset]);
                }
            }
        }

        Ok(out)
    }

    /// Write the real pixels into an interleaved 8-bit buffer, rounding half up.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::BufferLength`] if `out` is not exactly `width * height * 4` long.
    pub fn write_interleaved8(&self, out: &mut [u8], order: ChannelOrder) -> Result<(), DiffError> {
        check_interleaved_len(self.width, self.height, out.len())?;

        if self.width == 0 {
            return Ok(());
        }

        let stride = self.stride();
        for (plane, offset) in self.channels.iter().zip(order.offsets()) {
            for (dst_row, src_row) in out
                .chunks_exact_mut(self.width * 4)
                .zip(plane.chunks_exact(stride))
            {
                for (px, src) in dst_row.chunks_exact_mut(4).zip(src_row) {
                    px[offset] = unit_to_byte(*src);
                }
            }
        }

        Ok(())
    }

    /// Allocate an interleaved 8-bit copy of the real pixels.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::Allocation`] if the output cannot be allocated.
    pub fn to_interleaved8(&self, order: ChannelOrder) -> Result<Vec<u8>, DiffError> {
        let len = interleaved_len(self.width, self.height)
            .ok_or(DiffError::Allocation { bytes: usize::MAX })?;

        let mut out = Vec::new();
        out.try_reserve_exact(len)
            .map_err(|_| DiffError::Allocation { bytes: len })?;
        out.resize(len, 0);

        self.write_interleaved8(&mut out, order)?;
        Ok(out)
    }
}

fn check_interleaved_len(width: usize, height: usize, actual: usize) -> Result<(), DiffError> {
    match interleaved_len(width, height) {
        Some(expected) if expected == actual => Ok(()),
        expected => Err(DiffError::BufferLength {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        }),
    }
}

impl<L: SupportedLanes> Clone for PlanarBuffer<L> {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            padding_columns: self.padding_columns,
            channels: self.channels.clone(),
            _lanes: PhantomData,
        }
    }
}

impl<L: SupportedLanes> PartialEq for PlanarBuffer<L> {
    fn eq(&self, other: &Self) -> bool {
        self.same_layout(other) && self.channels == other.channels
    }
}

impl<L: SupportedLanes> Debug for PlanarBuffer<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlanarBuffer")
            .field("lanes", &L::USIZE)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("padding_columns", &self.padding_columns)
            .finish_non_exhaustive()
    }
}
