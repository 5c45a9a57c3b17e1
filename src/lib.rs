#![doc = include_str!("../README.md")]
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
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![cfg_attr(feature = "portable-simd", feature(portable_simd))]
#![warn(missing_docs, clippy::pedantic)]

extern crate alloc;

use alloc::vec::Vec;

pub use generic_array::GenericArray;
use generic_array::typenum::B1;
use kernel::{DiffParams, Kernel, type_traits::EvaluateHardwareFeature};

/// Greyscale and diff compute kernels.
pub mod kernel;

pub use kernel::smart_kernel;

/// Memory alignment utilities.
pub mod alignment;

/// Error types.
pub mod error;

pub use error::DiffError;

/// Comparison options.
pub mod options;

pub use options::{DiffOptions, OverlayType, Rgba8};

/// Planar pixel buffers and interleaved byte conversion.
pub mod planar;

pub use planar::{Channel, ChannelOrder, PlanarBuffer};

#[cfg(target_arch = "wasm32")]
/// WebAssembly bindings.
pub mod wasm;

#[cfg(feature = "ffi")]
pub mod ffi {
    //! Foreign function interface binding for the diff kernel.
    //!
    //! Every buffer returned by this module is allocated by this library's global allocator. Release it exactly once
    //! with the matching `yume_imgdiff_*_free` function, never with the host's own allocator.
    //!
    //! Functions return [`YUME_IMGDIFF_OK`] on success and one of the `YUME_IMGDIFF_ERR_*` codes otherwise,
    //! in which case nothing is written to the output location.
    use core::{mem::ManuallyDrop, ptr::NonNull};
    use std::sync::LazyLock;

    use generic_array::typenum::Unsigned;

    use super::*;
    use crate::kernel::{SmartKernelConcreteType, smart_kernel_impl};

    static SMART_KERNEL: LazyLock<SmartKernelConcreteType> = LazyLock::new(smart_kernel_impl);

    type Lanes = <SmartKernelConcreteType as Kernel>::Lanes;

    /// The call succeeded.
    pub const YUME_IMGDIFF_OK: i32 = 0;
    /// The two images do not share width, height and row stride, or a planar image has the wrong padding.
    pub const YUME_IMGDIFF_ERR_DIMENSION_MISMATCH: i32 = 1;
    /// The images have no pixels.
    pub const YUME_IMGDIFF_ERR_EMPTY_IMAGE: i32 = 2;
    /// Pixel storage could not be allocated.
    pub const YUME_IMGDIFF_ERR_ALLOCATION: i32 = 3;
    /// An interleaved buffer has the wrong length.
    pub const YUME_IMGDIFF_ERR_BUFFER_LENGTH: i32 = 4;
    /// A planar channel pointer is not aligned to 64 bytes.
    pub const YUME_IMGDIFF_ERR_MISALIGNED: i32 = 5;
    /// An enumerated argument (overlay type, channel order) has an unknown value.
    pub const YUME_IMGDIFF_ERR_INVALID_ARGUMENT: i32 = 6;
    /// Two planar images share memory without being the same image.
    pub const YUME_IMGDIFF_ERR_OVERLAPPING_IMAGES: i32 = 7;
    /// A required pointer was NULL.
    pub const YUME_IMGDIFF_ERR_NULL_POINTER: i32 = -1;

    fn status_of(err: &DiffError) -> i32 {
        match err {
            DiffError::DimensionMismatch { .. } => YUME_IMGDIFF_ERR_DIMENSION_MISMATCH,
            DiffError::EmptyImage => YUME_IMGDIFF_ERR_EMPTY_IMAGE,
            DiffError::Allocation { .. } => YUME_IMGDIFF_ERR_ALLOCATION,
            DiffError::BufferLength { .. } => YUME_IMGDIFF_ERR_BUFFER_LENGTH,
        }
    }

    /// A planar float image. Channel planes hold `(width + padding_columns) * height` values each.
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FfiPlanarImage {
        /// Width in pixels.
        pub width: usize,
        /// Height in pixels.
        pub height: usize,
        /// Zero filler values after each row, see [`yume_imgdiff_lanes`].
        pub padding_columns: usize,
        /// Red plane, 64-byte aligned.
        pub red: *mut f32,
        /// Green plane, 64-byte aligned.
        pub green: *mut f32,
        /// Blue plane, 64-byte aligned.
        pub blue: *mut f32,
        /// Alpha plane, 64-byte aligned.
        pub alpha: *mut f32,
    }

    impl FfiPlanarImage {
        fn from_planar(image: PlanarBuffer<Lanes>) -> Self {
            let padding_columns = image.padding_columns();
            let ([red, green, blue, alpha], width, height) = image.into_raw_parts();
            Self {
                width,
                height,
                padding_columns,
                red: red.as_ptr(),
                green: green.as_ptr(),
                blue: blue.as_ptr(),
                alpha: alpha.as_ptr(),
            }
        }

        fn planes(&self) -> Option<[NonNull<f32>; 4]> {
            Some([
                NonNull::new(self.red)?,
                NonNull::new(self.green)?,
                NonNull::new(self.blue)?,
                NonNull::new(self.alpha)?,
            ])
        }

        /// Check the descriptor against the layout this library expects.
        fn validate(&self) -> Result<[NonNull<f32>; 4], i32> {
            let planes = self.planes().ok_or(YUME_IMGDIFF_ERR_NULL_POINTER)?;

            if self.width == 0 || self.height == 0 {
                return Err(YUME_IMGDIFF_ERR_EMPTY_IMAGE);
            }
            if self.padding_columns != PlanarBuffer::<Lanes>::padding_for(self.width) {
                return Err(YUME_IMGDIFF_ERR_DIMENSION_MISMATCH);
            }
            if planes
                .iter()
                .any(|p| p.as_ptr().align_offset(alignment::BUFFER_ALIGNMENT) != 0)
            {
                return Err(YUME_IMGDIFF_ERR_MISALIGNED);
            }

            Ok(planes)
        }

        /// Address ranges of the four planes, in bytes.
        fn plane_spans(&self) -> [core::ops::Range<usize>; 4] {
            let len = (self.width.saturating_add(self.padding_columns))
                .saturating_mul(self.height)
                .saturating_mul(size_of::<f32>());
            [self.red, self.green, self.blue, self.alpha].map(|p| p.addr()..p.addr().saturating_add(len))
        }

        fn overlaps(&self, other: &Self) -> bool {
            let theirs = other.plane_spans();
            self.plane_spans()
                .iter()
                .any(|a| theirs.iter().any(|b| a.start < b.end && b.start < a.end))
        }

        /// Borrow the host image as a buffer that must never be dropped.
        ///
        /// # Safety
        ///
        /// The planes must be valid for reads and writes of the full padded size.
        unsafe fn borrow(&self) -> Result<ManuallyDrop<PlanarBuffer<Lanes>>, i32> {
            let planes = self.validate()?;

            // SAFETY: layout and alignment were checked by `validate`, validity is forwarded to the caller,
            // and the buffer is never dropped so ownership stays with the host.
            Ok(ManuallyDrop::new(unsafe {
                PlanarBuffer::from_raw_parts(planes, self.width, self.height)
            }))
        }
    }

    /// An interleaved 8-bit image.
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FfiImage {
        /// Width in pixels.
        pub width: usize,
        /// Height in pixels.
        pub height: usize,
        /// `width * height * 4` bytes.
        pub data: *mut u8,
        /// Length of `data` in bytes.
        pub len: usize,
    }

    /// Comparison options, see [`DiffOptions`].
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FfiDiffOptions {
        /// Color used to render dissimilar pixels, in RGBA order.
        pub error_color: Rgba8,
        /// Euclidean RGBA distance at or below which two pixels are similar.
        pub tolerance: f32,
        /// Base blend weight toward the error color.
        pub overlay_transparency: f32,
        /// 0 for flat, 1 for movement.
        pub overlay_type: u32,
        /// Non-zero to scale the blend weight by the pixel distance.
        pub weight_by_diff_percentage: u8,
        /// Non-zero to greyscale both inputs (in place for planar inputs) first.
        pub ignore_color: u8,
    }

    impl TryFrom<&FfiDiffOptions> for DiffOptions {
        type Error = i32;

        fn try_from(options: &FfiDiffOptions) -> Result<Self, Self::Error> {
            let overlay_type = match options.overlay_type {
                v if v == OverlayType::Flat as u32 => OverlayType::Flat,
                v if v == OverlayType::Movement as u32 => OverlayType::Movement,
                _ => return Err(YUME_IMGDIFF_ERR_INVALID_ARGUMENT),
            };

            Ok(Self {
                error_color: options.error_color,
                tolerance: options.tolerance,
                overlay_transparency: options.overlay_transparency,
                overlay_type,
                weight_by_diff_percentage: options.weight_by_diff_percentage != 0,
                ignore_color: options.ignore_color != 0,
            })
        }
    }

    fn parse_channel_order(value: u32) -> Result<ChannelOrder, i32> {
        match value {
            0 => Ok(ChannelOrder::Rgba),
            1 => Ok(ChannelOrder::Bgra),
            _ => Err(YUME_IMGDIFF_ERR_INVALID_ARGUMENT),
        }
    }

    /// Result of [`yume_imgdiff_diff`].
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FfiDiffResult {
        /// The rendered diff, release with [`yume_imgdiff_planar_free`].
        pub image: FfiPlanarImage,
        /// Fraction of pixels classified similar.
        pub similarity: f32,
        /// Number of pixels classified dissimilar.
        pub dissimilar_pixels: usize,
    }

    /// Result of [`yume_imgdiff_diff_bytes`].
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FfiInterleavedDiffResult {
        /// The rendered diff in the input channel order, release with [`yume_imgdiff_image_free`].
        pub image: FfiImage,
        /// Fraction of pixels classified similar.
        pub similarity: f32,
        /// Number of pixels classified dissimilar.
        pub dissimilar_pixels: usize,
    }

    #[unsafe(export_name = "yume_imgdiff_lanes")]
    /// The lane width planar images must be padded to.
    pub extern "C" fn lanes() -> usize {
        Lanes::USIZE
    }

    #[unsafe(export_name = "yume_imgdiff_planar_alloc")]
    /// Allocate a zeroed planar image with the padding this library expects.
    ///
    /// # Safety
    ///
    /// `out` must be NULL or valid for writes.
    pub unsafe extern "C" fn planar_alloc(width: usize, height: usize, out: *mut FfiPlanarImage) -> i32 {
        if out.is_null() {
            return YUME_IMGDIFF_ERR_NULL_POINTER;
        }

        match PlanarBuffer::<Lanes>::new(width, height) {
            Ok(image) => {
                // SAFETY: checked for NULL, validity forwarded to the caller.
                unsafe { out.write(FfiPlanarImage::from_planar(image)) };
                YUME_IMGDIFF_OK
            }
            Err(err) => status_of(&err.into()),
        }
    }

    #[unsafe(export_name = "yume_imgdiff_planar_free")]
    /// Release a planar image returned by this library and reset its pointers to NULL.
    ///
    /// # Safety
    ///
    /// `image` must be NULL or point to an image returned by [`planar_alloc`] or [`diff`] that was not released yet.
    pub unsafe extern "C" fn planar_free(image: *mut FfiPlanarImage) {
        // SAFETY: validity forwarded to the caller.
        let Some(image) = (unsafe { image.as_mut() }) else {
            return;
        };

        if let Some(planes) = image.planes() {
            // SAFETY: the planes were released by `into_raw_parts` with the same lane width and size.
            drop(unsafe { PlanarBuffer::<Lanes>::from_raw_parts(planes, image.width, image.height) });
        }

        image.red = core::ptr::null_mut();
        image.green = core::ptr::null_mut();
        image.blue = core::ptr::null_mut();
        image.alpha = core::ptr::null_mut();
    }

    #[unsafe(export_name = "yume_imgdiff_diff")]
    /// Compare two planar float images using [`kernel::smart_kernel`].
    ///
    /// When `ignore_color` is set both inputs are converted to greyscale in place.
    ///
    /// # Safety
    ///
    /// - `left` and `right` must point to images laid out as by [`planar_alloc`], valid for reads and writes. They may be
    ///   the same image, in which case both descriptors must agree; any other sharing of memory is rejected.
    /// - `options` must point to valid options.
    /// - `out` must be valid for writes; on success it owns a new image the caller must release with [`planar_free`].
    pub unsafe extern "C" fn diff(
        left: *mut FfiPlanarImage,
        right: *mut FfiPlanarImage,
        options: *const FfiDiffOptions,
        out: *mut FfiDiffResult,
    ) -> i32 {
        // SAFETY: validity forwarded to the caller.
        let (Some(left), Some(right), Some(options)) =
            (unsafe { left.as_ref() }, unsafe { right.as_ref() }, unsafe { options.as_ref() })
        else {
            return YUME_IMGDIFF_ERR_NULL_POINTER;
        };
        if out.is_null() {
            return YUME_IMGDIFF_ERR_NULL_POINTER;
        }

        let options = match DiffOptions::try_from(options) {
            Ok(options) => options,
            Err(status) => return status,
        };
        let (left_planes, right_planes) = match (left.validate(), right.validate()) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(status), _) | (_, Err(status)) => return status,
        };
        if left.width != right.width || left.height != right.height {
            return YUME_IMGDIFF_ERR_DIMENSION_MISMATCH;
        }
        let same_image = left_planes == right_planes;
        if !same_image && left.overlaps(right) {
            return YUME_IMGDIFF_ERR_OVERLAPPING_IMAGES;
        }

        // SAFETY: forwarded to the caller.
        let mut left_buf = match unsafe { left.borrow() } {
            Ok(buf) => buf,
            Err(status) => return status,
        };
        let mut kernel = *SMART_KERNEL;

        let result = if same_image {
            // the same planes cannot be borrowed mutably twice
            match left_buf.try_clone() {
                Ok(mut right_buf) => super::diff(&mut kernel, &mut *left_buf, &mut right_buf, &options),
                Err(err) => Err(err.into()),
            }
        } else {
            // SAFETY: forwarded to the caller.
            let mut right_buf = match unsafe { right.borrow() } {
                Ok(buf) => buf,
                Err(status) => return status,
            };
            super::diff(&mut kernel, &mut *left_buf, &mut *right_buf, &options)
        };

        match result {
            Ok(result) => {
                // SAFETY: checked for NULL, validity forwarded to the caller.
                unsafe {
                    out.write(FfiDiffResult {
                        image: FfiPlanarImage::from_planar(result.image),
                        similarity: result.similarity,
                        dissimilar_pixels: result.dissimilar_pixels,
                    });
                }
                YUME_IMGDIFF_OK
            }
            Err(err) => status_of(&err),
        }
    }

    #[unsafe(export_name = "yume_imgdiff_diff_bytes")]
    /// Compare two interleaved 8-bit images using [`kernel::smart_kernel`].
    ///
    /// `channel_order` is 0 for RGBA and 1 for BGRA (the in-memory order of a 32-bit ARGB bitmap on little-endian hosts),
    /// anything else is rejected with [`YUME_IMGDIFF_ERR_INVALID_ARGUMENT`]. The rendered diff uses the same order.
    ///
    /// # Safety
    ///
    /// - `left` and `right` must be valid for reads of `width * height * 4` bytes.
    /// - `options` must point to valid options.
    /// - `out` must be valid for writes; on success it owns a new image the caller must release with [`image_free`].
    pub unsafe extern "C" fn diff_bytes(
        left: *const u8,
        right: *const u8,
        width: usize,
        height: usize,
        channel_order: u32,
        options: *const FfiDiffOptions,
        out: *mut FfiInterleavedDiffResult,
    ) -> i32 {
        // SAFETY: validity forwarded to the caller.
        let Some(options) = (unsafe { options.as_ref() }) else {
            return YUME_IMGDIFF_ERR_NULL_POINTER;
        };
        if left.is_null() || right.is_null() || out.is_null() {
            return YUME_IMGDIFF_ERR_NULL_POINTER;
        }
        let (order, options) = match (parse_channel_order(channel_order), DiffOptions::try_from(options)) {
            (Ok(order), Ok(options)) => (order, options),
            (Err(status), _) | (_, Err(status)) => return status,
        };
        let Some(len) = planar::interleaved_len(width, height) else {
            return YUME_IMGDIFF_ERR_BUFFER_LENGTH;
        };

        // SAFETY: forwarded to the caller.
        let (left, right) = unsafe {
            (
                core::slice::from_raw_parts(left, len),
                core::slice::from_raw_parts(right, len),
            )
        };

        let mut kernel = *SMART_KERNEL;
        match diff_interleaved8(
            &mut kernel,
            left,
            right,
            width,
            height,
            order,
            &options,
        ) {
            Ok(result) => {
                let data = Box::into_raw(result.image.into_boxed_slice());
                // SAFETY: checked for NULL, validity forwarded to the caller.
                unsafe {
                    out.write(FfiInterleavedDiffResult {
                        image: FfiImage {
                            width,
                            height,
                            data: data.cast::<u8>(),
                            len,
                        },
                        similarity: result.similarity,
                        dissimilar_pixels: result.dissimilar_pixels,
                    });
                }
                YUME_IMGDIFF_OK
            }
            Err(err) => status_of(&err),
        }
    }

    #[unsafe(export_name = "yume_imgdiff_image_free")]
    /// Release an interleaved image returned by this library and reset its pointer to NULL.
    ///
    /// # Safety
    ///
    /// `image` must be NULL or point to an image returned by [`diff_bytes`] that was not released yet.
    pub unsafe extern "C" fn image_free(image: *mut FfiImage) {
        // SAFETY: validity forwarded to the caller.
        let Some(image) = (unsafe { image.as_mut() }) else {
            return;
        };

        if !image.data.is_null() {
            // SAFETY: the data was released by `Box::into_raw` with this length.
            drop(unsafe {
                Box::from_raw(core::ptr::slice_from_raw_parts_mut(image.data, image.len))
            });
        }

        image.data = core::ptr::null_mut();
        image.len = 0;
    }

}

/// The outcome of [`diff`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult<L: kernel::type_traits::SupportedLanes = generic_array::typenum::U8> {
    /// The rendered diff, same layout as the inputs.
    pub image: PlanarBuffer<L>,
    /// Fraction of real pixels classified similar, in `[0, 1]`.
    pub similarity: f32,
    /// Number of real pixels classified dissimilar.
    pub dissimilar_pixels: usize,
}

/// The outcome of [`diff_interleaved8`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedDiffResult {
    /// The rendered diff as interleaved bytes in the input channel order.
    pub image: Vec<u8>,
    /// Fraction of pixels classified similar, in `[0, 1]`.
    pub similarity: f32,
    /// Number of pixels classified dissimilar.
    pub dissimilar_pixels: usize,
}

/// Derive the similarity score from a dissimilar pixel count: `1 - dissimilar / real_pixels`.
///
/// Counts above `real_pixels` saturate to a score of 0.
///
/// # Errors
///
/// Returns [`DiffError::EmptyImage`] if `real_pixels` is zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "the ratio is computed in f64 and only rounded once"
)]
pub fn similarity(dissimilar: usize, real_pixels: usize) -> Result<f32, DiffError> {
    if real_pixels == 0 {
        return Err(DiffError::EmptyImage);
    }

    let ratio = dissimilar.min(real_pixels) as f64 / real_pixels as f64;
    Ok((1.0 - ratio) as f32)
}

/// Compare two planar images with the given kernel.
///
/// When [`DiffOptions::ignore_color`] is set both inputs are converted to greyscale in place first, which is why they
/// are borrowed mutably. A new output image is allocated for every call.
///
/// # TLDR how to use this contraption
///
/// ```rust
/// use yume_imgdiff::{DiffOptions, PlanarBuffer, smart_kernel};
///
/// let mut left = PlanarBuffer::from_fn(4, 4, |_, _| [1.0, 1.0, 1.0, 1.0]).unwrap();
/// let mut right = left.clone();
/// right.set_pixel(1, 2, [0.0, 0.0, 0.0, 1.0]);
///
/// // Get the optimal kernel for your CPU
/// let mut kernel = smart_kernel();
///
/// let result = yume_imgdiff::diff(&mut kernel, &mut left, &mut right, &DiffOptions::default()).unwrap();
/// assert_eq!(result.dissimilar_pixels, 1);
/// assert_eq!(result.similarity, 15.0 / 16.0);
/// assert_eq!(result.image.pixel(1, 2), [1.0, 0.0, 0.0, 1.0]);
/// ```
///
/// # Errors
///
/// - [`DiffError::DimensionMismatch`] if the inputs differ in width, height or stride.
/// - [`DiffError::EmptyImage`] if the inputs have no pixels.
/// - [`DiffError::Allocation`] if the output image cannot be allocated.
pub fn diff<K: Kernel>(
    kernel: &mut K,
    left: &mut PlanarBuffer<K::Lanes>,
    right: &mut PlanarBuffer<K::Lanes>,
    options: &DiffOptions,
) -> Result<DiffResult<K::Lanes>, DiffError>
where
    <K as Kernel>::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1>,
{
    if !left.same_layout(right) {
        return Err(DiffError::DimensionMismatch {
            left_width: left.width(),
            left_height: left.height(),
            left_stride: left.stride(),
            right_width: right.width(),
            right_height: right.height(),
            right_stride: right.stride(),
        });
    }

    let real_pixels = left.real_pixel_count();
    if real_pixels == 0 {
        return Err(DiffError::EmptyImage);
    }

    options.warn_out_of_range();

    if options.ignore_color {
        kernel.greyscale(left);
        kernel.greyscale(right);
    }

    let mut image = PlanarBuffer::new(left.width(), left.height())?;
    let params = DiffParams::new(options);

    let dissimilar_pixels = match (options.overlay_type, options.weight_by_diff_percentage) {
        (OverlayType::Flat, false) => {
            kernel.diff_planar::<false, false>(left, right, &params, &mut image)
        }
        (OverlayType::Flat, true) => {
            kernel.diff_planar::<false, true>(left, right, &params, &mut image)
        }
        (OverlayType::Movement, false) => {
            kernel.diff_planar::<true, false>(left, right, &params, &mut image)
        }
        (OverlayType::Movement, true) => {
            kernel.diff_planar::<true, true>(left, right, &params, &mut image)
        }
    };

    let similarity = similarity(dissimilar_pixels, real_pixels)?;

    log::debug!(
        "diff {}x{} with {}: {dissimilar_pixels} of {real_pixels} pixels dissimilar, similarity {similarity}",
        left.width(),
        left.height(),
        kernel.ident(),
    );

    Ok(DiffResult {
        image,
        similarity,
        dissimilar_pixels,
    })
}

/// Compare two interleaved 8-bit images with the given kernel.
///
/// Channels are normalized with `v / 255`, compared with [`diff`], and the rendered diff is converted back with
/// round-half-up in the same channel order.
///
/// # Errors
///
/// - [`DiffError::BufferLength`] if either input is not exactly `width * height * 4` bytes.
/// - Everything [`diff`] returns.
pub fn diff_interleaved8<K: Kernel>(
    kernel: &mut K,
    left: &[u8],
    right: &[u8],
    width: usize,
    height: usize,
    order: ChannelOrder,
    options: &DiffOptions,
) -> Result<InterleavedDiffResult, DiffError>
where
    <K as Kernel>::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1>,
{
    let mut left = PlanarBuffer::<K::Lanes>::from_interleaved8(width, height, left, order)?;
    let mut right = PlanarBuffer::<K::Lanes>::from_interleaved8(width, height, right, order)?;

    let result = diff(kernel, &mut left, &mut right, options)?;

    Ok(InterleavedDiffResult {
        image: result.image.to_interleaved8(order)?,
        similarity: result.similarity,
        dissimilar_pixels: result.dissimilar_pixels,
    })
}

#[cfg(test)]
mod tests {
    use generic_array::typenum::{U1, U8};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::kernel::{
        DefaultKernel, ReferenceKernel,
        tests::{TEST_SIZES, perturbed_image, random_image},
    };

    fn option_grid() -> Vec<DiffOptions> {
        let mut out = Vec::new();
        for overlay_type in [OverlayType::Flat, OverlayType::Movement] {
            for weight_by_diff_percentage in [false, true] {
                for (error_color, tolerance, overlay_transparency) in [
                    (Rgba8::RED, 0.0, 1.0),
                    (Rgba8::new(0, 255, 0, 128), 0.2, 0.5),
                    (Rgba8::new(12, 34, 56, 0), 1.5, 0.0),
                ] {
                    out.push(DiffOptions {
                        error_color,
                        tolerance,
                        overlay_transparency,
                        overlay_type,
                        weight_by_diff_percentage,
                        ignore_color: false,
                    });
                }
            }
        }
        out
    }

    fn solid(width: usize, height: usize, rgba: [f32; 4]) -> PlanarBuffer<U8> {
        PlanarBuffer::from_fn(width, height, |_, _| rgba).unwrap()
    }

    fn test_identity_impl<K: Kernel<Lanes = U8>>(kernel: &mut K)
    where
        K::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1>,
    {
        let mut rng = StdRng::seed_from_u64(1);
        for (width, height) in TEST_SIZES {
            let image = random_image::<U8>(&mut rng, width, height);
            for options in option_grid() {
                let mut left = image.clone();
                let mut right = image.clone();
                let result = diff(kernel, &mut left, &mut right, &options).unwrap();
                assert_eq!(result.similarity, 1.0, "{options:?}");
                assert_eq!(result.dissimilar_pixels, 0);
                assert_eq!(result.image, image, "{options:?}");
            }

            // with ignore_color the output is the greyscaled input
            let options = DiffOptions {
                ignore_color: true,
                ..Default::default()
            };
            let mut left = image.clone();
            let mut right = image.clone();
            let result = diff(kernel, &mut left, &mut right, &options).unwrap();
            assert_eq!(result.similarity, 1.0);
            let mut grey = image.clone();
            kernel.greyscale(&mut grey);
            assert_eq!(result.image, grey);
            assert_eq!(left, grey);
        }
    }

    fn test_scenarios_impl<K: Kernel<Lanes = U8>>(kernel: &mut K)
    where
        K::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1>,
    {
        let white = solid(4, 4, [1.0; 4]);
        let black = solid(4, 4, [0.0, 0.0, 0.0, 1.0]);
        let options = DiffOptions {
            tolerance: 0.2,
            ..Default::default()
        };

        // boundary
        let result = diff(kernel, &mut white.clone(), &mut white.clone(), &options).unwrap();
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.image, white);

        // divergence
        let result = diff(kernel, &mut white.clone(), &mut black.clone(), &options).unwrap();
        assert_eq!(result.similarity, 0.0);
        assert_eq!(result.dissimilar_pixels, 16);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(result.image.pixel(x, y), [1.0, 0.0, 0.0, 1.0]);
            }
        }

        // movement forces opacity whatever the error color and blend weight
        for overlay_transparency in [1.0, 0.3, 0.0] {
            let options = DiffOptions {
                error_color: Rgba8::new(255, 0, 0, 64),
                tolerance: 0.2,
                overlay_transparency,
                overlay_type: OverlayType::Movement,
                ..Default::default()
            };
            let result = diff(kernel, &mut white.clone(), &mut black.clone(), &options).unwrap();
            assert_eq!(result.similarity, 0.0);
            for plane_value in result.image.channel(Channel::Alpha).chunks_exact(8) {
                assert_eq!(&plane_value[..4], &[1.0; 4]);
            }
        }
    }

    fn test_monotonicity_impl<K: Kernel<Lanes = U8>>(kernel: &mut K)
    where
        K::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1>,
    {
        let mut rng = StdRng::seed_from_u64(2);
        let left = random_image::<U8>(&mut rng, 23, 11);
        let right = random_image::<U8>(&mut rng, 23, 11);

        let mut last = 0.0;
        for step in 0..=40 {
            let options = DiffOptions {
                tolerance: step as f32 * 0.05,
                weight_by_diff_percentage: step % 2 == 0,
                ..Default::default()
            };
            let result = diff(kernel, &mut left.clone(), &mut right.clone(), &options).unwrap();
            assert!(
                result.similarity >= last,
                "similarity dropped from {last} to {} at tolerance {}",
                result.similarity,
                options.tolerance
            );
            last = result.similarity;
        }
        // the largest RGBA distance is 2
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_identity() {
        test_identity_impl(&mut DefaultKernel::<U8>::new());
        test_identity_impl(&mut smart_kernel());
    }

    #[test]
    fn test_scenarios() {
        test_scenarios_impl(&mut DefaultKernel::<U8>::new());
        test_scenarios_impl(&mut ReferenceKernel::<f32, U8>::default());
        test_scenarios_impl(&mut smart_kernel());
    }

    #[test]
    fn test_tolerance_monotonicity() {
        test_monotonicity_impl(&mut DefaultKernel::<U8>::new());
        test_monotonicity_impl(&mut smart_kernel());
    }

    #[test]
    fn test_padding_invisibility() {
        let mut rng = StdRng::seed_from_u64(3);
        for (width, height) in TEST_SIZES {
            let padded = random_image::<U8>(&mut rng, width, height);
            let right_padded = perturbed_image(&mut rng, &padded);

            let unpadded =
                PlanarBuffer::<U1>::from_fn(width, height, |x, y| padded.pixel(x, y)).unwrap();
            let right_unpadded =
                PlanarBuffer::<U1>::from_fn(width, height, |x, y| right_padded.pixel(x, y)).unwrap();
            assert_eq!(unpadded.padding_columns(), 0);

            for options in option_grid() {
                let a = diff(
                    &mut DefaultKernel::<U8>::new(),
                    &mut padded.clone(),
                    &mut right_padded.clone(),
                    &options,
                )
                .unwrap();
                let b = diff(
                    &mut DefaultKernel::<U1>::new(),
                    &mut unpadded.clone(),
                    &mut right_unpadded.clone(),
                    &options,
                )
                .unwrap();
                assert_eq!(a.dissimilar_pixels, b.dissimilar_pixels, "{options:?}");
                assert_eq!(a.similarity, b.similarity, "{options:?}");
            }
        }
    }

    #[test]
    fn test_interleaved_round_trip() {
        let mut rng = StdRng::seed_from_u64(4);
        let bytes: Vec<u8> = (0..13 * 7 * 4).map(|_| rng.random()).collect();

        for order in [ChannelOrder::Rgba, ChannelOrder::Bgra] {
            let result = diff_interleaved8(
                &mut smart_kernel(),
                &bytes,
                &bytes,
                13,
                7,
                order,
                &DiffOptions::default(),
            )
            .unwrap();
            assert_eq!(result.similarity, 1.0);
            assert_eq!(result.image, bytes);
        }
    }

    #[test]
    fn test_interleaved_divergence() {
        let left = [255u8; 4 * 4 * 4];
        let right = [0u8, 0, 0, 255].repeat(16);
        let options = DiffOptions {
            error_color: Rgba8::new(0, 0, 255, 255),
            tolerance: 0.2,
            ..Default::default()
        };

        let result = diff_interleaved8(
            &mut DefaultKernel::<U8>::new(),
            &left,
            &right,
            4,
            4,
            ChannelOrder::Rgba,
            &options,
        )
        .unwrap();
        assert_eq!(result.similarity, 0.0);
        assert_eq!(result.image, [0u8, 0, 255, 255].repeat(16));
    }

    #[test]
    fn test_errors() {
        let mut kernel = DefaultKernel::<U8>::new();

        let err = diff(
            &mut kernel,
            &mut solid(4, 4, [0.0; 4]),
            &mut solid(5, 4, [0.0; 4]),
            &DiffOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DiffError::DimensionMismatch {
                left_width: 4,
                left_height: 4,
                left_stride: 8,
                right_width: 5,
                right_height: 4,
                right_stride: 8,
            }
        );

        let err = diff(
            &mut kernel,
            &mut solid(0, 4, [0.0; 4]),
            &mut solid(0, 4, [0.0; 4]),
            &DiffOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, DiffError::EmptyImage);

        let err = diff_interleaved8(
            &mut kernel,
            &[0; 16],
            &[0; 12],
            2,
            2,
            ChannelOrder::Rgba,
            &DiffOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DiffError::BufferLength { actual: 12, .. }));
    }

    #[test]
    fn test_similarity_score() {
        assert_eq!(similarity(0, 10), Ok(1.0));
        assert_eq!(similarity(10, 10), Ok(0.0));
        assert_eq!(similarity(5, 10), Ok(0.5));
        assert_eq!(similarity(11, 10), Ok(0.0));
        assert_eq!(similarity(0, 0), Err(DiffError::EmptyImage));
    }
}
