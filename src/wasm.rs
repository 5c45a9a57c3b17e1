/*
 * Copyright (c) 2026 Yumechi <yume@yumechi.jp>
 *
 * Created on Thursday, October 8, 2026
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

use alloc::string::{String, ToString};

use wasm_bindgen::prelude::*;

use crate::{
    ChannelOrder, DiffError, DiffOptions, OverlayType, PlanarBuffer, Rgba8,
    kernel::{Kernel, SmartKernelConcreteType},
};

fn to_js(err: DiffError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(js_name = YumeImgDiff)]
/// An image comparison instance for WASM.
///
/// Inputs are RGBA bytes as found in `ImageData.data`.
pub struct JsYumeImgDiff {
    kernel: SmartKernelConcreteType,
    options: DiffOptions,
    last_dissimilar_pixels: usize,
}

impl Default for JsYumeImgDiff {
    fn default() -> Self {
        Self {
            kernel: crate::smart_kernel(),
            options: DiffOptions::default(),
            last_dissimilar_pixels: 0,
        }
    }
}

#[wasm_bindgen(js_class = YumeImgDiff)]
impl JsYumeImgDiff {
    #[wasm_bindgen(constructor)]
    /// Create a new instance with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the identifier of the kernel.
    #[wasm_bindgen(getter)]
    pub fn kernel_ident(&self) -> String {
        self.kernel.ident().to_string()
    }

    /// Euclidean RGBA distance at or below which two pixels are similar.
    #[wasm_bindgen(setter)]
    pub fn set_tolerance(&mut self, tolerance: f32) {
        self.options.tolerance = tolerance;
    }

    /// Base blend weight toward the error color.
    #[wasm_bindgen(setter)]
    pub fn set_overlay_transparency(&mut self, transparency: f32) {
        self.options.overlay_transparency = transparency;
    }

    /// The error color as `0xRRGGBBAA`.
    #[wasm_bindgen(setter)]
    pub fn set_error_color(&mut self, rgba: u32) {
        self.options.error_color = Rgba8::from_rgba_u32(rgba);
    }

    /// Render dissimilar pixels with the movement overlay instead of the flat one.
    #[wasm_bindgen(setter)]
    pub fn set_movement(&mut self, movement: bool) {
        self.options.overlay_type = if movement {
            OverlayType::Movement
        } else {
            OverlayType::Flat
        };
    }

    /// Scale the blend weight by the pixel distance.
    #[wasm_bindgen(setter)]
    pub fn set_weight_by_diff(&mut self, weight: bool) {
        self.options.weight_by_diff_percentage = weight;
    }

    /// Compare greyscale versions of the images.
    #[wasm_bindgen(setter)]
    pub fn set_ignore_color(&mut self, ignore: bool) {
        self.options.ignore_color = ignore;
    }

    /// The number of dissimilar pixels found by the last comparison.
    #[wasm_bindgen(getter)]
    pub fn last_dissimilar_pixels(&self) -> usize {
        self.last_dissimilar_pixels
    }

    fn diff_planar(
        &mut self,
        left: &[u8],
        right: &[u8],
        width: usize,
        height: usize,
    ) -> Result<crate::DiffResult, JsValue> {
        let mut left = PlanarBuffer::from_interleaved8(width, height, left, ChannelOrder::Rgba)
            .map_err(to_js)?;
        let mut right = PlanarBuffer::from_interleaved8(width, height, right, ChannelOrder::Rgba)
            .map_err(to_js)?;

        let result =
            crate::diff(&mut self.kernel, &mut left, &mut right, &self.options).map_err(to_js)?;
        self.last_dissimilar_pixels = result.dissimilar_pixels;

        Ok(result)
    }

    #[wasm_bindgen]
    /// Compare two RGBA8 images and write the rendered diff to `output`.
    ///
    /// # Arguments
    ///
    /// - `left`, `right`: `width * height * 4` bytes each.
    /// - `output`: A buffer of the same size receiving the rendered diff.
    ///
    /// # Returns
    ///
    /// - `similarity`: The fraction of similar pixels.
    ///
    pub fn diff_rgba8(
        &mut self,
        left: &[u8],
        right: &[u8],
        width: usize,
        height: usize,
        output: &mut [u8],
    ) -> Result<f32, JsValue> {
        let result = self.diff_planar(left, right, width, height)?;

        result
            .image
            .write_interleaved8(output, ChannelOrder::Rgba)
            .map_err(to_js)?;

        Ok(result.similarity)
    }

    #[wasm_bindgen]
    /// Compare two RGBA8 images and return the rendered diff, ready for `new ImageData(diff, width)`.
    ///
    /// The similarity is not returned, derive it from [`Self::last_dissimilar_pixels`].
    pub fn diff_rgba8_image(
        &mut self,
        left: &[u8],
        right: &[u8],
        width: usize,
        height: usize,
    ) -> Result<js_sys::Uint8ClampedArray, JsValue> {
        let result = self.diff_planar(left, right, width, height)?;

        let bytes = result
            .image
            .to_interleaved8(ChannelOrder::Rgba)
            .map_err(to_js)?;
        let len = u32::try_from(bytes.len()).map_err(|_| JsValue::from_str("image is too large"))?;

        let array = js_sys::Uint8ClampedArray::new_with_length(len);
        array.copy_from(&bytes);

        Ok(array)
    }

    #[wasm_bindgen(js_name = dispose)]
    /// Dispose of the instance.
    pub fn dispose(self) {
        drop(self);
    }
}
