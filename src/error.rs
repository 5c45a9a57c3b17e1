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

use crate::alignment::AllocationError;

/// Errors reported by the diff entry points.
///
/// The kernel arithmetic itself is total, so everything here is either a caller contract violation or resource exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The two operands do not share width, height and row stride.
    #[error(
        "dimension mismatch: {left_width}x{left_height} (stride {left_stride}) vs {right_width}x{right_height} (stride {right_stride})"
    )]
    DimensionMismatch {
        /// Width of the left operand.
        left_width: usize,
        /// Height of the left operand.
        left_height: usize,
        /// Row stride of the left operand, padding included.
        left_stride: usize,
        /// Width of the right operand.
        right_width: usize,
        /// Height of the right operand.
        right_height: usize,
        /// Row stride of the right operand, padding included.
        right_stride: usize,
    },

    /// The operands have no real pixels, so no similarity can be defined.
    #[error("image has no pixels")]
    EmptyImage,

    /// Pixel storage could not be allocated.
    #[error("failed to allocate {bytes} bytes of pixel storage")]
    Allocation {
        /// The requested allocation size, saturated at `usize::MAX` when the size itself overflowed.
        bytes: usize,
    },

    /// An interleaved byte buffer does not hold exactly `width * height * 4` bytes.
    #[error("interleaved buffer holds {actual} bytes, a {width}x{height} RGBA image needs {expected}")]
    BufferLength {
        /// Image width in pixels.
        width: usize,
        /// Image height in pixels.
        height: usize,
        /// The required buffer length in bytes.
        expected: usize,
        /// The buffer length that was supplied.
        actual: usize,
    },
}

impl From<AllocationError> for DiffError {
    fn from(err: AllocationError) -> Self {
        DiffError::Allocation { bytes: err.bytes }
    }
}
