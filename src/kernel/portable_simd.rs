/*
 * Copyright (c) 2026 Yumechi <yume@yumechi.jp>
 *
 * Created on Wednesday, October 7, 2026
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

use core::fmt::{Debug, Display};
use core::simd::{LaneCount, Simd, cmp::SimdPartialOrd, num::SimdFloat};
use std::simd::StdFloat;

use generic_array::typenum::{U4, U8, U16};

use super::{
    DiffParams, Kernel, assert_same_layout,
    constants::{LUMA_BLUE, LUMA_RED},
    type_traits::{SupportedLanes, Term},
};
use crate::PlanarBuffer;

mod sealing {
    pub trait Sealed {}
}

type SimdPS<const N: usize> = Simd<f32, N>;

/// A private refinement trait of [`core::simd::SupportedLaneCount`] to further restrict the lane count supported.
pub trait SupportedLaneCount: core::simd::SupportedLaneCount + sealing::Sealed {
    /// The matching type-level lane width of the buffers.
    type Lanes: SupportedLanes;
}

macro_rules! supported_lane_count {
    ($($lanes:literal => $ty:ty),+) => {
        $(
            impl sealing::Sealed for LaneCount<$lanes> {}
            impl SupportedLaneCount for LaneCount<$lanes> {
                type Lanes = $ty;
            }
        )+
    };
}

// 128, 256, 512 bit registers
supported_lane_count!(4 => U4, 8 => U8, 16 => U16);

#[derive(Clone, Copy, PartialEq, Eq)]
/// Identification token for the portable SIMD kernel.
pub struct PortableSimdF32KernelIdent<const N: usize> {
    _private: (),
}

impl<const N: usize> Debug for PortableSimdF32KernelIdent<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PortableSimd<f32x{N}>")
    }
}

impl<const N: usize> Display for PortableSimdF32KernelIdent<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("portable-simd (guided vectorization)")
    }
}

/// A kernel based on the currently nightly portable SIMD API.
///
/// `N` is both the vector width and the lane width of the buffers it accepts.
#[derive(Clone, Copy, Default)]
pub struct PortableSimdF32Kernel<const N: usize>
where
    LaneCount<N>: SupportedLaneCount;

impl<const N: usize> Kernel for PortableSimdF32Kernel<N>
where
    LaneCount<N>: SupportedLaneCount,
{
    type Lanes = <LaneCount<N> as SupportedLaneCount>::Lanes;
    type RequiredHardwareFeature = Term;
    type Ident = PortableSimdF32KernelIdent<N>;

    fn ident(&self) -> Self::Ident {
        PortableSimdF32KernelIdent { _private: () }
    }

    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>) {
        let kr = SimdPS::<N>::splat(LUMA_RED);
        let kb = SimdPS::<N>::splat(LUMA_BLUE);
        let [r, g, b, _] = image.channels_mut();

        for ((r, g), b) in r
            .chunks_exact_mut(N)
            .zip(g.chunks_exact_mut(N))
            .zip(b.chunks_exact_mut(N))
        {
            let vr = SimdPS::<N>::from_slice(r);
            let vg = SimdPS::<N>::from_slice(g);
            let vb = SimdPS::<N>::from_slice(b);

            let luma = vg + kr * (vr - vg) + kb * (vb - vg);

            luma.copy_to_slice(r);
            luma.copy_to_slice(g);
            luma.copy_to_slice(b);
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        reason = "lane indices are at most 16"
    )]
    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize {
        assert_same_layout(left, right, output);

        let width = left.width();
        let stride = left.stride();
        let [lr, lg, lb, la] = left.channels();
        let [rr, rg, rb, ra] = right.channels();
        let [or, og, ob, oa] = output.channels_mut();

        let zero = SimdPS::<N>::splat(0.0);
        let one = SimdPS::<N>::splat(1.0);
        let tolerance = SimdPS::<N>::splat(params.tolerance);
        let transparency = SimdPS::<N>::splat(params.overlay_transparency);
        let error = params.error.map(SimdPS::<N>::splat);
        let lane_index = Simd::<i32, N>::from_array(core::array::from_fn(|i| i as i32));

        let mut dissimilar = 0;
        for row in 0..left.height() {
            for group in (0..stride).step_by(N) {
                let i = row * stride + group;
                let real_lanes = (width - group).min(N) as i32;
                let is_real = lane_index.simd_lt(Simd::splat(real_lanes));

                let load = |plane: &[f32]| SimdPS::<N>::from_slice(&plane[i..i + N]);
                let l = [load(lr), load(lg), load(lb), load(la)];
                let r = [load(rr), load(rg), load(rb), load(ra)];

                let d: [SimdPS<N>; 4] = core::array::from_fn(|c| r[c] - l[c]);
                let dist = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + d[3] * d[3]).sqrt();

                let mut t = transparency;
                if WEIGHTED {
                    t *= dist;
                }
                // simd_max returns the non-NaN operand
                let t = t.simd_max(zero).simd_min(one);

                let similar = dist.simd_le(tolerance);
                let is_dissimilar = !similar & is_real;

                let mut out: [SimdPS<N>; 4] = core::array::from_fn(|c| {
                    let candidate = if MOVEMENT { r[c] * error[c] } else { r[c] };
                    let rendered = candidate * (one - t) + error[c] * t;
                    is_dissimilar.select(rendered, l[c])
                });
                if MOVEMENT {
                    out[3] = is_dissimilar.select(one, l[3]);
                }

                out[0].copy_to_slice(&mut or[i..i + N]);
                out[1].copy_to_slice(&mut og[i..i + N]);
                out[2].copy_to_slice(&mut ob[i..i + N]);
                out[3].copy_to_slice(&mut oa[i..i + N]);

                dissimilar += is_dissimilar.to_bitmask().count_ones() as usize;
            }
        }

        dissimilar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::{test_greyscale_impl, test_kernel_equivalence_impl};

    #[test]
    fn test_portable_simd_kernel_equivalence() {
        test_kernel_equivalence_impl(&mut PortableSimdF32Kernel::<4>);
        test_kernel_equivalence_impl(&mut PortableSimdF32Kernel::<8>);
        test_kernel_equivalence_impl(&mut PortableSimdF32Kernel::<16>);
    }

    #[test]
    fn test_portable_simd_greyscale() {
        test_greyscale_impl(&mut PortableSimdF32Kernel::<8>);
        test_greyscale_impl(&mut PortableSimdF32Kernel::<16>);
    }

    #[test]
    fn test_portable_simd_ident() {
        let ident = PortableSimdF32Kernel::<16>.ident();
        assert_eq!(alloc::format!("{ident:?}"), "PortableSimd<f32x16>");
    }
}
