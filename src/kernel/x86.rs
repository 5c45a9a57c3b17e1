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

use core::{
    arch::x86_64::*,
    fmt::{Debug, Display},
};

use generic_array::typenum::{B1, U8};

use super::{
    DiffParams, Kernel, assert_same_layout,
    constants::{LUMA_BLUE, LUMA_RED},
    type_traits::{EvaluateHardwareFeature, kernel_sealing::KernelSealed},
};
use crate::PlanarBuffer;

cpufeatures::new!(cpuid_avx2_fma, "avx2", "fma");

/// Runtime requirement of [`Avx2F32Kernel`]: AVX2 and FMA.
pub struct CpuIdAvx2Fma {
    _private: (),
}

impl KernelSealed for CpuIdAvx2Fma {}

impl EvaluateHardwareFeature for CpuIdAvx2Fma {
    type EnabledStatic = B1;
    #[cfg(all(target_feature = "avx2", target_feature = "fma"))]
    type MustCheck = generic_array::typenum::B0;
    #[cfg(not(all(target_feature = "avx2", target_feature = "fma")))]
    type MustCheck = B1;
    type Name = &'static str;

    fn name() -> Self::Name {
        "avx2+fma"
    }

    fn met_runtime() -> bool {
        cpuid_avx2_fma::get()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
/// Identification token for the AVX2 kernel.
pub struct Avx2F32KernelIdent {
    _private: (),
}

impl Debug for Avx2F32KernelIdent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Avx2F32<f32x8>")
    }
}

impl Display for Avx2F32KernelIdent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("avx2 (hand-written intrinsics)")
    }
}

/// Compute kernel using hand-written AVX2 and FMA intrinsics, 8 pixels per step.
///
/// Planes are read with aligned loads, similar and dissimilar results are both computed for every lane and merged with
/// a mask blend, and the dissimilar count is taken from the mask bits.
///
/// Note: This would produce a slightly different rendered color than the default kernel due to fused multiply-add,
/// generally within a few ulps. Classification is identical except for distances within an ulp of the tolerance.
#[derive(Debug, Clone, Copy)]
pub struct Avx2F32Kernel {
    _private: (),
}

impl Avx2F32Kernel {
    /// Create the kernel if the running CPU supports AVX2 and FMA.
    #[must_use]
    pub fn new() -> Option<Self> {
        CpuIdAvx2Fma::met_runtime().then_some(Self { _private: () })
    }

    /// Create the kernel without checking the CPU.
    ///
    /// # Safety
    ///
    /// The kernel must not be used unless the running CPU supports AVX2 and FMA.
    #[must_use]
    pub const unsafe fn new_unchecked() -> Self {
        Self { _private: () }
    }
}

impl Kernel for Avx2F32Kernel {
    type Lanes = U8;
    type RequiredHardwareFeature = CpuIdAvx2Fma;
    type Ident = Avx2F32KernelIdent;

    fn ident(&self) -> Self::Ident {
        Avx2F32KernelIdent { _private: () }
    }

    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>) {
        // SAFETY: the kernel only exists on a CPU with AVX2 and FMA, planes are 64-byte aligned with a length that is a multiple of 8.
        unsafe { greyscale_avx2(image) }
    }

    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize {
        assert_same_layout(left, right, output);

        // SAFETY: as above, and all three buffers share one layout.
        unsafe { diff_avx2::<MOVEMENT, WEIGHTED>(left, right, params, output) }
    }
}

#[target_feature(enable = "avx2,fma")]
unsafe fn greyscale_avx2(image: &mut PlanarBuffer<U8>) {
    let [r, g, b, _] = image.channels_mut();
    let len = r.len();
    debug_assert_eq!(len % 8, 0);

    unsafe {
        let kr = _mm256_set1_ps(LUMA_RED);
        let kb = _mm256_set1_ps(LUMA_BLUE);

        for i in (0..len).step_by(8) {
            let vr = _mm256_load_ps(r.as_ptr().add(i));
            let vg = _mm256_load_ps(g.as_ptr().add(i));
            let vb = _mm256_load_ps(b.as_ptr().add(i));

            let luma = _mm256_fmadd_ps(
                kb,
                _mm256_sub_ps(vb, vg),
                _mm256_fmadd_ps(kr, _mm256_sub_ps(vr, vg), vg),
            );

            _mm256_store_ps(r.as_mut_ptr().add(i), luma);
            _mm256_store_ps(g.as_mut_ptr().add(i), luma);
            _mm256_store_ps(b.as_mut_ptr().add(i), luma);
        }
    }
}

#[target_feature(enable = "avx2,fma")]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    reason = "lane counts and movemask results are at most 8 bits wide"
)]
unsafe fn diff_avx2<const MOVEMENT: bool, const WEIGHTED: bool>(
    left: &PlanarBuffer<U8>,
    right: &PlanarBuffer<U8>,
    params: &DiffParams,
    output: &mut PlanarBuffer<U8>,
) -> usize {
    let width = left.width();
    let stride = left.stride();
    let height = left.height();
    let [lr, lg, lb, la] = left.channels();
    let [rr, rg, rb, ra] = right.channels();
    let [or, og, ob, oa] = output.channels_mut();

    let mut dissimilar = 0usize;

    unsafe {
        let zero = _mm256_setzero_ps();
        let one = _mm256_set1_ps(1.0);
        let tolerance = _mm256_set1_ps(params.tolerance);
        let transparency = _mm256_set1_ps(params.overlay_transparency);
        let error = [
            _mm256_set1_ps(params.error[0]),
            _mm256_set1_ps(params.error[1]),
            _mm256_set1_ps(params.error[2]),
            _mm256_set1_ps(params.error[3]),
        ];
        let lane_index = _mm256_setr_epi32(0, 1, 2, 3, 4, 5, 6, 7);

        macro_rules! load {
            ($plane:expr, $i:expr) => {
                _mm256_load_ps($plane.as_ptr().add($i))
            };
        }

        for row in 0..height {
            for group in (0..stride).step_by(8) {
                let i = row * stride + group;
                let real_lanes = (width - group).min(8) as i32;
                let is_real = _mm256_castsi256_ps(_mm256_cmpgt_epi32(
                    _mm256_set1_epi32(real_lanes),
                    lane_index,
                ));

                let l = [load!(lr, i), load!(lg, i), load!(lb, i), load!(la, i)];
                let r = [load!(rr, i), load!(rg, i), load!(rb, i), load!(ra, i)];

                let d = [
                    _mm256_sub_ps(r[0], l[0]),
                    _mm256_sub_ps(r[1], l[1]),
                    _mm256_sub_ps(r[2], l[2]),
                    _mm256_sub_ps(r[3], l[3]),
                ];
                let mut sum = _mm256_mul_ps(d[0], d[0]);
                sum = _mm256_fmadd_ps(d[1], d[1], sum);
                sum = _mm256_fmadd_ps(d[2], d[2], sum);
                sum = _mm256_fmadd_ps(d[3], d[3], sum);
                let dist = _mm256_sqrt_ps(sum);

                let mut t = transparency;
                if WEIGHTED {
                    t = _mm256_mul_ps(t, dist);
                }
                // max with zero as the second operand so NaN becomes 0
                t = _mm256_min_ps(_mm256_max_ps(t, zero), one);
                let keep = _mm256_sub_ps(one, t);

                let similar = _mm256_cmp_ps::<_CMP_LE_OQ>(dist, tolerance);
                let is_dissimilar = _mm256_andnot_ps(similar, is_real);

                let mut out = [zero; 4];
                for c in 0..4 {
                    let candidate = if MOVEMENT {
                        _mm256_mul_ps(r[c], error[c])
                    } else {
                        r[c]
                    };
                    let rendered = _mm256_fmadd_ps(error[c], t, _mm256_mul_ps(candidate, keep));
                    out[c] = _mm256_blendv_ps(l[c], rendered, is_dissimilar);
                }
                if MOVEMENT {
                    out[3] = _mm256_blendv_ps(l[3], one, is_dissimilar);
                }

                _mm256_store_ps(or.as_mut_ptr().add(i), out[0]);
                _mm256_store_ps(og.as_mut_ptr().add(i), out[1]);
                _mm256_store_ps(ob.as_mut_ptr().add(i), out[2]);
                _mm256_store_ps(oa.as_mut_ptr().add(i), out[3]);

                dissimilar += (_mm256_movemask_ps(is_dissimilar) as u32).count_ones() as usize;
            }
        }
    }

    dissimilar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::{test_greyscale_impl, test_kernel_equivalence_impl};

    #[test]
    fn test_avx2_kernel_equivalence() {
        let Some(mut kernel) = Avx2F32Kernel::new() else {
            eprintln!("AVX2 or FMA not available, skipping");
            return;
        };

        test_kernel_equivalence_impl(&mut kernel);
        test_greyscale_impl(&mut kernel);
    }

    #[test]
    fn test_avx2_requirement_matches_detection() {
        assert_eq!(
            Avx2F32Kernel::new().is_some(),
            Avx2F32Kernel::required_hardware_features_met()
        );
        assert_eq!(CpuIdAvx2Fma::name(), "avx2+fma");
    }
}
