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

use core::{
    fmt::{Debug, Display},
    marker::PhantomData,
};

use generic_array::typenum::U8;
use num_traits::Float;
#[cfg(any(feature = "std", test))]
use num_traits::AsPrimitive;

pub use generic_array;

use crate::{DiffOptions, PlanarBuffer};
use type_traits::{EvaluateHardwareFeature, SupportedLanes, Term};

/// Kernels using hand-written x86 intrinsics.
#[cfg(target_arch = "x86_64")]
pub mod x86;

/// Kernels using the nightly portable SIMD API.
#[cfg(feature = "portable-simd")]
pub mod portable_simd;

/// Static and runtime kernel composition.
pub mod router;

/// Type level plumbing for kernel requirements and lane widths.
pub mod type_traits;

/// Numeric constants shared by all kernels.
pub mod constants;

use constants::{LUMA_BLUE, LUMA_RED};

/// The per-call parameters of [`Kernel::diff_planar`], in kernel-ready form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffParams {
    /// The error color as `[r, g, b, a]` in `[0, 1]`.
    pub error: [f32; 4],
    /// Distances at or below this are similar.
    pub tolerance: f32,
    /// Base blend weight toward the error color.
    pub overlay_transparency: f32,
}

impl DiffParams {
    /// Normalize the numeric parts of [`DiffOptions`].
    ///
    /// The overlay type and weighting are selected through the const parameters of [`Kernel::diff_planar`] instead.
    #[must_use]
    pub fn new(options: &DiffOptions) -> Self {
        Self {
            error: options.error_color.to_unit(),
            tolerance: options.tolerance,
            overlay_transparency: options.overlay_transparency,
        }
    }
}

impl From<&DiffOptions> for DiffParams {
    fn from(options: &DiffOptions) -> Self {
        Self::new(options)
    }
}

/// Compute kernel for the greyscale and diff passes.
///
/// Every kernel produces the same classification for the same input; rendered colors may differ
/// in the last few ulps because of fused multiply-add. A scalar (auto-vectorized) implementation is provided in [`DefaultKernel`].
pub trait Kernel {
    /// Lane width the kernel processes per step, which fixes the row padding of the buffers it accepts.
    type Lanes: SupportedLanes;

    /// The hardware feature required to run this kernel.
    type RequiredHardwareFeature: EvaluateHardwareFeature;

    /// An identification token for the kernel.
    type Ident: Debug + Display + Clone + Copy + 'static + PartialEq;

    /// Identify the kernel.
    fn ident(&self) -> Self::Ident;

    /// Whether the hardware features required by this kernel are available at runtime.
    fn required_hardware_features_met() -> bool {
        Self::RequiredHardwareFeature::met_runtime()
    }

    /// Replace red, green and blue with the luma `0.3 r + 0.59 g + 0.11 b` in place, leaving alpha untouched.
    ///
    /// Applying it twice yields the same result as applying it once.
    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>);

    /// Compare `left` and `right` pixel by pixel and render the result into `output`.
    ///
    /// A pixel is similar when the Euclidean RGBA distance is at most `params.tolerance`; similar pixels are copied from
    /// `left`, dissimilar ones are blended from `right` toward the error color. With `MOVEMENT` the right pixel is first
    /// multiplied by the error color and the alpha is forced to 1. With `WEIGHTED` the blend weight is scaled by the distance.
    ///
    /// Padding elements of `output` keep the value of `left` and are never counted.
    ///
    /// # Returns
    ///
    /// The number of dissimilar real pixels.
    ///
    /// # Panics
    ///
    /// Panics if the three buffers do not share the same width, height and stride.
    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize;
}

#[inline]
#[track_caller]
pub(crate) fn assert_same_layout<L: SupportedLanes>(
    left: &PlanarBuffer<L>,
    right: &PlanarBuffer<L>,
    output: &PlanarBuffer<L>,
) {
    assert!(
        left.same_layout(right) && left.same_layout(output),
        "operands must share width, height and stride: left {left:?}, right {right:?}, output {output:?}"
    );
}

/// Render one dissimilar pixel.
#[inline(always)]
fn render_dissimilar<const MOVEMENT: bool, const WEIGHTED: bool>(
    right: [f32; 4],
    dist: f32,
    params: &DiffParams,
) -> [f32; 4] {
    let mut t = params.overlay_transparency;
    if WEIGHTED {
        t *= dist;
    }
    // max() first so NaN becomes 0
    let t = t.max(0.0).min(1.0);

    let mut out: [f32; 4] = core::array::from_fn(|c| {
        let candidate = if MOVEMENT {
            right[c] * params.error[c]
        } else {
            right[c]
        };
        candidate * (1.0 - t) + params.error[c] * t
    });

    if MOVEMENT {
        out[3] = 1.0;
    }

    out
}

/// A pure-Rust implementation of the [`Kernel`] trait.
///
/// Works one lane group of `L` pixels at a time and selects between the similar and dissimilar results without
/// branching on pixel data, so the compiler is free to vectorize it for whatever target features are enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKernel<L: SupportedLanes = U8> {
    _lanes: PhantomData<L>,
}

impl<L: SupportedLanes> DefaultKernel<L> {
    /// Create a new default kernel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _lanes: PhantomData,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
/// Identification token for the default kernel.
pub struct DefaultKernelIdent<L: SupportedLanes> {
    _lanes: PhantomData<L>,
}

impl<L: SupportedLanes> Debug for DefaultKernelIdent<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Default<f32x{}>", L::USIZE)
    }
}

impl<L: SupportedLanes> Display for DefaultKernelIdent<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("default (auto-vectorized)")
    }
}

impl<L: SupportedLanes> Kernel for DefaultKernel<L> {
    type Lanes = L;
    type RequiredHardwareFeature = Term;
    type Ident = DefaultKernelIdent<L>;

    fn ident(&self) -> Self::Ident {
        DefaultKernelIdent {
            _lanes: PhantomData,
        }
    }

    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>) {
        let [r, g, b, _] = image.channels_mut();

        for ((r, g), b) in r
            .chunks_exact_mut(L::USIZE)
            .zip(g.chunks_exact_mut(L::USIZE))
            .zip(b.chunks_exact_mut(L::USIZE))
        {
            for i in 0..L::USIZE {
                // same luma as the weighted sum, but exact on grey input
                let luma = g[i] + LUMA_RED * (r[i] - g[i]) + LUMA_BLUE * (b[i] - g[i]);
                r[i] = luma;
                g[i] = luma;
                b[i] = luma;
            }
        }
    }

    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize {
        assert_same_layout(left, right, output);

        let lanes = L::USIZE;
        let width = left.width();
        let stride = left.stride();
        let [lr, lg, lb, la] = left.channels();
        let [rr, rg, rb, ra] = right.channels();
        let [or, og, ob, oa] = output.channels_mut();

        let mut dissimilar = 0;
        for row in 0..left.height() {
            for group in (0..stride).step_by(lanes) {
                let real_lanes = (width - group).min(lanes);

                for lane in 0..lanes {
                    let i = row * stride + group + lane;
                    let l = [lr[i], lg[i], lb[i], la[i]];
                    let r = [rr[i], rg[i], rb[i], ra[i]];

                    let d = [r[0] - l[0], r[1] - l[1], r[2] - l[2], r[3] - l[3]];
                    let dist = Float::sqrt(d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + d[3] * d[3]);
                    let rendered = render_dissimilar::<MOVEMENT, WEIGHTED>(r, dist, params);

                    let similar = dist <= params.tolerance;
                    let is_dissimilar = !similar & (lane < real_lanes);
                    let out = if is_dissimilar { rendered } else { l };

                    or[i] = out[0];
                    og[i] = out[1];
                    ob[i] = out[2];
                    oa[i] = out[3];
                    dissimilar += usize::from(is_dissimilar);
                }
            }
        }

        dissimilar
    }
}

/// A literal per-pixel rendition of the greyscale and diff passes in the float type `N`, for testing.
///
/// Only real pixels are visited; padding is left untouched.
#[cfg(any(feature = "std", test))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceKernel<N = f32, L: SupportedLanes = U8> {
    _marker: PhantomData<(N, L)>,
}

#[cfg(any(feature = "std", test))]
#[derive(Clone, Copy, PartialEq, Eq)]
/// Identification token for the reference kernel.
pub struct ReferenceKernelIdent<N, L: SupportedLanes> {
    _marker: PhantomData<(N, L)>,
}

#[cfg(any(feature = "std", test))]
impl<N, L: SupportedLanes> Debug for ReferenceKernelIdent<N, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Reference<{}, lanes={}>",
            core::any::type_name::<N>(),
            L::USIZE
        )
    }
}

#[cfg(any(feature = "std", test))]
impl<N, L: SupportedLanes> Display for ReferenceKernelIdent<N, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("reference")
    }
}

#[cfg(any(feature = "std", test))]
impl<N, L: SupportedLanes> Kernel for ReferenceKernel<N, L>
where
    N: Float + Copy + PartialEq + 'static + AsPrimitive<f32>,
    f32: AsPrimitive<N>,
{
    type Lanes = L;
    type RequiredHardwareFeature = Term;
    type Ident = ReferenceKernelIdent<N, L>;

    fn ident(&self) -> Self::Ident {
        ReferenceKernelIdent {
            _marker: PhantomData,
        }
    }

    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>) {
        let to_n = |v: f32| -> N { v.as_() };
        let kr = to_n(LUMA_RED);
        let kb = to_n(LUMA_BLUE);

        for y in 0..image.height() {
            for x in 0..image.width() {
                let [r, g, b, a] = image.pixel(x, y);
                let [r, g, b] = [r, g, b].map(to_n);
                // 0.3 r + 0.59 g + 0.11 b, arranged to leave grey pixels unchanged
                let luma: f32 = (g + kr * (r - g) + kb * (b - g)).as_();
                image.set_pixel(x, y, [luma, luma, luma, a]);
            }
        }
    }

    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize {
        assert_same_layout(left, right, output);

        let to_n = |v: f32| -> N { v.as_() };
        let zero = N::zero();
        let one = N::one();
        let error = params.error.map(to_n);
        let tolerance = to_n(params.tolerance);
        let transparency = to_n(params.overlay_transparency);

        let mut dissimilar = 0;
        for y in 0..left.height() {
            for x in 0..left.width() {
                let l = left.pixel(x, y);
                let r = right.pixel(x, y);
                let rn = r.map(to_n);

                let mut sum = zero;
                for c in 0..4 {
                    let d = rn[c] - to_n(l[c]);
                    sum = sum + d * d;
                }
                let dist = sum.sqrt();

                if dist <= tolerance {
                    output.set_pixel(x, y, l);
                    continue;
                }

                let mut t = transparency;
                if WEIGHTED {
                    t = t * dist;
                }
                let t = t.max(zero).min(one);

                let mut out = [0.0; 4];
                for c in 0..4 {
                    let candidate = if MOVEMENT { rn[c] * error[c] } else { rn[c] };
                    out[c] = (candidate * (one - t) + error[c] * t).as_();
                }
                if MOVEMENT {
                    out[3] = 1.0;
                }

                output.set_pixel(x, y, out);
                dissimilar += 1;
            }
        }

        dissimilar
    }
}

#[cfg(all(target_arch = "x86_64", not(feature = "portable-simd")))]
/// The concrete type of the smart kernel.
pub type SmartKernelConcreteType = router::KernelRouter<x86::Avx2F32Kernel, DefaultKernel<U8>>;

#[cfg(all(target_arch = "x86_64", feature = "portable-simd"))]
/// The concrete type of the smart kernel.
pub type SmartKernelConcreteType =
    router::KernelRouter<x86::Avx2F32Kernel, portable_simd::PortableSimdF32Kernel<8>>;

#[cfg(all(not(target_arch = "x86_64"), feature = "portable-simd"))]
/// The concrete type of the smart kernel.
pub type SmartKernelConcreteType = portable_simd::PortableSimdF32Kernel<8>;

#[cfg(all(not(target_arch = "x86_64"), not(feature = "portable-simd")))]
/// The concrete type of the smart kernel.
pub type SmartKernelConcreteType = DefaultKernel<U8>;

pub(crate) fn smart_kernel_impl() -> SmartKernelConcreteType {
    #[cfg(all(target_arch = "x86_64", not(feature = "portable-simd")))]
    {
        // SAFETY: the router only enters the AVX2 kernel after the runtime check passed
        router::KernelRouter::new(unsafe { x86::Avx2F32Kernel::new_unchecked() }, DefaultKernel::new())
    }

    #[cfg(all(target_arch = "x86_64", feature = "portable-simd"))]
    {
        // SAFETY: the router only enters the AVX2 kernel after the runtime check passed
        router::KernelRouter::new(
            unsafe { x86::Avx2F32Kernel::new_unchecked() },
            portable_simd::PortableSimdF32Kernel::<8>::default(),
        )
    }

    #[cfg(all(not(target_arch = "x86_64"), feature = "portable-simd"))]
    {
        portable_simd::PortableSimdF32Kernel::<8>::default()
    }

    #[cfg(all(not(target_arch = "x86_64"), not(feature = "portable-simd")))]
    {
        DefaultKernel::new()
    }
}

/// Get the best kernel for the running CPU, processing 8 lanes per step.
///
/// The routing decision is made once here; reuse the returned kernel instead of calling this per image.
#[must_use]
pub fn smart_kernel() -> SmartKernelConcreteType {
    let kernel = smart_kernel_impl();
    log::debug!("smart kernel: {:?}", kernel.ident());
    kernel
}

#[cfg(test)]
pub(crate) mod tests {
    use generic_array::typenum::{U1, U4};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{Rgba8, planar::byte_to_unit};
    use super::constants::LUMA_GREEN;

    // tolerance that no distance between byte-quantized pixels comes close to
    pub(crate) const SAFE_TOLERANCE: f32 = 0.2015;

    pub(crate) const TEST_SIZES: [(usize, usize); 6] =
        [(1, 1), (3, 2), (8, 4), (13, 7), (31, 3), (64, 5)];

    pub(crate) fn random_image<L: SupportedLanes>(
        rng: &mut impl Rng,
        width: usize,
        height: usize,
    ) -> PlanarBuffer<L> {
        PlanarBuffer::from_fn(width, height, |_, _| {
            [0; 4].map(|_| byte_to_unit(rng.random()))
        })
        .unwrap()
    }

    /// Copy `base` with roughly half of the pixels replaced by random ones.
    pub(crate) fn perturbed_image<L: SupportedLanes>(
        rng: &mut impl Rng,
        base: &PlanarBuffer<L>,
    ) -> PlanarBuffer<L> {
        let mut out = base.clone();
        for y in 0..base.height() {
            for x in 0..base.width() {
                if rng.random_bool(0.5) {
                    let mut px = base.pixel(x, y);
                    let c = rng.random_range(0..4);
                    px[c] = byte_to_unit(rng.random());
                    out.set_pixel(x, y, px);
                }
            }
        }
        out
    }

    pub(crate) fn test_params() -> [DiffParams; 3] {
        [
            DiffParams {
                error: Rgba8::RED.to_unit(),
                tolerance: SAFE_TOLERANCE,
                overlay_transparency: 1.0,
            },
            DiffParams {
                error: Rgba8::new(0, 128, 255, 64).to_unit(),
                tolerance: 0.0,
                overlay_transparency: 0.35,
            },
            DiffParams {
                error: Rgba8::new(255, 255, 0, 255).to_unit(),
                tolerance: SAFE_TOLERANCE,
                overlay_transparency: 0.8,
            },
        ]
    }

    pub(crate) fn assert_close<L: SupportedLanes>(
        actual: &PlanarBuffer<L>,
        expected: &PlanarBuffer<L>,
        eps: f32,
        context: &str,
    ) {
        assert!(actual.same_layout(expected), "{context}: layout differs");
        for y in 0..actual.height() {
            for x in 0..actual.width() {
                let a = actual.pixel(x, y);
                let e = expected.pixel(x, y);
                for c in 0..4 {
                    assert!(
                        (a[c] - e[c]).abs() <= eps,
                        "{context}: pixel ({x}, {y}) channel {c}: {} vs {}",
                        a[c],
                        e[c]
                    );
                }
            }
        }
    }

    pub(crate) fn assert_padding_zero<L: SupportedLanes>(image: &PlanarBuffer<L>) {
        for plane in image.channels() {
            for (y, row) in plane.chunks_exact(image.stride().max(1)).enumerate() {
                assert!(
                    row[image.width()..].iter().all(|v| *v == 0.0),
                    "padding of row {y} was written"
                );
            }
        }
    }

    fn check_variant<K, R, const MOVEMENT: bool, const WEIGHTED: bool>(
        kernel: &mut K,
        reference: &mut R,
        left: &PlanarBuffer<K::Lanes>,
        right: &PlanarBuffer<K::Lanes>,
        params: &DiffParams,
    ) where
        K: Kernel,
        R: Kernel<Lanes = K::Lanes>,
    {
        let mut output = PlanarBuffer::new(left.width(), left.height()).unwrap();
        let mut expected = PlanarBuffer::new(left.width(), left.height()).unwrap();

        let count = kernel.diff_planar::<MOVEMENT, WEIGHTED>(left, right, params, &mut output);
        let expected_count =
            reference.diff_planar::<MOVEMENT, WEIGHTED>(left, right, params, &mut expected);

        let context = alloc::format!(
            "{:?} movement={MOVEMENT} weighted={WEIGHTED} {}x{} {params:?}",
            kernel.ident(),
            left.width(),
            left.height()
        );
        assert_eq!(count, expected_count, "{context}");
        assert_close(&output, &expected, 1e-6, &context);
        assert_padding_zero(&output);
    }

    /// Check a kernel against the f64 reference kernel on random data.
    pub(crate) fn test_kernel_equivalence_impl<K: Kernel>(kernel: &mut K)
    where
        ReferenceKernel<f64, K::Lanes>: Kernel<Lanes = K::Lanes>,
    {
        let mut rng = StdRng::seed_from_u64(0x1d1f);
        let mut reference = ReferenceKernel::<f64, K::Lanes>::default();

        for (width, height) in TEST_SIZES {
            let left = random_image(&mut rng, width, height);
            let right = perturbed_image(&mut rng, &left);

            for params in test_params() {
                check_variant::<_, _, false, false>(kernel, &mut reference, &left, &right, &params);
                check_variant::<_, _, false, true>(kernel, &mut reference, &left, &right, &params);
                check_variant::<_, _, true, false>(kernel, &mut reference, &left, &right, &params);
                check_variant::<_, _, true, true>(kernel, &mut reference, &left, &right, &params);
            }
        }
    }

    /// Check a kernel's greyscale pass against the f64 reference kernel, and that it is idempotent.
    pub(crate) fn test_greyscale_impl<K: Kernel>(kernel: &mut K)
    where
        ReferenceKernel<f64, K::Lanes>: Kernel<Lanes = K::Lanes>,
    {
        let mut rng = StdRng::seed_from_u64(0x9e7);
        let mut reference = ReferenceKernel::<f64, K::Lanes>::default();

        for (width, height) in TEST_SIZES {
            let original = random_image::<K::Lanes>(&mut rng, width, height);

            let mut once = original.clone();
            kernel.greyscale(&mut once);
            let mut expected = original.clone();
            reference.greyscale(&mut expected);
            assert_close(&once, &expected, 1e-6, "greyscale");
            assert_padding_zero(&once);

            let mut twice = once.clone();
            kernel.greyscale(&mut twice);
            assert_eq!(twice, once, "greyscale is not idempotent");

            for y in 0..height {
                for x in 0..width {
                    let [r, g, b, a] = once.pixel(x, y);
                    assert_eq!(r, g);
                    assert_eq!(g, b);
                    assert_eq!(a, original.pixel(x, y)[3]);
                }
            }
        }
    }

    #[test]
    fn test_default_kernel_equivalence() {
        test_kernel_equivalence_impl(&mut DefaultKernel::<U8>::new());
        test_kernel_equivalence_impl(&mut DefaultKernel::<U4>::new());
        test_kernel_equivalence_impl(&mut DefaultKernel::<U1>::new());
    }

    #[test]
    fn test_reference_kernel_precision() {
        test_kernel_equivalence_impl(&mut ReferenceKernel::<f32, U8>::default());
    }

    #[test]
    fn test_reference_kernel_greyscale() {
        test_greyscale_impl(&mut ReferenceKernel::<f32, U8>::default());
        test_greyscale_impl(&mut ReferenceKernel::<f64, U8>::default());
    }

    #[test]
    fn test_reference_kernel_greyscale_fixed_point() {
        // every (v, w, v, 1) byte pixel, including the all-grey diagonal
        let image = PlanarBuffer::<U8>::from_fn(256, 256, |x, y| {
            let v = byte_to_unit(x as u8);
            [v, byte_to_unit(y as u8), v, 1.0]
        })
        .unwrap();

        let mut kernel = ReferenceKernel::<f32, U8>::default();
        let mut once = image.clone();
        kernel.greyscale(&mut once);
        let mut twice = once.clone();
        kernel.greyscale(&mut twice);
        assert_eq!(twice, once);

        for v in 0..=255u8 {
            let grey = byte_to_unit(v);
            assert_eq!(once.pixel(v as usize, v as usize), [grey, grey, grey, 1.0]);
        }
    }

    #[test]
    fn test_greyscale_weights() {
        let image = PlanarBuffer::<U8>::from_fn(1, 1, |_, _| [1.0, 0.5, 0.25, 0.75]).unwrap();
        let expected = LUMA_RED + LUMA_GREEN * 0.5 + LUMA_BLUE * 0.25;

        let mut reference = image.clone();
        ReferenceKernel::<f32, U8>::default().greyscale(&mut reference);
        let mut fast = image.clone();
        DefaultKernel::<U8>::new().greyscale(&mut fast);

        for px in [reference.pixel(0, 0), fast.pixel(0, 0)] {
            assert!((px[0] - expected).abs() <= 1e-6, "{px:?}");
            assert_eq!(px[3], 0.75);
        }
    }

    #[test]
    fn test_default_kernel_greyscale() {
        test_greyscale_impl(&mut DefaultKernel::<U8>::new());
        test_greyscale_impl(&mut DefaultKernel::<U1>::new());
    }

    #[test]
    fn test_smart_kernel_equivalence() {
        let mut kernel = smart_kernel();
        test_kernel_equivalence_impl(&mut kernel);
        test_greyscale_impl(&mut kernel);
    }

    #[test]
    fn test_padding_never_counted() {
        let mut rng = StdRng::seed_from_u64(7);
        let left = random_image::<U8>(&mut rng, 13, 3);
        let right = random_image::<U8>(&mut rng, 13, 3);
        let mut output = PlanarBuffer::new(13, 3).unwrap();

        // NaN tolerance classifies every real pixel as dissimilar
        let params = DiffParams {
            error: Rgba8::RED.to_unit(),
            tolerance: f32::NAN,
            overlay_transparency: 1.0,
        };
        let count =
            DefaultKernel::<U8>::new().diff_planar::<false, false>(&left, &right, &params, &mut output);
        assert_eq!(count, 13 * 3);
        assert_padding_zero(&output);
    }

    #[test]
    fn test_weighting_scales_blend() {
        let left = PlanarBuffer::<U8>::from_fn(1, 1, |_, _| [0.0, 0.0, 0.0, 1.0]).unwrap();
        let right = PlanarBuffer::<U8>::from_fn(1, 1, |_, _| [0.5, 0.0, 0.0, 1.0]).unwrap();
        let mut output = PlanarBuffer::new(1, 1).unwrap();
        let params = DiffParams {
            error: [0.0, 1.0, 0.0, 1.0],
            tolerance: 0.1,
            overlay_transparency: 1.0,
        };

        let count =
            DefaultKernel::<U8>::new().diff_planar::<false, true>(&left, &right, &params, &mut output);
        assert_eq!(count, 1);
        // distance 0.5 halves the blend weight
        assert_eq!(output.pixel(0, 0), [0.25, 0.5, 0.0, 1.0]);

        DefaultKernel::<U8>::new().diff_planar::<false, false>(&left, &right, &params, &mut output);
        assert_eq!(output.pixel(0, 0), [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_blend_weight_clamped() {
        let left = PlanarBuffer::<U8>::from_fn(1, 1, |_, _| [0.0, 0.0, 0.0, 1.0]).unwrap();
        let right = PlanarBuffer::<U8>::from_fn(1, 1, |_, _| [1.0, 1.0, 1.0, 1.0]).unwrap();
        let mut output = PlanarBuffer::new(1, 1).unwrap();

        for (transparency, expected) in [(-3.0, [1.0; 4]), (7.5, [0.0, 0.0, 0.0, 1.0])] {
            let params = DiffParams {
                error: [0.0, 0.0, 0.0, 1.0],
                tolerance: 0.0,
                overlay_transparency: transparency,
            };
            DefaultKernel::<U8>::new().diff_planar::<false, false>(&left, &right, &params, &mut output);
            assert_eq!(output.pixel(0, 0), expected, "transparency {transparency}");
        }
    }

    #[test]
    #[should_panic(expected = "operands must share width, height and stride")]
    fn test_layout_mismatch_panics() {
        let left = PlanarBuffer::<U8>::new(4, 4).unwrap();
        let right = PlanarBuffer::<U8>::new(4, 5).unwrap();
        let mut output = PlanarBuffer::new(4, 4).unwrap();
        DefaultKernel::<U8>::new().diff_planar::<false, false>(
            &left,
            &right,
            &DiffParams::new(&DiffOptions::default()),
            &mut output,
        );
    }
}
