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

use generic_array::typenum::{B0, B1, Bit};

use super::{
    DiffParams, Kernel,
    type_traits::{EvaluateHardwareFeature, FallbackRequirements, SupportedLanes},
};
use crate::PlanarBuffer;

#[derive(Debug, Clone, Copy, PartialEq)]
/// A token that has both a compile-time bit and a runtime-bit indicating whether a decision fell through to the fallback kernel.
pub struct MaybeFellThroughToken<EnabledStatically: Bit> {
    _private: PhantomData<EnabledStatically>,
    /// Whether the decision fell through to the fallback kernel at runtime.
    pub fell_through_runtime: bool,
}

trait KernelFallthrough<EnabledStatically: Bit, Lanes: SupportedLanes>: Kernel<Lanes = Lanes> {
    fn ident_opt(&self) -> MaybeFellThroughToken<EnabledStatically>;

    fn would_run(&self) -> bool {
        false
    }

    fn greyscale_opt<const CHECKED: bool>(&mut self, _image: &mut PlanarBuffer<Lanes>) -> bool {
        false
    }

    fn diff_planar_opt<const MOVEMENT: bool, const WEIGHTED: bool, const CHECKED: bool>(
        &mut self,
        _left: &PlanarBuffer<Lanes>,
        _right: &PlanarBuffer<Lanes>,
        _params: &DiffParams,
        _output: &mut PlanarBuffer<Lanes>,
    ) -> Option<usize> {
        None
    }
}

impl<M: EvaluateHardwareFeature<EnabledStatic = B0>, P: Kernel<RequiredHardwareFeature = M>>
    KernelFallthrough<B0, <P as Kernel>::Lanes> for P
{
    fn ident_opt(&self) -> MaybeFellThroughToken<B0> {
        MaybeFellThroughToken {
            _private: PhantomData,
            fell_through_runtime: true,
        }
    }
}

impl<M: EvaluateHardwareFeature<EnabledStatic = B1>, P: Kernel<RequiredHardwareFeature = M>>
    KernelFallthrough<B1, <P as Kernel>::Lanes> for P
{
    fn would_run(&self) -> bool {
        // checking was statically not required or runtime check passed
        !M::MustCheck::BOOL || M::met_runtime()
    }

    fn ident_opt(&self) -> MaybeFellThroughToken<B1> {
        MaybeFellThroughToken {
            _private: PhantomData,
            fell_through_runtime: !self.would_run(),
        }
    }

    fn greyscale_opt<const CHECKED: bool>(
        &mut self,
        image: &mut PlanarBuffer<<P as Kernel>::Lanes>,
    ) -> bool {
        if CHECKED && !self.would_run() {
            return false;
        }

        self.greyscale(image);
        true
    }

    fn diff_planar_opt<const MOVEMENT: bool, const WEIGHTED: bool, const CHECKED: bool>(
        &mut self,
        left: &PlanarBuffer<<P as Kernel>::Lanes>,
        right: &PlanarBuffer<<P as Kernel>::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<<P as Kernel>::Lanes>,
    ) -> Option<usize> {
        if CHECKED && !self.would_run() {
            return None;
        }

        Some(self.diff_planar::<MOVEMENT, WEIGHTED>(left, right, params, output))
    }
}

/// A static fallback router for composing kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelRouter<P, F> {
    materialized_decision: bool,
    preferred: P,
    fallback: F,
}

impl<L: SupportedLanes, P: Kernel<Lanes = L>, F: Kernel<Lanes = L>> KernelRouter<P, F> {
    /// Create a new kernel router.
    ///
    /// Fallback kernel must be guaranteed to be available at runtime.
    pub fn new(preferred: P, fallback: F) -> Self
    where
        F::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1, MustCheck = B0>,
    {
        // must be enabled statically and either checking was statically not required or runtime check passed
        let decision = <<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::EnabledStatic::BOOL &&
            (!<<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::MustCheck::BOOL
                || <P as Kernel>::RequiredHardwareFeature::met_runtime());

        log::debug!(
            "kernel router: preferred {:?} {}",
            P::RequiredHardwareFeature::name(),
            if decision { "selected" } else { "not available" }
        );

        Self {
            materialized_decision: decision,
            preferred,
            fallback,
        }
    }

    /// Whether calls are routed to the preferred kernel.
    #[must_use]
    pub const fn uses_preferred(&self) -> bool {
        self.materialized_decision
    }
}

#[derive(Clone, Copy)]
/// An identification token for a runtime decision to use a fallback kernel.
pub struct FallbackToken<
    PE: Bit,
    PIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
    FIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
> {
    preferred: PIdent,
    fall_through: MaybeFellThroughToken<PE>,
    fallback: FIdent,
}

impl<
    PE: Bit,
    PIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
    FIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
> FallbackToken<PE, PIdent, FIdent>
{
    /// Whether the fallback kernel is the one doing the work.
    #[must_use]
    pub fn fell_through(&self) -> bool {
        !PE::BOOL || self.fall_through.fell_through_runtime
    }
}

impl<
    PE: Bit,
    PIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
    FIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
> Debug for FallbackToken<PE, PIdent, FIdent>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if PE::BOOL {
            if self.fall_through.fell_through_runtime {
                write!(
                    f,
                    "FallbackIdent(decision: fallback (reason: runtime hardware feature not met) {:?}, preferred was {:?})",
                    self.fallback, self.preferred
                )
            } else {
                write!(
                    f,
                    "FallbackIdent(decision: using preferred {:?}, fallback was {:?})",
                    self.preferred, self.fallback
                )
            }
        } else {
            write!(
                f,
                "FallbackIdent(decision: fallback (reason: compile time flag not met) {:?}, preferred was {:?})",
                self.fallback, self.preferred
            )
        }
    }
}

impl<
    PE: Bit,
    PIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
    FIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
> Display for FallbackToken<PE, PIdent, FIdent>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.fell_through() {
            write!(f, "{}", self.fallback)
        } else {
            write!(f, "{}", self.preferred)
        }
    }
}

impl<
    PE: Bit,
    PIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
    FIdent: Debug + Display + Clone + Copy + 'static + PartialEq,
> PartialEq for FallbackToken<PE, PIdent, FIdent>
{
    fn eq(&self, other: &Self) -> bool {
        self.preferred == other.preferred
            && self.fallback == other.fallback
            && self.fall_through.fell_through_runtime == other.fall_through.fell_through_runtime
    }
}

impl<
    L: SupportedLanes,
    P: Kernel<Lanes = L>
        + KernelFallthrough<
            <<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::EnabledStatic,
            L,
        >,
    F: Kernel<Lanes = L>,
> Kernel for KernelRouter<P, F>
where
    F::RequiredHardwareFeature: EvaluateHardwareFeature<EnabledStatic = B1, MustCheck = B0>,
{
    type Lanes = L;
    type RequiredHardwareFeature =
        FallbackRequirements<P::RequiredHardwareFeature, F::RequiredHardwareFeature>;
    type Ident = FallbackToken<
        <<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::EnabledStatic,
        <P as Kernel>::Ident,
        <F as Kernel>::Ident,
    >;

    fn ident(&self) -> Self::Ident {
        let mut token = self.preferred.ident_opt();
        token.fell_through_runtime |= !self.materialized_decision;
        Self::Ident {
            preferred: self.preferred.ident(),
            fall_through: token,
            fallback: self.fallback.ident(),
        }
    }

    fn greyscale(&mut self, image: &mut PlanarBuffer<Self::Lanes>) {
        if self.materialized_decision && <<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::EnabledStatic::BOOL && self.preferred.greyscale_opt::<false>(image) {
            return;
        }

        self.fallback.greyscale(image);
    }

    fn diff_planar<const MOVEMENT: bool, const WEIGHTED: bool>(
        &mut self,
        left: &PlanarBuffer<Self::Lanes>,
        right: &PlanarBuffer<Self::Lanes>,
        params: &DiffParams,
        output: &mut PlanarBuffer<Self::Lanes>,
    ) -> usize {
        if self.materialized_decision && <<P as Kernel>::RequiredHardwareFeature as EvaluateHardwareFeature>::EnabledStatic::BOOL {
            if let Some(count) = self
                .preferred
                .diff_planar_opt::<MOVEMENT, WEIGHTED, false>(left, right, params, output)
            {
                return count;
            }
        }

        self.fallback
            .diff_planar::<MOVEMENT, WEIGHTED>(left, right, params, output)
    }
}
