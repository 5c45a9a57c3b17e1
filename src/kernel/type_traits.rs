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

use core::{fmt::Debug, marker::PhantomData};

use generic_array::typenum::{B0, B1, Bit, U1, U2, U4, U8, U16, Unsigned};
use kernel_sealing::KernelSealed;

mod sealing {
    pub trait Sealed {}
}

/// A type-level number of `f32` lanes processed per step.
///
/// Only 1, 2, 4, 8 and 16 (32 to 512 bit registers) are accepted. Image rows are padded to a multiple of this.
pub trait SupportedLanes:
    Unsigned + Default + Clone + Copy + Debug + PartialEq + Eq + Send + Sync + 'static + sealing::Sealed
{
}

macro_rules! supported_lanes {
    ($($lanes:ty),+) => {
        $(
            impl sealing::Sealed for $lanes {}
            impl SupportedLanes for $lanes {}
        )+
    };
}

supported_lanes!(U1, U2, U4, U8, U16);

pub(crate) mod kernel_sealing {
    pub trait KernelSealed {}
}

/// Type level struct to represent a hardware feature guarded by a fallback that is guaranteed to be available.
pub struct FallbackRequirements<S: KernelSealed, N: KernelSealed> {
    _preferred: PhantomData<S>,
    _fallback: PhantomData<N>,
}

impl<S: KernelSealed, N: KernelSealed> KernelSealed for FallbackRequirements<S, N> {}

/// Type level trait to represent the runtime requirements for a kernel.
pub trait EvaluateHardwareFeature: KernelSealed {
    /// Whether the feature is possible to use at compile time.
    type EnabledStatic: Bit;
    /// Whether the feature must be checked before execution at runtime.
    type MustCheck: Bit;
    /// The name of the feature.
    type Name: Debug + Clone + Copy + 'static + PartialEq;

    /// Get the name of the requirement.
    fn name() -> Self::Name;

    /// Check if the feature is available at runtime.
    fn met_runtime() -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A type that represents the union of two names.
pub struct FallbackName<A, B>(A, B);

impl<P: EvaluateHardwareFeature, F: EvaluateHardwareFeature<EnabledStatic = B1>>
    EvaluateHardwareFeature for FallbackRequirements<P, F>
{
    type Name = FallbackName<P::Name, F::Name>;
    type EnabledStatic = B1;
    type MustCheck = B0;

    fn name() -> Self::Name {
        FallbackName(P::name(), F::name())
    }

    fn met_runtime() -> bool {
        P::met_runtime() || F::met_runtime()
    }
}

impl EvaluateHardwareFeature for Term {
    type Name = &'static str;
    type EnabledStatic = B1;
    type MustCheck = B0;

    fn name() -> Self::Name {
        "."
    }

    fn met_runtime() -> bool {
        true
    }
}

/// A type that represents a kernel that is always available.
pub struct Term {
    _private: (),
}

impl KernelSealed for Term {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes_of<L: SupportedLanes>() -> usize {
        L::USIZE
    }

    #[test]
    fn test_supported_lanes() {
        assert_eq!(lanes_of::<U1>(), 1);
        assert_eq!(lanes_of::<U8>(), 8);
        assert_eq!(lanes_of::<U16>(), 16);
    }

    #[test]
    fn test_fallback_requirements() {
        type Req = FallbackRequirements<Term, Term>;
        assert!(Req::met_runtime());
        assert!(<Req as EvaluateHardwareFeature>::EnabledStatic::BOOL);
        assert!(!<Req as EvaluateHardwareFeature>::MustCheck::BOOL);
        assert_eq!(Req::name(), FallbackName(".", "."));
    }
}
