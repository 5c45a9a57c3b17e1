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

use std::env;

fn target_specific_message(arch: &str, features: &[&str], portable_simd: bool) -> String {
    let has = |f: &str| features.contains(&f);

    match arch {
        "x86_64" if has("avx2") && has("fma") => {
            "This binary was built with AVX2 and FMA enabled, the hand-written AVX2 kernel is always used.".to_string()
        }
        "x86_64" => format!(
            "This binary selects the hand-written AVX2 kernel at runtime when the CPU supports AVX2 and FMA, \
             otherwise it falls back to the {} kernel. \
             Build with RUSTFLAGS=\"-C target-cpu=native\" to skip the runtime check.",
            if portable_simd { "portable-simd" } else { "auto-vectorized" }
        ),
        _ if portable_simd => {
            "This binary uses the portable-simd kernel for this architecture.".to_string()
        }
        _ => "This binary uses the auto-vectorized kernel for this architecture. \
              Build with the 'portable-simd' feature on nightly for guided vectorization."
            .to_string(),
    }
}

fn main() {
    println!("cargo::rerun-if-changed=build.rs");

    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let features = env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();
    let feature_list: Vec<&str> = features.split(',').filter(|f| !f.is_empty()).collect();
    let portable_simd = env::var_os("CARGO_FEATURE_PORTABLE_SIMD").is_some();

    println!(
        "cargo::rustc-env=TARGET_SPECIFIC_CLI_MESSAGE={}",
        target_specific_message(&arch, &feature_list, portable_simd)
    );
    println!(
        "cargo::rustc-env=BUILD_OPT_LEVEL={}",
        env::var("OPT_LEVEL").unwrap_or_else(|_| "?".to_string())
    );
    println!(
        "cargo::rustc-env=BUILD_CFG_TARGET_FEATURES={}",
        feature_list.join(" ")
    );
}
