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

use std::{path::PathBuf, process::ExitCode, time::Instant};

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use yume_imgdiff::{
    ChannelOrder, DiffError, DiffOptions, OverlayType, PlanarBuffer, Rgba8,
    kernel::{Kernel, SmartKernelConcreteType},
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("{width}x{height} is too large for a PNG image")]
    TooLarge { width: usize, height: usize },
    #[error(transparent)]
    Diff(#[from] DiffError),
}

fn build_cli() -> Command {
    Command::new("yume-imgdiff")
        .about("Fast per-pixel RGBA image comparison")
        .long_about(concat!(
r#"
A vectorized per-pixel image comparison tool for visual regression testing.
Renders dissimilar pixels in an error color and reports the fraction of similar pixels.

"#, env!("TARGET_SPECIFIC_CLI_MESSAGE"), r#"

Build Facts:
  Version: "#,env!("CARGO_PKG_VERSION"),r#"
  Optimization: -O "#, env!("BUILD_OPT_LEVEL"),r#"
  Build time CPU flag support: "#, env!("BUILD_CFG_TARGET_FEATURES")
        ))
        .version(env!("CARGO_PKG_VERSION"))
        .flatten_help(true)
        .subcommand(
            Command::new("diff")
                .about("Compare two images, see 'diff --help' for usage examples")
                .long_about(
r#"
Compares two images of the same size and prints the similarity score (1.0 is identical).

Usage examples:

 * Gate a screenshot test, allowing small anti-aliasing differences:

    > yume-imgdiff diff expected.png actual.png --tolerance 0.1 --fail-under 0.999 -o diff.png

       Output: 0.99971

 * Highlight moved content in a translucent blue, ignoring color changes:

    > yume-imgdiff diff a.png b.png --overlay movement --error-color 0000ff --transparency 0.6 --ignore-color -o diff.png

 * Measure the comparison speed:

    > yume-imgdiff diff a.png b.png --iterations 1000
"#)
                .arg(
                    Arg::new("left")
                        .help("Reference image")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("right")
                        .help("Candidate image")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Write the rendered diff to this PNG file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("tolerance")
                        .short('t')
                        .long("tolerance")
                        .help("Largest RGBA distance still considered similar")
                        .long_help(
                            "Largest Euclidean distance between two pixels, with channels in [0, 1], \
                             that is still considered similar. 0 requires an exact match, 2 accepts everything.",
                        )
                        .value_parser(value_parser!(f32))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("transparency")
                        .long("transparency")
                        .help("Blend weight toward the error color, in [0, 1]")
                        .value_parser(value_parser!(f32))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("error_color")
                        .long("error-color")
                        .help("Color of dissimilar pixels as RRGGBB or RRGGBBAA hex")
                        .value_parser(value_parser!(Rgba8))
                        .default_value("ff0000ff"),
                )
                .arg(
                    Arg::new("overlay")
                        .long("overlay")
                        .help("Rendering of dissimilar pixels: flat or movement")
                        .long_help(
                            "Rendering of dissimilar pixels. 'flat' blends the candidate pixel toward the error color, \
                             'movement' tints it by the error color first and renders it opaque.",
                        )
                        .value_parser(value_parser!(OverlayType))
                        .default_value("flat"),
                )
                .arg(
                    Arg::new("weight_by_diff")
                        .long("weight-by-diff")
                        .help("Scale the blend weight by the pixel distance")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("ignore_color")
                        .long("ignore-color")
                        .help("Compare greyscale versions of the images")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .help("Repeat the comparison and report timings on stderr")
                        .value_parser(value_parser!(u32).range(1..))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("fail_under")
                        .long("fail-under")
                        .help("Exit with status 1 when the similarity is below this value")
                        .value_parser(value_parser!(f32)),
                ),
        )
        .subcommand(
            Command::new("bench")
                .hide(!cfg!(feature = "cli-bench"))
                .about("Run a formal benchmark")
                .long_about(
                    "Run a formal benchmark using Criterion.rs on synthetic images.",
                )
                .arg(
                    Arg::new("width")
                        .long("width")
                        .value_parser(value_parser!(usize))
                        .default_value("1920"),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_parser(value_parser!(usize))
                        .default_value("1080"),
                ),
        )
        .subcommand(
            Command::new("vectorization-info")
                .about("Display vectorization information")
                .long_about(
                    "Displays diagnostic information about the vectorization capabilities of the current CPU. \
                     HIGHLY RECOMMENDED to run this command before deploying on a new micro-architecture.",
                ),
        )
}

fn type_name_of<T>(_: &T) -> &'static str {
    std::any::type_name::<T>()
}

fn load_rgba8(path: &PathBuf) -> Result<image::RgbaImage, CliError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| CliError::Load {
            path: path.clone(),
            source,
        })
}

fn load_planar(path: &PathBuf) -> Result<PlanarBuffer, CliError> {
    let img = load_rgba8(path)?;
    let (width, height) = img.dimensions();

    Ok(PlanarBuffer::from_interleaved8(
        width as usize,
        height as usize,
        img.as_raw(),
        ChannelOrder::Rgba,
    )?)
}

fn save_planar(path: &PathBuf, image: &PlanarBuffer) -> Result<(), CliError> {
    let too_large = || CliError::TooLarge {
        width: image.width(),
        height: image.height(),
    };
    let width = u32::try_from(image.width()).map_err(|_| too_large())?;
    let height = u32::try_from(image.height()).map_err(|_| too_large())?;

    let bytes = image.to_interleaved8(ChannelOrder::Rgba)?;
    image::RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(too_large)?
        .save(path)
        .map_err(|source| CliError::Save {
            path: path.clone(),
            source,
        })
}

fn options_from_matches(matches: &ArgMatches) -> DiffOptions {
    let mut options = DiffOptions::default();

    if let Some(&tolerance) = matches.get_one::<f32>("tolerance") {
        options.tolerance = tolerance;
    }
    if let Some(&transparency) = matches.get_one::<f32>("transparency") {
        options.overlay_transparency = transparency;
    }
    if let Some(&color) = matches.get_one::<Rgba8>("error_color") {
        options.error_color = color;
    }
    if let Some(&overlay) = matches.get_one::<OverlayType>("overlay") {
        options.overlay_type = overlay;
    }
    options.weight_by_diff_percentage = matches.get_flag("weight_by_diff");
    options.ignore_color = matches.get_flag("ignore_color");

    options
}

#[allow(clippy::cast_precision_loss, reason = "timings are informational")]
fn run_diff(matches: &ArgMatches) -> Result<f32, CliError> {
    let options = options_from_matches(matches);
    let iterations = matches.get_one::<u32>("iterations").copied().unwrap_or(1);

    let (Some(left_path), Some(right_path)) = (
        matches.get_one::<PathBuf>("left"),
        matches.get_one::<PathBuf>("right"),
    ) else {
        unreachable!("required arguments");
    };

    let mut left = load_planar(left_path)?;
    let mut right = load_planar(right_path)?;

    let mut kernel = yume_imgdiff::smart_kernel();
    log::info!("using kernel {}", kernel.ident());

    let start = Instant::now();
    let mut result = yume_imgdiff::diff(&mut kernel, &mut left, &mut right, &options)?;
    for _ in 1..iterations {
        result = yume_imgdiff::diff(&mut kernel, &mut left, &mut right, &options)?;
    }
    let elapsed = start.elapsed();

    if iterations > 1 {
        let per_iteration = elapsed.as_secs_f64() * 1000.0 / f64::from(iterations);
        eprintln!(
            "{iterations} iterations in {:.3} ms: {per_iteration:.6} ms per iteration, {:.9} ms per pixel",
            elapsed.as_secs_f64() * 1000.0,
            per_iteration / left.real_pixel_count() as f64,
        );
    }

    if let Some(output) = matches.get_one::<PathBuf>("output") {
        save_planar(output, &result.image)?;
    }

    log::info!(
        "{} of {} pixels dissimilar",
        result.dissimilar_pixels,
        left.real_pixel_count()
    );

    Ok(result.similarity)
}

#[cfg(feature = "cli-bench")]
#[allow(clippy::cast_precision_loss, reason = "synthetic data")]
fn synthetic_image(width: usize, height: usize, seed: usize) -> PlanarBuffer {
    // a gradient with translucent blocks that move with the seed
    PlanarBuffer::from_fn(width, height, |x, y| {
        let block = usize::from((x / 64 + y / 64 + seed) % 7 == 0);
        [
            (x % 256) as f32 / 255.0,
            (y % 256) as f32 / 255.0,
            ((x + y) % 256) as f32 / 255.0,
            1.0 - block as f32 * 0.5,
        ]
    })
    .unwrap_or_else(|err| {
        eprintln!("{err}");
        std::process::exit(2);
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("vectorization-info", _)) => {
            println!("=== Feature flag information ===\n");
            println!(
                "  Capability of this binary: {}",
                env!("TARGET_SPECIFIC_CLI_MESSAGE")
            );

            println!(
                "  Supported CPU features: {}",
                env!("BUILD_CFG_TARGET_FEATURES")
            );

            println!("\n=== Runtime Routing Information ===\n");

            let kernel = yume_imgdiff::smart_kernel();

            let ident = kernel.ident();

            println!("  Runtime decision: {ident}");
            println!();
            println!("  Runtime decision details: {ident:?}");
            println!();
            println!("  Router type: {}", type_name_of(&kernel));
            println!(
                "  Lane width: {}",
                <<SmartKernelConcreteType as Kernel>::Lanes as generic_array::typenum::Unsigned>::USIZE
            );

            ExitCode::SUCCESS
        }
        Some(("diff", sub_matches)) => match run_diff(sub_matches) {
            Ok(similarity) => {
                println!("{similarity}");

                match sub_matches.get_one::<f32>("fail_under") {
                    Some(&threshold) if similarity < threshold => {
                        eprintln!("similarity {similarity} is below {threshold}");
                        ExitCode::from(1)
                    }
                    _ => ExitCode::SUCCESS,
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::from(2)
            }
        },
        #[cfg(feature = "cli-bench")]
        Some(("bench", sub_matches)) => {
            let width = sub_matches.get_one::<usize>("width").copied().unwrap_or(1920);
            let height = sub_matches.get_one::<usize>("height").copied().unwrap_or(1080);

            let mut crit = criterion::Criterion::default().without_plots();

            let mut left = synthetic_image(width, height, 0);
            let mut right = synthetic_image(width, height, 1);
            let mut kernel = yume_imgdiff::smart_kernel();

            let mut group = crit.benchmark_group(format!("diff_{width}x{height}"));
            group.throughput(criterion::Throughput::Bytes((width * height * 4) as u64));
            group.measurement_time(std::time::Duration::from_secs(10));

            for (name, overlay_type, weight_by_diff_percentage) in [
                ("flat", OverlayType::Flat, false),
                ("flat_weighted", OverlayType::Flat, true),
                ("movement", OverlayType::Movement, false),
                ("movement_weighted", OverlayType::Movement, true),
            ] {
                let options = DiffOptions {
                    tolerance: 0.1,
                    overlay_transparency: 0.7,
                    overlay_type,
                    weight_by_diff_percentage,
                    ..Default::default()
                };
                group.bench_function(name, |b| {
                    b.iter(|| {
                        yume_imgdiff::diff(&mut kernel, &mut left, &mut right, &options)
                            .map(|r| r.similarity)
                    });
                });
            }

            drop(group);

            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Invalid subcommand, try --help for usage");
            ExitCode::from(255)
        }
    }
}
