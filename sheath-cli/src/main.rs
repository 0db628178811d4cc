// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use clap::{Parser, Subcommand};
use sheath_cli::commands::{colorize, fill, models, morphometrics, pixel_size, segment};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Segment(segment::SegmentArgs),
    FillAxons(fill::FillArgs),
    Morphometrics(morphometrics::MorphometricsArgs),
    Colorize(colorize::ColorizeArgs),
    Models(models::ModelsArgs),
    PixelSize(pixel_size::PixelSizeArgs),
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Segment(args)) => segment::segment(args),
        Some(Commands::FillAxons(args)) => fill::fill_axons(args),
        Some(Commands::Morphometrics(args)) => morphometrics::morphometrics(args),
        Some(Commands::Colorize(args)) => colorize::colorize(args),
        Some(Commands::Models(args)) => models::models(args),
        Some(Commands::PixelSize(args)) => pixel_size::pixel_size(args),
        None => {}
    }
}
