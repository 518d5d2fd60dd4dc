//! Load a DICOM file, print its metadata table
//! and write the normalized pixel data as an 8-bit grayscale PNG.
use std::path::PathBuf;

use clap::Parser;
use dicom_normalize::utils::truncate_for_display;
use dicom_normalize::{to_gray_image, DicomDataset};

/// Normalize a DICOM file into a metadata table and a grayscale image
#[derive(Debug, Parser)]
struct App {
    /// Path to the DICOM file, optionally prefixed with `file://`
    file: String,

    /// Path to the output image
    /// (default is to replace the input extension with `.png`)
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    /// Only print the metadata table
    #[arg(long = "no-image", conflicts_with = "output")]
    no_image: bool,

    /// Print metadata values without truncating them
    #[arg(long = "full")]
    full: bool,

    /// Print debug information
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let App {
        file,
        output,
        no_image,
        full,
        verbose,
    } = App::parse();

    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .try_init();

    let dataset = DicomDataset::local(&file);
    println!("{}", dataset.describe());

    let (metadata, image) = dataset.load().unwrap_or_else(|err| {
        log::error!("{}", snafu::Report::from_error(err));
        std::process::exit(-1);
    });

    for (name, value) in metadata.iter() {
        let rendered = value.to_string();
        let rendered = if full {
            rendered
        } else {
            truncate_for_display(rendered)
        };
        println!("{name}: {rendered}");
    }
    log::info!("Normalized image shape: {:?}", image.shape());

    if no_image {
        return;
    }

    let output = output.unwrap_or_else(|| {
        let mut path = PathBuf::from(dataset.describe().filepath);
        path.set_extension("png");
        path
    });

    let Some(gray) = to_gray_image(&image) else {
        log::error!(
            "Cannot write a {}-dimensional image as PNG, use --no-image",
            image.ndim()
        );
        std::process::exit(-2);
    };
    gray.save(&output).unwrap_or_else(|err| {
        log::error!("Could not write {}: {err}", output.display());
        std::process::exit(-2);
    });
    log::info!("Image saved to {}", output.display());
}

#[cfg(test)]
mod tests {
    use crate::App;
    use clap::{CommandFactory, Parser};

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn no_image_conflicts_with_output() {
        assert!(App::try_parse_from(["dicom-normalize", "ct.dcm", "--no-image", "-o", "x.png"]).is_err());
        let app = App::try_parse_from(["dicom-normalize", "ct.dcm", "--full", "-v"]).unwrap();
        assert!(app.full && app.verbose && !app.no_image);
        assert_eq!(app.file, "ct.dcm");
    }
}
