use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised while loading a DICOM dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not open `{}`", path))]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Could not list files under `{}`", path))]
    List {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("No partitions found under `{}`", path))]
    NoPartitions { path: String },

    /// The byte stream is not a usable DICOM file.
    #[snafu(display("Could not decode DICOM data from `{}`", path))]
    Decode { path: String, source: DecodeError },

    #[snafu(display("Could not normalize pixel data from `{}`", path))]
    Normalize {
        path: String,
        source: NormalizeError,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum DecodeError {
    #[snafu(display("Could not read DICOM byte stream"))]
    ReadStream { source: std::io::Error },

    #[snafu(display("Missing DICM magic code"))]
    MissingMagicCode,

    #[snafu(display("Could not parse DICOM object"))]
    ReadObject { source: dicom::object::ReadError },

    /// None of Pixel Data, Float Pixel Data or Double Float Pixel Data is present.
    #[snafu(display("Missing pixel data element"))]
    MissingPixelData,

    #[snafu(display("Missing required attribute {}", name))]
    MissingAttribute { name: &'static str },

    #[snafu(display("Could not read attribute {}", name))]
    ConvertAttribute {
        name: &'static str,
        source: dicom::core::value::ConvertValueError,
    },

    #[snafu(display("Could not decode pixel data"))]
    DecodePixelData { source: dicom::pixeldata::Error },

    #[snafu(display("Could not convert pixel data into an array"))]
    ConvertPixelData { source: dicom::pixeldata::Error },

    #[snafu(display("Float pixel data does not match the image dimensions"))]
    FloatPixelShape { source: ndarray::ShapeError },

    #[snafu(display(
        "Unsupported pixel sample type ({} bits allocated, signed: {})",
        bits_allocated,
        signed
    ))]
    UnsupportedSampleType { bits_allocated: u16, signed: bool },
}

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum NormalizeError {
    /// The clipped pixel array has no positive finite maximum,
    /// so there is no range to stretch.
    #[snafu(display("Pixel array maximum after clipping is {}, expected a positive finite value", max))]
    DegenerateRange { max: f64 },
}
