use std::io::Read;
use std::sync::Arc;

use dicom::core::dictionary::DataDictionary;
use dicom::core::header::Header;
use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::{Tag, VR};
use dicom::dictionary_std::tags;
use dicom::object::mem::InMemFragment;
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use ndarray::{Array, ArrayD, Axis, Ix4};
use num_traits::NumCast;
use snafu::{OptionExt, ResultExt};

use crate::error::{
    ConvertAttributeSnafu, ConvertPixelDataSnafu, DecodeError, DecodePixelDataSnafu,
    FloatPixelShapeSnafu, MissingAttributeSnafu, MissingMagicCodeSnafu, MissingPixelDataSnafu,
    ReadObjectSnafu, ReadStreamSnafu, UnsupportedSampleTypeSnafu,
};
use crate::image_pipeline::RawPixels;
use crate::model::{tabulate, MetadataValue};
use crate::utils::{element_name, is_binary_vr};

const PREAMBLE_LEN: usize = 128;
const MAGIC_CODE: &[u8; 4] = b"DICM";

/// The elements and pixel array read from one DICOM file.
#[derive(Debug, Clone)]
pub struct DecodedDicom {
    /// Named elements of the main data set, in file order.
    pub elements: Vec<(String, MetadataValue)>,
    pub pixels: RawPixels,
}

/// Turns a byte stream into named elements and a pixel array.
pub trait DicomDecoder {
    fn decode(&self, source: &mut dyn Read) -> Result<DecodedDicom, DecodeError>;
}

impl<T: DicomDecoder + ?Sized> DicomDecoder for &T {
    fn decode(&self, source: &mut dyn Read) -> Result<DecodedDicom, DecodeError> {
        (**self).decode(source)
    }
}

impl<T: DicomDecoder + ?Sized> DicomDecoder for Arc<T> {
    fn decode(&self, source: &mut dyn Read) -> Result<DecodedDicom, DecodeError> {
        (**self).decode(source)
    }
}

/// Decoder for DICOM files with native (uncompressed) pixel data.
///
/// Accepts files with or without the 128-byte preamble.
/// Pixel samples keep their stored values, the modality LUT is not applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecoder;

impl DicomDecoder for StandardDecoder {
    fn decode(&self, source: &mut dyn Read) -> Result<DecodedDicom, DecodeError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes).context(ReadStreamSnafu)?;

        let start = magic_code_offset(&bytes).context(MissingMagicCodeSnafu)?;
        let object = dicom::object::from_reader(&bytes[start..]).context(ReadObjectSnafu)?;

        let elements = dataset_elements(&*object);
        let pixels = decode_pixels(&object)?;
        log::debug!(
            "Decoded {} elements and a {:?} {} pixel array",
            elements.len(),
            pixels.shape(),
            pixels.sample_type()
        );

        Ok(DecodedDicom { elements, pixels })
    }
}

fn magic_code_offset(bytes: &[u8]) -> Option<usize> {
    if bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + MAGIC_CODE.len()) == Some(&MAGIC_CODE[..]) {
        Some(PREAMBLE_LEN)
    } else if bytes.starts_with(MAGIC_CODE) {
        Some(0)
    } else {
        None
    }
}

fn dataset_elements<D>(object: &InMemDicomObject<D>) -> Vec<(String, MetadataValue)>
where
    D: DataDictionary + Clone,
{
    object
        .iter()
        .map(|element| {
            (
                element_name(element.tag()),
                element_value(element.value(), element.vr()),
            )
        })
        .collect()
}

fn element_value<D>(value: &Value<InMemDicomObject<D>, InMemFragment>, vr: VR) -> MetadataValue
where
    D: DataDictionary + Clone,
{
    match value {
        Value::Primitive(primitive) => primitive_value(primitive, vr),
        Value::Sequence(sequence) => MetadataValue::Sequence(
            sequence
                .items()
                .iter()
                .map(|item| tabulate(dataset_elements(item)))
                .collect(),
        ),
        Value::PixelSequence(sequence) => MetadataValue::Fragments(sequence.fragments().to_vec()),
    }
}

fn primitive_value(value: &PrimitiveValue, vr: VR) -> MetadataValue {
    match value {
        PrimitiveValue::Empty => MetadataValue::Empty,
        _ if is_binary_vr(vr) => MetadataValue::Bytes(value.to_bytes().into_owned()),
        PrimitiveValue::Str(text) => MetadataValue::Text(trim_padding(text)),
        PrimitiveValue::Strs(values) => collapse(
            values.iter().map(|text| trim_padding(text)),
            MetadataValue::Text,
            MetadataValue::TextList,
        ),
        PrimitiveValue::Date(_) | PrimitiveValue::Time(_) | PrimitiveValue::DateTime(_) => {
            collapse(
                value.to_multi_str().iter().map(|text| trim_padding(text)),
                MetadataValue::Text,
                MetadataValue::TextList,
            )
        }
        PrimitiveValue::Tags(values) => collapse(
            values.iter().copied(),
            MetadataValue::Tag,
            MetadataValue::TagList,
        ),
        PrimitiveValue::U8(values) => collapse(
            values.iter().map(|&v| u64::from(v)),
            MetadataValue::UInt,
            MetadataValue::UIntList,
        ),
        PrimitiveValue::U16(values) => collapse(
            values.iter().map(|&v| u64::from(v)),
            MetadataValue::UInt,
            MetadataValue::UIntList,
        ),
        PrimitiveValue::U32(values) => collapse(
            values.iter().map(|&v| u64::from(v)),
            MetadataValue::UInt,
            MetadataValue::UIntList,
        ),
        PrimitiveValue::U64(values) => collapse(
            values.iter().copied(),
            MetadataValue::UInt,
            MetadataValue::UIntList,
        ),
        PrimitiveValue::I16(values) => collapse(
            values.iter().map(|&v| i64::from(v)),
            MetadataValue::Int,
            MetadataValue::IntList,
        ),
        PrimitiveValue::I32(values) => collapse(
            values.iter().map(|&v| i64::from(v)),
            MetadataValue::Int,
            MetadataValue::IntList,
        ),
        PrimitiveValue::I64(values) => collapse(
            values.iter().copied(),
            MetadataValue::Int,
            MetadataValue::IntList,
        ),
        PrimitiveValue::F32(values) => collapse(
            values.iter().map(|&v| f64::from(v)),
            MetadataValue::Float,
            MetadataValue::FloatList,
        ),
        PrimitiveValue::F64(values) => collapse(
            values.iter().copied(),
            MetadataValue::Float,
            MetadataValue::FloatList,
        ),
    }
}

fn collapse<T>(
    values: impl IntoIterator<Item = T>,
    one: fn(T) -> MetadataValue,
    many: fn(Vec<T>) -> MetadataValue,
) -> MetadataValue {
    let mut values: Vec<T> = values.into_iter().collect();
    match values.len() {
        0 => MetadataValue::Empty,
        1 => one(values.remove(0)),
        _ => many(values),
    }
}

fn trim_padding(text: &str) -> String {
    text.trim_matches(|ch: char| ch == '\0' || ch.is_whitespace())
        .to_string()
}

/// Pixel samples in their stored type, taken from Pixel Data,
/// Float Pixel Data or Double Float Pixel Data in that order.
fn decode_pixels(object: &DefaultDicomObject) -> Result<RawPixels, DecodeError> {
    if object.element(tags::PIXEL_DATA).is_ok() {
        return decode_integer_pixels(object);
    }
    if let Ok(element) = object.element(tags::FLOAT_PIXEL_DATA) {
        let samples = element.to_multi_float32().context(ConvertAttributeSnafu {
            name: "FloatPixelData",
        })?;
        return Ok(RawPixels::F32(squeeze(float_frames(object, samples)?)));
    }
    if let Ok(element) = object.element(tags::DOUBLE_FLOAT_PIXEL_DATA) {
        let samples = element.to_multi_float64().context(ConvertAttributeSnafu {
            name: "DoubleFloatPixelData",
        })?;
        return Ok(RawPixels::F64(squeeze(float_frames(object, samples)?)));
    }
    MissingPixelDataSnafu.fail()
}

fn decode_integer_pixels(object: &DefaultDicomObject) -> Result<RawPixels, DecodeError> {
    let bits_allocated: u16 = required_attribute(object, tags::BITS_ALLOCATED, "BitsAllocated")?;
    let pixel_representation: u16 =
        optional_attribute(object, tags::PIXEL_REPRESENTATION, "PixelRepresentation")?
            .unwrap_or(0);
    let signed = pixel_representation == 1;
    if !matches!(bits_allocated, 8 | 16 | 32) {
        return UnsupportedSampleTypeSnafu {
            bits_allocated,
            signed,
        }
        .fail();
    }

    let decoded = object.decode_pixel_data().context(DecodePixelDataSnafu)?;
    if decoded.samples_per_pixel() > 1 {
        log::warn!(
            "Pixel data has {} samples per pixel, normalizing all samples together",
            decoded.samples_per_pixel()
        );
    }

    let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    let pixels = match (bits_allocated, signed) {
        (8, false) => RawPixels::U8(squeeze(
            decoded
                .to_ndarray_with_options::<u8>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (8, true) => RawPixels::I8(squeeze(
            decoded
                .to_ndarray_with_options::<i8>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (16, false) => RawPixels::U16(squeeze(
            decoded
                .to_ndarray_with_options::<u16>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (16, true) => RawPixels::I16(squeeze(
            decoded
                .to_ndarray_with_options::<i16>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (32, false) => RawPixels::U32(squeeze(
            decoded
                .to_ndarray_with_options::<u32>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (32, true) => RawPixels::I32(squeeze(
            decoded
                .to_ndarray_with_options::<i32>(&options)
                .context(ConvertPixelDataSnafu)?,
        )),
        (bits_allocated, signed) => {
            return UnsupportedSampleTypeSnafu {
                bits_allocated,
                signed,
            }
            .fail()
        }
    };
    Ok(pixels)
}

/// Lays out float samples as `[frames, rows, columns, samples per pixel]`.
fn float_frames<T>(
    object: &DefaultDicomObject,
    samples: Vec<T>,
) -> Result<Array<T, Ix4>, DecodeError> {
    let rows: usize = required_attribute(object, tags::ROWS, "Rows")?;
    let columns: usize = required_attribute(object, tags::COLUMNS, "Columns")?;
    let samples_per_pixel: usize =
        optional_attribute(object, tags::SAMPLES_PER_PIXEL, "SamplesPerPixel")?.unwrap_or(1);
    let frames: usize =
        optional_attribute(object, tags::NUMBER_OF_FRAMES, "NumberOfFrames")?.unwrap_or(1);
    Array::from_shape_vec((frames, rows, columns, samples_per_pixel), samples)
        .context(FloatPixelShapeSnafu)
}

fn required_attribute<T>(
    object: &DefaultDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<T, DecodeError>
where
    T: Clone + NumCast + std::str::FromStr<Err = std::num::ParseIntError>,
{
    optional_attribute(object, tag, name)?.context(MissingAttributeSnafu { name })
}

fn optional_attribute<T>(
    object: &DefaultDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<Option<T>, DecodeError>
where
    T: Clone + NumCast + std::str::FromStr<Err = std::num::ParseIntError>,
{
    match object.element(tag) {
        Ok(element) => element
            .to_int::<T>()
            .map(Some)
            .context(ConvertAttributeSnafu { name }),
        Err(_) => Ok(None),
    }
}

/// Drops the sample axis of single-sample images and the frame axis
/// of single-frame images, so a plain image comes out as `[rows, columns]`.
fn squeeze<T>(array: Array<T, Ix4>) -> ArrayD<T> {
    let mut array = array.into_dyn();
    if array.len_of(Axis(3)) == 1 {
        array = array.index_axis_move(Axis(3), 0);
    }
    if array.len_of(Axis(0)) == 1 {
        array = array.index_axis_move(Axis(0), 0);
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{dicom_value, DataElement, Tag};
    use dicom::dictionary_std::uids;
    use dicom::object::FileMetaTableBuilder;
    use ndarray::{Array4, IxDyn};

    fn file_object(elements: Vec<DataElement<InMemDicomObject>>) -> DefaultDicomObject {
        InMemDicomObject::from_element_iter(elements)
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("2.25.99"),
            )
            .unwrap()
    }

    fn float_image(
        rows: u16,
        columns: u16,
        frames: Option<&str>,
    ) -> Vec<DataElement<InMemDicomObject>> {
        let mut elements = vec![
            DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, dicom_value!(U16, [1])),
            DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [rows])),
            DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [columns])),
        ];
        if let Some(frames) = frames {
            elements.push(DataElement::new(
                tags::NUMBER_OF_FRAMES,
                VR::IS,
                dicom_value!(Str, frames),
            ));
        }
        elements
    }

    #[test]
    fn finds_magic_code_with_and_without_preamble() {
        let mut with_preamble = vec![0_u8; PREAMBLE_LEN];
        with_preamble.extend_from_slice(b"DICM\x02\x00");
        assert_eq!(magic_code_offset(&with_preamble), Some(PREAMBLE_LEN));
        assert_eq!(magic_code_offset(b"DICM\x02\x00"), Some(0));
        assert_eq!(magic_code_offset(b"not a dicom file"), None);
        assert_eq!(magic_code_offset(&[]), None);
    }

    #[test]
    fn garbage_is_rejected_before_parsing() {
        let mut source: &[u8] = b"plain text, not DICOM";
        let err = StandardDecoder.decode(&mut source).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMagicCode));
    }

    #[test]
    fn single_frame_grayscale_squeezes_to_two_dimensions() {
        let array = Array4::<u16>::zeros((1, 3, 4, 1));
        assert_eq!(squeeze(array).shape(), &[3, 4]);

        let frames = Array4::<u16>::zeros((5, 3, 4, 1));
        assert_eq!(squeeze(frames).shape(), &[5, 3, 4]);

        let rgb = Array4::<u8>::zeros((1, 3, 4, 3));
        assert_eq!(squeeze(rgb).shape(), &[3, 4, 3]);
    }

    #[test]
    fn primitive_values_map_to_tagged_values() {
        assert_eq!(
            primitive_value(&dicom_value!(Str, "Jane^Doe  "), VR::PN),
            MetadataValue::from("Jane^Doe")
        );
        assert_eq!(
            primitive_value(&dicom_value!(Strs, ["ORIGINAL", "PRIMARY"]), VR::CS),
            MetadataValue::TextList(vec!["ORIGINAL".to_string(), "PRIMARY".to_string()])
        );
        assert_eq!(
            primitive_value(&dicom_value!(U16, [512]), VR::US),
            MetadataValue::UInt(512)
        );
        assert_eq!(
            primitive_value(&dicom_value!(I32, [-1, 2]), VR::SL),
            MetadataValue::IntList(vec![-1, 2])
        );
        assert_eq!(
            primitive_value(&dicom_value!(F64, [0.5]), VR::FD),
            MetadataValue::Float(0.5)
        );
        assert_eq!(
            primitive_value(&dicom_value!(U8, [0, 1]), VR::OB),
            MetadataValue::Bytes(vec![0, 1])
        );
        assert_eq!(
            primitive_value(&PrimitiveValue::Empty, VR::LO),
            MetadataValue::Empty
        );
    }

    #[test]
    fn binary_payloads_stay_bytes_whatever_the_parsed_type() {
        assert_eq!(
            primitive_value(&dicom_value!(U16, [1, 2]), VR::OW),
            MetadataValue::Bytes(vec![1, 0, 2, 0])
        );
        assert_eq!(
            primitive_value(&dicom_value!(F32, [1.0]), VR::OF),
            MetadataValue::Bytes(1.0_f32.to_le_bytes().to_vec())
        );
        assert_eq!(
            primitive_value(&dicom_value!(U32, [7]), VR::UN),
            MetadataValue::Bytes(vec![7, 0, 0, 0])
        );
        // the same numbers under a numeric VR are values
        assert_eq!(
            primitive_value(&dicom_value!(U16, [1, 2]), VR::US),
            MetadataValue::UIntList(vec![1, 2])
        );
    }

    #[test]
    fn float_pixel_data_is_laid_out_by_frames_rows_and_columns() {
        let mut elements = float_image(2, 2, Some("2"));
        elements.push(DataElement::new(
            tags::FLOAT_PIXEL_DATA,
            VR::OF,
            dicom_value!(F32, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
        ));

        let RawPixels::F32(pixels) = decode_pixels(&file_object(elements)).unwrap() else {
            panic!("expected f32 samples");
        };
        assert_eq!(pixels.shape(), &[2, 2, 2]);
        assert_eq!(pixels[IxDyn(&[1, 0, 1])], 5.0);
    }

    #[test]
    fn double_float_pixel_data_keeps_f64_samples() {
        let mut elements = float_image(1, 3, None);
        elements.push(DataElement::new(
            tags::DOUBLE_FLOAT_PIXEL_DATA,
            VR::OD,
            dicom_value!(F64, [0.25, 0.5, 1.0]),
        ));

        let pixels = decode_pixels(&file_object(elements)).unwrap();
        assert_eq!(pixels.sample_type(), "f64");
        assert_eq!(pixels.shape(), &[1, 3]);
    }

    #[test]
    fn float_pixel_data_must_fill_the_image() {
        let mut elements = float_image(2, 2, None);
        elements.push(DataElement::new(
            tags::FLOAT_PIXEL_DATA,
            VR::OF,
            dicom_value!(F32, [0.0, 1.0, 2.0]),
        ));

        let err = decode_pixels(&file_object(elements)).unwrap_err();
        assert!(matches!(err, DecodeError::FloatPixelShape { .. }));
    }

    #[test]
    fn float_pixel_data_needs_rows() {
        let elements = vec![
            DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [2])),
            DataElement::new(tags::FLOAT_PIXEL_DATA, VR::OF, dicom_value!(F32, [0.0, 1.0])),
        ];
        let err = decode_pixels(&file_object(elements)).unwrap_err();
        assert!(matches!(err, DecodeError::MissingAttribute { name: "Rows" }));
    }

    #[test]
    fn one_bit_pixel_data_is_unsupported() {
        let mut elements = float_image(2, 4, None);
        elements.extend([
            DataElement::new(tags::BITS_ALLOCATED, VR::US, dicom_value!(U16, [1])),
            DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, dicom_value!(U16, [0])),
            DataElement::new(tags::PIXEL_DATA, VR::OB, dicom_value!(U8, [0b1010_1010, 0])),
        ]);
        let err = decode_pixels(&file_object(elements)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnsupportedSampleType {
                bits_allocated: 1,
                signed: false
            }
        ));
    }

    #[test]
    fn sequences_become_nested_tables() {
        let item = InMemDicomObject::from_element_iter([DataElement::new(
            tags::CODE_VALUE,
            VR::SH,
            dicom_value!(Str, "T-D0050"),
        )]);
        let object = InMemDicomObject::from_element_iter([
            DataElement::new(tags::MODALITY, VR::CS, dicom_value!(Str, "CT")),
            DataElement::new(
                tags::ANATOMIC_REGION_SEQUENCE,
                VR::SQ,
                Value::from(dicom::core::value::DataSetSequence::from(vec![item])),
            ),
            DataElement::new(Tag(0x0009, 0x1001), VR::LO, dicom_value!(Str, "vendor")),
        ]);

        let elements = dataset_elements(&object);
        let names: Vec<_> = elements.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Modality", "Anatomic Region Sequence", "Private Tag (0009,1001)"]
        );

        let MetadataValue::Sequence(items) = &elements[1].1 else {
            panic!("expected a sequence, got {:?}", elements[1].1);
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("Code Value"), Some(&MetadataValue::from("T-D0050")));
    }
}
