use dicom::core::dictionary::DataDictionary;
use dicom::core::{Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;

pub const MAX_VALUE_LEN: usize = 120;

pub fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}

/// Value representations holding opaque binary payloads.
pub fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN
    )
}

/// Human-readable element name for a tag, e.g. `Patient Name` for (0010,0010).
pub fn element_name(tag: Tag) -> String {
    match StandardDataDictionary.by_tag(tag) {
        Some(entry) => keyword_to_name(entry.alias),
        None if tag.group() % 2 == 1 => format!("Private Tag {}", format_tag(tag)),
        None => format!("Unknown Tag {}", format_tag(tag)),
    }
}

/// Splits a dictionary keyword into words, keeping acronyms together:
/// `SOPInstanceUID` becomes `SOP Instance UID`.
pub fn keyword_to_name(keyword: &str) -> String {
    let chars: Vec<char> = keyword.chars().collect();
    let mut name = String::with_capacity(keyword.len() + 4);
    for (idx, &ch) in chars.iter().enumerate() {
        if idx > 0 && ch.is_ascii_uppercase() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|c| c.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                name.push(' ');
            }
        }
        name.push(ch);
    }
    name
}

pub fn truncate_for_display(rendered: String) -> String {
    if rendered.chars().count() > MAX_VALUE_LEN {
        let mut truncated = rendered.chars().take(MAX_VALUE_LEN).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        rendered
    }
}
