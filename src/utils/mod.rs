pub mod formatting;

pub use formatting::{element_name, format_tag, is_binary_vr, truncate_for_display};
