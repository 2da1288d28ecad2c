//! Typed-property flattening: one structured field in, one display string out.

use crate::contract::{PropertyField, PropertyValue};
use crate::render::flatten_rich_text;

/// Convert one typed field into its human-readable string form.
///
/// Absent sub-fields degrade to the empty string; unrecognized kinds yield
/// the empty string as the forward-compatible default. No failure path.
pub fn extract_property_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Title(spans) | PropertyValue::RichText(spans) => flatten_rich_text(spans),
        PropertyValue::Number(number) => number.map(|n| n.to_string()).unwrap_or_default(),
        PropertyValue::Select(option) | PropertyValue::Status(option) => {
            option.clone().unwrap_or_default()
        }
        PropertyValue::MultiSelect(names) => names.join(", "),
        PropertyValue::Date(date) => match date {
            Some(date) => match &date.end {
                Some(end) => format!("{} to {}", date.start, end),
                None => date.start.clone(),
            },
            None => String::new(),
        },
        PropertyValue::People(names) => names.join(", "),
        PropertyValue::Url(value)
        | PropertyValue::Email(value)
        | PropertyValue::PhoneNumber(value) => value.clone().unwrap_or_default(),
        PropertyValue::Checkbox(true) => "Yes".to_owned(),
        PropertyValue::Checkbox(false) => "No".to_owned(),
        PropertyValue::Files(names) => names.join(", "),
        PropertyValue::Unknown => String::new(),
    }
}

/// Resolve an item's title: the flattened value of whichever field is tagged
/// as title, or "Untitled" when no such field exists.
pub fn resolve_title(properties: &[PropertyField]) -> String {
    properties
        .iter()
        .find_map(|field| match &field.value {
            PropertyValue::Title(spans) => Some(flatten_rich_text(spans)),
            _ => None,
        })
        .unwrap_or_else(|| "Untitled".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DateValue, RichTextSpan};

    fn spans(text: &str) -> Vec<RichTextSpan> {
        vec![RichTextSpan::new(text)]
    }

    #[test]
    fn text_kinds_flatten() {
        assert_eq!(extract_property_value(&PropertyValue::Title(spans("T"))), "T");
        assert_eq!(
            extract_property_value(&PropertyValue::RichText(vec![
                RichTextSpan::new("a"),
                RichTextSpan::new("b"),
            ])),
            "ab"
        );
    }

    #[test]
    fn number_renders_decimal_or_empty() {
        assert_eq!(extract_property_value(&PropertyValue::Number(Some(42.0))), "42");
        assert_eq!(
            extract_property_value(&PropertyValue::Number(Some(2.5))),
            "2.5"
        );
        assert_eq!(extract_property_value(&PropertyValue::Number(None)), "");
    }

    #[test]
    fn select_and_status_use_option_name() {
        assert_eq!(
            extract_property_value(&PropertyValue::Select(Some("Active".into()))),
            "Active"
        );
        assert_eq!(extract_property_value(&PropertyValue::Select(None)), "");
        assert_eq!(
            extract_property_value(&PropertyValue::Status(Some("Done".into()))),
            "Done"
        );
    }

    #[test]
    fn multi_valued_kinds_join_with_comma() {
        assert_eq!(
            extract_property_value(&PropertyValue::MultiSelect(vec![
                "a".into(),
                "b".into()
            ])),
            "a, b"
        );
        assert_eq!(
            extract_property_value(&PropertyValue::People(vec![
                "Ada".into(),
                "Grace".into()
            ])),
            "Ada, Grace"
        );
        assert_eq!(
            extract_property_value(&PropertyValue::Files(vec![
                "a.pdf".into(),
                "b.png".into()
            ])),
            "a.pdf, b.png"
        );
    }

    #[test]
    fn date_renders_start_or_range() {
        assert_eq!(
            extract_property_value(&PropertyValue::Date(Some(DateValue {
                start: "2024-01-01".into(),
                end: None,
            }))),
            "2024-01-01"
        );
        assert_eq!(
            extract_property_value(&PropertyValue::Date(Some(DateValue {
                start: "2024-01-01".into(),
                end: Some("2024-01-31".into()),
            }))),
            "2024-01-01 to 2024-01-31"
        );
        assert_eq!(extract_property_value(&PropertyValue::Date(None)), "");
    }

    #[test]
    fn checkbox_renders_yes_no() {
        assert_eq!(extract_property_value(&PropertyValue::Checkbox(true)), "Yes");
        assert_eq!(extract_property_value(&PropertyValue::Checkbox(false)), "No");
    }

    #[test]
    fn unknown_kind_is_empty() {
        assert_eq!(extract_property_value(&PropertyValue::Unknown), "");
    }

    #[test]
    fn title_resolution_takes_first_title_field() {
        let fields = vec![
            PropertyField {
                name: "Status".into(),
                value: PropertyValue::Status(Some("Done".into())),
            },
            PropertyField {
                name: "Name".into(),
                value: PropertyValue::Title(spans("My page")),
            },
        ];
        assert_eq!(resolve_title(&fields), "My page");
    }

    #[test]
    fn title_resolution_falls_back_to_untitled() {
        assert_eq!(resolve_title(&[]), "Untitled");

        // A present-but-empty title field resolves to empty, not "Untitled".
        let fields = vec![PropertyField {
            name: "Name".into(),
            value: PropertyValue::Title(Vec::new()),
        }];
        assert_eq!(resolve_title(&fields), "");
    }
}
