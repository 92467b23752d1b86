//! PG-13 rendering: one filled NAVPERS 1070/613 per ship assignment.
//!
//! Two sources are supported:
//!
//! - **Template**: a PG-13 PDF carrying AcroForm text fields. The field tree
//!   is walked (including `/Kids`), `/V` is set on the four configured fields
//!   and `/NeedAppearances` asks the viewer to regenerate the widgets.
//! - **Generated**: no template configured. A one-page certificate carrying
//!   the same four values is drawn in Helvetica.
//!
//! The template is loaded once per run and cloned per form.

use crate::config::FormFields;
use crate::error::Pg13Error;
use crate::output::ShipAssignment;
use crate::pipeline::dates::format_mmddyy;
use crate::pipeline::layout::decode_pdf_string;
use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Text written into the four PG-13 fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValues {
    /// Sailor name, upper-cased.
    pub name: String,
    /// `MM/DD/YY TO MM/DD/YY`.
    pub subject: String,
    /// First remarks line.
    pub remarks: String,
    /// Ship name for the "on-board: ___ Category A vessel" sentence.
    pub ship: String,
}

impl FormValues {
    pub fn new(name: &str, assignment: &ShipAssignment) -> Self {
        let range = format!(
            "{} TO {}",
            format_mmddyy(assignment.start),
            format_mmddyy(assignment.end)
        );
        Self {
            name: name.trim().to_uppercase(),
            remarks: format!("____.REPORT CAREER SEA PAY FROM {}", range),
            subject: range,
            ship: assignment.ship.clone(),
        }
    }

    fn for_field<'a>(&'a self, fields: &FormFields, field: &str) -> Option<&'a str> {
        if field == fields.name {
            Some(&self.name)
        } else if field == fields.subject {
            Some(&self.subject)
        } else if field == fields.date {
            Some(&self.remarks)
        } else if field == fields.ship {
            Some(&self.ship)
        } else {
            None
        }
    }
}

/// Where forms come from.
#[derive(Debug, Clone)]
pub enum FormSource {
    Template(Document),
    Generated,
}

impl FormSource {
    /// Load the template at `path`, or fall back to the generated
    /// certificate when no template is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, Pg13Error> {
        match path {
            Some(p) => load_template(p).map(FormSource::Template),
            None => Ok(FormSource::Generated),
        }
    }
}

/// Load a PG-13 template and check that it carries form fields.
pub fn load_template(path: &Path) -> Result<Document, Pg13Error> {
    let unreadable = |detail: String| Pg13Error::TemplateUnreadable {
        path: path.to_path_buf(),
        detail,
    };
    let doc = Document::load(path).map_err(|e| unreadable(e.to_string()))?;
    let fields = acroform(&doc)
        .and_then(|form| form.get(b"Fields"))
        .and_then(Object::as_array)
        .map_err(|_| unreadable("no AcroForm fields".into()))?;
    if fields.is_empty() {
        return Err(unreadable("AcroForm has no fields".into()));
    }
    debug!("Loaded PG-13 template {} ({} root fields)", path.display(), fields.len());
    Ok(doc)
}

/// Render one form to PDF bytes.
pub fn render_form(
    source: &FormSource,
    fields: &FormFields,
    values: &FormValues,
) -> Result<Vec<u8>, Pg13Error> {
    let failed = |e: lopdf::Error| Pg13Error::RenderFailed {
        ship: values.ship.clone(),
        detail: e.to_string(),
    };
    let mut doc = match source {
        FormSource::Template(template) => {
            let mut doc = template.clone();
            fill_template(&mut doc, fields, values).map_err(failed)?;
            doc
        }
        FormSource::Generated => certificate(values).map_err(failed)?,
    };

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| Pg13Error::RenderFailed {
        ship: values.ship.clone(),
        detail: e.to_string(),
    })?;
    Ok(bytes)
}

/// `<SHIP>.pdf` with path separators and other unsafe characters replaced.
pub fn form_file_name(ship: &str) -> String {
    format!("{}.pdf", sanitize_component(ship, "FORM"))
}

/// Make `raw` safe as one archive path component.
pub(crate) fn sanitize_component(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

// ── Template fill ────────────────────────────────────────────────────────

fn root_id(doc: &Document) -> Result<ObjectId, lopdf::Error> {
    doc.trailer.get(b"Root")?.as_reference()
}

fn acroform(doc: &Document) -> Result<&Dictionary, lopdf::Error> {
    let catalog = doc.get_dictionary(root_id(doc)?)?;
    match catalog.get(b"AcroForm")? {
        Object::Reference(id) => doc.get_dictionary(*id),
        inline => inline.as_dict(),
    }
}

/// Every field node reachable from `/Fields`, with its partial name.
fn field_nodes(doc: &Document) -> Result<Vec<(ObjectId, String)>, lopdf::Error> {
    let roots = acroform(doc)?.get(b"Fields")?.as_array()?;
    let mut stack: Vec<ObjectId> = roots
        .iter()
        .rev()
        .filter_map(|o| o.as_reference().ok())
        .collect();
    let mut visited = HashSet::new();
    let mut nodes = Vec::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            continue;
        };
        if let Ok(name) = node.get(b"T").and_then(Object::as_str) {
            nodes.push((id, decode_pdf_string(name)));
        }
        if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
            stack.extend(kids.iter().rev().filter_map(|k| k.as_reference().ok()));
        }
    }
    Ok(nodes)
}

fn fill_template(
    doc: &mut Document,
    fields: &FormFields,
    values: &FormValues,
) -> Result<(), lopdf::Error> {
    let mut filled = HashSet::new();
    for (id, name) in field_nodes(doc)? {
        if let Some(value) = values.for_field(fields, &name) {
            doc.get_object_mut(id)?
                .as_dict_mut()?
                .set("V", text_string(value));
            filled.insert(name);
        }
    }
    for wanted in [&fields.name, &fields.subject, &fields.date, &fields.ship] {
        if !filled.contains(wanted.as_str()) {
            warn!("PG-13 template has no field named {:?}", wanted);
        }
    }

    let root = root_id(doc)?;
    let form_ref = doc.get_dictionary(root)?.get(b"AcroForm")?.as_reference().ok();
    let form = match form_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_object_mut(root)?
            .as_dict_mut()?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    };
    form.set("NeedAppearances", true);
    Ok(())
}

/// A PDF text string: a literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

// ── Generated certificate ────────────────────────────────────────────────

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;

fn certificate_lines(values: &FormValues) -> Vec<(i64, String)> {
    vec![
        (14, "ADMINISTRATIVE REMARKS NAVPERS 1070/613".to_string()),
        (11, format!("NAME: {}", values.name)),
        (11, format!("SUBJECT: {}", values.subject)),
        (11, values.remarks.clone()),
        (
            11,
            format!(
                "Member performed eight continuous hours per day on-board: {} Category A vessel.",
                values.ship
            ),
        ),
    ]
}

fn certificate(values: &FormValues) -> Result<Document, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for (size, line) in certificate_lines(values) {
        let encoded = WINDOWS_1252.encode(&line).0.into_owned();
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
        y -= 36;
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::pipeline::layout::page_layout;
    use chrono::NaiveDate;

    fn cole() -> ShipAssignment {
        ShipAssignment {
            ship: "USS COLE".into(),
            start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        }
    }

    /// A template whose AcroForm is an indirect object, with `Date` nested
    /// under a parent field's `/Kids`.
    fn template() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let name_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("NAME") });
        let subject_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("Subject") });
        let ship_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("SHIP") });
        let date_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("Date") });
        let other_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("Other") });
        let remarks_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("Remarks"),
            "Kids" => vec![date_id.into(), other_id.into()],
        });
        let form_id = doc.add_object(dictionary! {
            "Fields" => vec![name_id.into(), subject_id.into(), ship_id.into(), remarks_id.into()],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => form_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn field_value(doc: &Document, name: &str) -> Option<String> {
        field_nodes(doc)
            .unwrap()
            .into_iter()
            .find(|(_, n)| n == name)
            .and_then(|(id, _)| {
                let v = doc.get_dictionary(id).ok()?.get(b"V").ok()?.as_str().ok()?;
                Some(decode_pdf_string(v))
            })
    }

    #[test]
    fn values_follow_pg13_wording() {
        let v = FormValues::new("Doe, John A", &cole());
        assert_eq!(v.name, "DOE, JOHN A");
        assert_eq!(v.subject, "03/04/24 TO 03/09/24");
        assert_eq!(v.remarks, "____.REPORT CAREER SEA PAY FROM 03/04/24 TO 03/09/24");
        assert_eq!(v.ship, "USS COLE");
    }

    #[test]
    fn template_fill_sets_all_four_fields() {
        let source = FormSource::Template(template());
        let values = FormValues::new("Doe, John", &cole());
        let bytes = render_form(&source, &FormFields::default(), &values).unwrap();

        let filled = Document::load_mem(&bytes).unwrap();
        assert_eq!(field_value(&filled, "NAME").as_deref(), Some("DOE, JOHN"));
        assert_eq!(field_value(&filled, "Subject").as_deref(), Some("03/04/24 TO 03/09/24"));
        assert_eq!(field_value(&filled, "SHIP").as_deref(), Some("USS COLE"));
        assert_eq!(
            field_value(&filled, "Date").as_deref(),
            Some("____.REPORT CAREER SEA PAY FROM 03/04/24 TO 03/09/24")
        );
        assert_eq!(field_value(&filled, "Other"), None);

        let need = acroform(&filled)
            .unwrap()
            .get(b"NeedAppearances")
            .unwrap()
            .as_bool()
            .unwrap();
        assert!(need);
    }

    #[test]
    fn template_fill_leaves_the_template_untouched() {
        let template = template();
        let source = FormSource::Template(template.clone());
        render_form(&source, &FormFields::default(), &FormValues::new("Doe", &cole())).unwrap();
        if let FormSource::Template(t) = &source {
            assert_eq!(field_value(t, "NAME"), None);
        }
    }

    #[test]
    fn custom_field_names_are_used() {
        let fields = FormFields {
            ship: "Other".into(),
            ..FormFields::default()
        };
        let bytes = render_form(
            &FormSource::Template(template()),
            &fields,
            &FormValues::new("Doe", &cole()),
        )
        .unwrap();
        let filled = Document::load_mem(&bytes).unwrap();
        assert_eq!(field_value(&filled, "Other").as_deref(), Some("USS COLE"));
        assert_eq!(field_value(&filled, "SHIP"), None);
    }

    #[test]
    fn non_ascii_values_become_utf16() {
        assert_eq!(
            text_string("ÅS"),
            Object::String(vec![0xFE, 0xFF, 0x00, 0xC5, 0x00, 0x53], StringFormat::Hexadecimal)
        );
        assert_eq!(text_string("AB"), Object::string_literal("AB"));
    }

    #[test]
    fn generated_certificate_reads_back() {
        let values = FormValues::new("Doe, John", &cole());
        let bytes = render_form(&FormSource::Generated, &FormFields::default(), &values).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = page_layout(&doc, page_id, &GeneratorConfig::default()).unwrap();
        let lines: Vec<String> = page.rows.iter().map(|r| r.text()).collect();

        assert!(lines.contains(&"NAME: DOE, JOHN".to_string()), "{lines:?}");
        assert!(lines.contains(&"SUBJECT: 03/04/24 TO 03/09/24".to_string()));
        assert!(lines.contains(&values.remarks));
        assert!(lines
            .iter()
            .any(|l| l.contains("on-board: USS COLE Category A vessel.")));
    }

    #[test]
    fn template_without_fields_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        let mut doc = certificate(&FormValues::new("Doe", &cole())).unwrap();
        doc.save(&path).unwrap();
        assert!(matches!(
            load_template(&path),
            Err(Pg13Error::TemplateUnreadable { .. })
        ));
        assert!(matches!(
            FormSource::load(Some(&dir.path().join("missing.pdf"))),
            Err(Pg13Error::TemplateUnreadable { .. })
        ));
        assert!(matches!(FormSource::load(None), Ok(FormSource::Generated)));
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(form_file_name("USS COLE"), "USS COLE.pdf");
        assert_eq!(form_file_name("A/B\\C:D"), "A_B_C_D.pdf");
        assert_eq!(form_file_name(".."), "FORM.pdf");
    }
}
