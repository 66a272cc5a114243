use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, StringFormat};
use std::{collections::BTreeMap, io::BufWriter, io::Write, mem};
use time::OffsetDateTime;

use crate::canvas::{Canvas, Color, FontFace, Paint, Rectangle, BLACK};
use crate::error::ContextError;
use crate::fonts::{FontData, GlyphMetrics};

/// The maximum number of entries of a single `beginbfchar` block of a CMap.
const CMAP_BLOCK_LENGTH: usize = 100;

impl FontData {
    /// Embeds the font as a Type0 font with a single CIDFontType2 descendant, writing its file,
    /// descriptor and ToUnicode map as separate objects, and returns the Type0 dictionary.
    fn insert_into_document(
        &self,
        face_identifier: &str,
        inner_document: &mut lopdf::Document,
    ) -> lopdf::Dictionary {
        let base_font = Object::Name(face_identifier.as_bytes().to_vec());

        // The font file is embedded whole and uncompressed
        let font_file = lopdf::Stream::new(
            dictionary! { "Length1" => self.bytes().len() as i64 },
            self.bytes().to_vec(),
        )
        .with_compression(false);
        let font_file_id = inner_document.add_object(font_file);
        let descriptor_id =
            inner_document.add_object(self.font_descriptor(base_font.clone(), font_file_id));

        let to_unicode = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            generate_cid_to_unicode_map(face_identifier, self.cmap_blocks()).into_bytes(),
        );
        let to_unicode_id = inner_document.add_object(to_unicode);

        let descendant_font = dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "W" => self.cid_widths(face_identifier),
            "DW" => 1000,
            "FontDescriptor" => descriptor_id,
        };

        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            // Horizontal writing mode, the shown strings are sequences of 2-bytes glyph IDs
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Dictionary(descendant_font)],
            "ToUnicode" => to_unicode_id,
        }
    }

    fn font_descriptor(&self, base_font: Object, font_file_id: lopdf::ObjectId) -> lopdf::Dictionary {
        let metrics = self.font_metrics();
        let (tallest_glyph, summed_advances) = self
            .glyph_ids()
            .into_keys()
            .filter_map(|glyph_id| self.glyph_metrics(glyph_id))
            .fold((0, 0), |(tallest, summed), glyph| {
                (tallest.max(glyph.height), summed + glyph.width)
            });
        let bounding_box: Vec<Object> = vec![
            0.into(),
            i64::from(metrics.descent).into(),
            (summed_advances as i64).into(),
            (tallest_glyph as i64).into(),
        ];

        dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font,
            "Ascent" => i64::from(metrics.ascent),
            "Descent" => i64::from(metrics.descent),
            "CapHeight" => i64::from(metrics.ascent),
            "ItalicAngle" => 0,
            // Nonsymbolic
            "Flags" => 32,
            "StemV" => 80,
            "FontBBox" => bounding_box,
            "FontFile2" => font_file_id,
        }
    }

    /// The mapped glyphs in ascending order, split into blocks sharing the high byte of
    /// their ID and holding at most `CMAP_BLOCK_LENGTH` entries.
    fn cmap_blocks(&self) -> Vec<CmapBlock> {
        let mapped_glyphs: BTreeMap<u16, char> = self
            .glyph_ids()
            .into_iter()
            .filter(|(glyph_id, _)| self.glyph_metrics(*glyph_id).is_some())
            .collect();

        let mut blocks: Vec<CmapBlock> = Vec::new();
        for (glyph_id, character) in mapped_glyphs {
            let starts_block = match blocks.last() {
                Some(block) => {
                    block.len() >= CMAP_BLOCK_LENGTH
                        || block.first().map(|(first, _)| first >> 8) != Some(glyph_id >> 8)
                }
                None => true,
            };
            if starts_block {
                blocks.push(Vec::new());
            }
            if let Some(block) = blocks.last_mut() {
                block.push((glyph_id, character));
            }
        }
        blocks
    }

    /// The `W` array of the descendant font: runs of consecutive glyph IDs with their widths in
    /// thousandths of an em, e.g. `20 [21 99 34]` for the glyphs 20, 21 and 22.
    fn cid_widths(&self, face_identifier: &str) -> Vec<Object> {
        let em_scale = 1000.0 / f32::from(self.font_metrics().units_per_em.max(1));
        let mut width_runs = Vec::<Object>::new();
        let mut run_start = 0_u16;
        let mut run_widths = Vec::<Object>::new();

        for glyph_id in 0..self.glyph_count() {
            let Some(GlyphMetrics { width, .. }) = self.glyph_metrics(glyph_id) else {
                log::trace!(
                    "Glyph {} of the font {:?} has no metrics, it keeps the default width",
                    glyph_id,
                    face_identifier
                );
                continue;
            };
            let contiguous = usize::from(run_start) + run_widths.len() == usize::from(glyph_id);
            if !contiguous && !run_widths.is_empty() {
                width_runs.push(i64::from(run_start).into());
                width_runs.push(Object::Array(mem::take(&mut run_widths)));
            }
            if run_widths.is_empty() {
                run_start = glyph_id;
            }
            run_widths.push(((width as f32 * em_scale) as i64).into());
        }
        if !run_widths.is_empty() {
            width_runs.push(i64::from(run_start).into());
            width_runs.push(Object::Array(run_widths));
        }
        width_runs
    }
}

/// A page of the document: its size in points and the content operations drawn on it.
#[derive(Debug, Clone)]
struct PdfPage {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
}

/// A PDF document under construction, drawn onto through the `Canvas` trait.
///
/// Pages are added with `add_page` and every drawing operation goes to the last page.
/// Fonts must be registered with `add_font` before text is measured or drawn with them.
/// Once everything is drawn, `write_all` assembles the document and `save` writes it out.
pub struct PdfDocument {
    /// The fonts of the document, with the object they are to be written to.
    fonts: BTreeMap<FontFace, (lopdf::ObjectId, FontData)>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly
    /// interacted with unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, used for the PDF `ID` tag.
    pub identifier: String,
    pages: Vec<PdfPage>,
    creation_date: OffsetDateTime,
}

impl PdfDocument {
    /// Creates an empty document following version 1.5 of the PDF specification.
    pub fn new(identifier: impl Into<String>) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: identifier.into(),
            pages: Vec::new(),
            creation_date: OffsetDateTime::now_utc(),
        }
    }

    /// Replaces the creation date written in the document information.
    pub fn with_creation_date(mut self, creation_date: OffsetDateTime) -> Self {
        self.creation_date = creation_date;
        self
    }

    /// Adds a page of the given size in points. The origin of its coordinates is moved to
    /// `[margin, margin]`, so that drawings at the origin keep clear of the page edges.
    pub fn add_page(&mut self, page_width: f32, page_height: f32, margin: f32) {
        let mut operations = Vec::new();
        if margin != 0.0 {
            operations.push(Operation::new(
                "cm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    margin.into(),
                    margin.into(),
                ],
            ));
        }
        self.pages.push(PdfPage {
            width: page_width,
            height: page_height,
            operations,
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Registers the font to be drawn with whenever the given face is requested.
    pub fn add_font(&mut self, font_face: FontFace, font: FontData) {
        let font_object_id = self.inner_document.new_object_id();
        self.fonts.insert(font_face, (font_object_id, font));
    }

    fn font(&self, font_face: FontFace) -> Result<&FontData, ContextError> {
        self.fonts
            .get(&font_face)
            .map(|(_, font)| font)
            .ok_or_else(|| {
                ContextError::with_context(format!(
                    "The font {:?} has not been added to the document",
                    font_face
                ))
            })
    }

    fn add_operations_to_current_page(
        &mut self,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_page = self.pages.last_mut().ok_or_else(|| {
            ContextError::with_context("Unable to draw on a document without pages")
        })?;
        pdf_page.operations.extend(operations);

        Ok(())
    }

    /// Assembles the pages, the fonts and the document information into the underlying document.
    ///
    /// The instance ID is the second part of the PDF `ID` tag, it changes whenever the document is regenerated.
    pub fn write_all(&mut self, instance_id: &str, title: &str) -> Result<(), ContextError> {
        let creation_date = to_pdf_timestamp_format(&self.creation_date);
        let document_info_id = self.inner_document.add_object(dictionary! {
            "Trapped" => "False",
            "CreationDate" => Object::string_literal(creation_date.clone()),
            "ModDate" => Object::string_literal(creation_date),
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
            "Identifier" => Object::string_literal(self.identifier.clone()),
        });

        let pages_id = self.inner_document.new_object_id();
        let catalog_id = self.inner_document.add_object(dictionary! {
            "Type" => "Catalog",
            "PageLayout" => "OneColumn",
            "PageMode" => "UseNone",
            "Pages" => pages_id,
        });

        let trailer = &mut self.inner_document.trailer;
        trailer.set("Root", catalog_id);
        trailer.set("Info", document_info_id);
        trailer.set(
            "ID",
            vec![
                Object::string_literal(self.identifier.clone()),
                Object::string_literal(instance_id),
            ],
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);
        let resources_id = self
            .inner_document
            .add_object(dictionary! { "Font" => fonts_dictionary_id });

        let mut page_references = Vec::<Object>::new();
        for pdf_page in mem::take(&mut self.pages) {
            let encoded_content = Content {
                operations: pdf_page.operations,
            }
            .encode()
            .map_err(|error| ContextError::with_error("Failed to encode the page content", &error))?;
            let content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content));

            let page_box: Vec<Object> =
                vec![0.into(), 0.into(), pdf_page.width.into(), pdf_page.height.into()];
            let page_id = self.inner_document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Rotate" => 0,
                "MediaBox" => page_box.clone(),
                "TrimBox" => page_box.clone(),
                "CropBox" => page_box,
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_references.push(page_id.into());
        }

        let page_count = page_references.len() as i64;
        self.inner_document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_count,
                "Kids" => page_references,
            }),
        );

        Ok(())
    }

    /// Save the document to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.save(&mut writer)?;
        writer.flush().map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    pub fn save<W: Write>(&mut self, writer: &mut W) -> Result<(), ContextError> {
        self.inner_document
            .save_to(writer)
            .map_err(|error| ContextError::with_error("Error while saving the PDF document", &error))
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_face, (font_object_id, font)) in self.fonts.iter() {
            let face_identifier = font_resource_name(*font_face);
            let collected_font_dictionary =
                font.insert_into_document(face_identifier, &mut self.inner_document);

            self.inner_document
                .objects
                .insert(*font_object_id, Object::Dictionary(collected_font_dictionary));
            font_dictionary.set(face_identifier, Object::Reference(*font_object_id));
        }
        font_dictionary
    }
}

impl Canvas for PdfDocument {
    fn measure_text(&self, text: &str, font: FontFace, font_size: f32) -> Result<f32, ContextError> {
        Ok(self.font(font)?.measure_text(text, font_size))
    }

    fn draw_text(
        &mut self,
        text: &str,
        font: FontFace,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        let glyph_id_list = self.font(font)?.glyphs_for_text(text);
        if glyph_id_list.is_empty() {
            return Ok(());
        }

        let glyph_id_bytes = glyph_id_list
            .iter()
            .flat_map(|glyph_id| glyph_id.to_be_bytes())
            .collect::<Vec<u8>>();
        let [x, y] = position;
        self.add_operations_to_current_page(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_resource_name(font).into()), font_size.into()],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("rg", color_operands(BLACK)),
            Operation::new(
                "Tj",
                vec![Object::String(glyph_id_bytes, StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ])
    }

    fn draw_rectangle(&mut self, rectangle: Rectangle, paint: Paint) -> Result<(), ContextError> {
        let Rectangle {
            x,
            y,
            width,
            height,
        } = rectangle;
        let path = Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]);

        // Each rectangle is isolated in its own graphics state (q/Q)
        let operations = match paint {
            Paint::Stroke { line_width } => vec![
                Operation::new("q", vec![]),
                Operation::new("w", vec![line_width.into()]),
                Operation::new("RG", color_operands(BLACK)),
                path,
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ],
            Paint::Fill { color } => vec![
                Operation::new("q", vec![]),
                Operation::new("rg", color_operands(color)),
                path,
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        self.add_operations_to_current_page(operations)
    }
}

fn color_operands(color: Color) -> Vec<Object> {
    color.into_iter().map(Object::Real).collect()
}

/// The name the font is referred to with in the page resources.
fn font_resource_name(font_face: FontFace) -> &'static str {
    match font_face {
        FontFace::Regular => "F0",
        FontFace::Bold => "F1",
        FontFace::Serif => "F2",
    }
}

type CmapBlock = Vec<(u16, char)>;

/// Generates the ToUnicode CMap of a font, which maps the glyph IDs back to the text they render
/// so that the text of the document can be searched and copied.
fn generate_cid_to_unicode_map(face_name: &str, all_cmap_blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map =
        format!(include_str!("../assets/gid_to_unicode_beg.txt"), face_name);

    for cmap_block in all_cmap_blocks.into_iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\r\n", cmap_block.len()));
        for (glyph_id, character) in cmap_block {
            // Characters outside of the basic multilingual plane are written as surrogate pairs
            let mut utf16_buffer = [0_u16; 2];
            let unicode = character
                .encode_utf16(&mut utf16_buffer)
                .iter()
                .map(|unit| format!("{unit:04x}"))
                .collect::<String>();
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{unicode}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\r\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/gid_to_unicode_end.txt"));

    cid_to_unicode_map
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::WHITE_SMOKE;

    #[test]
    fn timestamps_follow_the_pdf_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }

    #[test]
    fn cmap_blocks_map_glyphs_to_utf16() {
        let cmap = generate_cid_to_unicode_map("F0", vec![vec![], vec![(3, 'A'), (4, 'ع')]]);
        assert!(cmap.contains("/CMapName /F0-UCS def"));
        assert!(cmap.contains("2 beginbfchar\r\n<0003> <0041>\n<0004> <0639>\nendbfchar"));
        assert_eq!(cmap.matches("beginbfchar").count(), 1);
        assert!(cmap.trim_end().ends_with("end"));
    }

    #[test]
    fn drawing_requires_a_page_and_a_font() {
        let mut pdf_document = PdfDocument::new("test");
        let rectangle = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert!(pdf_document
            .draw_rectangle(rectangle, Paint::Stroke { line_width: 1.0 })
            .is_err());

        pdf_document.add_page(100.0, 100.0, 0.0);
        assert!(pdf_document
            .draw_text("Total", FontFace::Bold, 10.0, [0.0, 0.0])
            .is_err());
        assert!(pdf_document
            .measure_text("Total", FontFace::Bold, 10.0)
            .is_err());
    }

    #[test]
    fn written_document_can_be_loaded_back() {
        let mut pdf_document = PdfDocument::new("0123456789abcdef0123456789abcdef")
            .with_creation_date(OffsetDateTime::UNIX_EPOCH);
        pdf_document.add_page(615.28, 861.89, 10.0);
        pdf_document
            .draw_rectangle(
                Rectangle::new(25.0, 700.0, 100.0, 20.0),
                Paint::Fill { color: WHITE_SMOKE },
            )
            .unwrap();
        pdf_document
            .draw_rectangle(
                Rectangle::new(25.0, 700.0, 100.0, 20.0),
                Paint::Stroke { line_width: 1.5 },
            )
            .unwrap();
        pdf_document.add_page(615.28, 861.89, 10.0);
        assert_eq!(pdf_document.page_count(), 2);

        pdf_document
            .write_all("fedcba9876543210fedcba9876543210", "Invoice")
            .unwrap();
        let pdf_document_bytes = pdf_document.save_to_bytes().unwrap();
        assert!(pdf_document_bytes.starts_with(b"%PDF-1.5"));

        let loaded_document = lopdf::Document::load_mem(&pdf_document_bytes).unwrap();
        assert_eq!(loaded_document.get_pages().len(), 2);
    }
}
