use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Rating and descriptive tags embedded in a single image file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMeta {
    /// Star rating 0-5, `None` when the file carries no rating.
    pub rating: Option<u8>,
    /// Subject tags, lowercased.
    pub tags: BTreeSet<String>,
}

/// Classification of one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaOutcome {
    Image(ImageMeta),
    /// Image extension but the file could not be read or is not a valid image.
    Unreadable,
    NotAnImage,
}

/// Collaborator that reads embedded metadata for a single file.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> MetaOutcome;
}

/// Default reader: XMP packet scan for rating and subject tags, plus the
/// EXIF/TIFF Rating tag for JPEGs. Per-file failures never escape; they are
/// reported through [`MetaOutcome`] and absorbed by the scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMetadataReader;

const EXIF_RATING: exif::Tag = exif::Tag(exif::Context::Tiff, 0x4746);

impl MetadataReader for FileMetadataReader {
    fn read(&self, path: &Path) -> MetaOutcome {
        let is_jpeg = match extension(path) {
            Some(ext) if ext == "jpg" || ext == "jpeg" => true,
            Some(ext) if ext == "png" => false,
            _ => return MetaOutcome::NotAnImage,
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => return MetaOutcome::Unreadable,
        };
        if image::guess_format(&bytes).is_err() {
            return MetaOutcome::Unreadable;
        }

        let mut meta = ImageMeta::default();
        if let Some(xmp) = extract_xmp_packet(&bytes) {
            meta.rating = xmp_rating(xmp);
            meta.tags = xmp_subjects(xmp);
        }
        if is_jpeg
            && let Some(rating) = exif_rating(&bytes)
        {
            meta.rating = Some(rating);
        }
        MetaOutcome::Image(meta)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|s| s.to_ascii_lowercase())
}

fn exif_rating(bytes: &[u8]) -> Option<u8> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(EXIF_RATING, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Short(arr) if !arr.is_empty() => Some((arr[0] as u8).min(5)),
        exif::Value::Long(arr) if !arr.is_empty() => Some((arr[0].min(5)) as u8),
        _ => None,
    }
}

/// Slice out the `<x:xmpmeta ...>...</x:xmpmeta>` packet, wherever the
/// container embedded it.
fn extract_xmp_packet(bytes: &[u8]) -> Option<&str> {
    const OPEN: &[u8] = b"<x:xmpmeta";
    const CLOSE: &[u8] = b"</x:xmpmeta>";
    let start = find(bytes, OPEN, 0)?;
    let end = find(bytes, CLOSE, start)?;
    std::str::from_utf8(&bytes[start..end + CLOSE.len()]).ok()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// `xmp:Rating` in either attribute or element form, clamped to 0-5.
fn xmp_rating(xmp: &str) -> Option<u8> {
    let raw = attr_value(xmp, "xmp:Rating").or_else(|| element_text(xmp, "xmp:Rating"))?;
    let value: i64 = raw.trim().parse().ok()?;
    Some(value.clamp(0, 5) as u8)
}

/// `dc:subject` bag items, lowercased.
fn xmp_subjects(xmp: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    let Some(block) = element_body(xmp, "dc:subject") else {
        return tags;
    };
    let mut rest = block;
    while let Some(start) = rest.find("<rdf:li") {
        let after = &rest[start..];
        let Some(open_end) = after.find('>') else { break };
        let Some(close) = after.find("</rdf:li>") else {
            break;
        };
        if close > open_end {
            let text = after[open_end + 1..close].trim();
            if !text.is_empty() {
                tags.insert(text.to_lowercase());
            }
        }
        rest = &after[close + "</rdf:li>".len()..];
    }
    tags
}

fn attr_value<'a>(xmp: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{name}=\"");
    let start = xmp.find(&marker)? + marker.len();
    let end = xmp[start..].find('"')?;
    Some(&xmp[start..start + end])
}

fn element_text<'a>(xmp: &'a str, name: &str) -> Option<&'a str> {
    element_body(xmp, name).map(str::trim)
}

fn element_body<'a>(xmp: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let start = xmp.find(&open)?;
    let body_start = start + xmp[start..].find('>')? + 1;
    let end = body_start + xmp[body_start..].find(&close)?;
    Some(&xmp[body_start..end])
}
