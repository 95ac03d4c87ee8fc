//! PDF fixtures for unit tests.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// A PDF with one page per entry of `widths`, each page using that width
/// for its MediaBox so page order can be checked after a merge.
pub(crate) fn sample_pdf(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = widths
        .iter()
        .map(|width| {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => Object::Name(b"Page".to_vec()),
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), (*width).into(), 792.into()]),
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(count),
        }),
    );
    finish(doc, pages_id)
}

/// A single-page PDF whose MediaBox only lives on the page tree root.
pub(crate) fn inherited_media_box_pdf(width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Page".to_vec()),
        "Parent" => Object::Reference(pages_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(vec![Object::Reference(page_id)]),
            "Count" => Object::Integer(1),
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), width.into(), 792.into()]),
        }),
    );
    finish(doc, pages_id)
}

/// MediaBox widths of all pages in document order.
pub(crate) fn page_widths(doc: &Document) -> Vec<i64> {
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}
