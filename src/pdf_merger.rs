use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::book::Chapter;
use crate::error::MergeError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// Append-only accumulator of PDF documents, kept in insertion order.
pub struct MergedDocument {
    documents: Vec<(String, Document)>,
}

impl MergedDocument {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    /// Seed an accumulator with a single PDF, e.g. a complete book.
    pub fn from_pdf(label: impl Into<String>, data: &[u8]) -> Result<Self, MergeError> {
        let mut merged = Self::new();
        merged.append(label, data)?;
        Ok(merged)
    }

    /// Append the content of every chapter in slice order.
    ///
    /// Every chapter must have been downloaded; a missing one fails the
    /// whole merge so a book is never assembled from a subset of chapters.
    pub fn from_chapters(chapters: &[Chapter]) -> Result<Self, MergeError> {
        let mut merged = Self::new();
        for chapter in chapters {
            let data = chapter.content.as_deref().ok_or_else(|| MergeError::MissingContent {
                title: chapter.title.clone(),
            })?;
            merged.append(chapter.title.clone(), data)?;
        }
        Ok(merged)
    }

    pub fn append(&mut self, label: impl Into<String>, data: &[u8]) -> Result<(), MergeError> {
        let label = label.into();
        let document = Document::load_mem(data).map_err(|e| MergeError::Malformed {
            label: label.clone(),
            reason: e.to_string(),
        })?;

        debug!("Loaded PDF with {} pages from '{}'", document.get_pages().len(), label);
        self.documents.push((label, document));
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.documents
            .iter()
            .map(|(_, doc)| doc.get_pages().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.page_count() == 0
    }

    /// Combine all appended documents into one.
    ///
    /// Fails with [`MergeError::Empty`] when there is not a single page.
    pub fn into_document(self) -> Result<Document, MergeError> {
        if self.is_empty() {
            return Err(MergeError::Empty);
        }

        debug!("Starting PDF merge process with {} documents", self.documents.len());

        let mut merged = Document::with_version("1.5");
        let pages_id = merged.new_object_id();
        let mut max_id = merged.max_id + 1;
        let mut kids: Vec<ObjectId> = Vec::new();

        for (label, mut doc) in self.documents {
            doc.renumber_objects_with(max_id);
            max_id = doc.max_id + 1;

            let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
            debug!("Processing '{}' with {} pages", label, page_ids.len());

            let mut pages = Vec::with_capacity(page_ids.len());
            for page_id in page_ids {
                let mut page = doc
                    .get_dictionary(page_id)
                    .map_err(|e| MergeError::Malformed {
                        label: label.clone(),
                        reason: e.to_string(),
                    })?
                    .clone();

                for key in INHERITABLE {
                    if !page.has(key) {
                        if let Some(value) = inherited_attribute(&doc, &page, key) {
                            page.set(key.to_vec(), value);
                        }
                    }
                }
                page.set("Parent", Object::Reference(pages_id));
                pages.push((page_id, page));
            }

            for (object_id, object) in doc.objects {
                match object_type(&object) {
                    Some(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline") => {}
                    _ => {
                        merged.objects.insert(object_id, object);
                    }
                }
            }

            for (page_id, page) in pages {
                merged.objects.insert(page_id, Object::Dictionary(page));
                kids.push(page_id);
            }
        }

        debug!("Total pages collected: {}", kids.len());

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(kids.len() as i64));
        pages_dict.set(
            "Kids",
            Object::Array(kids.into_iter().map(Object::Reference).collect()),
        );
        merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

        merged.max_id = max_id;
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = merged.add_object(Object::Dictionary(catalog));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        Ok(merged)
    }

    /// Serialize the merged book.
    pub fn into_bytes(self) -> Result<Vec<u8>, MergeError> {
        let mut document = self.into_document()?;
        let mut data = Vec::new();
        document
            .save_to(&mut data)
            .map_err(|e| MergeError::Serialize(e.to_string()))?;
        Ok(data)
    }
}

impl Default for MergedDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn object_type(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}
