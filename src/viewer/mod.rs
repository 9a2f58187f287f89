//! Post viewer.
//!
//! [`PostView`] holds one project already resolved into in-memory resources
//! (see [`crate::resolve`]) plus the file-preview state, and renders the
//! page as an HTML fragment. Interaction is driven by the caller:
//! [`PostView::select_file`], [`PostView::close_preview`],
//! [`PostView::download_selected`] and [`PostView::edit`].
//!
//! Props are trusted: nothing here validates file or link contents.

pub mod download;
pub mod markdown;
pub mod preview;

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pulldown_cmark_escape::escape_html;

use download::{ObjectUrlRegistry, SaveSink};
use markdown::render_markdown;
use preview::{preview_body, PreviewBody, PreviewState};

/// Styles the page relies on. Content images never overflow their column.
const STYLE: &str = "<style>\
.post-thumbnail img{width:100%;height:360px;object-fit:cover}\
.post-content{max-width:800px;margin:0 auto}\
.post-content img{max-width:100%;height:auto}\
.file-preview img{max-width:100%;max-height:70vh;object-fit:contain}\
</style>";

/// A file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResource {
    pub name: String,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl BinaryResource {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == "application/pdf"
    }

    /// `"1.25 MB"`
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.bytes.len() as f64 / (1024.0 * 1024.0))
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone)]
pub struct FileAttachment {
    /// Id of the record file this was resolved from (`img-0`, ...).
    pub file_id: String,
    pub file: Arc<BinaryResource>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAttachment {
    pub url: String,
    pub description: Option<String>,
}

pub type EditCallback = Box<dyn Fn() + Send + Sync>;

pub struct PostView {
    pub title: String,
    pub subtitle: String,
    /// Markdown.
    pub content: String,
    pub keywords: Vec<String>,
    pub thumbnail: Option<BinaryResource>,
    pub files: Vec<FileAttachment>,
    pub links: Vec<LinkAttachment>,
    on_edit: Option<EditCallback>,
    preview: PreviewState,
}

impl PostView {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            content: content.into(),
            keywords: Vec::new(),
            thumbnail: None,
            files: Vec::new(),
            links: Vec::new(),
            on_edit: None,
            preview: PreviewState::Idle,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: BinaryResource) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_files(mut self, files: Vec<FileAttachment>) -> Self {
        self.files = files;
        self
    }

    pub fn with_links(mut self, links: Vec<LinkAttachment>) -> Self {
        self.links = links;
        self
    }

    pub fn on_edit(mut self, callback: EditCallback) -> Self {
        self.on_edit = Some(callback);
        self
    }

    pub fn preview_state(&self) -> PreviewState {
        self.preview
    }

    pub fn has_attachments(&self) -> bool {
        !self.files.is_empty() || !self.links.is_empty()
    }

    pub fn select_file(&mut self, index: usize) -> Result<()> {
        if index >= self.files.len() {
            bail!(
                "no file at index {} ({} attached)",
                index,
                self.files.len()
            );
        }
        self.preview.select(index);
        Ok(())
    }

    pub fn close_preview(&mut self) {
        self.preview.close();
    }

    pub fn selected_file(&self) -> Option<&FileAttachment> {
        self.preview.selected().and_then(|i| self.files.get(i))
    }

    /// Invoke the edit callback. Returns `false` when none was supplied.
    pub fn edit(&self) -> bool {
        match self.on_edit {
            Some(ref callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Download the previewed file. Fails when nothing is selected.
    pub fn download_selected(&self, registry: &ObjectUrlRegistry, sink: &dyn SaveSink) -> Result<()> {
        let Some(selected) = self.selected_file() else {
            bail!("no file is being previewed");
        };
        download::download(&selected.file, registry, sink)
    }

    /// The page as an HTML fragment, including the preview dialog when a
    /// file is selected.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(STYLE);
        out.push_str("<article class=\"post\">");
        self.render_header(&mut out);

        if let Some(ref thumb) = self.thumbnail {
            let _ = write!(
                out,
                "<figure class=\"post-thumbnail\"><img src=\"{}\" alt=\"{}\"></figure>",
                thumb.data_url(),
                escape(&self.title)
            );
        }

        out.push_str("<section class=\"post-content\">");
        out.push_str(&render_markdown(&self.content));
        out.push_str("</section>");

        if !self.keywords.is_empty() {
            out.push_str("<section class=\"post-keywords\"><h2>Keywords</h2><ul>");
            for keyword in &self.keywords {
                let _ = write!(out, "<li class=\"chip\">{}</li>", escape(keyword));
            }
            out.push_str("</ul></section>");
        }

        if self.has_attachments() {
            out.push_str("<section class=\"post-attachments\">");
            self.render_files(&mut out);
            self.render_links(&mut out);
            out.push_str("</section>");
        }

        if let Some(selected) = self.selected_file() {
            render_preview(&mut out, selected);
        }

        out.push_str("</article>");
        out
    }

    /// [`render`](Self::render) wrapped in a standalone HTML document.
    pub fn render_page(&self) -> String {
        format!(
            "<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
            escape(&self.title),
            self.render()
        )
    }

    fn render_header(&self, out: &mut String) {
        let _ = write!(
            out,
            "<header class=\"post-header\"><h1 class=\"post-title\">{}</h1><p class=\"post-subtitle\">{}</p>",
            escape(&self.title),
            escape(&self.subtitle)
        );
        if self.on_edit.is_some() {
            out.push_str("<button type=\"button\" class=\"post-edit\" data-action=\"edit\">Edit</button>");
        }
        out.push_str("</header>");
    }

    fn render_files(&self, out: &mut String) {
        if self.files.is_empty() {
            return;
        }
        out.push_str("<div class=\"post-files\"><h2>첨부 자료</h2><ul>");
        for (index, attachment) in self.files.iter().enumerate() {
            let file = &attachment.file;
            let tile = if file.is_image() {
                format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    file.data_url(),
                    escape(&file.name)
                )
            } else if file.is_pdf() {
                "<span class=\"file-icon pdf\" aria-hidden=\"true\"></span>".to_string()
            } else {
                "<span class=\"file-icon\" aria-hidden=\"true\"></span>".to_string()
            };
            let _ = write!(
                out,
                "<li><button type=\"button\" data-action=\"preview\" data-file-index=\"{}\" data-file-id=\"{}\">{}<span class=\"file-name\">{}</span><span class=\"file-size\">{}</span></button>",
                index,
                escape(&attachment.file_id),
                tile,
                escape(&file.name),
                file.size_label()
            );
            if let Some(ref description) = attachment.description {
                let _ = write!(out, "<p class=\"file-description\">{}</p>", escape(description));
            }
            out.push_str("</li>");
        }
        out.push_str("</ul></div>");
    }

    fn render_links(&self, out: &mut String) {
        if self.links.is_empty() {
            return;
        }
        out.push_str("<div class=\"post-links\"><h2>첨부 링크</h2><ul>");
        for link in &self.links {
            let label = link.description.as_deref().unwrap_or(&link.url);
            let _ = write!(
                out,
                "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>",
                escape(&link.url),
                escape(label)
            );
        }
        out.push_str("</ul></div>");
    }
}

fn render_preview(out: &mut String, attachment: &FileAttachment) {
    let file = &attachment.file;
    let _ = write!(
        out,
        "<dialog class=\"file-preview\" open><h2>{}</h2><button type=\"button\" data-action=\"close\" aria-label=\"close\">×</button>",
        escape(&file.name)
    );
    match preview_body(file) {
        PreviewBody::Image { src } => {
            let _ = write!(out, "<img src=\"{}\" alt=\"{}\">", src, escape(&file.name));
        }
        PreviewBody::Unavailable => {
            out.push_str(
                "<div class=\"preview-unavailable\"><span class=\"file-icon\" aria-hidden=\"true\"></span><p>This file type cannot be previewed</p></div>",
            );
        }
    }
    out.push_str(
        "<div class=\"dialog-actions\"><button type=\"button\" data-action=\"close\">Close</button><button type=\"button\" data-action=\"download\">Download</button></div></dialog>",
    );
}

/// HTML escaping for text and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // writing into a String cannot fail
    let _ = escape_html(&mut out, text);
    out
}
