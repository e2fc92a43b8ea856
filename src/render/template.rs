//! Email template loading and injection
//!
//! A template is plain HTML with three anchors:
//!
//! - `<title>...</title>` - replaced by the subject
//! - `<!-- SNIPPET -->` followed by a `<font>` element - its body becomes the preheader
//! - `<!-- CONTEÚDO -->` ... `<!-- /CONTEUDO -->` - replaced by the generated block
//!
//! Marker matching ignores case and inner whitespace, and accepts the
//! content markers with or without the accent.

use html_escape::encode_text;
use regex::{NoExpand, Regex};
use rust_embed::RustEmbed;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

use super::{RenderError, Result};

/// Name of the built-in template
pub const BUILTIN_TEMPLATE: &str = "default.html";

#[derive(RustEmbed)]
#[folder = "templates/"]
struct BuiltinTemplates;

/// Where the template HTML comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TemplateSource {
    /// Template compiled into the binary
    #[default]
    Builtin,
    /// Template file on disk
    File(PathBuf),
    /// Template markup given directly
    Inline(String),
}

impl TemplateSource {
    /// Load the template markup
    pub fn load(&self) -> Result<String> {
        match self {
            TemplateSource::Builtin => builtin_template(),
            TemplateSource::File(path) => read_template(path),
            TemplateSource::Inline(html) => Ok(html.clone()),
        }
    }
}

/// Load the built-in template
pub fn builtin_template() -> Result<String> {
    let file = BuiltinTemplates::get(BUILTIN_TEMPLATE)
        .ok_or_else(|| RenderError::Template(format!("missing built-in {}", BUILTIN_TEMPLATE)))?;
    String::from_utf8(file.data.into_owned())
        .map_err(|e| RenderError::Template(format!("built-in template is not UTF-8: {}", e)))
}

fn read_template(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RenderError::TemplateNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn title_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title>.*?</title>").ok())
        .as_ref()
}

fn snippet_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)(<!--\s*SNIPPET\s*-->.*?<font[^>]*>)(.*?)(</font>)").ok())
        .as_ref()
}

fn content_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!--\s*CONTE[ÚU]DO\s*-->.*?<!--\s*/CONTE[ÚU]DO\s*-->").ok()
    })
    .as_ref()
}

fn body_close_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</body>").ok()).as_ref()
}

/// Inject subject, preheader snippet and content block into a template.
///
/// `title` and `snippet` are escaped; `content` is inserted verbatim.
pub fn inject(template: &str, title: &str, snippet: &str, content: &str) -> String {
    let mut html = template.to_string();

    if let Some(re) = title_re() {
        let title_tag = format!("<title>{}</title>", encode_text(title));
        html = re.replace(&html, NoExpand(&title_tag)).into_owned();
    }

    if let Some(re) = snippet_re() {
        let snippet = encode_text(snippet);
        html = re
            .replace(&html, |caps: &regex::Captures<'_>| {
                format!("{}{}{}", &caps[1], snippet, &caps[3])
            })
            .into_owned();
    }

    match content_re() {
        Some(re) if re.is_match(&html) => re.replace(&html, NoExpand(content)).into_owned(),
        _ => {
            warn!("template has no content markers, inserting content before </body>");
            insert_before_body_close(&html, content)
        }
    }
}

fn insert_before_body_close(html: &str, content: &str) -> String {
    match body_close_re().and_then(|re| re.find(html)) {
        Some(m) => format!("{}{}\n{}", &html[..m.start()], content, &html[m.start()..]),
        None => format!("{}\n{}", html, content),
    }
}
