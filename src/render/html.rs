//! HTML fragments for the email content block

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};

/// Marker opening the generated content block
pub const CONTENT_START_MARKER: &str = "<!-- CONTEÚDO -->";

/// Marker closing the generated content block
pub const CONTENT_END_MARKER: &str = "<!-- /CONTEUDO -->";

/// Visual style of generated rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailStyle {
    /// CSS font stack for text rows and the button
    pub font_family: String,
    /// Text row font size in px
    pub text_font_size: u32,
    /// Text row color
    pub text_color: String,
    /// Call-to-action button label
    pub cta_label: String,
    /// Call-to-action button background
    pub cta_background: String,
}

impl Default for EmailStyle {
    fn default() -> Self {
        Self {
            font_family: "Inter, Arial, Helvetica, sans-serif".to_string(),
            text_font_size: 18,
            text_color: "#1D4E82".to_string(),
            cta_label: "Saiba mais".to_string(),
            cta_background: "#D22E2D".to_string(),
        }
    }
}

/// One row of the content block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Image slice, `src` relative to the HTML file
    Image { src: String },
    /// Selectable copy
    Text { text: String },
}

/// Build the complete content block, markers included
pub fn build_content(parts: &[ContentPart], cta_url: &str, style: &EmailStyle) -> String {
    let href = encode_double_quoted_attribute(cta_url);
    let font = encode_double_quoted_attribute(&style.font_family);

    let mut out = String::new();
    out.push_str(CONTENT_START_MARKER);
    out.push_str(
        "\n<table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\">",
    );

    for part in parts {
        match part {
            ContentPart::Image { src } => {
                out.push_str(&format!(
                    "\n  <tr><td>\n    <a href=\"{href}\" target=\"_blank\" rel=\"noopener\" title=\"Abrir\">\n      <img src=\"{}\" width=\"100%\" height=\"auto\" alt=\"\" style=\"display:block;border:0;outline:0;text-decoration:none;-ms-interpolation-mode:bicubic;\">\n    </a>\n  </td></tr>",
                    encode_double_quoted_attribute(src)
                ));
            }
            ContentPart::Text { text } => {
                out.push_str(&format!(
                    "\n  <tr><td align=\"left\" style=\"padding:24px 6%; font-family:{font}; font-size:{}px; line-height:1.5; color:{};\">{}</td></tr>\n",
                    style.text_font_size,
                    encode_double_quoted_attribute(&style.text_color),
                    encode_text(text)
                ));
            }
        }
    }

    out.push_str(&format!(
        "\n  <tr><td align=\"center\" style=\"padding:12px 0 32px;\">\n    <a href=\"{href}\" target=\"_blank\" rel=\"noopener\"\n       style=\"text-decoration:none;background:{};color:#ffffff;font-family:{font};font-weight:700;font-size:16px;line-height:16px;display:inline-block;padding:14px 40px;border-radius:16px;\">\n      {}\n    </a>\n  </td></tr>\n</table>\n",
        encode_double_quoted_attribute(&style.cta_background),
        encode_text(&style.cta_label)
    ));
    out.push_str(CONTENT_END_MARKER);

    out
}
