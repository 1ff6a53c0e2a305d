//! Typed HTML document with an embedded JSON-LD block.
//!
//! Every piece of catalog or detail text passes through [`escape_html`] or
//! `serde_json` on its way out, so titles and lyrics cannot break the markup
//! or close the structured-data script.

use std::fmt::Write;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// `<meta name=..>` vs `<meta property=..>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKey {
    Name,
    Property,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetaTag {
    pub key: MetaKey,
    pub id: String,
    pub content: String,
}

impl MetaTag {
    pub fn name(id: &str, content: impl Into<String>) -> Self {
        Self {
            key: MetaKey::Name,
            id: id.to_string(),
            content: content.into(),
        }
    }

    pub fn property(id: &str, content: impl Into<String>) -> Self {
        Self {
            key: MetaKey::Property,
            id: id.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub rel: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Nav {
        label: String,
        links: Vec<Link>,
    },
    Heading {
        level: u8,
        text: String,
    },
    Paragraph(String),
    Image {
        src: String,
        alt: String,
        width: u32,
    },
    /// One `<pre>`, one entry per line.
    Preformatted(Vec<String>),
    Audio {
        src: String,
        mime: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub lang: String,
    pub title: String,
    pub canonical_url: String,
    pub meta: Vec<MetaTag>,
    pub structured_data: serde_json::Value,
    /// Hidden from visitors; carries the text crawlers index.
    pub seo_body: Vec<Block>,
    /// Element the client-side player mounts into.
    pub player_element_id: String,
}

impl Document {
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(8 * 1024);

        out.push_str("<!DOCTYPE html>\n");
        let _ = writeln!(out, "<html lang=\"{}\">", escape_html(&self.lang));
        out.push_str("<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(&self.title));
        for tag in &self.meta {
            let attr = match tag.key {
                MetaKey::Name => "name",
                MetaKey::Property => "property",
            };
            let _ = writeln!(
                out,
                "<meta {attr}=\"{}\" content=\"{}\">",
                escape_html(&tag.id),
                escape_html(&tag.content)
            );
        }
        let _ = writeln!(
            out,
            "<link rel=\"canonical\" href=\"{}\">",
            escape_html(&self.canonical_url)
        );
        let _ = writeln!(
            out,
            "<script type=\"application/ld+json\">{}</script>",
            script_safe_json(&self.structured_data)
        );
        out.push_str("</head>\n<body>\n");

        out.push_str("<div id=\"seo-content\" hidden>\n");
        for block in &self.seo_body {
            write_block(&mut out, block);
        }
        out.push_str("</div>\n");
        let _ = writeln!(
            out,
            "<div id=\"{}\"></div>",
            escape_html(&self.player_element_id)
        );
        out.push_str("</body>\n</html>\n");

        out
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Nav { label, links } => {
            let _ = write!(out, "<nav aria-label=\"{}\">", escape_html(label));
            for (i, link) in links.iter().enumerate() {
                if i > 0 {
                    out.push_str(" | ");
                }
                write_link(out, link);
            }
            out.push_str("</nav>\n");
        }
        Block::Heading { level, text } => {
            let level = (*level).clamp(1, 6);
            let _ = writeln!(out, "<h{level}>{}</h{level}>", escape_html(text));
        }
        Block::Paragraph(text) => {
            let _ = writeln!(out, "<p>{}</p>", escape_html(text));
        }
        Block::Image { src, alt, width } => {
            let _ = writeln!(
                out,
                "<img src=\"{}\" alt=\"{}\" width=\"{width}\">",
                escape_html(src),
                escape_html(alt)
            );
        }
        Block::Preformatted(lines) => {
            out.push_str("<pre>");
            for line in lines {
                out.push_str(&escape_html(line));
                out.push('\n');
            }
            out.push_str("</pre>\n");
        }
        Block::Audio { src, mime } => {
            let _ = writeln!(
                out,
                "<audio controls><source src=\"{}\" type=\"{mime}\"></audio>",
                escape_html(src)
            );
        }
    }
}

fn write_link(out: &mut String, link: &Link) {
    out.push_str("<a href=\"");
    out.push_str(&escape_html(&link.href));
    out.push('"');
    if let Some(rel) = link.rel {
        let _ = write!(out, " rel=\"{rel}\"");
    }
    out.push('>');
    out.push_str(&escape_html(&link.text));
    out.push_str("</a>");
}

/// Escape text for element content and double-quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize JSON for inline `<script>` use. `serde_json` already escapes
/// quotes; `<` is additionally escaped so no `</script>` or `<!--` sequence
/// can appear.
pub fn script_safe_json(value: &serde_json::Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            self.to_html(),
        )
            .into_response()
    }
}
