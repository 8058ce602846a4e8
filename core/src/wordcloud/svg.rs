// SVG output for a rendered word cloud frame.

use super::transition::RenderedWord;
use std::fmt::Write;

pub const PLACEHOLDER_TEXT: &str = "No word data";

/// Render words into a standalone SVG document. An empty frame renders the
/// placeholder text centered on the canvas.
pub fn render_svg(words: &[RenderedWord], width: f64, height: f64) -> String {
    let mut body = String::new();

    let visible: Vec<&RenderedWord> = words
        .iter()
        .filter(|w| w.visual.opacity > 0.0 && w.visual.font_size > 0.0)
        .collect();

    if visible.is_empty() {
        let _ = writeln!(
            body,
            r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" dominant-baseline="middle" font-size="16" fill="#999999">{}</text>"##,
            width / 2.0,
            height / 2.0,
            PLACEHOLDER_TEXT
        );
    }

    for word in visible {
        let v = &word.visual;
        let transform = if word.rotation != 0 {
            format!(r#" transform="rotate({} {:.1} {:.1})""#, word.rotation, v.x, v.y)
        } else {
            String::new()
        };
        let _ = writeln!(
            body,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" dominant-baseline="middle" font-size="{:.1}" fill="{}" fill-opacity="{:.3}"{}>{}</text>"#,
            v.x,
            v.y,
            v.font_size,
            word.color,
            v.opacity,
            transform,
            escape_xml(&word.text)
        );
    }

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
        w = width,
        h = height,
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
