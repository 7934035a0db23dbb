//! Minimal PDF 1.4 writer: A4 pages of Helvetica text lines

use super::{Line, Style};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;

fn font_size(style: Style) -> f32 {
    match style {
        Style::Title => 16.0,
        Style::Heading => 12.0,
        Style::Body | Style::Rule => 10.0,
    }
}

/// PDF string literal body in WinAnsi; characters outside Latin-1 become `?`
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Content streams, one per page
fn paginate(lines: &[Line]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut content = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        let size = font_size(line.style);
        let leading = if line.style == Style::Heading { size * 2.0 } else { size * 1.5 };
        if y - leading < MARGIN {
            pages.push(std::mem::take(&mut content));
            y = PAGE_HEIGHT - MARGIN;
        }
        y -= leading;

        match line.style {
            Style::Rule => {
                let at = y + size * 0.5;
                content.push_str(&format!(
                    "0.8 G {:.1} {:.1} m {:.1} {:.1} l S\n",
                    MARGIN,
                    at,
                    PAGE_WIDTH - MARGIN,
                    at
                ));
            }
            style => {
                let font = if style == Style::Body { "F1" } else { "F2" };
                content.push_str(&format!(
                    "BT /{} {:.0} Tf {:.1} {:.1} Td ({}) Tj ET\n",
                    font,
                    size,
                    MARGIN,
                    y,
                    escape(&line.text)
                ));
            }
        }
    }
    pages.push(content);
    pages
}

pub(super) fn render(lines: &[Line]) -> Vec<u8> {
    let pages = paginate(lines);

    // 1 catalog, 2 page tree, 3-4 fonts, then a page and its content per page
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 5 + i * 2)).collect();
    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()).into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
    ];
    for (i, content) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                6 + i * 2
            )
            .into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content.as_bytes());
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{generated_at, sample_view};
    use crate::render::layout;

    fn body(count: usize) -> Vec<Line> {
        (0..count)
            .map(|i| Line {
                style: Style::Body,
                text: format!("line {}", i),
            })
            .collect()
    }

    #[test]
    fn escapes_delimiters_and_latin1() {
        assert_eq!(escape("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape("Área"), "\\301rea");
        assert_eq!(escape("日本"), "??");
    }

    #[test]
    fn document_is_well_formed() {
        let pdf = render(&layout(&sample_view(), "REQUEST DESK", generated_at()));
        let text = String::from_utf8_lossy(&pdf);

        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("(Request SOL-2026-0007) Tj"));

        // startxref points at the xref table
        let start: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(text[start..].starts_with("xref\n"));

        // Every xref entry points at its object header
        let entries: Vec<usize> = text[start..]
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (i, offset) in entries.iter().enumerate() {
            assert!(text[*offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }

    #[test]
    fn long_documents_spill_onto_more_pages() {
        assert_eq!(paginate(&body(10)).len(), 1);
        let pages = paginate(&body(200));
        assert!(pages.len() > 1);
        let pdf = String::from_utf8_lossy(&render(&body(200))).to_string();
        assert!(pdf.contains(&format!("/Count {}", pages.len())));
    }
}
