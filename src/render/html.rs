//! Markdown to styled HTML for the Google Docs import.
//!
//! Covers what the report template produces: headings, paragraphs, bullet
//! lists and fenced code. Inline Markdown is kept as literal text.

/// Page styles applied by the Docs import: brand-colored chapter headings and boxed code.
const STYLE: &str = "\
body{font-family:Arial,Helvetica,sans-serif;line-height:1.5}
h1{font-family:'Aldrich',sans-serif;font-size:20pt;color:#4376fc;font-weight:normal;margin:1.2em 0 .4em}
h2{font-family:Arial,Helvetica,sans-serif;font-size:16pt;color:#000000;font-weight:normal;margin:1em 0 .3em}
pre,code{font-family:Consolas,Menlo,monospace}
pre{white-space:pre-wrap;background:#f6f8fa;padding:.75rem;border-radius:8px}
table{border-collapse:collapse;margin:1em 0;width:100%}
th,td{border:1px solid #ddd;padding:6px;vertical-align:top}
blockquote{border-left:4px solid #ddd;margin:1em 0;padding:.5em 1em;color:#555}";

#[derive(Default)]
struct Writer {
    body: Vec<String>,
    paragraph: Vec<String>,
    list: Vec<String>,
    code: Option<Vec<String>>,
}

impl Writer {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.body.push(format!("<p>{}</p>", self.paragraph.join("<br>")));
            self.paragraph.clear();
        }
    }

    fn flush_list(&mut self) {
        if !self.list.is_empty() {
            let items: String = self.list.iter().map(|item| format!("<li>{item}</li>")).collect();
            self.body.push(format!("<ul>{items}</ul>"));
            self.list.clear();
        }
    }

    fn flush_text(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn flush_code(&mut self) {
        if let Some(lines) = self.code.take() {
            self.body.push(format!("<pre><code>{}</code></pre>", lines.join("\n")));
        }
    }
}

/// Render Markdown as a complete HTML document.
pub fn to_html(markdown: &str) -> String {
    let mut writer = Writer::default();

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            if writer.code.is_some() {
                writer.flush_code();
            } else {
                writer.flush_text();
                writer.code = Some(Vec::new());
            }
            continue;
        }

        if let Some(code) = writer.code.as_mut() {
            code.push(escape(line));
            continue;
        }

        if line.trim().is_empty() {
            writer.flush_text();
            continue;
        }

        if let Some((level, text)) = heading(line) {
            writer.flush_text();
            writer.body.push(format!("<h{level}>{}</h{level}>", escape(text)));
            continue;
        }

        match list_item(line) {
            Some(item) => {
                writer.flush_paragraph();
                writer.list.push(escape(item));
            }
            None => {
                writer.flush_list();
                writer.paragraph.push(escape(line.trim()));
            }
        }
    }

    writer.flush_text();
    writer.flush_code();

    format!("<!doctype html>\n<meta charset=\"utf-8\">\n<style>\n{STYLE}\n</style>\n<body>\n{}\n</body>", writer.body.join("\n"))
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();

    if level == 0 || level > 6 {
        return None;
    }

    line[level..].strip_prefix(' ').map(|text| (level, text.trim()))
}

fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")).map(str::trim)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }

    escaped
}
