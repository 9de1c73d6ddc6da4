//! HTML minification applied before compression.
//!
//! This is lossy for whitespace that matters, e.g., inside `<pre>`.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<!--[\s\S]*?-->").unwrap());
static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RE_BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static RE_BEFORE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+>").unwrap());
static RE_AFTER_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\s+").unwrap());
static RE_HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html|<!doctype html|<body|<div|<span|<p>").unwrap());

/// Strip comments and collapse whitespace
pub fn minify(html: &str) -> String {
    let result = RE_COMMENT.replace_all(html, "");
    let result = RE_SPACE.replace_all(&result, " ");
    let result = RE_BETWEEN_TAGS.replace_all(&result, "><");
    let result = RE_BEFORE_CLOSE.replace_all(&result, ">");
    RE_AFTER_OPEN.replace_all(&result, "<").to_string()
}

/// Decide whether to minify, by extension first, then by looking for common tags
pub fn is_html(path: &Path, content: &str) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if ext == "html" || ext == "htm" {
            return true;
        }
    }
    RE_HTML_TAG.is_match(content)
}

#[test]
fn comments_and_whitespace() {
    let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Sample Page</title>\n  </head>\n  <!-- multi\n  line -->\n  <body>\n    <h1>Hello   World</h1>\n  </body>\n</html>\n";
    assert_eq!(minify(html),"<!DOCTYPE html><html><head><title>Sample Page</title></head><body><h1>Hello World</h1></body></html> ");
}

#[test]
fn delimiters() {
    assert_eq!(minify("< p class=\"x\" >text</ p >"),"<p class=\"x\">text</ p>");
    // comments are not greedy
    assert_eq!(minify("a<!-- 1 -->b<!-- 2 -->c"),"abc");
}

#[test]
fn minify_settles() {
    for html in ["<div>\n\t<span> x </span>  </div>","  <p>one</p>\r\n<p>two</p>  ","plain text"] {
        let once = minify(html);
        assert_eq!(minify(&once),once);
    }
}

#[test]
fn detection() {
    assert!(is_html(Path::new("index.HTML"),""));
    assert!(is_html(Path::new("old.htm"),"no tags here"));
    assert!(is_html(Path::new("notes.txt"),"see <DIV class=a>"));
    assert!(is_html(Path::new("notes.txt"),"<!doctype HTML>"));
    assert!(!is_html(Path::new("notes.txt"),"a < b and c > d"));
    assert!(!is_html(Path::new("page.html.uc"),"\u{105}"));
}
