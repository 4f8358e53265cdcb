//! HTML serialization of a presentation subtree with consistent escaping
use crate::dom::{Host, NodeId, NodeKind};
use phf::phf_set;

// Elements serialized without a closing tag
static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
};

/// Consistent HTML attribute escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn text_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Serialize `node` and everything below it.
pub fn to_html<H: Host + ?Sized>(host: &H, node: NodeId) -> String {
    let mut out = String::new();
    write_node(host, node, &mut out);
    out
}

/// Serialize only the children of `node`.
pub fn inner_html<H: Host + ?Sized>(host: &H, node: NodeId) -> String {
    let mut out = String::new();
    for child in host.children(node) {
        write_node(host, child, &mut out);
    }
    out
}

fn write_node<H: Host + ?Sized>(host: &H, node: NodeId, out: &mut String) {
    match host.kind(node) {
        Some(NodeKind::Text) => out.push_str(&text_escape(host.text(node).unwrap_or(""))),
        Some(NodeKind::Fragment) => {
            for child in host.children(node) {
                write_node(host, child, out);
            }
        }
        Some(NodeKind::Element) => {
            let tag = host.tag_name(node).unwrap_or("div");
            out.push('<');
            out.push_str(tag);
            for (name, value) in host.attributes(node) {
                if value.is_empty() {
                    out.push_str(&format!(" {}", html_escape(&name)));
                } else {
                    out.push_str(&format!(r#" {}="{}""#, html_escape(&name), html_escape(&value)));
                }
            }
            out.push('>');

            if VOID_ELEMENTS.contains(tag) {
                return;
            }
            for child in host.children(node) {
                write_node(host, child, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
        None => {}
    }
}
