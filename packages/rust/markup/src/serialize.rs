//! Markup serialization: compact (source-shaped) and pretty (one node per line).
//!
//! Both forms go through html5ever's `HtmlSerializer`, which owns escaping and
//! the namespace prefixes of foreign attributes. The pretty form only decides
//! where line breaks and indentation go.

use std::io::{self, Write};

use ego_tree::NodeRef;
use html5ever::serialize::{HtmlSerializer, SerializeOpts, Serializer, TraversalScope};
use html5ever::{namespace_url, ns};
use scraper::node::Element;
use scraper::{ElementRef, Node};

use crate::Document;

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is emitted without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Elements whose whitespace is significant and must not be re-indented.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

type PrettyWriter = HtmlSerializer<Vec<u8>>;

impl Document {
    /// Serialize the tree back to markup without adding or removing whitespace.
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Serialize the tree with one node per line, indented one space per level.
    ///
    /// Whitespace-only text between tags is dropped and other text is trimmed.
    /// Raw-text elements (`<style>`, `<script>`) keep their content verbatim and
    /// preformatted elements (`<pre>`, `<textarea>`) are written compactly.
    pub fn to_pretty_html(&self) -> io::Result<String> {
        let opts = SerializeOpts {
            scripting_enabled: false,
            traversal_scope: TraversalScope::IncludeNode,
            create_missing_parent: false,
        };
        let mut ser = HtmlSerializer::new(Vec::new(), opts);
        write_node(&mut ser, self.html.tree.root(), 0)?;
        String::from_utf8(ser.writer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn write_node(ser: &mut PrettyWriter, node: NodeRef<'_, Node>, depth: usize) -> io::Result<()> {
    let indent = " ".repeat(depth);
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(ser, child, depth)?;
            }
        }
        Node::Doctype(doctype) => {
            ser.writer.write_all(indent.as_bytes())?;
            ser.write_doctype(doctype.name())?;
            ser.writer.write_all(b"\n")?;
        }
        Node::Comment(comment) => {
            ser.writer.write_all(indent.as_bytes())?;
            ser.write_comment(comment)?;
            ser.writer.write_all(b"\n")?;
        }
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                ser.writer.write_all(indent.as_bytes())?;
                ser.write_text(trimmed)?;
                ser.writer.write_all(b"\n")?;
            }
        }
        Node::Element(element) => write_element(ser, node, element, depth, &indent)?,
        Node::ProcessingInstruction(_) => {}
    }
    Ok(())
}

fn write_element(
    ser: &mut PrettyWriter,
    node: NodeRef<'_, Node>,
    element: &Element,
    depth: usize,
    indent: &str,
) -> io::Result<()> {
    let is_html = element.name.ns == ns!(html);
    ser.writer.write_all(indent.as_bytes())?;

    if is_html && PREFORMATTED_ELEMENTS.contains(&element.name()) {
        if let Some(element_ref) = ElementRef::wrap(node) {
            ser.writer.write_all(element_ref.html().as_bytes())?;
        }
        return ser.writer.write_all(b"\n");
    }

    let attrs = element.attrs.iter().map(|(name, value)| (name, &value[..]));
    ser.start_elem(element.name.clone(), attrs)?;

    if is_html && VOID_ELEMENTS.contains(&element.name()) {
        ser.end_elem(element.name.clone())?;
        return ser.writer.write_all(b"\n");
    }

    if is_html && RAW_TEXT_ELEMENTS.contains(&element.name()) {
        let content: String = node
            .children()
            .filter_map(|child| child.value().as_text().map(|t| &t.text[..]))
            .collect();
        let content = content.trim();
        if !content.is_empty() {
            ser.writer.write_all(b"\n")?;
            ser.write_text(content)?;
            ser.writer.write_all(b"\n")?;
            ser.writer.write_all(indent.as_bytes())?;
        }
    } else if has_visible_children(node) {
        ser.writer.write_all(b"\n")?;
        for child in node.children() {
            write_node(ser, child, depth + 1)?;
        }
        ser.writer.write_all(indent.as_bytes())?;
    }

    ser.end_elem(element.name.clone())?;
    ser.writer.write_all(b"\n")
}

fn has_visible_children(node: NodeRef<'_, Node>) -> bool {
    node.children().any(|child| match child.value() {
        Node::Text(text) => !text.trim().is_empty(),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn compact_output_keeps_structure() {
        let doc = Document::parse(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p class=\"a\">x &amp; y</p><br></body></html>",
        );
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><head><title>T</title></head><body><p class=\"a\">x &amp; y</p><br></body></html>"
        );
    }

    #[test]
    fn style_content_is_not_escaped() {
        let doc = Document::parse("<html><head><style>a > b { content: \"&\"; }</style></head></html>");
        assert!(doc.to_html().contains("<style>a > b { content: \"&\"; }</style>"));
        assert!(doc.to_pretty_html().unwrap().contains("a > b { content: \"&\"; }"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut doc = Document::parse("<html><body><img src=\"x\"></body></html>");
        let img = doc.elements_by_tag("img")[0];
        doc.set_attr(img, "alt", "say \"hi\" & bye");
        assert!(doc.to_html().contains(r#"alt="say &quot;hi&quot; &amp; bye""#));
    }

    #[test]
    fn attribute_order_is_preserved() {
        let doc = Document::parse(
            r#"<html><head><link rel="stylesheet" href="site.css" media="all"></head></html>"#,
        );
        assert!(doc
            .to_html()
            .contains(r#"<link rel="stylesheet" href="site.css" media="all">"#));
    }

    #[test]
    fn inline_svg_survives_round_trip() {
        let source = r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#icon"></use></svg>"##;
        let doc = Document::parse(source);

        assert!(doc.to_html().contains(source));

        let pretty = doc.to_pretty_html().unwrap();
        assert!(pretty.contains(r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink">"#));
        assert!(pretty.contains(r##"<use xlink:href="#icon">"##));
        assert_eq!(Document::parse(&pretty).to_pretty_html().unwrap(), pretty);
    }

    #[test]
    fn pretty_output_indents_one_node_per_line() {
        let doc = Document::parse(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>Hi</p><img src=\"a.png\"></body></html>",
        );
        let pretty = doc.to_pretty_html().unwrap();
        let expected = "\
<!DOCTYPE html>
<html>
 <head>
  <title>
   T
  </title>
 </head>
 <body>
  <p>
   Hi
  </p>
  <img src=\"a.png\">
 </body>
</html>
";
        assert_eq!(pretty, expected);
    }

    #[test]
    fn pretty_output_preserves_pre_content() {
        let doc = Document::parse("<html><body><pre>  a\n    b</pre></body></html>");
        assert!(doc.to_pretty_html().unwrap().contains("<pre>  a\n    b</pre>"));
    }

    #[test]
    fn pretty_output_escapes_text() {
        let doc = Document::parse("<html><body><p>1 &lt; 2 &amp; 3</p></body></html>");
        assert!(doc.to_pretty_html().unwrap().contains("   1 &lt; 2 &amp; 3\n"));
    }

    #[test]
    fn pretty_output_is_stable_when_reparsed() {
        let doc = Document::parse(
            "<html><head><style>p{}</style></head><body><div><span>a</span> b</div></body></html>",
        );
        let once = doc.to_pretty_html().unwrap();
        let twice = Document::parse(&once).to_pretty_html().unwrap();
        assert_eq!(once, twice);
    }
}
