use crate::dom::tree::{DomNode, DomTree, NodeId, NodeProperties, NOMINAL_BOX};
use crate::types::{ComputedStyle, ElementRect};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

// User-agent stylesheet defaults that matter for visibility.
const HIDDEN_BY_DEFAULT: &[&str] = &[
    "head", "script", "style", "meta", "link", "title", "template", "noscript", "base",
];
const INLINE_BY_DEFAULT: &[&str] = &[
    "a", "span", "label", "button", "input", "select", "textarea", "img", "strong", "em", "b",
    "i", "code", "small", "abbr",
];

#[derive(Debug, Clone)]
struct InheritedLayout {
    hidden_subtree: bool,
    visibility: String,
}

impl Default for InheritedLayout {
    fn default() -> Self {
        Self {
            hidden_subtree: false,
            visibility: "visible".to_string(),
        }
    }
}

/// Declarations from an inline `style` attribute, lowercased.
#[derive(Debug, Default)]
struct InlineStyle {
    declarations: HashMap<String, String>,
}

impl InlineStyle {
    fn parse(style: &str) -> Self {
        let declarations = style
            .split(';')
            .filter_map(|declaration| {
                let (property, value) = declaration.split_once(':')?;
                let value = value.trim().trim_end_matches("!important").trim();
                Some((property.trim().to_ascii_lowercase(), value.to_ascii_lowercase()))
            })
            .collect();
        Self { declarations }
    }

    fn get(&self, property: &str) -> Option<&str> {
        self.declarations.get(property).map(String::as_str)
    }

    /// A pixel length. Relative units and keywords yield `None`.
    fn length(&self, property: &str) -> Option<f64> {
        let value = self.get(property)?;
        value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
    }

    fn opacity(&self) -> Option<f64> {
        let value = self.get("opacity")?;
        match value.strip_suffix('%') {
            Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
            None => value.parse().ok(),
        }
    }
}

impl DomTree {
    /// Build a tree from static HTML.
    ///
    /// There is no layout engine behind this: computed style comes from the
    /// user-agent defaults for metadata elements, the `hidden` attribute,
    /// hidden inputs and inline `style` declarations. Elements without an
    /// inline size occupy [`NOMINAL_BOX`]; anything inside a `display: none`
    /// subtree gets an empty box.
    pub fn parse_html(html: &str, url: &str) -> Self {
        let document = Html::parse_document(html);
        let base = Url::parse(url).ok();

        let title = Selector::parse("title")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|title| title.text().collect::<String>().trim().to_string())
            })
            .unwrap_or_default();

        let mut tree = DomTree::new(url, title);

        let root_ref = document.root_element();
        let (root_node, root_layout) = static_node(root_ref, &InheritedLayout::default(), base.as_ref());
        let root_id = tree.insert_root(root_node);

        let mut pending: Vec<(NodeId, ElementRef, InheritedLayout)> = vec![(root_id, root_ref, root_layout)];
        while let Some((parent_id, parent_ref, layout)) = pending.pop() {
            for child in parent_ref.children() {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    let (node, child_layout) = static_node(child_ref, &layout, base.as_ref());
                    let child_id = tree.append_child(parent_id, node);
                    pending.push((child_id, child_ref, child_layout));
                }
            }
        }

        tree
    }
}

fn static_node(
    element_ref: ElementRef,
    inherited: &InheritedLayout,
    base: Option<&Url>,
) -> (DomNode, InheritedLayout) {
    let element = element_ref.value();
    let tag_name = element.name().to_ascii_lowercase();

    let mut node = DomNode::new(&tag_name);
    for (name, value) in element.attrs() {
        node = node.with_attribute(name, value);
    }

    let text = element_ref.text().collect::<String>();
    let inline = InlineStyle::parse(element.attr("style").unwrap_or(""));
    let style = computed_style(&tag_name, &node, &inline, inherited);

    let hidden_subtree = inherited.hidden_subtree || style.display == "none";
    let rect = if hidden_subtree {
        ElementRect::zero()
    } else {
        ElementRect::new(
            0.0,
            0.0,
            inline.length("width").unwrap_or(NOMINAL_BOX.width),
            inline.length("height").unwrap_or(NOMINAL_BOX.height),
        )
    };

    let properties = static_properties(&tag_name, &node, element_ref, &text, base);
    let layout = InheritedLayout {
        hidden_subtree,
        visibility: style.visibility.clone(),
    };

    let node = node
        .with_text_content(&text)
        .with_inner_html(&element_ref.inner_html())
        .with_properties(properties)
        .with_style(style)
        .with_rect(rect);

    (node, layout)
}

fn computed_style(
    tag_name: &str,
    node: &DomNode,
    inline: &InlineStyle,
    inherited: &InheritedLayout,
) -> ComputedStyle {
    let hidden_input = tag_name == "input"
        && node
            .attribute("type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false);
    let hidden_by_markup =
        node.attribute("hidden").is_some() || HIDDEN_BY_DEFAULT.contains(&tag_name);

    // Hidden inputs are `display: none !important` in every user-agent sheet.
    let display = if hidden_input {
        "none".to_string()
    } else {
        match inline.get("display") {
            Some(display) => display.to_string(),
            None if hidden_by_markup => "none".to_string(),
            None if INLINE_BY_DEFAULT.contains(&tag_name) => "inline".to_string(),
            None => "block".to_string(),
        }
    };

    let visibility = inline
        .get("visibility")
        .filter(|value| *value != "inherit")
        .map(str::to_string)
        .unwrap_or_else(|| inherited.visibility.clone());

    ComputedStyle {
        display,
        visibility,
        opacity: inline.opacity().unwrap_or(1.0),
    }
}

fn static_properties(
    tag_name: &str,
    node: &DomNode,
    element_ref: ElementRef,
    text: &str,
    base: Option<&Url>,
) -> NodeProperties {
    let attr = |name: &str| node.attribute(name);
    let non_empty = |name: &str| attr(name).filter(|value| !value.is_empty()).map(str::to_string);

    let value = match tag_name {
        "input" | "button" | "data" => Some(attr("value").unwrap_or("").to_string()),
        "option" => Some(option_value(node, text)),
        "textarea" | "output" => Some(text.to_string()),
        "select" => Some(selected_option_value(element_ref)),
        _ => None,
    };

    let href = match tag_name {
        "a" | "area" | "link" | "base" => attr("href").map(|href| resolve_href(href, base)),
        _ => None,
    };

    let placeholder = match tag_name {
        "input" | "textarea" => non_empty("placeholder"),
        _ => None,
    };

    let input_type = match tag_name {
        "input" => Some(
            non_empty("type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        ),
        "button" => Some(
            match attr("type").map(|t| t.to_ascii_lowercase()).as_deref() {
                Some("reset") => "reset",
                Some("button") => "button",
                _ => "submit",
            }
            .to_string(),
        ),
        "select" if attr("multiple").is_some() => Some("select-multiple".to_string()),
        "select" => Some("select-one".to_string()),
        "textarea" => Some("textarea".to_string()),
        _ => non_empty("type"),
    };

    NodeProperties {
        value,
        href,
        placeholder,
        input_type,
    }
}

fn option_value(node: &DomNode, text: &str) -> String {
    node.attribute("value")
        .map(str::to_string)
        .unwrap_or_else(|| text.trim().to_string())
}

fn selected_option_value(select: ElementRef) -> String {
    let Ok(selector) = Selector::parse("option") else {
        return String::new();
    };
    let options: Vec<ElementRef> = select.select(&selector).collect();
    let chosen = options
        .iter()
        .find(|option| option.value().attr("selected").is_some())
        .or_else(|| options.first());

    match chosen {
        Some(option) => option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| option.text().collect::<String>().trim().to_string()),
        None => String::new(),
    }
}

fn resolve_href(href: &str, base: Option<&Url>) -> String {
    base.and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}
