//! A small typed model of nginx configuration files and their
//! formatter.

/// A simple directive: `name arg1 arg2;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
}

impl Directive {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A block directive such as `server { ... }` or
/// `location /api/ { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub args: Vec<String>,
    pub items: Vec<Item>,
}

impl Block {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.items.push(Item::Directive(directive));
        self
    }

    /// Shorthand for a directive built from string slices.
    #[must_use]
    pub fn set(self, name: &str, args: &[&str]) -> Self {
        let directive = args
            .iter()
            .fold(Directive::new(name), |d, a| d.arg(*a));
        self.directive(directive)
    }

    #[must_use]
    pub fn block(mut self, block: Self) -> Self {
        self.items.push(Item::Block(block));
        self
    }

    #[must_use]
    pub fn blank(mut self) -> Self {
        self.items.push(Item::Blank);
        self
    }

    /// Child blocks with the given name, in order.
    pub fn blocks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.items.iter().filter_map(move |item| match item {
            Item::Block(b) if b.name == name => Some(b),
            _ => None,
        })
    }

    /// First direct directive with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Directive> {
        self.items.iter().find_map(|item| match item {
            Item::Directive(d) if d.name == name => Some(d),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Directive(Directive),
    Block(Block),
    Blank,
}

/// A whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub comment: Option<String>,
    pub items: Vec<Item>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn comment(mut self, text: &str) -> Self {
        self.comment = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.items.push(Item::Directive(directive));
        self
    }

    #[must_use]
    pub fn block(mut self, block: Block) -> Self {
        self.items.push(Item::Block(block));
        self
    }
}

/// Render a configuration with four-space indentation.
#[must_use]
pub fn format(config: &Config) -> String {
    let mut out = String::new();
    if let Some(comment) = &config.comment {
        for line in comment.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    for item in &config.items {
        write_item(&mut out, item, 0);
    }
    out
}

fn write_item(out: &mut String, item: &Item, depth: usize) {
    let indent = "    ".repeat(depth);
    match item {
        Item::Blank => out.push('\n'),
        Item::Directive(d) => {
            out.push_str(&indent);
            out.push_str(&d.name);
            for arg in &d.args {
                out.push(' ');
                out.push_str(arg);
            }
            out.push_str(";\n");
        }
        Item::Block(b) => {
            out.push_str(&indent);
            out.push_str(&b.name);
            for arg in &b.args {
                out.push(' ');
                out.push_str(arg);
            }
            out.push_str(" {\n");
            for child in &b.items {
                write_item(out, child, depth + 1);
            }
            out.push_str(&indent);
            out.push_str("}\n");
        }
    }
}
