//! Declaration extraction from tree-sitter syntax trees.
//!
//! One walk over the tree emits functions, methods, classes, interfaces,
//! types, enums, imports and exports in source order. Each declaration
//! records its header text, its doc comment and the name of the
//! declaration it is nested in.

use crate::declaration::{Declaration, DeclarationKind};
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{ByteRange, LineRange};
use tree_sitter::Node;

/// Nearest structural declaration around the node being visited
#[derive(Debug, Clone)]
struct Enclosing {
    name: String,
    kind: DeclarationKind,
}

/// A structural declaration located in the tree
struct Found<'t> {
    kind: DeclarationKind,
    name: Node<'t>,
    /// Node whose bytes the declaration covers (decorators included)
    range: Node<'t>,
    /// Signature text runs from `range` start up to the body
    body: Option<Node<'t>>,
}

/// What to walk after a node has been visited
type Step<'t> = (Option<Node<'t>>, Option<Enclosing>);

struct Extractor<'s> {
    language: Language,
    source: &'s str,
    declarations: Vec<Declaration>,
}

/// Extract every declaration below `root`, in source order
pub fn extract_declarations(
    language: Language,
    source: &str,
    root: Node<'_>,
) -> Result<Vec<Declaration>> {
    let mut extractor = Extractor {
        language,
        source,
        declarations: Vec::new(),
    };

    let mut stack = vec![(root, None::<Enclosing>)];
    while let Some((node, enclosing)) = stack.pop() {
        let (descend, enclosing) = extractor.visit(node, enclosing)?;
        if let Some(parent) = descend {
            let mut cursor = parent.walk();
            let children: Vec<_> = parent.named_children(&mut cursor).collect();
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|child| (child, enclosing.clone())),
            );
        }
    }

    log::debug!(
        "extracted {} {} declarations",
        extractor.declarations.len(),
        language
    );
    Ok(extractor.declarations)
}

const fn function_kind(enclosing: Option<&Enclosing>) -> DeclarationKind {
    match enclosing {
        Some(Enclosing {
            kind: DeclarationKind::Class | DeclarationKind::Interface,
            ..
        }) => DeclarationKind::Method,
        _ => DeclarationKind::Function,
    }
}

impl<'s> Extractor<'s> {
    fn visit<'t>(&mut self, node: Node<'t>, enclosing: Option<Enclosing>) -> Result<Step<'t>> {
        match self.language {
            Language::Rust => self.visit_rust(node, enclosing),
            Language::Python => self.visit_python(node, enclosing),
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                self.visit_js(node, enclosing)
            }
        }
    }

    fn visit_rust<'t>(&mut self, node: Node<'t>, enclosing: Option<Enclosing>) -> Result<Step<'t>> {
        let kind = match node.kind() {
            "function_item" | "function_signature_item" => function_kind(enclosing.as_ref()),
            "struct_item" | "union_item" | "impl_item" => DeclarationKind::Class,
            "enum_item" => DeclarationKind::Enum,
            "trait_item" => DeclarationKind::Interface,
            "type_item" => DeclarationKind::Type,
            "use_declaration" => {
                self.rust_use(node, enclosing.as_ref())?;
                return Ok((None, enclosing));
            }
            _ => return Ok((Some(node), enclosing)),
        };

        let name = if node.kind() == "impl_item" {
            impl_target(node)
        } else {
            node.child_by_field_name("name")
        };

        self.structural(node, name, kind, node, enclosing)
    }

    /// One import per name bound by a `use` tree
    fn rust_use(&mut self, statement: Node<'_>, enclosing: Option<&Enclosing>) -> Result<()> {
        let Some(argument) = statement.child_by_field_name("argument") else {
            return Ok(());
        };

        let mut stack = vec![(argument, None::<String>)];
        while let Some((tree, prefix)) = stack.pop() {
            match tree.kind() {
                "scoped_use_list" => {
                    let prefix = match tree.child_by_field_name("path") {
                        Some(path) => Some(join_path(prefix.as_deref(), self.text(path)?)),
                        None => prefix,
                    };
                    if let Some(list) = tree.child_by_field_name("list") {
                        push_children(&mut stack, list, &prefix);
                    }
                }
                "use_list" => push_children(&mut stack, tree, &prefix),
                "use_as_clause" => {
                    let (Some(path), Some(alias)) = (
                        tree.child_by_field_name("path"),
                        tree.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    let full = join_path(prefix.as_deref(), self.text(path)?);
                    let (source, _) = split_last(&full);
                    let alias = self.text(alias)?;
                    self.import(statement, alias, source, enclosing)?;
                }
                "use_wildcard" => {
                    let module = self.text(tree)?.trim_end_matches('*').trim_end_matches("::");
                    let source = if module.is_empty() {
                        prefix
                    } else {
                        Some(join_path(prefix.as_deref(), module))
                    };
                    self.import(statement, "*", source, enclosing)?;
                }
                // `{self, ..}` binds the last segment of the group path
                "self" => {
                    if let Some(prefix) = prefix {
                        let (source, name) = split_last(&prefix);
                        self.import(statement, &name, source, enclosing)?;
                    }
                }
                "identifier" | "scoped_identifier" | "crate" | "super" | "metavariable" => {
                    let full = join_path(prefix.as_deref(), self.text(tree)?);
                    let (source, name) = split_last(&full);
                    self.import(statement, &name, source, enclosing)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn visit_python<'t>(
        &mut self,
        node: Node<'t>,
        enclosing: Option<Enclosing>,
    ) -> Result<Step<'t>> {
        match node.kind() {
            "function_definition" | "class_definition" => {
                self.python_definition(node, node, enclosing)
            }
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(definition) => self.python_definition(definition, node, enclosing),
                None => Ok((Some(node), enclosing)),
            },
            "import_statement" => {
                self.python_import(node, enclosing.as_ref())?;
                Ok((None, enclosing))
            }
            "import_from_statement" => {
                self.python_from_import(node, enclosing.as_ref())?;
                Ok((None, enclosing))
            }
            _ => Ok((Some(node), enclosing)),
        }
    }

    fn python_definition<'t>(
        &mut self,
        definition: Node<'t>,
        range: Node<'t>,
        enclosing: Option<Enclosing>,
    ) -> Result<Step<'t>> {
        let kind = if definition.kind() == "class_definition" {
            DeclarationKind::Class
        } else {
            function_kind(enclosing.as_ref())
        };
        self.structural(definition, definition.child_by_field_name("name"), kind, range, enclosing)
    }

    /// `import a.b` binds `a`; `import a.b as c` binds `c`
    fn python_import(&mut self, statement: Node<'_>, enclosing: Option<&Enclosing>) -> Result<()> {
        let mut cursor = statement.walk();
        let names: Vec<_> = statement
            .children_by_field_name("name", &mut cursor)
            .collect();

        for name in names {
            if name.kind() == "aliased_import" {
                let (Some(module), Some(alias)) = (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) else {
                    continue;
                };
                let module = self.text(module)?.to_string();
                let alias = self.text(alias)?;
                self.import(statement, alias, Some(module), enclosing)?;
            } else {
                let module = self.text(name)?;
                let bound = module.split('.').next().unwrap_or(module).trim();
                self.import(statement, bound, Some(module.to_string()), enclosing)?;
            }
        }

        Ok(())
    }

    fn python_from_import(
        &mut self,
        statement: Node<'_>,
        enclosing: Option<&Enclosing>,
    ) -> Result<()> {
        let module = match statement.child_by_field_name("module_name") {
            Some(module) => Some(self.text(module)?.to_string()),
            None => None,
        };

        let mut cursor = statement.walk();
        let names: Vec<_> = statement
            .children_by_field_name("name", &mut cursor)
            .collect();

        for name in names {
            let bound = if name.kind() == "aliased_import" {
                match name.child_by_field_name("alias") {
                    Some(alias) => self.text(alias)?,
                    None => continue,
                }
            } else {
                self.text(name)?
            };
            self.import(statement, bound, module.clone(), enclosing)?;
        }

        let mut cursor = statement.walk();
        let wildcard = statement
            .named_children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        if wildcard {
            self.import(statement, "*", module, enclosing)?;
        }

        Ok(())
    }

    fn python_docstring(&self, body: Option<Node<'_>>) -> Result<Option<String>> {
        let Some(body) = body else {
            return Ok(None);
        };

        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        let literal = first
            .filter(|stmt| stmt.kind() == "expression_statement")
            .and_then(|stmt| stmt.named_child(0))
            .filter(|expr| expr.kind() == "string");

        match literal {
            Some(literal) => {
                let doc = unquote_docstring(self.text(literal)?);
                Ok((!doc.is_empty()).then_some(doc))
            }
            None => Ok(None),
        }
    }

    fn visit_js<'t>(&mut self, node: Node<'t>, enclosing: Option<Enclosing>) -> Result<Step<'t>> {
        let kind = match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                DeclarationKind::Function
            }
            "class_declaration" | "abstract_class_declaration" => DeclarationKind::Class,
            "method_definition" => DeclarationKind::Method,
            "interface_declaration" => DeclarationKind::Interface,
            "type_alias_declaration" => DeclarationKind::Type,
            "enum_declaration" => DeclarationKind::Enum,
            "lexical_declaration" | "variable_declaration" => {
                return self.js_function_bindings(node, enclosing);
            }
            "import_statement" => {
                self.js_import(node, enclosing.as_ref())?;
                return Ok((None, enclosing));
            }
            "export_statement" => {
                self.js_export(node, enclosing.as_ref())?;
                return Ok((Some(node), enclosing));
            }
            _ => return Ok((Some(node), enclosing)),
        };

        self.structural(node, node.child_by_field_name("name"), kind, node, enclosing)
    }

    /// `const f = () => ..` and `let g = function () {..}` declare functions
    fn js_function_bindings<'t>(
        &mut self,
        statement: Node<'t>,
        enclosing: Option<Enclosing>,
    ) -> Result<Step<'t>> {
        let mut cursor = statement.walk();
        let declarators: Vec<_> = statement
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();

        let mut bound = Vec::new();
        for &declarator in &declarators {
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            let is_function = matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            );
            if name.kind() != "identifier" || !is_function {
                continue;
            }

            let found = Found {
                kind: DeclarationKind::Function,
                name,
                range: if declarators.len() == 1 {
                    statement
                } else {
                    declarator
                },
                body: value.child_by_field_name("body"),
            };
            bound.push(self.record(found, enclosing.as_ref())?);
        }

        let enclosing = if bound.len() == 1 { bound.pop() } else { enclosing };
        Ok((Some(statement), enclosing))
    }

    fn js_import(&mut self, statement: Node<'_>, enclosing: Option<&Enclosing>) -> Result<()> {
        let source = self.js_source(statement)?;
        let mut cursor = statement.walk();
        let Some(clause) = statement
            .named_children(&mut cursor)
            .find(|child| child.kind() == "import_clause")
        else {
            // side-effect import binds nothing
            return Ok(());
        };

        let mut cursor = clause.walk();
        let parts: Vec<_> = clause.named_children(&mut cursor).collect();
        for part in parts {
            match part.kind() {
                "identifier" => {
                    let name = self.text(part)?;
                    self.import(statement, name, source.clone(), enclosing)?;
                }
                "namespace_import" => {
                    let mut inner = part.walk();
                    let alias = part
                        .named_children(&mut inner)
                        .find(|child| child.kind() == "identifier");
                    if let Some(alias) = alias {
                        let name = self.text(alias)?;
                        self.import(statement, name, source.clone(), enclosing)?;
                    }
                }
                "named_imports" => {
                    for name in self.specifier_names(part, "import_specifier")? {
                        self.import(statement, name, source.clone(), enclosing)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// One export per name made visible by an `export` statement
    fn js_export(&mut self, statement: Node<'_>, enclosing: Option<&Enclosing>) -> Result<()> {
        let source = self.js_source(statement)?;
        let mut names: Vec<&'s str> = Vec::new();

        if let Some(declaration) = statement.child_by_field_name("declaration") {
            if matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
                let mut cursor = declaration.walk();
                let declarators: Vec<_> = declaration.named_children(&mut cursor).collect();
                for declarator in declarators {
                    if let Some(name) = declarator
                        .child_by_field_name("name")
                        .filter(|name| name.kind() == "identifier")
                    {
                        names.push(self.text(name)?);
                    }
                }
            } else if let Some(name) = declaration.child_by_field_name("name") {
                names.push(self.text(name)?);
            }
        }

        let mut cursor = statement.walk();
        let children: Vec<_> = statement.children(&mut cursor).collect();
        for child in &children {
            match child.kind() {
                "export_clause" => names.extend(self.specifier_names(*child, "export_specifier")?),
                "namespace_export" => {
                    let mut inner = child.walk();
                    let alias = child.named_children(&mut inner).last();
                    if let Some(alias) = alias {
                        names.push(self.text(alias)?);
                    }
                }
                _ => {}
            }
        }

        if names.is_empty() {
            if statement.child_by_field_name("value").is_some() {
                names.push("default");
            } else if children.iter().any(|child| child.kind() == "*") {
                names.push("*");
            }
        }

        let signature = self.header_line(statement)?;
        for name in names {
            let mut declaration = Declaration::new(
                DeclarationKind::Export,
                name,
                byte_range(statement),
                line_range(statement),
            )
            .signature(signature.clone());
            declaration.source = source.clone();
            declaration.parent = enclosing.map(|e| e.name.clone());
            self.declarations.push(declaration);
        }

        Ok(())
    }

    /// Bound names of `import_specifier` / `export_specifier` children, aliases winning
    fn specifier_names(&self, list: Node<'_>, specifier: &str) -> Result<Vec<&'s str>> {
        let mut cursor = list.walk();
        let specifiers: Vec<_> = list
            .named_children(&mut cursor)
            .filter(|child| child.kind() == specifier)
            .collect();

        let mut names = Vec::with_capacity(specifiers.len());
        for item in specifiers {
            let bound = item
                .child_by_field_name("alias")
                .or_else(|| item.child_by_field_name("name"));
            if let Some(bound) = bound {
                names.push(unquote(self.text(bound)?));
            }
        }
        Ok(names)
    }

    fn js_source(&self, statement: Node<'_>) -> Result<Option<String>> {
        match statement.child_by_field_name("source") {
            Some(source) => Ok(Some(unquote(self.text(source)?).to_string())),
            None => Ok(None),
        }
    }

    fn structural<'t>(
        &mut self,
        node: Node<'t>,
        name: Option<Node<'t>>,
        kind: DeclarationKind,
        range: Node<'t>,
        enclosing: Option<Enclosing>,
    ) -> Result<Step<'t>> {
        let Some(name) = name else {
            log::trace!("skipping unnamed {} at byte {}", node.kind(), node.start_byte());
            return Ok((Some(node), enclosing));
        };

        let found = Found {
            kind,
            name,
            range,
            body: node.child_by_field_name("body"),
        };
        let inner = self.record(found, enclosing.as_ref())?;
        Ok((Some(node), Some(inner)))
    }

    fn record(&mut self, found: Found<'_>, enclosing: Option<&Enclosing>) -> Result<Enclosing> {
        let name = self.text(found.name)?.to_string();
        let header_end = found
            .body
            .map_or(found.range.end_byte(), |body| body.start_byte());
        let header_start = match found.range.kind() {
            // decorators stay out of the header
            "decorated_definition" => found
                .range
                .child_by_field_name("definition")
                .map_or(found.range.start_byte(), |def| def.start_byte()),
            _ => found.range.start_byte(),
        };
        let signature = collapse(self.slice(header_start, header_end)?);

        let docstring = match self.language {
            Language::Python => match self.python_docstring(found.body)? {
                Some(doc) => Some(doc),
                None => self.leading_comments(found.range)?,
            },
            _ => self.leading_comments(found.range)?,
        };

        let mut declaration = Declaration::new(
            found.kind,
            name.clone(),
            byte_range(found.range),
            line_range(found.range),
        )
        .signature(signature);
        declaration.docstring = docstring;
        declaration.parent = enclosing.map(|e| e.name.clone());
        self.declarations.push(declaration);

        Ok(Enclosing {
            name,
            kind: found.kind,
        })
    }

    fn import(
        &mut self,
        statement: Node<'_>,
        name: &str,
        source: Option<String>,
        enclosing: Option<&Enclosing>,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let mut declaration = Declaration::new(
            DeclarationKind::Import,
            name,
            byte_range(statement),
            line_range(statement),
        )
        .signature(self.header_line(statement)?);
        declaration.source = source;
        declaration.parent = enclosing.map(|e| e.name.clone());
        self.declarations.push(declaration);
        Ok(())
    }

    /// Doc comments directly above `node`, attributes skipped
    fn leading_comments(&self, node: Node<'_>) -> Result<Option<String>> {
        // exported declarations carry their docs above the `export` keyword
        let anchor = match node.parent() {
            Some(parent) if parent.kind() == "export_statement" => parent,
            _ => node,
        };

        let mut comments = Vec::new();
        let mut next_start = anchor.start_byte();
        let mut current = anchor.prev_named_sibling();

        while let Some(sibling) = current {
            let gap = self.slice(sibling.end_byte(), next_start)?;
            if !gap.trim().is_empty() || gap.matches('\n').count() > 1 {
                break;
            }
            match sibling.kind() {
                "attribute_item" | "decorator" => {}
                "comment" | "line_comment" | "block_comment" => {
                    let text = self.text(sibling)?;
                    if !self.is_doc_comment(text) {
                        break;
                    }
                    comments.push(text);
                }
                _ => break,
            }
            next_start = sibling.start_byte();
            current = sibling.prev_named_sibling();
        }

        comments.reverse();
        let doc = clean_comment(&comments.join("\n"));
        Ok((!doc.is_empty()).then_some(doc))
    }

    fn is_doc_comment(&self, text: &str) -> bool {
        match self.language {
            Language::Rust => {
                (text.starts_with("///") && !text.starts_with("////"))
                    || (text.starts_with("/**") && !text.starts_with("/***"))
            }
            Language::Python => text.starts_with('#'),
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                text.starts_with("//") || text.starts_with("/*")
            }
        }
    }

    /// First line of a statement, whitespace collapsed
    fn header_line(&self, node: Node<'_>) -> Result<String> {
        let text = self.text(node)?;
        Ok(collapse(text.lines().next().unwrap_or(text)))
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'s str> {
        self.source.get(start..end).ok_or_else(|| {
            ChunkerError::extract(format!(
                "node bytes {start}..{end} do not slice the source ({} bytes)",
                self.source.len()
            ))
        })
    }

    fn text(&self, node: Node<'_>) -> Result<&'s str> {
        self.slice(node.start_byte(), node.end_byte())
    }
}

/// Name node of an impl target: `impl<T> a::Store<T>` names `Store`
fn impl_target(node: Node<'_>) -> Option<Node<'_>> {
    let mut target = node.child_by_field_name("type")?;
    loop {
        target = match target.kind() {
            "generic_type" => target.child_by_field_name("type")?,
            "scoped_type_identifier" => target.child_by_field_name("name")?,
            _ => return Some(target),
        };
    }
}

fn push_children<'t>(
    stack: &mut Vec<(Node<'t>, Option<String>)>,
    parent: Node<'t>,
    prefix: &Option<String>,
) {
    let mut cursor = parent.walk();
    let children: Vec<_> = parent.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev().map(|child| (child, prefix.clone())));
}

fn join_path(prefix: Option<&str>, tail: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}::{tail}"),
        None => tail.to_string(),
    }
}

/// `a::b::C` splits into (`Some("a::b")`, `"C"`)
fn split_last(path: &str) -> (Option<String>, String) {
    match path.rsplit_once("::") {
        Some((head, last)) => (Some(head.trim().to_string()), last.trim().to_string()),
        None => (None, path.trim().to_string()),
    }
}

fn byte_range(node: Node<'_>) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

fn line_range(node: Node<'_>) -> LineRange {
    LineRange::new(node.start_position().row, node.end_position().row)
}

fn collapse(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    joined.trim_end_matches([';', ':', '{']).trim_end().to_string()
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '\'' | '`'))
}

fn unquote_docstring(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|quote| body.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)))
        .unwrap_or(body);

    inner
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn clean_comment(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = ["///", "//!", "//", "/**", "/*", "*", "#"]
                .iter()
                .find_map(|marker| line.strip_prefix(marker))
                .unwrap_or(line);
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
