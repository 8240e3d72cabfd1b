//! Lowering of the `mitex-parser` CST into [`Node`]s
//!
//! The command spec handed to mitex keeps its environment shapes but drops
//! every command shape, so commands come out bare and argument binding is
//! left to [`super::bind`]. Text is lowered into fine-grained atoms (one per
//! token) that the binder later merges into character runs.

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use mitex_parser::syntax::{CmdItem, EnvItem, SyntaxElement, SyntaxKind, SyntaxNode};
use mitex_parser::CommandSpec;
use mitex_spec::CommandSpecItem;
use mitex_spec_gen::DEFAULT_SPEC;
use rowan::ast::AstNode;
use std::ops::Range;

use super::node::{Argument, Delim, Node, NodeKind, Special};

lazy_static! {
    /// mitex's default environments, no commands
    pub static ref ENVIRONMENT_SPEC: CommandSpec = {
        let commands: FxHashMap<String, _> = DEFAULT_SPEC
            .items()
            .filter(|(_, v)| matches!(v, CommandSpecItem::Env(_)))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        CommandSpec::new(commands)
    };
}

/// Parse `source` and lower it into unbound atoms.
pub fn lower_source(source: &str) -> Vec<Node> {
    let root = mitex_parser::parse(source, ENVIRONMENT_SPEC.clone());
    let mut out = Vec::new();
    lower_children(&root, &mut out);
    out
}

fn element_range(elem: &SyntaxElement) -> Range<usize> {
    let range = elem.text_range();
    usize::from(range.start())..usize::from(range.end())
}

fn node_range(node: &SyntaxNode) -> Range<usize> {
    let range = node.text_range();
    usize::from(range.start())..usize::from(range.end())
}

fn lower_children(node: &SyntaxNode, out: &mut Vec<Node>) {
    for child in node.children_with_tokens() {
        lower_element(child, out);
    }
}

fn lower_element(elem: SyntaxElement, out: &mut Vec<Node>) {
    use SyntaxKind::*;

    let range = element_range(&elem);
    if range.is_empty() {
        return;
    }
    let kind = elem.kind();
    let node = match elem {
        SyntaxElement::Token(_) => {
            out.push(lower_token(kind, range));
            return;
        }
        SyntaxElement::Node(node) => node,
    };

    match kind {
        // Containers
        ScopeRoot | ItemText | ItemParen | ItemLR | ClauseLR | ItemAttachComponent
        | ItemBracket | ClauseArgument => lower_children(&node, out),

        ItemCurly => {
            let (inner, body) = lower_delimited(&node, TokenLBrace, TokenRBrace);
            out.push(Node::new(NodeKind::Group { inner, body }, range));
        }
        ItemFormula => out.push(Node::new(NodeKind::Math, range)),
        ItemCmd => out.push(lower_command(&node, range)),
        ItemNewLine => out.push(Node::new(
            NodeKind::Macro {
                name: "\\".to_string(),
                args: Vec::new(),
            },
            range,
        )),
        ItemEnv => out.push(lower_environment(&node, range)),
        ItemBlockComment => out.push(Node::new(NodeKind::Comment, range)),
        ItemTypstCode => out.push(Node::new(NodeKind::Specials(Special::Symbol), range)),
        _ => out.push(Node::new(NodeKind::Unknown { name: None }, range)),
    }
}

fn lower_token(kind: SyntaxKind, range: Range<usize>) -> Node {
    use SyntaxKind::*;

    let kind = match kind {
        TokenWhiteSpace | TokenLineBreak | TokenWord | TokenApostrophe | TokenComma
        | TokenSlash | TokenAsterisk | TokenAtSign | TokenSemicolon | TokenDitto
        | TokenLParen | TokenRParen | TokenLBracket | TokenRBracket => NodeKind::Chars,
        TokenComment => NodeKind::Comment,
        // Never wrapped: a lone brace would unbalance the marker group
        TokenAmpersand | TokenTilde | TokenHash | TokenDollar | TokenUnderscore | TokenCaret
        | TokenCommandSym | TokenLBrace | TokenRBrace | TokenBeginMath | TokenEndMath => {
            NodeKind::Specials(Special::Symbol)
        }
        ItemNewLine => NodeKind::Macro {
            name: "\\".to_string(),
            args: Vec::new(),
        },
        _ => NodeKind::Unknown { name: None },
    };
    Node::new(kind, range)
}

/// Inner range and lowered body of a `{..}` or `[..]` item.
fn lower_delimited(node: &SyntaxNode, open: SyntaxKind, close: SyntaxKind) -> (Range<usize>, Vec<Node>) {
    let range = node_range(node);
    let children: Vec<SyntaxElement> = node.children_with_tokens().collect();

    let mut first = 0;
    let mut inner_start = range.start;
    if let Some(head) = children.first() {
        if head.kind() == open {
            first = 1;
            inner_start = element_range(head).end;
        }
    }
    let mut last = children.len();
    let mut inner_end = range.end;
    if last > first {
        if let Some(tail) = children.last() {
            if tail.kind() == close {
                last -= 1;
                inner_end = element_range(tail).start;
            }
        }
    }

    let mut body = Vec::new();
    for child in children.into_iter().take(last).skip(first) {
        lower_element(child, &mut body);
    }
    (inner_start..inner_end.max(inner_start), body)
}

fn lower_argument(clause: &SyntaxNode) -> Argument {
    let range = node_range(clause);
    for child in clause.children() {
        match child.kind() {
            SyntaxKind::ItemCurly => {
                let (inner, body) =
                    lower_delimited(&child, SyntaxKind::TokenLBrace, SyntaxKind::TokenRBrace);
                return Argument {
                    delim: Delim::Brace,
                    range,
                    inner,
                    body,
                };
            }
            SyntaxKind::ItemBracket => {
                let (inner, body) =
                    lower_delimited(&child, SyntaxKind::TokenLBracket, SyntaxKind::TokenRBracket);
                return Argument {
                    delim: Delim::Bracket,
                    range,
                    inner,
                    body,
                };
            }
            _ => {}
        }
    }
    // a single-token argument
    let mut body = Vec::new();
    lower_children(clause, &mut body);
    Argument {
        delim: Delim::Brace,
        inner: range.clone(),
        range,
        body,
    }
}

fn lower_command(node: &SyntaxNode, range: Range<usize>) -> Node {
    let name = CmdItem::cast(node.clone())
        .and_then(|cmd| cmd.name_tok())
        .map(|tok| tok.text().trim_start_matches('\\').to_string());
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Node::new(NodeKind::Unknown { name: None }, range);
    };
    if !name.chars().all(|c| c.is_alphabetic() || c == '@') {
        // control symbols: \%, \&, \,, \  ...
        return Node::new(NodeKind::Specials(Special::Symbol), range);
    }

    let args = node
        .children()
        .filter(|c| c.kind() == SyntaxKind::ClauseArgument)
        .map(|c| lower_argument(&c))
        .collect();
    Node::new(NodeKind::Macro { name, args }, range)
}

fn lower_environment(node: &SyntaxNode, range: Range<usize>) -> Node {
    use SyntaxKind::*;

    let name = EnvItem::cast(node.clone())
        .and_then(|env| env.name_tok())
        .map(|tok| tok.text().trim().to_string());
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Node::new(NodeKind::Unknown { name: None }, range);
    };

    let mut args = Vec::new();
    let mut body = Vec::new();
    let mut header_end = range.start;
    let mut body_end = range.end;
    for child in node.children_with_tokens() {
        let child_range = element_range(&child);
        match child.kind() {
            ItemBegin => {
                header_end = child_range.end;
                if let SyntaxElement::Node(begin) = &child {
                    args.extend(
                        begin
                            .children()
                            .filter(|c| c.kind() == ClauseArgument)
                            .map(|c| lower_argument(&c)),
                    );
                }
            }
            ClauseArgument if body.is_empty() => {
                header_end = child_range.end;
                if let SyntaxElement::Node(clause) = &child {
                    args.push(lower_argument(clause));
                }
            }
            ItemEnd => body_end = child_range.start,
            _ => lower_element(child, &mut body),
        }
    }

    Node::new(
        NodeKind::Environment {
            name,
            args,
            body_range: header_end..body_end.max(header_end),
            body,
        },
        range,
    )
}
