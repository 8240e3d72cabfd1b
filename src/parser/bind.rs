//! Argument binding
//!
//! Walks lowered atoms left to right and attaches arguments to macros and
//! environments according to the [`MacroDb`] argument specs. Definitions
//! (`\newcommand`, `\newenvironment`, `\def`) are learnt as they are met, so
//! later uses in the same document bind correctly. Unknown macros absorb
//! directly adjacent groups, bracket runs and comments.

use std::collections::VecDeque;
use std::ops::Range;

use super::node::{Argument, Delim, Node, NodeKind, Special};
use crate::data::macros::{MacroDb, COMMAND_DEFINITIONS, ENVIRONMENT_DEFINITIONS, TEX_DEFINITIONS};

/// Upper bound on the atoms between `\def\name` and its body.
const MAX_DEF_PARAMS: usize = 32;

pub fn bind(nodes: Vec<Node>, source: &str, db: &mut MacroDb) -> Vec<Node> {
    Binder { source, db }.bind_list(nodes)
}

struct Binder<'a> {
    source: &'a str,
    db: &'a mut MacroDb,
}

/// Where an argument sits in the pending atom queue
#[derive(Debug, Clone, Copy)]
struct ArgPlan {
    delim: Delim,
    open: usize,
    /// Index of the closing `]` for bracket arguments, `open` otherwise
    close: usize,
}

impl<'a> Binder<'a> {
    fn bind_list(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut items: VecDeque<Node> = nodes.into();
        let mut out = Vec::with_capacity(items.len());
        while let Some(node) = items.pop_front() {
            let range = node.range;
            let bound = match node.kind {
                NodeKind::Macro { name, args } => self.bind_macro(name, args, range, &mut items),
                NodeKind::Environment {
                    name,
                    args,
                    body_range,
                    body,
                } => self.bind_environment(name, args, body_range, body, range),
                NodeKind::Group { inner, body } => Node::new(
                    NodeKind::Group {
                        inner,
                        body: self.bind_list(body),
                    },
                    range,
                ),
                kind => Node::new(kind, range),
            };
            out.push(bound);
        }
        merge_chars(out, self.source)
    }

    fn bind_macro(
        &mut self,
        name: String,
        mut args: Vec<Argument>,
        range: Range<usize>,
        items: &mut VecDeque<Node>,
    ) -> Node {
        if name == "verb" {
            return self.bind_verb(range, items);
        }
        if TEX_DEFINITIONS.contains(&name.as_str()) {
            return self.bind_tex_def(name, range, items);
        }

        let Some(spec) = self.db.macro_args(&name).map(str::to_owned) else {
            return absorb_unknown(name, range, items, self.source);
        };

        let is_definition = COMMAND_DEFINITIONS.contains(&name.as_str())
            || ENVIRONMENT_DEFINITIONS.contains(&name.as_str());
        let remaining: String = spec.chars().skip(args.len()).collect();
        args.extend(self.take_arguments(items, &remaining, is_definition));

        if is_definition {
            self.learn(&name, &args);
        }

        let end = args.last().map(|a| a.range.end).unwrap_or(range.end).max(range.end);
        Node::new(NodeKind::Macro { name, args }, range.start..end)
    }

    fn bind_environment(
        &mut self,
        name: String,
        mut args: Vec<Argument>,
        body_range: Range<usize>,
        body: Vec<Node>,
        range: Range<usize>,
    ) -> Node {
        let mut items: VecDeque<Node> = body.into();
        let mut body_start = body_range.start;

        // arguments already bound by the parser are trusted as they are
        if args.is_empty() {
            args = match self.db.env_args(&name).map(str::to_owned) {
                Some(spec) => self.take_arguments(&mut items, &spec, false),
                None => self.absorb_env_arguments(body_start, &mut items),
            };
            if let Some(last) = args.last() {
                body_start = last.range.end.max(body_start);
            }
        }

        let body = self.bind_list(items.into());
        Node::new(
            NodeKind::Environment {
                name,
                args,
                body_range: body_start..body_range.end.max(body_start),
                body,
            },
            range,
        )
    }

    /// Bind `spec` against the front of `items`, consuming what matched.
    fn take_arguments(
        &mut self,
        items: &mut VecDeque<Node>,
        spec: &str,
        control_sequence_name: bool,
    ) -> Vec<Argument> {
        let mut plans = Vec::new();
        let mut next = 0;
        let mut first_brace = true;
        for letter in spec.chars() {
            match letter {
                '*' => {
                    if items.get(next).is_some_and(|n| self.is_char(n, "*")) {
                        plans.push(ArgPlan {
                            delim: Delim::Star,
                            open: next,
                            close: next,
                        });
                        next += 1;
                    }
                }
                '[' => {
                    let Some(open) = self.skip_whitespace(items, next) else {
                        continue;
                    };
                    if !self.is_char(&items[open], "[") {
                        continue;
                    }
                    if let Some(close) = self.matching_bracket(items, open) {
                        plans.push(ArgPlan {
                            delim: Delim::Bracket,
                            open,
                            close,
                        });
                        next = close + 1;
                    }
                }
                '{' => {
                    let allow_name = control_sequence_name && first_brace;
                    first_brace = false;
                    let Some(open) = self.skip_whitespace(items, next) else {
                        break;
                    };
                    let accepted = match &items[open].kind {
                        NodeKind::Group { .. } => true,
                        NodeKind::Macro { .. } => allow_name,
                        _ => false,
                    };
                    if !accepted {
                        break;
                    }
                    plans.push(ArgPlan {
                        delim: Delim::Brace,
                        open,
                        close: open,
                    });
                    next = open + 1;
                }
                _ => {}
            }
        }

        if plans.is_empty() {
            return Vec::new();
        }
        let mut taken: Vec<Option<Node>> = items.drain(..next).map(Some).collect();
        let mut args = Vec::with_capacity(plans.len());
        for plan in plans {
            if let Some(arg) = self.build_argument(plan, &mut taken) {
                args.push(arg);
            }
        }
        args
    }

    fn build_argument(&mut self, plan: ArgPlan, taken: &mut [Option<Node>]) -> Option<Argument> {
        match plan.delim {
            Delim::Star => {
                let star = taken[plan.open].take()?;
                Some(Argument {
                    delim: Delim::Star,
                    inner: star.range.end..star.range.end,
                    range: star.range,
                    body: Vec::new(),
                })
            }
            Delim::Brace => {
                let node = taken[plan.open].take()?;
                match node.kind {
                    NodeKind::Group { inner, body } => Some(Argument {
                        delim: Delim::Brace,
                        range: node.range,
                        inner,
                        body: self.bind_list(body),
                    }),
                    // `\newcommand\name`
                    kind => Some(Argument {
                        delim: Delim::Brace,
                        range: node.range.clone(),
                        inner: node.range.clone(),
                        body: vec![Node::new(kind, node.range)],
                    }),
                }
            }
            Delim::Bracket => {
                let open = taken[plan.open].take()?;
                let close = taken[plan.close].take()?;
                let body: Vec<Node> = taken[plan.open + 1..plan.close]
                    .iter_mut()
                    .filter_map(Option::take)
                    .collect();
                Some(Argument {
                    delim: Delim::Bracket,
                    range: open.range.start..close.range.end,
                    inner: open.range.end..close.range.start,
                    body: self.bind_list(body),
                })
            }
        }
    }

    /// Leading `[..]`/`{..}` directly after `\begin{name}` of an unknown
    /// environment.
    fn absorb_env_arguments(&mut self, start: usize, items: &mut VecDeque<Node>) -> Vec<Argument> {
        let mut plans = Vec::new();
        let mut end = start;
        let mut next = 0;
        while let Some(node) = items.get(next) {
            if node.range.start != end {
                break;
            }
            if matches!(node.kind, NodeKind::Group { .. }) {
                plans.push(ArgPlan {
                    delim: Delim::Brace,
                    open: next,
                    close: next,
                });
                end = node.range.end;
                next += 1;
            } else if self.is_char(node, "[") {
                let Some(close) = self.matching_bracket(items, next) else {
                    break;
                };
                plans.push(ArgPlan {
                    delim: Delim::Bracket,
                    open: next,
                    close,
                });
                end = items[close].range.end;
                next = close + 1;
            } else {
                break;
            }
        }
        let mut taken: Vec<Option<Node>> = items.drain(..next).map(Some).collect();
        plans
            .into_iter()
            .filter_map(|plan| self.build_argument(plan, &mut taken))
            .collect()
    }

    /// `\verb|text|`: everything up to the closing delimiter is opaque.
    fn bind_verb(&mut self, range: Range<usize>, items: &mut VecDeque<Node>) -> Node {
        let rest = self.source.get(range.end..).unwrap_or("");
        let star = usize::from(rest.starts_with('*'));
        let mut end = range.end;
        if let Some(delim) = rest[star..].chars().next() {
            let open = range.end + star + delim.len_utf8();
            if let Some(offset) = self.source[open..].find(delim) {
                end = open + offset + delim.len_utf8();
            }
        }
        while items.front().is_some_and(|n| n.range.start < end) {
            if let Some(node) = items.pop_front() {
                end = end.max(node.range.end);
            }
        }
        Node::new(
            NodeKind::Unknown {
                name: Some("verb".to_string()),
            },
            range.start..end,
        )
    }

    /// `\def\name#1#2{body}`
    fn bind_tex_def(&mut self, name: String, range: Range<usize>, items: &mut VecDeque<Node>) -> Node {
        let mut defined = None;
        let mut params = 0;
        let mut end = range.end;
        let mut consumed = 0;
        for (i, node) in items.iter().enumerate().take(MAX_DEF_PARAMS) {
            match &node.kind {
                NodeKind::Macro { name, .. } if i == 0 => defined = Some(name.clone()),
                NodeKind::Group { .. } => {
                    end = node.range.end;
                    consumed = i + 1;
                    break;
                }
                NodeKind::Specials(Special::Symbol) if node.text(self.source) == "#" => params += 1,
                _ => {}
            }
        }
        if consumed == 0 {
            return Node::new(
                NodeKind::Macro {
                    name,
                    args: Vec::new(),
                },
                range,
            );
        }
        items.drain(..consumed);
        if let Some(defined) = defined {
            self.db.define_macro(&defined, params, false);
        }
        Node::new(
            NodeKind::Macro {
                name,
                args: Vec::new(),
            },
            range.start..end,
        )
    }

    fn learn(&mut self, name: &str, args: &[Argument]) {
        let mut braces = args.iter().filter(|a| a.delim == Delim::Brace);
        let Some(target) = braces.next() else {
            return;
        };
        let defined = target.text(self.source).trim().trim_start_matches('\\');
        if defined.is_empty() {
            return;
        }
        let mut brackets = args.iter().filter(|a| a.delim == Delim::Bracket);
        let count = brackets
            .next()
            .and_then(|a| a.text(self.source).trim().parse::<usize>().ok())
            .unwrap_or(0);
        let has_default = brackets.next().is_some();

        if ENVIRONMENT_DEFINITIONS.contains(&name) {
            self.db.define_environment(defined, count, has_default);
        } else {
            self.db.define_macro(defined, count, has_default);
        }
    }

    fn is_char(&self, node: &Node, text: &str) -> bool {
        node.is_chars() && node.text(self.source) == text
    }

    /// First non-whitespace index at or after `from`, never crossing a blank
    /// line.
    fn skip_whitespace(&self, items: &VecDeque<Node>, from: usize) -> Option<usize> {
        let mut newlines = 0;
        for (i, node) in items.iter().enumerate().skip(from) {
            if node.is_whitespace(self.source) {
                newlines += node.text(self.source).matches('\n').count();
                if newlines >= 2 {
                    return None;
                }
                continue;
            }
            return Some(i);
        }
        None
    }

    fn matching_bracket(&self, items: &VecDeque<Node>, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, node) in items.iter().enumerate().skip(open) {
            if !node.is_chars() {
                continue;
            }
            let text = node.text(self.source);
            if text == "[" {
                depth += 1;
            } else if text == "]" {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            } else if text.matches('\n').count() >= 2 {
                return None;
            }
        }
        None
    }
}

fn absorb_unknown(
    name: String,
    range: Range<usize>,
    items: &mut VecDeque<Node>,
    source: &str,
) -> Node {
    let mut end = range.end;
    let mut consumed = 0;
    while let Some(node) = items.get(consumed) {
        if node.range.start != end {
            break;
        }
        match node.kind {
            NodeKind::Group { .. } | NodeKind::Comment => {
                end = node.range.end;
                consumed += 1;
            }
            NodeKind::Chars if node.text(source) == "[" => {
                let mut depth = 0usize;
                let mut close = None;
                for (i, n) in items.iter().enumerate().skip(consumed) {
                    match n.text(source) {
                        "[" if n.is_chars() => depth += 1,
                        "]" if n.is_chars() => {
                            depth -= 1;
                            if depth == 0 {
                                close = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let Some(close) = close else {
                    break;
                };
                end = items[close].range.end;
                consumed = close + 1;
            }
            _ => break,
        }
    }
    items.drain(..consumed);
    Node::new(NodeKind::Unknown { name: Some(name) }, range.start..end)
}

/// Merge adjacent character atoms into runs, splitting out blank lines as
/// paragraph breaks.
fn merge_chars(nodes: Vec<Node>, source: &str) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut run = CharRun::default();
    for node in nodes {
        if node.is_chars() && run.accepts(&node) {
            run.push(node.range, source, &mut out);
            continue;
        }
        run.flush(source, &mut out);
        if node.is_chars() {
            run.push(node.range, source, &mut out);
        } else {
            out.push(node);
        }
    }
    run.flush(source, &mut out);
    out
}

#[derive(Default)]
struct CharRun {
    text: Option<Range<usize>>,
    space: Option<Range<usize>>,
}

impl CharRun {
    fn end(&self) -> Option<usize> {
        self.space
            .as_ref()
            .or(self.text.as_ref())
            .map(|r| r.end)
    }

    fn accepts(&self, node: &Node) -> bool {
        self.end().map_or(true, |end| end == node.range.start)
    }

    fn push(&mut self, range: Range<usize>, source: &str, out: &mut Vec<Node>) {
        let whitespace = source
            .get(range.clone())
            .is_some_and(|t| t.chars().all(char::is_whitespace));
        if whitespace {
            self.space = Some(match self.space.take() {
                Some(space) => space.start..range.end,
                None => range,
            });
        } else {
            self.flush_space(source, out);
            self.text = Some(match self.text.take() {
                Some(text) => text.start..range.end,
                None => range,
            });
        }
    }

    fn flush_space(&mut self, source: &str, out: &mut Vec<Node>) {
        let Some(space) = self.space.take() else {
            return;
        };
        let newlines = source.get(space.clone()).map_or(0, |t| t.matches('\n').count());
        if newlines >= 2 {
            if let Some(text) = self.text.take() {
                out.push(Node::chars(text));
            }
            out.push(Node::new(NodeKind::Specials(Special::ParagraphBreak), space));
        } else {
            self.text = Some(match self.text.take() {
                Some(text) => text.start..space.end,
                None => space,
            });
        }
    }

    fn flush(&mut self, source: &str, out: &mut Vec<Node>) {
        self.flush_space(source, out);
        if let Some(text) = self.text.take() {
            out.push(Node::chars(text));
        }
    }
}
