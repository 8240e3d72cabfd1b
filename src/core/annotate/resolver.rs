//! Node resolver
//!
//! Walks parsed nodes and appends to an output buffer: untouched ranges are
//! copied byte for byte, classified ranges are wrapped with fresh colors.
//! Bytes between nodes (and between a node and its arguments) are always
//! copied, so nothing the parser did not hand over is ever lost.

use std::ops::Range;

use super::rules::{classify, classify_environment, classify_macro, EnvRule, MacroRule};
use super::session::AnnotationSession;
use crate::core::color::Scheme;
use crate::model::Label;
use crate::parser::{Argument, Delim, Node, NodeKind, Special};
use crate::utils::error::{AnnotationWarning, Result, WarningKind};
use crate::utils::files::{is_annotatable, FileResolver};

pub struct Resolver<'s, 'a> {
    session: &'s mut AnnotationSession,
    files: &'a dyn FileResolver,
    source: &'a str,
    out: String,
}

/// Context for the body of an environment named `name`.
///
/// A `Paragraph` (or absent) context is refined from the environment name;
/// any more specific context is inherited, so `center` inside `abstract`
/// stays `Abstract`.
pub fn environment_context(name: &str, parent: Option<Label>) -> Option<Label> {
    match parent {
        None | Some(Label::Paragraph) => Some(classify(name)),
        inherited => inherited,
    }
}

impl<'s, 'a> Resolver<'s, 'a> {
    pub fn new(
        session: &'s mut AnnotationSession,
        files: &'a dyn FileResolver,
        source: &'a str,
    ) -> Self {
        Self {
            session,
            files,
            source,
            out: String::with_capacity(source.len() * 2),
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// Resolve the nodes of a whole file; every source byte is emitted.
    pub fn resolve_all(&mut self, nodes: &[Node], context: Option<Label>) -> Result<()> {
        self.resolve_range(nodes, 0..self.source.len(), context)
    }

    /// Resolve `nodes` under `context`, copying whatever lies between them.
    pub fn resolve(&mut self, nodes: &[Node], context: Option<Label>) -> Result<()> {
        let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
            return Ok(());
        };
        self.resolve_range(nodes, first.range.start..last.range.end, context)
    }

    fn resolve_range(
        &mut self,
        nodes: &[Node],
        span: Range<usize>,
        context: Option<Label>,
    ) -> Result<()> {
        let mut cursor = span.start;
        for node in nodes {
            if node.range.start < cursor {
                continue;
            }
            self.copy(cursor..node.range.start);
            self.resolve_node(node, context)?;
            cursor = node.range.end;
        }
        self.copy(cursor..span.end.max(cursor));
        Ok(())
    }

    fn resolve_node(&mut self, node: &Node, context: Option<Label>) -> Result<()> {
        match &node.kind {
            NodeKind::Chars => self.resolve_chars(node.range.clone(), context),
            NodeKind::Group { inner, body } => {
                if context.is_some() && node.len() >= self.session.options.group_descend_min_bytes
                {
                    self.copy(node.range.start..inner.start);
                    self.resolve_range(body, inner.clone(), context)?;
                    self.copy(inner.end..node.range.end);
                } else {
                    self.copy(node.range.clone());
                }
                Ok(())
            }
            NodeKind::Macro { name, args } => self.resolve_macro(node, name, args, context),
            NodeKind::Environment {
                name,
                args,
                body_range,
                body,
            } => self.resolve_environment(node, name, args, body_range, body, context),
            NodeKind::Math => match context {
                Some(_) => self.wrap(node.range.clone(), Label::Equation, Scheme::High),
                None => {
                    self.copy(node.range.clone());
                    Ok(())
                }
            },
            NodeKind::Specials(Special::ParagraphBreak) => {
                self.copy(node.range.clone());
                self.session.end_block(context);
                Ok(())
            }
            NodeKind::Comment | NodeKind::Specials(_) | NodeKind::Unknown { .. } => {
                self.copy(node.range.clone());
                Ok(())
            }
        }
    }

    /// One color per whitespace-delimited token; whitespace kept as is.
    fn resolve_chars(&mut self, range: Range<usize>, context: Option<Label>) -> Result<()> {
        let source = self.source;
        let text = source.get(range).unwrap_or("");
        let Some(label) = context else {
            self.out.push_str(text);
            return Ok(());
        };

        let mut rest = text;
        while !rest.is_empty() {
            let space = rest.len() - rest.trim_start().len();
            if space > 0 {
                self.out.push_str(&rest[..space]);
                rest = &rest[space..];
                continue;
            }
            let token = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let marked = self.session.annotate_span(&rest[..token], label, Scheme::High)?;
            self.out.push_str(&marked);
            rest = &rest[token..];
        }
        Ok(())
    }

    fn resolve_macro(
        &mut self,
        node: &Node,
        name: &str,
        args: &[Argument],
        context: Option<Label>,
    ) -> Result<()> {
        match classify_macro(name) {
            MacroRule::Definition | MacroRule::Skip => self.copy(node.range.clone()),
            MacroRule::ParagraphBreak => {
                self.copy(node.range.clone());
                self.session.end_block(context);
            }
            MacroRule::Include => return self.resolve_include(node, args, context),
            MacroRule::Graphics => {
                return self.wrap(node.range.clone(), Label::Figure, Scheme::Low);
            }
            MacroRule::Listing => {
                self.wrap(node.range.clone(), Label::Equation, Scheme::High)?;
                self.session.end_block(context);
            }
            MacroRule::TitleArea => return self.resolve_title_area(node, args, context),
            MacroRule::TwoColumn => match args.last() {
                Some(arg) if arg.delim == Delim::Bracket && !arg.body.is_empty() => {
                    self.resolve_argument(node, arg, context)?;
                }
                _ => self.copy(node.range.clone()),
            },
            MacroRule::Bibliography => {
                self.session.add_heading("section");
                self.wrap(node.range.clone(), Label::Reference, Scheme::High)?;
                self.session.end_block(context);
            }
            MacroRule::Keyword { label, heading } => {
                if heading {
                    self.session.add_heading(&name.to_lowercase());
                }
                self.resolve_last_argument(node, name, args, Some(label))?;
                self.session.end_block(context);
            }
            MacroRule::Inherit => match context {
                Some(label) => {
                    self.resolve_last_argument(node, name, args, Some(label))?;
                    self.session.end_block(context);
                }
                None => self.copy(node.range.clone()),
            },
            MacroRule::Other => match context {
                Some(label) if self.session.macros().renders_text(name) => {
                    self.wrap(node.range.clone(), label, Scheme::High)?;
                    self.session.end_block(context);
                }
                _ => self.copy(node.range.clone()),
            },
        }
        Ok(())
    }

    /// Recurse into the last brace argument; the rest of the invocation is
    /// copied. Missing or empty arguments leave the whole macro untouched.
    fn resolve_last_argument(
        &mut self,
        node: &Node,
        name: &str,
        args: &[Argument],
        context: Option<Label>,
    ) -> Result<()> {
        let Some(arg) = args.iter().rev().find(|a| a.delim == Delim::Brace) else {
            self.session.warn(
                AnnotationWarning::new(WarningKind::MissingArgument, "no brace argument")
                    .with_location(format!("\\{}", name)),
            );
            self.copy(node.range.clone());
            return Ok(());
        };
        if arg.body.is_empty() || arg.text(self.source).trim().is_empty() {
            self.copy(node.range.clone());
            return Ok(());
        }
        self.resolve_argument(node, arg, context)
    }

    /// Copy `node` around `arg`, resolving the argument body.
    fn resolve_argument(&mut self, node: &Node, arg: &Argument, context: Option<Label>) -> Result<()> {
        self.copy(node.range.start..arg.inner.start);
        self.resolve_range(&arg.body, arg.inner.clone(), context)?;
        self.copy(arg.inner.end..node.range.end);
        Ok(())
    }

    fn resolve_title_area(
        &mut self,
        node: &Node,
        args: &[Argument],
        context: Option<Label>,
    ) -> Result<()> {
        self.session.add_heading("title");
        let braces: Vec<&Argument> = args.iter().filter(|a| a.delim == Delim::Brace).collect();
        let [title, authors, ..] = braces.as_slice() else {
            self.session.warn(
                AnnotationWarning::new(WarningKind::MissingArgument, "expected title and authors")
                    .with_location("\\titlearea"),
            );
            self.copy(node.range.clone());
            return Ok(());
        };
        self.copy(node.range.start..title.inner.start);
        self.resolve_range(&title.body, title.inner.clone(), Some(Label::Title))?;
        self.copy(title.inner.end..authors.inner.start);
        self.resolve_range(&authors.body, authors.inner.clone(), Some(Label::Author))?;
        self.copy(authors.inner.end..node.range.end);
        self.session.end_block(context);
        Ok(())
    }

    fn resolve_include(
        &mut self,
        node: &Node,
        args: &[Argument],
        context: Option<Label>,
    ) -> Result<()> {
        self.copy(node.range.clone());
        if !self.session.options.follow_includes {
            return Ok(());
        }
        let Some(arg) = args.iter().find(|a| a.delim == Delim::Brace) else {
            return Ok(());
        };
        let target = arg.text(self.source).trim();
        if target.is_empty() || !is_annotatable(target) {
            log::debug!("not following include of '{}'", target);
            return Ok(());
        }
        match self.files.resolve(target) {
            Ok(file) => self
                .session
                .annotate_file(file.path, &file.content, context, self.files),
            Err(e) => {
                self.session.warn(
                    AnnotationWarning::new(WarningKind::MissingInclude, e.to_string())
                        .with_location(target.to_string()),
                );
                Ok(())
            }
        }
    }

    fn resolve_environment(
        &mut self,
        node: &Node,
        name: &str,
        args: &[Argument],
        body_range: &Range<usize>,
        body: &[Node],
        context: Option<Label>,
    ) -> Result<()> {
        let is_math = self.session.macros().is_math_env(name);
        let whole = match classify_environment(name, is_math) {
            EnvRule::Math | EnvRule::Verbatim => Some((Label::Equation, Scheme::High)),
            EnvRule::Bibliography => Some((Label::Reference, Scheme::High)),
            EnvRule::Drawing => Some((Label::Figure, Scheme::Low)),
            EnvRule::Tabular => Some((Label::Table, Scheme::High)),
            EnvRule::Comment => {
                self.copy(node.range.clone());
                return Ok(());
            }
            EnvRule::MultiColumn => {
                let inner = environment_context(name, context);
                let mut cursor = node.range.start;
                // only the `[preface]`; the `{N}` column count stays a number
                let preface = args
                    .iter()
                    .rev()
                    .find(|a| a.delim == Delim::Bracket && !a.body.is_empty());
                if let Some(arg) = preface {
                    self.copy(cursor..arg.inner.start);
                    self.resolve_range(&arg.body, arg.inner.clone(), inner)?;
                    cursor = arg.inner.end;
                }
                self.copy(cursor..body_range.start);
                self.resolve_range(body, body_range.clone(), inner)?;
                self.copy(body_range.end..node.range.end);
                None
            }
            EnvRule::Body => {
                if body.is_empty() {
                    self.copy(node.range.clone());
                } else {
                    let inner = environment_context(name, context);
                    self.copy(node.range.start..body_range.start);
                    self.resolve_range(body, body_range.clone(), inner)?;
                    self.copy(body_range.end..node.range.end);
                }
                None
            }
        };

        if let Some((label, scheme)) = whole {
            if context.is_some() {
                self.wrap(node.range.clone(), label, scheme)?;
            } else {
                self.copy(node.range.clone());
            }
        }
        self.session.end_block(context);
        Ok(())
    }

    fn wrap(&mut self, range: Range<usize>, label: Label, scheme: Scheme) -> Result<()> {
        let source = self.source;
        let text = source.get(range).unwrap_or("");
        let marked = self.session.annotate_span(text, label, scheme)?;
        self.out.push_str(&marked);
        Ok(())
    }

    fn copy(&mut self, range: Range<usize>) {
        if let Some(text) = self.source.get(range) {
            self.out.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotate::{strip_color_markers, AnnotateOptions};
    use crate::utils::files::{MemoryFileResolver, NoopFileResolver};
    use pretty_assertions::assert_eq;

    fn annotate(source: &str) -> (String, AnnotationSession) {
        let mut session = AnnotationSession::default();
        let out = session
            .annotate_source("main.tex", source, &NoopFileResolver)
            .unwrap();
        (out, session)
    }

    fn labels(session: &AnnotationSession) -> Vec<(String, Label)> {
        session
            .registry()
            .iter()
            .map(|(_, r)| (r.source_text.clone(), r.label))
            .collect()
    }

    #[test]
    fn test_environment_context_rule() {
        assert_eq!(environment_context("center", None), Some(Label::Paragraph));
        assert_eq!(
            environment_context("itemize", Some(Label::Paragraph)),
            Some(Label::List)
        );
        assert_eq!(
            environment_context("center", Some(Label::Abstract)),
            Some(Label::Abstract)
        );
    }

    #[test]
    fn test_preamble_text_is_untouched() {
        let src = "\\documentclass{article}\n\\usepackage{amsmath}\n% comment\nplain words\n";
        let (out, session) = annotate(src);
        assert_eq!(out, src);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_section_round_trip() {
        let src = r"\section{A} Hello world.";
        let (out, session) = annotate(src);
        assert_ne!(out, src);
        assert_eq!(strip_color_markers(&out), src);
        assert_eq!(labels(&session), vec![("A".to_string(), Label::Section)]);
        assert_eq!(session.toc().export(), vec![(1, 0)]);
    }

    #[test]
    fn test_document_body_tokens() {
        let src = "\\begin{document}\n\\section{Intro}\nThe cat sat.\n\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert_eq!(
            labels(&session),
            vec![
                ("Intro".to_string(), Label::Section),
                ("The".to_string(), Label::Paragraph),
                ("cat".to_string(), Label::Paragraph),
                ("sat.".to_string(), Label::Paragraph),
            ]
        );
        let blocks: Vec<u32> = session.registry().iter().map(|(_, r)| r.block_id).collect();
        assert_ne!(blocks[0], blocks[1]);
        assert_eq!(blocks[1], blocks[3]);
    }

    #[test]
    fn test_whole_wraps_and_skips() {
        let src = "\\begin{document}\n\\begin{figure}\\centering\\includegraphics{a.pdf}\\caption{A cat.}\\label{fig:a}\\end{figure}\n$x^2$ \\begin{equation}y\\end{equation}\n\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert!(out.contains(r"\colorbox[rgb]{0.0,0.0,0.1}{\includegraphics{a.pdf}}"));
        assert!(out.contains(r"\label{fig:a}"));
        assert_eq!(
            labels(&session),
            vec![
                (r"\includegraphics{a.pdf}".to_string(), Label::Figure),
                ("A".to_string(), Label::Caption),
                ("cat.".to_string(), Label::Caption),
                ("$x^2$".to_string(), Label::Equation),
                (r"\begin{equation}y\end{equation}".to_string(), Label::Equation),
            ]
        );
    }

    #[test]
    fn test_nested_context_is_inherited() {
        let src = "\\begin{document}\\begin{abstract}\\begin{center}Short.\\end{center}\\end{abstract}\\end{document}";
        let (_, session) = annotate(src);
        assert_eq!(
            labels(&session),
            vec![("Short.".to_string(), Label::Abstract)]
        );
    }

    #[test]
    fn test_paragraph_break_advances_block() {
        let src = "\\begin{document}One.\n\nTwo.\\par Three.\\end{document}";
        let (_, session) = annotate(src);
        let blocks: Vec<u32> = session.registry().iter().map(|(_, r)| r.block_id).collect();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0] < blocks[1] && blocks[1] < blocks[2]);
    }

    #[test]
    fn test_inherit_macro_without_context_is_verbatim() {
        let src = r"\textbf{bold} \emph{}";
        let (out, session) = annotate(src);
        assert_eq!(out, src);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_bibliography_macro() {
        let src = "\\begin{document}\\bibliographystyle{plain}\\bibliography{refs}\\end{document}";
        let (_, session) = annotate(src);
        assert_eq!(session.toc().export(), vec![(1, 0)]);
        assert_eq!(
            labels(&session),
            vec![(r"\bibliography{refs}".to_string(), Label::Reference)]
        );
    }

    #[test]
    fn test_small_groups_are_copied() {
        let src = "\\begin{document}{\\bf short}\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(out, src);
        assert!(session.registry().is_empty());

        let mut session = AnnotationSession::new(
            AnnotateOptions::default().with_group_descend_min_bytes(1),
        );
        session
            .annotate_source("main.tex", src, &NoopFileResolver)
            .unwrap();
        assert_eq!(
            labels(&session),
            vec![("short".to_string(), Label::Paragraph)]
        );
    }

    #[test]
    fn test_include_shares_session() {
        let files = MemoryFileResolver::new()
            .with_file(
                "main.tex",
                "\\begin{document}\\section{One}\\input{body}\\end{document}",
            )
            .with_file("body.tex", "\\section{Two} Words");
        let mut session = AnnotationSession::default();
        session.annotate_document("main.tex", &files).unwrap();
        assert_eq!(session.toc().export(), vec![(1, 0), (2, 0)]);
        assert_eq!(
            labels(&session),
            vec![
                ("One".to_string(), Label::Section),
                ("Two".to_string(), Label::Section),
                ("Words".to_string(), Label::Paragraph),
            ]
        );
        let body = session.output("body.tex").unwrap();
        assert_eq!(strip_color_markers(body), "\\section{Two} Words");
        let main = session.output("main.tex").unwrap();
        assert!(main.contains(r"\input{body}"));
    }

    #[test]
    fn test_multicols_column_count_is_verbatim() {
        let src = "\\begin{document}\\begin{multicols}{2}\nLeft right.\n\\end{multicols}\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert!(out.contains("\\begin{multicols}{2}\n"));
        assert_eq!(
            labels(&session),
            vec![
                ("Left".to_string(), Label::Paragraph),
                ("right.".to_string(), Label::Paragraph),
            ]
        );
    }

    #[test]
    fn test_multicols_preface_and_body() {
        let src = "\\begin{document}\\begin{multicols}{3}[Lead in]\nBody.\n\\end{multicols}\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert!(out.contains("\\begin{multicols}{3}["));
        assert_eq!(
            labels(&session),
            vec![
                ("Lead".to_string(), Label::Paragraph),
                ("in".to_string(), Label::Paragraph),
                ("Body.".to_string(), Label::Paragraph),
            ]
        );
    }

    #[test]
    fn test_twocolumn_argument_keeps_context() {
        let src = "\\begin{document}\\twocolumn[Wide intro]\nAfter.\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert!(out.starts_with("\\begin{document}\\twocolumn["));
        assert_eq!(
            labels(&session),
            vec![
                ("Wide".to_string(), Label::Paragraph),
                ("intro".to_string(), Label::Paragraph),
                ("After.".to_string(), Label::Paragraph),
            ]
        );

        let (out, session) = annotate("\\begin{document}\\twocolumn\\end{document}");
        assert_eq!(out, "\\begin{document}\\twocolumn\\end{document}");
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_titlearea_title_and_authors() {
        let src = "\\titlearea{Rainbow Layouts}{Ada Lovelace}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert_eq!(session.toc().export(), vec![(1, 0)]);
        assert_eq!(
            labels(&session),
            vec![
                ("Rainbow".to_string(), Label::Title),
                ("Layouts".to_string(), Label::Title),
                ("Ada".to_string(), Label::Author),
                ("Lovelace".to_string(), Label::Author),
            ]
        );

        let (out, session) = annotate("\\titlearea{Alone}");
        assert_eq!(out, "\\titlearea{Alone}");
        assert!(session
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::MissingArgument));
    }

    #[test]
    fn test_drawing_is_low_precision_figure() {
        let src = "\\begin{document}\\begin{tikzpicture}\\draw (0,0) -- (1,1);\\end{tikzpicture}\\end{document}";
        let (out, session) = annotate(src);
        assert_eq!(strip_color_markers(&out), src);
        assert!(out.contains(
            "\\colorbox[rgb]{0.0,0.0,0.1}{\\begin{tikzpicture}\\draw (0,0) -- (1,1);\\end{tikzpicture}}"
        ));
        assert_eq!(
            labels(&session),
            vec![(
                "\\begin{tikzpicture}\\draw (0,0) -- (1,1);\\end{tikzpicture}".to_string(),
                Label::Figure
            )]
        );
    }

    #[test]
    fn test_whole_wraps_need_a_context() {
        let src = "\\begin{tabular}{c}a\\end{tabular}\n\\begin{tikzpicture}\\end{tikzpicture}\n\\begin{equation}x\\end{equation}";
        let (out, session) = annotate(src);
        assert_eq!(out, src);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_missing_include_warns() {
        let src = "\\begin{document}\\input{nowhere}\\end{document}";
        let mut session = AnnotationSession::default();
        let files = MemoryFileResolver::new();
        let out = session.annotate_source("main.tex", src, &files).unwrap();
        assert_eq!(out, src);
        assert!(session
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::MissingInclude));
    }
}
