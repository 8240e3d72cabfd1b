//! LaTeX parsing
//!
//! `mitex-parser` produces a lossless CST; [`lower`] turns it into [`Node`]s
//! with byte ranges and [`bind`] attaches macro arguments using the
//! [`MacroDb`].

pub mod bind;
pub mod lower;
pub mod node;

pub use node::{Argument, Delim, Node, NodeKind, Special};

use crate::data::macros::MacroDb;

/// Parse a LaTeX source into bound nodes, learning any definitions it
/// contains into `db`.
pub fn parse(source: &str, db: &mut MacroDb) -> Vec<Node> {
    let atoms = lower::lower_source(source);
    bind::bind(atoms, source, db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_binds_star_and_title() {
        let src = r"\section*{Intro} text";
        let mut db = MacroDb::new();
        let nodes = parse(src, &mut db);
        let NodeKind::Macro { name, args } = &nodes[0].kind else {
            panic!("expected macro, got {:?}", nodes[0]);
        };
        assert_eq!(name, "section");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].delim, Delim::Star);
        assert_eq!(args[1].text(src), "Intro");
        assert_eq!(nodes[0].text(src), r"\section*{Intro}");
    }

    #[test]
    fn test_optional_argument_is_bound() {
        let src = r"\caption[short]{Long caption}";
        let mut db = MacroDb::new();
        let nodes = parse(src, &mut db);
        assert_eq!(nodes.len(), 1);
        let NodeKind::Macro { args, .. } = &nodes[0].kind else {
            panic!("expected macro");
        };
        assert_eq!(args[0].delim, Delim::Bracket);
        assert_eq!(args[0].text(src), "short");
        assert_eq!(args[1].text(src), "Long caption");
    }

    #[test]
    fn test_newcommand_is_learnt_and_used() {
        let src = "\\newcommand{\\mytitle}[1]{\\textbf{#1}}\n\\mytitle{Hello} world";
        let mut db = MacroDb::new();
        let nodes = parse(src, &mut db);
        assert_eq!(db.macro_args("mytitle"), Some("{"));
        let used = nodes
            .iter()
            .find(|n| n.macro_name() == Some("mytitle"))
            .expect("bound use");
        assert_eq!(used.text(src), r"\mytitle{Hello}");
    }

    #[test]
    fn test_unknown_macro_absorbs() {
        let src = r"\IEEEauthorblockN{Ada}% x";
        let mut db = MacroDb::new();
        let nodes = parse(src, &mut db);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0].kind, NodeKind::Unknown { .. }));
        assert_eq!(nodes[0].text(src), src);
    }

    #[test]
    fn test_environment_arguments() {
        let src = "\\begin{tabular}{ll}a & b\\end{tabular}";
        let mut db = MacroDb::new();
        let nodes = parse(src, &mut db);
        let NodeKind::Environment {
            name,
            args,
            body_range,
            ..
        } = &nodes[0].kind
        else {
            panic!("expected environment");
        };
        assert_eq!(name, "tabular");
        assert_eq!(args.last().map(|a| a.text(src)), Some("ll"));
        assert_eq!(&src[body_range.clone()], "a & b");
    }
}
