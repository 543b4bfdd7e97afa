//! Exclude patterns: shell globs and raw regexes merged into one regex.
//!
//! An `<exclude>` element holds at most one `<shellpatterns>` and one
//! `<pyregex>` child, each a whitespace-separated token list. Every token is
//! translated on its own and wrapped in a group, then all tokens are joined
//! into a single alternation that must match the whole candidate path.

use regex::Regex;
use roxmltree::Node;

use crate::error::{ProjectError, Result};

const SHELL_PATTERNS_TAG: &str = "shellpatterns";
const REGEX_PATTERNS_TAG: &str = "pyregex";
pub const EXCLUDE_TAG: &str = "exclude";

/// Translate one shell glob into regex syntax, without anchors.
///
/// `*` matches any run of characters (path separators included), `?` any
/// single character, `[...]` a character class with `!` for negation. An
/// unterminated `[` is literal.
pub fn translate_shell_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                } else {
                    out.push_str(&translate_class(&chars[i..j]));
                    i = j + 1;
                }
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    format!("(?s:{out})")
}

/// Class bodies follow fnmatch: a `-` right after a range end is literal and
/// reversed ranges (`z-a`) match nothing.
fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut chunks: Vec<Vec<char>> = Vec::new();
    let mut start = 0;
    let mut search = 1;
    while let Some(offset) = body
        .get(search..)
        .and_then(|rest| rest.iter().position(|&c| c == '-'))
    {
        let hyphen = search + offset;
        chunks.push(body[start..hyphen].to_vec());
        start = hyphen + 1;
        search = hyphen + 3;
    }
    let tail = &body[start..];
    if tail.is_empty() && !chunks.is_empty() {
        if let Some(last) = chunks.last_mut() {
            last.push('-');
        }
    } else {
        chunks.push(tail.to_vec());
    }

    for k in (1..chunks.len()).rev() {
        let reversed = matches!(
            (chunks[k - 1].last(), chunks[k].first()),
            (Some(low), Some(high)) if low > high
        );
        if reversed {
            let next = chunks.remove(k);
            chunks[k - 1].pop();
            chunks[k - 1].extend_from_slice(&next[1..]);
        }
    }

    let items: Vec<String> = chunks
        .iter()
        .map(|chunk| {
            let mut escaped = String::new();
            for &c in chunk {
                if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^' | '-') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped
        })
        .collect();
    let items = items.join("-");

    match (items.is_empty(), negated) {
        (true, false) => r"[^\x00-\x{10FFFF}]".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{items}]"),
        (false, true) => format!("[^{items}]"),
    }
}

/// Accumulates translated tokens for one exclude scope.
#[derive(Debug, Default, Clone)]
pub struct PatternCompiler {
    fragments: Vec<String>,
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shell glob token, validated on its own like a regex token.
    pub fn add_shell_pattern(&mut self, pattern: &str) -> Result<()> {
        let translated = translate_shell_pattern(pattern);
        Regex::new(&translated).map_err(|source| ProjectError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.fragments.push(translated);
        Ok(())
    }

    /// Add a raw regex token; it is validated on its own so the error names it.
    pub fn add_regex(&mut self, pattern: &str) -> Result<()> {
        Regex::new(pattern).map_err(|source| ProjectError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.fragments.push(pattern.to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The combined alternation, or `None` when no token was given.
    pub fn to_regex(&self) -> Option<String> {
        (!self.fragments.is_empty()).then(|| alternation(&self.fragments))
    }

    /// Compile into a matcher; `None` means "no filtering".
    pub fn compile(self) -> Result<Option<ExcludePattern>> {
        if self.fragments.is_empty() {
            return Ok(None);
        }
        ExcludePattern::from_fragments(self.fragments).map(Some)
    }
}

fn alternation(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|fragment| format!("(?:{fragment})"))
        .collect::<Vec<_>>()
        .join("|")
}

/// A compiled exclude scope. Matching is against the whole candidate string.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    fragments: Vec<String>,
    regex: Regex,
}

impl ExcludePattern {
    fn from_fragments(fragments: Vec<String>) -> Result<Self> {
        let source = format!("^(?:{})$", alternation(&fragments));
        let regex = Regex::new(&source).map_err(|source_err| ProjectError::Pattern {
            pattern: source.clone(),
            source: source_err,
        })?;
        Ok(Self { fragments, regex })
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The full anchored regex.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Alternation of `self` (the inherited scope) and `own`.
    pub fn union(&self, own: &ExcludePattern) -> Result<ExcludePattern> {
        let mut fragments = self.fragments.clone();
        fragments.extend(own.fragments.iter().cloned());
        Self::from_fragments(fragments)
    }
}

/// Reads the pattern lists of one `<exclude>` element.
pub struct PatternParser;

impl PatternParser {
    pub fn parse(node: Node<'_, '_>) -> Result<PatternCompiler> {
        let mut shell: Option<Node<'_, '_>> = None;
        let mut regex: Option<Node<'_, '_>> = None;

        for child in node.children().filter(Node::is_element) {
            let slot = match child.tag_name().name() {
                SHELL_PATTERNS_TAG => &mut shell,
                REGEX_PATTERNS_TAG => &mut regex,
                other => {
                    return Err(ProjectError::structure(
                        other,
                        format!("not allowed inside <{EXCLUDE_TAG}>"),
                    ))
                }
            };
            if slot.replace(child).is_some() {
                return Err(ProjectError::structure(
                    child.tag_name().name(),
                    format!("appears more than once in one <{EXCLUDE_TAG}>"),
                ));
            }
        }

        let mut compiler = PatternCompiler::new();
        if let Some(shell) = shell {
            for token in text_of(shell).split_whitespace() {
                compiler.add_shell_pattern(token)?;
            }
        }
        if let Some(regex) = regex {
            for token in text_of(regex).split_whitespace() {
                compiler.add_regex(token)?;
            }
        }
        Ok(compiler)
    }
}

/// Concatenation of the direct text children of `node`.
fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .collect()
}

fn is_truthy(value: &str) -> bool {
    ["yes", "true", "1"]
        .iter()
        .any(|accepted| value.trim().eq_ignore_ascii_case(accepted))
}

/// Effective exclude pattern of `node` given its parent's.
///
/// - no `<exclude>` child: the parent's pattern, unchanged;
/// - `<exclude inherit="yes">`: parent and own patterns combined;
/// - `<exclude>` without `inherit`: own pattern only. An empty one therefore
///   clears every inherited exclude for the subtree.
pub fn resolve_exclude(
    node: Node<'_, '_>,
    parent: Option<&ExcludePattern>,
) -> Result<Option<ExcludePattern>> {
    let mut excludes = node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == EXCLUDE_TAG);
    let Some(exclude) = excludes.next() else {
        return Ok(parent.cloned());
    };
    if excludes.next().is_some() {
        return Err(ProjectError::structure(
            EXCLUDE_TAG,
            format!(
                "<{}> declares more than one exclude scope",
                node.tag_name().name()
            ),
        ));
    }

    let inherit = exclude.attribute("inherit").is_some_and(is_truthy);
    let own = PatternParser::parse(exclude)?.compile()?;

    match (inherit, parent, own) {
        (true, Some(parent), Some(own)) => parent.union(&own).map(Some),
        (true, Some(parent), None) => Ok(Some(parent.clone())),
        (_, _, own) => Ok(own),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn compiled(shell: &[&str], regex: &[&str]) -> ExcludePattern {
        let mut compiler = PatternCompiler::new();
        for pattern in shell {
            compiler.add_shell_pattern(pattern).unwrap();
        }
        for pattern in regex {
            compiler.add_regex(pattern).unwrap();
        }
        compiler.compile().unwrap().unwrap()
    }

    fn resolve(xml: &str, parent: Option<&ExcludePattern>) -> Result<Option<ExcludePattern>> {
        let doc = Document::parse(xml).unwrap();
        resolve_exclude(doc.root_element(), parent)
    }

    #[test]
    fn star_matches_any_run() {
        let pattern = compiled(&["*.o"], &[]);
        assert!(pattern.is_match("foo.o"));
        assert!(pattern.is_match("src/deep/foo.o"));
        assert!(pattern.is_match(".o"));
        assert!(!pattern.is_match("foo.obj"));
        assert!(!pattern.is_match("foo.c"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let pattern = compiled(&["a?c"], &[]);
        assert!(pattern.is_match("abc"));
        assert!(!pattern.is_match("ac"));
        assert!(!pattern.is_match("abbc"));
    }

    #[test]
    fn character_classes() {
        let pattern = compiled(&["file[0-9].txt"], &[]);
        assert!(pattern.is_match("file3.txt"));
        assert!(!pattern.is_match("filex.txt"));

        let negated = compiled(&["file[!0-9].txt"], &[]);
        assert!(negated.is_match("filex.txt"));
        assert!(!negated.is_match("file3.txt"));
    }

    #[test]
    fn hyphen_after_range_end_is_literal() {
        let pattern = compiled(&["[a-c-e]"], &[]);
        for hit in ["a", "b", "c", "-", "e"] {
            assert!(pattern.is_match(hit), "{hit}");
        }
        assert!(!pattern.is_match("d"));

        let edges = compiled(&["[-x]", "[y-]"], &[]);
        for hit in ["-", "x", "y"] {
            assert!(edges.is_match(hit), "{hit}");
        }
    }

    #[test]
    fn reversed_ranges_are_dropped() {
        let double_hyphen = compiled(&["[a--z]"], &[]);
        assert!(double_hyphen.is_match("z"));
        assert!(!double_hyphen.is_match("a"));
        assert!(!double_hyphen.is_match("-"));
        assert!(!double_hyphen.is_match("m"));

        let empty = compiled(&["[z-a]"], &[]);
        for miss in ["a", "m", "z", ""] {
            assert!(!empty.is_match(miss), "{miss}");
        }

        let negated_empty = compiled(&["[!z-a]"], &[]);
        assert!(negated_empty.is_match("q"));
    }

    #[test]
    fn set_operators_in_classes_are_literal() {
        let pattern = compiled(&["[&&~~]"], &[]);
        assert!(pattern.is_match("&"));
        assert!(pattern.is_match("~"));
        assert!(!pattern.is_match("a"));
    }

    #[test]
    fn unterminated_class_is_literal() {
        let pattern = compiled(&["a[b"], &[]);
        assert!(pattern.is_match("a[b"));
        assert!(!pattern.is_match("ab"));
    }

    #[test]
    fn regex_metacharacters_in_globs_are_escaped() {
        let pattern = compiled(&["a+b.(c)"], &[]);
        assert!(pattern.is_match("a+b.(c)"));
        assert!(!pattern.is_match("aab.(c)"));
        assert!(!pattern.is_match("a+bx(c)"));
    }

    #[test]
    fn regex_tokens_use_full_match() {
        let pattern = compiled(&[], &[r".*\.bak"]);
        assert!(pattern.is_match("notes.bak"));
        assert!(!pattern.is_match("notes.bak.txt"));
    }

    #[test]
    fn tokens_do_not_bleed_into_each_other() {
        let pattern = compiled(&[], &["a", "b"]);
        assert!(pattern.is_match("a"));
        assert!(pattern.is_match("b"));
        assert!(!pattern.is_match("ab"));

        let anchored = compiled(&[], &["^x$", "y|z"]);
        assert!(anchored.is_match("x"));
        assert!(anchored.is_match("z"));
        assert!(!anchored.is_match("xz"));
    }

    #[test]
    fn empty_compiler_yields_no_pattern() {
        let compiler = PatternCompiler::new();
        assert!(compiler.to_regex().is_none());
        assert!(compiler.compile().unwrap().is_none());
    }

    #[test]
    fn to_regex_wraps_each_token() {
        let mut compiler = PatternCompiler::new();
        compiler.add_regex("a|b").unwrap();
        compiler.add_regex("c").unwrap();
        assert_eq!(compiler.to_regex().as_deref(), Some("(?:a|b)|(?:c)"));
    }

    #[test]
    fn invalid_regex_names_token() {
        let mut compiler = PatternCompiler::new();
        let err = compiler.add_regex("(unclosed").unwrap_err();
        assert!(matches!(err, ProjectError::Pattern { ref pattern, .. } if pattern == "(unclosed"));
        assert!(compiler.is_empty());
    }

    #[test]
    fn parser_reads_both_lists() {
        let doc = Document::parse(
            "<exclude><shellpatterns> *.o\n *.pyc </shellpatterns><pyregex>.*\\.bak$</pyregex></exclude>",
        )
        .unwrap();
        let pattern = PatternParser::parse(doc.root_element())
            .unwrap()
            .compile()
            .unwrap()
            .unwrap();
        assert!(pattern.is_match("a.o"));
        assert!(pattern.is_match("b.pyc"));
        assert!(pattern.is_match("c.bak"));
        assert!(!pattern.is_match("d.c"));
    }

    #[test]
    fn parser_rejects_unknown_children() {
        let doc = Document::parse("<exclude><globs>*.o</globs></exclude>").unwrap();
        let err = PatternParser::parse(doc.root_element()).unwrap_err();
        assert!(matches!(err, ProjectError::Structure { ref tag, .. } if tag == "globs"));
    }

    #[test]
    fn parser_fails_on_bad_regex_before_anything_else() {
        let doc = Document::parse("<exclude><pyregex>ok [bad</pyregex></exclude>").unwrap();
        let err = PatternParser::parse(doc.root_element()).unwrap_err();
        assert!(matches!(err, ProjectError::Pattern { ref pattern, .. } if pattern == "[bad"));
    }

    #[test]
    fn missing_exclude_passes_parent_through() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve("<dir path='src'/>", Some(&parent)).unwrap().unwrap();
        assert_eq!(effective.as_str(), parent.as_str());
        assert!(resolve("<dir path='src'/>", None).unwrap().is_none());
    }

    #[test]
    fn inherit_combines_with_parent() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve(
            "<dir><exclude inherit='yes'><shellpatterns>*.bak</shellpatterns></exclude></dir>",
            Some(&parent),
        )
        .unwrap()
        .unwrap();
        assert!(effective.is_match("foo.o"));
        assert!(effective.is_match("foo.bak"));
    }

    #[test]
    fn missing_inherit_overrides_parent() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve(
            "<dir><exclude><shellpatterns>*.bak</shellpatterns></exclude></dir>",
            Some(&parent),
        )
        .unwrap()
        .unwrap();
        assert!(effective.is_match("foo.bak"));
        assert!(!effective.is_match("foo.o"));
    }

    #[test]
    fn empty_exclude_without_inherit_clears_parent() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve("<dir><exclude/></dir>", Some(&parent)).unwrap();
        assert!(effective.is_none());
    }

    #[test]
    fn empty_exclude_with_inherit_keeps_parent() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve("<dir><exclude inherit='yes'/></dir>", Some(&parent))
            .unwrap()
            .unwrap();
        assert!(effective.is_match("foo.o"));
    }

    #[test]
    fn inherit_without_parent_is_own_pattern() {
        let effective = resolve(
            "<dir><exclude inherit='yes'><shellpatterns>*.bak</shellpatterns></exclude></dir>",
            None,
        )
        .unwrap()
        .unwrap();
        assert!(effective.is_match("x.bak"));
    }

    #[test]
    fn inherit_values_other_than_truthy_override() {
        let parent = compiled(&["*.o"], &[]);
        let effective = resolve(
            "<dir><exclude inherit='no'><shellpatterns>*.bak</shellpatterns></exclude></dir>",
            Some(&parent),
        )
        .unwrap()
        .unwrap();
        assert!(!effective.is_match("foo.o"));
    }

    #[test]
    fn two_excludes_in_one_scope_are_rejected() {
        let err = resolve("<dir><exclude/><exclude/></dir>", None).unwrap_err();
        assert!(matches!(err, ProjectError::Structure { ref tag, .. } if tag == "exclude"));
    }
}
