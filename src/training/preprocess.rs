use crate::error::{Error, Result};
use crate::sexp::{Sexp, Symbol};
use crate::treebank::{Language, Treebank};
use crate::word::Word;
use std::sync::Arc;

/// Parents whose non-head complements can be arguments.
const ARGUMENT_PARENTS: &[&str] = &["S", "SQ", "SINV", "VP", "SBAR", "PP"];
/// Categories that can be marked as arguments.
const ARGUMENT_CHILDREN: &[&str] = &["NP", "S", "SBAR", "SG", "SQ"];

/// Plain labelled tree, before head annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTree {
    pub label: Symbol,
    pub word: Option<Symbol>,
    pub children: Vec<RawTree>,
}

impl RawTree {
    pub fn from_sexp(sexp: &Sexp) -> Result<RawTree> {
        let items = sexp
            .list()
            .ok_or_else(|| Error::malformed(0, format!("tree node must be a list, found `{sexp}`")))?;
        let (label, rest) = match items {
            [label, rest @ ..] if !rest.is_empty() => (label.expect_symbol("tree label")?, rest),
            _ => return Err(Error::malformed(0, format!("tree node needs a label and children: {sexp}"))),
        };
        if let [Sexp::Symbol(word)] = rest {
            return Ok(RawTree { label, word: Some(*word), children: Vec::new() });
        }
        let children = rest.iter().map(RawTree::from_sexp).collect::<Result<Vec<_>>>()?;
        Ok(RawTree { label, word: None, children })
    }

    pub fn to_sexp(&self) -> Sexp {
        match self.word {
            Some(word) => sexp_list![self.label, word],
            None => {
                let mut items = Vec::with_capacity(self.children.len() + 1);
                items.push(Sexp::Symbol(self.label));
                items.extend(self.children.iter().map(RawTree::to_sexp));
                Sexp::List(items)
            }
        }
    }

    pub fn is_preterminal(&self) -> bool {
        self.word.is_some()
    }

    /// `(word, tag)` pairs in surface order.
    pub fn leaves(&self) -> Vec<(Symbol, Symbol)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<(Symbol, Symbol)>) {
        match self.word {
            Some(word) => out.push((word, self.label)),
            None => self.children.iter().for_each(|c| c.collect_leaves(out)),
        }
    }
}

/// `( (S ...) )` -> `(S ...)`.
fn unwrap_outer(sexp: &Sexp) -> &Sexp {
    match sexp.list() {
        Some([inner]) if inner.is_list() => inner,
        _ => sexp,
    }
}

fn remove_null_elements(mut tree: RawTree, treebank: &dyn Treebank) -> Option<RawTree> {
    if tree.is_preterminal() {
        return (!treebank.is_null_element(tree.label)).then_some(tree);
    }
    tree.children = tree.children.into_iter().filter_map(|c| remove_null_elements(c, treebank)).collect();
    (!tree.children.is_empty()).then_some(tree)
}

fn head_index(tree: &RawTree, language: &Language) -> usize {
    let treebank = &*language.treebank;
    let parent = treebank.strip_augmentation(tree.label);
    let children: Vec<Symbol> = tree.children.iter().map(|c| treebank.strip_augmentation(c.label)).collect();
    language.head_finder.find_head(parent, &children)
}

fn mark_arguments(tree: &mut RawTree, language: &Language) {
    if tree.is_preterminal() {
        return;
    }
    let treebank = &*language.treebank;
    let parent = treebank.strip_augmentation(tree.label);
    let coordinated = tree.children.iter().any(|c| treebank.is_conjunction(c.label));
    if ARGUMENT_PARENTS.contains(&parent.as_str()) && !coordinated {
        let head = head_index(tree, language);
        for (i, child) in tree.children.iter_mut().enumerate() {
            if i == head || child.is_preterminal() {
                continue;
            }
            let base = treebank.strip_augmentation(child.label);
            if ARGUMENT_CHILDREN.contains(&base.as_str()) && !treebank.has_adjunct_function_tag(child.label) {
                child.label = treebank.add_argument_mark(child.label);
            }
        }
    }
    for child in &mut tree.children {
        mark_arguments(child, language);
    }
}

fn canonicalize_labels(tree: &mut RawTree, treebank: &dyn Treebank) {
    tree.label = treebank.canonical_label(tree.label);
    for child in &mut tree.children {
        canonicalize_labels(child, treebank);
    }
}

/// Relabel every NP without an NP child as `NPB`, inserting an `NP` above it
/// unless its parent already is one.
fn add_base_nps(mut tree: RawTree, treebank: &dyn Treebank, parent_is_np: bool) -> RawTree {
    if tree.is_preterminal() {
        return tree;
    }
    let is_np = treebank.is_np(tree.label);
    let has_np_child = tree.children.iter().any(|c| treebank.is_np(c.label));
    tree.children = tree.children.into_iter().map(|c| add_base_nps(c, treebank, is_np)).collect();
    if !is_np || has_np_child {
        return tree;
    }
    let base = RawTree { label: treebank.base_np_label(), word: None, children: tree.children };
    if parent_is_np {
        base
    } else {
        RawTree { label: tree.label, word: None, children: vec![base] }
    }
}

/// Turn one treebank tree into training shape. `None` when nothing is left
/// after removing empty elements.
pub fn preprocess(sexp: &Sexp, language: &Language) -> Result<Option<RawTree>> {
    let treebank = &*language.treebank;
    let tree = RawTree::from_sexp(unwrap_outer(sexp))?;
    let Some(mut tree) = remove_null_elements(tree, treebank) else {
        return Ok(None);
    };
    mark_arguments(&mut tree, language);
    canonicalize_labels(&mut tree, treebank);
    Ok(Some(add_base_nps(tree, treebank, false)))
}

// --- Head-annotated tree ------------------------------------------------------

/// A preprocessed tree with its head child and lexical head at every node.
#[derive(Debug, Clone)]
pub struct HeadTree {
    pub label: Symbol,
    pub head_word: Arc<Word>,
    /// Index of the head child; 0 for preterminals.
    pub head: usize,
    pub children: Vec<HeadTree>,
    pub contains_verb: bool,
}

/// Options for [`HeadTree::build`].
pub struct HeadTreeOptions<'a> {
    pub language: &'a Language,
    pub base_nps_cannot_contain_verbs: bool,
    /// Maps `(word, tag, sentence_position)` to the word the models see.
    pub lexicalize: &'a dyn Fn(Symbol, Symbol, usize) -> Word,
}

impl HeadTree {
    pub fn build(tree: &RawTree, options: &HeadTreeOptions<'_>) -> HeadTree {
        let mut position = 0;
        HeadTree::build_at(tree, options, &mut position)
    }

    fn build_at(tree: &RawTree, options: &HeadTreeOptions<'_>, position: &mut usize) -> HeadTree {
        let treebank = &*options.language.treebank;
        if let Some(word) = tree.word {
            let head_word = Arc::new((options.lexicalize)(word, tree.label, *position));
            *position += 1;
            return HeadTree {
                label: tree.label,
                head_word,
                head: 0,
                children: Vec::new(),
                contains_verb: treebank.is_verb_tag(tree.label),
            };
        }
        let children: Vec<HeadTree> = tree.children.iter().map(|c| HeadTree::build_at(c, options, position)).collect();
        let head = head_index(tree, options.language);
        let contains_verb = if options.base_nps_cannot_contain_verbs && treebank.is_base_np(tree.label) {
            false
        } else {
            children.iter().any(|c| c.contains_verb)
        };
        HeadTree { label: tree.label, head_word: Arc::clone(&children[head].head_word), head, children, contains_verb }
    }

    pub fn is_preterminal(&self) -> bool {
        self.children.is_empty()
    }

    pub fn head_child(&self) -> &HeadTree {
        &self.children[self.head]
    }

    /// Modifiers on the left, closest to the head first.
    pub fn left_modifiers(&self) -> impl Iterator<Item = &HeadTree> {
        self.children[..self.head.min(self.children.len())].iter().rev()
    }

    /// Modifiers on the right, closest to the head first.
    pub fn right_modifiers(&self) -> impl Iterator<Item = &HeadTree> {
        self.children.iter().skip(self.head + 1)
    }
}
