//! GLR parse table interpreter
//!
//! A parse runs a bounded set of stack versions breadth-first: every round,
//! each active version performs reductions until it shifts one token (or a
//! reused subtree), then versions in the same state at the same position are
//! merged.
//!
//! ```text
//!            ┌──────────── round ─────────────┐
//! versions ─▶│ advance: lookahead → actions   │
//!            │   reduce* → shift | accept     │──▶ condense ──▶ next round
//!            │   no action → pause            │      │ merge, prune, cap
//!            └────────────────────────────────┘      └─ all paused → recover
//! ```
//!
//! Lookaheads come from the reuse cursor over the previous tree when a single
//! version is alive, otherwise from the lexer.

mod config;
mod recovery;
mod reuse;
mod stack;

pub use config::{CancellationFlag, DEFAULT_MAX_VERSIONS, ParseError, ParseStats, ParserConfig};

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::base::Length;
use crate::language::{
    Associativity, GrammarTables, Language, LexMode, ParseAction, StateId, Symbol,
};
use crate::lexer::{ExternalLex, ExternalScanner, Lexer};
use crate::tree::subtree::{
    self, Subtree, SubtreeData, external_state_eq, next_generation, with_extra,
};
use crate::tree::{Balancer, SyntaxTree};

use config::{Budget, Interrupt, Unbounded};
use reuse::ReusableNode;
use stack::{Lookahead, StackNode, Status, Version, merge_alternatives};

/// Forks allowed beyond `max_versions` within one round
const MAX_VERSION_OVERFLOW: usize = 4;

/// Versions costing this much more than the best one are dropped
const MAX_COST_DIFFERENCE: u32 = 16 * subtree::ERROR_COST_PER_SKIPPED_TREE;

/// A configured parser for one language
#[derive(Debug, Clone)]
pub struct Parser {
    language: Language,
    config: ParserConfig,
}

impl Parser {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `text`, reusing `old_tree` when it is an edited tree of the
    /// previous version of the text.
    ///
    /// Fails only when the configured budget, timeout or cancellation flag
    /// interrupts the parse.
    pub fn parse(
        &self,
        text: &str,
        old_tree: Option<&SyntaxTree>,
    ) -> Result<SyntaxTree, ParseError> {
        let budget = Budget::new(&self.config);
        ParseRun::new(&self.language, &self.config, text, old_tree, budget).run()
    }
}

/// Parse `text` with the default configuration.
///
/// Never fails: malformed input yields ERROR and MISSING nodes.
pub fn parse(language: &Language, text: &str, old_tree: Option<&SyntaxTree>) -> SyntaxTree {
    let config = ParserConfig::default();
    match ParseRun::new(language, &config, text, old_tree, Unbounded).run() {
        Ok(tree) => tree,
        Err(never) => match never {},
    }
}

/// Parse independent documents in parallel
pub fn parse_batch(language: &Language, texts: &[&str]) -> Vec<SyntaxTree> {
    texts.par_iter().map(|text| parse(language, text, None)).collect()
}

// ============================================================================
// Conflict resolution
// ============================================================================

fn reduce_precedence(action: &ParseAction) -> Option<(i16, Associativity)> {
    match action {
        ParseAction::Reduce {
            precedence,
            associativity,
            ..
        } => Some((*precedence, *associativity)),
        _ => None,
    }
}

/// Resolve conflicts that precedence and associativity decide statically.
///
/// What remains after resolution is forked.
fn resolve_actions(actions: &[ParseAction], lookahead: Symbol) -> Vec<ParseAction> {
    let mut shift = None;
    let mut shift_extra = false;
    let mut accept = false;
    let mut reduces = Vec::new();
    for action in actions {
        match action {
            ParseAction::Shift { precedence, .. } => {
                shift = shift.or(Some((*action, *precedence)));
            }
            ParseAction::ShiftExtra => shift_extra = true,
            ParseAction::Reduce { .. } => reduces.push(*action),
            ParseAction::Accept => accept = true,
        }
    }
    // The end of input is never consumed
    if lookahead == Symbol::END {
        shift = None;
        shift_extra = false;
    }

    let highest = reduces
        .iter()
        .filter_map(reduce_precedence)
        .map(|(precedence, _)| precedence)
        .max();
    if let Some(highest) = highest {
        reduces.retain(|action| {
            reduce_precedence(action).is_some_and(|(precedence, _)| precedence == highest)
        });
    }
    if let (Some((_, shift_precedence)), Some((reduce_precedence, associativity))) =
        (shift, reduces.first().and_then(reduce_precedence))
    {
        match shift_precedence.cmp(&reduce_precedence) {
            Ordering::Greater => reduces.clear(),
            Ordering::Less => shift = None,
            Ordering::Equal => match associativity {
                Associativity::Left => shift = None,
                Associativity::Right => reduces.clear(),
                Associativity::None => {}
            },
        }
    }

    let mut resolved: Vec<ParseAction> = shift.map(|(action, _)| action).into_iter().collect();
    resolved.extend(reduces);
    if accept {
        resolved.push(ParseAction::Accept);
    }
    if resolved.is_empty() && shift_extra {
        resolved.push(ParseAction::ShiftExtra);
    }
    resolved
}

// ============================================================================
// Parse driver
// ============================================================================

#[derive(PartialEq, Eq, Hash)]
struct TokenKey {
    position: u32,
    state: StateId,
    external: Option<Arc<[u8]>>,
    allow_empty: bool,
}

struct ParseRun<'a, I> {
    language: &'a Language,
    tables: &'a GrammarTables,
    config: &'a ParserConfig,
    text: &'a str,
    lexer: Lexer<'a>,
    scanner: Option<Box<dyn ExternalScanner>>,
    interrupt: I,
    generation: u64,
    versions: Vec<Version>,
    /// Best accepted tree so far
    finished: Option<Subtree>,
    reuse: ReusableNode,
    token_cache: FxHashMap<TokenKey, Subtree>,
    stats: ParseStats,
}

impl<'a, I: Interrupt> ParseRun<'a, I> {
    fn new(
        language: &'a Language,
        config: &'a ParserConfig,
        text: &'a str,
        old_tree: Option<&SyntaxTree>,
        interrupt: I,
    ) -> Self {
        let tables = language.tables();
        let old_root = old_tree.and_then(|tree| {
            if tree.language().ptr_eq(language) {
                Some(tree.root_subtree())
            } else {
                tracing::warn!("old tree was parsed with another language, ignoring it");
                None
            }
        });

        let scanner = language.create_scanner();
        if scanner.is_none() && tables.external_token_count() > 0 {
            tracing::warn!(
                tokens = tables.external_token_count(),
                "grammar has external tokens but no external scanner is attached"
            );
        }

        Self {
            language,
            tables,
            config,
            text,
            lexer: Lexer::new(tables, text),
            scanner,
            interrupt,
            generation: next_generation(),
            versions: vec![Version::new(tables.start_state())],
            finished: None,
            reuse: ReusableNode::new(old_root),
            token_cache: FxHashMap::default(),
            stats: ParseStats::default(),
        }
    }

    fn run(mut self) -> Result<SyntaxTree, I::Error> {
        tracing::debug!(
            bytes = self.text.len(),
            incremental = !self.reuse.is_done(),
            "parse started"
        );

        while !self.versions.is_empty() {
            let mut index = 0;
            while index < self.versions.len() {
                if self.versions[index].status == Status::Active {
                    self.advance(index)?;
                }
                index += 1;
            }
            self.condense()?;
        }

        let root = match self.finished.take() {
            Some(root) => root,
            None => self.unparsed_root(),
        };
        let root = if self.config.balance_repetitions {
            let mut balancer = Balancer::new(self.tables, self.generation);
            let balanced = balancer.balance(&root);
            self.stats.nodes_allocated += balancer.allocated;
            balanced
        } else {
            root
        };

        tracing::debug!(
            stats = ?self.stats,
            nodes = root.node_count,
            has_error = root.has_error(),
            "parse finished"
        );
        Ok(SyntaxTree::new(
            root,
            Some(Arc::from(self.text)),
            self.language.clone(),
            self.stats,
        ))
    }

    /// Run one version until it shifts, accepts or pauses
    fn advance(&mut self, index: usize) -> Result<(), I::Error> {
        let allow_reuse = self.versions.len() == 1;
        loop {
            self.interrupt.poll()?;
            let state = self.versions[index].state();
            let lookahead = self.lookahead(index, allow_reuse);
            let symbol = lookahead.subtree.first_leaf.symbol;
            let is_leaf = lookahead.subtree.is_leaf();
            let actions = resolve_actions(self.tables.actions(state, symbol), symbol);

            if actions.is_empty() {
                if !is_leaf {
                    self.breakdown(index);
                    continue;
                }
                tracing::trace!(
                    state,
                    symbol = self.tables.symbol_name(symbol),
                    position = self.versions[index].position().byte_len(),
                    "no action, pausing version"
                );
                self.versions[index].status = Status::Paused;
                return Ok(());
            }

            let mut shift = None;
            let mut shift_extra = false;
            let mut accept = false;
            let mut reduces = Vec::new();
            for action in actions {
                match action {
                    ParseAction::Shift { state, .. } => shift = Some(state),
                    ParseAction::ShiftExtra => shift_extra = true,
                    ParseAction::Reduce { .. } => reduces.push(action),
                    ParseAction::Accept => accept = true,
                }
            }

            // A whole subtree is shifted through the goto table
            if !is_leaf && (shift_extra || shift.is_some()) {
                match self.tables.goto(state, lookahead.subtree.symbol) {
                    Some(next) if !shift_extra => shift = Some(next),
                    _ => {
                        self.breakdown(index);
                        continue;
                    }
                }
            }

            if shift.is_some() || shift_extra || accept {
                let version = self.versions[index].clone();
                for action in &reduces {
                    if let Some(fork) = self.reduce(&version, action) {
                        self.push_fork(fork);
                    }
                }
                if accept {
                    self.accept(index);
                } else {
                    self.shift(index, shift, lookahead);
                }
                return Ok(());
            }

            let version = self.versions[index].clone();
            let mut reduced = None;
            for action in &reduces {
                if let Some(next) = self.reduce(&version, action) {
                    if let Some(previous) = reduced.replace(next) {
                        self.push_fork(previous);
                    }
                }
            }
            match reduced {
                Some(next) => self.versions[index] = next,
                None if !is_leaf => self.breakdown(index),
                None => {
                    self.versions[index].status = Status::Paused;
                    return Ok(());
                }
            }
        }
    }

    /// The version's pending lookahead, fetching a new one when it is missing
    /// or was lexed for a state whose lexer configuration differs
    fn lookahead(&mut self, index: usize, allow_reuse: bool) -> Lookahead {
        let state = self.versions[index].state();
        if let Some(lookahead) = &self.versions[index].lookahead {
            let first_leaf = lookahead.subtree.first_leaf;
            let stale = first_leaf.mode != self.tables.lex_mode(state)
                && (lookahead.reused || self.tables.actions(state, first_leaf.symbol).is_empty());
            if !stale {
                return lookahead.clone();
            }
        }
        let lookahead = self.next_lookahead(index, allow_reuse);
        self.versions[index].lookahead = Some(lookahead.clone());
        lookahead
    }

    fn next_lookahead(&mut self, index: usize, allow_reuse: bool) -> Lookahead {
        if allow_reuse {
            let version = &self.versions[index];
            let position = version.position().byte_len();
            let reused = self.reuse.reusable(
                self.tables,
                self.text,
                version.state(),
                position,
                version.last_external.as_ref(),
            );
            if let Some(subtree) = reused {
                tracing::trace!(
                    position,
                    symbol = self.tables.symbol_name(subtree.symbol),
                    bytes = subtree.size.byte_len(),
                    "reusing subtree"
                );
                return Lookahead { subtree, reused: true };
            }
        }
        Lookahead {
            subtree: self.lex(index),
            reused: false,
        }
    }

    fn lex(&mut self, index: usize) -> Subtree {
        let version = &self.versions[index];
        let state = version.state();
        let position = version.position();
        let allow_empty = version.empty_external_at != Some(position.byte_len());
        let key = TokenKey {
            position: position.byte_len(),
            state,
            external: version.last_external.clone().filter(|state| !state.is_empty()),
            allow_empty,
        };
        if let Some(token) = self.token_cache.get(&key) {
            return Arc::clone(token);
        }

        let tables = self.tables;
        let mode = tables.lex_mode(state);
        let previous_state = key.external.as_deref().unwrap_or(&[]);
        let external = self.scanner.as_deref_mut().map(|scanner| ExternalLex {
            scanner,
            previous_state,
            allow_empty,
        });
        let token = self
            .lexer
            .lex(position, mode, |symbol| !tables.actions(state, symbol).is_empty(), external);

        if token.is_error {
            tracing::trace!(position = position.byte_len(), "unrecognized character");
        }
        self.stats.tokens_lexed += 1;
        self.stats.bytes_lexed += u64::from(token.size.byte_len());
        self.stats.nodes_allocated += 1;
        let leaf = Arc::new(SubtreeData::leaf(
            tables,
            token.symbol,
            token.size,
            token.lookahead_bytes,
            token.mode,
            token.external_state,
            self.generation,
        ));
        self.token_cache.insert(key, Arc::clone(&leaf));
        leaf
    }

    /// Offer the children of a reused lookahead instead of the whole subtree
    fn breakdown(&mut self, index: usize) {
        if let Some(lookahead) = self.versions[index].lookahead.take() {
            tracing::trace!(
                symbol = self.tables.symbol_name(lookahead.subtree.symbol),
                "breaking down subtree"
            );
            self.reuse.breakdown(&lookahead.subtree);
        }
    }

    /// Push the lookahead; `None` shifts it as an extra without changing state
    fn shift(&mut self, index: usize, next_state: Option<StateId>, lookahead: Lookahead) {
        let version = &mut self.versions[index];
        let extra = next_state.is_none();
        let state = next_state.unwrap_or(version.top.state);
        let position = version.top.position.byte_len();

        let mut subtree = lookahead.subtree;
        if subtree.is_extra() != extra {
            subtree = with_extra(&subtree, extra);
            self.stats.nodes_allocated += 1;
        }
        if lookahead.reused {
            self.stats.subtrees_reused += 1;
        }
        if subtree.flags.has_external_tokens {
            version.last_external = subtree.last_external_state().cloned();
            if subtree.size.is_empty() {
                version.empty_external_at = Some(position);
            }
        }

        tracing::trace!(state, position, extra, bytes = subtree.size.byte_len(), "shift");
        version.top = StackNode::push(Arc::clone(&version.top), state, subtree);
        version.lookahead = None;
    }

    /// Pop the children of a reduction and push the new node; `None` when
    /// the stack is too shallow or the goto is missing
    fn reduce(&mut self, version: &Version, action: &ParseAction) -> Option<Version> {
        let ParseAction::Reduce {
            symbol,
            child_count,
            production_id,
            precedence,
            ..
        } = *action
        else {
            return None;
        };

        let mut frame = &version.top;
        let mut children = Vec::new();
        let mut structural = 0;
        while structural < child_count {
            let subtree = frame.subtree.as_ref()?;
            if !subtree.is_extra() {
                structural += 1;
            }
            children.push(Arc::clone(subtree));
            frame = frame.prev.as_ref()?;
        }
        children.reverse();
        let end = children.iter().rposition(|child| !child.is_extra()).map_or(0, |idx| idx + 1);
        let trailing = children.split_off(end);

        let base = Arc::clone(frame);
        let next_state = self.tables.goto(base.state, symbol)?;
        let mut node = SubtreeData::node(
            self.tables,
            symbol,
            children,
            production_id,
            precedence,
            self.generation,
        );
        node.flags.fragile |= self.versions.len() > 1;
        self.stats.nodes_allocated += 1;
        tracing::trace!(
            symbol = self.tables.symbol_name(symbol),
            children = child_count,
            state = next_state,
            "reduce"
        );

        let mut top = StackNode::push(base, next_state, Arc::new(node));
        for extra in trailing {
            top = StackNode::push(top, next_state, extra);
        }
        Some(Version {
            top,
            ..version.clone()
        })
    }

    fn push_fork(&mut self, version: Version) {
        if self.versions.len() >= self.config.max_versions + MAX_VERSION_OVERFLOW {
            tracing::trace!(versions = self.versions.len(), "dropping fork");
            return;
        }
        self.stats.versions_forked += 1;
        self.versions.push(version);
    }

    /// Finish a version: the start symbol's node becomes the root, absorbing
    /// the extras around it
    fn accept(&mut self, index: usize) {
        let subtrees = StackNode::subtrees(&self.versions[index].top);
        let mut structural = subtrees.iter().enumerate().filter(|(_, tree)| !tree.is_extra());
        let root = match (structural.next(), structural.next()) {
            (Some((idx, root)), None) if !root.is_leaf() => {
                let mut children = subtrees[..idx].to_vec();
                children.extend(root.children.iter().cloned());
                children.extend(subtrees[idx + 1..].iter().cloned());
                root.with_children(children, self.generation)
            }
            _ => SubtreeData::error(self.tables, subtrees.clone(), self.generation),
        };
        self.stats.nodes_allocated += 1;
        tracing::trace!(cost = root.error_cost, "version accepted");
        self.finish(Arc::new(root));
        self.versions[index].status = Status::Halted;
    }

    /// Keep the better of the finished trees: lower error cost, then higher
    /// dynamic precedence, then the earlier one
    fn finish(&mut self, root: Subtree) {
        let better = self.finished.as_ref().is_none_or(|current| {
            (root.error_cost, Reverse(root.dynamic_precedence))
                < (current.error_cost, Reverse(current.dynamic_precedence))
        });
        if better {
            self.finished = Some(root);
        }
    }

    /// Root for input no version could finish
    fn unparsed_root(&mut self) -> Subtree {
        tracing::warn!("no version finished, wrapping the input in an error");
        let leaf = SubtreeData::leaf(
            self.tables,
            Symbol::ERROR,
            Length::of(self.text),
            1,
            LexMode::default(),
            None,
            self.generation,
        );
        self.stats.nodes_allocated += 2;
        Arc::new(SubtreeData::error(self.tables, vec![Arc::new(leaf)], self.generation))
    }

    // ------------------------------------------------------------------------
    // Condensing
    // ------------------------------------------------------------------------

    fn can_merge(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.versions[a], &self.versions[b]);
        a.status == Status::Active
            && b.status == Status::Active
            && a.state() == b.state()
            && a.position().bytes == b.position().bytes
            && external_state_eq(a.last_external.as_ref(), b.last_external.as_ref())
    }

    /// Merge version `other` into `keep` (`keep < other`)
    fn merge(&mut self, keep: usize, other: usize) {
        let other = self.versions.remove(other);
        let current = &self.versions[keep];
        let (mut winner, loser) = if other.is_better_than(current) {
            (other, current.clone())
        } else {
            (current.clone(), other)
        };
        if let Some(top) = merge_alternatives(&winner.top, &loser.top) {
            winner.top = top;
        }
        tracing::trace!(
            state = winner.state(),
            position = winner.position().byte_len(),
            "merged versions"
        );
        self.versions[keep] = winner;
    }

    fn condense(&mut self) -> Result<(), I::Error> {
        let finished_cost = self.finished.as_ref().map(|root| root.error_cost);
        self.versions.retain(|version| {
            version.status != Status::Halted
                && finished_cost.is_none_or(|cost| version.error_cost() < cost)
        });

        let mut index = 0;
        while index < self.versions.len() {
            match (0..index).find(|&earlier| self.can_merge(earlier, index)) {
                Some(earlier) => self.merge(earlier, index),
                None => index += 1,
            }
        }

        let best_active = self
            .versions
            .iter()
            .filter(|version| version.status == Status::Active)
            .map(Version::error_cost)
            .min();
        if let Some(best) = best_active {
            self.versions
                .retain(|version| version.error_cost() <= best.saturating_add(MAX_COST_DIFFERENCE));
        }

        if self.versions.len() > self.config.max_versions {
            tracing::warn!(
                versions = self.versions.len(),
                max = self.config.max_versions,
                "too many stack versions, dropping the worst"
            );
            while self.versions.len() > self.config.max_versions {
                let worst = self
                    .versions
                    .iter()
                    .enumerate()
                    .max_by_key(|(idx, version)| {
                        (version.error_cost(), Reverse(version.dynamic_precedence()), *idx)
                    })
                    .map(|(idx, _)| idx);
                if let Some(worst) = worst {
                    self.versions.remove(worst);
                }
            }
        }

        if self.versions.iter().any(|version| version.status == Status::Active) {
            self.versions.retain(|version| version.status == Status::Active);
        } else {
            let best = self
                .versions
                .iter()
                .enumerate()
                .min_by_key(|(idx, version)| {
                    (version.error_cost(), Reverse(version.dynamic_precedence()), *idx)
                })
                .map(|(idx, _)| idx);
            if let Some(best) = best {
                let version = self.versions.swap_remove(best);
                self.versions.clear();
                self.versions.push(version);
                self.recover(0)?;
            }
        }
        Ok(())
    }
}
