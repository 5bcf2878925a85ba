use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use tracing::{debug, trace};
use tree_sitter::Node as TSNode;

use super::report::LineDependencies;
use super::resolver::{ResolveError, Resolver};
use super::strategies::{strategy_for, NodeKind};
use crate::parsers::ParsedUnit;

/// Counters for one file traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    /// Nodes whose kind has a registered strategy.
    pub nodes_matched: usize,
    pub unresolved: usize,
    pub faulted: usize,
}

thread_local! {
    static EXTRACTING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANICS: Once = Once::new();

/// Wrap the process panic hook so panics raised while a strategy runs are
/// reported only through the driver's log. Other panics reach the previous
/// hook unchanged.
fn silence_extraction_panics() {
    QUIET_PANICS.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !EXTRACTING.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Run `f` with the extraction flag set for this thread.
fn extracting<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    EXTRACTING.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    EXTRACTING.with(|flag| flag.set(false));
    outcome
}

/// Pre-order walk over one compilation unit, feeding strategy results into
/// a per-line map.
pub struct Traversal<'a> {
    resolver: &'a dyn Resolver,
    unit: &'a ParsedUnit,
    lines: LineDependencies,
    stats: TraversalStats,
}

impl<'a> Traversal<'a> {
    pub fn new(resolver: &'a dyn Resolver, unit: &'a ParsedUnit) -> Self {
        silence_extraction_panics();
        Self {
            resolver,
            unit,
            lines: LineDependencies::new(),
            stats: TraversalStats::default(),
        }
    }

    /// Visit every node of the unit exactly once, parents before children,
    /// siblings in source order.
    pub fn run(mut self) -> (LineDependencies, TraversalStats) {
        let mut cursor = self.unit.tree.walk();
        'walk: loop {
            self.visit(cursor.node());

            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        (self.lines, self.stats)
    }

    fn visit(&mut self, node: TSNode<'_>) {
        self.stats.nodes_visited += 1;

        let kind = NodeKind::of(&node);
        let Some(strategy) = strategy_for(kind) else {
            return;
        };
        self.stats.nodes_matched += 1;

        let Some(line) = self.unit.lines.line_of(node.start_byte()) else {
            return;
        };

        let resolver = self.resolver;
        let unit = self.unit;
        let outcome = extracting(|| strategy(resolver, unit, node));

        match outcome {
            Ok(Ok(ids)) => self.lines.record(line, ids),
            Ok(Err(ResolveError::Unresolved { symbol })) => {
                self.stats.unresolved += 1;
                trace!(
                    file = %self.unit.path.display(),
                    line,
                    kind = kind.as_str(),
                    "unresolved `{symbol}`"
                );
            }
            Ok(Err(ResolveError::Faulted { reason })) => {
                self.stats.faulted += 1;
                debug!(
                    file = %self.unit.path.display(),
                    line,
                    kind = kind.as_str(),
                    "extraction fault: {reason}"
                );
            }
            Err(payload) => {
                self.stats.faulted += 1;
                debug!(
                    file = %self.unit.path.display(),
                    line,
                    kind = kind.as_str(),
                    "extraction panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// Collect the per-line dependencies of one parsed unit.
pub fn collect_dependencies(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
) -> (LineDependencies, TraversalStats) {
    Traversal::new(resolver, unit).run()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
