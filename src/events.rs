//! Synchronous publish/subscribe for the evolutionary loop.
//!
//! The [`EventBus`] is an ordinary value owned by the
//! [`Evolver`](crate::gp::Evolver); there is no global registry. Listeners
//! subscribe per [`EventKind`] and are called in registration order.
//!
//! Operator events (crossover, mutation, reproduction) go through
//! [`EventBus::review`] instead of [`EventBus::publish`]: each listener
//! may accept the offspring, replace them, or reject them outright, in
//! which case the breeder retries the slot.
//!
//! ```text
//!   Breeder ──review──▶ L1 ──Replace(c')──▶ L2 ──Accept──▶ Outcome::Accepted(c')
//!                        │
//!                        └──Reject──────────────────────▶ Outcome::Rejected
//! ```

use crate::error::ConfigError;
use crate::individual::Individual;
use crate::population::Population;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Discriminant of an [`Event`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A run is about to start.
    RunStart,
    /// A run has finished.
    RunEnd,
    /// Breeding of a new generation is about to start.
    GenerationStart,
    /// A generation has been bred and evaluated.
    GenerationEnd,
    /// The initial population has been built.
    Initialisation,
    /// A population has been evaluated.
    Evaluation,
    /// Elites have been copied into the next generation.
    Elitism,
    /// Crossover produced offspring.
    Crossover,
    /// Mutation produced offspring.
    Mutation,
    /// A parent was reproduced unchanged.
    Reproduction,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 10] = [
        Self::RunStart,
        Self::RunEnd,
        Self::GenerationStart,
        Self::GenerationEnd,
        Self::Initialisation,
        Self::Evaluation,
        Self::Elitism,
        Self::Crossover,
        Self::Mutation,
        Self::Reproduction,
    ];
}

/// A variation operator whose offspring listeners may veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Crossover of two parents.
    Crossover,
    /// Mutation of one parent.
    Mutation,
    /// Unchanged copy of one parent.
    Reproduction,
}

impl From<Operator> for EventKind {
    fn from(operator: Operator) -> Self {
        match operator {
            Operator::Crossover => Self::Crossover,
            Operator::Mutation => Self::Mutation,
            Operator::Reproduction => Self::Reproduction,
        }
    }
}

/// A lifecycle occurrence, borrowed from the engine for the duration of
/// one callback.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A run is about to start.
    RunStart {
        /// Zero-based run index within the batch.
        run: usize,
    },
    /// A run has finished.
    RunEnd {
        /// Run index.
        run: usize,
        /// Number of generations bred.
        generations: usize,
        /// Best individual of the run, if any was evaluated.
        best: Option<&'a Individual>,
    },
    /// Breeding of `generation` is about to start from `population`.
    GenerationStart {
        /// Run index.
        run: usize,
        /// Generation being bred (the initial population is generation 0).
        generation: usize,
        /// The parent population.
        population: &'a Population,
    },
    /// `generation` has been bred and evaluated.
    GenerationEnd {
        /// Run index.
        run: usize,
        /// Generation number.
        generation: usize,
        /// The evaluated population.
        population: &'a Population,
    },
    /// The initial population has been built (not yet evaluated).
    Initialisation {
        /// Run index.
        run: usize,
        /// The initial population.
        population: &'a Population,
    },
    /// Fitness was assigned to the unevaluated members of a population.
    Evaluation {
        /// Run index.
        run: usize,
        /// Generation number.
        generation: usize,
        /// Number of individuals evaluated.
        evaluated: usize,
        /// Wall-clock time spent evaluating.
        elapsed: Duration,
    },
    /// Elites were carried over unchanged.
    Elitism {
        /// Run index.
        run: usize,
        /// Generation being bred.
        generation: usize,
        /// The carried-over individuals.
        elites: &'a [Individual],
    },
    /// A variation operator produced offspring.
    Operator {
        /// Which operator.
        operator: Operator,
        /// Run index.
        run: usize,
        /// Generation being bred.
        generation: usize,
        /// The selected parents.
        parents: &'a [Individual],
        /// The offspring, possibly already replaced by earlier listeners.
        children: &'a [Individual],
    },
}

impl Event<'_> {
    /// The subscription key of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RunStart { .. } => EventKind::RunStart,
            Self::RunEnd { .. } => EventKind::RunEnd,
            Self::GenerationStart { .. } => EventKind::GenerationStart,
            Self::GenerationEnd { .. } => EventKind::GenerationEnd,
            Self::Initialisation { .. } => EventKind::Initialisation,
            Self::Evaluation { .. } => EventKind::Evaluation,
            Self::Elitism { .. } => EventKind::Elitism,
            Self::Operator { operator, .. } => (*operator).into(),
        }
    }

    /// Run index the event belongs to.
    #[must_use]
    pub fn run(&self) -> usize {
        match self {
            Self::RunStart { run }
            | Self::RunEnd { run, .. }
            | Self::GenerationStart { run, .. }
            | Self::GenerationEnd { run, .. }
            | Self::Initialisation { run, .. }
            | Self::Evaluation { run, .. }
            | Self::Elitism { run, .. }
            | Self::Operator { run, .. } => *run,
        }
    }
}

/// A listener's decision on operator offspring.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep the offspring as they are.
    Accept,
    /// Substitute these offspring. An empty list counts as a rejection.
    Replace(Vec<Individual>),
    /// Discard the offspring; the breeder retries the slot.
    Reject,
}

/// Combined result of [`EventBus::review`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The offspring that survived every listener.
    Accepted(Vec<Individual>),
    /// Some listener rejected the offspring.
    Rejected,
}

/// Receives events from an [`EventBus`].
pub trait Listener {
    /// Observe an event.
    fn notify(&mut self, event: &Event<'_>);

    /// Judge operator offspring.
    ///
    /// The default observes the event through [`Listener::notify`] and
    /// accepts it.
    fn review(&mut self, event: &Event<'_>) -> Verdict {
        self.notify(event);
        Verdict::Accept
    }
}

/// A listener shared between the bus and its owner.
pub type SharedListener = Rc<RefCell<dyn Listener>>;

/// Synchronous event dispatcher.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<SharedListener>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateListener`] if this exact listener is
    /// already subscribed to `kind`.
    pub fn subscribe(&mut self, kind: EventKind, listener: SharedListener) -> Result<(), ConfigError> {
        let entries = self.listeners.entry(kind).or_default();
        if entries.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            return Err(ConfigError::DuplicateListener(kind));
        }
        entries.push(listener);
        Ok(())
    }

    /// Register `listener` for every kind in `kinds`.
    ///
    /// # Errors
    ///
    /// Fails on the first kind the listener is already subscribed to;
    /// earlier kinds stay subscribed.
    pub fn subscribe_all(
        &mut self,
        kinds: &[EventKind],
        listener: &SharedListener,
    ) -> Result<(), ConfigError> {
        for &kind in kinds {
            self.subscribe(kind, Rc::clone(listener))?;
        }
        Ok(())
    }

    /// Remove `listener` from `kind`. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, kind: EventKind, listener: &SharedListener) -> bool {
        let Some(entries) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|l| !Rc::ptr_eq(l, listener));
        entries.len() != before
    }

    /// Drop every subscription.
    ///
    /// The bus keeps its listeners across batches; callers that reuse an
    /// evolver for an unrelated batch clear it first.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of listeners subscribed to `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener of its kind, in registration order.
    pub fn publish(&self, event: &Event<'_>) {
        for listener in self.subscribers(event.kind()) {
            match listener.try_borrow_mut() {
                Ok(mut l) => l.notify(event),
                Err(_) => log::warn!("skipping busy listener for {:?} event", event.kind()),
            }
        }
    }

    /// Let the listeners of `operator` judge its offspring.
    ///
    /// Replacements chain: each listener sees the offspring as left by
    /// the previous one. An empty replacement rejects.
    pub fn review(
        &self,
        operator: Operator,
        run: usize,
        generation: usize,
        parents: &[Individual],
        children: Vec<Individual>,
    ) -> Outcome {
        let kind = EventKind::from(operator);
        let mut children = children;
        for listener in self.subscribers(kind) {
            let Ok(mut l) = listener.try_borrow_mut() else {
                log::warn!("skipping busy listener for {kind:?} review");
                continue;
            };
            let event = Event::Operator {
                operator,
                run,
                generation,
                parents,
                children: &children,
            };
            match l.review(&event) {
                Verdict::Accept => {}
                Verdict::Replace(replacement) if !replacement.is_empty() => children = replacement,
                Verdict::Replace(_) | Verdict::Reject => return Outcome::Rejected,
            }
        }
        Outcome::Accepted(children)
    }

    fn subscribers(&self, kind: EventKind) -> &[SharedListener] {
        self.listeners
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(EventKind, usize)> = self
            .listeners
            .iter()
            .filter(|(_, l)| !l.is_empty())
            .map(|(k, l)| (*k, l.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
