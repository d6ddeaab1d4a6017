//! [`CombinationEvaluator`] – multi-lever puzzle lock.
//!
//! A combination is a list of [`Requirement`]s, each reading one lever. The
//! evaluator listens to every lever it references and fires
//! [`on_satisfied`](CombinationEvaluator::on_satisfied) when the last
//! requirement becomes true and
//! [`on_unsatisfied`](CombinationEvaluator::on_unsatisfied) when any of them
//! stops holding. Edges only: repeated satisfaction does not re-fire.
//!
//! # Check modes
//!
//! | Mode | Satisfied when |
//! |---|---|
//! | [`CheckMode::ExactValue`] | `|value - required_value| <= tolerance` |
//! | [`CheckMode::NotchIndex`] | notches are on and the lever sits at `required_notch` |
//! | [`CheckMode::AboveValue`] | `value >= required_value` |
//! | [`CheckMode::BelowValue`] | `value <= required_value` |
//!
//! A requirement whose lever is missing or gone is skipped, not failed. A
//! combination with no valid requirement is therefore satisfied.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use gripworks_mechanics::{CombinationEvaluator, ConstrainedLever};
//! use gripworks_types::{
//!     ActorId, CheckMode, CombinationConfig, HapticIntent, LeverConfig, RequirementConfig, Tuning,
//! };
//!
//! let mut lever = ConstrainedLever::new(&LeverConfig::new("gate", 0.0, 90.0), &Tuning::default());
//! let config = CombinationConfig {
//!     id: "vault".into(),
//!     requirements: vec![RequirementConfig::new("gate", CheckMode::AboveValue).value(0.9)],
//! };
//!
//! let mut vault = CombinationEvaluator::new(&config);
//! let opened = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&opened);
//! let _guard = vault.on_satisfied(move |_| {
//!     sink.set(sink.get() + 1);
//!     Ok(())
//! });
//! vault.attach([&lever]);
//!
//! let mut pulses: Vec<(ActorId, HapticIntent)> = Vec::new();
//! lever.apply_raw_angle(90.0, &mut pulses, 0.016);
//! assert_eq!(opened.get(), 1);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gripworks_middleware::{Signal, Subscription};
use gripworks_types::{CheckMode, CombinationConfig, GripError, LeverId, RequirementConfig};
use tracing::{debug, info, warn};

use crate::lever::{ConstrainedLever, LeverChange, LeverProbe, LeverReading};

// ────────────────────────────────────────────────────────────────────────────
// Requirement
// ────────────────────────────────────────────────────────────────────────────

/// One lever condition inside a combination.
#[derive(Debug, Clone)]
pub struct Requirement {
    lever: Option<LeverId>,
    probe: Option<LeverProbe>,
    check_mode: CheckMode,
    required_value: f32,
    required_notch: usize,
    tolerance: f32,
    label: String,
    currently_satisfied: bool,
}

impl Requirement {
    pub fn from_config(config: &RequirementConfig) -> Self {
        let config = config.clone().validated();
        let label = if config.label.is_empty() {
            match &config.lever {
                Some(lever) => format!("{lever} {:?}", config.check_mode),
                None => format!("<unbound> {:?}", config.check_mode),
            }
        } else {
            config.label
        };
        Self {
            lever: config.lever,
            probe: None,
            check_mode: config.check_mode,
            required_value: config.required_value,
            required_notch: config.required_notch as usize,
            tolerance: config.tolerance,
            label,
            currently_satisfied: false,
        }
    }

    pub fn lever(&self) -> Option<&LeverId> {
        self.lever.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn check_mode(&self) -> CheckMode {
        self.check_mode
    }

    /// Satisfaction as of the last notification from its lever.
    pub fn currently_satisfied(&self) -> bool {
        self.currently_satisfied
    }

    /// Bound to a lever that is still alive.
    pub fn is_valid(&self) -> bool {
        self.probe.as_ref().is_some_and(LeverProbe::is_alive)
    }

    /// Whether `reading` satisfies this requirement.
    pub fn evaluate(&self, reading: &LeverReading) -> bool {
        match self.check_mode {
            CheckMode::ExactValue => (reading.value - self.required_value).abs() <= self.tolerance,
            CheckMode::NotchIndex => {
                reading.notches_enabled && reading.notch == Some(self.required_notch)
            }
            CheckMode::AboveValue => reading.value >= self.required_value,
            CheckMode::BelowValue => reading.value <= self.required_value,
        }
    }

    /// Evaluate against the lever's live reading; `None` when unbound or the
    /// lever is gone.
    fn evaluate_live(&self) -> Option<bool> {
        let reading = self.probe.as_ref()?.read()?;
        Some(self.evaluate(&reading))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Combination state
// ────────────────────────────────────────────────────────────────────────────

/// Transition of a combination's overall satisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Satisfied,
    Unsatisfied,
}

#[derive(Debug)]
struct CombinationState {
    id: String,
    requirements: Vec<Requirement>,
    all_satisfied: bool,
}

impl CombinationState {
    fn on_lever_changed(&mut self, change: &LeverChange) -> Option<Edge> {
        let reading = change.reading();
        let mut touched = false;
        for requirement in &mut self.requirements {
            if requirement.lever.as_ref() != Some(&change.lever) || !requirement.is_valid() {
                continue;
            }
            touched = true;
            let now = requirement.evaluate(&reading);
            if now != requirement.currently_satisfied {
                debug!(
                    combination = %self.id,
                    requirement = %requirement.label,
                    satisfied = now,
                    value = change.new_value,
                    "requirement changed"
                );
                requirement.currently_satisfied = now;
            }
        }
        if touched { self.reevaluate() } else { None }
    }

    /// Drop the binding of every requirement on `lever` and recompute.
    fn retire(&mut self, lever: &LeverId) -> Option<Edge> {
        let mut touched = false;
        for requirement in &mut self.requirements {
            if requirement.lever.as_ref() == Some(lever) && requirement.probe.is_some() {
                requirement.probe = None;
                requirement.currently_satisfied = false;
                touched = true;
            }
        }
        if !touched {
            return None;
        }
        debug!(combination = %self.id, %lever, "bound lever dropped; its requirements are skipped");
        self.reevaluate()
    }

    /// Recompute the overall flag from the stored per-requirement flags and
    /// report the edge, if any.
    fn reevaluate(&mut self) -> Option<Edge> {
        let all = self
            .requirements
            .iter()
            .filter(|r| r.is_valid())
            .all(|r| r.currently_satisfied);
        if all == self.all_satisfied {
            return None;
        }
        self.all_satisfied = all;
        Some(if all { Edge::Satisfied } else { Edge::Unsatisfied })
    }

    fn check_all_conditions(&self) -> bool {
        self.requirements
            .iter()
            .filter_map(Requirement::evaluate_live)
            .all(|satisfied| satisfied)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CombinationEvaluator
// ────────────────────────────────────────────────────────────────────────────

pub struct CombinationEvaluator {
    id: String,
    state: Rc<RefCell<CombinationState>>,
    satisfied: Signal<()>,
    unsatisfied: Signal<()>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for CombinationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinationEvaluator")
            .field("id", &self.id)
            .field("all_satisfied", &self.all_satisfied())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl CombinationEvaluator {
    /// Build an evaluator that is not yet listening to anything; see
    /// [`attach`](Self::attach).
    pub fn new(config: &CombinationConfig) -> Self {
        let requirements = config.requirements.iter().map(Requirement::from_config).collect();
        Self {
            satisfied: Signal::new(&format!("{}.satisfied", config.id)),
            unsatisfied: Signal::new(&format!("{}.unsatisfied", config.id)),
            state: Rc::new(RefCell::new(CombinationState {
                id: config.id.clone(),
                requirements,
                all_satisfied: false,
            })),
            id: config.id.clone(),
            subscriptions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn on_satisfied<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&()) -> Result<(), GripError> + 'static,
    {
        self.satisfied.subscribe(listener)
    }

    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn on_unsatisfied<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&()) -> Result<(), GripError> + 'static,
    {
        self.unsatisfied.subscribe(listener)
    }

    /// Bind every requirement to its lever among `levers`, subscribe to
    /// their changes and run the initial evaluation.
    ///
    /// A combination that already holds at attach time fires
    /// [`on_satisfied`](Self::on_satisfied) once, so subscribe before
    /// attaching. Re-attaching replaces the previous bindings.
    pub fn attach<'a, I>(&mut self, levers: I)
    where
        I: IntoIterator<Item = &'a ConstrainedLever>,
    {
        let levers: Vec<&ConstrainedLever> = levers.into_iter().collect();
        self.subscriptions.clear();

        let mut bound: Vec<&ConstrainedLever> = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            state.all_satisfied = false;
            for requirement in &mut state.requirements {
                requirement.probe = None;
                requirement.currently_satisfied = false;
                let Some(wanted) = requirement.lever.clone() else {
                    warn!(combination = %self.id, requirement = %requirement.label, "requirement has no lever; skipped");
                    continue;
                };
                match levers.iter().find(|lever| lever.id() == &wanted) {
                    Some(&lever) => {
                        requirement.probe = Some(lever.probe());
                        requirement.currently_satisfied =
                            requirement.evaluate_live().unwrap_or(false);
                        if !bound.iter().any(|b| b.id() == lever.id()) {
                            bound.push(lever);
                        }
                    }
                    None => {
                        warn!(combination = %self.id, lever = %wanted, "requirement references unknown lever; skipped");
                    }
                }
            }
            if !state.requirements.iter().any(Requirement::is_valid) {
                warn!(combination = %self.id, "no valid requirements; combination is trivially satisfied");
            }
        }

        for lever in bound {
            let state = Rc::downgrade(&self.state);
            let satisfied = self.satisfied.clone();
            let unsatisfied = self.unsatisfied.clone();
            let id = self.id.clone();
            self.subscriptions.push(lever.on_value_changed(move |change| {
                let edge = handle_change(&state, &id, change)?;
                fire(&id, edge, &satisfied, &unsatisfied);
                Ok(())
            }));

            let state = Rc::downgrade(&self.state);
            let satisfied = self.satisfied.clone();
            let unsatisfied = self.unsatisfied.clone();
            let id = self.id.clone();
            self.subscriptions.push(lever.on_retired(move |lever| {
                let Some(state) = state.upgrade() else {
                    return Ok(());
                };
                let edge = state
                    .try_borrow_mut()
                    .map_err(|_| GripError::Reentrant(id.clone()))?
                    .retire(lever);
                fire(&id, edge, &satisfied, &unsatisfied);
                Ok(())
            }));
        }

        let edge = self.state.borrow_mut().reevaluate();
        fire(&self.id, edge, &self.satisfied, &self.unsatisfied);
    }

    /// Feed a lever change directly. Attached evaluators receive these from
    /// their levers automatically.
    ///
    /// # Errors
    ///
    /// [`GripError::Reentrant`] when called from inside this evaluator's own
    /// notification.
    pub fn on_lever_changed(&self, change: &LeverChange) -> Result<Option<Edge>, GripError> {
        let edge = handle_change(&Rc::downgrade(&self.state), &self.id, change)?;
        fire(&self.id, edge, &self.satisfied, &self.unsatisfied);
        Ok(edge)
    }

    /// Whether every valid requirement holds right now, read fresh from the
    /// levers rather than from the stored flags.
    pub fn check_all_conditions(&self) -> bool {
        self.state.borrow().check_all_conditions()
    }

    /// The overall flag as of the last evaluation.
    pub fn all_satisfied(&self) -> bool {
        self.state.borrow().all_satisfied
    }

    /// `(label, currently_satisfied, valid)` for every requirement.
    pub fn requirement_states(&self) -> Vec<(String, bool, bool)> {
        self.state
            .borrow()
            .requirements
            .iter()
            .map(|r| (r.label.clone(), r.currently_satisfied, r.is_valid()))
            .collect()
    }
}

fn handle_change(
    state: &Weak<RefCell<CombinationState>>,
    id: &str,
    change: &LeverChange,
) -> Result<Option<Edge>, GripError> {
    let Some(state) = state.upgrade() else {
        return Ok(None);
    };
    let mut state = state
        .try_borrow_mut()
        .map_err(|_| GripError::Reentrant(id.to_string()))?;
    Ok(state.on_lever_changed(change))
}

fn fire(id: &str, edge: Option<Edge>, satisfied: &Signal<()>, unsatisfied: &Signal<()>) {
    match edge {
        Some(Edge::Satisfied) => {
            info!(combination = id, "combination satisfied");
            satisfied.emit(&());
        }
        Some(Edge::Unsatisfied) => {
            info!(combination = id, "combination no longer satisfied");
            unsatisfied.emit(&());
        }
        None => {}
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
