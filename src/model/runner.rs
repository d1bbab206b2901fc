//! model::runner — the assembled population model and its run modes.
//!
//! Purpose
//! -------
//! Own every configured object, wire them together once at build time,
//! and drive the annual cycle for each run mode: a single basic run,
//! point estimation, MCMC from an MPD, and simulation of observations.
//!
//! Key behaviors
//! -------------
//! - `build` resolves every label (categories, selectivities, processes,
//!   time steps, likelihoods, estimates) and fails on the first unknown
//!   or inconsistent one.
//! - One iteration: apply estimates, rebuild selectivities, ageing
//!   errors and mean weights, reset state, run the initialisation
//!   phases at the start year, then every year and time step in order.
//! - Within a time step: observation snapshot, processes, derived
//!   quantities, observations, partition asserts.
//! - `objective_at` is the single entry point the minimiser and MCMC use.
//! - Additional priors read the values they name after the run and are
//!   scored alongside the other objective contributions.
//!
//! Invariants & assumptions
//! ------------------------
//! - Between calls the estimates sit in transformed (minimiser) space;
//!   every evaluation restores them, runs, scores and transforms again,
//!   also when the run fails.
//! - Processes only ever see the time steps they were assigned to.
//!
//! Downstream usage
//! ----------------
//! - Construct with [`Model::build`] from a [`ModelConfig`], then call one
//!   of `run_basic`, `run_estimation`, `run_mcmc` or `simulate`.
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::{
    biology::{AgeingErrors, Growth, Selectivities},
    estimate_transformations::Transformations,
    estimates::Estimates,
    likelihoods::{Comparisons, Likelihoods},
    mcmc::{ChainLink, ChainStart, McmcConfig, McmcTarget, ScoreBreakdown, run_rwmh},
    model::{
        config::{InitialisationPhaseConfig, ModelConfig},
        derived_quantities::{DerivedQuantities, DerivedQuantity},
        errors::{ModelError, ModelResult},
        objects::{Addressable, AddressableName, AddressableType},
        state::{Phase, RunMode, RunState},
    },
    mpd::Mpd,
    objective::{AdditionalPriors, Asserts, ObjectiveFunction, ScoreInputs},
    observations::{Catchabilities, ObservationBuildContext, ObservationContext, Observations},
    optimization::{
        BoundedObjective, MinimiserConfig, OptError, covariance_from_hessian, minimise, minimiser::cost_hessian,
    },
    partition::{Categories, Partition, PartitionStructure},
    penalties::Penalties,
    processes::{BuildContext, ExecutionContext, Processes},
    rng::ModelRng,
};

/// An initialisation phase with its exclusions already applied.
#[derive(Debug, Clone, PartialEq)]
struct InitialisationPhase {
    label: String,
    years: u32,
    /// Process indices per time step.
    time_step_processes: Vec<Vec<usize>>,
}

#[derive(Debug)]
pub struct Model {
    years: Vec<u32>,
    start_year: u32,
    time_steps: Vec<String>,
    time_step_processes: Vec<Vec<usize>>,
    phases: Vec<InitialisationPhase>,

    categories: Categories,
    partition: Partition,
    growth: Growth,
    selectivities: Selectivities,
    ageing_errors: AgeingErrors,
    processes: Processes,
    derived_quantities: DerivedQuantities,
    penalties: Penalties,

    likelihoods: Likelihoods,
    catchabilities: Catchabilities,
    observations: Observations,

    estimates: Estimates,
    transformations: Transformations,
    additional_priors: AdditionalPriors,
    objective: ObjectiveFunction,
    asserts: Asserts,

    minimiser: MinimiserConfig,
    mcmc: McmcConfig,
    rng: ModelRng,
    state: RunState,
    mode: RunMode,
}

impl Model {
    /// Build and validate a model from its configuration.
    ///
    /// Errors
    /// ------
    /// - `Config` for duplicate labels, empty time steps, or estimates
    ///   whose `same` targets cannot be resolved.
    /// - `UnknownObject` for any label that names nothing.
    /// - Module errors raised while validating processes, observations,
    ///   estimates and transformations.
    pub fn build(config: ModelConfig) -> ModelResult<Self> {
        let years = config.years()?;
        let start_year = config.model.start_year;

        let mut time_steps = Vec::with_capacity(config.time_steps.len());
        for ts in &config.time_steps {
            if time_steps.contains(&ts.label) {
                return Err(ModelError::config(format!("time_step[{}]", ts.label), "has been defined more than once"));
            }
            time_steps.push(ts.label.clone());
        }
        if time_steps.is_empty() {
            return Err(ModelError::config("time_steps", "at least one time step is required"));
        }

        let categories = Categories::new(&config.categories)?;
        let growth = Growth::new(&config.age_lengths, &config.length_weights)?;
        let structure = &config.model;
        let partition = Partition::build(
            structure.structure,
            structure.min_age,
            structure.max_age,
            structure.plus_group,
            &structure.length_bins,
            &categories,
            |label| growth.age_length_index(label),
        )?;
        let mut selectivities = Selectivities::new(&config.selectivities)?;
        selectivities.rebuild_all(&partition.x_values())?;
        let ageing_errors = AgeingErrors::new(
            &config.ageing_errors,
            partition.min_age(),
            partition.max_age(),
            partition.plus_group(),
        )?;
        let penalties = Penalties::new(&config.penalties)?;

        let mut derived_quantities = DerivedQuantities::default();
        for dq in &config.derived_quantities {
            derived_quantities.push(DerivedQuantity::build(
                dq,
                &partition,
                &categories,
                &selectivities,
                &time_steps,
                config.initialisation_phases.len(),
                start_year,
            )?)?;
        }

        let mut processes = Processes::default();
        for process in config.processes.iter().cloned() {
            let label = process.label().to_string();
            processes
                .push(process.into_process())
                .ok_or_else(|| ModelError::config(format!("process[{label}]"), "has been defined more than once"))?;
        }

        let mut assigned: Vec<Vec<usize>> = vec![Vec::new(); processes.len()];
        let mut time_step_processes = Vec::with_capacity(time_steps.len());
        for (ts, block) in config.time_steps.iter().enumerate() {
            let mut list = Vec::with_capacity(block.processes.len());
            for label in &block.processes {
                let i = processes
                    .index_of(label)
                    .ok_or_else(|| ModelError::UnknownObject { kind: "process", label: label.clone() })?;
                list.push(i);
                if assigned[i].last() != Some(&ts) {
                    assigned[i].push(ts);
                }
            }
            time_step_processes.push(list);
        }
        for (i, slots) in assigned.iter().enumerate() {
            if slots.is_empty() {
                warn!(process = %processes.get(i).label(), "process is not assigned to any time step");
            }
        }

        let phases = config
            .initialisation_phases
            .iter()
            .map(|phase| initialisation_phase(phase, &processes, &time_step_processes))
            .collect::<ModelResult<Vec<_>>>()?;
        let phase_labels: Vec<String> = phases.iter().map(|p| p.label.clone()).collect();

        let mut fisheries = HashSet::new();
        for i in 0..processes.len() {
            let ctx = BuildContext {
                partition: &partition,
                categories: &categories,
                selectivities: &selectivities,
                penalties: &penalties,
                derived_quantities: &derived_quantities,
                time_steps: &time_steps,
                assigned_time_steps: &assigned[i],
                initialisation_phases: &phase_labels,
                years: &years,
            };
            let process = processes.get_mut(i);
            process.validate(&ctx)?;
            process.build(&ctx)?;
            for fishery in process.fishery_labels() {
                if !fisheries.insert(fishery.clone()) {
                    return Err(ModelError::config(
                        format!("process[{}].fishery", process.label()),
                        format!("fishery '{fishery}' is used by more than one process"),
                    ));
                }
            }
        }

        let likelihoods = Likelihoods::new(&config.likelihoods)?;
        let catchabilities = Catchabilities::new(&config.catchabilities)?;
        let mut observations = Observations::new(&config.observations)?;
        observations.build(&ObservationBuildContext {
            partition: &partition,
            categories: &categories,
            selectivities: &selectivities,
            ageing_errors: &ageing_errors,
            catchabilities: &catchabilities,
            likelihoods: &likelihoods,
            processes: &processes,
            time_steps: &time_steps,
            years: &years,
        })?;
        let mut asserts = Asserts::new(&config.asserts);
        asserts.build(&time_steps, &partition, &years)?;

        let estimates = Estimates::new(&config.estimates)?;
        let additional_priors = AdditionalPriors::new(&config.additional_priors)?;

        let mut model = Self {
            years,
            start_year,
            time_steps,
            time_step_processes,
            phases,
            categories,
            partition,
            growth,
            selectivities,
            ageing_errors,
            processes,
            derived_quantities,
            penalties,
            likelihoods,
            catchabilities,
            observations,
            estimates,
            transformations: Transformations::default(),
            additional_priors,
            objective: ObjectiveFunction::default(),
            asserts,
            minimiser: config.minimiser,
            mcmc: config.mcmc,
            rng: ModelRng::new(config.seed),
            state: RunState { year: start_year, time_step: 0, phase: Phase::Execute },
            mode: RunMode::Basic,
        };
        model.bind_estimates()?;
        model.check_additional_priors()?;
        model.transformations = Transformations::new(&config.estimate_transformations, &model.estimates)?;
        model.transformations.prepare(&mut model.estimates)?;
        model.transformations.transform(&mut model.estimates);

        info!(
            categories = model.categories.len(),
            processes = model.processes.len(),
            observations = model.observations.len(),
            estimates = model.estimates.len(),
            years = model.years.len(),
            "model built"
        );
        Ok(model)
    }

    // ---- Run modes ----

    /// Run the model once at the configured values and check every assert.
    pub fn run_basic(&mut self) -> ModelResult<f64> {
        self.mode = RunMode::Basic;
        let score = self.evaluate(true)?;
        self.asserts.check_objective(score)?;
        info!(score, "basic run finished");
        Ok(score)
    }

    /// Score the model with the free estimates set to `values`, given in
    /// minimiser space.
    ///
    /// Errors
    /// ------
    /// - `Estimate(ValueCount)` when `values` does not match the number of
    ///   free estimates.
    /// - Any error raised while running the model.
    pub fn objective_at(&mut self, values: &[f64]) -> ModelResult<f64> {
        self.estimates.set_free_values(values)?;
        self.evaluate(false)
    }

    /// Minimise the objective phase by phase and return the MPD.
    ///
    /// Each phase frees the estimates whose `estimation_phase` has been
    /// reached; earlier phases' results seed later ones. With
    /// `minimiser.covariance` set the MPD carries the inverse Hessian of
    /// the objective in minimiser space.
    pub fn run_estimation(&mut self) -> ModelResult<Mpd> {
        self.mode = RunMode::Estimation;
        let options = self.minimiser.options()?;
        let max_phase = self.estimates.max_phase();

        for phase in 1..=max_phase {
            self.estimates.set_phase(phase);
            let (lower, upper) = self.estimates.free_bounds();
            if lower.is_empty() {
                warn!(phase, "no free estimates in this phase");
                continue;
            }
            let start = self.estimates.free_values();
            let best = {
                let cell = RefCell::new(&mut *self);
                let objective = BoundedObjective::new(lower.into_iter().zip(upper).collect(), |values: &[f64]| {
                    cell.borrow_mut()
                        .objective_at(values)
                        .map_err(|e| OptError::ObjectiveFailed { reason: e.to_string() })
                })?;
                let outcome = minimise(&objective, objective.scale_all(&start), &options)?;
                info!(
                    phase,
                    score = outcome.value,
                    iterations = outcome.iterations,
                    converged = outcome.converged,
                    status = %outcome.status,
                    "estimation phase finished"
                );
                objective.unscale_all(&outcome.theta_hat)
            };
            self.objective_at(&best)?;
        }

        let values = self.estimates.free_values();
        let covariance = if self.minimiser.covariance && !values.is_empty() {
            let theta = values.iter().copied().collect();
            let hessian = {
                let cell = RefCell::new(&mut *self);
                cost_hessian(
                    &|t: &ndarray::Array1<f64>| {
                        cell.borrow_mut()
                            .objective_at(&t.to_vec())
                            .map_err(|e| OptError::ObjectiveFailed { reason: e.to_string() })
                    },
                    &theta,
                )?
            };
            self.objective_at(&values)?;
            Some(covariance_from_hessian(&hessian)?)
        } else {
            None
        };

        Ok(Mpd { parameters: self.free_parameter_names(), values, covariance })
    }

    /// Random-walk Metropolis-Hastings chain started from `mpd`.
    ///
    /// Errors
    /// ------
    /// - `Mpd` when the MPD's parameters do not match the free estimates.
    /// - `Mcmc` when the MPD has no covariance matrix, or from the chain.
    pub fn run_mcmc(&mut self, mpd: &Mpd) -> ModelResult<Vec<ChainLink>> {
        self.mode = RunMode::Mcmc;
        self.estimates.set_phase(self.estimates.max_phase());
        let order = self.load_mpd(mpd)?;
        let source = mpd
            .covariance
            .as_ref()
            .ok_or_else(|| ModelError::Mcmc { reason: "the MPD has no covariance matrix".to_string() })?;
        let covariance = Array2::from_shape_fn((order.len(), order.len()), |(r, c)| source[[order[r], order[c]]]);

        let values = self.estimates.free_values();
        let (lower, upper) = self.estimates.free_bounds();
        let fixed: Vec<bool> =
            self.estimates.free_indices().into_iter().map(|i| self.estimates.get(i).mcmc_fixed).collect();
        let config = self.mcmc.clone();
        let mut rng = std::mem::take(&mut self.rng);
        let chain = run_rwmh(
            &mut ModelTarget { model: &mut *self },
            &config,
            ChainStart { values: &values, lower: &lower, upper: &upper, fixed: &fixed, covariance: &covariance },
            &mut rng,
        );
        self.rng = rng;
        let chain = chain?;
        info!(links = chain.len(), "mcmc finished");
        Ok(chain)
    }

    /// Run the model `count` times, each time replacing every observation's
    /// observed values with draws from its likelihood.
    pub fn simulate(&mut self, count: usize) -> ModelResult<Vec<Vec<(String, Comparisons)>>> {
        self.mode = RunMode::Simulation;
        let mut sets = Vec::with_capacity(count);
        for set in 0..count {
            self.evaluate(false)?;
            let mut simulated = Vec::with_capacity(self.observations.len());
            for obs in self.observations.iter_mut() {
                obs.simulate(&self.likelihoods, &mut self.rng)?;
                simulated.push((obs.label().to_string(), obs.comparisons().clone()));
            }
            debug!(set, "simulated observation set");
            sets.push(simulated);
        }
        Ok(sets)
    }

    /// Write MPD values into the free estimates, matching by parameter
    /// name. Returns, per free estimate, its position in the MPD.
    ///
    /// Errors
    /// ------
    /// - `Mpd` for a parameter the model does not estimate, or a count
    ///   that differs from the number of free estimates.
    pub fn load_mpd(&mut self, mpd: &Mpd) -> ModelResult<Vec<usize>> {
        let free = self.estimates.free_indices();
        if mpd.parameters.len() != free.len() || mpd.values.len() != free.len() {
            return Err(ModelError::Mpd {
                line: 3,
                reason: format!("expected {} estimates, found {}", free.len(), mpd.values.len()),
            });
        }
        let position: HashMap<usize, usize> = mpd
            .parameters
            .iter()
            .enumerate()
            .map(|(k, name)| {
                self.estimates
                    .by_parameter(name)
                    .filter(|i| free.contains(i))
                    .map(|i| (i, k))
                    .ok_or_else(|| ModelError::Mpd { line: 2, reason: format!("'{name}' is not a free estimate") })
            })
            .collect::<ModelResult<_>>()?;
        let order: Vec<usize> = free
            .iter()
            .map(|i| {
                position.get(i).copied().ok_or_else(|| ModelError::Mpd {
                    line: 2,
                    reason: format!("{} is missing", self.estimates.get(*i).parameter.full_name()),
                })
            })
            .collect::<ModelResult<_>>()?;
        let values: Vec<f64> = order.iter().map(|k| mpd.values[*k]).collect();
        self.estimates.set_free_values(&values)?;
        Ok(order)
    }

    // ---- Accessors ----

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn objective(&self) -> &ObjectiveFunction {
        &self.objective
    }

    pub fn estimates(&self) -> &Estimates {
        &self.estimates
    }

    pub fn derived_quantities(&self) -> &DerivedQuantities {
        &self.derived_quantities
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    pub fn penalties(&self) -> &Penalties {
        &self.penalties
    }

    pub fn processes(&self) -> &Processes {
        &self.processes
    }

    pub fn years(&self) -> &[u32] {
        &self.years
    }

    pub fn time_steps(&self) -> &[String] {
        &self.time_steps
    }

    pub fn current_year(&self) -> u32 {
        self.state.year
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Canonical names of the free estimates, in minimiser order.
    pub fn free_parameter_names(&self) -> Vec<String> {
        self.estimates.free_indices().into_iter().map(|i| self.estimates.get(i).parameter.full_name()).collect()
    }

    /// Resolve an addressable to the value it names.
    ///
    /// Errors
    /// ------
    /// - `UnknownObject` when no object of that type has the label.
    /// - `UnknownAddressable` when the object has no such parameter or
    ///   index, or the type cannot be estimated.
    pub fn lookup(&mut self, name: &AddressableName) -> ModelResult<&mut f64> {
        let parameter = name.parameter.as_str();
        let index = name.index.as_deref();
        let found = match name.kind {
            AddressableType::Process => {
                self.processes.by_label_mut(&name.label).map(|p| p.addressable_mut(parameter, index))
            }
            AddressableType::Selectivity => {
                self.selectivities.by_label_mut(&name.label).map(|s| s.addressable_mut(parameter, index))
            }
            AddressableType::AgeLength => {
                self.growth.age_length_mut(&name.label).map(|a| a.addressable_mut(parameter, index))
            }
            AddressableType::LengthWeight => {
                self.growth.length_weight_mut(&name.label).map(|l| l.addressable_mut(parameter, index))
            }
            AddressableType::AgeingError => {
                self.ageing_errors.by_label_mut(&name.label).map(|a| a.addressable_mut(parameter, index))
            }
            AddressableType::Catchability => {
                self.catchabilities.by_label_mut(&name.label).map(|q| q.addressable_mut(parameter, index))
            }
            AddressableType::Observation => {
                self.observations.by_label_mut(&name.label).map(|o| o.addressable_mut(parameter, index))
            }
            AddressableType::Likelihood => {
                self.likelihoods.by_label_mut(&name.label).map(|l| l.addressable_mut(parameter, index))
            }
            AddressableType::Estimate => {
                if self.estimates.indices_of(&name.label).is_empty() {
                    None
                } else {
                    Some(self.estimates.addressable_mut(&name.label, parameter, index))
                }
            }
            AddressableType::DerivedQuantity | AddressableType::InitialisationPhase | AddressableType::TimeVarying => {
                return Err(ModelError::UnknownAddressable {
                    name: name.full_name(),
                    reason: "this object type has no estimable parameters",
                });
            }
        };
        match found {
            None => Err(ModelError::UnknownObject { kind: name.kind.as_str(), label: name.label.clone() }),
            Some(None) => Err(ModelError::UnknownAddressable {
                name: name.full_name(),
                reason: "the object has no such parameter or index",
            }),
            Some(Some(value)) => Ok(value),
        }
    }

    // ---- Helper methods ----

    /// Take each estimate's starting value from its target and check that
    /// every `same` target exists.
    fn bind_estimates(&mut self) -> ModelResult<()> {
        for i in 0..self.estimates.len() {
            let targets: Vec<AddressableName> = self.estimates.get(i).targets().cloned().collect();
            let value = *self.lookup(&targets[0])?;
            let label = self.estimates.get(i).label.clone();
            for same in &targets[1..] {
                if let Err(err) = self.lookup(same) {
                    return Err(ModelError::config(format!("estimate[{label}].same"), err.to_string()));
                }
            }
            self.estimates.get_mut(i).bind(value)?;
        }
        Ok(())
    }

    /// Every value an additional prior names must resolve.
    fn check_additional_priors(&mut self) -> ModelResult<()> {
        let priors = std::mem::take(&mut self.additional_priors);
        let checked = priors.iter().try_for_each(|prior| {
            prior.targets().try_for_each(|target| {
                self.lookup(target).map(|_| ()).map_err(|err| {
                    ModelError::config(format!("additional_prior[{}]", prior.label()), err.to_string())
                })
            })
        });
        self.additional_priors = priors;
        checked
    }

    /// `(label, score)` for each additional prior at the current values.
    fn additional_prior_scores(&mut self) -> ModelResult<Vec<(String, f64)>> {
        let priors = std::mem::take(&mut self.additional_priors);
        let scores = priors
            .iter()
            .map(|prior| {
                let mut values = |names: &[AddressableName]| {
                    names.iter().map(|n| self.lookup(n).map(|v| *v)).collect::<ModelResult<Vec<f64>>>()
                };
                let first = values(prior.first())?;
                let second = values(prior.second())?;
                Ok((prior.label().to_string(), prior.score(&first, &second)))
            })
            .collect();
        self.additional_priors = priors;
        scores
    }

    fn apply_estimates(&mut self) -> ModelResult<()> {
        let writes: Vec<(AddressableName, f64)> = self
            .estimates
            .iter()
            .flat_map(|e| e.targets().map(move |t| (t.clone(), e.value)))
            .collect();
        for (target, value) in writes {
            *self.lookup(&target)? = value;
        }
        Ok(())
    }

    fn update_mean_weights(&mut self) {
        if self.partition.structure() != PartitionStructure::Age {
            return;
        }
        let ages = self.partition.x_values();
        for category in self.partition.iter_mut() {
            if let Some(index) = category.age_length {
                category.mean_weight = self.growth.mean_weights(index, &ages);
            }
        }
    }

    /// Restore, run, score and transform again.
    fn evaluate(&mut self, check_asserts: bool) -> ModelResult<f64> {
        if !self.transformations.is_empty() && !self.transformations.is_transformed() {
            return Err(ModelError::Code { reason: "estimates were left restored between evaluations".to_string() });
        }
        self.transformations.restore(&mut self.estimates);
        let run = self.iterate(check_asserts).and_then(|()| self.additional_prior_scores());
        let additional = match run {
            Ok(additional) => additional,
            Err(err) => {
                self.transformations.transform(&mut self.estimates);
                return Err(err);
            }
        };
        let score = self.objective.calculate_score(ScoreInputs {
            observations: &mut self.observations,
            likelihoods: &self.likelihoods,
            penalties: &self.penalties,
            estimates: &mut self.estimates,
            transformations: &mut self.transformations,
            additional_priors: &additional,
        });
        self.transformations.transform(&mut self.estimates);
        debug!(score, "objective evaluated");
        Ok(score)
    }

    fn iterate(&mut self, check_asserts: bool) -> ModelResult<()> {
        self.apply_estimates()?;
        self.selectivities.rebuild_all(&self.partition.x_values())?;
        self.ageing_errors.rebuild_all()?;
        self.update_mean_weights();

        self.partition.reset();
        self.processes.reset();
        self.derived_quantities.reset();
        self.observations.reset();
        self.penalties.reset();

        for (p, phase) in self.phases.iter().enumerate() {
            for _ in 0..phase.years {
                for (ts, list) in phase.time_step_processes.iter().enumerate() {
                    let state = RunState { year: self.start_year, time_step: ts, phase: Phase::Initialise(p) };
                    self.state = state;
                    execute_processes(
                        &mut self.processes,
                        list,
                        &mut ExecutionContext {
                            partition: &mut self.partition,
                            selectivities: &self.selectivities,
                            penalties: &mut self.penalties,
                            derived_quantities: &self.derived_quantities,
                            state,
                        },
                    )?;
                    self.derived_quantities.execute(&self.partition, &self.selectivities, state);
                }
            }
        }

        for &year in &self.years {
            for (ts, list) in self.time_step_processes.iter().enumerate() {
                let state = RunState { year, time_step: ts, phase: Phase::Execute };
                self.state = state;
                self.observations.pre_execute(&self.partition, year, ts);
                execute_processes(
                    &mut self.processes,
                    list,
                    &mut ExecutionContext {
                        partition: &mut self.partition,
                        selectivities: &self.selectivities,
                        penalties: &mut self.penalties,
                        derived_quantities: &self.derived_quantities,
                        state,
                    },
                )?;
                self.derived_quantities.execute(&self.partition, &self.selectivities, state);
                self.observations.execute(
                    &ObservationContext {
                        partition: &self.partition,
                        selectivities: &self.selectivities,
                        ageing_errors: &self.ageing_errors,
                        catchabilities: &self.catchabilities,
                        processes: &self.processes,
                        year,
                    },
                    ts,
                )?;
                if check_asserts {
                    self.asserts.check_partition(&self.partition, year, ts)?;
                }
            }
        }
        self.observations.finalise(&mut self.catchabilities)?;
        Ok(())
    }
}

/// MCMC target over the model's free estimates.
struct ModelTarget<'a> {
    model: &'a mut Model,
}

impl McmcTarget for ModelTarget<'_> {
    fn evaluate(&mut self, values: &[f64]) -> ModelResult<ScoreBreakdown> {
        self.model.objective_at(values)?;
        Ok(ScoreBreakdown::from(&self.model.objective))
    }
}

fn execute_processes(processes: &mut Processes, list: &[usize], ctx: &mut ExecutionContext<'_>) -> ModelResult<()> {
    for &i in list {
        processes.get_mut(i).execute(ctx)?;
    }
    Ok(())
}

fn initialisation_phase(
    config: &InitialisationPhaseConfig, processes: &Processes, time_step_processes: &[Vec<usize>],
) -> ModelResult<InitialisationPhase> {
    let InitialisationPhaseConfig::Iterative { label, years, exclude_processes } = config;
    let excluded = exclude_processes
        .iter()
        .map(|p| processes.index_of(p).ok_or_else(|| ModelError::UnknownObject { kind: "process", label: p.clone() }))
        .collect::<ModelResult<HashSet<usize>>>()?;
    Ok(InitialisationPhase {
        label: label.clone(),
        years: *years,
        time_step_processes: time_step_processes
            .iter()
            .map(|list| list.iter().copied().filter(|i| !excluded.contains(i)).collect())
            .collect(),
    })
}
